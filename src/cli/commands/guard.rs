//! Guard Command
//!
//! Evaluate the route guard for a path and a simulated session.
//!
//! Usage:
//!   readiness guard /admin/users --role member
//!   readiness guard /surveys/s-1 --loading -f json

use crate::auth::Role;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, simulated_session};
use crate::guard::GuardDecision;
use crate::types::Result;

pub fn run(ctx: &CommandContext, path: &str, role: Option<Role>, loading: bool, format: &str) -> Result<()> {
    let guard = ctx.guard()?;
    let session = simulated_session(role, loading);
    let decision = guard.navigate(path, &session)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    let output = Output::new();
    let who = match (session.is_loading, session.role()) {
        (true, _) => "session loading".to_string(),
        (false, Some(role)) => format!("signed in as {}", role),
        (false, None) => "anonymous".to_string(),
    };
    output.header(&format!("{} ({})", path, who));

    match &decision {
        GuardDecision::Loading => output.info("Loading: waiting for the session to resolve"),
        GuardDecision::RedirectToLogin { to, from } => {
            output.warning(&format!("Redirect to {} (return to {})", to, from))
        }
        GuardDecision::RedirectToDefault { to } => {
            output.warning(&format!("Redirect to {} (role lacks access)", to))
        }
        GuardDecision::Render { view, params } => {
            output.success(&format!("Render {}", view));
            for (name, value) in params {
                output.field(name, value);
            }
        }
    }
    output.field("state", decision.state());
    Ok(())
}
