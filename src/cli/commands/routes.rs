//! Routes Command
//!
//! List the dashboard routes and what each requires.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub fn run(ctx: &CommandContext, format: &str) -> Result<()> {
    let guard = ctx.guard()?;
    let routes = guard.routes().routes();

    if format == "json" {
        let listing: Vec<_> = routes
            .iter()
            .map(|route| {
                serde_json::json!({
                    "pattern": route.pattern.as_str(),
                    "view": route.view,
                    "requirement": route.requirement,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    let output = Output::new();
    output.header("Dashboard Routes");
    let width = routes
        .iter()
        .map(|route| route.pattern.as_str().len())
        .max()
        .unwrap_or(0);
    for route in routes {
        println!(
            "  {:<width$}  {:<22} {}",
            route.pattern.as_str(),
            route.view,
            route.requirement,
            width = width
        );
    }
    Ok(())
}
