//! Route Guard
//!
//! Decides, per navigation, whether to render the target view, redirect, or
//! show a loading placeholder.
//!
//! ## Decision Order
//!
//! ```text
//! session loading            --> Loading
//! no user                    --> RedirectToLogin
//! role lacks capability      --> RedirectToDefault
//! otherwise                  --> Render { view, params }
//! ```
//!
//! Every decision is terminal for that navigation; the next navigation (or a
//! session change) is evaluated from scratch. The guard performs no I/O and
//! cannot fail.

mod routes;

pub use routes::{Route, RouteMatch, RouteParams, RoutePattern, RouteRequirement, RouteTable};

use serde::Serialize;
use tracing::debug;

use crate::auth::{AuthStateProvider, Session};
use crate::config::AuthConfig;
use crate::types::{ReadinessError, Result};

/// Per-navigation outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum GuardDecision {
    /// Session still resolving; show a placeholder
    Loading,
    /// No signed-in user
    RedirectToLogin {
        to: String,
        /// Path the user was trying to reach
        from: String,
    },
    /// Signed in, but the role does not grant what the route needs
    RedirectToDefault { to: String },
    Render { view: String, params: RouteParams },
}

/// Guard state derived from a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Unauthenticated,
    Unauthorized,
    Authorized,
}

impl GuardDecision {
    pub fn state(&self) -> GuardState {
        match self {
            Self::Loading => GuardState::Loading,
            Self::RedirectToLogin { .. } => GuardState::Unauthenticated,
            Self::RedirectToDefault { .. } => GuardState::Unauthorized,
            Self::Render { .. } => GuardState::Authorized,
        }
    }

    /// Redirect target, if this decision is a redirect
    pub fn redirect(&self) -> Option<&str> {
        match self {
            Self::RedirectToLogin { to, .. } | Self::RedirectToDefault { to } => Some(to),
            _ => None,
        }
    }
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Authorized => write!(f, "authorized"),
        }
    }
}

/// Route guard over a route table
#[derive(Debug, Clone)]
pub struct RouteGuard {
    routes: RouteTable,
    login_path: String,
    default_path: String,
}

impl RouteGuard {
    pub fn new(routes: RouteTable, login_path: impl Into<String>, default_path: impl Into<String>) -> Self {
        Self {
            routes,
            login_path: login_path.into(),
            default_path: default_path.into(),
        }
    }

    /// Guard over the dashboard routes using configured redirect targets
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let routes = RouteTable::dashboard(&config.login_path, &config.default_path)?;
        Ok(Self::new(
            routes,
            config.login_path.clone(),
            config.default_path.clone(),
        ))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide for an already-resolved route
    pub fn evaluate(&self, target: &RouteMatch, session: &Session) -> GuardDecision {
        let decision = decide(
            target.requirement,
            session,
            &self.login_path,
            &self.default_path,
        )
        .unwrap_or_else(|| GuardDecision::Render {
            view: target.view.clone(),
            params: target.params.clone(),
        });

        // Login redirects remember where the user was going
        let decision = match decision {
            GuardDecision::RedirectToLogin { to, .. } => GuardDecision::RedirectToLogin {
                to,
                from: target.path.clone(),
            },
            other => other,
        };

        debug!(
            path = %target.path,
            view = %target.view,
            state = %decision.state(),
            "Route guard decision"
        );
        decision
    }

    /// Resolve a path and decide
    pub fn navigate(&self, path: &str, session: &Session) -> Result<GuardDecision> {
        let target = self
            .routes
            .resolve(path)
            .ok_or_else(|| ReadinessError::RouteNotFound(path.to_string()))?;
        Ok(self.evaluate(&target, session))
    }

    /// Wait for the provider to finish loading, then decide
    pub async fn navigate_when_ready(
        &self,
        path: &str,
        provider: &dyn AuthStateProvider,
    ) -> Result<GuardDecision> {
        let target = self
            .routes
            .resolve(path)
            .ok_or_else(|| ReadinessError::RouteNotFound(path.to_string()))?;
        if !target.requirement.is_protected() {
            return Ok(self.evaluate(&target, &provider.session()));
        }
        let session = provider.resolved().await;
        Ok(self.evaluate(&target, &session))
    }
}

/// Core decision; `None` means render.
fn decide(
    requirement: RouteRequirement,
    session: &Session,
    login_path: &str,
    default_path: &str,
) -> Option<GuardDecision> {
    let capability = match requirement {
        RouteRequirement::Public => return None,
        RouteRequirement::Authenticated => None,
        RouteRequirement::Capability(c) => Some(c),
    };

    if session.is_loading {
        return Some(GuardDecision::Loading);
    }

    let Some(user) = &session.user else {
        return Some(GuardDecision::RedirectToLogin {
            to: login_path.to_string(),
            from: String::new(),
        });
    };

    match capability {
        Some(c) if !user.role.grants(c) => Some(GuardDecision::RedirectToDefault {
            to: default_path.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Capability, Role, SessionWatch, User};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn guard() -> RouteGuard {
        RouteGuard::from_config(&AuthConfig::default()).unwrap()
    }

    fn member() -> Session {
        Session::signed_in(User::new("u-1", Role::Member))
    }

    fn admin() -> Session {
        Session::signed_in(User::new("u-2", Role::Admin))
    }

    #[test]
    fn test_loading_session_shows_placeholder() {
        let decision = guard().navigate("/admin", &Session::loading()).unwrap();
        assert_eq!(decision, GuardDecision::Loading);
    }

    #[test]
    fn test_anonymous_redirects_to_login_with_return_path() {
        let decision = guard()
            .navigate("/surveys/s-1", &Session::anonymous())
            .unwrap();
        assert_eq!(
            decision,
            GuardDecision::RedirectToLogin {
                to: "/login".to_string(),
                from: "/surveys/s-1".to_string(),
            }
        );
    }

    #[test]
    fn test_member_on_admin_route_goes_to_default() {
        let decision = guard().navigate("/admin/users", &member()).unwrap();
        assert_eq!(decision.state(), GuardState::Unauthorized);
        assert_eq!(decision.redirect(), Some("/dashboard"));
    }

    #[test]
    fn test_admin_renders_with_params_forwarded() {
        let decision = guard().navigate("/admin/surveys/s-7", &admin()).unwrap();
        match decision {
            GuardDecision::Render { view, params } => {
                assert_eq!(view, "admin-survey-detail");
                assert_eq!(params["surveyId"], "s-7");
            }
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[test]
    fn test_public_route_renders_while_loading() {
        let decision = guard().navigate("/login", &Session::loading()).unwrap();
        assert_eq!(decision.state(), GuardState::Authorized);
    }

    #[test]
    fn test_unknown_route() {
        let err = guard().navigate("/nowhere", &admin()).unwrap_err();
        assert!(matches!(err, ReadinessError::RouteNotFound(_)));
    }

    #[tokio::test]
    async fn test_navigate_when_ready_reevaluates_after_flip() {
        let watch = Arc::new(SessionWatch::new());
        let publisher = Arc::clone(&watch);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            publisher.publish(Session::anonymous());
        });

        let decision = tokio::time::timeout(
            Duration::from_secs(2),
            guard().navigate_when_ready("/dashboard", watch.as_ref()),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(decision.state(), GuardState::Unauthenticated);
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Member), Just(Role::Admin)]
    }

    fn requirement_strategy() -> impl Strategy<Value = RouteRequirement> {
        prop_oneof![
            Just(RouteRequirement::Authenticated),
            Just(RouteRequirement::admin()),
            Just(RouteRequirement::Capability(Capability::ViewUsage)),
            Just(RouteRequirement::Capability(Capability::TakeSurvey)),
        ]
    }

    fn session_strategy() -> impl Strategy<Value = Session> {
        (
            proptest::option::of(("[a-z0-9]{1,8}", role_strategy())),
            any::<bool>(),
        )
            .prop_map(|(user, is_loading)| Session {
                user: user.map(|(id, role)| User::new(id, role)),
                is_loading,
            })
    }

    fn target(requirement: RouteRequirement) -> RouteMatch {
        RouteMatch {
            path: "/target".to_string(),
            view: "target".to_string(),
            requirement,
            params: RouteParams::new(),
        }
    }

    proptest! {
        /// Property: a loading session only ever yields the placeholder.
        #[test]
        fn prop_loading_always_placeholder(
            session in session_strategy(),
            requirement in requirement_strategy(),
        ) {
            let session = Session { is_loading: true, ..session };
            let decision = guard().evaluate(&target(requirement), &session);
            prop_assert_eq!(decision, GuardDecision::Loading);
        }

        /// Property: resolved with no user always redirects to login.
        #[test]
        fn prop_no_user_redirects_to_login(requirement in requirement_strategy()) {
            let decision = guard().evaluate(&target(requirement), &Session::anonymous());
            prop_assert_eq!(decision.state(), GuardState::Unauthenticated);
            prop_assert_eq!(decision.redirect(), Some("/login"));
        }

        /// Property: a non-admin on an admin route goes to the default view, never login.
        #[test]
        fn prop_member_on_admin_route_never_login(id in "[a-z0-9]{1,8}") {
            let session = Session::signed_in(User::new(id, Role::Member));
            let decision = guard().evaluate(&target(RouteRequirement::admin()), &session);
            prop_assert_eq!(decision.redirect(), Some("/dashboard"));
            prop_assert_eq!(decision.state(), GuardState::Unauthorized);
        }
    }
}
