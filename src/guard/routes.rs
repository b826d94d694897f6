//! Route Table
//!
//! Dashboard route definitions and path matching. Patterns use `:name`
//! segments for parameters (`/surveys/:surveyId`). Matching is exact on
//! segment count; a trailing slash and any query string are ignored.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::auth::Capability;
use crate::types::{ReadinessError, Result};

/// What a route demands of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "capability")]
pub enum RouteRequirement {
    /// Reachable without signing in; bypasses the guard
    Public,
    /// Any signed-in user
    Authenticated,
    /// Signed-in user whose role grants the capability
    Capability(Capability),
}

impl RouteRequirement {
    /// Requirement used by admin-only screens
    pub fn admin() -> Self {
        Self::Capability(Capability::ManageSurveys)
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Public)
    }
}

impl std::fmt::Display for RouteRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Authenticated => write!(f, "signed in"),
            Self::Capability(capability) => write!(f, "{}", capability),
        }
    }
}

/// Parameters extracted from a matched path, forwarded to the view unchanged
pub type RouteParams = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// Parsed route pattern
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(ReadinessError::InvalidRoute {
                pattern: pattern.to_string(),
                reason: "must start with '/'".to_string(),
            });
        }

        let mut segments = Vec::new();
        for part in split_path(pattern) {
            match part.strip_prefix(':') {
                Some("") => {
                    return Err(ReadinessError::InvalidRoute {
                        pattern: pattern.to_string(),
                        reason: "empty parameter name".to_string(),
                    });
                }
                Some(name) => {
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name))
                    {
                        return Err(ReadinessError::InvalidRoute {
                            pattern: pattern.to_string(),
                            reason: format!("duplicate parameter '{}'", name),
                        });
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Static(part.to_string())),
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a concrete path, returning its parameters
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty())
}

/// One dashboard route
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: RoutePattern,
    pub view: String,
    pub requirement: RouteRequirement,
}

/// A route resolved against a concrete path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub path: String,
    pub view: String,
    pub requirement: RouteRequirement,
    pub params: RouteParams,
}

/// Ordered route list; first match wins
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route
    pub fn route(
        mut self,
        pattern: &str,
        view: impl Into<String>,
        requirement: RouteRequirement,
    ) -> Result<Self> {
        self.routes.push(Route {
            pattern: RoutePattern::parse(pattern)?,
            view: view.into(),
            requirement,
        });
        Ok(self)
    }

    /// Routes of the survey dashboard
    pub fn dashboard(login_path: &str, default_path: &str) -> Result<Self> {
        use crate::auth::Capability::*;
        use RouteRequirement::{Authenticated, Capability, Public};

        Self::new()
            .route(login_path, "login", Public)?
            .route(default_path, "dashboard", Authenticated)?
            .route("/surveys/:surveyId", "survey", Capability(TakeSurvey))?
            .route(
                "/results/:assessmentId",
                "assessment-results",
                Capability(ViewOwnResults),
            )?
            .route(
                "/teams/:teamId/results",
                "team-results",
                Capability(ViewTeamResults),
            )?
            .route("/admin", "admin", RouteRequirement::admin())?
            .route("/admin/surveys", "admin-surveys", Capability(ManageSurveys))?
            .route(
                "/admin/surveys/:surveyId",
                "admin-survey-detail",
                Capability(ManageSurveys),
            )?
            .route("/admin/users", "admin-users", Capability(ManageUsers))?
            .route("/admin/usage", "admin-usage", Capability(ViewUsage))
    }

    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            route.pattern.matches(path).map(|params| RouteMatch {
                path: path.to_string(),
                view: route.view.clone(),
                requirement: route.requirement,
                params,
            })
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::dashboard("/login", "/dashboard").unwrap()
    }

    #[test]
    fn test_extracts_params() {
        let m = table().resolve("/teams/t-9/results").unwrap();
        assert_eq!(m.view, "team-results");
        assert_eq!(m.params.get("teamId").map(String::as_str), Some("t-9"));
    }

    #[test]
    fn test_ignores_trailing_slash_and_query() {
        let m = table().resolve("/surveys/s-1/?step=3").unwrap();
        assert_eq!(m.view, "survey");
        assert_eq!(m.params["surveyId"], "s-1");
    }

    #[test]
    fn test_static_segments_must_match() {
        assert!(table().resolve("/teams/t-9/members").is_none());
        assert!(table().resolve("/surveys").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let table = RouteTable::new()
            .route("/admin/:section", "generic", RouteRequirement::Authenticated)
            .unwrap()
            .route("/admin/users", "users", RouteRequirement::admin())
            .unwrap();
        assert_eq!(table.resolve("/admin/users").unwrap().view, "generic");
    }

    #[test]
    fn test_rejects_bad_patterns() {
        assert!(RoutePattern::parse("admin").is_err());
        assert!(RoutePattern::parse("/a/:").is_err());
        assert!(RoutePattern::parse("/a/:id/b/:id").is_err());
    }

    #[test]
    fn test_root_pattern() {
        let table = RouteTable::new()
            .route("/", "home", RouteRequirement::Public)
            .unwrap();
        assert!(table.resolve("/").unwrap().params.is_empty());
        assert!(table.resolve("/x").is_none());
    }
}
