//! Authentication State
//!
//! Session, role and capability model consumed by the route guard.
//! The session itself is owned by an external auth provider; this module
//! only describes it and answers "may this role do that".

mod provider;

pub use provider::{AuthStateProvider, SessionWatch, StaticSession};

use serde::{Deserialize, Serialize};

use crate::types::UserId;

// =============================================================================
// Roles & Capabilities
// =============================================================================

/// Dashboard role attached to an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    /// Capabilities this role grants
    pub fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Member => &[ViewDashboard, TakeSurvey, ViewOwnResults],
            Role::Admin => &[
                ViewDashboard,
                TakeSurvey,
                ViewOwnResults,
                ViewTeamResults,
                ManageSurveys,
                ManageUsers,
                ViewUsage,
            ],
        }
    }

    /// The single predicate every authorization check goes through
    pub fn grants(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}. Valid values: member, admin", s)),
        }
    }
}

/// Something a route may require beyond being signed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewDashboard,
    TakeSurvey,
    ViewOwnResults,
    ViewTeamResults,
    ManageSurveys,
    ManageUsers,
    ViewUsage,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::ViewDashboard => "view_dashboard",
            Capability::TakeSurvey => "take_survey",
            Capability::ViewOwnResults => "view_own_results",
            Capability::ViewTeamResults => "view_team_results",
            Capability::ManageSurveys => "manage_surveys",
            Capability::ManageUsers => "manage_users",
            Capability::ViewUsage => "view_usage",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Session
// =============================================================================

/// Authenticated user as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub role: Role,
}

impl User {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Snapshot of auth state: `{ user: {id, role} | null, isLoading }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<User>,
    pub is_loading: bool,
}

impl Session {
    /// Session still being resolved
    pub fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }

    /// Resolved with no signed-in user
    pub fn anonymous() -> Self {
        Self {
            user: None,
            is_loading: false,
        }
    }

    /// Resolved with a signed-in user
    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_loading: false,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}
