//! Cache keys and invalidation rules
//!
//! Every reader and every invalidator derives keys through [`keys`], so a
//! mutation's declared rules always line up with what views have cached.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{TeamId, UserId};

/// Server-owned entity families cached by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Team,
    Survey,
    Question,
    Assessment,
    Result,
    Usage,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Team => "teams",
            Self::Survey => "surveys",
            Self::Question => "questions",
            Self::Assessment => "assessments",
            Self::Result => "results",
            Self::Usage => "usage",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    /// Accepts the plural path segment or the singular name
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let kind = match s.to_lowercase().as_str() {
            "user" | "users" => Self::User,
            "team" | "teams" => Self::Team,
            "survey" | "surveys" => Self::Survey,
            "question" | "questions" => Self::Question,
            "assessment" | "assessments" => Self::Assessment,
            "result" | "results" => Self::Result,
            "usage" => Self::Usage,
            _ => {
                return Err(format!(
                    "Unknown entity kind: {}. Valid values: users, teams, surveys, questions, assessments, results, usage",
                    s
                ));
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite cache key: entity kind plus optional id and scoping
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    kind: EntityKind,
    id: Option<String>,
    team: Option<TeamId>,
    user: Option<UserId>,
}

impl CacheKey {
    /// Collection of an entity kind
    pub fn list(kind: EntityKind) -> Self {
        Self {
            kind,
            id: None,
            team: None,
            user: None,
        }
    }

    /// Single entity
    pub fn entity(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::list(kind)
        }
    }

    pub fn in_team(mut self, team: TeamId) -> Self {
        self.team = Some(team);
        self
    }

    pub fn for_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn team(&self) -> Option<&TeamId> {
        self.team.as_ref()
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// REST path for this key, relative to the API base
    pub fn path(&self) -> String {
        let mut path = String::new();
        if let Some(team) = &self.team {
            path.push_str(&format!("teams/{}/", team));
        }
        if let Some(user) = &self.user {
            path.push_str(&format!("users/{}/", user));
        }
        path.push_str(self.kind.as_str());
        if let Some(id) = &self.id {
            path.push('/');
            path.push_str(id);
        }
        path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Key derivation shared by readers and invalidators
pub mod keys {
    use super::{CacheKey, EntityKind};
    use crate::types::{TeamId, UserId};

    pub fn users() -> CacheKey {
        CacheKey::list(EntityKind::User)
    }

    pub fn user(id: &UserId) -> CacheKey {
        CacheKey::entity(EntityKind::User, id.as_str())
    }

    pub fn teams() -> CacheKey {
        CacheKey::list(EntityKind::Team)
    }

    pub fn team(id: &TeamId) -> CacheKey {
        CacheKey::entity(EntityKind::Team, id.as_str())
    }

    pub fn team_members(team: &TeamId) -> CacheKey {
        users().in_team(team.clone())
    }

    pub fn surveys() -> CacheKey {
        CacheKey::list(EntityKind::Survey)
    }

    pub fn survey(id: &str) -> CacheKey {
        CacheKey::entity(EntityKind::Survey, id)
    }

    pub fn survey_questions(survey_id: &str) -> CacheKey {
        CacheKey::entity(EntityKind::Question, survey_id)
    }

    pub fn assessment(id: &str) -> CacheKey {
        CacheKey::entity(EntityKind::Assessment, id)
    }

    pub fn user_assessments(user: &UserId) -> CacheKey {
        CacheKey::list(EntityKind::Assessment).for_user(user.clone())
    }

    pub fn team_results(team: &TeamId) -> CacheKey {
        CacheKey::list(EntityKind::Result).in_team(team.clone())
    }

    pub fn usage_summary() -> CacheKey {
        CacheKey::list(EntityKind::Usage)
    }
}

// =============================================================================
// Invalidation Rules
// =============================================================================

/// Which cached entries a successful mutation makes stale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope")]
pub enum InvalidationRule {
    /// One entity, or every key of the kind when `id` is `None`
    Entity {
        kind: EntityKind,
        id: Option<String>,
    },
    /// The user entity and everything scoped to that user
    User { id: UserId },
    /// The team entity and everything scoped to that team
    Team { id: TeamId },
}

impl InvalidationRule {
    pub fn kind(kind: EntityKind) -> Self {
        Self::Entity { kind, id: None }
    }

    pub fn entity(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Entity {
            kind,
            id: Some(id.into()),
        }
    }

    pub fn user(id: UserId) -> Self {
        Self::User { id }
    }

    pub fn team(id: TeamId) -> Self {
        Self::Team { id }
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            Self::Entity { kind, id: None } => key.kind == *kind,
            Self::Entity { kind, id: Some(id) } => {
                key.kind == *kind && key.id.as_deref() == Some(id.as_str())
            }
            Self::User { id } => {
                key.user.as_ref() == Some(id)
                    || (key.kind == EntityKind::User && key.id.as_deref() == Some(id.as_str()))
            }
            Self::Team { id } => {
                key.team.as_ref() == Some(id)
                    || (key.kind == EntityKind::Team && key.id.as_deref() == Some(id.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("surveys".parse::<EntityKind>().unwrap(), EntityKind::Survey);
        assert_eq!("Team".parse::<EntityKind>().unwrap(), EntityKind::Team);
        assert!("widgets".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_key_paths() {
        let team = TeamId::new("t-1");
        let user = UserId::new("u-1");
        assert_eq!(keys::user(&user).path(), "users/u-1");
        assert_eq!(keys::team_members(&team).path(), "teams/t-1/users");
        assert_eq!(keys::user_assessments(&user).path(), "users/u-1/assessments");
        assert_eq!(keys::surveys().path(), "surveys");
    }

    #[test]
    fn test_kind_rule_matches_all_of_kind() {
        let rule = InvalidationRule::kind(EntityKind::Survey);
        assert!(rule.matches(&keys::surveys()));
        assert!(rule.matches(&keys::survey("s-1")));
        assert!(!rule.matches(&keys::survey_questions("s-1")));
    }

    #[test]
    fn test_entity_rule_matches_one() {
        let rule = InvalidationRule::entity(EntityKind::Survey, "s-1");
        assert!(rule.matches(&keys::survey("s-1")));
        assert!(!rule.matches(&keys::survey("s-2")));
        assert!(!rule.matches(&keys::surveys()));
    }

    #[test]
    fn test_user_rule_matches_scoped_keys() {
        let user = UserId::new("u-1");
        let rule = InvalidationRule::user(user.clone());
        assert!(rule.matches(&keys::user(&user)));
        assert!(rule.matches(&keys::user_assessments(&user)));
        assert!(!rule.matches(&keys::user(&UserId::new("u-2"))));
        assert!(!rule.matches(&keys::users()));
    }

    #[test]
    fn test_team_rule_matches_scoped_keys() {
        let team = TeamId::new("t-1");
        let rule = InvalidationRule::team(team.clone());
        assert!(rule.matches(&keys::team(&team)));
        assert!(rule.matches(&keys::team_members(&team)));
        assert!(rule.matches(&keys::team_results(&team)));
        assert!(!rule.matches(&keys::teams()));
    }
}
