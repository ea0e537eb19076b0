//! Rate-limit policies and caller identity.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::config::rate_limit::{PolicyConfig, RateLimitConfig};

/// A fixed-window request budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Counter key prefix; also the policy's name in logs and denials.
    pub prefix: String,
    pub window: Duration,
    pub max_requests: u64,
}

impl From<&PolicyConfig> for Policy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
        }
    }
}

/// What kind of request is being admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    General,
    Authentication,
    /// Equipment control commands.
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Operator,
    Viewer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Operator => "operator",
            Self::Viewer => "viewer",
        };
        f.write_str(name)
    }
}

/// Caller as seen by the admission boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    /// Network origin, used when the caller is anonymous.
    pub origin: String,
    pub role: Option<Role>,
}

impl Identity {
    #[must_use]
    pub fn anonymous(origin: impl Into<String>) -> Self {
        Self {
            user_id: None,
            origin: origin.into(),
            role: None,
        }
    }

    #[must_use]
    pub fn user(user_id: impl Into<String>, origin: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: Some(user_id.into()),
            origin: origin.into(),
            role: Some(role),
        }
    }

    /// Counter identity: the user when authenticated, else the origin.
    #[must_use]
    pub fn key(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.origin)
    }
}

/// Policy selection by action class and role.
#[derive(Debug, Clone)]
pub struct PolicySet {
    general: Policy,
    auth: Policy,
    control: Policy,
    roles: HashMap<Role, Policy>,
}

impl PolicySet {
    #[must_use]
    pub fn new(general: Policy, auth: Policy, control: Policy) -> Self {
        Self {
            general,
            auth,
            control,
            roles: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role, policy: Policy) -> Self {
        self.roles.insert(role, policy);
        self
    }

    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let mut set = Self::new(
            Policy::from(&config.general),
            Policy::from(&config.auth),
            Policy::from(&config.control),
        );
        let overrides = [
            (Role::Admin, config.roles.admin.as_ref()),
            (Role::Manager, config.roles.manager.as_ref()),
            (Role::Operator, config.roles.operator.as_ref()),
            (Role::Viewer, config.roles.viewer.as_ref()),
        ];
        for (role, policy) in overrides
            .into_iter()
            .filter_map(|(role, policy)| policy.map(|p| (role, p)))
        {
            set = set.with_role(role, Policy::from(policy));
        }
        set
    }

    /// Authentication and control always use their strict policies; role
    /// overrides apply to general traffic only.
    #[must_use]
    pub fn select(&self, identity: &Identity, class: ActionClass) -> &Policy {
        match class {
            ActionClass::Authentication => &self.auth,
            ActionClass::Control => &self.control,
            ActionClass::General => identity
                .role
                .and_then(|role| self.roles.get(&role))
                .unwrap_or(&self.general),
        }
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(prefix: &str, max: u64) -> Policy {
        Policy {
            prefix: prefix.into(),
            window: Duration::from_secs(60),
            max_requests: max,
        }
    }

    #[test]
    fn identity_prefers_user() {
        assert_eq!(Identity::user("u-1", "10.0.0.1", Role::Viewer).key(), "u-1");
        assert_eq!(Identity::anonymous("10.0.0.1").key(), "10.0.0.1");
    }

    #[test]
    fn role_override_applies_to_general_only() {
        let set = PolicySet::new(policy("g", 100), policy("a", 5), policy("c", 10))
            .with_role(Role::Admin, policy("admin", 1000));
        let admin = Identity::user("root", "10.0.0.1", Role::Admin);
        let viewer = Identity::user("v", "10.0.0.2", Role::Viewer);

        assert_eq!(set.select(&admin, ActionClass::General).prefix, "admin");
        assert_eq!(set.select(&viewer, ActionClass::General).prefix, "g");
        assert_eq!(set.select(&admin, ActionClass::Control).prefix, "c");
        assert_eq!(set.select(&admin, ActionClass::Authentication).prefix, "a");
    }
}
