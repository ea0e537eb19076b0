//! Rate-limit policy configuration.

use serde::Deserialize;

/// One fixed-window policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolicyConfig {
    /// Key prefix; policies with different prefixes count independently.
    pub prefix: String,
    pub window_secs: u64,
    pub max_requests: u64,
}

impl PolicyConfig {
    fn new(prefix: &str, window_secs: u64, max_requests: u64) -> Self {
        Self {
            prefix: prefix.to_string(),
            window_secs,
            max_requests,
        }
    }
}

/// Per-role overrides for general traffic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleLimits {
    pub admin: Option<PolicyConfig>,
    pub manager: Option<PolicyConfig>,
    pub operator: Option<PolicyConfig>,
    pub viewer: Option<PolicyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_general")]
    pub general: PolicyConfig,
    /// Authentication endpoints.
    #[serde(default = "default_auth")]
    pub auth: PolicyConfig,
    /// Equipment control actions.
    #[serde(default = "default_control")]
    pub control: PolicyConfig,
    #[serde(default)]
    pub roles: RoleLimits,
}

fn default_general() -> PolicyConfig {
    PolicyConfig::new("rl:general", 900, 100)
}

fn default_auth() -> PolicyConfig {
    PolicyConfig::new("rl:auth", 900, 5)
}

fn default_control() -> PolicyConfig {
    PolicyConfig::new("rl:control", 60, 10)
}

impl RateLimitConfig {
    /// Every configured policy with its config path, for validation.
    pub fn policies(&self) -> impl Iterator<Item = (&'static str, &PolicyConfig)> {
        [
            ("rate_limit.general", Some(&self.general)),
            ("rate_limit.auth", Some(&self.auth)),
            ("rate_limit.control", Some(&self.control)),
            ("rate_limit.roles.admin", self.roles.admin.as_ref()),
            ("rate_limit.roles.manager", self.roles.manager.as_ref()),
            ("rate_limit.roles.operator", self.roles.operator.as_ref()),
            ("rate_limit.roles.viewer", self.roles.viewer.as_ref()),
        ]
        .into_iter()
        .filter_map(|(field, policy)| policy.map(|p| (field, p)))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general: default_general(),
            auth: default_auth(),
            control: default_control(),
            roles: RoleLimits::default(),
        }
    }
}
