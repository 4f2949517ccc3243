//! Role-based chain selection from TOML (`[chains]` section)

use cadence_domain::AgentRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which provider serves each agent role.
///
/// # Example
///
/// ```toml
/// [chains]
/// provider = "openai"
///
/// [chains.roles.decision]
/// provider = "openai"
/// model = "gpt-4o-mini"
///
/// [chains.roles.writer]
/// provider = "anthropic"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChainsConfig {
    /// Provider for roles without an override. Defaults to the first
    /// configured provider.
    pub provider: Option<String>,
    /// Replaces the default provider's primary model.
    pub model: Option<String>,
    pub roles: BTreeMap<String, FileRoleChain>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoleChain {
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl FileChainsConfig {
    /// Role overrides with parseable role names.
    pub fn parsed_roles(&self) -> Vec<(AgentRole, &FileRoleChain)> {
        self.roles
            .iter()
            .filter_map(|(name, chain)| name.parse::<AgentRole>().ok().map(|role| (role, chain)))
            .collect()
    }

    /// Role names that do not match any agent role.
    pub fn unknown_roles(&self) -> Vec<&str> {
        self.roles
            .keys()
            .filter(|name| name.parse::<AgentRole>().is_err())
            .map(|name| name.as_str())
            .collect()
    }
}
