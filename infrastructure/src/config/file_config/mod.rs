//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; `parse_*` helpers turn them into domain
//! types and report [`ConfigIssue`]s instead of failing.

mod chains;
mod logging;
mod providers;
mod run;

pub use chains::{FileChainsConfig, FileRoleChain};
pub use logging::FileLoggingConfig;
pub use providers::{FileCrossProvider, FileProviderConfig};
pub use run::FileRunConfig;

use super::ConfigError;
use crate::providers::command::CommandSpec;
use cadence_application::RoleChains;
use cadence_domain::{AgentRole, ConfigIssue, ConfigIssueCode, ProviderId, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Loop control
    pub run: FileRunConfig,
    /// Provider clients, keyed by provider id
    pub providers: BTreeMap<String, FileProviderConfig>,
    /// Provider selection per agent role
    pub chains: FileChainsConfig,
    pub logging: FileLoggingConfig,
}

fn parse_provider(value: &str) -> ProviderId {
    value.parse().unwrap_or_else(|e| match e {})
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl FileConfig {
    /// Configured providers in key order.
    pub fn provider_entries(&self) -> Vec<(ProviderId, &FileProviderConfig)> {
        self.providers
            .iter()
            .map(|(key, config)| (parse_provider(key), config))
            .collect()
    }

    pub fn provider(&self, id: &ProviderId) -> Option<&FileProviderConfig> {
        self.provider_entries()
            .into_iter()
            .find(|(key, _)| key == id)
            .map(|(_, config)| config)
    }

    /// `chains.provider`, else the first configured provider, else OpenAI.
    pub fn default_provider(&self) -> ProviderId {
        if let Some(provider) = non_blank(self.chains.provider.as_ref()) {
            return parse_provider(provider);
        }
        self.providers
            .keys()
            .next()
            .map(|key| parse_provider(key))
            .unwrap_or(ProviderId::OpenAi)
    }

    pub fn settings_for(&self, id: &ProviderId) -> ProviderSettings {
        match self.provider(id) {
            Some(config) => config.parse_settings(id).0,
            None => ProviderSettings::builtin(id.clone()),
        }
    }

    /// Fallback chain per role.
    pub fn build_chains(&self) -> Result<RoleChains, ConfigError> {
        let default_provider = self.default_provider();
        let default = self
            .settings_for(&default_provider)
            .chain(non_blank(self.chains.model.as_ref()))
            .map_err(|source| ConfigError::Chain {
                field: "chains".to_string(),
                source,
            })?;

        let mut chains = RoleChains::new(default);
        for (role, entry) in self.chains.parsed_roles() {
            let provider = non_blank(entry.provider.as_ref())
                .map(parse_provider)
                .unwrap_or_else(|| default_provider.clone());
            let chain = self
                .settings_for(&provider)
                .chain(non_blank(entry.model.as_ref()))
                .map_err(|source| ConfigError::Chain {
                    field: format!("chains.roles.{}", role),
                    source,
                })?;
            chains = chains.with_role(role, chain);
        }
        Ok(chains)
    }

    /// Client commands for every provider that has one.
    pub fn command_specs(&self) -> Vec<(ProviderId, CommandSpec)> {
        self.provider_entries()
            .into_iter()
            .filter_map(|(id, config)| config.command_spec(&id).map(|spec| (id, spec)))
            .collect()
    }

    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.run.validate();

        if self.providers.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownProvider {
                    field: "providers".to_string(),
                    provider: String::new(),
                },
                "no [providers] configured; every model call will fail".to_string(),
            ));
        }

        for (id, config) in self.provider_entries() {
            issues.extend(config.validate(&id));
            for (i, cross) in config.cross_provider.iter().enumerate() {
                let target = parse_provider(&cross.provider);
                if !cross.provider.trim().is_empty() && self.provider(&target).is_none() {
                    issues.push(self.unknown_provider(
                        format!("providers.{}.cross_provider[{}]", id, i),
                        &target,
                        false,
                    ));
                }
            }
        }

        issues.extend(self.validate_chains());
        issues
    }

    fn validate_chains(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut check_model = |field: &str, model: Option<&String>| {
            if model.is_some_and(|m| m.trim().is_empty()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyModelName {
                        field: field.to_string(),
                    },
                    format!("{}: model name cannot be empty", field),
                ));
            }
        };
        check_model("chains.model", self.chains.model.as_ref());
        for (name, entry) in &self.chains.roles {
            check_model(&format!("chains.roles.{}.model", name), entry.model.as_ref());
        }

        if !self.providers.is_empty() {
            let default_provider = self.default_provider();
            if self.provider(&default_provider).is_none() {
                issues.push(self.unknown_provider("chains.provider".to_string(), &default_provider, true));
            }
            for (role, entry) in self.chains.parsed_roles() {
                if let Some(provider) = non_blank(entry.provider.as_ref()) {
                    let provider = parse_provider(provider);
                    if self.provider(&provider).is_none() {
                        issues.push(self.unknown_provider(
                            format!("chains.roles.{}.provider", role),
                            &provider,
                            true,
                        ));
                    }
                }
            }
        }

        for name in self.chains.unknown_roles() {
            let field = format!("chains.roles.{}", name);
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidEnumValue {
                    field: field.clone(),
                    value: name.to_string(),
                    valid_values: AgentRole::ALL.iter().map(|r| r.to_string()).collect(),
                },
                format!("{}: unknown agent role '{}', ignoring", field, name),
            ));
        }
        issues
    }

    fn unknown_provider(&self, field: String, provider: &ProviderId, fatal: bool) -> ConfigIssue {
        let message = format!(
            "{}: provider '{}' has no [providers.{}] section",
            field, provider, provider
        );
        let code = ConfigIssueCode::UnknownProvider {
            field,
            provider: provider.to_string(),
        };
        if fatal {
            ConfigIssue::error(code, message)
        } else {
            ConfigIssue::warning(code, message)
        }
    }

    /// Warnings on success; every error-severity issue otherwise.
    pub fn check(&self) -> Result<Vec<ConfigIssue>, ConfigError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            self.validate().into_iter().partition(|i| i.is_error());
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
