//! Provider configuration from TOML (`[providers.<id>]` sections)

use crate::providers::command::CommandSpec;
use crate::providers::wire::WireFormat;
use cadence_domain::fallback::chain::default_model_for;
use cadence_domain::{ConfigIssue, ConfigIssueCode, ProviderId, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One provider's client command and model list.
///
/// # Example
///
/// ```toml
/// [providers.openai]
/// command = "cadence-openai"
/// api_key_env = "OPENAI_API_KEY"
/// default_model = "gpt-4.1-mini"
/// fallback_models = ["gpt-4o-mini"]
/// cross_provider = [{ provider = "anthropic", models = ["claude-3-5-haiku-latest"] }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Client executable; a provider without one has no adapter.
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Defaults to the provider's native format.
    pub wire_format: Option<String>,
    /// Environment variable that must hold the API key.
    pub api_key_env: Option<String>,
    /// Extra environment passed to the client.
    pub env: BTreeMap<String, String>,
    pub default_model: Option<String>,
    pub fallback_models: Vec<String>,
    pub cross_provider: Vec<FileCrossProvider>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCrossProvider {
    pub provider: String,
    pub models: Vec<String>,
}

fn empty_model(field: String) -> ConfigIssue {
    let message = format!("{}: model name cannot be empty", field);
    ConfigIssue::error(ConfigIssueCode::EmptyModelName { field }, message)
}

/// Drop blank names from a model list, reporting each.
fn parse_model_list(field: &str, values: &[String]) -> (Vec<String>, Vec<ConfigIssue>) {
    let mut issues = Vec::new();
    let mut models = Vec::new();
    for value in values {
        if value.trim().is_empty() {
            issues.push(empty_model(field.to_string()));
        } else {
            models.push(value.trim().to_string());
        }
    }
    (models, issues)
}

impl FileProviderConfig {
    pub fn parse_wire_format(&self, id: &ProviderId) -> (WireFormat, Vec<ConfigIssue>) {
        let native = WireFormat::for_provider(id);
        match &self.wire_format {
            None => (native, vec![]),
            Some(value) => match value.parse::<WireFormat>() {
                Ok(format) => (format, vec![]),
                Err(_) => {
                    let field = format!("providers.{}.wire_format", id);
                    let message = format!(
                        "{}: unknown value '{}', falling back to '{}'",
                        field, value, native
                    );
                    (
                        native,
                        vec![ConfigIssue::warning(
                            ConfigIssueCode::InvalidEnumValue {
                                field,
                                value: value.clone(),
                                valid_values: ["openai", "anthropic", "bedrock", "vertex"]
                                    .iter()
                                    .map(|v| v.to_string())
                                    .collect(),
                            },
                            message,
                        )],
                    )
                }
            },
        }
    }

    /// Model selection for this provider. Blank names fall back to the
    /// stock default model or are dropped from fallback lists.
    pub fn parse_settings(&self, id: &ProviderId) -> (ProviderSettings, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let default_model = match &self.default_model {
            Some(model) if model.trim().is_empty() => {
                issues.push(empty_model(format!("providers.{}.default_model", id)));
                default_model_for(id)
            }
            Some(model) => model.trim().to_string(),
            None => default_model_for(id),
        };

        let (fallbacks, fallback_issues) =
            parse_model_list(&format!("providers.{}.fallback_models", id), &self.fallback_models);
        issues.extend(fallback_issues);

        let mut settings =
            ProviderSettings::new(id.clone(), default_model).with_fallback_models(fallbacks);
        for (i, cross) in self.cross_provider.iter().enumerate() {
            let field = format!("providers.{}.cross_provider[{}]", id, i);
            if cross.provider.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnknownProvider {
                        field: field.clone(),
                        provider: String::new(),
                    },
                    format!("{}: provider cannot be empty", field),
                ));
                continue;
            }
            let (models, model_issues) = parse_model_list(&format!("{}.models", field), &cross.models);
            issues.extend(model_issues);
            let provider: ProviderId = cross.provider.parse().unwrap_or_else(|e| match e {});
            settings = settings.with_cross_provider(provider, models);
        }
        (settings, issues)
    }

    /// Client command, if one is configured.
    pub fn command_spec(&self, id: &ProviderId) -> Option<CommandSpec> {
        let program = self.command.as_ref().filter(|c| !c.trim().is_empty())?;
        let mut spec = CommandSpec::new(program.trim(), self.parse_wire_format(id).0)
            .with_args(self.args.clone())
            .with_api_key_env(self.api_key_env.clone());
        spec.env = self.env.clone();
        Some(spec)
    }

    pub fn validate(&self, id: &ProviderId) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.parse_wire_format(id).1);
        issues.extend(self.parse_settings(id).1);
        if self.command.as_ref().is_none_or(|c| c.trim().is_empty()) {
            let field = format!("providers.{}.command", id);
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownProvider {
                    field: field.clone(),
                    provider: id.to_string(),
                },
                format!(
                    "{}: no client command configured, calls to '{}' will fail",
                    field, id
                ),
            ));
        }
        issues
    }
}
