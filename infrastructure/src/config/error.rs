use cadence_domain::{ConfigIssue, DomainError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid fallback chain for {field}: {source}")]
    Chain {
        field: String,
        #[source]
        source: DomainError,
    },

    #[error("Configuration has {} error(s); first: {}", .0.len(), first_issue(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn first_issue(issues: &[ConfigIssue]) -> String {
    issues
        .first()
        .map(|i| i.message.clone())
        .unwrap_or_default()
}
