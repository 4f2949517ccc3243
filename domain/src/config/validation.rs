//! Configuration issues.
//!
//! Config parsing never fails hard on a bad value: it falls back to a
//! default and reports a [`ConfigIssue`] so the caller can warn or refuse
//! to start.

use std::fmt;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The configuration cannot work at all.
    Error,
    /// The configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    EmptyModelName {
        field: String,
    },
    /// A chain references a provider with no `[providers.<id>]` section.
    UnknownProvider {
        field: String,
        provider: String,
    },
    OutOfRange {
        field: String,
        value: String,
    },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_severity() {
        let issue = ConfigIssue::error(
            ConfigIssueCode::EmptyModelName {
                field: "providers.openai.default_model".to_string(),
            },
            "providers.openai.default_model is empty",
        );
        assert!(issue.is_error());
        assert_eq!(issue.to_string(), "error: providers.openai.default_model is empty");
    }
}
