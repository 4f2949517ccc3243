//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid workspace handle: {0}")]
    InvalidWorkspace(String),

    #[error("Invalid objective: {0}")]
    InvalidObjective(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DomainError::InvalidWorkspace("empty".to_string()).to_string(),
            "Invalid workspace handle: empty"
        );
        assert_eq!(
            DomainError::InvalidModel("blank name".to_string()).to_string(),
            "Invalid model: blank name"
        );
    }
}
