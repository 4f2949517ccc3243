//! Provider and model identity for a single model call.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// LLM provider identifier (Value Object)
///
/// Known providers have dedicated variants; anything else is carried as
/// [`ProviderId::Custom`] so configuration can route to bespoke backends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderId {
    Bedrock,
    OpenAi,
    Anthropic,
    OpenRouter,
    Vertex,
    Custom(String),
}

impl ProviderId {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderId::Bedrock => "bedrock",
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::OpenRouter => "openrouter",
            ProviderId::Vertex => "vertex",
            ProviderId::Custom(s) => s,
        }
    }

    /// All built-in providers, in the order they are listed in help output.
    pub fn known() -> [ProviderId; 5] {
        [
            ProviderId::Bedrock,
            ProviderId::OpenAi,
            ProviderId::Anthropic,
            ProviderId::OpenRouter,
            ProviderId::Vertex,
        ]
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ProviderId::Custom(_))
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "bedrock" | "aws" => ProviderId::Bedrock,
            "openai" => ProviderId::OpenAi,
            "anthropic" => ProviderId::Anthropic,
            "openrouter" => ProviderId::OpenRouter,
            "vertex" | "gemini" => ProviderId::Vertex,
            other => ProviderId::Custom(other.to_string()),
        })
    }
}

impl Serialize for ProviderId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let Ok(id) = s.parse::<ProviderId>();
        Ok(id)
    }
}

/// One (provider, model) pair that may serve a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub provider: ProviderId,
    pub model: String,
}

impl ModelCandidate {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl fmt::Display for ModelCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}
