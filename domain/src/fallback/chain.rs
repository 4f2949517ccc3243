//! Ordered model candidates for one agent role.

use crate::core::candidate::{ModelCandidate, ProviderId};
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Position of a candidate relative to the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateTier {
    Primary,
    SameProvider,
    CrossProvider,
}

impl CandidateTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateTier::Primary => "primary",
            CandidateTier::SameProvider => "same_provider",
            CandidateTier::CrossProvider => "cross_provider",
        }
    }
}

/// Models of another provider to try once the primary provider is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossProviderFallback {
    pub provider: ProviderId,
    pub models: Vec<String>,
}

/// Explicit per-provider model selection.
///
/// Replaces ambient lookups: two runs holding different settings never
/// interfere with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub provider: ProviderId,
    pub default_model: String,
    #[serde(default)]
    pub fallback_models: Vec<String>,
    #[serde(default)]
    pub cross_provider: Vec<CrossProviderFallback>,
}

impl ProviderSettings {
    pub fn new(provider: ProviderId, default_model: impl Into<String>) -> Self {
        Self {
            provider,
            default_model: default_model.into(),
            fallback_models: Vec::new(),
            cross_provider: Vec::new(),
        }
    }

    /// Settings with the stock default model and no fallbacks.
    pub fn builtin(provider: ProviderId) -> Self {
        let model = default_model_for(&provider);
        Self::new(provider, model)
    }

    pub fn with_fallback_models(mut self, models: Vec<String>) -> Self {
        self.fallback_models = models;
        self
    }

    pub fn with_cross_provider(mut self, provider: ProviderId, models: Vec<String>) -> Self {
        self.cross_provider
            .push(CrossProviderFallback { provider, models });
        self
    }

    /// Build the chain, optionally replacing the primary model.
    pub fn chain(&self, model_override: Option<&str>) -> Result<FallbackChain, DomainError> {
        let primary = model_override.unwrap_or(&self.default_model);
        let mut builder = FallbackChain::builder(self.provider.clone(), primary)
            .same_provider(self.fallback_models.iter().cloned());
        for cross in &self.cross_provider {
            builder = builder.cross_provider(cross.provider.clone(), cross.models.iter().cloned());
        }
        builder.build()
    }
}

/// Stock default model for a provider.
pub fn default_model_for(provider: &ProviderId) -> String {
    match provider {
        ProviderId::Bedrock => "us.anthropic.claude-sonnet-4-20250514-v1:0",
        ProviderId::OpenAi => "gpt-4.1-mini",
        ProviderId::Anthropic => "claude-3-5-sonnet-20241022",
        ProviderId::OpenRouter => "moonshotai/kimi-k2",
        ProviderId::Vertex => "gemini-2.5-flash",
        ProviderId::Custom(_) => "default",
    }
    .to_string()
}

/// Immutable ordered list of candidates: primary, same-provider fallbacks,
/// then cross-provider fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackChain {
    candidates: Vec<ModelCandidate>,
}

impl FallbackChain {
    pub fn builder(provider: ProviderId, model: impl Into<String>) -> FallbackChainBuilder {
        FallbackChainBuilder {
            primary: ModelCandidate::new(provider, model),
            same_provider: Vec::new(),
            cross_provider: Vec::new(),
        }
    }

    /// A chain with a single candidate.
    pub fn single(candidate: ModelCandidate) -> Self {
        Self {
            candidates: vec![candidate],
        }
    }

    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    pub fn primary(&self) -> &ModelCandidate {
        // Construction guarantees at least one candidate
        &self.candidates[0]
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelCandidate> {
        self.candidates.iter()
    }

    pub fn tier_of(&self, index: usize) -> Option<CandidateTier> {
        let candidate = self.candidates.get(index)?;
        Some(if index == 0 {
            CandidateTier::Primary
        } else if candidate.provider == self.primary().provider {
            CandidateTier::SameProvider
        } else {
            CandidateTier::CrossProvider
        })
    }
}

/// Builder for [`FallbackChain`].
#[derive(Debug, Clone)]
pub struct FallbackChainBuilder {
    primary: ModelCandidate,
    same_provider: Vec<String>,
    cross_provider: Vec<ModelCandidate>,
}

impl FallbackChainBuilder {
    pub fn same_provider<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.same_provider.extend(models.into_iter().map(Into::into));
        self
    }

    pub fn cross_provider<I, S>(mut self, provider: ProviderId, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cross_provider.extend(
            models
                .into_iter()
                .map(|m| ModelCandidate::new(provider.clone(), m)),
        );
        self
    }

    /// Finish the chain.
    ///
    /// Model names are trimmed; blank fallback names are skipped and
    /// duplicates keep their first position. A blank primary is an error.
    pub fn build(self) -> Result<FallbackChain, DomainError> {
        let primary_model = self.primary.model.trim().to_string();
        if primary_model.is_empty() {
            return Err(DomainError::InvalidModel(format!(
                "empty primary model for provider '{}'",
                self.primary.provider
            )));
        }
        let primary_provider = self.primary.provider.clone();

        let mut candidates = vec![ModelCandidate::new(primary_provider.clone(), primary_model)];
        let rest = self
            .same_provider
            .into_iter()
            .map(|m| ModelCandidate::new(primary_provider.clone(), m))
            .chain(self.cross_provider);

        for mut candidate in rest {
            candidate.model = candidate.model.trim().to_string();
            if candidate.model.is_empty() || candidates.contains(&candidate) {
                continue;
            }
            candidates.push(candidate);
        }

        Ok(FallbackChain { candidates })
    }
}
