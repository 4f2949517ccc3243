//! Canonical token accounting.
//!
//! Every provider reports usage under different field names. Adapters at the
//! provider boundary convert their wire shape into [`TokenUsage`]; nothing
//! downstream inspects provider-specific fields.

use serde::{Deserialize, Serialize};

/// Token counters for one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// Fractional discount applied for cached prompt tokens (OpenRouter style).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
}

impl TokenUsage {
    /// Build usage from raw counters. A missing or zero total becomes input + output.
    pub fn new(input_tokens: u64, output_tokens: u64, total_tokens: Option<u64>) -> Self {
        let total_tokens = match total_tokens {
            Some(total) if total > 0 => total,
            _ => input_tokens + output_tokens,
        };
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            ..Self::default()
        }
    }

    pub fn with_cache_discount(mut self, discount: Option<f64>) -> Self {
        self.cache_discount = discount;
        self
    }

    pub fn with_cached_tokens(mut self, cached: Option<u64>) -> Self {
        self.cached_tokens = cached.filter(|n| *n > 0);
        self
    }

    pub fn with_reasoning_tokens(mut self, reasoning: Option<u64>) -> Self {
        self.reasoning_tokens = reasoning.filter(|n| *n > 0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }

    /// Sum counters from another call into this one.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        if let Some(n) = other.cached_tokens {
            *self.cached_tokens.get_or_insert(0) += n;
        }
        if let Some(n) = other.reasoning_tokens {
            *self.reasoning_tokens.get_or_insert(0) += n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_computed_when_missing() {
        assert_eq!(TokenUsage::new(10, 5, None).total_tokens, 15);
        assert_eq!(TokenUsage::new(10, 5, Some(0)).total_tokens, 15);
        assert_eq!(TokenUsage::new(10, 5, Some(20)).total_tokens, 20);
    }

    #[test]
    fn test_zero_optional_counters_are_dropped() {
        let usage = TokenUsage::new(1, 1, None)
            .with_cached_tokens(Some(0))
            .with_reasoning_tokens(Some(7));
        assert_eq!(usage.cached_tokens, None);
        assert_eq!(usage.reasoning_tokens, Some(7));
    }

    #[test]
    fn test_accumulate() {
        let mut total = TokenUsage::default();
        total.accumulate(&TokenUsage::new(3, 2, None).with_reasoning_tokens(Some(4)));
        total.accumulate(&TokenUsage::new(1, 1, None));
        assert_eq!(total.input_tokens, 4);
        assert_eq!(total.total_tokens, 7);
        assert_eq!(total.reasoning_tokens, Some(4));
        assert!(!total.is_empty());
    }
}
