//! Fallback chains and failure classification.

pub mod chain;
pub mod classification;
