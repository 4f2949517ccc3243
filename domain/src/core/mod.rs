//! Core domain concepts shared across all subdomains.
//!
//! - [`candidate::ProviderId`] / [`candidate::ModelCandidate`]: who serves a model call
//! - [`error::DomainError`]: domain-level errors
//! - [`string`]: UTF-8 safe text helpers

pub mod candidate;
pub mod error;
pub mod string;
