//! Configuration value objects shared by the config loader and its callers.

pub mod validation;
