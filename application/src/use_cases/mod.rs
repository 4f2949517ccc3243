//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod agent_step;
pub mod approval_gate;
pub mod decide;
pub mod invoke_model;
pub mod retry_feedback;
pub mod run_objective;
pub(crate) mod shared;

#[cfg(test)]
pub(crate) mod testing;
