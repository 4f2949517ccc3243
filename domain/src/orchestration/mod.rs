//! Iterative phase orchestration domain
//!
//! Pure building blocks for the plan → execute → validate → write → critique
//! loop: phases and roles, strategy selection, run state, retry records and
//! the final report.

pub mod phase;
pub mod report;
pub mod retry;
pub mod run_state;
pub mod strategy;
