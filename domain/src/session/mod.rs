//! Model conversation: requests, raw responses, usage and shape validation.

pub mod entities;
pub mod response;
pub mod usage;
pub mod validation;
