//! Terminal approval prompts.

mod console;

pub use console::ConsoleHumanChannel;
