//! Interactive approval from the terminal.
//!
//! When the pipeline asks for approval the user sees:
//!
//! ```text
//! ═══════════════════════════════════════════════════════════════
//!   Approval Requested: plan_approval (attempt 2/5)
//! ═══════════════════════════════════════════════════════════════
//!
//! Revised with feedback:
//!   cover the rollback path too
//!
//! <artifact>
//!
//! Commands:
//!   /approve          - Continue with this artifact
//!   /revise <notes>   - Ask for a revision (plain text works too)
//!   /quit             - Cancel the run
//!
//! approval>
//! ```
//!
//! | Command | Aliases | Description |
//! |---------|---------|-------------|
//! | `/approve` | `approve`, `a`, `y` | Accept the artifact |
//! | `/revise <notes>` | any other text | Revise with the given feedback |
//! | `/quit` | `quit`, `q` | Cancel the run |

use async_trait::async_trait;
use cadence_application::ports::human_channel::{HumanChannel, HumanChannelError};
use cadence_domain::{ApprovalRequest, ApprovalResponse};
use colored::Colorize;
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";

/// What one line of input means.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Approve,
    Revise(String),
    Quit,
    /// `/revise` without notes
    MissingFeedback,
    Empty,
}

fn parse_command(input: &str) -> Command {
    let input = input.trim();
    let lower = input.to_lowercase();
    match lower.as_str() {
        "" => Command::Empty,
        "/approve" | "approve" | "a" | "y" | "yes" => Command::Approve,
        "/quit" | "quit" | "q" => Command::Quit,
        "/revise" | "revise" | "r" => Command::MissingFeedback,
        _ => {
            let feedback = input
                .strip_prefix("/revise ")
                .or_else(|| input.strip_prefix("/revise\t"))
                .unwrap_or(input)
                .trim();
            Command::Revise(feedback.to_string())
        }
    }
}

/// Terminal-based [`HumanChannel`].
///
/// Reads stdin on a blocking thread so the surrounding run stays
/// cancellable while the prompt waits.
pub struct ConsoleHumanChannel;

impl ConsoleHumanChannel {
    pub fn new() -> Self {
        Self
    }

    fn display_request(request: &ApprovalRequest) {
        println!();
        println!("{}", RULE.yellow().bold());
        println!(
            "{}",
            format!(
                "  Approval Requested: {} (attempt {}/{})",
                request.kind, request.attempt, request.max_attempts
            )
            .yellow()
            .bold()
        );
        println!("{}", RULE.yellow().bold());
        println!();

        if let Some(feedback) = &request.prior_feedback {
            println!("{}", "Revised with feedback:".cyan().bold());
            println!("  {}", feedback.dimmed());
            println!();
        }

        println!("{}", request.artifact.trim_end());
        println!();

        println!("{}", "Commands:".cyan().bold());
        println!("  {}          - Continue with this artifact", "/approve".green());
        println!(
            "  {}   - Ask for a revision (plain text works too)",
            "/revise <notes>".yellow()
        );
        println!("  {}             - Cancel the run", "/quit".red());
        println!();
    }

    /// Read user command
    async fn read_line() -> Result<String, HumanChannelError> {
        tokio::task::spawn_blocking(|| {
            print!("{} ", "approval>".magenta().bold());
            io::stdout().flush().map_err(|e| {
                HumanChannelError::IoError(format!("Failed to flush stdout: {}", e))
            })?;

            let mut input = String::new();
            let read = io::stdin()
                .read_line(&mut input)
                .map_err(|e| HumanChannelError::IoError(format!("Failed to read input: {}", e)))?;
            if read == 0 {
                return Err(HumanChannelError::IoError("stdin closed".to_string()));
            }
            Ok(input)
        })
        .await
        .map_err(|e| HumanChannelError::IoError(format!("Input task failed: {}", e)))?
    }
}

impl Default for ConsoleHumanChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HumanChannel for ConsoleHumanChannel {
    async fn request(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalResponse, HumanChannelError> {
        Self::display_request(request);

        loop {
            let input = Self::read_line().await?;

            match parse_command(&input) {
                Command::Approve => {
                    println!();
                    println!("{}", "✓ Approved".green());
                    return Ok(ApprovalResponse::approve(&request.id));
                }
                Command::Revise(feedback) => {
                    println!();
                    println!("{}", "↻ Revision requested".yellow());
                    return Ok(ApprovalResponse::revise(&request.id, feedback));
                }
                Command::Quit => return Err(HumanChannelError::Cancelled),
                Command::MissingFeedback => {
                    println!("Describe what should change, e.g. {}", "/revise add tests".yellow());
                }
                Command::Empty => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_approve_aliases() {
        for input in ["/approve", "approve", "A", " y \n"] {
            assert_eq!(parse_command(input), Command::Approve, "{input}");
        }
    }

    #[test]
    fn test_parse_revise_with_notes() {
        assert_eq!(
            parse_command("/revise cover the rollback path\n"),
            Command::Revise("cover the rollback path".into())
        );
        assert_eq!(
            parse_command("Needs a timeline"),
            Command::Revise("Needs a timeline".into())
        );
        assert_eq!(parse_command("/revise"), Command::MissingFeedback);
    }

    #[test]
    fn test_parse_quit_and_empty() {
        assert_eq!(parse_command("q"), Command::Quit);
        assert_eq!(parse_command("   "), Command::Empty);
    }
}
