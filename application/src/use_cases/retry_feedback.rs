//! Produce → judge retry loop.
//!
//! [`RetryWithFeedback`] produces an output, asks a judge whether it passes,
//! and on failure produces again with the judge's feedback. The loop stops at
//! the first pass or when the attempt budget is spent; exhausting the budget
//! is an outcome, not an error.

use crate::ports::progress::RunProgressNotifier;
use crate::use_cases::agent_step::StepError;
use async_trait::async_trait;
use cadence_domain::core::string::headline;
use cadence_domain::orchestration::retry::DEFAULT_MAX_ATTEMPTS;
use cadence_domain::{AttemptRecord, Phase, RetryOutcome, Verdict};
use tracing::{debug, info, warn};

/// Produces one attempt. `feedback` holds the previous failed verdict.
#[async_trait]
pub trait AttemptProducer: Send + Sync {
    type Output: Send + Sync;

    async fn produce(&self, attempt: u32, feedback: Option<&str>) -> Result<Self::Output, StepError>;

    /// One-line description for logs.
    fn summarize(&self, _output: &Self::Output) -> String {
        String::new()
    }
}

/// Judges one produced output.
#[async_trait]
pub trait AttemptJudge<T: Send + Sync>: Send + Sync {
    async fn judge(&self, output: &T) -> Result<Verdict, StepError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryWithFeedback {
    max_attempts: u32,
}

impl Default for RetryWithFeedback {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryWithFeedback {
    /// A budget of 0 is treated as 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the loop for `phase`.
    ///
    /// A production or judging error counts as a failed attempt unless it is
    /// fatal (cancellation, configuration), which is returned immediately.
    pub async fn run<P, J>(
        &self,
        phase: Phase,
        producer: &P,
        judge: &J,
        progress: &dyn RunProgressNotifier,
    ) -> Result<RetryOutcome<P::Output>, StepError>
    where
        P: AttemptProducer + ?Sized,
        J: AttemptJudge<P::Output> + ?Sized,
    {
        let mut last_output: Option<P::Output> = None;
        let mut previous: Option<AttemptRecord> = None;

        for attempt in 1..=self.max_attempts {
            if let Some(record) = &previous {
                progress.on_step_retry(phase, attempt, self.max_attempts, &record.verdict.feedback);
            }
            let feedback = previous.as_ref().map(|r| r.feedback_block());

            let record = match producer.produce(attempt, feedback.as_deref()).await {
                Ok(output) => {
                    let summary = producer.summarize(&output);
                    let verdict = match judge.judge(&output).await {
                        Ok(verdict) => verdict,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            warn!("{} attempt {}: judge failed: {}", phase, attempt, e);
                            Verdict::fail(format!("The output could not be judged: {}", e))
                        }
                    };
                    last_output = Some(output);
                    AttemptRecord {
                        attempt,
                        summary,
                        verdict,
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{} attempt {}: production failed: {}", phase, attempt, e);
                    AttemptRecord {
                        attempt,
                        summary: headline(&e.to_string(), 120),
                        verdict: Verdict::fail(format!("The previous attempt failed: {}", e)),
                    }
                }
            };

            if record.verdict.passed {
                info!("{} passed on attempt {}/{}", phase, attempt, self.max_attempts);
                return Ok(RetryOutcome {
                    output: last_output,
                    passed: true,
                    attempts: attempt,
                    feedback: record.verdict.feedback,
                });
            }

            debug!(
                "{} attempt {} rejected ({}): {}",
                phase, attempt, record.summary, record.verdict.feedback
            );
            previous = Some(record);
        }

        info!("{} did not pass within {} attempts", phase, self.max_attempts);
        Ok(RetryOutcome {
            output: last_output,
            passed: false,
            attempts: self.max_attempts,
            feedback: previous.map(|r| r.verdict.feedback).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::progress::NoRunProgress;
    use crate::use_cases::invoke_model::InvokeError;
    use std::sync::Mutex;

    /// Records the feedback passed to each attempt.
    #[derive(Default)]
    struct CountingProducer {
        feedback: Mutex<Vec<Option<String>>>,
        fail_production: bool,
    }

    impl CountingProducer {
        fn calls(&self) -> usize {
            self.feedback.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AttemptProducer for CountingProducer {
        type Output = u32;

        async fn produce(&self, attempt: u32, feedback: Option<&str>) -> Result<u32, StepError> {
            self.feedback.lock().unwrap().push(feedback.map(String::from));
            if self.fail_production {
                return Err(StepError::Invoke(InvokeError::Exhausted { failures: vec![] }));
            }
            Ok(attempt)
        }
    }

    /// Passes once the output reaches `pass_at`.
    struct ThresholdJudge {
        pass_at: u32,
    }

    #[async_trait]
    impl AttemptJudge<u32> for ThresholdJudge {
        async fn judge(&self, output: &u32) -> Result<Verdict, StepError> {
            if *output >= self.pass_at {
                Ok(Verdict::pass("good"))
            } else {
                Ok(Verdict::fail(format!("attempt {} too weak", output)))
            }
        }
    }

    #[tokio::test]
    async fn test_pass_on_third_attempt() {
        let producer = CountingProducer::default();
        let outcome = RetryWithFeedback::new(3)
            .run(Phase::Execution, &producer, &ThresholdJudge { pass_at: 3 }, &NoRunProgress)
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.output, Some(3));
        assert_eq!(producer.calls(), 3);

        let feedback = producer.feedback.lock().unwrap().clone();
        assert_eq!(feedback[0], None);
        assert_eq!(
            feedback[2].as_deref(),
            Some("## Validation Feedback (Retry Attempt 2):\nattempt 2 too weak")
        );
    }

    #[tokio::test]
    async fn test_always_failing_judge_stops_at_budget() {
        let producer = CountingProducer::default();
        let outcome = RetryWithFeedback::new(3)
            .run(Phase::Execution, &producer, &ThresholdJudge { pass_at: 99 }, &NoRunProgress)
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(producer.calls(), 3);
        assert_eq!(outcome.output, Some(3));
        assert_eq!(outcome.feedback, "attempt 3 too weak");
    }

    #[tokio::test]
    async fn test_production_errors_count_as_attempts() {
        let producer = CountingProducer {
            fail_production: true,
            ..Default::default()
        };
        let outcome = RetryWithFeedback::new(2)
            .run(Phase::Execution, &producer, &ThresholdJudge { pass_at: 1 }, &NoRunProgress)
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.output, None);
        assert_eq!(producer.calls(), 2);
        assert!(producer.feedback.lock().unwrap()[1]
            .as_deref()
            .is_some_and(|f| f.contains("The previous attempt failed")));
    }

    #[tokio::test]
    async fn test_zero_budget_runs_once() {
        let producer = CountingProducer::default();
        let outcome = RetryWithFeedback::new(0)
            .run(Phase::Execution, &producer, &ThresholdJudge { pass_at: 99 }, &NoRunProgress)
            .await
            .unwrap();
        assert_eq!(producer.calls(), 1);
        assert_eq!(outcome.attempts, 1);
    }
}
