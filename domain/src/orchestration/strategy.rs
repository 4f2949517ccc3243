//! Iteration strategies.
//!
//! The iteration range is split into three contiguous bands. Early
//! iterations explore, middle ones refine, late ones finish the job:
//!
//! | Band | Default share | max = 10 |
//! |------|---------------|----------|
//! | [`StrategyKind::Discovery`] | first 30% | 1-3 |
//! | [`StrategyKind::Refinement`] | next 30% | 4-6 |
//! | [`StrategyKind::Completion`] | remaining 40% | 7-10 |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::orchestration::phase::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Discovery,
    Refinement,
    Completion,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::Discovery => "discovery",
            StrategyKind::Refinement => "refinement",
            StrategyKind::Completion => "completion",
        };
        write!(f, "{}", s)
    }
}

/// Behavioral parameters for one iteration (Value Object).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationStrategy {
    pub kind: StrategyKind,
    pub name: &'static str,
    pub focus: &'static str,
    pub stopping_question: &'static str,
    planning: &'static str,
    execution: &'static str,
    validation: &'static str,
    writing: &'static str,
}

const DISCOVERY: IterationStrategy = IterationStrategy {
    kind: StrategyKind::Discovery,
    name: "Optimization & Method Discovery",
    focus: "Find the best possible methods and approaches",
    stopping_question: "Have we discovered the best possible methods for all critical steps?",
    planning: "Creating exploration plan to discover optimal methods",
    execution: "Exploring and discovering optimal methods for each step",
    validation: "Validating discovered methods and approaches",
    writing: "Writing deliverables based on discovered optimal methods",
};

const REFINEMENT: IterationStrategy = IterationStrategy {
    kind: StrategyKind::Refinement,
    name: "Refinement & Validation",
    focus: "Refine the best methods and validate they work consistently",
    stopping_question: "Have we validated that our optimal methods work consistently?",
    planning: "Refining plan based on proven optimal methods",
    execution: "Testing and validating optimal methods",
    validation: "Validating method reliability and reproducibility",
    writing: "Updating deliverables with validated optimal methods",
};

const COMPLETION: IterationStrategy = IterationStrategy {
    kind: StrategyKind::Completion,
    name: "Completion & Execution",
    focus: "Complete the remaining steps using proven optimal methods",
    stopping_question: "Have we completed the objective using optimal methods?",
    planning: "Finalizing plan with proven optimal methods",
    execution: "Executing remaining steps using proven optimal methods",
    validation: "Validating completion of remaining steps",
    writing: "Finalizing deliverables with proven optimal methods",
};

impl IterationStrategy {
    pub fn of(kind: StrategyKind) -> IterationStrategy {
        match kind {
            StrategyKind::Discovery => DISCOVERY,
            StrategyKind::Refinement => REFINEMENT,
            StrategyKind::Completion => COMPLETION,
        }
    }

    /// One-line intent for a phase under this strategy.
    pub fn phase_intent(&self, phase: Phase) -> &'static str {
        match phase {
            Phase::Planning => self.planning,
            Phase::Execution => self.execution,
            Phase::Validation => self.validation,
            Phase::Writing => self.writing,
            Phase::Critique | Phase::Cleanup => self.focus,
        }
    }
}

/// Band boundaries as fractions of the iteration budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyBands {
    pub discovery: f64,
    pub refinement: f64,
}

impl Default for StrategyBands {
    fn default() -> Self {
        Self {
            discovery: 0.3,
            refinement: 0.3,
        }
    }
}

impl StrategyBands {
    pub fn new(discovery: f64, refinement: f64) -> Self {
        Self {
            discovery,
            refinement,
        }
    }

    /// Both shares positive and leaving room for the completion band.
    pub fn is_valid(&self) -> bool {
        self.discovery > 0.0 && self.refinement > 0.0 && self.discovery + self.refinement < 1.0
    }

    /// Last iteration of the discovery band and of the refinement band.
    ///
    /// With `max >= 3` every band holds at least one iteration.
    pub fn boundaries(&self, max_iterations: u32) -> (u32, u32) {
        let bands = if self.is_valid() { *self } else { Self::default() };
        let max = max_iterations.max(1);
        let scaled = |fraction: f64| ((fraction * f64::from(max)) - 1e-9).ceil().max(0.0) as u32;

        match max {
            1 => (0, 0),
            2 => (1, 1),
            _ => {
                let discovery_end = scaled(bands.discovery).clamp(1, max - 2);
                let refinement_end =
                    scaled(bands.discovery + bands.refinement).clamp(discovery_end + 1, max - 1);
                (discovery_end, refinement_end)
            }
        }
    }

    /// Strategy for `iteration` (1-based; 0 is treated as 1).
    pub fn select(&self, iteration: u32, max_iterations: u32) -> IterationStrategy {
        let (discovery_end, refinement_end) = self.boundaries(max_iterations);
        let iteration = iteration.max(1);
        let kind = if iteration <= discovery_end {
            StrategyKind::Discovery
        } else if iteration <= refinement_end {
            StrategyKind::Refinement
        } else {
            StrategyKind::Completion
        };
        IterationStrategy::of(kind)
    }
}

/// Strategy for `iteration` using the default bands.
pub fn select_strategy(iteration: u32, max_iterations: u32) -> IterationStrategy {
    StrategyBands::default().select(iteration, max_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(max: u32) -> Vec<StrategyKind> {
        (1..=max).map(|i| select_strategy(i, max).kind).collect()
    }

    #[test]
    fn test_default_bands_for_ten() {
        use StrategyKind::*;
        assert_eq!(
            kinds(10),
            vec![
                Discovery, Discovery, Discovery, Refinement, Refinement, Refinement, Completion,
                Completion, Completion, Completion
            ]
        );
    }

    #[test]
    fn test_bands_are_contiguous_for_any_max() {
        for max in 3..=40 {
            let ks = kinds(max);
            assert_eq!(ks.first(), Some(&StrategyKind::Discovery), "max {}", max);
            assert_eq!(ks.last(), Some(&StrategyKind::Completion), "max {}", max);
            assert!(ks.contains(&StrategyKind::Refinement), "max {}", max);
            // never goes backwards
            let rank = |k: &StrategyKind| match k {
                StrategyKind::Discovery => 0,
                StrategyKind::Refinement => 1,
                StrategyKind::Completion => 2,
            };
            assert!(ks.windows(2).all(|w| rank(&w[0]) <= rank(&w[1])));
        }
    }

    #[test]
    fn test_select_is_pure() {
        for max in 1..=12 {
            for i in 0..=max + 2 {
                assert_eq!(select_strategy(i, max).name, select_strategy(i, max).name);
            }
        }
    }

    #[test]
    fn test_small_budgets() {
        assert_eq!(kinds(1), vec![StrategyKind::Completion]);
        assert_eq!(
            kinds(2),
            vec![StrategyKind::Discovery, StrategyKind::Completion]
        );
        assert_eq!(
            kinds(3),
            vec![
                StrategyKind::Discovery,
                StrategyKind::Refinement,
                StrategyKind::Completion
            ]
        );
    }

    #[test]
    fn test_out_of_range_iterations() {
        assert_eq!(select_strategy(0, 10).kind, StrategyKind::Discovery);
        assert_eq!(select_strategy(15, 10).kind, StrategyKind::Completion);
    }

    #[test]
    fn test_custom_bands() {
        let bands = StrategyBands::new(0.5, 0.25);
        assert_eq!(bands.boundaries(8), (4, 6));
        // invalid shares fall back to defaults
        assert_eq!(StrategyBands::new(0.8, 0.5).boundaries(10), (3, 6));
    }

    #[test]
    fn test_strategy_texts() {
        let s = select_strategy(1, 10);
        assert_eq!(s.name, "Optimization & Method Discovery");
        assert!(s.stopping_question.ends_with('?'));
        assert_eq!(
            s.phase_intent(Phase::Planning),
            "Creating exploration plan to discover optimal methods"
        );
    }
}
