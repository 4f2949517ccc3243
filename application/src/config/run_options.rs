//! Run options: per-run loop control and model selection.
//!
//! [`RunOptions`] is passed into every run explicitly. Nothing here is read
//! from process state, so concurrent runs may use different settings.

use cadence_domain::approval::DEFAULT_MAX_REVISIONS;
use cadence_domain::orchestration::retry::DEFAULT_MAX_ATTEMPTS;
use cadence_domain::{AgentRole, ApprovalPoint, FallbackChain, StrategyBands};
use std::collections::BTreeMap;

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Fallback chain per agent role, with a default for roles not listed.
#[derive(Debug, Clone)]
pub struct RoleChains {
    default: FallbackChain,
    overrides: BTreeMap<AgentRole, FallbackChain>,
}

impl RoleChains {
    pub fn new(default: FallbackChain) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, role: AgentRole, chain: FallbackChain) -> Self {
        self.overrides.insert(role, chain);
        self
    }

    pub fn for_role(&self, role: AgentRole) -> &FallbackChain {
        self.overrides.get(&role).unwrap_or(&self.default)
    }

    pub fn default_chain(&self) -> &FallbackChain {
        &self.default
    }

    pub fn has_override(&self, role: AgentRole) -> bool {
        self.overrides.contains_key(&role)
    }
}

/// Sampling parameters applied to agent steps.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

/// Options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_iterations: u32,
    /// Attempt budget for the execution retry loop.
    pub max_step_attempts: u32,
    pub max_approval_revisions: u32,
    pub approval: ApprovalPoint,
    pub bands: StrategyBands,
    pub generation: GenerationParams,
    pub chains: RoleChains,
}

impl RunOptions {
    pub fn new(chains: RoleChains) -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_step_attempts: DEFAULT_MAX_ATTEMPTS,
            max_approval_revisions: DEFAULT_MAX_REVISIONS,
            approval: ApprovalPoint::default(),
            bands: StrategyBands::default(),
            generation: GenerationParams::default(),
            chains,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_step_attempts(mut self, max: u32) -> Self {
        self.max_step_attempts = max;
        self
    }

    pub fn with_max_approval_revisions(mut self, max: u32) -> Self {
        self.max_approval_revisions = max;
        self
    }

    pub fn with_approval(mut self, approval: ApprovalPoint) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_bands(mut self, bands: StrategyBands) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_generation(mut self, generation: GenerationParams) -> Self {
        self.generation = generation;
        self
    }

    pub fn chain_for(&self, role: AgentRole) -> &FallbackChain {
        self.chains.for_role(role)
    }
}
