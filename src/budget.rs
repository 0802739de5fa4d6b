//! Token Budget
//!
//! A fixed total ceiling, minus an allowance reserved for generated output, gives
//! the input allowance every outbound prompt must fit into. The allocator is the
//! single gate in front of the generation service: a prompt it rejects is never
//! sent.

use crate::error::ConfigError;
use crate::pipeline::Stage;
use std::fmt;

pub mod estimator;
pub mod truncate;

pub use estimator::{LengthEstimator, ModelFamily};
pub use truncate::truncate_to_fit;

/// Process-wide token budget. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    total_ceiling: usize,
    reserved_output: usize,
}

impl Budget {
    /// Build a budget; refuses configurations that leave no room for input.
    pub fn new(total_ceiling: usize, reserved_output: usize) -> Result<Self, ConfigError> {
        if total_ceiling <= reserved_output {
            return Err(ConfigError::Invalid(vec![format!(
                "budget: total_ceiling ({}) must exceed reserved_output ({})",
                total_ceiling, reserved_output
            )]));
        }
        Ok(Self {
            total_ceiling,
            reserved_output,
        })
    }

    pub fn total_ceiling(&self) -> usize {
        self.total_ceiling
    }

    pub fn reserved_output(&self) -> usize {
        self.reserved_output
    }

    /// Input allowance: `total_ceiling - reserved_output`, always > 0.
    pub fn remaining_input(&self) -> usize {
        self.total_ceiling - self.reserved_output
    }
}

/// A prompt that fits, with its estimated cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub cost: usize,
}

/// A prompt that does not fit the input allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetRejection {
    pub stage: Stage,
    pub cost: usize,
    pub limit: usize,
}

impl fmt::Display for BudgetRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} prompt costs {} tokens, limit is {}",
            self.stage, self.cost, self.limit
        )
    }
}

impl From<BudgetRejection> for crate::error::PipelineError {
    fn from(rejection: BudgetRejection) -> Self {
        crate::error::PipelineError::BudgetExceeded {
            stage: rejection.stage,
            cost: rejection.cost,
            limit: rejection.limit,
        }
    }
}

/// Checks candidate prompts against the budget. Stateless: every check is
/// independent and side-effect free.
#[derive(Debug, Clone, Copy)]
pub struct BudgetAllocator {
    budget: Budget,
    estimator: LengthEstimator,
}

impl BudgetAllocator {
    pub fn new(budget: Budget, estimator: LengthEstimator) -> Self {
        Self { budget, estimator }
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn estimator(&self) -> &LengthEstimator {
        &self.estimator
    }

    pub fn check(&self, text: &str, stage: Stage) -> Result<Admission, BudgetRejection> {
        let cost = self.estimator.estimate(text);
        let limit = self.budget.remaining_input();
        if cost > limit {
            Err(BudgetRejection { stage, cost, limit })
        } else {
            Ok(Admission { cost })
        }
    }

    /// Input allowance left for context once `wrapper` (the prompt around it) is paid for.
    pub fn context_limit(&self, wrapper: &str) -> usize {
        self.budget
            .remaining_input()
            .saturating_sub(self.estimator.estimate(wrapper))
    }

    /// Cut `context` so it fits next to `wrapper`. Only cuts when it does not fit.
    pub fn fit_context<'a>(&self, context: &'a str, wrapper: &str) -> &'a str {
        truncate_to_fit(&self.estimator, context, self.context_limit(wrapper))
    }
}
