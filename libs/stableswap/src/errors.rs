//! Error types for StableSwap curve math
//!
//! Every failure is reported to the immediate caller. Nothing in this crate
//! retries: the core is pure computation, so there are no transient errors.

use ethereum_types::U256;
use thiserror::Error;

/// Errors raised by the invariant solvers, fee model and pool accounting
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StableSwapError {
    /// Caller bug: bad asset index, mismatched lengths, out-of-range asset count
    #[error("Precondition violated: {reason}")]
    PreconditionViolation { reason: String },

    /// A zero balance reached a divisor that must be non-zero
    #[error("Division by zero in {context}")]
    DivisionByZero { context: &'static str },

    /// Newton iteration or balance update reached a state with no valid result
    #[error("Invalid arithmetic state: {context}")]
    ArithmeticInvalidState { context: &'static str },

    /// Deposit did not grow the invariant
    #[error("Invariant did not increase: D0={d0}, D1={d1}")]
    InvariantNotIncreased { d0: U256, d1: U256 },

    /// Caller-supplied pool state is inconsistent
    #[error("Invalid pool state: {reason}")]
    InvalidPoolState { reason: String },

    /// Solver exhausted its iteration bound (only raised on strict request)
    #[error("Solver did not converge within {iterations} iterations")]
    NonConvergence { iterations: u32 },

    /// Checked 256-bit arithmetic or narrowing conversion overflowed
    #[error("Arithmetic overflow in {context}")]
    Overflow { context: &'static str },

    /// Pool or solver configuration rejected
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl StableSwapError {
    pub(crate) fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, StableSwapError>;
