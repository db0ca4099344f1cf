//! StableSwap invariant solver (`get_D`)
//!
//! Solves `Ann*S + D_P*n = Ann*D + (n+1)*D_P` for `D` with Newton's method,
//! where `S = sum(xp)`, `Ann = amp * n` and `D_P = D^(n+1) / (n^n * prod(xp))`
//! is folded one asset at a time. All arithmetic is truncating `U256`.

use crate::config::{SolverConfig, CONVERGENCE_TOLERANCE};
use crate::errors::{Result, StableSwapError};
use crate::fixed_point::{self, abs_diff};
use ethereum_types::U256;
use tracing::{trace, warn};

/// Outcome of a Newton solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    /// Last computed value
    pub value: U256,
    /// Iterations actually run (0 for the empty-pool shortcut)
    pub iterations: u32,
    /// Whether successive values met the 1-unit tolerance
    pub converged: bool,
}

impl Solution {
    pub(crate) fn converged(value: U256, iterations: u32) -> Self {
        Self {
            value,
            iterations,
            converged: true,
        }
    }

    /// Result came from an exhausted iteration bound
    pub fn is_degraded(&self) -> bool {
        !self.converged
    }

    /// The value, or `NonConvergence` when the bound was exhausted
    pub fn strict(self) -> Result<U256> {
        if self.converged {
            Ok(self.value)
        } else {
            Err(StableSwapError::NonConvergence {
                iterations: self.iterations,
            })
        }
    }
}

/// `|a - b| <= CONVERGENCE_TOLERANCE`
pub(crate) fn within_tolerance(a: U256, b: U256) -> bool {
    abs_diff(a, b) <= U256::from(CONVERGENCE_TOLERANCE)
}

/// Newton solver for the invariant `D`
#[derive(Debug, Clone, Copy, Default)]
pub struct InvariantSolver {
    config: SolverConfig,
}

impl InvariantSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Invariant `D` for normalized balances `xp`
    ///
    /// A non-converged result is still returned (and logged); use
    /// [`InvariantSolver::solve_d`] to inspect convergence.
    pub fn get_d(&self, xp: &[U256], amp: U256) -> Result<U256> {
        Ok(self.solve_d(xp, amp)?.value)
    }

    /// Invariant `D` with convergence details
    ///
    /// # Arguments
    /// * `xp` - Normalized balances, one per asset
    /// * `amp` - Amplification, pre-multiplied by `A_PRECISION` when the
    ///   solver is precision scaled
    ///
    /// # Errors
    /// * `DivisionByZero` - some balance is zero while the pool is not empty
    /// * `ArithmeticInvalidState` - `Ann` below the amp precision, or a zero
    ///   Newton denominator
    /// * `Overflow` - intermediate product exceeded 256 bits
    pub fn solve_d(&self, xp: &[U256], amp: U256) -> Result<Solution> {
        let s = fixed_point::sum(xp, "invariant balance sum")?;
        if s.is_zero() {
            return Ok(Solution::converged(U256::zero(), 0));
        }
        if xp.iter().any(|x| x.is_zero()) {
            return Err(StableSwapError::DivisionByZero {
                context: "invariant D_P fold over a zero balance",
            });
        }

        let n = U256::from(xp.len());
        let amp_precision = self.config.amp_precision();
        let ann = fixed_point::mul(amp, n, "invariant Ann")?;
        let ann_s = fixed_point::mul(ann, s, "invariant Ann*S")? / amp_precision;
        let ann_less_one = ann
            .checked_sub(amp_precision)
            .ok_or(StableSwapError::ArithmeticInvalidState {
                context: "invariant Ann below amp precision",
            })?;
        let n_plus_one = n + U256::one();

        let mut d = s;
        for iteration in 1..=self.config.max_iterations {
            let mut d_p = d;
            for &x in xp {
                let x_n = fixed_point::mul(x, n, "invariant D_P fold")?;
                d_p = fixed_point::mul_div(d_p, d, x_n, "invariant D_P fold")?;
            }
            let d_prev = d;

            let numerator = fixed_point::mul(
                fixed_point::add(
                    ann_s,
                    fixed_point::mul(d_p, n, "invariant numerator")?,
                    "invariant numerator",
                )?,
                d,
                "invariant numerator",
            )?;
            let denominator = fixed_point::add(
                fixed_point::mul(ann_less_one, d, "invariant denominator")? / amp_precision,
                fixed_point::mul(n_plus_one, d_p, "invariant denominator")?,
                "invariant denominator",
            )?;
            if denominator.is_zero() {
                return Err(StableSwapError::ArithmeticInvalidState {
                    context: "invariant Newton denominator is zero",
                });
            }
            d = numerator / denominator;
            trace!(iteration, d = %d, "invariant iteration");

            if within_tolerance(d, d_prev) {
                return Ok(Solution::converged(d, iteration));
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            d = %d,
            "Invariant solver did not converge, returning last value"
        );
        Ok(Solution {
            value: d,
            iterations: self.config.max_iterations,
            converged: false,
        })
    }
}
