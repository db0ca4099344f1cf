//! StableSwap swap solver (`get_y`)
//!
//! Holds the invariant fixed and solves for the new balance of the output
//! asset once the input asset's balance changes. `y` is the root of
//! `y^2 + (b - D) * y = c`, found with Newton's method from `y = D`.

use crate::config::{FeeConfig, SolverConfig};
use crate::errors::{Result, StableSwapError};
use crate::fixed_point;
use crate::invariant::{within_tolerance, InvariantSolver, Solution};
use ethereum_types::U256;
use tracing::{debug, trace, warn};

/// Result of a quoted exchange, in normalized units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    /// Output after the swap fee
    pub amount_out: U256,
    /// Fee withheld from the output; stays in the pool
    pub fee: U256,
    /// New normalized balance of the output asset before fees (`y`)
    pub new_y: U256,
}

/// Newton solver for the output balance `y`
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapSolver {
    invariant: InvariantSolver,
}

impl SwapSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            invariant: InvariantSolver::new(config),
        }
    }

    /// New normalized balance of asset `j` after asset `i` moves to `x`
    pub fn get_y(&self, i: usize, j: usize, x: U256, xp: &[U256], amp: U256) -> Result<U256> {
        Ok(self.solve_y(i, j, x, xp, amp)?.value)
    }

    /// `get_y` with convergence details
    ///
    /// # Arguments
    /// * `i` - Index of the asset supplied to the pool
    /// * `j` - Index of the asset taken from the pool
    /// * `x` - New normalized balance of asset `i` (`xp[i] + dx`)
    /// * `xp` - Current normalized balances
    /// * `amp` - Amplification in the solver's precision mode
    pub fn solve_y(
        &self,
        i: usize,
        j: usize,
        x: U256,
        xp: &[U256],
        amp: U256,
    ) -> Result<Solution> {
        let n_assets = xp.len();
        if i == j {
            return Err(StableSwapError::precondition(format!(
                "swap input and output are the same asset ({i})"
            )));
        }
        if n_assets < 2 {
            return Err(StableSwapError::precondition(format!(
                "swap needs at least 2 assets, got {n_assets}"
            )));
        }
        if i >= n_assets || j >= n_assets {
            return Err(StableSwapError::precondition(format!(
                "asset index out of range: i={i}, j={j}, n={n_assets}"
            )));
        }

        let config = self.invariant.config();
        let d = self.invariant.get_d(xp, amp)?;
        let n = U256::from(n_assets);
        let amp_precision = config.amp_precision();
        let ann = fixed_point::mul(amp, n, "swap Ann")?;

        let mut c = d;
        let mut s = U256::zero();
        for (k, &balance) in xp.iter().enumerate() {
            if k == j {
                continue;
            }
            let x_k = if k == i { x } else { balance };
            if x_k.is_zero() {
                return Err(StableSwapError::DivisionByZero {
                    context: "swap c fold over a zero balance",
                });
            }
            s = fixed_point::add(s, x_k, "swap balance sum")?;
            let x_k_n = fixed_point::mul(x_k, n, "swap c fold")?;
            c = fixed_point::mul_div(c, d, x_k_n, "swap c fold")?;
        }

        let ann_n = fixed_point::mul(ann, n, "swap c")?;
        c = fixed_point::mul_div(
            fixed_point::mul(c, d, "swap c")?,
            amp_precision,
            ann_n,
            "swap c",
        )?;
        let b = fixed_point::add(
            s,
            fixed_point::mul_div(d, amp_precision, ann, "swap b")?,
            "swap b",
        )?;

        let mut y = d;
        for iteration in 1..=config.max_iterations {
            let y_prev = y;
            let numerator = fixed_point::add(
                fixed_point::mul(y, y, "swap numerator")?,
                c,
                "swap numerator",
            )?;
            let two_y_b = fixed_point::add(
                fixed_point::mul(y, U256::from(2), "swap denominator")?,
                b,
                "swap denominator",
            )?;
            let denominator = match two_y_b.checked_sub(d) {
                Some(den) if !den.is_zero() => den,
                _ => {
                    return Err(StableSwapError::ArithmeticInvalidState {
                        context: "swap Newton denominator is not positive",
                    })
                }
            };
            y = numerator / denominator;
            trace!(iteration, y = %y, "swap iteration");

            if within_tolerance(y, y_prev) {
                return Ok(Solution::converged(y, iteration));
            }
        }

        warn!(
            max_iterations = config.max_iterations,
            y = %y,
            "Swap solver did not converge, returning last value"
        );
        Ok(Solution {
            value: y,
            iterations: config.max_iterations,
            converged: false,
        })
    }

    /// Quote swapping `dx` (normalized) of asset `i` for asset `j`
    ///
    /// Output is `xp[j] - y` less the flat swap fee.
    pub fn exchange(
        &self,
        i: usize,
        j: usize,
        dx: U256,
        xp: &[U256],
        amp: U256,
        fees: &FeeConfig,
    ) -> Result<SwapQuote> {
        fees.validate()?;
        // solve_y checks indices too, but only after xp[i] is read here
        let x_i = *xp.get(i).ok_or_else(|| {
            StableSwapError::precondition(format!(
                "asset index out of range: i={i}, n={}",
                xp.len()
            ))
        })?;
        let x = fixed_point::add(x_i, dx, "swap input balance")?;
        let y = self.get_y(i, j, x, xp, amp)?;
        let dy = xp[j]
            .checked_sub(y)
            .ok_or(StableSwapError::ArithmeticInvalidState {
                context: "swap output balance above current balance",
            })?;

        let fee = fixed_point::mul_div(
            dy,
            U256::from(fees.swap_fee),
            U256::from(fees.fee_denominator),
            "swap fee",
        )?;
        let amount_out = fixed_point::sub(dy, fee, "swap fee")?;

        debug!(i, j, dx = %dx, amount_out = %amount_out, fee = %fee, "Quoted exchange");
        Ok(SwapQuote {
            amount_out,
            fee,
            new_y: y,
        })
    }
}
