//! LP accounting for a StableSwap pool
//!
//! [`StableSwapPool`] owns one pool's configuration and its `(balances,
//! total_supply)` snapshot. Every operation computes on a copy of the
//! snapshot and commits both fields together only after all checks pass, so
//! a failed call never leaves the pool half-updated.
//!
//! Mutation goes through `&mut self`; callers sharing a pool across threads
//! must wrap it in their own lock.

use crate::config::{PoolConfig, PRECISION};
use crate::errors::{Result, StableSwapError};
use crate::fees::DynamicFeeModel;
use crate::fixed_point::{self, abs_diff};
use crate::invariant::InvariantSolver;
use crate::swap_math::SwapSolver;
use ethereum_types::U256;
use tracing::debug;

/// Mutable part of a pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolState {
    /// Raw token balances, one per asset
    pub balances: Vec<u128>,
    /// Outstanding LP tokens
    pub total_supply: u128,
}

/// Result of a deposit computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositOutcome {
    /// LP tokens to mint
    pub mint_amount: u128,
    /// Invariant before the deposit
    pub d0: U256,
    /// Invariant after the deposit, before imbalance fees
    pub d1: U256,
    /// Invariant after imbalance fees, used for minting
    pub d1_after_fees: U256,
    /// Imbalance fee burned from each asset (raw units)
    pub fees: Vec<u128>,
    /// Balances the pool holds once the deposit commits
    pub updated_balances: Vec<u128>,
}

/// Result of an exchange, in raw token units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOutcome {
    /// Amount of the output asset sent to the trader
    pub amount_out: u128,
    /// Fee retained by the pool, in the output asset
    pub fee: u128,
}

/// A StableSwap pool: configuration plus balances and LP supply
#[derive(Debug, Clone)]
pub struct StableSwapPool {
    config: PoolConfig,
    state: PoolState,
    invariant: InvariantSolver,
    swap: SwapSolver,
    fee_model: DynamicFeeModel,
}

impl StableSwapPool {
    /// Empty pool (all balances zero, no LP supply)
    pub fn new(config: PoolConfig) -> Result<Self> {
        let state = PoolState {
            balances: vec![0; config.n_assets()],
            total_supply: 0,
        };
        Self::with_state(config, state)
    }

    /// Pool restored from a host-persisted snapshot
    pub fn with_state(config: PoolConfig, state: PoolState) -> Result<Self> {
        config.validate()?;
        if state.balances.len() != config.n_assets() {
            return Err(StableSwapError::precondition(format!(
                "pool has {} assets but state holds {} balances",
                config.n_assets(),
                state.balances.len()
            )));
        }
        Ok(Self {
            invariant: InvariantSolver::new(config.solver),
            swap: SwapSolver::new(config.solver),
            fee_model: DynamicFeeModel::new(config.fees),
            config,
            state,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn balances(&self) -> &[u128] {
        &self.state.balances
    }

    pub fn total_supply(&self) -> u128 {
        self.state.total_supply
    }

    /// Normalized balances of `balances` under this pool's rates
    pub fn xp_of(&self, balances: &[u128]) -> Result<Vec<U256>> {
        fixed_point::normalize(balances, &self.config.rates, self.config.precision)
    }

    /// Current invariant
    pub fn get_d(&self) -> Result<U256> {
        let xp = self.xp_of(&self.state.balances)?;
        self.invariant.get_d(&xp, self.config.amp())
    }

    /// Value of one LP token in normalized units, scaled by 1e18
    pub fn virtual_price(&self) -> Result<U256> {
        if self.state.total_supply == 0 {
            return Err(StableSwapError::InvalidPoolState {
                reason: "virtual price of a pool without LP supply".to_string(),
            });
        }
        fixed_point::mul_div(
            self.get_d()?,
            U256::from(PRECISION),
            U256::from(self.state.total_supply),
            "virtual price",
        )
    }

    /// Compute a deposit without committing it
    ///
    /// # Errors
    /// * `PreconditionViolation` - `deposits` length differs from the asset count
    /// * `InvariantNotIncreased` - the deposit (or its fee-adjusted form) does not grow `D`
    /// * `InvalidPoolState` - LP supply exists but the invariant is zero
    /// * `DivisionByZero` - a zero balance in a pool that holds other assets
    pub fn calc_deposit(&self, deposits: &[u128]) -> Result<DepositOutcome> {
        let n = self.config.n_assets();
        if deposits.len() != n {
            return Err(StableSwapError::precondition(format!(
                "expected {n} deposit amounts, got {}",
                deposits.len()
            )));
        }
        let amp = self.config.amp();
        let old_balances = &self.state.balances;

        let d0 = self.invariant.get_d(&self.xp_of(old_balances)?, amp)?;

        let mut new_balances = old_balances
            .iter()
            .zip(deposits)
            .map(|(&balance, &amount)| {
                balance
                    .checked_add(amount)
                    .ok_or(StableSwapError::Overflow {
                        context: "deposit balance",
                    })
            })
            .collect::<Result<Vec<u128>>>()?;

        let d1 = self.invariant.get_d(&self.xp_of(&new_balances)?, amp)?;
        if d1 <= d0 {
            return Err(StableSwapError::InvariantNotIncreased { d0, d1 });
        }

        let total_supply = self.state.total_supply;
        if total_supply == 0 {
            // Bootstrap: initial LP supply is the invariant itself, no fees
            return Ok(DepositOutcome {
                mint_amount: fixed_point::to_u128(d1, "initial mint amount")?,
                d0,
                d1,
                d1_after_fees: d1,
                fees: vec![0; n],
                updated_balances: new_balances,
            });
        }
        if d0.is_zero() {
            return Err(StableSwapError::InvalidPoolState {
                reason: format!("invariant is zero with {total_supply} LP tokens outstanding"),
            });
        }

        let fee_config = &self.config.fees;
        let base_fee = fee_config.base_fee(n)?;
        let fee_denominator = U256::from(fee_config.fee_denominator);
        let ys = fixed_point::add(d0, d1, "deposit ys")? / U256::from(n);

        let mut fees = Vec::with_capacity(n);
        for (i, new_balance) in new_balances.iter_mut().enumerate() {
            let old = U256::from(old_balances[i]);
            let new = U256::from(*new_balance);

            let ideal_balance = fixed_point::mul_div(d1, old, d0, "deposit ideal balance")?;
            let difference = abs_diff(ideal_balance, new);

            let xs = fixed_point::mul_div(
                U256::from(self.config.rates[i]),
                fixed_point::add(old, new, "deposit xs")?,
                U256::from(self.config.precision),
                "deposit xs",
            )?;
            let dynamic_fee = self.fee_model.dynamic_fee(xs, ys, base_fee)?;
            let fee = fixed_point::to_u128(
                fixed_point::mul_div(dynamic_fee, difference, fee_denominator, "deposit fee")?,
                "deposit fee",
            )?;

            *new_balance = new_balance.checked_sub(fee).ok_or(
                StableSwapError::ArithmeticInvalidState {
                    context: "deposit fee exceeds balance",
                },
            )?;
            fees.push(fee);
        }

        let d1_after_fees = self.invariant.get_d(&self.xp_of(&new_balances)?, amp)?;
        if d1_after_fees <= d0 {
            return Err(StableSwapError::InvariantNotIncreased {
                d0,
                d1: d1_after_fees,
            });
        }

        let mint = fixed_point::mul_div(
            U256::from(total_supply),
            d1_after_fees - d0,
            d0,
            "mint amount",
        )?;

        Ok(DepositOutcome {
            mint_amount: fixed_point::to_u128(mint, "mint amount")?,
            d0,
            d1,
            d1_after_fees,
            fees,
            updated_balances: new_balances,
        })
    }

    /// Deposit `deposits` (raw units, one per asset) and mint LP tokens
    ///
    /// Balances become the fee-adjusted post-deposit balances and the LP
    /// supply grows by the mint amount; on error neither changes.
    pub fn add_liquidity(&mut self, deposits: &[u128]) -> Result<DepositOutcome> {
        let outcome = self.calc_deposit(deposits)?;
        let total_supply = self
            .state
            .total_supply
            .checked_add(outcome.mint_amount)
            .ok_or(StableSwapError::Overflow {
                context: "LP total supply",
            })?;

        self.state = PoolState {
            balances: outcome.updated_balances.clone(),
            total_supply,
        };

        debug!(
            mint_amount = outcome.mint_amount,
            total_supply,
            d1 = %outcome.d1_after_fees,
            "Liquidity added"
        );
        Ok(outcome)
    }

    /// Burn `lp_amount` LP tokens for a proportional share of every asset
    pub fn remove_liquidity(&mut self, lp_amount: u128) -> Result<Vec<u128>> {
        let total_supply = self.state.total_supply;
        if lp_amount == 0 || lp_amount > total_supply {
            return Err(StableSwapError::precondition(format!(
                "cannot burn {lp_amount} of {total_supply} LP tokens"
            )));
        }

        let amounts = self
            .state
            .balances
            .iter()
            .map(|&balance| {
                let share = fixed_point::mul_div(
                    U256::from(balance),
                    U256::from(lp_amount),
                    U256::from(total_supply),
                    "withdrawal share",
                )?;
                fixed_point::to_u128(share, "withdrawal share")
            })
            .collect::<Result<Vec<u128>>>()?;

        // shares never exceed balances since lp_amount <= total_supply
        for (balance, amount) in self.state.balances.iter_mut().zip(&amounts) {
            *balance -= amount;
        }
        self.state.total_supply -= lp_amount;

        debug!(lp_amount, ?amounts, "Liquidity removed");
        Ok(amounts)
    }

    /// Quote swapping `dx` raw units of asset `i` for asset `j`
    pub fn quote_exchange(&self, i: usize, j: usize, dx: u128) -> Result<ExchangeOutcome> {
        if dx == 0 {
            return Err(StableSwapError::precondition("exchange amount must be positive"));
        }
        let n = self.config.n_assets();
        if i >= n || j >= n {
            return Err(StableSwapError::precondition(format!(
                "asset index out of range: i={i}, j={j}, n={n}"
            )));
        }
        let precision = self.config.precision;
        let xp = self.xp_of(&self.state.balances)?;
        let dx_normalized = fixed_point::normalize_amount(dx, self.config.rates[i], precision)?;

        let quote = self.swap.exchange(
            i,
            j,
            dx_normalized,
            &xp,
            self.config.amp(),
            &self.config.fees,
        )?;

        Ok(ExchangeOutcome {
            amount_out: fixed_point::denormalize_amount(
                quote.amount_out,
                self.config.rates[j],
                precision,
            )?,
            fee: fixed_point::denormalize_amount(quote.fee, self.config.rates[j], precision)?,
        })
    }

    /// Swap `dx` raw units of asset `i` for asset `j`, keeping the fee in the pool
    pub fn exchange(&mut self, i: usize, j: usize, dx: u128) -> Result<ExchangeOutcome> {
        let outcome = self.quote_exchange(i, j, dx)?;

        let balance_in = self.state.balances[i]
            .checked_add(dx)
            .ok_or(StableSwapError::Overflow {
                context: "exchange input balance",
            })?;
        let balance_out = self.state.balances[j]
            .checked_sub(outcome.amount_out)
            .ok_or(StableSwapError::ArithmeticInvalidState {
                context: "exchange output exceeds balance",
            })?;
        self.state.balances[i] = balance_in;
        self.state.balances[j] = balance_out;

        debug!(i, j, dx, amount_out = outcome.amount_out, fee = outcome.fee, "Exchanged");
        Ok(outcome)
    }
}
