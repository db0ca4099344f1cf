//! Balance-skew dependent fee multiplier
//!
//! Deposits that push a pool away from balance pay more: the multiplier grows
//! as the two compared balances drift apart and collapses to the base fee
//! when the off-peg multiplier is disabled.

use crate::config::FeeConfig;
use crate::errors::{Result, StableSwapError};
use crate::fixed_point;
use ethereum_types::U256;
use tracing::trace;

/// Dynamic fee model for a fee schedule
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicFeeModel {
    config: FeeConfig,
}

impl DynamicFeeModel {
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Effective fee multiplier for balances `xpi` and `xpj`
    ///
    /// `fee_denominator + offpeg * base_fee / ((offpeg - fee_denominator) * 4 * xpi * xpj / (xpi + xpj)^2)`
    ///
    /// Returns `base_fee` untouched when `offpeg_fee_multiplier <= fee_denominator`.
    /// A zero balance, or a skew so extreme that the divisor truncates to
    /// zero, is `DivisionByZero`.
    pub fn dynamic_fee(&self, xpi: U256, xpj: U256, base_fee: U256) -> Result<U256> {
        if !self.config.offpeg_enabled() {
            return Ok(base_fee);
        }
        if xpi.is_zero() || xpj.is_zero() {
            return Err(StableSwapError::DivisionByZero {
                context: "dynamic fee over a zero balance",
            });
        }

        let offpeg = U256::from(self.config.offpeg_fee_multiplier);
        let fee_denominator = U256::from(self.config.fee_denominator);

        let xps = fixed_point::add(xpi, xpj, "dynamic fee xps2")?;
        let xps2 = fixed_point::mul(xps, xps, "dynamic fee xps2")?;

        let skew = [U256::from(4), xpi, xpj]
            .into_iter()
            .try_fold(offpeg - fee_denominator, |acc, factor| {
                fixed_point::mul(acc, factor, "dynamic fee denominator")
            })?;
        let denominator = fixed_point::div(skew, xps2, "dynamic fee denominator")?;

        let numerator = fixed_point::mul(offpeg, base_fee, "dynamic fee numerator")?;
        let scaled = fixed_point::div(numerator, denominator, "dynamic fee")?;
        let fee = fixed_point::add(fee_denominator, scaled, "dynamic fee")?;

        trace!(xpi = %xpi, xpj = %xpj, fee = %fee, "dynamic fee");
        Ok(fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FEE_DENOMINATOR;

    const DEN: u128 = FEE_DENOMINATOR;

    #[test]
    fn test_disabled_multiplier_returns_base_fee() {
        let model = DynamicFeeModel::new(FeeConfig {
            swap_fee: 4_000_000,
            offpeg_fee_multiplier: DEN,
            fee_denominator: DEN,
        });
        let base = U256::from(2_000_000);
        let fee = model
            .dynamic_fee(U256::from(1), U256::from(1_000_000), base)
            .unwrap();
        assert_eq!(fee, base);

        // Disabled path never divides, so zero balances are fine
        assert_eq!(
            model
                .dynamic_fee(U256::zero(), U256::zero(), base)
                .unwrap(),
            base
        );
    }

    #[test]
    fn test_balanced_pool_fee() {
        let model = DynamicFeeModel::default();
        let x = U256::from(2_100u64);
        // skew term is exactly (offpeg - den) when balances match
        // fee = den + 2*den * 2e6 / den = den + 4e6
        let fee = model.dynamic_fee(x, x, U256::from(2_000_000)).unwrap();
        assert_eq!(fee, U256::from(DEN + 4_000_000));
    }

    #[test]
    fn test_fee_grows_with_imbalance() {
        let model = DynamicFeeModel::default();
        let base = U256::from(2_000_000);
        let balanced = model
            .dynamic_fee(U256::from(1_000_000u64), U256::from(1_000_000u64), base)
            .unwrap();
        let skewed = model
            .dynamic_fee(U256::from(1_000_000u64), U256::from(200_000u64), base)
            .unwrap();
        let very_skewed = model
            .dynamic_fee(U256::from(1_000_000u64), U256::from(10_000u64), base)
            .unwrap();
        assert!(skewed > balanced);
        assert!(very_skewed > skewed);
    }

    #[test]
    fn test_zero_balance_is_division_by_zero() {
        let model = DynamicFeeModel::default();
        let err = model
            .dynamic_fee(U256::zero(), U256::from(100), U256::from(2_000_000))
            .unwrap_err();
        assert!(matches!(err, StableSwapError::DivisionByZero { .. }));
    }

    #[test]
    fn test_order_of_balances_does_not_matter() {
        let model = DynamicFeeModel::default();
        let base = U256::from(1_500_000);
        let a = U256::from(7_000_000u64);
        let b = U256::from(3_000_000u64);
        assert_eq!(
            model.dynamic_fee(a, b, base).unwrap(),
            model.dynamic_fee(b, a, base).unwrap()
        );
    }
}
