//! Pool, solver and fee configuration
//!
//! Module-level constants are defaults only. Every function takes its
//! parameters from one of the structs below, so pools with different asset
//! counts, amplification or fee schedules can live side by side.
//!
//! Pools can be described in TOML and loaded with environment overrides
//! (`STABLESWAP_` prefix), see [`PoolSettings::load`].

use crate::errors::{Result, StableSwapError};
use anyhow::Context;
use config::{Config, Environment, File};
use ethereum_types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Scale applied to `A` in the precision-scaled solver variant
pub const A_PRECISION: u128 = 100;

/// Default normalization divisor (18 decimals)
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Default fee denominator, fees are expressed in units of 1e-10
pub const FEE_DENOMINATOR: u128 = 10_000_000_000;

/// Default Newton iteration bound
pub const DEFAULT_MAX_ITERATIONS: u32 = 255;

/// Newton loops stop once successive values differ by at most this much
pub const CONVERGENCE_TOLERANCE: u64 = 1;

/// Largest supported asset count
pub const MAX_ASSETS: usize = 8;

/// Decimals every asset is normalized to when rates come from decimals
const TARGET_DECIMALS: u32 = 18;

/// Newton solver tuning shared by `get_D` and `get_y`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Iteration bound; 255 matches production, 32 or 225 trade accuracy for speed
    pub max_iterations: u32,
    /// `amp` already carries `A_PRECISION` (production) or is the raw `A`
    pub precision_scaled: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            precision_scaled: true,
        }
    }
}

impl SolverConfig {
    pub fn new(max_iterations: u32, precision_scaled: bool) -> Self {
        Self {
            max_iterations,
            precision_scaled,
        }
    }

    /// Divisor applied to `Ann` terms: `A_PRECISION` when scaled, otherwise 1
    pub fn amp_precision(&self) -> U256 {
        if self.precision_scaled {
            U256::from(A_PRECISION)
        } else {
            U256::one()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(StableSwapError::invalid_config(
                "max_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Fee schedule of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeConfig {
    /// Flat swap fee in `fee_denominator` units (4_000_000 = 0.04%)
    pub swap_fee: u128,
    /// Off-peg multiplier in `fee_denominator` units; `<= fee_denominator` disables it
    pub offpeg_fee_multiplier: u128,
    pub fee_denominator: u128,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            swap_fee: 4_000_000,
            offpeg_fee_multiplier: 2 * FEE_DENOMINATOR,
            fee_denominator: FEE_DENOMINATOR,
        }
    }
}

impl FeeConfig {
    /// Build a fee schedule from human fractions, e.g. `dec!(0.0004)` and `dec!(2)`
    pub fn from_rates(swap_fee: Decimal, offpeg_fee_multiplier: Decimal) -> Result<Self> {
        let swap_fee = scale_fee(swap_fee, "swap_fee")?;
        let offpeg_fee_multiplier = scale_fee(offpeg_fee_multiplier, "offpeg_fee_multiplier")?;
        let fees = Self {
            swap_fee,
            offpeg_fee_multiplier,
            fee_denominator: FEE_DENOMINATOR,
        };
        fees.validate()?;
        Ok(fees)
    }

    /// Deposit base fee: `swap_fee * n / (4 * (n - 1))`
    pub fn base_fee(&self, n: usize) -> Result<U256> {
        if n < 2 {
            return Err(StableSwapError::precondition(format!(
                "base fee needs at least 2 assets, got {n}"
            )));
        }
        let numerator = U256::from(self.swap_fee) * U256::from(n);
        Ok(numerator / U256::from(4 * (n - 1)))
    }

    /// Offpeg scaling is active only when the multiplier exceeds the denominator
    pub fn offpeg_enabled(&self) -> bool {
        self.offpeg_fee_multiplier > self.fee_denominator
    }

    pub fn validate(&self) -> Result<()> {
        if self.fee_denominator == 0 {
            return Err(StableSwapError::invalid_config(
                "fee_denominator must be positive",
            ));
        }
        if self.swap_fee >= self.fee_denominator {
            return Err(StableSwapError::invalid_config(format!(
                "swap_fee {} must be below fee_denominator {}",
                self.swap_fee, self.fee_denominator
            )));
        }
        Ok(())
    }
}

fn scale_fee(value: Decimal, field: &str) -> Result<u128> {
    if value.is_sign_negative() {
        return Err(StableSwapError::invalid_config(format!(
            "{field} cannot be negative: {value}"
        )));
    }
    (value * Decimal::from(FEE_DENOMINATOR as u64))
        .trunc()
        .to_u128()
        .ok_or_else(|| StableSwapError::invalid_config(format!("{field} out of range: {value}")))
}

/// Static parameters of one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Human amplification coefficient `A` (unscaled)
    pub amplification: u64,
    /// Per-asset multipliers into the common precision
    pub rates: Vec<u128>,
    /// Normalization divisor: `xp = rate * balance / precision`
    pub precision: u128,
    pub solver: SolverConfig,
    pub fees: FeeConfig,
}

impl PoolConfig {
    /// Pool with default precision, solver and fee schedule
    pub fn new(amplification: u64, rates: Vec<u128>) -> Self {
        Self {
            amplification,
            rates,
            precision: PRECISION,
            solver: SolverConfig::default(),
            fees: FeeConfig::default(),
        }
    }

    /// Rates that lift each asset to 18 decimals: `10^(36 - decimals)`
    pub fn from_decimals(amplification: u64, decimals: &[u32]) -> Result<Self> {
        let rates = decimals
            .iter()
            .map(|&d| rate_for_decimals(d))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(amplification, rates))
    }

    pub fn with_precision(mut self, precision: u128) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_fees(mut self, fees: FeeConfig) -> Self {
        self.fees = fees;
        self
    }

    /// Number of assets
    pub fn n_assets(&self) -> usize {
        self.rates.len()
    }

    /// Amplification as the solvers expect it (`A * A_PRECISION` when scaled)
    pub fn amp(&self) -> U256 {
        U256::from(self.amplification) * self.solver.amp_precision()
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.n_assets();
        if !(2..=MAX_ASSETS).contains(&n) {
            return Err(StableSwapError::invalid_config(format!(
                "pool must hold between 2 and {MAX_ASSETS} assets, got {n}"
            )));
        }
        if let Some(i) = self.rates.iter().position(|&r| r == 0) {
            return Err(StableSwapError::invalid_config(format!(
                "rate of asset {i} must be positive"
            )));
        }
        if self.precision == 0 {
            return Err(StableSwapError::invalid_config("precision must be positive"));
        }
        if self.amplification == 0 {
            return Err(StableSwapError::invalid_config("amplification must be positive"));
        }
        self.solver.validate()?;
        self.fees.validate()
    }
}

fn rate_for_decimals(decimals: u32) -> Result<u128> {
    let exponent = (2 * TARGET_DECIMALS).checked_sub(decimals).ok_or_else(|| {
        StableSwapError::invalid_config(format!("asset decimals {decimals} exceed 36"))
    })?;
    Ok(10u128.pow(exponent))
}

/// File form of a pool description
///
/// ```toml
/// amplification = 100
/// decimals = [6, 6, 18]
/// swap_fee = "0.0004"
/// offpeg_fee_multiplier = "2"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    pub amplification: u64,
    pub decimals: Vec<u32>,
    pub swap_fee: Decimal,
    pub offpeg_fee_multiplier: Decimal,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_precision_scaled")]
    pub precision_scaled: bool,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_precision_scaled() -> bool {
    true
}

impl PoolSettings {
    /// Load a pool description from a TOML file, then apply `STABLESWAP_*` env overrides
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        debug!("Loading pool settings from {:?}", path);

        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(Environment::with_prefix("STABLESWAP").try_parsing(true))
            .build()
            .context("Failed to build pool configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize pool configuration")
    }

    /// Parse a pool description from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse pool configuration")
    }

    /// Validated runtime configuration for these settings
    pub fn into_pool_config(self) -> Result<PoolConfig> {
        let fees = FeeConfig::from_rates(self.swap_fee, self.offpeg_fee_multiplier)?;
        let solver = SolverConfig::new(self.max_iterations, self.precision_scaled);
        let pool = PoolConfig::from_decimals(self.amplification, &self.decimals)?
            .with_solver(solver)
            .with_fees(fees);
        pool.validate()?;
        Ok(pool)
    }
}
