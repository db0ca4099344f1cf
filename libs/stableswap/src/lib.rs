//! # Torq StableSwap Library - Stable Pool Curve Mathematics
//!
//! ## Purpose
//!
//! Numeric core of a StableSwap (Curve-style) pool: solves the invariant `D`
//! for a set of normalized balances, solves the output balance `y` for a
//! swap, prices balance-skew dependent deposit fees and derives the LP tokens
//! minted for a deposit. All arithmetic is truncating checked `U256`, so
//! results are deterministic across platforms and overflow surfaces as an
//! error instead of wrapping.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Pool balances and LP supply from the host's persisted state,
//!   pool parameters from [`PoolSettings`] TOML files or code-built [`PoolConfig`]
//! - **Output Destinations**: Deposit outcomes, swap quotes and virtual price for
//!   strategy engines and pool simulators
//! - **Precision**: Per-asset rates lift every token to a common precision before
//!   any curve math; `A_PRECISION = 100` scales the amplification coefficient
//! - **Validation**: Every failure is a [`StableSwapError`] returned to the caller
//!
//! ## Architecture Role
//!
//! [`InvariantSolver`] and [`SwapSolver`] are stateless Newton solvers,
//! [`DynamicFeeModel`] prices imbalance and [`StableSwapPool`] orchestrates
//! them around one pool's balances and LP supply.
//!
//! See [`architecture_diagram()`] for visual representation of the data flow.
//!
//! ## Performance Profile
//!
//! - **Invariant**: a handful of Newton iterations for near-balanced pools, bounded
//!   by `max_iterations` (255 by default)
//! - **Allocation**: one normalized balance vector per solve
//! - **Threading**: solvers are `Copy` and share nothing; pool mutation takes `&mut self`

pub mod config;
pub mod errors;
pub mod fees;
pub mod fixed_point;
pub mod invariant;
pub mod liquidity;
pub mod swap_math;

pub use config::{
    FeeConfig, PoolConfig, PoolSettings, SolverConfig, A_PRECISION, DEFAULT_MAX_ITERATIONS,
    FEE_DENOMINATOR, MAX_ASSETS, PRECISION,
};
pub use errors::{Result, StableSwapError};
pub use fees::DynamicFeeModel;
pub use invariant::{InvariantSolver, Solution};
pub use liquidity::{DepositOutcome, ExchangeOutcome, PoolState, StableSwapPool};
pub use swap_math::{SwapQuote, SwapSolver};

/// Common types for curve calculations
pub use ethereum_types::U256;
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;

/// Architecture diagram showing how a deposit flows through the solvers
#[cfg_attr(doc, aquamarine::aquamarine)]
/// ```mermaid
/// graph LR
///     subgraph Input["📊 Pool Inputs"]
///         CFG[PoolConfig]
///         BAL[Raw Balances]
///         DEP[Deposit Amounts]
///     end
///
///     subgraph Math["🧮 Curve Mathematics"]
///         NRM[Normalize xp]
///         D[InvariantSolver get_D]
///         Y[SwapSolver get_y]
///         FEE[DynamicFeeModel]
///     end
///
///     subgraph Output["🎯 Pool Accounting"]
///         MINT[LP Mint Amount]
///         QUOTE[Swap Quote]
///         VP[Virtual Price]
///     end
///
///     CFG --> NRM
///     BAL --> NRM
///     DEP --> NRM
///     NRM --> D
///     NRM --> Y
///     D --> FEE
///     FEE --> D
///     D --> MINT
///     D --> VP
///     Y --> QUOTE
///
///     style Input fill:#e1f5fe
///     style Math fill:#fff3e0
///     style Output fill:#e8f5e9
/// ```
pub fn architecture_diagram() {
    // This function exists solely for documentation purposes
    // The diagram is rendered by aquamarine in rustdoc
}
