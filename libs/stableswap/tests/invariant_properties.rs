//! StableSwap Curve Property Tests
//!
//! Mathematical properties of the invariant, swap solver and LP accounting
//! that must hold for any pool shape, not just hand-picked balances.

use proptest::prelude::*;
use torq_stableswap::fixed_point::abs_diff;
use torq_stableswap::{
    FeeConfig, InvariantSolver, PoolConfig, PoolSettings, StableSwapPool, SwapSolver, A_PRECISION,
    FEE_DENOMINATOR, U256,
};

const UNIT: u128 = 1_000_000_000_000_000_000;

fn amp(a: u128) -> U256 {
    U256::from(a * A_PRECISION)
}

fn xp(values: &[u128]) -> Vec<U256> {
    values.iter().map(|&v| U256::from(v)).collect()
}

fn unit_pool(amplification: u64, n: usize) -> PoolConfig {
    PoolConfig::new(amplification, vec![1; n]).with_precision(1)
}

// Property test strategies
prop_compose! {
    fn reserve()
        (units in 1u128..10_000, dust in 0u128..UNIT) -> u128 {
        units * UNIT + dust
    }
}

prop_compose! {
    fn amplification()
        (a in 1u128..5_000) -> u128 {
        a
    }
}

prop_compose! {
    fn fee_schedule()
        (swap_fee in 0u128..100_000_000, multiplier in 1u128..10) -> FeeConfig {
        FeeConfig {
            swap_fee,
            offpeg_fee_multiplier: multiplier * FEE_DENOMINATOR,
            fee_denominator: FEE_DENOMINATOR,
        }
    }
}

proptest! {
    #[test]
    fn prop_invariant_grows_with_any_balance(
        a in reserve(),
        b in reserve(),
        delta in 10_000_000_000_000_000u128..1_000 * UNIT,
        amp_coeff in amplification(),
    ) {
        let solver = InvariantSolver::default();
        let before = solver.get_d(&xp(&[a, b]), amp(amp_coeff)).unwrap();
        let after_a = solver.get_d(&xp(&[a + delta, b]), amp(amp_coeff)).unwrap();
        let after_b = solver.get_d(&xp(&[a, b + delta]), amp(amp_coeff)).unwrap();

        prop_assert!(after_a > before);
        prop_assert!(after_b > before);
    }

    #[test]
    fn prop_invariant_ignores_asset_order(
        a in reserve(),
        b in reserve(),
        c in reserve(),
        amp_coeff in amplification(),
    ) {
        let solver = InvariantSolver::default();
        let d = solver.get_d(&xp(&[a, b, c]), amp(amp_coeff)).unwrap();
        let rotated = solver.get_d(&xp(&[c, a, b]), amp(amp_coeff)).unwrap();
        let swapped = solver.get_d(&xp(&[b, a, c]), amp(amp_coeff)).unwrap();

        // truncation in the D_P fold depends on order; allow a rounding step
        let tolerance = U256::from(2) + d / U256::from(10u64.pow(15));
        prop_assert!(abs_diff(d, rotated) <= tolerance);
        prop_assert!(abs_diff(d, swapped) <= tolerance);
    }

    #[test]
    fn prop_invariant_bounded_by_sum(
        a in reserve(),
        b in reserve(),
        amp_coeff in amplification(),
    ) {
        let d = InvariantSolver::default()
            .get_d(&xp(&[a, b]), amp(amp_coeff))
            .unwrap();
        prop_assert!(d <= U256::from(a) + U256::from(b) + U256::one());
    }

    #[test]
    fn prop_swap_keeps_invariant(
        a in reserve(),
        b in reserve(),
        c in reserve(),
        i in 0usize..3,
        offset in 1usize..3,
        dx in 1_000_000_000_000_000u128..100 * UNIT,
        amp_coeff in amplification(),
    ) {
        let j = (i + offset) % 3;
        let balances = xp(&[a, b, c]);
        let invariant = InvariantSolver::default();
        let d_before = invariant.get_d(&balances, amp(amp_coeff)).unwrap();

        let x = balances[i] + U256::from(dx);
        let y = SwapSolver::default()
            .get_y(i, j, x, &balances, amp(amp_coeff))
            .unwrap();
        prop_assert!(y < balances[j]);

        let mut after = balances.clone();
        after[i] = x;
        after[j] = y;
        let d_after = invariant.get_d(&after, amp(amp_coeff)).unwrap();
        let tolerance = d_before / U256::from(10u64.pow(12)) + U256::from(4);
        prop_assert!(abs_diff(d_before, d_after) <= tolerance);
    }

    #[test]
    fn prop_first_deposit_mints_invariant(
        a in reserve(),
        b in reserve(),
        fees in fee_schedule(),
    ) {
        let mut pool = StableSwapPool::new(unit_pool(100, 2).with_fees(fees)).unwrap();
        let outcome = pool.add_liquidity(&[a, b]).unwrap();

        let expected = InvariantSolver::default().get_d(&xp(&[a, b]), amp(100)).unwrap();
        prop_assert_eq!(U256::from(outcome.mint_amount), expected);
        prop_assert_eq!(pool.total_supply(), outcome.mint_amount);
        prop_assert!(outcome.fees.iter().all(|&fee| fee == 0));
    }

    #[test]
    fn prop_proportional_deposit_pays_no_fee(
        balance in reserve(),
        deposit in reserve(),
        fees in fee_schedule(),
    ) {
        let mut pool = StableSwapPool::new(unit_pool(100, 2).with_fees(fees)).unwrap();
        pool.add_liquidity(&[balance, balance]).unwrap();

        let outcome = pool.add_liquidity(&[deposit, deposit]).unwrap();
        prop_assert!(outcome.fees.iter().all(|&fee| fee == 0));
        prop_assert_eq!(outcome.mint_amount, 2 * deposit);
    }

    #[test]
    fn prop_deposit_never_dilutes_lp(
        balance_a in reserve(),
        balance_b in reserve(),
        deposit_a in 0u128..10 * UNIT,
        deposit_b in 0u128..10 * UNIT,
        fees in fee_schedule(),
    ) {
        let mut pool = StableSwapPool::new(unit_pool(100, 2).with_fees(fees)).unwrap();
        pool.add_liquidity(&[balance_a, balance_b]).unwrap();
        let price_before = pool.virtual_price().unwrap();

        // heavily skewed deposits may be rejected outright; that is fine too
        if pool.add_liquidity(&[deposit_a, deposit_b]).is_ok() {
            prop_assert!(pool.virtual_price().unwrap() >= price_before);
        }
    }
}

#[test]
fn test_three_asset_pool_from_settings() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let settings = PoolSettings::from_toml_str(
        r#"
amplification = 100
decimals = [6, 6, 18]
swap_fee = "0.0004"
offpeg_fee_multiplier = "2"
"#,
    )
    .unwrap();
    let config = settings.into_pool_config().unwrap();
    let mut pool = StableSwapPool::new(config).unwrap();

    // 10 units of each asset in native decimals
    let deposit = [10_000_000, 10_000_000, 10 * UNIT];
    let outcome = pool.add_liquidity(&deposit).unwrap();
    assert_eq!(outcome.mint_amount, 30 * UNIT);
    assert_eq!(pool.virtual_price().unwrap(), U256::from(UNIT));

    let quote = pool.exchange(0, 2, 1_000_000).unwrap();
    assert!(quote.amount_out < UNIT);
    assert!(quote.amount_out > UNIT * 99 / 100);

    let withdrawn = pool.remove_liquidity(pool.total_supply()).unwrap();
    assert_eq!(withdrawn[0], 11_000_000);
    assert_eq!(pool.total_supply(), 0);
}
