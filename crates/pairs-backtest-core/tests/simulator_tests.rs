use pairs_backtest_core::pairs::{evaluate, simulate, z_score, Position, Thresholds};
use pairs_backtest_core::stats::{mean, sample_std_dev};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ===========================================================================
// Properties over random spreads
// ===========================================================================

fn random_spread(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let mut level = 0.0;
    (0..n)
        .map(|_| {
            level = 0.9 * level + rng.gen_range(-1.0..1.0);
            level
        })
        .collect()
}

#[test]
fn test_output_lengths_for_random_inputs() {
    let mut rng = StdRng::seed_from_u64(42);
    for n in [2usize, 3, 10, 57, 250] {
        let spread = random_spread(&mut rng, n);
        let z = z_score(&spread);
        let sim = simulate(&spread, &z.values, Thresholds::default()).unwrap();
        assert_eq!(sim.positions.len(), n - 1);
        assert_eq!(sim.returns.len(), n - 1);
        let perf = evaluate(&sim.returns, 252.0).unwrap();
        assert_eq!(perf.cumulative_pnl.len(), n - 1);
        assert_eq!(perf.drawdown.len(), n - 1);
    }
}

#[test]
fn test_z_score_invariants() {
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..20 {
        let spread = random_spread(&mut rng, 120);
        let z = z_score(&spread);
        assert!(mean(&z.values).abs() < 1e-10);
        assert!((sample_std_dev(&z.values) - 1.0).abs() < 1e-10);
    }
}

#[test]
fn test_drawdown_never_negative() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..20 {
        let spread = random_spread(&mut rng, 200);
        let z = z_score(&spread);
        let sim = simulate(&spread, &z.values, Thresholds::new(1.0, 0.2).unwrap()).unwrap();
        let perf = evaluate(&sim.returns, 252.0).unwrap();
        assert!(perf.drawdown.iter().all(|d| *d >= 0.0));
        assert!(perf.max_drawdown >= 0.0);
    }
}

#[test]
fn test_returns_follow_same_bar_positions() {
    let mut rng = StdRng::seed_from_u64(5);
    let spread = random_spread(&mut rng, 150);
    let z = z_score(&spread);
    let sim = simulate(&spread, &z.values, Thresholds::new(1.2, 0.3).unwrap()).unwrap();
    for (k, (p, r)) in sim.positions.iter().zip(&sim.returns).enumerate() {
        let expected = f64::from(p.as_i8()) * (spread[k + 1] - spread[k]);
        assert_eq!(*r, expected);
    }
}

#[test]
fn test_positions_only_change_on_signals() {
    let mut rng = StdRng::seed_from_u64(17);
    let spread = random_spread(&mut rng, 300);
    let z = z_score(&spread);
    let t = Thresholds::default();
    let sim = simulate(&spread, &z.values, t).unwrap();
    let mut previous = Position::Flat;
    for (k, p) in sim.positions.iter().enumerate() {
        let zi = z.values[k + 1];
        if *p != previous {
            assert!(zi.abs() < t.exit || zi.abs() > t.entry, "bar {} z {}", k + 1, zi);
        }
        previous = *p;
    }
}

// ===========================================================================
// Worked scenario
// ===========================================================================

#[test]
fn test_triangle_spread_scenario() {
    let spread = [0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0];
    let z = z_score(&spread);
    let sim = simulate(&spread, &z.values, Thresholds::new(1.0, 0.3).unwrap()).unwrap();

    let positions: Vec<i8> = sim.positions.iter().map(|p| p.as_i8()).collect();
    assert_eq!(positions, vec![0, 0, -1, -1, 0, 1]);
    assert_eq!(sim.returns, vec![0.0, 0.0, -1.0, 1.0, 0.0, -1.0]);

    let perf = evaluate(&sim.returns, 252.0).unwrap();
    assert_eq!(perf.cumulative_pnl, vec![0.0, 0.0, -1.0, 0.0, 0.0, -1.0]);
    assert_eq!(perf.max_drawdown, 1.0);
    assert!(perf.sharpe_ratio < 0.0);
}

#[test]
fn test_flat_series_gives_zero_drawdown_and_undefined_sharpe() {
    let spread = [1.0, 1.5, 0.5, 1.0, 1.2];
    // no z-score ever leaves the hold band
    let z = [0.0, 1.0, -1.0, 1.5, -1.5];
    let sim = simulate(&spread, &z, Thresholds::default()).unwrap();
    assert!(sim.returns.iter().all(|r| *r == 0.0));
    let perf = evaluate(&sim.returns, 252.0).unwrap();
    assert_eq!(perf.max_drawdown, 0.0);
    assert!(perf.sharpe_ratio.is_nan());
    assert!(!perf.is_defined("sharpe_ratio"));
}
