//! Property tests for team selection.
//!
//! Uses proptest to verify:
//! 1. Constraints: every selection has exactly `team_size` members within budget
//! 2. Optimality: the objective matches brute-force enumeration
//! 3. Loose budget: with distinct points the team is the top `team_size`
//! 4. Determinism: identical inputs give identical selections
//! 5. Infeasibility and limits are reported, never a partial team
//! 6. Realistic pools with a binding budget solve within the default limits

use peloton_runner::{select_team, Candidate, SelectError, SolverLimits};
use proptest::prelude::*;

fn arb_candidates(max: usize) -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec((0u32..60, 1u32..40), 1..=max).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (points, price))| Candidate::new(format!("R{i}"), points as f64, price as f64))
            .collect()
    })
}

/// Best objective over all subsets, `None` when no subset fits.
fn brute_force(candidates: &[Candidate], team_size: usize, budget: f64) -> Option<f64> {
    let n = candidates.len();
    (0u32..(1 << n))
        .filter(|mask| mask.count_ones() as usize == team_size)
        .filter_map(|mask| {
            let members = (0..n).filter(|i| mask & (1 << i) != 0);
            let (points, price) = members.fold((0.0, 0.0), |(pt, pr), i| {
                (pt + candidates[i].points, pr + candidates[i].price)
            });
            (price <= budget).then_some(points)
        })
        .max_by(|a, b| a.total_cmp(b))
}

// ── 1 + 2. Constraints and optimality ────────────────────────────────

proptest! {
    #[test]
    fn matches_brute_force(
        candidates in arb_candidates(10),
        team_size in 0usize..6,
        budget in 0u32..150,
    ) {
        let budget = budget as f64;
        let expected = brute_force(&candidates, team_size, budget);
        match select_team(&candidates, team_size, budget, &SolverLimits::unlimited()) {
            Ok(selection) => {
                prop_assert_eq!(selection.members.len(), team_size);
                prop_assert!(selection.total_price <= budget);
                prop_assert_eq!(Some(selection.objective), expected);
            }
            Err(SelectError::Infeasible { .. }) => prop_assert_eq!(expected, None),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}

// ── 3. Loose budget ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn loose_budget_takes_top_points(
        points in prop::collection::btree_set(0u32..1000, 1..15),
        team_size in 1usize..8,
    ) {
        prop_assume!(team_size <= points.len());
        // Distinct points, shuffled into a non-sorted input order.
        let mut values: Vec<u32> = points.into_iter().collect();
        values.reverse();
        let half = values.len() / 2;
        values.rotate_left(half);
        let candidates: Vec<Candidate> = values
            .iter()
            .enumerate()
            .map(|(i, p)| Candidate::new(format!("R{i}"), *p as f64, 1.0 + (i % 3) as f64))
            .collect();

        let selection = select_team(&candidates, team_size, 1e9, &SolverLimits::default()).unwrap();

        let mut top = values.clone();
        top.sort_unstable_by(|a, b| b.cmp(a));
        let expected: Vec<f64> = top[..team_size].iter().map(|p| *p as f64).collect();
        let got: Vec<f64> = selection.members.iter().map(|c| c.points).collect();
        prop_assert_eq!(got, expected);
    }
}

// ── 4. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn identical_inputs_identical_selection(
        candidates in arb_candidates(12),
        team_size in 1usize..5,
    ) {
        let limits = SolverLimits::unlimited();
        let first = select_team(&candidates, team_size, 80.0, &limits);
        let second = select_team(&candidates, team_size, 80.0, &limits);
        prop_assert_eq!(first, second);
    }
}

// ── 5. Infeasible and limits ─────────────────────────────────────────

#[test]
fn four_candidates_three_slots() {
    let candidates = vec![
        Candidate::new("A", 10.0, 30.0),
        Candidate::new("B", 8.0, 30.0),
        Candidate::new("C", 6.0, 30.0),
        Candidate::new("D", 4.0, 30.0),
    ];
    let selection = select_team(&candidates, 3, 90.0, &SolverLimits::default()).unwrap();
    assert_eq!(selection.objective, 24.0);

    let err = select_team(&candidates, 5, 90.0, &SolverLimits::default()).unwrap_err();
    assert!(matches!(err, SelectError::Infeasible { team_size: 5, .. }));
}

#[test]
fn exhausted_node_limit_is_timeout_not_infeasible() {
    let candidates: Vec<Candidate> = (0..40)
        .map(|i| Candidate::new(format!("R{i}"), ((i * 37) % 101) as f64, 5.0 + ((i * 13) % 11) as f64))
        .collect();
    let limits = SolverLimits {
        time_limit: None,
        node_limit: Some(50),
    };
    let err = select_team(&candidates, 15, 120.0, &limits).unwrap_err();
    assert!(matches!(err, SelectError::Timeout { nodes: 51, .. }));
}

#[test]
fn zero_time_limit_is_timeout() {
    let candidates: Vec<Candidate> = (0..80)
        .map(|i| Candidate::new(format!("R{i}"), ((i * 7) % 23) as f64, 3.0 + ((i * 5) % 9) as f64))
        .collect();
    let limits = SolverLimits {
        time_limit: Some(std::time::Duration::ZERO),
        node_limit: None,
    };
    let err = select_team(&candidates, 25, 140.0, &limits).unwrap_err();
    assert!(matches!(err, SelectError::Timeout { .. }));
}

// ── 6. Realistic pools ───────────────────────────────────────────────

/// Grand-tour sized pool: prices 1..=7, points rising with price.
fn tour_pool(count: usize) -> Vec<Candidate> {
    (0..count)
        .map(|i| {
            let price = 1 + (i * 37) % 7;
            let points = price * 12 + (i * 53) % 29;
            Candidate::new(format!("R{i}"), points as f64, price as f64)
        })
        .collect()
}

#[test]
fn binding_budget_solves_with_default_limits() {
    let pool = tour_pool(150);
    let budget = 50.0;

    let mut by_points: Vec<&Candidate> = pool.iter().collect();
    by_points.sort_by(|a, b| b.points.total_cmp(&a.points));
    let greedy_price: f64 = by_points[..15].iter().map(|c| c.price).sum();
    assert!(greedy_price > budget, "budget must bind");

    let selection = select_team(&pool, 15, budget, &SolverLimits::default()).unwrap();
    assert_eq!(selection.members.len(), 15);
    assert!(selection.total_price <= budget);
    assert_eq!(selection.objective, 1003.0);
}

#[test]
fn larger_pools_stay_within_default_limits() {
    for count in [60, 120, 176] {
        let pool = tour_pool(count);
        let selection = select_team(&pool, 15, 50.0, &SolverLimits::default())
            .unwrap_or_else(|e| panic!("{count} riders: {e}"));
        assert!(selection.total_price <= 50.0);
    }
}
