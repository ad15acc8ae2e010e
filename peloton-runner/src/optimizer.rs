//! Team selection: 0/1 knapsack with an exact cardinality.
//!
//! Maximize the summed points of exactly `team_size` candidates whose summed
//! price does not exceed `budget`. The search is a deterministic depth-first
//! branch-and-bound over candidates ordered by points descending, price
//! ascending, input position:
//!
//! - the "take" branch is explored before the "skip" branch, so the first
//!   complete team found is the greedy one and seeds the incumbent;
//! - a branch is pruned when the `r` cheapest remaining prices no longer fit
//!   the budget (`r` = slots left to fill);
//! - a branch is pruned when even the `r` best remaining points cannot beat
//!   the incumbent;
//! - a branch is pruned when the Lagrangian relaxation of the budget row
//!   cannot beat the incumbent. For any `lambda >= 0`,
//!   `lambda * room + sum of the r largest (points - lambda * price)` bounds
//!   the best completion; bisection on `lambda` tightens it to the LP bound.
//!   When every candidate has whole points the bound is rounded down.
//!
//! Only strict improvements replace the incumbent, so among equal-objective
//! teams the one first reached in search order is returned. A member is only
//! added when the running price stays `<= budget` exactly; the tolerance is
//! used for pruning only.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::candidate::Candidate;

/// Relative tolerance for pruning and objective comparisons on summed floats.
const EPS: f64 = 1e-9;

/// How often (in nodes) the wall clock is consulted, starting at the first.
const CLOCK_INTERVAL: u64 = 1024;

/// Bisection steps when minimizing the Lagrangian bound.
const BISECTION_STEPS: usize = 30;

/// Multiplier past which the bracket search for the bound stops doubling.
const MAX_MULTIPLIER: f64 = 1e12;

#[derive(Debug, Error, PartialEq)]
pub enum SelectError {
    #[error("no team of {team_size} fits: {reason}")]
    Infeasible { team_size: usize, reason: String },

    #[error("search stopped after {nodes} nodes ({elapsed_ms} ms) before proving optimality")]
    Timeout {
        nodes: u64,
        elapsed_ms: u128,
        /// Objective of the best team found before stopping.
        best_objective: Option<f64>,
    },

    #[error("candidate '{id}' has invalid {field}: {value}")]
    InvalidCandidate {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("budget must be a number, got {0}")]
    InvalidBudget(f64),
}

/// Search limits. `None` disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverLimits {
    pub time_limit: Option<Duration>,
    pub node_limit: Option<u64>,
}

impl Default for SolverLimits {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(10)),
            node_limit: Some(50_000_000),
        }
    }
}

impl SolverLimits {
    pub fn unlimited() -> Self {
        Self {
            time_limit: None,
            node_limit: None,
        }
    }
}

/// An optimal team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Chosen candidates, best points first.
    pub members: Vec<Candidate>,
    /// Summed points of the members.
    pub objective: f64,
    /// Summed price of the members.
    pub total_price: f64,
    /// Search nodes explored.
    pub nodes: u64,
}

/// Pick the best `team_size` candidates within `budget`.
pub fn select_team(
    candidates: &[Candidate],
    team_size: usize,
    budget: f64,
    limits: &SolverLimits,
) -> Result<Selection, SelectError> {
    validate(candidates, budget)?;
    info!(
        candidates = candidates.len(),
        team_size, budget, "selecting team"
    );

    if team_size > candidates.len() {
        return Err(SelectError::Infeasible {
            team_size,
            reason: format!("only {} candidates available", candidates.len()),
        });
    }

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let (ca, cb) = (&candidates[a], &candidates[b]);
        cb.points
            .total_cmp(&ca.points)
            .then(ca.price.total_cmp(&cb.price))
            .then(a.cmp(&b))
    });

    let mut search = Search::new(candidates, &order, team_size, budget, limits);
    let cheapest = search.min_cost[0][team_size];
    if cheapest > search.budget_slack() {
        debug!(cheapest, budget, "cheapest team exceeds budget");
        return Err(SelectError::Infeasible {
            team_size,
            reason: format!("cheapest team costs {cheapest}, budget is {budget}"),
        });
    }

    search.run(0, 0, 0.0, 0.0);

    if search.stopped {
        let elapsed_ms = search.started.elapsed().as_millis();
        info!(nodes = search.nodes, elapsed_ms, "team selection hit its limit");
        return Err(SelectError::Timeout {
            nodes: search.nodes,
            elapsed_ms,
            best_objective: search.best.as_ref().map(|(points, _)| *points),
        });
    }

    let (_, picked) = search.best.ok_or_else(|| SelectError::Infeasible {
        team_size,
        reason: "no combination satisfies the budget".into(),
    })?;

    let members: Vec<Candidate> = picked
        .iter()
        .map(|&pos| candidates[order[pos]].clone())
        .collect();
    let selection = Selection {
        objective: members.iter().map(|c| c.points).sum(),
        total_price: members.iter().map(|c| c.price).sum(),
        members,
        nodes: search.nodes,
    };
    info!(
        objective = selection.objective,
        total_price = selection.total_price,
        nodes = selection.nodes,
        "team selected"
    );
    Ok(selection)
}

fn validate(candidates: &[Candidate], budget: f64) -> Result<(), SelectError> {
    if budget.is_nan() {
        return Err(SelectError::InvalidBudget(budget));
    }
    for c in candidates {
        if !c.points.is_finite() {
            return Err(SelectError::InvalidCandidate {
                id: c.id.to_string(),
                field: "points",
                value: c.points,
            });
        }
        if !c.price.is_finite() || c.price < 0.0 {
            return Err(SelectError::InvalidCandidate {
                id: c.id.to_string(),
                field: "price",
                value: c.price,
            });
        }
    }
    Ok(())
}

/// Depth-first search state. Positions index the sorted order.
struct Search<'a> {
    points: Vec<f64>,
    prices: Vec<f64>,
    team_size: usize,
    budget: f64,
    limits: &'a SolverLimits,
    /// `prefix[i]` = summed points of positions `0..i`.
    prefix: Vec<f64>,
    /// Every candidate scores a whole number of points.
    integral: bool,
    /// Reduced (points, price) pairs reused by the Lagrangian bound.
    scratch: Vec<(f64, f64)>,
    /// `min_cost[i][r]` = summed price of the `r` cheapest positions in `i..`
    /// (infinite when fewer than `r` remain).
    min_cost: Vec<Vec<f64>>,
    picked: Vec<usize>,
    best: Option<(f64, Vec<usize>)>,
    nodes: u64,
    started: Instant,
    stopped: bool,
}

impl<'a> Search<'a> {
    fn new(
        candidates: &[Candidate],
        order: &[usize],
        team_size: usize,
        budget: f64,
        limits: &'a SolverLimits,
    ) -> Self {
        let points: Vec<f64> = order.iter().map(|&i| candidates[i].points).collect();
        let prices: Vec<f64> = order.iter().map(|&i| candidates[i].price).collect();
        let n = points.len();

        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0);
        for p in &points {
            prefix.push(prefix[prefix.len() - 1] + p);
        }

        let mut min_cost = vec![vec![f64::INFINITY; team_size + 1]; n + 1];
        let mut suffix: Vec<f64> = Vec::with_capacity(n);
        min_cost[n][0] = 0.0;
        for i in (0..n).rev() {
            let at = suffix.partition_point(|&p| p <= prices[i]);
            suffix.insert(at, prices[i]);
            let mut sum = 0.0;
            min_cost[i][0] = 0.0;
            for r in 1..=team_size.min(suffix.len()) {
                sum += suffix[r - 1];
                min_cost[i][r] = sum;
            }
        }

        let integral = points.iter().all(|p| p.fract() == 0.0);

        Self {
            points,
            prices,
            team_size,
            budget,
            limits,
            prefix,
            integral,
            scratch: Vec::with_capacity(n),
            min_cost,
            picked: Vec::with_capacity(team_size),
            best: None,
            nodes: 0,
            started: Instant::now(),
            stopped: false,
        }
    }

    fn out_of_budget(&mut self) -> bool {
        if let Some(limit) = self.limits.node_limit {
            if self.nodes > limit {
                return true;
            }
        }
        if let Some(limit) = self.limits.time_limit {
            if (self.nodes - 1) % CLOCK_INTERVAL == 0 && self.started.elapsed() >= limit {
                return true;
            }
        }
        false
    }

    fn run(&mut self, pos: usize, taken: usize, points: f64, price: f64) {
        if self.stopped {
            return;
        }
        self.nodes += 1;
        if self.out_of_budget() {
            self.stopped = true;
            return;
        }

        let left = self.team_size - taken;
        if left == 0 {
            let improves = self.best.as_ref().map_or(true, |(best, _)| points > best + EPS);
            if improves {
                self.best = Some((points, self.picked.clone()));
            }
            return;
        }
        if self.points.len() - pos < left {
            return;
        }
        if price + self.min_cost[pos][left] > self.budget_slack() {
            return;
        }
        if let Some(best) = self.best.as_ref().map(|(best, _)| *best) {
            let bound = points + self.prefix[pos + left] - self.prefix[pos];
            if bound <= best + EPS {
                return;
            }
            let bound = points + self.completion_bound(pos, left, self.budget - price);
            if bound <= best + EPS {
                return;
            }
        }

        let with = price + self.prices[pos];
        if with <= self.budget {
            self.picked.push(pos);
            self.run(pos + 1, taken + 1, points + self.points[pos], with);
            self.picked.pop();
        }
        self.run(pos + 1, taken, points, price);
    }

    /// Budget plus the pruning tolerance.
    fn budget_slack(&self) -> f64 {
        self.budget + EPS * self.budget.abs().max(1.0)
    }

    /// Upper bound on the points `slots` more members from `pos..` can add
    /// while spending at most `room`.
    fn completion_bound(&mut self, pos: usize, slots: usize, room: f64) -> f64 {
        let (free, cost) = self.top_reduced(pos, slots, 0.0);
        if cost <= room {
            return self.round_bound(free);
        }

        // The bound is convex in lambda with slope `room - cost`.
        let mut bound = free;
        let (mut lo, mut hi) = (0.0, 1.0);
        loop {
            let (value, cost) = self.top_reduced(pos, slots, hi);
            bound = bound.min(hi * room + value);
            if cost <= room || hi >= MAX_MULTIPLIER {
                break;
            }
            lo = hi;
            hi *= 2.0;
        }
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            let (value, cost) = self.top_reduced(pos, slots, mid);
            bound = bound.min(mid * room + value);
            if cost > room {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        self.round_bound(bound)
    }

    /// Sum of the `slots` largest `points - lambda * price` from `pos..`,
    /// with the summed price of those members.
    fn top_reduced(&mut self, pos: usize, slots: usize, lambda: f64) -> (f64, f64) {
        self.scratch.clear();
        self.scratch.extend(
            self.points[pos..]
                .iter()
                .zip(&self.prices[pos..])
                .map(|(&p, &c)| (p - lambda * c, c)),
        );
        if slots < self.scratch.len() {
            self.scratch
                .select_nth_unstable_by(slots - 1, |a, b| b.0.total_cmp(&a.0));
        }
        self.scratch[..slots]
            .iter()
            .fold((0.0, 0.0), |(value, cost), &(v, c)| (value + v, cost + c))
    }

    fn round_bound(&self, bound: f64) -> f64 {
        if self.integral {
            (bound + EPS * bound.abs().max(1.0)).floor()
        } else {
            bound
        }
    }
}
