//! Pool runner: wires together scoring, price join and team selection.
//!
//! `run_pool()` is the single entry point used by the CLI: competitions are
//! scored into a season ledger, joined with the price list, and the best
//! affordable team is selected. Same inputs, same report.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use peloton_core::{score_season, Competition, Ledger, ScoreError, ScoreTemplate, ScoringOptions};

use crate::candidate::{join_prices, Candidate, PriceList};
use crate::config::PoolConfig;
use crate::optimizer::{select_team, SelectError, Selection};

/// Errors from the pool pipeline.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("scoring failed: {0}")]
    Score(#[from] ScoreError),
    #[error("team selection failed: {0}")]
    Select(#[from] SelectError),
    #[error("no rule applied to any competition")]
    NoScores,
}

/// Everything a pool run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolReport {
    /// Fingerprint of the template the ledger was scored with.
    pub template_fingerprint: String,
    pub competitions: Vec<String>,
    pub ledger: Ledger,
    pub candidates: Vec<Candidate>,
    pub selection: Selection,
}

/// Score `competitions`, then pick the best team from the priced riders.
pub fn run_pool(
    competitions: &[Competition],
    template: &ScoreTemplate,
    prices: &PriceList,
    config: &PoolConfig,
    options: ScoringOptions,
) -> Result<PoolReport, PoolError> {
    let template_fingerprint = template.fingerprint();
    info!(
        competitions = competitions.len(),
        rules = template.rule_count(),
        template = %&template_fingerprint[..12],
        "running pool"
    );

    let ledger = score_season(competitions, template, options)?.ok_or(PoolError::NoScores)?;
    let candidates = join_prices(&ledger, prices);
    let selection = select_team(
        &candidates,
        config.team.size,
        config.team.budget,
        &config.limits(),
    )?;

    Ok(PoolReport {
        template_fingerprint,
        competitions: competitions.iter().map(|c| c.name.clone()).collect(),
        ledger,
        candidates,
        selection,
    })
}
