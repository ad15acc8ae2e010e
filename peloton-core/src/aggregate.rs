//! Aggregation: from rule outputs to event, competition and season ledgers.
//!
//! - `score_event()`: every event rule against one event's results.
//! - `score_competition()`: every event, plus the competition rules against the
//!   final event's results.
//! - `score_season()`: the competition ledgers of many competitions.
//!
//! Each level returns `Ok(None)` when nothing was applicable, so callers can
//! tell "no results yet" apart from "nobody scored".

use tracing::{debug, info, warn};

use crate::domain::{Competition, Event};
use crate::error::ScoreError;
use crate::evaluate::evaluate;
use crate::ledger::Ledger;
use crate::points::PointsTable;
use crate::results::ResultsTree;
use crate::template::{ScoreTemplate, ScoringRule};

/// Options for competition and season scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringOptions {
    /// Apply the event rules to every event. When false, only the
    /// competition rules are applied.
    pub score_events: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self { score_events: true }
    }
}

/// Apply every event rule to one event.
pub fn score_event(event: &Event, template: &ScoreTemplate) -> Result<Option<Ledger>, ScoreError> {
    debug!(event = %event, rules = template.event.len(), "scoring event");
    let tables = apply_rules(template.event.iter(), &event.results)?;
    if tables.is_empty() {
        debug!(event = %event, "no event rule applied");
        return Ok(None);
    }
    Ok(Some(Ledger::from_tables(&tables)))
}

/// Score every event of a competition and its final classifications.
pub fn score_competition(
    competition: &Competition,
    template: &ScoreTemplate,
    options: ScoringOptions,
) -> Result<Option<Ledger>, ScoreError> {
    info!(
        competition = %competition.name,
        events = competition.events.len(),
        score_events = options.score_events,
        "scoring competition"
    );

    let mut ledgers = Vec::new();
    if options.score_events {
        for event in &competition.events {
            if let Some(ledger) = score_event(event, template)? {
                ledgers.push(ledger);
            }
        }
    }

    if let Some(final_event) = competition.final_event() {
        let tables = apply_rules(template.competition.iter(), &final_event.results)?;
        if !tables.is_empty() {
            ledgers.push(Ledger::from_tables(&tables));
        }
    }

    if ledgers.is_empty() {
        return Ok(None);
    }
    let ledger = Ledger::merge(&ledgers);
    info!(
        competition = %competition.name,
        competitors = ledger.len(),
        points = ledger.grand_total(),
        "competition scored"
    );
    Ok(Some(ledger))
}

/// Merge the ledgers of many competitions.
pub fn score_season(
    competitions: &[Competition],
    template: &ScoreTemplate,
    options: ScoringOptions,
) -> Result<Option<Ledger>, ScoreError> {
    let mut ledgers = Vec::new();
    for competition in competitions {
        if let Some(ledger) = score_competition(competition, template, options)? {
            ledgers.push(ledger);
        }
    }
    if ledgers.is_empty() {
        return Ok(None);
    }
    Ok(Some(Ledger::merge(&ledgers)))
}

fn apply_rules<'a>(
    rules: impl IntoIterator<Item = (&'a String, &'a ScoringRule)>,
    results: &ResultsTree,
) -> Result<Vec<PointsTable>, ScoreError> {
    let mut tables = Vec::new();
    for (name, rule) in rules {
        match evaluate(rule, results) {
            Ok(Some(table)) => tables.push(table),
            Ok(None) => debug!(rule = %name, "rule not applicable"),
            Err(e) => {
                warn!(rule = %name, error = %e, "rule failed");
                return Err(e);
            }
        }
    }
    Ok(tables)
}
