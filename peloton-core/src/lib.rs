//! Peloton Core: results trees, score templates, rule evaluation, ledgers.
//!
//! This crate turns ranked result tables into competitor points:
//! - Results trees: nested categories of polars tables, one tree per event
//! - Score templates: declarative event and competition rules, loaded from TOML
//! - Rule evaluation: path resolution, non-finisher filtering, ladder and
//!   pass-through points
//! - Aggregation: per-event, per-competition and per-season ledgers

pub mod aggregate;
pub mod domain;
pub mod error;
pub mod evaluate;
pub mod ledger;
pub mod points;
pub mod results;
pub mod template;

pub use aggregate::{score_competition, score_event, score_season, ScoringOptions};
pub use domain::{Competition, CompetitorId, CompetitorKey, Event, EventKind, TeamId};
pub use error::ScoreError;
pub use evaluate::{evaluate, NON_FINISHER_CODES};
pub use ledger::{Ledger, LedgerEntry, TOTAL_COLUMN};
pub use points::{PointsRow, PointsTable};
pub use results::{ResultsError, ResultsTree};
pub use template::{PointsSpec, ScoreTemplate, ScoringRule, TemplateError};
