//! Scoring errors.
//!
//! Variants split into two groups. The "not applicable" group (`UnresolvedPath`,
//! `NotATable`, `EmptyEligibleSet`, `MissingRequiredColumn`) is only raised for
//! rules marked `strict`; otherwise the evaluator skips the rule or subtable.
//! The data-corruption group (`RankCastFailure`, `PointsCastFailure`, `Frame`)
//! is always raised.

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("key '{key}' not found in results (path {path:?})")]
    UnresolvedPath { key: String, path: Vec<String> },

    #[error("subtable '{subtable}' is a category, not a table")]
    NotATable { subtable: String },

    #[error("subtable '{subtable}' has no eligible rows")]
    EmptyEligibleSet { subtable: String },

    #[error("subtable '{subtable}' is missing required column '{column}'")]
    MissingRequiredColumn { subtable: String, column: String },

    #[error("column '{column}' in subtable '{subtable}' has a non-integer rank: {detail}")]
    RankCastFailure {
        subtable: String,
        column: String,
        detail: String,
    },

    #[error("column '{column}' in subtable '{subtable}' has non-integer points: {detail}")]
    PointsCastFailure {
        subtable: String,
        column: String,
        detail: String,
    },

    #[error("dataframe error: {0}")]
    Frame(#[from] PolarsError),
}

impl ScoreError {
    /// True for the conditions that are silently skipped on non-strict rules.
    pub fn is_not_applicable(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedPath { .. }
                | Self::NotATable { .. }
                | Self::EmptyEligibleSet { .. }
                | Self::MissingRequiredColumn { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_gated_variants_are_not_applicable() {
        let e = ScoreError::EmptyEligibleSet {
            subtable: "general".into(),
        };
        assert!(e.is_not_applicable());

        let e = ScoreError::RankCastFailure {
            subtable: "general".into(),
            column: "Rnk".into(),
            detail: "'abc'".into(),
        };
        assert!(!e.is_not_applicable());
    }

    #[test]
    fn messages_name_the_offending_column() {
        let e = ScoreError::MissingRequiredColumn {
            subtable: "Sprint".into(),
            column: "Pnt".into(),
        };
        assert_eq!(
            e.to_string(),
            "subtable 'Sprint' is missing required column 'Pnt'"
        );
    }
}
