//! Rule evaluation: apply one scoring rule to one event's results.
//!
//! Evaluation runs in four steps:
//! 1. Resolve the rule's path; a table becomes the single subtable `general`,
//!    a category yields one subtable per child not named in `exclude`.
//! 2. Per subtable, drop non-finishers (`Rnk` in [`NON_FINISHER_CODES`]) and
//!    check the required columns.
//! 3. Convert the rank column to integers and stable-sort by it.
//! 4. Assign points from the ladder or the pass-through column.
//!
//! Unresolvable paths, empty subtables and missing columns make a rule (or one
//! of its subtables) not applicable. They are only errors for strict rules.
//! Values that cannot be converted to integers are always errors.

use polars::prelude::*;
use tracing::debug;

use crate::domain::CompetitorKey;
use crate::error::ScoreError;
use crate::points::PointsTable;
use crate::results::{
    ResultsTree, COMPETITOR_COLUMN, GENERAL_SUBTABLE, STATUS_COLUMN, TEAM_COLUMN,
};
use crate::template::{PointsSpec, ScoringRule};

/// Status codes of competitors that did not finish or were disqualified.
pub const NON_FINISHER_CODES: [&str; 6] = ["DNF", "DNS", "NR", "DSQ", "OTL", "DF"];

pub fn is_non_finisher(status: &str) -> bool {
    NON_FINISHER_CODES.contains(&status)
}

/// Apply `rule` to an event's results.
///
/// Returns `Ok(None)` when the rule is not applicable to these results and
/// `rule.strict` is unset.
pub fn evaluate(rule: &ScoringRule, tree: &ResultsTree) -> Result<Option<PointsTable>, ScoreError> {
    let node = match tree.resolve(rule.path.as_slice()) {
        Ok(node) => node,
        Err(missing) => {
            return skip_unless_strict(
                rule,
                ScoreError::UnresolvedPath {
                    key: missing.to_string(),
                    path: rule.path.clone(),
                },
            )
        }
    };

    let subtables: Vec<(&str, &ResultsTree)> = match node {
        ResultsTree::Table(_) => vec![(GENERAL_SUBTABLE, node)],
        ResultsTree::Category(children) => children
            .iter()
            .map(|(name, child)| (name.as_str(), child))
            .collect(),
    };

    let mut rows: Vec<(CompetitorKey, i64)> = Vec::new();
    let mut scored_subtables = 0usize;
    for (name, child) in subtables {
        if rule.exclude.contains(name) {
            debug!(rule = %rule.output_name, subtable = name, "subtable excluded by key filter");
            continue;
        }

        let outcome = match child {
            ResultsTree::Table(df) => score_subtable(rule, name, df),
            ResultsTree::Category(_) => Err(ScoreError::NotATable {
                subtable: name.to_string(),
            }),
        };

        match outcome {
            Ok(subtable_rows) => {
                scored_subtables += 1;
                rows.extend(subtable_rows);
            }
            Err(e) if e.is_not_applicable() && !rule.strict => {
                debug!(rule = %rule.output_name, subtable = name, reason = %e, "subtable scores no points");
            }
            Err(e) => return Err(e),
        }
    }

    if scored_subtables == 0 {
        debug!(rule = %rule.output_name, "no subtable produced points");
        return Ok(None);
    }

    let table = PointsTable::from_rows(rule.output_name.clone(), rows);
    debug!(rule = %rule.output_name, competitors = table.len(), "rule scored");
    Ok(Some(table))
}

fn skip_unless_strict(
    rule: &ScoringRule,
    err: ScoreError,
) -> Result<Option<PointsTable>, ScoreError> {
    if rule.strict {
        return Err(err);
    }
    debug!(rule = %rule.output_name, reason = %err, "rule not applicable");
    Ok(None)
}

/// A row that survived filtering, before points are assigned.
struct RankedRow {
    /// `None` when the competitor or team cell is null; such rows take part
    /// in ranking but never receive points.
    key: Option<CompetitorKey>,
    rank: i64,
    points: Option<i64>,
}

fn score_subtable(
    rule: &ScoringRule,
    subtable: &str,
    df: &DataFrame,
) -> Result<Vec<(CompetitorKey, i64)>, ScoreError> {
    let df = drop_non_finishers(df)?;
    if df.height() == 0 {
        return Err(ScoreError::EmptyEligibleSet {
            subtable: subtable.to_string(),
        });
    }

    let mut required = vec![COMPETITOR_COLUMN, TEAM_COLUMN, rule.rank_field.as_str()];
    if let PointsSpec::Column(column) = &rule.points {
        required.push(column.as_str());
    }
    if let Some(missing) = required
        .iter()
        .find(|c| df.get_column_index(c).is_none())
    {
        return Err(ScoreError::MissingRequiredColumn {
            subtable: subtable.to_string(),
            column: missing.to_string(),
        });
    }

    let competitors = text_values(&df, COMPETITOR_COLUMN)?;
    let teams = text_values(&df, TEAM_COLUMN)?;
    let ranks = integer_values(&df, &rule.rank_field).map_err(|detail| {
        ScoreError::RankCastFailure {
            subtable: subtable.to_string(),
            column: rule.rank_field.clone(),
            detail,
        }
    })?;
    let pass_through = match &rule.points {
        PointsSpec::Column(column) => Some(integer_values(&df, column).map_err(|detail| {
            ScoreError::PointsCastFailure {
                subtable: subtable.to_string(),
                column: column.clone(),
                detail,
            }
        })?),
        PointsSpec::Ladder(_) => None,
    };

    let mut ranked: Vec<RankedRow> = competitors
        .into_iter()
        .zip(teams)
        .zip(ranks)
        .enumerate()
        .map(|(i, ((competitor, team), rank))| RankedRow {
            key: competitor
                .zip(team)
                .map(|(competitor, team)| CompetitorKey::new(competitor, team)),
            rank,
            points: pass_through.as_ref().map(|p| p[i]),
        })
        .collect();

    // `sort_by` is stable: tied ranks keep their table order.
    if rule.ascending {
        ranked.sort_by(|a, b| a.rank.cmp(&b.rank));
    } else {
        ranked.sort_by(|a, b| b.rank.cmp(&a.rank));
    }

    let awarded: Vec<(Option<CompetitorKey>, i64)> = match &rule.points {
        PointsSpec::Column(_) => ranked
            .into_iter()
            .filter_map(|row| row.points.map(|p| (row.key, p)))
            .collect(),
        PointsSpec::Ladder(ladder) => {
            let ladder = truncate_ladder(ladder, ranked.len());
            debug!(
                rule = %rule.output_name,
                subtable,
                eligible = ranked.len(),
                scoring = ladder.len(),
                "assigning ladder points"
            );
            ranked
                .into_iter()
                .zip(ladder.iter().copied())
                .map(|(row, points)| (row.key, points))
                .collect()
        }
    };

    Ok(awarded
        .into_iter()
        .filter_map(|(key, points)| key.map(|key| (key, points)))
        .collect())
}

/// The ladder applied to `eligible` rows.
///
/// When fewer rows are eligible than the ladder has entries, the *trailing*
/// entries are kept: three finishers on `[50, 40, 30, 20, 10]` score
/// `[30, 20, 10]`.
pub fn truncate_ladder(ladder: &[i64], eligible: usize) -> &[i64] {
    if eligible < ladder.len() {
        &ladder[ladder.len() - eligible..]
    } else {
        ladder
    }
}

fn drop_non_finishers(df: &DataFrame) -> Result<DataFrame, ScoreError> {
    let Ok(status) = df.column(STATUS_COLUMN) else {
        return Ok(df.clone());
    };
    if status.dtype() != &DataType::String {
        return Ok(df.clone());
    }

    let keep: BooleanChunked = status
        .str()?
        .into_iter()
        .map(|v| !v.is_some_and(is_non_finisher))
        .collect();
    Ok(df.filter(&keep)?)
}

fn text_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>, ScoreError> {
    let values = df.column(column)?.cast(&DataType::String)?;
    Ok(values
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

/// Integer values of `column`; the error carries a description of the first
/// value that could not be converted.
fn integer_values(df: &DataFrame, column: &str) -> Result<Vec<i64>, String> {
    let source = df.column(column).map_err(|e| e.to_string())?;
    let cast = source
        .as_materialized_series()
        .strict_cast(&DataType::Int64)
        .map_err(|e| e.to_string())?;
    let values = cast.i64().map_err(|e| e.to_string())?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| format!("missing value at row {row}")))
        .collect()
}
