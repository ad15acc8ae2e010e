//! Points tables: the output of applying one rule to one event.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::CompetitorKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRow {
    pub key: CompetitorKey,
    pub points: i64,
}

/// Points of one rule, at most one row per competitor key.
///
/// Rows are ordered by points descending; equal points keep key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsTable {
    name: String,
    rows: Vec<PointsRow>,
}

impl PointsTable {
    /// Build a table named `name`, summing rows that share a key.
    pub fn from_rows(
        name: impl Into<String>,
        rows: impl IntoIterator<Item = (CompetitorKey, i64)>,
    ) -> Self {
        let mut grouped: BTreeMap<CompetitorKey, i64> = BTreeMap::new();
        for (key, points) in rows {
            *grouped.entry(key).or_insert(0) += points;
        }

        let mut rows: Vec<PointsRow> = grouped
            .into_iter()
            .map(|(key, points)| PointsRow { key, points })
            .collect();
        rows.sort_by(|a, b| b.points.cmp(&a.points));

        Self {
            name: name.into(),
            rows,
        }
    }

    /// Name of the points column this table fills.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[PointsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &CompetitorKey) -> Option<i64> {
        self.rows.iter().find(|r| &r.key == key).map(|r| r.points)
    }

    pub fn total(&self) -> i64 {
        self.rows.iter().map(|r| r.points).sum()
    }
}
