//! Ledgers: aggregated points per competitor.
//!
//! A ledger row holds one points column per rule output name. `Total` is never
//! stored: it is the sum of the row's columns, and a column a competitor did
//! not score in counts as 0.
//!
//! Merging groups cells by (competitor, team) and sums them, so merging is
//! commutative and associative. Rows are ordered by total descending with
//! ties in key order, which makes the merged ledger independent of the order
//! its inputs arrived in.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{CompetitorId, CompetitorKey};
use crate::points::PointsTable;
use crate::results::{COMPETITOR_COLUMN, TEAM_COLUMN};

/// Name of the computed total column in exported frames.
pub const TOTAL_COLUMN: &str = "Total";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: CompetitorKey,
    pub points: BTreeMap<String, i64>,
}

impl LedgerEntry {
    /// Points in `column`, 0 when the competitor did not score in it.
    pub fn column(&self, column: &str) -> i64 {
        self.points.get(column).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.points.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Build a ledger from `(key, column, points)` cells, summing duplicates.
    pub fn from_cells(cells: impl IntoIterator<Item = (CompetitorKey, String, i64)>) -> Self {
        let mut grouped: BTreeMap<CompetitorKey, BTreeMap<String, i64>> = BTreeMap::new();
        for (key, column, points) in cells {
            *grouped.entry(key).or_default().entry(column).or_insert(0) += points;
        }

        let mut entries: Vec<LedgerEntry> = grouped
            .into_iter()
            .map(|(key, points)| LedgerEntry { key, points })
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.total()));
        Self { entries }
    }

    /// One column per table, named after the table.
    pub fn from_tables<'a>(tables: impl IntoIterator<Item = &'a PointsTable>) -> Self {
        Self::from_cells(tables.into_iter().flat_map(|table| {
            table
                .rows()
                .iter()
                .map(move |row| (row.key.clone(), table.name().to_string(), row.points))
        }))
    }

    /// Merge ledgers, summing same-named columns per competitor.
    pub fn merge<'a>(ledgers: impl IntoIterator<Item = &'a Ledger>) -> Self {
        Self::from_cells(ledgers.into_iter().flat_map(|ledger| {
            ledger.entries.iter().flat_map(|entry| {
                entry
                    .points
                    .iter()
                    .map(move |(column, points)| (entry.key.clone(), column.clone(), *points))
            })
        }))
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &CompetitorKey) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    /// Union of all points columns, sorted by name.
    pub fn columns(&self) -> Vec<&str> {
        let columns: BTreeSet<&str> = self
            .entries
            .iter()
            .flat_map(|e| e.points.keys().map(|c| c.as_str()))
            .collect();
        columns.into_iter().collect()
    }

    /// Sum of all totals.
    pub fn grand_total(&self) -> i64 {
        self.entries.iter().map(LedgerEntry::total).sum()
    }

    /// Totals per competitor, summed over every team they appear under.
    pub fn totals_by_competitor(&self) -> BTreeMap<CompetitorId, i64> {
        let mut totals = BTreeMap::new();
        for entry in &self.entries {
            *totals.entry(entry.key.competitor.clone()).or_insert(0) += entry.total();
        }
        totals
    }

    /// `Rider`, `Team`, one column per points column (0-filled), `Total`.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let competitors: Vec<&str> = self.entries.iter().map(|e| e.key.competitor.as_str()).collect();
        let teams: Vec<&str> = self.entries.iter().map(|e| e.key.team.as_str()).collect();

        let mut columns = vec![
            Column::new(COMPETITOR_COLUMN.into(), competitors),
            Column::new(TEAM_COLUMN.into(), teams),
        ];
        for name in self.columns() {
            let values: Vec<i64> = self.entries.iter().map(|e| e.column(name)).collect();
            columns.push(Column::new(name.into(), values));
        }
        let totals: Vec<i64> = self.entries.iter().map(LedgerEntry::total).collect();
        columns.push(Column::new(TOTAL_COLUMN.into(), totals));

        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(rider: &str) -> CompetitorKey {
        CompetitorKey::new(rider, "T")
    }

    #[test]
    fn total_is_sum_of_columns_with_absent_as_zero() {
        let stage = PointsTable::from_rows("Stage", vec![(key("A"), 50), (key("B"), 40)]);
        let gc = PointsTable::from_rows("GC", vec![(key("B"), 20)]);
        let ledger = Ledger::from_tables([&stage, &gc]);

        let a = ledger.get(&key("A")).unwrap();
        assert_eq!(a.column("GC"), 0);
        assert_eq!(a.total(), 50);

        let b = ledger.get(&key("B")).unwrap();
        assert_eq!(b.total(), 60);
        assert_eq!(ledger.entries()[0].key, key("B"));
        assert_eq!(ledger.columns(), vec!["GC", "Stage"]);
    }

    #[test]
    fn same_named_tables_share_a_column() {
        let first = PointsTable::from_rows("Rnk", vec![(key("A"), 5)]);
        let second = PointsTable::from_rows("Rnk", vec![(key("A"), 3)]);
        let ledger = Ledger::from_tables([&first, &second]);
        assert_eq!(ledger.get(&key("A")).unwrap().column("Rnk"), 8);
        assert_eq!(ledger.columns(), vec!["Rnk"]);
    }

    #[test]
    fn merge_is_order_independent() {
        let one = Ledger::from_tables([&PointsTable::from_rows("Stage", vec![(key("A"), 10), (key("B"), 10)])]);
        let two = Ledger::from_tables([&PointsTable::from_rows("GC", vec![(key("C"), 20)])]);
        let three = Ledger::from_tables([&PointsTable::from_rows("Stage", vec![(key("B"), 5)])]);

        let forward = Ledger::merge([&one, &two, &three]);
        let backward = Ledger::merge([&three, &two, &one]);
        let nested = Ledger::merge([&Ledger::merge([&one, &two]), &three]);
        assert_eq!(forward, backward);
        assert_eq!(forward, nested);
        assert_eq!(forward.grand_total(), 45);
    }

    #[test]
    fn ties_are_ordered_by_key() {
        let ledger = Ledger::from_tables([&PointsTable::from_rows(
            "Stage",
            vec![(key("C"), 10), (key("A"), 10), (key("B"), 10)],
        )]);
        let names: Vec<&str> = ledger.entries().iter().map(|e| e.key.competitor.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn totals_by_competitor_sum_across_teams() {
        let table = PointsTable::from_rows(
            "Stage",
            vec![
                (CompetitorKey::new("A", "Old"), 10),
                (CompetitorKey::new("A", "New"), 15),
            ],
        );
        let ledger = Ledger::from_tables([&table]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.totals_by_competitor()[&CompetitorId::new("A")], 25);
    }

    #[test]
    fn dataframe_has_zero_filled_columns_and_total() {
        let stage = PointsTable::from_rows("Stage", vec![(key("A"), 50)]);
        let gc = PointsTable::from_rows("GC", vec![(key("B"), 20)]);
        let df = Ledger::from_tables([&stage, &gc]).to_dataframe().unwrap();

        assert_eq!(df.height(), 2);
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["Rider", "Team", "GC", "Stage", "Total"]);

        let gc: Vec<Option<i64>> = df.column("GC").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(gc, vec![Some(0), Some(20)]);
    }
}
