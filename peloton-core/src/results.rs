//! Results trees: the nested result tables of one event.
//!
//! A results page is a tree of named categories ("Stage", "GC", "Points", ...)
//! whose leaves are tables of rows. Categories may nest (a "GC" tab holding
//! "General" and "Today" subtables). Leaves are polars `DataFrame`s so that the
//! evaluator can filter, cast and sort columns by name.
//!
//! JSON documents map onto the tree directly: objects are categories and arrays
//! of row objects are tables. Every cell is stored as a string column (or null),
//! and typed conversion happens at scoring time where failures can be reported
//! against the rule that needed them.

use polars::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Column holding the competitor name.
pub const COMPETITOR_COLUMN: &str = "Rider";
/// Column holding the team name.
pub const TEAM_COLUMN: &str = "Team";
/// Column holding the finishing rank or a non-finisher status code.
pub const STATUS_COLUMN: &str = "Rnk";
/// Name given to a rule's subtable when its path resolves to a single table.
pub const GENERAL_SUBTABLE: &str = "general";

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("read results file: {0}")]
    Read(#[from] std::io::Error),

    #[error("parse results JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("row {row} is not an object")]
    RowNotObject { row: usize },

    #[error("row {row}, column '{column}': nested values are not allowed in table cells")]
    NestedCell { row: usize, column: String },

    #[error("expected an object or an array of rows, found {found}")]
    UnexpectedValue { found: &'static str },

    #[error("dataframe error: {0}")]
    Frame(#[from] PolarsError),
}

/// A node of an event's results: a leaf table or a named category.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Value")]
pub enum ResultsTree {
    Table(DataFrame),
    Category(BTreeMap<String, ResultsTree>),
}

impl ResultsTree {
    /// Build a category node from `(name, child)` pairs.
    pub fn category<K: Into<String>>(children: impl IntoIterator<Item = (K, ResultsTree)>) -> Self {
        Self::Category(
            children
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        )
    }

    /// An empty category, the results of an event that has not been run yet.
    pub fn empty() -> Self {
        Self::Category(BTreeMap::new())
    }

    pub fn as_table(&self) -> Option<&DataFrame> {
        match self {
            Self::Table(df) => Some(df),
            Self::Category(_) => None,
        }
    }

    /// Child node by name. Tables have no children.
    pub fn get(&self, key: &str) -> Option<&ResultsTree> {
        match self {
            Self::Table(_) => None,
            Self::Category(children) => children.get(key),
        }
    }

    /// Names of the available results at this node, in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Table(_) => Vec::new(),
            Self::Category(children) => children.keys().map(|k| k.as_str()).collect(),
        }
    }

    /// Walk `path` from this node. On failure, returns the first missing key.
    pub fn resolve<'a, 'p, S: AsRef<str>>(
        &'a self,
        path: &'p [S],
    ) -> Result<&'a ResultsTree, &'p str> {
        let mut node = self;
        for key in path {
            let key = key.as_ref();
            node = node.get(key).ok_or(key)?;
        }
        Ok(node)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Table(df) => df.height() == 0,
            Self::Category(children) => children.is_empty(),
        }
    }

    /// Parse a results tree from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self, ResultsError> {
        let value: Value = serde_json::from_str(content)?;
        Self::try_from(value)
    }

    /// Load a results tree from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ResultsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl TryFrom<Value> for ResultsTree {
    type Error = ResultsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(children) => children
                .into_iter()
                .map(|(name, child)| Ok((name, ResultsTree::try_from(child)?)))
                .collect::<Result<BTreeMap<_, _>, ResultsError>>()
                .map(Self::Category),
            Value::Array(rows) => table_from_records(&rows).map(Self::Table),
            other => Err(ResultsError::UnexpectedValue {
                found: value_kind(&other),
            }),
        }
    }
}

/// Build a string-typed table from JSON row objects.
///
/// Columns appear in first-seen order; a row without a column gets a null
/// cell. Numbers and booleans keep their JSON text.
pub fn table_from_records(rows: &[Value]) -> Result<DataFrame, ResultsError> {
    let mut names: Vec<String> = Vec::new();
    let mut cells: Vec<Vec<Option<String>>> = Vec::new();

    for (row_idx, row) in rows.iter().enumerate() {
        let fields: &Map<String, Value> = row
            .as_object()
            .ok_or(ResultsError::RowNotObject { row: row_idx })?;

        for (name, value) in fields {
            let col = match names.iter().position(|n| n == name) {
                Some(col) => col,
                None => {
                    names.push(name.clone());
                    cells.push(vec![None; row_idx]);
                    names.len() - 1
                }
            };
            let cell = cell_text(value).ok_or_else(|| ResultsError::NestedCell {
                row: row_idx,
                column: name.clone(),
            })?;
            cells[col].push(cell);
        }

        for column in cells.iter_mut() {
            if column.len() <= row_idx {
                column.push(None);
            }
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::new(name.into(), values))
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Text of a scalar cell; `None` for nested values.
fn cell_text(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        Value::Number(n) => Some(Some(n.to_string())),
        Value::Bool(b) => Some(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE_JSON: &str = r#"{
        "Stage": {
            "General": [
                {"Rnk": "1", "Rider": "Pogacar Tadej", "Team": "UAE"},
                {"Rnk": 2, "Rider": "Vingegaard Jonas", "Team": "Visma"},
                {"Rnk": "DNF", "Rider": "Roglic Primoz", "Team": "Red Bull"}
            ]
        },
        "GC": {
            "General": [{"Rnk": "1", "Rider": "Pogacar Tadej", "Team": "UAE", "Time": null}],
            "Today": []
        }
    }"#;

    #[test]
    fn json_objects_become_categories() {
        let tree = ResultsTree::from_json_str(STAGE_JSON).unwrap();
        assert_eq!(tree.keys(), vec!["GC", "Stage"]);
        assert_eq!(tree.get("GC").unwrap().keys(), vec!["General", "Today"]);
    }

    #[test]
    fn json_arrays_become_string_tables() {
        let tree = ResultsTree::from_json_str(STAGE_JSON).unwrap();
        let df = tree
            .resolve(&["Stage", "General"])
            .unwrap()
            .as_table()
            .unwrap();
        assert_eq!(df.height(), 3);
        let ranks: Vec<Option<&str>> = df.column("Rnk").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ranks, vec![Some("1"), Some("2"), Some("DNF")]);
    }

    #[test]
    fn missing_cells_are_null() {
        let rows: Vec<Value> = serde_json::from_str(
            r#"[{"Rider": "A", "Team": "X"}, {"Rider": "B", "Team": "Y", "Pnt": "20"}]"#,
        )
        .unwrap();
        let df = table_from_records(&rows).unwrap();
        let pnt: Vec<Option<&str>> = df.column("Pnt").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(pnt, vec![None, Some("20")]);
    }

    #[test]
    fn resolve_reports_first_missing_key() {
        let tree = ResultsTree::from_json_str(STAGE_JSON).unwrap();
        let path = ["GC", "Youth", "General"];
        assert_eq!(tree.resolve(&path).unwrap_err(), "Youth");
    }

    #[test]
    fn resolve_through_table_fails() {
        let tree = ResultsTree::from_json_str(STAGE_JSON).unwrap();
        let path = ["Stage", "General", "Extra"];
        assert_eq!(tree.resolve(&path).unwrap_err(), "Extra");
    }

    #[test]
    fn empty_path_resolves_to_root() {
        let tree = ResultsTree::from_json_str(STAGE_JSON).unwrap();
        let path: [&str; 0] = [];
        assert_eq!(tree.resolve(&path).unwrap().keys().len(), 2);
    }

    #[test]
    fn scalar_documents_are_rejected() {
        let err = ResultsTree::from_json_str("42").unwrap_err();
        assert!(matches!(err, ResultsError::UnexpectedValue { found: "a number" }));
    }

    #[test]
    fn nested_cells_are_rejected() {
        let err = ResultsTree::from_json_str(r#"[{"Rider": {"first": "A"}}]"#).unwrap_err();
        assert!(matches!(err, ResultsError::NestedCell { row: 0, .. }));
    }

    #[test]
    fn empty_table_has_no_rows() {
        let tree = ResultsTree::from_json_str(STAGE_JSON).unwrap();
        assert!(tree.resolve(&["GC", "Today"]).unwrap().is_empty());
    }
}
