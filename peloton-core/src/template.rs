//! Score templates: the declarative rule set a pool is scored with.
//!
//! A template holds two named groups of rules: `event` rules are applied to the
//! results of every event (stage), `competition` rules only to the final
//! event's results, where the overall classifications live. On disk this is a
//! TOML document:
//!
//! ```toml
//! [stage.stage_result]
//! key = ["Stage", "General"]
//! points = [50, 40, 30, 20, 10]
//! name = "Stage"
//!
//! [race.final_gc]
//! key = ["GC", "General"]
//! points = [150, 100, 75]
//! name = "GC"
//! ```
//!
//! `stage`/`race` are accepted as aliases of `event`/`competition`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

use crate::results::STATUS_COLUMN;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("read template file: {0}")]
    Read(#[from] std::io::Error),

    #[error("parse template TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize template: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid rule: {0}")]
    InvalidRule(String),
}

/// How a rule turns sorted rows into points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointsSpec {
    /// Point values assigned by finishing position.
    Ladder(Vec<i64>),
    /// Name of a column whose values are used as points unchanged.
    Column(String),
}

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

fn default_rank_by() -> String {
    STATUS_COLUMN.to_string()
}

fn default_ascending() -> bool {
    true
}

/// Rule parameters in their document form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleParams {
    pub key: OneOrMany,
    #[serde(default, alias = "keyFilter", skip_serializing_if = "Option::is_none")]
    pub key_filter: Option<OneOrMany>,
    #[serde(default = "default_rank_by", alias = "rankBy")]
    pub rank_by: String,
    pub points: PointsSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    #[serde(default)]
    pub strict: bool,
}

/// One scoring rule, normalized from [`RuleParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleParams", into = "RuleParams")]
pub struct ScoringRule {
    /// Keys walked from the root of an event's results tree.
    pub path: Vec<String>,
    /// Subtable names skipped when the path resolves to a category.
    pub exclude: BTreeSet<String>,
    /// Column rows are ordered by.
    pub rank_field: String,
    pub points: PointsSpec,
    /// Name of the produced points column.
    pub output_name: String,
    pub ascending: bool,
    /// Turn "not applicable" outcomes into errors.
    pub strict: bool,
}

impl ScoringRule {
    /// A ladder rule ranked by `Rnk`, ascending, non-strict.
    pub fn ladder<S: Into<String>>(
        path: impl IntoIterator<Item = S>,
        ladder: Vec<i64>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            exclude: BTreeSet::new(),
            rank_field: default_rank_by(),
            points: PointsSpec::Ladder(ladder),
            output_name: output_name.into(),
            ascending: true,
            strict: false,
        }
    }

    /// A pass-through rule reading points from `column`.
    pub fn pass_through<S: Into<String>>(
        path: impl IntoIterator<Item = S>,
        column: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            points: PointsSpec::Column(column.into()),
            ..Self::ladder(path, Vec::new(), output_name)
        }
    }

    pub fn excluding<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn ranked_by(mut self, column: impl Into<String>) -> Self {
        self.rank_field = column.into();
        self
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl TryFrom<RuleParams> for ScoringRule {
    type Error = TemplateError;

    fn try_from(params: RuleParams) -> Result<Self, Self::Error> {
        let path = params.key.into_vec();
        if path.is_empty() {
            return Err(TemplateError::InvalidRule("`key` must name at least one key".into()));
        }
        if params.rank_by.is_empty() {
            return Err(TemplateError::InvalidRule("`rank_by` must not be empty".into()));
        }
        if matches!(&params.points, PointsSpec::Column(c) if c.is_empty()) {
            return Err(TemplateError::InvalidRule("`points` column name must not be empty".into()));
        }

        let output_name = params.name.unwrap_or_else(|| params.rank_by.clone());
        Ok(Self {
            path,
            exclude: params
                .key_filter
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            rank_field: params.rank_by,
            points: params.points,
            output_name,
            ascending: params.ascending,
            strict: params.strict,
        })
    }
}

impl From<ScoringRule> for RuleParams {
    fn from(rule: ScoringRule) -> Self {
        let key_filter = if rule.exclude.is_empty() {
            None
        } else {
            Some(OneOrMany::Many(rule.exclude.into_iter().collect()))
        };
        let name = (rule.output_name != rule.rank_field).then_some(rule.output_name);
        Self {
            key: OneOrMany::Many(rule.path),
            key_filter,
            rank_by: rule.rank_field,
            points: rule.points,
            name,
            ascending: rule.ascending,
            strict: rule.strict,
        }
    }
}

/// The complete, immutable rule set of a scoring run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTemplate {
    #[serde(default, alias = "stage")]
    pub event: BTreeMap<String, ScoringRule>,
    #[serde(default, alias = "race")]
    pub competition: BTreeMap<String, ScoringRule>,
}

impl ScoreTemplate {
    /// Load a template from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a template from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, TemplateError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, TemplateError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn rule_count(&self) -> usize {
        self.event.len() + self.competition.len()
    }

    /// BLAKE3 fingerprint of the canonical JSON form.
    ///
    /// Rule maps are `BTreeMap`s, so two templates with the same rules produce
    /// the same fingerprint regardless of document order.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("ScoreTemplate must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
