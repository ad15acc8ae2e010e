use serde::{Deserialize, Serialize};
use std::fmt;

/// Competitor identifier as it appears in the `Rider` column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompetitorId(pub String);

impl CompetitorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Team identifier as it appears in the `Team` column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grouping key of every points table and ledger: (competitor, team).
///
/// The derived ordering (competitor first, then team) is the tie-break order
/// of ledgers, which keeps merges independent of input order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompetitorKey {
    pub competitor: CompetitorId,
    pub team: TeamId,
}

impl CompetitorKey {
    pub fn new(competitor: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            competitor: CompetitorId::new(competitor),
            team: TeamId::new(team),
        }
    }
}

impl fmt::Display for CompetitorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.competitor, self.team)
    }
}
