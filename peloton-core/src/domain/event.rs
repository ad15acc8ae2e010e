use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::results::{ResultsError, ResultsTree};

/// Format of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Stage,
    Prologue,
    #[serde(rename = "ITT")]
    IndividualTimeTrial,
    #[serde(rename = "TTT")]
    TeamTimeTrial,
    OneDay,
}

/// One day of racing and its results.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub kind: Option<EventKind>,
    /// Results of an event that has not been raced yet are an empty category.
    #[serde(default = "ResultsTree::empty")]
    pub results: ResultsTree,
}

impl Event {
    pub fn new(name: impl Into<String>, results: ResultsTree) -> Self {
        Self {
            name: name.into(),
            number: None,
            date: None,
            kind: None,
            results,
        }
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(number) = self.number {
            write!(f, " #{number}")?;
        }
        if let Some(date) = self.date {
            write!(f, " ({date})")?;
        }
        Ok(())
    }
}

/// A competition: one event for one-day races, one per stage otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct Competition {
    pub name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Competition {
    pub fn new(name: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            name: name.into(),
            date: None,
            events,
        }
    }

    /// A one-day race: a single event carrying the competition's name.
    pub fn one_day(name: impl Into<String>, date: Option<NaiveDate>, results: ResultsTree) -> Self {
        let name = name.into();
        let mut event = Event::new(name.clone(), results)
            .with_number(1)
            .with_kind(EventKind::OneDay);
        event.date = date;
        Self {
            name,
            date,
            events: vec![event],
        }
    }

    /// The last event, where the final classifications are published.
    pub fn final_event(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn from_json_str(content: &str) -> Result<Self, ResultsError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ResultsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} events)", self.name, self.events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_competition_document() {
        let json = r#"{
            "name": "Tour de Suisse",
            "events": [
                {"name": "Einsiedeln - Einsiedeln", "number": 1, "date": "2023-06-11", "kind": "ITT",
                 "results": {"Stage": {"General": [{"Rnk": "1", "Rider": "A", "Team": "X"}]}}},
                {"name": "Chur - Oberwil-Lieli", "number": 6, "kind": "Stage"}
            ]
        }"#;
        let c = Competition::from_json_str(json).unwrap();
        assert_eq!(c.events.len(), 2);
        assert_eq!(c.events[0].kind, Some(EventKind::IndividualTimeTrial));
        assert_eq!(c.events[0].to_string(), "Einsiedeln - Einsiedeln #1 (2023-06-11)");
        assert!(c.final_event().unwrap().results.is_empty());
    }

    #[test]
    fn one_day_race_has_single_event() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 4);
        let c = Competition::one_day("Strade Bianche", date, ResultsTree::empty());
        assert_eq!(c.events.len(), 1);
        let event = c.final_event().unwrap();
        assert_eq!(event.name, "Strade Bianche");
        assert_eq!(event.kind, Some(EventKind::OneDay));
        assert_eq!(event.date, date);
    }
}
