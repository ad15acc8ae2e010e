//! Domain types: competitor identifiers, events and competitions.

pub mod event;
pub mod ids;

pub use event::{Competition, Event, EventKind};
pub use ids::{CompetitorId, CompetitorKey, TeamId};
