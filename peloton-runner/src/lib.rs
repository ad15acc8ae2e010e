//! Peloton Runner: price lists, team selection, prediction statistics.
//!
//! This crate builds on `peloton-core` to provide:
//! - Price lists and the ledger/price join into selection candidates
//! - Budget-constrained team selection (branch-and-bound)
//! - Top-N prediction statistics (confusion counts, F-beta)
//! - Pool configuration from TOML
//! - Ledger CSV and selection JSON export
//! - The end-to-end pool pipeline

pub mod candidate;
pub mod classification;
pub mod config;
pub mod export;
pub mod optimizer;
pub mod runner;

pub use candidate::{join_prices, Candidate, PriceError, PriceList};
pub use classification::{
    classify, classify_ledgers, Classification, ClassificationError, ConfusionMatrix,
};
pub use config::{ConfigError, PoolConfig};
pub use optimizer::{select_team, SelectError, Selection, SolverLimits};
pub use runner::{run_pool, PoolError, PoolReport};
