//! Price lists and the candidates handed to the optimizer.
//!
//! A price list is a CSV file with (at least) `Rider` and `Price` columns.
//! Joining it with a ledger produces one [`Candidate`] per priced rider:
//! - ledger totals are summed per rider, so a rider listed under two teams
//!   is a single candidate;
//! - a priced rider without ledger entries enters with 0 points;
//! - a ledger rider without a price cannot be picked and is left out.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use peloton_core::results::COMPETITOR_COLUMN;
use peloton_core::{CompetitorId, Ledger};

/// Name of the price column in price lists.
pub const PRICE_COLUMN: &str = "Price";

/// Default field delimiter of price lists.
pub const DEFAULT_DELIMITER: u8 = b';';

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("read price list: {0}")]
    Read(#[from] std::io::Error),

    #[error("parse price list: {0}")]
    Csv(#[from] csv::Error),

    #[error("price list has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("row {row}: invalid price '{value}' for '{rider}'")]
    InvalidPrice {
        row: usize,
        rider: String,
        value: String,
    },

    #[error("rider '{0}' is priced more than once")]
    DuplicateRider(String),
}

/// A rider the optimizer may pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CompetitorId,
    pub points: f64,
    pub price: f64,
}

impl Candidate {
    pub fn new(id: impl Into<String>, points: f64, price: f64) -> Self {
        Self {
            id: CompetitorId::new(id),
            points,
            price,
        }
    }
}

/// Rider prices in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceList {
    prices: Vec<(CompetitorId, f64)>,
}

impl PriceList {
    pub fn new<S: Into<String>>(
        prices: impl IntoIterator<Item = (S, f64)>,
    ) -> Result<Self, PriceError> {
        let mut list = Self::default();
        for (rider, price) in prices {
            list.push(CompetitorId::new(rider), price)?;
        }
        Ok(list)
    }

    fn push(&mut self, rider: CompetitorId, price: f64) -> Result<(), PriceError> {
        if self.prices.iter().any(|(id, _)| *id == rider) {
            return Err(PriceError::DuplicateRider(rider.0));
        }
        self.prices.push((rider, price));
        Ok(())
    }

    /// Parse a price list from any reader.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, PriceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let rider_idx = headers
            .iter()
            .position(|h| h == COMPETITOR_COLUMN)
            .ok_or(PriceError::MissingColumn(COMPETITOR_COLUMN))?;
        let price_idx = headers
            .iter()
            .position(|h| h == PRICE_COLUMN)
            .ok_or(PriceError::MissingColumn(PRICE_COLUMN))?;

        let mut list = Self::default();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let rider = record.get(rider_idx).unwrap_or_default();
            let value = record.get(price_idx).unwrap_or_default();
            let price = value.parse::<f64>().map_err(|_| PriceError::InvalidPrice {
                row: row + 1,
                rider: rider.to_string(),
                value: value.to_string(),
            })?;
            list.push(CompetitorId::new(rider), price)?;
        }
        debug!(riders = list.len(), "price list loaded");
        Ok(list)
    }

    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self, PriceError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, delimiter)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn get(&self, rider: &CompetitorId) -> Option<f64> {
        self.prices
            .iter()
            .find(|(id, _)| id == rider)
            .map(|(_, price)| *price)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompetitorId, f64)> {
        self.prices.iter().map(|(id, price)| (id, *price))
    }
}

/// Join ledger totals with prices, in price-list order.
pub fn join_prices(ledger: &Ledger, prices: &PriceList) -> Vec<Candidate> {
    let totals: BTreeMap<CompetitorId, i64> = ledger.totals_by_competitor();

    let unpriced: Vec<&str> = totals
        .keys()
        .filter(|id| prices.get(id).is_none())
        .map(CompetitorId::as_str)
        .collect();
    if !unpriced.is_empty() {
        warn!(
            count = unpriced.len(),
            riders = ?unpriced,
            "scored riders without a price are not selectable"
        );
    }

    prices
        .iter()
        .map(|(id, price)| Candidate {
            id: id.clone(),
            points: totals.get(id).copied().unwrap_or(0) as f64,
            price,
        })
        .collect()
}
