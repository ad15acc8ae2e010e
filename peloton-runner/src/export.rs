//! Export: ledger CSV, selection JSON and plain-text reports.
//!
//! Ledger CSV columns: `Rider`, `Team`, one column per points column, `Total`.
//! Reading a ledger back ignores the stored `Total` and recomputes it from
//! the other columns.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};

use peloton_core::results::{COMPETITOR_COLUMN, TEAM_COLUMN};
use peloton_core::{CompetitorKey, Ledger, TOTAL_COLUMN};

use crate::optimizer::Selection;

// ─── Ledger CSV ─────────────────────────────────────────────────────

/// Serialize a ledger as CSV, best total first.
pub fn export_ledger_csv(ledger: &Ledger) -> Result<String> {
    let columns = ledger.columns();
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![COMPETITOR_COLUMN, TEAM_COLUMN];
    header.extend(columns.iter().copied());
    header.push(TOTAL_COLUMN);
    wtr.write_record(&header)?;

    for entry in ledger.entries() {
        let mut record = vec![
            entry.key.competitor.to_string(),
            entry.key.team.to_string(),
        ];
        record.extend(columns.iter().map(|c| entry.column(c).to_string()));
        record.push(entry.total().to_string());
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Parse a ledger CSV. Empty cells count as "did not score".
pub fn import_ledger_csv(content: &str) -> Result<Ledger> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = rdr.headers().context("ledger CSV has no header")?.clone();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let (Some(rider_idx), Some(team_idx)) = (position(COMPETITOR_COLUMN), position(TEAM_COLUMN))
    else {
        bail!("ledger CSV needs '{COMPETITOR_COLUMN}' and '{TEAM_COLUMN}' columns");
    };
    let points_columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != rider_idx && *i != team_idx && *h != TOTAL_COLUMN)
        .collect();

    let mut cells = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("ledger CSV row {}", row + 1))?;
        let key = CompetitorKey::new(
            record.get(rider_idx).unwrap_or_default(),
            record.get(team_idx).unwrap_or_default(),
        );
        for &(idx, column) in &points_columns {
            let value = record.get(idx).unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            let points: i64 = value.parse().with_context(|| {
                format!("ledger CSV row {}: '{value}' in '{column}' is not an integer", row + 1)
            })?;
            cells.push((key.clone(), column.to_string(), points));
        }
    }
    Ok(Ledger::from_cells(cells))
}

pub fn write_ledger_csv(ledger: &Ledger, path: &Path) -> Result<()> {
    let csv = export_ledger_csv(ledger)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_ledger_csv(path: &Path) -> Result<Ledger> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_ledger_csv(&content)
}

// ─── Selection ──────────────────────────────────────────────────────

/// Serialize a selection to pretty JSON.
pub fn export_selection_json(selection: &Selection) -> Result<String> {
    serde_json::to_string_pretty(selection).context("failed to serialize Selection to JSON")
}

/// Human-readable team listing.
pub fn format_selection(selection: &Selection) -> String {
    let width = selection
        .members
        .iter()
        .map(|c| c.id.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max(COMPETITOR_COLUMN.len());

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:>8}  {:>8}", COMPETITOR_COLUMN, "Points", "Price");
    for c in &selection.members {
        let _ = writeln!(out, "{:<width$}  {:>8}  {:>8}", c.id.as_str(), c.points, c.price);
    }
    let _ = writeln!(
        out,
        "{:<width$}  {:>8}  {:>8}",
        TOTAL_COLUMN, selection.objective, selection.total_price
    );
    out
}
