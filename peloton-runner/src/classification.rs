//! Prediction statistics: how well a predicted ranking finds the top N.
//!
//! A competitor is "positive" when its value is at or above the N-th largest
//! value of its series. Comparing the actual and the predicted series gives
//! the four binary classification counts, a 2×2 confusion matrix and an
//! F-beta score.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use peloton_core::{CompetitorId, Ledger};

#[derive(Debug, Error, PartialEq)]
pub enum ClassificationError {
    #[error("series lengths differ: {actual} actual vs {predicted} predicted")]
    LengthMismatch { actual: usize, predicted: usize },

    #[error("top {n} is out of range for {len} values")]
    TopNOutOfRange { n: usize, len: usize },

    #[error("value {0} is not finite")]
    NonFinite(f64),
}

/// Binary classification counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }

    /// Rows are the predicted-positive and predicted-negative groups, columns
    /// their actual membership.
    pub fn confusion_matrix(&self) -> ConfusionMatrix {
        ConfusionMatrix([
            [self.true_positive, self.false_positive],
            [self.false_negative, self.true_negative],
        ])
    }

    /// F-beta score. 0 when there are no positives at all.
    pub fn f_score(&self, beta: f64) -> f64 {
        let b2 = beta * beta;
        let tp = self.true_positive as f64;
        let denominator =
            (1.0 + b2) * tp + b2 * self.false_negative as f64 + self.false_positive as f64;
        if denominator == 0.0 {
            return 0.0;
        }
        (1.0 + b2) * tp / denominator
    }
}

/// 2×2 confusion matrix, `[[TP, FP], [FN, TN]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix(pub [[usize; 2]; 2]);

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [[tp, fp], [fn_, tn]] = self.0;
        writeln!(f, "{:>16} {:>10} {:>10}", "", "actual +", "actual -")?;
        writeln!(f, "{:>16} {:>10} {:>10}", "predicted +", tp, fp)?;
        write!(f, "{:>16} {:>10} {:>10}", "predicted -", fn_, tn)
    }
}

/// Classify every index of `actual`/`predicted` against their top-`n` cut.
pub fn classify(
    actual: &[f64],
    predicted: &[f64],
    n: usize,
) -> Result<Classification, ClassificationError> {
    if actual.len() != predicted.len() {
        return Err(ClassificationError::LengthMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }
    if n == 0 || n > actual.len() {
        return Err(ClassificationError::TopNOutOfRange {
            n,
            len: actual.len(),
        });
    }
    if let Some(&bad) = actual.iter().chain(predicted).find(|v| !v.is_finite()) {
        return Err(ClassificationError::NonFinite(bad));
    }

    let actual_cut = nth_largest(actual, n);
    let predicted_cut = nth_largest(predicted, n);

    let mut counts = Classification::default();
    for (&a, &p) in actual.iter().zip(predicted) {
        match (a >= actual_cut, p >= predicted_cut) {
            (true, true) => counts.true_positive += 1,
            (false, true) => counts.false_positive += 1,
            (true, false) => counts.false_negative += 1,
            (false, false) => counts.true_negative += 1,
        }
    }
    Ok(counts)
}

/// Compare two ledgers by competitor total.
///
/// Competitors present in only one ledger count with 0 in the other.
pub fn classify_ledgers(
    actual: &Ledger,
    predicted: &Ledger,
    n: usize,
) -> Result<Classification, ClassificationError> {
    let actual_totals = actual.totals_by_competitor();
    let predicted_totals = predicted.totals_by_competitor();

    let mut paired: BTreeMap<&CompetitorId, (f64, f64)> = BTreeMap::new();
    for (id, total) in &actual_totals {
        paired.entry(id).or_default().0 = *total as f64;
    }
    for (id, total) in &predicted_totals {
        paired.entry(id).or_default().1 = *total as f64;
    }

    let (a, p): (Vec<f64>, Vec<f64>) = paired.into_values().unzip();
    classify(&a, &p, n)
}

fn nth_largest(values: &[f64], n: usize) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted[n - 1]
}
