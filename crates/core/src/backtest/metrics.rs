use serde::{Deserialize, Serialize};

use crate::stats;

/// Where a scored record lands in the confusion matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfusionCell {
    /// Bid recommended and the bid would have won.
    TruePositive,
    /// Bid recommended and the bid would have lost.
    FalsePositive,
    /// Skip recommended and the bid would have lost.
    TrueNegative,
    /// Skip recommended but the bid would have won.
    FalseNegative,
}

impl ConfusionCell {
    pub fn classify(participated: bool, would_have_won: bool) -> Self {
        match (participated, would_have_won) {
            (true, true) => Self::TruePositive,
            (true, false) => Self::FalsePositive,
            (false, false) => Self::TrueNegative,
            (false, true) => Self::FalseNegative,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: u32,
    pub false_positive: u32,
    pub true_negative: u32,
    pub false_negative: u32,
}

impl ConfusionMatrix {
    pub fn record(&mut self, cell: ConfusionCell) {
        match cell {
            ConfusionCell::TruePositive => self.true_positive += 1,
            ConfusionCell::FalsePositive => self.false_positive += 1,
            ConfusionCell::TrueNegative => self.true_negative += 1,
            ConfusionCell::FalseNegative => self.false_negative += 1,
        }
    }

    pub fn from_cells(cells: impl IntoIterator<Item = ConfusionCell>) -> Self {
        let mut matrix = Self::default();
        cells.into_iter().for_each(|cell| matrix.record(cell));
        matrix
    }

    pub fn total(&self) -> u32 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    /// `TP / (TP + FP)`, zero when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// `TP / (TP + FN)`, zero when nothing would have won.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (precision, recall) = (self.precision(), self.recall());
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

/// Mean absolute percentage error over `(predicted, actual)` pairs; pairs with a zero actual
/// are skipped.
pub fn mape(pairs: &[(f64, f64)]) -> Option<f64> {
    let errors: Vec<f64> = pairs
        .iter()
        .filter(|(_, actual)| *actual != 0.0)
        .map(|(predicted, actual)| ((predicted - actual) / actual).abs() * 100.0)
        .collect();
    stats::mean(&errors)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub assessment_samples: usize,
    pub assessment_mape: Option<f64>,
    pub assessment_correlation: f64,
    pub bidder_samples: usize,
    pub bidder_mape: Option<f64>,
}

impl AccuracyMetrics {
    pub fn from_pairs(assessment: &[(f64, f64)], bidders: &[(f64, f64)]) -> Self {
        let (predicted, actual): (Vec<f64>, Vec<f64>) = assessment.iter().copied().unzip();
        Self {
            assessment_samples: assessment.len(),
            assessment_mape: mape(assessment),
            assessment_correlation: stats::correlation(&predicted, &actual),
            bidder_samples: bidders.len(),
            bidder_mape: mape(bidders),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profitability {
    pub participated: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub total_profit: f64,
}

/// Per-group counts for the organization and budget-bracket breakdowns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub key: String,
    pub count: u32,
    pub participated: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub f1: f64,
}

impl BreakdownRow {
    pub fn new(key: impl Into<String>, cells: &[ConfusionCell]) -> Self {
        let matrix = ConfusionMatrix::from_cells(cells.iter().copied());
        let participated = matrix.true_positive + matrix.false_positive;
        Self {
            key: key.into(),
            count: matrix.total(),
            participated,
            wins: matrix.true_positive,
            win_rate: ratio(matrix.true_positive, participated),
            f1: matrix.f1(),
        }
    }
}
