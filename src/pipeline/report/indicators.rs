use serde::{Deserialize, Serialize};

use crate::pipeline::extraction::TableRow;

const VERY_GOOD: &str = "very good";
const GOOD: &str = "good (meets expectations)";
const NEEDS_IMPROVEMENT: [&str; 3] = [
    "needs improvement",
    "improvement needed",
    "not consistently meeting expectation",
];

/// Outcome class of a single assessment cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    VeryGood,
    Good,
    NeedsImprovement,
}

/// Classify one cell. Rules are checked in order and the first match wins,
/// so "very good" beats any needs-improvement phrase in the same cell.
pub fn classify(cell: &str) -> Option<Indicator> {
    let text = cell.trim().to_lowercase();
    if text.contains(VERY_GOOD) {
        Some(Indicator::VeryGood)
    } else if text.contains(GOOD) {
        Some(Indicator::Good)
    } else if NEEDS_IMPROVEMENT.iter().any(|term| text.contains(term)) {
        Some(Indicator::NeedsImprovement)
    } else {
        None
    }
}

/// Per-category counts over every assessment cell of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorTally {
    #[serde(rename = "Very Good")]
    pub very_good: u32,
    #[serde(rename = "Good")]
    pub good: u32,
    #[serde(rename = "Needs Improvement")]
    pub needs_improvement: u32,
}

impl IndicatorTally {
    pub fn record(&mut self, indicator: Indicator) {
        match indicator {
            Indicator::VeryGood => self.very_good += 1,
            Indicator::Good => self.good += 1,
            Indicator::NeedsImprovement => self.needs_improvement += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.very_good + self.good + self.needs_improvement
    }
}

/// Count outcomes across all rows. The first cell of each row is the
/// subject label and is never classified; rows with fewer than two cells
/// contribute nothing.
pub fn tally(rows: &[TableRow]) -> IndicatorTally {
    let mut counts = IndicatorTally::default();
    for row in rows.iter().filter(|r| r.len() >= 2) {
        for cell in row.cells.iter().skip(1).flatten() {
            if let Some(indicator) = classify(cell) {
                counts.record(indicator);
            }
        }
    }
    counts
}
