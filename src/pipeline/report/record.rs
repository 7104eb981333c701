use serde::{Deserialize, Serialize};

use super::indicators::IndicatorTally;
use super::metadata::PeriodKey;
use crate::pipeline::hash::ContentHash;

/// One accepted report: period, tally and content hash as a flat record.
///
/// Field names are stable and map one-to-one onto export columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub year: u16,
    pub semester: u8,
    pub report_number: u8,
    pub full_period: String,
    #[serde(rename = "Very Good")]
    pub very_good: u32,
    #[serde(rename = "Good")]
    pub good: u32,
    #[serde(rename = "Needs Improvement")]
    pub needs_improvement: u32,
    pub file_hash: ContentHash,
}

impl ExtractionResult {
    pub fn assemble(period: PeriodKey, tally: IndicatorTally, file_hash: ContentHash) -> Self {
        Self {
            year: period.year,
            semester: period.semester,
            report_number: period.report_number,
            full_period: period.full_period(),
            very_good: tally.very_good,
            good: tally.good,
            needs_improvement: tally.needs_improvement,
            file_hash,
        }
    }

    pub fn period(&self) -> PeriodKey {
        PeriodKey {
            year: self.year,
            semester: self.semester,
            report_number: self.report_number,
        }
    }

    pub fn tally(&self) -> IndicatorTally {
        IndicatorTally {
            very_good: self.very_good,
            good: self.good,
            needs_improvement: self.needs_improvement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractionResult {
        ExtractionResult::assemble(
            PeriodKey {
                year: 2023,
                semester: 2,
                report_number: 1,
            },
            IndicatorTally {
                very_good: 4,
                good: 2,
                needs_improvement: 1,
            },
            ContentHash::compute(b"report"),
        )
    }

    #[test]
    fn field_names_are_stable() {
        let json = serde_json::to_value(sample()).unwrap();
        let mut keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "Good",
                "Needs Improvement",
                "Very Good",
                "file_hash",
                "full_period",
                "report_number",
                "semester",
                "year",
            ]
        );
        assert_eq!(json["full_period"], "2023 S2 R1");
        assert_eq!(json["file_hash"], ContentHash::compute(b"report").as_str());
    }

    #[test]
    fn period_and_tally_recoverable() {
        let record = sample();
        assert_eq!(record.period().full_period(), record.full_period);
        assert_eq!(record.tally().total(), 7);
    }
}
