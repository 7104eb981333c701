use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// "Semester <d>, <yyyy> - Progress Report <d>", case-insensitive, comma
/// and whitespace optional, ASCII digits only. Groups: semester, year,
/// report number.
static PERIOD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Semester\s*([0-9]),?\s*([0-9]{4})\s*-\s*Progress\s*Report\s*([0-9])").unwrap()
});

/// Reporting period a document belongs to. All three parts are always
/// present; ordering is chronological (year, semester, report number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: u16,
    pub semester: u8,
    pub report_number: u8,
}

impl PeriodKey {
    /// Display label, e.g. "2023 S2 R1".
    pub fn full_period(&self) -> String {
        format!("{} S{} R{}", self.year, self.semester, self.report_number)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_period())
    }
}

/// Find the reporting period in a document's text.
///
/// Only the full combined pattern counts and the first match wins; a
/// document without it is not a recognized report.
pub fn parse_period(text: &str) -> Option<PeriodKey> {
    let caps = PERIOD_PATTERN.captures(text)?;
    Some(PeriodKey {
        semester: caps[1].parse().ok()?,
        year: caps[2].parse().ok()?,
        report_number: caps[3].parse().ok()?,
    })
}
