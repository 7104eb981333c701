pub mod indicators;
pub mod metadata;
pub mod record;

pub use indicators::{classify, tally, Indicator, IndicatorTally};
pub use metadata::{parse_period, PeriodKey};
pub use record::ExtractionResult;
