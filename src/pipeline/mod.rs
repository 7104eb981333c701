pub mod hash;
pub mod extraction;
pub mod report;
pub mod processor;
pub mod batch;

pub use batch::{process_batch, BatchOutcome, Rejection, ReportSession, Upload};
pub use processor::{process_document, ProcessingError, ReportProcessor};
