//! Report processing orchestrator.
//!
//! Single entry point that drives the pipeline for one document:
//! hash → dedup check → text → period → tables → tally → record.
//!
//! The decoder is injected as a trait object so the orchestrator stays
//! testable with `MockDecoder`. Every outcome, including panics raised
//! below this boundary, resolves to a record or a `ProcessingError`.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info};

use crate::pipeline::extraction::{
    extract_tables, extract_text, DocumentDecoder, ExtractionError, PdfiumDecoder,
};
use crate::pipeline::hash::ContentHash;
use crate::pipeline::report::{parse_period, tally, ExtractionResult};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a document was rejected. Each message names the file.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("'{filename}' has already been uploaded in this session.")]
    DuplicateInput { filename: String },

    #[error("Failed to extract text from '{filename}': {source}")]
    DecodeFailure {
        filename: String,
        #[source]
        source: ExtractionError,
    },

    #[error("The PDF file '{filename}' appears to be empty or contains no extractable text.")]
    EmptyContent { filename: String },

    #[error("Could not find required metadata pattern in '{filename}'. PDF ignored.")]
    MetadataNotFound { filename: String },

    #[error("No assessment tables found in the PDF file '{filename}'.")]
    NoTablesFound { filename: String },

    #[error("Error processing '{filename}': {message}")]
    UnexpectedFault { filename: String, message: String },
}

impl ProcessingError {
    pub fn filename(&self) -> &str {
        match self {
            Self::DuplicateInput { filename }
            | Self::DecodeFailure { filename, .. }
            | Self::EmptyContent { filename }
            | Self::MetadataNotFound { filename }
            | Self::NoTablesFound { filename }
            | Self::UnexpectedFault { filename, .. } => filename,
        }
    }

    /// Short machine-friendly name of the rejection class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateInput { .. } => "duplicate_input",
            Self::DecodeFailure { .. } => "decode_failure",
            Self::EmptyContent { .. } => "empty_content",
            Self::MetadataNotFound { .. } => "metadata_not_found",
            Self::NoTablesFound { .. } => "no_tables_found",
            Self::UnexpectedFault { .. } => "unexpected_fault",
        }
    }

    fn from_text_failure(filename: &str, source: ExtractionError) -> Self {
        match source {
            // Not a property of the document: the decoder itself is missing.
            ExtractionError::LibraryUnavailable(message) => Self::UnexpectedFault {
                filename: filename.to_string(),
                message,
            },
            source => Self::DecodeFailure {
                filename: filename.to_string(),
                source,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Stateless report processor. Safe to share across threads; the only
/// cross-call state is the caller's duplicate set, which is only read.
pub struct ReportProcessor {
    decoder: Box<dyn DocumentDecoder>,
}

impl ReportProcessor {
    pub fn new(decoder: Box<dyn DocumentDecoder>) -> Self {
        Self { decoder }
    }

    /// Processor backed by PDFium. Fails if the library cannot be loaded.
    pub fn with_pdfium() -> Result<Self, ExtractionError> {
        Ok(Self::new(Box::new(PdfiumDecoder::new()?)))
    }

    /// Process one document.
    ///
    /// `seen` holds hashes the caller has already accepted. It is never
    /// modified here; adding the hash of an accepted record is up to the
    /// caller.
    pub fn process(
        &self,
        bytes: &[u8],
        filename: &str,
        seen: &HashSet<ContentHash>,
    ) -> Result<ExtractionResult, ProcessingError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            process_document(&*self.decoder, bytes, filename, seen)
        }));

        let result = outcome.unwrap_or_else(|payload| {
            Err(ProcessingError::UnexpectedFault {
                filename: filename.to_string(),
                message: panic_message(payload.as_ref()),
            })
        });

        match &result {
            Ok(record) => info!(
                file = %filename,
                period = %record.full_period,
                very_good = record.very_good,
                good = record.good,
                needs_improvement = record.needs_improvement,
                "Report accepted"
            ),
            Err(e) => info!(file = %filename, kind = e.kind(), reason = %e, "Report rejected"),
        }

        result
    }
}

/// Run the pipeline steps in order, stopping at the first rejection.
pub fn process_document(
    decoder: &dyn DocumentDecoder,
    bytes: &[u8],
    filename: &str,
    seen: &HashSet<ContentHash>,
) -> Result<ExtractionResult, ProcessingError> {
    // Step 1: Duplicate check on raw bytes
    let file_hash = ContentHash::compute(bytes);
    if seen.contains(&file_hash) {
        return Err(ProcessingError::DuplicateInput {
            filename: filename.to_string(),
        });
    }
    debug!(file = %filename, hash = %file_hash, size = bytes.len(), "Processing report");

    // Step 2: Text layer
    let text = extract_text(decoder, bytes)
        .map_err(|e| ProcessingError::from_text_failure(filename, e))?;
    if text.trim().is_empty() {
        return Err(ProcessingError::EmptyContent {
            filename: filename.to_string(),
        });
    }

    // Step 3: Reporting period
    let period = parse_period(&text).ok_or_else(|| ProcessingError::MetadataNotFound {
        filename: filename.to_string(),
    })?;
    debug!(file = %filename, period = %period, "Found reporting period");

    // Step 4: Assessment tables, decoded independently of step 2
    let rows = extract_tables(decoder, bytes);
    if rows.is_empty() {
        return Err(ProcessingError::NoTablesFound {
            filename: filename.to_string(),
        });
    }

    // Step 5 + 6: Tally and assemble
    let counts = tally(&rows);
    debug!(file = %filename, rows = rows.len(), total = counts.total(), "Tallied indicators");

    Ok(ExtractionResult::assemble(period, counts, file_hash))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal failure".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{MockDecoder, TableRow};

    const HEADER: &str = "Semester 2, 2023 - Progress Report 1";

    fn assessment_rows(body: &[&[&str]]) -> Vec<TableRow> {
        let mut rows = vec![
            TableRow::from_texts(&["Areas Of Assessment"]),
            TableRow::from_texts(&["Subject", "Effort", "Behaviour", "Homework"]),
        ];
        rows.extend(body.iter().map(|r| TableRow::from_texts(*r)));
        rows
    }

    fn report_decoder() -> MockDecoder {
        MockDecoder::new()
            .with_texts([format!("Student Report\n{HEADER}\n")])
            .with_page_tables(vec![assessment_rows(&[&[
                "Math",
                "Very Good",
                "Good (meets expectations)",
                "Needs Improvement",
            ]])])
    }

    fn processor(decoder: MockDecoder) -> ReportProcessor {
        ReportProcessor::new(Box::new(decoder))
    }

    #[test]
    fn reference_report_produces_expected_record() {
        let bytes = b"%PDF-1.7 reference";
        let record = processor(report_decoder())
            .process(bytes, "report.pdf", &HashSet::new())
            .unwrap();

        assert_eq!(record.year, 2023);
        assert_eq!(record.semester, 2);
        assert_eq!(record.report_number, 1);
        assert_eq!(record.full_period, "2023 S2 R1");
        assert_eq!(record.very_good, 1);
        assert_eq!(record.good, 1);
        assert_eq!(record.needs_improvement, 1);
        assert_eq!(record.file_hash, ContentHash::compute(bytes));
    }

    #[test]
    fn processing_is_deterministic() {
        let p = processor(report_decoder());
        let first = p.process(b"same bytes", "a.pdf", &HashSet::new()).unwrap();
        let second = p.process(b"same bytes", "a.pdf", &HashSet::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn seen_hash_rejects_before_decoding() {
        let bytes = b"already seen";
        let seen: HashSet<ContentHash> = [ContentHash::compute(bytes)].into_iter().collect();

        // Decoder would panic if reached.
        let p = processor(MockDecoder::new().panicking("decoder must not run"));
        let err = p.process(bytes, "dup.pdf", &seen).unwrap_err();
        assert!(matches!(err, ProcessingError::DuplicateInput { .. }));
        assert_eq!(err.filename(), "dup.pdf");

        let err = processor(report_decoder())
            .process(bytes, "dup.pdf", &seen)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::DuplicateInput { .. }));
    }

    #[test]
    fn unrelated_hashes_do_not_reject() {
        let seen: HashSet<ContentHash> = [ContentHash::compute(b"other")].into_iter().collect();
        assert!(processor(report_decoder())
            .process(b"new", "new.pdf", &seen)
            .is_ok());
    }

    #[test]
    fn decode_failure_carries_decoder_message() {
        let p = processor(MockDecoder::new().failing_text("invalid xref table"));
        let err = p.process(b"garbage", "broken.pdf", &HashSet::new()).unwrap_err();
        assert!(matches!(err, ProcessingError::DecodeFailure { .. }));
        assert!(err.to_string().contains("invalid xref table"));
        assert!(err.to_string().contains("broken.pdf"));
    }

    #[test]
    fn whitespace_only_text_is_empty_content() {
        let p = processor(MockDecoder::new().with_texts(["  \n\t", "\n"]));
        let err = p.process(b"blank", "blank.pdf", &HashSet::new()).unwrap_err();
        assert!(matches!(err, ProcessingError::EmptyContent { .. }));
    }

    #[test]
    fn partial_period_is_metadata_not_found() {
        let decoder = report_decoder().with_texts(["Semester 1, 2024\nStudent: Sam"]);
        let err = processor(decoder)
            .process(b"partial", "partial.pdf", &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::MetadataNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "Could not find required metadata pattern in 'partial.pdf'. PDF ignored."
        );
    }

    #[test]
    fn tables_without_marker_are_no_tables_found() {
        let decoder = MockDecoder::new().with_texts([HEADER]).with_page_tables(vec![vec![
            TableRow::from_texts(&["Attendance", "Days"]),
            TableRow::from_texts(&["Absent", "2"]),
            TableRow::from_texts(&["Late", "1"]),
        ]]);
        let err = processor(decoder)
            .process(b"no tables", "attendance.pdf", &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::NoTablesFound { .. }));
    }

    #[test]
    fn unreadable_tables_are_no_tables_found() {
        let decoder = MockDecoder::new()
            .with_texts([HEADER])
            .failing_open("cannot reopen");
        let err = processor(decoder)
            .process(b"x", "x.pdf", &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::NoTablesFound { .. }));
    }

    #[test]
    fn missing_library_is_unexpected_fault() {
        let err = processor(MockDecoder::new().library_missing())
            .process(b"x", "x.pdf", &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::UnexpectedFault { .. }));
        assert_eq!(err.kind(), "unexpected_fault");
    }

    #[test]
    fn panics_are_contained() {
        let err = processor(MockDecoder::new().panicking("index out of bounds"))
            .process(b"x", "crash.pdf", &HashSet::new())
            .unwrap_err();
        match err {
            ProcessingError::UnexpectedFault { filename, message } => {
                assert_eq!(filename, "crash.pdf");
                assert_eq!(message, "index out of bounds");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tallies_across_pages_and_tables() {
        let decoder = MockDecoder::new()
            .with_texts(["Cover", HEADER])
            .with_page_tables(vec![assessment_rows(&[
                &["Math", "Very Good", "Very Good", "N/A"],
                &["Art", "Good (meets expectations)", "", "Improvement needed"],
            ])])
            .with_page_tables(vec![assessment_rows(&[&[
                "Music",
                "Not consistently meeting expectations",
                "Very Good",
                "Good (meets expectations)",
            ]])]);
        let record = processor(decoder)
            .process(b"two pages", "two.pdf", &HashSet::new())
            .unwrap();
        assert_eq!(record.tally().very_good, 3);
        assert_eq!(record.tally().good, 2);
        assert_eq!(record.tally().needs_improvement, 2);
    }
}
