//! Caller-side batch and session handling.
//!
//! Enforces upload limits before documents reach the pipeline, owns the
//! set of accepted hashes, and records a hash only after its document
//! succeeds. One rejected document never stops the batch. Re-submitting a
//! filename that the session already accepted is a silent no-op.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::UploadLimits;
use crate::pipeline::hash::ContentHash;
use crate::pipeline::processor::ReportProcessor;
use crate::pipeline::report::ExtractionResult;

/// Upload limit violations, detected without touching the document.
#[derive(Debug, thiserror::Error)]
pub enum LimitError {
    #[error("File '{filename}' exceeds the maximum size limit of {max_mb:.1}MB.")]
    FileTooLarge { filename: String, max_mb: f64 },
}

/// A document as received from the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// One rejected document and the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub filename: String,
    pub message: String,
}

/// Result of one batch run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub accepted: Vec<ExtractionResult>,
    pub rejections: Vec<Rejection>,
    /// Uploads beyond `max_files` that were not looked at.
    pub truncated: usize,
    /// Uploads skipped because the session already holds a record under
    /// the same filename.
    pub already_accepted: Vec<String>,
}

/// Accepted records and their hashes for one user session.
#[derive(Debug, Default)]
pub struct ReportSession {
    seen: HashSet<ContentHash>,
    filenames: HashSet<String>,
    records: Vec<ExtractionResult>,
}

impl ReportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes of every accepted document, for duplicate checks.
    pub fn seen_hashes(&self) -> &HashSet<ContentHash> {
        &self.seen
    }

    /// Whether a document under `filename` has been accepted.
    pub fn has_filename(&self, filename: &str) -> bool {
        self.filenames.contains(filename)
    }

    pub fn records(&self) -> &[ExtractionResult] {
        &self.records
    }

    /// Records sorted by year, semester and report number.
    pub fn records_by_period(&self) -> Vec<&ExtractionResult> {
        let mut sorted: Vec<&ExtractionResult> = self.records.iter().collect();
        sorted.sort_by_key(|r| r.period());
        sorted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records and hashes.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.filenames.clear();
        self.records.clear();
    }

    fn accept(&mut self, filename: &str, record: ExtractionResult) {
        self.seen.insert(record.file_hash.clone());
        self.filenames.insert(filename.to_string());
        self.records.push(record);
    }
}

/// Process uploads in order against `session`.
///
/// Only the first `limits.max_files` uploads are considered. Uploads whose
/// filename the session already accepted are skipped without a message;
/// oversized uploads are rejected before hashing. Accepted records are added to the
/// session immediately, so a later identical upload in the same batch is
/// rejected as a duplicate.
pub fn process_batch(
    processor: &ReportProcessor,
    uploads: Vec<Upload>,
    limits: &UploadLimits,
    session: &mut ReportSession,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    let total = uploads.len();
    if total > limits.max_files {
        outcome.truncated = total - limits.max_files;
        warn!(
            uploaded = total,
            processed = limits.max_files,
            "Too many files, only the first {} will be processed",
            limits.max_files
        );
    }

    for upload in uploads.into_iter().take(limits.max_files) {
        if session.has_filename(&upload.filename) {
            debug!(file = %upload.filename, "Already accepted in this session, skipping");
            outcome.already_accepted.push(upload.filename);
            continue;
        }

        if upload.bytes.len() as u64 > limits.max_file_bytes {
            let e = LimitError::FileTooLarge {
                filename: upload.filename.clone(),
                max_mb: limits.max_file_mb(),
            };
            warn!(file = %upload.filename, size = upload.bytes.len(), "Upload over size limit");
            outcome.rejections.push(Rejection {
                filename: upload.filename,
                message: e.to_string(),
            });
            continue;
        }

        match processor.process(&upload.bytes, &upload.filename, session.seen_hashes()) {
            Ok(record) => {
                session.accept(&upload.filename, record.clone());
                outcome.accepted.push(record);
            }
            Err(e) => outcome.rejections.push(Rejection {
                filename: upload.filename,
                message: e.to_string(),
            }),
        }
    }

    info!(
        accepted = outcome.accepted.len(),
        rejected = outcome.rejections.len(),
        truncated = outcome.truncated,
        already_accepted = outcome.already_accepted.len(),
        session_records = session.len(),
        "Batch finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{MockDecoder, TableRow};

    fn processor_for(header: &str) -> ReportProcessor {
        let decoder = MockDecoder::new().with_texts([header]).with_page_tables(vec![vec![
            TableRow::from_texts(&["Areas Of Assessment"]),
            TableRow::from_texts(&["Subject", "Effort"]),
            TableRow::from_texts(&["Math", "Very Good"]),
        ]]);
        ReportProcessor::new(Box::new(decoder))
    }

    fn processor() -> ReportProcessor {
        processor_for("Semester 2, 2023 - Progress Report 1")
    }

    #[test]
    fn identical_uploads_in_one_batch() {
        let mut session = ReportSession::new();
        let uploads = vec![
            Upload::new("first.pdf", b"same".to_vec()),
            Upload::new("second.pdf", b"same".to_vec()),
        ];
        let outcome = process_batch(&processor(), uploads, &UploadLimits::default(), &mut session);

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejections.len(), 1);
        assert_eq!(outcome.rejections[0].filename, "second.pdf");
        assert!(outcome.rejections[0].message.contains("already been uploaded"));
        assert_eq!(session.len(), 1);
        assert!(session
            .seen_hashes()
            .contains(&ContentHash::compute(b"same")));
    }

    #[test]
    fn duplicates_detected_across_batches() {
        let mut session = ReportSession::new();
        let p = processor();
        let limits = UploadLimits::default();
        let first = vec![Upload::new("a.pdf", b"a".to_vec())];
        process_batch(&p, first, &limits, &mut session);

        let again = vec![Upload::new("a-again.pdf", b"a".to_vec())];
        let outcome = process_batch(&p, again, &limits, &mut session);
        assert!(outcome.accepted.is_empty());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn rejected_documents_do_not_enter_the_session() {
        let mut session = ReportSession::new();
        let p = processor_for("No period here");
        let outcome = process_batch(
            &p,
            vec![Upload::new("x.pdf", b"x".to_vec())],
            &UploadLimits::default(),
            &mut session,
        );
        assert_eq!(outcome.rejections.len(), 1);
        assert!(session.is_empty());
        assert!(session.seen_hashes().is_empty());
    }

    #[test]
    fn oversized_upload_rejected_and_batch_continues() {
        let mut session = ReportSession::new();
        let limits = UploadLimits {
            max_file_bytes: 4,
            max_files: 10,
        };
        let uploads = vec![
            Upload::new("big.pdf", vec![0u8; 5]),
            Upload::new("ok.pdf", b"ok".to_vec()),
        ];
        let outcome = process_batch(&processor(), uploads, &limits, &mut session);

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejections[0].filename, "big.pdf");
        assert!(outcome.rejections[0].message.contains("maximum size limit"));
    }

    #[test]
    fn uploads_beyond_limit_are_truncated() {
        let mut session = ReportSession::new();
        let limits = UploadLimits {
            max_file_bytes: 1024,
            max_files: 2,
        };
        let uploads = (0..5)
            .map(|i| Upload::new(format!("{i}.pdf"), vec![i as u8]))
            .collect();
        let outcome = process_batch(&processor(), uploads, &limits, &mut session);

        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.truncated, 3);
    }

    #[test]
    fn records_sorted_by_period() {
        let mut session = ReportSession::new();
        let limits = UploadLimits::default();
        for (name, header) in [
            ("late.pdf", "Semester 1, 2024 - Progress Report 1"),
            ("early.pdf", "Semester 2, 2023 - Progress Report 2"),
            ("mid.pdf", "Semester 2, 2023 - Progress Report 3"),
        ] {
            process_batch(
                &processor_for(header),
                vec![Upload::new(name, name.as_bytes().to_vec())],
                &limits,
                &mut session,
            );
        }

        let sorted = session.records_by_period();
        let periods: Vec<&str> = sorted
            .iter()
            .map(|r| r.full_period.as_str())
            .collect();
        assert_eq!(periods, vec!["2023 S2 R2", "2023 S2 R3", "2024 S1 R1"]);
    }

    #[test]
    fn accepted_filename_is_skipped_on_resubmission() {
        let mut session = ReportSession::new();
        let p = processor();
        let limits = UploadLimits::default();
        process_batch(&p, vec![Upload::new("term1.pdf", b"v1".to_vec())], &limits, &mut session);

        let outcome = process_batch(
            &p,
            vec![Upload::new("term1.pdf", b"v2".to_vec())],
            &limits,
            &mut session,
        );
        assert!(outcome.accepted.is_empty());
        assert!(outcome.rejections.is_empty());
        assert_eq!(outcome.already_accepted, vec!["term1.pdf".to_string()]);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn rejected_filename_may_be_retried() {
        let mut session = ReportSession::new();
        let limits = UploadLimits::default();
        process_batch(
            &processor_for("No period here"),
            vec![Upload::new("term1.pdf", b"bad".to_vec())],
            &limits,
            &mut session,
        );
        let outcome = process_batch(
            &processor(),
            vec![Upload::new("term1.pdf", b"good".to_vec())],
            &limits,
            &mut session,
        );
        assert_eq!(outcome.accepted.len(), 1);
        assert!(session.has_filename("term1.pdf"));
    }

    #[test]
    fn clear_resets_session() {
        let mut session = ReportSession::new();
        process_batch(
            &processor(),
            vec![Upload::new("a.pdf", b"a".to_vec())],
            &UploadLimits::default(),
            &mut session,
        );
        session.clear();
        assert!(session.is_empty());
        assert!(!session.has_filename("a.pdf"));
        assert!(session.seen_hashes().is_empty());
    }
}
