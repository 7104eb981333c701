//! Best-effort collection of assessment-table rows.
//!
//! Every page and every candidate table is an independent attempt. Failed
//! attempts are counted and skipped; rows from successful ones accumulate
//! in page and table order. Collection never aborts.

use tracing::{debug, warn};

use super::types::{DocumentDecoder, PageScan, RawTable, TableAttempt, TableRow};

/// Header text that identifies an assessment table.
pub const ASSESSMENT_TABLE_MARKER: &str = "Areas Of Assessment";

/// Header rows dropped from every kept table.
pub const HEADER_ROWS: usize = 2;

/// Accumulator for rows gathered across pages and tables.
#[derive(Debug, Default)]
pub struct TableCollector {
    rows: Vec<TableRow>,
    kept_tables: usize,
    other_tables: usize,
    failed_tables: usize,
    failed_pages: usize,
}

impl TableCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one page's scan.
    pub fn accept_page(&mut self, scan: PageScan) {
        match scan.tables {
            Ok(attempts) => {
                for (idx, attempt) in attempts.into_iter().enumerate() {
                    self.accept_table(scan.page_number, idx, attempt);
                }
            }
            Err(e) => {
                warn!(page = scan.page_number, error = %e, "Skipping page: table scan failed");
                self.failed_pages += 1;
            }
        }
    }

    fn accept_table(&mut self, page: usize, index: usize, attempt: TableAttempt) {
        match attempt {
            Ok(table) if is_assessment_table(&table) => {
                let body: Vec<TableRow> = table.rows.into_iter().skip(HEADER_ROWS).collect();
                debug!(page, table = index, rows = body.len(), "Kept assessment table");
                self.rows.extend(body);
                self.kept_tables += 1;
            }
            Ok(_) => {
                debug!(page, table = index, "Ignoring table without assessment header");
                self.other_tables += 1;
            }
            Err(e) => {
                warn!(page, table = index, error = %e, "Skipping table: extraction failed");
                self.failed_tables += 1;
            }
        }
    }

    pub fn kept_tables(&self) -> usize {
        self.kept_tables
    }

    pub fn skipped(&self) -> usize {
        self.failed_pages + self.failed_tables
    }

    pub fn into_rows(self) -> Vec<TableRow> {
        self.rows
    }
}

/// The first row's text must contain the assessment marker.
fn is_assessment_table(table: &RawTable) -> bool {
    table
        .rows
        .first()
        .is_some_and(|header| header.joined_text().contains(ASSESSMENT_TABLE_MARKER))
}

/// Collect body rows of every assessment table in the document.
///
/// Never fails: a document that cannot be opened, like a page or table
/// that cannot be read, simply contributes no rows.
pub fn extract_tables(decoder: &dyn DocumentDecoder, bytes: &[u8]) -> Vec<TableRow> {
    let scans = match decoder.scan_tables(bytes) {
        Ok(scans) => scans,
        Err(e) => {
            warn!(error = %e, "Table scan could not open document");
            return Vec::new();
        }
    };

    let mut collector = TableCollector::new();
    for scan in scans {
        collector.accept_page(scan);
    }

    debug!(
        kept_tables = collector.kept_tables(),
        other_tables = collector.other_tables,
        skipped = collector.skipped(),
        "Table extraction finished"
    );
    collector.into_rows()
}
