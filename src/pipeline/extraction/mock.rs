// ── Mock for testing ──────────────────────────────────────

use super::types::{DocumentDecoder, PageScan, RawTable, TableAttempt, TableRow};
use super::ExtractionError;

/// What the mock does for one page's table scan.
#[derive(Debug, Clone)]
pub enum MockPage {
    Tables(Vec<Result<Vec<TableRow>, String>>),
    Fails(String),
}

/// Scripted decoder returning fixed page texts and tables regardless of
/// the input bytes.
///
/// Used by extraction, processor and batch tests that need a
/// `DocumentDecoder` without the PDFium binary.
#[derive(Debug, Clone, Default)]
pub struct MockDecoder {
    texts: Option<Vec<String>>,
    text_error: Option<String>,
    library_missing: bool,
    pages: Vec<MockPage>,
    open_error: Option<String>,
    panic_message: Option<String>,
}

impl MockDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page texts returned by `page_texts`.
    pub fn with_texts<S: Into<String>>(mut self, texts: impl IntoIterator<Item = S>) -> Self {
        self.texts = Some(texts.into_iter().map(Into::into).collect());
        self
    }

    /// Append a page whose tables all extract successfully.
    pub fn with_page_tables(mut self, tables: Vec<Vec<TableRow>>) -> Self {
        self.pages
            .push(MockPage::Tables(tables.into_iter().map(Ok).collect()));
        self
    }

    /// Append a page with an explicit outcome per table.
    pub fn with_page(mut self, page: MockPage) -> Self {
        self.pages.push(page);
        self
    }

    /// Make `page_texts` fail with a parsing error.
    pub fn failing_text(mut self, message: impl Into<String>) -> Self {
        self.text_error = Some(message.into());
        self
    }

    /// Behave as if the decoding library could not be loaded.
    pub fn library_missing(mut self) -> Self {
        self.library_missing = true;
        self
    }

    /// Make `scan_tables` fail to open the document.
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Panic inside `page_texts`.
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.panic_message = Some(message.into());
        self
    }
}

impl DocumentDecoder for MockDecoder {
    fn page_texts(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        if let Some(message) = &self.panic_message {
            panic!("{message}");
        }
        if self.library_missing {
            return Err(ExtractionError::LibraryUnavailable("mock library missing".into()));
        }
        if let Some(message) = &self.text_error {
            return Err(ExtractionError::PdfParsing(message.clone()));
        }
        Ok(self.texts.clone().unwrap_or_default())
    }

    fn scan_tables(&self, _bytes: &[u8]) -> Result<Vec<PageScan>, ExtractionError> {
        if let Some(message) = &self.open_error {
            return Err(ExtractionError::PdfParsing(message.clone()));
        }

        let scans = self
            .pages
            .iter()
            .enumerate()
            .map(|(idx, page)| {
                let tables = match page {
                    MockPage::Tables(tables) => Ok(tables
                        .iter()
                        .map(|t| -> TableAttempt {
                            t.clone()
                                .map(|rows| RawTable { rows })
                                .map_err(ExtractionError::TableLayout)
                        })
                        .collect()),
                    MockPage::Fails(reason) => Err(ExtractionError::PageText {
                        page: idx + 1,
                        reason: reason.clone(),
                    }),
                };
                PageScan {
                    page_number: idx + 1,
                    tables,
                }
            })
            .collect();

        Ok(scans)
    }
}
