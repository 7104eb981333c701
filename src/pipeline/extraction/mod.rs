pub mod types;
pub mod pdfium;
pub mod mock;
pub mod table_detect;
mod lattice;
mod stream;
pub mod tables;
pub mod text;

pub use types::*;
pub use pdfium::PdfiumDecoder;
pub use mock::{MockDecoder, MockPage};
pub use tables::{extract_tables, TableCollector, ASSESSMENT_TABLE_MARKER, HEADER_ROWS};
pub use text::extract_text;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDFium library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF is password-protected")]
    PdfEncrypted,

    #[error("Text layer unreadable on page {page}: {reason}")]
    PageText { page: usize, reason: String },

    #[error("Table layout unusable: {0}")]
    TableLayout(String),
}
