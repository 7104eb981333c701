use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// One row of an extracted table. Cells are `None` where the table has an
/// empty grid position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<Option<String>>,
}

impl TableRow {
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self { cells }
    }

    /// Build a row where every cell is present.
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self {
            cells: texts.iter().map(|t| Some(t.as_ref().to_string())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All present cells joined with a single space.
    pub fn joined_text(&self) -> String {
        self.cells
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A table as recovered from one page, header rows included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<TableRow>,
}

/// A run of text with its bounding box in PDF user space (points,
/// origin bottom-left, y grows upward).
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            text: text.into(),
            left,
            right,
            bottom,
            top,
        }
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    pub fn has_finite_bounds(&self) -> bool {
        [self.left, self.right, self.bottom, self.top]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Copy with left <= right and bottom <= top.
    pub fn normalized(&self) -> Self {
        Self {
            text: self.text.clone(),
            left: self.left.min(self.right),
            right: self.left.max(self.right),
            bottom: self.bottom.min(self.top),
            top: self.bottom.max(self.top),
        }
    }
}

/// A straight stroke from the page's vector graphics, in the same
/// coordinate space as `TextFragment`. Table borders are made of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleSegment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl RuleSegment {
    pub fn new(from: (f32, f32), to: (f32, f32)) -> Self {
        Self {
            x0: from.0,
            y0: from.1,
            x1: to.0,
            y1: to.1,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Positioned content of one page: text runs plus ruling strokes.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub fragments: Vec<TextFragment>,
    pub rules: Vec<RuleSegment>,
}

/// Outcome of extracting a single candidate table.
pub type TableAttempt = Result<RawTable, ExtractionError>;

/// Table-detection outcome for one page (1-based page number).
#[derive(Debug)]
pub struct PageScan {
    pub page_number: usize,
    pub tables: Result<Vec<TableAttempt>, ExtractionError>,
}

/// Paginated document decoding capability.
///
/// Each call opens the document from `bytes`, does its work and releases
/// every decoder handle before returning, on success and failure alike.
pub trait DocumentDecoder: Send + Sync {
    /// Plain text of every page, in document order.
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;

    /// Candidate tables of every page, in document order. An `Err` at the
    /// top level means the document could not be opened at all.
    fn scan_tables(&self, bytes: &[u8]) -> Result<Vec<PageScan>, ExtractionError>;
}
