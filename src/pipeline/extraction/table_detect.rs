//! Table detection over one page's positioned content.
//!
//! Ruled tables are found first from the page's border strokes
//! (`lattice`). Pages without a ruled grid fall back to text alignment
//! (`stream`). When a page has ruled tables, unruled text elsewhere on it
//! is not searched for further tables.

use tracing::debug;

use super::lattice;
use super::stream;
use super::types::{PageLayout, TableAttempt, TextFragment};
use super::ExtractionError;

/// Fragments whose vertical centers differ by less than this fraction of
/// their height sit on the same line.
const LINE_TOLERANCE_RATIO: f32 = 0.5;

/// Horizontal gap (points) that separates two cells on one line.
const CELL_GAP_PT: f32 = 8.0;

/// Fragments closer than this (points) are glued without a space.
const WORD_JOIN_PT: f32 = 1.0;

/// Tables resolving to more columns than this are garbled layouts.
pub const MAX_COLUMNS: usize = 32;

#[derive(Debug, Clone)]
pub(super) struct Cell {
    pub(super) text: String,
    pub(super) left: f32,
    pub(super) right: f32,
}

impl Cell {
    pub(super) fn center(&self) -> f32 {
        (self.left + self.right) / 2.0
    }
}

/// One visual line of text, split into cells on wide horizontal gaps.
#[derive(Debug, Clone)]
pub(super) struct Line {
    pub(super) cells: Vec<Cell>,
    pub(super) top: f32,
    pub(super) bottom: f32,
}

impl Line {
    pub(super) fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub(super) fn is_tabular(&self) -> bool {
        self.cells.len() >= 2
    }
}

/// Detect candidate tables on one page, top to bottom.
///
/// Fails for the whole page only when a text fragment has non-finite
/// coordinates; each returned attempt can still fail on its own.
pub fn detect_tables(layout: &PageLayout) -> Result<Vec<TableAttempt>, ExtractionError> {
    if let Some(bad) = layout.fragments.iter().find(|f| !f.has_finite_bounds()) {
        return Err(ExtractionError::TableLayout(format!(
            "non-finite coordinates for text {:?}",
            bad.text
        )));
    }

    let ruled = lattice::find_tables(&layout.fragments, &layout.rules);
    if !ruled.is_empty() {
        debug!(tables = ruled.len(), "Found ruled tables");
        return Ok(ruled);
    }

    Ok(stream::find_tables(&group_lines(&layout.fragments)))
}

/// Group fragments into lines, top to bottom, each split into cells.
pub(super) fn group_lines(fragments: &[TextFragment]) -> Vec<Line> {
    let mut frags: Vec<TextFragment> = fragments
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .map(TextFragment::normalized)
        .collect();
    frags.sort_by(|a, b| {
        b.center_y()
            .total_cmp(&a.center_y())
            .then(a.left.total_cmp(&b.left))
    });

    let mut groups: Vec<Vec<TextFragment>> = Vec::new();
    for frag in frags {
        match groups.last_mut() {
            Some(group) if same_line(group, &frag) => group.push(frag),
            _ => groups.push(vec![frag]),
        }
    }

    groups.into_iter().map(build_line).collect()
}

fn same_line(group: &[TextFragment], frag: &TextFragment) -> bool {
    let Some(anchor) = group.first() else {
        return false;
    };
    let tolerance = anchor.height().max(frag.height()) * LINE_TOLERANCE_RATIO;
    (anchor.center_y() - frag.center_y()).abs() <= tolerance
}

fn build_line(mut frags: Vec<TextFragment>) -> Line {
    frags.sort_by(|a, b| a.left.total_cmp(&b.left));
    let top = frags.iter().map(|f| f.top).fold(f32::MIN, f32::max);
    let bottom = frags.iter().map(|f| f.bottom).fold(f32::MAX, f32::min);

    let mut cells: Vec<Cell> = Vec::new();
    for frag in frags {
        let text = frag.text.trim();
        match cells.last_mut() {
            Some(cell) if frag.left - cell.right < CELL_GAP_PT => {
                if frag.left - cell.right > WORD_JOIN_PT {
                    cell.text.push(' ');
                }
                cell.text.push_str(text);
                cell.right = cell.right.max(frag.right);
            }
            _ => cells.push(Cell {
                text: text.to_string(),
                left: frag.left,
                right: frag.right,
            }),
        }
    }

    Line { cells, top, bottom }
}
