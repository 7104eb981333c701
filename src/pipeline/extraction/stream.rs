//! Stream-mode tables: no ruling lines, only text alignment.
//!
//! Runs of closely spaced lines become blocks, the part of each run made
//! of multi-cell lines (plus a title line directly above it) becomes a
//! table, and column bands come from the widest rows.

use std::ops::Range;

use super::table_detect::{Cell, Line, MAX_COLUMNS};
use super::types::{RawTable, TableAttempt, TableRow};
use super::ExtractionError;

/// Maximum vertical gap between lines of one table, in median line heights.
const ROW_GAP_RATIO: f32 = 2.0;

/// A wrapped continuation line sits closer than this to the line above,
/// in line heights.
const WRAP_GAP_RATIO: f32 = 0.6;

/// ... and closer than this share of the table's usual gap between rows.
const WRAP_ROW_GAP_SHARE: f32 = 0.5;

/// Minimum number of multi-cell lines for a block to count as a table.
const MIN_TABLE_LINES: usize = 2;

type Band = (f32, f32);

/// Tables among the page's lines, top to bottom.
pub(super) fn find_tables(lines: &[Line]) -> Vec<TableAttempt> {
    find_blocks(lines)
        .into_iter()
        .map(|block| build_table(&lines[block]))
        .collect()
}

/// Vertical whitespace between two consecutive lines.
fn gap(upper: &Line, lower: &Line) -> f32 {
    upper.bottom - lower.top
}

fn median(values: impl Iterator<Item = f32>) -> Option<f32> {
    let mut values: Vec<f32> = values.collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    Some(values[values.len() / 2])
}

/// Split lines into runs of closely spaced lines, keep the table part of each.
fn find_blocks(lines: &[Line]) -> Vec<Range<usize>> {
    let max_gap = median(lines.iter().map(Line::height)).unwrap_or(0.0) * ROW_GAP_RATIO;
    let mut blocks = Vec::new();
    let mut run_start = 0;

    for i in 0..=lines.len() {
        let run_ends =
            i == lines.len() || (i > run_start && gap(&lines[i - 1], &lines[i]) > max_gap);
        if run_ends {
            if let Some(block) = block_in_run(lines, run_start..i) {
                blocks.push(block);
            }
            run_start = i;
        }
    }

    blocks
}

fn block_in_run(lines: &[Line], run: Range<usize>) -> Option<Range<usize>> {
    let first = run.clone().find(|&i| lines[i].is_tabular())?;
    let last = run.clone().rev().find(|&i| lines[i].is_tabular())?;
    let tabular = (first..=last).filter(|&i| lines[i].is_tabular()).count();
    if tabular < MIN_TABLE_LINES {
        return None;
    }

    let start = if first > run.start && is_table_title(&lines[first - 1], &lines[first]) {
        first - 1
    } else {
        first
    };
    Some(start..last + 1)
}

/// A single-cell line right above the grid that lies within its
/// horizontal extent is the table's title row, however narrow.
fn is_table_title(candidate: &Line, first_row: &Line) -> bool {
    let [title] = candidate.cells.as_slice() else {
        return false;
    };
    let (Some(leftmost), Some(rightmost)) = (first_row.cells.first(), first_row.cells.last())
    else {
        return false;
    };
    title.left < rightmost.right && leftmost.left < title.right
}

fn build_table(block: &[Line]) -> TableAttempt {
    let bands = column_bands(block);
    if bands.len() > MAX_COLUMNS {
        return Err(ExtractionError::TableLayout(format!(
            "{} columns exceeds the {MAX_COLUMNS} column limit",
            bands.len()
        )));
    }

    let placed: Vec<Vec<Option<String>>> = block.iter().map(|l| place_cells(l, &bands)).collect();
    let filled: Vec<usize> = placed.iter().map(|cells| cells.iter().flatten().count()).collect();
    let line_height = median(block.iter().map(Line::height)).unwrap_or(0.0);
    let row_gap = median(
        (1..block.len())
            .filter(|&i| starts_row(&placed[i]))
            .map(|i| gap(&block[i - 1], &block[i])),
    );

    let mut rows: Vec<TableRow> = Vec::new();
    let mut row_filled = 0;
    for (i, cells) in placed.into_iter().enumerate() {
        let continues = i > 0
            && !starts_row(&cells)
            && filled[i] < row_filled
            && row_gap.is_some_and(|row_gap| {
                let line_gap = gap(&block[i - 1], &block[i]);
                line_gap < line_height * WRAP_GAP_RATIO && line_gap < row_gap * WRAP_ROW_GAP_SHARE
            });

        match rows.last_mut() {
            Some(row) if continues => append_wrapped(row, cells),
            _ => {
                rows.push(TableRow::new(cells));
                row_filled = filled[i];
            }
        }
    }

    Ok(RawTable { rows })
}

fn starts_row(cells: &[Option<String>]) -> bool {
    matches!(cells.first(), Some(Some(_)))
}

/// Column bands from the lines with the most cells: overlapping cell
/// extents merge into one band.
fn column_bands(block: &[Line]) -> Vec<Band> {
    let widest = block.iter().map(|l| l.cells.len()).max().unwrap_or(0);
    let mut extents: Vec<Band> = block
        .iter()
        .filter(|l| l.cells.len() == widest)
        .flat_map(|l| l.cells.iter().map(|c| (c.left, c.right)))
        .collect();
    extents.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut bands: Vec<Band> = Vec::new();
    for (left, right) in extents {
        match bands.last_mut() {
            Some(band) if left <= band.1 => band.1 = band.1.max(right),
            _ => bands.push((left, right)),
        }
    }
    bands
}

fn place_cells(line: &Line, bands: &[Band]) -> Vec<Option<String>> {
    let mut placed: Vec<Option<String>> = vec![None; bands.len()];
    for cell in &line.cells {
        let Some(idx) = nearest_band(cell, bands) else {
            continue;
        };
        push_text(&mut placed[idx], &cell.text);
    }
    placed
}

fn nearest_band(cell: &Cell, bands: &[Band]) -> Option<usize> {
    bands
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| band_distance(cell, a).total_cmp(&band_distance(cell, b)))
        .map(|(idx, _)| idx)
}

fn band_distance(cell: &Cell, band: &Band) -> f32 {
    let center = cell.center();
    if center >= band.0 && center <= band.1 {
        0.0
    } else {
        (center - band.0).abs().min((center - band.1).abs())
    }
}

fn append_wrapped(row: &mut TableRow, cells: Vec<Option<String>>) {
    for (slot, extra) in row.cells.iter_mut().zip(cells) {
        if let Some(text) = extra {
            push_text(slot, &text);
        }
    }
}

fn push_text(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}
