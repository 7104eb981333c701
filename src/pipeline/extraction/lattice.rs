//! Lattice-mode tables: cells bounded by ruling lines.
//!
//! Strokes are split into horizontal and vertical edges, snapped onto
//! shared positions and joined where they touch. Edge crossings are the
//! grid corners. The smallest closed rectangle hanging off each corner
//! is a cell, and cells sharing corners make up one table. A merged cell
//! occupies its top-left grid position and leaves the positions it
//! covers empty.

use std::collections::BTreeMap;

use super::table_detect::{group_lines, MAX_COLUMNS};
use super::types::{RawTable, RuleSegment, TableAttempt, TableRow, TextFragment};
use super::ExtractionError;

/// Largest drift (points) across a stroke that still counts as straight.
const AXIS_TOLERANCE: f32 = 1.0;

/// Strokes shorter than this (points) are ticks, not borders.
const EDGE_MIN_LENGTH: f32 = 3.0;

/// Parallel edges closer than this (points) are the same border.
const SNAP_TOLERANCE: f32 = 3.0;

/// Collinear edges with gaps up to this (points) are one border.
const JOIN_TOLERANCE: f32 = 3.0;

/// Slack (points) when testing whether an edge reaches a corner.
const INTERSECTION_TOLERANCE: f32 = 3.0;

/// Axis-aligned edge. `pos` is y for horizontal edges, x for vertical ones;
/// `start..end` runs along the other axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Edge {
    pos: f32,
    start: f32,
    end: f32,
}

impl Edge {
    fn reaches(&self, from: f32, to: f32) -> bool {
        self.start - INTERSECTION_TOLERANCE <= from && to <= self.end + INTERSECTION_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CellBox {
    left: f32,
    bottom: f32,
    right: f32,
    top: f32,
}

impl CellBox {
    fn corners(&self) -> [Point; 4] {
        [
            Point { x: self.left, y: self.top },
            Point { x: self.right, y: self.top },
            Point { x: self.left, y: self.bottom },
            Point { x: self.right, y: self.bottom },
        ]
    }

    fn shares_corner(&self, other: &CellBox) -> bool {
        let theirs = other.corners();
        self.corners().iter().any(|c| theirs.contains(c))
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        (self.left..=self.right).contains(&x) && (self.bottom..=self.top).contains(&y)
    }
}

struct Grid {
    horizontal: Vec<Edge>,
    vertical: Vec<Edge>,
}

impl Grid {
    fn from_rules(rules: &[RuleSegment]) -> Self {
        let mut horizontal = Vec::new();
        let mut vertical = Vec::new();
        for rule in rules.iter().filter(|r| r.is_finite()) {
            let dx = (rule.x1 - rule.x0).abs();
            let dy = (rule.y1 - rule.y0).abs();
            if dy <= AXIS_TOLERANCE && dx >= EDGE_MIN_LENGTH {
                horizontal.push(Edge {
                    pos: (rule.y0 + rule.y1) / 2.0,
                    start: rule.x0.min(rule.x1),
                    end: rule.x0.max(rule.x1),
                });
            } else if dx <= AXIS_TOLERANCE && dy >= EDGE_MIN_LENGTH {
                vertical.push(Edge {
                    pos: (rule.x0 + rule.x1) / 2.0,
                    start: rule.y0.min(rule.y1),
                    end: rule.y0.max(rule.y1),
                });
            }
        }

        Self {
            horizontal: join_edges(snap_edges(horizontal)),
            vertical: join_edges(snap_edges(vertical)),
        }
    }

    /// Edge crossings, top to bottom then left to right.
    fn intersections(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self
            .horizontal
            .iter()
            .flat_map(|h| {
                self.vertical
                    .iter()
                    .filter(|v| h.reaches(v.pos, v.pos) && v.reaches(h.pos, h.pos))
                    .map(|v| Point { x: v.pos, y: h.pos })
            })
            .collect();
        points.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));
        points.dedup();
        points
    }

    fn joined_horizontally(&self, a: Point, b: Point) -> bool {
        self.horizontal
            .iter()
            .any(|e| e.pos == a.y && e.reaches(a.x.min(b.x), a.x.max(b.x)))
    }

    fn joined_vertically(&self, a: Point, b: Point) -> bool {
        self.vertical
            .iter()
            .any(|e| e.pos == a.x && e.reaches(a.y.min(b.y), a.y.max(b.y)))
    }

    /// For each corner, the nearest point below and the nearest point to
    /// the right that close a fully bordered rectangle.
    fn cells(&self, points: &[Point]) -> Vec<CellBox> {
        let mut cells = Vec::new();
        for (i, &corner) in points.iter().enumerate() {
            let rest = &points[i + 1..];
            let right: Vec<Point> = rest.iter().copied().filter(|p| p.y == corner.y).collect();

            'below: for &below in rest.iter().filter(|p| p.x == corner.x) {
                if !self.joined_vertically(corner, below) {
                    continue;
                }
                for &side in &right {
                    if !self.joined_horizontally(corner, side) {
                        continue;
                    }
                    let opposite = Point {
                        x: side.x,
                        y: below.y,
                    };
                    if points.contains(&opposite)
                        && self.joined_horizontally(below, opposite)
                        && self.joined_vertically(side, opposite)
                    {
                        cells.push(CellBox {
                            left: corner.x,
                            bottom: below.y,
                            right: side.x,
                            top: corner.y,
                        });
                        break 'below;
                    }
                }
            }
        }
        cells
    }
}

/// Move parallel edges within `SNAP_TOLERANCE` of each other onto their
/// mean position.
fn snap_edges(mut edges: Vec<Edge>) -> Vec<Edge> {
    edges.sort_by(|a, b| a.pos.total_cmp(&b.pos));
    let mut snapped = Vec::with_capacity(edges.len());
    let mut cluster: Vec<Edge> = Vec::new();
    for edge in edges {
        if cluster
            .last()
            .is_some_and(|last| edge.pos - last.pos > SNAP_TOLERANCE)
        {
            flush_cluster(&mut cluster, &mut snapped);
        }
        cluster.push(edge);
    }
    flush_cluster(&mut cluster, &mut snapped);
    snapped
}

fn flush_cluster(cluster: &mut Vec<Edge>, out: &mut Vec<Edge>) {
    if cluster.is_empty() {
        return;
    }
    let mean = cluster.iter().map(|e| e.pos).sum::<f32>() / cluster.len() as f32;
    out.extend(cluster.drain(..).map(|e| Edge { pos: mean, ..e }));
}

/// Merge collinear edges that overlap or nearly touch.
fn join_edges(mut edges: Vec<Edge>) -> Vec<Edge> {
    edges.sort_by(|a, b| a.pos.total_cmp(&b.pos).then(a.start.total_cmp(&b.start)));
    let mut joined: Vec<Edge> = Vec::with_capacity(edges.len());
    for edge in edges {
        match joined.last_mut() {
            Some(last) if last.pos == edge.pos && edge.start <= last.end + JOIN_TOLERANCE => {
                last.end = last.end.max(edge.end);
            }
            _ => joined.push(edge),
        }
    }
    joined
}

/// Connected groups of cells. Groups of a single cell are framed boxes,
/// not tables.
fn group_cells(cells: &[CellBox]) -> Vec<Vec<CellBox>> {
    let mut parent: Vec<usize> = (0..cells.len()).collect();
    for i in 0..cells.len() {
        for j in i + 1..cells.len() {
            if cells[i].shares_corner(&cells[j]) {
                let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                parent[b] = a;
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<CellBox>> = BTreeMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let r = root(&mut parent, i);
        groups.entry(r).or_default().push(*cell);
    }
    groups.into_values().filter(|g| g.len() > 1).collect()
}

fn root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn distinct(values: impl Iterator<Item = f32>) -> Vec<f32> {
    let mut values: Vec<f32> = values.collect();
    values.sort_by(f32::total_cmp);
    values.dedup();
    values
}

fn cell_text(cell: &CellBox, fragments: &[TextFragment]) -> Option<String> {
    let inside: Vec<TextFragment> = fragments
        .iter()
        .map(TextFragment::normalized)
        .filter(|f| cell.contains((f.left + f.right) / 2.0, f.center_y()))
        .collect();
    let text = group_lines(&inside)
        .iter()
        .flat_map(|line| line.cells.iter().map(|c| c.text.as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

fn build_table(cells: &[CellBox], fragments: &[TextFragment]) -> TableAttempt {
    let columns = distinct(cells.iter().map(|c| c.left));
    if columns.len() > MAX_COLUMNS {
        return Err(ExtractionError::TableLayout(format!(
            "{} columns exceeds the {MAX_COLUMNS} column limit",
            columns.len()
        )));
    }
    let mut tops = distinct(cells.iter().map(|c| c.top));
    tops.reverse();

    let mut grid: Vec<Vec<Option<String>>> = vec![vec![None; columns.len()]; tops.len()];
    for cell in cells {
        let row = tops.iter().position(|&y| y == cell.top);
        let col = columns.iter().position(|&x| x == cell.left);
        if let (Some(row), Some(col)) = (row, col) {
            grid[row][col] = cell_text(cell, fragments);
        }
    }

    Ok(RawTable {
        rows: grid.into_iter().map(TableRow::new).collect(),
    })
}

/// Ruled tables on the page, top to bottom. Empty when the strokes do
/// not form a grid of at least two cells.
pub(super) fn find_tables(fragments: &[TextFragment], rules: &[RuleSegment]) -> Vec<TableAttempt> {
    let grid = Grid::from_rules(rules);
    if grid.horizontal.len() < 2 || grid.vertical.len() < 2 {
        return Vec::new();
    }

    let cells = grid.cells(&grid.intersections());
    let mut groups = group_cells(&cells);
    groups.sort_by(|a, b| {
        let top = |g: &[CellBox]| g.iter().map(|c| c.top).fold(f32::MIN, f32::max);
        let left = |g: &[CellBox]| g.iter().map(|c| c.left).fold(f32::MAX, f32::min);
        top(b.as_slice())
            .total_cmp(&top(a.as_slice()))
            .then(left(a.as_slice()).total_cmp(&left(b.as_slice())))
    });

    groups
        .iter()
        .map(|group| build_table(group, fragments))
        .collect()
}
