use std::ops::Range;

use crate::scheduler::TileSpan;

/// Split `range` into consecutive pieces of `grain` indices (the last one
/// may be shorter).
pub(crate) fn chunks(range: Range<usize>, grain: usize) -> Vec<Range<usize>> {
    debug_assert!(grain > 0);
    let end = range.end;
    range
        .step_by(grain)
        .map(|start| start..(start + grain).min(end))
        .collect()
}

/// Cartesian product of row pieces of `x_grain` and column pieces of
/// `y_grain`.
pub(crate) fn blocks(
    rows: Range<usize>,
    cols: Range<usize>,
    x_grain: usize,
    y_grain: usize,
) -> Vec<(Range<usize>, Range<usize>)> {
    let col_pieces = chunks(cols, y_grain);
    chunks(rows, x_grain)
        .into_iter()
        .flat_map(|r| col_pieces.iter().map(move |c| (r.clone(), c.clone())))
        .collect()
}

/// One stripe of the cross phase split along its length.
///
/// A row stripe reads the pivot rows it writes, so it may only be cut
/// between columns; a column stripe only between rows.
pub(crate) fn stripe_pieces(span: &TileSpan, grain: usize) -> Vec<(Range<usize>, Range<usize>)> {
    if span.is_empty() {
        return Vec::new();
    }
    let (rows, cols) = (span.rows(), span.cols());
    if rows == span.pivot_range() {
        chunks(cols, grain).into_iter().map(|c| (rows.clone(), c)).collect()
    } else {
        chunks(rows, grain).into_iter().map(|r| (r, cols.clone())).collect()
    }
}

/// One remainder quadrant split in two dimensions.
pub(crate) fn quadrant_pieces(
    span: &TileSpan,
    x_grain: usize,
    y_grain: usize,
) -> Vec<(Range<usize>, Range<usize>)> {
    if span.is_empty() {
        return Vec::new();
    }
    blocks(span.rows(), span.cols(), x_grain, y_grain)
}
