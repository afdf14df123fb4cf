use super::matrix::{FrameMatrix, SparseFrames};
use crate::error::AlignError;

/// Rows inspected when the condensed width has to be inferred.
const WIDTH_SAMPLE_ROWS: usize = 10;

/// Left-pack the valid cells of every row into a dense matrix.
///
/// Cells keep their relative column order within each row. When `width` is
/// `None` it is inferred from the first few rows, which must agree. Any row
/// whose valid count differs from the width is rejected, so the result never
/// contains a missing cell.
pub fn condense(sparse: &SparseFrames, width: Option<usize>) -> Result<FrameMatrix, AlignError> {
    let rows = sparse.rows();
    let width = match width {
        Some(w) => w,
        None => infer_width(sparse)?,
    };

    let mut out = FrameMatrix::filled(rows, width, 0.0);
    for row in 0..rows {
        let found = sparse.valid_count(row);
        if found != width {
            return Err(AlignError::ColumnCountDisagreement {
                row,
                expected: width,
                found,
            });
        }
        let packed = sparse
            .matrix
            .row(row)
            .iter()
            .copied()
            .filter(|v| sparse.missing.is_valid(*v));
        for (dst, v) in out.row_mut(row).iter_mut().zip(packed) {
            *dst = v;
        }
    }
    Ok(out)
}

fn infer_width(sparse: &SparseFrames) -> Result<usize, AlignError> {
    let sampled = sparse.rows().min(WIDTH_SAMPLE_ROWS);
    let Some(first) = (0..sampled).map(|r| sparse.valid_count(r)).next() else {
        return Ok(0);
    };
    for row in 1..sampled {
        let found = sparse.valid_count(row);
        if found != first {
            return Err(AlignError::ColumnCountDisagreement {
                row,
                expected: first,
                found,
            });
        }
    }
    Ok(first)
}
