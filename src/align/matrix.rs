use serde::{Deserialize, Serialize};

/// Default missing-value sentinel (-2^13), far outside any pitch coordinate.
pub const DEFAULT_MISSING: f64 = -8192.0;

/// Missing-value marker for expanded matrices.
///
/// All validity checks go through [`Missing::is_valid`] so the in-memory
/// representation never leaks into component contracts. NaN is always
/// treated as missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Missing(f64);

impl Missing {
    pub fn new(value: f64) -> Self {
        Missing(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_valid(&self, cell: f64) -> bool {
        !cell.is_nan() && cell != self.0
    }
}

impl Default for Missing {
    fn default() -> Self {
        Missing(DEFAULT_MISSING)
    }
}

/// Row-major `rows × cols` matrix of coordinates, one row per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl FrameMatrix {
    pub fn filled(rows: usize, cols: usize, fill: f64) -> Self {
        FrameMatrix {
            rows,
            cols,
            values: vec![fill; rows * cols],
        }
    }

    /// Wrap a flat row-major buffer; `None` if the length does not fit.
    pub fn from_flat(rows: usize, cols: usize, values: Vec<f64>) -> Option<Self> {
        if values.len() != rows * cols {
            return None;
        }
        Some(FrameMatrix { rows, cols, values })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        // chunks_exact panics on 0, and a zero-width matrix has no cells anyway
        self.values.chunks_exact(self.cols.max(1))
    }

    /// Apply `f(col, value)` to every cell, returning a new matrix.
    pub fn map_cells<F>(&self, mut f: F) -> FrameMatrix
    where
        F: FnMut(usize, f64) -> f64,
    {
        let cols = self.cols.max(1);
        let values = self
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| f(i % cols, *v))
            .collect();
        FrameMatrix {
            rows: self.rows,
            cols: self.cols,
            values,
        }
    }
}

#[cfg(test)]
impl FrameMatrix {
    /// Build from row vectors; `None` if the rows are ragged.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let values = rows.iter().flatten().copied().collect();
        Some(FrameMatrix {
            rows: rows.len(),
            cols,
            values,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }
}

/// Expanded (sparse) alignment matrix: column blocks of `dims` cells per
/// entity, with missing cells wherever the entity was not tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseFrames {
    pub matrix: FrameMatrix,
    /// Cells per entity slot (2 for x/y)
    pub dims: usize,
    /// Frame number of row 0
    pub first_frame: i64,
    pub missing: Missing,
}

impl SparseFrames {
    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }

    pub fn slots(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.matrix.cols() / self.dims
        }
    }

    pub fn frame(&self, row: usize) -> i64 {
        self.first_frame + row as i64
    }

    /// A slot is valid only when every one of its cells is.
    pub fn slot_valid(&self, row: usize, slot: usize) -> bool {
        let start = slot * self.dims;
        self.matrix.row(row)[start..start + self.dims]
            .iter()
            .all(|v| self.missing.is_valid(*v))
    }

    pub fn valid_slots(&self, row: usize) -> Vec<usize> {
        (0..self.slots())
            .filter(|slot| self.slot_valid(row, *slot))
            .collect()
    }

    /// Number of valid cells in `row`.
    pub fn valid_count(&self, row: usize) -> usize {
        self.matrix
            .row(row)
            .iter()
            .filter(|v| self.missing.is_valid(**v))
            .count()
    }
}
