//! Fixed-width text export of aligned matrices, one file per (label, half).
//!
//! Layout (CRLF line endings):
//!
//! ```text
//! <rows>
//! <cols>
//!  4.20   5.00   ...
//! ```

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::align::FrameMatrix;
use crate::tracking::Half;

pub fn file_name(match_name: &str, label: &str, half: Half) -> String {
    if match_name.is_empty() {
        format!("positions-{}-HT{}.txt", label, half.number())
    } else {
        format!("{}-positions-{}-HT{}.txt", match_name, label, half.number())
    }
}

/// Write every `stride`-th row of `matrix` to
/// `<dir>/<match>-positions-<label>-HT<n>.txt`.
pub fn write_half(
    dir: &Path,
    match_name: &str,
    label: &str,
    half: Half,
    matrix: &FrameMatrix,
    stride: usize,
) -> Result<PathBuf> {
    if stride == 0 {
        bail!("export stride must be at least 1");
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(file_name(match_name, label, half));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_matrix(&mut out, matrix, stride)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(path)
}

pub fn write_matrix<W: Write>(out: &mut W, matrix: &FrameMatrix, stride: usize) -> Result<()> {
    let rows: Vec<&[f64]> = matrix.iter_rows().step_by(stride.max(1)).collect();
    write!(out, "{}\r\n{}\r\n", rows.len(), matrix.cols())?;
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| format!("{:5.2}", v)).collect();
        write!(out, "{}  \r\n", line.join("  "))?;
    }
    out.flush()?;
    Ok(())
}
