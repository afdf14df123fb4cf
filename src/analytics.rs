//! Group statistics over aligned team matrices (interleaved x/y columns).

use crate::align::FrameMatrix;

/// Per-row mean of the x columns and of the y columns. NaN cells are
/// skipped; a row without any finite x (or y) yields NaN for that axis.
pub fn team_centroid(team: &FrameMatrix) -> Vec<(f64, f64)> {
    team.iter_rows()
        .map(|row| {
            let x = nan_mean(row.iter().step_by(2).copied());
            let y = nan_mean(row.iter().skip(1).step_by(2).copied());
            (x, y)
        })
        .collect()
}

/// Per-row mean distance of the players from the team centroid.
pub fn stretch_index(team: &FrameMatrix) -> Vec<f64> {
    team.iter_rows()
        .zip(team_centroid(team))
        .map(|(row, (cx, cy))| {
            nan_mean(
                row.chunks_exact(2)
                    .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt()),
            )
        })
        .collect()
}

/// Mean over the non-NaN values, NaN if there are none.
pub fn nan_mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Half-level summary stored with an alignment run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamSummary {
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub stretch: f64,
}

pub fn summarize(team: &FrameMatrix) -> TeamSummary {
    let centroid = team_centroid(team);
    TeamSummary {
        centroid_x: nan_mean(centroid.iter().map(|c| c.0)),
        centroid_y: nan_mean(centroid.iter().map(|c| c.1)),
        stretch: nan_mean(stretch_index(team)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> FrameMatrix {
        // four players on the corners of a 2x2 square centred at (5, 5)
        FrameMatrix::from_rows(&[
            vec![4.0, 4.0, 6.0, 4.0, 4.0, 6.0, 6.0, 6.0],
            vec![5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0],
        ])
        .unwrap()
    }

    #[test]
    fn centroid_per_row() {
        let c = team_centroid(&square());
        assert_eq!(c.len(), 2);
        assert_relative_eq!(c[0].0, 5.0);
        assert_relative_eq!(c[0].1, 5.0);
    }

    #[test]
    fn stretch_is_mean_distance() {
        let s = stretch_index(&square());
        assert_relative_eq!(s[0], 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(s[1], 0.0);
    }

    #[test]
    fn nan_cells_are_ignored() {
        let m = FrameMatrix::from_rows(&[vec![2.0, 1.0, f64::NAN, f64::NAN, 4.0, 3.0]]).unwrap();
        let c = team_centroid(&m);
        assert_relative_eq!(c[0].0, 3.0);
        assert_relative_eq!(c[0].1, 2.0);
        assert!(nan_mean([f64::NAN]).is_nan());
    }

    #[test]
    fn summary_averages_rows() {
        let s = summarize(&square());
        assert_relative_eq!(s.centroid_x, 5.0);
        assert_relative_eq!(s.stretch, 2f64.sqrt() / 2.0, epsilon = 1e-12);
    }
}
