//! Pitch coordinate transforms.
//!
//! Input matrices hold interleaved x/y columns in metres with the origin at
//! the centre spot:
//!
//! ```text
//!     -------------------
//!     |        |        |
//!     |_       |       _|
//!     | |    (0,0)    | |
//!     |_|      |      |_|
//!     |        |        |
//!     -------------------
//! ```
//!
//! Every transform returns a new matrix.

use serde::{Deserialize, Serialize};

use crate::align::FrameMatrix;
use crate::tracking::PitchDimensions;

/// Upper bound of the normalised pitch on both axes.
pub const NORMALISED_EXTENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayingDirection {
    LeftToRight,
    RightToLeft,
}

/// Infer a team's attacking direction from its goalkeeper, assumed to be the
/// first x/y column pair after role sorting. A keeper standing in the left
/// half means the team attacks left to right.
pub fn determine_playing_direction(team: &FrameMatrix) -> PlayingDirection {
    let rows = team.rows();
    if rows == 0 || team.cols() == 0 {
        return PlayingDirection::RightToLeft;
    }
    let mean_x = team.iter_rows().map(|r| r[0]).sum::<f64>() / rows as f64;
    if mean_x < 0.0 {
        PlayingDirection::LeftToRight
    } else {
        PlayingDirection::RightToLeft
    }
}

/// Mirror about the halfway line (negates every x column).
pub fn mirror(coords: &FrameMatrix) -> FrameMatrix {
    coords.map_cells(|col, v| if col % 2 == 0 { -v } else { v })
}

/// Move the origin to the bottom-left corner and scale both axes to
/// `[0, NORMALISED_EXTENT]`.
pub fn rescale(coords: &FrameMatrix, pitch: PitchDimensions) -> FrameMatrix {
    let half_length = pitch.length / 2.0;
    let half_width = pitch.width / 2.0;
    coords.map_cells(|col, v| {
        if col % 2 == 0 {
            (v + half_length) * NORMALISED_EXTENT / pitch.length
        } else {
            (v + half_width) * NORMALISED_EXTENT / pitch.width
        }
    })
}

pub fn clamp(coords: &FrameMatrix, min: f64, max: f64) -> FrameMatrix {
    coords.map_cells(|_, v| v.clamp(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PITCH: PitchDimensions = PitchDimensions {
        length: 105.0,
        width: 68.0,
    };

    fn matrix(rows: &[Vec<f64>]) -> FrameMatrix {
        FrameMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn keeper_on_left_attacks_right() {
        let team = matrix(&[vec![-50.0, 0.0, 10.0, 3.0], vec![-48.0, 1.0, 12.0, 2.0]]);
        assert_eq!(determine_playing_direction(&team), PlayingDirection::LeftToRight);
        let team = matrix(&[vec![49.0, 0.0, -10.0, 3.0]]);
        assert_eq!(determine_playing_direction(&team), PlayingDirection::RightToLeft);
    }

    #[test]
    fn mirror_negates_x_only() {
        let out = mirror(&matrix(&[vec![1.0, 2.0, -3.0, 4.0]]));
        assert_eq!(out.row(0), &[-1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn rescale_maps_corners() {
        let out = rescale(&matrix(&[vec![-52.5, -34.0, 52.5, 34.0, 0.0, 0.0]]), PITCH);
        let row = out.row(0);
        assert_relative_eq!(row[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(row[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(row[2], 10.0, epsilon = 1e-9);
        assert_relative_eq!(row[3], 10.0, epsilon = 1e-9);
        assert_relative_eq!(row[4], 5.0, epsilon = 1e-9);
        assert_relative_eq!(row[5], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn clamp_bounds_every_cell() {
        let out = clamp(&matrix(&[vec![-0.3, 10.4, 5.0, 11.0]]), 0.0, NORMALISED_EXTENT);
        assert_eq!(out.row(0), &[0.0, 10.0, 5.0, 10.0]);
    }
}
