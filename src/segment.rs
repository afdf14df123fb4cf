//! Game-phase segmentation of an aligned half.
//!
//! A half is cut wherever the ball possession or status flag changes. The
//! resulting phases are kept when the ball is in play and owned by a team,
//! then chopped into fixed-length time slices whose per-column means give the
//! team's average formation over that slice.

use serde::{Deserialize, Serialize};

use crate::align::FrameMatrix;
use crate::analytics::nan_mean;
use crate::tracking::BallState;

pub const DEFAULT_SLICE_FRAMES: usize = 125;

/// Rows `start..end` of a half with constant ball state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub start: usize,
    pub end: usize,
    pub state: BallState,
}

impl Phase {
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Average formation over one window of an in-play phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlice {
    /// Index of the phase within the in-play phases of the half
    pub phase: usize,
    /// First row of the window
    pub start: usize,
    /// One past the last row
    pub end: usize,
    pub possession: i32,
    /// Column means of the team matrix over the window
    pub mean: Vec<f64>,
}

/// Row indices where a new phase begins, plus the closing `len`.
///
/// Always starts with 0; empty input yields no cuts.
pub fn cut_points(states: &[BallState]) -> Vec<usize> {
    if states.is_empty() {
        return Vec::new();
    }
    let mut cuts = vec![0];
    cuts.extend(
        states
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] != w[1])
            .map(|(i, _)| i + 1),
    );
    cuts.push(states.len());
    cuts
}

pub fn phases(states: &[BallState]) -> Vec<Phase> {
    cut_points(states)
        .windows(2)
        .map(|w| Phase {
            start: w[0],
            end: w[1],
            state: states[w[0]],
        })
        .collect()
}

/// Phases during which the ball is in play and owned by a team.
pub fn in_play_phases(states: &[BallState]) -> Vec<Phase> {
    phases(states).into_iter().filter(|p| p.state.in_play()).collect()
}

/// Fixed windows of `window` rows over each phase. A phase's trailing
/// remainder becomes a shorter last slice. Phases reaching past the matrix
/// are clipped to its rows.
pub fn time_slices(team: &FrameMatrix, phases: &[Phase], window: usize) -> Vec<TimeSlice> {
    let window = window.max(1);
    let mut slices = Vec::new();
    for (idx, phase) in phases.iter().enumerate() {
        let end = phase.end.min(team.rows());
        let mut start = phase.start;
        while start < end {
            let stop = (start + window).min(end);
            let mean = (0..team.cols())
                .map(|col| nan_mean((start..stop).map(|row| team.row(row)[col])))
                .collect();
            slices.push(TimeSlice {
                phase: idx,
                start,
                end: stop,
                possession: phase.state.possession,
                mean,
            });
            start = stop;
        }
    }
    slices
}
