//! Ragged array expansion.
//!
//! Projects per-entity series of differing start/stop frames onto the shared
//! frame clock of a half, producing one column block per entity with missing
//! cells outside each entity's span.

use tracing::{debug, warn};

use super::matrix::{FrameMatrix, Missing, SparseFrames};
use crate::error::AlignError;
use crate::tracking::{EntitySeries, PlayerTrack};

/// Consecutive frame range of one half, derived from the ball track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    pub first: i64,
    pub len: usize,
}

impl FrameClock {
    /// Derive the clock from ball frames, requiring exactly one frame per
    /// tick of `min..=max`.
    pub fn from_frames(frames: &[i64]) -> Result<Self, AlignError> {
        let (min, max) = match (frames.iter().min(), frames.iter().max()) {
            (Some(min), Some(max)) => (*min, *max),
            _ => return Err(AlignError::EmptyClock),
        };
        let span = max - min + 1;
        let mut distinct = frames.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if frames.len() as i64 != span || distinct.len() != frames.len() {
            return Err(AlignError::ClockMismatch {
                ball_frames: frames.len(),
                span,
            });
        }
        Ok(FrameClock {
            first: min,
            len: frames.len(),
        })
    }

    pub fn last(&self) -> i64 {
        self.first + self.len as i64 - 1
    }

    pub fn row_of(&self, frame: i64) -> Option<usize> {
        if frame < self.first || frame > self.last() {
            None
        } else {
            Some((frame - self.first) as usize)
        }
    }
}

/// Capability of exposing a frame-stamped coordinate series.
pub trait FrameSeries {
    fn frame_series(&self) -> &EntitySeries;
}

impl FrameSeries for EntitySeries {
    fn frame_series(&self) -> &EntitySeries {
        self
    }
}

impl FrameSeries for PlayerTrack {
    fn frame_series(&self) -> &EntitySeries {
        &self.series
    }
}

impl<T: FrameSeries + ?Sized> FrameSeries for &T {
    fn frame_series(&self) -> &EntitySeries {
        (**self).frame_series()
    }
}

/// Expand `entities` over the clock defined by `frames`.
///
/// Column blocks follow the input order, so callers sort by role first.
/// Entities may overlap in time; an entity whose span misses the clock
/// entirely contributes an all-missing block.
pub fn expand<T: FrameSeries>(
    entities: &[T],
    frames: &[i64],
    missing: Missing,
) -> Result<SparseFrames, AlignError> {
    let clock = FrameClock::from_frames(frames)?;
    let dims = entities
        .iter()
        .map(|e| e.frame_series().dims())
        .max()
        .unwrap_or(2);

    let mut matrix = FrameMatrix::filled(clock.len, entities.len() * dims, missing.value());

    for (slot, entity) in entities.iter().enumerate() {
        let series = entity.frame_series();
        let gaps = series.gap_count();
        if gaps > 0 {
            warn!(
                "Entity in column block {} has {} untracked frames inside its span; treating them as missing",
                slot, gaps
            );
        }

        let start = slot * dims;
        let mut placed = 0usize;
        for (frame, coords) in series.iter() {
            if let Some(row) = clock.row_of(frame) {
                matrix.row_mut(row)[start..start + coords.len()].copy_from_slice(coords);
                placed += 1;
            }
        }
        if placed == 0 {
            debug!("Entity in column block {} has no frames on the clock", slot);
        }
    }

    Ok(SparseFrames {
        matrix,
        dims,
        first_frame: clock.first,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::PlayerTrack;

    const MIS: f64 = -1.234567;

    fn constant(frames: std::ops::Range<i64>, value: f64) -> EntitySeries {
        let mut s = EntitySeries::new(1);
        for f in frames {
            s.push(f, &[value]).unwrap();
        }
        s
    }

    fn ragged() -> Vec<EntitySeries> {
        vec![constant(0..4, 1.0), constant(0..6, 2.0), constant(4..6, 3.0)]
    }

    fn expected() -> FrameMatrix {
        FrameMatrix::from_rows(&[
            vec![1.0, 2.0, MIS],
            vec![1.0, 2.0, MIS],
            vec![1.0, 2.0, MIS],
            vec![1.0, 2.0, MIS],
            vec![MIS, 2.0, 3.0],
            vec![MIS, 2.0, 3.0],
        ])
        .unwrap()
    }

    #[test]
    fn expands_ragged_series() {
        let frames: Vec<i64> = (0..6).collect();
        let out = expand(&ragged(), &frames, Missing::new(MIS)).unwrap();
        assert_eq!(out.matrix, expected());
        assert_eq!(out.dims, 1);
        assert_eq!(out.first_frame, 0);
    }

    #[test]
    fn wrapped_tracks_expand_identically() {
        let tracks: Vec<PlayerTrack> = ragged()
            .into_iter()
            .enumerate()
            .map(|(i, series)| PlayerTrack {
                id: i.to_string(),
                role: "M".into(),
                series,
            })
            .collect();
        let refs: Vec<&PlayerTrack> = tracks.iter().collect();
        let frames: Vec<i64> = (0..6).collect();
        let out = expand(&refs, &frames, Missing::new(MIS)).unwrap();
        assert_eq!(out.matrix, expected());
    }

    #[test]
    fn clock_with_gap_is_rejected() {
        let frames = vec![0, 1, 2, 4];
        let err = expand(&ragged(), &frames, Missing::new(MIS)).unwrap_err();
        assert_eq!(
            err,
            AlignError::ClockMismatch {
                ball_frames: 4,
                span: 5
            }
        );
    }

    #[test]
    fn duplicated_ball_frame_is_rejected() {
        let err = FrameClock::from_frames(&[0, 0, 2]).unwrap_err();
        assert_eq!(
            err,
            AlignError::ClockMismatch {
                ball_frames: 3,
                span: 3
            }
        );
    }

    #[test]
    fn empty_clock_is_rejected() {
        let err = expand(&ragged(), &[], Missing::new(MIS)).unwrap_err();
        assert_eq!(err, AlignError::EmptyClock);
    }

    #[test]
    fn entity_outside_clock_contributes_nothing() {
        let series = vec![constant(0..3, 1.0), constant(50..60, 9.0)];
        let frames: Vec<i64> = (0..3).collect();
        let out = expand(&series, &frames, Missing::new(MIS)).unwrap();
        for row in out.matrix.iter_rows() {
            assert_eq!(row, &[1.0, MIS]);
        }
    }

    #[test]
    fn offset_clock_and_two_dims() {
        let a = EntitySeries::from_xy([(101, 1.0, -1.0), (102, 2.0, -2.0)]);
        let b = EntitySeries::from_xy([(100, 5.0, 5.0)]);
        let out = expand(&[a, b], &[100, 101, 102], Missing::new(MIS)).unwrap();
        assert_eq!(out.first_frame, 100);
        assert_eq!(out.matrix.row(0), &[MIS, MIS, 5.0, 5.0]);
        assert_eq!(out.matrix.row(2), &[2.0, -2.0, MIS, MIS]);
        assert_eq!(out.slots(), 2);
    }

    #[test]
    fn clock_row_lookup() {
        let clock = FrameClock::from_frames(&[12, 10, 11]).unwrap();
        assert_eq!(clock.first, 10);
        assert_eq!(clock.last(), 12);
        assert_eq!(clock.row_of(11), Some(1));
        assert_eq!(clock.row_of(13), None);
    }
}
