use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame-stamped coordinate series of one tracked entity within one half.
///
/// Coordinates are stored flat, `dims` values per frame. Frames are expected
/// to be strictly increasing and contiguous; see [`EntitySeries::gap_count`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeries {
    dims: usize,
    frames: Vec<i64>,
    values: Vec<f64>,
}

impl EntitySeries {
    pub fn new(dims: usize) -> Self {
        EntitySeries {
            dims,
            frames: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build a 2D series from `(frame, x, y)` samples.
    pub fn from_xy<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = (i64, f64, f64)>,
    {
        let mut series = EntitySeries::new(2);
        for (frame, x, y) in samples {
            series.frames.push(frame);
            series.values.extend_from_slice(&[x, y]);
        }
        series
    }

    /// Append one sample. `coords` must hold exactly `dims` values.
    pub fn push(&mut self, frame: i64, coords: &[f64]) -> Result<()> {
        if coords.len() != self.dims {
            bail!(
                "sample at frame {} has {} coordinates, series has {} dims",
                frame,
                coords.len(),
                self.dims
            );
        }
        self.frames.push(frame);
        self.values.extend_from_slice(coords);
        Ok(())
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[i64] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &[f64])> + '_ {
        self.frames
            .iter()
            .copied()
            .zip(self.values.chunks_exact(self.dims.max(1)))
    }

    /// First and last frame covered, if any.
    pub fn span(&self) -> Option<(i64, i64)> {
        Some((*self.frames.first()?, *self.frames.last()?))
    }

    /// Number of frames missing inside the span (0 for a contiguous series).
    pub fn gap_count(&self) -> usize {
        match self.span() {
            Some((first, last)) => ((last - first + 1) as usize).saturating_sub(self.len()),
            None => 0,
        }
    }
}

#[cfg(test)]
impl EntitySeries {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn coords(&self, idx: usize) -> &[f64] {
        &self.values[idx * self.dims..(idx + 1) * self.dims]
    }
}

/// One ball sample. The ball track defines the authoritative frame clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSample {
    pub frame: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Possessing team as reported by the vendor
    pub possession: i32,
    /// Ball in/out of play as reported by the vendor
    pub status: i32,
}

impl BallSample {
    pub fn state(&self) -> BallState {
        BallState {
            possession: self.possession,
            status: self.status,
        }
    }
}

/// Possession and in/out-of-play flags of the ball at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BallState {
    /// 0 for none, otherwise the possessing team's vendor id (1 or 2)
    pub possession: i32,
    /// 1 while the ball is in play
    pub status: i32,
}

impl BallState {
    pub fn in_play(&self) -> bool {
        self.possession >= 1 && self.status >= 1
    }
}

/// A player's series together with the metadata needed for alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTrack {
    pub id: String,
    /// Tactical role label in the vendor's vocabulary (e.g. "TW", "IVL")
    pub role: String,
    pub series: EntitySeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Home,
    Guest,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::Home, Team::Guest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Home => "home",
            Team::Guest => "guest",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Half {
    First,
    Second,
}

impl Half {
    pub fn number(&self) -> i32 {
        match self {
            Half::First => 1,
            Half::Second => 2,
        }
    }

    pub fn from_number(n: i32) -> Option<Half> {
        match n {
            1 => Some(Half::First),
            2 => Some(Half::Second),
            _ => None,
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Half::First => f.write_str("1st"),
            Half::Second => f.write_str("2nd"),
        }
    }
}

/// Pitch size in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchDimensions {
    pub length: f64,
    pub width: f64,
}

/// Everything the engine needs for one half of a match.
#[derive(Debug, Clone)]
pub struct HalfData {
    pub half: Half,
    pub ball: Vec<BallSample>,
    pub home: Vec<PlayerTrack>,
    pub guest: Vec<PlayerTrack>,
}

impl HalfData {
    pub fn players(&self, team: Team) -> &[PlayerTrack] {
        match team {
            Team::Home => &self.home,
            Team::Guest => &self.guest,
        }
    }
}

/// A parsed match ready for alignment.
#[derive(Debug, Clone)]
pub struct MatchData {
    pub match_id: String,
    pub source: String,
    pub pitch: PitchDimensions,
    pub halves: Vec<HalfData>,
}
