use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A processed match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    /// Vendor feed the match was read from, e.g. "impire"
    pub source: String,
    /// Pitch length in metres
    pub pitch_length: f64,
    /// Pitch width in metres
    pub pitch_width: f64,
    pub processed_at: DateTime<Utc>,
}

/// One aligned (team, half) unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRun {
    pub id: Option<i64>,
    pub match_id: String,
    /// "home" | "guest"
    pub team: String,
    /// 1 or 2
    pub half: i32,
    /// Frame number of row 0
    pub first_frame: i64,
    pub rows: i64,
    /// Columns of the aligned matrix (2 per player)
    pub width: i64,
    /// Overlap strategy name
    pub strategy: String,
    /// Player ids in role order
    pub player_ids: Vec<String>,
    /// Mean team centroid over the half, normalised pitch units
    pub centroid_x: Option<f64>,
    pub centroid_y: Option<f64>,
    /// Mean stretch index over the half
    pub stretch: Option<f64>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub matches: i64,
    pub runs: i64,
    pub aligned_frames: i64,
    pub player_positions: i64,
    pub time_slices: i64,
}
