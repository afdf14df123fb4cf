use tracing::{error, info};

use super::condense::condense;
use super::expand::{expand, FrameClock};
use super::matrix::{FrameMatrix, Missing};
use super::overlap::{resolve_overlaps, OverlapStrategy};
use super::ranking::RankingRegistry;
use crate::error::AlignError;
use crate::pitch::{self, PlayingDirection, NORMALISED_EXTENT};
use crate::tracking::{
    BallSample, BallState, Half, HalfData, MatchData, PitchDimensions, PlayerTrack, Team,
};

/// Settings consumed by the alignment engine.
#[derive(Debug, Clone)]
pub struct AlignConfig {
    /// Ranking scheme id, see [`RankingRegistry::builtin`]
    pub scheme: String,
    /// On-pitch players per team in the output
    pub roster_size: usize,
    pub missing: Missing,
    pub overlap: OverlapStrategy,
    /// Log and drop failing units instead of failing the whole match
    pub skip_failed: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        AlignConfig {
            scheme: "A".to_string(),
            roster_size: 11,
            missing: Missing::default(),
            overlap: OverlapStrategy::Continuity,
            skip_failed: false,
        }
    }
}

/// Dense coordinates of one team in one half.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamHalfFrames {
    /// Frame number of row 0 (the half's first ball frame)
    pub first_frame: i64,
    /// Entity ids in role order, i.e. the column-block order before condensing
    pub player_ids: Vec<String>,
    /// `frames × (2 · roster_size)`
    pub matrix: FrameMatrix,
}

/// Both teams and the ball of one half, oriented and normalised to
/// `[0, NORMALISED_EXTENT]`.
#[derive(Debug, Clone)]
pub struct AlignedHalf {
    pub half: Half,
    pub first_frame: i64,
    /// Raw home direction before mirroring
    pub home_direction: PlayingDirection,
    pub home: Option<TeamHalfFrames>,
    pub guest: Option<TeamHalfFrames>,
    /// `frames × 2` ball x/y
    pub ball: FrameMatrix,
    /// Ball possession and status per row
    pub ball_state: Vec<BallState>,
}

impl AlignedHalf {
    pub fn team(&self, team: Team) -> Option<&TeamHalfFrames> {
        match team {
            Team::Home => self.home.as_ref(),
            Team::Guest => self.guest.as_ref(),
        }
    }
}

/// Align one team's players in one half: sort, expand, resolve overlaps,
/// condense. The ball track is validated before anything else runs.
pub fn stitch_team_half(
    players: &[PlayerTrack],
    ball: &[BallSample],
    registry: &RankingRegistry,
    config: &AlignConfig,
) -> Result<TeamHalfFrames, AlignError> {
    let frames: Vec<i64> = ball.iter().map(|b| b.frame).collect();
    let clock = FrameClock::from_frames(&frames)?;

    let sorted = registry.sort_by_role(players, &config.scheme)?;
    let sparse = expand(&sorted, &frames, config.missing)?;
    let target = config.roster_size * sparse.dims;
    let resolved = resolve_overlaps(&sparse, target, config.overlap)?;
    let matrix = condense(&resolved, Some(target))?;

    Ok(TeamHalfFrames {
        first_frame: clock.first,
        player_ids: sorted.iter().map(|p| p.id.clone()).collect(),
        matrix,
    })
}

/// Ball x/y and ball state, one row per frame of the clock.
pub fn ball_track(ball: &[BallSample]) -> Result<(FrameMatrix, Vec<BallState>), AlignError> {
    let frames: Vec<i64> = ball.iter().map(|b| b.frame).collect();
    let clock = FrameClock::from_frames(&frames)?;
    let mut matrix = FrameMatrix::filled(clock.len, 2, 0.0);
    let mut states = vec![BallState::default(); clock.len];
    for b in ball {
        if let Some(row) = clock.row_of(b.frame) {
            matrix.row_mut(row).copy_from_slice(&[b.x, b.y]);
            states[row] = b.state();
        }
    }
    Ok((matrix, states))
}

/// Align both teams of a half, orient them so the home team attacks right to
/// left, and normalise all coordinates to the pitch.
///
/// A bad ball clock always fails the half. A failing team fails the half
/// unless `config.skip_failed` is set, in which case it is logged and left
/// out.
pub fn align_half(
    data: &HalfData,
    pitch_dims: PitchDimensions,
    registry: &RankingRegistry,
    config: &AlignConfig,
) -> Result<AlignedHalf, AlignError> {
    let (ball, ball_state) = ball_track(&data.ball)?;
    let first_frame = data.ball.iter().map(|b| b.frame).min().unwrap_or(0);

    let mut aligned = [None, None];
    for (slot, team) in Team::ALL.iter().enumerate() {
        info!("Processing: {}-{}...", team, data.half);
        match stitch_team_half(data.players(*team), &data.ball, registry, config) {
            Ok(frames) => aligned[slot] = Some(frames),
            Err(e) if config.skip_failed => {
                error!("Skipping {}-{}: {}", team, data.half, e);
            }
            Err(e) => return Err(e),
        }
    }
    let [home, guest] = aligned;

    let home_direction = match (&home, &guest) {
        (Some(h), _) => pitch::determine_playing_direction(&h.matrix),
        (None, Some(g)) => match pitch::determine_playing_direction(&g.matrix) {
            PlayingDirection::LeftToRight => PlayingDirection::RightToLeft,
            PlayingDirection::RightToLeft => PlayingDirection::LeftToRight,
        },
        (None, None) => PlayingDirection::RightToLeft,
    };
    let flip = home_direction == PlayingDirection::LeftToRight;

    let normalise = |m: &FrameMatrix| {
        let oriented = if flip { pitch::mirror(m) } else { m.clone() };
        pitch::clamp(&pitch::rescale(&oriented, pitch_dims), 0.0, NORMALISED_EXTENT)
    };
    let normalise_team = |t: Option<TeamHalfFrames>| {
        t.map(|t| TeamHalfFrames {
            matrix: normalise(&t.matrix),
            ..t
        })
    };

    Ok(AlignedHalf {
        half: data.half,
        first_frame,
        home_direction,
        home: normalise_team(home),
        guest: normalise_team(guest),
        ball: normalise(&ball),
        ball_state,
    })
}

/// Align every half of a match. With `config.skip_failed`, failing halves
/// are logged and dropped.
pub fn align_match(
    data: &MatchData,
    registry: &RankingRegistry,
    config: &AlignConfig,
) -> Result<Vec<AlignedHalf>, AlignError> {
    let mut halves = Vec::with_capacity(data.halves.len());
    for half in &data.halves {
        match align_half(half, data.pitch, registry, config) {
            Ok(aligned) => halves.push(aligned),
            Err(e) if config.skip_failed => {
                error!("Skipping half {} of match {}: {}", half.half, data.match_id, e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(halves)
}
