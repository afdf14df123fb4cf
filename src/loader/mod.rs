//! Vendor feed loading: Impire `.pos` files joined with a JSON roster.

pub mod impire;
pub mod roster;

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::tracking::{EntitySeries, HalfData, MatchData, PlayerTrack, Team};
use impire::PosFeed;
use roster::Roster;

pub const SOURCE_IMPIRE: &str = "impire";

/// Default roster location for a position file: `<stem>.roster.json` beside it.
pub fn default_roster_path(pos_path: &Path) -> PathBuf {
    let stem = match_name(pos_path);
    pos_path.with_file_name(format!("{}.roster.json", stem))
}

/// File stem of a position file, used as match name in exports.
pub fn match_name(pos_path: &Path) -> String {
    pos_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "match".to_string())
}

/// Read a position file and its roster and join them into a [`MatchData`].
pub fn load_match(pos_path: &Path, roster_path: Option<&Path>) -> Result<MatchData> {
    let roster_path = roster_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_roster_path(pos_path));
    let roster = roster::read_roster(&roster_path)?;
    let feed = impire::read_pos_file(pos_path)?;
    let data = build_match(feed, &roster)
        .with_context(|| format!("Failed to join {} with {}", pos_path.display(), roster_path.display()))?;
    info!(
        "Loaded match {} ({} half/halves, pitch {}x{} m)",
        data.match_id,
        data.halves.len(),
        data.pitch.length,
        data.pitch.width
    );
    Ok(data)
}

/// Attach roster ids and roles to the shirt-keyed series of a feed.
pub fn build_match(feed: PosFeed, roster: &Roster) -> Result<MatchData> {
    let mut halves = Vec::with_capacity(feed.halves.len());
    for half in feed.halves {
        halves.push(HalfData {
            half: half.half,
            home: join_roster(half.home, roster, Team::Home)?,
            guest: join_roster(half.guest, roster, Team::Guest)?,
            ball: half.ball,
        });
    }
    Ok(MatchData {
        match_id: roster.match_id.clone(),
        source: SOURCE_IMPIRE.to_string(),
        pitch: feed.pitch,
        halves,
    })
}

fn join_roster(
    by_shirt: BTreeMap<u32, EntitySeries>,
    roster: &Roster,
    team: Team,
) -> Result<Vec<PlayerTrack>> {
    by_shirt
        .into_iter()
        .map(|(shirt, series)| {
            let Some(entry) = roster.by_shirt(team, shirt) else {
                bail!("{} shirt {} has positions but is not on the roster", team, shirt);
            };
            Ok(PlayerTrack {
                id: entry.id.clone(),
                role: entry.position.clone(),
                series,
            })
        })
        .collect()
}
