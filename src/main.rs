use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use tracing::{error, info};

mod align;
mod analytics;
mod config;
mod db;
mod error;
mod export;
mod loader;
mod pitch;
mod segment;
mod tracking;

use align::{align_match, AlignConfig, AlignedHalf, RankingRegistry};
use config::Config;
use db::models::{AlignmentRun, MatchRecord};
use db::Database;
use segment::TimeSlice;
use tracking::{MatchData, Team};

/// Formation slices of one aligned half, per aligned team.
type HalfSlices = Vec<(Team, Vec<TimeSlice>)>;

fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let align_config = config.align_config();
    info!(
        "Aligning {} file(s): scheme {}, {} players per team, {} overlap resolution",
        config.pos_files.len(),
        align_config.scheme,
        align_config.roster_size,
        align_config.overlap.name()
    );

    let db = if config.no_persist {
        info!("Persistence disabled");
        None
    } else {
        let db = Database::open(&config.database_path)?;
        info!("Database opened: {}", config.database_path);
        Some(db)
    };

    let registry = RankingRegistry::builtin();
    if !registry.contains(&align_config.scheme) {
        bail!(
            "Unknown ranking scheme {} (known: {:?})",
            align_config.scheme,
            registry.scheme_ids()
        );
    }
    let mut failed = 0usize;
    for pos_path in &config.pos_files {
        if let Err(e) = process_file(pos_path, &config, &registry, &align_config, db.as_ref()) {
            error!("Failed to process {}: {:#}", pos_path.display(), e);
            failed += 1;
        }
    }

    if let Some(db) = &db {
        let stats = db.get_stats()?;
        info!(
            "Database holds {} match(es), {} alignment run(s), {} aligned frame(s), {} raw position(s), {} formation slice(s)",
            stats.matches, stats.runs, stats.aligned_frames, stats.player_positions, stats.time_slices
        );
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, config.pos_files.len());
    }
    Ok(())
}

fn process_file(
    pos_path: &Path,
    config: &Config,
    registry: &RankingRegistry,
    align_config: &AlignConfig,
    db: Option<&Database>,
) -> Result<()> {
    let data = loader::load_match(pos_path, config.roster_file.as_deref())?;
    let halves = align_match(&data, registry, align_config)?;
    info!(
        "Aligned {} of {} half/halves of match {}",
        halves.len(),
        data.halves.len(),
        data.match_id
    );
    let slices = segment_halves(&halves, config.slice_frames);
    for (half, half_slices) in halves.iter().zip(&slices) {
        info!("Half {}: home attacked {:?} before normalisation", half.half, half.home_direction);
        for team in Team::ALL {
            if let Some(frames) = half.team(team) {
                let summary = analytics::summarize(&frames.matrix);
                info!(
                    "{}-{}: mean centroid ({:.2}, {:.2}), mean stretch {:.2}",
                    team, half.half, summary.centroid_x, summary.centroid_y, summary.stretch
                );
            }
        }
        let phases = segment::in_play_phases(&half.ball_state);
        info!(
            "Half {}: {} in-play phase(s) covering {} of {} frames from frame {}, {} formation slice(s)",
            half.half,
            phases.len(),
            phases.iter().map(|p| p.len()).sum::<usize>(),
            half.ball_state.len(),
            half.first_frame,
            half_slices.iter().map(|(_, s)| s.len()).sum::<usize>()
        );
    }

    if let Some(db) = db {
        persist(db, &data, &halves, &slices, align_config)?;
        if config.verify_stored {
            verify_stored(db, &data, &halves, &slices)?;
        }
    }

    if let Some(dir) = &config.export_dir {
        let name = loader::match_name(pos_path);
        for half in &halves {
            for team in Team::ALL {
                if let Some(frames) = half.team(team) {
                    export::write_half(dir, &name, team.as_str(), half.half, &frames.matrix, config.export_stride)?;
                }
            }
            export::write_half(dir, &name, "ball", half.half, &half.ball, config.export_stride)?;
        }
    }
    Ok(())
}

/// In-play formation slices of every aligned team, in half order.
fn segment_halves(halves: &[AlignedHalf], window: usize) -> Vec<HalfSlices> {
    halves
        .iter()
        .map(|half| {
            let phases = segment::in_play_phases(&half.ball_state);
            Team::ALL
                .into_iter()
                .filter_map(|team| {
                    half.team(team)
                        .map(|frames| (team, segment::time_slices(&frames.matrix, &phases, window)))
                })
                .collect()
        })
        .collect()
}

fn persist(
    db: &Database,
    data: &MatchData,
    halves: &[AlignedHalf],
    slices: &[HalfSlices],
    align_config: &AlignConfig,
) -> Result<()> {
    if let Some(previous) = db.get_match(&data.match_id)? {
        info!(
            "Match {} was already processed at {}; adding new runs",
            previous.id, previous.processed_at
        );
    }
    db.upsert_match(&MatchRecord {
        id: data.match_id.clone(),
        source: data.source.clone(),
        pitch_length: data.pitch.length,
        pitch_width: data.pitch.width,
        processed_at: Utc::now(),
    })?;

    for half in &data.halves {
        for team in Team::ALL {
            for player in half.players(team) {
                db.insert_player_positions(&data.match_id, half.half, team, &player.id, &player.series)?;
            }
        }
    }

    for (half, half_slices) in halves.iter().zip(slices) {
        for (team, team_slices) in half_slices {
            let team = *team;
            let Some(frames) = half.team(team) else {
                continue;
            };
            let summary = analytics::summarize(&frames.matrix);
            let run = AlignmentRun {
                id: None,
                match_id: data.match_id.clone(),
                team: team.as_str().to_string(),
                half: half.half.number(),
                first_frame: frames.first_frame,
                rows: frames.matrix.rows() as i64,
                width: frames.matrix.cols() as i64,
                strategy: align_config.overlap.name().to_string(),
                player_ids: frames.player_ids.clone(),
                centroid_x: finite(summary.centroid_x),
                centroid_y: finite(summary.centroid_y),
                stretch: finite(summary.stretch),
                processed_at: Utc::now(),
            };
            let run_id = db.insert_alignment(&run, &frames.matrix)?;
            let stored = db.insert_time_slices(run_id, team_slices)?;
            info!(
                "Stored alignment run {} ({} rows, {} formation slice(s))",
                run_id, run.rows, stored
            );
        }
    }
    Ok(())
}

/// Read back what [`persist`] wrote for a match and compare it with the
/// in-memory results. The newest run of each (team, half) is checked.
fn verify_stored(
    db: &Database,
    data: &MatchData,
    halves: &[AlignedHalf],
    slices: &[HalfSlices],
) -> Result<()> {
    let runs = db.list_runs(&data.match_id)?;
    for (half, half_slices) in halves.iter().zip(slices) {
        for (team, team_slices) in half_slices {
            let Some(frames) = half.team(*team) else {
                continue;
            };
            let run = runs
                .iter()
                .rev()
                .find(|r| r.half == half.half.number() && r.team == team.as_str())
                .with_context(|| format!("no stored run for {}-{}", team, half.half))?;
            let run_id = run.id.context("stored run has no id")?;
            if run.first_frame != frames.first_frame || run.player_ids != frames.player_ids {
                bail!("run {}: stored frame origin or player order differs", run_id);
            }
            if db.load_aligned_frames(run_id)? != frames.matrix {
                bail!("run {}: stored frames differ from the aligned matrix", run_id);
            }
            if db.list_time_slices(run_id)? != *team_slices {
                bail!("run {}: stored formation slices differ", run_id);
            }
        }
    }

    let mut players = 0usize;
    for half in &data.halves {
        for team in Team::ALL {
            for player in half.players(team) {
                let stored = db.get_player_positions(&data.match_id, half.half, team, &player.id)?;
                if stored.frames() != player.series.frames() {
                    bail!(
                        "player {} in half {}: {} stored frame(s), {} read",
                        player.id,
                        half.half,
                        stored.len(),
                        player.series.len()
                    );
                }
                players += 1;
            }
        }
    }
    info!(
        "Verified {} stored run(s) and {} player series of match {}",
        slices.iter().map(Vec::len).sum::<usize>(),
        players,
        data.match_id
    );
    Ok(())
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
