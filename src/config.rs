use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::align::{AlignConfig, Missing, OverlapStrategy};
use crate::segment::DEFAULT_SLICE_FRAMES;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliRankingScheme {
    /// DFL tactical positions (TW, IVL, ... STZ)
    A,
    /// G / D / M / A
    B,
    /// goalie / defenseman / mid-fielder / forward
    C,
}

impl CliRankingScheme {
    pub fn scheme_id(&self) -> &'static str {
        match self {
            CliRankingScheme::A => "A",
            CliRankingScheme::B => "B",
            CliRankingScheme::C => "C",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliOverlapStrategy {
    Continuity,
    Lookahead,
}

/// Align ragged soccer tracking feeds into dense per-half matrices
#[derive(Parser, Debug, Clone)]
#[command(name = "trackstitch", version, about)]
pub struct Config {
    /// Impire .pos position files to process
    #[arg(required = true)]
    pub pos_files: Vec<PathBuf>,

    /// Roster JSON (defaults to <stem>.roster.json beside each .pos file)
    #[arg(long, env = "ROSTER_FILE")]
    pub roster_file: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "trackstitch.db")]
    pub database_path: String,

    /// Role ranking scheme used to order player columns
    #[arg(long, env = "RANKING_SCHEME", value_enum, default_value = "a")]
    pub ranking_scheme: CliRankingScheme,

    /// Players per team in the aligned output
    #[arg(long, env = "ROSTER_SIZE", default_value = "11")]
    pub roster_size: usize,

    /// Sentinel marking untracked cells during alignment
    #[arg(long, env = "MISSING_VALUE", default_value = "-8192.0", allow_hyphen_values = true)]
    pub missing_value: f64,

    /// How to choose players during substitution overlaps
    #[arg(long, env = "OVERLAP_STRATEGY", value_enum, default_value = "continuity")]
    pub overlap_strategy: CliOverlapStrategy,

    /// Lookahead window in frames (lookahead strategy only)
    #[arg(long, env = "POST_LOOK", default_value = "20")]
    pub post_look: usize,

    /// Skip failing team/half units instead of aborting the match
    #[arg(long, env = "SKIP_FAILED", default_value = "false")]
    pub skip_failed: bool,

    /// Directory for fixed-width text exports (no export when unset)
    #[arg(long, env = "EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Keep every n-th frame in exports
    #[arg(long, env = "EXPORT_STRIDE", default_value = "25")]
    pub export_stride: usize,

    /// Do not write results to SQLite
    #[arg(long, env = "NO_PERSIST", default_value = "false")]
    pub no_persist: bool,

    /// Re-read stored runs and raw positions after writing and compare them
    #[arg(long, env = "VERIFY_STORED", default_value = "false")]
    pub verify_stored: bool,

    /// Frames per formation time slice within an in-play phase
    #[arg(long, env = "SLICE_FRAMES", default_value_t = DEFAULT_SLICE_FRAMES)]
    pub slice_frames: usize,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.roster_size == 0 {
            anyhow::bail!("roster_size must be at least 1");
        }
        if !self.missing_value.is_finite() {
            anyhow::bail!("missing_value must be a finite number");
        }
        if self.missing_value > -1000.0 {
            anyhow::bail!(
                "missing_value {} could collide with pitch coordinates; use a value <= -1000",
                self.missing_value
            );
        }
        if self.post_look == 0 {
            anyhow::bail!("post_look must be at least 1");
        }
        if self.export_stride == 0 {
            anyhow::bail!("export_stride must be at least 1");
        }
        if self.slice_frames == 0 {
            anyhow::bail!("slice_frames must be at least 1");
        }
        if self.verify_stored && self.no_persist {
            anyhow::bail!("--verify-stored needs persistence; drop --no-persist");
        }
        if self.roster_file.is_some() && self.pos_files.len() > 1 {
            anyhow::bail!("--roster-file can only be used with a single position file");
        }
        Ok(())
    }

    pub fn overlap(&self) -> OverlapStrategy {
        match self.overlap_strategy {
            CliOverlapStrategy::Continuity => OverlapStrategy::Continuity,
            CliOverlapStrategy::Lookahead => OverlapStrategy::Lookahead {
                window: self.post_look,
            },
        }
    }

    pub fn align_config(&self) -> AlignConfig {
        AlignConfig {
            scheme: self.ranking_scheme.scheme_id().to_string(),
            roster_size: self.roster_size,
            missing: Missing::new(self.missing_value),
            overlap: self.overlap(),
            skip_failed: self.skip_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("trackstitch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&["match.pos"]);
        config.validate().unwrap();
        let align = config.align_config();
        assert_eq!(align.scheme, "A");
        assert_eq!(align.roster_size, 11);
        assert_eq!(align.missing.value(), -8192.0);
        assert_eq!(align.overlap, OverlapStrategy::Continuity);
        assert_eq!(config.export_stride, 25);
        assert!(!config.no_persist);
        assert!(!config.verify_stored);
        assert_eq!(config.slice_frames, 125);
    }

    #[test]
    fn lookahead_uses_post_look() {
        let config = parse(&[
            "a.pos",
            "--overlap-strategy",
            "lookahead",
            "--post-look",
            "7",
            "--ranking-scheme",
            "c",
        ]);
        let align = config.align_config();
        assert_eq!(align.overlap, OverlapStrategy::Lookahead { window: 7 });
        assert_eq!(align.scheme, "C");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["a.pos", "--roster-size", "0"]).validate().is_err());
        assert!(parse(&["a.pos", "--missing-value", "-5"]).validate().is_err());
        assert!(parse(&["a.pos", "--missing-value", "-inf"]).validate().is_err());
        assert!(parse(&["a.pos", "--missing-value", "NaN"]).validate().is_err());
        assert!(parse(&["a.pos", "--post-look", "0"]).validate().is_err());
        assert!(parse(&["a.pos", "--export-stride", "0"]).validate().is_err());
        assert!(parse(&["a.pos", "--slice-frames", "0"]).validate().is_err());
        assert!(parse(&["a.pos", "--no-persist", "--verify-stored"])
            .validate()
            .is_err());
        assert!(parse(&["a.pos", "b.pos", "--roster-file", "r.json"])
            .validate()
            .is_err());
    }

    #[test]
    fn requires_a_position_file() {
        assert!(Config::try_parse_from(["trackstitch"]).is_err());
    }
}
