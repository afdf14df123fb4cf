//! Impire `.pos` position feed.
//!
//! One line per frame, sections separated by `#`:
//!
//! ```text
//! <frame>,<unused>,<half>:#<shirt>,<x>,<y>;...;#<shirt>,<x>,<y>;...;#<referee>#<bx>,<by>,<bz>,<unused>,<status>,<possession>;#<unused>,<length>,<width>;
//! ```
//!
//! Player and ball coordinates are normalised to [-1, 1] around the centre
//! spot; they are converted to metres here using the pitch size carried by the
//! first line.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::tracking::{BallSample, EntitySeries, Half, PitchDimensions};

const SECTION_HEADER: usize = 0;
const SECTION_HOME: usize = 1;
const SECTION_GUEST: usize = 2;
const SECTION_BALL: usize = 4;
const SECTION_PITCH: usize = 5;

/// Position data of one half, players keyed by shirt number.
#[derive(Debug, Clone)]
pub struct PosHalf {
    pub half: Half,
    pub ball: Vec<BallSample>,
    pub home: BTreeMap<u32, EntitySeries>,
    pub guest: BTreeMap<u32, EntitySeries>,
}

impl PosHalf {
    fn new(half: Half) -> Self {
        PosHalf {
            half,
            ball: Vec::new(),
            home: BTreeMap::new(),
            guest: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PosFeed {
    pub pitch: PitchDimensions,
    /// Halves in match order
    pub halves: Vec<PosHalf>,
}

pub fn read_pos_file(path: &Path) -> Result<PosFeed> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read position file {}", path.display()))?;
    info!("Start reading in position data from {}", path.display());
    let feed = parse_pos(&text).with_context(|| format!("Invalid position file {}", path.display()))?;
    info!(
        "Finished reading {} half/halves ({} frames)",
        feed.halves.len(),
        feed.halves.iter().map(|h| h.ball.len()).sum::<usize>()
    );
    Ok(feed)
}

pub fn parse_pos(text: &str) -> Result<PosFeed> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .peekable();

    let pitch = match lines.peek() {
        Some((line_no, line)) => parse_pitch(line).with_context(|| format!("line {}", line_no))?,
        None => bail!("Position feed is empty"),
    };
    let scale = (pitch.length / 2.0, pitch.width / 2.0);

    let mut halves: BTreeMap<Half, PosHalf> = BTreeMap::new();
    let mut skipped = 0usize;

    for (line_no, line) in lines {
        let sections: Vec<&str> = line.split('#').collect();
        if sections.len() <= SECTION_BALL {
            bail!(
                "line {}: expected at least {} '#'-separated sections, found {}",
                line_no,
                SECTION_BALL + 1,
                sections.len()
            );
        }

        let (frame, half_id) = parse_header(sections[SECTION_HEADER])
            .with_context(|| format!("line {}: bad frame header", line_no))?;
        let Some(half) = Half::from_number(half_id) else {
            skipped += 1;
            continue;
        };
        let entry = halves.entry(half).or_insert_with(|| PosHalf::new(half));

        for (section, team) in [(SECTION_HOME, &mut entry.home), (SECTION_GUEST, &mut entry.guest)] {
            for (shirt, x, y) in parse_players(sections[section])
                .with_context(|| format!("line {}: bad player entry", line_no))?
            {
                team.entry(shirt)
                    .or_insert_with(|| EntitySeries::new(2))
                    .push(frame, &[x * scale.0, y * scale.1])?;
            }
        }

        let ball = parse_ball(frame, sections[SECTION_BALL], scale)
            .with_context(|| format!("line {}: bad ball entry", line_no))?;
        entry.ball.push(ball);
    }

    if skipped > 0 {
        warn!("Skipped {} frame(s) outside the two halves", skipped);
    }
    for h in halves.values() {
        debug!(
            "Half {}: {} ball frames, {} home / {} guest shirts",
            h.half,
            h.ball.len(),
            h.home.len(),
            h.guest.len()
        );
    }

    Ok(PosFeed {
        pitch,
        halves: halves.into_values().collect(),
    })
}

fn fields(section: &str) -> Vec<&str> {
    section
        .trim()
        .trim_end_matches(&[':', ';', ','][..])
        .split(',')
        .map(str::trim)
        .collect()
}

fn parse_f64(raw: &str, what: &str) -> Result<f64> {
    raw.parse::<f64>()
        .with_context(|| format!("{} '{}' is not a number", what, raw))
}

/// Integer flag that some feeds write as `1` and others as `1.0`.
fn parse_code(raw: &str, what: &str) -> Result<i32> {
    if let Ok(v) = raw.parse::<i32>() {
        return Ok(v);
    }
    let v = parse_f64(raw, what)?;
    if v.fract() != 0.0 || v < i32::MIN as f64 || v > i32::MAX as f64 {
        bail!("{} '{}' is not an integer code", what, raw);
    }
    Ok(v as i32)
}

fn parse_header(section: &str) -> Result<(i64, i32)> {
    let f = fields(section);
    if f.len() < 3 {
        bail!("expected frame, unused and half fields, found {:?}", f);
    }
    let frame = f[0]
        .parse::<i64>()
        .with_context(|| format!("frame '{}' is not an integer", f[0]))?;
    let half = f[2]
        .parse::<i32>()
        .with_context(|| format!("half '{}' is not an integer", f[2]))?;
    Ok((frame, half))
}

fn parse_players(section: &str) -> Result<Vec<(u32, f64, f64)>> {
    section
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|player| {
            let f = fields(player);
            if f.len() < 3 {
                bail!("expected shirt,x,y but found '{}'", player);
            }
            let shirt = f[0]
                .parse::<u32>()
                .with_context(|| format!("shirt '{}' is not an integer", f[0]))?;
            Ok((shirt, parse_f64(f[1], "x")?, parse_f64(f[2], "y")?))
        })
        .collect()
}

fn parse_ball(frame: i64, section: &str, scale: (f64, f64)) -> Result<BallSample> {
    let f = fields(section);
    if f.len() < 6 {
        bail!("expected 6 ball fields, found {}", f.len());
    }
    Ok(BallSample {
        frame,
        x: parse_f64(f[0], "ball x")? * scale.0,
        y: parse_f64(f[1], "ball y")? * scale.1,
        z: parse_f64(f[2], "ball z")?,
        status: parse_code(f[4], "ball status")?,
        possession: parse_code(f[5], "ball possession")?,
    })
}

fn parse_pitch(line: &str) -> Result<PitchDimensions> {
    let section = line
        .split('#')
        .nth(SECTION_PITCH)
        .context("first line carries no pitch dimensions section")?;
    let f = fields(section);
    if f.len() < 3 {
        bail!("expected unused,length,width pitch fields, found {:?}", f);
    }
    let pitch = PitchDimensions {
        length: parse_f64(f[1], "pitch length")?,
        width: parse_f64(f[2], "pitch width")?,
    };
    if pitch.length <= 0.0 || pitch.width <= 0.0 {
        bail!("pitch dimensions must be positive, got {:?}", pitch);
    }
    Ok(pitch)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two frames per half, three home and two guest players. Shirt 7 leaves
    /// after frame 2 and shirt 12 comes on in the second half.
    pub(crate) const FIXTURE: &str = "\
1,0,1:#1,-0.9,0.0;4,-0.4,0.2;7,0.2,-0.1;#1,0.9,0.0;9,0.3,0.3;#0,0,0#0.0,0.0,0.5,0,1,1;#0,105.0,68.0;
2,40,1:#1,-0.9,0.1;4,-0.4,0.2;7,0.2,-0.2;#1,0.9,0.0;9,0.3,0.2;#0,0,0#0.1,0.0,0.2,0,1,1;#0,105.0,68.0;

100,4000,2:#1,0.9,0.0;4,0.4,0.2;12,-0.2,0.1;#1,-0.9,0.0;9,-0.3,0.3;#0,0,0#0.0,0.0,0.0,0,0,2;
101,4040,2:#1,0.9,0.1;4,0.4,0.2;12,-0.3,0.1;#1,-0.9,0.0;9,-0.3,0.3;#0,0,0#0.2,0.1,0.0,0,1,2;
";

    #[test]
    fn reads_pitch_and_halves() {
        let feed = parse_pos(FIXTURE).unwrap();
        assert_relative_eq!(feed.pitch.length, 105.0);
        assert_relative_eq!(feed.pitch.width, 68.0);
        assert_eq!(feed.halves.len(), 2);
        assert_eq!(feed.halves[0].half, Half::First);
        assert_eq!(feed.halves[1].ball.len(), 2);
        assert_eq!(feed.halves[1].ball[0].frame, 100);
        assert_eq!(feed.halves[1].ball[0].possession, 2);
        assert_eq!(feed.halves[1].ball[0].status, 0);
    }

    #[test]
    fn converts_to_metres() {
        let feed = parse_pos(FIXTURE).unwrap();
        let keeper = &feed.halves[0].home[&1];
        assert_eq!(keeper.frames(), &[1, 2]);
        assert_relative_eq!(keeper.coords(0)[0], -0.9 * 52.5, epsilon = 1e-9);
        assert_relative_eq!(keeper.coords(1)[1], 0.1 * 34.0, epsilon = 1e-9);
        let ball = feed.halves[0].ball[1];
        assert_relative_eq!(ball.x, 0.1 * 52.5, epsilon = 1e-9);
        assert_relative_eq!(ball.z, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn players_are_grouped_per_half() {
        let feed = parse_pos(FIXTURE).unwrap();
        let first: Vec<u32> = feed.halves[0].home.keys().copied().collect();
        let second: Vec<u32> = feed.halves[1].home.keys().copied().collect();
        assert_eq!(first, vec![1, 4, 7]);
        assert_eq!(second, vec![1, 4, 12]);
        assert_eq!(feed.halves[1].guest[&9].len(), 2);
    }

    #[test]
    fn bad_number_names_line() {
        let text = FIXTURE.replacen("4,-0.4,0.2", "4,abc,0.2", 1);
        let err = parse_pos(&text).unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));
    }

    #[test]
    fn ball_codes_must_be_integral() {
        let text = FIXTURE.replacen("0.1,0.0,0.2,0,1,1;", "0.1,0.0,0.2,0,1.0,2.0;", 1);
        let feed = parse_pos(&text).unwrap();
        assert_eq!(feed.halves[0].ball[1].status, 1);
        assert_eq!(feed.halves[0].ball[1].possession, 2);

        let text = FIXTURE.replacen("0.1,0.0,0.2,0,1,1;", "0.1,0.0,0.2,0,1,1.5;", 1);
        let err = parse_pos(&text).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("line 2"), "{}", msg);
        assert!(msg.contains("ball possession '1.5'"), "{}", msg);
    }

    #[test]
    fn missing_pitch_section_fails() {
        let err = parse_pos("1,0,1:#1,0,0;#1,0,0;#0#0,0,0,0,1,1;\n").unwrap_err();
        assert!(format!("{:#}", err).contains("pitch"));
    }

    #[test]
    fn unknown_half_is_skipped() {
        let text = format!("{}3,0,3:#1,0,0;#1,0,0;#0#0,0,0,0,1,1;\n", FIXTURE);
        let feed = parse_pos(&text).unwrap();
        assert_eq!(feed.halves.len(), 2);
        assert_eq!(feed.halves[0].ball.len(), 2);
    }
}
