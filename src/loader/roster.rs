use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::tracking::Team;

/// Match sheet accompanying a position feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub match_id: String,
    pub home: Vec<RosterEntry>,
    pub guest: Vec<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub shirt: u32,
    /// Tactical role label, ranked by the configured scheme
    pub position: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Roster {
    pub fn team(&self, team: Team) -> &[RosterEntry] {
        match team {
            Team::Home => &self.home,
            Team::Guest => &self.guest,
        }
    }

    pub fn by_shirt(&self, team: Team, shirt: u32) -> Option<&RosterEntry> {
        self.team(team).iter().find(|e| e.shirt == shirt)
    }
}

pub fn parse_roster(text: &str) -> Result<Roster> {
    serde_json::from_str(text).context("Failed to parse roster JSON")
}

pub fn read_roster(path: &Path) -> Result<Roster> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster {}", path.display()))?;
    parse_roster(&text).with_context(|| format!("Invalid roster {}", path.display()))
}
