use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::model::{EntryId, Participant, Side};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub gw: u32,
    pub home: Side,
    pub away: Side,
}

/// Fixture as rendered for display, with both sides turned into labels.
#[derive(Debug, Clone, Serialize)]
pub struct LabelledFixture {
    pub gw: u32,
    pub home_name: String,
    pub away_name: String,
}

pub fn load_schedule(path: &Path) -> Result<Vec<Fixture>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read schedule {}", path.display()))?;
    parse_schedule_csv(&raw).with_context(|| format!("parse schedule {}", path.display()))
}

/// Parses `gw,home,away` rows. A leading `gw,...` header is skipped, as is
/// any line that does not split into exactly three fields.
pub fn parse_schedule_csv(raw: &str) -> Result<Vec<Fixture>> {
    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if idx == 0 && line.trim_start().to_ascii_lowercase().starts_with("gw,") {
            continue;
        }
        let parts: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        if parts.len() != 3 {
            continue;
        }
        let gw = parts[0]
            .parse::<u32>()
            .map_err(|_| anyhow!("line {}: invalid gameweek {:?}", idx + 1, parts[0]))?;
        out.push(Fixture {
            gw,
            home: Side::parse(parts[1]),
            away: Side::parse(parts[2]),
        });
    }
    Ok(out)
}

pub fn fixtures_for_gw(schedule: &[Fixture], gw: u32) -> impl Iterator<Item = &Fixture> {
    schedule.iter().filter(move |f| f.gw == gw)
}

pub fn side_label(side: &Side, names: &HashMap<EntryId, String>) -> String {
    match side {
        Side::Entry(id) => names.get(id).cloned().unwrap_or_else(|| id.to_string()),
        other => other.to_string(),
    }
}

pub fn name_map(participants: &[Participant]) -> HashMap<EntryId, String> {
    participants
        .iter()
        .map(|p| (p.entry_id, p.name.clone()))
        .collect()
}

pub fn labelled_schedule(
    schedule: &[Fixture],
    participants: &[Participant],
) -> Vec<LabelledFixture> {
    let names = name_map(participants);
    schedule
        .iter()
        .map(|f| LabelledFixture {
            gw: f.gw,
            home_name: side_label(&f.home, &names),
            away_name: side_label(&f.away, &names),
        })
        .collect()
}
