use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::model::{EntryId, Participant, Side};

pub const DEFAULT_API_BASE: &str = "https://fantasy.premierleague.com/api";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manager {
    pub entry_id: EntryId,
    pub name: String,
    #[serde(default)]
    pub team_name: Option<String>,
}

impl Manager {
    pub fn label(&self) -> &str {
        match self.team_name.as_deref().map(str::trim) {
            Some(team) if !team.is_empty() => team,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayoffConfig {
    #[serde(default = "default_regular_season_end")]
    pub regular_season_end: u32,
    #[serde(default = "default_semifinal_gws")]
    pub semifinal_gws: [u32; 2],
    #[serde(default = "default_shield_gws")]
    pub shield_gws: [u32; 2],
    /// Explicit Shield-SF1/SF2 slot pairs. When absent the pairings are
    /// discovered from the shield gameweek records.
    #[serde(default)]
    pub shield_pairings: Option<Vec<[Side; 2]>>,
}

impl Default for PlayoffConfig {
    fn default() -> Self {
        Self {
            regular_season_end: default_regular_season_end(),
            semifinal_gws: default_semifinal_gws(),
            shield_gws: default_shield_gws(),
            shield_pairings: None,
        }
    }
}

fn default_regular_season_end() -> u32 {
    30
}

fn default_semifinal_gws() -> [u32; 2] {
    [31, 32]
}

fn default_shield_gws() -> [u32; 2] {
    [35, 36]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockConfig {
    pub name: String,
    pub gw_start: u32,
    pub gw_end: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrizeConfig {
    pub currency: String,
    pub weekly_pot: f64,
    #[serde(default)]
    pub mystery_kit_blocks: Vec<BlockConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueConfig {
    pub managers: Vec<Manager>,
    #[serde(default)]
    pub playoffs: PlayoffConfig,
    #[serde(default)]
    pub prizes: Option<PrizeConfig>,
}

impl LeagueConfig {
    pub fn participants(&self) -> Vec<Participant> {
        self.managers
            .iter()
            .map(|m| Participant {
                entry_id: m.entry_id,
                name: m.label().to_string(),
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.managers.is_empty() {
            bail!("config lists no managers");
        }
        let mut seen = HashSet::new();
        for m in &self.managers {
            if !seen.insert(m.entry_id) {
                bail!("duplicate manager entry_id {}", m.entry_id);
            }
        }

        let p = &self.playoffs;
        if p.semifinal_gws[0] == p.semifinal_gws[1] {
            bail!("semifinal_gws must name two distinct gameweeks");
        }
        if p.shield_gws[0] == p.shield_gws[1] {
            bail!("shield_gws must name two distinct gameweeks");
        }
        if let Some(pairings) = p.shield_pairings.as_ref()
            && pairings.len() != 2
        {
            bail!(
                "shield_pairings must hold exactly two slot pairs, found {}",
                pairings.len()
            );
        }

        if let Some(prizes) = self.prizes.as_ref() {
            if !prizes.weekly_pot.is_finite() || prizes.weekly_pot < 0.0 {
                bail!("weekly_pot must be a non-negative amount");
            }
            for block in &prizes.mystery_kit_blocks {
                if block.gw_start == 0 || block.gw_start > block.gw_end {
                    bail!(
                        "mystery kit block {:?} has invalid range {}..={}",
                        block.name,
                        block.gw_start,
                        block.gw_end
                    );
                }
            }
        }
        Ok(())
    }
}

pub fn load_league_config(path: &Path) -> Result<LeagueConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read league config {}", path.display()))?;
    let cfg = serde_json::from_str::<LeagueConfig>(&raw)
        .with_context(|| format!("parse league config {}", path.display()))?;
    cfg.validate()
        .map_err(|err| anyhow!("invalid league config {}: {err}", path.display()))?;
    Ok(cfg)
}

/// Paths and provider knobs taken from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub schedule_path: PathBuf,
    pub data_dir: PathBuf,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Self {
        let timeout_secs = env::var("FPL_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 120);
        Self {
            config_path: env_path("H2H_CONFIG", "config.json"),
            schedule_path: env_path("H2H_SCHEDULE", "schedule.csv"),
            data_dir: env_path("H2H_DATA_DIR", "data"),
            api_base: env_default("FPL_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            timeout_secs,
        }
    }
}

pub fn load_env_files() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn env_default(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_path(key: &str, fallback: &str) -> PathBuf {
    env_default(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(fallback))
}
