use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::http_client::http_client;
use crate::model::{EntryId, Mode};

/// Source of gameweek scores for a single entry.
pub trait PointsProvider {
    /// Official score; stable once the gameweek has ended.
    fn final_points(&self, entry_id: EntryId, gw: u32) -> Result<i32>;

    /// Provisional score built from live player data.
    fn live_points(&self, entry_id: EntryId, gw: u32) -> Result<i32>;

    fn points(&self, entry_id: EntryId, gw: u32, mode: Mode) -> Result<i32> {
        match mode {
            Mode::Final => self.final_points(entry_id, gw),
            Mode::Live => self.live_points(entry_id, gw),
        }
    }
}

pub struct FplClient {
    client: &'static Client,
    base: String,
}

impl FplClient {
    pub fn new(base: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base: base.into(),
        })
    }

    fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {status} from {url}"));
        }
        Ok(body)
    }
}

impl PointsProvider for FplClient {
    fn final_points(&self, entry_id: EntryId, gw: u32) -> Result<i32> {
        let url = format!("{}/entry/{entry_id}/history/", self.base);
        let body = self.get_text(&url)?;
        parse_history_points(&body, gw)
    }

    fn live_points(&self, entry_id: EntryId, gw: u32) -> Result<i32> {
        let picks_url = format!("{}/entry/{entry_id}/event/{gw}/picks/", self.base);
        let multipliers = parse_pick_multipliers(&self.get_text(&picks_url)?)?;

        let live_url = format!("{}/event/{gw}/live/", self.base);
        let live = self.get_text(&live_url)?;
        live_points_from_json(&live, &multipliers)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    current: Vec<HistoryEvent>,
}

#[derive(Debug, Deserialize)]
struct HistoryEvent {
    event: u32,
    #[serde(default)]
    points: i32,
}

#[derive(Debug, Deserialize)]
struct PicksResponse {
    #[serde(default)]
    picks: Vec<Pick>,
}

#[derive(Debug, Deserialize)]
struct Pick {
    element: u32,
    #[serde(default)]
    multiplier: i32,
}

#[derive(Debug, Deserialize)]
struct LiveResponse {
    #[serde(default)]
    elements: Vec<LiveElement>,
}

#[derive(Debug, Deserialize)]
struct LiveElement {
    id: u32,
    #[serde(default)]
    stats: LiveStats,
}

#[derive(Debug, Deserialize, Default)]
struct LiveStats {
    #[serde(default)]
    total_points: i32,
}

/// Points for `gw` from an entry history body; a gameweek with no row scores 0.
pub fn parse_history_points(raw: &str, gw: u32) -> Result<i32> {
    let history: HistoryResponse = serde_json::from_str(raw).context("invalid history json")?;
    Ok(history
        .current
        .iter()
        .find(|item| item.event == gw)
        .map(|item| item.points)
        .unwrap_or(0))
}

/// Element id -> multiplier for picks that actually score (multiplier > 0).
pub fn parse_pick_multipliers(raw: &str) -> Result<HashMap<u32, i32>> {
    let picks: PicksResponse = serde_json::from_str(raw).context("invalid picks json")?;
    Ok(picks
        .picks
        .into_iter()
        .filter(|p| p.multiplier > 0)
        .map(|p| (p.element, p.multiplier))
        .collect())
}

pub fn live_points_from_json(raw: &str, multipliers: &HashMap<u32, i32>) -> Result<i32> {
    let live: LiveResponse = serde_json::from_str(raw).context("invalid live json")?;
    Ok(live
        .elements
        .iter()
        .filter_map(|el| {
            multipliers
                .get(&el.id)
                .map(|mult| el.stats.total_points * mult)
        })
        .sum())
}
