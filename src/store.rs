use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::{GameweekRecord, SeedSnapshot, StandingsSnapshot};
use crate::prizes::PrizeReport;
use crate::schedule::LabelledFixture;

const STANDINGS_FILE: &str = "standings.json";
const SEEDS_FILE: &str = "seeds.json";
const SCHEDULE_FILE: &str = "schedule.json";
const WINNINGS_FILE: &str = "winnings.json";
const MYSTERY_KITS_FILE: &str = "mystery_kits.json";

/// Keyed persistence for gameweek results, the standings table, the frozen
/// seeds and the prize report. Every save replaces the previous value.
pub trait ResultStore {
    fn has_gameweek(&self, gw: u32) -> bool;
    fn load_gameweek(&self, gw: u32) -> Result<Option<GameweekRecord>>;
    fn save_gameweek(&mut self, record: &GameweekRecord) -> Result<()>;

    fn load_standings(&self) -> Result<Option<StandingsSnapshot>>;
    fn save_standings(&mut self, standings: &StandingsSnapshot) -> Result<()>;

    fn load_seeds(&self) -> Result<Option<SeedSnapshot>>;
    fn save_seeds(&mut self, seeds: &SeedSnapshot) -> Result<()>;

    fn save_prize_report(&mut self, report: &PrizeReport) -> Result<()>;
}

/// One pretty-printed JSON file per key inside a data directory.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create data dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn gameweek_path(&self, gw: u32) -> PathBuf {
        self.dir.join(format!("gw_{gw}_results.json"))
    }

    pub fn save_schedule(&self, fixtures: &[LabelledFixture]) -> Result<()> {
        #[derive(Serialize)]
        struct ScheduleFile<'a> {
            matches: &'a [LabelledFixture],
        }
        write_json(&self.dir.join(SCHEDULE_FILE), &ScheduleFile { matches: fixtures })
    }
}

impl ResultStore for JsonStore {
    fn has_gameweek(&self, gw: u32) -> bool {
        self.gameweek_path(gw).is_file()
    }

    fn load_gameweek(&self, gw: u32) -> Result<Option<GameweekRecord>> {
        read_json(&self.gameweek_path(gw))
    }

    fn save_gameweek(&mut self, record: &GameweekRecord) -> Result<()> {
        write_json(&self.gameweek_path(record.gw), record)
    }

    fn load_standings(&self) -> Result<Option<StandingsSnapshot>> {
        read_json(&self.dir.join(STANDINGS_FILE))
    }

    fn save_standings(&mut self, standings: &StandingsSnapshot) -> Result<()> {
        write_json(&self.dir.join(STANDINGS_FILE), standings)
    }

    fn load_seeds(&self) -> Result<Option<SeedSnapshot>> {
        read_json(&self.dir.join(SEEDS_FILE))
    }

    fn save_seeds(&mut self, seeds: &SeedSnapshot) -> Result<()> {
        write_json(&self.dir.join(SEEDS_FILE), seeds)
    }

    fn save_prize_report(&mut self, report: &PrizeReport) -> Result<()> {
        #[derive(Serialize)]
        struct KitsFile<'a> {
            processed_through_gw: u32,
            blocks: &'a [crate::prizes::PrizeBlock],
        }
        write_json(&self.dir.join(WINNINGS_FILE), &report.ledger)?;
        write_json(
            &self.dir.join(MYSTERY_KITS_FILE),
            &KitsFile {
                processed_through_gw: report.processed_through_gw,
                blocks: &report.blocks,
            },
        )
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value =
        serde_json::from_str::<T>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(value))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

/// In-memory store for tests and benches.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub gameweeks: BTreeMap<u32, GameweekRecord>,
    pub standings: Option<StandingsSnapshot>,
    pub seeds: Option<SeedSnapshot>,
    pub prize_report: Option<PrizeReport>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryStore {
    fn has_gameweek(&self, gw: u32) -> bool {
        self.gameweeks.contains_key(&gw)
    }

    fn load_gameweek(&self, gw: u32) -> Result<Option<GameweekRecord>> {
        Ok(self.gameweeks.get(&gw).cloned())
    }

    fn save_gameweek(&mut self, record: &GameweekRecord) -> Result<()> {
        self.gameweeks.insert(record.gw, record.clone());
        Ok(())
    }

    fn load_standings(&self) -> Result<Option<StandingsSnapshot>> {
        Ok(self.standings.clone())
    }

    fn save_standings(&mut self, standings: &StandingsSnapshot) -> Result<()> {
        self.standings = Some(standings.clone());
        Ok(())
    }

    fn load_seeds(&self) -> Result<Option<SeedSnapshot>> {
        Ok(self.seeds.clone())
    }

    fn save_seeds(&mut self, seeds: &SeedSnapshot) -> Result<()> {
        self.seeds = Some(seeds.clone());
        Ok(())
    }

    fn save_prize_report(&mut self, report: &PrizeReport) -> Result<()> {
        self.prize_report = Some(report.clone());
        Ok(())
    }
}
