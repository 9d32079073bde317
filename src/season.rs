use anyhow::Result;
use tracing::{info, warn};

use crate::config::LeagueConfig;
use crate::gameweek::compute_gameweek;
use crate::model::{GameweekRecord, Mode, SeedSnapshot, StandingsSnapshot};
use crate::points::PointsProvider;
use crate::prizes::{PrizeReport, compute_prizes};
use crate::schedule::Fixture;
use crate::standings::fold_store;
use crate::store::ResultStore;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub gw: u32,
    pub mode: Mode,
    /// Capture the seed snapshot from the current standings even if one exists.
    pub freeze_seeds: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub record: GameweekRecord,
    pub standings: StandingsSnapshot,
    pub seeds_captured: Option<SeedSnapshot>,
    pub prizes: Option<PrizeReport>,
}

/// True when any stored record in 1..=`through_gw` was computed from live points.
fn any_live_through<S: ResultStore + ?Sized>(store: &S, through_gw: u32) -> Result<bool> {
    for gw in 1..=through_gw {
        if let Some(record) = store.load_gameweek(gw)?
            && record.mode == Mode::Live
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn capture_seeds<S: ResultStore + ?Sized>(
    store: &S,
    standings: &StandingsSnapshot,
) -> Result<SeedSnapshot> {
    let mut seeds = SeedSnapshot::from_standings(standings);
    seeds.provisional = any_live_through(store, standings.through_gw)?;
    Ok(seeds)
}

/// Re-folds standings through `gw` and persists them. Seeds are captured
/// from the table as it stood at the end of the regular season the first
/// time a run reaches that boundary, or from the current table when forced.
/// A boundary snapshot folded from live points is captured again on later
/// runs until every regular-season gameweek is final.
pub fn refresh_standings<S: ResultStore + ?Sized>(
    store: &mut S,
    config: &LeagueConfig,
    gw: u32,
    freeze_seeds: bool,
) -> Result<(StandingsSnapshot, Option<SeedSnapshot>)> {
    let participants = config.participants();
    let standings = fold_store(&*store, &participants, gw)?;
    store.save_standings(&standings)?;

    let boundary = config.playoffs.regular_season_end;
    let due = match store.load_seeds()? {
        None => true,
        Some(existing) => existing.provisional && existing.captured_through_gw == boundary,
    };
    let seeds = if freeze_seeds {
        Some(capture_seeds(&*store, &standings)?)
    } else if gw >= boundary && due {
        let regular = fold_store(&*store, &participants, boundary)?;
        Some(capture_seeds(&*store, &regular)?)
    } else {
        None
    };
    if let Some(seeds) = seeds.as_ref() {
        store.save_seeds(seeds)?;
        if seeds.provisional {
            warn!(
                through_gw = seeds.captured_through_gw,
                seeds = ?seeds.seeds,
                "seed snapshot captured from live points, will be retaken once final"
            );
        } else {
            info!(
                through_gw = seeds.captured_through_gw,
                seeds = ?seeds.seeds,
                "seed snapshot captured"
            );
        }
    }
    Ok((standings, seeds))
}

/// One full batch run: compute the gameweek, refresh the table, then the
/// prize report when prizes are configured.
pub fn run_gameweek<S, P>(
    store: &mut S,
    provider: &P,
    config: &LeagueConfig,
    schedule: &[Fixture],
    opts: RunOptions,
) -> Result<RunSummary>
where
    S: ResultStore + ?Sized,
    P: PointsProvider + ?Sized,
{
    let record = compute_gameweek(store, provider, config, schedule, opts.gw, opts.mode)?;
    let (standings, seeds_captured) =
        refresh_standings(store, config, opts.gw, opts.freeze_seeds)?;
    info!(through_gw = opts.gw, teams = standings.teams.len(), "standings written");

    let prizes = match config.prizes.as_ref() {
        Some(prizes) => {
            let report = compute_prizes(
                provider,
                &config.participants(),
                prizes,
                opts.gw,
                opts.mode,
            );
            store.save_prize_report(&report)?;
            Some(report)
        }
        None => None,
    };

    Ok(RunSummary {
        record,
        standings,
        seeds_captured,
        prizes,
    })
}
