use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::LeagueConfig;
use crate::model::{
    GameweekRecord, MatchResult, MatchStatus, Mode, SeedSnapshot, Side, StandingsSnapshot,
};
use crate::points::PointsProvider;
use crate::resolver::{Resolver, SeedSource};
use crate::schedule::{Fixture, fixtures_for_gw, name_map, side_label};
use crate::store::ResultStore;

/// Seeds as the store currently holds them: the frozen snapshot when one has
/// been captured, otherwise the live standings table.
enum StoredSeeds {
    Frozen(SeedSnapshot),
    Live(StandingsSnapshot),
}

impl StoredSeeds {
    fn read<S: ResultStore + ?Sized>(store: &S) -> Result<Self> {
        if let Some(seeds) = store.load_seeds()? {
            return Ok(StoredSeeds::Frozen(seeds));
        }
        Ok(StoredSeeds::Live(store.load_standings()?.unwrap_or_default()))
    }

    fn source(&self) -> SeedSource<'_> {
        match self {
            StoredSeeds::Frozen(seeds) => SeedSource::Frozen(seeds),
            StoredSeeds::Live(standings) => SeedSource::Live(standings),
        }
    }
}

/// Computes every scheduled match of `gw` and persists the record, replacing
/// any earlier computation of that gameweek.
///
/// Unresolved sides and failed point fetches never abort the gameweek; the
/// affected match is stored with zero points and a pending reason.
pub fn compute_gameweek<S, P>(
    store: &mut S,
    provider: &P,
    config: &LeagueConfig,
    schedule: &[Fixture],
    gw: u32,
    mode: Mode,
) -> Result<GameweekRecord>
where
    S: ResultStore + ?Sized,
    P: PointsProvider + ?Sized,
{
    let names = name_map(&config.participants());
    let mut matches = Vec::new();

    for fixture in fixtures_for_gw(schedule, gw) {
        // Seeds are re-read for every match.
        let seeds = StoredSeeds::read(&*store)?;
        let resolver = Resolver::new(&*store, &config.playoffs);
        let home = resolver.resolve(&fixture.home, &seeds.source())?;
        let away = resolver.resolve(&fixture.away, &seeds.source())?;

        let mut result = MatchResult {
            gw,
            home_name: side_label(&home, &names),
            away_name: side_label(&away, &names),
            home: home.clone(),
            away: away.clone(),
            home_points: 0,
            away_points: 0,
            status: MatchStatus::from_mode(mode),
        };

        let (Side::Entry(home_id), Side::Entry(away_id)) = (&home, &away) else {
            result.status = MatchStatus::pending(format!(
                "seed/winner not resolved yet ({} vs {})",
                fixture.home, fixture.away
            ));
            matches.push(result);
            continue;
        };

        let fetched = provider
            .points(*home_id, gw, mode)
            .and_then(|hp| provider.points(*away_id, gw, mode).map(|ap| (hp, ap)));
        match fetched {
            Ok((hp, ap)) => {
                result.home_points = hp;
                result.away_points = ap;
            }
            Err(err) => {
                warn!(gw, home = home_id, away = away_id, error = %err, "points fetch failed");
                result.status = MatchStatus::pending(format!("{err:#}"));
            }
        }
        matches.push(result);
    }

    let record = GameweekRecord {
        gw,
        mode,
        computed_at: Utc::now().to_rfc3339(),
        matches,
    };
    store.save_gameweek(&record)?;

    let pending = record.matches.iter().filter(|m| m.status.is_pending()).count();
    info!(
        gw,
        mode = %mode,
        matches = record.matches.len(),
        pending,
        "gameweek computed"
    );
    Ok(record)
}
