use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};

use h2h_league::config::{LeagueConfig, Manager, PlayoffConfig};
use h2h_league::gameweek::compute_gameweek;
use h2h_league::model::{EntryId, MatchStatus, Mode, Side, Token};
use h2h_league::points::PointsProvider;
use h2h_league::schedule::{Fixture, parse_schedule_csv};
use h2h_league::season::{RunOptions, run_gameweek};
use h2h_league::store::{MemoryStore, ResultStore};

#[derive(Default)]
struct ScriptedPoints {
    finals: HashMap<(EntryId, u32), i32>,
    lives: HashMap<(EntryId, u32), i32>,
    failing: HashSet<EntryId>,
}

impl ScriptedPoints {
    fn set(&mut self, gw: u32, scores: &[(EntryId, i32)]) {
        for (id, pts) in scores {
            self.finals.insert((*id, gw), *pts);
        }
    }
}

impl PointsProvider for ScriptedPoints {
    fn final_points(&self, entry_id: EntryId, gw: u32) -> Result<i32> {
        if self.failing.contains(&entry_id) {
            bail!("request timed out");
        }
        Ok(self.finals.get(&(entry_id, gw)).copied().unwrap_or(0))
    }

    fn live_points(&self, entry_id: EntryId, gw: u32) -> Result<i32> {
        if self.failing.contains(&entry_id) {
            bail!("request timed out");
        }
        Ok(self.lives.get(&(entry_id, gw)).copied().unwrap_or(0))
    }
}

fn league(n: u64, playoffs: PlayoffConfig) -> LeagueConfig {
    LeagueConfig {
        managers: (1..=n)
            .map(|id| Manager {
                entry_id: id,
                name: format!("Manager {id}"),
                team_name: Some(format!("Team {id}")),
            })
            .collect(),
        playoffs,
        prizes: None,
    }
}

fn schedule(rows: &[(u32, &str, &str)]) -> Vec<Fixture> {
    rows.iter()
        .map(|(gw, h, a)| Fixture {
            gw: *gw,
            home: Side::parse(h),
            away: Side::parse(a),
        })
        .collect()
}

#[test]
fn one_failed_fetch_only_touches_its_own_match() {
    let config = league(4, PlayoffConfig::default());
    let fixtures = schedule(&[(5, "1", "2"), (5, "3", "4"), (6, "1", "3")]);
    let mut points = ScriptedPoints::default();
    points.set(5, &[(1, 61), (2, 48), (3, 70), (4, 52)]);
    points.failing.insert(3);

    let mut store = MemoryStore::new();
    let record = compute_gameweek(&mut store, &points, &config, &fixtures, 5, Mode::Final)
        .expect("compute");

    assert_eq!(record.matches.len(), 2);
    let first = &record.matches[0];
    assert_eq!((first.home_points, first.away_points), (61, 48));
    assert_eq!(first.status, MatchStatus::Final);
    assert_eq!(first.home_name, "Team 1");

    let second = &record.matches[1];
    assert_eq!((second.home_points, second.away_points), (0, 0));
    match &second.status {
        MatchStatus::Pending { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected pending, got {other:?}"),
    }

    let stored = store.load_gameweek(5).expect("load").expect("present");
    assert_eq!(stored, record);
}

#[test]
fn unresolved_sides_are_pending_with_zero_points() {
    let config = league(4, PlayoffConfig::default());
    let fixtures = schedule(&[(31, "SEED1", "SEED4"), (31, "2", "TBC")]);
    let points = ScriptedPoints::default();
    let mut store = MemoryStore::new();

    let record = compute_gameweek(&mut store, &points, &config, &fixtures, 31, Mode::Final)
        .expect("compute");
    assert_eq!(record.matches.len(), 2);
    for m in &record.matches {
        assert!(m.status.is_pending());
        assert_eq!((m.home_points, m.away_points), (0, 0));
    }
    assert_eq!(record.matches[0].home, Side::Token(Token::Seed1));
    assert_eq!(record.matches[0].home_name, "SEED1");
    assert_eq!(record.matches[1].away, Side::Label("TBC".to_string()));
}

#[test]
fn final_recompute_replaces_live_record() {
    let config = league(2, PlayoffConfig::default());
    let fixtures = schedule(&[(7, "1", "2")]);
    let mut points = ScriptedPoints::default();
    points.lives.insert((1, 7), 30);
    points.lives.insert((2, 7), 35);
    points.set(7, &[(1, 58), (2, 44)]);
    let mut store = MemoryStore::new();

    let live = compute_gameweek(&mut store, &points, &config, &fixtures, 7, Mode::Live)
        .expect("live");
    assert_eq!(live.matches[0].status, MatchStatus::Live);
    assert_eq!(live.matches[0].away_points, 35);

    compute_gameweek(&mut store, &points, &config, &fixtures, 7, Mode::Final).expect("final");
    let stored = store.load_gameweek(7).expect("load").expect("present");
    assert_eq!(stored.mode, Mode::Final);
    assert_eq!(stored.matches.len(), 1);
    assert_eq!((stored.matches[0].home_points, stored.matches[0].away_points), (58, 44));
}

#[test]
fn playoffs_use_seeds_frozen_at_regular_season_end() {
    let playoffs = PlayoffConfig {
        regular_season_end: 2,
        semifinal_gws: [3, 4],
        shield_gws: [5, 6],
        shield_pairings: None,
    };
    let config = league(6, playoffs);
    let fixtures = parse_schedule_csv(
        "gw,home,away\n\
         1,1,2\n1,3,4\n1,5,6\n\
         2,1,3\n2,2,5\n2,4,6\n\
         3,SEED1,SEED4\n3,SEED2,SEED3\n3,SEED5,SEED6\n\
         4,SEED4,SEED1\n4,SEED3,SEED2\n4,SEED6,SEED5\n\
         5,WINNER_SF1,WINNER_SF2\n5,LOSER_SF1,LOSER_SF2\n",
    )
    .expect("schedule");

    let mut points = ScriptedPoints::default();
    points.set(1, &[(1, 60), (2, 50), (3, 70), (4, 40), (5, 55), (6, 45)]);
    points.set(2, &[(1, 65), (3, 60), (2, 50), (5, 52), (4, 30), (6, 35)]);
    points.set(3, &[(1, 40), (6, 80), (3, 60), (5, 55), (2, 10), (4, 20)]);
    points.set(4, &[(6, 30), (1, 75), (5, 50), (3, 70), (4, 10), (2, 10)]);

    let mut store = MemoryStore::new();
    let run = |gw: u32, store: &mut MemoryStore| {
        run_gameweek(
            store,
            &points,
            &config,
            &fixtures,
            RunOptions {
                gw,
                mode: Mode::Final,
                freeze_seeds: false,
            },
        )
        .expect("run")
    };

    let after_gw1 = run(1, &mut store);
    assert!(after_gw1.seeds_captured.is_none());
    assert!(store.load_seeds().expect("seeds").is_none());

    let after_gw2 = run(2, &mut store);
    let seeds = after_gw2.seeds_captured.expect("captured at boundary");
    assert_eq!(seeds.seeds, vec![1, 3, 5, 6, 2, 4]);
    assert_eq!(seeds.captured_through_gw, 2);

    let gw3 = run(3, &mut store).record;
    let pairs: Vec<(Side, Side)> = gw3
        .matches
        .iter()
        .map(|m| (m.home.clone(), m.away.clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (Side::Entry(1), Side::Entry(6)),
            (Side::Entry(3), Side::Entry(5)),
            (Side::Entry(2), Side::Entry(4)),
        ]
    );

    // The live table now has 6 on top, but the frozen seeds still make 1 SEED1.
    let after_gw3 = run(3, &mut store);
    assert_eq!(after_gw3.standings.teams[0].entry_id, 6);
    assert!(after_gw3.seeds_captured.is_none());

    let gw4 = run(4, &mut store).record;
    assert_eq!(gw4.matches[0].home, Side::Entry(6));
    assert_eq!(gw4.matches[0].away, Side::Entry(1));

    // SF1: 1 on 115 beats 6 on 110. SF2: 3 on 130 beats 5 on 105.
    let gw5 = run(5, &mut store).record;
    assert_eq!(gw5.matches[0].home, Side::Entry(1));
    assert_eq!(gw5.matches[0].away, Side::Entry(3));
    assert_eq!(gw5.matches[1].home, Side::Entry(6));
    assert_eq!(gw5.matches[1].away, Side::Entry(5));
    assert!(gw5.matches.iter().all(|m| m.status == MatchStatus::Final));

    let report = run(5, &mut store).prizes;
    assert!(report.is_none());
}

fn short_season(regular_season_end: u32) -> PlayoffConfig {
    PlayoffConfig {
        regular_season_end,
        semifinal_gws: [regular_season_end + 1, regular_season_end + 2],
        shield_gws: [regular_season_end + 3, regular_season_end + 4],
        shield_pairings: None,
    }
}

fn opts(gw: u32, mode: Mode, freeze_seeds: bool) -> RunOptions {
    RunOptions {
        gw,
        mode,
        freeze_seeds,
    }
}

#[test]
fn seeds_taken_from_live_points_are_retaken_once_final() {
    let config = league(2, short_season(1));
    let fixtures = schedule(&[(1, "1", "2")]);
    let mut points = ScriptedPoints::default();
    points.lives.insert((1, 1), 10);
    points.lives.insert((2, 1), 50);
    points.set(1, &[(1, 80), (2, 50)]);
    let mut store = MemoryStore::new();

    let live = run_gameweek(&mut store, &points, &config, &fixtures, opts(1, Mode::Live, false))
        .expect("live run");
    let provisional = live.seeds_captured.expect("captured at boundary");
    assert_eq!(provisional.seeds, vec![2, 1]);
    assert!(provisional.provisional);

    let fin = run_gameweek(&mut store, &points, &config, &fixtures, opts(1, Mode::Final, false))
        .expect("final run");
    assert_eq!(fin.standings.teams[0].entry_id, 1);
    let seeds = store.load_seeds().expect("seeds").expect("present");
    assert_eq!(seeds.seeds, vec![1, 2]);
    assert!(!seeds.provisional);
    assert_eq!(fin.seeds_captured, Some(seeds));

    let later = run_gameweek(&mut store, &points, &config, &fixtures, opts(2, Mode::Final, false))
        .expect("later run");
    assert!(later.seeds_captured.is_none());
}

#[test]
fn freeze_seeds_overwrites_the_boundary_snapshot() {
    let config = league(4, short_season(1));
    let fixtures = schedule(&[(1, "1", "2"), (1, "3", "4"), (2, "1", "3"), (2, "2", "4")]);
    let mut points = ScriptedPoints::default();
    points.set(1, &[(1, 60), (2, 50), (3, 70), (4, 40)]);
    points.set(2, &[(1, 90), (3, 20), (2, 80), (4, 10)]);
    let mut store = MemoryStore::new();

    run_gameweek(&mut store, &points, &config, &fixtures, opts(1, Mode::Final, false))
        .expect("gw1");
    let boundary = store.load_seeds().expect("seeds").expect("present");
    assert_eq!(boundary.seeds, vec![3, 1, 2, 4]);
    assert_eq!(boundary.captured_through_gw, 1);

    let gw2 = run_gameweek(&mut store, &points, &config, &fixtures, opts(2, Mode::Final, false))
        .expect("gw2");
    assert!(gw2.seeds_captured.is_none());
    assert_eq!(store.load_seeds().expect("seeds"), Some(boundary.clone()));

    let forced = run_gameweek(&mut store, &points, &config, &fixtures, opts(2, Mode::Final, true))
        .expect("forced");
    let table: Vec<EntryId> = forced.standings.teams.iter().map(|r| r.entry_id).collect();
    assert_eq!(table, vec![1, 2, 3, 4]);

    let seeds = store.load_seeds().expect("seeds").expect("present");
    assert_eq!(seeds.seeds, table);
    assert_eq!(seeds.captured_through_gw, 2);
    assert_ne!(seeds, boundary);
}
