use std::collections::HashMap;

use anyhow::Result;
use tracing::warn;

use crate::model::{EntryId, GameweekRecord, Participant, StandingsRow, StandingsSnapshot};
use crate::store::ResultStore;

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

/// Folds `records` (in the order given) into a ranked table.
///
/// Only matches with two concrete sides count. Rows are ranked by league
/// points, then point difference, then points scored; rows equal on all three
/// keep participant order.
pub fn fold_records(
    participants: &[Participant],
    records: &[GameweekRecord],
    through_gw: u32,
) -> StandingsSnapshot {
    let mut rows: Vec<StandingsRow> = participants.iter().map(StandingsRow::new).collect();
    let index: HashMap<EntryId, usize> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (row.entry_id, idx))
        .collect();

    for record in records.iter().filter(|r| r.gw >= 1 && r.gw <= through_gw) {
        for m in &record.matches {
            let Some((home_id, away_id)) = m.concrete_pair() else {
                continue;
            };
            let (Some(&h), Some(&a)) = (index.get(&home_id), index.get(&away_id)) else {
                warn!(
                    gw = record.gw,
                    home = home_id,
                    away = away_id,
                    "match references an unknown entry; skipped"
                );
                continue;
            };
            let hp = i64::from(m.home_points);
            let ap = i64::from(m.away_points);

            apply_score(&mut rows[h], hp, ap);
            apply_score(&mut rows[a], ap, hp);
        }
    }

    rows.sort_by(|x, y| y.rank_key().cmp(&x.rank_key()));
    StandingsSnapshot {
        through_gw,
        teams: rows,
    }
}

fn apply_score(row: &mut StandingsRow, scored: i64, conceded: i64) {
    row.points_for += scored;
    row.points_against += conceded;
    row.played += 1;
    if scored > conceded {
        row.wins += 1;
        row.league_points += WIN_POINTS;
    } else if scored < conceded {
        row.losses += 1;
    } else {
        row.draws += 1;
        row.league_points += DRAW_POINTS;
    }
}

/// Reads gameweeks 1..=`through_gw` from the store and folds them.
pub fn fold_store<S: ResultStore + ?Sized>(
    store: &S,
    participants: &[Participant],
    through_gw: u32,
) -> Result<StandingsSnapshot> {
    let mut records = Vec::new();
    for gw in 1..=through_gw {
        if let Some(record) = store.load_gameweek(gw)? {
            records.push(record);
        }
    }
    Ok(fold_records(participants, &records, through_gw))
}
