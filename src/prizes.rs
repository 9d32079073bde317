use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{BlockConfig, PrizeConfig};
use crate::model::{EntryId, Mode, Participant};
use crate::points::PointsProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tiebreak {
    None,
    HighestSingleGwScoreInBlock,
    CoinFlipRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockLeader {
    pub entry_id: EntryId,
    pub name: String,
    pub total_points: i64,
    pub best_single_gw: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeBlock {
    pub index: usize,
    pub name: String,
    pub gw_start: u32,
    pub gw_end: u32,
    pub status: BlockStatus,
    pub leaders: Vec<BlockLeader>,
    pub winners: Vec<EntryId>,
    pub tiebreak_used: Tiebreak,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyWinner {
    pub entry_id: EntryId,
    pub name: String,
    pub points: i32,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPayout {
    pub gw: u32,
    pub pot_per_gw: f64,
    pub winners: Vec<WeeklyWinner>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTotal {
    pub entry_id: EntryId,
    pub name: String,
    pub weekly_winnings: f64,
    pub kits_won: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinningsLedger {
    pub currency: String,
    pub weekly: Vec<WeeklyPayout>,
    pub totals: Vec<LedgerTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeReport {
    pub processed_through_gw: u32,
    pub ledger: WinningsLedger,
    pub blocks: Vec<PrizeBlock>,
}

/// Every participant's score for gameweeks 1..=`through_gw`, fetched
/// straight from the provider. Rows are aligned with `participants`.
#[derive(Debug, Clone)]
pub struct PointsTable {
    pub participants: Vec<Participant>,
    pub through_gw: u32,
    scores: BTreeMap<u32, Vec<i32>>,
    failures: BTreeMap<u32, Vec<String>>,
}

impl PointsTable {
    /// Gameweeks before `through_gw` use final points; `through_gw` itself
    /// uses `mode`. A failed fetch scores 0 and is noted against its gameweek.
    pub fn collect<P: PointsProvider + ?Sized>(
        provider: &P,
        participants: &[Participant],
        through_gw: u32,
        mode: Mode,
    ) -> Self {
        let mut scores = BTreeMap::new();
        let mut failures: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for gw in 1..=through_gw {
            let gw_mode = if gw == through_gw { mode } else { Mode::Final };
            let mut row = Vec::with_capacity(participants.len());
            for p in participants {
                match provider.points(p.entry_id, gw, gw_mode) {
                    Ok(points) => row.push(points),
                    Err(err) => {
                        warn!(gw, entry = p.entry_id, error = %err, "prize points fetch failed");
                        failures
                            .entry(gw)
                            .or_default()
                            .push(format!("{}: points unavailable ({err:#})", p.name));
                        row.push(0);
                    }
                }
            }
            scores.insert(gw, row);
        }
        Self {
            participants: participants.to_vec(),
            through_gw,
            scores,
            failures,
        }
    }

    /// Builds a table from known scores; missing gameweeks score 0.
    pub fn from_scores(participants: &[Participant], rows: Vec<(u32, Vec<i32>)>) -> Self {
        let through_gw = rows.iter().map(|(gw, _)| *gw).max().unwrap_or(0);
        let mut scores = BTreeMap::new();
        for gw in 1..=through_gw {
            scores.insert(gw, vec![0; participants.len()]);
        }
        for (gw, mut row) in rows {
            row.resize(participants.len(), 0);
            scores.insert(gw, row);
        }
        Self {
            participants: participants.to_vec(),
            through_gw,
            scores,
            failures: BTreeMap::new(),
        }
    }

    pub fn gameweek(&self, gw: u32) -> Option<&[i32]> {
        self.scores.get(&gw).map(Vec::as_slice)
    }

    pub fn failures(&self, gw: u32) -> &[String] {
        self.failures.get(&gw).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Top scorer(s) of each gameweek split `pot` evenly.
pub fn weekly_payouts(table: &PointsTable, pot: f64) -> Vec<WeeklyPayout> {
    let mut out = Vec::new();
    for gw in 1..=table.through_gw {
        let Some(row) = table.gameweek(gw) else {
            continue;
        };
        let Some(&best) = row.iter().max() else {
            continue;
        };
        let top: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, pts)| **pts == best)
            .map(|(idx, _)| idx)
            .collect();
        let amount = round_cents(pot / top.len() as f64);
        let winners = top
            .into_iter()
            .map(|idx| {
                let p = &table.participants[idx];
                WeeklyWinner {
                    entry_id: p.entry_id,
                    name: p.name.clone(),
                    points: best,
                    amount,
                }
            })
            .collect();
        out.push(WeeklyPayout {
            gw,
            pot_per_gw: pot,
            winners,
            notes: table.failures(gw).to_vec(),
        });
    }
    out
}

/// Evaluates one mystery-kit block against the gameweeks processed so far.
pub fn evaluate_block(
    table: &PointsTable,
    index: usize,
    block: &BlockConfig,
    through_gw: u32,
) -> PrizeBlock {
    let complete = through_gw >= block.gw_end;
    let mut out = PrizeBlock {
        index,
        name: block.name.clone(),
        gw_start: block.gw_start,
        gw_end: block.gw_end,
        status: if complete {
            BlockStatus::Complete
        } else {
            BlockStatus::InProgress
        },
        leaders: Vec::new(),
        winners: Vec::new(),
        tiebreak_used: Tiebreak::None,
        note: None,
    };

    let last = block.gw_end.min(through_gw);
    if block.gw_start > last {
        out.note = Some(format!("starts in GW{}", block.gw_start));
        return out;
    }

    let n = table.participants.len();
    let mut totals = vec![0i64; n];
    let mut best = vec![i32::MIN; n];
    for gw in block.gw_start..=last {
        let Some(row) = table.gameweek(gw) else {
            continue;
        };
        for (idx, pts) in row.iter().enumerate().take(n) {
            totals[idx] += i64::from(*pts);
            best[idx] = best[idx].max(*pts);
        }
    }
    let Some(&top_total) = totals.iter().max() else {
        return out;
    };

    out.leaders = (0..n)
        .filter(|&idx| totals[idx] == top_total)
        .map(|idx| BlockLeader {
            entry_id: table.participants[idx].entry_id,
            name: table.participants[idx].name.clone(),
            total_points: totals[idx],
            best_single_gw: if best[idx] == i32::MIN { 0 } else { best[idx] },
        })
        .collect();

    if !complete {
        out.note = Some(format!("in progress through GW{last}"));
        return out;
    }

    if out.leaders.len() == 1 {
        out.winners = vec![out.leaders[0].entry_id];
        return out;
    }

    let top_single = out
        .leaders
        .iter()
        .map(|l| l.best_single_gw)
        .max()
        .unwrap_or(0);
    out.winners = out
        .leaders
        .iter()
        .filter(|l| l.best_single_gw == top_single)
        .map(|l| l.entry_id)
        .collect();

    if out.winners.len() == 1 {
        out.tiebreak_used = Tiebreak::HighestSingleGwScoreInBlock;
        out.note = Some(format!(
            "tied on {top_total} total; decided by highest single gameweek ({top_single})"
        ));
    } else {
        out.tiebreak_used = Tiebreak::CoinFlipRequired;
        out.note = Some(format!(
            "{} managers tied on {top_total} total and {top_single} best gameweek; \
             settle by coin flip",
            out.winners.len()
        ));
    }
    out
}

/// Per-participant weekly winnings and decided kit wins, best earners first.
pub fn build_ledger(
    currency: &str,
    participants: &[Participant],
    weekly: Vec<WeeklyPayout>,
    blocks: &[PrizeBlock],
) -> WinningsLedger {
    let mut winnings: HashMap<EntryId, f64> = HashMap::new();
    for payout in &weekly {
        for w in &payout.winners {
            *winnings.entry(w.entry_id).or_default() += w.amount;
        }
    }
    let mut kits: HashMap<EntryId, u32> = HashMap::new();
    for block in blocks {
        if block.status != BlockStatus::Complete
            || block.tiebreak_used == Tiebreak::CoinFlipRequired
        {
            continue;
        }
        for id in &block.winners {
            *kits.entry(*id).or_default() += 1;
        }
    }

    let mut totals: Vec<LedgerTotal> = participants
        .iter()
        .map(|p| LedgerTotal {
            entry_id: p.entry_id,
            name: p.name.clone(),
            weekly_winnings: round_cents(winnings.get(&p.entry_id).copied().unwrap_or(0.0)),
            kits_won: kits.get(&p.entry_id).copied().unwrap_or(0),
        })
        .collect();
    totals.sort_by(|a, b| {
        b.weekly_winnings
            .total_cmp(&a.weekly_winnings)
            .then(b.kits_won.cmp(&a.kits_won))
    });

    WinningsLedger {
        currency: currency.to_string(),
        weekly,
        totals,
    }
}

pub fn prize_report(table: &PointsTable, prizes: &PrizeConfig) -> PrizeReport {
    let through_gw = table.through_gw;
    let weekly = weekly_payouts(table, prizes.weekly_pot);
    let blocks: Vec<PrizeBlock> = prizes
        .mystery_kit_blocks
        .iter()
        .enumerate()
        .map(|(idx, block)| evaluate_block(table, idx + 1, block, through_gw))
        .collect();
    let ledger = build_ledger(&prizes.currency, &table.participants, weekly, &blocks);
    PrizeReport {
        processed_through_gw: through_gw,
        ledger,
        blocks,
    }
}

/// Recomputes the full prize report from gameweek 1.
pub fn compute_prizes<P: PointsProvider + ?Sized>(
    provider: &P,
    participants: &[Participant],
    prizes: &PrizeConfig,
    through_gw: u32,
    mode: Mode,
) -> PrizeReport {
    let table = PointsTable::collect(provider, participants, through_gw, mode);
    let report = prize_report(&table, prizes);
    let coin_flips = report
        .blocks
        .iter()
        .filter(|b| b.tiebreak_used == Tiebreak::CoinFlipRequired)
        .count();
    info!(
        through_gw,
        weeks = report.ledger.weekly.len(),
        blocks = report.blocks.len(),
        coin_flips,
        "prizes computed"
    );
    report
}
