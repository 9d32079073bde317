use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use crate::config::PlayoffConfig;
use crate::model::{EntryId, MatchResult, SeedSnapshot, Side, StandingsSnapshot, Token};
use crate::store::ResultStore;

/// Where `SEEDk` tokens are looked up.
#[derive(Debug, Clone, Copy)]
pub enum SeedSource<'a> {
    /// Seeds captured once at the end of the regular season.
    Frozen(&'a SeedSnapshot),
    /// The top of whatever the standings table currently holds.
    Live(&'a StandingsSnapshot),
}

impl SeedSource<'_> {
    pub fn seed(&self, rank: usize) -> Option<EntryId> {
        match self {
            SeedSource::Frozen(snapshot) => snapshot.seed(rank),
            SeedSource::Live(standings) => standings.seed(rank),
        }
    }
}

/// Result of a two-legged tie. `first` is the side that wins on equal aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieOutcome {
    pub winner: EntryId,
    pub loser: EntryId,
    pub first_aggregate: i64,
    pub second_aggregate: i64,
}

/// Aggregates the legs between `first` and `second`. Pending legs do not
/// count, so a stored 0-0 from a failed fetch is not treated as a played
/// leg; fewer than two counted legs leaves the tie undecided.
pub fn aggregate_tie(first: EntryId, second: EntryId, legs: &[&MatchResult]) -> Option<TieOutcome> {
    let counted: Vec<&&MatchResult> = legs
        .iter()
        .filter(|m| m.is_between(first, second) && !m.status.is_pending())
        .collect();
    if counted.len() < 2 {
        return None;
    }
    let mut first_aggregate = 0i64;
    let mut second_aggregate = 0i64;
    for leg in counted {
        first_aggregate += i64::from(leg.points_of(first).unwrap_or(0));
        second_aggregate += i64::from(leg.points_of(second).unwrap_or(0));
    }
    let (winner, loser) = if first_aggregate >= second_aggregate {
        (first, second)
    } else {
        (second, first)
    };
    Some(TieOutcome {
        winner,
        loser,
        first_aggregate,
        second_aggregate,
    })
}

/// Distinct concrete pairings in the order they first appear across
/// `records`. Each pair is listed lower entry id first, which is the side
/// that wins a level aggregate.
pub fn discover_pairings(records: &[MatchResult]) -> Vec<(EntryId, EntryId)> {
    let mut out: Vec<(EntryId, EntryId)> = Vec::new();
    for m in records {
        let Some((home, away)) = m.concrete_pair() else {
            continue;
        };
        if home == away {
            continue;
        }
        let pair = (home.min(away), home.max(away));
        if !out.contains(&pair) {
            out.push(pair);
        }
    }
    out
}

/// Turns bracket tokens into entries using the persisted results. Resolution
/// only reads the store, so it is a pure function of the store contents and
/// the supplied seed source.
pub struct Resolver<'a, S: ResultStore + ?Sized> {
    store: &'a S,
    playoffs: &'a PlayoffConfig,
}

impl<'a, S: ResultStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S, playoffs: &'a PlayoffConfig) -> Self {
        Self { store, playoffs }
    }

    /// Returns the concrete entry for `side` when it can be determined, or
    /// the side unchanged otherwise. Only store read failures are errors.
    pub fn resolve(&self, side: &Side, seeds: &SeedSource<'_>) -> Result<Side> {
        let resolved = match side {
            Side::Token(token @ (Token::WinnerShieldSf1 | Token::WinnerShieldSf2)) => {
                let slot = if *token == Token::WinnerShieldSf1 { 0 } else { 1 };
                self.shield_winner(slot, seeds)?
                    .map(Side::Entry)
                    .unwrap_or_else(|| side.clone())
            }
            _ => self.resolve_bracket(side, seeds)?,
        };
        if let Side::Token(token) = side {
            debug!(token = %token, resolved = %resolved, "token resolution");
        }
        Ok(resolved)
    }

    /// Everything except the shield winners, which may themselves be built
    /// from these positions.
    fn resolve_bracket(&self, side: &Side, seeds: &SeedSource<'_>) -> Result<Side> {
        let token = match side {
            Side::Entry(_) | Side::Label(_) => return Ok(side.clone()),
            Side::Token(token) => *token,
        };

        let entry = match token {
            Token::Seed1
            | Token::Seed2
            | Token::Seed3
            | Token::Seed4
            | Token::Seed5
            | Token::Seed6 => token.seed_rank().and_then(|rank| seeds.seed(rank)),
            Token::WinnerSf1 => self.semifinal(1, 4, seeds)?.map(|t| t.winner),
            Token::LoserSf1 => self.semifinal(1, 4, seeds)?.map(|t| t.loser),
            Token::WinnerSf2 => self.semifinal(2, 3, seeds)?.map(|t| t.winner),
            Token::LoserSf2 => self.semifinal(2, 3, seeds)?.map(|t| t.loser),
            Token::WinnerShieldSf1 | Token::WinnerShieldSf2 => None,
        };
        Ok(entry.map(Side::Entry).unwrap_or_else(|| side.clone()))
    }

    fn semifinal(
        &self,
        first_seed: usize,
        second_seed: usize,
        seeds: &SeedSource<'_>,
    ) -> Result<Option<TieOutcome>> {
        let (Some(first), Some(second)) = (seeds.seed(first_seed), seeds.seed(second_seed)) else {
            return Ok(None);
        };
        let legs = self.load_legs(self.playoffs.semifinal_gws)?;
        let refs: Vec<&MatchResult> = legs.iter().collect();
        Ok(aggregate_tie(first, second, &refs))
    }

    fn shield_winner(&self, slot: usize, seeds: &SeedSource<'_>) -> Result<Option<EntryId>> {
        let legs = self.load_legs(self.playoffs.shield_gws)?;

        let pair = match self.playoffs.shield_pairings.as_ref() {
            Some(pairings) => {
                let Some([home, away]) = pairings.get(slot) else {
                    return Ok(None);
                };
                let home = self.resolve_bracket(home, seeds)?.entry_id();
                let away = self.resolve_bracket(away, seeds)?.entry_id();
                match (home, away) {
                    (Some(h), Some(a)) if h != a => Some((h, a)),
                    _ => None,
                }
            }
            None => {
                let discovered = discover_pairings(&legs);
                if discovered.len() < 2 {
                    return Ok(None);
                }
                discovered.get(slot).copied()
            }
        };
        let Some((first, second)) = pair else {
            return Ok(None);
        };

        let refs: Vec<&MatchResult> = legs.iter().collect();
        Ok(aggregate_tie(first, second, &refs).map(|t| t.winner))
    }

    /// Matches of the two designated gameweeks, in gameweek then match order.
    fn load_legs(&self, gws: [u32; 2]) -> Result<Vec<MatchResult>> {
        let mut out = Vec::new();
        for gw in gws {
            if let Some(record) = self.store.load_gameweek(gw)? {
                out.extend(record.matches);
            }
        }
        Ok(out)
    }
}

/// Resolves every token in the closed vocabulary at once, for reporting.
pub fn resolve_all_tokens<S: ResultStore + ?Sized>(
    resolver: &Resolver<'_, S>,
    seeds: &SeedSource<'_>,
) -> Result<HashMap<Token, Option<EntryId>>> {
    let mut out = HashMap::new();
    for token in Token::ALL {
        let side = resolver.resolve(&Side::Token(token), seeds)?;
        out.insert(token, side.entry_id());
    }
    Ok(out)
}
