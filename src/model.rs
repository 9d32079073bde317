use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// FPL entry id of a league participant.
pub type EntryId = u64;

pub const SEED_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub entry_id: EntryId,
    pub name: String,
}

/// Symbolic bracket position. The set is closed: anything else in a schedule
/// is either a concrete entry id or an opaque label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    #[serde(rename = "SEED1")]
    Seed1,
    #[serde(rename = "SEED2")]
    Seed2,
    #[serde(rename = "SEED3")]
    Seed3,
    #[serde(rename = "SEED4")]
    Seed4,
    #[serde(rename = "SEED5")]
    Seed5,
    #[serde(rename = "SEED6")]
    Seed6,
    #[serde(rename = "WINNER_SF1")]
    WinnerSf1,
    #[serde(rename = "LOSER_SF1")]
    LoserSf1,
    #[serde(rename = "WINNER_SF2")]
    WinnerSf2,
    #[serde(rename = "LOSER_SF2")]
    LoserSf2,
    #[serde(rename = "WINNER_SHIELD_SF1")]
    WinnerShieldSf1,
    #[serde(rename = "WINNER_SHIELD_SF2")]
    WinnerShieldSf2,
}

impl Token {
    pub const ALL: [Token; 12] = [
        Token::Seed1,
        Token::Seed2,
        Token::Seed3,
        Token::Seed4,
        Token::Seed5,
        Token::Seed6,
        Token::WinnerSf1,
        Token::LoserSf1,
        Token::WinnerSf2,
        Token::LoserSf2,
        Token::WinnerShieldSf1,
        Token::WinnerShieldSf2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Token::Seed1 => "SEED1",
            Token::Seed2 => "SEED2",
            Token::Seed3 => "SEED3",
            Token::Seed4 => "SEED4",
            Token::Seed5 => "SEED5",
            Token::Seed6 => "SEED6",
            Token::WinnerSf1 => "WINNER_SF1",
            Token::LoserSf1 => "LOSER_SF1",
            Token::WinnerSf2 => "WINNER_SF2",
            Token::LoserSf2 => "LOSER_SF2",
            Token::WinnerShieldSf1 => "WINNER_SHIELD_SF1",
            Token::WinnerShieldSf2 => "WINNER_SHIELD_SF2",
        }
    }

    /// 1-based seed rank for `SEEDk` tokens.
    pub fn seed_rank(self) -> Option<usize> {
        match self {
            Token::Seed1 => Some(1),
            Token::Seed2 => Some(2),
            Token::Seed3 => Some(3),
            Token::Seed4 => Some(4),
            Token::Seed5 => Some(5),
            Token::Seed6 => Some(6),
            _ => None,
        }
    }

    pub fn seed(rank: usize) -> Option<Token> {
        Token::ALL
            .iter()
            .copied()
            .find(|t| t.seed_rank() == Some(rank))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Token {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Token::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| anyhow!("not a bracket token: {s}"))
    }
}

/// One slot of a fixture: a concrete entry, a bracket token, or an opaque
/// placeholder label carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Side {
    Entry(EntryId),
    Token(Token),
    Label(String),
}

impl Side {
    pub fn parse(raw: &str) -> Side {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<EntryId>() {
            return Side::Entry(id);
        }
        match raw.parse::<Token>() {
            Ok(token) => Side::Token(token),
            Err(_) => Side::Label(raw.to_string()),
        }
    }

    pub fn entry_id(&self) -> Option<EntryId> {
        match self {
            Side::Entry(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, Side::Entry(_))
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Entry(id) => write!(f, "{id}"),
            Side::Token(token) => f.write_str(token.as_str()),
            Side::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Final,
    Live,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "final" => Ok(Mode::Final),
            "live" => Ok(Mode::Live),
            other => Err(anyhow!("unknown mode {other:?} (expected final or live)")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Final => f.write_str("final"),
            Mode::Live => f.write_str("live"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MatchStatus {
    Final,
    Live,
    Pending { reason: String },
}

impl MatchStatus {
    pub fn from_mode(mode: Mode) -> Self {
        match mode {
            Mode::Final => MatchStatus::Final,
            Mode::Live => MatchStatus::Live,
        }
    }

    pub fn pending(reason: impl Into<String>) -> Self {
        MatchStatus::Pending {
            reason: reason.into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MatchStatus::Pending { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub gw: u32,
    pub home: Side,
    pub home_name: String,
    pub home_points: i32,
    pub away: Side,
    pub away_name: String,
    pub away_points: i32,
    pub status: MatchStatus,
}

impl MatchResult {
    pub fn concrete_pair(&self) -> Option<(EntryId, EntryId)> {
        Some((self.home.entry_id()?, self.away.entry_id()?))
    }

    /// True when this match is one leg between `a` and `b`, in either role.
    pub fn is_between(&self, a: EntryId, b: EntryId) -> bool {
        match self.concrete_pair() {
            Some((h, w)) => (h == a && w == b) || (h == b && w == a),
            None => false,
        }
    }

    pub fn points_of(&self, entry_id: EntryId) -> Option<i32> {
        if self.home.entry_id() == Some(entry_id) {
            Some(self.home_points)
        } else if self.away.entry_id() == Some(entry_id) {
            Some(self.away_points)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameweekRecord {
    pub gw: u32,
    pub mode: Mode,
    #[serde(default)]
    pub computed_at: String,
    pub matches: Vec<MatchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub entry_id: EntryId,
    pub name: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub points_for: i64,
    pub points_against: i64,
    pub league_points: u32,
}

impl StandingsRow {
    pub fn new(participant: &Participant) -> Self {
        Self {
            entry_id: participant.entry_id,
            name: participant.name.clone(),
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            points_for: 0,
            points_against: 0,
            league_points: 0,
        }
    }

    pub fn point_difference(&self) -> i64 {
        self.points_for - self.points_against
    }

    /// Ranking key, compared descending.
    pub fn rank_key(&self) -> (u32, i64, i64) {
        (self.league_points, self.point_difference(), self.points_for)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StandingsSnapshot {
    pub through_gw: u32,
    pub teams: Vec<StandingsRow>,
}

impl StandingsSnapshot {
    /// Entry id holding seed `rank` (1-based), if the table is long enough.
    pub fn seed(&self, rank: usize) -> Option<EntryId> {
        if rank == 0 || rank > SEED_COUNT {
            return None;
        }
        self.teams.get(rank - 1).map(|row| row.entry_id)
    }
}

/// Seeds captured once at the end of the regular season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSnapshot {
    pub captured_through_gw: u32,
    pub seeds: Vec<EntryId>,
    /// Folded from at least one live gameweek; replaced once those are final.
    #[serde(default)]
    pub provisional: bool,
}

impl SeedSnapshot {
    pub fn from_standings(standings: &StandingsSnapshot) -> Self {
        Self {
            captured_through_gw: standings.through_gw,
            seeds: standings
                .teams
                .iter()
                .take(SEED_COUNT)
                .map(|row| row.entry_id)
                .collect(),
            provisional: false,
        }
    }

    pub fn seed(&self, rank: usize) -> Option<EntryId> {
        if rank == 0 || rank > SEED_COUNT {
            return None;
        }
        self.seeds.get(rank - 1).copied()
    }
}
