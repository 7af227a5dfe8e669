use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest score a single game can legally carry.
pub const MAX_GAME_SCORE: u32 = 300;

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A known participant tracked across sessions.
///
/// `scores` holds one slot per game played to date. An absent game is
/// represented by `None`, never omitted, so that position `i` always means
/// "game `i` of the league".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Opaque, stable identifier assigned by the store.
    pub id: String,
    /// Canonical, title-cased display name.
    pub name: String,
    /// Alternate names, normalized the same way as `name`.
    #[serde(default)]
    pub nicknames: BTreeSet<String>,
    #[serde(default)]
    pub scores: Vec<Option<u32>>,
    /// Derived from `scores`; recomputed after every write.
    #[serde(default)]
    pub average: f64,
}

impl RosterEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nicknames: BTreeSet::new(),
            scores: Vec::new(),
            average: 0.0,
        }
    }

    pub fn with_nicknames<I, S>(mut self, nicknames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nicknames = nicknames.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scores(mut self, scores: Vec<Option<u32>>) -> Self {
        self.scores = scores;
        self
    }

    /// Score recorded at `index`, or `None` when the slot is absent or does
    /// not exist yet.
    pub fn slot(&self, index: usize) -> Option<u32> {
        self.scores.get(index).copied().flatten()
    }

    /// Where this participant stands in the session described by `session`.
    pub fn state_in(&self, session: SessionLength) -> ParticipantState {
        let first = self.slot(session.first_game_index());
        let second = self.slot(session.second_game_index());
        match (first, second) {
            (Some(_), Some(_)) => ParticipantState::Complete,
            (Some(_), None) => ParticipantState::AwaitingSecond,
            (None, _) => ParticipantState::Idle,
        }
    }
}

/// Per-participant position inside the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParticipantState {
    /// Nothing recorded for today yet.
    Idle,
    /// First game recorded, second pending. Member of the Active Set.
    AwaitingSecond,
    /// Both games of today recorded.
    Complete,
}

impl ParticipantState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantState::Idle => "IDLE",
            ParticipantState::AwaitingSecond => "AWAITING_SECOND",
            ParticipantState::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session length
// ---------------------------------------------------------------------------

/// Number of score slots every roster entry carries: two per completed
/// session plus the two slots of the session in progress.
///
/// Always even and at least 2, so both game indices of "today" exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SessionLength(u32);

impl SessionLength {
    pub const GAMES_PER_SESSION: u32 = 2;

    pub fn new(len: u32) -> Result<Self, SessionLengthError> {
        if len < Self::GAMES_PER_SESSION {
            return Err(SessionLengthError::TooShort(len));
        }
        if len % Self::GAMES_PER_SESSION != 0 {
            return Err(SessionLengthError::Odd(len));
        }
        Ok(Self(len))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Number of slots as a `usize`, for sizing score vectors.
    pub fn slots(&self) -> usize {
        self.0 as usize
    }

    pub fn first_game_index(&self) -> usize {
        self.slots() - 2
    }

    pub fn second_game_index(&self) -> usize {
        self.slots() - 1
    }

    /// Length after the current session completes.
    pub fn next(&self) -> Result<Self, SessionLengthError> {
        self.0
            .checked_add(Self::GAMES_PER_SESSION)
            .map(Self)
            .ok_or(SessionLengthError::Overflow(self.0))
    }
}

impl TryFrom<u32> for SessionLength {
    type Error = SessionLengthError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionLength> for u32 {
    fn from(value: SessionLength) -> Self {
        value.0
    }
}

impl fmt::Display for SessionLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionLengthError {
    TooShort(u32),
    Odd(u32),
    Overflow(u32),
}

impl fmt::Display for SessionLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionLengthError::TooShort(n) => {
                write!(f, "session length {n} is below the minimum of 2")
            }
            SessionLengthError::Odd(n) => {
                write!(f, "session length {n} is odd; sessions are two games each")
            }
            SessionLengthError::Overflow(n) => {
                write!(f, "session length {n} cannot be advanced further")
            }
        }
    }
}

impl std::error::Error for SessionLengthError {}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// One participant row from a single scoreboard snapshot.
///
/// Raw tokens are kept verbatim; interpretation happens in
/// [`Observation::usable_scores`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub reported_name: String,
    pub reported_team_label: String,
    pub reported_scores: Vec<String>,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    pub fn new<I, S>(
        reported_name: impl Into<String>,
        reported_team_label: impl Into<String>,
        reported_scores: I,
        observed_at: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reported_name: reported_name.into(),
            reported_team_label: reported_team_label.into(),
            reported_scores: reported_scores.into_iter().map(Into::into).collect(),
            observed_at,
        }
    }

    /// Completed game scores in reported order.
    ///
    /// Stops at the first token that is not a finished game (blank, frame
    /// marker, out of range): later tokens cannot be positioned reliably once
    /// one is missing.
    pub fn usable_scores(&self) -> Vec<u32> {
        self.reported_scores
            .iter()
            .map_while(|t| parse_score_token(t))
            .collect()
    }
}

/// Parse one raw score token. `None` for anything that is not a finished,
/// in-range game score.
pub fn parse_score_token(token: &str) -> Option<u32> {
    let score = token.trim().parse::<u32>().ok()?;
    (score <= MAX_GAME_SCORE).then_some(score)
}
