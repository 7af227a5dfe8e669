//! Scoreboard feed document.
//!
//! The completed-games board lists, per player, a name, a team or lane label,
//! one score per finished game, and a date. The JSON shape accepted here is
//!
//! ```json
//! { "players": [ { "name": "Chris", "team": "Lane 7", "scores": ["210", 195], "date": "2026-10-19T19:02:00Z" } ] }
//! ```
//!
//! A bare top-level array of players is accepted too. Scores may be strings
//! or numbers; they are kept as raw tokens and interpreted by the core.

use chrono::{DateTime, Utc};
use ltk_reconcile::Observation;
use serde::Deserialize;

use crate::FetchError;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Wrapped { players: Vec<FeedPlayer> },
    Bare(Vec<FeedPlayer>),
}

#[derive(Debug, Clone, Deserialize)]
struct FeedPlayer {
    name: String,
    #[serde(default)]
    team: String,
    #[serde(default)]
    scores: Vec<FeedScore>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FeedScore {
    Number(i64),
    Text(String),
}

impl FeedScore {
    fn into_token(self) -> String {
        match self {
            FeedScore::Number(n) => n.to_string(),
            FeedScore::Text(s) => s,
        }
    }
}

/// Decode a feed body into observations.
///
/// Rows without a parseable `date` are stamped with `fetched_at`.
pub fn decode_feed(body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Observation>, FetchError> {
    let doc: FeedDocument =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let players = match doc {
        FeedDocument::Wrapped { players } => players,
        FeedDocument::Bare(players) => players,
    };

    Ok(players
        .into_iter()
        .map(|p| {
            let observed_at = p
                .date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or(fetched_at);
            Observation {
                reported_name: p.name,
                reported_team_label: p.team,
                reported_scores: p.scores.into_iter().map(FeedScore::into_token).collect(),
                observed_at,
            }
        })
        .collect())
}
