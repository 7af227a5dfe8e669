//! Lane Filter.
//!
//! The scoreboard reports every bowler in the center, including open play on
//! lanes the league is not using. A configured inclusive range keeps only the
//! league's lanes; with no range every observation passes.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneFilter {
    range: Option<(u32, u32)>,
}

impl LaneFilter {
    /// Pass-through filter.
    pub fn any() -> Self {
        Self { range: None }
    }

    /// Inclusive `[min_lane, max_lane]`. Bounds given in the wrong order are
    /// swapped rather than producing an empty range.
    pub fn between(min_lane: u32, max_lane: u32) -> Self {
        let (lo, hi) = if min_lane <= max_lane {
            (min_lane, max_lane)
        } else {
            (max_lane, min_lane)
        };
        Self {
            range: Some((lo, hi)),
        }
    }

    pub fn from_bounds(min_lane: Option<u32>, max_lane: Option<u32>) -> Self {
        match (min_lane, max_lane) {
            (Some(lo), Some(hi)) => Self::between(lo, hi),
            _ => Self::any(),
        }
    }

    pub fn range(&self) -> Option<(u32, u32)> {
        self.range
    }

    pub fn admits(&self, team_label: &str) -> bool {
        let Some((lo, hi)) = self.range else {
            return true;
        };
        match first_integer(team_label) {
            Some(lane) => (lo..=hi).contains(&lane),
            None => false,
        }
    }
}

/// First run of ASCII digits in `label`, as a number.
///
/// `"Lane 25"` → 25, `"L07-08"` → 7. Digit runs too large for `u32` count as
/// absent.
pub fn first_integer(label: &str) -> Option<u32> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let rest = label.get(start..)?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest.get(..end)?.parse().ok()
}
