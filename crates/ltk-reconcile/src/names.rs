//! Name Resolver.
//!
//! Reported names are matched by exact equality after normalization, first
//! against each entry's canonical name and then against its nicknames. There
//! is no partial or substring matching: "Chris" never resolves to
//! "Christian".

use crate::RosterEntry;

/// Title-case each whitespace-separated token after lower-casing it.
///
/// `"  kiki   DOE "` becomes `"Kiki Doe"`.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(title_case_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_token(token: &str) -> String {
    let lower = token.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Find the roster entry a reported name refers to.
///
/// Canonical names win over nicknames: if one entry is named "Kiki" and
/// another lists "Kiki" as a nickname, the former is returned.
pub fn resolve<'a>(roster: &'a [RosterEntry], reported: &str) -> Option<&'a RosterEntry> {
    resolve_index(roster, reported).and_then(|i| roster.get(i))
}

/// Index-returning variant of [`resolve`], used where the caller needs to
/// mutate the entry afterwards.
pub fn resolve_index(roster: &[RosterEntry], reported: &str) -> Option<usize> {
    let wanted = normalize_name(reported);
    if wanted.is_empty() {
        return None;
    }

    roster
        .iter()
        .position(|e| normalize_name(&e.name) == wanted)
        .or_else(|| {
            roster
                .iter()
                .position(|e| e.nicknames.iter().any(|n| normalize_name(n) == wanted))
        })
}
