//! Session length crosses serde boundaries as a plain integer and is
//! validated on the way in.

use ltk_reconcile::{RosterEntry, SessionLength};

#[test]
fn session_length_deserializes_only_even_values() {
    let ok: SessionLength = serde_json::from_str("6").unwrap();
    assert_eq!(ok.get(), 6);

    assert!(serde_json::from_str::<SessionLength>("5").is_err());
    assert!(serde_json::from_str::<SessionLength>("0").is_err());
}

#[test]
fn absent_games_are_kept_as_null() {
    let e: RosterEntry = serde_json::from_str(
        r#"{"id":"x","name":"Christian","scores":[264,236,null,null,268,237]}"#,
    )
    .unwrap();
    assert_eq!(e.scores.len(), 6);
    assert_eq!(e.scores[2], None);
    assert!(e.nicknames.is_empty());

    let back = serde_json::to_value(&e).unwrap();
    assert!(back["scores"][3].is_null());
}
