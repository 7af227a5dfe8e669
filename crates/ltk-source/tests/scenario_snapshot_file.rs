//! Snapshot file source re-reads the file on every fetch.

use ltk_source::{FetchError, ScoreSource, SnapshotFileSource};
use std::io::Write;

#[tokio::test]
async fn rereads_file_each_fetch() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, r#"[{{"name":"Chris","team":"Lane 7","scores":["210"]}}]"#).unwrap();
    f.flush().unwrap();

    let src = SnapshotFileSource::new(f.path());
    let first = src.fetch_snapshot().await.unwrap();
    assert_eq!(first[0].reported_scores, vec!["210"]);

    std::fs::write(
        f.path(),
        r#"[{"name":"Chris","team":"Lane 7","scores":["210","195"]}]"#,
    )
    .unwrap();
    let second = src.fetch_snapshot().await.unwrap();
    assert_eq!(second[0].reported_scores, vec!["210", "195"]);
}

#[tokio::test]
async fn missing_file_is_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let src = SnapshotFileSource::new(dir.path().join("nope.json"));
    assert!(matches!(
        src.fetch_snapshot().await,
        Err(FetchError::Transport(_))
    ));
}
