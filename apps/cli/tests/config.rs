//! Tests for config resolution and the session built from it.

use papilio_cli::{
    cmd::build_session,
    cmd::rank::read_events,
    config::{load_or_generate, resolve_config},
};
use session::{LoadState, SessionConfig};
use std::io::Write;

#[test]
fn explicit_config_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[engine]\nmodel = \"qwen2.5\"").unwrap();

    let config = resolve_config(Some(file.path())).unwrap();
    assert_eq!(config.engine.model, "qwen2.5");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(resolve_config(Some(missing.as_path())).is_err());
}

#[test]
fn missing_global_config_is_generated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("papilio").join("papilio.toml");

    let config = load_or_generate(&path).unwrap();
    assert_eq!(config, SessionConfig::default());
    assert!(path.exists());

    std::fs::write(&path, "[assistant]\nretry_on_failure = true\n").unwrap();
    let config = load_or_generate(&path).unwrap();
    assert!(config.assistant.retry_on_failure);
}

#[test]
fn session_starts_unloaded() {
    let session = build_session(&SessionConfig::default());
    assert!(matches!(session.state(), LoadState::Unloaded));
    assert_eq!(session.config().persona, SessionConfig::default().assistant.persona);
}

#[test]
fn events_file_is_parsed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"id": "1", "title": "Book flights"}}, {{"id": "2", "title": "Renew passport"}}]"#
    )
    .unwrap();

    let events = read_events(file.path()).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].title, "Renew passport");
    assert!(read_events(&file.path().with_extension("missing")).is_err());
}
