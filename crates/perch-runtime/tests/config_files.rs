#![cfg(feature = "config-files")]
//! Loading user configuration from disk.

use std::io::Write;

use perch_runtime::{ConfigError, ThemeMode, UserConfig};
use pretty_assertions::assert_eq;

#[test]
fn loads_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "always_pin_window = true\ntheme_mode = \"light\"\nhover_dismiss_delay_ms = 250"
    )
    .unwrap();

    let config = UserConfig::from_toml_file(file.path()).unwrap();
    assert!(config.always_pin_window);
    assert_eq!(config.theme_mode, ThemeMode::Light);
    assert_eq!(config.hover_dismiss_delay_ms, 250);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = UserConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn out_of_range_delay_fails_validation() {
    let config = UserConfig::from_toml_str("hover_dismiss_delay_ms = 120000").unwrap();
    let err = config.validated().unwrap_err();
    assert!(err.to_string().contains("hover_dismiss_delay_ms"));
}
