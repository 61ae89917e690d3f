//! Config error-message and atomic-write integration tests.

use std::path::PathBuf;

use assert_fs::prelude::*;
use chefsync_core::{config, ConfigError, SyncConfig};
use predicates::prelude::predicate;

fn sample() -> SyncConfig {
    SyncConfig::new(
        "https://chef02.example.com",
        PathBuf::from("/repo/vendor"),
        PathBuf::from("/srv/chef"),
    )
}

#[test]
fn save_creates_config_under_dot_chefsync() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &sample()).expect("save");

    home.child(".chefsync/config.yaml")
        .assert(predicate::path::is_file());
    home.child(".chefsync/config.yaml")
        .assert(predicate::str::contains("server_url: https://chef02.example.com"));
    home.child(".chefsync/config.yaml.tmp")
        .assert(predicate::path::missing());
}

#[test]
fn save_overwrites_previous_config() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &sample()).expect("first save");

    let mut updated = sample();
    updated.lockfile = PathBuf::from("/var/lock/chefsync.lock");
    config::save_at(home.path(), &updated).expect("second save");

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded.lockfile, PathBuf::from("/var/lock/chefsync.lock"));
}

#[test]
fn wrong_shape_yaml_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".chefsync/config.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn missing_required_field_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".chefsync/config.yaml")
        .write_str("server_url: https://chef.example.com\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("vendor_dir"), "must name the missing field, got: {msg}");
}

#[test]
fn home_not_found_error_message() {
    assert!(ConfigError::HomeNotFound.to_string().contains("home directory"));
}
