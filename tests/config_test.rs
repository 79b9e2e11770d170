//! `Config::load`'s fallback chain, exercised against real files instead
//! of just the in-module defaults/parsing unit tests.

use std::env;
use std::fs;

use serial_test::serial;
use swarmhost::config::Config;

/// Changes the process cwd, which `Config::load` reads from implicitly;
/// serialized against other tests in this file since cwd is global state.
#[test]
#[serial]
fn load_with_explicit_path_ignores_cwd_file() {
    let original_dir = env::current_dir().expect("current dir");
    let dir = tempfile::tempdir().expect("tempdir");
    env::set_current_dir(dir.path()).expect("chdir");

    fs::write(dir.path().join(".swarmhost.yml"), "concurrency:\n  max-workers: 9\n").expect("write cwd config");

    let explicit_path = dir.path().join("explicit.yml");
    fs::write(&explicit_path, "concurrency:\n  max-workers: 3\n").expect("write explicit config");

    let config = Config::load(Some(&explicit_path)).expect("load explicit config");
    assert_eq!(config.concurrency.max_workers, 3);

    env::set_current_dir(original_dir).expect("restore cwd");
}

#[test]
#[serial]
fn load_falls_back_to_cwd_config_file() {
    let original_dir = env::current_dir().expect("current dir");
    let dir = tempfile::tempdir().expect("tempdir");
    env::set_current_dir(dir.path()).expect("chdir");

    fs::write(dir.path().join(".swarmhost.yml"), "concurrency:\n  max-workers: 9\nadapter:\n  product-marker: hostmark\n")
        .expect("write cwd config");

    let config = Config::load(None).expect("load from cwd");
    assert_eq!(config.concurrency.max_workers, 9);
    assert_eq!(config.adapter.product_marker, "hostmark");

    env::set_current_dir(original_dir).expect("restore cwd");
}

#[test]
#[serial]
fn load_uses_defaults_when_nothing_is_found() {
    let original_dir = env::current_dir().expect("current dir");
    let dir = tempfile::tempdir().expect("tempdir");
    env::set_current_dir(dir.path()).expect("chdir");

    let config = Config::load(None).expect("load defaults");
    assert_eq!(config.concurrency.max_workers, 4);

    env::set_current_dir(original_dir).expect("restore cwd");
}

#[test]
#[serial]
fn load_with_malformed_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bad_path = dir.path().join("bad.yml");
    fs::write(&bad_path, "concurrency: [this is not a mapping").expect("write bad config");

    let result = Config::load(Some(&bad_path));
    assert!(result.is_err());
}
