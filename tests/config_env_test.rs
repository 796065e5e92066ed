//! Environment variables override file settings.
//!
//! Kept in its own test binary: the variable is process-wide.

use std::{env, fs};

use tempfile::TempDir;

use systree::config::{local_config_path, Settings};
use systree::LinkMode;

#[test]
fn given_env_override_when_loading_then_env_wins_over_local_file() {
    let blueprint_dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(blueprint_dir.path()),
        "link_mode = \"literal\"\ndefault_kind = \"tick\"\n",
    )
    .unwrap();
    env::set_var("SYSTREE_LINK_MODE", "strict");
    env::set_var("SYSTREE_FILTER_SENDER", "true");

    let settings = Settings::load_from(None, Some(blueprint_dir.path()));
    env::remove_var("SYSTREE_LINK_MODE");
    env::remove_var("SYSTREE_FILTER_SENDER");

    let settings = settings.expect("load settings");
    assert_eq!(settings.link_mode, LinkMode::Strict);
    assert!(settings.filter_sender);
    assert_eq!(settings.default_kind, "tick");
}
