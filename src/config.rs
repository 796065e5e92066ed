//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/systree/systree.toml`
//! 3. Local config: `<blueprint_dir>/.systree.toml`
//! 4. Environment variables: `SYSTREE_*` prefix, e.g. `SYSTREE_LINK_MODE=strict`

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::domain::LinkMode;

pub const LOCAL_CONFIG_FILE: &str = ".systree.toml";

/// Effective settings for building and driving system trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// How re-linking and removal treat stale links
    pub link_mode: LinkMode,
    /// Skip the sender's subtree when posting unless told otherwise
    pub filter_sender: bool,
    /// Message kind used when none is given
    pub default_kind: String,
    /// Blueprint used when none is given
    pub blueprint: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            link_mode: LinkMode::Literal,
            filter_sender: false,
            default_kind: "ping".into(),
            blueprint: None,
        }
    }
}

/// Get the XDG config directory for systree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "systree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("systree.toml"))
}

/// Get the path to the local config file next to a blueprint.
pub fn local_config_path(blueprint_dir: &Path) -> PathBuf {
    blueprint_dir.join(LOCAL_CONFIG_FILE)
}

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is returned as is.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Load settings with layered precedence from the standard locations.
    pub fn load(blueprint_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), blueprint_dir)
    }

    /// Load settings from an explicit global config file and blueprint directory.
    ///
    /// Missing files are skipped; later layers override earlier ones key by key.
    #[instrument(level = "debug")]
    pub fn load_from(
        global: Option<&Path>,
        blueprint_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut builder = Config::builder();

        if let Some(global_path) = global.filter(|p| p.exists()) {
            debug!(path = %global_path.display(), "global config");
            builder = builder.add_source(File::from(global_path).required(false));
        }

        if let Some(dir) = blueprint_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!(path = %local_path.display(), "local config");
                builder = builder.add_source(File::from(local_path).required(true));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SYSTREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        settings.expand_paths();

        Ok(settings)
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(blueprint) = &self.blueprint {
            let expanded = expand_env_vars(blueprint.to_string_lossy().as_ref());
            self.blueprint = Some(PathBuf::from(expanded));
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# systree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/systree/systree.toml
#   Local:  <blueprint_dir>/.systree.toml
#   Env:    SYSTREE_* environment variables

# "literal": adding a child never detaches it from a previous parent and
#            removing a child keeps its parent link
# "strict":  adding a child moves it and refuses cycles, removing clears the link
# link_mode = "literal"

# Skip the sender's own subtree when posting
# filter_sender = false

# Message kind used by `systree post` without --kind
# default_kind = "ping"

# Blueprint used when none is given on the command line
# blueprint = "~/.config/systree/game.toml"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
