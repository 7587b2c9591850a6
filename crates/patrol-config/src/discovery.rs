//! Locating and layering config files.
//!
//! Two files are consulted, the later overriding the earlier:
//!
//! | Layer   | Path                                                     |
//! |---------|----------------------------------------------------------|
//! | user    | `$PATROL_CONFIG_DIR/config.toml` or `<config dir>/patrol/config.toml` |
//! | project | `./patrol.toml`                                          |
//!
//! Command-line overrides are applied by the caller on top of the result.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, PatrolConfig, Result};

const PROJECT_FILE: &str = "patrol.toml";
const USER_FILE: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "PATROL_CONFIG_DIR";

pub(crate) const APP_NAME: &str = "patrol";

/// Which file a layer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    User,
    Project,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::User => f.pad("user"),
            Layer::Project => f.pad("project"),
        }
    }
}

/// One candidate config file and whether it contributed.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: Layer,
    pub path: PathBuf,
    pub loaded: bool,
}

/// Merged configuration plus a record of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PatrolConfig,
    /// Every candidate file, in precedence order.
    pub sources: Vec<ConfigSource>,
    /// Files that existed but could not be used.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the files that contributed.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

/// Discover and merge config, using `project_dir` (default: cwd) for the
/// project layer.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// As [`load_config`], with `config_dir` replacing the user config directory.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user = config_dir
        .map(|dir| dir.join(USER_FILE))
        .or_else(xdg_config_path);
    let project = match project_dir {
        Some(dir) => dir.join(PROJECT_FILE),
        None => PathBuf::from(PROJECT_FILE),
    };

    let candidates = user
        .map(|path| (Layer::User, path))
        .into_iter()
        .chain(std::iter::once((Layer::Project, project)));

    let mut loaded = LoadedConfig {
        config: PatrolConfig::new(),
        sources: Vec::new(),
        warnings: Vec::new(),
    };
    for (layer, path) in candidates {
        let contributed = match read_layer(&path) {
            Ok(Some(partial)) => {
                loaded.config.merge(partial);
                true
            }
            Ok(None) => false,
            Err(e) => {
                loaded
                    .warnings
                    .push(format!("Ignoring {} config {}: {}", layer, path.display(), e));
                false
            }
        };
        loaded.sources.push(ConfigSource {
            layer,
            path,
            loaded: contributed,
        });
    }

    Ok(loaded)
}

/// Absent files are `Ok(None)`; unreadable or invalid ones are errors.
fn read_layer(path: &Path) -> Result<Option<PatrolConfig>> {
    if !path.is_file() {
        return Ok(None);
    }
    load_config_file(path).map(Some)
}

/// Parse a single config file.
pub fn load_config_file(path: &Path) -> Result<PatrolConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    PatrolConfig::from_toml(&text)
}

/// Write `config` to `path`, creating missing parent directories.
pub fn save_config(config: &PatrolConfig, path: &Path) -> Result<()> {
    let write_err = |at: &Path, source| ConfigError::WriteFile {
        path: at.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| write_err(path, e))
}

/// `<config dir>/config.toml`.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|dir| dir.join(USER_FILE))
}

/// The user config directory: `PATROL_CONFIG_DIR` if set, else the
/// platform config directory plus `patrol`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|dir| dir.join(APP_NAME)),
    }
}
