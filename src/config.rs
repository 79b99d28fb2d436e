//! Run configuration.
//!
//! [`HarnessConfig`] is built once from the command line and passed by
//! reference to the driver. Nothing else in the crate reads process-wide
//! settings.

use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::errors::HarnessError;
use crate::logging::DEFAULT_LEVEL;
use crate::store::{DataSourceRegistry, ProfileStore};

pub const HOME_VAR: &str = "DBSUITE_HOME";
pub const PROFILE_FILE_NAME: &str = "preferences.sexp";
pub const DATA_SOURCE_FILE_NAME: &str = "data-sources.sexp";

/// Report format for sequential mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Where a store file comes from. Only an explicit path must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorePath {
    Default(PathBuf),
    Explicit(PathBuf),
}

impl StorePath {
    pub fn path(&self) -> &Path {
        match self {
            StorePath::Default(p) | StorePath::Explicit(p) => p,
        }
    }

    /// Picks `explicit` when given, else `file_name` under the config home.
    pub fn choose(explicit: Option<PathBuf>, file_name: &str) -> Self {
        match explicit {
            Some(path) => StorePath::Explicit(path),
            None => StorePath::Default(config_home().join(file_name)),
        }
    }
}

/// Immutable settings for one invocation.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub labels: Vec<String>,
    pub gui: bool,
    pub generic: bool,
    pub profile_file: StorePath,
    pub data_source_file: StorePath,
    pub list_only: bool,
    pub format: ReportFormat,
    pub color: bool,
    pub log_level: String,
}

impl HarnessConfig {
    /// Defaults for everything but the labels.
    pub fn new(labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            gui: false,
            generic: false,
            profile_file: StorePath::choose(None, PROFILE_FILE_NAME),
            data_source_file: StorePath::choose(None, DATA_SOURCE_FILE_NAME),
            list_only: false,
            format: ReportFormat::Text,
            color: false,
            log_level: DEFAULT_LEVEL.to_string(),
        }
    }

    /// The generic suite runs when forced or when nothing else was asked for.
    pub fn runs_generic(&self) -> bool {
        self.generic || self.labels.is_empty()
    }

    /// Loads both stores named by this configuration.
    pub fn load_stores(&self) -> Result<(ProfileStore, DataSourceRegistry), HarnessError> {
        let profiles = load_or_default(&self.profile_file, ProfileStore::load)?;
        let sources = load_or_default(&self.data_source_file, DataSourceRegistry::load)?;
        Ok((profiles, sources))
    }
}

fn load_or_default<T: Default>(
    location: &StorePath,
    load: impl FnOnce(&Path) -> Result<T, HarnessError>,
) -> Result<T, HarnessError> {
    match location {
        StorePath::Default(path) if !path.exists() => {
            info!(path = %path.display(), "no store file; using an empty store");
            Ok(T::default())
        }
        other => load(other.path()),
    }
}

/// Directory holding the default store files.
pub fn config_home() -> PathBuf {
    config_home_from(|key| env::var(key).ok(), env::current_dir().unwrap_or_default())
}

/// [`config_home`] with an injectable environment.
pub fn config_home_from(var: impl Fn(&str) -> Option<String>, cwd: PathBuf) -> PathBuf {
    let non_empty = |key: &str| var(key).filter(|value| !value.is_empty());
    if let Some(home) = non_empty(HOME_VAR) {
        return PathBuf::from(home);
    }
    if let Some(xdg) = non_empty("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("dbsuite");
    }
    if let Some(home) = non_empty("HOME") {
        return PathBuf::from(home).join(".config").join("dbsuite");
    }
    cwd
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_home_precedence() {
        let cwd = PathBuf::from("/work");
        let all = env_of(&[("DBSUITE_HOME", "/d"), ("XDG_CONFIG_HOME", "/x"), ("HOME", "/h")]);
        assert_eq!(config_home_from(all, cwd.clone()), PathBuf::from("/d"));

        let xdg = env_of(&[("XDG_CONFIG_HOME", "/x"), ("HOME", "/h")]);
        assert_eq!(config_home_from(xdg, cwd.clone()), PathBuf::from("/x/dbsuite"));

        let home = env_of(&[("DBSUITE_HOME", ""), ("HOME", "/h")]);
        assert_eq!(config_home_from(home, cwd.clone()), PathBuf::from("/h/.config/dbsuite"));

        assert_eq!(config_home_from(env_of(&[]), cwd.clone()), cwd);
    }

    #[test]
    fn missing_default_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HarnessConfig::new(["x"]);
        config.profile_file = StorePath::Default(dir.path().join(PROFILE_FILE_NAME));
        config.data_source_file = StorePath::Default(dir.path().join(DATA_SOURCE_FILE_NAME));
        let (profiles, sources) = config.load_stores().unwrap();
        assert!(profiles.is_empty());
        assert!(sources.is_empty());
    }

    #[test]
    fn missing_explicit_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HarnessConfig::new(["x"]);
        config.profile_file = StorePath::Explicit(dir.path().join("nope.sexp"));
        let err = config.load_stores().unwrap_err();
        assert!(err.to_string().contains("nope.sexp"), "{}", err);
    }

    #[test]
    fn generic_runs_without_labels() {
        assert!(HarnessConfig::new(Vec::<String>::new()).runs_generic());
        assert!(!HarnessConfig::new(["a"]).runs_generic());
    }
}
