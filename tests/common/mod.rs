//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use dbsuite::store::{DataSourceRegistry, ProfileStore};

pub const PREFERENCES: &str = r#"
; fixture preferences
(preferences
  (timestamp 1760000000)
  (profiles
    (pair  (profile (dsn x) (ref y)))
    (y     (dsn z))
    (deep  (profile (ref pair) (profile (dsn x) (ref y)) (dsn x)))
    (loop-a (ref loop-b))
    (loop-b (profile (dsn x) (ref loop-a)))
    (broken (dsn x extra))
    (lab   (profile (dsn lb) (dsn lb-oracle)))
    (down  (dsn refused))))
"#;

pub const DATA_SOURCES: &str = r#"
(data-source x (kind loopback) (extensions (db:test (issl))))
(data-source z (kind loopback) (extensions (db:test (ispg ismy))))
(data-source lb (kind loopback))
(data-source lb-oracle (kind loopback) (extensions (db:test (isora isdb2))))
(data-source refused (kind loopback) (args (refuse "server down")))
(data-source pg-real (kind postgresql) (args (port 5432)) (extensions (db:test (ispg))))
"#;

pub fn stores() -> (ProfileStore, DataSourceRegistry) {
    let profiles = ProfileStore::from_source("preferences.sexp", PREFERENCES).unwrap();
    let sources = DataSourceRegistry::from_source("data-sources.sexp", DATA_SOURCES).unwrap();
    (profiles, sources)
}

/// Writes `text` to `dir/name` and returns the path.
pub fn write_store(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}
