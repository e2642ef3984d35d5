//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_DB_NAME: &str = "catalog.db";

/// Catalog configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog database file
    pub database: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `catalog=debug`
    pub log: Option<String>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/catalog/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                if let Ok(contents) = std::fs::read_to_string(&global_path) {
                    if let Ok(global) = serde_yml::from_str::<Config>(&contents) {
                        config.merge(global);
                    }
                }
            }
        }

        // 3. Environment variables
        if let Ok(db) = std::env::var("CATALOG_DB") {
            config.database = Some(PathBuf::from(db));
        }
        if let Ok(log) = std::env::var("CATALOG_LOG") {
            config.log = Some(log);
        }
        if let Ok(format) = std::env::var("CATALOG_FORMAT") {
            config.default_format = Some(format);
        }

        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "catalog")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.log.is_some() {
            self.log = other.log;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// Database path: `--db` flag, then config, then the user data dir
    pub fn database_path(&self, flag: Option<&PathBuf>) -> PathBuf {
        if let Some(path) = flag {
            return path.clone();
        }
        if let Some(ref path) = self.database {
            return path.clone();
        }
        directories::ProjectDirs::from("", "", "catalog")
            .map(|dirs| dirs.data_dir().join(DEFAULT_DB_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_NAME))
    }
}
