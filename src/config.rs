//! The config module provides the config spec and parsing logic.
//!
//! Rose takes special care to optimize the configuration experience: detailed errors
//! are raised for invalid values, and required keys are called out by name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::rules::StoredRule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read configuration file {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse configuration file {path}: {source}")]
    Toml { path: PathBuf, #[source] source: toml::de::Error },
    #[error("missing key {key} in configuration file ({path})")]
    MissingKey { key: String, path: PathBuf },
    #[error("invalid value for {key} in configuration file ({path}): {message}")]
    InvalidValue { key: String, path: PathBuf, message: String },
}

fn default_cover_art_stems() -> Vec<String> {
    vec!["folder".to_string(), "cover".to_string(), "art".to_string(), "front".to_string()]
}

fn default_valid_art_exts() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

fn default_max_filename_bytes() -> usize {
    180
}

#[derive(Debug, Clone, Deserialize)]
struct RawArtistAlias {
    artist: String,
    aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVfsConfig {
    mount_dir: Option<PathBuf>,
    #[serde(default)]
    artists_whitelist: Option<Vec<String>>,
    #[serde(default)]
    genres_whitelist: Option<Vec<String>>,
    #[serde(default)]
    descriptors_whitelist: Option<Vec<String>>,
    #[serde(default)]
    labels_whitelist: Option<Vec<String>>,
    #[serde(default)]
    artists_blacklist: Option<Vec<String>>,
    #[serde(default)]
    genres_blacklist: Option<Vec<String>>,
    #[serde(default)]
    descriptors_blacklist: Option<Vec<String>>,
    #[serde(default)]
    labels_blacklist: Option<Vec<String>>,
    #[serde(default)]
    hide_genres_with_only_new_releases: bool,
    #[serde(default)]
    hide_descriptors_with_only_new_releases: bool,
    #[serde(default)]
    hide_labels_with_only_new_releases: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    music_source_dir: Option<String>,
    cache_dir: Option<String>,
    max_proc: Option<i64>,
    #[serde(default)]
    max_filename_bytes: Option<usize>,
    #[serde(default)]
    rename_source_files: Option<bool>,
    #[serde(default)]
    write_parent_genres: Option<bool>,
    #[serde(default)]
    cover_art_stems: Option<Vec<String>>,
    #[serde(default)]
    valid_art_exts: Option<Vec<String>>,
    #[serde(default)]
    ignore_release_directories: Option<Vec<String>>,
    #[serde(default)]
    artist_aliases: Vec<RawArtistAlias>,
    #[serde(default)]
    stored_metadata_rules: Vec<StoredRule>,
    vfs: Option<RawVfsConfig>,
    // path_templates is accepted but not validated here; rendering lives in the
    // templating engine, not in config parsing.
    #[serde(default)]
    path_templates: toml::Value,
}

/// VFS mount and library-view configuration.
#[derive(Debug, Clone, Default)]
pub struct VfsConfig {
    pub mount_dir: PathBuf,
    pub artists_whitelist: Option<Vec<String>>,
    pub genres_whitelist: Option<Vec<String>>,
    pub descriptors_whitelist: Option<Vec<String>>,
    pub labels_whitelist: Option<Vec<String>>,
    pub artists_blacklist: Option<Vec<String>>,
    pub genres_blacklist: Option<Vec<String>>,
    pub descriptors_blacklist: Option<Vec<String>>,
    pub labels_blacklist: Option<Vec<String>>,
    pub hide_genres_with_only_new_releases: bool,
    pub hide_descriptors_with_only_new_releases: bool,
    pub hide_labels_with_only_new_releases: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub music_source_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub max_proc: usize,
    pub max_filename_bytes: usize,
    pub rename_source_files: bool,
    pub write_parent_genres: bool,
    pub cover_art_stems: Vec<String>,
    pub valid_art_exts: Vec<String>,
    pub ignore_release_directories: Vec<String>,
    pub artist_aliases_map: HashMap<String, Vec<String>>,
    pub artist_aliases_parents_map: HashMap<String, Vec<String>>,
    pub stored_metadata_rules: Vec<StoredRule>,
    pub vfs: VfsConfig,
}

fn expand_tilde(raw: &str) -> PathBuf {
    match shellexpand::tilde(raw) {
        std::borrow::Cow::Borrowed(s) => PathBuf::from(s),
        std::borrow::Cow::Owned(s) => PathBuf::from(s),
    }
}

impl Config {
    pub fn parse(path: Option<&Path>) -> Result<Config, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path));
        }

        let text = std::fs::read_to_string(&config_path)
            .map_err(|source| ConfigError::Io { path: config_path.clone(), source })?;
        let raw: RawConfig = toml::from_str(&text)
            .map_err(|source| ConfigError::Toml { path: config_path.clone(), source })?;

        let music_source_dir = raw
            .music_source_dir
            .as_deref()
            .map(expand_tilde)
            .ok_or_else(|| ConfigError::MissingKey { key: "music_source_dir".to_string(), path: config_path.clone() })?;

        let raw_vfs = raw
            .vfs
            .ok_or_else(|| ConfigError::MissingKey { key: "vfs".to_string(), path: config_path.clone() })?;
        let mount_dir = raw_vfs
            .mount_dir
            .as_ref()
            .map(|p| expand_tilde(&p.to_string_lossy()))
            .ok_or_else(|| ConfigError::MissingKey { key: "vfs.mount_dir".to_string(), path: config_path.clone() })?;

        let max_proc = match raw.max_proc {
            None => num_cpus::get().max(1),
            Some(n) if n > 0 => n as usize,
            Some(n) => {
                return Err(ConfigError::InvalidValue {
                    key: "max_proc".to_string(),
                    path: config_path.clone(),
                    message: format!("must be a positive integer, got {n}"),
                });
            }
        };

        let cache_dir = match raw.cache_dir {
            Some(s) => expand_tilde(&s),
            None => default_cache_dir(),
        };
        std::fs::create_dir_all(&cache_dir).ok();

        let mut artist_aliases_map: HashMap<String, Vec<String>> = HashMap::new();
        let mut artist_aliases_parents_map: HashMap<String, Vec<String>> = HashMap::new();
        for entry in &raw.artist_aliases {
            artist_aliases_map.insert(entry.artist.clone(), entry.aliases.clone());
            for alias in &entry.aliases {
                artist_aliases_parents_map.entry(alias.clone()).or_default().push(entry.artist.clone());
            }
        }

        Ok(Config {
            music_source_dir,
            cache_dir,
            max_proc,
            max_filename_bytes: raw.max_filename_bytes.unwrap_or_else(default_max_filename_bytes),
            rename_source_files: raw.rename_source_files.unwrap_or(false),
            write_parent_genres: raw.write_parent_genres.unwrap_or(false),
            cover_art_stems: raw.cover_art_stems.unwrap_or_else(default_cover_art_stems),
            valid_art_exts: raw.valid_art_exts.unwrap_or_else(default_valid_art_exts),
            ignore_release_directories: raw.ignore_release_directories.unwrap_or_default(),
            artist_aliases_map,
            artist_aliases_parents_map,
            stored_metadata_rules: raw.stored_metadata_rules,
            vfs: VfsConfig {
                mount_dir,
                artists_whitelist: raw_vfs.artists_whitelist,
                genres_whitelist: raw_vfs.genres_whitelist,
                descriptors_whitelist: raw_vfs.descriptors_whitelist,
                labels_whitelist: raw_vfs.labels_whitelist,
                artists_blacklist: raw_vfs.artists_blacklist,
                genres_blacklist: raw_vfs.genres_blacklist,
                descriptors_blacklist: raw_vfs.descriptors_blacklist,
                labels_blacklist: raw_vfs.labels_blacklist,
                hide_genres_with_only_new_releases: raw_vfs.hide_genres_with_only_new_releases,
                hide_descriptors_with_only_new_releases: raw_vfs.hide_descriptors_with_only_new_releases,
                hide_labels_with_only_new_releases: raw_vfs.hide_labels_with_only_new_releases,
            },
        })
    }

    /// The set of `stem.ext` cover art filenames this config will recognize.
    pub fn valid_cover_arts(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.cover_art_stems.len() * self.valid_art_exts.len());
        for stem in &self.cover_art_stems {
            for ext in &self.valid_art_exts {
                out.push(format!("{stem}.{ext}"));
            }
        }
        out
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("rose").join("config.toml")
}

fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "rose")
        .map(|d| d.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".cache/rose"))
}
