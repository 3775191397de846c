/// The common module is our ugly grab bag of common toys. Though a fully generalized common module
/// is _typically_ a bad idea, we have few enough things in it that it's OK for now.
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::OnceLock;

use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::errors::Result;

// Version loaded from .version file at compile time
pub const VERSION: &str = include_str!(".version");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub alias: bool,
}

impl Artist {
    pub fn new(name: String) -> Self {
        Self { name, alias: false }
    }

    pub fn with_alias(name: String, alias: bool) -> Self {
        Self { name, alias }
    }
}

impl Hash for Artist {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.alias.hash(state);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistMapping {
    #[serde(default)]
    pub main: Vec<Artist>,
    #[serde(default)]
    pub guest: Vec<Artist>,
    #[serde(default)]
    pub remixer: Vec<Artist>,
    #[serde(default)]
    pub producer: Vec<Artist>,
    #[serde(default)]
    pub composer: Vec<Artist>,
    #[serde(default)]
    pub conductor: Vec<Artist>,
    #[serde(default)]
    pub djmixer: Vec<Artist>,
}

impl ArtistMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// All artists across every role, deduplicated, first-occurrence order preserved.
    pub fn all(&self) -> Vec<Artist> {
        let mut all = Vec::new();
        for (_, artists) in self.items() {
            all.extend(artists.iter().cloned());
        }
        uniq(all)
    }

    pub fn dump(&self) -> HashMap<String, Vec<Artist>> {
        self.items()
            .into_iter()
            .map(|(role, artists)| (role.to_string(), artists.clone()))
            .collect()
    }

    pub fn items(&self) -> impl Iterator<Item = (&'static str, &Vec<Artist>)> {
        [
            ("main", &self.main),
            ("guest", &self.guest),
            ("remixer", &self.remixer),
            ("producer", &self.producer),
            ("composer", &self.composer),
            ("conductor", &self.conductor),
            ("djmixer", &self.djmixer),
        ]
        .into_iter()
    }
}

pub fn flatten<T: Clone>(xxs: Vec<Vec<T>>) -> Vec<T> {
    let mut xs = Vec::new();
    for group in xxs {
        xs.extend(group);
    }
    xs
}

/// First-occurrence-preserving dedup.
pub fn uniq<T: Clone + Eq + Hash>(xs: Vec<T>) -> Vec<T> {
    let mut rv = Vec::new();
    let mut seen = HashSet::new();
    for x in xs {
        if seen.insert(x.clone()) {
            rv.push(x);
        }
    }
    rv
}

static ILLEGAL_FS_CHARS_REGEX: OnceLock<Regex> = OnceLock::new();

fn illegal_fs_chars_regex() -> &'static Regex {
    ILLEGAL_FS_CHARS_REGEX.get_or_init(|| Regex::new(r#"[:\?<>\\\*\|"/]"#).unwrap())
}

fn sanitize_core(name: &str) -> String {
    let regex = illegal_fs_chars_regex();
    regex.replace_all(name, "_").nfd().collect::<String>()
}

fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.as_bytes().len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].trim().to_string()
}

/// Sanitize a directory name: replace filesystem-illegal characters, NFD-normalize
/// unicode, and (when `enforce_maxlen`) truncate to at most `max_bytes` bytes.
pub fn sanitize_dirname(name: &str, max_bytes: usize, enforce_maxlen: bool) -> String {
    let name = sanitize_core(name);
    if enforce_maxlen {
        truncate_bytes(&name, max_bytes)
    } else {
        name
    }
}

/// Sanitize a file name, preserving a short (<=6 byte) extension across truncation.
pub fn sanitize_filename(name: &str, max_bytes: usize, enforce_maxlen: bool) -> String {
    let name = sanitize_core(name);
    if !enforce_maxlen {
        return name;
    }

    let (stem, ext) = match name.rfind('.') {
        Some(pos) if name.as_bytes().len() - pos <= 6 => {
            let (s, e) = name.split_at(pos);
            (s.to_string(), e.to_string())
        }
        _ => (name.clone(), String::new()),
    };

    format!("{}{}", truncate_bytes(&stem, max_bytes), ext)
}

/// SHA-256 over the Debug representation of a value. Used to compute content hashes
/// (metahash) for releases/tracks; Debug rather than Serialize so that any internal
/// dataclass-shaped struct can be hashed without an extra derive.
pub fn sha256_dataclass<T: Debug>(data: &T) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", data).as_bytes());
    format!("{:x}", hasher.finalize())
}

const MUSIC_EXTENSIONS: &[&str] = &["mp3", "flac", "opus", "ogg", "m4a"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

pub fn is_music_file(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| MUSIC_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_image_file(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

// Logging initialization
use std::sync::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, EnvFilter};

static LOGGING_INITIALIZED: Mutex<Option<HashSet<Option<String>>>> = Mutex::new(None);

/// Initializes the global tracing subscriber at most once per process. `output` is
/// either "stderr" or "file"; file output rolls into the platform state directory.
pub fn initialize_logging(logger_name: Option<&str>, output: &str) -> Result<()> {
    let mut guard = LOGGING_INITIALIZED.lock().unwrap();
    let initialized = guard.get_or_insert_with(HashSet::new);
    let key = logger_name.map(|s| s.to_string());
    if !initialized.insert(key) {
        return Ok(());
    }
    drop(guard);

    let proj_dirs = ProjectDirs::from("", "", "rose")
        .ok_or_else(|| crate::errors::RoseError::Generic("failed to resolve project directories".to_string()))?;
    let log_dir = if cfg!(target_os = "macos") {
        proj_dirs.cache_dir()
    } else {
        proj_dirs.state_dir().unwrap_or(proj_dirs.cache_dir())
    };
    fs::create_dir_all(log_dir)?;

    let log_despite_testing = std::env::var("LOG_TEST").is_ok();
    let is_testing = std::env::var("CARGO_TEST").is_ok();
    if is_testing && !log_despite_testing {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if output == "file" {
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .max_log_files(10)
            .filename_prefix("rose")
            .filename_suffix("log")
            .build(log_dir)
            .map_err(|e| crate::errors::RoseError::Generic(format!("failed to open log file: {e}")))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard: the subscriber lives for the rest of the process.
        Box::leak(Box::new(guard));
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(!log_despite_testing)
            .with_thread_ids(log_despite_testing)
            .with_line_number(log_despite_testing)
            .with_file(log_despite_testing)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten() {
        assert_eq!(flatten(vec![vec![1, 2], vec![3, 4], vec![5]]), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_uniq() {
        assert_eq!(uniq(vec![1, 2, 2, 3, 1, 4, 3]), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sanitize_dirname_basic() {
        assert_eq!(sanitize_dirname("test:file?", 180, false), "test_file_");
    }
}
