//! Logical core of the Virtual Filesystem Projector: the stateless mapping from cache
//! rows to virtual paths, plus the handful of mutating operations a FUSE syscall can
//! trigger. This module knows nothing about FUSE; [`crate::vfs_fuse`] is the syscall
//! translator that sits on top of it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cache::{get_tracks_of_release, list_releases, CachedRelease, CachedTrack};
use crate::common::sanitize_dirname;
use crate::config::Config;
use crate::datafiles::toggle_new_flag;
use crate::errors::{Result, RoseError, RoseExpectedError};

pub const VIEW_RELEASES: &str = "1. Releases";
pub const VIEW_RELEASES_NEW: &str = "2. Releases - New";
pub const VIEW_RELEASES_RECENTLY_ADDED: &str = "3. Releases - Recently Added";
pub const VIEW_ARTISTS: &str = "4. Artists";
pub const VIEW_GENRES: &str = "5. Genres";
pub const VIEW_LABELS: &str = "6. Labels";
pub const VIEW_COLLAGES: &str = "7. Collages";
pub const VIEW_PLAYLISTS: &str = "8. Playlists";

pub const TOP_LEVEL_VIEWS: &[&str] = &[
    VIEW_RELEASES,
    VIEW_RELEASES_NEW,
    VIEW_RELEASES_RECENTLY_ADDED,
    VIEW_ARTISTS,
    VIEW_GENRES,
    VIEW_LABELS,
    VIEW_COLLAGES,
    VIEW_PLAYLISTS,
];

const COLLAGE_GHOST_WINDOW: Duration = Duration::from_secs(5);
const PLAYLIST_GHOST_WINDOW: Duration = Duration::from_secs(2);

/// A parsed virtual path, one level of nesting per path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualPath {
    Root,
    View(String),
    /// A release directory nested directly under a release-listing view.
    ReleaseDir { view: String, dirname: String },
    /// A file (track, cover art, datafile) inside a release directory.
    ReleaseFile { view: String, dirname: String, filename: String },
    /// A second-level grouping (artist/genre/label name, or collage/playlist name).
    GroupDir { view: String, name: String },
    GroupReleaseDir { view: String, name: String, dirname: String },
    GroupReleaseFile { view: String, name: String, dirname: String, filename: String },
    PlaylistTrackFile { name: String, filename: String },
}

pub fn parse_virtual_path(path: &Path) -> VirtualPath {
    let parts: Vec<String> = path.components().filter_map(|c| c.as_os_str().to_str().map(String::from)).collect();
    match parts.as_slice() {
        [] => VirtualPath::Root,
        [view] => VirtualPath::View(view.clone()),
        [view, name] if view == VIEW_ARTISTS || view == VIEW_GENRES || view == VIEW_LABELS => {
            VirtualPath::GroupDir { view: view.clone(), name: name.clone() }
        }
        [view, name] if view == VIEW_COLLAGES || view == VIEW_PLAYLISTS => {
            VirtualPath::GroupDir { view: view.clone(), name: name.clone() }
        }
        [view, dirname] => VirtualPath::ReleaseDir { view: view.clone(), dirname: dirname.clone() },
        [view, name, filename] if view == VIEW_PLAYLISTS => {
            VirtualPath::PlaylistTrackFile { name: name.clone(), filename: filename.clone() }
        }
        [view, dirname, filename] if view == VIEW_ARTISTS || view == VIEW_GENRES || view == VIEW_LABELS => {
            VirtualPath::GroupReleaseDir { view: view.clone(), name: dirname.clone(), dirname: filename.clone() }
        }
        [view, name, dirname] if view == VIEW_COLLAGES => {
            VirtualPath::GroupReleaseDir { view: view.clone(), name: name.clone(), dirname: dirname.clone() }
        }
        [view, dirname, filename] => {
            VirtualPath::ReleaseFile { view: view.clone(), dirname: dirname.clone(), filename: filename.clone() }
        }
        [view, name, dirname, filename] => {
            VirtualPath::GroupReleaseFile { view: view.clone(), name: name.clone(), dirname: dirname.clone(), filename: filename.clone() }
        }
        _ => VirtualPath::Root,
    }
}

/// Renders the directory name for a release. This is a simplified stand-in for the
/// full per-view path-template rendering; it sanitizes `{artists} - {title}` the same
/// way the real templating engine's default templates do.
pub fn release_dirname(config: &Config, release: &CachedRelease) -> String {
    let artists = release
        .releaseartists
        .main
        .iter()
        .map(|a| a.name.clone())
        .collect::<Vec<_>>()
        .join(", ");
    let raw = if artists.is_empty() {
        release.releasetitle.clone()
    } else {
        format!("{artists} - {}", release.releasetitle)
    };
    sanitize_dirname(&raw, config.max_filename_bytes, true)
}

pub fn track_filename(config: &Config, track: &CachedTrack) -> String {
    let ext = track
        .source_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp3");
    let raw = format!("{}. {}", track.tracknumber, track.tracktitle);
    format!("{}.{ext}", crate::common::sanitize_filename(&raw, config.max_filename_bytes, true))
}

fn release_matches_artist(release: &CachedRelease, artist: &str) -> bool {
    release.releaseartists.all().iter().any(|a| crate::cache::compare_strs(&a.name, artist))
}

fn release_matches_genre(release: &CachedRelease, genre: &str) -> bool {
    release.genres.iter().any(|g| crate::cache::compare_strs(g, genre))
        || release.parent_genres.iter().any(|g| crate::cache::compare_strs(g, genre))
}

fn release_matches_label(release: &CachedRelease, label: &str) -> bool {
    release.labels.iter().any(|l| crate::cache::compare_strs(l, label))
}

fn passes_whitelist_blacklist(name: &str, whitelist: &Option<Vec<String>>, blacklist: &Option<Vec<String>>) -> bool {
    if let Some(wl) = whitelist {
        return wl.iter().any(|w| crate::cache::compare_strs(w, name));
    }
    if let Some(bl) = blacklist {
        return !bl.iter().any(|b| crate::cache::compare_strs(b, name));
    }
    true
}

// --- Collage/playlist sidecars --------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollageEntry {
    pub uuid: String,
    #[serde(default)]
    pub missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollageSidecar {
    #[serde(default)]
    pub releases: Vec<CollageEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub uuid: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub description_meta: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistSidecar {
    #[serde(default)]
    pub tracks: Vec<PlaylistEntry>,
}

fn collages_dir(config: &Config) -> PathBuf {
    config.music_source_dir.join("!collages")
}

fn playlists_dir(config: &Config) -> PathBuf {
    config.music_source_dir.join("!playlists")
}

fn list_sidecar_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

pub fn list_collage_names(config: &Config) -> Result<Vec<String>> {
    list_sidecar_names(&collages_dir(config))
}

pub fn list_playlist_names(config: &Config) -> Result<Vec<String>> {
    list_sidecar_names(&playlists_dir(config))
}

pub fn read_collage(config: &Config, name: &str) -> Result<CollageSidecar> {
    let path = collages_dir(config).join(format!("{name}.toml"));
    if !path.exists() {
        return Err(RoseError::Expected(RoseExpectedError::CollageDoesNotExist { name: name.to_string() }));
    }
    let text = fs::read_to_string(&path)?;
    Ok(toml::from_str(&text).unwrap_or_default())
}

pub fn write_collage(config: &Config, name: &str, sidecar: &CollageSidecar) -> Result<()> {
    let dir = collages_dir(config);
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{name}.toml"));
    fs::write(path, toml::to_string_pretty(sidecar)?)?;
    Ok(())
}

pub fn read_playlist(config: &Config, name: &str) -> Result<PlaylistSidecar> {
    let path = playlists_dir(config).join(format!("{name}.toml"));
    if !path.exists() {
        return Err(RoseError::Expected(RoseExpectedError::PlaylistDoesNotExist { name: name.to_string() }));
    }
    let text = fs::read_to_string(&path)?;
    Ok(toml::from_str(&text).unwrap_or_default())
}

pub fn write_playlist(config: &Config, name: &str, sidecar: &PlaylistSidecar) -> Result<()> {
    let dir = playlists_dir(config);
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{name}.toml"));
    fs::write(path, toml::to_string_pretty(sidecar)?)?;
    Ok(())
}

/// Per-entity timed "ghost" windows: a path that reports as empty (collage target) or
/// as still-existing (playlist target) for a short time after a write, so that naive
/// `cp`/`cp --preserve` invocations don't stat a half-updated directory.
#[derive(Default)]
pub struct GhostWindows {
    collage_targets: Mutex<HashMap<PathBuf, Instant>>,
    playlist_targets: Mutex<HashMap<PathBuf, Instant>>,
}

impl GhostWindows {
    pub fn ghost_collage_target(&self, path: PathBuf) {
        self.collage_targets.lock().unwrap().insert(path, Instant::now() + COLLAGE_GHOST_WINDOW);
    }

    pub fn is_collage_target_ghosted(&self, path: &Path) -> bool {
        Self::check(&self.collage_targets, path)
    }

    pub fn ghost_playlist_track(&self, path: PathBuf) {
        self.playlist_targets.lock().unwrap().insert(path, Instant::now() + PLAYLIST_GHOST_WINDOW);
    }

    pub fn is_playlist_track_ghosted(&self, path: &Path) -> bool {
        Self::check(&self.playlist_targets, path)
    }

    fn check(map: &Mutex<HashMap<PathBuf, Instant>>, path: &Path) -> bool {
        let mut guard = map.lock().unwrap();
        match guard.get(path) {
            Some(expiry) if *expiry > Instant::now() => true,
            Some(_) => {
                guard.remove(path);
                false
            }
            None => false,
        }
    }
}

/// Stateless (modulo ghost windows) query/mutation surface the FUSE translator drives.
pub struct VfsCore {
    pub config: Config,
    pub ghosts: GhostWindows,
}

impl VfsCore {
    pub fn new(config: Config) -> Self {
        Self { config, ghosts: GhostWindows::default() }
    }

    pub fn list_releases(&self) -> Result<Vec<CachedRelease>> {
        list_releases(&self.config)
    }

    pub fn list_new_releases(&self) -> Result<Vec<CachedRelease>> {
        Ok(self.list_releases()?.into_iter().filter(|r| r.new).collect())
    }

    pub fn list_recently_added_releases(&self) -> Result<Vec<CachedRelease>> {
        let mut releases = self.list_releases()?;
        releases.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(releases)
    }

    pub fn list_artist_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .list_releases()?
            .iter()
            .flat_map(|r| r.releaseartists.all())
            .map(|a| a.name)
            .filter(|n| {
                passes_whitelist_blacklist(n, &self.config.vfs.artists_whitelist, &self.config.vfs.artists_blacklist)
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn list_genre_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .list_releases()?
            .iter()
            .flat_map(|r| r.genres.iter().chain(r.parent_genres.iter()).cloned())
            .filter(|n| passes_whitelist_blacklist(n, &self.config.vfs.genres_whitelist, &self.config.vfs.genres_blacklist))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn list_label_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .list_releases()?
            .iter()
            .flat_map(|r| r.labels.clone())
            .filter(|n| passes_whitelist_blacklist(n, &self.config.vfs.labels_whitelist, &self.config.vfs.labels_blacklist))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn list_releases_by_artist(&self, artist: &str) -> Result<Vec<CachedRelease>> {
        Ok(self.list_releases()?.into_iter().filter(|r| release_matches_artist(r, artist)).collect())
    }

    pub fn list_releases_by_genre(&self, genre: &str) -> Result<Vec<CachedRelease>> {
        Ok(self.list_releases()?.into_iter().filter(|r| release_matches_genre(r, genre)).collect())
    }

    pub fn list_releases_by_label(&self, label: &str) -> Result<Vec<CachedRelease>> {
        Ok(self.list_releases()?.into_iter().filter(|r| release_matches_label(r, label)).collect())
    }

    pub fn find_release_by_dirname(&self, releases: &[CachedRelease], dirname: &str) -> Option<CachedRelease> {
        releases.iter().find(|r| release_dirname(&self.config, r) == dirname).cloned()
    }

    pub fn list_tracks_of_release(&self, release_id: &str) -> Result<Vec<(CachedTrack, CachedRelease)>> {
        get_tracks_of_release(&self.config, release_id)
    }

    pub fn read_track_bytes(&self, source_path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(source_path)?)
    }

    pub fn toggle_new(&self, release: &CachedRelease) -> Result<()> {
        let datafile_path = crate::datafiles::find_release_datafile(&release.source_path)?
            .map(|(p, _)| p)
            .ok_or_else(|| RoseError::Expected(RoseExpectedError::ReleaseDoesNotExist { id: release.id.clone() }))?;
        toggle_new_flag(&datafile_path)
    }

    pub fn delete_release(&self, release: &CachedRelease) -> Result<()> {
        trash::delete(&release.source_path)
            .map_err(|e| RoseError::Generic(format!("failed to trash {:?}: {e}", release.source_path)))?;
        Ok(())
    }

    pub fn set_cover_art(&self, release: &CachedRelease, data: &[u8]) -> Result<()> {
        let stem = self.config.cover_art_stems.first().cloned().unwrap_or_else(|| "cover".to_string());
        let ext = self.config.valid_art_exts.first().cloned().unwrap_or_else(|| "jpg".to_string());
        let path = release.source_path.join(format!("{stem}.{ext}"));
        fs::write(path, data)?;
        Ok(())
    }

    pub fn remove_cover_art(&self, release: &CachedRelease) -> Result<()> {
        if let Some(cover) = &release.cover_image_path {
            fs::remove_file(cover)?;
        }
        Ok(())
    }

    pub fn add_release_to_collage(&self, collage: &str, release_id: &str) -> Result<()> {
        let mut sidecar = read_collage(&self.config, collage).unwrap_or_default();
        if !sidecar.releases.iter().any(|r| r.uuid == release_id) {
            sidecar.releases.push(CollageEntry { uuid: release_id.to_string(), missing: false });
        }
        write_collage(&self.config, collage, &sidecar)
    }

    pub fn remove_release_from_collage(&self, collage: &str, release_id: &str) -> Result<()> {
        let mut sidecar = read_collage(&self.config, collage)?;
        sidecar.releases.retain(|r| r.uuid != release_id);
        write_collage(&self.config, collage, &sidecar)
    }

    pub fn create_collage(&self, name: &str) -> Result<()> {
        write_collage(&self.config, name, &CollageSidecar::default())
    }

    pub fn rename_collage(&self, old_name: &str, new_name: &str) -> Result<()> {
        let sidecar = read_collage(&self.config, old_name)?;
        write_collage(&self.config, new_name, &sidecar)?;
        fs::remove_file(collages_dir(&self.config).join(format!("{old_name}.toml")))?;
        Ok(())
    }

    pub fn delete_collage(&self, name: &str) -> Result<()> {
        let path = collages_dir(&self.config).join(format!("{name}.toml"));
        trash::delete(&path).map_err(|e| RoseError::Generic(format!("failed to trash {path:?}: {e}")))?;
        Ok(())
    }

    pub fn add_track_to_playlist(&self, playlist: &str, track_id: &str) -> Result<()> {
        let mut sidecar = read_playlist(&self.config, playlist).unwrap_or_default();
        if !sidecar.tracks.iter().any(|t| t.uuid == track_id) {
            sidecar.tracks.push(PlaylistEntry { uuid: track_id.to_string(), missing: false, description_meta: None });
        }
        write_playlist(&self.config, playlist, &sidecar)
    }

    pub fn remove_track_from_playlist(&self, playlist: &str, track_id: &str) -> Result<()> {
        let mut sidecar = read_playlist(&self.config, playlist)?;
        sidecar.tracks.retain(|t| t.uuid != track_id);
        write_playlist(&self.config, playlist, &sidecar)
    }

    pub fn create_playlist(&self, name: &str) -> Result<()> {
        write_playlist(&self.config, name, &PlaylistSidecar::default())
    }

    pub fn rename_playlist(&self, old_name: &str, new_name: &str) -> Result<()> {
        let sidecar = read_playlist(&self.config, old_name)?;
        write_playlist(&self.config, new_name, &sidecar)?;
        fs::remove_file(playlists_dir(&self.config).join(format!("{old_name}.toml")))?;
        Ok(())
    }

    pub fn delete_playlist(&self, name: &str) -> Result<()> {
        let path = playlists_dir(&self.config).join(format!("{name}.toml"));
        trash::delete(&path).map_err(|e| RoseError::Generic(format!("failed to trash {path:?}: {e}")))?;
        Ok(())
    }
}

/// Maps a library error to the `errno` a FUSE reply should carry.
pub fn to_errno(err: &RoseError) -> i32 {
    match err {
        RoseError::Expected(RoseExpectedError::ReleaseDoesNotExist { .. })
        | RoseError::Expected(RoseExpectedError::TrackDoesNotExist { .. })
        | RoseError::Expected(RoseExpectedError::CollageDoesNotExist { .. })
        | RoseError::Expected(RoseExpectedError::PlaylistDoesNotExist { .. })
        | RoseError::Expected(RoseExpectedError::FileNotFound { .. }) => libc::ENOENT,
        RoseError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        _ => libc::EIO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_virtual_path_root() {
        assert_eq!(parse_virtual_path(Path::new("/")), VirtualPath::Root);
    }

    #[test]
    fn test_parse_virtual_path_view() {
        assert_eq!(parse_virtual_path(Path::new("/1. Releases")), VirtualPath::View(VIEW_RELEASES.to_string()));
    }

    #[test]
    fn test_parse_virtual_path_release_dir() {
        assert_eq!(
            parse_virtual_path(Path::new("/1. Releases/Some Album")),
            VirtualPath::ReleaseDir { view: VIEW_RELEASES.to_string(), dirname: "Some Album".to_string() }
        );
    }

    #[test]
    fn test_parse_virtual_path_group_dir() {
        assert_eq!(
            parse_virtual_path(Path::new("/4. Artists/The Beatles")),
            VirtualPath::GroupDir { view: VIEW_ARTISTS.to_string(), name: "The Beatles".to_string() }
        );
    }

    #[test]
    fn test_top_level_views_count() {
        assert_eq!(TOP_LEVEL_VIEWS.len(), 8);
    }

    #[test]
    fn test_ghost_window_expires() {
        let ghosts = GhostWindows::default();
        let path = PathBuf::from("/7. Collages/X");
        assert!(!ghosts.is_collage_target_ghosted(&path));
        ghosts.ghost_collage_target(path.clone());
        assert!(ghosts.is_collage_target_ghosted(&path));
    }
}
