//! The metadata codec: reads and writes the normalized tag set Rose understands,
//! translating to and from whatever the underlying audio container natively supports.
//!
//! Every format is read and written through `lofty`'s unified tag abstraction rather
//! than juggling one crate per container; see DESIGN.md for why.

use std::fmt;
use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, ItemValue, Tag, TagItem};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::{Artist, ArtistMapping};
use crate::config::Config;
use crate::errors::{Result, RoseError, RoseExpectedError};

pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "ogg", "opus", "flac"];

pub const SUPPORTED_RELEASE_TYPES: &[&str] = &[
    "album",
    "single",
    "ep",
    "compilation",
    "anthology",
    "soundtrack",
    "live",
    "remix",
    "djmix",
    "mixtape",
    "other",
    "bootleg",
    "demo",
    "unknown",
];

static TAG_SPLITTER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" \\\\ | / |; ?| vs\. ").unwrap());
static DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").unwrap());
static GENRE_PARENTS_SENTINEL: &str = r"\\PARENTS:\\";

/// A partial, possibly-unknown date: year is required once any component is present,
/// month/day are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoseDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl RoseDate {
    pub fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Self {
        Self { year, month, day }
    }

    pub fn year_only(year: i32) -> Self {
        Self { year, month: None, day: None }
    }

    /// Parses a bare year (`"1990"`) or an ISO date (`"1990-02-05"`); any other input
    /// (including empty strings) yields `None`.
    pub fn parse(s: Option<&str>) -> Option<Self> {
        let s = s?.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(year) = s.parse::<i32>() {
            return Some(Self::year_only(year));
        }
        if let Some(caps) = DATE_REGEX.captures(s) {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let day: u32 = caps[3].parse().ok()?;
            return Some(Self { year, month: Some(month), day: Some(day) });
        }
        None
    }
}

impl fmt::Display for RoseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            None => write!(f, "{:04}", self.year),
            Some(month) => write!(f, "{:04}-{:02}-{:02}", self.year, month, self.day.unwrap_or(1)),
        }
    }
}

/// Splits a multi-value tag string on any of the conventional separators (` \\ `,
/// ` / `, `;`/`; `, ` vs. `), trimming and dropping empty segments.
pub fn split_tag(s: &str) -> Vec<String> {
    if s.is_empty() {
        return vec![];
    }
    TAG_SPLITTER_REGEX
        .split(s)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn join_tag(values: &[String]) -> String {
    values.join(";")
}

fn split_once_ci(s: &str, delim: &str) -> Option<(String, String)> {
    let lower = s.to_lowercase();
    let delim_lower = delim.to_lowercase();
    lower.find(&delim_lower).map(|idx| {
        let before = s[..idx].to_string();
        let after = s[idx + delim.len()..].to_string();
        (before, after)
    })
}

/// Parses the Rose artist-role grammar: a left-to-right greedy scan over
/// ` produced by ` / ` remixed by ` / ` feat. ` / ` pres. ` / ` performed by `,
/// leaving the remainder as the main artist list. `dj`/`composer` hints let the
/// caller seed a role from a dedicated tag frame when the free-form string doesn't
/// spell it out.
pub fn parse_artist_string(main: &str, dj: Option<&str>, composer: Option<&str>) -> ArtistMapping {
    let mut producer = Vec::new();
    let mut remixer = Vec::new();
    let mut guest = Vec::new();
    let mut djmixer = Vec::new();
    let mut composer_v = Vec::new();
    let mut rest = main.to_string();

    if let Some((before, after)) = split_once_ci(&rest, " produced by ") {
        rest = before;
        producer = split_tag(&after);
    }
    if let Some((before, after)) = split_once_ci(&rest, " remixed by ") {
        rest = before;
        remixer = split_tag(&after);
    }
    if let Some((before, after)) = split_once_ci(&rest, " feat. ") {
        rest = before;
        guest = split_tag(&after);
    }
    if let Some((before, after)) = split_once_ci(&rest, " pres. ") {
        djmixer = split_tag(&before);
        rest = after;
    }
    if let Some((before, after)) = split_once_ci(&rest, " performed by ") {
        composer_v = split_tag(&before);
        rest = after;
    }

    let mut mapping = ArtistMapping {
        main: split_tag(&rest),
        guest,
        remixer,
        producer,
        composer: composer_v,
        conductor: vec![],
        djmixer,
    };
    if mapping.djmixer.is_empty() {
        if let Some(dj) = dj {
            if !dj.is_empty() {
                mapping.djmixer = split_tag(dj);
            }
        }
    }
    if mapping.composer.is_empty() {
        if let Some(composer) = composer {
            if !composer.is_empty() {
                mapping.composer = split_tag(composer);
            }
        }
    }
    mapping
}

fn artists_joined(artists: &[Artist]) -> String {
    join_tag(&artists.iter().map(|a| a.name.clone()).collect::<Vec<_>>())
}

/// Composes the free-form artist-grammar string. Conductor is never folded in here;
/// it round-trips through its own dedicated tag frame.
pub fn format_artist_string(a: &ArtistMapping) -> String {
    let mut r = artists_joined(&a.main);
    if !a.composer.is_empty() {
        r = format!("{} performed by {}", artists_joined(&a.composer), r);
    }
    if !a.djmixer.is_empty() {
        r = format!("{} pres. {}", artists_joined(&a.djmixer), r);
    }
    if !a.guest.is_empty() {
        r = format!("{} feat. {}", r, artists_joined(&a.guest));
    }
    if !a.remixer.is_empty() {
        r = format!("{} remixed by {}", r, artists_joined(&a.remixer));
    }
    if !a.producer.is_empty() {
        r = format!("{} produced by {}", r, artists_joined(&a.producer));
    }
    r
}

fn normalize_release_type(s: Option<&str>) -> String {
    match s {
        Some(s) if SUPPORTED_RELEASE_TYPES.contains(&s.to_lowercase().as_str()) => s.to_lowercase(),
        _ => "unknown".to_string(),
    }
}

fn artists_to_vec(artists: &[Artist]) -> Vec<String> {
    artists.iter().map(|a| a.name.clone()).collect()
}

/// The normalized view of a single audio file's tags, independent of its container
/// format.
#[derive(Debug, Clone)]
pub struct AudioTags {
    pub path: PathBuf,
    pub id: Option<String>,
    pub release_id: Option<String>,

    pub releasetitle: String,
    pub releasetype: String,
    pub releasedate: Option<RoseDate>,
    pub originaldate: Option<RoseDate>,
    pub compositiondate: Option<RoseDate>,
    pub genre: Vec<String>,
    pub secondarygenre: Vec<String>,
    pub descriptor: Vec<String>,
    pub label: Vec<String>,
    pub catalognumber: Option<String>,
    pub edition: Option<String>,
    pub releaseartists: ArtistMapping,

    pub tracktitle: String,
    pub tracknumber: String,
    pub tracktotal: Option<i32>,
    pub discnumber: String,
    pub disctotal: Option<i32>,
    pub trackartists: ArtistMapping,

    pub duration_sec: u32,
}

fn get_unknown(tag: &Tag, key: &str) -> Option<String> {
    tag.get_string(&ItemKey::Unknown(key.to_string())).map(|s| s.to_string())
}

fn get_first(tag: &Tag, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = get_unknown(tag, key) {
            if !v.is_empty() {
                return Some(v);
            }
        }
    }
    None
}

fn set_unknown(tag: &mut Tag, key: &str, value: Option<String>) {
    let item_key = ItemKey::Unknown(key.to_string());
    tag.remove_key(&item_key);
    if let Some(value) = value {
        if !value.is_empty() {
            tag.push(TagItem::new(item_key, ItemValue::Text(value)));
        }
    }
}

fn split_num_pair(raw: Option<String>) -> (String, Option<i32>) {
    match raw {
        None => (String::new(), None),
        Some(s) => match s.split_once('/') {
            Some((n, total)) => (n.to_string(), total.trim().parse().ok()),
            None => (s.to_string(), None),
        },
    }
}

fn split_genre_tag(raw: &str) -> (Vec<String>, Vec<String>) {
    match raw.split_once(GENRE_PARENTS_SENTINEL) {
        Some((genres, parents)) => (split_tag(genres), split_tag(parents)),
        None => (split_tag(raw), vec![]),
    }
}

fn format_genre_tag(config: &Config, genres: &[String]) -> String {
    let base = join_tag(genres);
    if !config.write_parent_genres || genres.is_empty() {
        return base;
    }
    let mut parents = crate::genre_hierarchy::get_all_parent_genres(genres);
    parents.sort();
    if parents.is_empty() {
        return base;
    }
    format!("{base}{GENRE_PARENTS_SENTINEL}{}", parents.join(";"))
}

fn non_empty_joined(artists: &[Artist]) -> Option<String> {
    if artists.is_empty() {
        None
    } else {
        Some(artists_joined(artists))
    }
}

impl AudioTags {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tagged_file = Probe::open(path)
            .map_err(|e| RoseError::Expected(RoseExpectedError::InvalidFileFormat { format: e.to_string() }))?
            .read()
            .map_err(|e| RoseError::Expected(RoseExpectedError::InvalidFileFormat { format: e.to_string() }))?;

        let duration_sec = tagged_file.properties().duration().as_secs() as u32;
        let tag_type = tagged_file.primary_tag_type();
        let empty = Tag::new(tag_type);
        let tag = tagged_file.primary_tag().unwrap_or(&empty);

        let genre_raw = tag.get_string(&ItemKey::Genre).unwrap_or_default().to_string();
        let (genre, _genre_parents) = split_genre_tag(&genre_raw);
        let secondarygenre_raw = get_first(tag, &["secondarygenre", "SECONDARYGENRE"]).unwrap_or_default();
        let (secondarygenre, _) = split_genre_tag(&secondarygenre_raw);

        let (tracknumber, tracktotal_from_pair) =
            split_num_pair(tag.get_string(&ItemKey::TrackNumber).map(|s| s.to_string()));
        let tracktotal = tag
            .get_string(&ItemKey::TrackTotal)
            .and_then(|s| s.parse().ok())
            .or(tracktotal_from_pair);
        let (discnumber, disctotal_from_pair) =
            split_num_pair(tag.get_string(&ItemKey::DiscNumber).map(|s| s.to_string()));
        let disctotal = tag
            .get_string(&ItemKey::DiscTotal)
            .and_then(|s| s.parse().ok())
            .or(disctotal_from_pair);

        let releasedate_raw = get_first(tag, &["releasedate", "date", "year", "RELEASEDATE"])
            .or_else(|| tag.get_string(&ItemKey::Year).map(|s| s.to_string()));
        let releasedate = RoseDate::parse(releasedate_raw.as_deref());
        let originaldate = RoseDate::parse(get_first(tag, &["originaldate", "originalyear", "ORIGINALDATE"]).as_deref());
        let compositiondate = RoseDate::parse(get_first(tag, &["compositiondate", "COMPOSITIONDATE"]).as_deref());

        let label = split_tag(&get_first(tag, &["label", "organization", "recordlabel", "LABEL"]).unwrap_or_default());
        let catalognumber = get_first(tag, &["catalognumber", "CATALOGNUMBER"]);
        let edition = get_first(tag, &["edition", "EDITION"]);
        let releasetype = normalize_release_type(
            get_first(tag, &["releasetype", "RELEASETYPE", "MusicBrainz Album Type"]).as_deref(),
        );

        let main_release = get_first(tag, &["releaseartist", "albumartist", "ALBUMARTIST"]).unwrap_or_default();
        let mut releaseartists = parse_artist_string(&main_release, None, None);
        if let Some(conductor) = get_first(tag, &["releaseconductor"]) {
            releaseartists.conductor = split_tag(&conductor);
        }

        let trackmain = tag.artist().map(|s| s.to_string()).unwrap_or_default();
        let dj = get_first(tag, &["djmixer", "DJMIXER"]);
        let composer = tag.get_string(&ItemKey::Composer).map(|s| s.to_string());
        let mut trackartists = parse_artist_string(&trackmain, dj.as_deref(), composer.as_deref());
        if let Some(conductor) = get_first(tag, &["conductor", "CONDUCTOR"])
            .or_else(|| tag.get_string(&ItemKey::Conductor).map(|s| s.to_string()))
        {
            trackartists.conductor = split_tag(&conductor);
        }
        if trackartists.remixer.is_empty() {
            if let Some(remixer) = get_first(tag, &["remixer", "REMIXER"]) {
                trackartists.remixer = split_tag(&remixer);
            }
        }
        if trackartists.producer.is_empty() {
            if let Some(producer) = get_first(tag, &["producer", "PRODUCER"]) {
                trackartists.producer = split_tag(&producer);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            id: get_unknown(tag, "roseid"),
            release_id: get_unknown(tag, "rosereleaseid"),
            releasetitle: tag.album().map(|s| s.to_string()).unwrap_or_default(),
            releasetype,
            releasedate,
            originaldate,
            compositiondate,
            genre,
            secondarygenre,
            descriptor: split_tag(&get_first(tag, &["descriptor", "DESCRIPTOR"]).unwrap_or_default()),
            label,
            catalognumber,
            edition,
            releaseartists,
            tracktitle: tag.title().map(|s| s.to_string()).unwrap_or_default(),
            tracknumber,
            tracktotal,
            discnumber,
            disctotal,
            trackartists,
            duration_sec,
        })
    }

    /// Writes every normalized field back into the file's tag, clearing any stale
    /// frames that are no longer applicable (e.g. a cleared djmixer). Set
    /// `validate = false` to allow an out-of-vocabulary `releasetype` to be written
    /// verbatim instead of erroring.
    pub fn flush(&self, config: &Config, validate: bool) -> Result<()> {
        if validate && !SUPPORTED_RELEASE_TYPES.contains(&self.releasetype.to_lowercase().as_str()) {
            return Err(RoseError::Expected(RoseExpectedError::InvalidFileFormat {
                format: format!("unsupported release type: {}", self.releasetype),
            }));
        }

        let mut tagged_file = Probe::open(&self.path)
            .map_err(|e| RoseError::Expected(RoseExpectedError::InvalidFileFormat { format: e.to_string() }))?
            .read()
            .map_err(|e| RoseError::Expected(RoseExpectedError::InvalidFileFormat { format: e.to_string() }))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.primary_tag().is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file.primary_tag_mut().expect("tag just inserted");

        tag.set_album(self.releasetitle.clone());
        tag.set_title(self.tracktitle.clone());

        set_unknown(tag, "roseid", self.id.clone());
        set_unknown(tag, "rosereleaseid", self.release_id.clone());
        set_unknown(tag, "releasetype", Some(self.releasetype.clone()));

        tag.insert_text(ItemKey::Genre, format_genre_tag(config, &self.genre));
        set_unknown(tag, "secondarygenre", Some(format_genre_tag(config, &self.secondarygenre)));
        set_unknown(tag, "descriptor", Some(join_tag(&self.descriptor)));
        set_unknown(tag, "label", Some(join_tag(&self.label)));
        set_unknown(tag, "catalognumber", self.catalognumber.clone());
        set_unknown(tag, "edition", self.edition.clone());

        set_unknown(tag, "releasedate", self.releasedate.map(|d| d.to_string()));
        set_unknown(tag, "originaldate", self.originaldate.map(|d| d.to_string()));
        set_unknown(tag, "compositiondate", self.compositiondate.map(|d| d.to_string()));

        if let Ok(n) = self.tracknumber.parse::<u32>() {
            tag.set_track(n);
        }
        if let Some(total) = self.tracktotal {
            tag.set_track_total(total as u32);
        }
        if let Ok(n) = self.discnumber.parse::<u32>() {
            tag.set_disk(n);
        }
        if let Some(total) = self.disctotal {
            tag.set_disk_total(total as u32);
        }

        tag.set_album_artist(format_artist_string(&self.releaseartists));
        set_unknown(tag, "releaseconductor", non_empty_joined(&self.releaseartists.conductor));

        tag.set_artist(format_artist_string(&self.trackartists));
        set_unknown(tag, "conductor", non_empty_joined(&self.trackartists.conductor));
        set_unknown(tag, "djmixer", non_empty_joined(&self.trackartists.djmixer));
        set_unknown(tag, "remixer", non_empty_joined(&self.trackartists.remixer));
        set_unknown(tag, "producer", non_empty_joined(&self.trackartists.producer));
        if self.trackartists.composer.is_empty() {
            tag.remove_key(&ItemKey::Composer);
        } else {
            tag.set_composer(artists_joined(&self.trackartists.composer));
        }

        tagged_file
            .save_to_path(&self.path, WriteOptions::default())
            .map_err(|e| RoseError::Generic(format!("failed to write tags to {:?}: {e}", self.path)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rose_date_parse() {
        assert_eq!(RoseDate::parse(Some("1990")), Some(RoseDate::year_only(1990)));
        assert_eq!(RoseDate::parse(Some("1990-02-05")), Some(RoseDate::new(1990, Some(2), Some(5))));
        assert_eq!(RoseDate::parse(Some("")), None);
        assert_eq!(RoseDate::parse(None), None);
    }

    #[test]
    fn test_rose_date_display() {
        assert_eq!(RoseDate::year_only(1990).to_string(), "1990");
        assert_eq!(RoseDate::new(1990, Some(2), Some(5)).to_string(), "1990-02-05");
    }

    #[test]
    fn test_split_tag() {
        assert_eq!(split_tag(r"a \\ b"), vec!["a", "b"]);
        assert_eq!(split_tag(r"a \ b"), vec![r"a \ b"]);
        assert_eq!(split_tag("a;b"), vec!["a", "b"]);
        assert_eq!(split_tag("a; b"), vec!["a", "b"]);
        assert_eq!(split_tag("a vs. b"), vec!["a", "b"]);
        assert_eq!(split_tag("a / b"), vec!["a", "b"]);
    }

    fn artist_names(artists: &[Artist]) -> Vec<String> {
        artists_to_vec(artists)
    }

    #[test]
    fn test_parse_artist_string() {
        let m = parse_artist_string("A;B feat. C;D", None, None);
        assert_eq!(artist_names(&m.main), vec!["A", "B"]);
        assert_eq!(artist_names(&m.guest), vec!["C", "D"]);

        let m = parse_artist_string("A pres. C;D", None, None);
        assert_eq!(artist_names(&m.djmixer), vec!["A"]);
        assert_eq!(artist_names(&m.main), vec!["C", "D"]);

        let m = parse_artist_string("A performed by C;D", None, None);
        assert_eq!(artist_names(&m.composer), vec!["A"]);
        assert_eq!(artist_names(&m.main), vec!["C", "D"]);

        let m = parse_artist_string("A pres. B;C feat. D;E", None, None);
        assert_eq!(artist_names(&m.djmixer), vec!["A"]);
        assert_eq!(artist_names(&m.main), vec!["B", "C"]);
        assert_eq!(artist_names(&m.guest), vec!["D", "E"]);

        let m = parse_artist_string("A pres. B", Some("A"), None);
        assert_eq!(artist_names(&m.djmixer), vec!["A"]);
        assert_eq!(artist_names(&m.main), vec!["B"]);
    }

    #[test]
    fn test_format_artist_string() {
        let mut m = ArtistMapping::new();
        m.main = vec![Artist::new("A".into()), Artist::new("B".into())];
        m.guest = vec![Artist::new("C".into()), Artist::new("D".into())];
        assert_eq!(format_artist_string(&m), "A;B feat. C;D");

        let mut m = ArtistMapping::new();
        m.djmixer = vec![Artist::new("A".into())];
        m.main = vec![Artist::new("C".into()), Artist::new("D".into())];
        assert_eq!(format_artist_string(&m), "A pres. C;D");

        let mut m = ArtistMapping::new();
        m.composer = vec![Artist::new("A".into())];
        m.main = vec![Artist::new("C".into()), Artist::new("D".into())];
        assert_eq!(format_artist_string(&m), "A performed by C;D");
    }

    #[test]
    fn test_format_artist_string_never_merges_conductor() {
        let mut m = ArtistMapping::new();
        m.main = vec![Artist::new("Main".into())];
        m.conductor = vec![Artist::new("Conductor".into())];
        assert!(!format_artist_string(&m).contains("Conductor"));
    }

    #[test]
    fn test_genre_tag_round_trip_without_parents() {
        let (genres, parents) = split_genre_tag("Electronic;House");
        assert_eq!(genres, vec!["Electronic", "House"]);
        assert!(parents.is_empty());
    }

    #[test]
    fn test_genre_tag_round_trip_with_parents() {
        let (genres, parents) = split_genre_tag(r"Electronic;House\\PARENTS:\\Dance;Electronic Dance Music");
        assert_eq!(genres, vec!["Electronic", "House"]);
        assert_eq!(parents, vec!["Dance", "Electronic Dance Music"]);
    }

    #[test]
    fn test_releasetype_normalization() {
        assert_eq!(normalize_release_type(Some("Album")), "album");
        assert_eq!(normalize_release_type(Some("bogus")), "unknown");
        assert_eq!(normalize_release_type(None), "unknown");
    }
}
