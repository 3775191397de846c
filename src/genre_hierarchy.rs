//! Transitive genre hierarchy, computed once from a vendored genre -> immediate-parents
//! table and exposed as a case-insensitive lookup.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

const GENRE_HIERARCHY_JSON: &str = include_str!("genre_hierarchy.json");

/// genre (lowercased) -> canonical-cased name, immediate parents (lowercased)
static IMMEDIATE_PARENTS: Lazy<HashMap<String, Vec<String>>> = Lazy::new(|| {
    let raw: HashMap<String, Vec<String>> =
        serde_json::from_str(GENRE_HIERARCHY_JSON).expect("failed to parse genre_hierarchy.json");
    raw.into_iter()
        .map(|(genre, parents)| {
            (
                genre.to_lowercase(),
                parents.into_iter().map(|p| p.to_lowercase()).collect(),
            )
        })
        .collect()
});

/// lowercased genre -> canonical display name
static CANONICAL_NAMES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    let raw: HashMap<String, Vec<String>> =
        serde_json::from_str(GENRE_HIERARCHY_JSON).expect("failed to parse genre_hierarchy.json");
    raw.into_keys().map(|g| (g.to_lowercase(), g)).collect()
});

static TRANSITIVE_PARENTS: Lazy<HashMap<String, Vec<String>>> = Lazy::new(|| {
    let mut out = HashMap::new();
    for genre in IMMEDIATE_PARENTS.keys() {
        out.insert(genre.clone(), transitive_closure(genre));
    }
    out
});

fn transitive_closure(genre: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut stack: Vec<String> = IMMEDIATE_PARENTS.get(genre).cloned().unwrap_or_default();
    let mut out = Vec::new();
    while let Some(parent) = stack.pop() {
        if seen.insert(parent.clone()) {
            if let Some(canon) = CANONICAL_NAMES.get(&parent) {
                out.push(canon.clone());
            }
            if let Some(grandparents) = IMMEDIATE_PARENTS.get(&parent) {
                stack.extend(grandparents.clone());
            }
        }
    }
    out
}

pub fn is_valid_genre(genre: &str) -> bool {
    !genre.is_empty() && IMMEDIATE_PARENTS.contains_key(&genre.to_lowercase())
}

/// Transitive parent genres for a single genre, case-insensitive. `None` for an
/// unknown genre.
pub fn get_parent_genres(genre: &str) -> Option<Vec<String>> {
    TRANSITIVE_PARENTS.get(&genre.to_lowercase()).cloned()
}

/// Transitive parent-genre closure across several genres at once: deduplicated,
/// sorted, and excluding every genre named in `genres` (even transitively, even if
/// one input genre is itself an ancestor of another).
pub fn get_all_parent_genres(genres: &[String]) -> Vec<String> {
    let input_lower: HashSet<String> = genres.iter().map(|g| g.to_lowercase()).collect();
    let mut out: HashSet<String> = HashSet::new();
    for genre in genres {
        if let Some(parents) = get_parent_genres(genre) {
            for parent in parents {
                if !input_lower.contains(&parent.to_lowercase()) {
                    out.insert(parent);
                }
            }
        }
    }
    let mut result: Vec<String> = out.into_iter().collect();
    result.sort();
    result
}

/// Transitive parent genres for a single genre; used by the cache rebuild when
/// denormalizing a release's `parent_genres` column. Same semantics as
/// [`get_parent_genres`] but returns an empty vec instead of `None` for unknown
/// genres, since the cache must still store *something* for user-entered genres
/// that aren't in the vendored hierarchy.
pub fn get_transitive_parent_genres(genre: &str) -> Vec<String> {
    get_parent_genres(genre).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_hierarchy_loads() {
        assert!(!IMMEDIATE_PARENTS.is_empty());
    }

    #[test]
    fn test_unknown_genre_has_no_transitive_parents_list() {
        assert_eq!(get_transitive_parent_genres("NotAGenre"), Vec::<String>::new());
    }
}
