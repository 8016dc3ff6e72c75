//! Object and exit name resolution.
//!
//! Players refer to things by name, never by dbref. Objects match
//! case-insensitively and partially ("key" finds "Bob-storekey"), with an
//! exact match winning over partial ones. Exits only match their exact name
//! or one of their aliases, so typing "door" never walks through the
//! "back door".

use crate::tmush::errors::TinyMushError;
use crate::tmush::storage::TinyMushStore;
use crate::tmush::types::{ExitRecord, ObjectRecord, PlayerRecord};

/// Where to look for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only what the player carries
    Carried,
    /// Only the player's current room
    Room,
}

/// Result of object name resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveResult {
    /// Single unambiguous match
    Found(ObjectRecord),

    /// Multiple matches - user must clarify
    Ambiguous(Vec<ObjectMatch>),

    /// No matches found
    NotFound,
}

/// A single object match with its context
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMatch {
    pub id: String,
    pub name: String,
    /// "carried" or "here"
    pub location: &'static str,
}

impl ObjectMatch {
    /// Format for display in disambiguation list
    pub fn format_for_display(&self, index: usize) -> String {
        format!("{}) {} [{}] ({})", index, self.name, self.id, self.location)
    }
}

/// Normalize a name for comparison
///
/// - Convert to lowercase
/// - Trim whitespace
/// - Collapse multiple spaces to single space
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn name_matches(query: &str, object_name: &str) -> bool {
    normalize_name(object_name).contains(&normalize_name(query))
}

fn exact_match(query: &str, object_name: &str) -> bool {
    normalize_name(query) == normalize_name(object_name)
}

/// Resolve an object name for `player` within `scope`.
pub fn resolve_object_name(
    player: &PlayerRecord,
    query: &str,
    scope: SearchScope,
    store: &TinyMushStore,
) -> Result<ResolveResult, TinyMushError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(ResolveResult::NotFound);
    }

    let candidates: Vec<(ObjectRecord, &'static str)> = match scope {
        SearchScope::Carried => store
            .carried_objects(player)?
            .into_iter()
            .map(|obj| (obj, "carried"))
            .collect(),
        SearchScope::Room => {
            let room = store.get_room(&player.current_room)?;
            store
                .room_objects(&room)?
                .into_iter()
                .map(|obj| (obj, "here"))
                .collect()
        }
    };

    Ok(pick(query, candidates))
}

fn pick(query: &str, candidates: Vec<(ObjectRecord, &'static str)>) -> ResolveResult {
    let mut matched: Vec<(ObjectRecord, &'static str)> = candidates
        .into_iter()
        .filter(|(obj, _)| name_matches(query, &obj.name))
        .collect();

    // An exact name beats any number of partial hits.
    let exact: Vec<usize> = matched
        .iter()
        .enumerate()
        .filter(|(_, (obj, _))| exact_match(query, &obj.name))
        .map(|(i, _)| i)
        .collect();
    if exact.len() == 1 {
        return ResolveResult::Found(matched.swap_remove(exact[0]).0);
    }

    match matched.len() {
        0 => ResolveResult::NotFound,
        1 => ResolveResult::Found(matched.remove(0).0),
        _ => ResolveResult::Ambiguous(
            matched
                .into_iter()
                .map(|(obj, location)| ObjectMatch {
                    id: obj.id,
                    name: obj.name,
                    location,
                })
                .collect(),
        ),
    }
}

/// Find the exit named (or aliased) `query` among `exits`.
pub fn resolve_exit<'a>(exits: &'a [ExitRecord], query: &str) -> Option<&'a ExitRecord> {
    exits.iter().find(|exit| exit.matches(query))
}

/// Format disambiguation prompt for user
pub fn format_disambiguation_prompt(matches: &[ObjectMatch]) -> String {
    let mut output = String::from("Multiple objects match that name:\n\n");

    for (i, obj_match) in matches.iter().enumerate() {
        output.push_str(&obj_match.format_for_display(i + 1));
        output.push('\n');
    }

    output.push_str("\nPlease be more specific or use the full name.");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmush::types::ObjectLocation;

    fn obj(id: &str, name: &str) -> ObjectRecord {
        ObjectRecord::new(id, name, ObjectLocation::Room("#1".to_string()), "sysop")
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Rusty Key"), "rusty key");
        assert_eq!(normalize_name("  Crystal   Ball  "), "crystal ball");
    }

    #[test]
    fn partial_names_resolve_when_unique() {
        let result = pick(
            "key",
            vec![(obj("#1", "Bob-storekey"), "here"), (obj("#2", "Sword"), "here")],
        );
        assert!(matches!(result, ResolveResult::Found(ref o) if o.id == "#1"));
    }

    #[test]
    fn exact_name_beats_partial_matches() {
        let result = pick(
            "key",
            vec![(obj("#1", "Bob-storekey"), "here"), (obj("#2", "Key"), "carried")],
        );
        assert!(matches!(result, ResolveResult::Found(ref o) if o.id == "#2"));
    }

    #[test]
    fn several_partials_are_ambiguous() {
        let result = pick(
            "key",
            vec![(obj("#1", "brass key"), "here"), (obj("#2", "iron key"), "carried")],
        );
        match result {
            ResolveResult::Ambiguous(matches) => {
                assert_eq!(matches.len(), 2);
                let prompt = format_disambiguation_prompt(&matches);
                assert!(prompt.contains("1) brass key [#1] (here)"));
                assert!(prompt.contains("2) iron key [#2] (carried)"));
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn nothing_matches() {
        assert_eq!(pick("lamp", vec![(obj("#1", "Sword"), "here")]), ResolveResult::NotFound);
    }

    #[test]
    fn exits_need_exact_name_or_alias() {
        let exits = vec![
            ExitRecord::new("#5", "back door", "#1", "#2").with_aliases(&["storage", "store room"]),
            ExitRecord::new("#6", "south", "#1", "#3"),
        ];
        assert_eq!(resolve_exit(&exits, "storage").map(|e| e.id.as_str()), Some("#5"));
        assert_eq!(resolve_exit(&exits, "SOUTH").map(|e| e.id.as_str()), Some("#6"));
        assert!(resolve_exit(&exits, "door").is_none());
    }
}
