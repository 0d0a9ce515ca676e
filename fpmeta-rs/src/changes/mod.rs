//! Change sets and the change-file parser.
//!
//! A change file is a series of YAML documents, one per game, separated by
//! `---` lines. Parsing produces a [`ChangeSet`] keyed by game ID, with field
//! names resolved to their canonical element names.

mod parser;
mod yaml;

pub use parser::{parse_changes, parse_changes_file, ChangesParser};
pub(crate) use parser::shorthand_error;

use rustc_hash::FxHashMap;

use crate::constants::ADDITIONAL_APPLICATIONS_KEY;
use crate::error::{Error, Result};
use crate::value::ChangeMap;

/// Parsed changes for every game named in a change file, in file order.
///
/// Removed games leave an empty slot behind so that lookups and removals
/// stay constant time while iteration keeps file order.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    games: Vec<Option<(String, ChangeMap)>>,
    index: FxHashMap<String, usize>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    /// Adds the changes for a game. Each game may only be added once.
    pub fn insert(&mut self, game_id: impl Into<String>, changes: ChangeMap) -> Result<()> {
        let game_id = game_id.into();
        if self.contains(&game_id) {
            return Err(Error::DuplicateGameId(game_id));
        }
        self.index.insert(game_id.clone(), self.games.len());
        self.games.push(Some((game_id, changes)));
        Ok(())
    }

    pub fn get(&self, game_id: &str) -> Option<&ChangeMap> {
        let slot = *self.index.get(game_id)?;
        self.games[slot].as_ref().map(|(_, changes)| changes)
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.index.contains_key(game_id)
    }

    /// Removes a game, returning its changes.
    pub fn remove(&mut self, game_id: &str) -> Option<ChangeMap> {
        let slot = self.index.remove(game_id)?;
        let (_, changes) = self.games[slot].take()?;
        if self.index.is_empty() {
            self.games.clear();
        }
        Some(changes)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangeMap)> {
        self.games
            .iter()
            .flatten()
            .map(|(id, changes)| (id.as_str(), changes))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(id, _)| id)
    }

    /// Copies out the games whose ID satisfies `keep`, preserving order.
    pub fn subset<F>(&self, mut keep: F) -> ChangeSet
    where
        F: FnMut(&str) -> bool,
    {
        let mut subset = ChangeSet::new();
        for (id, changes) in self.iter().filter(|(id, _)| keep(id)) {
            subset.index.insert(id.to_string(), subset.games.len());
            subset.games.push(Some((id.to_string(), changes.clone())));
        }
        subset
    }
}

impl PartialEq for ChangeSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for ChangeSet {}

/// Returns the "Additional Applications" changes of a game, if any.
pub fn additional_applications(changes: &ChangeMap) -> Option<&ChangeMap> {
    changes
        .get(ADDITIONAL_APPLICATIONS_KEY)
        .and_then(|value| value.as_sub_changes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ChangeValue;

    fn title(text: &str) -> ChangeMap {
        [("Title", ChangeValue::from(text))].into_iter().collect()
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut set = ChangeSet::new();
        set.insert("g1", title("a")).unwrap();
        assert!(matches!(
            set.insert("g1", title("b")),
            Err(Error::DuplicateGameId(id)) if id == "g1"
        ));
        assert_eq!(set.get("g1"), Some(&title("a")));
    }

    #[test]
    fn test_remove_and_order() {
        let mut set = ChangeSet::new();
        for id in ["c", "a", "b"] {
            set.insert(id, title(id)).unwrap();
        }
        assert_eq!(set.remove("a"), Some(title("a")));
        assert_eq!(set.remove("a"), None);

        let ids: Vec<&str> = set.ids().collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(set.len(), 2);
        assert!(!set.contains("a"));
        assert_eq!(set.get("b"), Some(&title("b")));
    }

    #[test]
    fn test_removed_game_can_be_added_again() {
        let mut set = ChangeSet::new();
        set.insert("a", title("1")).unwrap();
        set.insert("b", title("2")).unwrap();
        set.remove("a");
        set.insert("a", title("3")).unwrap();

        let ids: Vec<&str> = set.ids().collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(set.get("a"), Some(&title("3")));
    }

    #[test]
    fn test_equality_ignores_removed_games() {
        let mut left = ChangeSet::new();
        left.insert("x", title("1")).unwrap();
        left.insert("y", title("2")).unwrap();
        left.remove("x");

        let mut right = ChangeSet::new();
        right.insert("y", title("2")).unwrap();
        assert_eq!(left, right);

        left.remove("y");
        assert_eq!(left, ChangeSet::new());
        assert!(left.is_empty());
    }

    #[test]
    fn test_subset() {
        let mut set = ChangeSet::new();
        for id in ["x", "y", "z"] {
            set.insert(id, title(id)).unwrap();
        }
        let subset = set.subset(|id| id != "y");
        let ids: Vec<&str> = subset.ids().collect();
        assert_eq!(ids, vec!["x", "z"]);
        assert_eq!(set.len(), 3);
    }
}
