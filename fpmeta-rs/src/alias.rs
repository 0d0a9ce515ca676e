//! Human-friendly field names and the elements they stand for.

/// Built-in aliases, human-facing name first.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("Application Path", "ApplicationPath"),
    ("Command Line", "CommandLine"),
    ("Launch Command", "CommandLine"),
    ("Extreme", "Hide"),
    ("Note", "Notes"),
    ("Languages", "Language"),
    ("Release Date", "ReleaseDate"),
    ("Alternate Titles", "AlternateTitles"),
    ("Play Mode", "PlayMode"),
    ("Original Description", "OriginalDescription"),
];

/// Fixed mapping from alias to canonical element name.
///
/// Lookups are case-sensitive. Names without an alias pass through unchanged.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<(String, String)>,
}

impl AliasTable {
    /// Creates a table from `(alias, canonical)` pairs.
    pub fn new<I, A, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: Into<String>,
        C: Into<String>,
    {
        AliasTable {
            entries: entries
                .into_iter()
                .map(|(a, c)| (a.into(), c.into()))
                .collect(),
        }
    }

    /// Returns the canonical element name for `name`.
    pub fn canonicalize<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(alias, _)| alias == name)
            .map_or(name, |(_, canonical)| canonical.as_str())
    }

    /// Aliases that resolve to `canonical`.
    pub fn aliases_of<'a>(&'a self, canonical: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, c)| c == canonical)
            .map(|(a, _)| a.as_str())
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        AliasTable::new(DEFAULT_ALIASES.iter().copied())
    }
}
