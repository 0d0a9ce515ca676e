//! Merge configuration.
//!
//! Both the alias table and the creatable-elements whitelist are passed
//! explicitly into the parser and the merge engine.

use std::fs;
use std::path::Path;

use crate::alias::AliasTable;
use crate::error::Result;

/// Element names the merge engine may create on records that lack them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatableElements {
    names: Vec<String>,
}

impl CreatableElements {
    /// Creates a whitelist from names, keeping first occurrences in order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut whitelist = CreatableElements::default();
        for name in names {
            whitelist.push(name.into());
        }
        whitelist
    }

    /// Parses the whitelist file format: one name per line, blank lines skipped.
    pub fn parse(text: &str) -> Self {
        CreatableElements::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    /// Loads a whitelist file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    fn push(&mut self, name: String) {
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Immutable configuration shared by parsing and merging.
#[derive(Debug, Clone, Default)]
pub struct MergeConfig {
    pub aliases: AliasTable,
    pub creatable: CreatableElements,
}

impl MergeConfig {
    /// Default aliases with the given whitelist.
    pub fn with_creatable(creatable: CreatableElements) -> Self {
        MergeConfig {
            aliases: AliasTable::default(),
            creatable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_whitelist() {
        let whitelist = CreatableElements::parse("  Series\n\nNotes  \nSeries\r\nHide\n");
        let names: Vec<&str> = whitelist.iter().collect();
        assert_eq!(names, vec!["Series", "Notes", "Hide"]);
        assert!(whitelist.contains("Notes"));
        assert!(!whitelist.contains("Title"));
    }

    #[test]
    fn test_load_whitelist() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "NewElement").unwrap();
        writeln!(file, "Orange").unwrap();

        let whitelist = CreatableElements::load(file.path()).unwrap();
        assert_eq!(whitelist.len(), 2);
        assert!(whitelist.contains("Orange"));
    }

    #[test]
    fn test_load_missing_whitelist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CreatableElements::load(dir.path().join("absent.txt")).is_err());
    }
}
