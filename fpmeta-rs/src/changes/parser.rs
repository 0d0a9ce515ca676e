//! Change-file parser.
//!
//! Validates the document layout, then loads each YAML document and
//! normalizes it into canonical element names and text values.

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::yaml::load_documents;
use super::ChangeSet;
use crate::alias::AliasTable;
use crate::constants::{
    shorthand_path, ADDITIONAL_APPLICATIONS_KEY, DOCUMENT_SEPARATOR, GAME_KEY, GAME_MARKER,
    ID_ELEMENT,
};
use crate::error::{Error, Result};
use crate::value::{coerce_yaml, ChangeMap, ChangeValue};

/// Parser turning change files into change sets.
pub struct ChangesParser<'a> {
    aliases: &'a AliasTable,
}

impl<'a> ChangesParser<'a> {
    /// Creates a new parser resolving field names through `aliases`.
    pub fn new(aliases: &'a AliasTable) -> Self {
        ChangesParser { aliases }
    }

    /// Parses a change file from a string.
    pub fn parse_str(&self, text: &str) -> Result<ChangeSet> {
        check_document_count(text)?;

        let mut changes = ChangeSet::new();
        for (index, document) in load_documents(text).into_iter().enumerate() {
            let value = document?;
            let (game_id, game_changes) = self.parse_document(index + 1, &value)?;
            debug!(game_id = %game_id, fields = game_changes.len(), "parsed change document");
            changes.insert(game_id, game_changes)?;
        }

        Ok(changes)
    }

    /// Parses a change file from disk.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ChangeSet> {
        let text = fs::read_to_string(path)?;
        self.parse_str(&text)
    }

    fn parse_document(&self, document: usize, value: &Value) -> Result<(String, ChangeMap)> {
        let mapping = match value {
            Value::Null => return Err(Error::InvalidGameId { document }),
            Value::Mapping(mapping) if mapping.is_empty() => {
                return Err(Error::InvalidGameId { document })
            }
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::InvalidChangesSyntax {
                    document,
                    message: "expected a list of 'Element: value' entries".to_string(),
                })
            }
        };

        let game = mapping
            .get(GAME_KEY)
            .ok_or(Error::InvalidGameId { document })?;

        if mapping.contains_key(ID_ELEMENT) {
            return Err(Error::ForbiddenElementChange(
                "The 'ID' element cannot be modified".to_string(),
            ));
        }

        let game_id = match game {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return Err(Error::InvalidGameId { document }),
        };

        let changes = self.normalize(document, mapping, false)?;
        Ok((game_id, changes))
    }

    /// Resolves aliases and converts values for one level of changes.
    fn normalize(
        &self,
        document: usize,
        mapping: &Mapping,
        in_application: bool,
    ) -> Result<ChangeMap> {
        let mut changes = ChangeMap::new();

        for (key, value) in mapping {
            let key = key_text(document, key)?;

            if !in_application {
                if key == GAME_KEY {
                    continue;
                }
                if key == ADDITIONAL_APPLICATIONS_KEY {
                    let apps = self.normalize_applications(document, value)?;
                    changes.insert(key, ChangeValue::SubChanges(apps));
                    continue;
                }
            }

            let canonical = self.aliases.canonicalize(&key);
            let change = ChangeValue::from_yaml(value).map_err(|_| {
                let names = if canonical == key {
                    format!("'{}'", key)
                } else {
                    format!("'{}' and '{}'", canonical, key)
                };
                Error::ForbiddenElementChange(format!("{} cannot have an object as a value", names))
            })?;

            if changes.insert(canonical, change).is_some() {
                return Err(Error::DuplicateElement {
                    document,
                    element: canonical.to_string(),
                });
            }
        }

        Ok(changes)
    }

    fn normalize_applications(&self, document: usize, value: &Value) -> Result<ChangeMap> {
        let Value::Mapping(apps) = value else {
            return Err(Error::ForbiddenElementChange(format!(
                "'{}' must list applications by name",
                ADDITIONAL_APPLICATIONS_KEY
            )));
        };

        let mut changes = ChangeMap::new();
        for (name, app) in apps {
            let name = key_text(document, name)?;
            let change = match app {
                Value::Mapping(fields) => {
                    ChangeValue::SubChanges(self.normalize(document, fields, true)?)
                }
                leaf if shorthand_path(&name).is_some() => ChangeValue::Scalar(coerce_yaml(leaf)?),
                _ => return Err(shorthand_error()),
            };
            changes.insert(name, change);
        }

        Ok(changes)
    }
}

pub(crate) fn shorthand_error() -> Error {
    Error::ForbiddenElementChange(format!(
        "Inside of the '{}' key, only 'Extras' and 'Message' can have a string as a value",
        ADDITIONAL_APPLICATIONS_KEY
    ))
}

/// Requires one `---` line between consecutive `GAME:` documents.
fn check_document_count(text: &str) -> Result<()> {
    let mut separators = 0;
    let mut games = 0;

    for line in text.lines() {
        if is_separator(line) {
            separators += 1;
        }
        if line.starts_with(GAME_MARKER) {
            games += 1;
        }
    }

    if separators + 1 != games {
        return Err(Error::NotEnoughDocuments { separators, games });
    }
    Ok(())
}

fn is_separator(line: &str) -> bool {
    line.strip_prefix(DOCUMENT_SEPARATOR)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn key_text(document: usize, key: &Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::InvalidChangesSyntax {
            document,
            message: "element names must be plain text".to_string(),
        }),
    }
}

/// Parses a change file from a string with the default aliases.
pub fn parse_changes(text: &str) -> Result<ChangeSet> {
    ChangesParser::new(&AliasTable::default()).parse_str(text)
}

/// Parses a change file from disk with the default aliases.
pub fn parse_changes_file<P: AsRef<Path>>(path: P) -> Result<ChangeSet> {
    ChangesParser::new(&AliasTable::default()).parse_file(path)
}
