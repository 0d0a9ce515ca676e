//! Error types for fpmeta.

use thiserror::Error;

/// Result type alias for fpmeta operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How far an error reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The whole run is rejected before any document is touched.
    Fatal,
    /// Scoped to one game record in one document.
    Record,
    /// Reported once every candidate document has been scanned.
    Batch,
}

/// Errors that can occur while parsing change files or applying them.
#[derive(Error, Debug)]
pub enum Error {
    /// A change document has no usable `GAME` entry.
    #[error("Document {document} is missing a 'GAME' entry")]
    InvalidGameId { document: usize },

    /// A change touches something that may not be edited this way.
    #[error("{0}")]
    ForbiddenElementChange(String),

    /// The `---` separators do not line up with the `GAME:` entries.
    #[error(
        "Found {games} 'GAME:' entries but {separators} '---' separators. \
         Every game except the last must be followed by a line containing only '---'"
    )]
    NotEnoughDocuments { separators: usize, games: usize },

    /// Two documents target the same game.
    #[error("Game '{0}' appears in more than one document")]
    DuplicateGameId(String),

    /// Two keys in one document resolve to the same element.
    #[error("Document {document} changes the '{element}' element more than once")]
    DuplicateElement { document: usize, element: String },

    /// A document is not valid YAML, or not shaped like a change document.
    #[error("Invalid syntax in document {document}: {message}")]
    InvalidChangesSyntax { document: usize, message: String },

    /// The target record lacks an element and it is not creatable.
    #[error(
        "{game_id} is missing element: '{element}'. If you'd prefer the element be created \
         instead, add it on a new line in the elements whitelist"
    )]
    MissingElement { game_id: String, element: String },

    /// A required element or value is absent.
    #[error("{0}")]
    MissingElementValue(String),

    /// A game was not found in any candidate document.
    #[error("Unable to find game: '{0}'")]
    GameNotFound(String),

    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classifies the error by how much of a run it invalidates.
    ///
    /// `ForbiddenElementChange` is scoped to a record when the merge engine
    /// raises it. Any error returned by the change-file parser aborts the run.
    pub fn severity(&self) -> Severity {
        match self {
            Error::MissingElement { .. }
            | Error::MissingElementValue(_)
            | Error::ForbiddenElementChange(_) => Severity::Record,
            Error::GameNotFound(_) => Severity::Batch,
            _ => Severity::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_element_suggests_whitelist() {
        let err = Error::MissingElement {
            game_id: "g1".to_string(),
            element: "Series".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("g1 is missing element: 'Series'"));
        assert!(message.contains("elements whitelist"));
    }

    #[test]
    fn test_severity() {
        assert_eq!(
            Error::InvalidGameId { document: 1 }.severity(),
            Severity::Fatal
        );
        assert_eq!(
            Error::MissingElementValue("x".into()).severity(),
            Severity::Record
        );
        assert_eq!(Error::GameNotFound("g".into()).severity(), Severity::Batch);
    }
}
