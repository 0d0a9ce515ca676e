//! Constants used throughout fpmeta.
//!
//! Element names follow the LaunchBox-style platform XML used by Flashpoint.

/// Key naming the target game in a change document.
pub const GAME_KEY: &str = "GAME";

/// Immutable identifier element of a game record.
pub const ID_ELEMENT: &str = "ID";

/// Element name of a game record.
pub const GAME_ELEMENT: &str = "Game";

/// Reserved change key holding per-application changes.
pub const ADDITIONAL_APPLICATIONS_KEY: &str = "Additional Applications";

/// Element name of an additional application record.
pub const ADDITIONAL_APPLICATION_ELEMENT: &str = "AdditionalApplication";

/// Generated identifier of an additional application.
pub const APP_ID_ELEMENT: &str = "Id";

/// Back-reference from an additional application to its game.
pub const APP_GAME_ID_ELEMENT: &str = "GameID";

/// Name of an additional application.
pub const APP_NAME_ELEMENT: &str = "Name";

pub const APPLICATION_PATH_ELEMENT: &str = "ApplicationPath";
pub const COMMAND_LINE_ELEMENT: &str = "CommandLine";
pub const AUTO_RUN_BEFORE_ELEMENT: &str = "AutoRunBefore";
pub const WAIT_FOR_EXIT_ELEMENT: &str = "WaitForExit";

/// Application name accepting a bare command line, and its path sentinel.
pub const EXTRAS_APP: &str = "Extras";
pub const EXTRAS_PATH: &str = ":extras:";

/// Application name accepting a bare command line, and its path sentinel.
pub const MESSAGE_APP: &str = "Message";
pub const MESSAGE_PATH: &str = ":message:";

/// Line separating change documents.
pub const DOCUMENT_SEPARATOR: &str = "---";

/// Line prefix marking the start of a change document.
pub const GAME_MARKER: &str = "GAME:";

/// Joiner for sequence values.
pub const SEQUENCE_SEPARATOR: &str = "; ";

/// Indentation unit of change explanations.
pub const EXPLAIN_INDENT: &str = "      ";

/// Default whitelist file name.
pub const WHITELIST_FILE: &str = "elements_whitelist.txt";

/// Synthetic root holding the parsed document element.
pub const ROOT_NAME: &str = "$ROOT$";

/// Returns the `ApplicationPath` sentinel for shorthand application names.
pub fn shorthand_path(app_name: &str) -> Option<&'static str> {
    match app_name {
        EXTRAS_APP => Some(EXTRAS_PATH),
        MESSAGE_APP => Some(MESSAGE_PATH),
        _ => None,
    }
}
