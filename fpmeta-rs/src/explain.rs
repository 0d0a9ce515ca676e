//! Human-readable summaries of change sets.

use std::fmt::Write;

use crate::changes::ChangeSet;
use crate::constants::{ADDITIONAL_APPLICATIONS_KEY, COMMAND_LINE_ELEMENT, EXPLAIN_INDENT};
use crate::error::{Error, Result};
use crate::value::{coerce, ChangeMap, ChangeValue};

/// Renders one block per game, in change-set order.
///
/// ```text
/// g1
///
///       "Title" element was changed to "Hello"
///
///       Additional application "Extras" (created or modified)
///             "CommandLine" element now has a value of "extras"
/// ```
pub fn explain(changes: &ChangeSet) -> Result<String> {
    let mut out = String::new();
    for (game_id, game_changes) in changes.iter() {
        out.push_str(game_id);
        out.push('\n');
        explain_fields(&mut out, game_changes)?;
        out.push('\n');
    }
    Ok(out)
}

fn explain_fields(out: &mut String, changes: &ChangeMap) -> Result<()> {
    for (element, value) in changes.iter() {
        if element == ADDITIONAL_APPLICATIONS_KEY {
            let apps = value.as_sub_changes().ok_or_else(|| invalid(element, value))?;
            for (app_name, app_changes) in apps.iter() {
                explain_application(out, app_name, app_changes)?;
            }
        } else {
            let _ = writeln!(
                out,
                "\n{}\"{}\" element was changed to \"{}\"",
                EXPLAIN_INDENT,
                element,
                coerce(value)?
            );
        }
    }
    Ok(())
}

fn explain_application(out: &mut String, app_name: &str, changes: &ChangeValue) -> Result<()> {
    let _ = writeln!(
        out,
        "\n{}Additional application \"{}\" (created or modified)",
        EXPLAIN_INDENT, app_name
    );
    let nested = EXPLAIN_INDENT.repeat(2);

    match changes {
        ChangeValue::SubChanges(fields) => {
            for (element, value) in fields.iter() {
                if matches!(value, ChangeValue::SubChanges(_)) {
                    return Err(invalid(element, value));
                }
                let _ = writeln!(
                    out,
                    "{}\"{}\" element was changed to \"{}\"",
                    nested,
                    element,
                    coerce(value)?
                );
            }
        }
        leaf => {
            let _ = writeln!(
                out,
                "{}\"{}\" element now has a value of \"{}\"",
                nested,
                COMMAND_LINE_ELEMENT,
                coerce(leaf)?
            );
        }
    }
    Ok(())
}

fn invalid(name: &str, value: &ChangeValue) -> Error {
    Error::ForbiddenElementChange(format!("Invalid value for '{}': {:?}", name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::parse_changes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_explain_fields() {
        let changes = parse_changes("GAME: g1\nTitle: Hello\nLanguages: [en, de]\n").unwrap();
        let text = explain(&changes).unwrap();

        assert_eq!(
            text,
            "g1\n\
             \n      \"Title\" element was changed to \"Hello\"\n\
             \n      \"Language\" element was changed to \"en; de\"\n\
             \n"
        );
    }

    #[test]
    fn test_explain_applications() {
        let changes = parse_changes(
            "GAME: g1\n\
             Additional Applications:\n  \
               Extras: extras\n  \
               Manual:\n    \
                 Application Path: manual.pdf\n    \
                 Launch Command: --open\n\
             ---\n\
             GAME: g2\n\
             Hide: true\n",
        )
        .unwrap();
        let text = explain(&changes).unwrap();

        let expected = [
            "g1",
            "",
            "      Additional application \"Extras\" (created or modified)",
            "            \"CommandLine\" element now has a value of \"extras\"",
            "",
            "      Additional application \"Manual\" (created or modified)",
            "            \"ApplicationPath\" element was changed to \"manual.pdf\"",
            "            \"CommandLine\" element was changed to \"--open\"",
            "",
            "g2",
            "",
            "      \"Hide\" element was changed to \"true\"",
            "",
            "",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_explain_empty_change_set() {
        assert_eq!(explain(&ChangeSet::new()).unwrap(), "");
    }

    #[test]
    fn test_explain_rejects_nested_mapping() {
        let nested: ChangeMap = [("Inner", ChangeValue::from("x"))].into_iter().collect();
        let mut changes = ChangeSet::new();
        changes
            .insert("g1", [("Title", ChangeValue::from(nested))].into_iter().collect())
            .unwrap();

        assert!(matches!(
            explain(&changes),
            Err(Error::ForbiddenElementChange(_))
        ));
    }
}
