//! Applying change sets to catalog documents.
//!
//! The engine walks every `Game` record of one document in order. Records
//! whose `ID` text is a key of the change set get their field changes
//! written in place, and the "Additional Applications" of a change are
//! matched against the `AdditionalApplication` records that point back to
//! the game.
//!
//! Each record is applied inside an [`EditLog`] checkpoint. A record that
//! fails is rewound and its error is kept in the [`MergeResult`]; the other
//! records of the document are unaffected.

mod edit_log;

pub use edit_log::{EditEntry, EditLog, EditType};

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::changes::{shorthand_error, ChangeSet};
use crate::config::MergeConfig;
use crate::constants::{
    shorthand_path, ADDITIONAL_APPLICATIONS_KEY, ADDITIONAL_APPLICATION_ELEMENT,
    APPLICATION_PATH_ELEMENT, APP_GAME_ID_ELEMENT, APP_ID_ELEMENT, APP_NAME_ELEMENT,
    AUTO_RUN_BEFORE_ELEMENT, COMMAND_LINE_ELEMENT, GAME_ELEMENT, ID_ELEMENT,
    WAIT_FOR_EXIT_ELEMENT,
};
use crate::error::{Error, Result};
use crate::node::{
    append_element, child_text, descendants_named, document_element, find_child, new_element,
    set_text, text_of, NodeInner, NodeRef,
};
use crate::value::{coerce, ChangeMap, ChangeValue};

/// Outcome of merging a change set into one document.
#[derive(Debug, Default)]
pub struct MergeResult {
    /// Games whose changes were fully applied.
    pub changed: BTreeSet<String>,
    /// Games that matched a record but could not be applied.
    pub failed: BTreeMap<String, Error>,
    /// Committed edits.
    pub edit_log: EditLog,
}

impl MergeResult {
    /// Returns true if the document was modified.
    pub fn is_modified(&self) -> bool {
        self.edit_log.edit_count() > 0
    }

    /// Every game that matched a record, whether or not it applied.
    pub fn matched(&self) -> impl Iterator<Item = &str> {
        self.changed
            .iter()
            .chain(self.failed.keys())
            .map(String::as_str)
    }

    pub fn elements_updated(&self) -> usize {
        self.edit_log.count_by_type(EditType::Update)
    }

    pub fn elements_created(&self) -> usize {
        self.edit_log.count_by_type(EditType::Insert) - self.applications_created()
    }

    pub fn applications_created(&self) -> usize {
        self.edit_log.count_inserted(ADDITIONAL_APPLICATION_ELEMENT)
    }
}

/// Applies change sets to parsed documents.
pub struct MergeEngine<'a> {
    config: &'a MergeConfig,
}

impl<'a> MergeEngine<'a> {
    pub fn new(config: &'a MergeConfig) -> Self {
        MergeEngine { config }
    }

    /// Applies `changes` to the document below `root`.
    ///
    /// The change set itself is never modified.
    pub fn merge_into_document(&self, changes: &ChangeSet, root: &NodeRef) -> MergeResult {
        let mut result = MergeResult::default();
        if changes.is_empty() {
            return result;
        }
        let Some(document) = document_element(root) else {
            return result;
        };

        let index: FxHashMap<&str, &ChangeMap> = changes.iter().collect();

        for game in descendants_named(&document, GAME_ELEMENT) {
            let Some(id_element) = find_child(&game, ID_ELEMENT) else {
                continue;
            };
            let Some(game_id) = text_of(&id_element).filter(|id| !id.is_empty()) else {
                debug!("skipping game record with an empty ID");
                continue;
            };
            let Some(game_changes) = index.get(game_id.as_str()) else {
                continue;
            };

            debug!(game_id = %game_id, "matched game record");
            result.edit_log.checkpoint();
            let applied = self.apply_fields(
                &document,
                &game,
                game_changes,
                &game_id,
                &game_id,
                false,
                &mut result.edit_log,
            );
            match applied {
                Ok(()) => {
                    result.edit_log.commit();
                    result.changed.insert(game_id);
                }
                Err(err) => {
                    result.edit_log.rewind();
                    warn!(game_id = %game_id, error = %err, "changes not applied");
                    result.failed.insert(game_id, err);
                }
            }
        }

        result
    }

    /// Writes `changes` into the children of `target`.
    ///
    /// `owner` names the record in error messages; `game_id` is the game the
    /// changes belong to.
    #[allow(clippy::too_many_arguments)]
    fn apply_fields(
        &self,
        document: &NodeRef,
        target: &NodeRef,
        changes: &ChangeMap,
        owner: &str,
        game_id: &str,
        in_application: bool,
        log: &mut EditLog,
    ) -> Result<()> {
        for (key, value) in changes.iter() {
            let key = self.config.aliases.canonicalize(key);

            if !in_application {
                if key == ID_ELEMENT {
                    return Err(Error::ForbiddenElementChange(format!(
                        "The '{}' element cannot be modified",
                        ID_ELEMENT
                    )));
                }
                if key == ADDITIONAL_APPLICATIONS_KEY {
                    let apps = value.as_sub_changes().ok_or_else(|| {
                        Error::ForbiddenElementChange(format!(
                            "'{}' must map application names to their changes",
                            ADDITIONAL_APPLICATIONS_KEY
                        ))
                    })?;
                    self.handle_additional_apps(document, game_id, apps, log)?;
                    continue;
                }
            }

            let text = coerce(value)?;
            self.write_field(target, key, &text, owner, log)?;
        }
        Ok(())
    }

    /// Sets the text of child `key`, creating it when whitelisted.
    fn write_field(
        &self,
        target: &NodeRef,
        key: &str,
        text: &str,
        owner: &str,
        log: &mut EditLog,
    ) -> Result<()> {
        if let Some(element) = find_child(target, key) {
            let previous = text_of(&element);
            if previous.as_deref().unwrap_or("") != text {
                set_text(&element, text);
                log.update(owner, key, element, previous);
            }
            Ok(())
        } else if self.config.creatable.contains(key) {
            let element = append_element(target, key, text);
            log.insert(owner, key, element);
            Ok(())
        } else {
            Err(Error::MissingElement {
                game_id: owner.to_string(),
                element: key.to_string(),
            })
        }
    }

    fn handle_additional_apps(
        &self,
        document: &NodeRef,
        game_id: &str,
        apps: &ChangeMap,
        log: &mut EditLog,
    ) -> Result<()> {
        let mut existing: FxHashMap<String, NodeRef> = FxHashMap::default();
        for app in descendants_named(document, ADDITIONAL_APPLICATION_ELEMENT) {
            if child_text(&app, APP_GAME_ID_ELEMENT).as_deref() != Some(game_id) {
                continue;
            }
            let name = child_text(&app, APP_NAME_ELEMENT).ok_or_else(|| {
                Error::MissingElementValue(format!(
                    "An additional application of {} has no '{}' value",
                    game_id, APP_NAME_ELEMENT
                ))
            })?;
            existing.insert(name, app);
        }

        for (app_name, value) in apps.iter() {
            if let Some(app) = existing.get(app_name) {
                let app_id = child_text(app, APP_ID_ELEMENT).unwrap_or_else(|| game_id.to_string());
                match value {
                    ChangeValue::SubChanges(fields) => {
                        self.apply_fields(document, app, fields, &app_id, game_id, true, log)?
                    }
                    leaf if shorthand_path(app_name).is_some() => {
                        self.write_field(app, COMMAND_LINE_ELEMENT, &coerce(leaf)?, &app_id, log)?
                    }
                    _ => return Err(shorthand_error()),
                }
                continue;
            }

            match value {
                ChangeValue::SubChanges(fields) => {
                    let path = self.required_field(app_name, fields, APPLICATION_PATH_ELEMENT)?;
                    let command_line = self.required_field(app_name, fields, COMMAND_LINE_ELEMENT)?;
                    let app = create_application(document, game_id, app_name, &path, &command_line, log);
                    self.apply_fields(document, &app, fields, game_id, game_id, true, log)?;
                }
                leaf => {
                    let path = shorthand_path(app_name).ok_or_else(shorthand_error)?;
                    create_application(document, game_id, app_name, path, &coerce(leaf)?, log);
                }
            }
        }
        Ok(())
    }

    /// Text of a field needed to create a new application.
    fn required_field(&self, app_name: &str, fields: &ChangeMap, element: &str) -> Result<String> {
        let value = fields
            .iter()
            .find(|(key, _)| self.config.aliases.canonicalize(key) == element)
            .map(|(_, value)| value);

        match value {
            Some(value) => coerce(value),
            None => {
                let aliases: String = self
                    .config
                    .aliases
                    .aliases_of(element)
                    .map(|alias| format!(" or '{}'", alias))
                    .collect();
                Err(Error::MissingElementValue(format!(
                    "{}: The '{}'{} key must be included in the metadata edit in order to \
                     create a new Additional Application",
                    app_name, element, aliases
                )))
            }
        }
    }
}

/// Appends a new `AdditionalApplication` record to the document element.
fn create_application(
    document: &NodeRef,
    game_id: &str,
    app_name: &str,
    application_path: &str,
    command_line: &str,
    log: &mut EditLog,
) -> NodeRef {
    let app = new_element(ADDITIONAL_APPLICATION_ELEMENT);
    let id = Uuid::new_v4().to_string();
    for (name, text) in [
        (APP_ID_ELEMENT, id.as_str()),
        (APP_GAME_ID_ELEMENT, game_id),
        (APP_NAME_ELEMENT, app_name),
        (APPLICATION_PATH_ELEMENT, application_path),
        (COMMAND_LINE_ELEMENT, command_line),
        (AUTO_RUN_BEFORE_ELEMENT, "false"),
        (WAIT_FOR_EXIT_ELEMENT, "false"),
    ] {
        append_element(&app, name, text);
    }

    NodeInner::add_child_to_ref(document, app.clone());
    log.insert(game_id, ADDITIONAL_APPLICATION_ELEMENT, app.clone());
    debug!(game_id, app_name, id = %id, "created additional application");
    app
}

/// Merges with a one-off engine.
pub fn merge_into_document(changes: &ChangeSet, root: &NodeRef, config: &MergeConfig) -> MergeResult {
    MergeEngine::new(config).merge_into_document(changes, root)
}
