//! End-to-end behavior of parsing, merging and batching through the public API.

use std::collections::BTreeSet;
use std::fs;

use fpmeta::node::{child_text, descendants_named};
use fpmeta::xml::{parse_file, parse_str, print_to_string_pretty};
use fpmeta::{
    explain, merge_into_document, parse_changes, run_batch, run_batch_files, ChangeValue,
    CreatableElements, Error, InPlaceWriter, MergeConfig, NodeRef, Severity,
};
use pretty_assertions::assert_eq;

fn game_field(root: &NodeRef, id: &str, element: &str) -> Option<String> {
    descendants_named(root, "Game")
        .into_iter()
        .find(|g| child_text(g, "ID").as_deref() == Some(id))
        .and_then(|g| child_text(&g, element))
}

#[test]
fn test_title_update_end_to_end() {
    let changes = parse_changes("GAME: g1\nTitle: Hello\n").unwrap();
    assert_eq!(
        changes.get("g1").and_then(|c| c.get("Title")),
        Some(&ChangeValue::from("Hello"))
    );

    let root = parse_str("<LaunchBox><Game><ID>g1</ID><Title>Old</Title></Game></LaunchBox>").unwrap();
    let result = merge_into_document(&changes, &root, &MergeConfig::default());

    assert_eq!(result.changed, BTreeSet::from(["g1".to_string()]));
    assert!(print_to_string_pretty(&root).unwrap().contains("<Title>Hello</Title>"));
}

#[test]
fn test_alias_and_canonical_name_parse_identically() {
    let aliased = parse_changes("GAME: g1\nLaunch Command: X\n").unwrap();
    let canonical = parse_changes("GAME: g1\nCommandLine: X\n").unwrap();
    assert_eq!(aliased, canonical);
}

#[test]
fn test_languages_sequence_in_two_documents() {
    let text = "GAME: g1\nTitle: A\nLanguages: [en, de, fr]\n---\nGAME: g2\nTitle: B\nLanguages: [en, de, fr]\n";
    let changes = parse_changes(text).unwrap();

    for id in ["g1", "g2"] {
        assert_eq!(
            changes.get(id).and_then(|c| c.get("Language")),
            Some(&ChangeValue::Sequence(vec!["en".into(), "de".into(), "fr".into()]))
        );
    }

    let root = parse_str(
        "<LaunchBox>\
         <Game><ID>g1</ID><Title /><Language /></Game>\
         <Game><ID>g2</ID><Title /><Language /></Game>\
         </LaunchBox>",
    )
    .unwrap();
    merge_into_document(&changes, &root, &MergeConfig::default());
    assert_eq!(game_field(&root, "g1", "Language").as_deref(), Some("en; de; fr"));
    assert_eq!(game_field(&root, "g2", "Language").as_deref(), Some("en; de; fr"));
}

#[test]
fn test_document_count_and_duplicates() {
    assert!(matches!(
        parse_changes("GAME: g1\nTitle: A\nGAME: g2\nTitle: B\n"),
        Err(Error::NotEnoughDocuments { .. })
    ));
    assert!(matches!(
        parse_changes("GAME: g1\nTitle: A\n---\nGAME: g1\nTitle: B\n"),
        Err(Error::DuplicateGameId(id)) if id == "g1"
    ));
}

#[test]
fn test_parse_errors_reject_the_whole_file() {
    let text = "GAME: g1\nTitle: Fine\n---\nGAME: g2\nTitle: {nested: map}\n";
    assert!(matches!(
        parse_changes(text),
        Err(Error::ForbiddenElementChange(_))
    ));

    let err = parse_changes("GAME: g1\nTitle: [unclosed\n").unwrap_err();
    assert!(matches!(err, Error::InvalidChangesSyntax { document: 1, .. }));
    assert_eq!(err.severity(), Severity::Fatal);
}

#[test]
fn test_extras_shorthand_creates_application() {
    let changes = parse_changes("GAME: g1\nAdditional Applications:\n  Extras: some text\n").unwrap();
    let root = parse_str("<LaunchBox><Game><ID>g1</ID></Game></LaunchBox>").unwrap();

    let result = merge_into_document(&changes, &root, &MergeConfig::default());
    assert!(result.changed.contains("g1"));

    let apps = descendants_named(&root, "AdditionalApplication");
    assert_eq!(apps.len(), 1);
    assert_eq!(child_text(&apps[0], "ApplicationPath").as_deref(), Some(":extras:"));
    assert_eq!(child_text(&apps[0], "CommandLine").as_deref(), Some("some text"));
    assert_eq!(child_text(&apps[0], "Name").as_deref(), Some("Extras"));
}

#[test]
fn test_missing_element_leaves_document_untouched() {
    let xml = "<LaunchBox><Game><ID>g1</ID><Title>Old</Title></Game></LaunchBox>";
    let root = parse_str(xml).unwrap();
    let before = print_to_string_pretty(&root).unwrap();

    let changes = parse_changes("GAME: g1\nSeries: Saga\n").unwrap();
    let result = merge_into_document(&changes, &root, &MergeConfig::default());

    let err = result.failed.get("g1").unwrap();
    assert_eq!(err.severity(), Severity::Record);
    assert!(err.to_string().contains("elements whitelist"));
    assert_eq!(print_to_string_pretty(&root).unwrap(), before);

    let whitelisted = MergeConfig::with_creatable(CreatableElements::new(["Series"]));
    let result = merge_into_document(&changes, &root, &whitelisted);
    assert!(result.failed.is_empty());
    assert_eq!(game_field(&root, "g1", "Series").as_deref(), Some("Saga"));
}

#[test]
fn test_unmatched_games_are_exactly_reported() {
    let changes = parse_changes("GAME: a\nTitle: 1\n---\nGAME: b\nTitle: 2\n---\nGAME: c\nTitle: 3\n").unwrap();
    let documents = vec![
        ("one".to_string(), parse_str("<LaunchBox><Game><ID>b</ID><Title /></Game></LaunchBox>").unwrap()),
        ("two".to_string(), parse_str("<LaunchBox />").unwrap()),
    ];

    let result = run_batch(changes, &documents, &MergeConfig::default());
    assert_eq!(result.not_found, vec!["a".to_string(), "c".to_string()]);
    for err in result.not_found_errors() {
        assert_eq!(err.severity(), Severity::Batch);
    }
}

#[test]
fn test_no_op_changes_keep_content() {
    let xml = "<?xml version=\"1.0\"?>\n<LaunchBox>\n<Game>\n<ID>g1</ID>\n<Title>Same</Title>\n\
               <Notes>  spaced\ntext </Notes>\n</Game>\n</LaunchBox>\n";
    let original = parse_str(xml).unwrap();
    let merged = parse_str(xml).unwrap();

    let changes = parse_changes("GAME: g1\nTitle: Same\n").unwrap();
    let result = merge_into_document(&changes, &merged, &MergeConfig::default());

    assert!(result.changed.contains("g1"));
    assert!(!result.is_modified());
    assert_eq!(
        print_to_string_pretty(&merged).unwrap(),
        print_to_string_pretty(&original).unwrap()
    );
}

#[test]
fn test_blank_field_survives_merge() {
    let xml = "<LaunchBox><Game><ID>g1</ID><Title>x</Title><Notes> </Notes></Game></LaunchBox>";
    let root = parse_str(xml).unwrap();

    let changes = parse_changes("GAME: g1\nTitle: y\n").unwrap();
    merge_into_document(&changes, &root, &MergeConfig::default());

    let output = print_to_string_pretty(&root).unwrap();
    assert!(output.contains("<Notes> </Notes>"));
    let reparsed = parse_str(&output).unwrap();
    assert_eq!(game_field(&reparsed, "g1", "Notes").as_deref(), Some(" "));
    assert_eq!(game_field(&reparsed, "g1", "Title").as_deref(), Some("y"));
}

#[test]
fn test_batch_over_files_with_explanation() {
    let dir = tempfile::tempdir().unwrap();
    let arcade = dir.path().join("Arcade.xml");
    let flash = dir.path().join("Flash.xml");
    fs::write(&arcade, "<LaunchBox><Game><ID>g1</ID><Title>A</Title></Game></LaunchBox>").unwrap();
    fs::write(&flash, "<LaunchBox><Game><ID>g2</ID><Title>B</Title></Game></LaunchBox>").unwrap();
    let flash_before = fs::read_to_string(&flash).unwrap();

    let changes = parse_changes("GAME: g1\nTitle: New A\n---\nGAME: g3\nTitle: Gone\n").unwrap();
    let result = run_batch_files(
        changes,
        &[&arcade, &flash],
        &MergeConfig::default(),
        &mut InPlaceWriter,
    )
    .unwrap();

    assert_eq!(game_field(&parse_file(&arcade).unwrap(), "g1", "Title").as_deref(), Some("New A"));
    // Not written, nothing applied there
    assert_eq!(fs::read_to_string(&flash).unwrap(), flash_before);
    assert_eq!(result.not_found, vec!["g3".to_string()]);

    let report = &result.documents[0];
    assert_eq!(
        explain(&report.applied).unwrap(),
        "g1\n\n      \"Title\" element was changed to \"New A\"\n\n"
    );
}
