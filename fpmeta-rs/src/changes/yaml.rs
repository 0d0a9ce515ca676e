//! Loads change files into YAML values.
//!
//! Plain scalars are resolved with YAML 1.1 rules, so `Yes`, `off` and `NO`
//! are booleans and `0x1F` is a number. Quoted scalars, block scalars and
//! scalars with an explicit tag stay text.

use rustc_hash::FxHashMap;
use serde_yaml::{Mapping, Number, Value};
use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::TScalarStyle;

use crate::constants::GAME_KEY;
use crate::error::{Error, Result};

/// Loads every document of a change file, in order.
///
/// Loading stops at the first error, which is returned after the documents
/// that were complete before it.
pub(crate) fn load_documents(text: &str) -> Vec<Result<Value>> {
    let mut loader = Loader::default();
    if let Err(e) = Parser::new_from_str(text).load(&mut loader, true) {
        if loader.error.is_none() {
            loader.fail(e.to_string());
        }
    }

    let mut documents: Vec<Result<Value>> = loader.documents.into_iter().map(Ok).collect();
    documents.extend(loader.error.map(Err));
    documents
}

enum Frame {
    Sequence {
        items: Vec<Value>,
        anchor: usize,
    },
    Mapping {
        map: Mapping,
        key: Option<Value>,
        anchor: usize,
    },
}

/// Builds one value per document from parser events.
#[derive(Default)]
struct Loader {
    documents: Vec<Value>,
    error: Option<Error>,
    stack: Vec<Frame>,
    root: Option<Value>,
    anchors: FxHashMap<usize, Value>,
}

impl Loader {
    fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(Error::InvalidChangesSyntax {
            document: self.documents.len() + 1,
            message: message.into(),
        });
    }

    /// Attaches a finished node to the innermost open collection.
    fn add(&mut self, value: Value, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }

        let duplicate = match self.stack.last_mut() {
            None => {
                self.root = Some(value);
                None
            }
            Some(Frame::Sequence { items, .. }) => {
                items.push(value);
                None
            }
            Some(Frame::Mapping { map, key, .. }) => match key.take() {
                None => {
                    *key = Some(value);
                    None
                }
                // A repeated GAME key keeps the last value
                Some(k) => match map.insert(k.clone(), value) {
                    Some(_) if k.as_str() != Some(GAME_KEY) => Some(k),
                    _ => None,
                },
            },
        };

        if let Some(key) = duplicate {
            let name = match &key {
                Value::String(s) => s.clone(),
                other => format!("{:?}", other),
            };
            self.fail(format!("duplicate entry with key \"{}\"", name));
        }
    }
}

impl EventReceiver for Loader {
    fn on_event(&mut self, event: Event) {
        if self.error.is_some() {
            return;
        }

        match event {
            Event::DocumentEnd => {
                let root = self.root.take().unwrap_or(Value::Null);
                self.documents.push(root);
                self.stack.clear();
                self.anchors.clear();
            }
            Event::Scalar(text, style, anchor, tag) => {
                let value = if style == TScalarStyle::Plain && tag.is_none() {
                    resolve_plain(&text)
                } else {
                    Value::String(text)
                };
                self.add(value, anchor);
            }
            Event::Alias(anchor) => match self.anchors.get(&anchor).cloned() {
                Some(value) => self.add(value, 0),
                None => self.fail("alias refers to an unknown anchor"),
            },
            Event::SequenceStart(anchor, ..) => self.stack.push(Frame::Sequence {
                items: Vec::new(),
                anchor,
            }),
            Event::MappingStart(anchor, ..) => self.stack.push(Frame::Mapping {
                map: Mapping::new(),
                key: None,
                anchor,
            }),
            Event::SequenceEnd | Event::MappingEnd => {
                let (value, anchor) = match self.stack.pop() {
                    Some(Frame::Sequence { items, anchor }) => (Value::Sequence(items), anchor),
                    Some(Frame::Mapping { map, anchor, .. }) => (Value::Mapping(map), anchor),
                    None => return,
                };
                self.add(value, anchor);
            }
            _ => {}
        }
    }
}

/// Resolves an untagged plain scalar.
fn resolve_plain(text: &str) -> Value {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => Value::Null,
        "yes" | "Yes" | "YES" | "true" | "True" | "TRUE" | "on" | "On" | "ON" => Value::Bool(true),
        "no" | "No" | "NO" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" => {
            Value::Bool(false)
        }
        _ => parse_int(text)
            .map(|n| Value::Number(n.into()))
            .or_else(|| parse_float(text).map(|f| Value::Number(Number::from(f))))
            .unwrap_or_else(|| Value::String(text.to_string())),
    }
}

/// Decimal, `0x` hex, `0b` binary and leading-zero octal, with `_` separators.
fn parse_int(text: &str) -> Option<i64> {
    let (negative, body) = split_sign(text);
    let (radix, digits) = if let Some(hex) = body.strip_prefix("0x") {
        (16, hex)
    } else if let Some(bin) = body.strip_prefix("0b") {
        (2, bin)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };

    if !digits.starts_with(|c: char| c.is_digit(radix))
        || !digits.chars().all(|c| c == '_' || c.is_digit(radix))
    {
        return None;
    }
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    let value = i64::from_str_radix(&digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Numbers with a decimal point and an optional signed exponent.
fn parse_float(text: &str) -> Option<f64> {
    let (_, body) = split_sign(text);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };

    let (whole, fraction) = mantissa.split_once('.')?;
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit() || c == '_');
    let valid_mantissa = digits(whole)
        && digits(fraction)
        && (whole.starts_with(|c: char| c.is_ascii_digit())
            || (whole.is_empty() && fraction.starts_with(|c: char| c.is_ascii_digit())));
    let valid_exponent = exponent.is_none_or(|e| {
        e.strip_prefix(['+', '-'])
            .is_some_and(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
    });
    if !valid_mantissa || !valid_exponent {
        return None;
    }

    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    cleaned.parse().ok()
}

fn split_sign(text: &str) -> (bool, &str) {
    match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(text: &str) -> Value {
        let mut documents = load_documents(text);
        assert_eq!(documents.len(), 1);
        documents.remove(0).unwrap()
    }

    fn field(document: &Value, key: &str) -> Value {
        document.get(key).cloned().unwrap_or(Value::Null)
    }

    #[test]
    fn test_yaml_1_1_booleans() {
        let doc = single("a: Yes\nb: no\nc: ON\nd: off\ne: TRUE\nf: y\ng: yES\n");
        assert_eq!(field(&doc, "a"), Value::Bool(true));
        assert_eq!(field(&doc, "b"), Value::Bool(false));
        assert_eq!(field(&doc, "c"), Value::Bool(true));
        assert_eq!(field(&doc, "d"), Value::Bool(false));
        assert_eq!(field(&doc, "e"), Value::Bool(true));
        // Single letters and mixed casing are plain text
        assert_eq!(field(&doc, "f"), Value::String("y".into()));
        assert_eq!(field(&doc, "g"), Value::String("yES".into()));
    }

    #[test]
    fn test_quoted_and_tagged_scalars_stay_text() {
        let doc = single("a: \"Yes\"\nb: 'off'\nc: !!str no\nd: \"17\"\ne: |\n  yes\n");
        assert_eq!(field(&doc, "a"), Value::String("Yes".into()));
        assert_eq!(field(&doc, "b"), Value::String("off".into()));
        assert_eq!(field(&doc, "c"), Value::String("no".into()));
        assert_eq!(field(&doc, "d"), Value::String("17".into()));
        assert_eq!(field(&doc, "e"), Value::String("yes\n".into()));
    }

    #[test]
    fn test_nulls_and_numbers() {
        let doc = single("a:\nb: ~\nc: 692\nd: -1_000\ne: 0x1F\nf: 017\ng: 2.75\nh: 2010-05-01\ni: 1e5\n");
        assert_eq!(field(&doc, "a"), Value::Null);
        assert_eq!(field(&doc, "b"), Value::Null);
        assert_eq!(field(&doc, "c"), Value::Number(692.into()));
        assert_eq!(field(&doc, "d"), Value::Number((-1000).into()));
        assert_eq!(field(&doc, "e"), Value::Number(31.into()));
        assert_eq!(field(&doc, "f"), Value::Number(15.into()));
        assert_eq!(field(&doc, "g"), Value::Number(Number::from(2.75)));
        assert_eq!(field(&doc, "h"), Value::String("2010-05-01".into()));
        assert_eq!(field(&doc, "i"), Value::String("1e5".into()));
    }

    #[test]
    fn test_documents_and_nesting() {
        let documents = load_documents("GAME: a\nLanguages: [en, de]\n---\nGAME: b\nApps:\n  Demo:\n    Path: x\n");
        assert_eq!(documents.len(), 2);

        let first = documents[0].as_ref().unwrap();
        assert_eq!(
            field(first, "Languages"),
            Value::Sequence(vec![Value::String("en".into()), Value::String("de".into())])
        );
        let second = documents[1].as_ref().unwrap();
        assert_eq!(second["Apps"]["Demo"]["Path"], Value::String("x".into()));
    }

    #[test]
    fn test_anchors_and_aliases() {
        let doc = single("a: &shared [en, de]\nb: *shared\n");
        assert_eq!(field(&doc, "a"), field(&doc, "b"));
    }

    #[test]
    fn test_repeated_game_key_keeps_last() {
        let doc = single("GAME: 21\nGAME: 22\nTitle: Orange\n");
        assert_eq!(field(&doc, "GAME"), Value::Number(22.into()));
        assert_eq!(doc.as_mapping().map(Mapping::len), Some(2));
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let documents = load_documents("GAME: a\n---\nGAME: b\nTitle: x\nTitle: y\n");
        assert_eq!(documents.len(), 2);
        assert!(documents[0].is_ok());
        assert!(matches!(
            &documents[1],
            Err(Error::InvalidChangesSyntax { document: 2, message }) if message.contains("Title")
        ));
    }

    #[test]
    fn test_scan_error_reports_document() {
        let documents = load_documents("GAME: a\n---\nGAME: b\nTitle: [unclosed\n");
        assert!(documents[0].is_ok());
        assert!(matches!(
            documents.last(),
            Some(Err(Error::InvalidChangesSyntax { document: 2, .. }))
        ));
    }
}
