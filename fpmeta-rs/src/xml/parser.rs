//! XML parser that builds node trees.
//!
//! This parser uses quick-xml's streaming API. Whitespace-only text between
//! elements is dropped. Any other text, including blank text that is the
//! only content of an element, is kept exactly as written.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::constants::ROOT_NAME;
use crate::error::{Error, Result};
use crate::node::{new_node, NodeInner, NodeRef, XmlComment, XmlContent, XmlElement, XmlText};

/// XML parser that builds node trees.
#[derive(Debug, Default)]
pub struct XmlParser;

impl XmlParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        XmlParser
    }

    /// Parses XML from a string.
    pub fn parse_str(&self, xml: &str) -> Result<NodeRef> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<NodeRef> {
        let file = File::open(path)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a quick-xml Reader.
    ///
    /// The returned node is a synthetic `$ROOT$` element whose children are
    /// the top-level nodes of the document.
    fn parse_reader<R: BufRead>(&self, reader: &mut Reader<R>) -> Result<NodeRef> {
        let root = new_node(Some(XmlContent::Element(XmlElement::named(ROOT_NAME))));

        let mut node_stack: Vec<NodeRef> = vec![root.clone()];
        let mut current_text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    flush_text(&mut current_text, &node_stack, false);
                    let node = new_node(Some(XmlContent::Element(self.parse_element(e, reader)?)));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node.clone());
                    }
                    node_stack.push(node);
                }
                Ok(Event::End(_)) => {
                    let leaf = node_stack.last().is_some_and(|n| !has_element_children(n));
                    flush_text(&mut current_text, &node_stack, leaf);
                    if node_stack.len() > 1 {
                        node_stack.pop();
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    // Self-closing tag - handle like Start + End
                    flush_text(&mut current_text, &node_stack, false);
                    let node = new_node(Some(XmlContent::Element(self.parse_element(e, reader)?)));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node);
                    }
                }
                Ok(Event::Text(e)) => {
                    let raw =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    let text = unescape(raw).map_err(|e| Error::Parse(e.to_string()))?;
                    current_text.push_str(&text);
                }
                Ok(Event::CData(e)) => {
                    current_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Some(c) = e
                        .resolve_char_ref()
                        .map_err(|e| Error::Parse(e.to_string()))?
                    {
                        current_text.push(c);
                    } else {
                        let name = e.decode().map_err(|e| Error::Parse(e.to_string()))?;
                        let resolved = resolve_predefined_entity(&name).ok_or_else(|| {
                            Error::Parse(format!("Unknown entity reference: &{};", name))
                        })?;
                        current_text.push_str(resolved);
                    }
                }
                Ok(Event::Comment(ref e)) => {
                    flush_text(&mut current_text, &node_stack, false);
                    let comment_text = String::from_utf8_lossy(e.as_ref()).to_string();
                    let comment = new_node(Some(XmlContent::Comment(XmlComment::new(comment_text))));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, comment);
                    }
                }
                Ok(Event::Decl(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {
                    // The printer writes its own declaration
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Parse(format!(
                        "error at position {}: {}",
                        reader.error_position(),
                        e
                    )))
                }
            }
            buf.clear();
        }

        if node_stack.len() > 1 {
            return Err(Error::Parse("unexpected end of document".to_string()));
        }

        Ok(root)
    }

    /// Parses an element's name and attributes.
    fn parse_element<R: BufRead>(&self, e: &BytesStart, reader: &Reader<R>) -> Result<XmlElement> {
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();

        let mut attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("Attribute error: {}", e)))?;
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            attributes.push((key, value));
        }

        Ok(XmlElement::new(name, attributes))
    }
}

/// Adds accumulated text to the current element.
///
/// Whitespace-only text is kept only when `keep_blank` is set, which the
/// caller does when closing an element that has no element children.
fn flush_text(text: &mut String, node_stack: &[NodeRef], keep_blank: bool) {
    if text.is_empty() || (!keep_blank && text.trim().is_empty()) {
        text.clear();
        return;
    }
    let node = new_node(Some(XmlContent::Text(XmlText::new(std::mem::take(text)))));
    if let Some(parent) = node_stack.last() {
        NodeInner::add_child_to_ref(parent, node);
    }
}

fn has_element_children(node: &NodeRef) -> bool {
    node.borrow()
        .children()
        .iter()
        .any(|c| c.borrow().content().is_some_and(XmlContent::is_element))
}

/// Parses XML from a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<NodeRef> {
    XmlParser::new().parse_file(path)
}

/// Parses XML from a string.
pub fn parse_str(xml: &str) -> Result<NodeRef> {
    XmlParser::new().parse_str(xml)
}
