//! XML printer that outputs node trees.
//!
//! Pretty output indents element-only content by two spaces and keeps
//! text-only elements on a single line, so that reading the output back
//! yields exactly the same text.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::constants::ROOT_NAME;
use crate::error::Result;
use crate::node::{NodeRef, XmlContent, XmlElement};

/// Options for XML printing.
#[derive(Debug, Clone)]
pub struct XmlPrinterOptions {
    /// Whether to pretty-print with indentation.
    pub pretty_print: bool,
}

impl Default for XmlPrinterOptions {
    fn default() -> Self {
        XmlPrinterOptions { pretty_print: true }
    }
}

/// XML printer that outputs node trees.
pub struct XmlPrinter<W: Write> {
    writer: W,
    options: XmlPrinterOptions,
}

impl<W: Write> XmlPrinter<W> {
    /// Creates a new XML printer.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, XmlPrinterOptions::default())
    }

    /// Creates a new XML printer with the given options.
    pub fn with_options(writer: W, options: XmlPrinterOptions) -> Self {
        XmlPrinter { writer, options }
    }

    /// Prints a parsed document, including the XML declaration.
    pub fn print(&mut self, root: &NodeRef) -> std::io::Result<()> {
        write!(self.writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        self.newline()?;
        self.print_node(root, 0)?;
        if !self.options.pretty_print {
            writeln!(self.writer)?;
        }
        self.writer.flush()
    }

    fn print_node(&mut self, node: &NodeRef, indent: usize) -> std::io::Result<()> {
        let borrowed = node.borrow();
        match borrowed.content() {
            Some(XmlContent::Element(element)) if element.qname() == ROOT_NAME => {
                for child in borrowed.children() {
                    self.print_node(child, indent)?;
                }
            }
            Some(XmlContent::Element(element)) => {
                self.pad(indent)?;
                self.open_tag(element)?;

                let children = borrowed.children();
                if children.is_empty() {
                    write!(self.writer, " />")?;
                } else if children
                    .iter()
                    .any(|c| c.borrow().content().is_some_and(XmlContent::is_text))
                {
                    // Any indentation would become part of the text
                    write!(self.writer, ">")?;
                    for child in children {
                        self.print_inline(child)?;
                    }
                    write!(self.writer, "</{}>", element.qname())?;
                } else {
                    write!(self.writer, ">")?;
                    self.newline()?;
                    for child in children {
                        self.print_node(child, indent + 1)?;
                    }
                    self.pad(indent)?;
                    write!(self.writer, "</{}>", element.qname())?;
                }
                self.newline()?;
            }
            Some(XmlContent::Text(text)) => {
                self.pad(indent)?;
                write!(self.writer, "{}", escape_text(text.text()))?;
                self.newline()?;
            }
            Some(XmlContent::Comment(comment)) => {
                self.pad(indent)?;
                write!(self.writer, "<!--{}-->", comment.text())?;
                self.newline()?;
            }
            None => {
                for child in borrowed.children() {
                    self.print_node(child, indent)?;
                }
            }
        }
        Ok(())
    }

    fn print_inline(&mut self, node: &NodeRef) -> std::io::Result<()> {
        let borrowed = node.borrow();
        match borrowed.content() {
            Some(XmlContent::Element(element)) => {
                self.open_tag(element)?;
                if borrowed.child_count() == 0 {
                    return write!(self.writer, " />");
                }
                write!(self.writer, ">")?;
                for child in borrowed.children() {
                    self.print_inline(child)?;
                }
                write!(self.writer, "</{}>", element.qname())
            }
            Some(XmlContent::Text(text)) => write!(self.writer, "{}", escape_text(text.text())),
            Some(XmlContent::Comment(comment)) => write!(self.writer, "<!--{}-->", comment.text()),
            None => Ok(()),
        }
    }

    fn open_tag(&mut self, element: &XmlElement) -> std::io::Result<()> {
        write!(self.writer, "<{}", element.qname())?;
        for (name, value) in element.attributes() {
            write!(self.writer, " {}=\"{}\"", name, escape_attribute(value))?;
        }
        Ok(())
    }

    fn pad(&mut self, indent: usize) -> std::io::Result<()> {
        if self.options.pretty_print {
            write!(self.writer, "{}", "  ".repeat(indent))?;
        }
        Ok(())
    }

    fn newline(&mut self) -> std::io::Result<()> {
        if self.options.pretty_print {
            writeln!(self.writer)?;
        }
        Ok(())
    }
}

/// Escapes text content.
fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escapes attribute values.
fn escape_attribute(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Prints a node tree to a string without indentation.
pub fn print_to_string(root: &NodeRef) -> std::io::Result<String> {
    let mut output = Vec::new();
    {
        let options = XmlPrinterOptions {
            pretty_print: false,
        };
        let mut printer = XmlPrinter::with_options(&mut output, options);
        printer.print(root)?;
    }
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Prints a node tree to a string with pretty printing.
pub fn print_to_string_pretty(root: &NodeRef) -> std::io::Result<String> {
    let mut output = Vec::new();
    XmlPrinter::new(&mut output).print(root)?;
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Writes a pretty-printed document to a file, replacing its contents.
///
/// The document is written to a temporary file in the same directory and
/// renamed over `path`, so a failed write leaves the old file in place.
pub fn write_file<P: AsRef<Path>>(root: &NodeRef, path: P) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    XmlPrinter::new(BufWriter::new(&mut tmp)).print(root)?;
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
