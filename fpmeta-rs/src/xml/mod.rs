//! XML parsing and output.
//!
//! Catalog files are read into node trees and written back with a stable
//! layout, so that applying the same changes twice leaves a file unchanged.

mod parser;
mod printer;

pub use parser::{parse_file, parse_str, XmlParser};
pub use printer::{
    print_to_string, print_to_string_pretty, write_file, XmlPrinter, XmlPrinterOptions,
};
