#![doc = include_str!("../README.md")]

use std::io::Read;
use std::path::Path;

use tracing::debug;
use yamlet_parse::{Parser, ParserOptions, Scanner};
use yamlet_scanner::ScannerOptions;

pub use yamlet_parse::{Mark, Style};

mod builder;
pub use builder::NodeBuilder;

mod convert;
pub use convert::{Decode, Encode};

mod error;
pub use error::{Error, LoadError};

mod events;
pub use events::{NodeEvents, clone_via_events};

mod memory;
pub use memory::MAX_CLONE_DEPTH;

mod node;
pub use node::{CloneMode, Node, NodeId, NodeIndex, NodeKind};

/// Options for the `load` family of functions.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub parser: ParserOptions,
    pub scanner: ScannerOptions,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options passed to the parser.
    pub fn parser(mut self, options: ParserOptions) -> Self {
        self.parser = options;
        self
    }

    /// Options used when reading from a reader or file.
    pub fn scanner(mut self, options: ScannerOptions) -> Self {
        self.scanner = options;
        self
    }
}

/// Load the first document in `source`. An empty stream loads as null.
pub fn load(source: &str) -> Result<Node, LoadError> {
    load_with(source, &LoadOptions::default())
}

/// Like [`load`], with explicit options.
pub fn load_with(source: &str, options: &LoadOptions) -> Result<Node, LoadError> {
    first_document(Scanner::new(source), options)
}

/// Load the first document from a reader. The stream may be UTF-8 or
/// UTF-16/32 with a byte order mark.
pub fn load_reader(reader: impl Read, options: &LoadOptions) -> Result<Node, LoadError> {
    first_document(Scanner::from_reader(reader, &options.scanner), options)
}

/// Load the first document of a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Node, LoadError> {
    let path = path.as_ref();
    debug!("Loading {}", path.display());
    let file = std::fs::File::open(path)?;
    load_reader(std::io::BufReader::new(file), &LoadOptions::default())
}

/// Load every document in `source`.
pub fn load_all(source: &str) -> Result<Vec<Node>, LoadError> {
    load_all_with(source, &LoadOptions::default())
}

/// Like [`load_all`], with explicit options.
pub fn load_all_with(source: &str, options: &LoadOptions) -> Result<Vec<Node>, LoadError> {
    let mut parser = Parser::with_options(Scanner::new(source), options.parser.clone());
    let mut builder = NodeBuilder::new();
    parser.parse_all(&mut builder)?;
    Ok(builder.into_documents())
}

fn first_document(scanner: Scanner<'_>, options: &LoadOptions) -> Result<Node, LoadError> {
    let mut parser = Parser::with_options(scanner, options.parser.clone());
    let mut builder = NodeBuilder::new();
    parser.handle_next_document(&mut builder)?;
    Ok(builder.into_documents().into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests;
