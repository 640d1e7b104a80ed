#![doc = include_str!("../README.md")]

mod emitter;
mod error;
mod options;
mod scalar;

pub use emitter::Emitter;
pub use error::EmitError;
pub use options::EmitterOptions;
pub use scalar::ScalarStyle;

use std::io::Write;

use tracing::debug;
use yamlet_node::{Node, NodeEvents};
use yamlet_parse::{Parser, ParserOptions, Scanner};

/// Write a node graph as YAML with default options.
pub fn to_string(node: &Node) -> String {
    to_string_with(node, &EmitterOptions::default())
}

/// Write a node graph as YAML.
///
/// The text has no final line break, except after a trailing `|` block
/// whose last line break belongs to the value. A graph always produces
/// balanced events, so this cannot fail.
pub fn to_string_with(node: &Node, options: &EmitterOptions) -> String {
    let mut emitter = Emitter::with_options(options.clone());
    NodeEvents::new(node).emit(&mut emitter);
    emitter.finish().unwrap_or_default()
}

/// Parse `source` and write it back out in canonical layout. Anchor names,
/// tags and collection styles are kept; comments and scalar styles are not.
pub fn reformat(source: &str) -> Result<String, EmitError> {
    let mut parser = Parser::with_options(Scanner::new(source), ParserOptions::default());
    let mut emitter = Emitter::new();
    let documents = parser.parse_all(&mut emitter)?;
    debug!(documents, "reformatted");
    emitter.finish()
}

/// Write several nodes to `writer` as a stream of documents.
pub fn dump(nodes: &[Node], mut writer: impl Write) -> Result<(), EmitError> {
    let mut emitter = Emitter::new();
    for node in nodes {
        NodeEvents::new(node).emit(&mut emitter);
    }
    let text = emitter.finish()?;
    writer.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
