#![doc = include_str!("../README.md")]

pub use yamlet_scanner::{Mark, ScanError, ScanErrorKind, Scanner};

mod diagnostic;
pub use diagnostic::ParseError;

mod directives;
pub use directives::{CORE_TAG_PREFIX, Directives};

mod error;
pub use error::ParseErrorKind;

mod event;
pub use event::{AnchorId, Event, EventHandler, Style};

mod parser;
pub use parser::{Parser, ParserOptions};

pub mod resolver;
pub use resolver::CoreTagResolver;

mod tag;
pub use tag::Tag;

/// Parse every document in `source` and collect the events.
pub fn parse_events(source: &str) -> Result<Vec<Event>, ParseError> {
    parse_events_with(source, &ParserOptions::default())
}

/// Like [`parse_events`], with explicit options.
pub fn parse_events_with(source: &str, options: &ParserOptions) -> Result<Vec<Event>, ParseError> {
    let mut parser = Parser::with_options(Scanner::new(source), options.clone());
    let mut events = Vec::new();
    parser.parse_all(&mut events)?;
    Ok(events)
}
