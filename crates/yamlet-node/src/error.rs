//! Node graph errors and their diagnostics.

use std::fmt;
use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use yamlet_parse::{Mark, ParseError};

/// Errors raised by node operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The node does not hold a value of the requested type.
    BadConversion { mark: Mark },
    /// Indexing into a scalar.
    BadSubscript { mark: Mark, key: String },
    /// Inserting into a node that cannot become a map.
    BadInsert,
    /// Appending to a node that is not a sequence.
    BadPushback,
    /// A deep clone nested deeper than the limit, usually because the graph
    /// contains itself.
    DeepRecursion { mark: Mark, limit: usize },
}

impl Error {
    /// Where the offending node was loaded from, if known.
    pub fn mark(&self) -> Option<Mark> {
        match self {
            Error::BadConversion { mark }
            | Error::BadSubscript { mark, .. }
            | Error::DeepRecursion { mark, .. } => Some(*mark),
            Error::BadInsert | Error::BadPushback => None,
        }
    }

    /// Whether this is a conversion failure, as opposed to a structural one.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Error::BadConversion { .. })
    }

    /// Render this error with ariadne, pointing at the node it concerns.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let start = self.mark().map_or(0, |mark| mark.offset.min(source.len()));
        let end = source
            .get(start..)
            .and_then(|rest| rest.chars().next())
            .map_or(start, |c| start + c.len_utf8());
        render_report(filename, source, start..end, &self.to_string(), self.help())
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Error::BadConversion { .. } => Some("check the node's kind before decoding it"),
            Error::BadSubscript { .. } => Some("only sequences and maps can be indexed"),
            Error::DeepRecursion { .. } => {
                Some("use CloneMode::UnshareSubtrees to copy graphs that contain themselves")
            }
            Error::BadInsert | Error::BadPushback => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadConversion { .. } => write!(f, "bad conversion"),
            Error::BadSubscript { key, .. } => {
                write!(f, "subscript on a scalar (key: \"{}\")", key)
            }
            Error::BadInsert => write!(f, "inserting in a non-convertible-to-map"),
            Error::BadPushback => write!(f, "appending to a non-sequence"),
            Error::DeepRecursion { limit, .. } => {
                write!(f, "deep recursion: nesting exceeds the clone limit of {}", limit)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Failure to load a document.
#[derive(Debug)]
pub enum LoadError {
    /// The input is not valid YAML.
    Parse(ParseError),
    /// The input could not be read.
    Io(std::io::Error),
}

impl LoadError {
    /// Render this error with ariadne.
    ///
    /// I/O errors have no source position and render as their message.
    pub fn render(&self, filename: &str, source: &str) -> String {
        match self {
            LoadError::Parse(error) => error.render(filename, source),
            LoadError::Io(error) => format!("{}: {}", filename, error),
        }
    }
}

impl From<ParseError> for LoadError {
    fn from(error: ParseError) -> Self {
        LoadError::Parse(error)
    }
}

impl From<std::io::Error> for LoadError {
    fn from(error: std::io::Error) -> Self {
        LoadError::Io(error)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Parse(error) => write!(f, "{}", error),
            LoadError::Io(error) => write!(f, "bad file: {}", error),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Parse(error) => Some(error),
            LoadError::Io(error) => Some(error),
        }
    }
}

fn render_report(
    filename: &str,
    source: &str,
    range: Range<usize>,
    message: &str,
    help: Option<&str>,
) -> String {
    let mut report = Report::build(ReportKind::Error, (filename, range.clone()))
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_message(message)
        .with_label(
            Label::new((filename, range))
                .with_message("this node")
                .with_color(Color::Red),
        );
    if let Some(help) = help {
        report = report.with_help(help);
    }
    let mut output = Vec::new();
    let _ = report
        .finish()
        .write((filename, Source::from(source)), &mut output);
    String::from_utf8(output).unwrap_or_else(|_| message.to_string())
}
