//! Emitter errors.

use std::fmt;

use yamlet_parse::ParseError;

/// Errors raised while emitting.
#[derive(Debug)]
pub enum EmitError {
    /// A collection end without a matching start.
    UnbalancedEnd,
    /// A map ended between a key and its value.
    MissingValue,
    /// The document or stream ended with collections still open.
    Unclosed(usize),
    /// The source being reformatted is not valid YAML.
    Parse(ParseError),
    /// Writing the output failed.
    Io(std::io::Error),
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::UnbalancedEnd => write!(f, "collection end without a start"),
            EmitError::MissingValue => write!(f, "map ended after a key without a value"),
            EmitError::Unclosed(open) => write!(f, "{} collection(s) left open", open),
            EmitError::Parse(error) => write!(f, "{}", error),
            EmitError::Io(error) => write!(f, "write failed: {}", error),
        }
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmitError::Parse(error) => Some(error),
            EmitError::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ParseError> for EmitError {
    fn from(error: ParseError) -> Self {
        EmitError::Parse(error)
    }
}

impl From<std::io::Error> for EmitError {
    fn from(error: std::io::Error) -> Self {
        EmitError::Io(error)
    }
}
