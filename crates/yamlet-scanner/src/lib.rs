#![doc = include_str!("../README.md")]

mod error;
pub mod exp;
mod mark;
pub mod scalar;
mod scanner;
pub mod stream;
pub mod tag;
mod token;

pub use error::{ScanError, ScanErrorKind};
pub use mark::Mark;
pub use scanner::{Scanner, ScannerOptions};
pub use stream::{EOF, Encoding, Stream, detect_encoding};
pub use token::{TagKind, Token, TokenKind};
