//! Tag tokens and their translation through the directives.

use yamlet_scanner::{TagKind, Token};

use crate::Directives;

/// A tag property as written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub kind: TagKind,
    /// Handle name between the `!`s, for named handles.
    pub handle: String,
    pub value: String,
}

impl Tag {
    /// Read a tag token. Returns `None` for tokens that are not tags.
    pub fn from_token(token: &Token) -> Option<Self> {
        let kind = token.tag_kind()?;
        let (handle, value) = match kind {
            TagKind::NamedHandle => (
                token.value.clone(),
                token.params.first().cloned().unwrap_or_default(),
            ),
            TagKind::NonSpecific => (String::new(), String::new()),
            TagKind::Verbatim | TagKind::PrimaryHandle | TagKind::SecondaryHandle => {
                (String::new(), token.value.clone())
            }
        };
        Some(Self {
            kind,
            handle,
            value,
        })
    }

    /// The full tag after handle expansion.
    pub fn translate(&self, directives: &Directives) -> String {
        match self.kind {
            TagKind::Verbatim => self.value.clone(),
            TagKind::PrimaryHandle => directives.translate_tag_handle("!") + &self.value,
            TagKind::SecondaryHandle => directives.translate_tag_handle("!!") + &self.value,
            TagKind::NamedHandle => {
                directives.translate_tag_handle(&format!("!{}!", self.handle)) + &self.value
            }
            TagKind::NonSpecific => "!".to_string(),
        }
    }
}
