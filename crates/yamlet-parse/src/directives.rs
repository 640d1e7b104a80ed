//! `%YAML` and `%TAG` directive state.

use std::collections::HashMap;

use tracing::debug;
use yamlet_scanner::Token;

use crate::{ParseError, ParseErrorKind};

/// Prefix the `!!` handle expands to unless a `%TAG` directive overrides it.
pub const CORE_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// Directive state that applies to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directives {
    /// `(major, minor)` from `%YAML`.
    pub version: (u32, u32),
    /// Whether `version` is the default rather than a `%YAML` directive.
    pub version_is_default: bool,
    /// Tag handle to prefix, from `%TAG`.
    pub tags: HashMap<String, String>,
}

impl Default for Directives {
    fn default() -> Self {
        Self {
            version: (1, 2),
            version_is_default: true,
            tags: HashMap::new(),
        }
    }
}

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand a tag handle such as `!`, `!!` or `!e!` to its prefix.
    pub fn translate_tag_handle(&self, handle: &str) -> String {
        match self.tags.get(handle) {
            Some(prefix) => prefix.clone(),
            None if handle == "!!" => CORE_TAG_PREFIX.to_string(),
            None => handle.to_string(),
        }
    }

    /// Apply a directive token.
    ///
    /// Unknown directives are ignored.
    pub fn apply(&mut self, token: &Token) -> Result<(), ParseError> {
        match token.value.as_str() {
            "YAML" => self.apply_yaml(token),
            "TAG" => self.apply_tag(token),
            other => {
                debug!("Ignoring unknown directive %{} at {}", other, token.mark);
                Ok(())
            }
        }
    }

    fn apply_yaml(&mut self, token: &Token) -> Result<(), ParseError> {
        let [arg] = token.params.as_slice() else {
            return Err(ParseError::new(token.mark, ParseErrorKind::YamlDirectiveArgs));
        };
        if !self.version_is_default {
            return Err(ParseError::new(token.mark, ParseErrorKind::RepeatedYamlDirective));
        }
        let version = arg
            .split_once('.')
            .and_then(|(major, minor)| Some((major.parse().ok()?, minor.parse().ok()?)))
            .ok_or_else(|| ParseError::new(token.mark, ParseErrorKind::YamlVersion(arg.clone())))?;
        if version.0 > 1 {
            return Err(ParseError::new(token.mark, ParseErrorKind::YamlMajorVersion));
        }
        self.version = version;
        self.version_is_default = false;
        Ok(())
    }

    fn apply_tag(&mut self, token: &Token) -> Result<(), ParseError> {
        let [handle, prefix] = token.params.as_slice() else {
            return Err(ParseError::new(token.mark, ParseErrorKind::TagDirectiveArgs));
        };
        if self.tags.contains_key(handle) {
            return Err(ParseError::new(token.mark, ParseErrorKind::RepeatedTagDirective));
        }
        self.tags.insert(handle.clone(), prefix.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamlet_scanner::{Mark, TokenKind};

    fn directive(name: &str, params: &[&str]) -> Token {
        let mut token = Token::with_value(TokenKind::Directive, Mark::default(), name);
        token.params = params.iter().map(|p| p.to_string()).collect();
        token
    }

    fn error(directives: &mut Directives, name: &str, params: &[&str]) -> ParseErrorKind {
        directives.apply(&directive(name, params)).unwrap_err().kind
    }

    #[test]
    fn default_handles() {
        let directives = Directives::new();
        assert_eq!(directives.version, (1, 2));
        assert_eq!(directives.translate_tag_handle("!!"), "tag:yaml.org,2002:");
        assert_eq!(directives.translate_tag_handle("!"), "!");
        assert_eq!(directives.translate_tag_handle("!e!"), "!e!");
    }

    #[test]
    fn yaml_directive() {
        let mut directives = Directives::new();
        directives.apply(&directive("YAML", &["1.1"])).unwrap();
        assert_eq!(directives.version, (1, 1));
        assert!(!directives.version_is_default);
        assert_eq!(
            error(&mut directives, "YAML", &["1.2"]),
            ParseErrorKind::RepeatedYamlDirective
        );

        let mut directives = Directives::new();
        assert_eq!(
            error(&mut directives, "YAML", &["2.0"]),
            ParseErrorKind::YamlMajorVersion
        );
        assert_eq!(
            error(&mut directives, "YAML", &["1.x"]),
            ParseErrorKind::YamlVersion("1.x".to_string())
        );
        assert_eq!(
            error(&mut directives, "YAML", &["1.1", "1.2"]),
            ParseErrorKind::YamlDirectiveArgs
        );
    }

    #[test]
    fn tag_directive() {
        let mut directives = Directives::new();
        directives
            .apply(&directive("TAG", &["!e!", "tag:example.com,2000:"]))
            .unwrap();
        directives.apply(&directive("TAG", &["!!", "tag:other:"])).unwrap();
        assert_eq!(directives.translate_tag_handle("!e!"), "tag:example.com,2000:");
        assert_eq!(directives.translate_tag_handle("!!"), "tag:other:");
        assert_eq!(
            error(&mut directives, "TAG", &["!e!", "x"]),
            ParseErrorKind::RepeatedTagDirective
        );
        assert_eq!(
            error(&mut directives, "TAG", &["!f!"]),
            ParseErrorKind::TagDirectiveArgs
        );
    }

    #[test]
    fn unknown_directive_is_ignored() {
        let mut directives = Directives::new();
        directives.apply(&directive("FOO", &["bar"])).unwrap();
        assert_eq!(directives, Directives::new());
    }
}
