//! Core schema tag resolution.

use yamlet_scanner::Mark;

use crate::{AnchorId, CORE_TAG_PREFIX, EventHandler, Style};

/// Passes events on to a client handler, replacing non-specific tags with
/// the core schema tags.
///
/// Untagged plain scalars resolve to `null`, `bool`, `int`, `float` or `str`;
/// untagged quoted scalars to `str`; untagged collections to `seq` or `map`.
/// `<<` resolves to `merge`.
#[derive(Debug)]
pub struct CoreTagResolver<H> {
    client: H,
}

impl<H: EventHandler> CoreTagResolver<H> {
    pub fn new(client: H) -> Self {
        Self { client }
    }

    pub fn into_inner(self) -> H {
        self.client
    }
}

/// Whether the tag was left to the application.
pub fn is_non_specific(tag: &str) -> bool {
    tag == "?" || tag == "!"
}

pub fn is_null(text: &str) -> bool {
    matches!(text, "null" | "Null" | "NULL" | "~")
}

pub fn is_bool(text: &str) -> bool {
    matches!(text, "true" | "True" | "TRUE" | "false" | "False" | "FALSE")
}

fn all_digits(text: &str, radix: u32) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_digit(radix))
}

pub fn is_int(text: &str) -> bool {
    if let Some(octal) = text.strip_prefix("0o") {
        return all_digits(octal, 8);
    }
    if let Some(hex) = text.strip_prefix("0x") {
        return all_digits(hex, 16);
    }
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    all_digits(digits, 10)
}

pub fn is_float(text: &str) -> bool {
    if matches!(text, ".nan" | ".NaN" | ".NAN") {
        return true;
    }
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    if matches!(unsigned, ".inf" | ".Inf" | ".INF") {
        return true;
    }

    let int_len = unsigned.chars().take_while(char::is_ascii_digit).count();
    let Some(rest) = unsigned[int_len..].strip_prefix('.') else {
        return false;
    };
    let frac_len = rest.chars().take_while(char::is_ascii_digit).count();
    if int_len == 0 && frac_len == 0 {
        return false;
    }
    let rest = &rest[frac_len..];
    if rest.is_empty() {
        return true;
    }
    let Some(exponent) = rest.strip_prefix(['e', 'E']) else {
        return false;
    };
    let exponent = exponent.strip_prefix(['-', '+']).unwrap_or(exponent);
    all_digits(exponent, 10)
}

/// The core schema tag for an untagged plain scalar.
pub fn resolve_plain(text: &str) -> &'static str {
    if is_null(text) {
        "null"
    } else if is_bool(text) {
        "bool"
    } else if is_int(text) {
        "int"
    } else if is_float(text) {
        "float"
    } else if text == "<<" {
        "merge"
    } else {
        "str"
    }
}

fn core(name: &str) -> String {
    format!("{}{}", CORE_TAG_PREFIX, name)
}

impl<H: EventHandler> EventHandler for CoreTagResolver<H> {
    fn on_document_start(&mut self, mark: Mark) {
        self.client.on_document_start(mark)
    }

    fn on_document_end(&mut self) {
        self.client.on_document_end()
    }

    fn on_anchor(&mut self, mark: Mark, name: &str) {
        self.client.on_anchor(mark, name)
    }

    fn on_null(&mut self, mark: Mark, anchor: Option<AnchorId>) {
        self.client.on_null(mark, anchor)
    }

    fn on_alias(&mut self, mark: Mark, anchor: AnchorId) {
        self.client.on_alias(mark, anchor)
    }

    fn on_scalar(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, value: &str) {
        match tag {
            "!" => self.client.on_scalar(mark, &core("str"), anchor, value),
            "?" => self
                .client
                .on_scalar(mark, &core(resolve_plain(value)), anchor, value),
            _ => self.client.on_scalar(mark, tag, anchor, value),
        }
    }

    fn on_sequence_start(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        if is_non_specific(tag) {
            self.client.on_sequence_start(mark, &core("seq"), anchor, style)
        } else {
            self.client.on_sequence_start(mark, tag, anchor, style)
        }
    }

    fn on_sequence_end(&mut self) {
        self.client.on_sequence_end()
    }

    fn on_map_start(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        if is_non_specific(tag) {
            self.client.on_map_start(mark, &core("map"), anchor, style)
        } else {
            self.client.on_map_start(mark, tag, anchor, style)
        }
    }

    fn on_map_end(&mut self) {
        self.client.on_map_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_scalars() {
        let cases = [
            ("~", "null"),
            ("NULL", "null"),
            ("True", "bool"),
            ("yes", "str"),
            ("-12", "int"),
            ("+0", "int"),
            ("0o17", "int"),
            ("0o18", "str"),
            ("0xfF", "int"),
            ("0x", "str"),
            ("1.5", "float"),
            (".5", "float"),
            ("5.", "float"),
            ("-1.5e+3", "float"),
            ("1.5e", "str"),
            ("1e3", "str"),
            (".", "str"),
            ("-.inf", "float"),
            (".NaN", "float"),
            ("-.nan", "str"),
            ("<<", "merge"),
            ("hello", "str"),
            ("", "str"),
        ];
        for (text, expected) in cases {
            assert_eq!(resolve_plain(text), expected, "{:?}", text);
        }
    }

    #[test]
    fn resolves_events() {
        let events = crate::parse_events_with(
            "a: !x [1, 'b']",
            &crate::ParserOptions::new().resolve_tags(true),
        )
        .unwrap();
        let tags: Vec<String> = events
            .iter()
            .filter_map(|event| match event {
                crate::Event::Scalar { tag, .. }
                | crate::Event::SequenceStart { tag, .. }
                | crate::Event::MapStart { tag, .. } => Some(tag.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            tags,
            [
                "tag:yaml.org,2002:map",
                "tag:yaml.org,2002:str",
                "!x",
                "tag:yaml.org,2002:int",
                "tag:yaml.org,2002:str",
            ]
        );
    }
}
