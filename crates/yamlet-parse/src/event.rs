//! Event types for the event-based parser.

use std::fmt;

use yamlet_scanner::Mark;

/// 1-based anchor number, assigned per document in encounter order.
pub type AnchorId = usize;

/// Layout a collection was written in, or should be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    /// No preference.
    #[default]
    Default,
    /// Indentation based.
    Block,
    /// Bracketed.
    Flow,
}

/// Events emitted by the parser.
///
/// Collection tags are `?` when the document leaves them unspecified.
/// Scalar tags are `?` for untagged plain scalars and `!` for untagged
/// quoted or block scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Document boundaries
    /// Start of a document.
    DocumentStart { mark: Mark },
    /// End of a document.
    DocumentEnd,

    /// An anchor was declared; the anchored node follows.
    Anchor { mark: Mark, name: String },

    // Leaves
    /// A null node (empty, `~` or `null`).
    Null {
        mark: Mark,
        anchor: Option<AnchorId>,
    },
    /// Reference to an anchored node.
    Alias { mark: Mark, anchor: AnchorId },
    /// A scalar.
    Scalar {
        mark: Mark,
        tag: String,
        anchor: Option<AnchorId>,
        value: String,
    },

    // Collections
    /// Start of a sequence.
    SequenceStart {
        mark: Mark,
        tag: String,
        anchor: Option<AnchorId>,
        style: Style,
    },
    /// End of a sequence.
    SequenceEnd,
    /// Start of a map. Keys and values alternate until the end.
    MapStart {
        mark: Mark,
        tag: String,
        anchor: Option<AnchorId>,
        style: Style,
    },
    /// End of a map.
    MapEnd,
}

impl Event {
    /// Deliver this event to `handler`.
    pub fn send_to<H: EventHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            Event::DocumentStart { mark } => handler.on_document_start(*mark),
            Event::DocumentEnd => handler.on_document_end(),
            Event::Anchor { mark, name } => handler.on_anchor(*mark, name),
            Event::Null { mark, anchor } => handler.on_null(*mark, *anchor),
            Event::Alias { mark, anchor } => handler.on_alias(*mark, *anchor),
            Event::Scalar {
                mark,
                tag,
                anchor,
                value,
            } => handler.on_scalar(*mark, tag, *anchor, value),
            Event::SequenceStart {
                mark,
                tag,
                anchor,
                style,
            } => handler.on_sequence_start(*mark, tag, *anchor, *style),
            Event::SequenceEnd => handler.on_sequence_end(),
            Event::MapStart {
                mark,
                tag,
                anchor,
                style,
            } => handler.on_map_start(*mark, tag, *anchor, *style),
            Event::MapEnd => handler.on_map_end(),
        }
    }
}

fn write_properties(f: &mut fmt::Formatter<'_>, tag: &str, anchor: Option<AnchorId>) -> fmt::Result {
    if let Some(anchor) = anchor {
        write!(f, " &{}", anchor)?;
    }
    if !tag.is_empty() && tag != "?" {
        write!(f, " <{}>", tag)?;
    }
    Ok(())
}

/// One line per event, as used in event dumps.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::DocumentStart { .. } => f.write_str("+DOC"),
            Event::DocumentEnd => f.write_str("-DOC"),
            Event::Anchor { name, .. } => write!(f, "=ANCHOR {}", name),
            Event::Null { anchor, .. } => {
                f.write_str("=NULL")?;
                write_properties(f, "", *anchor)
            }
            Event::Alias { anchor, .. } => write!(f, "=ALI *{}", anchor),
            Event::Scalar {
                tag, anchor, value, ..
            } => {
                f.write_str("=VAL")?;
                write_properties(f, tag, *anchor)?;
                write!(f, " {:?}", value)
            }
            Event::SequenceStart {
                tag, anchor, style, ..
            } => {
                f.write_str(if *style == Style::Flow { "+SEQ []" } else { "+SEQ" })?;
                write_properties(f, tag, *anchor)
            }
            Event::SequenceEnd => f.write_str("-SEQ"),
            Event::MapStart {
                tag, anchor, style, ..
            } => {
                f.write_str(if *style == Style::Flow { "+MAP {}" } else { "+MAP" })?;
                write_properties(f, tag, *anchor)
            }
            Event::MapEnd => f.write_str("-MAP"),
        }
    }
}

/// Receives parse events.
///
/// Every method has a no-op default, so handlers only implement what they
/// care about.
pub trait EventHandler {
    fn on_document_start(&mut self, _mark: Mark) {}
    fn on_document_end(&mut self) {}
    fn on_anchor(&mut self, _mark: Mark, _name: &str) {}
    fn on_null(&mut self, _mark: Mark, _anchor: Option<AnchorId>) {}
    fn on_alias(&mut self, _mark: Mark, _anchor: AnchorId) {}
    fn on_scalar(&mut self, _mark: Mark, _tag: &str, _anchor: Option<AnchorId>, _value: &str) {}
    fn on_sequence_start(&mut self, _mark: Mark, _tag: &str, _anchor: Option<AnchorId>, _style: Style) {}
    fn on_sequence_end(&mut self) {}
    fn on_map_start(&mut self, _mark: Mark, _tag: &str, _anchor: Option<AnchorId>, _style: Style) {}
    fn on_map_end(&mut self) {}
}

impl<H: EventHandler + ?Sized> EventHandler for &mut H {
    fn on_document_start(&mut self, mark: Mark) {
        (**self).on_document_start(mark)
    }

    fn on_document_end(&mut self) {
        (**self).on_document_end()
    }

    fn on_anchor(&mut self, mark: Mark, name: &str) {
        (**self).on_anchor(mark, name)
    }

    fn on_null(&mut self, mark: Mark, anchor: Option<AnchorId>) {
        (**self).on_null(mark, anchor)
    }

    fn on_alias(&mut self, mark: Mark, anchor: AnchorId) {
        (**self).on_alias(mark, anchor)
    }

    fn on_scalar(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, value: &str) {
        (**self).on_scalar(mark, tag, anchor, value)
    }

    fn on_sequence_start(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        (**self).on_sequence_start(mark, tag, anchor, style)
    }

    fn on_sequence_end(&mut self) {
        (**self).on_sequence_end()
    }

    fn on_map_start(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        (**self).on_map_start(mark, tag, anchor, style)
    }

    fn on_map_end(&mut self) {
        (**self).on_map_end()
    }
}

/// Collects events in order.
impl EventHandler for Vec<Event> {
    fn on_document_start(&mut self, mark: Mark) {
        self.push(Event::DocumentStart { mark });
    }

    fn on_document_end(&mut self) {
        self.push(Event::DocumentEnd);
    }

    fn on_anchor(&mut self, mark: Mark, name: &str) {
        self.push(Event::Anchor {
            mark,
            name: name.to_string(),
        });
    }

    fn on_null(&mut self, mark: Mark, anchor: Option<AnchorId>) {
        self.push(Event::Null { mark, anchor });
    }

    fn on_alias(&mut self, mark: Mark, anchor: AnchorId) {
        self.push(Event::Alias { mark, anchor });
    }

    fn on_scalar(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, value: &str) {
        self.push(Event::Scalar {
            mark,
            tag: tag.to_string(),
            anchor,
            value: value.to_string(),
        });
    }

    fn on_sequence_start(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        self.push(Event::SequenceStart {
            mark,
            tag: tag.to_string(),
            anchor,
            style,
        });
    }

    fn on_sequence_end(&mut self) {
        self.push(Event::SequenceEnd);
    }

    fn on_map_start(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        self.push(Event::MapStart {
            mark,
            tag: tag.to_string(),
            anchor,
            style,
        });
    }

    fn on_map_end(&mut self) {
        self.push(Event::MapEnd);
    }
}
