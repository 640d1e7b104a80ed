//! Event-driven YAML writer.

use std::collections::HashMap;

use tracing::trace;
use yamlet_parse::{AnchorId, EventHandler, Mark, Style};

use crate::EmitError;
use crate::options::EmitterOptions;
use crate::scalar::{self, Placement, ScalarStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    BlockSeq,
    BlockMap,
    FlowSeq,
    FlowMap,
}

/// An open collection.
#[derive(Debug)]
struct Frame {
    layout: Layout,
    /// Column of the entries, for block layouts.
    indent: usize,
    /// Children written so far. Keys and values count separately.
    children: usize,
    /// The first entry goes on a new line rather than after the parent's
    /// indicator.
    break_first: bool,
    /// The current key was written after `?`.
    complex_key: bool,
    /// The current key was an alias, which needs a space before `:`.
    alias_key: bool,
}

impl Frame {
    fn is_flow(&self) -> bool {
        matches!(self.layout, Layout::FlowSeq | Layout::FlowMap)
    }

    fn is_map(&self) -> bool {
        matches!(self.layout, Layout::BlockMap | Layout::FlowMap)
    }

    fn expects_key(&self) -> bool {
        self.is_map() && self.children % 2 == 0
    }
}

/// Writes the events it receives as YAML text.
///
/// Collections keep the style they arrive with: flow collections stay on
/// one line, everything else is laid out in blocks. Anchor names announced
/// with `on_anchor` are reused; otherwise anchors are written by number.
#[derive(Debug)]
pub struct Emitter {
    options: EmitterOptions,
    out: String,
    frames: Vec<Frame>,
    needs_space: bool,
    /// A `|` literal was written last; its final line break is still owed.
    pending_break: bool,
    documents: usize,
    in_document: bool,
    pending_anchor: Option<String>,
    anchor_names: HashMap<AnchorId, String>,
    error: Option<EmitError>,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    /// Create an emitter with default options.
    pub fn new() -> Self {
        Self::with_options(EmitterOptions::default())
    }

    /// Create an emitter with the given options.
    pub fn with_options(options: EmitterOptions) -> Self {
        Self {
            options,
            out: String::new(),
            frames: Vec::new(),
            needs_space: false,
            pending_break: false,
            documents: 0,
            in_document: false,
            pending_anchor: None,
            anchor_names: HashMap::new(),
            error: None,
        }
    }

    /// The text written so far.
    pub fn output(&self) -> &str {
        &self.out
    }

    /// Finish and return the text, or the first error met.
    pub fn finish(mut self) -> Result<String, EmitError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.frames.is_empty() {
            return Err(EmitError::Unclosed(self.frames.len()));
        }
        if self.pending_break {
            self.out.push('\n');
        }
        Ok(self.out)
    }

    fn fail(&mut self, error: EmitError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Write a token, separated from what came before by a space if needed.
    fn put(&mut self, token: &str) {
        if self.needs_space {
            self.out.push(' ');
        }
        self.out.push_str(token);
        self.needs_space = true;
        self.pending_break = false;
    }

    fn newline(&mut self, indent: usize) {
        self.out.push('\n');
        self.out.extend(std::iter::repeat_n(' ', indent));
        self.needs_space = false;
        self.pending_break = false;
    }

    fn in_flow(&self) -> bool {
        self.frames.last().is_some_and(Frame::is_flow)
    }

    fn next_is_key(&self) -> bool {
        self.frames.last().is_some_and(Frame::expects_key)
    }

    /// Write what the parent collection puts in front of its next child.
    fn enter_child(&mut self, complex_key: bool) {
        if !self.in_document {
            self.on_document_start(Mark::default());
        }
        let separator = self.options.flow_separator;
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        let index = frame.children;
        frame.children += 1;
        let (layout, indent, break_first) = (frame.layout, frame.indent, frame.break_first);
        let starts_line = index > 0 || break_first;
        match layout {
            Layout::BlockSeq => {
                if starts_line {
                    self.newline(indent);
                }
                self.put("-");
            }
            Layout::BlockMap if index % 2 == 0 => {
                frame.complex_key = complex_key;
                frame.alias_key = false;
                if starts_line {
                    self.newline(indent);
                }
                if complex_key {
                    self.put("?");
                }
            }
            Layout::BlockMap => {
                let (complex, alias) = (frame.complex_key, frame.alias_key);
                if complex {
                    self.newline(indent);
                    self.put(":");
                } else {
                    if alias {
                        self.out.push(' ');
                    }
                    self.out.push(':');
                    self.needs_space = true;
                }
            }
            Layout::FlowSeq => {
                if index > 0 {
                    self.out.push_str(separator);
                    self.needs_space = false;
                }
            }
            Layout::FlowMap if index % 2 == 0 => {
                frame.alias_key = false;
                if index > 0 {
                    self.out.push_str(separator);
                    self.needs_space = false;
                }
                if complex_key {
                    self.put("?");
                }
            }
            Layout::FlowMap => {
                if frame.alias_key {
                    self.out.push(' ');
                }
                self.out.push_str(": ");
                self.needs_space = false;
            }
        }
    }

    /// Write the anchor and tag of a node. Returns whether anything was
    /// written.
    fn put_properties(&mut self, anchor: Option<AnchorId>, tag: Option<String>) -> bool {
        let name = self.pending_anchor.take();
        let mut written = false;
        if let Some(anchor) = anchor {
            let name = name.unwrap_or_else(|| anchor.to_string());
            self.put(&format!("&{}", name));
            self.anchor_names.insert(anchor, name);
            written = true;
        }
        if let Some(tag) = tag {
            self.put(&tag);
            written = true;
        }
        written
    }

    fn start_collection(&mut self, tag: &str, anchor: Option<AnchorId>, style: Style, map: bool) {
        let key = self.next_is_key();
        let parent = self
            .frames
            .last()
            .map(|frame| (frame.layout, frame.indent));
        let flow = key
            || self.in_flow()
            || self.options.force_flow
            || (style == Style::Flow && !self.options.force_block);
        self.enter_child(key);
        let tag = scalar::tag_text(tag, if map { "map" } else { "seq" });
        let has_properties = self.put_properties(anchor, tag);

        if flow {
            self.put(if map { "{" } else { "[" });
            self.needs_space = false;
            self.frames.push(Frame {
                layout: if map { Layout::FlowMap } else { Layout::FlowSeq },
                indent: 0,
                children: 0,
                break_first: false,
                complex_key: false,
                alias_key: false,
            });
            return;
        }

        let step = self.options.indent;
        let (indent, break_first) = match parent {
            None => (0, has_properties),
            // A map in a sequence starts on the dash line: `- a: 1`.
            Some((Layout::BlockSeq, indent)) if map && !has_properties => (indent + 2, false),
            Some((Layout::BlockSeq, indent)) => (indent + step, true),
            Some((_, indent)) if !map && !self.options.sequence_in_map_indent => (indent, true),
            Some((_, indent)) => (indent + step, true),
        };
        self.frames.push(Frame {
            layout: if map { Layout::BlockMap } else { Layout::BlockSeq },
            indent,
            children: 0,
            break_first,
            complex_key: false,
            alias_key: false,
        });
    }

    fn end_collection(&mut self) {
        let Some(frame) = self.frames.pop() else {
            self.fail(EmitError::UnbalancedEnd);
            return;
        };
        if frame.is_map() && frame.children % 2 == 1 {
            self.fail(EmitError::MissingValue);
        }
        match frame.layout {
            Layout::FlowSeq => self.out.push(']'),
            Layout::FlowMap => self.out.push('}'),
            Layout::BlockSeq if frame.children == 0 => self.put("[]"),
            Layout::BlockMap if frame.children == 0 => self.put("{}"),
            Layout::BlockSeq | Layout::BlockMap => {}
        }
        self.needs_space = true;
    }

    /// Indentation for the body of a literal block.
    fn literal_indent(&self) -> usize {
        let base = self
            .frames
            .iter()
            .rev()
            .find(|frame| !frame.is_flow())
            .map_or(0, |frame| frame.indent);
        base + self.options.indent
    }
}

impl EventHandler for Emitter {
    fn on_document_start(&mut self, _mark: Mark) {
        if self.documents > 0 {
            self.out.push_str("\n---\n");
        }
        self.documents += 1;
        trace!(document = self.documents, "emitting document");
        self.in_document = true;
        self.frames.clear();
        self.needs_space = false;
        self.pending_break = false;
    }

    fn on_document_end(&mut self) {
        if !self.frames.is_empty() {
            self.fail(EmitError::Unclosed(self.frames.len()));
            self.frames.clear();
        }
        self.in_document = false;
        self.anchor_names.clear();
    }

    fn on_anchor(&mut self, _mark: Mark, name: &str) {
        self.pending_anchor = Some(name.to_string());
    }

    fn on_null(&mut self, _mark: Mark, anchor: Option<AnchorId>) {
        self.enter_child(false);
        self.put_properties(anchor, None);
        let null = self.options.null_repr;
        self.put(null);
    }

    fn on_alias(&mut self, _mark: Mark, anchor: AnchorId) {
        let key = self.next_is_key();
        self.enter_child(false);
        self.pending_anchor = None;
        let name = self
            .anchor_names
            .get(&anchor)
            .cloned()
            .unwrap_or_else(|| anchor.to_string());
        self.put(&format!("*{}", name));
        if key {
            if let Some(frame) = self.frames.last_mut() {
                frame.alias_key = true;
            }
        }
    }

    fn on_scalar(&mut self, _mark: Mark, tag: &str, anchor: Option<AnchorId>, value: &str) {
        let placement = Placement {
            flow: self.in_flow(),
            key: self.next_is_key(),
        };
        self.enter_child(false);
        let style = scalar::choose_style(value, tag, placement);
        let tag = scalar::tag_text(tag, scalar::implied_type(value, style));
        self.put_properties(anchor, tag);
        match style {
            ScalarStyle::Plain => self.put(value),
            ScalarStyle::SingleQuoted => self.put(&scalar::single_quoted(value)),
            ScalarStyle::DoubleQuoted => self.put(&scalar::double_quoted(value)),
            ScalarStyle::Literal => {
                let indent = self.literal_indent();
                self.put(&scalar::literal(value, indent));
                self.pending_break = value.ends_with('\n');
            }
        }
    }

    fn on_sequence_start(&mut self, _mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        self.start_collection(tag, anchor, style, false);
    }

    fn on_sequence_end(&mut self) {
        self.end_collection();
    }

    fn on_map_start(&mut self, _mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        self.start_collection(tag, anchor, style, true);
    }

    fn on_map_end(&mut self) {
        self.end_collection();
    }
}
