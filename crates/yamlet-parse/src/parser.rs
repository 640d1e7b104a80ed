//! Event-based parser for YAML documents.
//!
//! The scanner does not produce tokens for block collections, so block
//! structure is read back from token columns: a block collection sits at the
//! column of its first key or `-`, and ends at the first token to its left.

use std::collections::HashMap;

use tracing::{debug, trace};
use yamlet_scanner::{Mark, Scanner, Token, TokenKind};

use crate::{AnchorId, CoreTagResolver, Directives, EventHandler, ParseError, ParseErrorKind, Style, Tag};

/// Options for [`Parser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Deepest nesting of collections accepted before failing.
    pub max_depth: usize,
    /// Run events through [`CoreTagResolver`] before the handler sees them.
    pub resolve_tags: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_depth: 500,
            resolve_tags: false,
        }
    }
}

impl ParserOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Resolve non-specific tags with the core schema.
    pub fn resolve_tags(mut self, resolve: bool) -> Self {
        self.resolve_tags = resolve;
        self
    }
}

/// Where a node appears, which decides how its first token is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// In block context, below a block collection at `indent` (-1 for the
    /// document root). A map value may hold a sequence at the map's column.
    Block { indent: isize, map_value: bool },
    /// Entry of a flow sequence, where `a: b` is a single-pair map.
    FlowSeq,
    /// Anywhere else in flow context.
    Flow,
}

/// Event-based parser for YAML streams.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    options: ParserOptions,
    directives: Directives,
    anchors: HashMap<String, AnchorId>,
    anchor_count: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser reading tokens from `scanner`.
    pub fn new(scanner: Scanner<'a>) -> Self {
        Self::with_options(scanner, ParserOptions::default())
    }

    /// Create a parser with explicit options.
    pub fn with_options(scanner: Scanner<'a>, options: ParserOptions) -> Self {
        Self {
            scanner,
            options,
            directives: Directives::default(),
            anchors: HashMap::new(),
            anchor_count: 0,
            depth: 0,
        }
    }

    /// Directives in effect for the most recent document.
    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    /// Parse the next document, sending its events to `handler`.
    ///
    /// Returns `false` once the stream holds no more documents.
    pub fn handle_next_document<H: EventHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Result<bool, ParseError> {
        self.parse_directives()?;
        if self.scanner.peek()?.is_none() {
            return Ok(false);
        }
        if self.options.resolve_tags {
            let mut resolver = CoreTagResolver::new(handler);
            self.handle_document(&mut resolver)?;
        } else {
            self.handle_document(handler)?;
        }
        Ok(true)
    }

    /// Parse every remaining document. Returns how many there were.
    pub fn parse_all<H: EventHandler + ?Sized>(&mut self, handler: &mut H) -> Result<usize, ParseError> {
        let mut count = 0;
        while self.handle_next_document(handler)? {
            count += 1;
        }
        Ok(count)
    }

    fn peek(&mut self) -> Result<Option<(TokenKind, Mark)>, ParseError> {
        Ok(self.scanner.peek()?.map(|token| (token.kind, token.mark)))
    }

    fn peek_kind(&mut self) -> Result<Option<TokenKind>, ParseError> {
        Ok(self.peek()?.map(|(kind, _)| kind))
    }

    fn pop(&mut self) -> Result<Token, ParseError> {
        self.scanner
            .scan_one()?
            .ok_or_else(|| ParseError::new(self.scanner.mark(), ParseErrorKind::UnexpectedEof))
    }

    /// Read directives before a document.
    ///
    /// A document without directives keeps those of the previous one.
    fn parse_directives(&mut self) -> Result<(), ParseError> {
        let mut read_directive = false;
        while let Some(token) = self.scanner.peek()? {
            if token.kind != TokenKind::Directive {
                break;
            }
            if !read_directive {
                self.directives = Directives::default();
                read_directive = true;
            }
            let token = self.pop()?;
            self.directives.apply(&token)?;
        }
        Ok(())
    }

    fn handle_document<H: EventHandler + ?Sized>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        self.anchors.clear();
        self.anchor_count = 0;
        self.depth = 0;

        let mark = self.peek()?.map_or(self.scanner.mark(), |(_, mark)| mark);
        debug!("Document start at {}", mark);
        handler.on_document_start(mark);
        if self.peek_kind()? == Some(TokenKind::DocStart) {
            self.pop()?;
        }

        self.parse_node(
            handler,
            Context::Block {
                indent: -1,
                map_value: false,
            },
        )?;
        handler.on_document_end();

        match self.peek()? {
            None => {}
            Some((TokenKind::DocStart | TokenKind::DocEnd | TokenKind::Directive, _)) => {}
            Some((_, mark)) => return Err(ParseError::new(mark, ParseErrorKind::TrailingContent)),
        }
        while self.peek_kind()? == Some(TokenKind::DocEnd) {
            self.pop()?;
        }
        debug!("Document end at {}", self.scanner.mark());
        Ok(())
    }

    fn parse_node<H: EventHandler + ?Sized>(&mut self, handler: &mut H, context: Context) -> Result<(), ParseError> {
        self.depth += 1;
        let result = if self.depth > self.options.max_depth {
            let mark = self.peek()?.map_or(self.scanner.mark(), |(_, mark)| mark);
            debug!("Depth limit {} exceeded at {}", self.options.max_depth, mark);
            Err(ParseError::new(mark, ParseErrorKind::DepthLimit(self.options.max_depth)))
        } else {
            self.parse_node_content(handler, context)
        };
        self.depth -= 1;
        result
    }

    fn parse_node_content<H: EventHandler + ?Sized>(
        &mut self,
        handler: &mut H,
        context: Context,
    ) -> Result<(), ParseError> {
        // An empty node is a possibility.
        let Some((kind, mark)) = self.peek()? else {
            handler.on_null(self.scanner.mark(), None);
            return Ok(());
        };

        // A value indicator by itself starts a map with an empty first key.
        if kind == TokenKind::Value {
            match context {
                Context::FlowSeq => {
                    handler.on_map_start(mark, "?", None, Style::Flow);
                    self.parse_compact_map(handler)?;
                    handler.on_map_end();
                }
                Context::Block { indent, .. } if column(mark) > indent => {
                    self.parse_block_map(handler, mark, "?", None)?;
                }
                _ => handler.on_null(mark, None),
            }
            return Ok(());
        }

        if kind == TokenKind::Alias {
            let token = self.pop()?;
            let anchor = self.lookup_anchor(&token)?;
            handler.on_alias(mark, anchor);
            return Ok(());
        }

        let (tag, anchor) = self.parse_properties(handler)?;

        // After the properties, an empty node is again a possibility.
        let Some(token) = self.scanner.peek()? else {
            emit_empty(handler, mark, tag, anchor);
            return Ok(());
        };
        let content = token.kind;
        let content_mark = token.mark;
        let content_column = column(content_mark);
        let tag = tag.unwrap_or_else(|| {
            if content == TokenKind::NonPlainScalar { "!" } else { "?" }.to_string()
        });

        if content == TokenKind::PlainScalar && tag == "?" && is_null_text(&token.value) {
            handler.on_null(mark, anchor);
            self.pop()?;
            return Ok(());
        }

        match (content, context) {
            (TokenKind::PlainScalar | TokenKind::NonPlainScalar, _) => {
                let token = self.pop()?;
                handler.on_scalar(mark, &tag, anchor, &token.value);
            }
            (TokenKind::FlowSeqStart, _) => {
                self.pop()?;
                handler.on_sequence_start(mark, &tag, anchor, Style::Flow);
                self.parse_flow_sequence(handler)?;
                handler.on_sequence_end();
            }
            (TokenKind::FlowMapStart, _) => {
                self.pop()?;
                handler.on_map_start(mark, &tag, anchor, Style::Flow);
                self.parse_flow_map(handler)?;
                handler.on_map_end();
            }
            (TokenKind::BlockEntry, Context::Block { indent, map_value })
                if content_column > indent || (map_value && content_column == indent) =>
            {
                let indentless = content_column == indent;
                handler.on_sequence_start(mark, &tag, anchor, Style::Block);
                self.parse_block_sequence(handler, content_column, indentless)?;
                handler.on_sequence_end();
            }
            (TokenKind::Key, Context::Block { indent, .. }) if content_column > indent => {
                self.parse_block_map(handler, content_mark, &tag, anchor)?;
            }
            (TokenKind::Key, Context::FlowSeq) => {
                handler.on_map_start(mark, &tag, anchor, Style::Flow);
                self.parse_compact_map(handler)?;
                handler.on_map_end();
            }
            (TokenKind::Alias, _) => {
                return Err(ParseError::new(mark, ParseErrorKind::AliasContent));
            }
            _ => emit_empty(handler, mark, Some(tag), anchor),
        }
        Ok(())
    }

    /// Read the tag and anchor in front of a node.
    ///
    /// The anchor is registered before the content, so the content may
    /// refer to it.
    fn parse_properties<H: EventHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Result<(Option<String>, Option<AnchorId>), ParseError> {
        let mut tag = None;
        let mut anchor = None;
        loop {
            match self.peek()? {
                Some((TokenKind::Tag, mark)) => {
                    if tag.is_some() {
                        return Err(ParseError::new(mark, ParseErrorKind::MultipleTags));
                    }
                    let token = self.pop()?;
                    tag = Tag::from_token(&token).map(|t| t.translate(&self.directives));
                }
                Some((TokenKind::Anchor, mark)) => {
                    if anchor.is_some() {
                        return Err(ParseError::new(mark, ParseErrorKind::MultipleAnchors));
                    }
                    let token = self.pop()?;
                    anchor = Some(self.register_anchor(&token.value));
                    handler.on_anchor(mark, &token.value);
                }
                _ => return Ok((tag, anchor)),
            }
        }
    }

    fn register_anchor(&mut self, name: &str) -> AnchorId {
        self.anchor_count += 1;
        let id = self.anchor_count;
        trace!("Anchor &{} registered as {}", name, id);
        // A redeclared name refers to the newest node from here on.
        self.anchors.insert(name.to_string(), id);
        id
    }

    fn lookup_anchor(&self, token: &Token) -> Result<AnchorId, ParseError> {
        self.anchors
            .get(&token.value)
            .copied()
            .ok_or_else(|| ParseError::new(token.mark, ParseErrorKind::UnknownAnchor(token.value.clone())))
    }

    /// Block sequence with entries at `indent`.
    fn parse_block_sequence<H: EventHandler + ?Sized>(
        &mut self,
        handler: &mut H,
        indent: isize,
        indentless: bool,
    ) -> Result<(), ParseError> {
        while let Some((kind, mark)) = self.peek()? {
            let col = column(mark);
            if kind == TokenKind::BlockEntry && col == indent {
                self.pop()?;
                self.parse_node(
                    handler,
                    Context::Block {
                        indent,
                        map_value: false,
                    },
                )?;
                continue;
            }
            if indentless || col < indent || ends_document(kind) {
                break;
            }
            return Err(ParseError::new(mark, ParseErrorKind::EndOfSeq));
        }
        Ok(())
    }

    /// Block map whose keys start at the column of `mark`.
    fn parse_block_map<H: EventHandler + ?Sized>(
        &mut self,
        handler: &mut H,
        mark: Mark,
        tag: &str,
        anchor: Option<AnchorId>,
    ) -> Result<(), ParseError> {
        let indent = column(mark);
        handler.on_map_start(mark, tag, anchor, Style::Block);
        while let Some((kind, entry_mark)) = self.peek()? {
            let col = column(entry_mark);
            match kind {
                TokenKind::Key | TokenKind::Value if col == indent => {
                    // grab key (if non-null)
                    if kind == TokenKind::Key {
                        self.pop()?;
                        self.parse_node(
                            handler,
                            Context::Block {
                                indent,
                                map_value: false,
                            },
                        )?;
                    } else {
                        handler.on_null(entry_mark, None);
                    }

                    // now grab value (optional)
                    match self.peek()? {
                        Some((TokenKind::Value, value_mark)) if column(value_mark) >= indent => {
                            self.pop()?;
                            self.parse_node(
                                handler,
                                Context::Block {
                                    indent,
                                    map_value: true,
                                },
                            )?;
                        }
                        _ => handler.on_null(entry_mark, None),
                    }
                }
                _ if col < indent || ends_document(kind) => break,
                _ => return Err(ParseError::new(entry_mark, ParseErrorKind::EndOfMap)),
            }
        }
        handler.on_map_end();
        Ok(())
    }

    fn parse_flow_sequence<H: EventHandler + ?Sized>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        loop {
            match self.peek_kind()? {
                None => return Err(ParseError::new(self.scanner.mark(), ParseErrorKind::EndOfSeqFlow)),
                Some(TokenKind::FlowSeqEnd) => {
                    self.pop()?;
                    return Ok(());
                }
                Some(_) => {}
            }

            self.parse_node(handler, Context::FlowSeq)?;

            // now eat the separator (or could be a sequence end, which we ignore)
            match self.peek()? {
                None => return Err(ParseError::new(self.scanner.mark(), ParseErrorKind::EndOfSeqFlow)),
                Some((TokenKind::FlowEntry, _)) => {
                    self.pop()?;
                }
                Some((TokenKind::FlowSeqEnd, _)) => {}
                Some((_, mark)) => return Err(ParseError::new(mark, ParseErrorKind::EndOfSeqFlow)),
            }
        }
    }

    fn parse_flow_map<H: EventHandler + ?Sized>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        loop {
            let Some((kind, mark)) = self.peek()? else {
                return Err(ParseError::new(self.scanner.mark(), ParseErrorKind::EndOfMapFlow));
            };
            if kind == TokenKind::FlowMapEnd {
                self.pop()?;
                return Ok(());
            }

            if kind == TokenKind::Key {
                self.pop()?;
                self.parse_node(handler, Context::Flow)?;
            } else {
                handler.on_null(mark, None);
            }
            if self.peek_kind()? == Some(TokenKind::Value) {
                self.pop()?;
                self.parse_node(handler, Context::Flow)?;
            } else {
                handler.on_null(mark, None);
            }

            match self.peek()? {
                None => return Err(ParseError::new(self.scanner.mark(), ParseErrorKind::EndOfMapFlow)),
                Some((TokenKind::FlowEntry, _)) => {
                    self.pop()?;
                }
                Some((TokenKind::FlowMapEnd, _)) => {}
                Some((_, mark)) => return Err(ParseError::new(mark, ParseErrorKind::EndOfMapFlow)),
            }
        }
    }

    /// Single-pair map inside a flow sequence: `[a: b]` or `[: b]`.
    fn parse_compact_map<H: EventHandler + ?Sized>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        let Some((kind, mark)) = self.peek()? else {
            return Ok(());
        };
        if kind == TokenKind::Key {
            self.pop()?;
            self.parse_node(handler, Context::Flow)?;
        } else {
            handler.on_null(mark, None);
        }
        if self.peek_kind()? == Some(TokenKind::Value) {
            self.pop()?;
            self.parse_node(handler, Context::Flow)?;
        } else {
            handler.on_null(mark, None);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("scanner", &self.scanner)
            .field("directives", &self.directives)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

fn column(mark: Mark) -> isize {
    mark.column as isize
}

fn ends_document(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::DocStart | TokenKind::DocEnd | TokenKind::Directive)
}

fn is_null_text(text: &str) -> bool {
    text.is_empty() || crate::resolver::is_null(text)
}

/// A node with properties but no content is an empty scalar, or null when
/// untagged.
fn emit_empty<H: EventHandler + ?Sized>(handler: &mut H, mark: Mark, tag: Option<String>, anchor: Option<AnchorId>) {
    match tag {
        Some(tag) if tag != "?" => handler.on_scalar(mark, &tag, anchor, ""),
        _ => handler.on_null(mark, anchor),
    }
}
