//! The token scanner.
//!
//! Pull-based: tokens are produced on demand into a small queue. A plain or
//! quoted scalar (or a flow start, anchor, alias or tag) that might turn out
//! to be a mapping key gets a provisional `KEY` token in front of it. The
//! queue does not release anything past that token until a `:` confirms it
//! or something else rules it out.

use std::collections::VecDeque;
use std::io::Read;

use tracing::trace;

use crate::exp;
use crate::scalar::{Action, Chomp, Fold, ScalarEnd, ScalarParams, scan_scalar};
use crate::stream::{DEFAULT_PREFETCH, Stream};
use crate::tag::{scan_tag_handle, scan_tag_suffix, scan_verbatim_tag};
use crate::token::{TagKind, Token, TokenKind};
use crate::{Mark, ScanError, ScanErrorKind};

/// Simple keys must start and end on the same line, within this many bytes.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Valid,
    Invalid,
    Unverified,
}

#[derive(Debug)]
struct Queued {
    token: Token,
    status: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentKind {
    Seq,
    Map,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentStatus {
    Valid,
    Invalid,
    Unknown,
}

#[derive(Debug)]
struct IndentMarker {
    column: isize,
    kind: IndentKind,
    status: IndentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowMarker {
    Seq,
    Map,
}

#[derive(Debug, Clone, Copy)]
struct SimpleKey {
    mark: Mark,
    flow_level: usize,
    /// Position in the indent stack of the map indent this key opened, if any.
    indent: Option<usize>,
    /// Absolute number of the provisional `KEY` token.
    token: usize,
}

/// Options for scanning from a reader.
#[derive(Debug, Clone)]
pub struct ScannerOptions {
    /// Bytes requested from the reader per read (default: 2048)
    pub prefetch_size: usize,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            prefetch_size: DEFAULT_PREFETCH,
        }
    }
}

impl ScannerOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the read block size.
    pub fn prefetch_size(mut self, size: usize) -> Self {
        self.prefetch_size = size;
        self
    }
}

/// Turns a character stream into YAML tokens.
pub struct Scanner<'a> {
    stream: Stream<'a>,
    tokens: VecDeque<Queued>,
    /// Number of tokens already popped from the front of the queue.
    tokens_taken: usize,
    started: bool,
    ended: bool,
    error: Option<ScanError>,
    fused: bool,
    simple_key_allowed: bool,
    can_be_json_flow: bool,
    simple_keys: Vec<SimpleKey>,
    indents: Vec<IndentMarker>,
    flows: Vec<FlowMarker>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner over a stream, string or byte slice.
    pub fn new(input: impl Into<Stream<'a>>) -> Self {
        Self {
            stream: input.into(),
            tokens: VecDeque::new(),
            tokens_taken: 0,
            started: false,
            ended: false,
            error: None,
            fused: false,
            simple_key_allowed: false,
            can_be_json_flow: false,
            simple_keys: Vec::new(),
            indents: Vec::new(),
            flows: Vec::new(),
        }
    }

    /// Create a scanner reading from `reader`.
    pub fn from_reader(reader: impl Read + 'a, options: &ScannerOptions) -> Self {
        Self::new(Stream::with_capacity(reader, options.prefetch_size))
    }

    /// Current position in the input.
    pub fn mark(&self) -> Mark {
        self.stream.mark()
    }

    /// Whether another token (or a pending error) is available.
    pub fn has_more(&mut self) -> bool {
        match self.ensure_tokens_in_queue() {
            Ok(()) => !self.tokens.is_empty(),
            Err(_) => true,
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Token>, ScanError> {
        self.ensure_tokens_in_queue()?;
        Ok(self.tokens.front().map(|queued| &queued.token))
    }

    /// Produce the next token, `None` at the end of input.
    ///
    /// A failed scan keeps returning the same error.
    pub fn scan_one(&mut self) -> Result<Option<Token>, ScanError> {
        self.ensure_tokens_in_queue()?;
        let Some(queued) = self.tokens.pop_front() else {
            return Ok(None);
        };
        self.tokens_taken += 1;
        let token = queued.token;
        trace!("Token {} at {}: {:?}", token.kind, token.mark, token.value);
        Ok(Some(token))
    }

    fn in_flow(&self) -> bool {
        !self.flows.is_empty()
    }

    fn flow_level(&self) -> usize {
        self.flows.len()
    }

    fn top_indent(&self) -> isize {
        self.indents.last().map_or(0, |indent| indent.column)
    }

    fn push(&mut self, token: Token) {
        self.tokens.push_back(Queued {
            token,
            status: Status::Valid,
        });
    }

    fn push_kind(&mut self, kind: TokenKind, mark: Mark) {
        self.push(Token::new(kind, mark));
    }

    fn set_token_status(&mut self, absolute: usize, status: Status) {
        if let Some(queued) = absolute
            .checked_sub(self.tokens_taken)
            .and_then(|i| self.tokens.get_mut(i))
        {
            queued.status = status;
        }
    }

    fn ensure_tokens_in_queue(&mut self) -> Result<(), ScanError> {
        loop {
            if let Some(front) = self.tokens.front() {
                match front.status {
                    Status::Valid => return Ok(()),
                    Status::Invalid => {
                        self.tokens.pop_front();
                        self.tokens_taken += 1;
                        continue;
                    }
                    Status::Unverified => {}
                }
            }
            if let Some(error) = &self.error {
                // Whatever sits behind an unresolved key is unusable now.
                self.tokens_taken += self.tokens.len();
                self.tokens.clear();
                return Err(error.clone());
            }
            if self.ended {
                return Ok(());
            }
            if let Err(error) = self.scan_next_token() {
                self.error = Some(error);
            }
        }
    }

    fn scan_next_token(&mut self) -> Result<(), ScanError> {
        if self.ended {
            return Ok(());
        }
        if !self.started {
            self.start_stream();
            return Ok(());
        }

        self.scan_to_next_token();
        self.pop_indent_to_here();

        if !self.stream.has_more() {
            self.end_stream();
            return Ok(());
        }

        let c = self.stream.peek();
        let column = self.stream.column();

        if column == 0 && c == '%' {
            self.scan_directive();
            return Ok(());
        }
        if column == 0 && exp::DOC_START.matches(&mut self.stream) {
            self.scan_doc_marker(TokenKind::DocStart);
            return Ok(());
        }
        if column == 0 && exp::DOC_END.matches(&mut self.stream) {
            self.scan_doc_marker(TokenKind::DocEnd);
            return Ok(());
        }

        match c {
            '[' | '{' => {
                self.scan_flow_start();
                return Ok(());
            }
            ']' | '}' => return self.scan_flow_end(),
            ',' => {
                self.scan_flow_entry();
                return Ok(());
            }
            _ => {}
        }

        if exp::BLOCK_ENTRY.matches(&mut self.stream) {
            return self.scan_block_entry();
        }
        let key = if self.in_flow() {
            exp::KEY_IN_FLOW
        } else {
            exp::KEY
        };
        if key.matches(&mut self.stream) {
            return self.scan_key();
        }
        let value = if !self.in_flow() {
            exp::VALUE
        } else if self.can_be_json_flow {
            exp::VALUE_IN_JSON_FLOW
        } else {
            exp::VALUE_IN_FLOW
        };
        if value.matches(&mut self.stream) {
            return self.scan_value();
        }

        match c {
            '*' | '&' => return self.scan_anchor_or_alias(),
            '!' => return self.scan_tag(),
            '|' | '>' if !self.in_flow() => return self.scan_block_scalar(),
            '\'' | '"' => return self.scan_quoted_scalar(),
            _ => {}
        }

        let plain = if self.in_flow() {
            exp::PLAIN_SCALAR_IN_FLOW
        } else {
            exp::PLAIN_SCALAR
        };
        if exp::PLAIN_SCALAR_COMMON.matches(&mut self.stream) && plain.matches(&mut self.stream) {
            return self.scan_plain_scalar();
        }

        Err(ScanError::new(self.stream.mark(), ScanErrorKind::UnknownToken))
    }

    fn scan_to_next_token(&mut self) {
        loop {
            loop {
                let c = self.stream.peek();
                if c != ' ' && c != '\t' {
                    break;
                }
                // A tab may separate tokens but never indents a simple key.
                if c == '\t' && !self.in_flow() {
                    self.simple_key_allowed = false;
                }
                self.stream.eat(1);
            }

            if exp::COMMENT.matches(&mut self.stream) {
                while self.stream.has_more() && !exp::BREAK.matches(&mut self.stream) {
                    self.stream.eat(1);
                }
            }

            let Some(n) = exp::BREAK.match_len(&mut self.stream) else {
                break;
            };
            self.stream.eat(n);
            self.invalidate_simple_key();
            if !self.in_flow() {
                self.simple_key_allowed = true;
            }
        }
    }

    fn start_stream(&mut self) {
        self.started = true;
        self.simple_key_allowed = true;
        self.indents.push(IndentMarker {
            column: -1,
            kind: IndentKind::None,
            status: IndentStatus::Valid,
        });
    }

    fn end_stream(&mut self) {
        self.pop_all_indents();
        self.pop_all_simple_keys();
        self.simple_key_allowed = false;
        self.ended = true;
    }

    /// Push an indent for a block collection starting at `column`.
    ///
    /// Returns its position in the indent stack, or `None` when `column`
    /// does not open a new collection.
    fn push_indent_to(&mut self, column: usize, kind: IndentKind) -> Option<usize> {
        if self.in_flow() {
            return None;
        }
        let column = column as isize;
        let last = self.indents.last()?;
        if column < last.column {
            return None;
        }
        // An indentless sequence may share its parent map's column.
        if column == last.column && !(kind == IndentKind::Seq && last.kind == IndentKind::Map) {
            return None;
        }
        self.indents.push(IndentMarker {
            column,
            kind,
            status: IndentStatus::Valid,
        });
        Some(self.indents.len() - 1)
    }

    fn pop_indent_to_here(&mut self) {
        if self.in_flow() {
            return;
        }
        let column = self.stream.column() as isize;
        while let Some(indent) = self.indents.last() {
            if indent.column < column {
                break;
            }
            if indent.column == column
                && !(indent.kind == IndentKind::Seq && !exp::BLOCK_ENTRY.matches(&mut self.stream))
            {
                break;
            }
            self.pop_indent();
        }
        while self
            .indents
            .last()
            .is_some_and(|indent| indent.status == IndentStatus::Invalid)
        {
            self.pop_indent();
        }
    }

    fn pop_all_indents(&mut self) {
        if self.in_flow() {
            return;
        }
        while self
            .indents
            .last()
            .is_some_and(|indent| indent.kind != IndentKind::None)
        {
            self.pop_indent();
        }
    }

    fn pop_indent(&mut self) {
        if let Some(indent) = self.indents.pop()
            && indent.status != IndentStatus::Valid
        {
            self.invalidate_simple_key();
        }
    }

    fn can_insert_potential_simple_key(&self) -> bool {
        self.simple_key_allowed && !self.exists_active_simple_key()
    }

    fn exists_active_simple_key(&self) -> bool {
        self.simple_keys
            .last()
            .is_some_and(|key| key.flow_level == self.flow_level())
    }

    fn insert_potential_simple_key(&mut self) {
        if !self.can_insert_potential_simple_key() {
            return;
        }
        let mark = self.stream.mark();
        let mut indent = None;
        if !self.in_flow() {
            indent = self.push_indent_to(mark.column, IndentKind::Map);
            if let Some(i) = indent {
                self.indents[i].status = IndentStatus::Unknown;
            }
        }
        let token = self.tokens_taken + self.tokens.len();
        self.tokens.push_back(Queued {
            token: Token::new(TokenKind::Key, mark),
            status: Status::Unverified,
        });
        self.simple_keys.push(SimpleKey {
            mark,
            flow_level: self.flow_level(),
            indent,
            token,
        });
    }

    fn resolve_simple_key(&mut self, key: SimpleKey, valid: bool) {
        let (indent_status, token_status) = if valid {
            (IndentStatus::Valid, Status::Valid)
        } else {
            (IndentStatus::Invalid, Status::Invalid)
        };
        if let Some(indent) = key.indent.and_then(|i| self.indents.get_mut(i)) {
            indent.status = indent_status;
        }
        self.set_token_status(key.token, token_status);
    }

    fn invalidate_simple_key(&mut self) {
        let Some(&key) = self.simple_keys.last() else {
            return;
        };
        if key.flow_level != self.flow_level() {
            return;
        }
        self.simple_keys.pop();
        self.resolve_simple_key(key, false);
    }

    fn verify_simple_key(&mut self) -> bool {
        let Some(&key) = self.simple_keys.last() else {
            return false;
        };
        if key.flow_level != self.flow_level() {
            return false;
        }
        self.simple_keys.pop();
        let here = self.stream.mark();
        let valid =
            here.line == key.mark.line && here.offset - key.mark.offset <= MAX_SIMPLE_KEY_LENGTH;
        self.resolve_simple_key(key, valid);
        valid
    }

    fn pop_all_simple_keys(&mut self) {
        while let Some(key) = self.simple_keys.pop() {
            self.resolve_simple_key(key, false);
        }
    }

    fn scan_directive(&mut self) {
        self.pop_all_indents();
        self.pop_all_simple_keys();
        self.simple_key_allowed = false;
        self.can_be_json_flow = false;

        let mut token = Token::new(TokenKind::Directive, self.stream.mark());
        self.stream.eat(1);

        while self.stream.has_more() && !exp::BLANK_OR_BREAK.matches(&mut self.stream) {
            token.value.push(self.stream.get());
        }

        loop {
            while exp::BLANK.matches(&mut self.stream) {
                self.stream.eat(1);
            }
            if !self.stream.has_more()
                || exp::BREAK.matches(&mut self.stream)
                || exp::COMMENT.matches(&mut self.stream)
            {
                break;
            }
            let mut param = String::new();
            while self.stream.has_more() && !exp::BLANK_OR_BREAK.matches(&mut self.stream) {
                param.push(self.stream.get());
            }
            token.params.push(param);
        }

        self.push(token);
    }

    fn scan_doc_marker(&mut self, kind: TokenKind) {
        self.pop_all_indents();
        self.pop_all_simple_keys();
        self.simple_key_allowed = false;
        self.can_be_json_flow = false;

        let mark = self.stream.mark();
        self.stream.eat(3);
        self.push_kind(kind, mark);
    }

    fn scan_flow_start(&mut self) {
        // A whole flow collection can be a simple key.
        self.insert_potential_simple_key();
        self.simple_key_allowed = true;
        self.can_be_json_flow = false;

        let mark = self.stream.mark();
        let kind = if self.stream.get() == '[' {
            self.flows.push(FlowMarker::Seq);
            TokenKind::FlowSeqStart
        } else {
            self.flows.push(FlowMarker::Map);
            TokenKind::FlowMapStart
        };
        self.push_kind(kind, mark);
    }

    /// Close a solo flow entry: `{a}` means `{a: ~}`, while `[a]` drops the key.
    fn end_flow_entry(&mut self) {
        match self.flows.last() {
            Some(FlowMarker::Map) => {
                if self.verify_simple_key() {
                    let mark = self.stream.mark();
                    self.push_kind(TokenKind::Value, mark);
                }
            }
            Some(FlowMarker::Seq) => self.invalidate_simple_key(),
            None => {}
        }
    }

    fn scan_flow_end(&mut self) -> Result<(), ScanError> {
        if !self.in_flow() {
            return Err(ScanError::new(self.stream.mark(), ScanErrorKind::FlowEnd));
        }
        self.end_flow_entry();
        self.simple_key_allowed = false;
        self.can_be_json_flow = true;

        let mark = self.stream.mark();
        let (marker, kind) = if self.stream.get() == ']' {
            (FlowMarker::Seq, TokenKind::FlowSeqEnd)
        } else {
            (FlowMarker::Map, TokenKind::FlowMapEnd)
        };
        if self.flows.last() != Some(&marker) {
            return Err(ScanError::new(mark, ScanErrorKind::FlowEnd));
        }
        self.flows.pop();
        self.push_kind(kind, mark);
        Ok(())
    }

    fn scan_flow_entry(&mut self) {
        self.end_flow_entry();
        self.simple_key_allowed = true;
        self.can_be_json_flow = false;

        let mark = self.stream.mark();
        self.stream.eat(1);
        self.push_kind(TokenKind::FlowEntry, mark);
    }

    fn scan_block_entry(&mut self) -> Result<(), ScanError> {
        if self.in_flow() || !self.simple_key_allowed {
            return Err(ScanError::new(self.stream.mark(), ScanErrorKind::BlockEntry));
        }
        let mark = self.stream.mark();
        self.push_indent_to(mark.column, IndentKind::Seq);
        self.simple_key_allowed = true;
        self.can_be_json_flow = false;

        self.stream.eat(1);
        self.push_kind(TokenKind::BlockEntry, mark);
        Ok(())
    }

    fn scan_key(&mut self) -> Result<(), ScanError> {
        let mark = self.stream.mark();
        if !self.in_flow() {
            if !self.simple_key_allowed {
                return Err(ScanError::new(mark, ScanErrorKind::MapKey));
            }
            self.push_indent_to(mark.column, IndentKind::Map);
        }
        self.simple_key_allowed = !self.in_flow();

        self.stream.eat(1);
        self.push_kind(TokenKind::Key, mark);
        Ok(())
    }

    fn scan_value(&mut self) -> Result<(), ScanError> {
        let is_simple_key = self.verify_simple_key();
        self.can_be_json_flow = false;

        let mark = self.stream.mark();
        if is_simple_key {
            self.simple_key_allowed = false;
        } else {
            if !self.in_flow() {
                if !self.simple_key_allowed {
                    return Err(ScanError::new(mark, ScanErrorKind::MapValue));
                }
                self.push_indent_to(mark.column, IndentKind::Map);
            }
            self.simple_key_allowed = !self.in_flow();
        }

        self.stream.eat(1);
        self.push_kind(TokenKind::Value, mark);
        Ok(())
    }

    fn scan_anchor_or_alias(&mut self) -> Result<(), ScanError> {
        self.insert_potential_simple_key();
        self.simple_key_allowed = false;
        self.can_be_json_flow = false;

        let mark = self.stream.mark();
        let alias = self.stream.get() == '*';

        let mut name = String::new();
        while self.stream.has_more() && exp::ANCHOR.matches(&mut self.stream) {
            name.push(self.stream.get());
        }

        if name.is_empty() {
            let kind = if alias {
                ScanErrorKind::AliasNotFound
            } else {
                ScanErrorKind::AnchorNotFound
            };
            return Err(ScanError::new(self.stream.mark(), kind));
        }
        if self.stream.has_more() && !exp::ANCHOR_END.matches(&mut self.stream) {
            let kind = if alias {
                ScanErrorKind::CharInAlias
            } else {
                ScanErrorKind::CharInAnchor
            };
            return Err(ScanError::new(self.stream.mark(), kind));
        }

        let kind = if alias {
            TokenKind::Alias
        } else {
            TokenKind::Anchor
        };
        self.push(Token::with_value(kind, mark, name));
        Ok(())
    }

    fn scan_tag(&mut self) -> Result<(), ScanError> {
        self.insert_potential_simple_key();
        self.simple_key_allowed = false;
        self.can_be_json_flow = false;

        let mut token = Token::new(TokenKind::Tag, self.stream.mark());
        self.stream.eat(1);

        if self.stream.peek() == '<' {
            token.value = scan_verbatim_tag(&mut self.stream)?;
            token.data = TagKind::Verbatim.data();
        } else {
            let (handle, can_be_handle) = scan_tag_handle(&mut self.stream)?;
            let kind = if !can_be_handle && handle.is_empty() {
                TagKind::NonSpecific
            } else if handle.is_empty() {
                TagKind::SecondaryHandle
            } else {
                TagKind::PrimaryHandle
            };
            token.value = handle;
            token.data = kind.data();

            if can_be_handle && self.stream.peek() == '!' {
                self.stream.eat(1);
                token.params.push(scan_tag_suffix(&mut self.stream)?);
                token.data = TagKind::NamedHandle.data();
            }
        }

        self.push(token);
        Ok(())
    }

    fn scan_plain_scalar(&mut self) -> Result<(), ScanError> {
        let in_flow = self.in_flow();
        let mut params = ScalarParams {
            end: if in_flow {
                ScalarEnd::PlainInFlow
            } else {
                ScalarEnd::Plain
            },
            indent: if in_flow {
                0
            } else {
                (self.top_indent() + 1).max(0) as usize
            },
            fold: Fold::Flow,
            eat_leading_whitespace: true,
            trim_trailing_spaces: true,
            chomp: Chomp::Strip,
            on_doc_indicator: Action::Break,
            on_tab_in_indentation: Action::Throw,
            ..Default::default()
        };

        self.insert_potential_simple_key();

        let mark = self.stream.mark();
        let scalar = scan_scalar(&mut self.stream, &mut params)?;

        // Only a scalar that ended by starting a new line leaves room for a key.
        self.simple_key_allowed = params.leading_spaces;
        self.can_be_json_flow = false;

        self.push(Token::with_value(TokenKind::PlainScalar, mark, scalar));
        Ok(())
    }

    fn scan_quoted_scalar(&mut self) -> Result<(), ScanError> {
        let single = self.stream.peek() == '\'';
        let mut params = ScalarParams {
            end: if single {
                ScalarEnd::SingleQuote
            } else {
                ScalarEnd::DoubleQuote
            },
            eat_end: true,
            escape: Some(if single { '\'' } else { '\\' }),
            indent: 0,
            fold: Fold::Flow,
            eat_leading_whitespace: true,
            trim_trailing_spaces: false,
            chomp: Chomp::Clip,
            on_doc_indicator: Action::Throw,
            ..Default::default()
        };

        self.insert_potential_simple_key();

        let mark = self.stream.mark();
        self.stream.eat(1);
        let scalar = scan_scalar(&mut self.stream, &mut params)?;
        self.simple_key_allowed = false;
        self.can_be_json_flow = true;

        self.push(Token::with_value(TokenKind::NonPlainScalar, mark, scalar));
        Ok(())
    }

    fn scan_block_scalar(&mut self) -> Result<(), ScanError> {
        let mut params = ScalarParams {
            indent: 1,
            detect_indent: true,
            ..Default::default()
        };

        let mark = self.stream.mark();
        params.fold = if self.stream.get() == '>' {
            Fold::Block
        } else {
            Fold::DontFold
        };

        params.chomp = Chomp::Clip;
        let header = exp::CHOMP.match_len(&mut self.stream).unwrap_or(0);
        for _ in 0..header {
            match self.stream.get() {
                '+' => params.chomp = Chomp::Keep,
                '-' => params.chomp = Chomp::Strip,
                '0' => {
                    return Err(ScanError::new(
                        self.stream.mark(),
                        ScanErrorKind::ZeroIndentInBlock,
                    ));
                }
                digit => {
                    params.indent = digit.to_digit(10).unwrap_or(1) as usize;
                    params.detect_indent = false;
                }
            }
        }

        while exp::BLANK.matches(&mut self.stream) {
            self.stream.eat(1);
        }
        if exp::COMMENT.matches(&mut self.stream) {
            while self.stream.has_more() && !exp::BREAK.matches(&mut self.stream) {
                self.stream.eat(1);
            }
        }
        if self.stream.has_more() && !exp::BREAK.matches(&mut self.stream) {
            return Err(ScanError::new(self.stream.mark(), ScanErrorKind::CharInBlock));
        }

        let top = self.top_indent();
        if top >= 0 {
            params.indent += top as usize;
        }
        params.eat_leading_whitespace = false;
        params.trim_trailing_spaces = false;
        params.on_tab_in_indentation = Action::Throw;

        let scalar = scan_scalar(&mut self.stream, &mut params)?;

        // The scalar always ends at the start of a line.
        self.simple_key_allowed = true;
        self.can_be_json_flow = false;

        self.push(Token::with_value(TokenKind::NonPlainScalar, mark, scalar));
        Ok(())
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        match self.scan_one() {
            Ok(token) => token.map(Ok),
            Err(error) => {
                self.fused = true;
                Some(Err(error))
            }
        }
    }
}

impl std::fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("mark", &self.stream.mark())
            .field("queued", &self.tokens.len())
            .field("flow_level", &self.flows.len())
            .finish_non_exhaustive()
    }
}
