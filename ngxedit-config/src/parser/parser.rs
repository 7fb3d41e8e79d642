//! nginx config parser
//!
//! Line-oriented scanner that turns config text into a [`Document`].
//! Structured lines (`upstream`/`server`/`location` headers, `server`
//! targets, the load-balancing method, `server_name`, `listen`,
//! `proxy_pass`) become fields; every other line inside an upstream or a
//! location is kept verbatim as the entity's `before`/`after` fragment.
//!
//! Structured lines are written back from their fields in a fixed layout,
//! so a file is only accepted if rendering the result reproduces it byte
//! for byte. Anything else fails with [`ParseError::NonCanonical`] pointing
//! at the first line that would change.

use crate::parser::lexer::{LexError, Lexeme, Token, tokenize};
use ngxedit_core::config::{
    BLOCK_SEPARATOR, BODY_INDENT, Document, HostPort, LOAD_BALANCING_METHODS, LOCATION_BODY_INDENT,
    Location, ProxyTarget, Server, Upstream,
};
use std::ops::Range;
use thiserror::Error;

/// Parser error types
///
/// Every variant means the input is not a config this crate can represent;
/// nothing is recovered and no partial document is returned.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid UTF-8 at byte {position}")]
    Encoding { position: usize },

    #[error("Unterminated quote on line {line}")]
    Lex { line: usize, span: Range<usize> },

    #[error("Unterminated {block} block opened on line {line}")]
    Unterminated {
        block: String,
        line: usize,
        span: Range<usize>,
    },

    #[error("{block} on line {line} has no {field}")]
    MissingField {
        block: String,
        field: &'static str,
        line: usize,
        span: Range<usize>,
    },

    #[error("Invalid {field} on line {line}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
        line: usize,
        span: Range<usize>,
    },

    #[error("Unexpected line {line} in {context}")]
    UnexpectedLine {
        context: String,
        line: usize,
        span: Range<usize>,
    },

    #[error("Line {line} would be rewritten as {expected:?}")]
    NonCanonical {
        expected: String,
        line: usize,
        span: Range<usize>,
    },
}

impl ParseError {
    /// Byte range of the source the error points at
    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::Encoding { position } => *position..*position + 1,
            ParseError::Lex { span, .. }
            | ParseError::Unterminated { span, .. }
            | ParseError::MissingField { span, .. }
            | ParseError::InvalidValue { span, .. }
            | ParseError::UnexpectedLine { span, .. }
            | ParseError::NonCanonical { span, .. } => span.clone(),
        }
    }

    /// 1-based line number, if the error has one
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Encoding { .. } => None,
            ParseError::Lex { line, .. }
            | ParseError::Unterminated { line, .. }
            | ParseError::MissingField { line, .. }
            | ParseError::InvalidValue { line, .. }
            | ParseError::UnexpectedLine { line, .. }
            | ParseError::NonCanonical { line, .. } => Some(*line),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// One source line, without its `\n`
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    start: usize,
    text: &'a str,
}

impl<'a> Line<'a> {
    fn indent(&self) -> usize {
        self.text.len() - self.text.trim_start().len()
    }

    fn end(&self) -> usize {
        self.start + self.text.len()
    }

    fn span(&self) -> Range<usize> {
        self.start..self.end()
    }

    fn classify(&self) -> ParseResult<LineKind<'a>> {
        let text: &'a str = self.text;
        let tokens = tokenize(text).map_err(|e| match e {
            LexError::UnexpectedChar { position } => ParseError::Lex {
                line: self.number,
                span: self.start + position..self.start + position + 1,
            },
        })?;

        if text.trim().is_empty() {
            return Ok(LineKind::Blank);
        }
        if text.trim() == "}" {
            return Ok(LineKind::Close);
        }

        let depth: i32 = tokens
            .iter()
            .map(|t| match t.token {
                Token::BlockOpen => 1,
                Token::BlockClose => -1,
                _ => 0,
            })
            .sum();

        // A trailing comment has no slot in a structured field
        if tokens.iter().any(|t| t.token == Token::Comment) {
            return Ok(LineKind::Other { depth });
        }

        let significant: Vec<&Lexeme> = tokens.iter().filter(|t| !t.token.is_trivia()).collect();
        Ok(match Statement::from_tokens(text, &significant) {
            Some(statement) => LineKind::Statement(statement),
            None => LineKind::Other { depth },
        })
    }
}

/// `name args... ;` or `name args... {` on a single line
#[derive(Debug)]
struct Statement<'a> {
    name: String,
    args: Vec<String>,
    /// Everything between the name and the terminator, trimmed
    args_raw: &'a str,
    /// Name and arguments as written, without the terminator
    raw: &'a str,
    opens_block: bool,
}

impl<'a> Statement<'a> {
    fn from_tokens(text: &'a str, tokens: &[&Lexeme]) -> Option<Self> {
        let (last, words) = tokens.split_last()?;
        let opens_block = match last.token {
            Token::Semicolon => false,
            Token::BlockOpen => true,
            _ => return None,
        };
        let (first, rest) = words.split_first()?;
        let name = match &first.token {
            Token::Word(w) => w.clone(),
            _ => return None,
        };
        let args = rest
            .iter()
            .map(|t| t.token.text().map(str::to_string))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            name,
            args,
            args_raw: text[first.span.end..last.span.start].trim(),
            raw: text[first.span.start..last.span.start].trim_end(),
            opens_block,
        })
    }

    fn is_directive(&self, name: &str) -> bool {
        !self.opens_block && self.name == name
    }

    fn is_block(&self, name: &str) -> bool {
        self.opens_block && self.name == name
    }

    fn is_method(&self) -> bool {
        !self.opens_block && LOAD_BALANCING_METHODS.contains(&self.name.as_str())
    }

    fn is_target(&self) -> bool {
        self.is_directive("server") && self.args.len() == 1
    }
}

#[derive(Debug)]
enum LineKind<'a> {
    Blank,
    Close,
    Statement(Statement<'a>),
    Other { depth: i32 },
}

impl LineKind<'_> {
    fn depth_delta(&self) -> i32 {
        match self {
            LineKind::Blank => 0,
            LineKind::Close => -1,
            LineKind::Statement(s) => i32::from(s.opens_block),
            LineKind::Other { depth } => *depth,
        }
    }
}

/// Top-level block header
#[derive(Debug)]
enum Header {
    Upstream(String),
    Server,
}

impl Header {
    fn of(line: &Line<'_>) -> Option<Self> {
        match line.classify().ok()? {
            LineKind::Statement(s) if s.is_block("upstream") && s.args.len() == 1 => {
                Some(Header::Upstream(s.args_raw.to_string()))
            }
            LineKind::Statement(s) if s.is_block("server") && s.args.is_empty() => {
                Some(Header::Server)
            }
            _ => None,
        }
    }
}

/// Block whose closing brace is still pending
struct OpenBlock<'a> {
    what: String,
    header: Line<'a>,
    /// Layout indentation of the block's directives
    indent: &'static str,
}

impl OpenBlock<'_> {
    fn unterminated(&self) -> ParseError {
        ParseError::Unterminated {
            block: self.what.clone(),
            line: self.header.number,
            span: self.header.span(),
        }
    }

    fn missing(&self, field: &'static str) -> ParseError {
        ParseError::MissingField {
            block: self.what.clone(),
            field,
            line: self.header.number,
            span: self.header.span(),
        }
    }

    fn unexpected(&self, line: &Line<'_>) -> ParseError {
        ParseError::UnexpectedLine {
            context: self.what.clone(),
            line: line.number,
            span: line.span(),
        }
    }
}

fn invalid(field: &'static str, reason: impl ToString, line: &Line<'_>) -> ParseError {
    ParseError::InvalidValue {
        field,
        reason: reason.to_string(),
        line: line.number,
        span: line.span(),
    }
}

/// Parser state
pub struct Parser<'a> {
    source: &'a str,
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser over config text
    pub fn new(source: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for (i, chunk) in source.split_inclusive('\n').enumerate() {
            lines.push(Line {
                number: i + 1,
                start,
                text: chunk.strip_suffix('\n').unwrap_or(chunk),
            });
            start += chunk.len();
        }
        Self {
            source,
            lines,
            pos: 0,
        }
    }

    /// Parse the whole file
    pub fn parse(&mut self) -> ParseResult<Document> {
        let Some(first) = self.lines.iter().position(|l| Header::of(l).is_some()) else {
            tracing::debug!("no upstream or server blocks found");
            return Ok(Document::with_text(self.source, ""));
        };

        let header = self.lines[first];
        let mut doc = Document::with_text(&self.source[..header.start + header.indent()], "");
        self.pos = first;

        let last_was_upstream = loop {
            let was_upstream = self.parse_block(&mut doc)?;

            // Consecutive blocks share one separator: a blank line, then
            // the next header's indentation. Its exact form is checked below.
            let mut next = self.pos;
            while self.lines.get(next).is_some_and(|l| l.text.trim().is_empty()) {
                next += 1;
            }
            match self.lines.get(next) {
                Some(line) if Header::of(line).is_some() => self.pos = next,
                _ => break was_upstream,
            }
        };

        if let Some(stray) = self.lines[self.pos..].iter().find(|l| Header::of(l).is_some()) {
            return Err(ParseError::UnexpectedLine {
                context: "text between blocks".to_string(),
                line: stray.number,
                span: stray.span(),
            });
        }

        // The last upstream carries its separator even when no server follows
        let mut trailing_start = self
            .lines
            .get(self.pos)
            .map_or(self.source.len(), |l| l.start);
        if last_was_upstream && self.source[trailing_start..].starts_with(BLOCK_SEPARATOR) {
            trailing_start += BLOCK_SEPARATOR.len();
        }

        doc.set_trailing_text(&self.source[trailing_start..]);
        self.verify(&doc)?;

        tracing::debug!(
            "parsed {} upstream(s), {} server(s)",
            doc.upstreams().len(),
            doc.servers().len()
        );
        Ok(doc)
    }

    /// Parse the block under the cursor, returning whether it was an upstream
    fn parse_block(&mut self, doc: &mut Document) -> ParseResult<bool> {
        let line = self.lines[self.pos];
        match Header::of(&line) {
            Some(Header::Upstream(name)) => {
                let upstream = self.parse_upstream(name)?;
                doc.add_upstream(upstream);
                Ok(true)
            }
            Some(Header::Server) => {
                let server = self.parse_server()?;
                doc.add_server(server);
                Ok(false)
            }
            None => Err(ParseError::UnexpectedLine {
                context: "top level".to_string(),
                line: line.number,
                span: line.span(),
            }),
        }
    }

    // ========================================
    // Upstream Block
    // ========================================

    fn parse_upstream(&mut self, name: String) -> ParseResult<Upstream> {
        let block = OpenBlock {
            what: format!("upstream {}", name),
            header: self.lines[self.pos],
            indent: BODY_INDENT,
        };
        self.pos += 1;

        let mut upstream = Upstream::named(name);

        let (before, mut stop) =
            self.collect_fragment(&block, |s| s.is_method() || s.is_target())?;
        upstream.set_before(before);

        if let LineKind::Statement(s) = &stop {
            if s.is_method() {
                upstream.set_method(Some(s.raw.to_string()));
                self.pos += 1;
                // The method is followed by a blank line
                if self.lines.get(self.pos).is_some_and(|l| l.text.trim().is_empty()) {
                    self.pos += 1;
                }
                stop = self.current(&block)?;
            }
        }

        while let LineKind::Statement(s) = &stop {
            if !s.is_target() {
                break;
            }
            let line = self.lines[self.pos];
            let (host_port, explicit) =
                HostPort::parse_explicit(&s.args[0]).map_err(|e| invalid("server", e, &line))?;
            if !explicit {
                return Err(invalid(
                    "server",
                    format!("no port given, it would be written back as {}", host_port),
                    &line,
                ));
            }
            upstream.add_host_port(host_port);
            self.pos += 1;
            stop = self.current(&block)?;
        }

        let (after, _) = self.collect_fragment(&block, |_| false)?;
        upstream.set_after(after);
        self.pos += 1;

        tracing::debug!(
            "upstream {}: {} target(s)",
            upstream.name(),
            upstream.host_ports().len()
        );
        Ok(upstream)
    }

    // ========================================
    // Server Block
    // ========================================

    fn parse_server(&mut self) -> ParseResult<Server> {
        let block = OpenBlock {
            what: "server".to_string(),
            header: self.lines[self.pos],
            indent: BODY_INDENT,
        };
        self.pos += 1;

        let mut name = None;
        let mut listen = None;
        let mut locations = Vec::new();

        loop {
            let line = *self.lines.get(self.pos).ok_or_else(|| block.unterminated())?;
            match line.classify()? {
                LineKind::Close => {
                    self.pos += 1;
                    break;
                }
                LineKind::Statement(s) if s.is_directive("server_name") && name.is_none() => {
                    if s.args.is_empty() {
                        return Err(invalid("server_name", "no name given", &line));
                    }
                    name = Some(s.args_raw.to_string());
                    self.pos += 1;
                }
                LineKind::Statement(s) if s.is_directive("listen") && listen.is_none() => {
                    let port = match s.args.as_slice() {
                        [port] => parse_listen(port).map_err(|e| invalid("listen", e, &line))?,
                        _ => return Err(invalid("listen", "expected a single port", &line)),
                    };
                    listen = Some(port);
                    self.pos += 1;
                }
                LineKind::Statement(s) if s.is_block("location") && !s.args.is_empty() => {
                    locations.push(self.parse_location(s.args_raw.to_string())?);
                }
                _ => return Err(block.unexpected(&line)),
            }
        }

        let name = name.ok_or_else(|| block.missing("server_name"))?;
        let listen = listen.ok_or_else(|| block.missing("listen"))?;
        let mut server = Server::named(name).with_listen(listen);
        for location in locations {
            server.add_location(location);
        }

        tracing::debug!(
            "server {}:{}: {} location(s)",
            server.name(),
            server.listen(),
            server.locations().len()
        );
        Ok(server)
    }

    fn parse_location(&mut self, name: String) -> ParseResult<Location> {
        let block = OpenBlock {
            what: format!("location {}", name),
            header: self.lines[self.pos],
            indent: LOCATION_BODY_INDENT,
        };
        self.pos += 1;

        let (before, stop) = self.collect_fragment(&block, |s| s.is_directive("proxy_pass"))?;
        let target = match stop {
            LineKind::Statement(s) => {
                let line = self.lines[self.pos];
                match s.args.as_slice() {
                    [target] => target
                        .parse::<ProxyTarget>()
                        .map_err(|e| invalid("proxy_pass", e, &line))?,
                    _ => return Err(invalid("proxy_pass", "expected a single target", &line)),
                }
            }
            _ => return Err(block.missing("proxy_pass")),
        };
        self.pos += 1;

        let (after, _) = self.collect_fragment(&block, |_| false)?;
        self.pos += 1;

        Ok(Location::new(name, target).with_before(before).with_after(after))
    }

    // ========================================
    // Helpers
    // ========================================

    /// Classify the line under the cursor, failing at end of input
    fn current(&self, block: &OpenBlock<'_>) -> ParseResult<LineKind<'a>> {
        self.lines
            .get(self.pos)
            .ok_or_else(|| block.unterminated())?
            .classify()
    }

    /// Consume free-form lines until `stop` matches a statement or the block
    /// closes, both only counted at the block's own brace depth.
    ///
    /// Returns the consumed lines as a fragment (see [`Parser::fragment`])
    /// and the kind of the line the cursor stopped on. The stopping line is
    /// not consumed.
    fn collect_fragment<F>(
        &mut self,
        block: &OpenBlock<'_>,
        stop: F,
    ) -> ParseResult<(String, LineKind<'a>)>
    where
        F: Fn(&Statement<'_>) -> bool,
    {
        let first = self.pos;
        let mut depth = 0;

        let kind = loop {
            let line = *self.lines.get(self.pos).ok_or_else(|| block.unterminated())?;
            let kind = line.classify()?;
            tracing::trace!("line {}: {:?}", line.number, kind);

            if depth == 0 {
                match &kind {
                    LineKind::Close => break kind,
                    LineKind::Statement(s) if stop(s) => break kind,
                    _ => {}
                }
            }

            depth += kind.depth_delta();
            if depth < 0 {
                return Err(block.unexpected(&line));
            }
            self.pos += 1;
        };

        Ok((self.fragment(first, self.pos, block.indent), kind))
    }

    /// Text of lines `first..end`, where line `end` exists
    ///
    /// When the first line starts at `indent` with a non-blank character the
    /// indentation and the final line break are left out, as the renderer
    /// puts them back. Otherwise the lines are kept whole, line breaks
    /// included.
    fn fragment(&self, first: usize, end: usize, indent: &str) -> String {
        if first == end {
            return String::new();
        }
        let head = self.lines[first];
        let stop = self.lines[end].start;
        match head.text.strip_prefix(indent) {
            Some(rest) if rest.starts_with(|c: char| !c.is_whitespace()) => {
                let tail = self.lines[end - 1];
                self.source[head.start + indent.len()..tail.end()].to_string()
            }
            _ => self.source[head.start..stop].to_string(),
        }
    }

    /// Fail unless `doc` renders back to exactly the parsed text
    fn verify(&self, doc: &Document) -> ParseResult<()> {
        let rendered = doc.to_string();
        let (ours, theirs) = (rendered.as_bytes(), self.source.as_bytes());
        let mismatch = ours
            .iter()
            .zip(theirs)
            .position(|(a, b)| a != b)
            .or_else(|| (ours.len() != theirs.len()).then(|| ours.len().min(theirs.len())));
        let Some(at) = mismatch else {
            return Ok(());
        };

        let start = theirs[..at]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let end = theirs[at..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(theirs.len(), |i| at + i);
        let expected_end = ours[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(ours.len(), |i| start + i);

        Err(ParseError::NonCanonical {
            expected: rendered[start..expected_end].to_string(),
            line: theirs[..at].iter().filter(|&&b| b == b'\n').count() + 1,
            span: start..end,
        })
    }
}

fn parse_listen(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(port) if port.to_string() == s => Ok(port),
        _ => Err(format!("'{}' is not a port number", s)),
    }
}

/// Parse config text into a [`Document`]
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source).parse()
}

/// Parse raw bytes, which must be UTF-8
pub fn parse_bytes(bytes: &[u8]) -> ParseResult<Document> {
    let source = std::str::from_utf8(bytes).map_err(|e| ParseError::Encoding {
        position: e.valid_up_to(),
    })?;
    parse(source)
}
