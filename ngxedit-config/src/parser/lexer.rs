//! Lexer for nginx config lines
//!
//! Tokenizes one line at a time. Whitespace is kept as a token so spans
//! stay contiguous; the parser slices the original text for anything it
//! has to preserve.
//!
//! - `#` starts a comment that runs to the end of the line
//! - `{`, `}` and `;` are structural
//! - "..." and '...' are quoted strings, braces inside them are inert

use logos::{Logos, Span};
use std::fmt;

/// A token and the byte range it covers in the tokenized text
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
}

/// Token types for a single config line
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[regex(r"[ \t\f\r]+")]
    Whitespace,

    #[regex(r"#[^\n]*")]
    Comment,

    #[token("{")]
    BlockOpen,

    #[token("}")]
    BlockClose,

    #[token(";")]
    Semicolon,

    /// Quoted string, kept with its quotes
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| lex.slice().to_string())]
    Quoted(String),

    /// Anything else up to whitespace, a brace, `;`, `#` or a quote
    #[regex(r#"[^ \t\r\n\f{};#"']+"#, |lex| lex.slice().to_string())]
    Word(String),
}

impl Token {
    /// Whitespace and comments carry no structure
    pub fn is_trivia(&self) -> bool {
        matches!(self, Token::Whitespace | Token::Comment)
    }

    /// Text of a word or quoted string
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Word(s) | Token::Quoted(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BlockOpen => write!(f, "{{"),
            Token::BlockClose => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::Quoted(s) | Token::Word(s) => write!(f, "{}", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Lexer result type
pub type LexResult = Result<Vec<Lexeme>, LexError>;

/// Lexer error
#[derive(Debug, Clone, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character at position {position}")]
    UnexpectedChar { position: usize },
}

/// Tokenize a line (or any text without block structure)
pub fn tokenize(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(token) => tokens.push(Lexeme { token, span }),
            // The word pattern accepts everything else, so only an
            // unterminated quote ends up here.
            Err(_) => return Err(LexError::UnexpectedChar { position: span.start }),
        }
    }

    Ok(tokens)
}
