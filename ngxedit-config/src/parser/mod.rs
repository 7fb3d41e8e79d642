//! Parser module for nginx configs
//!
//! This module provides the line lexer, the parser and diagnostics rendering.

pub mod diagnostic;
pub mod lexer;
pub mod parser;

pub use diagnostic::render;
pub use lexer::{LexError, Lexeme, Token, tokenize};
pub use parser::{ParseError, Parser, parse, parse_bytes};
