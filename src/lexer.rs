//! Lexer for function-like signatures
//!
//! Tokenizes strings such as `f(a,b)` into a stream for the parser.

use chumsky::prelude::*;
use std::ops::Range;

/// Token types for the signature notation
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// A symbol name
    Ident(String),
    LParen, // (
    RParen, // )
    Comma,  // ,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// Type alias for spans
pub type Span = Range<usize>;

/// Create a lexer for the signature notation
pub fn lexer() -> impl Parser<char, Vec<(Token, Span)>, Error = Simple<char>> {
    let ident = text::ident().map(Token::Ident);

    let punctuation = choice((
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
    ));

    ident
        .or(punctuation)
        .map_with_span(|tok, span| (tok, span))
        .padded()
        .repeated()
        .then_ignore(end())
}

// Unit tests live in tests/unit_parsing.rs
