//! SPSM: structure-preserving semantic matching
//!
//! Filters a candidate mapping between two function-like trees down to a
//! one-to-one, structure-preserving mapping, permutes sibling order in a
//! copy of the trees to align matched siblings positionally, and scores
//! the result with a tree edit distance in [0, 1].

pub mod error;
pub mod filter;
pub mod lexer;
pub mod mapping;
pub mod matcher;
pub mod parser;
pub mod pretty;
pub mod relation;
pub mod score;
pub mod ted;
pub mod tree;

pub use filter::{MappingFilterError, RowPruneGuard, Scoring, SpsmFilter};
pub use mapping::{ContextMapping, MappingElement};
pub use matcher::{SpsmTreeMatcher, TreeMatcherError};
pub use relation::Relation;
pub use tree::{Context, NodeData, NodeId};

/// Parse a function-like signature string (e.g. `f(a,b)`) into a `Context`
pub fn parse_signature(input: &str) -> Result<Context, String> {
    use chumsky::prelude::*;

    let tokens = lexer::lexer()
        .parse(input)
        .map_err(|errs| error::format_lexer_errors(input, errs))?;

    let token_stream: Vec<_> = tokens.iter().map(|(t, s)| (t.clone(), s.clone())).collect();
    let len = input.len();

    let sig = parser::parser()
        .parse(chumsky::Stream::from_iter(
            len..len + 1,
            token_stream.into_iter(),
        ))
        .map_err(|errs| error::format_parser_errors(input, errs, &tokens))?;

    Ok(parser::to_context(&sig))
}
