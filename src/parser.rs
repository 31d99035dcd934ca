//! Parser for function-like signatures
//!
//! Parses token streams like `f ( a , b )` into a small signature AST and
//! builds `Context` trees from it. A bare identifier is a leaf; an
//! identifier followed by a parenthesized, comma-separated argument list is
//! an internal node.

use chumsky::prelude::*;

use crate::lexer::Token;
use crate::tree::{Context, NodeData, NodeId};

/// A parsed signature node: symbol name plus ordered arguments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigNode {
    pub name: String,
    pub args: Vec<SigNode>,
}

fn ident() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    select! {
        Token::Ident(s) => s,
    }
}

/// Create a parser for a complete signature
pub fn parser() -> impl Parser<Token, SigNode, Error = Simple<Token>> + Clone {
    recursive(|node| {
        ident()
            .then(
                node.separated_by(just(Token::Comma))
                    .at_least(1)
                    .delimited_by(just(Token::LParen), just(Token::RParen))
                    .or_not(),
            )
            .map(|(name, args)| SigNode {
                name,
                args: args.unwrap_or_default(),
            })
    })
    .then_ignore(end())
}

/// Build a `Context` tree from a parsed signature
pub fn to_context(sig: &SigNode) -> Context {
    let mut ctx = Context::new();
    let root = ctx.create_root(NodeData::named(&sig.name));
    build_children(&mut ctx, root, &sig.args);
    ctx
}

fn build_children(ctx: &mut Context, parent: NodeId, args: &[SigNode]) {
    for arg in args {
        let child = ctx.create_child(parent, NodeData::named(&arg.name));
        build_children(ctx, child, &arg.args);
    }
}
