//! Pretty-printer for contexts
//!
//! Renders a tree back to function-like signature form (`f(a,b)`) for
//! round-trip testing and log messages.

use crate::tree::{Context, NodeId};

/// Render the whole context in signature form; empty string for an empty
/// context.
pub fn fn_signature(ctx: &Context) -> String {
    match ctx.root() {
        Some(root) => node_signature(ctx, root),
        None => String::new(),
    }
}

/// Render the subtree rooted at `node` in signature form.
pub fn node_signature(ctx: &Context, node: NodeId) -> String {
    let mut out = String::new();
    write_node(ctx, node, &mut out);
    out
}

fn write_node(ctx: &Context, node: NodeId, out: &mut String) {
    out.push_str(ctx.name(node));
    let children = ctx.children(node);
    if !children.is_empty() {
        out.push('(');
        for (i, &child) in children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_node(ctx, child, out);
        }
        out.push(')');
    }
}
