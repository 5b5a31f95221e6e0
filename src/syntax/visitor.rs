//! Tree walking with pre/post hooks.
//!
//! Implementors match on [`NodeKind`](super::NodeKind) inside `visit` and
//! `end_visit`; both default to doing nothing.

use tokio_util::sync::CancellationToken;

use crate::base::{Cancelled, cancel};

use super::tree::{Document, NodeId};

/// What the walker does after `visit` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkAction {
    #[default]
    Continue,
    /// Do not descend into this node's children (`end_visit` still runs).
    SkipChildren,
}

pub trait Visitor {
    fn visit(&mut self, _doc: &Document, _node: NodeId) -> WalkAction {
        WalkAction::Continue
    }

    fn end_visit(&mut self, _doc: &Document, _node: NodeId) {}
}

/// Walk the subtree rooted at `start` in document order, polling `cancel`
/// once per node.
pub fn walk<V: Visitor + ?Sized>(
    doc: &Document,
    start: NodeId,
    visitor: &mut V,
    cancel: &CancellationToken,
) -> Result<(), Cancelled> {
    enum Step {
        Enter(NodeId),
        Exit(NodeId),
    }

    let mut stack = vec![Step::Enter(start)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node) => {
                cancel::check(cancel)?;
                let action = visitor.visit(doc, node);
                stack.push(Step::Exit(node));
                if action == WalkAction::Continue {
                    stack.extend(doc.children(node).iter().rev().map(|&c| Step::Enter(c)));
                }
            }
            Step::Exit(node) => visitor.end_visit(doc, node),
        }
    }
    Ok(())
}
