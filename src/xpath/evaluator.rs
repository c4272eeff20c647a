use log::debug;

use crate::error::QueryError;
use crate::tree::ui_node::{NodeId, UiTree};
use crate::xpath::query::{PathQuery, PathStep};

// ============================================================================
// Result-returning API (distinguishes unsupported syntax from zero matches)
// ============================================================================

pub fn try_find_first(tree: &UiTree, expr: &str) -> Result<Option<NodeId>, QueryError> {
    let query = PathQuery::parse(expr)?;
    Ok(first_match(tree, &query, tree.root()))
}

pub fn try_find_all(tree: &UiTree, expr: &str) -> Result<Vec<NodeId>, QueryError> {
    let query = PathQuery::parse(expr)?;
    Ok(all_matches(tree, &query, tree.root()))
}

// ============================================================================
// Lenient API: unsupported syntax is simply "no match"
// ============================================================================

pub fn find_first(tree: &UiTree, expr: &str) -> Option<NodeId> {
    match try_find_first(tree, expr) {
        Ok(found) => found,
        Err(e) => {
            debug!("Query rejected: {}", e);
            None
        }
    }
}

pub fn find_all(tree: &UiTree, expr: &str) -> Vec<NodeId> {
    match try_find_all(tree, expr) {
        Ok(found) => found,
        Err(e) => {
            debug!("Query rejected: {}", e);
            Vec::new()
        }
    }
}

/// Predicate query restricted to the subtree under `scope` (inclusive).
/// Positional paths are always resolved from the tree root.
pub fn find_all_within(tree: &UiTree, expr: &str, scope: NodeId) -> Vec<NodeId> {
    match PathQuery::parse(expr) {
        Ok(query) => all_matches(tree, &query, scope),
        Err(e) => {
            debug!("Query rejected: {}", e);
            Vec::new()
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

pub fn first_match(tree: &UiTree, query: &PathQuery, scope: NodeId) -> Option<NodeId> {
    match query {
        PathQuery::Positional(steps) => resolve_positional(tree, steps),
        PathQuery::Predicate { tag, predicate } => tree
            .descendants(scope)
            .into_iter()
            .find(|&id| {
                let node = tree.node(id);
                tag.matches(node) && predicate.matches(node)
            }),
    }
}

pub fn all_matches(tree: &UiTree, query: &PathQuery, scope: NodeId) -> Vec<NodeId> {
    match query {
        PathQuery::Positional(steps) => resolve_positional(tree, steps).into_iter().collect(),
        PathQuery::Predicate { tag, predicate } => tree
            .descendants(scope)
            .into_iter()
            .filter(|&id| {
                let node = tree.node(id);
                tag.matches(node) && predicate.matches(node)
            })
            .collect(),
    }
}

/// Walk from the root, taking the Nth same-tag child at every step.
fn resolve_positional(tree: &UiTree, steps: &[PathStep]) -> Option<NodeId> {
    let (head, rest) = steps.split_first()?;

    let root = tree.root();
    if !(head.tag.matches(tree.node(root)) && head.index == 1) {
        return None;
    }

    let mut current = root;
    for step in rest {
        current = tree
            .children(current)
            .iter()
            .copied()
            .filter(|&c| step.tag.matches(tree.node(c)))
            .nth(step.index - 1)?;
    }
    Some(current)
}

/// Absolute positional path for a node, e.g. `/hierarchy/node[1]/node[3]`.
pub fn absolute_path(tree: &UiTree, id: NodeId) -> String {
    let mut chain: Vec<NodeId> = tree.ancestors(id);
    chain.reverse();
    chain.push(id);

    let mut out = String::new();
    for (depth, &n) in chain.iter().enumerate() {
        let node = tree.node(n);
        out.push('/');
        out.push_str(&node.tag);
        if depth > 0 {
            let position = match node.parent {
                Some(p) => {
                    tree.children(p)
                        .iter()
                        .take(node.sibling_index)
                        .filter(|&&s| tree.node(s).tag == node.tag)
                        .count()
                        + 1
                }
                None => 1,
            };
            out.push_str(&format!("[{}]", position));
        }
    }
    out
}
