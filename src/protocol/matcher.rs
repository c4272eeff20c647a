use log::{debug, warn};

use crate::error::ParseError;
use crate::protocol::protocol_model::{ElementFingerprint, LightAssertions, SmartSelectionProtocol};
use crate::selection::resolver::resolve;
use crate::selection::selection_model::{Candidate, SelectionOutcome};
use crate::tree::bounds::Bounds;
use crate::tree::parser::parse_ui_dump;
use crate::tree::ui_node::{NodeId, UiNode, UiTree};
use crate::xpath::evaluator::{find_all_within, find_first};

/// Find the candidates for a protocol, in document order, each paired with
/// its tap target.
pub fn collect_candidates(tree: &UiTree, protocol: &SmartSelectionProtocol) -> Vec<Candidate> {
    let ctx = protocol.matching_context.clone().unwrap_or_default();
    let fp = &protocol.anchor.fingerprint;

    let scope = match protocol.container_xpath() {
        Some(xpath) => match find_first(tree, xpath) {
            Some(container) => container,
            None => {
                warn!("Container '{}' not found, searching the whole tree", xpath);
                tree.root()
            }
        },
        None => tree.root(),
    };

    let mut found: Vec<NodeId> = match ctx.query.as_deref() {
        Some(query) => find_all_within(tree, query, scope),
        None => tree
            .descendants(scope)
            .into_iter()
            .filter(|&id| matches_fingerprint(tree.node(id), fp, &ctx.i18n_aliases))
            .collect(),
    };

    if found.is_empty() {
        if let Some(xpath) = protocol
            .fallback
            .as_ref()
            .filter(|f| f.allow_fallback)
            .and_then(|f| f.absolute_xpath.as_deref())
        {
            debug!("No candidates, trying fallback path {}", xpath);
            found = find_first(tree, xpath).into_iter().collect();
        }
    }

    if let Some(container) = ctx.container_bounds.as_deref().and_then(Bounds::parse) {
        found.retain(|&id| tree.node(id).bounds().is_some_and(|b| container.contains(&b)));
    }

    let clickable_parent = protocol
        .clickable_parent_xpath()
        .and_then(|xpath| find_first(tree, xpath));

    let mut candidates: Vec<Candidate> = found
        .into_iter()
        .map(|node| Candidate {
            node,
            target: tap_target(tree, node, clickable_parent),
        })
        .collect();

    if let Some(assertions) = &ctx.light_assertions {
        candidates.retain(|c| passes_assertions(tree, *c, assertions));
    }

    if let (Some(radius), Some(origin)) = (ctx.search_radius, fp.bounds.as_deref().and_then(Bounds::parse)) {
        candidates.retain(|c| {
            tree.node(c.node)
                .bounds()
                .is_some_and(|b| b.center_distance(&origin) <= radius as f64)
        });
    }

    if let Some(max) = ctx.max_candidates {
        candidates.truncate(max as usize);
    }

    debug!("Collected {} candidates", candidates.len());
    candidates
}

/// Fingerprint-driven discovery: same text (or an alias), falling back to
/// resource-id / content-desc when the fingerprint has no text.
fn matches_fingerprint(node: &UiNode, fp: &ElementFingerprint, aliases: &[String]) -> bool {
    let text = node.text();

    if let Some(expected) = fp.text_content.as_deref() {
        return text == Some(expected)
            || text.is_some_and(|t| aliases.iter().any(|a| !a.is_empty() && t.contains(a.as_str())));
    }

    if !aliases.is_empty() {
        return text.is_some_and(|t| aliases.iter().any(|a| !a.is_empty() && t.contains(a.as_str())));
    }

    if let Some(expected) = fp.resource_id.as_deref() {
        return node.resource_id() == Some(expected);
    }

    if let Some(expected) = fp.content_desc.as_deref() {
        return node.content_desc() == Some(expected);
    }

    false
}

/// The node that receives the tap: the configured clickable parent when it
/// encloses the candidate, else the nearest clickable ancestor-or-self.
fn tap_target(tree: &UiTree, node: NodeId, clickable_parent: Option<NodeId>) -> NodeId {
    if let Some(parent) = clickable_parent {
        if tree.is_ancestor_or_self(parent, node) {
            return parent;
        }
    }
    tree.clickable_ancestor_or_self(node).unwrap_or(node)
}

fn passes_assertions(tree: &UiTree, candidate: Candidate, assertions: &LightAssertions) -> bool {
    let node = tree.node(candidate.node);
    let fields: Vec<&str> = [node.text(), node.content_desc()].into_iter().flatten().collect();

    if !assertions.must_contain_text.is_empty()
        && !assertions
            .must_contain_text
            .iter()
            .any(|needle| fields.iter().any(|f| f.contains(needle.as_str())))
    {
        return false;
    }

    if assertions
        .exclude_text
        .iter()
        .any(|needle| !needle.is_empty() && fields.iter().any(|f| f.contains(needle.as_str())))
    {
        return false;
    }

    if assertions.must_be_clickable == Some(true)
        && !(node.is_clickable() || tree.node(candidate.target).is_clickable())
    {
        return false;
    }

    if assertions.must_be_visible == Some(true)
        && !node.bounds().is_some_and(|b| !b.is_empty())
    {
        return false;
    }

    true
}

/// Parse a dump and run the whole pipeline for one protocol.
pub fn select_from_dump(
    xml: &str,
    protocol: &SmartSelectionProtocol,
) -> Result<(UiTree, SelectionOutcome), ParseError> {
    let tree = parse_ui_dump(xml)?;
    let candidates = collect_candidates(&tree, protocol);
    let fingerprint = Some(&protocol.anchor.fingerprint).filter(|fp| fp.has_identity());
    let outcome = resolve(&tree, &candidates, &protocol.selection, fingerprint);
    Ok((tree, outcome))
}
