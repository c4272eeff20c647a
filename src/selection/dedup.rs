use log::debug;

use crate::selection::selection_model::{Candidate, SortOrder};
use crate::tree::bounds::Bounds;
use crate::tree::ui_node::{NodeId, UiTree};

/// Collapse candidates whose target centres lie within `tolerance` pixels of
/// an already kept candidate. The earliest candidate is the representative.
/// Candidates without bounds are always kept.
///
/// Returns the kept candidates and `(dropped, representative)` pairs.
pub fn dedup_by_position(
    tree: &UiTree,
    candidates: Vec<Candidate>,
    tolerance: u32,
) -> (Vec<Candidate>, Vec<(NodeId, NodeId)>) {
    let tolerance = tolerance as f64;
    let mut kept: Vec<(Candidate, Option<Bounds>)> = Vec::new();
    let mut dropped = Vec::new();

    for candidate in candidates {
        let bounds = tree.node(candidate.target).bounds();

        let duplicate_of = bounds.and_then(|b| {
            kept.iter().find_map(|(k, kb)| match kb {
                Some(kb) if kb.center_distance(&b) <= tolerance => Some(k.node),
                _ => None,
            })
        });

        match duplicate_of {
            Some(rep) => {
                debug!("Dedup: {} collapses into {}", candidate.node, rep);
                dropped.push((candidate.node, rep));
            }
            None => kept.push((candidate, bounds)),
        }
    }

    (kept.into_iter().map(|(c, _)| c).collect(), dropped)
}

/// Reorder candidates. `Dom` keeps arena (document) order; the visual orders
/// compare target centres and put candidates without bounds last.
pub fn sort_candidates(tree: &UiTree, candidates: &mut [Candidate], order: SortOrder) {
    match order {
        SortOrder::Dom => candidates.sort_by_key(|c| c.node),
        SortOrder::VisualYx | SortOrder::VisualXy => {
            candidates.sort_by_key(|c| {
                let centre = tree.node(c.target).bounds().map(|b| b.center());
                match (centre, order) {
                    (Some((x, y)), SortOrder::VisualYx) => (0, y, x, c.node),
                    (Some((x, y)), _) => (0, x, y, c.node),
                    (None, _) => (1, 0, 0, c.node),
                }
            });
        }
    }
}
