use serde::Serialize;

use crate::layer::semantic::{classify_layers, LayerConfig, SemanticType};
use crate::tree::bounds::Bounds;
use crate::tree::ui_node::{NodeId, UiTree};

#[derive(Debug, Clone, Serialize)]
pub struct RenderEntry {
    pub node: NodeId,
    pub bounds: Bounds,
    pub is_overlay: bool,
    pub semantic: SemanticType,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HitTestOptions {
    pub overlay_only: bool,

    /// Return only the topmost hit instead of every hit, topmost first
    pub topmost_only: bool,
}

/// Layer classification plus paint order for one tree.
///
/// Paint order is document order: later-visited subtrees are painted over
/// earlier ones. No z-index is computed, so an overlay that is not the last
/// visited subtree will sort below content that follows it.
#[derive(Debug, Clone, Serialize)]
pub struct LayerAnalysis {
    pub semantics: Vec<SemanticType>,
    pub render_order: Vec<RenderEntry>,
}

impl LayerAnalysis {
    pub fn analyze(tree: &UiTree, config: &LayerConfig) -> Self {
        let semantics = classify_layers(tree, config);

        let render_order = tree
            .descendants(tree.root())
            .into_iter()
            .filter_map(|id| {
                let bounds = tree.node(id).bounds()?;
                let semantic = semantics[id.0];
                Some(RenderEntry {
                    node: id,
                    bounds,
                    is_overlay: semantic.is_overlay(),
                    semantic,
                })
            })
            .collect();

        LayerAnalysis {
            semantics,
            render_order,
        }
    }

    pub fn semantic_of(&self, id: NodeId) -> SemanticType {
        self.semantics
            .get(id.0)
            .copied()
            .unwrap_or(SemanticType::Normal)
    }

    pub fn overlays(&self) -> impl Iterator<Item = &RenderEntry> {
        self.render_order.iter().filter(|e| e.is_overlay)
    }

    /// Entries containing the point, topmost (last painted) first.
    pub fn hit_test(&self, x: i32, y: i32, options: HitTestOptions) -> Vec<&RenderEntry> {
        let hits = self
            .render_order
            .iter()
            .rev()
            .filter(|e| e.bounds.contains_point(x, y))
            .filter(|e| !options.overlay_only || e.is_overlay);

        if options.topmost_only {
            hits.take(1).collect()
        } else {
            hits.collect()
        }
    }

    pub fn topmost_at(&self, x: i32, y: i32) -> Option<&RenderEntry> {
        self.hit_test(
            x,
            y,
            HitTestOptions {
                overlay_only: false,
                topmost_only: true,
            },
        )
        .into_iter()
        .next()
    }
}
