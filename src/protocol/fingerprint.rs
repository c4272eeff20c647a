use crate::protocol::protocol_model::{BoundsSignature, ElementFingerprint};
use crate::tree::bounds::Bounds;
use crate::tree::ui_node::{NodeId, UiTree};

pub fn text_hash(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Part of a resource-id after `:id/`, or the whole id if there is none.
pub fn resource_id_suffix(resource_id: &str) -> &str {
    resource_id
        .rsplit_once(":id/")
        .map(|(_, suffix)| suffix)
        .unwrap_or(resource_id)
}

/// Capture the fingerprint of `id`. `screen` defaults to the root bounds.
pub fn capture_fingerprint(tree: &UiTree, id: NodeId, screen: Option<Bounds>) -> ElementFingerprint {
    let node = tree.node(id);
    let screen = screen.or_else(|| tree.screen_bounds());

    let mut chain: Vec<NodeId> = tree.ancestors(id);
    chain.reverse();
    chain.push(id);
    let class_chain: Vec<String> = chain
        .iter()
        .filter_map(|&n| tree.node(n).class().map(str::to_string))
        .collect();

    let parent = node.parent.map(|p| tree.node(p));
    let bounds = node.bounds();

    ElementFingerprint {
        text_content: node.text().map(str::to_string),
        text_hash: node.text().map(text_hash),
        class_chain: (!class_chain.is_empty()).then_some(class_chain),
        resource_id: node.resource_id().map(str::to_string),
        resource_id_suffix: node.resource_id().map(|r| resource_id_suffix(r).to_string()),
        bounds_signature: match (bounds, screen) {
            (Some(b), Some(s)) => bounds_signature(&b, &s),
            _ => None,
        },
        bounds: bounds.map(|b| b.to_attr()),
        parent_class: parent.and_then(|p| p.class()).map(str::to_string),
        sibling_count: parent.map(|p| p.children.len().saturating_sub(1) as u32),
        child_count: Some(node.children.len() as u32),
        depth_level: Some(node.depth as u32),
        relative_index: Some(node.sibling_index as u32),
        clickable: Some(node.is_clickable()),
        enabled: Some(node.is_enabled()),
        selected: Some(node.is_selected()),
        content_desc: node.content_desc().map(str::to_string),
        package_name: node.non_empty("package").map(str::to_string),
    }
}

/// Proportional position of `b` on `screen`; `None` for a zero-sized screen.
pub fn bounds_signature(b: &Bounds, screen: &Bounds) -> Option<BoundsSignature> {
    if screen.is_empty() {
        return None;
    }
    let sw = screen.w as f32;
    let sh = screen.h as f32;
    let (cx, cy) = b.center();

    Some(BoundsSignature {
        x: ((cx - screen.x1) as f32 / sw).clamp(0.0, 1.0),
        y: ((cy - screen.y1) as f32 / sh).clamp(0.0, 1.0),
        width: (b.w as f32 / sw).clamp(0.0, 1.0),
        height: (b.h as f32 / sh).clamp(0.0, 1.0),
    })
}
