use serde::Serialize;

use crate::protocol::fingerprint::{resource_id_suffix, text_hash};
use crate::protocol::protocol_model::ElementFingerprint;
use crate::tree::bounds::Bounds;
use crate::tree::ui_node::UiNode;

pub const WEIGHT_RESOURCE_ID: f32 = 0.35;
pub const WEIGHT_TEXT: f32 = 0.25;
pub const WEIGHT_CONTENT_DESC: f32 = 0.20;
pub const WEIGHT_CLASS: f32 = 0.10;
pub const WEIGHT_BOUNDS: f32 = 0.10;

/// Per-feature credit in [0, 1]; `None` when the fingerprint lacks the feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimilarityBreakdown {
    pub resource_id: Option<f32>,
    pub text: Option<f32>,
    pub content_desc: Option<f32>,
    pub class: Option<f32>,
    pub bounds: Option<f32>,
}

impl SimilarityBreakdown {
    /// Weighted score normalised over the features the fingerprint carries,
    /// so an unmodified element always scores 1.0.
    pub fn score(&self) -> f32 {
        let parts = [
            (self.resource_id, WEIGHT_RESOURCE_ID),
            (self.text, WEIGHT_TEXT),
            (self.content_desc, WEIGHT_CONTENT_DESC),
            (self.class, WEIGHT_CLASS),
            (self.bounds, WEIGHT_BOUNDS),
        ];

        let (sum, weight) = parts
            .iter()
            .filter_map(|(credit, w)| credit.map(|c| (c * w, *w)))
            .fold((0.0f32, 0.0f32), |(s, tw), (v, w)| (s + v, tw + w));

        if weight > 0.0 { sum / weight } else { 0.0 }
    }
}

pub fn compare(node: &UiNode, fp: &ElementFingerprint) -> SimilarityBreakdown {
    let resource_id = fp.resource_id.as_deref().map(|expected| match node.resource_id() {
        Some(actual) if actual == expected => 1.0,
        Some(actual) if resource_id_suffix(actual) == resource_id_suffix(expected) => 0.5,
        _ => 0.0,
    });

    let text = match (&fp.text_content, &fp.text_hash) {
        (Some(expected), _) => Some(if node.text() == Some(expected.as_str()) { 1.0 } else { 0.0 }),
        (None, Some(hash)) => Some(match node.text() {
            Some(t) if &text_hash(t) == hash => 1.0,
            _ => 0.0,
        }),
        (None, None) => None,
    };

    let content_desc = fp
        .content_desc
        .as_deref()
        .map(|expected| if node.content_desc() == Some(expected) { 1.0 } else { 0.0 });

    let class = fp
        .own_class()
        .map(|expected| if node.class() == Some(expected) { 1.0 } else { 0.0 });

    let bounds = fp.bounds.as_deref().and_then(Bounds::parse).map(|expected| {
        if node.bounds() == Some(expected) { 1.0 } else { 0.0 }
    });

    SimilarityBreakdown {
        resource_id,
        text,
        content_desc,
        class,
        bounds,
    }
}

pub fn similarity(node: &UiNode, fp: &ElementFingerprint) -> f32 {
    compare(node, fp).score()
}
