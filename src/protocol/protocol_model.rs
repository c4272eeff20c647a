use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::scoring::recommend::StructureRecommendation;
use crate::selection::selection_model::SelectionConfig;

/// Snapshot of what identified an element when it was picked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementFingerprint {
    // Text
    pub text_content: Option<String>,
    /// SHA-1 hex of the text, kept when the text itself should not be stored
    pub text_hash: Option<String>,

    // Structure
    /// Class names from the root down to the element itself
    pub class_chain: Option<Vec<String>>,
    pub resource_id: Option<String>,
    /// Part after `:id/`
    pub resource_id_suffix: Option<String>,

    // Position
    pub bounds_signature: Option<BoundsSignature>,
    /// Raw `[x1,y1][x2,y2]` at capture time
    pub bounds: Option<String>,

    // Context
    pub parent_class: Option<String>,
    pub sibling_count: Option<u32>,
    pub child_count: Option<u32>,
    pub depth_level: Option<u32>,
    pub relative_index: Option<u32>,

    // Flags
    pub clickable: Option<bool>,
    pub enabled: Option<bool>,
    pub selected: Option<bool>,

    pub content_desc: Option<String>,
    pub package_name: Option<String>,
}

impl ElementFingerprint {
    /// Whether any feature used for similarity scoring is present.
    pub fn has_identity(&self) -> bool {
        self.text_content.is_some()
            || self.text_hash.is_some()
            || self.resource_id.is_some()
            || self.content_desc.is_some()
            || self.own_class().is_some()
            || self.bounds.is_some()
    }

    /// Own class (last link of the class chain).
    pub fn own_class(&self) -> Option<&str> {
        self.class_chain
            .as_ref()
            .and_then(|chain| chain.last())
            .map(String::as_str)
    }
}

/// Position as proportions of the screen, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsSignature {
    /// Centre x
    pub x: f32,
    /// Centre y
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scoping and constraints for one match attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingContext {
    pub container_xpath: Option<String>,
    /// `[x1,y1][x2,y2]`
    pub container_bounds: Option<String>,

    /// Tap target once a leaf has been found
    pub clickable_parent_xpath: Option<String>,

    /// Overrides fingerprint-based discovery when set
    pub query: Option<String>,

    #[serde(default)]
    pub i18n_aliases: Vec<String>,

    pub light_assertions: Option<LightAssertions>,

    /// Pixels around the original centre
    pub search_radius: Option<u32>,
    pub max_candidates: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightAssertions {
    #[serde(default)]
    pub must_contain_text: Vec<String>,
    pub must_be_clickable: Option<bool>,
    pub must_be_visible: Option<bool>,
    #[serde(default)]
    pub exclude_text: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StrategyVariant {
    SelfId,
    RegionTextToParent,
    RegionLocalIndexWithCheck,
    NeighborRelative,
    GlobalIndexWithStrongChecks,
    AbsoluteXPathFallback,
}

impl StrategyVariant {
    /// Map a scoring-service mode name onto a strategy.
    pub fn from_mode_name(mode: &str) -> Option<Self> {
        match mode {
            "self_id" | "SelfId" => Some(StrategyVariant::SelfId),
            "region_text_to_parent" | "RegionTextToParent" | "card_subtree" => {
                Some(StrategyVariant::RegionTextToParent)
            }
            "region_local_index_with_check" | "RegionLocalIndexWithCheck" | "leaf_context" => {
                Some(StrategyVariant::RegionLocalIndexWithCheck)
            }
            "neighbor_relative" | "NeighborRelative" => Some(StrategyVariant::NeighborRelative),
            "global_index_with_strong_checks" | "GlobalIndexWithStrongChecks" => {
                Some(StrategyVariant::GlobalIndexWithStrongChecks)
            }
            "absolute_xpath_fallback" | "AbsoluteXPathFallback" | "text_exact" => {
                Some(StrategyVariant::AbsoluteXPathFallback)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPlanItem {
    pub id: String,
    pub kind: StrategyVariant,
    pub confidence: f32,
    pub description: String,
    pub params: Option<HashMap<String, serde_json::Value>>,
}

/// Ordered fallback strategies, most confident first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub selected: StrategyPlanItem,
    pub plan: Vec<StrategyPlanItem>,
    pub recommended_index: usize,
}

impl StrategyPlan {
    /// Build a plan from scoring outcomes: gate-passing outcomes sorted by
    /// confidence. `None` when nothing passed or no mode is recognised.
    pub fn from_recommendation(rec: &StructureRecommendation) -> Option<Self> {
        let mut outcomes: Vec<_> = rec
            .outcomes
            .iter()
            .filter(|o| o.passed_gate)
            .filter_map(|o| StrategyVariant::from_mode_name(&o.mode).map(|kind| (o, kind)))
            .collect();
        outcomes.sort_by(|a, b| b.0.conf.total_cmp(&a.0.conf));

        let plan: Vec<StrategyPlanItem> = outcomes
            .into_iter()
            .map(|(o, kind)| StrategyPlanItem {
                id: o.mode.clone(),
                kind,
                confidence: o.conf,
                description: o.explain.clone().unwrap_or_default(),
                params: None,
            })
            .collect();

        let recommended_index = plan
            .iter()
            .position(|item| item.id == rec.recommended)
            .unwrap_or(0);
        let selected = plan.get(recommended_index)?.clone();

        Some(StrategyPlan {
            selected,
            plan,
            recommended_index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    pub allow_backend_fallback: bool,
    pub time_budget_ms: u64,
    pub per_candidate_budget_ms: u64,
    pub strict_mode: bool,
    pub max_retry_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorInfo {
    pub container_xpath: Option<String>,
    pub clickable_parent_xpath: Option<String>,
    #[serde(default)]
    pub fingerprint: ElementFingerprint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub absolute_xpath: Option<String>,
    #[serde(default)]
    pub allow_fallback: bool,
}

/// Everything persisted per automation step for re-locating its target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartSelectionProtocol {
    #[serde(default)]
    pub anchor: AnchorInfo,
    #[serde(default)]
    pub selection: SelectionConfig,
    pub matching_context: Option<MatchingContext>,
    pub strategy_plan: Option<StrategyPlan>,
    pub limits: Option<ExecutionLimits>,
    pub fallback: Option<FallbackConfig>,
}

impl SmartSelectionProtocol {
    pub fn container_xpath(&self) -> Option<&str> {
        self.matching_context
            .as_ref()
            .and_then(|c| c.container_xpath.as_deref())
            .or(self.anchor.container_xpath.as_deref())
    }

    pub fn clickable_parent_xpath(&self) -> Option<&str> {
        self.matching_context
            .as_ref()
            .and_then(|c| c.clickable_parent_xpath.as_deref())
            .or(self.anchor.clickable_parent_xpath.as_deref())
    }
}
