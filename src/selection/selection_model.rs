use serde::{Deserialize, Serialize};

use crate::tree::ui_node::NodeId;

// ============================================================================
// Configuration (persisted with the step)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Match the original when a fingerprint is known, otherwise first
    #[default]
    Auto,
    MatchOriginal,
    First,
    Last,
    Random,
    /// Every candidate, acted on as a batch
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Dom,
    /// Top to bottom, then left to right
    VisualYx,
    /// Left to right, then top to bottom
    VisualXy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub mode: SelectionMode,

    #[serde(default)]
    pub order: SortOrder,

    pub random_seed: Option<u64>,

    /// Only used by `All`
    pub batch_config: Option<BatchConfig>,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub exclude_rules: Vec<ExcludeRule>,

    /// `MatchOriginal`: take the first candidate when nothing is similar enough
    #[serde(default = "default_true")]
    pub fallback_to_first: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::default(),
            order: SortOrder::default(),
            random_seed: None,
            batch_config: None,
            filters: FilterConfig::default(),
            exclude_rules: Vec::new(),
            fallback_to_first: true,
        }
    }
}

impl SelectionConfig {
    pub fn with_mode(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    #[serde(default)]
    pub jitter_ms: u64,

    pub max_count: Option<u32>,

    #[serde(default = "default_true")]
    pub continue_on_error: bool,

    #[serde(default)]
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            jitter_ms: 0,
            max_count: None,
            continue_on_error: true,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Extra "already done" state texts, matched by substring
    #[serde(default)]
    pub exclude_states: Vec<String>,

    /// Apply the built-in state vocabulary
    #[serde(default = "default_true")]
    pub auto_exclude: bool,

    pub min_confidence: Option<f32>,

    /// Dedup radius in pixels
    pub position_tolerance: Option<u32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_states: Vec::new(),
            auto_exclude: true,
            min_confidence: None,
            position_tolerance: None,
        }
    }
}

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
pub const DEFAULT_POSITION_TOLERANCE: u32 = 10;

fn default_true() -> bool { true }
fn default_interval() -> u64 { 2000 }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExcludeAttr {
    Text,
    ContentDesc,
    ResourceId,
    Class,
}

impl ExcludeAttr {
    pub fn attr_name(self) -> &'static str {
        match self {
            ExcludeAttr::Text => "text",
            ExcludeAttr::ContentDesc => "content-desc",
            ExcludeAttr::ResourceId => "resource-id",
            ExcludeAttr::Class => "class",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcludeOp {
    Equals,
    Contains,
    Regex,
}

/// User-authored binary exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeRule {
    pub id: String,
    pub attr: ExcludeAttr,
    pub op: ExcludeOp,
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// ============================================================================
// Pipeline input / output
// ============================================================================

/// A matched node and the node that would actually receive the tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Candidate {
    pub node: NodeId,
    pub target: NodeId,
}

impl Candidate {
    pub fn of(node: NodeId) -> Self {
        Candidate { node, target: node }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionReason {
    First,
    Last,
    Random { index: usize, seed: Option<u64> },
    MatchOriginal { score: f32 },
    /// No candidate reached the confidence threshold
    FallbackFirst { best_score: f32 },
    Batch { position: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedCandidate {
    pub node: NodeId,
    pub target: NodeId,
    pub reason: SelectionReason,
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionCause {
    InvalidBounds,
    Rule { id: String },
    AutoState { state: String },
    Duplicate { of: NodeId },
    BelowConfidence { score: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedCandidate {
    pub node: NodeId,
    pub cause: ExclusionCause,
}

/// What the resolver decided, with the reasoning kept for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionOutcome {
    pub mode: SelectionMode,
    pub selected: Vec<SelectedCandidate>,
    pub excluded: Vec<ExcludedCandidate>,
    pub total_found: usize,
    pub after_filters: usize,
    pub after_dedup: usize,
}

impl SelectionOutcome {
    /// No eligible candidate. A normal terminal state, not a failure.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        self.selected.iter().map(|s| s.node).collect()
    }

    pub fn targets(&self) -> Vec<NodeId> {
        self.selected.iter().map(|s| s.target).collect()
    }
}
