use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::tree::ui_node::{NodeId, UiTree};
use crate::xpath::evaluator::absolute_path;

// ============================================================================
// Wire types for `recommend_structure_mode_v2`
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<Vec<usize>>,
    pub absolute_xpath: String,
    pub xml_snapshot: String,
    pub container_xpath: Option<String>,
}

impl RecommendInput {
    /// Request for the element `id` of a parsed dump.
    pub fn for_node(tree: &UiTree, id: NodeId, xml_snapshot: &str, container_xpath: Option<&str>) -> Self {
        let mut index_path: Vec<usize> = tree
            .ancestors(id)
            .into_iter()
            .filter(|&a| a != tree.root())
            .map(|a| tree.node(a).sibling_index)
            .collect();
        index_path.reverse();
        if id != tree.root() {
            index_path.push(tree.node(id).sibling_index);
        }

        Self {
            index_path: Some(index_path),
            absolute_xpath: absolute_path(tree, id),
            xml_snapshot: xml_snapshot.to_string(),
            container_xpath: container_xpath.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeOutcome {
    pub mode: String,
    pub conf: f32,
    #[serde(default)]
    pub explain: Option<String>,
    #[serde(default)]
    pub passed_gate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRecommendation {
    pub recommended: String,
    #[serde(default)]
    pub outcomes: Vec<ModeOutcome>,
    #[serde(default)]
    pub step_plan_mode: Option<String>,
    #[serde(default)]
    pub plan_suggest: Option<serde_json::Value>,
    #[serde(default)]
    pub config_suggest: Option<serde_json::Value>,
}

impl StructureRecommendation {
    pub fn confidence_of(&self, mode: &str) -> Option<f32> {
        self.outcomes.iter().find(|o| o.mode == mode).map(|o| o.conf)
    }
}

// ============================================================================
// StrategyRecommender trait
// ============================================================================

/// Opaque service scoring candidate matching strategies.
pub trait StrategyRecommender {
    fn recommend(&self, input: &RecommendInput) -> Result<StructureRecommendation, ScoringError>;
}

/// Scoring over HTTP: POSTs the input as JSON, expects the recommendation
/// as the JSON body.
pub struct HttpRecommender {
    pub endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpRecommender {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ScoringError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

impl StrategyRecommender for HttpRecommender {
    fn recommend(&self, input: &RecommendInput) -> Result<StructureRecommendation, ScoringError> {
        debug!("POST {} ({})", self.endpoint, input.absolute_xpath);
        let response = self.client.post(&self.endpoint).json(input).send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

// ============================================================================
// Score cache (explicit, caller-owned)
// ============================================================================

/// Cache key: SHA-1 over every input field.
pub fn cache_key(input: &RecommendInput) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(input.absolute_xpath.as_bytes());
    hasher.update([0u8]);
    hasher.update(input.container_xpath.as_deref().unwrap_or("").as_bytes());
    hasher.update([0u8]);
    if let Some(path) = &input.index_path {
        for i in path {
            hasher.update(i.to_le_bytes());
        }
    }
    hasher.update([0u8]);
    hasher.update(input.xml_snapshot.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
pub struct ScoreCache {
    entries: HashMap<String, StructureRecommendation>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, input: &RecommendInput) -> Option<&StructureRecommendation> {
        self.entries.get(&cache_key(input))
    }

    pub fn insert(&mut self, input: &RecommendInput, rec: StructureRecommendation) {
        self.entries.insert(cache_key(input), rec);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything, e.g. when a new dump replaces the old one.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A recommender consulted through a cache. Failures are not cached.
pub struct CachedRecommender<R: StrategyRecommender> {
    inner: R,
    cache: ScoreCache,
}

impl<R: StrategyRecommender> CachedRecommender<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: ScoreCache::new(),
        }
    }

    pub fn recommend(&mut self, input: &RecommendInput) -> Result<StructureRecommendation, ScoringError> {
        if let Some(hit) = self.cache.get(input) {
            debug!("Score cache hit for {}", input.absolute_xpath);
            return Ok(hit.clone());
        }

        let rec = self.inner.recommend(input)?;
        info!(
            "Scoring recommended '{}' for {} ({} outcomes)",
            rec.recommended,
            input.absolute_xpath,
            rec.outcomes.len()
        );
        self.cache.insert(input, rec.clone());
        Ok(rec)
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ScoreCache {
        &mut self.cache
    }
}
