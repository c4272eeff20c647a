use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::selection::batch::{BatchExecutionResult, ClickResult};
use crate::selection::selection_model::SelectionOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Selection,
    Click,
    BatchDone,
}

/// One JSONL line of the selection trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,
    pub kind: TraceKind,

    pub mode: Option<String>,
    pub found: Option<usize>,
    pub selected: Vec<usize>,
    pub excluded: Vec<String>,

    pub node: Option<usize>,
    pub point: Option<(i32, i32)>,
    pub success: Option<bool>,
    pub confidence: Option<f32>,
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn now(step: u64, kind: TraceKind) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            step,
            kind,
            mode: None,
            found: None,
            selected: vec![],
            excluded: vec![],
            node: None,
            point: None,
            success: None,
            confidence: None,
            error: None,
        }
    }

    pub fn selection(step: u64, outcome: &SelectionOutcome) -> Self {
        let mut event = Self::now(step, TraceKind::Selection);
        event.mode = Some(format!("{:?}", outcome.mode));
        event.found = Some(outcome.total_found);
        event.selected = outcome.selected.iter().map(|s| s.node.0).collect();
        event.excluded = outcome
            .excluded
            .iter()
            .map(|e| format!("{}: {:?}", e.node, e.cause))
            .collect();
        event.confidence = outcome.selected.iter().find_map(|s| s.score);
        event
    }

    pub fn click(step: u64, result: &ClickResult) -> Self {
        let mut event = Self::now(step, TraceKind::Click);
        event.node = Some(result.node.0);
        event.point = Some((result.x, result.y));
        event.success = Some(result.success);
        event.error = result.error.clone();
        event
    }

    pub fn batch_done(step: u64, result: &BatchExecutionResult) -> Self {
        let mut event = Self::now(step, TraceKind::BatchDone);
        event.found = Some(result.total_targets);
        event.success = Some(result.all_succeeded());
        if result.cancelled {
            event.error = Some("cancelled".to_string());
        }
        event
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
