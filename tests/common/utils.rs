use std::cell::Cell;
use std::path::PathBuf;
use std::time::Duration;

use ui_match::error::{DispatchError, ScoringError};
use ui_match::scoring::recommend::{RecommendInput, StrategyRecommender, StructureRecommendation};
use ui_match::selection::batch::Pacer;
use ui_match::selection::dispatch::ActionDispatcher;
use ui_match::tree::parser::parse_ui_dump;
use ui_match::tree::ui_node::UiTree;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

pub fn fixture_tree(name: &str) -> UiTree {
    parse_ui_dump(&fixture(name)).unwrap()
}

/// Wrap `<node>` markup in a full-screen hierarchy.
pub fn dump(body: &str) -> String {
    format!(
        r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0"><node class="android.widget.FrameLayout" bounds="[0,0][1080,2400]">{}</node></hierarchy>"#,
        body
    )
}

pub fn tree_of(body: &str) -> UiTree {
    parse_ui_dump(&dump(body)).unwrap()
}

/// Button node with the given text and bounds.
pub fn button(text: &str, bounds: &str) -> String {
    format!(
        r#"<node text="{}" resource-id="com.example:id/btn" class="android.widget.Button" clickable="true" bounds="{}" />"#,
        text, bounds
    )
}

/// Records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pub pauses: Vec<Duration>,
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

/// Fails the taps whose (0-based) call index is listed.
#[derive(Debug, Default)]
pub struct FlakyDispatcher {
    pub fail_on: Vec<usize>,
    pub calls: usize,
    pub taps: Vec<(i32, i32)>,
}

impl ActionDispatcher for FlakyDispatcher {
    fn tap(&mut self, x: i32, y: i32) -> Result<(), DispatchError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(DispatchError::Rejected(format!("tap #{} refused", call)));
        }
        self.taps.push((x, y));
        Ok(())
    }
}

/// Returns a canned recommendation and counts calls.
pub struct MockRecommender {
    pub response: Option<StructureRecommendation>,
    pub calls: Cell<usize>,
}

impl MockRecommender {
    pub fn returning(rec: StructureRecommendation) -> Self {
        Self {
            response: Some(rec),
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            calls: Cell::new(0),
        }
    }
}

impl StrategyRecommender for MockRecommender {
    fn recommend(&self, _input: &RecommendInput) -> Result<StructureRecommendation, ScoringError> {
        self.calls.set(self.calls.get() + 1);
        self.response
            .clone()
            .ok_or_else(|| ScoringError::Unavailable("mock offline".into()))
    }
}
