use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::DispatchError;
use crate::selection::dispatch::ActionDispatcher;
use crate::selection::selection_model::{BatchConfig, SelectedCandidate};
use crate::tree::ui_node::{NodeId, UiTree};

/// Waits between batch items.
pub trait Pacer {
    fn pause(&mut self, duration: Duration);
}

pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Cooperative cancellation, honoured between items only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClickResult {
    pub index: usize,
    pub node: NodeId,
    pub success: bool,
    pub x: i32,
    pub y: i32,
    pub error: Option<String>,
    pub time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub last_success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchExecutionResult {
    pub total_targets: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub total_time_ms: u64,
    pub results: Vec<ClickResult>,
    pub progress_logs: Vec<String>,
}

impl BatchExecutionResult {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && !self.cancelled
    }
}

/// Runs selected candidates one after another with paced gaps.
pub struct BatchExecutor {
    config: BatchConfig,
    rng: StdRng,
}

impl BatchExecutor {
    /// `seed` makes jitter reproducible.
    pub fn new(config: BatchConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Delay before the next item: interval plus uniform jitter.
    fn next_delay(&mut self) -> Duration {
        let jitter = if self.config.jitter_ms > 0 {
            self.rng.gen_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.config.interval_ms.saturating_add(jitter))
    }

    pub fn run(
        &mut self,
        tree: &UiTree,
        selected: &[SelectedCandidate],
        dispatcher: &mut dyn ActionDispatcher,
        pacer: &mut dyn Pacer,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&BatchProgress),
    ) -> BatchExecutionResult {
        let start = Instant::now();
        let total = selected.len();
        let mut results = Vec::with_capacity(total);
        let mut progress_logs = Vec::new();
        let mut cancelled = false;

        for (index, item) in selected.iter().enumerate() {
            if index > 0 && !cancel.is_cancelled() {
                let delay = self.next_delay();
                pacer.pause(delay);
            }

            if cancel.is_cancelled() {
                info!("Batch cancelled before item {}/{}", index + 1, total);
                cancelled = true;
                break;
            }

            let item_start = Instant::now();
            let (x, y, outcome) = match tree.node(item.target).bounds() {
                Some(b) if !b.is_empty() => {
                    let (x, y) = b.center();
                    (x, y, dispatcher.tap(x, y))
                }
                _ => (0, 0, Err(DispatchError::NoBounds(item.target.0))),
            };

            let success = outcome.is_ok();
            let error = outcome.err().map(|e| e.to_string());
            if let Some(e) = &error {
                warn!("Batch item {} ({}) failed: {}", index + 1, item.node, e);
            }

            results.push(ClickResult {
                index,
                node: item.node,
                success,
                x,
                y,
                error,
                time_ms: item_start.elapsed().as_millis() as u64,
            });

            if self.config.show_progress {
                let progress = BatchProgress {
                    completed: index + 1,
                    total,
                    last_success: success,
                };
                progress_logs.push(format!(
                    "{}/{} {}",
                    progress.completed,
                    progress.total,
                    if success { "ok" } else { "failed" }
                ));
                on_progress(&progress);
            }

            if !success && !self.config.continue_on_error {
                info!("Stopping batch after failure at item {}", index + 1);
                break;
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;

        BatchExecutionResult {
            total_targets: total,
            successful,
            failed,
            skipped: total - results.len(),
            cancelled,
            total_time_ms: start.elapsed().as_millis() as u64,
            results,
            progress_logs,
        }
    }
}
