use std::time::Duration;

use log::info;

use crate::cli::config::{AppConfig, DEFAULT_SCORING_ENDPOINT};
use crate::error::AppError;
use crate::layer::render::{HitTestOptions, LayerAnalysis};
use crate::protocol::fingerprint::capture_fingerprint;
use crate::protocol::matcher::select_from_dump;
use crate::protocol::protocol_model::{SmartSelectionProtocol, StrategyPlan};
use crate::scoring::recommend::{HttpRecommender, RecommendInput, StrategyRecommender};
use crate::selection::batch::{BatchExecutor, CancelToken, ThreadPacer};
use crate::selection::dispatch::AdbDispatcher;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;
use crate::tree::parser::parse_ui_dump;
use crate::tree::ui_node::{NodeId, UiTree};
use crate::xpath::evaluator::{absolute_path, try_find_all, try_find_first};

// ============================================================================
// query subcommand
// ============================================================================

pub fn cmd_query(dump: &str, xpath: &str, all: bool) -> Result<(), AppError> {
    let tree = load_tree(dump)?;

    let hits: Vec<NodeId> = if all {
        try_find_all(&tree, xpath)?
    } else {
        try_find_first(&tree, xpath)?.into_iter().collect()
    };

    if hits.is_empty() {
        println!("No match for {}", xpath);
        return Ok(());
    }

    for id in hits {
        println!("{}  {}  {}", id, absolute_path(&tree, id), tree.node(id).describe());
    }
    Ok(())
}

// ============================================================================
// layers subcommand
// ============================================================================

pub fn cmd_layers(
    dump: &str,
    hit: Option<&str>,
    overlay_only: bool,
    config: &AppConfig,
) -> Result<(), AppError> {
    let tree = load_tree(dump)?;
    let analysis = LayerAnalysis::analyze(&tree, &config.layer);

    match hit {
        Some(raw) => {
            let (x, y) = parse_point(raw)?;
            let options = HitTestOptions {
                overlay_only,
                topmost_only: false,
            };
            let hits = analysis.hit_test(x, y, options);
            println!("{} layer(s) at ({}, {}), topmost first:", hits.len(), x, y);
            for entry in hits {
                println!(
                    "  {} {:?} {} {}",
                    entry.node,
                    entry.semantic,
                    entry.bounds,
                    tree.node(entry.node).describe()
                );
            }
        }
        None => {
            let entries: Vec<_> = if overlay_only {
                analysis.overlays().collect()
            } else {
                analysis.render_order.iter().collect()
            };
            for entry in entries {
                println!(
                    "{}{} {:?}{} {}",
                    "  ".repeat(tree.node(entry.node).depth),
                    entry.node,
                    entry.semantic,
                    if entry.is_overlay { " [overlay]" } else { "" },
                    entry.bounds
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// fingerprint subcommand
// ============================================================================

pub fn cmd_fingerprint(dump: &str, xpath: &str) -> Result<(), AppError> {
    let tree = load_tree(dump)?;
    let id = try_find_first(&tree, xpath)?
        .ok_or_else(|| AppError::InvalidArgument(format!("no element at {}", xpath)))?;

    let fingerprint = capture_fingerprint(&tree, id, None);
    println!("{}", serde_json::to_string_pretty(&fingerprint)?);
    Ok(())
}

// ============================================================================
// select subcommand
// ============================================================================

/// Run a protocol against a dump. Returns whether every executed tap
/// succeeded (always true without `--execute`).
pub fn cmd_select(
    dump: &str,
    protocol_path: &str,
    execute: bool,
    device: Option<&str>,
    trace_path: Option<&str>,
    config: &AppConfig,
) -> Result<bool, AppError> {
    let xml = std::fs::read_to_string(dump)?;
    let protocol = load_protocol(protocol_path)?;
    let tracer = match trace_path.or(config.trace.path.as_deref()) {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    let (tree, outcome) = select_from_dump(&xml, &protocol)?;
    tracer.log(&TraceEvent::selection(0, &outcome));

    println!(
        "{:?}: {} found, {} after filters, {} after dedup",
        outcome.mode, outcome.total_found, outcome.after_filters, outcome.after_dedup
    );
    for s in &outcome.selected {
        println!(
            "  selected {} (tap {}) {:?}  {}",
            s.node,
            s.target,
            s.reason,
            tree.node(s.node).describe()
        );
    }
    for e in &outcome.excluded {
        println!("  excluded {} {:?}", e.node, e.cause);
    }

    if outcome.is_empty() {
        println!("No eligible candidate.");
        return Ok(true);
    }
    if !execute {
        return Ok(true);
    }

    let batch = protocol
        .selection
        .batch_config
        .clone()
        .unwrap_or_else(|| config.batch.clone());
    let mut dispatcher = AdbDispatcher::new(&config.adb.path, device.or(config.adb.device.as_deref()));
    let mut executor = BatchExecutor::new(batch, protocol.selection.random_seed);
    let cancel = CancelToken::new();

    let result = executor.run(
        &tree,
        &outcome.selected,
        &mut dispatcher,
        &mut ThreadPacer,
        &cancel,
        &mut |p| info!("Progress {}/{}", p.completed, p.total),
    );

    for (step, click) in result.results.iter().enumerate() {
        tracer.log(&TraceEvent::click(step as u64 + 1, click));
    }
    tracer.log(&TraceEvent::batch_done(result.results.len() as u64 + 1, &result));
    info!("Trace: {} event(s) written", tracer.events_written());

    println!(
        "Executed {}/{}: {} ok, {} failed, {} skipped ({} ms)",
        result.results.len(),
        result.total_targets,
        result.successful,
        result.failed,
        result.skipped,
        result.total_time_ms
    );
    Ok(result.all_succeeded())
}

// ============================================================================
// recommend subcommand
// ============================================================================

pub fn cmd_recommend(
    dump: &str,
    xpath: &str,
    container: Option<&str>,
    endpoint: Option<&str>,
    config: &AppConfig,
) -> Result<(), AppError> {
    let xml = std::fs::read_to_string(dump)?;
    let tree = parse_ui_dump(&xml)?;
    let id = try_find_first(&tree, xpath)?
        .ok_or_else(|| AppError::InvalidArgument(format!("no element at {}", xpath)))?;

    let endpoint = endpoint
        .or(config.scoring.endpoint.as_deref())
        .unwrap_or(DEFAULT_SCORING_ENDPOINT);
    let recommender = HttpRecommender::new(endpoint, Duration::from_secs(config.scoring.timeout_secs))?;

    let input = RecommendInput::for_node(&tree, id, &xml, container);
    let rec = recommender.recommend(&input)?;

    println!("Recommended: {}", rec.recommended);
    for o in &rec.outcomes {
        println!(
            "  {:<32} {:.2} {}{}",
            o.mode,
            o.conf,
            if o.passed_gate { "pass" } else { "gate" },
            o.explain.as_deref().map(|e| format!("  {}", e)).unwrap_or_default()
        );
    }

    match StrategyPlan::from_recommendation(&rec) {
        Some(plan) => println!("{}", serde_json::to_string_pretty(&plan)?),
        None => println!("No outcome passed the gate."),
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

pub fn load_tree(path: &str) -> Result<UiTree, AppError> {
    let xml = std::fs::read_to_string(path)?;
    Ok(parse_ui_dump(&xml)?)
}

pub fn load_protocol(path: &str) -> Result<SmartSelectionProtocol, AppError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse `X,Y` (spaces allowed around either number).
pub fn parse_point(raw: &str) -> Result<(i32, i32), AppError> {
    let invalid = || AppError::InvalidArgument(format!("expected X,Y, got '{}'", raw));

    let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    Ok((x, y))
}
