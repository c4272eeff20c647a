use clap::Parser;
use ui_match::cli::commands::{cmd_fingerprint, cmd_query, cmd_select, parse_point};
use ui_match::cli::config::{load_config, log_level, read_config, AppConfig, Cli, Commands};
use ui_match::error::AppError;
use ui_match::trace::logger::TraceLogger;
use ui_match::trace::trace::{TraceEvent, TraceKind};

use crate::common::utils::fixture_path;

mod common;

fn temp_file(name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("ui-match-{}-{}", std::process::id(), name));
    let _ = std::fs::remove_file(&path);
    path
}

fn fixture_str(name: &str) -> String {
    fixture_path(name).display().to_string()
}

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_query() {
    let cli = Cli::parse_from(["ui-match", "query", "--dump", "d.xml", "--xpath", "//node[@text='A']"]);
    match cli.command {
        Commands::Query { dump, xpath, all } => {
            assert_eq!(dump, "d.xml");
            assert_eq!(xpath, "//node[@text='A']");
            assert!(!all, "--all defaults to off");
        }
        _ => panic!("Expected Query command"),
    }
    assert_eq!(cli.verbose, 0);
    assert!(cli.config.is_none());
}

#[test]
fn cli_parse_layers_with_hit() {
    let cli = Cli::parse_from([
        "ui-match", "-vv", "layers", "--dump", "d.xml", "--hit", "540,2300", "--overlay-only",
    ]);
    assert_eq!(cli.verbose, 2);
    match cli.command {
        Commands::Layers { dump, hit, overlay_only } => {
            assert_eq!(dump, "d.xml");
            assert_eq!(hit.as_deref(), Some("540,2300"));
            assert!(overlay_only);
        }
        _ => panic!("Expected Layers command"),
    }
}

#[test]
fn cli_parse_select_all_args() {
    let cli = Cli::parse_from([
        "ui-match",
        "select",
        "--dump",
        "d.xml",
        "--protocol",
        "p.json",
        "--execute",
        "--device",
        "emulator-5554",
        "--trace",
        "t.jsonl",
        "--config",
        "custom.yaml",
    ]);
    assert_eq!(cli.config.as_deref(), Some("custom.yaml"), "global flag after subcommand");
    match cli.command {
        Commands::Select { dump, protocol, execute, device, trace } => {
            assert_eq!(dump, "d.xml");
            assert_eq!(protocol, "p.json");
            assert!(execute);
            assert_eq!(device.as_deref(), Some("emulator-5554"));
            assert_eq!(trace.as_deref(), Some("t.jsonl"));
        }
        _ => panic!("Expected Select command"),
    }
}

#[test]
fn cli_parse_recommend_and_fingerprint() {
    let cli = Cli::parse_from([
        "ui-match", "recommend", "--dump", "d.xml", "--xpath", "/hierarchy", "--endpoint", "http://x",
    ]);
    assert!(matches!(
        cli.command,
        Commands::Recommend { ref endpoint, container: None, .. } if endpoint.as_deref() == Some("http://x")
    ));

    let cli = Cli::parse_from(["ui-match", "fingerprint", "--dump", "d.xml", "--xpath", "/hierarchy"]);
    assert!(matches!(cli.command, Commands::Fingerprint { .. }));
}

#[test]
fn cli_rejects_missing_required_args() {
    assert!(Cli::try_parse_from(["ui-match", "query", "--dump", "d.xml"]).is_err());
    assert!(Cli::try_parse_from(["ui-match", "explode"]).is_err());
}

#[test]
fn verbosity_maps_to_log_level() {
    assert_eq!(log_level(0), log::LevelFilter::Warn);
    assert_eq!(log_level(1), log::LevelFilter::Info);
    assert_eq!(log_level(2), log::LevelFilter::Debug);
    assert_eq!(log_level(7), log::LevelFilter::Trace);
}

#[test]
fn parse_point_accepts_spaces_and_rejects_junk() {
    assert_eq!(parse_point("540,2300").unwrap(), (540, 2300));
    assert_eq!(parse_point(" 1 , -2 ").unwrap(), (1, -2));
    assert!(matches!(parse_point("540"), Err(AppError::InvalidArgument(_))));
    assert!(matches!(parse_point("a,b"), Err(AppError::InvalidArgument(_))));
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_defaults_when_file_missing() {
    let config = load_config(Some("/nonexistent/ui-match.yaml"));
    assert_eq!(config.layer.screen_height, 2400);
    assert_eq!(config.layer.bottom_region_px, 500);
    assert_eq!(config.batch.interval_ms, 2000);
    assert_eq!(config.scoring.timeout_secs, 10);
    assert_eq!(config.adb.path, "adb");
    assert!(config.trace.path.is_none());
}

#[test]
fn config_partial_yaml_keeps_other_defaults() {
    let path = temp_file("partial.yaml");
    std::fs::write(
        &path,
        "layer:\n  screen_height: 1920\nbatch:\n  interval_ms: 500\n  jitter_ms: 100\nadb:\n  device: emulator-5554\n",
    )
    .unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.layer.screen_height, 1920);
    assert_eq!(config.layer.bottom_region_px, 500);
    assert_eq!(config.batch.interval_ms, 500);
    assert_eq!(config.batch.jitter_ms, 100);
    assert!(config.batch.continue_on_error);
    assert_eq!(config.adb.path, "adb");
    assert_eq!(config.adb.device.as_deref(), Some("emulator-5554"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn config_malformed_yaml_falls_back_to_defaults() {
    let path = temp_file("broken.yaml");
    std::fs::write(&path, "layer: [this is: not valid").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.layer.screen_height, AppConfig::default().layer.screen_height);

    let strict = read_config(path.to_str().unwrap());
    assert!(matches!(strict, Err(AppError::Yaml(_))), "got {:?}", strict.map(|_| ()));
    assert!(matches!(
        read_config("/nonexistent/ui-match.yaml"),
        Err(AppError::Io(_))
    ));

    let _ = std::fs::remove_file(&path);
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn cmd_query_runs_against_fixture() {
    let dump = fixture_str("follow_list.xml");
    assert!(cmd_query(&dump, "//node[@text='关注']", true).is_ok());
    assert!(cmd_query(&dump, "//node[@text='nobody']", false).is_ok(), "no match is not an error");
    assert!(matches!(
        cmd_query(&dump, "//node[@a='1' and @b='2']", false),
        Err(AppError::Query(_))
    ));
}

#[test]
fn cmd_query_reports_parse_and_io_errors() {
    assert!(matches!(
        cmd_query(&fixture_str("malformed.xml"), "/hierarchy", false),
        Err(AppError::Parse(_))
    ));
    assert!(matches!(
        cmd_query("/nonexistent/dump.xml", "/hierarchy", false),
        Err(AppError::Io(_))
    ));
}

#[test]
fn cmd_fingerprint_needs_a_match() {
    let dump = fixture_str("follow_list.xml");
    assert!(cmd_fingerprint(&dump, "/hierarchy/node[1]/node[1]/node[1]/node[2]").is_ok());
    assert!(matches!(
        cmd_fingerprint(&dump, "//node[@text='nobody']"),
        Err(AppError::InvalidArgument(_))
    ));
}

#[test]
fn cmd_select_dry_run_writes_trace() {
    let trace = temp_file("select.jsonl");

    let ok = cmd_select(
        &fixture_str("follow_list.xml"),
        &fixture_str("follow_protocol.json"),
        false,
        None,
        trace.to_str(),
        &AppConfig::default(),
    )
    .unwrap();
    assert!(ok);

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&trace)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 1, "selection only, nothing executed");
    assert_eq!(lines[0]["kind"], "selection");
    assert_eq!(lines[0]["found"], 3);
    assert_eq!(lines[0]["selected"], serde_json::json!([5, 11]));

    let _ = std::fs::remove_file(&trace);
}

// ============================================================================
// Trace Logger Tests
// ============================================================================

#[test]
fn trace_logger_appends_jsonl() {
    let path = temp_file("trace.jsonl");
    let logger = TraceLogger::new(path.to_str().unwrap());
    assert!(logger.is_enabled());

    logger.log(&TraceEvent::now(1, TraceKind::Click).with_error("boom"));
    logger.log(&TraceEvent::now(2, TraceKind::BatchDone));
    assert_eq!(logger.events_written(), 2);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["step"], 1);
    assert_eq!(first["kind"], "click");
    assert_eq!(first["error"], "boom");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn trace_logger_holds_clicks_until_batch_ends() {
    let path = temp_file("batched.jsonl");
    let logger = TraceLogger::new(path.to_str().unwrap());

    logger.log(&TraceEvent::now(0, TraceKind::Selection));
    logger.log(&TraceEvent::now(1, TraceKind::Click));
    logger.log(&TraceEvent::now(2, TraceKind::Click));
    assert_eq!(logger.events_written(), 1, "selection flushes at once");
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);

    logger.log(&TraceEvent::now(3, TraceKind::BatchDone));
    assert_eq!(logger.events_written(), 4);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);

    logger.log(&TraceEvent::now(4, TraceKind::Click));
    drop(logger);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap().lines().count(),
        5,
        "dropping the logger writes the rest"
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn trace_logger_unwritable_path_is_noop() {
    let logger = TraceLogger::new("/nonexistent/dir/trace.jsonl");
    assert!(!logger.is_enabled());
    logger.log(&TraceEvent::now(1, TraceKind::Selection));
    logger.flush();
    assert_eq!(logger.events_written(), 0);
    assert!(!TraceLogger::disabled().is_enabled());
}
