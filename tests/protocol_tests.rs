use ui_match::protocol::fingerprint::{capture_fingerprint, resource_id_suffix, text_hash};
use ui_match::protocol::matcher::{collect_candidates, select_from_dump};
use ui_match::protocol::protocol_model::{
    AnchorInfo, ElementFingerprint, FallbackConfig, LightAssertions, MatchingContext,
    SmartSelectionProtocol, StrategyPlan, StrategyVariant,
};
use ui_match::scoring::recommend::{ModeOutcome, StructureRecommendation};
use ui_match::selection::selection_model::{SelectionConfig, SelectionMode, SelectionReason};
use ui_match::tree::ui_node::NodeId;

use crate::common::utils::{fixture, fixture_tree};

mod common;

const FOLLOW_BUTTONS: &str = "//node[@resource-id='com.example.social:id/btn_follow']";

fn query_protocol(query: &str) -> SmartSelectionProtocol {
    SmartSelectionProtocol {
        matching_context: Some(MatchingContext {
            query: Some(query.into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn with_context(ctx: MatchingContext) -> SmartSelectionProtocol {
    SmartSelectionProtocol {
        matching_context: Some(MatchingContext {
            query: Some(FOLLOW_BUTTONS.into()),
            ..ctx
        }),
        ..Default::default()
    }
}

fn nodes(protocol: &SmartSelectionProtocol) -> Vec<NodeId> {
    let tree = fixture_tree("follow_list.xml");
    collect_candidates(&tree, protocol).into_iter().map(|c| c.node).collect()
}

// =========================================================================
// Fingerprints
// =========================================================================

#[test]
fn text_hash_is_sha1_hex() {
    assert_eq!(text_hash("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    assert_eq!(text_hash("关注").len(), 40);
}

#[test]
fn resource_id_suffix_after_id_marker() {
    assert_eq!(resource_id_suffix("com.example.social:id/btn_follow"), "btn_follow");
    assert_eq!(resource_id_suffix("btn_follow"), "btn_follow");
}

#[test]
fn capture_fingerprint_records_identity_and_context() {
    let tree = fixture_tree("follow_list.xml");
    let fp = capture_fingerprint(&tree, NodeId(5), None);

    assert_eq!(fp.text_content.as_deref(), Some("关注"));
    assert_eq!(fp.text_hash, Some(text_hash("关注")));
    assert_eq!(fp.resource_id.as_deref(), Some("com.example.social:id/btn_follow"));
    assert_eq!(fp.resource_id_suffix.as_deref(), Some("btn_follow"));
    assert_eq!(
        fp.class_chain.as_deref().unwrap(),
        [
            "android.widget.FrameLayout",
            "androidx.recyclerview.widget.RecyclerView",
            "android.widget.LinearLayout",
            "android.widget.Button",
        ]
    );
    assert_eq!(fp.own_class(), Some("android.widget.Button"));
    assert_eq!(fp.parent_class.as_deref(), Some("android.widget.LinearLayout"));
    assert_eq!(fp.sibling_count, Some(1));
    assert_eq!(fp.child_count, Some(0));
    assert_eq!(fp.depth_level, Some(4));
    assert_eq!(fp.relative_index, Some(1));
    assert_eq!(fp.clickable, Some(true));
    assert_eq!(fp.content_desc, None);
    assert_eq!(fp.package_name.as_deref(), Some("com.example.social"));
    assert_eq!(fp.bounds.as_deref(), Some("[800,300][1000,380]"));

    let sig = fp.bounds_signature.unwrap();
    assert!((sig.x - 900.0 / 1080.0).abs() < 1e-4);
    assert!((sig.y - 340.0 / 2400.0).abs() < 1e-4);
    assert!((sig.width - 200.0 / 1080.0).abs() < 1e-4);
    assert!((sig.height - 80.0 / 2400.0).abs() < 1e-4);

    assert!(fp.has_identity());
    assert!(!ElementFingerprint::default().has_identity());
}

// =========================================================================
// Candidate collection
// =========================================================================

#[test]
fn query_scoped_to_container() {
    let protocol: SmartSelectionProtocol =
        serde_json::from_str(&fixture("follow_protocol.json")).unwrap();
    assert_eq!(nodes(&protocol), vec![NodeId(5), NodeId(8), NodeId(11)]);
}

#[test]
fn missing_container_falls_back_to_whole_tree() {
    let mut protocol = query_protocol(FOLLOW_BUTTONS);
    protocol.anchor.container_xpath = Some("//node[@resource-id='gone']".into());
    assert_eq!(nodes(&protocol), vec![NodeId(5), NodeId(8), NodeId(11)]);
}

#[test]
fn context_container_wins_over_anchor() {
    let protocol = SmartSelectionProtocol {
        anchor: AnchorInfo {
            container_xpath: Some("/hierarchy".into()),
            clickable_parent_xpath: Some("//a".into()),
            ..Default::default()
        },
        matching_context: Some(MatchingContext {
            container_xpath: Some("//node[@text='Carol']".into()),
            ..Default::default()
        }),
        ..Default::default()
    };
    assert_eq!(protocol.container_xpath(), Some("//node[@text='Carol']"));
    assert_eq!(protocol.clickable_parent_xpath(), Some("//a"), "falls back to anchor");
}

#[test]
fn fingerprint_discovery_by_exact_text() {
    let protocol = SmartSelectionProtocol {
        anchor: AnchorInfo {
            fingerprint: ElementFingerprint {
                text_content: Some("关注".into()),
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(nodes(&protocol), vec![NodeId(5), NodeId(11)]);
}

#[test]
fn fingerprint_discovery_with_aliases() {
    let protocol = SmartSelectionProtocol {
        anchor: AnchorInfo {
            fingerprint: ElementFingerprint {
                text_content: Some("Follow".into()),
                ..Default::default()
            },
            ..Default::default()
        },
        matching_context: Some(MatchingContext {
            i18n_aliases: vec!["关注".into()],
            ..Default::default()
        }),
        ..Default::default()
    };
    assert_eq!(nodes(&protocol), vec![NodeId(5), NodeId(8), NodeId(11)]);
}

#[test]
fn fingerprint_discovery_by_resource_id() {
    let protocol = SmartSelectionProtocol {
        anchor: AnchorInfo {
            fingerprint: ElementFingerprint {
                resource_id: Some("com.example.social:id/name".into()),
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(nodes(&protocol), vec![NodeId(4), NodeId(7), NodeId(10)]);
}

#[test]
fn light_assertions_filter_candidates() {
    let exclude = with_context(MatchingContext {
        light_assertions: Some(LightAssertions {
            exclude_text: vec!["已".into()],
            ..Default::default()
        }),
        ..Default::default()
    });
    assert_eq!(nodes(&exclude), vec![NodeId(5), NodeId(11)]);

    let must_contain = with_context(MatchingContext {
        light_assertions: Some(LightAssertions {
            must_contain_text: vec!["Bob".into()],
            ..Default::default()
        }),
        ..Default::default()
    });
    assert!(nodes(&must_contain).is_empty());

    let clickable = with_context(MatchingContext {
        light_assertions: Some(LightAssertions {
            must_be_clickable: Some(true),
            must_be_visible: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    });
    assert_eq!(nodes(&clickable).len(), 3);
}

#[test]
fn container_bounds_radius_and_cap() {
    let inside = with_context(MatchingContext {
        container_bounds: Some("[0,200][1080,600]".into()),
        ..Default::default()
    });
    assert_eq!(nodes(&inside), vec![NodeId(5), NodeId(8)]);

    let mut near = with_context(MatchingContext {
        search_radius: Some(50),
        ..Default::default()
    });
    near.anchor.fingerprint.bounds = Some("[800,700][1000,780]".into());
    assert_eq!(nodes(&near), vec![NodeId(11)]);

    let capped = with_context(MatchingContext {
        max_candidates: Some(2),
        ..Default::default()
    });
    assert_eq!(nodes(&capped), vec![NodeId(5), NodeId(8)]);
}

#[test]
fn clickable_parent_becomes_tap_target() {
    let tree = fixture_tree("follow_list.xml");
    let protocol = SmartSelectionProtocol {
        anchor: AnchorInfo {
            clickable_parent_xpath: Some("//node[@resource-id='com.example.social:id/item']".into()),
            ..Default::default()
        },
        ..query_protocol("//node[@resource-id='com.example.social:id/name']")
    };

    let candidates = collect_candidates(&tree, &protocol);
    let targets: Vec<(NodeId, NodeId)> = candidates.iter().map(|c| (c.node, c.target)).collect();
    assert_eq!(
        targets,
        vec![
            (NodeId(4), NodeId(3)),
            (NodeId(7), NodeId(7)),
            (NodeId(10), NodeId(10)),
        ],
        "only the enclosing parent redirects; others have no clickable ancestor"
    );
}

#[test]
fn absolute_path_fallback_when_nothing_matches() {
    let mut protocol = query_protocol("//node[@text='zzz']");
    protocol.fallback = Some(FallbackConfig {
        absolute_xpath: Some("/hierarchy/node[1]/node[1]/node[2]/node[2]".into()),
        allow_fallback: true,
    });
    assert_eq!(nodes(&protocol), vec![NodeId(8)]);

    protocol.fallback.as_mut().unwrap().allow_fallback = false;
    assert!(nodes(&protocol).is_empty());
}

// =========================================================================
// Whole pipeline
// =========================================================================

#[test]
fn select_from_dump_ignores_empty_fingerprint() {
    let mut protocol = query_protocol(FOLLOW_BUTTONS);
    protocol.selection = SelectionConfig::with_mode(SelectionMode::MatchOriginal);

    let (_, outcome) = select_from_dump(&fixture("follow_list.xml"), &protocol).unwrap();
    assert_eq!(outcome.nodes(), vec![NodeId(5)]);
    assert_eq!(outcome.selected[0].reason, SelectionReason::First);
}

#[test]
fn select_from_dump_reselects_captured_element() {
    let tree = fixture_tree("follow_list.xml");
    let mut protocol = query_protocol(FOLLOW_BUTTONS);
    protocol.anchor.fingerprint = capture_fingerprint(&tree, NodeId(11), None);

    let (_, outcome) = select_from_dump(&fixture("follow_list.xml"), &protocol).unwrap();
    assert_eq!(outcome.nodes(), vec![NodeId(11)], "auto mode matches the original");
}

#[test]
fn select_from_dump_propagates_parse_errors() {
    assert!(select_from_dump(&fixture("malformed.xml"), &SmartSelectionProtocol::default()).is_err());
}

#[test]
fn protocol_round_trips_through_json() {
    let tree = fixture_tree("follow_list.xml");
    let mut protocol: SmartSelectionProtocol =
        serde_json::from_str(&fixture("follow_protocol.json")).unwrap();
    protocol.anchor.fingerprint = capture_fingerprint(&tree, NodeId(5), None);

    let json = serde_json::to_string(&protocol).unwrap();
    let back: SmartSelectionProtocol = serde_json::from_str(&json).unwrap();
    assert_eq!(back, protocol);
}

// =========================================================================
// Strategy plan
// =========================================================================

fn outcome(mode: &str, conf: f32, passed_gate: bool) -> ModeOutcome {
    ModeOutcome {
        mode: mode.into(),
        conf,
        explain: Some(format!("{} explained", mode)),
        passed_gate,
    }
}

#[test]
fn plan_orders_gate_passing_outcomes_by_confidence() {
    let rec = StructureRecommendation {
        recommended: "self_id".into(),
        outcomes: vec![
            outcome("self_id", 0.9, true),
            outcome("card_subtree", 0.95, true),
            outcome("leaf_context", 0.99, false),
            outcome("mystery_mode", 1.0, true),
        ],
        step_plan_mode: None,
        plan_suggest: None,
        config_suggest: None,
    };

    let plan = StrategyPlan::from_recommendation(&rec).unwrap();
    let kinds: Vec<StrategyVariant> = plan.plan.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![StrategyVariant::RegionTextToParent, StrategyVariant::SelfId]
    );
    assert_eq!(plan.recommended_index, 1);
    assert_eq!(plan.selected.kind, StrategyVariant::SelfId);
    assert_eq!(plan.selected.description, "self_id explained");
}

#[test]
fn plan_is_none_without_passing_outcomes() {
    let rec = StructureRecommendation {
        recommended: "self_id".into(),
        outcomes: vec![outcome("self_id", 0.9, false)],
        step_plan_mode: None,
        plan_suggest: None,
        config_suggest: None,
    };
    assert!(StrategyPlan::from_recommendation(&rec).is_none());
    assert_eq!(StrategyVariant::from_mode_name("nonsense"), None);
}
