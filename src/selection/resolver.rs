use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::protocol::protocol_model::ElementFingerprint;
use crate::selection::dedup::{dedup_by_position, sort_candidates};
use crate::selection::exclude::{auto_excluded_state, CompiledRules};
use crate::selection::selection_model::{
    Candidate, ExcludedCandidate, ExclusionCause, SelectedCandidate, SelectionConfig,
    SelectionMode, SelectionOutcome, SelectionReason, DEFAULT_MIN_CONFIDENCE,
    DEFAULT_POSITION_TOLERANCE,
};
use crate::selection::similarity::similarity;
use crate::tree::ui_node::UiTree;

/// Decide which candidates get acted on.
///
/// Stages: invalid bounds → exclude rules → state auto-exclusion → dedup →
/// ordering → mode. Each stage can only shrink the set. An empty selection
/// is a valid outcome.
pub fn resolve(
    tree: &UiTree,
    candidates: &[Candidate],
    config: &SelectionConfig,
    fingerprint: Option<&ElementFingerprint>,
) -> SelectionOutcome {
    let mut excluded = Vec::new();
    let rules = CompiledRules::compile(&config.exclude_rules);
    let target_text = fingerprint.and_then(|fp| fp.text_content.as_deref());

    let mut remaining = Vec::with_capacity(candidates.len());
    for &candidate in candidates {
        match exclusion_cause(tree, candidate, config, &rules, target_text) {
            Some(cause) => {
                debug!("Excluded {}: {:?}", candidate.node, cause);
                excluded.push(ExcludedCandidate {
                    node: candidate.node,
                    cause,
                });
            }
            None => remaining.push(candidate),
        }
    }
    let after_filters = remaining.len();

    let tolerance = config
        .filters
        .position_tolerance
        .unwrap_or(DEFAULT_POSITION_TOLERANCE);
    let (mut remaining, dropped) = dedup_by_position(tree, remaining, tolerance);
    excluded.extend(dropped.into_iter().map(|(node, of)| ExcludedCandidate {
        node,
        cause: ExclusionCause::Duplicate { of },
    }));
    let after_dedup = remaining.len();

    sort_candidates(tree, &mut remaining, config.order);

    let selected = apply_mode(tree, &remaining, config, fingerprint, &mut excluded);

    info!(
        "Selection ({:?}): {} found, {} after filters, {} after dedup, {} selected",
        config.mode,
        candidates.len(),
        after_filters,
        after_dedup,
        selected.len()
    );

    SelectionOutcome {
        mode: config.mode,
        selected,
        excluded,
        total_found: candidates.len(),
        after_filters,
        after_dedup,
    }
}

fn exclusion_cause(
    tree: &UiTree,
    candidate: Candidate,
    config: &SelectionConfig,
    rules: &CompiledRules,
    target_text: Option<&str>,
) -> Option<ExclusionCause> {
    let node = tree.node(candidate.node);

    let target = tree.node(candidate.target);
    if let Some(raw) = target.attr("bounds") {
        if target.bounds().is_none_or(|b| b.is_empty()) {
            debug!("Candidate {} has unusable bounds {:?}", candidate.node, raw);
            return Some(ExclusionCause::InvalidBounds);
        }
    }

    if let Some(rule) = rules.first_match(node) {
        return Some(ExclusionCause::Rule {
            id: rule.id.clone(),
        });
    }

    auto_excluded_state(
        node,
        target_text,
        config.filters.auto_exclude,
        &config.filters.exclude_states,
    )
    .map(|state| ExclusionCause::AutoState { state })
}

fn apply_mode(
    tree: &UiTree,
    candidates: &[Candidate],
    config: &SelectionConfig,
    fingerprint: Option<&ElementFingerprint>,
    excluded: &mut Vec<ExcludedCandidate>,
) -> Vec<SelectedCandidate> {
    if candidates.is_empty() {
        return Vec::new();
    }

    match config.mode {
        SelectionMode::Auto => match fingerprint {
            Some(fp) => select_match_original(tree, candidates, config, fp, true, excluded),
            None => select_first(candidates),
        },
        SelectionMode::MatchOriginal => match fingerprint {
            Some(fp) => select_match_original(
                tree,
                candidates,
                config,
                fp,
                config.fallback_to_first,
                excluded,
            ),
            None if config.fallback_to_first => select_first(candidates),
            None => Vec::new(),
        },
        SelectionMode::First => select_first(candidates),
        SelectionMode::Last => select_last(candidates),
        SelectionMode::Random => select_random(candidates, config.random_seed),
        SelectionMode::All => select_all(candidates, config),
    }
}

fn picked(candidate: Candidate, reason: SelectionReason, score: Option<f32>) -> SelectedCandidate {
    SelectedCandidate {
        node: candidate.node,
        target: candidate.target,
        reason,
        score,
    }
}

fn select_first(candidates: &[Candidate]) -> Vec<SelectedCandidate> {
    candidates
        .first()
        .map(|&c| picked(c, SelectionReason::First, None))
        .into_iter()
        .collect()
}

fn select_last(candidates: &[Candidate]) -> Vec<SelectedCandidate> {
    candidates
        .last()
        .map(|&c| picked(c, SelectionReason::Last, None))
        .into_iter()
        .collect()
}

/// Uniform pick. Candidates are put into document order first so the pick
/// depends only on the seed and the candidate set.
fn select_random(candidates: &[Candidate], seed: Option<u64>) -> Vec<SelectedCandidate> {
    let mut pool = candidates.to_vec();
    pool.sort_by_key(|c| c.node);

    let index = match seed {
        Some(seed) => StdRng::seed_from_u64(seed).gen_range(0..pool.len()),
        None => rand::thread_rng().gen_range(0..pool.len()),
    };
    debug!("Random pick {} of {} (seed {:?})", index, pool.len(), seed);

    vec![picked(pool[index], SelectionReason::Random { index, seed }, None)]
}

fn select_match_original(
    tree: &UiTree,
    candidates: &[Candidate],
    config: &SelectionConfig,
    fingerprint: &ElementFingerprint,
    fallback_to_first: bool,
    excluded: &mut Vec<ExcludedCandidate>,
) -> Vec<SelectedCandidate> {
    let min_confidence = config
        .filters
        .min_confidence
        .unwrap_or(DEFAULT_MIN_CONFIDENCE);

    let mut best: Option<(Candidate, f32)> = None;
    for &candidate in candidates {
        let score = similarity(tree.node(candidate.node), fingerprint);
        debug!("Similarity {} = {:.3}", candidate.node, score);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    let Some((winner, score)) = best else {
        return Vec::new();
    };

    if score >= min_confidence {
        return vec![picked(
            winner,
            SelectionReason::MatchOriginal { score },
            Some(score),
        )];
    }

    if fallback_to_first {
        debug!("Best similarity {:.3} < {:.3}, falling back to first", score, min_confidence);
        return candidates
            .first()
            .map(|&c| picked(c, SelectionReason::FallbackFirst { best_score: score }, None))
            .into_iter()
            .collect();
    }

    excluded.push(ExcludedCandidate {
        node: winner.node,
        cause: ExclusionCause::BelowConfidence { score },
    });
    Vec::new()
}

fn select_all(candidates: &[Candidate], config: &SelectionConfig) -> Vec<SelectedCandidate> {
    let limit = config
        .batch_config
        .as_ref()
        .and_then(|b| b.max_count)
        .map(|m| m as usize)
        .unwrap_or(usize::MAX);

    candidates
        .iter()
        .take(limit)
        .enumerate()
        .map(|(position, &c)| picked(c, SelectionReason::Batch { position }, None))
        .collect()
}
