use log::{debug, warn};
use regex::Regex;

use crate::selection::selection_model::{ExcludeOp, ExcludeRule};
use crate::tree::ui_node::UiNode;

/// Built-in "already done" states, matched by substring on text and
/// content-desc.
pub const AUTO_EXCLUDE_STATES: &[&str] = &[
    "已关注",
    "Following",
    "Followed",
    "互相关注",
    "Mutual",
    "Follow Back",
    "已互关",
    "已赞",
    "Liked",
    "已收藏",
    "Favorited",
    "已分享",
    "Shared",
    "已完成",
    "Completed",
    "已处理",
    "Processed",
];

/// Exclude rules prepared for one pass. Regex rules are compiled once; an
/// invalid pattern never matches.
pub struct CompiledRules<'a> {
    rules: Vec<(&'a ExcludeRule, Option<Regex>)>,
}

impl<'a> CompiledRules<'a> {
    pub fn compile(rules: &'a [ExcludeRule]) -> Self {
        let rules = rules
            .iter()
            .filter(|r| r.enabled)
            .map(|rule| {
                let regex = match rule.op {
                    ExcludeOp::Regex => match Regex::new(&rule.value) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!("Exclude rule '{}' has an invalid pattern, ignoring: {}", rule.id, e);
                            None
                        }
                    },
                    _ => None,
                };
                (rule, regex)
            })
            .collect();

        CompiledRules { rules }
    }

    /// First enabled rule (in declaration order) that matches `node`.
    pub fn first_match(&self, node: &UiNode) -> Option<&'a ExcludeRule> {
        self.rules
            .iter()
            .find(|(rule, regex)| rule_matches(rule, regex.as_ref(), node))
            .map(|(rule, _)| *rule)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn rule_matches(rule: &ExcludeRule, regex: Option<&Regex>, node: &UiNode) -> bool {
    let Some(actual) = node.attr(rule.attr.attr_name()) else {
        return false;
    };

    match rule.op {
        ExcludeOp::Equals => actual == rule.value,
        ExcludeOp::Contains => actual.contains(rule.value.as_str()),
        ExcludeOp::Regex => regex.is_some_and(|re| re.is_match(actual)),
    }
}

/// The state text that makes `node` look already handled, if any.
///
/// A built-in state is ignored when the target text itself contains it, so
/// a step that deliberately targets "已关注" buttons still finds them.
/// User-supplied `extra_states` always apply.
pub fn auto_excluded_state(
    node: &UiNode,
    target_text: Option<&str>,
    auto_exclude: bool,
    extra_states: &[String],
) -> Option<String> {
    let target_text = target_text.unwrap_or("");
    let fields = [node.text(), node.content_desc()];

    for value in fields.into_iter().flatten() {
        if auto_exclude {
            for state in AUTO_EXCLUDE_STATES {
                if !value.contains(state) {
                    continue;
                }
                if target_text.contains(state) {
                    debug!("Keeping '{}': target text '{}' is itself '{}'", value, target_text, state);
                    continue;
                }
                return Some(state.to_string());
            }
        }

        if let Some(state) = extra_states
            .iter()
            .find(|s| !s.is_empty() && value.contains(s.as_str()))
        {
            return Some(state.clone());
        }
    }

    None
}
