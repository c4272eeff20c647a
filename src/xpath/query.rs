use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::QueryError;
use crate::tree::ui_node::UiNode;

const NAME: &str = r"[\w.$:-]+|\*";
const LITERAL: &str = r#"(?:'([^']*)'|"([^"]*)")"#;

static PREDICATE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^//({NAME})\[(.*)\]$")).expect("valid pattern"));

static ATTR_EQUALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^@([\w.:-]+)\s*=\s*{LITERAL}$")).expect("valid pattern"));

static ATTR_CONTAINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^contains\(\s*@([\w.:-]+)\s*,\s*{LITERAL}\s*\)$")).expect("valid pattern")
});

static TEXT_EQUALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^text\(\)\s*=\s*{LITERAL}$")).expect("valid pattern"));

static TEXT_CONTAINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^contains\(\s*text\(\)\s*,\s*{LITERAL}\s*\)$")).expect("valid pattern")
});

static STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^({NAME})(?:\[(\d+)\])?$")).expect("valid pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTest {
    Any,
    Named(String),
}

impl TagTest {
    fn from_name(name: &str) -> Self {
        if name == "*" {
            TagTest::Any
        } else {
            TagTest::Named(name.to_string())
        }
    }

    pub fn matches(&self, node: &UiNode) -> bool {
        match self {
            TagTest::Any => true,
            TagTest::Named(tag) => &node.tag == tag,
        }
    }
}

/// One `tag[index]` segment of a positional path. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub tag: TagTest,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    AttrEquals { attr: String, value: String },
    AttrContains { attr: String, value: String },
    TextEquals(String),
    TextContains(String),
}

impl Predicate {
    /// Case-sensitive, no whitespace or Unicode normalization.
    pub fn matches(&self, node: &UiNode) -> bool {
        match self {
            Predicate::AttrEquals { attr, value } => node.attr(attr) == Some(value.as_str()),
            Predicate::AttrContains { attr, value } => {
                node.attr(attr).is_some_and(|v| v.contains(value.as_str()))
            }
            Predicate::TextEquals(value) => node.attr("text") == Some(value.as_str()),
            Predicate::TextContains(value) => {
                node.attr("text").is_some_and(|v| v.contains(value.as_str()))
            }
        }
    }
}

/// A parsed path expression restricted to the supported grammars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathQuery {
    /// `/hierarchy/node[1]/node[2]`
    Positional(Vec<PathStep>),

    /// `//tag[...]` with a single predicate
    Predicate { tag: TagTest, predicate: Predicate },
}

impl PathQuery {
    pub fn parse(expr: &str) -> Result<Self, QueryError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(QueryError::Empty);
        }

        if expr.starts_with("//") {
            return parse_predicate_path(expr);
        }

        parse_positional(expr)
    }
}

impl std::str::FromStr for PathQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathQuery::parse(s)
    }
}

fn literal(caps: &Captures, first: usize) -> String {
    caps.get(first)
        .or_else(|| caps.get(first + 1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn parse_predicate_path(expr: &str) -> Result<PathQuery, QueryError> {
    let caps = PREDICATE_PATH
        .captures(expr)
        .ok_or_else(|| QueryError::Unsupported(expr.to_string()))?;
    let tag = TagTest::from_name(&caps[1]);
    let inner = caps[2].trim();

    let predicate = if let Some(c) = ATTR_EQUALS.captures(inner) {
        Predicate::AttrEquals {
            attr: c[1].to_string(),
            value: literal(&c, 2),
        }
    } else if let Some(c) = ATTR_CONTAINS.captures(inner) {
        Predicate::AttrContains {
            attr: c[1].to_string(),
            value: literal(&c, 2),
        }
    } else if let Some(c) = TEXT_EQUALS.captures(inner) {
        Predicate::TextEquals(literal(&c, 1))
    } else if let Some(c) = TEXT_CONTAINS.captures(inner) {
        Predicate::TextContains(literal(&c, 1))
    } else {
        return Err(QueryError::Unsupported(expr.to_string()));
    };

    Ok(PathQuery::Predicate { tag, predicate })
}

fn parse_positional(expr: &str) -> Result<PathQuery, QueryError> {
    let body = expr.strip_prefix('/').unwrap_or(expr);

    let mut steps = Vec::new();
    for segment in body.split('/') {
        let caps = STEP
            .captures(segment)
            .ok_or_else(|| QueryError::Unsupported(expr.to_string()))?;

        let index = match caps.get(2) {
            Some(m) => m
                .as_str()
                .parse::<usize>()
                .ok()
                .filter(|&i| i >= 1)
                .ok_or_else(|| QueryError::BadIndex(segment.to_string()))?,
            None => 1,
        };

        steps.push(PathStep {
            tag: TagTest::from_name(&caps[1]),
            index,
        });
    }

    Ok(PathQuery::Positional(steps))
}
