use std::collections::BTreeMap;

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;
use crate::tree::ui_node::{NodeId, UiNode, UiTree};

/// Strip the noise that shows up around real device dumps: BOM, shell
/// chatter before the document (`UI hierchary dumped to: ...`), stray NULs
/// and control characters.
pub fn pre_clean(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('\u{feff}');

    let start = trimmed.find('<').unwrap_or(trimmed.len());
    let end = trimmed.rfind('>').map(|i| i + 1).unwrap_or(start);
    let body = if start < end { &trimmed[start..end] } else { "" };

    body.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Parse a uiautomator dump into a `UiTree`.
pub fn parse_ui_dump(raw: &str) -> Result<UiTree, ParseError> {
    let cleaned = pre_clean(raw);
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut reader = Reader::from_str(&cleaned);
    reader.trim_text(true);
    reader.check_end_names(false);

    let mut nodes: Vec<UiNode> = Vec::new();
    let mut open: Vec<NodeId> = Vec::new();
    let mut root_closed = false;
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let id = push_node(&mut nodes, &open, e, root_closed)?;
                open.push(id);
            }
            Ok(Event::Empty(ref e)) => {
                push_node(&mut nodes, &open, e, root_closed)?;
                if open.is_empty() {
                    root_closed = true;
                }
            }
            Ok(Event::End(ref e)) => {
                let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match open.pop() {
                    Some(id) if nodes[id.0].tag == found => {
                        if open.is_empty() {
                            root_closed = true;
                        }
                    }
                    _ => return Err(ParseError::UnexpectedClose { found, position }),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::Syntax {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    if !open.is_empty() {
        return Err(ParseError::Unclosed { open: open.len() });
    }
    if nodes.is_empty() {
        return Err(ParseError::Empty);
    }

    debug!("Parsed UI dump: {} nodes", nodes.len());
    Ok(UiTree::from_nodes(nodes))
}

/// Like `parse_ui_dump`, but reports failures through the log and returns
/// `None` instead of an error.
pub fn parse_lenient(raw: &str) -> Option<UiTree> {
    match parse_ui_dump(raw) {
        Ok(tree) => Some(tree),
        Err(e) => {
            warn!("UI dump parse failed: {}", e);
            None
        }
    }
}

fn push_node(
    nodes: &mut Vec<UiNode>,
    open: &[NodeId],
    e: &BytesStart,
    root_closed: bool,
) -> Result<NodeId, ParseError> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    if root_closed && open.is_empty() {
        return Err(ParseError::MultipleRoots { tag });
    }

    let id = NodeId(nodes.len());
    nodes.push(UiNode::new(tag, read_attrs(e), open.len()));

    if let Some(&parent) = open.last() {
        nodes[parent.0].children.push(id);
    }
    Ok(id)
}

fn read_attrs(e: &BytesStart) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    for attr in e.attributes().filter_map(|a| a.ok()) {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        // Unescapable values (bare '&' etc.) keep their raw text
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.insert(key, value);
    }
    attrs
}
