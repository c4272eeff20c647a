use std::collections::BTreeMap;

use serde::Serialize;

use crate::tree::bounds::Bounds;

/// Index of a node inside its `UiTree`. Arena order is document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UiNode {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<NodeId>,

    /// Non-owning back-link, filled by `UiTree::attach_parents`
    pub parent: Option<NodeId>,

    pub depth: usize,

    /// Position among the parent's children (0-based)
    pub sibling_index: usize,
}

impl UiNode {
    pub fn new(tag: impl Into<String>, attrs: BTreeMap<String, String>, depth: usize) -> Self {
        UiNode {
            tag: tag.into(),
            attrs,
            children: Vec::new(),
            parent: None,
            depth,
            sibling_index: 0,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Attribute value, treating empty strings as absent.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        self.non_empty("text")
    }

    pub fn content_desc(&self) -> Option<&str> {
        self.non_empty("content-desc")
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.non_empty("resource-id")
    }

    pub fn class(&self) -> Option<&str> {
        self.non_empty("class")
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.attr("bounds").and_then(Bounds::parse)
    }

    fn flag(&self, name: &str) -> bool {
        self.attr(name) == Some("true")
    }

    pub fn is_clickable(&self) -> bool {
        self.flag("clickable")
    }

    pub fn is_enabled(&self) -> bool {
        self.flag("enabled")
    }

    pub fn is_selected(&self) -> bool {
        self.flag("selected")
    }

    /// Short human-readable description for logs and CLI output.
    pub fn describe(&self) -> String {
        let mut out = self.class().unwrap_or(&self.tag).to_string();
        if let Some(id) = self.resource_id() {
            out.push_str(&format!(" id={}", id));
        }
        if let Some(text) = self.text() {
            out.push_str(&format!(" text={:?}", text));
        }
        if let Some(desc) = self.content_desc() {
            out.push_str(&format!(" desc={:?}", desc));
        }
        if let Some(b) = self.attr("bounds") {
            out.push_str(&format!(" bounds={}", b));
        }
        out
    }
}

/// A parsed hierarchy. Nodes are stored in pre-order; the root is `NodeId(0)`.
#[derive(Debug, Clone, Serialize)]
pub struct UiTree {
    nodes: Vec<UiNode>,
}

impl UiTree {
    /// Assemble a tree from nodes already in pre-order with child lists set.
    /// Parent links are derived here.
    pub fn from_nodes(nodes: Vec<UiNode>) -> Self {
        let mut tree = UiTree { nodes };
        tree.attach_parents();
        tree
    }

    /// Second pass over the built tree: derive every `parent` (and sibling
    /// index) from the child lists.
    fn attach_parents(&mut self) {
        for node in &mut self.nodes {
            node.parent = None;
        }
        for idx in 0..self.nodes.len() {
            let children = self.nodes[idx].children.clone();
            for (pos, child) in children.into_iter().enumerate() {
                let node = &mut self.nodes[child.0];
                node.parent = Some(NodeId(idx));
                node.sibling_index = pos;
            }
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &UiNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&UiNode> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// All ids in document order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &UiNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Pre-order walk of the subtree rooted at `id` (inclusive), recursive so
    /// the order is document order without relying on stack push order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        fn walk(tree: &UiTree, id: NodeId, out: &mut Vec<NodeId>) {
            out.push(id);
            for &child in tree.children(id) {
                walk(tree, child, out);
            }
        }

        let mut out = Vec::new();
        walk(self, id, &mut out);
        out
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    /// Nearest clickable node among `id` and its ancestors.
    pub fn clickable_ancestor_or_self(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| self.node(n).is_clickable())
    }

    /// Screen size taken from the widest bounds near the top of the tree.
    pub fn screen_bounds(&self) -> Option<Bounds> {
        self.nodes.iter().take(4).filter_map(UiNode::bounds).max_by_key(Bounds::area)
    }
}
