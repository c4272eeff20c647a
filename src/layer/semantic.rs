use serde::{Deserialize, Serialize};

use crate::tree::ui_node::{UiNode, UiTree};

/// Fixed vocabulary of bottom-navigation tab labels.
pub const NAV_LABELS: &[&str] = &[
    "首页", "朋友", "消息", "我", "商城", "发现", "视频", "推荐", "购物", "同城",
    "Home", "Friends", "Inbox", "Messages", "Me", "Profile", "Discover", "Shop", "Explore",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Normal,
    DrawerLayout,
    DrawerContent,
    MainContent,
    BottomNavigation,
    Dialog,
    Popup,
    SystemUi,
}

impl SemanticType {
    /// Overlays are expected to render above the base content layer.
    pub fn is_overlay(self) -> bool {
        matches!(
            self,
            SemanticType::DrawerContent
                | SemanticType::Dialog
                | SemanticType::Popup
                | SemanticType::BottomNavigation
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default = "default_screen_height")]
    pub screen_height: i32,

    /// Height of the band at the bottom of the screen searched for tab bars
    #[serde(default = "default_bottom_region")]
    pub bottom_region_px: i32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            screen_height: default_screen_height(),
            bottom_region_px: default_bottom_region(),
        }
    }
}

fn default_screen_height() -> i32 { 2400 }
fn default_bottom_region() -> i32 { 500 }

impl LayerConfig {
    pub fn bottom_threshold(&self) -> i32 {
        self.screen_height - self.bottom_region_px
    }
}

/// Semantic type for every node, indexed by `NodeId`.
pub fn classify_layers(tree: &UiTree, config: &LayerConfig) -> Vec<SemanticType> {
    let has_nav_label = nav_label_coverage(tree);
    let threshold = config.bottom_threshold();

    tree.iter()
        .map(|(id, node)| {
            if is_system_ui(node) {
                return SemanticType::SystemUi;
            }
            if is_drawer_layout(node) {
                return SemanticType::DrawerLayout;
            }
            if let Some(parent) = node.parent {
                if is_drawer_layout(tree.node(parent)) {
                    return if node.sibling_index == 0 {
                        SemanticType::MainContent
                    } else {
                        SemanticType::DrawerContent
                    };
                }
            }
            if is_dialog(node) {
                return SemanticType::Dialog;
            }
            if is_popup(node) {
                return SemanticType::Popup;
            }
            let in_bottom_band = node.bounds().is_some_and(|b| b.y1 >= threshold);
            if in_bottom_band && has_nav_label[id.0] {
                return SemanticType::BottomNavigation;
            }
            SemanticType::Normal
        })
        .collect()
}

fn is_system_ui(node: &UiNode) -> bool {
    node.resource_id().is_some_and(|id| {
        id.contains("navigationBarBackground") || id.contains("statusBarBackground")
    })
}

fn is_drawer_layout(node: &UiNode) -> bool {
    node.class().is_some_and(|c| c.contains("DrawerLayout"))
}

fn is_dialog(node: &UiNode) -> bool {
    node.class().is_some_and(|c| c.contains("Dialog"))
        || node
            .resource_id()
            .is_some_and(|id| id.ends_with("parentPanel") || id.contains("dialog"))
}

fn is_popup(node: &UiNode) -> bool {
    node.class().is_some_and(|c| c.contains("Popup"))
}

fn is_nav_label(value: &str) -> bool {
    let value = value.trim();
    NAV_LABELS.iter().any(|label| *label == value)
}

/// Whether each node or any of its descendants carries a navigation label.
/// Children always follow their parent in arena order, so one reverse sweep
/// settles every subtree.
fn nav_label_coverage(tree: &UiTree) -> Vec<bool> {
    let mut covered = vec![false; tree.len()];
    for id in tree.ids().collect::<Vec<_>>().into_iter().rev() {
        let node = tree.node(id);
        let own = node.text().is_some_and(is_nav_label)
            || node.content_desc().is_some_and(is_nav_label);
        covered[id.0] = own || node.children.iter().any(|c| covered[c.0]);
    }
    covered
}
