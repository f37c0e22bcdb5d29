#![forbid(unsafe_code)]

//! Host document model.
//!
//! Perch never touches a real DOM. The embedding host exposes the handful of
//! queries and mutations the panel manager needs through [`DocumentTree`] and
//! [`DocumentMut`]; [`DocumentArena`] is an in-memory implementation used by
//! tests and by hosts that mirror the page into Rust.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::geometry::{PageMetrics, Position, Rect};

/// Opaque handle to a node in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// CSS `position` value for a panel container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CssPosition {
    #[default]
    Absolute,
    Fixed,
}

/// Inline style the panel manager controls on a container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerStyle {
    pub position: CssPosition,
    pub left: f64,
    pub top: f64,
}

impl ContainerStyle {
    /// Absolute placement at `at`.
    pub const fn absolute(at: Position) -> Self {
        Self {
            position: CssPosition::Absolute,
            left: at.x,
            top: at.y,
        }
    }

    /// Fixed placement at `at`.
    pub const fn fixed(at: Position) -> Self {
        Self {
            position: CssPosition::Fixed,
            left: at.x,
            top: at.y,
        }
    }

    pub const fn origin(&self) -> Position {
        Position::new(self.left, self.top)
    }
}

/// Snapshot of `window.getSelection()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSnapshot {
    /// `selection.toString()`.
    pub text: String,
    /// Parent element of the first range's end container, if any range exists.
    pub end_container: Option<NodeId>,
}

impl SelectionSnapshot {
    pub fn new(text: impl Into<String>, end_container: Option<NodeId>) -> Self {
        Self {
            text: text.into(),
            end_container,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Read-only queries against the host document.
pub trait DocumentTree {
    /// Parent of `node`, `None` for the root or a detached node.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Lowercase tag name, `None` for non-element nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    /// `element.classList.contains(class)`.
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// `element.getAttribute(name)`.
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// `document.body`.
    fn body(&self) -> Option<NodeId>;

    /// `document.activeElement`.
    fn active_element(&self) -> Option<NodeId>;

    /// Viewport-relative bounding box.
    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Rendered `offsetWidth`. Only meaningful after the first paint.
    fn offset_width(&self, node: NodeId) -> f64;

    /// Whether the node is still attached to the document.
    fn is_connected(&self, node: NodeId) -> bool;

    /// Current live selection.
    fn selection(&self) -> SelectionSnapshot;

    /// Current layout metrics.
    fn metrics(&self) -> PageMetrics;

    /// Native `closest('input, textarea, [contenteditable="true"]')`.
    ///
    /// Hosts without such a primitive keep the default, which reports no
    /// match and lets callers fall back to a manual walk.
    fn closest_editable(&self, node: NodeId) -> Option<NodeId> {
        let _ = node;
        None
    }

    /// `ancestor.contains(node)`, inclusive.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

/// Mutations the panel manager performs on the host document.
pub trait DocumentMut: DocumentTree {
    /// Create a `div` appended to the body with the given class and style.
    fn create_container(&mut self, class: &str, style: ContainerStyle) -> NodeId;

    /// Replace the container's class name.
    fn set_class_name(&mut self, node: NodeId, class: &str);

    /// Apply position/left/top to the container.
    fn set_container_style(&mut self, node: NodeId, style: ContainerStyle);

    /// Detach the node from the document.
    ///
    /// Returns `false` when the node was already detached; never fails.
    fn remove(&mut self, node: NodeId) -> bool;
}

#[derive(Debug, Clone, Default)]
struct NodeData {
    parent: Option<NodeId>,
    tag: Option<String>,
    classes: SmallVec<[String; 2]>,
    attributes: SmallVec<[(String, String); 2]>,
    rect: Rect,
    offset_width: Option<f64>,
    style: Option<ContainerStyle>,
    detached: bool,
}

/// In-memory [`DocumentMut`] implementation.
///
/// Created with an `html > body` skeleton. Container rectangles follow their
/// style: `fixed` containers report `left/top` directly, `absolute` ones
/// subtract the current scroll offset, matching what a browser would report.
#[derive(Debug, Clone)]
pub struct DocumentArena {
    nodes: Vec<NodeData>,
    body: NodeId,
    active: Option<NodeId>,
    selection: SelectionSnapshot,
    metrics: PageMetrics,
    native_closest: bool,
    container_size: (f64, f64),
}

impl DocumentArena {
    /// Create a document with `html` and `body` elements.
    pub fn new(metrics: PageMetrics) -> Self {
        let mut arena = Self {
            nodes: Vec::new(),
            body: NodeId(0),
            active: None,
            selection: SelectionSnapshot::default(),
            metrics,
            native_closest: true,
            container_size: (420.0, 40.0),
        };
        let html = arena.push(None, Some("html"));
        arena.body = arena.push(Some(html), Some("body"));
        arena
    }

    /// Disable the native `closest` primitive, forcing the manual walk.
    #[must_use]
    pub fn without_native_closest(mut self) -> Self {
        self.native_closest = false;
        self
    }

    /// Size reported for containers created through [`DocumentMut`].
    pub fn set_container_size(&mut self, width: f64, height: f64) {
        self.container_size = (width, height);
    }

    fn push(&mut self, parent: Option<NodeId>, tag: Option<&str>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            parent,
            tag: tag.map(str::to_ascii_lowercase),
            ..NodeData::default()
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Append a new element under `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push(Some(parent), Some(tag))
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId) -> NodeId {
        self.push(Some(parent), None)
    }

    /// Add a class to an element.
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(data) = self.node_mut(node)
            && !data.classes.iter().any(|c| c == class)
        {
            data.classes.push(class.to_owned());
        }
    }

    /// Set an attribute on an element.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(data) = self.node_mut(node) {
            if let Some(slot) = data.attributes.iter_mut().find(|(n, _)| n == name) {
                slot.1 = value.to_owned();
            } else {
                data.attributes.push((name.to_owned(), value.to_owned()));
            }
        }
    }

    /// Set the viewport-relative bounding box of an element.
    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(data) = self.node_mut(node) {
            data.rect = rect;
        }
    }

    /// Set the rendered width independently of the bounding box.
    pub fn set_offset_width(&mut self, node: NodeId, width: f64) {
        if let Some(data) = self.node_mut(node) {
            data.offset_width = Some(width);
        }
    }

    pub fn set_active_element(&mut self, node: Option<NodeId>) {
        self.active = node;
    }

    pub fn set_selection(&mut self, selection: SelectionSnapshot) {
        self.selection = selection;
    }

    pub fn clear_selection(&mut self) {
        self.selection = SelectionSnapshot::default();
    }

    pub fn set_metrics(&mut self, metrics: PageMetrics) {
        self.metrics = metrics;
    }

    /// Inline style last applied to a container.
    pub fn container_style(&self, node: NodeId) -> Option<ContainerStyle> {
        self.node(node).and_then(|n| n.style)
    }

    /// First class of the element (`className` for single-class containers).
    pub fn class_name(&self, node: NodeId) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.classes.first())
            .map(String::as_str)
    }

    /// Connected nodes carrying `class`.
    pub fn query_class(&self, class: &str) -> Vec<NodeId> {
        (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|&id| self.is_connected(id) && self.has_class(id, class))
            .collect()
    }

    fn matches_editable(&self, node: NodeId) -> bool {
        matches!(self.tag_name(node), Some("input" | "textarea"))
            || self.attribute(node, "contenteditable") == Some("true")
    }
}

impl DocumentTree for DocumentArena {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).and_then(|n| n.tag.as_deref())
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).and_then(|n| {
            n.attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        })
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let Some(data) = self.node(node) else {
            return Rect::default();
        };
        match data.style {
            Some(style) => {
                let (width, height) = self.container_size;
                let (left, top) = match style.position {
                    CssPosition::Fixed => (style.left, style.top),
                    CssPosition::Absolute => (
                        style.left - self.metrics.scroll.x,
                        style.top - self.metrics.scroll.y,
                    ),
                };
                Rect::new(left, top, width, height)
            }
            None => data.rect,
        }
    }

    fn offset_width(&self, node: NodeId) -> f64 {
        self.node(node)
            .and_then(|n| n.offset_width)
            .unwrap_or_else(|| self.bounding_rect(node).width)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            match self.node(id) {
                Some(data) if !data.detached => current = data.parent,
                _ => return false,
            }
        }
        true
    }

    fn selection(&self) -> SelectionSnapshot {
        self.selection.clone()
    }

    fn metrics(&self) -> PageMetrics {
        self.metrics
    }

    fn closest_editable(&self, node: NodeId) -> Option<NodeId> {
        if !self.native_closest {
            return None;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if self.matches_editable(id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }
}

impl DocumentMut for DocumentArena {
    fn create_container(&mut self, class: &str, style: ContainerStyle) -> NodeId {
        let body = self.body;
        let id = self.push(Some(body), Some("div"));
        if let Some(data) = self.node_mut(id) {
            data.classes.push(class.to_owned());
            data.style = Some(style);
        }
        id
    }

    fn set_class_name(&mut self, node: NodeId, class: &str) {
        if let Some(data) = self.node_mut(node) {
            data.classes.clear();
            data.classes.push(class.to_owned());
        }
    }

    fn set_container_style(&mut self, node: NodeId, style: ContainerStyle) {
        if let Some(data) = self.node_mut(node) {
            data.style = Some(style);
        }
    }

    fn remove(&mut self, node: NodeId) -> bool {
        let connected = self.is_connected(node);
        match self.node_mut(node) {
            Some(data) if !data.detached => {
                data.detached = true;
                connected
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_has_body() {
        let doc = DocumentArena::new(PageMetrics::default());
        let body = doc.body().unwrap();
        assert_eq!(doc.tag_name(body), Some("body"));
        assert!(doc.is_connected(body));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut doc = DocumentArena::new(PageMetrics::default());
        let c = doc.create_container("panel", ContainerStyle::default());
        assert!(doc.remove(c));
        assert!(!doc.remove(c));
        assert!(!doc.is_connected(c));
    }

    #[test]
    fn removing_parent_disconnects_children() {
        let mut doc = DocumentArena::new(PageMetrics::default());
        let c = doc.create_container("panel", ContainerStyle::default());
        let child = doc.append_element(c, "textarea");
        doc.remove(c);
        assert!(!doc.is_connected(child));
        assert!(doc.contains(c, child));
    }

    #[test]
    fn absolute_container_rect_is_viewport_relative() {
        let mut doc = DocumentArena::new(PageMetrics::viewport(1000.0, 800.0).with_scroll(0.0, 300.0));
        let c = doc.create_container(
            "panel",
            ContainerStyle::absolute(Position::new(200.0, 500.0)),
        );
        assert_eq!(doc.bounding_rect(c).origin(), Position::new(200.0, 200.0));
    }

    #[test]
    fn set_class_name_replaces_classes() {
        let mut doc = DocumentArena::new(PageMetrics::default());
        let c = doc.create_container("a", ContainerStyle::default());
        doc.set_class_name(c, "b");
        assert!(!doc.has_class(c, "a"));
        assert_eq!(doc.class_name(c), Some("b"));
        assert_eq!(doc.query_class("b"), vec![c]);
    }
}
