#![forbid(unsafe_code)]

//! Overlay regions rendered outside the panel container.
//!
//! Tooltips and popups may be attached elsewhere in the document. A click
//! inside one of them must not count as an outside click, so the dismissal
//! check consults this registry as well as the panel container.

use perch_core::{DocumentTree, NodeId};
use smallvec::SmallVec;

/// Detached overlay roots owned by open panels.
#[derive(Debug, Clone, Default)]
pub struct PortalRegistry {
    roots: SmallVec<[(u64, NodeId); 4]>,
}

impl PortalRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `root` as a portal of `owner`. Duplicate registrations are ignored.
    pub fn register(&mut self, owner: u64, root: NodeId) {
        if !self.roots.iter().any(|&(_, r)| r == root) {
            self.roots.push((owner, root));
        }
    }

    pub fn unregister(&mut self, root: NodeId) -> bool {
        let before = self.roots.len();
        self.roots.retain(|&mut (_, r)| r != root);
        before != self.roots.len()
    }

    /// Drop every portal owned by `owner`.
    pub fn release_owner(&mut self, owner: u64) -> usize {
        let before = self.roots.len();
        self.roots.retain(|&mut (o, _)| o != owner);
        before - self.roots.len()
    }

    /// Whether `target` lies within any registered, still-connected portal.
    pub fn contains<T: DocumentTree + ?Sized>(&self, tree: &T, target: NodeId) -> bool {
        self.roots
            .iter()
            .any(|&(_, root)| tree.is_connected(root) && tree.contains(root, target))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::{DocumentArena, PageMetrics};

    #[test]
    fn click_inside_portal_is_contained() {
        let mut doc = DocumentArena::new(PageMetrics::default());
        let body = doc.body().unwrap();
        let portal = doc.append_element(body, "div");
        let button = doc.append_element(portal, "button");
        let outside = doc.append_element(body, "p");

        let mut registry = PortalRegistry::new();
        registry.register(1, portal);
        registry.register(1, portal);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&doc, button));
        assert!(!registry.contains(&doc, outside));
    }

    #[test]
    fn release_owner_drops_only_its_portals() {
        let mut registry = PortalRegistry::new();
        registry.register(1, NodeId(10));
        registry.register(2, NodeId(11));
        assert_eq!(registry.release_owner(1), 1);
        assert!(!registry.unregister(NodeId(10)));
        assert!(registry.unregister(NodeId(11)));
        assert!(registry.is_empty());
    }
}
