//! Editable resolution against deep and denylisted trees.

use perch_core::editable::{CHAT_BOX_POPUP_TEXTAREA, MAX_ANCESTOR_DEPTH};
use perch_core::{DocumentArena, DocumentTree, NodeId, PageMetrics, find_editable_ancestor};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Build `body > editable-root > span * chain_len` and return (root, leaf).
fn chain(doc: &mut DocumentArena, chain_len: usize) -> (NodeId, NodeId) {
    let body = doc.body().expect("arena has a body");
    let root = doc.append_element(body, "div");
    doc.set_attribute(root, "contenteditable", "true");
    let mut leaf = root;
    for _ in 0..chain_len {
        leaf = doc.append_element(leaf, "span");
    }
    (root, leaf)
}

#[test]
fn manual_walk_does_not_reach_beyond_ten_levels() {
    let mut doc = DocumentArena::new(PageMetrics::default()).without_native_closest();
    let (_root, leaf) = chain(&mut doc, 15);
    assert_eq!(find_editable_ancestor(&doc, leaf), None);
}

#[test]
fn native_closest_is_unbounded() {
    let mut doc = DocumentArena::new(PageMetrics::default());
    let (root, leaf) = chain(&mut doc, 15);
    assert_eq!(find_editable_ancestor(&doc, leaf), Some(root));
}

#[test]
fn denylisted_node_with_editable_ancestor_resolves_to_none() {
    for native in [true, false] {
        let base = DocumentArena::new(PageMetrics::default());
        let mut doc = if native {
            base
        } else {
            base.without_native_closest()
        };
        let (_root, leaf) = chain(&mut doc, 2);
        let popup = doc.append_element(leaf, "textarea");
        doc.add_class(popup, CHAT_BOX_POPUP_TEXTAREA);
        assert_eq!(find_editable_ancestor(&doc, popup), None, "native={native}");
    }
}

proptest! {
    #[test]
    fn manual_walk_hits_iff_within_bound(chain_len in 0usize..30) {
        let mut doc = DocumentArena::new(PageMetrics::default()).without_native_closest();
        let (root, leaf) = chain(&mut doc, chain_len);
        let found = find_editable_ancestor(&doc, leaf);
        if chain_len < MAX_ANCESTOR_DEPTH {
            prop_assert_eq!(found, Some(root));
        } else {
            prop_assert_eq!(found, None);
        }
    }
}
