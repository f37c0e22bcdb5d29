#![forbid(unsafe_code)]

//! Editable-element resolution.
//!
//! Decides whether a node, or one of its ancestors, is a text-editable
//! surface (`input`, `textarea`, `[contenteditable="true"]`). Panel-internal
//! textareas carry denylisted classes so the panel never re-targets itself.

use crate::dom::{DocumentTree, NodeId};

/// Popup textarea inside ask/reply overlays.
pub const CHAT_BOX_POPUP_TEXTAREA: &str = "chat-box-popup-textarea";
/// Textarea inside template popups.
pub const TEMPLATE_POPUP_TEXTAREA: &str = "template-popup-textarea";

/// Classes that short-circuit editable resolution.
pub const EDITABLE_DENYLIST: &[&str] = &[CHAT_BOX_POPUP_TEXTAREA, TEMPLATE_POPUP_TEXTAREA];

/// Classes whose targets are ignored by the top-level pointer-up and key-down
/// listeners.
pub const EVENT_DENYLIST: &[&str] = &[CHAT_BOX_POPUP_TEXTAREA];

/// Maximum ancestors visited by the manual fallback walk.
pub const MAX_ANCESTOR_DEPTH: usize = 10;

/// Whether `node` carries any class in `denylist`.
pub fn is_denylisted<T: DocumentTree + ?Sized>(tree: &T, node: NodeId, denylist: &[&str]) -> bool {
    denylist.iter().any(|class| tree.has_class(node, class))
}

/// Whether `node` itself is an editable surface.
pub fn is_editable<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> bool {
    matches!(tree.tag_name(node), Some("input" | "textarea"))
        || tree.attribute(node, "contenteditable") == Some("true")
}

/// Nearest editable ancestor of `node`, inclusive.
///
/// A denylisted `node` resolves to `None` even when an editable ancestor
/// exists. The native `closest` primitive is tried first; when it is
/// unavailable or finds nothing, the parent chain is walked for at most
/// [`MAX_ANCESTOR_DEPTH`] levels, stopping at the body.
pub fn find_editable_ancestor<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    if is_denylisted(tree, node, EDITABLE_DENYLIST) {
        return None;
    }
    tree.closest_editable(node)
        .or_else(|| walk_editable_ancestors(tree, node))
}

fn walk_editable_ancestors<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    let body = tree.body();
    let mut current = Some(node);
    let mut depth = 0;
    while let Some(id) = current {
        if Some(id) == body || depth >= MAX_ANCESTOR_DEPTH {
            break;
        }
        if is_editable(tree, id) {
            return Some(id);
        }
        current = tree.parent(id);
        depth += 1;
    }
    None
}
