//! Reading and editing documents through dot-separated paths.
//!
//! Edits never mutate their input. `set` and `unset` return a new document in which only
//! the branches along the path have been copied; every other branch is shared with the
//! input. When an edit would not change anything, the input itself is returned, so
//! `Node::same` can be used to skip work downstream.

use std::sync::Arc;

use log::debug;
use serde_json::Value as JSValue;

use crate::document::{Branch, Node};

fn segments(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Returns the node at `path`, or `None` as soon as a segment does not resolve to a branch
/// child. The empty path designates the document itself.
pub fn get<'a>(doc: &'a Node, path: &str) -> Option<&'a Node> {
    if path.is_empty() {
        return Some(doc);
    }
    let mut cur = doc;
    for seg in segments(path) {
        cur = cur.as_branch()?.get(seg)?;
    }
    Some(cur)
}

/// Like `get`, with a fallback for unresolved paths.
pub fn get_or<'a>(doc: &'a Node, path: &str, fallback: &'a Node) -> &'a Node {
    get(doc, path).unwrap_or(fallback)
}

/// The leaf value at `path`, if the path resolves to a leaf.
pub fn get_value<'a>(doc: &'a Node, path: &str) -> Option<&'a JSValue> {
    get(doc, path).and_then(|n| n.as_value())
}

/// Returns a document where `path` holds `value`.
///
/// Missing or non-branch intermediate nodes are replaced by branches. Setting a value that
/// is already there (see `Node::same`) returns the input unchanged, as does the empty path.
pub fn set(doc: &Node, path: &str, value: Node) -> Node {
    if path.is_empty() {
        return doc.clone();
    }
    set_in(doc, &segments(path), value)
}

fn set_in(node: &Node, segs: &[&str], value: Node) -> Node {
    let (head, rest) = match segs.split_first() {
        Some(x) => x,
        None => return value,
    };
    let existing: Option<&Branch> = node.as_branch();
    let child: Option<&Node> = existing.and_then(|b| b.get(*head));
    let new_child = if rest.is_empty() {
        value
    } else {
        let base = match child {
            Some(c) if c.is_branch() => c.clone(),
            _ => Node::empty(),
        };
        set_in(&base, rest, value)
    };
    if let Some(c) = child {
        if c.same(&new_child) {
            return node.clone();
        }
    }
    let mut copy: Branch = existing.cloned().unwrap_or_default();
    copy.insert(head.to_string(), new_child);
    Node::Branch(Arc::new(copy))
}

/// Returns a document without the leaf key of `path`.
///
/// Nothing is fabricated: if an intermediate segment does not resolve to a branch, or the
/// key is already absent, the input is returned unchanged.
pub fn unset(doc: &Node, path: &str) -> Node {
    if path.is_empty() {
        return doc.clone();
    }
    match unset_in(doc, &segments(path)) {
        Some(updated) => updated,
        None => {
            debug!("unset: nothing to remove at {:?}", path);
            doc.clone()
        }
    }
}

// None when nothing changed.
fn unset_in(node: &Node, segs: &[&str]) -> Option<Node> {
    let (head, rest) = segs.split_first()?;
    let map = node.as_branch()?;
    let copy: Branch = if rest.is_empty() {
        if !map.contains_key(*head) {
            return None;
        }
        let mut copy = map.clone();
        copy.remove(*head);
        copy
    } else {
        let updated = unset_in(map.get(*head)?, rest)?;
        let mut copy = map.clone();
        copy.insert(head.to_string(), updated);
        copy
    };
    Some(Node::Branch(Arc::new(copy)))
}
