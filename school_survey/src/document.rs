use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

/// The children of a branch, ordered by key.
pub type Branch = BTreeMap<String, Node>;

/// A node of a survey document.
///
/// Documents are persistent trees: branches are shared behind an `Arc`, so cloning a
/// document or an edited copy of it only copies the branches that changed. Leaves hold
/// any JSON value that is not an object (strings, numbers, booleans, null and arrays).
///
/// Invariant: a `Leaf` never contains a JSON object. All the constructors below route
/// objects to `Branch`.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Branch(Arc<Branch>),
    Leaf(JSValue),
}

/// The root of a survey document.
pub type Document = Node;

impl Default for Node {
    fn default() -> Self {
        Node::empty()
    }
}

impl Node {
    /// A branch without children.
    pub fn empty() -> Node {
        Node::Branch(Arc::new(Branch::new()))
    }

    /// Builds a branch from key/node pairs.
    pub fn branch<I, K>(entries: I) -> Node
    where
        I: IntoIterator<Item = (K, Node)>,
        K: Into<String>,
    {
        Node::Branch(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }

    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            Node::Branch(b) => Some(b.as_ref()),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&JSValue> {
        match self {
            Node::Leaf(v) => Some(v),
            Node::Branch(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(|v| v.as_str())
    }

    /// The text of a scalar leaf: strings as-is, numbers and booleans printed, anything
    /// else empty.
    pub fn text(&self) -> String {
        match self {
            Node::Leaf(JSValue::String(s)) => s.clone(),
            Node::Leaf(JSValue::Number(n)) => n.to_string(),
            Node::Leaf(JSValue::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Identity comparison: the same shared branch, or equal leaves.
    ///
    /// Leaves are immutable scalars, so comparing them by value is the same as comparing
    /// them by reference.
    pub fn same(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Branch(a), Node::Branch(b)) => Arc::ptr_eq(a, b),
            (Node::Leaf(a), Node::Leaf(b)) => a == b,
            _ => false,
        }
    }

    pub fn to_json(&self) -> JSValue {
        JSValue::from(self)
    }
}

impl From<JSValue> for Node {
    fn from(v: JSValue) -> Self {
        match v {
            JSValue::Object(map) => Node::branch(map.into_iter().map(|(k, v)| (k, Node::from(v)))),
            other => Node::Leaf(other),
        }
    }
}

impl From<&Node> for JSValue {
    fn from(node: &Node) -> Self {
        match node {
            Node::Leaf(v) => v.clone(),
            Node::Branch(b) => {
                let map: JSMap<String, JSValue> = b
                    .iter()
                    .map(|(k, child)| (k.clone(), JSValue::from(child)))
                    .collect();
                JSValue::Object(map)
            }
        }
    }
}

impl From<Node> for JSValue {
    fn from(node: Node) -> Self {
        JSValue::from(&node)
    }
}

impl From<Branch> for Node {
    fn from(b: Branch) -> Self {
        Node::Branch(Arc::new(b))
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Leaf(JSValue::String(s.to_string()))
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Leaf(JSValue::String(s))
    }
}

impl From<u64> for Node {
    fn from(x: u64) -> Self {
        Node::Leaf(JSValue::from(x))
    }
}

impl From<i64> for Node {
    fn from(x: i64) -> Self {
        Node::Leaf(JSValue::from(x))
    }
}

impl From<f64> for Node {
    /// Non-finite values become null.
    fn from(x: f64) -> Self {
        Node::Leaf(JSValue::from(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_become_branches() {
        let node = Node::from(json!({"a": {"b": [1, 2]}, "c": "x"}));
        let a = node.as_branch().unwrap().get("a").unwrap();
        assert!(a.is_branch());
        let b = a.as_branch().unwrap().get("b").unwrap();
        assert_eq!(b.as_value(), Some(&json!([1, 2])));
        assert_eq!(node.to_json(), json!({"a": {"b": [1, 2]}, "c": "x"}));
    }

    #[test]
    fn serde_round_trip() {
        let js = json!({"siswa": {"kelas1": {"l": 10, "p": ""}}, "npsn": "12345678"});
        let node: Node = serde_json::from_value(js.clone()).unwrap();
        assert!(node.is_branch());
        assert_eq!(serde_json::to_value(&node).unwrap(), js);
    }

    #[test]
    fn clones_share_branches() {
        let node = Node::from(json!({"a": {"b": 1}}));
        let copy = node.clone();
        assert!(node.same(&copy));
        let rebuilt = Node::from(json!({"a": {"b": 1}}));
        assert_eq!(node, rebuilt);
        assert!(!node.same(&rebuilt));
    }

    #[test]
    fn leaf_text() {
        assert_eq!(Node::from(3u64).text(), "3");
        assert_eq!(Node::from("abc").text(), "abc");
        assert_eq!(Node::Leaf(JSValue::Null).text(), "");
        assert_eq!(Node::empty().text(), "");
    }
}
