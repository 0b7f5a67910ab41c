// Path-safe navigation over the generic tree.
//
// The report generator emits any element either once or many times, so
// every step of a path is treated as "one or more". Intermediate steps
// always take the first match. Only `resolve_all` keeps every match, and
// only at the last step.
use crate::xml::XmlNode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of walking a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a XmlNode),
    Absent,
}

impl<'a> Lookup<'a> {
    pub fn node(self) -> Option<&'a XmlNode> {
        match self {
            Lookup::Found(n) => Some(n),
            Lookup::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// Continue walking from the found node.
    pub fn then(self, path: &NodePath) -> Lookup<'a> {
        match self {
            Lookup::Found(n) => resolve(n, path),
            Lookup::Absent => Lookup::Absent,
        }
    }

    /// Attribute of the found node, if any.
    pub fn attr(self, name: &str) -> Option<&'a str> {
        self.node().and_then(|n| n.attr(name))
    }
}

/// A dotted sequence of child tag names, e.g. `CS_Gender.Report.table1`.
///
/// The empty path names the starting node itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NodePath {
    steps: Vec<String>,
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        NodePath {
            steps: s
                .split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl From<String> for NodePath {
    fn from(s: String) -> Self {
        NodePath::from(s.as_str())
    }
}

impl From<NodePath> for String {
    fn from(p: NodePath) -> Self {
        p.to_string()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.steps.join("."))
    }
}

/// Walk `path` from `root`, taking the first match at every step.
pub fn resolve<'a>(root: &'a XmlNode, path: &NodePath) -> Lookup<'a> {
    let mut node = root;
    for step in &path.steps {
        match node.child(step) {
            Some(next) => node = next,
            None => return Lookup::Absent,
        }
    }
    Lookup::Found(node)
}

/// Walk `path` and return every node matching its last step.
///
/// A single occurrence and many occurrences come back the same way, as a
/// sequence. `None` means the path does not exist; it never returns an
/// empty sequence. The empty path yields `root` alone.
pub fn resolve_all<'a>(root: &'a XmlNode, path: &NodePath) -> Option<Vec<&'a XmlNode>> {
    let Some((last, parents)) = path.steps.split_last() else {
        return Some(vec![root]);
    };
    let parent = resolve_steps(root, parents)?;
    let nodes: Vec<&'a XmlNode> = parent.children_named(last).collect();
    if nodes.is_empty() {
        None
    } else {
        Some(nodes)
    }
}

/// Try each candidate path in order; the first that exists wins.
///
/// Returns the index of the winning candidate alongside its nodes.
pub fn resolve_any<'a, 'p, I>(root: &'a XmlNode, candidates: I) -> Option<(usize, Vec<&'a XmlNode>)>
where
    I: IntoIterator<Item = &'p NodePath>,
{
    candidates
        .into_iter()
        .enumerate()
        .find_map(|(i, path)| resolve_all(root, path).map(|nodes| (i, nodes)))
}

fn resolve_steps<'a>(root: &'a XmlNode, steps: &[String]) -> Option<&'a XmlNode> {
    steps.iter().try_fold(root, |node, step| node.child(step))
}
