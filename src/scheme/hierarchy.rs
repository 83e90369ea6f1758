//! Explicit subtype forest built once from the scheme's labels.
//!
//! Each dot-delimited label (`2.1.1`) becomes a node whose parent is the label
//! with its last segment removed (`2.1`). Intermediate labels that no tile
//! refers to are still materialised so every node has a resolved parent.

use std::collections::HashMap;

/// Stable index of a node in a [`Hierarchy`]
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct SubtypeNode {
    pub label: String,
    pub parent: Option<NodeId>,
    /// Number of segments in the label; roots have depth 1
    pub depth: usize,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: Vec<SubtypeNode>,
    by_label: HashMap<String, NodeId>,
}

/// Label of the parent node, if `label` is not a root
#[must_use]
pub fn parent_label(label: &str) -> Option<&str> {
    label.rsplit_once('.').map(|(parent, _)| parent)
}

/// Order labels segment by segment, numerically where both segments are
/// numbers, so that `2.2` sorts before `2.10`
#[must_use]
pub fn compare_labels(a: &str, b: &str) -> std::cmp::Ordering {
    let mut a_segments = a.split('.');
    let mut b_segments = b.split('.');
    loop {
        match (a_segments.next(), b_segments.next()) {
            (None, None) => return std::cmp::Ordering::Equal,
            (None, Some(_)) => return std::cmp::Ordering::Less,
            (Some(_), None) => return std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord.is_ne() {
                    return ord;
                }
            }
        }
    }
}

impl Hierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest containing every label and all of its ancestors
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hierarchy = Self::new();
        for label in labels {
            hierarchy.insert(label);
        }
        hierarchy
    }

    /// Insert a label (and any missing ancestors), returning its node
    pub fn insert(&mut self, label: &str) -> NodeId {
        if let Some(&id) = self.by_label.get(label) {
            return id;
        }

        let parent = parent_label(label).map(|p| self.insert(p));
        let depth = parent.map_or(1, |p| self.nodes[p].depth + 1);

        let id = self.nodes.len();
        self.nodes.push(SubtypeNode {
            label: label.to_string(),
            parent,
            depth,
            children: Vec::new(),
        });
        self.by_label.insert(label.to_string(), id);
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<NodeId> {
        self.by_label.get(label).copied()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &SubtypeNode {
        &self.nodes[id]
    }

    #[must_use]
    pub fn label(&self, id: NodeId) -> &str {
        &self.nodes[id].label
    }

    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id].depth
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SubtypeNode)> {
        self.nodes.iter().enumerate()
    }

    /// Strict ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Nodes from the root down to and including `id`
    #[must_use]
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);
        path
    }

    /// Is `ancestor` a strict ancestor of `node`? Walks at most `depth(node)` steps.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let target_depth = self.depth(ancestor);
        self.ancestors(node)
            .take_while(|&n| self.depth(n) >= target_depth)
            .any(|n| n == ancestor)
    }

    /// True when `a` and `b` lie on one root-to-leaf path
    #[must_use]
    pub fn on_same_path(&self, a: NodeId, b: NodeId) -> bool {
        a == b || self.is_ancestor_of(a, b) || self.is_ancestor_of(b, a)
    }

    /// Deepest node that is an ancestor-or-self of every node in `ids`
    #[must_use]
    pub fn common_ancestor(&self, ids: &[NodeId]) -> Option<NodeId> {
        let (&first, rest) = ids.split_first()?;
        let mut candidate = Some(first);
        while let Some(c) = candidate {
            if rest
                .iter()
                .all(|&other| other == c || self.is_ancestor_of(c, other))
            {
                return Some(c);
            }
            candidate = self.parent(c);
        }
        None
    }

    /// All strict descendants of `id` in depth-first order
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev());
        }
        out
    }
}
