//! The attribute tree.
//!
//! A mutable hierarchical namespace mapping path segments to unique integer
//! handles ("quarks"). Quarks are assigned in creation order and are stable
//! for the lifetime of the state system: a full path always resolves to the
//! same quark, and a quark is never reassigned to a different path.
//!
//! Tree mutation is the only state-system mutation that is not time-indexed;
//! it is ordered only by the causal order of the events being processed.

use std::collections::HashMap;

use super::error::{Result, StateError};
use super::Quark;

struct AttributeNode {
    name: String,
    parent: Option<Quark>,
    /// Children in creation order.
    children: Vec<Quark>,
    child_index: HashMap<String, Quark>,
    removed: bool,
}

impl AttributeNode {
    fn new(name: String, parent: Option<Quark>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            child_index: HashMap::new(),
            removed: false,
        }
    }
}

#[derive(Default)]
pub struct AttributeTree {
    /// Quark == index in this vector. The root is implicit and has no quark.
    nodes: Vec<AttributeNode>,
    root_children: Vec<Quark>,
    root_index: HashMap<String, Quark>,
}

impl AttributeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attributes created so far, removed ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn child_of(&self, parent: Option<Quark>, segment: &str) -> Option<Quark> {
        match parent {
            None => self.root_index.get(segment).copied(),
            Some(p) => self.nodes[p].child_index.get(segment).copied(),
        }
    }

    fn add_child(&mut self, parent: Option<Quark>, segment: &str) -> Quark {
        let quark = self.nodes.len();
        self.nodes.push(AttributeNode::new(segment.to_string(), parent));
        match parent {
            None => {
                self.root_children.push(quark);
                self.root_index.insert(segment.to_string(), quark);
            }
            Some(p) => {
                self.nodes[p].children.push(quark);
                self.nodes[p].child_index.insert(segment.to_string(), quark);
            }
        }
        quark
    }

    /// Resolves `path` under `parent` (`None` for the root), creating missing
    /// nodes on the way. Idempotent: an existing path returns its quark and
    /// creates nothing. A removed node reached through here is revived with
    /// its original quark, since thread ids are recycled by the kernel.
    pub fn get_or_create(&mut self, parent: Option<Quark>, path: &[&str]) -> Quark {
        debug_assert!(parent.is_some() || !path.is_empty());

        let mut current = parent;
        for segment in path {
            let quark = match self.child_of(current, segment) {
                Some(q) => {
                    if self.nodes[q].removed {
                        self.nodes[q].removed = false;
                    }
                    q
                }
                None => self.add_child(current, segment),
            };
            current = Some(quark);
        }

        // Empty relative paths resolve to the starting node itself.
        current.expect("empty absolute path")
    }

    /// Lookup without creation. Fails with `AttributeNotFound` if any segment
    /// is missing or if the resolved node has been removed.
    pub fn get(&self, parent: Option<Quark>, path: &[&str]) -> Result<Quark> {
        let mut current = parent;
        for segment in path {
            let quark = self
                .child_of(current, segment)
                .filter(|&q| !self.nodes[q].removed)
                .ok_or_else(|| StateError::AttributeNotFound(path.join("/")))?;
            current = Some(quark);
        }
        current.ok_or_else(|| StateError::AttributeNotFound(String::new()))
    }

    /// Children of `quark` (or of the root) in creation order, removed nodes
    /// excluded. With `recursive`, the whole live subtree in depth-first
    /// creation order.
    pub fn sub_attributes(&self, quark: Option<Quark>, recursive: bool) -> Vec<Quark> {
        let mut out = Vec::new();
        let children = match quark {
            None => &self.root_children,
            Some(q) => &self.nodes[q].children,
        };
        for &child in children {
            if self.nodes[child].removed {
                continue;
            }
            out.push(child);
            if recursive {
                out.extend(self.sub_attributes(Some(child), true));
            }
        }
        out
    }

    /// Marks `quark` and all its descendants removed. The quarks stay
    /// allocated; only path lookups and child listings stop seeing them.
    pub fn mark_removed(&mut self, quark: Quark) {
        let children = self.nodes[quark].children.clone();
        for child in children {
            self.mark_removed(child);
        }
        self.nodes[quark].removed = true;
    }

    pub fn name(&self, quark: Quark) -> &str {
        &self.nodes[quark].name
    }

    pub fn parent(&self, quark: Quark) -> Option<Quark> {
        self.nodes[quark].parent
    }

    /// Full path of `quark` from the root, segments joined with '/'.
    pub fn full_path(&self, quark: Quark) -> String {
        let mut segments = vec![self.nodes[quark].name.as_str()];
        let mut current = self.nodes[quark].parent;
        while let Some(q) = current {
            segments.push(self.nodes[q].name.as_str());
            current = self.nodes[q].parent;
        }
        segments.reverse();
        segments.join("/")
    }
}
