//! Stack of open elements.

use crate::dom::NodeId;

/// Entry in the stack of open elements. The tag name is cached so scope checks
/// do not need to go back to the document arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OpenElement {
    pub(crate) node: NodeId,
    pub(crate) name: String,
}

/// Scope flavours used by end-tag handling.
///
/// The flavour is chosen by the caller algorithm, not by the tag name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    InScope,
    Button,
    ListItem,
}

const SCOPE_BOUNDARIES: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
];

impl ScopeKind {
    fn is_boundary(self, name: &str) -> bool {
        if SCOPE_BOUNDARIES.contains(&name) {
            return true;
        }
        match self {
            ScopeKind::InScope => false,
            ScopeKind::Button => name == "button",
            ScopeKind::ListItem => name == "ol" || name == "ul",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct OpenElementsStack {
    items: Vec<OpenElement>,
    max_depth: usize,
}

impl OpenElementsStack {
    pub(crate) fn push(&mut self, node: NodeId, name: &str) {
        self.items.push(OpenElement {
            node,
            name: name.to_string(),
        });
        self.max_depth = self.max_depth.max(self.items.len());
    }

    pub(crate) fn pop(&mut self) -> Option<OpenElement> {
        self.items.pop()
    }

    pub(crate) fn current(&self) -> Option<&OpenElement> {
        self.items.last()
    }

    pub(crate) fn current_node(&self) -> Option<NodeId> {
        self.items.last().map(|e| e.node)
    }

    pub(crate) fn current_is(&self, name: &str) -> bool {
        self.current().is_some_and(|e| e.name == name)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Iterate from the top of the stack (current node) downwards.
    pub(crate) fn iter_from_top(&self) -> impl Iterator<Item = &OpenElement> {
        self.items.iter().rev()
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) {
        self.items.retain(|e| e.node != node);
    }

    pub(crate) fn has_in_scope(&self, target: &str, kind: ScopeKind) -> bool {
        self.find_in_scope(target, kind).is_some()
    }

    /// Pop elements from the top down to and including `target` when it is
    /// visible in `kind` scope. Returns whether anything was popped.
    pub(crate) fn pop_until_including(&mut self, target: &str, kind: ScopeKind) -> bool {
        let Some(index) = self.find_in_scope(target, kind) else {
            return false;
        };
        self.items.truncate(index);
        true
    }

    /// Pop down to and including the first entry for `node`.
    pub(crate) fn pop_until_node(&mut self, node: NodeId) {
        if let Some(index) = self.items.iter().rposition(|e| e.node == node) {
            self.items.truncate(index);
        }
    }

    fn find_in_scope(&self, target: &str, kind: ScopeKind) -> Option<usize> {
        for (index, entry) in self.items.iter().enumerate().rev() {
            if entry.name == target {
                return Some(index);
            }
            if kind.is_boundary(&entry.name) {
                return None;
            }
        }
        None
    }
}
