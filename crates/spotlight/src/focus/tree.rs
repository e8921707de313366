#![forbid(unsafe_code)]

//! Node table for directional focus navigation.
//!
//! Each node mirrors one element of the host's visual tree, identified by a
//! [`FocusId`]. The table answers the capability and bounds queries the
//! engine needs: parent/child structure, document order, spottability, and
//! name lookup for declarative overrides.
//!
//! # Invariants
//!
//! 1. Node IDs are unique within the tree.
//! 2. Every child listed under a node exists and names that node as parent.
//! 3. Removing a node removes its whole subtree.
//! 4. A node is *reachable* only if it and every ancestor is visible,
//!    rendered, enabled, and not spot-disabled.
//! 5. A container is spottable only through a spottable descendant; it is
//!    never a focus target itself.
//!
//! # Complexity
//!
//! | Operation | Time |
//! |-----------|------|
//! | insert | O(depth) (cycle check) |
//! | remove | O(subtree) |
//! | is_spottable (leaf) | O(depth) |
//! | is_spottable (container) | O(subtree × depth) |
//! | spottable_children | O(subtree × depth) |

use std::collections::HashMap;

use spotlight_core::event::{KeyCode, NodeId};
use spotlight_core::geometry::{Point, Rect};

/// Unique identifier for a node in the focus tree.
pub type FocusId = NodeId;

/// Directional navigation ("5-way") direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Returns true for vertical directions.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// Direction carried by an arrow key.
    #[must_use]
    pub const fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Up => Some(Self::Up),
            KeyCode::Down => Some(Self::Down),
            KeyCode::Left => Some(Self::Left),
            KeyCode::Right => Some(Self::Right),
            _ => None,
        }
    }

    /// Returns the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }
}

/// What part a node plays in focus navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Capability {
    /// Not focusable; only its descendants can be.
    #[default]
    None,
    /// Receives focus directly.
    Focusable,
    /// Focusable by proxy: forwards focus to a remembered descendant.
    Container,
}

/// A node in the focus tree.
#[derive(Clone, Debug, PartialEq)]
pub struct FocusNode {
    /// Unique identifier.
    pub id: FocusId,
    /// Absolute bounding rectangle in the shared coordinate space.
    pub bounds: Rect,
    /// Focus role.
    pub capability: Capability,
    pub visible: bool,
    pub enabled: bool,
    pub rendered: bool,
    /// Individually excluded from focus navigation (subtree included).
    pub spot_disabled: bool,
    /// Name used by overrides and default-control lookups.
    pub name: Option<String>,
    /// Stable type tag used to resolve a registered decorator.
    pub kind: Option<String>,
    /// Keys the engine must not act on while this node has focus.
    pub ignored_keys: Vec<KeyCode>,
    /// Named neighbor overrides, indexed by [`Direction`].
    pub neighbors: [Option<String>; 4],
    /// Named target for the select key.
    pub select_target: Option<String>,
    /// Containers: named child that receives focus on first entry.
    pub default_control: Option<String>,
    /// Containers: re-enter at the last focused child (`true`) or at the
    /// child nearest to where navigation came from (`false`).
    pub remember_focus: bool,
    /// Named node that takes focus if this node (or its subtree) vanishes.
    pub disappear_target: Option<String>,
    parent: Option<FocusId>,
    children: Vec<FocusId>,
}

impl FocusNode {
    /// Create a new focusable node.
    #[must_use]
    pub fn new(id: FocusId, bounds: Rect) -> Self {
        Self {
            id,
            bounds,
            capability: Capability::Focusable,
            visible: true,
            enabled: true,
            rendered: true,
            spot_disabled: false,
            name: None,
            kind: None,
            ignored_keys: Vec::new(),
            neighbors: Default::default(),
            select_target: None,
            default_control: None,
            remember_focus: true,
            disappear_target: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Create a container node.
    #[must_use]
    pub fn container(id: FocusId, bounds: Rect) -> Self {
        Self::new(id, bounds).with_capability(Capability::Container)
    }

    /// Create a non-focusable structural node.
    #[must_use]
    pub fn plain(id: FocusId, bounds: Rect) -> Self {
        Self::new(id, bounds).with_capability(Capability::None)
    }

    /// Builder: set capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    /// Builder: set visibility.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Builder: set enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder: set rendered flag.
    #[must_use]
    pub fn with_rendered(mut self, rendered: bool) -> Self {
        self.rendered = rendered;
        self
    }

    /// Builder: exclude from navigation.
    #[must_use]
    pub fn with_spot_disabled(mut self, disabled: bool) -> Self {
        self.spot_disabled = disabled;
        self
    }

    /// Builder: set name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set decorator type tag.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Builder: ignore a key while focused.
    #[must_use]
    pub fn with_ignored_key(mut self, code: KeyCode) -> Self {
        self.ignored_keys.push(code);
        self
    }

    /// Builder: set a named neighbor override.
    #[must_use]
    pub fn with_neighbor(mut self, dir: Direction, name: impl Into<String>) -> Self {
        self.neighbors[dir.index()] = Some(name.into());
        self
    }

    /// Builder: set the named select target.
    #[must_use]
    pub fn with_select_target(mut self, name: impl Into<String>) -> Self {
        self.select_target = Some(name.into());
        self
    }

    /// Builder: set the container's default control.
    #[must_use]
    pub fn with_default_control(mut self, name: impl Into<String>) -> Self {
        self.default_control = Some(name.into());
        self
    }

    /// Builder: set the container's focus memory mode.
    #[must_use]
    pub fn with_remember_focus(mut self, remember: bool) -> Self {
        self.remember_focus = remember;
        self
    }

    /// Builder: set the disappear target.
    #[must_use]
    pub fn with_disappear_target(mut self, name: impl Into<String>) -> Self {
        self.disappear_target = Some(name.into());
        self
    }

    /// Parent node, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<FocusId> {
        self.parent
    }

    /// Children in document order.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[FocusId] {
        &self.children
    }

    /// Named neighbor override for `dir`.
    #[must_use]
    pub fn neighbor(&self, dir: Direction) -> Option<&str> {
        self.neighbors[dir.index()].as_deref()
    }

    /// Whether the node is a container.
    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.capability == Capability::Container
    }

    /// Whether the engine must leave `code` alone while this node is focused.
    #[must_use]
    pub fn ignores(&self, code: KeyCode) -> bool {
        self.ignored_keys.contains(&code)
    }

    /// Node-local part of reachability (ancestors not considered).
    #[inline]
    fn is_passable(&self) -> bool {
        self.visible && self.rendered && self.enabled && !self.spot_disabled
    }
}

/// Ordered tree of focus nodes.
#[derive(Debug, Default)]
pub struct FocusTree {
    nodes: HashMap<FocusId, FocusNode>,
    roots: Vec<FocusId>,
}

impl FocusTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` as the last child of `parent` (or as a new root).
    ///
    /// If a node with the same ID exists, its attributes are replaced and its
    /// children kept; it keeps its position when the parent is unchanged.
    /// Returns `None` (and changes nothing) if `parent` is missing or would
    /// create a cycle.
    pub fn insert(&mut self, parent: Option<FocusId>, mut node: FocusNode) -> Option<FocusId> {
        let id = node.id;
        if let Some(p) = parent
            && (p == id || !self.nodes.contains_key(&p) || self.is_ancestor(id, p))
        {
            return None;
        }

        node.parent = parent;
        match self.nodes.remove(&id) {
            Some(old) if old.parent == parent => {
                node.children = old.children;
                self.nodes.insert(id, node);
                return Some(id);
            }
            Some(old) => {
                node.children = old.children;
                self.detach(id, old.parent);
            }
            None => node.children.clear(),
        }

        match parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    parent_node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.nodes.insert(id, node);
        Some(id)
    }

    /// Remove a node and its whole subtree.
    ///
    /// Returns the removed IDs in document order (empty if not present).
    #[must_use = "removed ids identify state that must be released"]
    pub fn remove(&mut self, id: FocusId) -> Vec<FocusId> {
        let Some(parent) = self.nodes.get(&id).map(|n| n.parent) else {
            return Vec::new();
        };
        let removed = self.subtree(id);
        for gone in &removed {
            self.nodes.remove(gone);
        }
        self.detach(id, parent);
        removed
    }

    fn detach(&mut self, id: FocusId, parent: Option<FocusId>) {
        match parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    parent_node.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
    }

    /// Look up a node by ID.
    #[must_use = "use the returned node (if any)"]
    pub fn get(&self, id: FocusId) -> Option<&FocusNode> {
        self.nodes.get(&id)
    }

    /// Mutable lookup. Structural links cannot be changed through this.
    pub fn get_mut(&mut self, id: FocusId) -> Option<&mut FocusNode> {
        self.nodes.get_mut(&id)
    }

    /// Whether the node exists.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: FocusId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes in document order.
    #[must_use]
    pub fn roots(&self) -> &[FocusId] {
        &self.roots
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: FocusId) -> Option<FocusId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Children of `id` in document order (empty if missing).
    #[must_use]
    pub fn children(&self, id: FocusId) -> &[FocusId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Bounds of `id`.
    #[must_use]
    pub fn bounds(&self, id: FocusId) -> Option<Rect> {
        self.nodes.get(&id).map(|n| n.bounds)
    }

    /// Whether `id` is a container.
    #[must_use]
    pub fn is_container(&self, id: FocusId) -> bool {
        self.nodes.get(&id).is_some_and(FocusNode::is_container)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: FocusId) -> impl Iterator<Item = FocusId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: FocusId, node: FocusId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether `node` is `scope` or lies below it.
    #[must_use]
    pub fn is_within(&self, node: FocusId, scope: FocusId) -> bool {
        node == scope || self.is_ancestor(scope, node)
    }

    /// `id` followed by all its descendants, in document order.
    #[must_use]
    pub fn subtree(&self, id: FocusId) -> Vec<FocusId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(&id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every node in document order.
    #[must_use]
    pub fn document_order(&self) -> Vec<FocusId> {
        self.roots.iter().flat_map(|r| self.subtree(*r)).collect()
    }

    /// Whether `id` and all its ancestors are visible, rendered, enabled, and
    /// not spot-disabled.
    #[must_use]
    pub fn is_reachable(&self, id: FocusId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        node.is_passable()
            && self
                .ancestors(id)
                .all(|a| self.nodes.get(&a).is_some_and(FocusNode::is_passable))
    }

    /// Capability predicate.
    ///
    /// Focusable nodes are spottable when reachable. Containers are
    /// spottable when reachable and holding a spottable descendant, unless
    /// `skip_containers` is set, in which case they never are.
    #[must_use]
    pub fn is_spottable(&self, id: FocusId, skip_containers: bool) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        match node.capability {
            Capability::None => false,
            Capability::Focusable => self.is_reachable(id),
            Capability::Container => !skip_containers && self.first_spottable(id).is_some(),
        }
    }

    /// First focusable descendant of `scope` in document order, looking
    /// through containers. `scope` itself is not considered.
    #[must_use]
    pub fn first_spottable(&self, scope: FocusId) -> Option<FocusId> {
        if !self.is_reachable(scope) {
            return None;
        }
        let mut stack: Vec<FocusId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.is_passable() {
                continue;
            }
            if node.capability == Capability::Focusable {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Spottable nodes directly "under" `scope`: each child that is
    /// spottable (containers count as one unit), otherwise that child's own
    /// spottable children, recursively.
    #[must_use]
    pub fn spottable_children(&self, scope: FocusId) -> Vec<FocusId> {
        let mut out = Vec::new();
        if self.is_reachable(scope) {
            self.collect_spottable_children(scope, &mut out);
        }
        out
    }

    fn collect_spottable_children(&self, scope: FocusId, out: &mut Vec<FocusId>) {
        for &child in self.children(scope) {
            let Some(node) = self.nodes.get(&child) else {
                continue;
            };
            if !node.is_passable() {
                continue;
            }
            if self.is_spottable(child, false) {
                out.push(child);
            } else {
                self.collect_spottable_children(child, out);
            }
        }
    }

    /// Topmost (last in document order) reachable node whose bounds contain
    /// `point`.
    #[must_use]
    pub fn hit_test(&self, point: Point) -> Option<FocusId> {
        let mut hit = None;
        let mut stack: Vec<FocusId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.is_passable() {
                continue;
            }
            if node.bounds.contains(point) {
                hit = Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        hit
    }

    /// Find a node by name, searching `scope`'s subtree first and then the
    /// whole tree.
    #[must_use]
    pub fn find_by_name(&self, scope: Option<FocusId>, name: &str) -> Option<FocusId> {
        let named = |id: &FocusId| {
            self.nodes
                .get(id)
                .is_some_and(|n| n.name.as_deref() == Some(name))
        };
        scope
            .and_then(|s| self.subtree(s).into_iter().find(named))
            .or_else(|| self.document_order().into_iter().find(named))
    }

    /// Clear all nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }
}

// =========================================================================
// Tests
// =========================================================================
