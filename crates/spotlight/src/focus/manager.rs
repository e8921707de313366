#![forbid(unsafe_code)]

//! Focus manager: the state machine that owns "what has focus".
//!
//! The manager is the only component allowed to change the current node.
//! It turns raw input into focus changes, runs the directional search,
//! routes focus through container memory, arbitrates between pointer and
//! directional interaction, and emits lifecycle events.
//!
//! # State
//!
//! ```text
//! Uninitialized ──initialize──▶ Initialized { PointerMode ⇄ DirectionalMode }
//!                                    × Frozen(bool) × Muted(reasons)
//! ```
//!
//! # Invariants
//!
//! 1. `current` never names a node that is absent from the tree.
//! 2. A commit emits blur, then focus, then focused, synchronously, with
//!    container leave/enter notifications in between.
//! 3. While frozen, the current node cannot change except through the
//!    disappearance fallback.
//! 4. While muted, no node is highlighted; logical focus is unaffected.
//! 5. Containers are never current; focus routed to one lands on a
//!    descendant.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `spot` of an unknown node | `Ok(false)`, warning logged |
//! | `freeze` with nothing focused | `false`, warning logged |
//! | Unknown override / default-control name | `Err(FocusError::UnknownTarget)` |
//! | Focused node disappears | Falls over to disappear target, first spottable, or nothing |
//! | Directional search finds nothing | Ancestor climb, bounce, or resume; never an error |

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use spotlight_core::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, PointerEvent, PointerKind,
};
use spotlight_core::geometry::{Point, Rect};
use tracing::{debug, info, trace, warn};
use web_time::Instant;

use super::accelerator::{Accelerator, KeyDecision};
use super::container::{ContainerMemory, ContainerRoute};
use super::decorator::{
    Decorator, DecoratorRegistry, FocusRequest, HandlerContext, HighlightSink, Propagation,
};
use super::deferred::{DeferredQueue, DeferredTask};
use super::event::{FocusEvent, FocusEventKind, FocusOrigin};
use super::spatial;
use super::tree::{Capability, Direction, FocusId, FocusNode, FocusTree};
use crate::config::FocusConfig;
use crate::error::{FocusError, Result};

/// Upper bound on handler-requested focus changes applied after one input.
const MAX_SETTLE_ROUNDS: usize = 16;

/// Where routing focus to a node ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// A spottable leaf that can take focus.
    Leaf(FocusId),
    /// A container already holding focus; keep moving from it.
    Escalate(FocusId),
    /// A container with nothing to enter; keep moving past it.
    PassThrough(FocusId),
    /// Nothing can take focus.
    Nothing,
}

/// Central focus coordinator.
pub struct FocusManager {
    tree: FocusTree,
    config: FocusConfig,
    root: Option<FocusId>,
    initialized: bool,
    requested_default: Option<FocusId>,
    current: Option<FocusId>,
    last_directional: Option<FocusId>,
    highlighted: Option<FocusId>,
    pointer_mode: bool,
    pointer_position: Option<Point>,
    pointer_hidden_until: Option<Instant>,
    frozen: bool,
    mutes: BTreeSet<String>,
    accelerator: Accelerator,
    containers: ContainerMemory,
    decorators: DecoratorRegistry,
    deferred: DeferredQueue,
    observed: SmallVec<[FocusId; 8]>,
    disappear_fallback: Option<FocusId>,
    saved: Vec<FocusId>,
    last_event: Option<FocusEvent>,
    last_directional_event: Option<FocusEvent>,
    events: Vec<FocusEvent>,
    pending: Vec<FocusRequest>,
    settling: bool,
    highlight_sink: Option<Box<dyn HighlightSink>>,
    clock: Instant,
}

impl fmt::Debug for FocusManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusManager")
            .field("root", &self.root)
            .field("initialized", &self.initialized)
            .field("current", &self.current)
            .field("last_directional", &self.last_directional)
            .field("highlighted", &self.highlighted)
            .field("pointer_mode", &self.pointer_mode)
            .field("frozen", &self.frozen)
            .field("mutes", &self.mutes)
            .field("observed", &self.observed)
            .field("saved", &self.saved.len())
            .field("nodes", &self.tree.node_count())
            .field("pending_tasks", &self.deferred.len())
            .field("decorators", &self.decorators)
            .finish_non_exhaustive()
    }
}

impl Default for FocusManager {
    fn default() -> Self {
        Self::new(FocusConfig::default())
    }
}

impl FocusManager {
    /// Create a manager with an empty tree.
    #[must_use]
    pub fn new(config: FocusConfig) -> Self {
        Self::with_tree(FocusTree::new(), config)
    }

    /// Create a manager over an existing tree.
    #[must_use]
    pub fn with_tree(tree: FocusTree, config: FocusConfig) -> Self {
        Self {
            tree,
            accelerator: Accelerator::new(config.accelerator.clone()),
            config,
            root: None,
            initialized: false,
            requested_default: None,
            current: None,
            last_directional: None,
            highlighted: None,
            pointer_mode: false,
            pointer_position: None,
            pointer_hidden_until: None,
            frozen: false,
            mutes: BTreeSet::new(),
            containers: ContainerMemory::new(),
            decorators: DecoratorRegistry::new(),
            deferred: DeferredQueue::new(),
            observed: SmallVec::new(),
            disappear_fallback: None,
            saved: Vec::new(),
            last_event: None,
            last_directional_event: None,
            events: Vec::new(),
            pending: Vec::new(),
            settling: false,
            highlight_sink: None,
            clock: Instant::now(),
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// The node table.
    #[must_use]
    pub fn tree(&self) -> &FocusTree {
        &self.tree
    }

    /// Mutable node table.
    ///
    /// Changes made here are not observed. Use the lifecycle methods
    /// ([`remove_node`](Self::remove_node), [`set_visible`](Self::set_visible),
    /// ...) when the focused node may be affected.
    pub fn tree_mut(&mut self) -> &mut FocusTree {
        &mut self.tree
    }

    #[must_use]
    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    /// Root passed to [`initialize`](Self::initialize).
    #[must_use]
    pub fn root(&self) -> Option<FocusId> {
        self.root
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Node holding focus.
    #[must_use]
    pub fn current(&self) -> Option<FocusId> {
        self.current
    }

    /// Whether `id` holds focus.
    #[must_use]
    pub fn is_current(&self, id: FocusId) -> bool {
        self.current == Some(id)
    }

    /// Last node focused by non-pointer input; directional navigation
    /// resumes here after pointer use.
    #[must_use]
    pub fn last_directional(&self) -> Option<FocusId> {
        self.last_directional
    }

    /// Node currently carrying the visual highlight.
    #[must_use]
    pub fn highlighted(&self) -> Option<FocusId> {
        self.highlighted
    }

    #[must_use]
    pub fn pointer_mode(&self) -> bool {
        self.pointer_mode
    }

    /// Last pointer position seen.
    #[must_use]
    pub fn pointer_position(&self) -> Option<Point> {
        self.pointer_position
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        !self.mutes.is_empty()
    }

    /// Number of distinct active mute reasons.
    #[must_use]
    pub fn mute_count(&self) -> usize {
        self.mutes.len()
    }

    /// Nodes whose lifecycle changes currently trigger a spottability check.
    #[must_use]
    pub fn observed(&self) -> &[FocusId] {
        &self.observed
    }

    /// Number of queued deferred tasks.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    /// When the next deferred task falls due. Hosts without a frame loop
    /// can schedule their next [`tick_at`](Self::tick_at) from this.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deferred.next_due()
    }

    #[must_use]
    pub fn accelerator(&self) -> &Accelerator {
        &self.accelerator
    }

    #[must_use]
    pub fn container_memory(&self) -> &ContainerMemory {
        &self.containers
    }

    /// Most recent emitted event.
    #[must_use]
    pub fn last_event(&self) -> Option<&FocusEvent> {
        self.last_event.as_ref()
    }

    /// Most recent directional event.
    #[must_use]
    pub fn last_directional_event(&self) -> Option<&FocusEvent> {
        self.last_directional_event.as_ref()
    }

    /// Events emitted since the last call to [`take_events`](Self::take_events).
    #[must_use]
    pub fn events(&self) -> &[FocusEvent] {
        &self.events
    }

    /// Drain emitted events.
    pub fn take_events(&mut self) -> Vec<FocusEvent> {
        std::mem::take(&mut self.events)
    }

    /// Capability predicate (see [`FocusTree::is_spottable`]).
    #[must_use]
    pub fn is_spottable(&self, id: FocusId, skip_containers: bool) -> bool {
        self.tree.is_spottable(id, skip_containers)
    }

    // ---------------------------------------------------------------------
    // Collaborators
    // ---------------------------------------------------------------------

    /// Register a decorator for nodes tagged `kind`.
    pub fn register_decorator(&mut self, kind: impl Into<String>, decorator: Rc<dyn Decorator>) {
        self.decorators.register(kind, decorator);
    }

    /// Register the handler shared by every container.
    pub fn register_container_decorator(&mut self, decorator: Rc<dyn Decorator>) {
        self.decorators.register_container(decorator);
    }

    /// Install the highlight sink. The current highlight is replayed on it.
    pub fn set_highlight_sink(&mut self, mut sink: Box<dyn HighlightSink>) {
        if let Some(id) = self.highlighted {
            sink.set_highlight(id, true);
        }
        self.highlight_sink = Some(sink);
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// One-time transition to the initialized state.
    ///
    /// Focuses the node requested before initialization if it is spottable,
    /// else the first spottable node under `root`. Returns `Ok(false)` if
    /// already initialized or `root` is unknown.
    pub fn initialize(&mut self, root: FocusId) -> Result<bool> {
        self.clock = Instant::now();
        if self.initialized {
            return Ok(false);
        }
        if !self.tree.contains(root) {
            warn!(root, "initialize: unknown root");
            return Ok(false);
        }
        self.root = Some(root);
        self.initialized = true;
        if self.config.initial_pointer_mode && !self.config.touch_only {
            self.pointer_mode = true;
        }

        let requested = self
            .requested_default
            .take()
            .filter(|id| self.tree.is_within(*id, root) && self.tree.is_spottable(*id, false));
        let start = requested.or_else(|| self.tree.first_spottable(root));
        debug!(root, ?start, pointer_mode = self.pointer_mode, "focus initialized");
        if let Some(start) = start
            && let Entry::Leaf(leaf) = self.resolve_entry(start, FocusOrigin::Programmatic, None)?
        {
            self.commit_or_defer(leaf, FocusOrigin::Programmatic);
        }
        self.settle()?;
        Ok(true)
    }

    /// Insert a node, keeping cached decorator resolution and observation
    /// up to date.
    pub fn insert_node(&mut self, parent: Option<FocusId>, node: FocusNode) -> Option<FocusId> {
        let id = self.tree.insert(parent, node)?;
        self.decorators.forget(&[id]);
        self.notify(id);
        Some(id)
    }

    /// Remove a node and its subtree.
    ///
    /// Losing the focused node is always handled immediately, even if
    /// observation had not been attached yet.
    pub fn remove_node(&mut self, id: FocusId) -> Vec<FocusId> {
        self.clock = Instant::now();
        let removed = self.tree.remove(id);
        if removed.is_empty() {
            return removed;
        }
        self.containers.forget(&removed);
        self.decorators.forget(&removed);
        let gone = |slot: &mut Option<FocusId>| {
            if slot.is_some_and(|n| removed.contains(&n)) {
                *slot = None;
            }
        };
        gone(&mut self.last_directional);
        gone(&mut self.requested_default);
        gone(&mut self.disappear_fallback);
        gone(&mut self.root);
        if let Some(h) = self.highlighted
            && removed.contains(&h)
        {
            self.set_highlight(h, false);
        }
        self.observed.retain(|n| !removed.contains(n));
        self.saved.retain(|n| !removed.contains(n));
        self.deferred
            .cancel(|t| matches!(t, DeferredTask::Observe(n) if removed.contains(n)));

        if self.current.is_some_and(|c| removed.contains(&c)) {
            self.fall_over();
        }
        self.settle_logged();
        removed
    }

    /// Show or hide a node.
    pub fn set_visible(&mut self, id: FocusId, visible: bool) -> bool {
        self.update_node(id, |n| n.visible = visible)
    }

    /// Enable or disable a node.
    pub fn set_enabled(&mut self, id: FocusId, enabled: bool) -> bool {
        self.update_node(id, |n| n.enabled = enabled)
    }

    /// Mark a node as rendered or not.
    pub fn set_rendered(&mut self, id: FocusId, rendered: bool) -> bool {
        self.update_node(id, |n| n.rendered = rendered)
    }

    /// Exclude a node (and its subtree) from focus navigation.
    pub fn set_spot_disabled(&mut self, id: FocusId, disabled: bool) -> bool {
        self.update_node(id, |n| n.spot_disabled = disabled)
    }

    /// Change a node's focus role.
    pub fn set_capability(&mut self, id: FocusId, capability: Capability) -> bool {
        self.decorators.forget(&[id]);
        self.update_node(id, |n| n.capability = capability)
    }

    fn update_node(&mut self, id: FocusId, change: impl FnOnce(&mut FocusNode)) -> bool {
        self.clock = Instant::now();
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        change(node);
        self.notify(id);
        self.settle_logged();
        true
    }

    /// React to a lifecycle change on `id`.
    fn notify(&mut self, id: FocusId) {
        let Some(current) = self.current else {
            return;
        };
        let affected = self.observed.contains(&id) || id == current;
        if !affected || self.tree.is_spottable(current, false) {
            return;
        }
        trace!(node = id, current, "observed node changed");
        self.fall_over();
    }

    /// Drain due deferred tasks using the current time.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Drain deferred tasks due at or before `now`.
    pub fn tick_at(&mut self, now: Instant) {
        self.clock = now;
        for task in self.deferred.drain_due(now) {
            match task {
                DeferredTask::Observe(id) => {
                    if self.current == Some(id) {
                        self.observed.clear();
                        self.observed.push(id);
                        self.observed.extend(self.tree.ancestors(id));
                        trace!(node = id, count = self.observed.len(), "observing");
                    }
                }
                DeferredTask::PointerHideElapsed => {
                    self.pointer_hidden_until = None;
                    self.set_pointer_mode(false);
                }
            }
        }
        self.settle_logged();
    }

    // ---------------------------------------------------------------------
    // Focus operations
    // ---------------------------------------------------------------------

    /// Request focus on `id` (or, for a container, on the descendant its
    /// memory picks).
    ///
    /// Returns `Ok(true)` if focus was set or already on `id`. Returns
    /// `Ok(false)` when frozen, when nothing under `id` is spottable, when
    /// `id` is unknown, and in pointer mode, where the request only records
    /// the directional resume target. Before initialization the request is
    /// remembered as the initial focus.
    pub fn spot(&mut self, id: FocusId) -> Result<bool> {
        self.spot_with(id, FocusOrigin::Programmatic)
    }

    /// [`spot`](Self::spot) with an explicit origin.
    pub fn spot_with(&mut self, id: FocusId, origin: FocusOrigin) -> Result<bool> {
        self.clock = Instant::now();
        let spotted = self.spot_inner(id, origin);
        self.settle()?;
        spotted
    }

    fn spot_inner(&mut self, id: FocusId, origin: FocusOrigin) -> Result<bool> {
        if !self.initialized {
            debug!(node = id, "spot before initialize; deferred");
            self.requested_default = Some(id);
            return Ok(false);
        }
        if !self.tree.contains(id) {
            warn!(node = id, "spot: unknown node");
            return Ok(false);
        }
        if self.current == Some(id) {
            return Ok(true);
        }
        if self.frozen {
            return Ok(false);
        }
        match self.resolve_entry(id, origin, None)? {
            Entry::Leaf(leaf) => Ok(self.commit_or_defer(leaf, origin)),
            _ => Ok(false),
        }
    }

    /// Blur the current node. No-op while frozen or with nothing focused.
    pub fn unspot(&mut self) -> bool {
        self.clock = Instant::now();
        let blurred = self.unspot_inner();
        self.settle_logged();
        blurred
    }

    fn unspot_inner(&mut self) -> bool {
        if self.frozen {
            return false;
        }
        let Some(prev) = self.current else {
            return false;
        };
        self.set_highlight(prev, false);
        self.dispatch(
            FocusEvent::new(FocusEventKind::Blur, Some(prev), FocusOrigin::Programmatic),
        );
        self.current = None;
        self.notify_containers(
            FocusEventKind::ContainerLeave,
            prev,
            None,
            FocusOrigin::Programmatic,
        );
        self.containers.sync_focus(&self.tree, None);
        self.emit(
            FocusEvent::new(FocusEventKind::CurrentChanged, None, FocusOrigin::Programmatic)
                .with_related(Some(prev)),
        );
        self.detach_observation();
        debug!(node = prev, "unspotted");
        true
    }

    /// Switch between pointer and directional mode.
    ///
    /// Suppressed on touch-only platforms.
    pub fn set_pointer_mode(&mut self, pointer_mode: bool) {
        if self.config.touch_only {
            trace!("pointer mode suppressed on touch-only platform");
            return;
        }
        if self.pointer_mode == pointer_mode {
            return;
        }
        self.pointer_mode = pointer_mode;
        debug!(pointer_mode, "interaction mode changed");
        self.emit(FocusEvent::new(
            FocusEventKind::ModeChanged { pointer_mode },
            self.current,
            FocusOrigin::Programmatic,
        ));
    }

    /// Lock focus on the current node. Fails with nothing focused.
    pub fn freeze(&mut self) -> bool {
        if self.current.is_none() {
            warn!("freeze: nothing is focused");
            return false;
        }
        self.frozen = true;
        true
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    /// Suspend highlighting for `reason`. Muting with an active reason is a
    /// no-op.
    pub fn mute(&mut self, reason: impl Into<String>) {
        let was_muted = self.is_muted();
        if self.mutes.insert(reason.into())
            && !was_muted
            && let Some(current) = self.current
        {
            self.set_highlight(current, false);
        }
    }

    /// Lift the mute for `reason`; the last one restores the highlight.
    pub fn unmute(&mut self, reason: &str) {
        if self.mutes.remove(reason)
            && self.mutes.is_empty()
            && let Some(current) = self.current
        {
            self.set_highlight(current, true);
        }
    }

    /// Push the current node on the saved-focus stack.
    ///
    /// Returns `false` with nothing focused.
    pub fn save_focus(&mut self) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        self.saved.push(current);
        true
    }

    /// Pop the saved-focus stack and spot the node popped.
    ///
    /// An empty stack is logged and leaves focus unchanged.
    pub fn restore_focus(&mut self) -> Result<bool> {
        let Some(id) = self.saved.pop() else {
            warn!("restore_focus: saved-focus stack is empty");
            return Ok(false);
        };
        self.spot(id)
    }

    /// Depth of the saved-focus stack.
    #[must_use]
    pub fn saved_depth(&self) -> usize {
        self.saved.len()
    }

    /// Move focus in `dir` from the current node.
    pub fn navigate(&mut self, dir: Direction) -> Result<bool> {
        self.clock = Instant::now();
        let moved = self.navigate_inner(dir);
        self.settle()?;
        moved
    }

    /// Act on the select key for the current node.
    pub fn select(&mut self) -> Result<bool> {
        self.clock = Instant::now();
        let selected = self.select_inner();
        self.settle()?;
        selected
    }

    /// Spottable leaf nearest to `point`, optionally restricted to `dir`.
    #[must_use]
    pub fn nearest_pointer_neighbor(&self, point: Point, dir: Option<Direction>) -> Option<FocusId> {
        let scope = self.root?;
        let candidates: Vec<(FocusId, Rect)> = self
            .tree
            .subtree(scope)
            .into_iter()
            .filter(|id| self.tree.is_spottable(*id, true))
            .filter_map(|id| self.tree.bounds(id).map(|b| (id, b)))
            .collect();
        spatial::nearest_to_point(point, dir, candidates)
    }

    // ---------------------------------------------------------------------
    // Input
    // ---------------------------------------------------------------------

    /// Feed one input event using the current time.
    ///
    /// Returns `Ok(true)` when the engine consumed the event.
    pub fn handle_event(&mut self, event: &Event) -> Result<bool> {
        self.handle_event_at(event, Instant::now())
    }

    /// Feed one input event observed at `now`.
    pub fn handle_event_at(&mut self, event: &Event, now: Instant) -> Result<bool> {
        self.clock = now;
        let consumed = match event {
            Event::Key(key) => self.handle_key(key, now),
            Event::Pointer(pointer) => self.handle_pointer(pointer),
            Event::PointerVisibility(visible) => {
                self.handle_pointer_visibility(*visible, now);
                Ok(false)
            }
        };
        self.settle()?;
        consumed
    }

    fn handle_key(&mut self, key: &KeyEvent, now: Instant) -> Result<bool> {
        if !self.initialized || key.is_chord() {
            return Ok(false);
        }
        let dir = Direction::from_key(key.code);
        if dir.is_none() && key.code != KeyCode::Enter {
            return Ok(false);
        }
        if let Some(node) = self.current.and_then(|c| self.tree.get(c))
            && node.ignores(key.code)
        {
            trace!(node = node.id, key = ?key.code, "key ignored by focused node");
            return Ok(false);
        }
        if let Some(until) = self.pointer_hidden_until
            && now < until
        {
            trace!(key = ?key.code, "key dropped during pointer-hide debounce");
            return Ok(false);
        }
        if self.accelerator.process_key_at(key, now) == KeyDecision::Suppress {
            return Ok(true);
        }
        if key.kind == KeyEventKind::Release {
            return Ok(false);
        }

        if self.frozen
            && let (Some(dir), Some(current)) = (dir, self.current)
        {
            self.dispatch(FocusEvent::new(
                FocusEventKind::Direction(dir),
                Some(current),
                FocusOrigin::Directional(dir),
            ));
            return Ok(true);
        }

        if self.pointer_mode {
            self.set_pointer_mode(false);
        }
        if self.current.is_none() {
            return self.resume(dir);
        }
        match dir {
            Some(dir) => self.navigate_inner(dir),
            None => self.select_inner(),
        }
    }

    fn handle_pointer(&mut self, event: &PointerEvent) -> Result<bool> {
        if !self.initialized {
            return Ok(false);
        }
        self.pointer_position = Some(event.position);
        let hit = event
            .target
            .or_else(|| self.tree.hit_test(event.position))
            .and_then(|id| self.spottable_leaf_at(id));

        match event.kind {
            PointerKind::Move => {
                if !self.pointer_mode {
                    self.set_pointer_mode(true);
                }
                let Some(id) = hit else {
                    if self.pointer_mode && self.current.is_some() {
                        self.unspot_inner();
                    }
                    return Ok(false);
                };
                if self.current == Some(id) {
                    return Ok(true);
                }
                let point = FocusEvent::new(FocusEventKind::Point, Some(id), FocusOrigin::Pointer);
                if self.dispatch(point).is_handled() {
                    return Ok(true);
                }
                self.spot_inner(id, FocusOrigin::Pointer)
            }
            PointerKind::Down => {
                let Some(id) = hit else {
                    return Ok(false);
                };
                if !self.pointer_mode {
                    self.set_pointer_mode(true);
                }
                self.spot_inner(id, FocusOrigin::Pointer)
            }
            PointerKind::Up => {
                if hit.is_some() && hit == self.current {
                    self.select_inner()
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn handle_pointer_visibility(&mut self, visible: bool, now: Instant) {
        self.deferred
            .cancel(|t| *t == DeferredTask::PointerHideElapsed);
        if visible {
            self.pointer_hidden_until = None;
            self.set_pointer_mode(true);
        } else {
            let until = now + self.config.pointer_hide_debounce;
            self.pointer_hidden_until = Some(until);
            self.deferred
                .schedule(DeferredTask::PointerHideElapsed, until);
        }
    }

    /// Nearest self-or-ancestor that can take focus directly.
    fn spottable_leaf_at(&self, id: FocusId) -> Option<FocusId> {
        std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .find(|n| self.tree.is_spottable(*n, true))
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    fn navigate_inner(&mut self, dir: Direction) -> Result<bool> {
        let Some(current) = self.current else {
            return self.resume(Some(dir));
        };
        let handled = self
            .dispatch(FocusEvent::new(
                FocusEventKind::Direction(dir),
                Some(current),
                FocusOrigin::Directional(dir),
            ))
            .is_handled();
        if self.frozen {
            return Ok(false);
        }
        if handled {
            return Ok(true);
        }
        self.move_from(current, dir)
    }

    /// Run the 5-way move protocol starting at `start`.
    fn move_from(&mut self, start: FocusId, dir: Direction) -> Result<bool> {
        let origin = FocusOrigin::Directional(dir);
        // Containers that do not remember focus pick the child nearest to
        // where the move started, not to the container it climbed to.
        let start_bounds = self.tree.bounds(start);
        let mut from = start;
        let mut visited: SmallVec<[FocusId; 8]> = SmallVec::new();

        for _ in 0..=self.tree.node_count() {
            if visited.contains(&from) {
                break;
            }
            visited.push(from);

            if let Some(target) = self.directional_target(from, dir)? {
                match self.resolve_entry(target, origin, start_bounds)? {
                    Entry::Leaf(leaf) => return Ok(self.commit_or_defer(leaf, origin)),
                    Entry::Escalate(c) | Entry::PassThrough(c) => from = c,
                    Entry::Nothing => from = target,
                }
                continue;
            }

            if self.accelerator.is_accelerating() {
                debug!(node = from, direction = dir.as_str(), "bounce; streak canceled");
                self.accelerator.cancel();
                return Ok(false);
            }

            if let Some(ancestor) = self.spottable_ancestor(from) {
                trace!(node = from, ancestor, "climbing to ancestor");
                let event =
                    FocusEvent::new(FocusEventKind::Direction(dir), Some(ancestor), origin)
                        .from_container();
                if self.dispatch(event).is_handled() {
                    return Ok(true);
                }
                from = ancestor;
                continue;
            }

            return Ok(match self.last_directional {
                Some(last)
                    if self.current != Some(last) && self.tree.is_spottable(last, true) =>
                {
                    debug!(node = last, "recovering last directional node");
                    self.commit_or_defer(last, origin)
                }
                _ => false,
            });
        }
        Ok(false)
    }

    /// Next node in `dir` from `from`: the named override when it is usable,
    /// otherwise the best spatial candidate among `from`'s siblings.
    fn directional_target(&self, from: FocusId, dir: Direction) -> Result<Option<FocusId>> {
        let Some(node) = self.tree.get(from) else {
            return Ok(None);
        };
        if let Some(name) = node.neighbor(dir) {
            let Some(target) = self.tree.find_by_name(Some(from), name) else {
                return Err(FocusError::UnknownTarget {
                    scope: from,
                    name: name.to_owned(),
                });
            };
            if self.tree.is_container(target) {
                if let Some(first) = self.tree.first_spottable(target) {
                    return Ok(Some(first));
                }
            } else if self.tree.is_spottable(target, true) {
                return Ok(Some(target));
            }
            trace!(node = from, name, "override not spottable; searching");
        }

        let Some(origin) = self.tree.bounds(from) else {
            return Ok(None);
        };
        let Some(scope) = self.spottable_ancestor(from).or(self.root) else {
            return Ok(None);
        };
        let candidates = self
            .tree
            .spottable_children(scope)
            .into_iter()
            .filter_map(|id| self.tree.bounds(id).map(|b| (id, b)));
        Ok(spatial::select_neighbor(dir, origin, candidates, Some(from)))
    }

    fn spottable_ancestor(&self, id: FocusId) -> Option<FocusId> {
        self.tree
            .ancestors(id)
            .find(|a| self.tree.is_spottable(*a, false))
    }

    fn select_inner(&mut self) -> Result<bool> {
        let Some(current) = self.current else {
            return self.resume(None);
        };
        let handled = self
            .dispatch(FocusEvent::new(
                FocusEventKind::Select,
                Some(current),
                FocusOrigin::Select,
            ))
            .is_handled();
        if handled {
            return Ok(true);
        }

        if let Some(name) = self.tree.get(current).and_then(|n| n.select_target.clone()) {
            let Some(target) = self.tree.find_by_name(Some(current), &name) else {
                return Err(FocusError::UnknownTarget {
                    scope: current,
                    name,
                });
            };
            if self.frozen {
                return Ok(false);
            }
            return match self.resolve_entry(target, FocusOrigin::Select, None)? {
                Entry::Leaf(leaf) => Ok(self.commit_or_defer(leaf, FocusOrigin::Select)),
                _ => Ok(false),
            };
        }

        let first_child = self.tree.spottable_children(current).first().copied();
        match first_child {
            None => {
                self.dispatch(FocusEvent::new(
                    FocusEventKind::Activate,
                    Some(current),
                    FocusOrigin::Select,
                ));
                Ok(true)
            }
            Some(_) if self.frozen => Ok(false),
            Some(child) => match self.resolve_entry(child, FocusOrigin::Select, None)? {
                Entry::Leaf(leaf) => Ok(self.commit_or_defer(leaf, FocusOrigin::Select)),
                _ => Ok(false),
            },
        }
    }

    /// Bring focus back with nothing focused: nearest node to the pointer,
    /// else the last directional node, else the first spottable node.
    fn resume(&mut self, dir: Option<Direction>) -> Result<bool> {
        if self.frozen {
            return Ok(false);
        }
        let near_pointer = match (self.pointer_position, dir) {
            (Some(point), Some(dir)) => self.nearest_pointer_neighbor(point, Some(dir)),
            _ => None,
        };
        let target = near_pointer
            .or(self.last_directional.filter(|n| self.tree.is_spottable(*n, true)))
            .or_else(|| self.root.and_then(|r| self.tree.first_spottable(r)));
        let Some(target) = target else {
            return Ok(false);
        };
        debug!(node = target, "resuming directional focus");
        let origin = dir.map_or(FocusOrigin::Programmatic, FocusOrigin::Directional);
        match self.resolve_entry(target, origin, None)? {
            Entry::Leaf(leaf) => Ok(self.commit_or_defer(leaf, origin)),
            _ => Ok(false),
        }
    }

    // ---------------------------------------------------------------------
    // Commit
    // ---------------------------------------------------------------------

    /// Follow container routing from `id` down to a leaf.
    fn resolve_entry(
        &mut self,
        id: FocusId,
        origin: FocusOrigin,
        from: Option<Rect>,
    ) -> Result<Entry> {
        let mut node = id;
        for _ in 0..=self.tree.node_count() {
            if !self.tree.is_container(node) {
                return Ok(if self.tree.is_spottable(node, true) {
                    Entry::Leaf(node)
                } else {
                    Entry::Nothing
                });
            }
            if !self.tree.is_reachable(node) {
                return Ok(Entry::Nothing);
            }
            match self.containers.on_focused(&self.tree, node, origin, from)? {
                ContainerRoute::Enter(child) if child != node => node = child,
                ContainerRoute::Enter(_) | ContainerRoute::Empty => return Ok(Entry::Nothing),
                ContainerRoute::Escalate(_) => return Ok(Entry::Escalate(node)),
                ContainerRoute::PassThrough(_) => return Ok(Entry::PassThrough(node)),
            }
        }
        warn!(node = id, "container routing did not terminate");
        Ok(Entry::Nothing)
    }

    /// Commit `target`, unless pointer mode only allows recording it.
    fn commit_or_defer(&mut self, target: FocusId, origin: FocusOrigin) -> bool {
        if self.pointer_mode && !origin.is_pointer() {
            debug!(node = target, "pointer mode; recorded as resume target");
            self.last_directional = Some(target);
            return false;
        }
        if self.current != Some(target) {
            self.commit(target, origin);
        }
        true
    }

    fn commit(&mut self, target: FocusId, origin: FocusOrigin) {
        let prev = self.current;

        if let Some(prev) = prev {
            self.set_highlight(prev, false);
            if self.tree.contains(prev) {
                self.dispatch(
                    FocusEvent::new(FocusEventKind::Blur, Some(prev), origin)
                        .with_related(Some(target)),
                );
            }
        }
        self.dispatch(FocusEvent::new(FocusEventKind::Focus, Some(target), origin).with_related(prev));

        self.current = Some(target);
        if !origin.is_pointer() {
            self.last_directional = Some(target);
        }
        if !self.is_muted() {
            self.set_highlight(target, true);
        }

        if let Some(prev) = prev
            && self.tree.contains(prev)
        {
            self.notify_containers(FocusEventKind::ContainerLeave, prev, Some(target), origin);
        }
        self.notify_containers(FocusEventKind::ContainerEnter, target, prev, origin);
        self.containers.sync_focus(&self.tree, self.current);

        self.dispatch(FocusEvent::new(FocusEventKind::Focused, Some(target), origin));
        self.emit(
            FocusEvent::new(FocusEventKind::CurrentChanged, Some(target), origin)
                .with_related(prev),
        );

        self.disappear_fallback = self.capture_disappear_target(target);
        self.detach_observation();
        self.deferred
            .schedule(DeferredTask::Observe(target), self.clock);
        debug!(node = target, ?prev, ?origin, "focus committed");
    }

    /// Resolve the disappear target for `id`: its own declaration, else the
    /// nearest container ancestor's.
    fn capture_disappear_target(&mut self, id: FocusId) -> Option<FocusId> {
        let own = self.tree.get(id).and_then(|n| n.disappear_target.clone());
        if let Some(name) = own {
            match self.tree.find_by_name(Some(id), &name) {
                Some(found) => return Some(found),
                None => warn!(node = id, name, "disappear target does not resolve"),
            }
        }
        let containers: SmallVec<[FocusId; 8]> = self
            .tree
            .ancestors(id)
            .filter(|a| self.tree.is_container(*a))
            .collect();
        containers
            .into_iter()
            .find_map(|c| self.containers.capture_disappear_target(&self.tree, c))
    }

    fn detach_observation(&mut self) {
        self.observed.clear();
        self.deferred
            .cancel(|t| matches!(t, DeferredTask::Observe(_)));
    }

    /// Move focus off a node that is gone or no longer spottable.
    fn fall_over(&mut self) {
        let Some(lost) = self.current else {
            return;
        };
        self.frozen = false;

        let fallback = self
            .disappear_fallback
            .filter(|t| *t != lost && self.tree.is_spottable(*t, false))
            .or_else(|| self.root.and_then(|r| self.tree.first_spottable(r)))
            .filter(|t| *t != lost);
        let leaf = match fallback {
            Some(t) => match self.resolve_entry(t, FocusOrigin::Fallback, None) {
                Ok(Entry::Leaf(leaf)) if leaf != lost => Some(leaf),
                Ok(_) => None,
                Err(err) => {
                    warn!(%err, "fallback target unusable");
                    None
                }
            },
            None => None,
        };

        if self.config.verbose {
            info!(lost, ?leaf, "focused node disappeared");
        } else {
            debug!(lost, ?leaf, "focused node disappeared");
        }

        match leaf {
            Some(leaf) => self.commit(leaf, FocusOrigin::Fallback),
            None => {
                self.set_highlight(lost, false);
                if self.tree.contains(lost) {
                    self.dispatch(FocusEvent::new(
                        FocusEventKind::Blur,
                        Some(lost),
                        FocusOrigin::Fallback,
                    ));
                }
                self.current = None;
                self.containers.sync_focus(&self.tree, None);
                self.emit(
                    FocusEvent::new(FocusEventKind::CurrentChanged, None, FocusOrigin::Fallback)
                        .with_related(Some(lost)),
                );
                self.detach_observation();
            }
        }
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Dispatch `event` to its target's decorator, then through the
    /// container filters from the target upward.
    fn dispatch(&mut self, mut event: FocusEvent) -> Propagation {
        let Some(target) = event.target else {
            self.emit(event);
            return Propagation::Continue;
        };

        let mut result = Propagation::Continue;
        if let Some(decorator) = self.decorators.resolve(&self.tree, target) {
            result = self.run_decorator(decorator.as_ref(), target, &event);
        }
        if !result.is_handled() {
            let chain: SmallVec<[FocusId; 8]> = std::iter::once(target)
                .chain(self.tree.ancestors(target))
                .filter(|id| self.tree.is_container(*id))
                .collect();
            for container in chain {
                if self
                    .containers
                    .filter(&self.tree, container, &mut event)
                    .is_handled()
                {
                    result = Propagation::Handled;
                    break;
                }
            }
        }
        self.emit(event);
        result
    }

    /// Emit enter or leave notifications on every container from `start`
    /// upward that the filter does not swallow.
    fn notify_containers(
        &mut self,
        kind: FocusEventKind,
        start: FocusId,
        related: Option<FocusId>,
        origin: FocusOrigin,
    ) {
        let chain: SmallVec<[FocusId; 8]> = std::iter::once(start)
            .chain(self.tree.ancestors(start))
            .filter(|id| self.tree.is_container(*id))
            .collect();
        for container in chain {
            let mut event = FocusEvent::new(kind, Some(container), origin).with_related(related);
            if self
                .containers
                .filter(&self.tree, container, &mut event)
                .is_handled()
            {
                break;
            }
            if let Some(decorator) = self.decorators.resolve(&self.tree, container) {
                self.run_decorator(decorator.as_ref(), container, &event);
            }
            self.emit(event);
        }
    }

    fn run_decorator(
        &mut self,
        decorator: &dyn Decorator,
        node: FocusId,
        event: &FocusEvent,
    ) -> Propagation {
        let mut ctx = HandlerContext::new(&self.tree, self.current, self.pointer_mode, node);
        let result = decorator.dispatch(&mut ctx, event);
        self.pending.extend(ctx.into_requests());
        result
    }

    /// Record an emitted event in the outbox.
    fn emit(&mut self, event: FocusEvent) {
        trace!(kind = event.kind.as_str(), node = ?event.target, "event");
        if event.direction().is_some() {
            self.last_directional_event = Some(event.clone());
        }
        self.last_event = Some(event.clone());
        self.events.push(event);
    }

    fn set_highlight(&mut self, id: FocusId, on: bool) {
        if on {
            if self.highlighted == Some(id) {
                return;
            }
            if let Some(prev) = self.highlighted.replace(id)
                && let Some(sink) = self.highlight_sink.as_mut()
            {
                sink.set_highlight(prev, false);
            }
        } else {
            if self.highlighted != Some(id) {
                return;
            }
            self.highlighted = None;
        }
        if let Some(sink) = self.highlight_sink.as_mut() {
            sink.set_highlight(id, on);
        }
    }

    /// Apply focus changes requested by handlers.
    fn settle(&mut self) -> Result<()> {
        if self.settling {
            return Ok(());
        }
        self.settling = true;
        let mut outcome = Ok(());
        for _ in 0..MAX_SETTLE_ROUNDS {
            if self.pending.is_empty() || outcome.is_err() {
                break;
            }
            for request in std::mem::take(&mut self.pending) {
                let applied = match request {
                    FocusRequest::Spot(id) => self.spot_inner(id, FocusOrigin::Programmatic).map(drop),
                    FocusRequest::Unspot => {
                        self.unspot_inner();
                        Ok(())
                    }
                };
                if let Err(err) = applied {
                    outcome = Err(err);
                    break;
                }
            }
        }
        if !self.pending.is_empty() {
            warn!(dropped = self.pending.len(), "handler focus requests dropped");
            self.pending.clear();
        }
        self.settling = false;
        outcome
    }

    fn settle_logged(&mut self) {
        if let Err(err) = self.settle() {
            warn!(%err, "handler focus request failed");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
