#![forbid(unsafe_code)]

//! Per-kind focus handlers ("decorators") and the highlight sink.
//!
//! A decorator customizes how one kind of node reacts to lifecycle events.
//! Nodes are matched to decorators by their [`FocusNode::kind`] tag; every
//! container resolves to the single handler registered under
//! [`CONTAINER_KIND`] instead. Resolution is cached per node.
//!
//! Handlers may not change focus directly. They queue requests on the
//! [`HandlerContext`], which the manager applies once the current event has
//! been fully dispatched.
//!
//! [`FocusNode::kind`]: super::tree::FocusNode::kind

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::event::{FocusEvent, FocusEventKind};
use super::tree::{FocusId, FocusTree};

/// Reserved tag under which the shared container handler is registered.
pub const CONTAINER_KIND: &str = "container";

/// Result of one step of event propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Let the event continue (and the engine run its default behavior).
    #[default]
    Continue,
    /// Stop propagation and suppress the engine default.
    Handled,
}

impl Propagation {
    /// Whether propagation stopped.
    #[inline]
    #[must_use]
    pub const fn is_handled(self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// A focus change requested by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequest {
    Spot(FocusId),
    Unspot,
}

/// Read-only view of engine state passed to handlers.
#[derive(Debug)]
pub struct HandlerContext<'a> {
    pub tree: &'a FocusTree,
    pub current: Option<FocusId>,
    pub pointer_mode: bool,
    /// Node whose handler is running.
    pub node: FocusId,
    requests: Vec<FocusRequest>,
}

impl<'a> HandlerContext<'a> {
    /// Create a context for `node`.
    #[must_use]
    pub fn new(
        tree: &'a FocusTree,
        current: Option<FocusId>,
        pointer_mode: bool,
        node: FocusId,
    ) -> Self {
        Self {
            tree,
            current,
            pointer_mode,
            node,
            requests: Vec::new(),
        }
    }

    /// Ask the manager to focus `id` after dispatch completes.
    pub fn request_spot(&mut self, id: FocusId) {
        self.requests.push(FocusRequest::Spot(id));
    }

    /// Ask the manager to blur the current node after dispatch completes.
    pub fn request_unspot(&mut self) {
        self.requests.push(FocusRequest::Unspot);
    }

    /// Requests queued so far.
    #[must_use]
    pub fn into_requests(self) -> Vec<FocusRequest> {
        self.requests
    }
}

/// Behavioral overrides for one kind of node.
///
/// Every hook defaults to [`Propagation::Continue`].
#[allow(unused_variables)]
pub trait Decorator {
    fn focus(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        Propagation::Continue
    }

    fn focused(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        Propagation::Continue
    }

    fn blur(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        Propagation::Continue
    }

    fn select(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        Propagation::Continue
    }

    /// Up/down/left/right; the direction is on the event.
    fn direction(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        Propagation::Continue
    }

    fn point(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        Propagation::Continue
    }

    fn container_enter(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        Propagation::Continue
    }

    fn container_leave(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        Propagation::Continue
    }

    /// Route `event` to the hook named for its kind.
    fn dispatch(&self, ctx: &mut HandlerContext<'_>, event: &FocusEvent) -> Propagation {
        match event.kind {
            FocusEventKind::Focus => self.focus(ctx, event),
            FocusEventKind::Focused => self.focused(ctx, event),
            FocusEventKind::Blur => self.blur(ctx, event),
            FocusEventKind::Select => self.select(ctx, event),
            FocusEventKind::Direction(_) => self.direction(ctx, event),
            FocusEventKind::Point => self.point(ctx, event),
            FocusEventKind::ContainerEnter => self.container_enter(ctx, event),
            FocusEventKind::ContainerLeave => self.container_leave(ctx, event),
            FocusEventKind::Activate
            | FocusEventKind::ModeChanged { .. }
            | FocusEventKind::CurrentChanged => Propagation::Continue,
        }
    }
}

/// Receives highlight on/off calls for nodes.
pub trait HighlightSink {
    fn set_highlight(&mut self, id: FocusId, on: bool);
}

impl<F: FnMut(FocusId, bool)> HighlightSink for F {
    fn set_highlight(&mut self, id: FocusId, on: bool) {
        self(id, on);
    }
}

/// Registry mapping kind tags to decorators.
#[derive(Default)]
pub struct DecoratorRegistry {
    by_kind: HashMap<String, Rc<dyn Decorator>>,
    container: Option<Rc<dyn Decorator>>,
    resolved: HashMap<FocusId, Option<Rc<dyn Decorator>>>,
}

impl fmt::Debug for DecoratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.by_kind.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("DecoratorRegistry")
            .field("kinds", &kinds)
            .field("container", &self.container.is_some())
            .field("cached", &self.resolved.len())
            .finish()
    }
}

impl DecoratorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `decorator` for nodes tagged `kind`.
    ///
    /// Registering under [`CONTAINER_KIND`] sets the container handler.
    pub fn register(&mut self, kind: impl Into<String>, decorator: Rc<dyn Decorator>) {
        let kind = kind.into();
        if kind == CONTAINER_KIND {
            self.container = Some(decorator);
        } else {
            self.by_kind.insert(kind, decorator);
        }
        self.resolved.clear();
    }

    /// Register the shared container handler.
    pub fn register_container(&mut self, decorator: Rc<dyn Decorator>) {
        self.register(CONTAINER_KIND, decorator);
    }

    /// Decorator for `id`, resolved once and cached.
    pub fn resolve(&mut self, tree: &FocusTree, id: FocusId) -> Option<Rc<dyn Decorator>> {
        if let Some(cached) = self.resolved.get(&id) {
            return cached.clone();
        }
        let node = tree.get(id)?;
        let found = if node.is_container() {
            self.container.clone()
        } else {
            node.kind
                .as_deref()
                .and_then(|kind| self.by_kind.get(kind))
                .cloned()
        };
        self.resolved.insert(id, found.clone());
        found
    }

    /// Drop cached resolutions for `ids` (removed or re-tagged nodes).
    pub fn forget(&mut self, ids: &[FocusId]) {
        for id in ids {
            self.resolved.remove(id);
        }
    }

    /// Whether any decorator is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty() && self.container.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::event::FocusOrigin;
    use crate::focus::tree::FocusNode;
    use spotlight_core::geometry::Rect;
    use std::cell::Cell;

    struct Counting {
        selects: Cell<u32>,
    }

    impl Decorator for Counting {
        fn select(&self, ctx: &mut HandlerContext<'_>, _event: &FocusEvent) -> Propagation {
            self.selects.set(self.selects.get() + 1);
            ctx.request_spot(ctx.node);
            Propagation::Handled
        }
    }

    struct Passive;
    impl Decorator for Passive {}

    fn tree() -> FocusTree {
        let mut t = FocusTree::new();
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        t.insert(None, FocusNode::plain(1, r));
        t.insert(Some(1), FocusNode::new(2, r).with_kind("button"));
        t.insert(Some(1), FocusNode::container(3, r).with_kind("button"));
        t.insert(Some(1), FocusNode::new(4, r));
        t
    }

    #[test]
    fn resolves_by_kind_and_container() {
        let t = tree();
        let mut reg = DecoratorRegistry::new();
        assert!(reg.is_empty());
        reg.register("button", Rc::new(Passive));
        assert!(reg.resolve(&t, 2).is_some());
        // Containers ignore their kind tag.
        assert!(reg.resolve(&t, 3).is_none());
        assert!(reg.resolve(&t, 4).is_none());
        assert!(reg.resolve(&t, 99).is_none());

        reg.register_container(Rc::new(Passive));
        assert!(reg.resolve(&t, 3).is_some());
    }

    #[test]
    fn cache_is_invalidated_on_forget() {
        let mut t = tree();
        let mut reg = DecoratorRegistry::new();
        reg.register("button", Rc::new(Passive));
        assert!(reg.resolve(&t, 4).is_none());
        if let Some(node) = t.get_mut(4) {
            node.kind = Some("button".into());
        }
        assert!(reg.resolve(&t, 4).is_none());
        reg.forget(&[4]);
        assert!(reg.resolve(&t, 4).is_some());
    }

    #[test]
    fn dispatch_routes_by_kind_and_collects_requests() {
        let t = tree();
        let deco = Counting {
            selects: Cell::new(0),
        };
        let mut ctx = HandlerContext::new(&t, Some(2), false, 2);

        let select = FocusEvent::new(FocusEventKind::Select, Some(2), FocusOrigin::Programmatic);
        assert_eq!(deco.dispatch(&mut ctx, &select), Propagation::Handled);
        let blur = FocusEvent::new(FocusEventKind::Blur, Some(2), FocusOrigin::Programmatic);
        assert_eq!(deco.dispatch(&mut ctx, &blur), Propagation::Continue);

        assert_eq!(deco.selects.get(), 1);
        assert_eq!(ctx.into_requests(), vec![FocusRequest::Spot(2)]);
    }

    #[test]
    fn closure_highlight_sink() {
        let mut log = Vec::new();
        {
            let mut sink = |id: FocusId, on: bool| log.push((id, on));
            sink.set_highlight(1, true);
            sink.set_highlight(1, false);
        }
        assert_eq!(log, vec![(1, true), (1, false)]);
    }
}
