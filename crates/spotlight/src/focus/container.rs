#![forbid(unsafe_code)]

//! Container focus memory.
//!
//! A container looks like one focusable unit from the outside. When focus
//! is routed to it, it hands focus to a descendant: the child it last held
//! focus on, or the child nearest to where navigation came from, or its
//! initial child. Records are created lazily the first time a container is
//! involved in focus routing and dropped when the container is removed.
//!
//! Containers also act as event filters for everything bubbling up from
//! their descendants (see [`ContainerMemory::filter`]).
//!
//! # Invariants
//!
//! 1. `last_focused_child` is always a strict descendant of its container
//!    when set; stale values are ignored, never returned.
//! 2. A container is never returned as the target of its own route.
//! 3. An unresolvable default-control name is an error, not a fallback.
//! 4. After every focus change, `had_focus_from_within` is set only on
//!    containers that hold the focused node, however focus left the others
//!    (navigation, removal, fall-over, unspot).

use std::collections::HashMap;

use spotlight_core::geometry::Rect;
use tracing::{debug, trace, warn};

use super::decorator::Propagation;
use super::event::{FocusEvent, FocusEventKind, FocusOrigin};
use super::spatial;
use super::tree::{Direction, FocusId, FocusTree};
use crate::error::{FocusError, Result};

/// Per-container focus state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Descendant that held focus most recently.
    pub last_focused_child: Option<FocusId>,
    /// Focus is currently somewhere inside the container.
    pub had_focus_from_within: bool,
    /// Resolved disappear target declared on the container.
    pub default_disappear_target: Option<FocusId>,
}

/// Where focus routed to a container should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRoute {
    /// Focus this descendant (which may itself be a container).
    Enter(FocusId),
    /// Focus was already inside; re-issue the move one level up.
    Escalate(Direction),
    /// Nothing inside can take focus; keep moving past the container.
    PassThrough(Direction),
    /// Nothing inside can take focus and there is no direction to continue.
    Empty,
}

/// Records for every container seen so far.
#[derive(Debug, Default)]
pub struct ContainerMemory {
    records: HashMap<FocusId, ContainerRecord>,
}

impl ContainerMemory {
    /// Create empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `container`, if one was created.
    #[must_use]
    pub fn record(&self, container: FocusId) -> Option<&ContainerRecord> {
        self.records.get(&container)
    }

    /// Last focused child of `container`.
    #[must_use]
    pub fn last_focused_child(&self, container: FocusId) -> Option<FocusId> {
        self.records
            .get(&container)
            .and_then(|r| r.last_focused_child)
    }

    /// Whether focus is currently inside `container`.
    #[must_use]
    pub fn had_focus_from_within(&self, container: FocusId) -> bool {
        self.records
            .get(&container)
            .is_some_and(|r| r.had_focus_from_within)
    }

    /// Number of containers with a record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Overwrite the remembered child of `container`.
    pub fn set_last_focused_child(&mut self, container: FocusId, child: Option<FocusId>) {
        self.records.entry(container).or_default().last_focused_child = child;
    }

    /// Drop records of removed containers and any reference to removed nodes.
    pub fn forget(&mut self, removed: &[FocusId]) {
        for id in removed {
            self.records.remove(id);
        }
        for record in self.records.values_mut() {
            if record
                .last_focused_child
                .is_some_and(|c| removed.contains(&c))
            {
                record.last_focused_child = None;
            }
            if record
                .default_disappear_target
                .is_some_and(|c| removed.contains(&c))
            {
                record.default_disappear_target = None;
            }
        }
    }

    /// Clear the "focus is inside" flag on every container that does not
    /// hold `current`.
    ///
    /// Leave notifications clear the flag on ordinary moves, but focus can
    /// also vanish with no leave at all (the focused node was removed, or
    /// fell over to nothing).
    pub fn sync_focus(&mut self, tree: &FocusTree, current: Option<FocusId>) {
        for (&container, record) in &mut self.records {
            if record.had_focus_from_within
                && !current.is_some_and(|c| c != container && tree.is_within(c, container))
            {
                trace!(container, "focus no longer inside container");
                record.had_focus_from_within = false;
            }
        }
    }

    /// Child focused when entering `container` without usable memory: the
    /// default control when one is declared, else the first spottable child.
    pub fn initial_child(&self, tree: &FocusTree, container: FocusId) -> Result<Option<FocusId>> {
        let Some(node) = tree.get(container) else {
            return Ok(None);
        };
        if let Some(name) = node.default_control.as_deref() {
            let Some(id) = tree.find_by_name(Some(container), name) else {
                return Err(FocusError::UnknownTarget {
                    scope: container,
                    name: name.to_owned(),
                });
            };
            if id != container && tree.is_spottable(id, false) {
                return Ok(Some(id));
            }
        }
        Ok(tree.spottable_children(container).first().copied())
    }

    /// Decide where focus routed to `container` goes.
    ///
    /// `from` is the bounds of the node navigation started at, used by
    /// containers that do not remember focus.
    pub fn on_focused(
        &mut self,
        tree: &FocusTree,
        container: FocusId,
        origin: FocusOrigin,
        from: Option<Rect>,
    ) -> Result<ContainerRoute> {
        let Some(node) = tree.get(container) else {
            return Ok(ContainerRoute::Empty);
        };
        let remember = node.remember_focus;
        let dir = origin.direction();

        let record = self.records.entry(container).or_default();
        if let Some(dir) = dir
            && record.had_focus_from_within
        {
            trace!(container, direction = dir.as_str(), "container escalates move");
            return Ok(ContainerRoute::Escalate(dir));
        }
        if dir.is_none() {
            record.had_focus_from_within = false;
        }

        let remembered = record
            .last_focused_child
            .filter(|c| *c != container && tree.is_within(*c, container))
            .filter(|c| tree.is_spottable(*c, false));

        let nearest = match (remember, dir, from) {
            (false, Some(dir), Some(from)) => spatial::select_neighbor(
                dir,
                from,
                tree.spottable_children(container)
                    .into_iter()
                    .filter_map(|c| tree.bounds(c).map(|b| (c, b))),
                None,
            ),
            _ => None,
        };

        let target = match nearest.or(if remember { remembered } else { None }) {
            Some(t) => Some(t),
            None => self.initial_child(tree, container)?,
        };

        let route = match (target, dir) {
            (Some(t), _) => ContainerRoute::Enter(t),
            (None, Some(dir)) => ContainerRoute::PassThrough(dir),
            (None, None) => ContainerRoute::Empty,
        };
        debug!(container, ?route, "container routed focus");
        Ok(route)
    }

    /// Filter an event bubbling through `container` from a descendant.
    ///
    /// Focus events update the remembered child. Directional events are
    /// tagged as container-originated. Enter and leave notifications whose
    /// counterpart node already lies inside the container are redundant and
    /// swallowed.
    pub fn filter(
        &mut self,
        tree: &FocusTree,
        container: FocusId,
        event: &mut FocusEvent,
    ) -> Propagation {
        match event.kind {
            FocusEventKind::Focus => {
                if let Some(target) = event.target
                    && target != container
                    && tree.is_within(target, container)
                {
                    let record = self.records.entry(container).or_default();
                    record.last_focused_child = Some(target);
                    record.had_focus_from_within = true;
                }
                Propagation::Continue
            }
            FocusEventKind::Direction(_) => {
                if event.target != Some(container) {
                    event.from_container = true;
                }
                Propagation::Continue
            }
            FocusEventKind::ContainerEnter => {
                if event
                    .related
                    .is_some_and(|prev| tree.is_within(prev, container))
                {
                    Propagation::Handled
                } else {
                    Propagation::Continue
                }
            }
            FocusEventKind::ContainerLeave => {
                if event
                    .related
                    .is_some_and(|next| tree.is_within(next, container))
                {
                    Propagation::Handled
                } else {
                    if let Some(record) = self.records.get_mut(&container) {
                        record.had_focus_from_within = false;
                    }
                    Propagation::Continue
                }
            }
            _ => Propagation::Continue,
        }
    }

    /// Resolve and remember the disappear target declared on `container`.
    ///
    /// Unresolvable names are logged and yield `None`.
    pub fn capture_disappear_target(
        &mut self,
        tree: &FocusTree,
        container: FocusId,
    ) -> Option<FocusId> {
        let name = tree.get(container)?.disappear_target.as_deref()?;
        let resolved = tree.find_by_name(Some(container), name);
        if resolved.is_none() {
            warn!(container, name, "disappear target does not resolve");
        }
        let record = self.records.entry(container).or_default();
        if resolved.is_some() {
            record.default_disappear_target = resolved;
        }
        record.default_disappear_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::tree::FocusNode;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, w, h)
    }

    /// Root 1 holding a leaf 2 on the left and container 10 on the right
    /// with children 11, 12, 13 stacked vertically.
    fn layout() -> FocusTree {
        let mut t = FocusTree::new();
        t.insert(None, FocusNode::plain(1, rect(0.0, 0.0, 400.0, 400.0)));
        t.insert(Some(1), FocusNode::new(2, rect(0.0, 0.0, 100.0, 50.0)));
        t.insert(
            Some(1),
            FocusNode::container(10, rect(200.0, 0.0, 100.0, 300.0)),
        );
        for (i, id) in [11, 12, 13].into_iter().enumerate() {
            let y = i as f64 * 100.0;
            t.insert(
                Some(10),
                FocusNode::new(id, rect(200.0, y, 100.0, 50.0)).with_name(format!("c{id}")),
            );
        }
        t
    }

    #[test]
    fn first_entry_uses_first_child() {
        let t = layout();
        let mut mem = ContainerMemory::new();
        let route = mem
            .on_focused(&t, 10, FocusOrigin::Directional(Direction::Right), None)
            .unwrap();
        assert_eq!(route, ContainerRoute::Enter(11));
    }

    #[test]
    fn default_control_wins_on_first_entry() {
        let mut t = layout();
        t.get_mut(10).unwrap().default_control = Some("c12".into());
        let mut mem = ContainerMemory::new();
        let route = mem
            .on_focused(&t, 10, FocusOrigin::Programmatic, None)
            .unwrap();
        assert_eq!(route, ContainerRoute::Enter(12));
    }

    #[test]
    fn unknown_default_control_is_an_error() {
        let mut t = layout();
        t.get_mut(10).unwrap().default_control = Some("missing".into());
        let mut mem = ContainerMemory::new();
        let err = mem
            .on_focused(&t, 10, FocusOrigin::Programmatic, None)
            .unwrap_err();
        assert_eq!(
            err,
            FocusError::UnknownTarget {
                scope: 10,
                name: "missing".into()
            }
        );
    }

    #[test]
    fn focus_event_from_descendant_is_remembered() {
        let t = layout();
        let mut mem = ContainerMemory::new();
        let mut ev = FocusEvent::new(FocusEventKind::Focus, Some(13), FocusOrigin::Programmatic);
        assert_eq!(mem.filter(&t, 10, &mut ev), Propagation::Continue);
        assert_eq!(mem.last_focused_child(10), Some(13));
        assert!(mem.had_focus_from_within(10));

        // Leaving to an outside node clears the flag but keeps memory.
        let mut leave = FocusEvent::new(
            FocusEventKind::ContainerLeave,
            Some(10),
            FocusOrigin::Programmatic,
        )
        .with_related(Some(2));
        assert_eq!(mem.filter(&t, 10, &mut leave), Propagation::Continue);
        assert!(!mem.had_focus_from_within(10));

        let route = mem
            .on_focused(&t, 10, FocusOrigin::Directional(Direction::Right), None)
            .unwrap();
        assert_eq!(route, ContainerRoute::Enter(13));
    }

    #[test]
    fn sync_clears_containers_that_lost_focus() {
        let t = layout();
        let mut mem = ContainerMemory::new();
        let mut ev = FocusEvent::new(FocusEventKind::Focus, Some(12), FocusOrigin::Programmatic);
        mem.filter(&t, 10, &mut ev);

        mem.sync_focus(&t, Some(13));
        assert!(mem.had_focus_from_within(10));

        // Focus went elsewhere without a leave notification.
        mem.sync_focus(&t, Some(2));
        assert!(!mem.had_focus_from_within(10));
        assert_eq!(mem.last_focused_child(10), Some(12));
        assert_eq!(
            mem.on_focused(&t, 10, FocusOrigin::Directional(Direction::Right), None)
                .unwrap(),
            ContainerRoute::Enter(12)
        );

        mem.filter(&t, 10, &mut ev);
        mem.sync_focus(&t, None);
        assert!(!mem.had_focus_from_within(10));
    }

    #[test]
    fn stale_memory_falls_back_to_initial_child() {
        let mut t = layout();
        let mut mem = ContainerMemory::new();
        mem.set_last_focused_child(10, Some(13));
        t.get_mut(13).unwrap().enabled = false;
        let route = mem
            .on_focused(&t, 10, FocusOrigin::Programmatic, None)
            .unwrap();
        assert_eq!(route, ContainerRoute::Enter(11));
    }

    #[test]
    fn directional_move_from_within_escalates() {
        let t = layout();
        let mut mem = ContainerMemory::new();
        let mut ev = FocusEvent::new(FocusEventKind::Focus, Some(12), FocusOrigin::Programmatic);
        mem.filter(&t, 10, &mut ev);
        let route = mem
            .on_focused(&t, 10, FocusOrigin::Directional(Direction::Left), None)
            .unwrap();
        assert_eq!(route, ContainerRoute::Escalate(Direction::Left));

        // A programmatic request resets the flag and enters normally.
        let route = mem
            .on_focused(&t, 10, FocusOrigin::Programmatic, None)
            .unwrap();
        assert_eq!(route, ContainerRoute::Enter(12));
    }

    #[test]
    fn non_remembering_container_picks_nearest_child() {
        let mut t = layout();
        t.get_mut(10).unwrap().remember_focus = false;
        let mut mem = ContainerMemory::new();
        mem.set_last_focused_child(10, Some(11));
        // Coming from a node level with child 13.
        let from = rect(0.0, 200.0, 100.0, 50.0);
        let route = mem
            .on_focused(
                &t,
                10,
                FocusOrigin::Directional(Direction::Right),
                Some(from),
            )
            .unwrap();
        assert_eq!(route, ContainerRoute::Enter(13));
    }

    #[test]
    fn empty_container_passes_through() {
        let mut t = layout();
        for id in [11, 12, 13] {
            t.get_mut(id).unwrap().visible = false;
        }
        let mut mem = ContainerMemory::new();
        assert_eq!(
            mem.on_focused(&t, 10, FocusOrigin::Directional(Direction::Down), None)
                .unwrap(),
            ContainerRoute::PassThrough(Direction::Down)
        );
        assert_eq!(
            mem.on_focused(&t, 10, FocusOrigin::Programmatic, None)
                .unwrap(),
            ContainerRoute::Empty
        );
    }

    #[test]
    fn redundant_enter_and_leave_are_swallowed() {
        let t = layout();
        let mut mem = ContainerMemory::new();
        let mut enter = FocusEvent::new(
            FocusEventKind::ContainerEnter,
            Some(12),
            FocusOrigin::Programmatic,
        )
        .with_related(Some(11));
        assert_eq!(mem.filter(&t, 10, &mut enter), Propagation::Handled);

        let mut enter_from_outside = enter.clone().with_related(Some(2));
        assert_eq!(
            mem.filter(&t, 10, &mut enter_from_outside),
            Propagation::Continue
        );

        let mut leave = FocusEvent::new(
            FocusEventKind::ContainerLeave,
            Some(11),
            FocusOrigin::Programmatic,
        )
        .with_related(Some(12));
        assert_eq!(mem.filter(&t, 10, &mut leave), Propagation::Handled);
    }

    #[test]
    fn direction_events_are_tagged() {
        let t = layout();
        let mut mem = ContainerMemory::new();
        let mut ev = FocusEvent::new(
            FocusEventKind::Direction(Direction::Up),
            Some(11),
            FocusOrigin::Directional(Direction::Up),
        );
        mem.filter(&t, 10, &mut ev);
        assert!(ev.from_container);
    }

    #[test]
    fn forget_drops_records_and_references() {
        let mut mem = ContainerMemory::new();
        mem.set_last_focused_child(10, Some(12));
        mem.forget(&[12]);
        assert_eq!(mem.last_focused_child(10), None);
        mem.forget(&[10]);
        assert!(mem.record(10).is_none());
        assert!(mem.is_empty());
    }

    #[test]
    fn disappear_target_capture() {
        let mut t = layout();
        t.get_mut(10).unwrap().disappear_target = Some("c13".into());
        let mut mem = ContainerMemory::new();
        assert_eq!(mem.capture_disappear_target(&t, 10), Some(13));
        assert_eq!(
            mem.record(10).and_then(|r| r.default_disappear_target),
            Some(13)
        );

        t.get_mut(10).unwrap().disappear_target = Some("nope".into());
        // Keeps the previously captured target.
        assert_eq!(mem.capture_disappear_target(&t, 10), Some(13));
        assert_eq!(mem.capture_disappear_target(&t, 2), None);
    }
}
