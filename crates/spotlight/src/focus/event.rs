#![forbid(unsafe_code)]

//! Lifecycle event records emitted by the focus manager.

use super::tree::{Direction, FocusId};

/// What caused a focus change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusOrigin {
    /// Direct call to `spot` from application code.
    Programmatic,
    /// Pointer movement or click.
    Pointer,
    /// A directional key.
    Directional(Direction),
    /// The select key entering a node's children or override.
    Select,
    /// Recovery after the focused node became unspottable.
    Fallback,
}

impl FocusOrigin {
    /// Direction carried by the origin, if any.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Directional(dir) => Some(dir),
            _ => None,
        }
    }

    /// Whether the change came from the pointer.
    #[must_use]
    pub const fn is_pointer(self) -> bool {
        matches!(self, Self::Pointer)
    }
}

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusEventKind {
    /// About to receive focus.
    Focus,
    /// Received focus; emitted after the commit.
    Focused,
    /// Lost focus. `related` is the node expected to receive focus next.
    Blur,
    /// Select key on the focused node.
    Select,
    /// Select key on a leaf: synthetic activation.
    Activate,
    /// Directional key routed to a node.
    Direction(Direction),
    /// Pointer moved over a node.
    Point,
    /// Focus entered a container. `related` is the previously focused node.
    ContainerEnter,
    /// Focus left a container. `related` is the node receiving focus.
    ContainerLeave,
    /// Interaction mode changed.
    ModeChanged { pointer_mode: bool },
    /// The current node changed. `related` is the previous current node.
    CurrentChanged,
}

impl FocusEventKind {
    /// Stable event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Focused => "focused",
            Self::Blur => "blur",
            Self::Select => "select",
            Self::Activate => "activate",
            Self::Direction(dir) => dir.as_str(),
            Self::Point => "point",
            Self::ContainerEnter => "containerEnter",
            Self::ContainerLeave => "containerLeave",
            Self::ModeChanged { .. } => "modeChanged",
            Self::CurrentChanged => "currentChanged",
        }
    }
}

/// A dispatched lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusEvent {
    pub kind: FocusEventKind,
    /// Node the event was dispatched on.
    pub target: Option<FocusId>,
    /// Counterpart node; meaning depends on [`FocusEventKind`].
    pub related: Option<FocusId>,
    pub origin: FocusOrigin,
    /// Set when a container re-issued a directional event for a descendant.
    pub from_container: bool,
}

impl FocusEvent {
    /// Create an event on `target`.
    #[must_use]
    pub fn new(kind: FocusEventKind, target: Option<FocusId>, origin: FocusOrigin) -> Self {
        Self {
            kind,
            target,
            related: None,
            origin,
            from_container: false,
        }
    }

    /// Builder: set the related node.
    #[must_use]
    pub fn with_related(mut self, related: Option<FocusId>) -> Self {
        self.related = related;
        self
    }

    /// Builder: mark as re-issued by a container.
    #[must_use]
    pub fn from_container(mut self) -> Self {
        self.from_container = true;
        self
    }

    /// Direction carried by a directional event.
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        match self.kind {
            FocusEventKind::Direction(dir) => Some(dir),
            _ => None,
        }
    }
}
