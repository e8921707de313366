#![forbid(unsafe_code)]

//! Errors raised by the focus engine.
//!
//! Only configuration mistakes are errors. Invalid operations (spotting an
//! unknown node, freezing with nothing focused) return `false` and log a
//! warning; losing the focused node and exhausting a directional search are
//! normal outcomes.

use crate::focus::FocusId;

/// Configuration error detected at the point of use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusError {
    /// A declared target name (default control, directional or select
    /// override) does not resolve to any node.
    UnknownTarget { scope: FocusId, name: String },
}

impl std::fmt::Display for FocusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTarget { scope, name } => {
                write!(f, "no node named '{name}' reachable from node {scope}")
            }
        }
    }
}

impl std::error::Error for FocusError {}

/// Result alias for fallible focus operations.
pub type Result<T> = std::result::Result<T, FocusError>;
