#![forbid(unsafe_code)]

//! Spotlight: directional focus navigation for remote-control and keyboard
//! driven interfaces.
//!
//! # Primary responsibilities
//! - **FocusManager**: the state machine owning the current node, pointer
//!   versus directional mode, freeze and mute overlays.
//! - **Spatial search**: picks the best neighbor in a direction using the
//!   half-plane, angle, and distance scoring.
//! - **Container memory**: containers forward focus to the child they last
//!   held, or to the nearest or default child.
//! - **Accelerator**: throttles auto-repeated direction keys.
//!
//! # How it fits together
//! The host mirrors its visual tree into a [`focus::FocusTree`], feeds
//! normalized [`spotlight_core::event::Event`]s to
//! [`FocusManager::handle_event`], calls [`FocusManager::tick`] at a point
//! of its choosing to run deferred work, and renders highlights through a
//! [`focus::HighlightSink`].

pub mod config;
pub mod error;
pub mod focus;

pub use config::FocusConfig;
pub use error::{FocusError, Result};
pub use focus::{Direction, FocusEvent, FocusEventKind, FocusId, FocusManager, FocusNode, FocusTree};
