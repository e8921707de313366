#![forbid(unsafe_code)]

//! Core: geometry and raw input events for directional focus navigation.
//!
//! # Role in spotlight
//! `spotlight-core` is the input layer. It owns the shared coordinate types
//! ([`geometry::Rect`], [`geometry::Point`]) and the normalized input events
//! ([`event::Event`]) that the focus engine in the `spotlight` crate consumes.
//!
//! The engine never computes layout. Hosts translate their own key, pointer,
//! and bounds information into these types and feed them in.

pub mod event;
pub mod geometry;
