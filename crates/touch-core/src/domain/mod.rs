//! Domain entities for synthetic touch input.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: nothing here sleeps, spawns, or performs I/O.  Everything
//! can be compiled and tested on any platform without a host UI runtime.
//!
//! The dependency order between sub-modules is strictly leaves-first:
//!
//! ```text
//! geometry ─┬─> slot ──> frame
//! phase ────┘            ^
//! sequence ──────────────┘
//! geometry ──> gesture
//! ```

pub mod frame;
pub mod geometry;
pub mod gesture;
pub mod phase;
pub mod sequence;
pub mod slot;
