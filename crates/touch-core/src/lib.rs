//! # touch-core
//!
//! Pure domain library for synthetic multi-touch input.  It owns every rule
//! about *which* touch frames may be produced; the `touch-synth` crate owns
//! *when* and *where* they are delivered.
//!
//! It has zero dependencies on async runtimes, OS APIs, or UI frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! A host UI runtime that only understands touch-screen input recognises
//! gestures (taps, drags, pinches) by pattern-matching on a stream of
//! *frames*.  Each frame is a snapshot of every finger currently touching the
//! surface, and each finger carries a *phase* (began, moved, stationary,
//! ended, cancelled).  To fake a gesture convincingly the frames must be
//! physically plausible: a finger begins before it moves, it is reported in
//! every frame while it is down, and it disappears right after it lifts.
//!
//! This crate defines:
//!
//! - **`domain::geometry`** – points, displacements, and the injected
//!   coordinate-space seam.
//! - **`domain::phase`** – the phase state machine (legal transitions).
//! - **`domain::slot`** – the bounded touch slot table that hands out small
//!   integer identifiers.
//! - **`domain::frame`** – event frames and the builder that snapshots the
//!   slot table.
//! - **`domain::gesture`** – logical gestures and the compiler that expands
//!   them into an ordered, timed step plan.
//! - **`domain::sequence`** – lock-free frame sequence numbering.

pub mod domain;

pub use domain::frame::{EventFrame, FrameBuilder, TouchSnapshot};
pub use domain::geometry::{CoordinateSpace, Displacement, IdentitySpace, Point, SurfaceId};
pub use domain::gesture::{
    compile, CompileOptions, FingerChange, GesturePlan, GestureSpec, PlanStep, DEFAULT_MAX_STEPS,
};
pub use domain::phase::TouchPhase;
pub use domain::slot::{SlotTable, TouchError, TouchId, TouchSlot, DEFAULT_MAX_TOUCHES};
