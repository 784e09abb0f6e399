//! Application layer use cases for touch synthesis.
//!
//! - **`inject_gesture`** – Executes a compiled gesture plan against a slot
//!   table: the step loop, delivery to the dispatch sink, and forced
//!   cancellation on failure.  Also defines the seams the infrastructure
//!   layer implements (`DispatchSink`, `Scheduler`, `FrameObserver`).
//!
//! - **`engine`** – The public command surface (`tap`, `drag`, `pinch`, …).
//!   Owns the shared slot table and serialises gestures against it.

pub mod engine;
pub mod inject_gesture;
