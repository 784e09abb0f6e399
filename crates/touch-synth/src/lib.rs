//! touch-synth library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does touch-synth do? (for beginners)
//!
//! Some applications only accept touch-screen input.  touch-synth lets a
//! caller drive such an application with *logical* gesture commands (tap,
//! long-press, drag, pinch, zoom, two-finger pan, rotate) and turns each
//! command into the low-level touch frames the host UI runtime expects.
//!
//! For every command the engine:
//!
//! 1. Compiles the gesture into a timed step plan (`touch_core::compile`).
//! 2. Locks the shared touch slot table for the whole gesture and acquires
//!    one or two touch identifiers.
//! 3. For each step: waits out the step's delay (yielding, never busy
//!    waiting), applies the phase changes, builds one frame, and hands it to
//!    the injected [`DispatchSink`](application::inject_gesture::DispatchSink),
//!    waiting for the host's verdict before producing the next frame.
//! 4. On any failure or external abort, cancels every touch the gesture
//!    still holds so nothing is left "stuck down".

/// Application layer: the gesture driver and the public command surface.
pub mod application;

/// Infrastructure layer: dispatch sinks, schedulers, configuration,
/// diagnostics, and host-behavior overrides.
pub mod infrastructure;
