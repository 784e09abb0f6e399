//! Diagnostic frame observers.
//!
//! Both observers are opt-in (see the `[diagnostics]` config section) and
//! never influence delivery: they only see a frame after its outcome is known.

pub mod debug_model;
pub mod touch_log;

pub use debug_model::{DebugModel, DebugRecord};
pub use touch_log::TouchLog;
