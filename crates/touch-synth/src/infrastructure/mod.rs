//! Infrastructure layer for the touch engine.
//!
//! Contains the adapters behind the application seams: dispatch sinks,
//! schedulers, configuration storage, diagnostic observers, and the
//! host-behavior override registry.
//!
//! **Dependency rule**: this layer may depend on `application` and `touch_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod diagnostics;
pub mod dispatch;
pub mod host;
pub mod scheduler;
pub mod storage;
