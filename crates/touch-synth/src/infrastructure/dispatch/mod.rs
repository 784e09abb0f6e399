//! Dispatch sink adapters.
//!
//! - [`recording::RecordingSink`] keeps every frame in memory and can be told
//!   to reject chosen frames; used by tests and dry runs.
//! - [`json_lines::JsonLinesSink`] serialises each frame as one JSON line to
//!   any writer; the CLI points it at stdout.

pub mod json_lines;
pub mod recording;

pub use json_lines::JsonLinesSink;
pub use recording::RecordingSink;
