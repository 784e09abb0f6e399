//! Lock-free frame sequence numbering.
//!
//! Every frame handed to a dispatch sink carries a sequence number, so a
//! rejected frame can be named in the error and diagnostics can line frames
//! up across gestures.
//!
//! The counter uses `AtomicU64` so that several engines sharing one
//! [`FrameBuilder`](super::frame::FrameBuilder) never hand out the same
//! number twice.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing frame counter.
///
/// Starts at 0 and wraps from `u64::MAX` back to 0 without panicking.
///
/// # Examples
///
/// ```rust
/// use touch_core::domain::sequence::FrameCounter;
///
/// let counter = FrameCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug, Default)]
pub struct FrameCounter {
    inner: AtomicU64,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Returns the next sequence number and advances the counter.
    ///
    /// `Relaxed` is enough: the number only orders frames, it does not
    /// publish any other memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// The number the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}
