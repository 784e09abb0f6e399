//! In-memory dispatch sink for tests.
//!
//! The `RecordingSink` replaces the host's input pipeline with simple
//! recording.  Each delivered frame is pushed into a `Mutex<Vec<...>>` so
//! assertions can inspect exactly what was delivered and in what order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let sink = Arc::new(RecordingSink::new().reject_on(1));
//! let engine = TouchEngine::new(sink.clone(), Arc::new(InstantScheduler::new()));
//!
//! engine.on_window(SurfaceId(1)).drag(from, to, 5).await.unwrap_err();
//!
//! let frames = sink.frames();
//! assert_eq!(frames.last().unwrap().touches[0].phase, TouchPhase::Cancelled);
//! ```

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use touch_core::{EventFrame, TouchId, TouchPhase};

use crate::application::inject_gesture::{DeliveryOutcome, DispatchSink};

/// A sink that records every frame without contacting a host.
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<EventFrame>>,
    /// Zero-based delivery indices to reject.
    reject_indices: BTreeSet<usize>,
    /// When `true`, every delivery is rejected.
    reject_all: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the `index`-th delivery (counting from zero, across gestures).
    pub fn reject_on(mut self, index: usize) -> Self {
        self.reject_indices.insert(index);
        self
    }

    pub fn reject_all(mut self) -> Self {
        self.reject_all = true;
        self
    }

    /// Every frame delivered so far, accepted or not.
    pub fn frames(&self) -> Vec<EventFrame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The `(phase, x, y)` track of one identifier across all frames.
    pub fn track(&self, id: TouchId) -> Vec<(TouchPhase, f64, f64)> {
        self.frames()
            .iter()
            .filter_map(|f| f.get(id))
            .map(|t| (t.phase, t.location.x, t.location.y))
            .collect()
    }
}

#[async_trait]
impl DispatchSink for RecordingSink {
    async fn deliver(&self, frame: &EventFrame) -> DeliveryOutcome {
        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        let index = frames.len();
        frames.push(frame.clone());

        if self.reject_all || self.reject_indices.contains(&index) {
            DeliveryOutcome::Rejected(format!("delivery {index} rejected by recording sink"))
        } else {
            DeliveryOutcome::Accepted
        }
    }
}
