//! Per-identifier record of the most recent touch state, for debug overlays.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use touch_core::{EventFrame, Point, TouchId, TouchPhase};

use crate::application::inject_gesture::{DeliveryOutcome, FrameObserver};

/// Description given to placeholder records that fill gaps in the index.
pub const GAP_DESCRIPTION: &str = "Error recording debug info: touch id exceeds record array";

/// Position given to placeholder records.
const GAP_POINT: Point = Point::new(100.0, 100.0);

#[derive(Debug, Clone, PartialEq)]
pub struct DebugRecord {
    pub point: Point,
    pub phase: TouchPhase,
    /// `"<gesture>(<surface>)"` for real records.
    pub description: String,
}

/// Last known point, phase and description for every touch identifier,
/// indexed by identifier.
///
/// Recording is a no-op while the model is disabled.
#[derive(Debug, Default)]
pub struct DebugModel {
    enabled: AtomicBool,
    records: Mutex<Vec<DebugRecord>>,
}

impl DebugModel {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Stores `record` at `id`, padding any gap below it with placeholder
    /// `Cancelled` records.
    pub fn record(&self, id: TouchId, record: DebugRecord) {
        if !self.is_enabled() {
            return;
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let index = id.index();
        while records.len() < index {
            records.push(DebugRecord {
                point: GAP_POINT,
                phase: TouchPhase::Cancelled,
                description: GAP_DESCRIPTION.to_string(),
            });
        }
        if records.len() == index {
            records.push(record);
        } else {
            records[index] = record;
        }
    }

    pub fn get(&self, id: TouchId) -> Option<DebugRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.index())
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<DebugRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FrameObserver for DebugModel {
    fn observe(&self, gesture: &str, frame: &EventFrame, _outcome: &DeliveryOutcome) {
        for touch in frame.touches.iter().filter(|t| frame.is_changed(t.id)) {
            self.record(
                touch.id,
                DebugRecord {
                    point: touch.location,
                    phase: touch.phase,
                    description: format!("{gesture}({})", touch.surface),
                },
            );
        }
    }
}
