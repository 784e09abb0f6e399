//! Event frames and the builder that snapshots the slot table.
//!
//! A frame is one atomic snapshot of every touch that is down at a single
//! instant, plus the touches whose phase changed to produce it.  Frames are
//! what the dispatch sink delivers to the host.
//!
//! # Frame rules
//!
//! - Snapshots are ordered by ascending identifier.
//! - No identifier appears twice.
//! - A touch in a terminal phase (`Ended` / `Cancelled`) is only included
//!   when it is one of the frame's changed touches.  Since the driver
//!   releases such a slot right after the frame is built, its terminal phase
//!   is observed exactly once.
//! - Slots that are acquired but have not begun yet are omitted.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::geometry::{CoordinateSpace, Point, SurfaceId};
use super::phase::TouchPhase;
use super::sequence::FrameCounter;
use super::slot::{SlotTable, TouchError, TouchId, TouchSlot};

/// The state of one touch as reported in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchSnapshot {
    pub id: TouchId,
    pub phase: TouchPhase,
    /// Position in the target surface's coordinate space.
    pub location: Point,
    /// Position in the dispatch sink's coordinate space.
    pub sink_location: Point,
    pub surface: SurfaceId,
    /// Microseconds between the builder's creation and the touch's last update.
    pub timestamp_us: u64,
}

/// All touches active at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Monotonically increasing per-builder sequence number.
    pub sequence: u64,
    /// Identifiers whose phase changed to produce this frame, ascending.
    pub changed: Vec<TouchId>,
    /// Snapshots of every touch in the frame, ascending by identifier.
    pub touches: Vec<TouchSnapshot>,
}

impl EventFrame {
    pub fn get(&self, id: TouchId) -> Option<&TouchSnapshot> {
        self.touches.iter().find(|t| t.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = TouchId> + '_ {
        self.touches.iter().map(|t| t.id)
    }

    pub fn is_changed(&self, id: TouchId) -> bool {
        self.changed.contains(&id)
    }

    /// Identifiers reported in a terminal phase; they must not appear in a
    /// later frame until reacquired.
    pub fn terminal_ids(&self) -> impl Iterator<Item = TouchId> + '_ {
        self.touches
            .iter()
            .filter(|t| t.phase.is_terminal())
            .map(|t| t.id)
    }
}

/// Builds [`EventFrame`]s from a [`SlotTable`].
#[derive(Debug)]
pub struct FrameBuilder {
    counter: FrameCounter,
    epoch: Instant,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            counter: FrameCounter::new(),
            epoch: Instant::now(),
        }
    }

    /// Sequence number the next built frame will carry.
    pub fn next_sequence(&self) -> u64 {
        self.counter.peek()
    }

    /// Snapshots the table for a frame in which exactly `just_changed` changed.
    ///
    /// # Errors
    ///
    /// Returns [`TouchError::UnknownIdentifier`] if `just_changed` is not an
    /// occupied, begun slot.
    pub fn build_frame(
        &self,
        table: &SlotTable,
        just_changed: TouchId,
        space: &dyn CoordinateSpace,
    ) -> Result<EventFrame, TouchError> {
        self.build(table, &[just_changed], space)
    }

    /// Snapshots the table for a frame in which every id in `changed`
    /// changed phase together.
    ///
    /// # Errors
    ///
    /// Returns [`TouchError::UnknownIdentifier`] for the first id in
    /// `changed` that is not an occupied, begun slot.
    pub fn build(
        &self,
        table: &SlotTable,
        changed: &[TouchId],
        space: &dyn CoordinateSpace,
    ) -> Result<EventFrame, TouchError> {
        for &id in changed {
            if table.get(id)?.phase().is_none() {
                return Err(TouchError::UnknownIdentifier(id));
            }
        }

        let mut changed = changed.to_vec();
        changed.sort_unstable();
        changed.dedup();

        let touches = table
            .all_occupied()
            .filter_map(|slot| {
                let phase = slot.phase()?;
                if phase.is_terminal() && changed.binary_search(&slot.id()).is_err() {
                    return None;
                }
                Some(self.snapshot(slot, phase, space))
            })
            .collect();

        Ok(EventFrame {
            sequence: self.counter.next(),
            changed,
            touches,
        })
    }

    fn snapshot(
        &self,
        slot: &TouchSlot,
        phase: TouchPhase,
        space: &dyn CoordinateSpace,
    ) -> TouchSnapshot {
        let timestamp_us = slot
            .updated_at()
            .saturating_duration_since(self.epoch)
            .as_micros() as u64;
        TouchSnapshot {
            id: slot.id(),
            phase,
            location: slot.position(),
            sink_location: space.to_sink_space(slot.position(), slot.surface()),
            surface: slot.surface(),
            timestamp_us,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
