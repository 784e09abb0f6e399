//! The touch slot table: a bounded registry of live touches.
//!
//! Each occupied slot maps a small integer [`TouchId`] to the live state of
//! one point of contact.  The identifier space is `0..capacity`, sized like a
//! hardware touch controller (ten fingers by default).
//!
//! # Invariants
//!
//! - At most one occupied slot per identifier.
//! - [`SlotTable::acquire`] without a preference returns the *lowest* free
//!   identifier, so gesture tests can predict ids.
//! - [`SlotTable::release`] removes the slot entirely; a reacquired
//!   identifier never sees the previous touch's position or timestamps.
//! - Phase changes go through [`SlotTable::transition`], which validates
//!   against the phase state machine and leaves the slot untouched on error.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use super::geometry::{Point, SurfaceId};
use super::phase::TouchPhase;

/// Default size of the identifier space.
pub const DEFAULT_MAX_TOUCHES: usize = 10;

/// Largest identifier space a table can be configured with.
pub const MAX_SUPPORTED_TOUCHES: usize = 32;

/// Small non-negative integer distinguishing one concurrent touch from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TouchId(pub u8);

impl TouchId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TouchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised by the slot table, the phase state machine, and the frame
/// builder.  All of them are local and recoverable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TouchError {
    /// Every identifier in the bounded space is occupied.
    #[error("no free touch slot")]
    NoFreeSlot,

    /// A preferred identifier was requested but is already in use.
    #[error("touch identifier {0} is already occupied")]
    AlreadyOccupied(TouchId),

    /// A preferred identifier lies outside `0..capacity`.
    #[error("touch identifier {id} is outside the identifier space (capacity {capacity})")]
    IdentifierOutOfRange { id: TouchId, capacity: usize },

    /// The requested phase change is not allowed from the slot's current phase.
    #[error("invalid phase transition for touch {id}: {from:?} -> {to}")]
    InvalidTransition {
        id: TouchId,
        from: Option<TouchPhase>,
        to: TouchPhase,
    },

    /// The identifier does not name an occupied slot.
    #[error("unknown touch identifier {0}")]
    UnknownIdentifier(TouchId),

    /// A multi-finger gesture could not get all the identifiers it needs.
    #[error("gesture needs {needed} touch slots but only {available} are free")]
    InsufficientSlots { needed: usize, available: usize },

    /// A path drag was requested with no points.
    #[error("path gesture has no points")]
    EmptyPath,

    /// A gesture would expand into more interpolation steps than allowed.
    #[error("gesture needs {requested} steps, limit is {limit}")]
    TooManySteps { requested: usize, limit: usize },

    /// A coordinate, distance, or angle is NaN or infinite.
    #[error("gesture parameter `{0}` is not a finite number")]
    NonFiniteParameter(&'static str),
}

/// Live state of one touch.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchSlot {
    id: TouchId,
    position: Point,
    phase: Option<TouchPhase>,
    surface: SurfaceId,
    created_at: Instant,
    updated_at: Instant,
}

impl TouchSlot {
    fn new(id: TouchId, surface: SurfaceId) -> Self {
        let now = Instant::now();
        Self {
            id,
            position: Point::default(),
            phase: None,
            surface,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> TouchId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// `None` until the touch has begun.
    pub fn phase(&self) -> Option<TouchPhase> {
        self.phase
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    /// `true` once the touch has begun and until it reaches a terminal phase.
    pub fn is_touching(&self) -> bool {
        self.phase.is_some_and(TouchPhase::is_live)
    }
}

/// Fixed-capacity table of touch slots indexed by identifier.
#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: Vec<Option<TouchSlot>>,
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotTable {
    /// Creates an empty table with [`DEFAULT_MAX_TOUCHES`] identifiers.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_TOUCHES)
    }

    /// Creates an empty table with `capacity` identifiers, clamped to
    /// `1..=MAX_SUPPORTED_TOUCHES`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_SUPPORTED_TOUCHES);
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn free_count(&self) -> usize {
        self.capacity() - self.occupied_count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// The identifier the next preference-less [`acquire`](Self::acquire)
    /// would return, if any.
    pub fn lowest_free(&self) -> Option<TouchId> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(|i| TouchId(i as u8))
    }

    /// Occupies a slot for a touch routed to `surface`.
    ///
    /// With `preferred = None` the lowest free identifier is used.
    ///
    /// # Errors
    ///
    /// - [`TouchError::NoFreeSlot`] if the table is full.
    /// - [`TouchError::AlreadyOccupied`] if `preferred` is in use.
    /// - [`TouchError::IdentifierOutOfRange`] if `preferred` is beyond the capacity.
    pub fn acquire(
        &mut self,
        preferred: Option<TouchId>,
        surface: SurfaceId,
    ) -> Result<TouchId, TouchError> {
        let id = match preferred {
            Some(id) => {
                let entry = self
                    .slots
                    .get(id.index())
                    .ok_or(TouchError::IdentifierOutOfRange {
                        id,
                        capacity: self.capacity(),
                    })?;
                if entry.is_some() {
                    return Err(TouchError::AlreadyOccupied(id));
                }
                id
            }
            None => self.lowest_free().ok_or(TouchError::NoFreeSlot)?,
        };

        self.slots[id.index()] = Some(TouchSlot::new(id, surface));
        trace!(touch = %id, %surface, "touch slot acquired");
        Ok(id)
    }

    /// Acquires `count` identifiers at once, lowest first.
    ///
    /// Either all identifiers are acquired or none are.
    ///
    /// # Errors
    ///
    /// Returns [`TouchError::InsufficientSlots`] when fewer than `count`
    /// identifiers are free (or [`TouchError::NoFreeSlot`] for `count == 1`
    /// on a full table).
    pub fn acquire_many(
        &mut self,
        count: usize,
        surface: SurfaceId,
    ) -> Result<Vec<TouchId>, TouchError> {
        let available = self.free_count();
        if available < count {
            return Err(if count == 1 {
                TouchError::NoFreeSlot
            } else {
                TouchError::InsufficientSlots {
                    needed: count,
                    available,
                }
            });
        }
        (0..count).map(|_| self.acquire(None, surface)).collect()
    }

    /// Removes the slot entirely, returning its final state.
    pub fn release(&mut self, id: TouchId) -> Option<TouchSlot> {
        let released = self.slots.get_mut(id.index()).and_then(Option::take);
        if released.is_some() {
            trace!(touch = %id, "touch slot released");
        }
        released
    }

    /// Looks up an occupied slot.
    ///
    /// # Errors
    ///
    /// Returns [`TouchError::UnknownIdentifier`] if `id` is not occupied.
    pub fn get(&self, id: TouchId) -> Result<&TouchSlot, TouchError> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(TouchError::UnknownIdentifier(id))
    }

    fn get_mut(&mut self, id: TouchId) -> Result<&mut TouchSlot, TouchError> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TouchError::UnknownIdentifier(id))
    }

    /// Moves a slot without changing its phase.
    ///
    /// # Errors
    ///
    /// Returns [`TouchError::UnknownIdentifier`] if `id` is not occupied.
    pub fn update(&mut self, id: TouchId, position: Point) -> Result<(), TouchError> {
        let slot = self.get_mut(id)?;
        slot.position = position;
        slot.updated_at = Instant::now();
        Ok(())
    }

    /// Validates a phase change without applying it.
    ///
    /// # Errors
    ///
    /// - [`TouchError::UnknownIdentifier`] if `id` is not occupied.
    /// - [`TouchError::InvalidTransition`] if the phase machine forbids it.
    pub fn check_transition(&self, id: TouchId, to: TouchPhase) -> Result<(), TouchError> {
        let from = self.get(id)?.phase;
        if TouchPhase::can_transition(from, to) {
            Ok(())
        } else {
            Err(TouchError::InvalidTransition { id, from, to })
        }
    }

    /// Applies a phase change and moves the touch to `position`.
    ///
    /// Terminal phases do *not* release the slot here: the caller builds the
    /// frame that reports the terminal phase first, then calls
    /// [`release`](Self::release).
    ///
    /// # Errors
    ///
    /// Same as [`check_transition`](Self::check_transition); on error the
    /// slot is not modified.
    pub fn transition(
        &mut self,
        id: TouchId,
        to: TouchPhase,
        position: Point,
    ) -> Result<(), TouchError> {
        self.check_transition(id, to)?;
        let slot = self.get_mut(id)?;
        slot.phase = Some(to);
        slot.position = position;
        slot.updated_at = Instant::now();
        Ok(())
    }

    /// Every occupied slot, ordered by ascending identifier.
    pub fn all_occupied(&self) -> impl Iterator<Item = &TouchSlot> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
