//! Gesture execution: drives a compiled plan through the slot table and
//! delivers one frame per step.
//!
//! This use case sits at the application layer and delegates frame delivery
//! to a [`DispatchSink`] and waiting to a [`Scheduler`], both injected.  The
//! host-facing implementations live in the infrastructure layer.
//!
//! # Step protocol
//!
//! For every [`PlanStep`]:
//!
//! 1. Wait out the step's delay.  The wait races the gesture's
//!    [`AbortSignal`], so an abort never has to sit through a long-press.
//! 2. Validate *every* phase change in the step, then apply them all.  A
//!    step is atomic: either all of its changes land or none do.
//! 3. Build one frame, then release every slot that just reached a terminal
//!    phase (the frame is the only place that terminal phase is seen).
//! 4. Deliver the frame and wait for the verdict.  A rejection aborts the
//!    gesture; nothing is retried.
//!
//! If any step fails, every identifier the gesture still holds is driven to
//! `Cancelled` in one final frame and released, so the table is left exactly
//! as it was before the gesture started.  `cancel_touches` is the
//! synchronous half of that cleanup; the engine also runs it when a gesture's
//! future is dropped mid-flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

use touch_core::{
    CoordinateSpace, EventFrame, FrameBuilder, GesturePlan, PlanStep, SlotTable, SurfaceId,
    TouchError, TouchId, TouchPhase,
};

/// Error type for gesture execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GestureError {
    /// Slot-table, phase, or frame-building failure.
    #[error(transparent)]
    Touch(#[from] TouchError),

    /// The host declined a frame.
    #[error("host rejected frame {sequence}: {reason}")]
    DeliveryRejected { sequence: u64, reason: String },

    /// The gesture was aborted from outside between two steps.
    #[error("gesture aborted")]
    Aborted,
}

/// The host's verdict on a delivered frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    Rejected(String),
}

impl DeliveryOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DeliveryOutcome::Accepted)
    }
}

/// Delivers frames to the host's input pipeline.
///
/// Delivery is synchronous from the engine's point of view: the next step is
/// not produced until `deliver` returns.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn deliver(&self, frame: &EventFrame) -> DeliveryOutcome;
}

/// Provides the suspension used for inter-step delays.
///
/// Implementations must yield to the runtime rather than block the thread.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Notified after each frame's delivery outcome is known.
pub trait FrameObserver: Send + Sync {
    fn observe(&self, gesture: &str, frame: &EventFrame, outcome: &DeliveryOutcome);
}

/// Externally triggered cancellation of an in-flight gesture.
///
/// Checked between steps and raced against every inter-step delay.
#[derive(Debug, Default)]
pub struct AbortSignal {
    aborted: AtomicBool,
    notify: Notify,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the abort.  Idempotent.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once [`abort`](Self::abort) has been called.
    pub async fn aborted(&self) {
        loop {
            // Register before checking the flag so a concurrent abort is not missed.
            let notified = self.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

/// What a successfully executed plan produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Identifiers bound to the plan's fingers, in finger order.
    pub identifiers: Vec<TouchId>,
    pub frames_delivered: usize,
}

/// Executes one gesture plan against an exclusively borrowed slot table.
///
/// The caller is responsible for holding the table's lock for the whole
/// gesture; the driver itself holds `&mut SlotTable` for its lifetime.
pub struct GestureDriver<'a> {
    pub table: &'a mut SlotTable,
    pub builder: &'a FrameBuilder,
    pub sink: &'a dyn DispatchSink,
    pub scheduler: &'a dyn Scheduler,
    pub space: &'a dyn CoordinateSpace,
    pub observers: &'a [Arc<dyn FrameObserver>],
    pub abort: Option<&'a AbortSignal>,
}

impl GestureDriver<'_> {
    /// Acquires the plan's identifiers on `surface` and runs every step.
    ///
    /// # Errors
    ///
    /// - [`GestureError::Touch`] with `NoFreeSlot` / `InsufficientSlots` if
    ///   the identifiers cannot be acquired (no frame is produced).
    /// - [`GestureError::Touch`] for a phase or frame failure mid-gesture.
    /// - [`GestureError::DeliveryRejected`] if the sink declines a frame.
    /// - [`GestureError::Aborted`] if the abort signal fired.
    ///
    /// On every mid-gesture error the held identifiers are cancelled and
    /// released before returning.
    pub async fn execute(
        &mut self,
        gesture: &str,
        plan: &GesturePlan,
        surface: SurfaceId,
    ) -> Result<ExecutionSummary, GestureError> {
        let ids = self.table.acquire_many(plan.fingers, surface)?;
        let mut frames_delivered = 0;

        for step in &plan.steps {
            if let Err(e) = self.run_step(gesture, step, &ids).await {
                self.cancel_held(gesture, &ids).await;
                return Err(e);
            }
            frames_delivered += 1;
        }

        Ok(ExecutionSummary {
            identifiers: ids,
            frames_delivered,
        })
    }

    async fn run_step(
        &mut self,
        gesture: &str,
        step: &PlanStep,
        ids: &[TouchId],
    ) -> Result<(), GestureError> {
        if !step.delay.is_zero() {
            self.pause(step.delay).await;
        }
        if self.abort.is_some_and(AbortSignal::is_aborted) {
            return Err(GestureError::Aborted);
        }

        let changes = step
            .changes
            .iter()
            .map(|c| {
                let id = ids.get(c.finger).copied().ok_or(TouchError::InsufficientSlots {
                    needed: c.finger + 1,
                    available: ids.len(),
                })?;
                Ok((id, c))
            })
            .collect::<Result<Vec<_>, TouchError>>()?;

        for (id, change) in &changes {
            self.table.check_transition(*id, change.phase)?;
        }
        for (id, change) in &changes {
            self.table.transition(*id, change.phase, change.position)?;
        }

        let changed: Vec<TouchId> = changes.iter().map(|(id, _)| *id).collect();
        let frame = self.builder.build(self.table, &changed, self.space)?;
        for (id, change) in &changes {
            if change.phase.is_terminal() {
                self.table.release(*id);
            }
        }

        match self.deliver(gesture, &frame).await {
            DeliveryOutcome::Accepted => Ok(()),
            DeliveryOutcome::Rejected(reason) => Err(GestureError::DeliveryRejected {
                sequence: frame.sequence,
                reason,
            }),
        }
    }

    async fn pause(&self, delay: Duration) {
        match self.abort {
            Some(signal) => {
                tokio::select! {
                    _ = self.scheduler.sleep(delay) => {}
                    _ = signal.aborted() => {}
                }
            }
            None => self.scheduler.sleep(delay).await,
        }
    }

    async fn deliver(&self, gesture: &str, frame: &EventFrame) -> DeliveryOutcome {
        let outcome = self.sink.deliver(frame).await;
        debug!(
            sequence = frame.sequence,
            touches = frame.touches.len(),
            accepted = outcome.is_accepted(),
            "frame delivered"
        );
        for observer in self.observers {
            observer.observe(gesture, frame, &outcome);
        }
        outcome
    }

    /// Drives every still-live identifier in `ids` to `Cancelled` in one
    /// frame and releases everything the gesture holds.
    async fn cancel_held(&mut self, gesture: &str, ids: &[TouchId]) {
        let Some(frame) = cancel_touches(self.table, self.builder, self.space, ids) else {
            return;
        };
        if let DeliveryOutcome::Rejected(reason) = self.deliver(gesture, &frame).await {
            warn!(sequence = frame.sequence, %reason, "host rejected cancellation frame");
        }
    }
}

/// Moves every live identifier in `ids` to `Cancelled` and releases every
/// identifier in `ids`.
///
/// Returns the frame announcing the cancellation, or `None` when none of the
/// identifiers had begun (the host never saw them).
pub(crate) fn cancel_touches(
    table: &mut SlotTable,
    builder: &FrameBuilder,
    space: &dyn CoordinateSpace,
    ids: &[TouchId],
) -> Option<EventFrame> {
    let mut cancelled = Vec::new();
    for &id in ids {
        let Ok(slot) = table.get(id) else {
            continue;
        };
        match slot.phase() {
            Some(phase) if phase.is_live() => {
                let position = slot.position();
                if table.transition(id, TouchPhase::Cancelled, position).is_ok() {
                    cancelled.push(id);
                }
            }
            // Never began (host has not seen it) or already terminal.
            _ => {
                table.release(id);
            }
        }
    }
    if cancelled.is_empty() {
        return None;
    }

    let frame = builder.build(table, &cancelled, space);
    for &id in &cancelled {
        table.release(id);
    }
    match frame {
        Ok(frame) => {
            warn!(touches = ?cancelled, sequence = frame.sequence, "cancelling held touches");
            Some(frame)
        }
        Err(e) => {
            warn!(error = %e, "could not build cancellation frame");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use touch_core::{compile, CompileOptions, GestureSpec, IdentitySpace, Point};

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<EventFrame>>,
        reject_index: Option<usize>,
    }

    #[async_trait]
    impl DispatchSink for RecordingSink {
        async fn deliver(&self, frame: &EventFrame) -> DeliveryOutcome {
            let mut frames = self.frames.lock().unwrap();
            let index = frames.len();
            frames.push(frame.clone());
            if self.reject_index == Some(index) {
                DeliveryOutcome::Rejected("injected rejection".to_string())
            } else {
                DeliveryOutcome::Accepted
            }
        }
    }

    #[derive(Default)]
    struct NoWait {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Scheduler for NoWait {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    async fn run(
        table: &mut SlotTable,
        sink: &RecordingSink,
        spec: &GestureSpec,
        abort: Option<&AbortSignal>,
    ) -> Result<ExecutionSummary, GestureError> {
        let plan = compile(spec, &CompileOptions::default())?;
        let builder = FrameBuilder::new();
        let scheduler = NoWait::default();
        let mut driver = GestureDriver {
            table,
            builder: &builder,
            sink,
            scheduler: &scheduler,
            space: &IdentitySpace,
            observers: &[],
            abort,
        };
        driver.execute(spec.name(), &plan, SurfaceId(1)).await
    }

    fn drag(steps: usize) -> GestureSpec {
        GestureSpec::Drag {
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 0.0),
            steps,
        }
    }

    // ── Happy path ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_tap_delivers_two_frames_and_frees_the_slot() {
        // Arrange
        let mut table = SlotTable::new();
        let sink = RecordingSink::default();

        // Act
        let summary = run(&mut table, &sink, &GestureSpec::Tap { at: Point::new(5.0, 5.0) }, None)
            .await
            .unwrap();

        // Assert
        assert_eq!(summary.frames_delivered, 2);
        assert_eq!(summary.identifiers, vec![TouchId(0)]);
        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames[0].touches[0].phase, TouchPhase::Began);
        assert_eq!(frames[1].touches[0].phase, TouchPhase::Ended);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_tap_uses_lowest_free_identifier() {
        let mut table = SlotTable::new();
        table.acquire(Some(TouchId(0)), SurfaceId(9)).unwrap();
        let sink = RecordingSink::default();

        let summary = run(&mut table, &sink, &GestureSpec::Tap { at: Point::default() }, None)
            .await
            .unwrap();

        assert_eq!(summary.identifiers, vec![TouchId(1)]);
        assert_eq!(table.occupied_count(), 1, "foreign slot must be left alone");
    }

    // ── Failure paths ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_rejected_frame_cancels_touch_and_frees_slot() {
        // Arrange – reject the second frame of a 5-step drag
        let mut table = SlotTable::new();
        let sink = RecordingSink {
            reject_index: Some(1),
            ..Default::default()
        };

        // Act
        let err = run(&mut table, &sink, &drag(5), None).await.unwrap_err();

        // Assert
        assert!(matches!(err, GestureError::DeliveryRejected { sequence: 1, .. }));
        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 3, "began, rejected move, cancellation");
        let last = frames.last().unwrap();
        assert_eq!(last.touches.len(), 1);
        assert_eq!(last.touches[0].phase, TouchPhase::Cancelled);
        assert!(frames.iter().all(|f| f.touches.iter().all(|t| t.phase != TouchPhase::Ended)));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_two_finger_gesture_without_two_free_slots_fails_before_any_frame() {
        let mut table = SlotTable::with_capacity(2);
        table.acquire(None, SurfaceId(9)).unwrap();
        let sink = RecordingSink::default();

        let err = run(
            &mut table,
            &sink,
            &GestureSpec::TwoFingerTap { at: Point::default() },
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            GestureError::Touch(TouchError::InsufficientSlots {
                needed: 2,
                available: 1
            })
        );
        assert!(sink.frames.lock().unwrap().is_empty());
        assert_eq!(table.occupied_count(), 1);
    }

    #[tokio::test]
    async fn test_abort_before_first_delay_cancels_began_touch() {
        // Arrange – abort already requested; the Began frame has no delay so
        // the check before it fires immediately
        let mut table = SlotTable::new();
        let sink = RecordingSink::default();
        let signal = AbortSignal::new();
        signal.abort();

        // Act
        let err = run(&mut table, &sink, &drag(3), Some(&signal)).await.unwrap_err();

        // Assert – nothing was ever begun, so no cancellation frame is needed
        assert_eq!(err, GestureError::Aborted);
        assert!(sink.frames.lock().unwrap().is_empty());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_second_finger_never_begun_is_released_silently() {
        // Arrange – reject the very first frame of a two-finger tap
        let mut table = SlotTable::new();
        let sink = RecordingSink {
            reject_index: Some(0),
            ..Default::default()
        };

        // Act
        let err = run(
            &mut table,
            &sink,
            &GestureSpec::TwoFingerTap { at: Point::new(50.0, 50.0) },
            None,
        )
        .await
        .unwrap_err();

        // Assert – only finger 0 had begun, so only it is cancelled
        assert!(matches!(err, GestureError::DeliveryRejected { .. }));
        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].changed, vec![TouchId(0)]);
        assert_eq!(frames[1].touches[0].phase, TouchPhase::Cancelled);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_abort_signal_resolves_waiters() {
        let signal = Arc::new(AbortSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.aborted().await })
        };

        tokio::task::yield_now().await;
        signal.abort();

        waiter.await.expect("waiter task must finish after abort");
        assert!(signal.is_aborted());
    }
}
