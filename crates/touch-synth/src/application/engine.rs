//! The public command surface of the touch engine.
//!
//! [`TouchEngine`] owns the shared [`SlotTable`] and serialises gestures
//! against it: the table's lock is taken before the first identifier is
//! acquired and held until the gesture's last frame (or its cancellation
//! frame) has been delivered.  Two concurrent gestures therefore never
//! interleave their frames, and a two-finger gesture never observes a table
//! that another gesture is halfway through mutating.
//!
//! Dropping a gesture's future (a `tokio::time::timeout`, a losing
//! `select!` branch) cancels it: the touches it still holds are moved to
//! `Cancelled` and released on the spot, and the cancellation frame is
//! delivered before any later gesture's frames.
//!
//! Callers normally go through a [`SurfaceInjector`] obtained from
//! [`TouchEngine::on_view`] or [`TouchEngine::on_window`], which binds the
//! target surface once and exposes one method per gesture.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use touch_core::{
    compile, CompileOptions, CoordinateSpace, Displacement, EventFrame, FrameBuilder,
    GestureSpec, IdentitySpace, Point, SlotTable, SurfaceId, TouchId,
};

use crate::application::inject_gesture::{
    cancel_touches, AbortSignal, DeliveryOutcome, DispatchSink, FrameObserver, GestureDriver,
    GestureError, Scheduler,
};

/// Result of one completed gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureReport {
    /// Correlates every log line and frame of this gesture.
    pub gesture_id: Uuid,
    pub kind: &'static str,
    /// Identifiers the gesture held, in finger order.  All have been
    /// released by the time the report is returned.
    pub identifiers: Vec<TouchId>,
    pub frames_delivered: usize,
}

/// Synthesises touch gestures and delivers them to a [`DispatchSink`].
#[derive(Clone)]
pub struct TouchEngine {
    table: Arc<Mutex<SlotTable>>,
    builder: Arc<FrameBuilder>,
    sink: Arc<dyn DispatchSink>,
    scheduler: Arc<dyn Scheduler>,
    space: Arc<dyn CoordinateSpace>,
    observers: Vec<Arc<dyn FrameObserver>>,
    options: CompileOptions,
    /// Cancellation frames of dropped gestures, awaiting delivery.
    orphaned: Arc<StdMutex<VecDeque<(&'static str, EventFrame)>>>,
}

impl TouchEngine {
    /// Creates an engine with a default-capacity table, the identity
    /// coordinate space, and default compile options.
    pub fn new(sink: Arc<dyn DispatchSink>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            table: Arc::new(Mutex::new(SlotTable::new())),
            builder: Arc::new(FrameBuilder::new()),
            sink,
            scheduler,
            space: Arc::new(IdentitySpace),
            observers: Vec::new(),
            options: CompileOptions::default(),
            orphaned: Arc::new(StdMutex::new(VecDeque::new())),
        }
    }

    /// Shares an existing slot table, e.g. with another engine or with a
    /// test that pre-occupies identifiers.
    pub fn with_table(mut self, table: Arc<Mutex<SlotTable>>) -> Self {
        self.table = table;
        self
    }

    pub fn with_capacity(self, capacity: usize) -> Self {
        self.with_table(Arc::new(Mutex::new(SlotTable::with_capacity(capacity))))
    }

    pub fn with_coordinate_space(mut self, space: Arc<dyn CoordinateSpace>) -> Self {
        self.space = space;
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FrameObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn table(&self) -> Arc<Mutex<SlotTable>> {
        Arc::clone(&self.table)
    }

    /// The identifier the next single-finger gesture would receive, or
    /// `None` when every identifier is held.
    ///
    /// Waits for any in-flight gesture to finish first.
    pub async fn available_identifier(&self) -> Option<TouchId> {
        self.table.lock().await.lowest_free()
    }

    /// Compiles and executes `spec` on `surface`.
    ///
    /// # Errors
    ///
    /// See [`GestureDriver::execute`].  Compilation errors (an empty drag
    /// path, a non-finite parameter, too many steps) surface as
    /// [`GestureError::Touch`] before the table is locked.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned future cancels the gesture as an abort would,
    /// except that the cancellation frame is delivered afterwards by a
    /// background task (or by the next gesture, whichever locks the table
    /// first).
    pub async fn perform(
        &self,
        surface: SurfaceId,
        spec: &GestureSpec,
        abort: Option<&AbortSignal>,
    ) -> Result<GestureReport, GestureError> {
        let kind = spec.name();
        let plan = compile(spec, &self.options)?;
        let gesture_id = Uuid::new_v4();
        let span = info_span!("gesture", id = %gesture_id, kind, %surface);

        async move {
            info!(frames = plan.frame_count(), fingers = plan.fingers, "gesture started");

            let table = self.table.lock().await;
            let mut lease = GestureLease::new(self, kind, table);
            self.deliver_orphaned().await;

            let mut driver = GestureDriver {
                table: &mut lease.table,
                builder: &self.builder,
                sink: self.sink.as_ref(),
                scheduler: self.scheduler.as_ref(),
                space: self.space.as_ref(),
                observers: &self.observers,
                abort,
            };
            let result = driver.execute(kind, &plan, surface).await;
            lease.finished = true;

            match result {
                Ok(summary) => {
                    info!(frames = summary.frames_delivered, "gesture finished");
                    Ok(GestureReport {
                        gesture_id,
                        kind,
                        identifiers: summary.identifiers,
                        frames_delivered: summary.frames_delivered,
                    })
                }
                Err(e) => {
                    warn!(error = %e, "gesture failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Queues the cancellation frame of a dropped gesture and, inside a
    /// runtime, spawns a task to deliver it under the table lock.
    fn orphan(&self, gesture: &'static str, frame: EventFrame) {
        self.orphaned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((gesture, frame));

        match Handle::try_current() {
            Ok(handle) => {
                let engine = self.clone();
                handle.spawn(async move {
                    let _table = engine.table.lock().await;
                    engine.deliver_orphaned().await;
                });
            }
            Err(_) => warn!("no runtime; cancellation frame waits for the next gesture"),
        }
    }

    /// Delivers queued cancellation frames in order.  Callers hold the table
    /// lock so these frames precede any new gesture's frames.
    async fn deliver_orphaned(&self) {
        loop {
            let next = self
                .orphaned
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some((gesture, frame)) = next else {
                return;
            };
            let outcome = self.sink.deliver(&frame).await;
            if let DeliveryOutcome::Rejected(reason) = &outcome {
                warn!(sequence = frame.sequence, %reason, "host rejected cancellation frame");
            }
            for observer in &self.observers {
                observer.observe(gesture, &frame, &outcome);
            }
        }
    }

    /// Injector for touches landing on `view`.
    ///
    /// Surface ids are unique across windows, so the view alone routes the
    /// touches; the enclosing window needs no separate binding.
    pub fn on_view(&self, view: SurfaceId) -> SurfaceInjector<'_> {
        SurfaceInjector {
            engine: self,
            surface: view,
            abort: None,
        }
    }

    /// Injector for touches landing on the window's root surface.
    pub fn on_window(&self, window: SurfaceId) -> SurfaceInjector<'_> {
        self.on_view(window)
    }
}

/// The table lock held for one gesture.
///
/// If the gesture's future is dropped before `finished` is set, every
/// identifier acquired since the lock was taken is cancelled and released in
/// `drop`, and the cancellation frame is handed to the engine for delivery.
struct GestureLease<'a> {
    engine: &'a TouchEngine,
    kind: &'static str,
    table: MutexGuard<'a, SlotTable>,
    held_before: Vec<TouchId>,
    finished: bool,
}

impl<'a> GestureLease<'a> {
    fn new(engine: &'a TouchEngine, kind: &'static str, table: MutexGuard<'a, SlotTable>) -> Self {
        let held_before = table.all_occupied().map(|slot| slot.id()).collect();
        Self {
            engine,
            kind,
            table,
            held_before,
            finished: false,
        }
    }
}

impl Drop for GestureLease<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let held: Vec<TouchId> = self
            .table
            .all_occupied()
            .map(|slot| slot.id())
            .filter(|id| !self.held_before.contains(id))
            .collect();
        if held.is_empty() {
            return;
        }
        warn!(gesture = self.kind, touches = ?held, "gesture dropped before finishing");
        let engine = self.engine;
        if let Some(frame) =
            cancel_touches(&mut self.table, &engine.builder, engine.space.as_ref(), &held)
        {
            engine.orphan(self.kind, frame);
        }
    }
}

/// Gesture commands bound to one target surface.
pub struct SurfaceInjector<'a> {
    engine: &'a TouchEngine,
    surface: SurfaceId,
    abort: Option<&'a AbortSignal>,
}

impl<'a> SurfaceInjector<'a> {
    /// Makes every subsequent gesture abortable through `signal`.
    pub fn with_abort(mut self, signal: &'a AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    /// The surface touches are bound to.
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub async fn perform(&self, spec: &GestureSpec) -> Result<GestureReport, GestureError> {
        self.engine.perform(self.surface, spec, self.abort).await
    }

    pub async fn tap(&self, at: Point) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::Tap { at }).await
    }

    pub async fn long_press(
        &self,
        at: Point,
        duration: Duration,
    ) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::LongPress { at, duration }).await
    }

    pub async fn drag(
        &self,
        from: Point,
        to: Point,
        steps: usize,
    ) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::Drag { from, to, steps }).await
    }

    pub async fn drag_by(
        &self,
        from: Point,
        displacement: Displacement,
        steps: usize,
    ) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::drag_by(from, displacement, steps))
            .await
    }

    pub async fn drag_along(&self, points: &[Point]) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::DragPath {
            points: points.to_vec(),
        })
        .await
    }

    pub async fn two_finger_tap(&self, at: Point) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::TwoFingerTap { at }).await
    }

    pub async fn two_finger_pan(
        &self,
        from: Point,
        to: Point,
        steps: usize,
    ) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::TwoFingerPan { from, to, steps })
            .await
    }

    pub async fn pinch(
        &self,
        center: Point,
        distance: f64,
        steps: usize,
    ) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::Pinch {
            center,
            distance,
            steps,
        })
        .await
    }

    pub async fn zoom(
        &self,
        center: Point,
        distance: f64,
        steps: usize,
    ) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::Zoom {
            center,
            distance,
            steps,
        })
        .await
    }

    pub async fn rotate(
        &self,
        center: Point,
        angle_degrees: f64,
    ) -> Result<GestureReport, GestureError> {
        self.perform(&GestureSpec::Rotate {
            center,
            angle_degrees,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use touch_core::{EventFrame, TouchPhase};

    #[derive(Default)]
    struct CollectingSink {
        frames: StdMutex<Vec<EventFrame>>,
    }

    #[async_trait]
    impl DispatchSink for CollectingSink {
        async fn deliver(&self, frame: &EventFrame) -> DeliveryOutcome {
            self.frames.lock().unwrap().push(frame.clone());
            DeliveryOutcome::Accepted
        }
    }

    struct Immediate;

    #[async_trait]
    impl Scheduler for Immediate {
        async fn sleep(&self, _delay: Duration) {}
    }

    fn engine() -> (TouchEngine, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::default());
        let engine = TouchEngine::new(sink.clone(), Arc::new(Immediate));
        (engine, sink)
    }

    #[tokio::test]
    async fn test_on_view_binds_touches_to_the_view() {
        // Arrange
        let (engine, sink) = engine();

        // Act
        engine
            .on_view(SurfaceId(7))
            .tap(Point::new(3.0, 4.0))
            .await
            .unwrap();

        // Assert
        let frames = sink.frames.lock().unwrap();
        assert!(frames.iter().all(|f| f.touches[0].surface == SurfaceId(7)));
    }

    #[tokio::test]
    async fn test_on_window_targets_the_window_surface() {
        let (engine, sink) = engine();

        let injector = engine.on_window(SurfaceId(4));
        injector.tap(Point::new(1.0, 1.0)).await.unwrap();

        assert_eq!(injector.surface(), SurfaceId(4));
        assert_eq!(sink.frames.lock().unwrap()[0].touches[0].surface, SurfaceId(4));
    }

    #[tokio::test]
    async fn test_report_carries_kind_and_frame_count() {
        let (engine, _sink) = engine();

        let report = engine
            .on_window(SurfaceId(1))
            .drag(Point::new(0.0, 0.0), Point::new(50.0, 0.0), 4)
            .await
            .unwrap();

        assert_eq!(report.kind, "drag");
        assert_eq!(report.frames_delivered, 5);
        assert_eq!(report.identifiers, vec![TouchId(0)]);
    }

    #[tokio::test]
    async fn test_empty_drag_path_is_rejected_before_any_frame() {
        let (engine, sink) = engine();

        let err = engine
            .on_window(SurfaceId(1))
            .drag_along(&[])
            .await
            .unwrap_err();

        assert_eq!(err, GestureError::Touch(touch_core::TouchError::EmptyPath));
        assert!(sink.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_available_identifier_skips_held_slots() {
        // Arrange
        let (engine, _sink) = engine();
        engine
            .table()
            .lock()
            .await
            .acquire(Some(TouchId(0)), SurfaceId(1))
            .unwrap();

        // Act + Assert
        assert_eq!(engine.available_identifier().await, Some(TouchId(1)));
    }

    #[tokio::test]
    async fn test_full_table_reports_no_available_identifier() {
        let (engine, _sink) = engine();
        let engine = engine.with_capacity(1);
        engine.table().lock().await.acquire(None, SurfaceId(1)).unwrap();

        assert_eq!(engine.available_identifier().await, None);
    }

    #[tokio::test]
    async fn test_drag_by_ends_at_start_plus_displacement() {
        let (engine, sink) = engine();

        engine
            .on_window(SurfaceId(1))
            .drag_by(Point::new(10.0, 10.0), Displacement::new(5.0, -10.0), 2)
            .await
            .unwrap();

        let frames = sink.frames.lock().unwrap();
        let last = &frames.last().unwrap().touches[0];
        assert_eq!(last.phase, TouchPhase::Ended);
        assert_eq!(last.location, Point::new(15.0, 0.0));
    }

    #[tokio::test]
    async fn test_concurrent_gestures_do_not_interleave_frames() {
        // Arrange
        let (engine, sink) = engine();
        let a = engine.clone();
        let b = engine.clone();

        // Act
        let (ra, rb) = tokio::join!(
            async move {
                a.on_window(SurfaceId(1))
                    .drag(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 3)
                    .await
            },
            async move {
                b.on_window(SurfaceId(2))
                    .drag(Point::new(0.0, 0.0), Point::new(0.0, 10.0), 3)
                    .await
            },
        );

        // Assert – each gesture's frames are contiguous and both reuse id 0
        assert_eq!(ra.unwrap().identifiers, vec![TouchId(0)]);
        assert_eq!(rb.unwrap().identifiers, vec![TouchId(0)]);
        let frames = sink.frames.lock().unwrap();
        let surfaces: Vec<SurfaceId> = frames.iter().map(|f| f.touches[0].surface).collect();
        let switches = surfaces.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(switches, 1, "frames interleaved: {surfaces:?}");
    }
}
