//! Logical gestures and the compiler that expands them into step plans.
//!
//! Compiling a [`GestureSpec`] is a pure computation: it produces a
//! [`GesturePlan`], an ordered list of [`PlanStep`]s.  Each step carries the
//! delay to wait *before* it and the phase changes for every finger involved,
//! and each step becomes exactly one event frame when executed.  Fingers are
//! referred to by index (`0` or `1`); concrete touch identifiers are bound
//! only when the plan is executed against a slot table.
//!
//! # Shapes
//!
//! | Gesture        | Frames                                                   |
//! |----------------|----------------------------------------------------------|
//! | Tap            | Began, Ended (after `tap_hold`)                          |
//! | LongPress      | Began, Ended (after the requested duration)              |
//! | Drag (n steps) | Began, n-1 × Moved, Ended at the end point               |
//! | DragPath       | Began at first point, Moved at each interior, Ended      |
//! | Two-finger     | Began ×2, lockstep Moved …, Ended ×2                     |
//!
//! In a two-finger plan every step names *both* fingers while both are
//! down: the one that does not change is driven to `Stationary`, so no frame
//! ever shows one finger further along its path than the other.

use std::f64::consts::PI;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::geometry::{Displacement, Point};
use super::phase::TouchPhase;
use super::slot::TouchError;

/// A caller-level gesture with its geometric parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureSpec {
    Tap {
        at: Point,
    },
    LongPress {
        at: Point,
        duration: Duration,
    },
    Drag {
        from: Point,
        to: Point,
        steps: usize,
    },
    DragPath {
        points: Vec<Point>,
    },
    TwoFingerTap {
        at: Point,
    },
    TwoFingerPan {
        from: Point,
        to: Point,
        steps: usize,
    },
    /// Fingers spread apart by `distance` around `center`.
    Pinch {
        center: Point,
        distance: f64,
        steps: usize,
    },
    /// Fingers close in by `distance` around `center`.
    Zoom {
        center: Point,
        distance: f64,
        steps: usize,
    },
    Rotate {
        center: Point,
        angle_degrees: f64,
    },
}

impl GestureSpec {
    /// Displacement overload of [`GestureSpec::Drag`].
    pub fn drag_by(from: Point, displacement: Displacement, steps: usize) -> Self {
        GestureSpec::Drag {
            from,
            to: from + displacement,
            steps,
        }
    }

    /// Number of touch identifiers the gesture holds for its duration.
    pub fn fingers(&self) -> usize {
        match self {
            GestureSpec::Tap { .. }
            | GestureSpec::LongPress { .. }
            | GestureSpec::Drag { .. }
            | GestureSpec::DragPath { .. } => 1,
            GestureSpec::TwoFingerTap { .. }
            | GestureSpec::TwoFingerPan { .. }
            | GestureSpec::Pinch { .. }
            | GestureSpec::Zoom { .. }
            | GestureSpec::Rotate { .. } => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GestureSpec::Tap { .. } => "tap",
            GestureSpec::LongPress { .. } => "long_press",
            GestureSpec::Drag { .. } => "drag",
            GestureSpec::DragPath { .. } => "drag_path",
            GestureSpec::TwoFingerTap { .. } => "two_finger_tap",
            GestureSpec::TwoFingerPan { .. } => "two_finger_pan",
            GestureSpec::Pinch { .. } => "pinch",
            GestureSpec::Zoom { .. } => "zoom",
            GestureSpec::Rotate { .. } => "rotate",
        }
    }
}

/// Upper bound on interpolation steps in one gesture.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Timing and geometry knobs for the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Delay between touch-down and touch-up for taps.
    pub tap_hold: Duration,
    /// Delay before each interpolated step.
    pub step_interval: Duration,
    /// Distance of each finger from the gesture center for two-finger taps,
    /// pans, and the base radius of pinch / zoom.
    pub finger_spacing: f64,
    /// Finger distance from the center while rotating.
    pub rotate_radius: f64,
    /// Angular resolution of a rotation.
    pub rotate_degrees_per_step: f64,
    /// Largest step count a drag, pan, pinch, zoom or rotation may expand to.
    pub max_steps: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            tap_hold: Duration::from_millis(100),
            step_interval: Duration::from_millis(10),
            finger_spacing: 40.0,
            rotate_radius: 80.0,
            rotate_degrees_per_step: 2.0,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// One finger's phase change within a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerChange {
    /// Index into the identifiers bound to the gesture.
    pub finger: usize,
    pub position: Point,
    pub phase: TouchPhase,
}

/// One frame's worth of changes, preceded by a delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub delay: Duration,
    pub changes: Vec<FingerChange>,
}

/// The compiled, ordered steps of one gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GesturePlan {
    pub fingers: usize,
    pub steps: Vec<PlanStep>,
}

impl GesturePlan {
    /// Number of frames the plan produces when executed.
    pub fn frame_count(&self) -> usize {
        self.steps.len()
    }

    /// Sum of every step's delay.
    pub fn total_delay(&self) -> Duration {
        self.steps.iter().map(|s| s.delay).sum()
    }

    /// Every change for `finger`, in order.
    pub fn finger_track(&self, finger: usize) -> impl Iterator<Item = &FingerChange> + '_ {
        self.steps
            .iter()
            .flat_map(|s| s.changes.iter())
            .filter(move |c| c.finger == finger)
    }
}

/// Expands a gesture into its step plan.
///
/// # Errors
///
/// - [`TouchError::EmptyPath`] for a [`GestureSpec::DragPath`] with no points.
/// - [`TouchError::NonFiniteParameter`] if a point, distance or angle is NaN
///   or infinite.
/// - [`TouchError::TooManySteps`] if the gesture would expand past
///   [`CompileOptions::max_steps`].  Nothing is allocated in that case.
pub fn compile(spec: &GestureSpec, opts: &CompileOptions) -> Result<GesturePlan, TouchError> {
    check_finite(spec)?;
    let plan = match spec {
        GestureSpec::Tap { at } => single_finger(&[*at, *at], opts.tap_hold, opts.tap_hold),
        GestureSpec::LongPress { at, duration } => single_finger(&[*at, *at], *duration, *duration),
        GestureSpec::Drag { from, to, steps } => {
            let steps = step_count(*steps, opts)?;
            let path: Vec<Point> = (0..=steps)
                .map(|i| from.lerp(*to, i as f64 / steps as f64))
                .collect();
            single_finger(&path, opts.step_interval, opts.step_interval)
        }
        GestureSpec::DragPath { points } => match points.as_slice() {
            [] => return Err(TouchError::EmptyPath),
            [only] => single_finger(&[*only, *only], opts.tap_hold, opts.tap_hold),
            path => single_finger(path, opts.step_interval, opts.step_interval),
        },
        GestureSpec::TwoFingerTap { at } => {
            let offset = Displacement::new(opts.finger_spacing, 0.0);
            two_finger(&[*at - offset], &[*at + offset], opts.step_interval, opts.tap_hold)
        }
        GestureSpec::TwoFingerPan { from, to, steps } => {
            let offset = Displacement::new(opts.finger_spacing, 0.0);
            let steps = step_count(*steps, opts)?;
            let t = |i: usize| i as f64 / steps as f64;
            let left: Vec<Point> = (0..=steps)
                .map(|i| (*from - offset).lerp(*to - offset, t(i)))
                .collect();
            let right: Vec<Point> = (0..=steps)
                .map(|i| (*from + offset).lerp(*to + offset, t(i)))
                .collect();
            two_finger(&left, &right, opts.step_interval, opts.step_interval)
        }
        GestureSpec::Pinch {
            center,
            distance,
            steps,
        } => {
            let start = opts.finger_spacing;
            let steps = step_count(*steps, opts)?;
            radial(*center, start, start + distance.abs(), 0.0, 0.0, steps, opts)
        }
        GestureSpec::Zoom {
            center,
            distance,
            steps,
        } => {
            let end = opts.finger_spacing;
            let steps = step_count(*steps, opts)?;
            radial(*center, end + distance.abs(), end, 0.0, 0.0, steps, opts)
        }
        GestureSpec::Rotate {
            center,
            angle_degrees,
        } => {
            let per_step = opts.rotate_degrees_per_step.abs().max(f64::EPSILON);
            // Float-to-int `as` saturates, so a huge angle lands on usize::MAX.
            let steps = step_count((angle_degrees.abs() / per_step).round() as usize, opts)?;
            let radius = opts.rotate_radius;
            radial(*center, radius, radius, 0.0, angle_degrees.to_radians(), steps, opts)
        }
    };
    Ok(plan)
}

/// A requested step count, raised to at least one and checked against
/// [`CompileOptions::max_steps`].
fn step_count(requested: usize, opts: &CompileOptions) -> Result<usize, TouchError> {
    let steps = requested.max(1);
    let limit = opts.max_steps.max(1);
    if steps > limit {
        return Err(TouchError::TooManySteps {
            requested: steps,
            limit,
        });
    }
    Ok(steps)
}

fn ensure_finite(parameter: &'static str, finite: bool) -> Result<(), TouchError> {
    if finite {
        Ok(())
    } else {
        Err(TouchError::NonFiniteParameter(parameter))
    }
}

fn check_finite(spec: &GestureSpec) -> Result<(), TouchError> {
    match spec {
        GestureSpec::Tap { at }
        | GestureSpec::LongPress { at, .. }
        | GestureSpec::TwoFingerTap { at } => ensure_finite("at", at.is_finite()),
        GestureSpec::Drag { from, to, .. } | GestureSpec::TwoFingerPan { from, to, .. } => {
            ensure_finite("from", from.is_finite())?;
            ensure_finite("to", to.is_finite())
        }
        GestureSpec::DragPath { points } => {
            ensure_finite("points", points.iter().all(|p| p.is_finite()))
        }
        GestureSpec::Pinch {
            center, distance, ..
        }
        | GestureSpec::Zoom {
            center, distance, ..
        } => {
            ensure_finite("center", center.is_finite())?;
            ensure_finite("distance", distance.is_finite())
        }
        GestureSpec::Rotate {
            center,
            angle_degrees,
        } => {
            ensure_finite("center", center.is_finite())?;
            ensure_finite("angle_degrees", angle_degrees.is_finite())
        }
    }
}

/// Began at `path[0]`, Moved at every interior point, Ended at the last.
/// `path` must hold at least two points.
fn single_finger(path: &[Point], move_delay: Duration, release_delay: Duration) -> GesturePlan {
    let last = path.len() - 1;
    let steps = path
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let (phase, delay) = match i {
                0 => (TouchPhase::Began, Duration::ZERO),
                i if i == last => (TouchPhase::Ended, release_delay),
                _ => (TouchPhase::Moved, move_delay),
            };
            PlanStep {
                delay,
                changes: vec![FingerChange {
                    finger: 0,
                    position,
                    phase,
                }],
            }
        })
        .collect();
    GesturePlan { fingers: 1, steps }
}

/// Two fingers following equal-length paths in lockstep.
///
/// Both fingers begin (one frame each), move together through the rest of
/// their paths, then end (one frame each).  `release_delay` precedes the
/// first Ended frame.
fn two_finger(
    left: &[Point],
    right: &[Point],
    move_delay: Duration,
    release_delay: Duration,
) -> GesturePlan {
    debug_assert_eq!(left.len(), right.len());
    let change = |finger, position, phase| FingerChange {
        finger,
        position,
        phase,
    };
    let (l0, r0) = (left[0], right[0]);
    let (ln, rn) = (left[left.len() - 1], right[right.len() - 1]);

    let mut steps = vec![
        PlanStep {
            delay: Duration::ZERO,
            changes: vec![change(0, l0, TouchPhase::Began)],
        },
        PlanStep {
            delay: Duration::ZERO,
            changes: vec![
                change(0, l0, TouchPhase::Stationary),
                change(1, r0, TouchPhase::Began),
            ],
        },
    ];
    steps.extend(left.iter().zip(right).skip(1).map(|(&l, &r)| PlanStep {
        delay: move_delay,
        changes: vec![change(0, l, TouchPhase::Moved), change(1, r, TouchPhase::Moved)],
    }));
    steps.push(PlanStep {
        delay: release_delay,
        changes: vec![
            change(0, ln, TouchPhase::Ended),
            change(1, rn, TouchPhase::Stationary),
        ],
    });
    steps.push(PlanStep {
        delay: Duration::ZERO,
        changes: vec![change(1, rn, TouchPhase::Ended)],
    });
    GesturePlan { fingers: 2, steps }
}

/// Two fingers placed symmetrically about `center`, interpolating radius and
/// angle together.  Finger 0 sits opposite finger 1.
fn radial(
    center: Point,
    radius_from: f64,
    radius_to: f64,
    angle_from: f64,
    angle_to: f64,
    steps: usize,
    opts: &CompileOptions,
) -> GesturePlan {
    let (left, right): (Vec<Point>, Vec<Point>) = (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let radius = radius_from + (radius_to - radius_from) * t;
            let angle = angle_from + (angle_to - angle_from) * t;
            (
                center.polar_offset(radius, angle + PI),
                center.polar_offset(radius, angle),
            )
        })
        .unzip();
    two_finger(&left, &right, opts.step_interval, opts.step_interval)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
