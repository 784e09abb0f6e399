//! Points, displacements, and the coordinate-space seam.
//!
//! All gesture geometry is expressed in the coordinate space of the target
//! surface (the view the touch is routed to).  Converting a surface-local
//! point to the coordinate space the dispatch sink expects is the job of an
//! injected [`CoordinateSpace`]; the engine never performs that transform
//! itself.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A 2-D coordinate in a surface's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation between `self` and `to`; `t = 0` is `self`,
    /// `t = 1` is `to`.
    pub fn lerp(self, to: Point, t: f64) -> Point {
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// The point at `radius` from `self` in direction `angle` (radians,
    /// measured from the positive x axis).
    pub fn polar_offset(self, radius: f64, angle: f64) -> Point {
        Point {
            x: self.x + radius * angle.cos(),
            y: self.y + radius * angle.sin(),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A relative movement, used by the displacement overload of a drag.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
}

impl Displacement {
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

impl Add<Displacement> for Point {
    type Output = Point;

    fn add(self, rhs: Displacement) -> Point {
        Point::new(self.x + rhs.dx, self.y + rhs.dy)
    }
}

impl Sub<Displacement> for Point {
    type Output = Point;

    fn sub(self, rhs: Displacement) -> Point {
        Point::new(self.x - rhs.dx, self.y - rhs.dy)
    }
}

/// Opaque, non-owning reference to a host surface (a view or a window).
///
/// The engine never dereferences it; it is carried on each touch so the
/// dispatch sink can route the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Maps a surface-local point into the coordinate space the dispatch sink
/// expects (typically window coordinates).
///
/// Implementations must be pure: the same input always yields the same
/// output, and no host state is mutated.
#[cfg_attr(test, mockall::automock)]
pub trait CoordinateSpace: Send + Sync {
    fn to_sink_space(&self, point: Point, surface: SurfaceId) -> Point;
}

/// The identity mapping: surface coordinates already are sink coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySpace;

impl CoordinateSpace for IdentitySpace {
    fn to_sink_space(&self, point: Point, _surface: SurfaceId) -> Point {
        point
    }
}
