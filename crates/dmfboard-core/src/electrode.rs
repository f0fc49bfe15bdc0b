use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Polygon};

/// Board-unique electrode reference designator, rendered as `E<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Refdes(pub u32);

impl fmt::Display for Refdes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl FromStr for Refdes {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('E').unwrap_or(s).parse().map(Refdes)
    }
}

/// Where an owner (grid cell or peripheral) sits on the board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Translation offset.
    pub origin: Point,
    /// Rotation in radians, counter-clockwise positive.
    pub rotation: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            origin: Point::new(0.0, 0.0),
            rotation: 0.0,
        }
    }
}

impl Placement {
    pub fn new(origin: Point, rotation: f64) -> Self {
        Self { origin, rotation }
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            ..Default::default()
        }
    }

    pub fn rotation_deg(&self) -> f64 {
        self.rotation.to_degrees()
    }

    /// Owner frame to board frame: rotate, then translate.
    pub fn apply(&self, point: &Point) -> Point {
        point.rotate(self.rotation) + self.origin
    }

    /// Board frame back to the owner frame.
    pub fn invert(&self, point: &Point) -> Point {
        (*point - self.origin).rotate(-self.rotation)
    }
}

/// A single copper-pour electrode. `polygon` is relative to `origin`, and
/// `origin` is relative to the owner's frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electrode {
    pub refdes: Refdes,
    pub origin: Point,
    pub polygon: Polygon,
}

impl Electrode {
    pub fn new(refdes: Refdes, origin: Point, polygon: Polygon) -> Self {
        Self {
            refdes,
            origin,
            polygon,
        }
    }

    /// Points in the board frame for an owner at `placement`.
    pub fn global_polygon(&self, placement: &Placement) -> Polygon {
        Polygon::new(
            self.polygon
                .points
                .iter()
                .map(|p| placement.apply(&(*p + self.origin)))
                .collect(),
        )
    }

    /// Map a board-frame point into this electrode's polygon frame.
    pub fn to_local(&self, placement: &Placement, point: &Point) -> Point {
        placement.invert(point) - self.origin
    }
}
