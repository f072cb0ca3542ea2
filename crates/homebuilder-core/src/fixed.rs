//! Fixed-point encoding of coordinates inside serialized commands.
//!
//! Every coordinate is multiplied by [`NUMBER_SCALE`] and rounded to an
//! integer, so a command decoded from JSON and encoded again yields the same
//! text no matter how the float would have been printed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

pub const NUMBER_SCALE: f64 = 100_000_000.0;

/// A scaled integer length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(i64);

impl Fixed {
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn from_f64(value: f64) -> Self {
        Self((value * NUMBER_SCALE).round() as i64)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / NUMBER_SCALE
    }
}

impl From<f64> for Fixed {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<Fixed> for f64 {
    fn from(value: Fixed) -> Self {
        value.to_f64()
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// A [`Point`] in fixed-point form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedPoint {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
}

impl FixedPoint {
    pub fn to_point(self) -> Point {
        Point::new(self.x.to_f64(), self.y.to_f64(), self.z.to_f64())
    }
}

impl From<Point> for FixedPoint {
    fn from(p: Point) -> Self {
        Self {
            x: Fixed::from_f64(p.x),
            y: Fixed::from_f64(p.y),
            z: Fixed::from_f64(p.z),
        }
    }
}

impl From<FixedPoint> for Point {
    fn from(p: FixedPoint) -> Self {
        p.to_point()
    }
}
