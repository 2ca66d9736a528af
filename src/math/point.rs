use num_traits::ToPrimitive;
use winit::dpi::PhysicalSize;

use super::Vector2;

/// Integer screen coordinate / extent pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point2 {
    pub x: i32,
    pub y: i32,
}

impl Point2 {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub fn new<T: ToPrimitive>(x: T, y: T) -> Self {
        Self {
            x: x.to_i32().unwrap_or(0),
            y: y.to_i32().unwrap_or(0),
        }
    }
}

impl Default for Point2 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<PhysicalSize<u32>> for Point2 {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self {
            x: size.width as i32,
            y: size.height as i32,
        }
    }
}

impl From<(i32, i32)> for Point2 {
    fn from(tuple: (i32, i32)) -> Self {
        Self {
            x: tuple.0,
            y: tuple.1,
        }
    }
}

impl From<Vector2> for Point2 {
    fn from(vector: Vector2) -> Self {
        Self {
            x: vector.x.round() as i32,
            y: vector.y.round() as i32,
        }
    }
}

impl From<Point2> for Vector2 {
    fn from(point: Point2) -> Self {
        Self {
            x: point.x as f32,
            y: point.y as f32,
        }
    }
}
