mod color;
mod point;
mod rect;
mod vector;

pub use color::Color;
pub use point::Point2;
pub use rect::Rect;
pub use vector::Vector2;
