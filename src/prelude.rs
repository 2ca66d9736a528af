//! The usual imports for a game built on this crate.

pub use crate::{
    canvas::Canvas,
    entities::Cell,
    entity::{Entities, Entity, EntityId, FrameContext},
    font::Font,
    game::{BaseGame, Game, GameConfig, GameError},
    math::{Color, Point2, Rect, Vector2},
    runner::Event,
    texture::Texture,
    timer::{FrameLimiter, Timer},
    window::Window,
};
