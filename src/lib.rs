//! Small software-rendered demo-game framework: a winit/softbuffer window,
//! a CPU canvas, fontdue text textures, a generational entity arena and a
//! fixed-rate run loop. The `cellbounce` binary in this crate uses it to
//! bounce colored circles around a window.
//!
//! ```no_run
//! use cellbounce::prelude::*;
//!
//! struct Demo;
//!
//! impl Game for Demo {
//!     fn update(&mut self, base: &mut BaseGame, delta_ms: f64) {
//!         base.update_entities(delta_ms);
//!     }
//!
//!     fn draw(&mut self, base: &mut BaseGame) {
//!         base.draw_entities();
//!     }
//! }
//!
//! let mut base = BaseGame::new(GameConfig::default()).unwrap();
//! base.run(&mut Demo).unwrap();
//! ```

pub mod canvas;
pub mod entities;
pub mod entity;
pub mod font;
pub mod game;
pub mod math;
pub mod prelude;
pub mod runner;
pub mod texture;
pub mod timer;
pub mod window;

mod utils;
pub use utils::ArcRef;
