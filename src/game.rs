use std::{path::PathBuf, sync::Mutex};

use crate::{
    canvas::{self, Canvas, CanvasError},
    entity::{Entities, Entity, EntityId},
    font::{self, Font, FontError},
    math::{Color, Point2, Rect},
    runner::{Event, Runner, RunnerError},
    timer::{FrameLimiter, Timer},
    window::Window,
    log, warn_log,
};

lazy_static::lazy_static! {
    static ref INSTANCE_LIVE: Mutex<bool> = Mutex::new(false);
}

/// Token for the single allowed [BaseGame] per process. Dropping it frees
/// the slot.
struct InstanceGuard;

impl InstanceGuard {
    fn acquire() -> Result<Self, GameError> {
        let mut live = INSTANCE_LIVE.lock().unwrap();
        if *live {
            return Err(GameError::InstanceAlreadyLive);
        }
        *live = true;
        Ok(Self)
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        *INSTANCE_LIVE.lock().unwrap() = false;
    }
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub title: String,
    pub width: i32,
    pub height: i32,
    /// 0 disables the frame cap.
    pub target_fps: u32,
    /// Explicit font file; [None] scans the platform font directories.
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    pub background: Color,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: "cellbounce".to_string(),
            width: 1280,
            height: 720,
            target_fps: 60,
            font_path: None,
            font_size: 22.0,
            background: Color::WHITE,
        }
    }
}

/// Application callbacks driven by [BaseGame::run], once per frame in the
/// order event → update → draw.
pub trait Game {
    fn handle_event(&mut self, _base: &mut BaseGame, _event: &Event) {}
    fn update(&mut self, base: &mut BaseGame, delta_ms: f64);
    fn draw(&mut self, base: &mut BaseGame);
}

/// Owns the platform resources and drives the frame loop.
///
/// At most one instance may be live per process; a second [BaseGame::new]
/// fails with [GameError::InstanceAlreadyLive] and leaves the first
/// untouched. Construction registers the canvas and font as the
/// process-wide fallbacks for [crate::texture::Texture]; teardown clears
/// them again.
pub struct BaseGame {
    _guard: InstanceGuard,
    runner: Runner,
    window: Window,
    canvas: Canvas,
    font: Font,
    entities: Entities,
    window_rect: Rect,
    background: Color,
    running: bool,
    load_timer: Timer,
    fps_timer: Timer,
    limiter: FrameLimiter,
    frames: u64,
    avg_fps: f64,
    current_fps: f64,
    delta_ms: f64,
}

impl BaseGame {
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        // the guard is a plain local until the struct is built, so any `?`
        // below releases the slot on the way out
        let guard = InstanceGuard::acquire()?;

        let mut load_timer = Timer::new();
        load_timer.start();

        let mut runner = Runner::new()?;
        let window = Window::new(
            &mut runner,
            &config.title,
            Point2::new(config.width, config.height),
        )?;
        let canvas = Canvas::new(&window)?;

        let font = match &config.font_path {
            Some(path) => match Font::load(path, config.font_size) {
                Ok(font) => font,
                Err(e) => {
                    warn_log!("font {} unusable ({}), trying system fonts", path.display(), e);
                    Font::find_system(config.font_size)?
                }
            },
            None => Font::find_system(config.font_size)?,
        };

        canvas::set_fallback_target(Some(canvas.clone()));
        font::set_fallback_font(Some(font.clone()));

        load_timer.pause();
        log!(
            "initialized in {:.0} ms with font {}",
            load_timer.milliseconds(),
            font.name()
        );

        let size = window.inner_size();
        let origin = window.outer_position();
        let target_fps = config.target_fps;

        Ok(Self {
            _guard: guard,
            runner,
            window,
            canvas,
            font,
            entities: Entities::new(),
            window_rect: Rect::new(origin.x, origin.y, size.x, size.y),
            background: config.background,
            running: false,
            load_timer,
            fps_timer: Timer::new(),
            limiter: FrameLimiter::new(target_fps),
            frames: 0,
            avg_fps: 0.0,
            current_fps: 0.0,
            delta_ms: 0.0,
        })
    }

    /// Drive `app` until the window closes or [BaseGame::exit] is called.
    pub fn run(&mut self, app: &mut impl Game) -> Result<(), GameError> {
        self.frames = 0;
        self.fps_timer.stop();
        self.fps_timer.start();
        self.running = true;

        while self.running {
            if !self.runner.pump() {
                self.running = false;
                break;
            }

            let events: Vec<Event> = self.runner.events().to_vec();
            for event in &events {
                self.handle_system_event(event)?;
                app.handle_event(self, event);
            }
            if !self.running {
                break;
            }

            let elapsed = self.fps_timer.seconds();
            let mut avg = if elapsed > 0.0 {
                self.frames as f64 / elapsed
            } else {
                0.0
            };
            // matches the readout guard of the original frame counter
            if avg > 2_000_000.0 {
                avg = 0.0;
            }
            self.avg_fps = avg;

            self.delta_ms = self.limiter.frame_time() * 1000.0;
            self.current_fps = if self.delta_ms > 0.0 {
                1000.0 / self.delta_ms
            } else {
                0.0
            };

            let delta_ms = self.delta_ms;
            app.update(self, delta_ms);

            self.canvas.clear(self.background);
            app.draw(self);
            self.canvas.present()?;

            self.frames += 1;
            self.limiter.wait();
        }

        Ok(())
    }

    fn handle_system_event(&mut self, event: &Event) -> Result<(), GameError> {
        match event {
            Event::CloseRequested => self.running = false,
            Event::Resized(size) => {
                // minimized windows report a zero size; keep the last
                // framebuffer instead of failing the frame
                if !usable_window_size(*size) {
                    return Ok(());
                }
                self.window_rect.w = size.x;
                self.window_rect.h = size.y;
                self.canvas.resize(*size)?;
            }
            Event::Moved(pos) => {
                self.window_rect.x = pos.x;
                self.window_rect.y = pos.y;
            }
            _ => {}
        }
        Ok(())
    }

    /// Stop the run loop after the current frame.
    pub fn exit(&mut self) {
        self.running = false;
    }

    pub fn spawn(&mut self, entity: Box<dyn Entity>) -> EntityId {
        self.entities.add(entity)
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        self.entities.remove(id)
    }

    /// Run one entity update pass; despawns requested during the pass are
    /// applied before this returns.
    pub fn update_entities(&mut self, delta_ms: f64) {
        let bounds = Rect::with_size(self.window_rect.w, self.window_rect.h);
        self.entities.update_all(delta_ms, bounds);
    }

    pub fn draw_entities(&mut self) {
        self.entities.draw_all(&mut self.canvas);
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn canvas(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Cached window rectangle: outer origin, inner size.
    pub fn window_rect(&self) -> Rect {
        self.window_rect
    }

    /// Average FPS since [BaseGame::run] started.
    pub fn avg_fps(&self) -> f64 {
        self.avg_fps
    }

    /// FPS derived from the previous frame's wall time.
    pub fn current_fps(&self) -> f64 {
        self.current_fps
    }

    pub fn delta_ms(&self) -> f64 {
        self.delta_ms
    }

    /// How long construction took, in milliseconds.
    pub fn load_millis(&self) -> f64 {
        self.load_timer.milliseconds()
    }
}

fn usable_window_size(size: Point2) -> bool {
    size.x > 0 && size.y > 0
}

impl Drop for BaseGame {
    fn drop(&mut self) {
        self.entities.clear();
        font::set_fallback_font(None);
        canvas::set_fallback_target(None);
    }
}

#[derive(Clone, Debug)]
pub enum GameError {
    /// A [BaseGame] already exists in this process.
    InstanceAlreadyLive,
    Runner(String),
    Canvas(String),
    Font(String),
}

impl From<RunnerError> for GameError {
    fn from(e: RunnerError) -> Self {
        GameError::Runner(e.to_string())
    }
}

impl From<CanvasError> for GameError {
    fn from(e: CanvasError) -> Self {
        GameError::Canvas(e.to_string())
    }
}

impl From<FontError> for GameError {
    fn from(e: FontError) -> Self {
        GameError::Font(e.to_string())
    }
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::InstanceAlreadyLive => {
                write!(f, "a game instance is already live in this process")
            }
            GameError::Runner(e) => write!(f, "runner error: {e}"),
            GameError::Canvas(e) => write!(f, "canvas error: {e}"),
            GameError::Font(e) => write!(f, "font error: {e}"),
        }
    }
}

impl std::error::Error for GameError {}

#[cfg(test)]
mod tests {
    use super::*;

    // single test so parallel test threads never race on the process slot
    #[test]
    fn instance_slot_is_exclusive_until_released() {
        let first = InstanceGuard::acquire().unwrap();

        let second = InstanceGuard::acquire();
        assert!(matches!(second, Err(GameError::InstanceAlreadyLive)));

        // the failed attempt must not have freed the slot under `first`
        assert!(matches!(
            InstanceGuard::acquire(),
            Err(GameError::InstanceAlreadyLive)
        ));

        drop(first);
        let third = InstanceGuard::acquire();
        assert!(third.is_ok());
    }

    #[test]
    fn minimized_window_size_is_not_usable() {
        assert!(!usable_window_size(Point2::new(0, 0)));
        assert!(!usable_window_size(Point2::new(0, 720)));
        assert!(!usable_window_size(Point2::new(1280, 0)));
        assert!(usable_window_size(Point2::new(1280, 720)));
    }
}
