use std::sync::Arc;

use crate::{
    math::Point2,
    runner::{Runner, RunnerError, RunnerRequest},
};

/// A single OS window created through the [Runner].
///
/// The window itself is fixed-size; the run loop still tracks resize and
/// move events for the cached window rectangle.
pub struct Window {
    handle: Arc<winit::window::Window>,
}

impl Window {
    pub fn new(runner: &mut Runner, title: &str, size: Point2) -> Result<Self, RunnerError> {
        let handle = runner.create_window(title, size)?;
        Ok(Self { handle })
    }

    pub fn set_title(&self, runner: &Runner, title: &str) {
        runner.send_request(RunnerRequest::SetTitle(title.to_string()));
    }

    pub fn request_redraw(&self, runner: &Runner) {
        runner.send_request(RunnerRequest::Redraw);
    }

    /// Current inner size in physical pixels.
    pub fn inner_size(&self) -> Point2 {
        self.handle.inner_size().into()
    }

    /// Outer origin of the window; zero when the platform cannot tell.
    pub fn outer_position(&self) -> Point2 {
        self.handle
            .outer_position()
            .map(|pos| Point2::new(pos.x, pos.y))
            .unwrap_or(Point2::ZERO)
    }

    pub(crate) fn handle(&self) -> Arc<winit::window::Window> {
        self.handle.clone()
    }
}
