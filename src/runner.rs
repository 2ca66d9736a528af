use std::{sync::Mutex, thread::ThreadId, time::Duration};

use smol_str::SmolStr;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window as WinitWindow, WindowAttributes, WindowId},
};

#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;

#[cfg(all(not(feature = "x11"), target_os = "linux"))]
use winit::platform::wayland::EventLoopBuilderExtWayland;

#[cfg(all(feature = "x11", target_os = "linux"))]
use winit::platform::x11::EventLoopBuilderExtX11;

use crate::math::Point2;

// The event loop is locked to the thread that first created one; winit
// panics otherwise and the panic message is useless, so we check up front.
lazy_static::lazy_static! {
    static ref LOOP_THREAD_ID: Mutex<Option<ThreadId>> = Mutex::new(None);
}

/// Pump-driven wrapper around winit's [EventLoop], sized for one window.
///
/// Each call to [Runner::pump] drains the pending OS events and translates
/// them into [Event]s the game loop consumes from [Runner::events].
pub struct Runner {
    event_loop: EventLoop<RunnerRequest>,
    proxy: EventLoopProxy<RunnerRequest>,
    handler: RunnerHandler,
    pending_events: Vec<Event>,
}

impl Runner {
    pub fn new() -> Result<Self, RunnerError> {
        let thread_id = std::thread::current().id();

        {
            let mut current = LOOP_THREAD_ID.lock().unwrap();
            match *current {
                None => *current = Some(thread_id),
                Some(owner) if owner != thread_id => {
                    return Err(RunnerError::ThreadMismatch);
                }
                _ => {}
            }
        }

        // Winit panics rather than erroring when a second loop already
        // exists in this process.
        let event_loop = std::panic::catch_unwind(|| {
            let mut builder = EventLoop::<RunnerRequest>::with_user_event();

            #[cfg(any(target_os = "windows", target_os = "linux"))]
            {
                builder.with_any_thread(true);
            }

            builder.build()
        })
        .map_err(|_| RunnerError::EventLoopPanic)?
        .map_err(|_| RunnerError::EventLoopFailed)?;

        let proxy = event_loop.create_proxy();

        Ok(Self {
            event_loop,
            proxy,
            handler: RunnerHandler::new(),
            pending_events: Vec::new(),
        })
    }

    /// Ask the loop to create the window and pump until it exists.
    pub(crate) fn create_window(
        &mut self,
        title: &str,
        size: Point2,
    ) -> Result<std::sync::Arc<WinitWindow>, RunnerError> {
        self.proxy
            .send_event(RunnerRequest::CreateWindow {
                title: title.to_string(),
                size,
            })
            .map_err(|_| RunnerError::EventLoopClosed)?;

        self.event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler);

        self.handler.window.clone().ok_or_else(|| {
            let detail = self
                .handler
                .last_error
                .take()
                .unwrap_or_else(|| "window never materialized".to_string());
            RunnerError::WindowCreation(detail)
        })
    }

    pub(crate) fn send_request(&self, request: RunnerRequest) {
        _ = self.proxy.send_event(request);
    }

    /// Drain all pending OS events. Returns false once the loop has exited
    /// and no further events will arrive.
    pub fn pump(&mut self) -> bool {
        self.pending_events.clear();

        match self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler)
        {
            PumpStatus::Continue => {
                self.pending_events.append(&mut self.handler.events);
                true
            }
            PumpStatus::Exit(_code) => {
                crate::dbg_log!("event loop exited with code {}", _code);
                false
            }
        }
    }

    /// The events translated by the most recent [Runner::pump].
    pub fn events(&self) -> &[Event] {
        &self.pending_events
    }
}

pub(crate) enum RunnerRequest {
    CreateWindow { title: String, size: Point2 },
    SetTitle(String),
    Redraw,
}

struct RunnerHandler {
    window: Option<std::sync::Arc<WinitWindow>>,
    window_id: Option<WindowId>,
    events: Vec<Event>,
    last_error: Option<String>,
}

impl RunnerHandler {
    fn new() -> Self {
        Self {
            window: None,
            window_id: None,
            events: Vec::new(),
            last_error: None,
        }
    }
}

impl ApplicationHandler<RunnerRequest> for RunnerHandler {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: event::WindowEvent,
    ) {
        if self.window_id != Some(window_id) {
            return;
        }

        match event {
            event::WindowEvent::CloseRequested => {
                self.events.push(Event::CloseRequested);
            }
            event::WindowEvent::Resized(size) => {
                self.events
                    .push(Event::Resized(Point2::new(size.width, size.height)));
            }
            event::WindowEvent::Moved(pos) => {
                self.events.push(Event::Moved(Point2::new(pos.x, pos.y)));
            }
            event::WindowEvent::Focused(focused) => {
                self.events.push(Event::Focused(focused));
            }
            event::WindowEvent::RedrawRequested => {
                self.events.push(Event::RedrawRequested);
            }
            event::WindowEvent::KeyboardInput {
                event,
                is_synthetic,
                ..
            } => {
                if is_synthetic {
                    return;
                }

                let pressed = event.state == event::ElementState::Pressed;
                let key = match event.logical_key {
                    Key::Character(ref smol_str) => Some(smol_str.clone()),
                    Key::Named(ref named_key) => named_key_to_str(named_key),
                    _ => None,
                };

                if let Some(key) = key {
                    self.events.push(Event::KeyboardInput {
                        key,
                        pressed,
                        repeat: event.repeat,
                    });
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, request: RunnerRequest) {
        match request {
            RunnerRequest::CreateWindow { title, size } => {
                let size: PhysicalSize<u32> = PhysicalSize::new(size.x as u32, size.y as u32);
                let attributes = WindowAttributes::default()
                    .with_title(title)
                    .with_visible(true)
                    .with_inner_size(size)
                    .with_resizable(false)
                    .with_max_inner_size(size)
                    .with_min_inner_size(size);

                match event_loop.create_window(attributes) {
                    Ok(window) => {
                        self.window_id = Some(window.id());
                        self.window = Some(std::sync::Arc::new(window));
                    }
                    Err(e) => {
                        self.last_error = Some(format!("{e}"));
                    }
                }
            }
            RunnerRequest::SetTitle(title) => {
                if let Some(window) = &self.window {
                    window.set_title(&title);
                }
            }
            RunnerRequest::Redraw => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
        }
    }
}

/// Events the run loop and game layer consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The user asked to close the window (X button, Alt+F4, ...).
    CloseRequested,
    /// The window's inner size changed.
    Resized(Point2),
    /// The window was moved; position is the new outer origin.
    Moved(Point2),
    /// Focus gained or lost.
    Focused(bool),
    /// The OS asked for a redraw.
    RedrawRequested,
    /// A key was pressed or released.
    KeyboardInput {
        /// `"a"`, `"Space"`, `"Shift"`, `"Escape"`, ... as winit reports it.
        key: SmolStr,
        pressed: bool,
        /// True for OS key-repeat events while the key is held.
        repeat: bool,
    },
}

pub(crate) fn named_key_to_str(key: &NamedKey) -> Option<SmolStr> {
    match key {
        NamedKey::Alt => Some(SmolStr::new("Alt")),
        NamedKey::Control => Some(SmolStr::new("Control")),
        NamedKey::Shift => Some(SmolStr::new("Shift")),
        NamedKey::Meta => Some(SmolStr::new("Meta")),
        NamedKey::Super => Some(SmolStr::new("Super")),
        NamedKey::Enter => Some(SmolStr::new("Enter")),
        NamedKey::Tab => Some(SmolStr::new("Tab")),
        NamedKey::Space => Some(SmolStr::new("Space")),
        NamedKey::ArrowDown => Some(SmolStr::new("ArrowDown")),
        NamedKey::ArrowLeft => Some(SmolStr::new("ArrowLeft")),
        NamedKey::ArrowRight => Some(SmolStr::new("ArrowRight")),
        NamedKey::ArrowUp => Some(SmolStr::new("ArrowUp")),
        NamedKey::End => Some(SmolStr::new("End")),
        NamedKey::Home => Some(SmolStr::new("Home")),
        NamedKey::PageDown => Some(SmolStr::new("PageDown")),
        NamedKey::PageUp => Some(SmolStr::new("PageUp")),
        NamedKey::Backspace => Some(SmolStr::new("Backspace")),
        NamedKey::Delete => Some(SmolStr::new("Delete")),
        NamedKey::Insert => Some(SmolStr::new("Insert")),
        NamedKey::Escape => Some(SmolStr::new("Escape")),
        NamedKey::Pause => Some(SmolStr::new("Pause")),
        NamedKey::F1 => Some(SmolStr::new("F1")),
        NamedKey::F2 => Some(SmolStr::new("F2")),
        NamedKey::F3 => Some(SmolStr::new("F3")),
        NamedKey::F4 => Some(SmolStr::new("F4")),
        NamedKey::F5 => Some(SmolStr::new("F5")),
        NamedKey::F6 => Some(SmolStr::new("F6")),
        NamedKey::F7 => Some(SmolStr::new("F7")),
        NamedKey::F8 => Some(SmolStr::new("F8")),
        NamedKey::F9 => Some(SmolStr::new("F9")),
        NamedKey::F10 => Some(SmolStr::new("F10")),
        NamedKey::F11 => Some(SmolStr::new("F11")),
        NamedKey::F12 => Some(SmolStr::new("F12")),
        _ => None,
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunnerError {
    /// An event loop already lives on a different thread.
    ThreadMismatch,
    /// Winit panicked while building the loop (second loop in one process).
    EventLoopPanic,
    /// Winit reported an error building the loop.
    EventLoopFailed,
    /// The loop has already shut down.
    EventLoopClosed,
    /// The window could not be created; carries the platform detail.
    WindowCreation(String),
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerError::ThreadMismatch => {
                write!(f, "event loop is owned by a different thread")
            }
            RunnerError::EventLoopPanic => write!(f, "winit panicked creating the event loop"),
            RunnerError::EventLoopFailed => write!(f, "failed to create the event loop"),
            RunnerError::EventLoopClosed => write!(f, "the event loop has shut down"),
            RunnerError::WindowCreation(detail) => {
                write!(f, "failed to create window: {detail}")
            }
        }
    }
}

impl std::error::Error for RunnerError {}
