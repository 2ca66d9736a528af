use cellbounce::{error_log, prelude::*};

const SCREEN_WIDTH: i32 = 1280;
const SCREEN_HEIGHT: i32 = 720;
const TARGET_FPS: u32 = 60;
const FONT_SIZE: f32 = 22.0;
const TEXT_COLOR: Color = Color::BLACK;
const TEXT_PADDING: i32 = 6;
const WINDOW_TITLE: &str = "Cell Bounce";
const STARTUP_CELLS: usize = 4;
const BATCH_SIZE: usize = 10;

struct CellDemo {
    paused: bool,
    space_pressed: bool,
    shift_held: bool,
    load_label: Texture,
    fps_label: Texture,
    hint_label: Texture,
}

impl CellDemo {
    // everything holds still until the first spacebar, hence the hint
    fn new() -> Self {
        Self {
            paused: true,
            space_pressed: false,
            shift_held: false,
            load_label: Texture::new(),
            fps_label: Texture::new(),
            hint_label: Texture::new(),
        }
    }

    fn init(&mut self, base: &mut BaseGame) {
        let text = format!("time to load: {:.0} ms", base.load_millis());
        if let Err(e) = self.load_label.load_text(&text, TEXT_COLOR, None) {
            error_log!("load-time label: {}", e);
        }
        if let Err(e) = self.hint_label.load_text("Press Spacebar!", TEXT_COLOR, None) {
            error_log!("hint label: {}", e);
        }

        let bounds = Rect::with_size(SCREEN_WIDTH, SCREEN_HEIGHT);
        for _ in 0..STARTUP_CELLS {
            base.spawn(Box::new(Cell::spawn(bounds)));
        }
    }

    fn spawn_cells(&self, base: &mut BaseGame, count: usize) {
        let rect = base.window_rect();
        let bounds = Rect::with_size(rect.w, rect.h);
        for _ in 0..count {
            base.spawn(Box::new(Cell::spawn(bounds)));
        }
    }
}

impl Game for CellDemo {
    fn handle_event(&mut self, base: &mut BaseGame, event: &Event) {
        let Event::KeyboardInput {
            key,
            pressed,
            repeat,
        } = event
        else {
            return;
        };

        if key.as_str() == "Shift" {
            self.shift_held = *pressed;
            return;
        }
        if !pressed || *repeat {
            return;
        }

        match key.as_str() {
            "Space" => {
                self.paused = !self.paused;
                self.space_pressed = true;
            }
            "c" | "C" => {
                let count = if self.shift_held { BATCH_SIZE } else { 1 };
                self.spawn_cells(base, count);
            }
            "Escape" => base.exit(),
            _ => {}
        }
    }

    fn update(&mut self, base: &mut BaseGame, delta_ms: f64) {
        if self.paused {
            return;
        }
        base.update_entities(delta_ms);

        // swap in the new readout only when rasterization worked
        let mut staged = Texture::new();
        let text = format!("average fps: {:.1}", base.avg_fps());
        match staged.load_text(&text, TEXT_COLOR, None) {
            Ok(()) => self.fps_label = staged,
            Err(e) => error_log!("fps label: {}", e),
        }
    }

    fn draw(&mut self, base: &mut BaseGame) {
        base.draw_entities();

        let mut y = TEXT_PADDING;
        if let Err(e) = self.load_label.render(TEXT_PADDING, y) {
            error_log!("load-time label: {}", e);
        }
        y += self.load_label.height() + TEXT_PADDING;
        // nothing to show before the first unpaused frame
        if self.fps_label.width() > 0 {
            if let Err(e) = self.fps_label.render(TEXT_PADDING, y) {
                error_log!("fps label: {}", e);
            }
        }

        if !self.space_pressed {
            let rect = base.window_rect();
            let x = (rect.w - self.hint_label.width()) / 2;
            let y = rect.h - self.hint_label.height() - TEXT_PADDING;
            if let Err(e) = self.hint_label.render(x, y) {
                error_log!("hint label: {}", e);
            }
        }
    }
}

fn main() {
    let config = GameConfig {
        title: WINDOW_TITLE.to_string(),
        width: SCREEN_WIDTH,
        height: SCREEN_HEIGHT,
        target_fps: TARGET_FPS,
        font_size: FONT_SIZE,
        ..GameConfig::default()
    };

    let mut base = match BaseGame::new(config) {
        Ok(base) => base,
        Err(e) => {
            error_log!("failed to start: {}", e);
            std::process::exit(1);
        }
    };

    let mut demo = CellDemo::new();
    demo.init(&mut base);
    if let Err(e) = base.run(&mut demo) {
        error_log!("run loop aborted: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_waits_for_first_spacebar() {
        let demo = CellDemo::new();
        assert!(demo.paused);
        assert!(!demo.space_pressed);
    }
}
