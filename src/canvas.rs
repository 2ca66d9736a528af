use std::{cell::RefCell, num::NonZero, sync::Arc};

use crate::{
    math::{Color, Point2, Rect},
    utils::ArcRef,
    window::Window,
};

type Surface = softbuffer::Surface<Arc<winit::window::Window>, Arc<winit::window::Window>>;
type Context = softbuffer::Context<Arc<winit::window::Window>>;

// Render targets are bound to the window's thread, so the process-wide
// fallback lives in a thread-local rather than a global.
thread_local! {
    static FALLBACK_TARGET: RefCell<Option<Canvas>> = const { RefCell::new(None) };
}

/// Register (or clear) the process-wide fallback render target used by
/// [crate::texture::Texture] when neither an override nor an instance
/// default is set.
pub fn set_fallback_target(canvas: Option<Canvas>) {
    FALLBACK_TARGET.with(|slot| *slot.borrow_mut() = canvas);
}

/// The currently registered fallback render target, if any.
pub fn fallback_target() -> Option<Canvas> {
    FALLBACK_TARGET.with(|slot| slot.borrow().clone())
}

/// Software render target: a CPU framebuffer plus the softbuffer surface it
/// is presented through. Clone-able shared handle; all drawing between
/// [Canvas::clear] and [Canvas::present] lands in the framebuffer.
#[derive(Clone)]
pub struct Canvas {
    pub(crate) inner: ArcRef<CanvasInner>,
}

pub(crate) struct CanvasInner {
    _context: Context,
    surface: Surface,
    framebuffer: Framebuffer,
}

impl Canvas {
    pub fn new(window: &Window) -> Result<Self, CanvasError> {
        let handle = window.handle();

        let context = Context::new(handle.clone())
            .map_err(|e| CanvasError::ContextCreation(format!("{e}")))?;
        let surface = Surface::new(&context, handle)
            .map_err(|e| CanvasError::SurfaceCreation(format!("{e}")))?;

        let size = window.inner_size();
        let mut canvas = Self {
            inner: ArcRef::new(CanvasInner {
                _context: context,
                surface,
                framebuffer: Framebuffer::new(size.x.max(1) as usize, size.y.max(1) as usize),
            }),
        };
        canvas.resize(size)?;

        Ok(canvas)
    }

    pub fn size(&self) -> Point2 {
        let inner = self.inner.borrow();
        Point2::new(inner.framebuffer.width as i32, inner.framebuffer.height as i32)
    }

    /// Resize both the framebuffer and the presentation surface.
    pub fn resize(&mut self, size: Point2) -> Result<(), CanvasError> {
        if size.x <= 0 || size.y <= 0 {
            return Err(CanvasError::InvalidSize(size.x, size.y));
        }

        let width = NonZero::new(size.x as u32).ok_or(CanvasError::InvalidSize(size.x, size.y))?;
        let height = NonZero::new(size.y as u32).ok_or(CanvasError::InvalidSize(size.x, size.y))?;

        let mut inner = self.inner.borrow_mut();
        inner
            .surface
            .resize(width, height)
            .map_err(|e| CanvasError::SurfaceResize(format!("{e}")))?;
        inner.framebuffer.resize(size.x as usize, size.y as usize);

        Ok(())
    }

    pub fn clear(&mut self, color: Color) {
        self.inner.borrow_mut().framebuffer.clear(color);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.inner.borrow_mut().framebuffer.fill_rect(rect, color);
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Color) {
        self.inner
            .borrow_mut()
            .framebuffer
            .fill_circle(cx, cy, radius, color);
    }

    /// Blit an RGBA bitmap with alpha blending. `clip` selects a sub-rect of
    /// the source bitmap; the whole bitmap when [None].
    pub fn blit(&mut self, bitmap: &Bitmap, x: i32, y: i32, clip: Option<Rect>) {
        self.inner.borrow_mut().framebuffer.blit(bitmap, x, y, clip);
    }

    /// Copy the framebuffer into the surface and flip it to the screen.
    pub fn present(&mut self) -> Result<(), CanvasError> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;

        let mut buffer = inner
            .surface
            .buffer_mut()
            .map_err(|e| CanvasError::BufferFetch(format!("{e}")))?;

        let pixels = &inner.framebuffer.pixels;
        if buffer.len() < pixels.len() {
            return Err(CanvasError::BufferTooSmall);
        }
        buffer[..pixels.len()].copy_from_slice(pixels);

        buffer
            .present()
            .map_err(|e| CanvasError::Present(format!("{e}")))?;

        Ok(())
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas").field("size", &self.size()).finish()
    }
}

/// Decoded RGBA image data, as produced by texture loading and text baking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Bitmap {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height * 4) as usize);
        Self {
            data,
            width,
            height,
        }
    }
}

/// CPU pixel store with the drawing primitives the demos need. Pixels are
/// packed `0x00RRGGBB`, the layout softbuffer expects.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    pub pixels: Vec<u32>,
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, 0);
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color.to_pixel());
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x >= self.width || y >= self.height || color.a == 0 {
            return;
        }

        let index = y * self.width + x;
        if color.a == 0xFF {
            self.pixels[index] = color.to_pixel();
            return;
        }

        // result = front * alpha + back * (1 - alpha), integer math
        let back = Color::from_pixel(self.pixels[index]);
        let a = color.a as u16;
        let inv_a = 255 - a;
        let blend = |front: u8, back: u8| {
            ((front as u16 * a + back as u16 * inv_a) / 255) as u8
        };
        let blended = Color::rgb(
            blend(color.r, back.r),
            blend(color.g, back.g),
            blend(color.b, back.b),
        );
        self.pixels[index] = blended.to_pixel();
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = rect.right().min(self.width as i32);
        let y1 = rect.bottom().min(self.height as i32);

        for y in y0..y1 {
            for x in x0..x1 {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
    }

    /// Filled circle, scanning the bounding box and testing the squared
    /// distance per pixel.
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Color) {
        let r_sq = radius * radius;
        let y0 = (cy - radius).max(0);
        let y1 = (cy + radius).min(self.height as i32 - 1);
        let x0 = (cx - radius).max(0);
        let x1 = (cx + radius).min(self.width as i32 - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r_sq {
                    self.set_pixel(x as usize, y as usize, color);
                }
            }
        }
    }

    pub fn blit(&mut self, bitmap: &Bitmap, x: i32, y: i32, clip: Option<Rect>) {
        let src = clip.unwrap_or(Rect::with_size(bitmap.width as i32, bitmap.height as i32));

        for row in 0..src.h {
            let src_y = src.y + row;
            if src_y < 0 || src_y >= bitmap.height as i32 {
                continue;
            }
            for col in 0..src.w {
                let src_x = src.x + col;
                if src_x < 0 || src_x >= bitmap.width as i32 {
                    continue;
                }

                let offset = ((src_y as u32 * bitmap.width + src_x as u32) * 4) as usize;
                let color = Color::new(
                    bitmap.data[offset],
                    bitmap.data[offset + 1],
                    bitmap.data[offset + 2],
                    bitmap.data[offset + 3],
                );

                let dest_x = x + col;
                let dest_y = y + row;
                if dest_x >= 0 && dest_y >= 0 {
                    self.set_pixel(dest_x as usize, dest_y as usize, color);
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum CanvasError {
    ContextCreation(String),
    SurfaceCreation(String),
    SurfaceResize(String),
    InvalidSize(i32, i32),
    BufferFetch(String),
    BufferTooSmall,
    Present(String),
}

impl std::fmt::Display for CanvasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanvasError::ContextCreation(e) => write!(f, "failed to create canvas context: {e}"),
            CanvasError::SurfaceCreation(e) => write!(f, "failed to create canvas surface: {e}"),
            CanvasError::SurfaceResize(e) => write!(f, "failed to resize canvas surface: {e}"),
            CanvasError::InvalidSize(w, h) => write!(f, "invalid canvas size: {w}x{h}"),
            CanvasError::BufferFetch(e) => write!(f, "failed to fetch surface buffer: {e}"),
            CanvasError::BufferTooSmall => write!(f, "surface buffer smaller than framebuffer"),
            CanvasError::Present(e) => write!(f, "failed to present canvas: {e}"),
        }
    }
}

impl std::error::Error for CanvasError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_fills_every_pixel() {
        let mut fb = Framebuffer::new(4, 3);
        fb.clear(Color::RED);
        assert!(fb.pixels.iter().all(|&p| p == Color::RED.to_pixel()));
    }

    #[test]
    fn fill_rect_is_clipped_to_bounds() {
        let mut fb = Framebuffer::new(4, 4);
        fb.fill_rect(Rect::new(2, 2, 10, 10), Color::GREEN);
        assert_eq!(fb.pixel(3, 3), Color::GREEN.to_pixel());
        assert_eq!(fb.pixel(1, 1), 0);
    }

    #[test]
    fn fill_circle_covers_center_not_corners() {
        let mut fb = Framebuffer::new(21, 21);
        fb.fill_circle(10, 10, 5, Color::BLUE);
        assert_eq!(fb.pixel(10, 10), Color::BLUE.to_pixel());
        assert_eq!(fb.pixel(10, 5), Color::BLUE.to_pixel());
        assert_eq!(fb.pixel(0, 0), 0);
        // corner of the bounding box is outside the circle
        assert_eq!(fb.pixel(5, 5), 0);
    }

    #[test]
    fn circle_outside_bounds_does_not_panic() {
        let mut fb = Framebuffer::new(8, 8);
        fb.fill_circle(-10, -10, 5, Color::BLUE);
        fb.fill_circle(100, 4, 6, Color::BLUE);
        assert!(fb.pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn alpha_blend_halfway() {
        let mut fb = Framebuffer::new(1, 1);
        fb.clear(Color::BLACK);
        fb.fill_rect(Rect::with_size(1, 1), Color::new(0xFF, 0xFF, 0xFF, 0x80));
        let blended = Color::from_pixel(fb.pixel(0, 0));
        assert_eq!(blended.r, blended.g);
        assert!(blended.r > 0x70 && blended.r < 0x90);
    }

    #[test]
    fn transparent_pixels_leave_background() {
        let mut fb = Framebuffer::new(2, 1);
        fb.clear(Color::WHITE);
        let bitmap = Bitmap::new(vec![0xFF, 0, 0, 0xFF, 0, 0xFF, 0, 0x00], 2, 1);
        fb.blit(&bitmap, 0, 0, None);
        assert_eq!(fb.pixel(0, 0), Color::RED.to_pixel());
        assert_eq!(fb.pixel(1, 0), Color::WHITE.to_pixel());
    }

    #[test]
    fn blit_clip_selects_source_subrect() {
        let mut fb = Framebuffer::new(2, 2);
        // 2x1 bitmap: red then green
        let bitmap = Bitmap::new(vec![0xFF, 0, 0, 0xFF, 0, 0xFF, 0, 0xFF], 2, 1);
        fb.blit(&bitmap, 0, 0, Some(Rect::new(1, 0, 1, 1)));
        assert_eq!(fb.pixel(0, 0), Color::GREEN.to_pixel());
        assert_eq!(fb.pixel(1, 0), 0);
    }

    #[test]
    fn blit_partially_off_screen() {
        let mut fb = Framebuffer::new(2, 2);
        let bitmap = Bitmap::new(vec![0xFF; 16], 2, 2);
        fb.blit(&bitmap, -1, -1, None);
        assert_eq!(fb.pixel(0, 0), Color::WHITE.to_pixel());
        assert_eq!(fb.pixel(1, 1), 0);
    }
}
