use std::path::{Path, PathBuf};

use crate::{
    canvas::{self, Bitmap, Canvas},
    font::{self, Font},
    math::{Color, Rect},
};

/// One decoded image or rendered-text bitmap that knows how to draw itself.
///
/// The render target and font are each resolved through a three-tier chain:
/// explicit override, then the instance default, then the process-wide
/// fallback registered at game construction. Every `load*` call discards the
/// previous bitmap before doing any work.
#[derive(Clone, Debug, Default)]
pub struct Texture {
    bitmap: Option<Bitmap>,
    source_path: Option<PathBuf>,
    target: Option<Canvas>,
    font: Option<Font>,
}

impl Texture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instance-default render target.
    pub fn set_target(&mut self, target: Option<Canvas>) {
        self.target = target;
    }

    /// Set the instance-default font for [Texture::load_text].
    pub fn set_font(&mut self, font: Option<Font>) {
        self.font = font;
    }

    /// Decode an image file, replacing any existing bitmap. On failure the
    /// texture is left empty.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), TextureError> {
        self.free();

        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| TextureError::ImageLoad(path.display().to_string(), e.to_string()))?
            .to_rgba8();

        let (width, height) = image.dimensions();
        self.bitmap = Some(Bitmap::new(image.into_raw(), width, height));
        self.source_path = Some(path.to_path_buf());

        Ok(())
    }

    /// Rasterize `text` in `color`, replacing any existing bitmap. The font
    /// comes from `font_override`, the instance default, or the process
    /// fallback, in that order. On failure the texture is left empty.
    pub fn load_text(
        &mut self,
        text: &str,
        color: Color,
        font_override: Option<&Font>,
    ) -> Result<(), TextureError> {
        self.free();

        let font = self.resolve_font(font_override)?;
        let (coverage, width, height) = font
            .bake_text(text)
            .map_err(|e| TextureError::TextRender(e.to_string()))?;

        // Tint the coverage bitmap: glyph coverage scales the text alpha.
        let mut data = Vec::with_capacity(coverage.len() * 4);
        for &level in &coverage {
            data.push(color.r);
            data.push(color.g);
            data.push(color.b);
            data.push(((level as u16 * color.a as u16) / 255) as u8);
        }

        self.bitmap = Some(Bitmap::new(data, width, height));

        Ok(())
    }

    /// Draw the current bitmap at `(x, y)` on the render target resolved
    /// through the fallback chain. `clip` selects a source sub-rectangle.
    pub fn render(&self, x: i32, y: i32) -> Result<(), TextureError> {
        self.render_to(None, x, y, None)
    }

    pub fn render_to(
        &self,
        target_override: Option<&Canvas>,
        x: i32,
        y: i32,
        clip: Option<Rect>,
    ) -> Result<(), TextureError> {
        let mut target = self.resolve_target(target_override)?;
        let bitmap = self.bitmap.as_ref().ok_or(TextureError::NothingLoaded)?;
        target.blit(bitmap, x, y, clip);
        Ok(())
    }

    /// Release the bitmap. Idempotent.
    pub fn free(&mut self) {
        self.bitmap = None;
        self.source_path = None;
    }

    pub fn width(&self) -> i32 {
        self.bitmap.as_ref().map_or(0, |b| b.width as i32)
    }

    pub fn height(&self) -> i32 {
        self.bitmap.as_ref().map_or(0, |b| b.height as i32)
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    fn resolve_target(&self, target_override: Option<&Canvas>) -> Result<Canvas, TextureError> {
        resolve_resource(target_override, self.target.as_ref(), canvas::fallback_target)
            .ok_or(TextureError::NoRenderTarget)
    }

    fn resolve_font(&self, font_override: Option<&Font>) -> Result<Font, TextureError> {
        resolve_resource(font_override, self.font.as_ref(), font::fallback_font)
            .ok_or(TextureError::NoFont)
    }
}

/// Three-tier lookup shared by the render-target and font chains: explicit
/// override, then the instance default, then the process-wide fallback.
fn resolve_resource<T: Clone>(
    explicit: Option<&T>,
    instance: Option<&T>,
    fallback: impl FnOnce() -> Option<T>,
) -> Option<T> {
    explicit
        .cloned()
        .or_else(|| instance.cloned())
        .or_else(fallback)
}

#[derive(Clone, Debug)]
pub enum TextureError {
    /// Decoding the image file failed; carries the path and the detail.
    ImageLoad(String, String),
    /// Rasterizing the text failed.
    TextRender(String),
    /// No font from any of: override, instance default, process fallback.
    NoFont,
    /// No render target from any of: override, instance default, process
    /// fallback.
    NoRenderTarget,
    /// Render was called before anything was loaded.
    NothingLoaded,
}

impl std::fmt::Display for TextureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureError::ImageLoad(path, e) => write!(f, "failed to load image {path}: {e}"),
            TextureError::TextRender(e) => write!(f, "failed to render text: {e}"),
            TextureError::NoFont => write!(f, "no font available for text rendering"),
            TextureError::NoRenderTarget => write!(f, "no render target available"),
            TextureError::NothingLoaded => write!(f, "texture has nothing loaded"),
        }
    }
}

impl std::error::Error for TextureError {}

#[cfg(test)]
mod tests {
    use super::*;

    // The process fallbacks are deliberately left unset by every test here,
    // so the chains bottom out.

    fn texture_with_bitmap() -> Texture {
        let mut texture = Texture::new();
        texture.bitmap = Some(Bitmap::new(vec![0xFF; 4], 1, 1));
        texture
    }

    #[test]
    fn load_text_without_any_font_errors() {
        let mut texture = Texture::new();
        let err = texture.load_text("hi", Color::BLACK, None).unwrap_err();
        assert!(matches!(err, TextureError::NoFont));
    }

    #[test]
    fn render_without_any_target_errors() {
        let texture = texture_with_bitmap();
        let err = texture.render(0, 0).unwrap_err();
        assert!(matches!(err, TextureError::NoRenderTarget));
    }

    #[test]
    fn load_failure_discards_previous_bitmap() {
        let mut texture = texture_with_bitmap();
        assert_eq!(texture.width(), 1);

        let err = texture.load("/definitely/not/a/real/image.png").unwrap_err();
        assert!(matches!(err, TextureError::ImageLoad(..)));
        assert_eq!(texture.width(), 0);
        assert_eq!(texture.height(), 0);
    }

    #[test]
    fn resolution_prefers_override_then_instance_then_fallback() {
        assert_eq!(resolve_resource(Some(&1), Some(&2), || Some(3)), Some(1));
        assert_eq!(resolve_resource(None, Some(&2), || Some(3)), Some(2));
        assert_eq!(resolve_resource(None, None, || Some(3)), Some(3));
        assert_eq!(resolve_resource::<i32>(None, None, || None), None);
    }

    #[test]
    fn fallback_is_not_consulted_when_an_earlier_tier_hits() {
        let resolved = resolve_resource(Some(&1), None, || -> Option<i32> {
            panic!("fallback must stay untouched")
        });
        assert_eq!(resolved, Some(1));
    }

    #[test]
    fn free_is_idempotent() {
        let mut texture = texture_with_bitmap();
        texture.free();
        texture.free();
        assert_eq!(texture.width(), 0);
        assert!(texture.source_path().is_none());
    }
}
