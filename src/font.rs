use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::math::Vector2;

lazy_static::lazy_static! {
    static ref FALLBACK_FONT: Mutex<Option<Font>> = Mutex::new(None);
}

/// Register (or clear) the process-wide fallback font used by
/// [crate::texture::Texture] when neither an override nor an instance
/// default is set.
pub fn set_fallback_font(font: Option<Font>) {
    *FALLBACK_FONT.lock().unwrap() = font;
}

/// The currently registered fallback font, if any.
pub fn fallback_font() -> Option<Font> {
    FALLBACK_FONT.lock().unwrap().clone()
}

/// A parsed font at a fixed pixel size. Cheap to clone; glyphs are
/// rasterized on demand when text is baked.
#[derive(Clone)]
pub struct Font {
    inner: Arc<FontInner>,
}

struct FontInner {
    font: fontdue::Font,
    size: f32,
    name: String,
    ascent: f32,
    line_height: f32,
    space_width: f32,
}

impl Font {
    /// Parse a font file. Fails if the file is missing or not a usable face.
    pub fn load(path: impl AsRef<Path>, size: f32) -> Result<Self, FontError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| FontError::Io(path.display().to_string(), e.to_string()))?;

        let name = font_family_name(&data)
            .unwrap_or_else(|| path.display().to_string());

        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| FontError::Parse(path.display().to_string(), e.to_string()))?;

        let line_metrics = font
            .horizontal_line_metrics(size)
            .ok_or_else(|| FontError::NoLineMetrics(path.display().to_string()))?;

        let space_width = font.metrics(' ', size).advance_width;

        Ok(Self {
            inner: Arc::new(FontInner {
                font,
                size,
                name,
                ascent: line_metrics.ascent,
                line_height: line_metrics.ascent - line_metrics.descent + line_metrics.line_gap,
                space_width,
            }),
        })
    }

    /// Scan the platform font directories and load the first parseable face.
    pub fn find_system(size: f32) -> Result<Self, FontError> {
        for dir in system_font_dirs() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };

            let mut paths: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    matches!(
                        path.extension().and_then(|ext| ext.to_str()),
                        Some("ttf" | "otf")
                    )
                })
                .collect();
            paths.sort();

            for path in paths {
                match Self::load(&path, size) {
                    Ok(font) => {
                        crate::dbg_log!("using system font {}", font.name());
                        return Ok(font);
                    }
                    Err(_e) => {
                        crate::dbg_log!("skipping {}: {}", path.display(), _e);
                    }
                }
            }
        }

        Err(FontError::NoSystemFont)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn size(&self) -> f32 {
        self.inner.size
    }

    pub fn line_height(&self) -> f32 {
        self.inner.line_height
    }

    /// Layout size of `text` without rasterizing it.
    pub fn measure(&self, text: &str) -> Vector2 {
        let inner = &self.inner;
        let mut width = 0.0f32;
        let mut height = inner.line_height;
        let mut pen_x = 0.0f32;

        for c in text.chars() {
            match c {
                '\n' => {
                    width = width.max(pen_x);
                    pen_x = 0.0;
                    height += inner.line_height;
                }
                ' ' => pen_x += inner.space_width,
                _ => pen_x += inner.font.metrics(c, inner.size).advance_width,
            }
        }

        Vector2::new(width.max(pen_x), height)
    }

    /// Rasterize `text` into a tightly-cropped coverage bitmap
    /// (one byte per pixel, 0 = background). Errors when no glyph of the
    /// text produces any coverage.
    pub fn bake_text(&self, text: &str) -> Result<(Vec<u8>, u32, u32), FontError> {
        // First pass: bounding box over all placed glyphs.
        let mut min = Vector2::new(f32::MAX, f32::MAX);
        let mut max = Vector2::new(f32::MIN, f32::MIN);
        self.walk_glyphs(text, |x0, y0, metrics, _bitmap| {
            min.x = min.x.min(x0);
            min.y = min.y.min(y0);
            max.x = max.x.max(x0 + metrics.width as f32);
            max.y = max.y.max(y0 + metrics.height as f32);
        });

        if min.x == f32::MAX {
            return Err(FontError::NoGlyphs);
        }

        let width = (max.x - min.x).ceil().max(1.0) as usize;
        let height = (max.y - min.y).ceil().max(1.0) as usize;
        let mut buffer = vec![0u8; width * height];

        // Second pass: copy glyph coverage into the cropped buffer.
        self.walk_glyphs(text, |x0, y0, metrics, bitmap| {
            let dest_x = (x0 - min.x) as usize;
            let dest_y = (y0 - min.y) as usize;

            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let src = row * metrics.width + col;
                    let dest = (dest_y + row) * width + dest_x + col;
                    if dest < buffer.len() && src < bitmap.len() {
                        buffer[dest] = buffer[dest].max(bitmap[src]);
                    }
                }
            }
        });

        Ok((buffer, width as u32, height as u32))
    }

    /// Run the pen over `text`, invoking `visit` with each glyph's placed
    /// top-left corner, metrics and coverage bitmap.
    fn walk_glyphs(&self, text: &str, mut visit: impl FnMut(f32, f32, &fontdue::Metrics, &[u8])) {
        let inner = &self.inner;
        let mut pen = Vector2::ZERO;

        for c in text.chars() {
            match c {
                '\n' => {
                    pen.x = 0.0;
                    pen.y += inner.line_height;
                }
                ' ' => pen.x += inner.space_width,
                _ => {
                    let (metrics, bitmap) = inner.font.rasterize(c, inner.size);
                    if !bitmap.is_empty() {
                        let x0 = pen.x + metrics.xmin as f32;
                        let y0 =
                            pen.y + inner.ascent - (metrics.height as f32 + metrics.ymin as f32);
                        visit(x0, y0, &metrics, &bitmap);
                    }
                    pen.x += metrics.advance_width;
                }
            }
        }
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("name", &self.inner.name)
            .field("size", &self.inner.size)
            .finish()
    }
}

fn font_family_name(data: &[u8]) -> Option<String> {
    let face = ttf_parser::Face::parse(data, 0).ok()?;
    face.names()
        .into_iter()
        .find(|name| name.name_id == ttf_parser::name_id::FAMILY)
        .and_then(|name| name.to_string())
}

fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(target_os = "windows")]
    {
        let windir = std::env::var("WINDIR").unwrap_or_else(|_| "C:\\Windows".to_string());
        dirs.push(PathBuf::from(format!("{windir}/Fonts")));
    }
    #[cfg(target_os = "linux")]
    {
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(format!("{home}/.fonts")));
        }
        dirs.push(PathBuf::from("/usr/share/fonts/truetype/dejavu"));
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(format!("{home}/Library/Fonts")));
        }
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
    }

    dirs
}

#[derive(Clone, Debug)]
pub enum FontError {
    /// Reading the file failed; carries the path and the io detail.
    Io(String, String),
    /// The file is not a parseable font face.
    Parse(String, String),
    /// The face has no horizontal line metrics at the requested size.
    NoLineMetrics(String),
    /// The text produced no glyph coverage at all.
    NoGlyphs,
    /// No usable font found in the platform font directories.
    NoSystemFont,
}

impl std::fmt::Display for FontError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontError::Io(path, e) => write!(f, "failed to read font {path}: {e}"),
            FontError::Parse(path, e) => write!(f, "failed to parse font {path}: {e}"),
            FontError::NoLineMetrics(path) => {
                write!(f, "font {path} has no horizontal line metrics")
            }
            FontError::NoGlyphs => write!(f, "text produced no glyphs"),
            FontError::NoSystemFont => write!(f, "no usable system font found"),
        }
    }
}

impl std::error::Error for FontError {}
