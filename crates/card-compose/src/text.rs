//! Font lookup and text rasterization

use crate::types::{FieldStyle, LayerWindow, TextAlign};
use image::{Rgba, RgbaImage};
use rusttype::{Font, Scale, point};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

type CachedFont = Option<Arc<Font<'static>>>;

/// Font database plus a cache of parsed faces
pub struct FontBook {
    db: fontdb::Database,
    parsed: RwLock<HashMap<fontdb::ID, CachedFont>>,
    warned_missing: AtomicBool,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::empty()
    }
}

impl FontBook {
    /// A book with no fonts; text layers render empty
    pub fn empty() -> Self {
        Self {
            db: fontdb::Database::new(),
            parsed: RwLock::new(HashMap::new()),
            warned_missing: AtomicBool::new(false),
        }
    }

    /// Installed system fonts
    pub fn system() -> Self {
        let mut book = Self::empty();
        book.db.load_system_fonts();
        log::debug!("Loaded {} system font faces", book.db.len());
        book
    }

    /// System fonts plus extra directories and files
    pub fn with_extra<P: AsRef<Path>>(dirs: &[P], files: &[P]) -> Self {
        let mut book = Self::system();
        for dir in dirs {
            book.load_dir(dir);
        }
        for file in files {
            book.load_file(file);
        }
        book
    }

    pub fn load_dir(&mut self, dir: impl AsRef<Path>) {
        let before = self.db.len();
        self.db.load_fonts_dir(dir.as_ref());
        log::debug!(
            "Loaded {} font faces from {}",
            self.db.len() - before,
            dir.as_ref().display()
        );
    }

    pub fn load_file(&mut self, file: impl AsRef<Path>) {
        if let Err(e) = self.db.load_font_file(file.as_ref()) {
            log::warn!("Could not load font {}: {}", file.as_ref().display(), e);
        }
    }

    pub fn load_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Best face for a style: the named family, else any sans-serif
    pub fn font_for(&self, style: &FieldStyle) -> Option<Arc<Font<'static>>> {
        let weight = if style.bold {
            fontdb::Weight::BOLD
        } else {
            fontdb::Weight::NORMAL
        };
        let font_style = if style.italic {
            fontdb::Style::Italic
        } else {
            fontdb::Style::Normal
        };

        let query = fontdb::Query {
            families: &[
                fontdb::Family::Name(&style.font_family),
                fontdb::Family::SansSerif,
            ],
            weight,
            stretch: fontdb::Stretch::Normal,
            style: font_style,
        };
        let id = self
            .db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|face| face.id))?;

        if let Some(cached) = self.parsed.read().unwrap_or_else(|e| e.into_inner()).get(&id) {
            return cached.clone();
        }

        let font = self
            .db
            .with_face_data(id, |data, index| {
                Font::try_from_vec_and_index(data.to_vec(), index)
            })
            .flatten()
            .map(Arc::new);
        if font.is_none() {
            log::warn!("Font face {:?} could not be parsed", id);
        }

        self.parsed
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, font.clone());
        font
    }

    /// Draw `text` into a transparent `width` x `height` layer
    ///
    /// Lines are centered vertically as a block and anchored horizontally
    /// by the style's alignment. Anything outside the layer is clipped.
    pub fn rasterize(&self, text: &str, style: &FieldStyle, width: u32, height: u32) -> RgbaImage {
        self.rasterize_window(text, style, width, height, LayerWindow::full(width, height))
    }

    /// Like [`FontBook::rasterize`] but only allocates and draws `window`
    ///
    /// Text is laid out against the full `width` x `height` field, so a
    /// clipped field shows the same pixels it would unclipped.
    pub fn rasterize_window(
        &self,
        text: &str,
        style: &FieldStyle,
        width: u32,
        height: u32,
        window: LayerWindow,
    ) -> RgbaImage {
        let mut layer = RgbaImage::new(window.width, window.height);
        if text.trim().is_empty() {
            return layer;
        }

        let Some(font) = self.font_for(style) else {
            if !self.warned_missing.swap(true, Ordering::Relaxed) {
                log::warn!("No fonts available; text fields will be left blank");
            }
            return layer;
        };

        let color = parse_color(&style.color).unwrap_or_else(|| {
            log::warn!("Unrecognized color {:?}, using black", style.color);
            Rgba([0, 0, 0, 255])
        });

        let scale = Scale::uniform(style.font_size.max(1.0));
        let v_metrics = font.v_metrics(scale);
        let line_height = v_metrics.ascent - v_metrics.descent + v_metrics.line_gap;
        let lines: Vec<&str> = text.lines().collect();
        let block_height = line_height * lines.len() as f32 - v_metrics.line_gap;
        let top = (height as f32 - block_height) / 2.0;

        for (i, line) in lines.iter().enumerate() {
            let baseline = top + v_metrics.ascent + i as f32 * line_height;
            let line_width = measure(&font, scale, line);
            let x = match style.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (width as f32 - line_width) / 2.0,
                TextAlign::Right => width as f32 - line_width,
            };
            draw_line(
                &mut layer,
                &font,
                scale,
                x - window.x as f32,
                baseline - window.y as f32,
                color,
                line,
            );
        }

        layer
    }
}

fn measure(font: &Font<'static>, scale: Scale, text: &str) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

fn draw_line(
    layer: &mut RgbaImage,
    font: &Font<'static>,
    scale: Scale,
    x: f32,
    baseline: f32,
    color: Rgba<u8>,
    text: &str,
) {
    let (width, height) = layer.dimensions();
    for glyph in font.layout(text, scale, point(x, baseline)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                return;
            }
            let alpha = (coverage * color.0[3] as f32).round().clamp(0.0, 255.0) as u8;
            if alpha == 0 {
                return;
            }
            let dst = layer.get_pixel_mut(px as u32, py as u32);
            // single-color layer: overlapping glyph edges keep the stronger coverage
            if alpha > dst.0[3] {
                *dst = Rgba([color.0[0], color.0[1], color.0[2], alpha]);
            }
        });
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 => Some(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        ])),
        8 => Some(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ])),
        _ => None,
    }
}
