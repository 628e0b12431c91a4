use crate::options::{ComposeOptions, FieldOrder};
use crate::resolve::{ResolvedValue, resolve_field};
use crate::sources::ImageSources;
use crate::storage::StoreError;
use crate::text::FontBook;
use crate::types::{
    ComposeError, DataRecord, Field, LayerWindow, RenderedCard, Result, Template,
};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

/// A template whose base image has been fetched and decoded
///
/// Cheap to clone; batch renders share one instance across workers.
#[derive(Clone)]
pub struct PreparedTemplate {
    template: Arc<Template>,
    base: Arc<RgbaImage>,
}

impl PreparedTemplate {
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Natural pixel size of the base image
    pub fn size(&self) -> (u32, u32) {
        self.base.dimensions()
    }
}

pub struct Composer {
    sources: ImageSources,
    fonts: Arc<FontBook>,
    options: ComposeOptions,
}

impl Composer {
    pub fn new(sources: ImageSources, fonts: Arc<FontBook>, options: ComposeOptions) -> Self {
        Self {
            sources,
            fonts,
            options,
        }
    }

    pub fn sources(&self) -> &ImageSources {
        &self.sources
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Load and decode the template's base image
    pub async fn prepare(&self, template: &Template) -> Result<PreparedTemplate> {
        template.validate()?;

        let base_ref = &template.base_image;
        let bytes = match self
            .sources
            .store()
            .read_by_id(&base_ref.bucket, &base_ref.id)
            .await
        {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound { bucket, id }) => {
                return Err(ComposeError::TemplateNotFound(format!(
                    "{} (base image {}/{} is missing)",
                    template.id, bucket, id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let base = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes).map(|img| img.to_rgba8())
        })
        .await??;

        let (width, height) = base.dimensions();
        if (width, height) != (template.image_meta.width, template.image_meta.height) {
            log::debug!(
                "Template {} records {}x{} but its base image is {}x{}; using the image size",
                template.id,
                template.image_meta.width,
                template.image_meta.height,
                width,
                height
            );
        }

        Ok(PreparedTemplate {
            template: Arc::new(template.clone()),
            base: Arc::new(base),
        })
    }

    /// Composite one record onto a prepared template
    pub async fn render_record(
        &self,
        prepared: &PreparedTemplate,
        record: &DataRecord,
    ) -> Result<RenderedCard> {
        let template = &prepared.template;
        let mut layers = Vec::with_capacity(template.fields.len());
        for field in ordered_fields(template, self.options.field_order) {
            if let Some(value) =
                resolve_field(field, &template.mapping, record, &self.sources).await
            {
                layers.push((field.clone(), value));
            }
        }

        let base = Arc::clone(&prepared.base);
        let fonts = Arc::clone(&self.fonts);
        let card = tokio::task::spawn_blocking(move || {
            let canvas = composite(&base, &layers, &fonts);
            encode_png(&canvas)
        })
        .await??;

        Ok(card)
    }

    /// Prepare and render in one go, for single previews
    pub async fn render_template(
        &self,
        template: &Template,
        record: &DataRecord,
    ) -> Result<RenderedCard> {
        let prepared = self.prepare(template).await?;
        self.render_record(&prepared, record).await
    }
}

/// Fields in paint order for the given policy
pub fn ordered_fields(template: &Template, order: FieldOrder) -> Vec<&Field> {
    let mut fields: Vec<&Field> = template.fields.iter().collect();
    if order == FieldOrder::ZIndex {
        fields.sort_by_key(|f| f.z_index);
    }
    fields
}

fn composite(base: &RgbaImage, layers: &[(Field, ResolvedValue)], fonts: &FontBook) -> RgbaImage {
    let mut canvas = base.clone();
    let (canvas_width, canvas_height) = canvas.dimensions();
    for (field, value) in layers {
        let Some(window) = field.visible_window(canvas_width, canvas_height) else {
            log::debug!("Field {} lies outside the card; skipped", field.id);
            continue;
        };
        let (width, height) = field.pixel_size();
        let layer = match value {
            ResolvedValue::Image(img) => fill_window(img, width, height, window),
            ResolvedValue::Text(text) => {
                fonts.rasterize_window(text, &field.style, width, height, window)
            }
        };
        imageops::overlay(
            &mut canvas,
            &layer,
            window.canvas_x as i64,
            window.canvas_y as i64,
        );
    }
    canvas
}

/// The `window` part of `img` scaled to fill a `width` x `height` field
///
/// Same framing as `resize_to_fill`, without allocating the off-canvas part.
fn fill_window(img: &DynamicImage, width: u32, height: u32, window: LayerWindow) -> RgbaImage {
    if window.covers(width, height) {
        return img.resize_to_fill(width, height, FilterType::Lanczos3).to_rgba8();
    }

    let (src_width, src_height) = (img.width().max(1) as f64, img.height().max(1) as f64);
    let scale = (width as f64 / src_width).max(height as f64 / src_height);
    let crop_x = (src_width * scale - width as f64) / 2.0;
    let crop_y = (src_height * scale - height as f64) / 2.0;

    let span = |start: u32, len: u32, crop: f64, limit: f64| {
        let lo = ((start as f64 + crop) / scale).floor().clamp(0.0, limit - 1.0);
        let hi = (((start + len) as f64 + crop) / scale).ceil().clamp(lo + 1.0, limit);
        (lo as u32, (hi - lo) as u32)
    };
    let (x, w) = span(window.x, window.width, crop_x, src_width);
    let (y, h) = span(window.y, window.height, crop_y, src_height);

    img.crop_imm(x, y, w, h)
        .resize_exact(window.width, window.height, FilterType::Lanczos3)
        .to_rgba8()
}

fn encode_png(canvas: &RgbaImage) -> Result<RenderedCard> {
    let mut buffer = Cursor::new(Vec::new());
    canvas.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(RenderedCard {
        png: buffer.into_inner(),
        width: canvas.width(),
        height: canvas.height(),
    })
}
