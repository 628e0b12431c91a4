//! Turning a record's raw column value into something drawable

use crate::sources::ImageSources;
use crate::types::{DataRecord, Field, FieldKind};
use image::DynamicImage;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static IMAGE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^(?:
            https?://\S+
          | /[^/\s]+(?:/[^/\s]+)+
          | data:image/[a-z0-9.+-]+;base64,.*
          | \S+\.(?:png|jpe?g|gif|webp|bmp|tiff?)(?:\?\S*)?
        )$",
    )
    .expect("image reference pattern is valid")
});

/// A field's value after classification, before any fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Literal(String),
    ImageRef(String),
}

/// A value ready for compositing
#[derive(Debug, Clone)]
pub enum ResolvedValue {
    Text(String),
    Image(DynamicImage),
}

impl ResolvedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResolvedValue::Text(s) => Some(s),
            ResolvedValue::Image(_) => None,
        }
    }
}

/// True for strings that should be treated as an image reference
pub fn looks_like_image(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && IMAGE_LIKE.is_match(value)
}

/// Decide what a field shows for one record
///
/// Returns `None` when the field should be skipped entirely: an image field
/// with no column mapped to it.
pub fn classify(
    field: &Field,
    mapping: &HashMap<String, String>,
    record: &DataRecord,
) -> Option<FieldValue> {
    let Some(column) = mapping.get(&field.id) else {
        return match field.kind {
            FieldKind::Text => Some(FieldValue::Literal(String::new())),
            FieldKind::Image => None,
        };
    };

    let raw = record.text(column).unwrap_or_default();
    if raw.trim().is_empty() {
        return Some(FieldValue::Literal(String::new()));
    }

    match field.kind {
        FieldKind::Image => Some(FieldValue::ImageRef(raw)),
        FieldKind::Text if looks_like_image(&raw) => Some(FieldValue::ImageRef(raw)),
        FieldKind::Text => Some(FieldValue::Literal(raw)),
    }
}

/// Fetch and decode image references; failures fall back to the raw text
pub async fn resolve(value: FieldValue, sources: &ImageSources) -> ResolvedValue {
    match value {
        FieldValue::Literal(text) => ResolvedValue::Text(text),
        FieldValue::ImageRef(reference) => match fetch_image(&reference, sources).await {
            Ok(image) => ResolvedValue::Image(image),
            Err(e) => {
                log::warn!("Could not load image {:?}, drawing it as text: {}", reference, e);
                ResolvedValue::Text(reference)
            }
        },
    }
}

/// [`classify`] followed by [`resolve`]
pub async fn resolve_field(
    field: &Field,
    mapping: &HashMap<String, String>,
    record: &DataRecord,
    sources: &ImageSources,
) -> Option<ResolvedValue> {
    let value = classify(field, mapping, record)?;
    Some(resolve(value, sources).await)
}

async fn fetch_image(
    reference: &str,
    sources: &ImageSources,
) -> Result<DynamicImage, crate::sources::ResolveError> {
    let bytes = sources.fetch(reference).await?;
    Ok(image::load_from_memory(&bytes)?)
}
