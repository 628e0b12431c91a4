use crate::storage::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Location of a template's base raster in object storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseImageRef {
    pub bucket: String,
    pub id: String,
}

/// Natural pixel size of the base image, as recorded at upload time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldStyle {
    pub font_family: String,
    /// Font size in pixels of the base image
    pub font_size: f32,
    /// CSS hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`)
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub align: TextAlign,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 16.0,
            color: "#000000".to_string(),
            bold: false,
            italic: false,
            align: TextAlign::Left,
        }
    }
}

/// A positioned region on the template, in base-image pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(default)]
    pub kind: FieldKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub style: FieldStyle,
}

impl Field {
    /// Layer size in whole pixels (at least 1x1)
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }

    /// Top-left corner in whole pixels; may be negative or beyond the canvas
    pub fn pixel_origin(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }

    /// The part of this field that lands on a `canvas_width` x `canvas_height`
    /// canvas, or `None` when it is entirely off-canvas
    pub fn visible_window(&self, canvas_width: u32, canvas_height: u32) -> Option<LayerWindow> {
        let (width, height) = self.pixel_size();
        let (x, y) = self.pixel_origin();
        let (left, right) = clip_span(x, width, canvas_width)?;
        let (top, bottom) = clip_span(y, height, canvas_height)?;
        Some(LayerWindow {
            x: (left - x) as u32,
            y: (top - y) as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
            canvas_x: left as u32,
            canvas_y: top as u32,
        })
    }
}

fn clip_span(start: i64, len: u32, limit: u32) -> Option<(i64, i64)> {
    let lo = start.max(0);
    let hi = start.saturating_add(len as i64).min(limit as i64);
    (hi > lo).then_some((lo, hi))
}

/// Visible sub-rectangle of a field layer
///
/// `x`/`y` are offsets inside the field, `canvas_x`/`canvas_y` where that
/// corner lands on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub canvas_x: u32,
    pub canvas_y: u32,
}

impl LayerWindow {
    /// The whole of a `width` x `height` layer placed at the canvas origin
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            canvas_x: 0,
            canvas_y: 0,
        }
    }

    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub base_image: BaseImageRef,
    pub image_meta: ImageMeta,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// field id -> dataset column name
    #[serde(default)]
    pub mapping: HashMap<String, String>,
}

impl Template {
    /// Load a template from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ComposeError::TemplateNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let template: Template = serde_json::from_slice(&bytes)?;
        template.validate()?;
        Ok(template)
    }

    /// Save the template as pretty-printed JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_meta.width == 0 || self.image_meta.height == 0 {
            return Err(ComposeError::InvalidTemplate(format!(
                "template {} has an empty base image ({}x{})",
                self.id, self.image_meta.width, self.image_meta.height
            )));
        }

        for field in &self.fields {
            if !(field.width > 0.0 && field.height > 0.0) {
                return Err(ComposeError::InvalidTemplate(format!(
                    "field {} must have a positive size, got {}x{}",
                    field.id, field.width, field.height
                )));
            }
        }

        Ok(())
    }

    /// Width over height of the base image
    pub fn aspect_ratio(&self) -> f32 {
        self.image_meta.width as f32 / self.image_meta.height as f32
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Fields that have no column mapped to them
    pub fn unmapped_fields(&self) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|f| !self.mapping.contains_key(&f.id))
            .collect()
    }

    /// Mapped column names that do not appear in the given header list
    pub fn missing_columns(&self, headers: &[String]) -> Vec<String> {
        let mut missing: Vec<String> = self
            .mapping
            .values()
            .filter(|column| !headers.contains(column))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

/// One dataset row: column name -> scalar value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRecord(BTreeMap<String, serde_json::Value>);

impl DataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.0.get(column)
    }

    /// The value's text form; `None` when the column is absent
    pub fn text(&self, column: &str) -> Option<String> {
        self.0.get(column).map(scalar_to_text)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for DataRecord
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn scalar_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A template composited with one record, encoded as PNG
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCard {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedCard {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_deserializes_camel_case() {
        let json = r##"{
            "id": "badge",
            "baseImage": { "bucket": "templates", "id": "abc" },
            "imageMeta": { "width": 400, "height": 250 },
            "fields": [
                { "id": "name", "x": 20, "y": 20, "width": 180, "height": 36,
                  "zIndex": 2, "style": { "fontSize": 24, "align": "center" } }
            ],
            "mapping": { "name": "Name" }
        }"##;

        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.image_meta, ImageMeta { width: 400, height: 250 });
        let field = template.field("name").unwrap();
        assert_eq!(field.kind, FieldKind::Text);
        assert_eq!(field.z_index, 2);
        assert_eq!(field.style.align, TextAlign::Center);
        assert_eq!(field.style.font_size, 24.0);
        assert_eq!(field.style.font_family, "Arial");
        assert!((template.aspect_ratio() - 1.6).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_empty_field() {
        let template = Template {
            id: "t".into(),
            base_image: BaseImageRef {
                bucket: "b".into(),
                id: "i".into(),
            },
            image_meta: ImageMeta {
                width: 10,
                height: 10,
            },
            fields: vec![Field {
                id: "f".into(),
                kind: FieldKind::Text,
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 5.0,
                z_index: 0,
                style: FieldStyle::default(),
            }],
            mapping: HashMap::new(),
        };
        assert!(matches!(
            template.validate(),
            Err(ComposeError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_record_text_forms() {
        let record: DataRecord = [
            ("name", serde_json::json!("Alice")),
            ("age", serde_json::json!(31)),
            ("vip", serde_json::json!(true)),
            ("note", serde_json::Value::Null),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.text("name").as_deref(), Some("Alice"));
        assert_eq!(record.text("age").as_deref(), Some("31"));
        assert_eq!(record.text("vip").as_deref(), Some("true"));
        assert_eq!(record.text("note").as_deref(), Some(""));
        assert_eq!(record.text("missing"), None);
    }

    #[test]
    fn test_missing_columns() {
        let mut mapping = HashMap::new();
        mapping.insert("a".to_string(), "Name".to_string());
        mapping.insert("b".to_string(), "Photo".to_string());
        let template = Template {
            id: "t".into(),
            base_image: BaseImageRef {
                bucket: "b".into(),
                id: "i".into(),
            },
            image_meta: ImageMeta {
                width: 10,
                height: 10,
            },
            fields: vec![],
            mapping,
        };

        let headers = vec!["Name".to_string(), "Email".to_string()];
        assert_eq!(template.missing_columns(&headers), vec!["Photo".to_string()]);
    }
}
