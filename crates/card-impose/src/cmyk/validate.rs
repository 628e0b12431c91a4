//! Color space inspection of finished documents
//!
//! Runs in-process on the parsed PDF with lopdf. Ghostscript is not
//! consulted here, so validation works even when no converter is installed
//! and reports what the file declares rather than how a RIP would render it.

use super::CmykError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, Stream};

/// Which process color models a document uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorSpaceReport {
    pub is_cmyk: bool,
    pub has_rgb: bool,
}

impl ColorSpaceReport {
    /// Only CMYK, no RGB left anywhere
    pub fn fully_cmyk(&self) -> bool {
        self.is_cmyk && !self.has_rgb
    }
}

/// Scan a PDF for DeviceCMYK and DeviceRGB usage
///
/// Looks at color space names in every object (including ICCBased
/// profiles by their component count) and at the color operators of
/// content streams.
pub fn validate(document: &[u8]) -> Result<ColorSpaceReport, CmykError> {
    let doc = Document::load_mem(document)?;
    let mut report = ColorSpaceReport::default();

    for object in doc.objects.values() {
        scan_object(&doc, object, &mut report);
        if let Object::Stream(stream) = object {
            if is_content_stream(&stream.dict) {
                scan_content(stream, &mut report);
            }
        }
        if report.is_cmyk && report.has_rgb {
            break;
        }
    }

    log::debug!(
        "Color spaces: cmyk={} rgb={}",
        report.is_cmyk,
        report.has_rgb
    );
    Ok(report)
}

fn scan_object(doc: &Document, object: &Object, report: &mut ColorSpaceReport) {
    match object {
        Object::Name(name) => mark_name(name, report),
        Object::Array(items) => {
            if let [Object::Name(kind), profile, ..] = items.as_slice() {
                if kind.as_slice() == b"ICCBased" {
                    mark_icc(doc, profile, report);
                }
            }
            for item in items {
                scan_object(doc, item, report);
            }
        }
        Object::Dictionary(dict) => scan_dictionary(doc, dict, report),
        Object::Stream(stream) => scan_dictionary(doc, &stream.dict, report),
        _ => {}
    }
}

fn scan_dictionary(doc: &Document, dict: &Dictionary, report: &mut ColorSpaceReport) {
    for (_, value) in dict.iter() {
        scan_object(doc, value, report);
    }
}

fn mark_name(name: &[u8], report: &mut ColorSpaceReport) {
    match name {
        b"DeviceCMYK" => report.is_cmyk = true,
        b"DeviceRGB" => report.has_rgb = true,
        _ => {}
    }
}

fn mark_icc(doc: &Document, profile: &Object, report: &mut ColorSpaceReport) {
    let stream = match profile {
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_stream).ok(),
        Object::Stream(stream) => Some(stream),
        _ => None,
    };
    let components = stream.and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok());
    match components {
        Some(4) => report.is_cmyk = true,
        Some(3) => report.has_rgb = true,
        _ => {}
    }
}

/// Page contents and form XObjects; not images, fonts or profiles
fn is_content_stream(dict: &Dictionary) -> bool {
    match dict.get(b"Subtype") {
        Ok(Object::Name(subtype)) => subtype.as_slice() == b"Form",
        Ok(_) => false,
        Err(_) => {
            !dict.has(b"Type") && !dict.has(b"N") && !dict.has(b"Length1") && !dict.has(b"Length2")
        }
    }
}

fn scan_content(stream: &Stream, report: &mut ColorSpaceReport) {
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let content = match Content::decode(&data) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("Skipping undecodable content stream: {}", e);
            return;
        }
    };

    for operation in &content.operations {
        match operation.operator.as_str() {
            "k" | "K" => report.is_cmyk = true,
            "rg" | "RG" => report.has_rgb = true,
            _ => {}
        }
    }
}
