//! Rendered cards as PDF image XObjects

use crate::types::Result;
use image::{ImageReader, RgbaImage};
use lopdf::{Document, ObjectId, Stream, dictionary};
use std::io::Cursor;

/// A decoded card, alpha already flattened onto white
pub struct CardImage {
    pub width: u32,
    pub height: u32,
    rgb: Vec<u8>,
}

/// Pixel size from the image header, without decoding pixels
pub fn card_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

pub fn decode_card(bytes: &[u8]) -> Result<CardImage> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    Ok(flatten_onto_white(&rgba))
}

fn flatten_onto_white(rgba: &RgbaImage) -> CardImage {
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        for channel in [r, g, b] {
            let blended = (channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    CardImage { width, height, rgb }
}

/// Embed a card as a Flate-compressed DeviceRGB image
pub fn add_card_xobject(doc: &mut Document, card: CardImage) -> Result<ObjectId> {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => card.width as i64,
        "Height" => card.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    let mut stream = Stream::new(dict, card.rgb);
    stream.compress()?;
    Ok(doc.add_object(stream))
}
