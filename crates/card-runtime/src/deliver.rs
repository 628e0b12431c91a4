//! Handing finished output to object storage

use crate::types::*;
use card_compose::{ObjectStore, RenderedCard};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Store a batch document; returns the id it can be read back with
pub async fn deliver_batch(
    store: &dyn ObjectStore,
    bucket: &str,
    filename: &str,
    output: &BatchOutput,
) -> Result<String> {
    let id = store
        .write_buffer(bucket, output.document.clone(), filename, PDF_CONTENT_TYPE)
        .await?;
    log::info!(
        "Delivered {} ({} bytes, {:?}) as {}/{}",
        filename,
        output.document.len(),
        output.color_mode,
        bucket,
        id
    );
    Ok(id)
}

pub async fn deliver_preview(
    store: &dyn ObjectStore,
    bucket: &str,
    filename: &str,
    card: &RenderedCard,
) -> Result<String> {
    let id = store
        .write_buffer(bucket, card.png.clone(), filename, PNG_CONTENT_TYPE)
        .await?;
    log::debug!("Stored preview {} as {}/{}", filename, bucket, id);
    Ok(id)
}
