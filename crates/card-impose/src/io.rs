//! Document I/O

use crate::types::*;
use lopdf::Document;
use std::path::Path;

/// Load a PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    Ok(doc)
}

/// Serialize a document to PDF bytes
pub fn document_to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer)?;
    Ok(writer)
}

/// Save the document
pub async fn save_pdf(mut doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || document_to_bytes(&mut doc)).await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}
