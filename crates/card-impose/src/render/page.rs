//! Output page assembly

use crate::layout::Rect;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Content and resources for one output page, filled in card by card
#[derive(Default)]
pub struct PageBuilder {
    content: String,
    xobjects: Dictionary,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw an image XObject scaled into `rect`
    pub fn place_image(&mut self, name: &str, xobject_id: ObjectId, rect: &Rect) {
        self.xobjects
            .set(name.as_bytes(), Object::Reference(xobject_id));
        self.content.push_str(&format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            rect.width, rect.height, rect.x, rect.y, name
        ));
    }

    /// Append raw content stream operations
    pub fn push_ops(&mut self, ops: &str) {
        self.content.push_str(ops);
    }

    /// Add the page to `doc` under `parent_pages_id`
    pub fn finish(
        self,
        doc: &mut Document,
        parent_pages_id: ObjectId,
        page_width: f32,
        page_height: f32,
    ) -> ObjectId {
        let mut content = Stream::new(Dictionary::new(), self.content.into_bytes());
        // Uncompressed content is still a valid page; keep it if deflate fails
        if let Err(e) = content.compress() {
            log::debug!("Leaving page content uncompressed: {}", e);
        }
        let content_id = doc.add_object(content);

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(self.xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(parent_pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_width),
                Object::Real(page_height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        doc.add_object(page_dict)
    }
}

/// Install the page tree and catalog once all pages exist
pub fn finish_document(doc: &mut Document, pages_id: ObjectId, page_ids: &[ObjectId]) {
    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", Object::Integer(page_ids.len() as i64));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));
}
