//! Packing rendered cards onto output pages

use crate::layout::{
    LayoutPlan, Rect, cell_rect, ensure_usable, fill_cell, fit_and_center, grid_gaps, slot_for,
};
use crate::marks::{MarksConfig, generate_marks};
use crate::render::{PageBuilder, add_card_xobject, card_dimensions, decode_card, finish_document};
use crate::types::*;
use lopdf::Document;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PageOptions {
    /// Crop marks around cards and registration marks in the page corners
    pub print_marks: bool,
}

/// Lay out encoded card images (PNG or any format `image` reads) in order
///
/// Card `i` goes to page `i / cards_per_page`, filling rows left to right
/// from the top. Each card keeps its aspect ratio and is centered in its
/// cell. A card that cannot be decoded leaves its cell blank.
pub fn compose_pages<C: AsRef<[u8]>>(
    plan: &LayoutPlan,
    cards: &[C],
    options: &PageOptions,
) -> Result<Document> {
    if cards.is_empty() {
        return Err(ImposeError::NoCards);
    }
    ensure_usable(plan)?;

    let (gap_x, gap_y) = grid_gaps(plan);
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut page_ids = Vec::with_capacity(plan.pages_for(cards.len()));

    for (page_index, page_cards) in cards.chunks(plan.cards_per_page).enumerate() {
        let mut page = PageBuilder::new();
        let mut occupied: Vec<Rect> = Vec::with_capacity(page_cards.len());

        for (cell, bytes) in page_cards.iter().enumerate() {
            let index = page_index * plan.cards_per_page + cell;
            let Some(slot) = slot_for(plan, index) else {
                continue;
            };
            let area = cell_rect(plan, slot.grid_pos);
            let bytes = bytes.as_ref();

            let placement = match card_dimensions(bytes) {
                Some((width, height)) => fit_and_center(&area, width as f32, height as f32),
                None => fill_cell(&area),
            };

            match decode_card(bytes) {
                Ok(card) => {
                    let xobject_id = add_card_xobject(&mut doc, card)?;
                    page.place_image(&format!("Card{}", index), xobject_id, &placement.content);
                    occupied.push(area);
                }
                Err(e) => {
                    log::warn!("Card {} could not be decoded, leaving its cell empty: {}", index, e);
                }
            }
        }

        if options.print_marks {
            page.push_ops(&generate_marks(&MarksConfig {
                page_width: plan.page_width,
                page_height: plan.page_height,
                margin: plan.margin,
                gap_x,
                gap_y,
                occupied: &occupied,
            }));
        }

        page_ids.push(page.finish(&mut doc, pages_id, plan.page_width, plan.page_height));
    }

    finish_document(&mut doc, pages_id, &page_ids);
    log::debug!(
        "Composed {} cards onto {} pages ({} per page)",
        cards.len(),
        page_ids.len(),
        plan.cards_per_page
    );
    Ok(doc)
}

/// A single empty page sized like `plan`'s output pages
///
/// Stands in for an imposition when a batch has no cards, so callers still
/// get a document they can open and print.
pub fn blank_document(plan: &LayoutPlan) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = PageBuilder::new().finish(&mut doc, pages_id, plan.page_width, plan.page_height);
    finish_document(&mut doc, pages_id, &[page_id]);
    doc
}

/// [`compose_pages`] on the blocking thread pool
pub async fn impose_cards(
    plan: LayoutPlan,
    cards: Vec<Vec<u8>>,
    options: PageOptions,
) -> Result<Document> {
    tokio::task::spawn_blocking(move || compose_pages(&plan, &cards, &options)).await?
}
