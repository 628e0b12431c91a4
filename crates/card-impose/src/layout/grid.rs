//! Grid geometry: gaps between cards and cell rectangles

use super::{CardSlot, GridPosition, LayoutPlan, Rect};

/// Even spacing between cards, page margins included as outer gaps
///
/// `per_row * card_width + (per_row + 1) * gap_x == usable_width`, and the
/// same for the vertical axis.
pub fn grid_gaps(plan: &LayoutPlan) -> (f32, f32) {
    let gap = |usable: f32, count: usize, size: f32| {
        if count == 0 {
            return 0.0;
        }
        (usable - count as f32 * size) / (count as f32 + 1.0)
    };
    (
        gap(plan.usable_width(), plan.cards_per_row, plan.card_width),
        gap(plan.usable_height(), plan.cards_per_col, plan.card_height),
    )
}

/// Page and grid position of the card at `index` in the batch
///
/// Cards fill rows left to right, top row first.
pub fn slot_for(plan: &LayoutPlan, index: usize) -> Option<CardSlot> {
    if plan.is_degenerate() {
        return None;
    }
    let cell = index % plan.cards_per_page;
    Some(CardSlot {
        page: index / plan.cards_per_page,
        cell,
        grid_pos: GridPosition::new(cell / plan.cards_per_row, cell % plan.cards_per_row),
    })
}

/// Cell rectangle in PDF coordinates (origin bottom-left)
pub fn cell_rect(plan: &LayoutPlan, pos: GridPosition) -> Rect {
    let (gap_x, gap_y) = grid_gaps(plan);
    let x = plan.margin + gap_x + pos.col as f32 * (plan.card_width + gap_x);
    let top = plan.margin + gap_y + pos.row as f32 * (plan.card_height + gap_y);
    let y = plan.page_height - top - plan.card_height;
    Rect::new(x, y, plan.card_width, plan.card_height)
}
