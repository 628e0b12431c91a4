use crate::layout::{LayoutPlan, ensure_usable};
use crate::types::*;

/// Page count and fill for a batch of `card_count` cards
pub fn calculate_statistics(plan: &LayoutPlan, card_count: usize) -> Result<BatchStatistics> {
    if card_count == 0 {
        return Err(ImposeError::NoCards);
    }
    ensure_usable(plan)?;

    let pages = plan.pages_for(card_count);
    let used_last_page = card_count - (pages - 1) * plan.cards_per_page;

    Ok(BatchStatistics {
        cards: card_count,
        pages,
        cards_per_page: plan.cards_per_page,
        empty_cells_last_page: plan.cards_per_page - used_last_page,
    })
}
