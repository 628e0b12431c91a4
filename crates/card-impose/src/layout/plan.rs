//! Card size search
//!
//! Tries card widths in fixed steps and keeps the one that fits the most
//! cards on a page. The candidate range is small, so a plain scan is used.

use crate::constants::{
    CARD_WIDTH_STEP_PT, DEFAULT_CARD_WIDTH_PT, MAX_CARD_WIDTH_PT, MIN_CARD_WIDTH_PT,
};
use crate::types::{ImposeError, Orientation, PaperSize, Result};

use super::LayoutPlan;

/// Choose a card size for cards of the given aspect ratio (width / height)
///
/// Ties keep the first, smallest width. When no candidate fits, the plan
/// uses [`DEFAULT_CARD_WIDTH_PT`] and may hold zero cards per page; check
/// [`LayoutPlan::is_degenerate`] or call [`ensure_usable`].
pub fn plan_layout(aspect_ratio: f32, page_width: f32, page_height: f32, margin: f32) -> LayoutPlan {
    let usable_width = page_width - 2.0 * margin;
    let usable_height = page_height - 2.0 * margin;

    let grid_for = |card_width: f32| {
        let card_height = card_width / aspect_ratio;
        let per_row = fit_count(usable_width, card_width);
        let per_col = fit_count(usable_height, card_height);
        LayoutPlan {
            card_width,
            card_height,
            cards_per_row: per_row,
            cards_per_col: per_col,
            cards_per_page: per_row * per_col,
            page_width,
            page_height,
            margin,
        }
    };

    if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
        log::warn!("Cannot plan cards with aspect ratio {}", aspect_ratio);
        return LayoutPlan {
            card_width: DEFAULT_CARD_WIDTH_PT,
            card_height: 0.0,
            cards_per_row: 0,
            cards_per_col: 0,
            cards_per_page: 0,
            page_width,
            page_height,
            margin,
        };
    }

    let max_width = MAX_CARD_WIDTH_PT.min(usable_width);
    let mut best: Option<LayoutPlan> = None;
    for step in 0.. {
        let card_width = MIN_CARD_WIDTH_PT + step as f32 * CARD_WIDTH_STEP_PT;
        if card_width > max_width {
            break;
        }
        let candidate = grid_for(card_width);
        if candidate.cards_per_row == 0 || candidate.cards_per_col == 0 {
            continue;
        }
        if best.is_none_or(|b| candidate.cards_per_page > b.cards_per_page) {
            best = Some(candidate);
        }
    }

    best.unwrap_or_else(|| {
        let fallback = grid_for(DEFAULT_CARD_WIDTH_PT);
        log::debug!(
            "No candidate width fits {}x{} at margin {}; falling back to {}pt ({} per page)",
            page_width,
            page_height,
            margin,
            DEFAULT_CARD_WIDTH_PT,
            fallback.cards_per_page
        );
        fallback
    })
}

/// [`plan_layout`] for a standard paper size
pub fn plan_for_paper(
    aspect_ratio: f32,
    paper: PaperSize,
    orientation: Orientation,
    margin: f32,
) -> LayoutPlan {
    let (width, height) = paper.dimensions_pt(orientation);
    plan_layout(aspect_ratio, width, height, margin)
}

/// Reject plans that hold no cards
pub fn ensure_usable(plan: &LayoutPlan) -> Result<&LayoutPlan> {
    if plan.is_degenerate() {
        return Err(ImposeError::LayoutDegenerate(format!(
            "{}x{}pt cards on a {}x{}pt page with {}pt margins",
            plan.card_width, plan.card_height, plan.page_width, plan.page_height, plan.margin
        )));
    }
    Ok(plan)
}

fn fit_count(available: f32, size: f32) -> usize {
    if size.is_nan() || size <= 0.0 || available <= 0.0 {
        return 0;
    }
    (available / size).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{A4_HEIGHT_PT, A4_WIDTH_PT};

    #[test]
    fn test_a4_badge_plan() {
        let plan = plan_layout(1.6, A4_WIDTH_PT, A4_HEIGHT_PT, 20.0);
        assert_eq!(plan.card_width, 200.0);
        assert!((plan.card_height - 125.0).abs() < 1e-3);
        assert_eq!(plan.cards_per_row, 2);
        assert_eq!(plan.cards_per_col, 6);
        assert_eq!(plan.cards_per_page, 12);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let a = plan_layout(1.42, 612.0, 792.0, 18.0);
        let b = plan_layout(1.42, 612.0, 792.0, 18.0);
        assert_eq!(a.card_width.to_bits(), b.card_width.to_bits());
        assert_eq!(a.card_height.to_bits(), b.card_height.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn test_width_stays_in_range() {
        for aspect in [0.5_f32, 0.7, 1.0, 1.6, 2.5, 4.0] {
            let plan = plan_layout(aspect, A4_WIDTH_PT, A4_HEIGHT_PT, 20.0);
            if plan.is_degenerate() {
                continue;
            }
            assert!(plan.card_width >= MIN_CARD_WIDTH_PT);
            assert!(plan.card_width <= MAX_CARD_WIDTH_PT);
            assert!(plan.cards_per_row as f32 * plan.card_width <= plan.usable_width());
            assert!(plan.cards_per_col as f32 * plan.card_height <= plan.usable_height());
        }
    }

    #[test]
    fn test_tiny_page_falls_back_and_is_degenerate() {
        let plan = plan_layout(1.6, 150.0, 150.0, 20.0);
        assert_eq!(plan.card_width, DEFAULT_CARD_WIDTH_PT);
        assert!(plan.is_degenerate());
        assert!(matches!(
            ensure_usable(&plan),
            Err(ImposeError::LayoutDegenerate(_))
        ));
    }

    #[test]
    fn test_bad_aspect_ratio_is_degenerate() {
        assert!(plan_layout(0.0, A4_WIDTH_PT, A4_HEIGHT_PT, 20.0).is_degenerate());
        assert!(plan_layout(f32::NAN, A4_WIDTH_PT, A4_HEIGHT_PT, 20.0).is_degenerate());
    }

    #[test]
    fn test_plan_for_paper_landscape() {
        let plan = plan_for_paper(1.6, PaperSize::A4, Orientation::Landscape, 20.0);
        assert!(plan.page_width > plan.page_height);
        assert!(!plan.is_degenerate());
    }
}
