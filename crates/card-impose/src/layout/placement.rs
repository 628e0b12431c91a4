//! Scaling a card into its cell

use super::{CardPlacement, Rect};

/// Relative tolerance under which two aspect ratios count as equal
const ASPECT_EPSILON: f32 = 1e-5;

/// Fit a `card_width` x `card_height` card into `cell`, preserving its
/// aspect ratio, and center it on the axis with slack
///
/// Wider cards fill the cell width and are centered vertically; taller
/// cards fill the height and are centered horizontally. Unusable card
/// dimensions fill the cell.
pub fn fit_and_center(cell: &Rect, card_width: f32, card_height: f32) -> CardPlacement {
    if !(card_width > 0.0 && card_height > 0.0) || cell.width <= 0.0 || cell.height <= 0.0 {
        return fill_cell(cell);
    }

    let card_aspect = card_width / card_height;
    let cell_aspect = cell.aspect_ratio();

    if (card_aspect - cell_aspect).abs() <= ASPECT_EPSILON * cell_aspect {
        return fill_cell(cell);
    }

    let (width, height) = if card_aspect > cell_aspect {
        (cell.width, cell.width / card_aspect)
    } else {
        (cell.height * card_aspect, cell.height)
    };
    let offset_x = (cell.width - width) / 2.0;
    let offset_y = (cell.height - height) / 2.0;

    CardPlacement {
        cell: *cell,
        content: Rect::new(cell.x + offset_x, cell.y + offset_y, width, height),
        offset_x,
        offset_y,
    }
}

/// Bounding-box placement: the card is stretched over the whole cell
pub fn fill_cell(cell: &Rect) -> CardPlacement {
    CardPlacement {
        cell: *cell,
        content: *cell,
        offset_x: 0.0,
        offset_y: 0.0,
    }
}
