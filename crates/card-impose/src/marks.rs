//! Printer's marks for card sheets
//!
//! Produces content stream operations for crop marks around each placed
//! card and registration marks in the page corners. All strokes use
//! DeviceCMYK colors so marks stay clean after CMYK conversion.

use crate::cmyk::CmykColor;
use crate::constants::{
    BEZIER_CIRCLE_FACTOR, CROP_MARK_GAP, CROP_MARK_LENGTH, CROP_MARK_WIDTH, MIN_CROP_MARK_LENGTH,
    REGISTRATION_MARK_SIZE, REGISTRATION_MARK_WIDTH,
};
use crate::layout::Rect;

/// Geometry needed to draw marks on one page
pub struct MarksConfig<'a> {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    /// Horizontal space between neighbouring cells
    pub gap_x: f32,
    /// Vertical space between neighbouring cells
    pub gap_y: f32,
    /// Cells that hold a card
    pub occupied: &'a [Rect],
}

/// All marks for a page as content stream operations
pub fn generate_marks(config: &MarksConfig) -> String {
    let mut ops = String::new();
    ops.push_str("q\n");
    ops.push_str("[] 0 d\n");
    ops.push_str(&generate_crop_marks(config));
    ops.push_str(&generate_registration_marks(config));
    ops.push_str("Q\n");
    ops
}

/// Crop marks at the four corners of every occupied cell
///
/// Marks are shortened so they never reach into a neighbouring card.
fn generate_crop_marks(config: &MarksConfig) -> String {
    let length_x = crop_mark_length(config.gap_x);
    let length_y = crop_mark_length(config.gap_y);
    if length_x.is_none() && length_y.is_none() {
        return String::new();
    }

    let mut ops = String::new();
    ops.push_str(&CmykColor::BLACK.stroke_op());
    ops.push_str(&format!("{} w\n", CROP_MARK_WIDTH));

    for cell in config.occupied {
        let corners = [
            (cell.x, cell.top(), -1.0, 1.0),
            (cell.right(), cell.top(), 1.0, 1.0),
            (cell.x, cell.y, -1.0, -1.0),
            (cell.right(), cell.y, 1.0, -1.0),
        ];
        for (x, y, dir_x, dir_y) in corners {
            if let Some(length) = length_x {
                let start = x + dir_x * CROP_MARK_GAP;
                let end = start + dir_x * length;
                ops.push_str(&line(start, y, end, y));
            }
            if let Some(length) = length_y {
                let start = y + dir_y * CROP_MARK_GAP;
                let end = start + dir_y * length;
                ops.push_str(&line(x, start, x, end));
            }
        }
    }

    ops
}

fn crop_mark_length(gap: f32) -> Option<f32> {
    let length = (gap - CROP_MARK_GAP).min(CROP_MARK_LENGTH);
    (length >= MIN_CROP_MARK_LENGTH).then_some(length)
}

/// Registration marks centered in each page corner's margin
fn generate_registration_marks(config: &MarksConfig) -> String {
    let half_size = REGISTRATION_MARK_SIZE / 2.0;
    let inset = (config.margin / 2.0).max(half_size);

    let mut ops = String::new();
    ops.push_str(&CmykColor::REGISTRATION.stroke_op());
    ops.push_str(&format!("{} w\n", REGISTRATION_MARK_WIDTH));

    let positions = [
        (inset, config.page_height - inset),
        (config.page_width - inset, config.page_height - inset),
        (inset, inset),
        (config.page_width - inset, inset),
    ];
    for (x, y) in positions {
        ops.push_str(&draw_registration_mark(x, y, half_size));
    }

    ops
}

/// Crosshair with a circle, approximated by four Bezier curves
fn draw_registration_mark(center_x: f32, center_y: f32, half_size: f32) -> String {
    let mut ops = String::new();
    ops.push_str(&line(
        center_x - half_size,
        center_y,
        center_x + half_size,
        center_y,
    ));
    ops.push_str(&line(
        center_x,
        center_y - half_size,
        center_x,
        center_y + half_size,
    ));

    let r = half_size * 0.7;
    let k = r * BEZIER_CIRCLE_FACTOR;
    let (cx, cy) = (center_x, center_y);
    ops.push_str(&format!("{} {} m\n", cx + r, cy));
    let quadrants = [
        [cx + r, cy + k, cx + k, cy + r, cx, cy + r],
        [cx - k, cy + r, cx - r, cy + k, cx - r, cy],
        [cx - r, cy - k, cx - k, cy - r, cx, cy - r],
        [cx + k, cy - r, cx + r, cy - k, cx + r, cy],
    ];
    for [x1, y1, x2, y2, x3, y3] in quadrants {
        ops.push_str(&format!("{} {} {} {} {} {} c\n", x1, y1, x2, y2, x3, y3));
    }
    ops.push_str("S\n");

    ops
}

fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> String {
    format!("{} {} m {} {} l S\n", x1, y1, x2, y2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(occupied: &[Rect], gap: f32) -> MarksConfig<'_> {
        MarksConfig {
            page_width: 595.0,
            page_height: 842.0,
            margin: 20.0,
            gap_x: gap,
            gap_y: gap,
            occupied,
        }
    }

    #[test]
    fn test_marks_use_cmyk_strokes_only() {
        let cells = [Rect::new(100.0, 100.0, 200.0, 125.0)];
        let ops = generate_marks(&config(&cells, 30.0));
        assert!(ops.contains(" K\n"));
        assert!(!ops.contains("RG"));
        assert!(!ops.contains("rg"));
        assert!(ops.starts_with("q\n") && ops.ends_with("Q\n"));
    }

    #[test]
    fn test_crop_marks_per_occupied_corner() {
        let cells = [
            Rect::new(100.0, 100.0, 200.0, 125.0),
            Rect::new(330.0, 100.0, 200.0, 125.0),
        ];
        let ops = generate_crop_marks(&config(&cells, 30.0));
        // 2 cells x 4 corners x 2 strokes
        assert_eq!(ops.matches(" l S\n").count(), 16);
    }

    #[test]
    fn test_crop_marks_shrink_to_fit_gap() {
        assert_eq!(crop_mark_length(30.0), Some(CROP_MARK_LENGTH));
        assert_eq!(crop_mark_length(8.0), Some(5.0));
        assert_eq!(crop_mark_length(3.5), None);
        let cells = [Rect::new(100.0, 100.0, 200.0, 125.0)];
        assert!(generate_crop_marks(&config(&cells, 2.0)).is_empty());
    }

    #[test]
    fn test_registration_marks_in_all_corners() {
        let ops = generate_registration_marks(&config(&[], 30.0));
        assert_eq!(ops.matches("S\n").count(), 4 * 3);
        assert_eq!(ops.matches(" c\n").count(), 16);
    }
}
