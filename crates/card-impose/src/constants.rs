//! Shared constants for card imposition
//!
//! Page geometry is in PDF points (1/72 inch).

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Page Geometry
// =============================================================================

/// ISO A4 width in points
pub const A4_WIDTH_PT: f32 = 595.28;

/// ISO A4 height in points
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Margin kept clear on every page edge
pub const DEFAULT_MARGIN_PT: f32 = 20.0;

// =============================================================================
// Card Size Search
// =============================================================================

/// Smallest card width tried by the planner
pub const MIN_CARD_WIDTH_PT: f32 = 200.0;

/// Largest card width tried by the planner (further capped by the usable width)
pub const MAX_CARD_WIDTH_PT: f32 = 400.0;

/// Increment between candidate widths
pub const CARD_WIDTH_STEP_PT: f32 = 10.0;

/// Width used when no candidate fits
pub const DEFAULT_CARD_WIDTH_PT: f32 = 250.0;

// =============================================================================
// Printer's Marks
// =============================================================================

/// Line width for crop marks (points)
pub const CROP_MARK_WIDTH: f32 = 0.25;

/// Line width for registration marks (points)
pub const REGISTRATION_MARK_WIDTH: f32 = 0.25;

/// Length of crop marks (points)
pub const CROP_MARK_LENGTH: f32 = 12.0;

/// Gap between crop mark and card edge (points)
pub const CROP_MARK_GAP: f32 = 3.0;

/// Crop marks shorter than this are not drawn
pub const MIN_CROP_MARK_LENGTH: f32 = 1.0;

/// Size of registration marks (points)
pub const REGISTRATION_MARK_SIZE: f32 = 10.0;

/// Control point factor for approximating circles with Bezier curves:
/// 4 * (sqrt(2) - 1) / 3
pub const BEZIER_CIRCLE_FACTOR: f32 = 0.552284749831;

// =============================================================================
// CMYK Conversion
// =============================================================================

/// Converter executable looked up on PATH
pub const DEFAULT_CONVERTER_BINARY: &str = "gs";

/// Upper bound for a single conversion run
pub const DEFAULT_CONVERSION_TIMEOUT_SECS: u64 = 120;

/// Upper bound for the `--version` capability probe
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Trailing bytes of converter stderr kept in error reports
pub const STDERR_TAIL_BYTES: usize = 2048;
