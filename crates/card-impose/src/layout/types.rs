//! Layout data types for card imposition

/// Result of the card size search, together with the page it was planned for
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutPlan {
    /// Card cell width in points
    pub card_width: f32,
    /// Card cell height in points
    pub card_height: f32,
    pub cards_per_row: usize,
    pub cards_per_col: usize,
    pub cards_per_page: usize,
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl LayoutPlan {
    /// A plan that fits no cards at all
    pub fn is_degenerate(&self) -> bool {
        self.cards_per_page == 0
    }

    pub fn usable_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    pub fn usable_height(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }

    /// Pages needed for `card_count` cards
    pub fn pages_for(&self, card_count: usize) -> usize {
        if self.cards_per_page == 0 {
            return 0;
        }
        card_count.div_ceil(self.cards_per_page)
    }
}

/// Position within the page grid (row 0 is the top row)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub row: usize,
    pub col: usize,
}

impl GridPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Where card `index` of a batch lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSlot {
    /// Zero-based output page
    pub page: usize,
    /// Cell index within the page
    pub cell: usize,
    pub grid_pos: GridPosition,
}

/// A rectangular area in points, origin at the bottom-left
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// A card scaled into its cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardPlacement {
    /// The cell the card was fitted into
    pub cell: Rect,
    /// Drawn area; always inside `cell`
    pub content: Rect,
    /// Horizontal centering offset inside the cell
    pub offset_x: f32,
    /// Vertical centering offset inside the cell
    pub offset_y: f32,
}
