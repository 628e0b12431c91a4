//! Process colors for content that must survive CMYK printing untouched

/// A DeviceCMYK color, components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CmykColor {
    pub c: f32,
    pub m: f32,
    pub y: f32,
    pub k: f32,
}

impl CmykColor {
    pub const BLACK: CmykColor = CmykColor::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: CmykColor = CmykColor::new(0.0, 0.0, 0.0, 0.0);
    pub const CYAN: CmykColor = CmykColor::new(1.0, 0.0, 0.0, 0.0);
    pub const MAGENTA: CmykColor = CmykColor::new(0.0, 1.0, 0.0, 0.0);
    pub const YELLOW: CmykColor = CmykColor::new(0.0, 0.0, 1.0, 0.0);
    pub const RED: CmykColor = CmykColor::new(0.0, 1.0, 1.0, 0.0);
    pub const GREEN: CmykColor = CmykColor::new(1.0, 0.0, 1.0, 0.0);
    pub const BLUE: CmykColor = CmykColor::new(1.0, 1.0, 0.0, 0.0);
    pub const GRAY_25: CmykColor = CmykColor::new(0.0, 0.0, 0.0, 0.25);
    pub const GRAY_50: CmykColor = CmykColor::new(0.0, 0.0, 0.0, 0.5);
    pub const GRAY_75: CmykColor = CmykColor::new(0.0, 0.0, 0.0, 0.75);
    /// Prints on every separation; used for registration marks
    pub const REGISTRATION: CmykColor = CmykColor::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self { c, m, y, k }
    }

    /// Clamp every component into `0.0..=1.0`
    pub fn clamped(self) -> Self {
        Self::new(
            self.c.clamp(0.0, 1.0),
            self.m.clamp(0.0, 1.0),
            self.y.clamp(0.0, 1.0),
            self.k.clamp(0.0, 1.0),
        )
    }

    /// Content stream operator setting the fill color
    pub fn fill_op(&self) -> String {
        format!("{} {} {} {} k\n", self.c, self.m, self.y, self.k)
    }

    /// Content stream operator setting the stroke color
    pub fn stroke_op(&self) -> String {
        format!("{} {} {} {} K\n", self.c, self.m, self.y, self.k)
    }
}
