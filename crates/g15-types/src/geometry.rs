//! LCD geometry and drawing parameter types.

use serde::{Deserialize, Serialize};

/// Panel width in pixels.
pub const LCD_WIDTH: i32 = 160;

/// Panel height in pixels.
pub const LCD_HEIGHT: i32 = 43;

/// A pixel coordinate. Values outside the panel are legal and get clipped
/// by whatever draws with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether this point lies on the panel.
    pub fn in_bounds(self) -> bool {
        (0..LCD_WIDTH).contains(&self.x) && (0..LCD_HEIGHT).contains(&self.y)
    }

    /// Clamp onto the panel.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0, LCD_WIDTH - 1),
            y: self.y.clamp(0, LCD_HEIGHT - 1),
        }
    }
}

pub const fn top_left() -> Point {
    Point::new(0, 0)
}

pub const fn top_right() -> Point {
    Point::new(LCD_WIDTH - 1, 0)
}

pub const fn bottom_right() -> Point {
    Point::new(LCD_WIDTH - 1, LCD_HEIGHT - 1)
}

pub const fn bottom_left() -> Point {
    Point::new(0, LCD_HEIGHT - 1)
}

/// Order two corners so the first is top-left and the second bottom-right.
pub fn normalize(p1: Point, p2: Point) -> (Point, Point) {
    (
        Point::new(p1.x.min(p2.x), p1.y.min(p2.y)),
        Point::new(p1.x.max(p2.x), p1.y.max(p2.y)),
    )
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Horizontal text alignment.
///
/// `Left` starts the text at the given x. `Right` ends it at the given x.
/// `Center` ignores x and centers the text on the panel's midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
}

impl Alignment {
    /// Numeric code used by the composer protocol.
    pub fn code(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }

    /// X coordinate where a run of `text_width` pixels starts.
    pub fn start_x(self, x: i32, text_width: i32) -> i32 {
        match self {
            Self::Left => x,
            Self::Right => x.saturating_sub(text_width),
            Self::Center => LCD_WIDTH / 2 - text_width / 2,
        }
    }
}

/// The three font sizes a surface knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl FontSize {
    pub const ALL: [FontSize; 3] = [Self::Small, Self::Medium, Self::Large];

    /// Single-letter code used by the composer protocol.
    pub fn code(self) -> char {
        match self {
            Self::Small => 'S',
            Self::Medium => 'M',
            Self::Large => 'L',
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Small => 0,
            Self::Medium => 1,
            Self::Large => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress bars and indicators
// ---------------------------------------------------------------------------

/// Progress bar rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProgressBarStyle {
    /// Outline with a proportional fill.
    #[default]
    Outlined,
    /// Proportional fill with no outline.
    Solid,
    /// Outline with fill and tick marks every tenth.
    Ticked,
}

impl ProgressBarStyle {
    /// Numeric code used by the composer protocol.
    pub fn code(self) -> u8 {
        match self {
            Self::Outlined => 1,
            Self::Solid => 2,
            Self::Ticked => 3,
        }
    }
}

/// The M-key indicator lights above the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    All,
    M1,
    M2,
    M3,
}

impl Indicator {
    /// Numeric code used by the composer protocol (0 addresses all lights).
    pub fn code(self) -> u8 {
        match self {
            Self::All => 0,
            Self::M1 => 1,
            Self::M2 => 2,
            Self::M3 => 3,
        }
    }
}
