//! Built-in block font.
//!
//! A single 3x5 glyph set rendered at three sizes. Lowercase letters map to
//! uppercase; anything the set lacks renders as a blank cell.

use g15_types::geometry::{Alignment, FontSize, Point};

use crate::pixels::PixelBuffer;

/// Rows of a 3x5 glyph, top to bottom; bit 2 is the leftmost column.
type Glyph = [u8; 5];

const GLYPH_W: i32 = 3;
const GLYPH_H: i32 = 5;

fn glyph(ch: char) -> Option<Glyph> {
    let g = match ch.to_ascii_uppercase() {
        '0' => [7, 5, 5, 5, 7],
        '1' => [2, 6, 2, 2, 7],
        '2' => [7, 1, 7, 4, 7],
        '3' => [7, 1, 3, 1, 7],
        '4' => [5, 5, 7, 1, 1],
        '5' => [7, 4, 7, 1, 7],
        '6' => [7, 4, 7, 5, 7],
        '7' => [7, 1, 1, 2, 2],
        '8' => [7, 5, 7, 5, 7],
        '9' => [7, 5, 7, 1, 7],
        'A' => [2, 5, 7, 5, 5],
        'B' => [6, 5, 6, 5, 6],
        'C' => [3, 4, 4, 4, 3],
        'D' => [6, 5, 5, 5, 6],
        'E' => [7, 4, 6, 4, 7],
        'F' => [7, 4, 6, 4, 4],
        'G' => [3, 4, 5, 5, 3],
        'H' => [5, 5, 7, 5, 5],
        'I' => [7, 2, 2, 2, 7],
        'J' => [1, 1, 1, 5, 2],
        'K' => [5, 5, 6, 5, 5],
        'L' => [4, 4, 4, 4, 7],
        'M' => [5, 7, 7, 5, 5],
        'N' => [6, 5, 5, 5, 5],
        'O' => [2, 5, 5, 5, 2],
        'P' => [6, 5, 6, 4, 4],
        'Q' => [2, 5, 5, 6, 3],
        'R' => [6, 5, 6, 5, 5],
        'S' => [3, 4, 2, 1, 6],
        'T' => [7, 2, 2, 2, 2],
        'U' => [5, 5, 5, 5, 7],
        'V' => [5, 5, 5, 5, 2],
        'W' => [5, 5, 7, 7, 5],
        'X' => [5, 5, 2, 5, 5],
        'Y' => [5, 5, 2, 2, 2],
        'Z' => [7, 1, 2, 4, 7],
        ' ' => [0, 0, 0, 0, 0],
        '.' => [0, 0, 0, 0, 2],
        ',' => [0, 0, 0, 2, 4],
        ':' => [0, 2, 0, 2, 0],
        ';' => [0, 2, 0, 2, 4],
        '!' => [2, 2, 2, 0, 2],
        '?' => [7, 1, 2, 0, 2],
        '-' => [0, 0, 7, 0, 0],
        '+' => [0, 2, 7, 2, 0],
        '=' => [0, 7, 0, 7, 0],
        '_' => [0, 0, 0, 0, 7],
        '/' => [1, 1, 2, 4, 4],
        '\\' => [4, 4, 2, 1, 1],
        '(' => [1, 2, 2, 2, 1],
        ')' => [4, 2, 2, 2, 4],
        '[' => [3, 2, 2, 2, 3],
        ']' => [6, 2, 2, 2, 6],
        '<' => [1, 2, 4, 2, 1],
        '>' => [4, 2, 1, 2, 4],
        '\'' => [2, 2, 0, 0, 0],
        '"' => [5, 5, 0, 0, 0],
        '%' => [5, 1, 2, 4, 5],
        '*' => [0, 5, 2, 5, 0],
        '#' => [5, 7, 5, 7, 5],
        '|' => [2, 2, 2, 2, 2],
        '@' => [7, 5, 7, 4, 7],
        '&' => [2, 5, 2, 5, 3],
        _ => return None,
    };
    Some(g)
}

/// Row-major bitmap of one glyph scaled by `scale`, sized
/// `(3 * scale) x (5 * scale)`. Missing glyphs come back blank.
pub fn glyph_bitmap(ch: char, scale: i32) -> Vec<bool> {
    let scale = scale.max(1);
    let (w, h) = (GLYPH_W * scale, GLYPH_H * scale);
    let rows = glyph(ch).unwrap_or([0; 5]);
    let mut bits = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        let row = rows[(y / scale) as usize];
        for x in 0..w {
            let col = x / scale;
            bits.push(row & (1 << (GLYPH_W - 1 - col)) != 0);
        }
    }
    bits
}

/// One rendering size of the block font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFont {
    /// Pixel multiplier for each glyph bit.
    pub scale: i32,
    /// Draw every column twice, one pixel apart.
    pub bold: bool,
    /// Horizontal distance between glyph origins.
    pub advance: i32,
    pub line_height: i32,
}

impl BlockFont {
    pub const SMALL: Self = Self {
        scale: 1,
        bold: false,
        advance: 4,
        line_height: 6,
    };

    pub const MEDIUM: Self = Self {
        scale: 1,
        bold: true,
        advance: 5,
        line_height: 7,
    };

    pub const LARGE: Self = Self {
        scale: 2,
        bold: false,
        advance: 8,
        line_height: 11,
    };

    fn glyph_width(&self) -> i32 {
        GLYPH_W * self.scale + i32::from(self.bold)
    }

    /// Rendered width of `text` in pixels.
    pub fn text_width(&self, text: &str) -> i32 {
        let n = text.chars().count() as i32;
        if n == 0 {
            0
        } else {
            self.advance.saturating_mul(n - 1).saturating_add(self.glyph_width())
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn render(&self, buf: &mut PixelBuffer, x: i32, y: i32, text: &str, black: bool) {
        for (i, ch) in text.chars().enumerate() {
            let Some(rows) = glyph(ch) else {
                continue;
            };
            let gx = x.saturating_add(self.advance.saturating_mul(i as i32));
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                        continue;
                    }
                    let px = gx.saturating_add(col * self.scale);
                    let py = y.saturating_add(row as i32 * self.scale);
                    let p2 = Point::new(
                        px.saturating_add(self.scale - 1),
                        py.saturating_add(self.scale - 1),
                    );
                    buf.fill_rect(Point::new(px, py), p2, black);
                    if self.bold {
                        buf.fill_rect(
                            Point::new(px.saturating_add(1), py),
                            Point::new(p2.x.saturating_add(1), p2.y),
                            black,
                        );
                    }
                }
            }
        }
    }

    /// Rendered height of a single line (without spacing).
    pub fn glyph_height(&self) -> i32 {
        GLYPH_H * self.scale
    }
}

/// Font lookup keyed by size. Sizes without a font draw nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontTable {
    fonts: [Option<BlockFont>; 3],
}

impl Default for FontTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FontTable {
    /// All three sizes of the block font.
    pub fn builtin() -> Self {
        Self {
            fonts: [
                Some(BlockFont::SMALL),
                Some(BlockFont::MEDIUM),
                Some(BlockFont::LARGE),
            ],
        }
    }

    /// No fonts at all; every text draw is a no-op.
    pub fn empty() -> Self {
        Self { fonts: [None; 3] }
    }

    pub fn with(mut self, size: FontSize, font: Option<BlockFont>) -> Self {
        self.fonts[size.index()] = font;
        self
    }

    pub fn get(&self, size: FontSize) -> Option<&BlockFont> {
        self.fonts[size.index()].as_ref()
    }

    pub fn line_height(&self, size: FontSize) -> Option<i32> {
        self.get(size).map(|f| f.line_height)
    }

    /// Draw aligned text into `buf`. Returns false if the size has no font.
    pub fn draw(
        &self,
        buf: &mut PixelBuffer,
        size: FontSize,
        at: Point,
        align: Alignment,
        text: &str,
    ) -> bool {
        let Some(font) = self.get(size) else {
            return false;
        };
        let x = align.start_x(at.x, font.text_width(text));
        font.render(buf, x, at.y, text, true);
        true
    }
}
