//! Software pixel buffer shared by every surface implementation.
//!
//! Holds the working 160x43 grid plus a copy of the last committed frame so
//! backends can skip unchanged commits. All primitives clip silently.

use g15_types::geometry::{LCD_HEIGHT, LCD_WIDTH, Point, ProgressBarStyle, normalize};

const CELLS: usize = (LCD_WIDTH * LCD_HEIGHT) as usize;

/// A monochrome frame buffer. `true` is a black (lit) pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    cells: Vec<bool>,
    committed: Vec<bool>,
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelBuffer {
    /// A blank (all white) buffer.
    pub fn new() -> Self {
        Self {
            cells: vec![false; CELLS],
            committed: vec![false; CELLS],
        }
    }

    fn index(x: i32, y: i32) -> Option<usize> {
        if (0..LCD_WIDTH).contains(&x) && (0..LCD_HEIGHT).contains(&y) {
            Some((y * LCD_WIDTH + x) as usize)
        } else {
            None
        }
    }

    /// Pixel at `p`; off-panel reads as white.
    pub fn get(&self, p: Point) -> bool {
        Self::index(p.x, p.y).is_some_and(|i| self.cells[i])
    }

    pub fn set(&mut self, p: Point, black: bool) {
        self.plot(p.x, p.y, black);
    }

    fn plot(&mut self, x: i32, y: i32, black: bool) {
        if let Some(i) = Self::index(x, y) {
            self.cells[i] = black;
        }
    }

    /// Row-major pixel slice.
    pub fn pixels(&self) -> &[bool] {
        &self.cells
    }

    pub fn black_count(&self) -> usize {
        self.cells.iter().filter(|&&b| b).count()
    }

    // -- Commit bookkeeping --------------------------------------------------

    /// Whether the buffer differs from the last committed frame.
    pub fn is_dirty(&self) -> bool {
        self.cells != self.committed
    }

    pub fn mark_committed(&mut self) {
        self.committed.copy_from_slice(&self.cells);
    }

    pub fn committed(&self) -> &[bool] {
        &self.committed
    }

    /// Render as text, one row per line (`#` black, `.` white).
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(CELLS + LCD_HEIGHT as usize);
        for row in self.cells.chunks(LCD_WIDTH as usize) {
            out.extend(row.iter().map(|&b| if b { '#' } else { '.' }));
            out.push('\n');
        }
        out
    }

    // -- Primitives ----------------------------------------------------------
    //
    // Shapes are rasterized in i64 and only over the part that can land on
    // the panel, so any i32 input is safe and cheap.

    fn plot_wide(&mut self, x: i64, y: i64, black: bool) {
        if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
            self.plot(x, y, black);
        }
    }

    /// Fill the inclusive area, clamped to the panel.
    fn fill_area(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, black: bool) {
        let (xs, xe) = (x0.max(0), x1.min(i64::from(LCD_WIDTH) - 1));
        let (ys, ye) = (y0.max(0), y1.min(i64::from(LCD_HEIGHT) - 1));
        for y in ys..=ye {
            for x in xs..=xe {
                self.plot_wide(x, y, black);
            }
        }
    }

    pub fn clear(&mut self, black: bool) {
        self.cells.fill(black);
    }

    /// Fill the inclusive rectangle between two corners.
    pub fn fill_rect(&mut self, p1: Point, p2: Point, black: bool) {
        let (a, b) = normalize(p1, p2);
        self.fill_area(a.x.into(), a.y.into(), b.x.into(), b.y.into(), black);
    }

    /// Bresenham line over the part of the segment inside the panel.
    pub fn line(&mut self, p1: Point, p2: Point, black: bool) {
        let Some((from, to)) = clip_line(p1, p2) else {
            return;
        };
        let (mut x, mut y) = (from.x, from.y);
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x, y, black);
            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Rectangle outline, `thickness` pixels wide, growing inward.
    pub fn draw_box(&mut self, p1: Point, p2: Point, black: bool, thickness: u32) {
        let (a, b) = normalize(p1, p2);
        let (l, t, r, bot) = (i64::from(a.x), i64::from(a.y), i64::from(b.x), i64::from(b.y));
        let w = i64::from(thickness.max(1)) - 1;
        self.fill_area(l, t, r, (t + w).min(bot), black);
        self.fill_area(l, (bot - w).max(t), r, bot, black);
        self.fill_area(l, t, (l + w).min(r), bot, black);
        self.fill_area((r - w).max(l), t, r, bot, black);
    }

    /// Rectangle with corners cut back by two pixels.
    pub fn rounded_rect(&mut self, p1: Point, p2: Point, black: bool, filled: bool) {
        let (a, b) = normalize(p1, p2);
        let (l, t, r, bot) = (i64::from(a.x), i64::from(a.y), i64::from(b.x), i64::from(b.y));
        if r - l < 4 || bot - t < 4 {
            if filled {
                self.fill_rect(a, b, black);
            } else {
                self.draw_box(a, b, black, 1);
            }
            return;
        }
        if filled {
            for y in t.max(0)..=bot.min(i64::from(LCD_HEIGHT) - 1) {
                let inset = match (y - t).min(bot - y) {
                    0 => 2,
                    1 => 1,
                    _ => 0,
                };
                self.fill_area(l + inset, y, r - inset, y, black);
            }
            return;
        }
        self.fill_area(l + 2, t, r - 2, t, black);
        self.fill_area(l + 2, bot, r - 2, bot, black);
        self.fill_area(l, t + 2, l, bot - 2, black);
        self.fill_area(r, t + 2, r, bot - 2, black);
        self.plot_wide(l + 1, t + 1, black);
        self.plot_wide(r - 1, t + 1, black);
        self.plot_wide(l + 1, bot - 1, black);
        self.plot_wide(r - 1, bot - 1, black);
    }

    /// Circle of `radius` around `c`, walked row by row and column by
    /// column over the visible window.
    pub fn circle(&mut self, c: Point, radius: i32, black: bool, filled: bool) {
        if radius < 0 {
            return;
        }
        let (cx, cy, r) = (i64::from(c.x), i64::from(c.y), i64::from(radius));
        let rows = (cy - r).max(0)..=(cy + r).min(i64::from(LCD_HEIGHT) - 1);
        for y in rows {
            let half = chord(r, y - cy);
            if filled {
                self.fill_area(cx - half, y, cx + half, y, black);
            } else {
                self.plot_wide(cx - half, y, black);
                self.plot_wide(cx + half, y, black);
            }
        }
        if filled {
            return;
        }
        for x in (cx - r).max(0)..=(cx + r).min(i64::from(LCD_WIDTH) - 1) {
            let half = chord(r, x - cx);
            self.plot_wide(x, cy - half, black);
            self.plot_wide(x, cy + half, black);
        }
    }

    /// Horizontal progress bar filled to `pos / max`.
    pub fn progress_bar(
        &mut self,
        p1: Point,
        p2: Point,
        black: bool,
        pos: i32,
        max: i32,
        style: ProgressBarStyle,
    ) {
        let (a, b) = normalize(p1, p2);
        let (mut l, mut t, mut r, mut bot) =
            (i64::from(a.x), i64::from(a.y), i64::from(b.x), i64::from(b.y));
        if style != ProgressBarStyle::Solid {
            self.draw_box(a, b, black, 1);
            (l, t, r, bot) = (l + 1, t + 1, r - 1, bot - 1);
        }
        let width = r - l + 1;
        if width <= 0 || bot < t {
            return;
        }
        let filled = if max <= 0 {
            0
        } else {
            (i128::from(pos.clamp(0, max)) * i128::from(width) / i128::from(max)) as i64
        };
        if filled > 0 {
            self.fill_area(l, t, l + filled - 1, bot, black);
        }
        if style == ProgressBarStyle::Ticked {
            for tenth in 1..10 {
                let x = l + width * tenth / 10;
                let tick = if x < l + filled { !black } else { black };
                self.plot_wide(x, t, tick);
                self.plot_wide(x, bot, tick);
            }
        }
    }

    /// Invert the inclusive rectangle.
    pub fn reverse(&mut self, p1: Point, p2: Point) {
        let (a, b) = normalize(p1, p2);
        for y in a.y.max(0)..=b.y.min(LCD_HEIGHT - 1) {
            for x in a.x.max(0)..=b.x.min(LCD_WIDTH - 1) {
                if let Some(i) = Self::index(x, y) {
                    self.cells[i] = !self.cells[i];
                }
            }
        }
    }

    /// Copy a row-major bitmap. Missing bits read as white.
    pub fn blit(&mut self, at: Point, width: u32, height: u32, bits: &[bool]) {
        let (x0, y0) = (i64::from(at.x), i64::from(at.y));
        let w = i64::from(width);
        let rows = (-y0).max(0)..i64::from(height).min(i64::from(LCD_HEIGHT) - y0);
        for row in rows {
            for col in (-x0).max(0)..w.min(i64::from(LCD_WIDTH) - x0) {
                let black = usize::try_from(row * w + col)
                    .ok()
                    .and_then(|i| bits.get(i).copied())
                    .unwrap_or(false);
                self.plot_wide(x0 + col, y0 + row, black);
            }
        }
    }
}

/// Half-width of the circle of radius `r` at offset `d` from its center,
/// rounded to the nearest pixel.
fn chord(r: i64, d: i64) -> i64 {
    let v = r * r - d * d;
    let s = v.isqrt();
    if v - s * s > s { s + 1 } else { s }
}

/// Liang-Barsky clip of a segment to the panel. `None` when nothing of it
/// is visible.
fn clip_line(p1: Point, p2: Point) -> Option<(Point, Point)> {
    let (x0, y0) = (f64::from(p1.x), f64::from(p1.y));
    let (dx, dy) = (f64::from(p2.x) - x0, f64::from(p2.y) - y0);
    let (xmax, ymax) = (f64::from(LCD_WIDTH - 1), f64::from(LCD_HEIGHT - 1));
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, x0), (dx, xmax - x0), (-dy, y0), (dy, ymax - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let ratio = q / p;
        if p < 0.0 {
            if ratio > t1 {
                return None;
            }
            t0 = t0.max(ratio);
        } else {
            if ratio < t0 {
                return None;
            }
            t1 = t1.min(ratio);
        }
    }
    let at = |t: f64| {
        Point::new(
            (x0 + t * dx).round().clamp(0.0, xmax) as i32,
            (y0 + t * dy).round().clamp(0.0, ymax) as i32,
        )
    };
    Some((at(t0), at(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_buffer_is_blank_and_clean() {
        let buf = PixelBuffer::new();
        assert_eq!(buf.black_count(), 0);
        assert!(!buf.is_dirty());
    }

    #[test]
    fn set_and_get() {
        let mut buf = PixelBuffer::new();
        buf.set(Point::new(3, 4), true);
        assert!(buf.get(Point::new(3, 4)));
        assert!(!buf.get(Point::new(4, 3)));
        assert!(buf.is_dirty());
        buf.mark_committed();
        assert!(!buf.is_dirty());
    }

    #[test]
    fn out_of_range_is_clipped() {
        let mut buf = PixelBuffer::new();
        buf.set(Point::new(-1, 0), true);
        buf.set(Point::new(160, 0), true);
        buf.set(Point::new(0, 43), true);
        assert_eq!(buf.black_count(), 0);
        assert!(!buf.get(Point::new(500, 500)));
    }

    #[test]
    fn fill_rect_is_inclusive_and_order_free() {
        let mut buf = PixelBuffer::new();
        buf.fill_rect(Point::new(4, 4), Point::new(2, 2), true);
        assert_eq!(buf.black_count(), 9);
    }

    #[test]
    fn fill_rect_clips_to_panel() {
        let mut buf = PixelBuffer::new();
        buf.fill_rect(Point::new(-10, -10), Point::new(1000, 1000), true);
        assert_eq!(buf.black_count(), CELLS);
    }

    #[test]
    fn diagonal_line() {
        let mut buf = PixelBuffer::new();
        buf.line(Point::new(0, 0), Point::new(5, 5), true);
        assert_eq!(buf.black_count(), 6);
        for i in 0..6 {
            assert!(buf.get(Point::new(i, i)));
        }
    }

    #[test]
    fn box_outline_leaves_inside_white() {
        let mut buf = PixelBuffer::new();
        buf.draw_box(Point::new(0, 0), Point::new(9, 9), true, 1);
        assert_eq!(buf.black_count(), 36);
        assert!(!buf.get(Point::new(5, 5)));
    }

    #[test]
    fn thick_box_fills_rings() {
        let mut buf = PixelBuffer::new();
        buf.draw_box(Point::new(0, 0), Point::new(9, 9), true, 2);
        assert_eq!(buf.black_count(), 36 + 28);
    }

    #[test]
    fn rounded_rect_cuts_corners() {
        let mut buf = PixelBuffer::new();
        buf.rounded_rect(Point::new(0, 0), Point::new(159, 42), true, false);
        assert!(!buf.get(Point::new(0, 0)));
        assert!(buf.get(Point::new(1, 1)));
        assert!(buf.get(Point::new(80, 0)));
        assert!(buf.get(Point::new(0, 20)));
        assert!(!buf.get(Point::new(80, 20)));
    }

    #[test]
    fn filled_rounded_rect() {
        let mut buf = PixelBuffer::new();
        buf.rounded_rect(Point::new(0, 0), Point::new(9, 9), true, true);
        assert!(!buf.get(Point::new(0, 0)));
        assert!(!buf.get(Point::new(1, 0)));
        assert!(buf.get(Point::new(2, 0)));
        assert!(buf.get(Point::new(5, 5)));
    }

    #[test]
    fn circle_outline_hits_cardinal_points() {
        let mut buf = PixelBuffer::new();
        let c = Point::new(20, 20);
        buf.circle(c, 5, true, false);
        for p in [(25, 20), (15, 20), (20, 25), (20, 15)] {
            assert!(buf.get(Point::new(p.0, p.1)));
        }
        assert!(!buf.get(c));
    }

    #[test]
    fn filled_circle_covers_center() {
        let mut buf = PixelBuffer::new();
        buf.circle(Point::new(20, 20), 3, true, true);
        assert!(buf.get(Point::new(20, 20)));
        assert!(buf.get(Point::new(22, 20)));
    }

    #[test]
    fn progress_bar_half_full() {
        let mut buf = PixelBuffer::new();
        buf.progress_bar(
            Point::new(0, 0),
            Point::new(11, 4),
            true,
            50,
            100,
            ProgressBarStyle::Outlined,
        );
        // Inner area is 10 wide; half of it is filled.
        assert!(buf.get(Point::new(1, 2)));
        assert!(buf.get(Point::new(5, 2)));
        assert!(!buf.get(Point::new(6, 2)));
        assert!(buf.get(Point::new(11, 2)));
    }

    #[test]
    fn progress_bar_zero_max_draws_only_outline() {
        let mut buf = PixelBuffer::new();
        buf.progress_bar(
            Point::new(0, 0),
            Point::new(11, 4),
            true,
            5,
            0,
            ProgressBarStyle::Outlined,
        );
        assert_eq!(buf.black_count(), 2 * 12 + 2 * 3);
    }

    #[test]
    fn solid_progress_bar_has_no_outline() {
        let mut buf = PixelBuffer::new();
        buf.progress_bar(
            Point::new(0, 0),
            Point::new(9, 0),
            true,
            3,
            10,
            ProgressBarStyle::Solid,
        );
        assert_eq!(buf.black_count(), 3);
    }

    #[test]
    fn reverse_inverts() {
        let mut buf = PixelBuffer::new();
        buf.set(Point::new(1, 1), true);
        buf.reverse(Point::new(0, 0), Point::new(1, 1));
        assert!(!buf.get(Point::new(1, 1)));
        assert!(buf.get(Point::new(0, 0)));
        assert_eq!(buf.black_count(), 3);
    }

    #[test]
    fn blit_copies_bits() {
        let mut buf = PixelBuffer::new();
        buf.blit(Point::new(10, 10), 2, 2, &[true, false, false, true]);
        assert!(buf.get(Point::new(10, 10)));
        assert!(!buf.get(Point::new(11, 10)));
        assert!(buf.get(Point::new(11, 11)));
    }

    #[test]
    fn ascii_dump_shape() {
        let mut buf = PixelBuffer::new();
        buf.set(Point::new(0, 0), true);
        let dump = buf.to_ascii();
        assert_eq!(dump.lines().count(), LCD_HEIGHT as usize);
        assert!(dump.starts_with("#."));
    }

    #[test]
    fn extreme_line_is_clipped_to_panel_row() {
        let mut buf = PixelBuffer::new();
        buf.line(Point::new(i32::MIN + 1, 0), Point::new(i32::MAX, 0), true);
        assert_eq!(buf.black_count(), LCD_WIDTH as usize);
        assert!(buf.get(Point::new(0, 0)));
        assert!(buf.get(Point::new(159, 0)));
    }

    #[test]
    fn line_crossing_the_panel_keeps_its_slope() {
        let mut buf = PixelBuffer::new();
        buf.line(Point::new(-100, -100), Point::new(200, 200), true);
        for i in 0..LCD_HEIGHT {
            assert!(buf.get(Point::new(i, i)));
        }
        assert_eq!(buf.black_count(), LCD_HEIGHT as usize);
    }

    #[test]
    fn line_entirely_off_panel_draws_nothing() {
        let mut buf = PixelBuffer::new();
        buf.line(Point::new(-50, 10), Point::new(-1, 30), true);
        buf.line(Point::new(i32::MIN, i32::MIN), Point::new(i32::MAX, i32::MIN), true);
        assert_eq!(buf.black_count(), 0);
    }

    #[test]
    fn huge_filled_circle_covers_panel() {
        let mut buf = PixelBuffer::new();
        buf.circle(Point::new(80, 21), 20_000, true, true);
        assert_eq!(buf.black_count(), CELLS);
        let mut buf = PixelBuffer::new();
        buf.circle(Point::new(80, 21), i32::MAX, true, false);
        assert_eq!(buf.black_count(), 0);
    }

    #[test]
    fn far_circle_outline_touching_panel() {
        let mut buf = PixelBuffer::new();
        // Leftmost point of the ring lands on (0, 21).
        buf.circle(Point::new(1_000_000, 21), 1_000_000, true, false);
        assert!(buf.get(Point::new(0, 21)));
        assert!(buf.black_count() < CELLS);
    }

    #[test]
    fn extreme_rects_and_boxes_are_clipped() {
        let (lo, hi) = (Point::new(i32::MIN, i32::MIN), Point::new(i32::MAX, i32::MAX));
        let mut buf = PixelBuffer::new();
        buf.rounded_rect(lo, hi, true, false);
        buf.draw_box(lo, hi, true, u32::MAX);
        assert_eq!(buf.black_count(), CELLS);

        let mut buf = PixelBuffer::new();
        buf.rounded_rect(lo, hi, true, true);
        assert_eq!(buf.black_count(), CELLS);

        let mut buf = PixelBuffer::new();
        buf.rounded_rect(Point::new(-1, -1), Point::new(i32::MAX, i32::MAX), true, false);
        assert!(buf.get(Point::new(0, 0)));
        assert!(!buf.get(Point::new(1, 1)));
    }

    #[test]
    fn extreme_progress_bar_and_blit() {
        let mut buf = PixelBuffer::new();
        buf.progress_bar(
            Point::new(i32::MIN, 0),
            Point::new(i32::MAX, 10),
            true,
            i32::MAX,
            i32::MAX,
            ProgressBarStyle::Ticked,
        );
        assert!(buf.get(Point::new(80, 5)));
        buf.blit(Point::new(i32::MAX, i32::MAX), u32::MAX, u32::MAX, &[true]);
        // Missing bits are white, so this wipes the panel.
        buf.blit(Point::new(-1, -1), u32::MAX, u32::MAX, &[]);
        assert_eq!(buf.black_count(), 0);
    }

    proptest! {
        #[test]
        fn lines_never_panic(x1 in -300i32..300, y1 in -300i32..300, x2 in -300i32..300, y2 in -300i32..300) {
            let mut buf = PixelBuffer::new();
            buf.line(Point::new(x1, y1), Point::new(x2, y2), true);
            prop_assert!(buf.black_count() <= CELLS);
        }

        #[test]
        fn any_shape_stays_on_panel(
            x1 in any::<i32>(),
            y1 in any::<i32>(),
            x2 in any::<i32>(),
            y2 in any::<i32>(),
            r in any::<i32>(),
        ) {
            let mut buf = PixelBuffer::new();
            let (p1, p2) = (Point::new(x1, y1), Point::new(x2, y2));
            buf.line(p1, p2, true);
            buf.draw_box(p1, p2, true, 3);
            buf.rounded_rect(p1, p2, true, false);
            buf.circle(p1, r, true, false);
            prop_assert!(buf.black_count() <= CELLS);
        }

        #[test]
        fn progress_fill_is_monotonic(pos in 0i32..=100) {
            let mut a = PixelBuffer::new();
            let mut b = PixelBuffer::new();
            let (p1, p2) = (Point::new(0, 0), Point::new(50, 6));
            a.progress_bar(p1, p2, true, pos, 100, ProgressBarStyle::Outlined);
            b.progress_bar(p1, p2, true, (pos + 1).min(100), 100, ProgressBarStyle::Outlined);
            prop_assert!(a.black_count() <= b.black_count());
        }
    }
}
