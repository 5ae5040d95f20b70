//! The drawing surface contract.
//!
//! Every rendering backend implements [`DrawingSurface`]. The controller, the
//! built-in home screen and all plugins draw exclusively through this trait
//! and never touch a transport directly.
//!
//! Drawing operations are pure mutations of a 160x43 monochrome buffer and
//! never fail: out-of-range coordinates are clipped. Only `commit` talks to
//! the backend and can fail. Hardware controls (lights, contrast,
//! brightness) soft-fail by returning `false` when a backend lacks them.

use crate::error::Result;
use crate::geometry::{
    Alignment, FontSize, Indicator, LCD_HEIGHT, LCD_WIDTH, Point, ProgressBarStyle,
};

/// A monochrome LCD drawing surface.
pub trait DrawingSurface {
    // -- Buffer primitives ---------------------------------------------------

    /// Fill the whole buffer.
    fn clear(&mut self, black: bool);

    /// Fill the rectangle spanned by two inclusive corners.
    fn fill_rect(&mut self, p1: Point, p2: Point, black: bool);

    fn draw_line(&mut self, p1: Point, p2: Point, black: bool);

    /// Rectangle outline `thickness` pixels wide.
    fn draw_box(&mut self, p1: Point, p2: Point, black: bool, thickness: u32);

    fn draw_rounded_rect(&mut self, p1: Point, p2: Point, black: bool, filled: bool);

    fn draw_circle(&mut self, center: Point, radius: i32, black: bool, filled: bool);

    /// Progress bar showing `pos` out of `max`.
    fn draw_progress_bar(
        &mut self,
        p1: Point,
        p2: Point,
        black: bool,
        pos: i32,
        max: i32,
        style: ProgressBarStyle,
    );

    fn set_pixel(&mut self, at: Point, black: bool);

    /// Invert every pixel inside the rectangle.
    fn reverse_region(&mut self, p1: Point, p2: Point);

    /// Blit a row-major bitmap of `width * height` pixels.
    fn draw_bitmap(&mut self, at: Point, width: u32, height: u32, bits: &[bool]);

    // -- Text ----------------------------------------------------------------

    /// Draw one line of text. A no-op if no font exists for `size`.
    fn draw_text(&mut self, size: FontSize, at: Point, align: Alignment, text: &str);

    /// Height of one text line, or `None` if the font is unavailable.
    fn line_height(&self, size: FontSize) -> Option<i32>;

    /// Draw several lines stacked downward from `at`.
    fn draw_text_lines(&mut self, size: FontSize, at: Point, align: Alignment, lines: &[&str]) {
        let Some(step) = self.line_height(size) else {
            return;
        };
        for (i, line) in lines.iter().enumerate() {
            let y = at.y + step * i as i32;
            self.draw_text(size, Point::new(at.x, y), align, line);
        }
    }

    // -- Transport -----------------------------------------------------------

    /// Push the buffer to the backend.
    fn commit(&mut self) -> Result<()>;

    /// Commit, logging any failure instead of returning it.
    fn commit_silently(&mut self) -> bool {
        match self.commit() {
            Ok(()) => true,
            Err(e) => {
                log::debug!("commit failed: {e}");
                false
            },
        }
    }

    // -- Hardware controls ---------------------------------------------------

    fn set_indicator_light(&mut self, _which: Indicator, _on: bool) -> bool {
        false
    }

    fn set_contrast(&mut self, _level: u8) -> bool {
        false
    }

    fn set_brightness(&mut self, _level: u8) -> bool {
        false
    }

    // -- Geometry ------------------------------------------------------------

    fn width(&self) -> i32 {
        LCD_WIDTH
    }

    fn height(&self) -> i32 {
        LCD_HEIGHT
    }

    /// Short backend name for logging.
    fn backend_name(&self) -> &str;
}

impl<T: DrawingSurface + ?Sized> DrawingSurface for Box<T> {
    fn clear(&mut self, black: bool) {
        (**self).clear(black)
    }

    fn fill_rect(&mut self, p1: Point, p2: Point, black: bool) {
        (**self).fill_rect(p1, p2, black)
    }

    fn draw_line(&mut self, p1: Point, p2: Point, black: bool) {
        (**self).draw_line(p1, p2, black)
    }

    fn draw_box(&mut self, p1: Point, p2: Point, black: bool, thickness: u32) {
        (**self).draw_box(p1, p2, black, thickness)
    }

    fn draw_rounded_rect(&mut self, p1: Point, p2: Point, black: bool, filled: bool) {
        (**self).draw_rounded_rect(p1, p2, black, filled)
    }

    fn draw_circle(&mut self, center: Point, radius: i32, black: bool, filled: bool) {
        (**self).draw_circle(center, radius, black, filled)
    }

    fn draw_progress_bar(
        &mut self,
        p1: Point,
        p2: Point,
        black: bool,
        pos: i32,
        max: i32,
        style: ProgressBarStyle,
    ) {
        (**self).draw_progress_bar(p1, p2, black, pos, max, style)
    }

    fn set_pixel(&mut self, at: Point, black: bool) {
        (**self).set_pixel(at, black)
    }

    fn reverse_region(&mut self, p1: Point, p2: Point) {
        (**self).reverse_region(p1, p2)
    }

    fn draw_bitmap(&mut self, at: Point, width: u32, height: u32, bits: &[bool]) {
        (**self).draw_bitmap(at, width, height, bits)
    }

    fn draw_text(&mut self, size: FontSize, at: Point, align: Alignment, text: &str) {
        (**self).draw_text(size, at, align, text)
    }

    fn line_height(&self, size: FontSize) -> Option<i32> {
        (**self).line_height(size)
    }

    fn draw_text_lines(&mut self, size: FontSize, at: Point, align: Alignment, lines: &[&str]) {
        (**self).draw_text_lines(size, at, align, lines)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn commit_silently(&mut self) -> bool {
        (**self).commit_silently()
    }

    fn set_indicator_light(&mut self, which: Indicator, on: bool) -> bool {
        (**self).set_indicator_light(which, on)
    }

    fn set_contrast(&mut self, level: u8) -> bool {
        (**self).set_contrast(level)
    }

    fn set_brightness(&mut self, level: u8) -> bool {
        (**self).set_brightness(level)
    }

    fn width(&self) -> i32 {
        (**self).width()
    }

    fn height(&self) -> i32 {
        (**self).height()
    }

    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }
}
