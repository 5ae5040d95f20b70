//! Headless recording surface.
//!
//! Renders into a [`PixelBuffer`] like the real backends and additionally
//! records text draws, commits, lights and brightness changes so tests (and
//! debug runs) can inspect what was shown. The logs keep only recent
//! entries, so a long headless run stays bounded.

use g15_types::error::{G15Error, Result};
use g15_types::geometry::{Alignment, FontSize, Indicator, Point, ProgressBarStyle};
use g15_types::surface::DrawingSurface;

use crate::font::FontTable;
use crate::pixels::PixelBuffer;

/// Recent entries kept in each call log. Older entries are dropped in
/// batches once a log reaches twice this size.
pub const LOG_LIMIT: usize = 1024;

fn record<T>(log: &mut Vec<T>, entry: T) {
    if log.len() >= 2 * LOG_LIMIT {
        log.drain(..log.len() - LOG_LIMIT);
    }
    log.push(entry);
}

/// A recorded text draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDraw {
    pub size: FontSize,
    pub at: Point,
    pub align: Alignment,
    pub text: String,
}

/// In-memory surface with a call log.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    buffer: PixelBuffer,
    fonts: FontTable,
    texts: Vec<TextDraw>,
    commits: usize,
    fail_commits: bool,
    lights: [bool; 3],
    brightness: Vec<u8>,
    contrast: Option<u8>,
    dump_frames: bool,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self {
            buffer: PixelBuffer::new(),
            fonts: FontTable::builtin(),
            texts: Vec::new(),
            commits: 0,
            fail_commits: false,
            lights: [false; 3],
            brightness: Vec::new(),
            contrast: None,
            dump_frames: false,
        }
    }

    pub fn with_fonts(mut self, fonts: FontTable) -> Self {
        self.fonts = fonts;
        self
    }

    /// Log every committed frame as ASCII art at debug level.
    pub fn with_frame_dump(mut self, on: bool) -> Self {
        self.dump_frames = on;
        self
    }

    /// Make every subsequent commit fail.
    pub fn set_failing(&mut self, failing: bool) {
        self.fail_commits = failing;
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn texts(&self) -> &[TextDraw] {
        &self.texts
    }

    /// Whether any recorded text draw contains `needle`.
    pub fn has_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| t.text.contains(needle))
    }

    /// Number of recorded text draws containing `needle`.
    pub fn text_count(&self, needle: &str) -> usize {
        self.texts.iter().filter(|t| t.text.contains(needle)).count()
    }

    pub fn last_text(&self) -> Option<&TextDraw> {
        self.texts.last()
    }

    /// Forget recorded text draws and brightness changes.
    pub fn clear_log(&mut self) {
        self.texts.clear();
        self.brightness.clear();
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Current state of an M-key light. `Indicator::All` reports whether
    /// any light is on.
    pub fn light(&self, which: Indicator) -> bool {
        match which {
            Indicator::All => self.lights.iter().any(|&on| on),
            Indicator::M1 => self.lights[0],
            Indicator::M2 => self.lights[1],
            Indicator::M3 => self.lights[2],
        }
    }

    /// Recent brightness levels, oldest first.
    pub fn brightness_log(&self) -> &[u8] {
        &self.brightness
    }

    pub fn contrast(&self) -> Option<u8> {
        self.contrast
    }
}

impl DrawingSurface for MemorySurface {
    fn clear(&mut self, black: bool) {
        self.buffer.clear(black);
    }

    fn fill_rect(&mut self, p1: Point, p2: Point, black: bool) {
        self.buffer.fill_rect(p1, p2, black);
    }

    fn draw_line(&mut self, p1: Point, p2: Point, black: bool) {
        self.buffer.line(p1, p2, black);
    }

    fn draw_box(&mut self, p1: Point, p2: Point, black: bool, thickness: u32) {
        self.buffer.draw_box(p1, p2, black, thickness);
    }

    fn draw_rounded_rect(&mut self, p1: Point, p2: Point, black: bool, filled: bool) {
        self.buffer.rounded_rect(p1, p2, black, filled);
    }

    fn draw_circle(&mut self, center: Point, radius: i32, black: bool, filled: bool) {
        self.buffer.circle(center, radius, black, filled);
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
        self.buffer.progress_bar(p1, p2, black, pos, max, style);
    }

    fn set_pixel(&mut self, at: Point, black: bool) {
        self.buffer.set(at, black);
    }

    fn reverse_region(&mut self, p1: Point, p2: Point) {
        self.buffer.reverse(p1, p2);
    }

    fn draw_bitmap(&mut self, at: Point, width: u32, height: u32, bits: &[bool]) {
        self.buffer.blit(at, width, height, bits);
    }

    fn draw_text(&mut self, size: FontSize, at: Point, align: Alignment, text: &str) {
        if self.fonts.draw(&mut self.buffer, size, at, align, text) {
            record(
                &mut self.texts,
                TextDraw {
                    size,
                    at,
                    align,
                    text: text.to_string(),
                },
            );
        }
    }

    fn line_height(&self, size: FontSize) -> Option<i32> {
        self.fonts.line_height(size)
    }

    fn commit(&mut self) -> Result<()> {
        if self.fail_commits {
            return Err(G15Error::Transport("memory surface set to fail".into()));
        }
        self.commits += 1;
        if self.dump_frames && self.buffer.is_dirty() {
            log::debug!("frame {}:\n{}", self.commits, self.buffer.to_ascii());
        }
        self.buffer.mark_committed();
        Ok(())
    }

    fn set_indicator_light(&mut self, which: Indicator, on: bool) -> bool {
        match which {
            Indicator::All => self.lights = [on; 3],
            Indicator::M1 => self.lights[0] = on,
            Indicator::M2 => self.lights[1] = on,
            Indicator::M3 => self.lights[2] = on,
        }
        true
    }

    fn set_contrast(&mut self, level: u8) -> bool {
        self.contrast = Some(level);
        true
    }

    fn set_brightness(&mut self, level: u8) -> bool {
        record(&mut self.brightness, level);
        true
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_text_and_renders() {
        let mut s = MemorySurface::new();
        s.draw_text(FontSize::Small, Point::new(4, 2), Alignment::Left, "Hello");
        assert!(s.has_text("Hello"));
        assert_eq!(s.text_count("ell"), 1);
        assert!(s.buffer().black_count() > 0);
    }

    #[test]
    fn text_without_font_is_not_recorded() {
        let mut s = MemorySurface::new().with_fonts(FontTable::empty());
        s.draw_text(FontSize::Small, Point::new(0, 0), Alignment::Left, "x");
        assert!(s.texts().is_empty());
        assert_eq!(s.buffer().black_count(), 0);
    }

    #[test]
    fn text_lines_stack_by_line_height() {
        let mut s = MemorySurface::new();
        s.draw_text_lines(FontSize::Small, Point::new(0, 10), Alignment::Left, &["a", "b"]);
        assert_eq!(s.texts()[0].at, Point::new(0, 10));
        assert_eq!(s.texts()[1].at, Point::new(0, 16));
    }

    #[test]
    fn commit_counts_and_fails_on_demand() {
        let mut s = MemorySurface::new();
        s.commit().unwrap();
        assert_eq!(s.commit_count(), 1);
        s.set_failing(true);
        assert!(s.commit().is_err());
        assert!(!s.commit_silently());
        assert_eq!(s.commit_count(), 1);
    }

    #[test]
    fn lights_track_state() {
        let mut s = MemorySurface::new();
        assert!(s.set_indicator_light(Indicator::M2, true));
        assert!(s.light(Indicator::M2));
        assert!(!s.light(Indicator::M1));
        s.set_indicator_light(Indicator::All, false);
        assert!(!s.light(Indicator::All));
    }

    #[test]
    fn brightness_is_logged() {
        let mut s = MemorySurface::new();
        s.set_brightness(2);
        s.set_brightness(0);
        assert_eq!(s.brightness_log(), &[2, 0]);
        s.clear_log();
        assert!(s.brightness_log().is_empty());
    }

    #[test]
    fn logs_stay_bounded_on_long_runs() {
        let mut s = MemorySurface::new();
        for i in 0..3 * LOG_LIMIT {
            s.draw_text(FontSize::Small, Point::new(0, 0), Alignment::Left, &format!("t{i}"));
            s.set_brightness((i % 3) as u8);
        }
        assert!(s.texts().len() <= 2 * LOG_LIMIT);
        assert!(s.texts().len() >= LOG_LIMIT);
        assert!(s.brightness_log().len() <= 2 * LOG_LIMIT);
        assert_eq!(s.last_text().unwrap().text, format!("t{}", 3 * LOG_LIMIT - 1));
        assert!(!s.has_text("t0"));
    }
}
