//! Composer line-protocol surface.
//!
//! Drawing calls become text instructions for an external composer process
//! (usually read from a named pipe). Instructions are buffered and written
//! on commit; light, contrast and brightness changes are written at once.
//! A mirrored [`PixelBuffer`] keeps local state for dirty tracking.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use g15_types::error::{G15Error, Result};
use g15_types::geometry::{Alignment, FontSize, Indicator, Point, ProgressBarStyle};
use g15_types::surface::DrawingSurface;

use crate::font::FontTable;
use crate::pixels::PixelBuffer;

fn color(black: bool) -> u8 {
    u8::from(black)
}

/// Quote a string argument, escaping embedded quotes and backslashes.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Surface that speaks the composer protocol over any writer.
pub struct ComposerSurface<W: Write> {
    writer: W,
    pending: Vec<String>,
    mirror: PixelBuffer,
    fonts: FontTable,
    type3_workaround: bool,
}

impl ComposerSurface<File> {
    /// Open a composer pipe for writing.
    pub fn open(pipe: &Path) -> Result<Self> {
        let file = OpenOptions::new().write(true).open(pipe).map_err(|e| {
            G15Error::Transport(format!("cannot open composer pipe {}: {e}", pipe.display()))
        })?;
        log::info!("composer pipe opened: {}", pipe.display());
        Ok(Self::new(file))
    }
}

impl<W: Write> ComposerSurface<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pending: Vec::new(),
            mirror: PixelBuffer::new(),
            fonts: FontTable::builtin(),
            type3_workaround: false,
        }
    }

    /// Precede every style-3 progress bar with a style-1 bar, for composer
    /// builds that render style 3 incorrectly on a fresh area.
    pub fn with_type3_workaround(mut self, on: bool) -> Self {
        self.type3_workaround = on;
        self
    }

    /// Instructions queued for the next commit.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn mirror(&self) -> &PixelBuffer {
        &self.mirror
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn queue(&mut self, line: String) {
        self.pending.push(line);
    }

    /// Write one instruction immediately.
    fn send_now(&mut self, line: &str) -> bool {
        let res = writeln!(self.writer, "{line}").and_then(|()| self.writer.flush());
        if let Err(e) = res {
            log::warn!("composer write failed ({line}): {e}");
            return false;
        }
        true
    }
}

impl<W: Write> DrawingSurface for ComposerSurface<W> {
    fn clear(&mut self, black: bool) {
        self.mirror.clear(black);
        self.queue(format!("PC {}", color(black)));
    }

    fn fill_rect(&mut self, p1: Point, p2: Point, black: bool) {
        self.mirror.fill_rect(p1, p2, black);
        self.queue(format!("PF {} {} {} {} {}", p1.x, p1.y, p2.x, p2.y, color(black)));
    }

    fn draw_line(&mut self, p1: Point, p2: Point, black: bool) {
        self.mirror.line(p1, p2, black);
        self.queue(format!("DL {} {} {} {} {}", p1.x, p1.y, p2.x, p2.y, color(black)));
    }

    fn draw_box(&mut self, p1: Point, p2: Point, black: bool, thickness: u32) {
        self.mirror.draw_box(p1, p2, black, thickness);
        self.queue(format!(
            "PB {} {} {} {} {} {} 0",
            p1.x,
            p1.y,
            p2.x,
            p2.y,
            color(black),
            thickness
        ));
    }

    fn draw_rounded_rect(&mut self, p1: Point, p2: Point, black: bool, filled: bool) {
        self.mirror.rounded_rect(p1, p2, black, filled);
        self.queue(format!(
            "DR {} {} {} {} {} {}",
            p1.x,
            p1.y,
            p2.x,
            p2.y,
            color(black),
            u8::from(filled)
        ));
    }

    fn draw_circle(&mut self, center: Point, radius: i32, black: bool, filled: bool) {
        self.mirror.circle(center, radius, black, filled);
        self.queue(format!(
            "DC {} {} {} {} {}",
            center.x,
            center.y,
            radius,
            color(black),
            u8::from(filled)
        ));
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
        let mut styles = vec![style];
        if self.type3_workaround && style == ProgressBarStyle::Ticked {
            styles.insert(0, ProgressBarStyle::Outlined);
        }
        for s in styles {
            self.mirror.progress_bar(p1, p2, black, pos, max, s);
            self.queue(format!(
                "DB {} {} {} {} {} {} {} {}",
                p1.x,
                p1.y,
                p2.x,
                p2.y,
                color(black),
                pos,
                max,
                s.code()
            ));
        }
    }

    fn set_pixel(&mut self, at: Point, black: bool) {
        self.mirror.set(at, black);
        self.queue(format!("PS {} {} {}", at.x, at.y, color(black)));
    }

    fn reverse_region(&mut self, p1: Point, p2: Point) {
        self.mirror.reverse(p1, p2);
        self.queue(format!("PR {} {} {} {}", p1.x, p1.y, p2.x, p2.y));
    }

    fn draw_bitmap(&mut self, at: Point, width: u32, height: u32, bits: &[bool]) {
        self.mirror.blit(at, width, height, bits);
        let count = (width * height) as usize;
        let encoded: String = (0..count)
            .map(|i| if bits.get(i).copied().unwrap_or(false) { '1' } else { '0' })
            .collect();
        self.queue(format!("PO {} {} {} {} \"{encoded}\"", at.x, at.y, width, height));
    }

    fn draw_text(&mut self, size: FontSize, at: Point, align: Alignment, text: &str) {
        self.draw_text_lines(size, at, align, &[text]);
    }

    fn line_height(&self, size: FontSize) -> Option<i32> {
        self.fonts.line_height(size)
    }

    fn draw_text_lines(&mut self, size: FontSize, at: Point, align: Alignment, lines: &[&str]) {
        if lines.is_empty() {
            return;
        }
        if let Some(step) = self.fonts.line_height(size) {
            for (i, line) in lines.iter().enumerate() {
                let p = Point::new(at.x, at.y + step * i as i32);
                self.fonts.draw(&mut self.mirror, size, p, align, line);
            }
        }
        let quoted: Vec<String> = lines.iter().map(|l| quote(l)).collect();
        self.queue(format!(
            "TO {} {} {} {} {}",
            at.x,
            at.y,
            size.code(),
            align.code(),
            quoted.join(" ")
        ));
    }

    fn commit(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.pending);
        for line in &batch {
            writeln!(self.writer, "{line}")
                .map_err(|e| G15Error::Transport(format!("composer write failed: {e}")))?;
        }
        self.writer
            .flush()
            .map_err(|e| G15Error::Transport(format!("composer flush failed: {e}")))?;
        self.mirror.mark_committed();
        Ok(())
    }

    fn set_indicator_light(&mut self, which: Indicator, on: bool) -> bool {
        self.send_now(&format!("KM {} {}", which.code(), u8::from(on)))
    }

    fn set_contrast(&mut self, level: u8) -> bool {
        self.send_now(&format!("LC {level}"))
    }

    fn set_brightness(&mut self, level: u8) -> bool {
        self.send_now(&format!("LB {level}"))
    }

    fn backend_name(&self) -> &str {
        "composer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(s: ComposerSurface<Vec<u8>>) -> String {
        String::from_utf8(s.into_inner()).unwrap()
    }

    #[test]
    fn instructions_buffer_until_commit() {
        let mut s = ComposerSurface::new(Vec::new());
        s.fill_rect(Point::new(1, 9), Point::new(158, 33), false);
        s.set_pixel(Point::new(3, 4), true);
        assert_eq!(s.pending().len(), 2);
        assert!(s.writer.is_empty());
        s.commit().unwrap();
        assert!(s.pending().is_empty());
        assert_eq!(output(s), "PF 1 9 158 33 0\nPS 3 4 1\n");
    }

    #[test]
    fn text_lines_are_quoted() {
        let mut s = ComposerSurface::new(Vec::new());
        s.draw_text_lines(
            FontSize::Medium,
            Point::new(0, 18),
            Alignment::Center,
            &["say \"hi\"", "two"],
        );
        assert_eq!(s.pending()[0], r#"TO 0 18 M 1 "say \"hi\"" "two""#);
        assert!(s.mirror().black_count() > 0);
    }

    #[test]
    fn primitives_format() {
        let mut s = ComposerSurface::new(Vec::new());
        s.clear(false);
        s.draw_line(Point::new(0, 8), Point::new(160, 8), true);
        s.draw_box(Point::new(0, 0), Point::new(10, 10), true, 2);
        s.draw_rounded_rect(Point::new(0, 0), Point::new(159, 42), true, false);
        s.draw_circle(Point::new(20, 20), 5, true, true);
        s.reverse_region(Point::new(0, 0), Point::new(5, 5));
        s.draw_bitmap(Point::new(1, 2), 2, 1, &[true, false]);
        assert_eq!(
            s.pending(),
            &[
                "PC 0",
                "DL 0 8 160 8 1",
                "PB 0 0 10 10 1 2 0",
                "DR 0 0 159 42 1 0",
                "DC 20 20 5 1 1",
                "PR 0 0 5 5",
                "PO 1 2 2 1 \"10\"",
            ]
        );
    }

    #[test]
    fn ticked_bar_without_workaround() {
        let mut s = ComposerSurface::new(Vec::new());
        s.draw_progress_bar(
            Point::new(0, 0),
            Point::new(50, 5),
            true,
            3,
            10,
            ProgressBarStyle::Ticked,
        );
        assert_eq!(s.pending(), &["DB 0 0 50 5 1 3 10 3"]);
    }

    #[test]
    fn ticked_bar_with_workaround_draws_prepass() {
        let mut s = ComposerSurface::new(Vec::new()).with_type3_workaround(true);
        s.draw_progress_bar(
            Point::new(0, 0),
            Point::new(50, 5),
            true,
            3,
            10,
            ProgressBarStyle::Ticked,
        );
        assert_eq!(
            s.pending(),
            &["DB 0 0 50 5 1 3 10 1", "DB 0 0 50 5 1 3 10 3"]
        );
    }

    #[test]
    fn hardware_controls_write_immediately() {
        let mut s = ComposerSurface::new(Vec::new());
        assert!(s.set_indicator_light(Indicator::M2, true));
        assert!(s.set_contrast(1));
        assert!(s.set_brightness(2));
        assert!(s.pending().is_empty());
        assert_eq!(output(s), "KM 2 1\nLC 1\nLB 2\n");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_pipe_fails_commit_and_lights() {
        let mut s = ComposerSurface::new(BrokenPipe);
        s.clear(false);
        assert!(matches!(s.commit(), Err(G15Error::Transport(_))));
        assert!(!s.commit_silently());
        assert!(!s.set_indicator_light(Indicator::All, false));
    }
}
