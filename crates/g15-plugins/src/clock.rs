//! Full-screen clock.
//!
//! Modes 0-2 draw the time in the small, medium and large fonts; mode 3
//! draws big block digits as bitmaps. LCD1 and LCD2 step through the modes,
//! LCD3 toggles seconds.

use g15_core::plugin::{PluginContext, ScreenPlugin};
use g15_surface::glyph_bitmap;
use g15_types::error::{G15Error, Result};
use g15_types::geometry::{Alignment, FontSize, LCD_HEIGHT, LCD_WIDTH, Point};
use g15_types::input::LcdButton;

pub const NAME: &str = "clock";

const MODE_COUNT: u8 = 4;
const BIG_MODE: u8 = 3;

/// Block digit scale in the big mode.
const BIG_SCALE: i32 = 5;
const BIG_GAP: i32 = 3;

pub struct ClockPlugin {
    mode: u8,
    seconds: bool,
}

impl Default for ClockPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPlugin {
    pub fn new() -> Self {
        Self {
            mode: BIG_MODE,
            seconds: true,
        }
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn shows_seconds(&self) -> bool {
        self.seconds
    }

    fn draw(&self, ctx: &mut PluginContext<'_>) {
        let now = ctx.now();
        let text = if self.seconds { now.to_string() } else { now.hm() };
        ctx.surface.clear(false);
        match self.mode {
            BIG_MODE => draw_big(ctx, &text),
            mode => {
                let size = FontSize::ALL[usize::from(mode)];
                ctx.surface
                    .draw_text(size, Point::new(0, LCD_HEIGHT / 2 - 5), Alignment::Center, &text);
            },
        }
        ctx.surface.commit_silently();
    }
}

fn draw_big(ctx: &mut PluginContext<'_>, text: &str) {
    let (w, h) = (3 * BIG_SCALE, 5 * BIG_SCALE);
    let n = text.chars().count() as i32;
    let total = n * w + (n - 1).max(0) * BIG_GAP;
    let mut x = (LCD_WIDTH - total) / 2;
    let y = (LCD_HEIGHT - h) / 2;
    for ch in text.chars() {
        let bits = glyph_bitmap(ch, BIG_SCALE);
        ctx.surface
            .draw_bitmap(Point::new(x, y), w as u32, h as u32, &bits);
        x += w + BIG_GAP;
    }
}

impl ScreenPlugin for ClockPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn on_load(&mut self, settings: Option<&toml::Table>) -> Result<()> {
        let Some(settings) = settings else {
            return Ok(());
        };
        if let Some(mode) = settings.get("mode") {
            self.mode = mode
                .as_integer()
                .and_then(|m| u8::try_from(m).ok())
                .filter(|m| *m < MODE_COUNT)
                .ok_or_else(|| G15Error::Plugin(format!("clock mode must be 0-3, got {mode}")))?;
        }
        if let Some(seconds) = settings.get("seconds").and_then(toml::Value::as_bool) {
            self.seconds = seconds;
        }
        Ok(())
    }

    fn on_activate(&mut self, ctx: &mut PluginContext<'_>) {
        self.draw(ctx);
    }

    fn on_redraw(&mut self, ctx: &mut PluginContext<'_>) {
        self.draw(ctx);
    }

    fn on_button(&mut self, button: LcdButton, ctx: &mut PluginContext<'_>) {
        match button {
            LcdButton::Lcd1 => self.mode = (self.mode + 1) % MODE_COUNT,
            LcdButton::Lcd2 => self.mode = (self.mode + MODE_COUNT - 1) % MODE_COUNT,
            LcdButton::Lcd3 => self.seconds = !self.seconds,
            LcdButton::Lcd4 => return,
        }
        log::debug!("clock mode {} seconds {}", self.mode, self.seconds);
        self.draw(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use g15_platform::services::{FixedClock, WallTime};
    use g15_surface::MemorySurface;

    const NOON: FixedClock = FixedClock(WallTime::new(13, 5, 9));

    fn settings(text: &str) -> toml::Table {
        text.parse().unwrap()
    }

    #[test]
    fn text_modes_use_matching_font() {
        let mut clock = ClockPlugin::new();
        clock.on_load(Some(&settings("mode = 1"))).unwrap();
        let mut surface = MemorySurface::new();
        clock.on_activate(&mut PluginContext::new(&mut surface, &NOON));
        let text = surface.last_text().unwrap();
        assert_eq!(text.text, "13:05:09");
        assert_eq!(text.size, FontSize::Medium);
        assert_eq!(text.align, Alignment::Center);
        assert_eq!(surface.commit_count(), 1);
    }

    #[test]
    fn big_mode_draws_bitmaps() {
        let mut clock = ClockPlugin::new();
        let mut surface = MemorySurface::new();
        clock.on_activate(&mut PluginContext::new(&mut surface, &NOON));
        assert!(surface.texts().is_empty());
        assert!(surface.buffer().black_count() > 0);
    }

    #[test]
    fn buttons_cycle_modes_and_seconds() {
        let mut clock = ClockPlugin::new();
        let mut surface = MemorySurface::new();
        let mut ctx = PluginContext::new(&mut surface, &NOON);
        clock.on_button(LcdButton::Lcd1, &mut ctx);
        assert_eq!(clock.mode(), 0);
        clock.on_button(LcdButton::Lcd2, &mut ctx);
        assert_eq!(clock.mode(), 3);
        clock.on_button(LcdButton::Lcd2, &mut ctx);
        assert_eq!(clock.mode(), 2);
        clock.on_button(LcdButton::Lcd3, &mut ctx);
        assert!(!clock.shows_seconds());
        assert_eq!(surface.last_text().unwrap().text, "13:05");
    }

    #[test]
    fn lcd4_does_not_redraw() {
        let mut clock = ClockPlugin::new();
        let mut surface = MemorySurface::new();
        clock.on_button(LcdButton::Lcd4, &mut PluginContext::new(&mut surface, &NOON));
        assert_eq!(surface.commit_count(), 0);
    }

    #[test]
    fn settings_are_validated() {
        let mut clock = ClockPlugin::new();
        assert!(clock.on_load(Some(&settings("mode = 7"))).is_err());
        assert!(clock.on_load(Some(&settings("mode = \"big\""))).is_err());
        clock.on_load(Some(&settings("mode = 0\nseconds = false"))).unwrap();
        assert_eq!(clock.mode(), 0);
        assert!(!clock.shows_seconds());
        clock.on_load(None).unwrap();
    }
}
