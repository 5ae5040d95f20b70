//! Host statistics: load average, memory and uptime.
//!
//! Two views, toggled with LCD1: a text summary and a pair of bars.

use std::path::PathBuf;

use g15_core::plugin::{PluginContext, ScreenPlugin};
use g15_platform::services::{ProcStats, StatsService, SystemStats, format_uptime};
use g15_types::error::{G15Error, Result};
use g15_types::geometry::{Alignment, FontSize, LCD_WIDTH, Point, ProgressBarStyle};
use g15_types::input::LcdButton;

pub const NAME: &str = "stats";

/// One-minute load that fills the load bar.
const LOAD_FULL_SCALE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsView {
    Text,
    Bars,
}

pub struct StatsPlugin {
    source: Box<dyn StatsService>,
    view: StatsView,
}

impl Default for StatsPlugin {
    fn default() -> Self {
        Self::new(Box::new(ProcStats::default()))
    }
}

impl StatsPlugin {
    pub fn new(source: Box<dyn StatsService>) -> Self {
        Self {
            source,
            view: StatsView::Text,
        }
    }

    pub fn view(&self) -> StatsView {
        self.view
    }

    fn draw(&self, ctx: &mut PluginContext<'_>) {
        ctx.surface.clear(false);
        match self.source.sample() {
            Ok(stats) => match self.view {
                StatsView::Text => draw_text_view(ctx, &stats),
                StatsView::Bars => draw_bar_view(ctx, &stats),
            },
            Err(e) => {
                log::debug!("stats unavailable: {e}");
                ctx.surface.draw_text(
                    FontSize::Medium,
                    Point::new(0, 18),
                    Alignment::Center,
                    "Stats unavailable",
                );
            },
        }
        ctx.surface.commit_silently();
    }
}

fn draw_text_view(ctx: &mut PluginContext<'_>, stats: &SystemStats) {
    let time = ctx.now().to_string();
    let uptime = format!("Uptime: {}", format_uptime(stats.uptime_secs));
    let load = format!(
        "Load: {:.2}, {:.2}, {:.2}",
        stats.load[0], stats.load[1], stats.load[2]
    );
    let mem = format!(
        "Mem: {}/{} MB ({}%)",
        stats.mem_used_kb() / 1024,
        stats.mem_total_kb / 1024,
        stats.mem_used_percent()
    );
    ctx.surface.draw_text_lines(
        FontSize::Small,
        Point::new(0, 2),
        Alignment::Center,
        &[&time, &uptime, &load, &mem],
    );
}

fn draw_bar_view(ctx: &mut PluginContext<'_>, stats: &SystemStats) {
    let load_pct = ((stats.load[0] / LOAD_FULL_SCALE) * 100.0).clamp(0.0, 100.0) as i32;
    let mem_pct = i32::from(stats.mem_used_percent());
    let rows = [
        ("LOAD", load_pct, format!("{:.2}", stats.load[0])),
        ("MEM", mem_pct, format!("{mem_pct}%")),
    ];
    for (i, (label, pct, value)) in rows.iter().enumerate() {
        let y = 4 + i as i32 * 12;
        ctx.surface
            .draw_text(FontSize::Small, Point::new(2, y + 1), Alignment::Left, label);
        ctx.surface.draw_progress_bar(
            Point::new(22, y),
            Point::new(LCD_WIDTH - 30, y + 7),
            true,
            *pct,
            100,
            ProgressBarStyle::Ticked,
        );
        ctx.surface.draw_text(
            FontSize::Small,
            Point::new(LCD_WIDTH - 2, y + 1),
            Alignment::Right,
            value,
        );
    }
    ctx.surface.draw_text(
        FontSize::Small,
        Point::new(0, 32),
        Alignment::Center,
        &format!("UP {}", format_uptime(stats.uptime_secs)),
    );
}

impl ScreenPlugin for StatsPlugin {
    fn name(&self) -> &str {
        NAME
    }

    /// Settings: `proc_root` (path) and `view` (`"text"` or `"bars"`).
    fn on_load(&mut self, settings: Option<&toml::Table>) -> Result<()> {
        let Some(settings) = settings else {
            return Ok(());
        };
        if let Some(root) = settings.get("proc_root").and_then(toml::Value::as_str) {
            self.source = Box::new(ProcStats::new(PathBuf::from(root)));
        }
        match settings.get("view").and_then(toml::Value::as_str) {
            None => {},
            Some("text") => self.view = StatsView::Text,
            Some("bars") => self.view = StatsView::Bars,
            Some(other) => {
                return Err(G15Error::Plugin(format!("unknown stats view {other:?}")));
            },
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
        if button == LcdButton::Lcd1 {
            self.view = match self.view {
                StatsView::Text => StatsView::Bars,
                StatsView::Bars => StatsView::Text,
            };
            self.draw(ctx);
        }
    }
}
