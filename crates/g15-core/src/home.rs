//! Built-in home screen rendering.
//!
//! Layout (160x43):
//!
//! ```text
//! +----------------------------------------------------+
//! | title                                 | HH:MM:SS   |  y 0..8
//! |----------------------------------------------------|
//! |                    main text                       |  y 9..33
//! |----------------------------------------------------|
//! |  Menu    Ok        [1/5]         [<]      [>]      |  y 34..42
//! +----------------------------------------------------+
//! ```

use g15_types::geometry::{
    Alignment, FontSize, Indicator, LCD_HEIGHT, LCD_WIDTH, Point, bottom_right, top_left,
};
use g15_types::surface::DrawingSurface;

/// Menu bar labels outside the menu overlay.
pub const HOME_LABELS: [&str; 5] = ["Menu", "", "", "", ""];

/// Menu bar labels while the overlay is open. The middle slot shows the
/// cursor position.
pub const OVERLAY_LABELS: [&str; 5] = ["Menu", "Ok", "", "[<]", "[>]"];

const LABEL_X: [i32; 5] = [11, 42, 70, 110, 135];
const BAR_TEXT_Y: i32 = 36;
const MAIN_TEXT_Y: i32 = LCD_HEIGHT / 2 - 3;
const CLOCK_X: i32 = 126;

/// Rounded border around the whole panel.
pub fn draw_frame(s: &mut dyn DrawingSurface) {
    s.draw_rounded_rect(top_left(), bottom_right(), true, false);
}

/// Static separators of the home layout, with a blank main area.
pub fn draw_layout(s: &mut dyn DrawingSurface) {
    s.draw_line(Point::new(124, 0), Point::new(124, 8), true);
    s.draw_line(Point::new(0, 8), Point::new(LCD_WIDTH, 8), true);
    clear_main_area(s);
}

fn clear_main_area(s: &mut dyn DrawingSurface) {
    s.fill_rect(Point::new(1, 9), Point::new(LCD_WIDTH - 2, 33), false);
}

/// Bottom menu bar. `middle` overrides the centre label.
pub fn draw_menu_bar(s: &mut dyn DrawingSurface, labels: &[&str; 5], middle: Option<&str>) {
    s.fill_rect(Point::new(3, 35), Point::new(LCD_WIDTH - 3, 41), false);
    s.draw_line(Point::new(0, 34), Point::new(LCD_WIDTH, 34), true);
    for (i, (&x, &label)) in LABEL_X.iter().zip(labels.iter()).enumerate() {
        let (text, align) = if i == 2 {
            (middle.unwrap_or(label), Alignment::Center)
        } else {
            (label, Alignment::Left)
        };
        if !text.is_empty() {
            s.draw_text(FontSize::Small, Point::new(x, BAR_TEXT_Y), align, text);
        }
    }
}

/// Centered text in the main area.
pub fn draw_main_text(s: &mut dyn DrawingSurface, size: FontSize, text: &str) {
    clear_main_area(s);
    if !text.is_empty() {
        s.draw_text(size, Point::new(0, MAIN_TEXT_Y), Alignment::Center, text);
    }
}

/// Transient status, centered in the menu bar.
pub fn draw_status_text(s: &mut dyn DrawingSurface, text: &str) {
    draw_menu_bar(s, &HOME_LABELS, None);
    s.fill_rect(Point::new(30, 35), Point::new(130, 41), false);
    s.draw_text(FontSize::Small, Point::new(0, BAR_TEXT_Y), Alignment::Center, text);
}

/// Title strip with the clock on the right.
pub fn draw_title_strip(s: &mut dyn DrawingSurface, title: &str, time: &str) {
    s.fill_rect(Point::new(CLOCK_X - 1, 1), Point::new(LCD_WIDTH - 3, 7), false);
    s.draw_text(FontSize::Small, Point::new(CLOCK_X, 2), Alignment::Left, time);
    s.fill_rect(Point::new(3, 1), Point::new(121, 7), false);
    s.draw_text(FontSize::Small, Point::new(4, 2), Alignment::Left, title);
}

/// Startup progress line across the top.
pub fn draw_splash(s: &mut dyn DrawingSurface, text: &str) {
    s.fill_rect(Point::new(3, 3), Point::new(LCD_WIDTH - 4, 12), false);
    s.draw_text(FontSize::Small, Point::new(0, 5), Alignment::Center, text);
}

/// Final frame shown on quit. Also turns every light off.
pub fn draw_exit_screen(s: &mut dyn DrawingSurface, title: &str, time: &str) {
    s.clear(false);
    draw_frame(s);
    draw_main_text(s, FontSize::Medium, title);
    s.draw_text(
        FontSize::Small,
        Point::new(0, BAR_TEXT_Y),
        Alignment::Center,
        &format!("Ended at: {time}"),
    );
    s.set_indicator_light(Indicator::All, false);
    s.commit_silently();
}
