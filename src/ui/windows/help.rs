use ratatui::{
    Frame,
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::settings::CfgDefaultKeymaps;

pub struct HelpWindow;

fn key_label(key: &str) -> String {
    match key {
        " " => "Space".to_string(),
        "" => "-".to_string(),
        other => other.to_string(),
    }
}

impl HelpWindow {
    /// Help text built from the configured keys.
    pub fn lines(keys: &CfgDefaultKeymaps) -> Vec<String> {
        let row = |key: &str, text: &str| format!("   {:<18}{}", key_label(key), text);
        vec![
            " Pages:".to_string(),
            row(&keys.next_page, "Next Page"),
            row(&keys.prev_page, "Previous Page"),
            row("Right / Left", "Swipe Forward / Back"),
            String::new(),
            " Verses:".to_string(),
            row(&keys.next_verse, "Next Verse"),
            row(&keys.prev_verse, "Previous Verse"),
            row("Click", "Select Verse"),
            String::new(),
            " Recitation:".to_string(),
            row(&keys.toggle_play, "Play / Pause"),
            row(&keys.rewind, "Back 10s"),
            row(&keys.forward, "Forward 10s"),
            row(&keys.reciters, "Reciters"),
            String::new(),
            " Display:".to_string(),
            row(&keys.tap, "Tap (twice: Toggle Panel)"),
            row(&keys.brightness_panel, "Brightness Panel"),
            row(&keys.brightness_up, "Brighter"),
            row(&keys.brightness_down, "Dimmer"),
            row(&keys.toggle_azkar_icon, "Show / Hide Azkar Icon"),
            String::new(),
            " Screens:".to_string(),
            row(&keys.prayer_times, "Prayer Times"),
            row(&keys.azkar, "Azkar"),
            row(&keys.help, "Help"),
            row(&keys.quit, "Quit / Close Window"),
        ]
    }

    pub fn max_scroll_offset(area: Rect, total_lines: usize) -> u16 {
        let visible = area.height.saturating_sub(2) as usize;
        total_lines.saturating_sub(visible) as u16
    }

    pub fn render(frame: &mut Frame, area: Rect, lines: &[String], scroll_offset: u16) {
        let help_content: Vec<Line> = lines.iter().map(|s| Line::from(s.as_str())).collect();

        let max_width = help_content.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
        let width = (max_width + 4).min(area.width);
        let height = (help_content.len() as u16 + 2).min(area.height);

        let x = area.x + (area.width - width) / 2;
        let y = area.y + (area.height - height) / 2;
        let popup_area = Rect::new(x, y, width, height);

        frame.render_widget(Clear, popup_area);

        let help_paragraph = Paragraph::new(help_content)
            .block(Block::default().title("Help").borders(Borders::ALL))
            .scroll((scroll_offset, 0));

        frame.render_widget(help_paragraph, popup_area);
    }
}
