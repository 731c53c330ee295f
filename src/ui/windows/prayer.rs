use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::prayer::{DaySchedule, arabic_prayer_name};
use crate::time_format::arabic_time;

use super::centered_popup_area;

/// What the prayer times popup shows while and after fetching.
#[derive(Debug, Clone, PartialEq)]
pub enum PrayerView {
    Loading,
    Ready(DaySchedule),
    Failed(String),
}

pub struct PrayerWindow;

impl PrayerWindow {
    pub fn lines(view: &PrayerView) -> Vec<String> {
        match view {
            PrayerView::Loading => vec!["Locating...".to_string()],
            PrayerView::Failed(reason) => vec![format!("Could not get prayer times: {reason}")],
            PrayerView::Ready(today) => {
                let mut lines = vec![today.location.address.clone(), String::new()];
                lines.extend(today.prayers.iter().map(|prayer| {
                    format!(
                        "{:<10}{}",
                        arabic_prayer_name(&prayer.name),
                        arabic_time(&prayer.clock).unwrap_or_else(|| prayer.clock.clone())
                    )
                }));
                lines
            }
        }
    }

    pub fn render(frame: &mut Frame, area: Rect, view: &PrayerView) {
        let popup_area = centered_popup_area(area, 50, 60);
        frame.render_widget(Clear, popup_area);

        let style = match view {
            PrayerView::Failed(_) => Style::default().fg(Color::Red),
            PrayerView::Loading => Style::default().fg(Color::DarkGray),
            PrayerView::Ready(_) => Style::default(),
        };
        let content: Vec<Line> = Self::lines(view).into_iter().map(Line::from).collect();
        let paragraph = Paragraph::new(content)
            .style(style)
            .block(Block::default().title("Prayer Times").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }
}
