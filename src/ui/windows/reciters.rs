use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::models::Reciter;
use crate::reciters::ReciterRegistry;

use super::centered_popup_area;

pub struct RecitersWindow;

impl RecitersWindow {
    pub fn entry(reciter: &Reciter, active: bool) -> String {
        let marker = if active { "▶" } else { " " };
        if reciter.rewaya.is_empty() {
            format!("{marker} {}", reciter.name)
        } else {
            format!("{marker} {} ({})", reciter.name, reciter.rewaya)
        }
    }

    pub fn render(
        frame: &mut Frame,
        area: Rect,
        registry: &ReciterRegistry,
        active: Option<&str>,
        selected_index: usize,
    ) {
        let popup_area = centered_popup_area(area, 70, 75);

        frame.render_widget(Clear, popup_area);
        let block = Block::default().title("Reciters").borders(Borders::ALL);
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);
        let footer = Paragraph::new("Enter select | q close");

        if registry.is_empty() {
            let paragraph = Paragraph::new("Reciter list not loaded")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(paragraph, rows[0]);
            frame.render_widget(footer, rows[1]);
            return;
        }

        let items: Vec<ListItem> = registry
            .iter()
            .enumerate()
            .map(|(i, reciter)| {
                let style = if i == selected_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else {
                    Style::default()
                };
                let entry = Self::entry(reciter, active == Some(reciter.name.as_str()));
                ListItem::new(Line::from(entry)).style(style)
            })
            .collect();

        let mut state = ListState::default().with_selected(Some(selected_index));
        frame.render_stateful_widget(List::new(items), rows[0], &mut state);
        frame.render_widget(footer, rows[1]);
    }
}
