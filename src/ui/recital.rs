use std::io::{self, Stdout};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use eyre::Result;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};
use serde_json::{Map, Value};

use crate::audio::ProcessBackend;
use crate::config::Config;
use crate::gesture::{SWIPE_LEFT, SWIPE_RIGHT, swipe_direction};
use crate::host::{NavigationRequest, QueuedNavigation, Route, StoredBrightness};
use crate::logging;
use crate::models::{MessageType, PlaybackStatus, VerseKey};
use crate::prayer::{self, DaySchedule, HttpPrayerTimes};
use crate::preferences::PreferenceBus;
use crate::provider::{ContentProvider, RemoteContentProvider};
use crate::screen::{Progress, RecitalScreen};
use crate::settings::Action;
use crate::ui::windows::{
    help::HelpWindow,
    prayer::{PrayerView, PrayerWindow},
    reciters::RecitersWindow,
};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const MESSAGE_TTL: Duration = Duration::from_secs(3);
/// Minimum drag, in cells, for a mouse drag to count as a swipe.
const SWIPE_MIN_COLS: i32 = 4;
const SWIPE_MIN_ROWS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Recital,
    Help,
    Reciters,
    PrayerTimes,
}

/// Terminal-only state: open window, message line, and the row layout of
/// the last frame for mapping clicks back to verses.
struct UiState {
    window: Window,
    help_scroll: u16,
    reciter_index: usize,
    message: Option<(String, MessageType, Instant)>,
    verse_rows: Vec<Option<VerseKey>>,
    text_area: Rect,
    text_scroll: usize,
    drag_origin: Option<(u16, u16)>,
    prayer: PrayerView,
    prayer_rx: Option<Receiver<Result<DaySchedule>>>,
    should_quit: bool,
}

impl UiState {
    fn new() -> Self {
        Self {
            window: Window::Recital,
            help_scroll: 0,
            reciter_index: 0,
            message: None,
            verse_rows: Vec::new(),
            text_area: Rect::default(),
            text_scroll: 0,
            drag_origin: None,
            prayer: PrayerView::Loading,
            prayer_rx: None,
            should_quit: false,
        }
    }

    fn set_message(&mut self, message: impl Into<String>, message_type: MessageType) {
        self.message = Some((message.into(), message_type, Instant::now()));
    }

    fn message_expired(&self) -> bool {
        self.message
            .as_ref()
            .is_some_and(|(_, _, at)| at.elapsed() >= MESSAGE_TTL)
    }

    /// Verse drawn at terminal row `row`, if any.
    fn verse_at(&self, row: u16) -> Option<VerseKey> {
        let area = self.text_area;
        if row < area.y || row >= area.y + area.height {
            return None;
        }
        let index = usize::from(row - area.y) + self.text_scroll;
        self.verse_rows.get(index).copied().flatten()
    }
}

/// Lines of the page body with the verse each line belongs to.
fn layout_verses(
    verses: &[crate::models::Verse],
    width: usize,
) -> Vec<(Option<VerseKey>, String, bool)> {
    let width = width.max(10);
    let mut rows = Vec::new();
    for (i, verse) in verses.iter().enumerate() {
        if i > 0 {
            rows.push((None, String::new(), false));
        }
        let text = format!("{} ﴿{}﴾", verse.text.trim(), verse.key.ayah);
        for line in textwrap::wrap(&text, width) {
            rows.push((Some(verse.key), line.into_owned(), verse.selected));
        }
    }
    rows
}

/// First row to draw so the selected verse stays in view.
fn scroll_for_selection(rows: &[(Option<VerseKey>, String, bool)], height: usize) -> usize {
    let Some(start) = rows.iter().position(|(_, _, selected)| *selected) else {
        return 0;
    };
    let end = rows
        .iter()
        .rposition(|(_, _, selected)| *selected)
        .unwrap_or(start);
    if end < height {
        0
    } else {
        start.saturating_sub(1).min(rows.len().saturating_sub(height))
    }
}

fn build_header_line(title: &str, right_text: Option<&str>, width: u16) -> String {
    let width = width as usize;
    if width == 0 {
        return String::new();
    }

    let mut buffer = vec![' '; width];
    let right_len = right_text.map(|text| text.chars().count()).unwrap_or(0);
    let content_width = if right_len > 0 {
        width.saturating_sub(right_len + 1)
    } else {
        width
    };

    let title_chars: Vec<char> = title.chars().take(content_width).collect();
    let title_start = (content_width.saturating_sub(title_chars.len())) / 2;
    for (i, ch) in title_chars.into_iter().enumerate() {
        if title_start + i < buffer.len() {
            buffer[title_start + i] = ch;
        }
    }

    if let Some(right_text) = right_text {
        let start = width.saturating_sub(right_len);
        for (i, ch) in right_text.chars().enumerate() {
            if start + i < buffer.len() {
                buffer[start + i] = ch;
            }
        }
    }

    buffer.into_iter().collect()
}

fn format_progress(progress: Progress) -> String {
    match progress {
        Progress::Fraction(fraction) => format!("{:.0}%", fraction * 100.0),
        Progress::Elapsed(secs) => {
            let secs = secs.max(0.0) as u64;
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        Progress::None => "--".to_string(),
    }
}

pub struct RecitalView {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    config: Config,
    screen: RecitalScreen,
    bus: PreferenceBus,
    navigation: QueuedNavigation,
    ui: UiState,
}

impl RecitalView {
    pub fn new(config: Config) -> Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;

        let provider: Arc<dyn ContentProvider> =
            Arc::new(RemoteContentProvider::from_settings(&config.settings)?);
        let navigation = QueuedNavigation::new();
        let screen = RecitalScreen::new(
            &config.settings,
            provider,
            Box::new(ProcessBackend::from_settings(&config.settings)),
            Box::new(StoredBrightness::default()),
            Box::new(navigation.clone()),
        );

        Ok(Self {
            terminal,
            config,
            screen,
            bus: PreferenceBus::new(),
            navigation,
            ui: UiState::new(),
        })
    }

    /// Run the main application loop
    pub fn run(&mut self) -> Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        if self.config.settings.mouse_support {
            crossterm::execute!(
                io::stdout(),
                crossterm::terminal::EnterAlternateScreen,
                crossterm::event::EnableMouseCapture
            )?;
        } else {
            crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
        }

        self.terminal.clear()?;
        self.terminal.hide_cursor()?;

        if self.config.settings.reciters_url.trim().is_empty() {
            self.ui.set_message(
                "No reciter list configured; playback is unavailable",
                MessageType::Warning,
            );
        }
        self.screen.enter(&self.bus);
        let result = self.event_loop();
        self.screen.leave();

        // Cleanup terminal
        self.terminal.clear()?;
        self.terminal.show_cursor()?;
        crossterm::execute!(
            io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        )?;
        crossterm::terminal::disable_raw_mode()?;

        result
    }

    fn event_loop(&mut self) -> Result<()> {
        loop {
            if self.ui.should_quit {
                break;
            }

            self.screen.pump();
            if let Some(error) = self.screen.last_error().map(str::to_string) {
                self.ui.set_message(error, MessageType::Error);
                self.screen.clear_error();
            }
            self.handle_navigation();
            self.poll_prayer_times();

            if self.ui.message_expired() {
                self.ui.message = None;
            }

            {
                let screen = &self.screen;
                let ui = &mut self.ui;
                let config = &self.config;
                self.terminal.draw(|f| Self::render(f, screen, ui, config))?;
            }

            if !crossterm::event::poll(POLL_INTERVAL)? {
                continue;
            }

            match crossterm::event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(key),
                Event::Mouse(mouse) if self.config.settings.mouse_support => {
                    self.handle_mouse_event(mouse)
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_navigation(&mut self) {
        for request in self.navigation.take() {
            logging::debug(format!("navigation request {request:?}"));
            match request {
                NavigationRequest::SetRoot(Route::Home) => self.ui.should_quit = true,
                NavigationRequest::Push {
                    route: Route::PrayerTimes,
                    ..
                } => self.open_prayer_times(),
                NavigationRequest::Push { route, .. } | NavigationRequest::SetRoot(route) => {
                    self.ui.set_message(
                        format!("{route:?} is not available in the terminal"),
                        MessageType::Warning,
                    );
                }
            }
        }
    }

    fn open_prayer_times(&mut self) {
        self.ui.window = Window::PrayerTimes;
        if matches!(self.ui.prayer, PrayerView::Ready(_)) || self.ui.prayer_rx.is_some() {
            return;
        }
        self.ui.prayer = PrayerView::Loading;
        let settings = self.config.settings.clone();
        let (tx, rx) = mpsc::channel();
        self.ui.prayer_rx = Some(rx);
        thread::spawn(move || {
            let result = HttpPrayerTimes::from_settings(&settings)
                .and_then(|provider| prayer::fetch_today(&provider));
            let _ = tx.send(result);
        });
    }

    fn poll_prayer_times(&mut self) {
        let Some(rx) = &self.ui.prayer_rx else {
            return;
        };
        if let Ok(result) = rx.try_recv() {
            self.ui.prayer = match result {
                Ok(today) => PrayerView::Ready(today),
                Err(err) => {
                    logging::warn(format!("prayer times failed: {err:#}"));
                    PrayerView::Failed(err.to_string())
                }
            };
            self.ui.prayer_rx = None;
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match self.ui.window {
            Window::Recital => self.handle_recital_keys(key),
            Window::Help => self.handle_help_keys(key),
            Window::Reciters => self.handle_reciters_keys(key),
            Window::PrayerTimes => self.handle_modal_close_keys(key),
        }
    }

    fn handle_recital_keys(&mut self, key: KeyEvent) {
        let action = match key.code {
            KeyCode::Char(c) => self.config.keymap.action_for(c),
            KeyCode::Right => {
                self.screen.on_swipe(SWIPE_RIGHT);
                None
            }
            KeyCode::Left => {
                self.screen.on_swipe(SWIPE_LEFT);
                None
            }
            KeyCode::Down => Some(Action::NextVerse),
            KeyCode::Up => Some(Action::PrevVerse),
            KeyCode::Enter => Some(Action::TogglePlay),
            KeyCode::Esc => Some(Action::Quit),
            _ => None,
        };
        if let Some(action) = action {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::NextPage => {
                self.screen.change_page(1);
            }
            Action::PrevPage => {
                self.screen.change_page(-1);
            }
            Action::NextVerse => {
                self.screen.step_verse(true);
            }
            Action::PrevVerse => {
                self.screen.step_verse(false);
            }
            Action::TogglePlay => {
                self.screen.toggle_playback();
                if *self.screen.status() == PlaybackStatus::Deferred {
                    self.ui
                        .set_message("Waiting for the reciter list", MessageType::Info);
                }
            }
            Action::Rewind => self.screen.seek(-1),
            Action::Forward => self.screen.seek(1),
            Action::Tap => {
                self.screen.on_tap(Instant::now());
            }
            Action::Reciters => {
                let current = self
                    .screen
                    .controller()
                    .reciter()
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| self.config.settings.default_reciter.clone());
                self.ui.reciter_index = self.screen.registry().position(&current).unwrap_or(0);
                self.ui.window = Window::Reciters;
            }
            Action::BrightnessPanel => {
                self.screen.toggle_brightness_panel();
            }
            Action::BrightnessUp | Action::BrightnessDown => self.step_brightness(action),
            Action::ToggleAzkarIcon => self.toggle_azkar_icon(),
            Action::PrayerTimes => self.screen.open(Route::PrayerTimes),
            Action::Azkar => self.screen.open(Route::Azkar),
            Action::Help => {
                self.ui.help_scroll = 0;
                self.ui.window = Window::Help;
            }
            Action::Quit => self.screen.go_home(),
        }
    }

    fn step_brightness(&mut self, action: Action) {
        if !self.screen.show_brightness_panel() {
            self.screen.toggle_brightness_panel();
            return;
        }
        let step = self.screen.brightness_level() / 10;
        let step = if action == Action::BrightnessUp {
            step + 1
        } else {
            step.saturating_sub(1)
        };
        if let Err(err) = self.screen.change_brightness(step) {
            self.ui.set_message(format!("Brightness: {err}"), MessageType::Error);
        }
    }

    fn toggle_azkar_icon(&mut self) {
        let show = !self.screen.preferences().show_azkar_icon;
        self.config.settings.show_azkar_icon = show;
        if let Err(err) = self.config.save() {
            logging::warn(format!("could not save configuration: {err:#}"));
        }
        let mut changes = Map::new();
        changes.insert("show_azkar_icon".to_string(), Value::Bool(show));
        self.bus.publish(changes);
    }

    fn handle_help_keys(&mut self, key: KeyEvent) {
        let (term_width, term_height) = crossterm::terminal::size().unwrap_or((80, 24));
        let total = HelpWindow::lines(self.config.keymap_user_dict()).len();
        let max_offset = HelpWindow::max_scroll_offset(Rect::new(0, 0, term_width, term_height), total);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.ui.help_scroll = self.ui.help_scroll.saturating_add(1).min(max_offset);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.ui.help_scroll = self.ui.help_scroll.saturating_sub(1);
            }
            _ => self.handle_modal_close_keys(key),
        }
    }

    fn handle_reciters_keys(&mut self, key: KeyEvent) {
        let len = self.screen.registry().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if len > 0 {
                    self.ui.reciter_index = (self.ui.reciter_index + 1).min(len - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.ui.reciter_index = self.ui.reciter_index.saturating_sub(1);
            }
            KeyCode::Enter => {
                let name = self
                    .screen
                    .registry()
                    .get(self.ui.reciter_index)
                    .map(|r| r.name.clone());
                if let Some(name) = name {
                    self.screen.select_reciter(&name);
                    self.ui.set_message(format!("Reciter: {name}"), MessageType::Info);
                }
                self.ui.window = Window::Recital;
            }
            _ => self.handle_modal_close_keys(key),
        }
    }

    fn handle_modal_close_keys(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter) {
            self.ui.window = Window::Recital;
        }
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        if self.ui.window != Window::Recital {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.ui.drag_origin = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some((x, y)) = self.ui.drag_origin.take() else {
                    return;
                };
                let dx = i32::from(mouse.column) - i32::from(x);
                let dy = i32::from(mouse.row) - i32::from(y);
                if dx.abs() >= SWIPE_MIN_COLS || dy.abs() >= SWIPE_MIN_ROWS {
                    self.screen.on_swipe(swipe_direction(dx, dy));
                    return;
                }
                if let Some(key) = self.ui.verse_at(mouse.row) {
                    self.screen.select_verse(key);
                    self.screen.on_tap(Instant::now());
                }
            }
            MouseEventKind::ScrollDown => self.perform(Action::NextVerse),
            MouseEventKind::ScrollUp => self.perform(Action::PrevVerse),
            _ => {}
        }
    }

    fn render(frame: &mut Frame, screen: &RecitalScreen, ui: &mut UiState, config: &Config) {
        let show_panel = screen.panel().is_active();
        let show_brightness = screen.show_brightness_panel();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(if show_panel { 4 } else { 0 }),
                Constraint::Length(if show_brightness { 3 } else { 0 }),
            ])
            .split(frame.area());

        let title = format!("صفحة {}", screen.page_number());
        let icon = screen.azkar_icon().map(|icon| icon.glyph());
        let header = build_header_line(&title, icon, chunks[0].width);
        frame.render_widget(
            Paragraph::new(header).style(Style::default().add_modifier(Modifier::BOLD)),
            chunks[0],
        );

        Self::render_page(frame, chunks[1], screen, ui, config);
        if show_panel {
            Self::render_panel(frame, chunks[2], screen, config);
        }
        if show_brightness {
            let gauge = Gauge::default()
                .block(Block::default().title("Brightness").borders(Borders::ALL))
                .gauge_style(Style::default().fg(Color::Yellow))
                .ratio(f64::from(screen.brightness_level().min(100)) / 100.0);
            frame.render_widget(gauge, chunks[3]);
        }

        match ui.window {
            Window::Recital => {}
            Window::Help => HelpWindow::render(
                frame,
                frame.area(),
                &HelpWindow::lines(config.keymap_user_dict()),
                ui.help_scroll,
            ),
            Window::Reciters => RecitersWindow::render(
                frame,
                frame.area(),
                screen.registry(),
                screen.controller().reciter().map(|r| r.name.as_str()),
                ui.reciter_index,
            ),
            Window::PrayerTimes => PrayerWindow::render(frame, frame.area(), &ui.prayer),
        }

        if let Some((message, message_type, _)) = &ui.message {
            Self::render_message(frame, message, message_type);
        }
    }

    fn render_page(
        frame: &mut Frame,
        area: Rect,
        screen: &RecitalScreen,
        ui: &mut UiState,
        config: &Config,
    ) {
        let block = Block::default().borders(Borders::TOP | Borders::BOTTOM);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(page) = screen.page() else {
            ui.verse_rows.clear();
            ui.text_area = inner;
            frame.render_widget(
                Paragraph::new("Loading page...").style(Style::default().fg(Color::DarkGray)),
                inner,
            );
            return;
        };

        let width = config.settings.text_width.min(inner.width as usize);
        let rows = layout_verses(page.verses(), width);
        let scroll = scroll_for_selection(&rows, inner.height as usize);
        let pad = inner.width.saturating_sub(width as u16) / 2;
        let text_area = Rect::new(inner.x + pad, inner.y, width as u16, inner.height);

        let lines: Vec<Line> = rows
            .iter()
            .skip(scroll)
            .take(inner.height as usize)
            .map(|(_, text, selected)| {
                let style = if *selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(text.clone(), style))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), text_area);

        ui.verse_rows = rows.into_iter().map(|(key, _, _)| key).collect();
        ui.text_area = text_area;
        ui.text_scroll = scroll;
    }

    fn render_panel(frame: &mut Frame, area: Rect, screen: &RecitalScreen, config: &Config) {
        let controller = screen.controller();
        let reciter = controller
            .reciter()
            .map(|r| r.name.as_str())
            .unwrap_or(config.settings.default_reciter.as_str());
        let verse = controller
            .current_verse()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());

        let status = screen.status();
        let status_style = match status {
            PlaybackStatus::Failed(_) => Style::default().fg(Color::Red),
            PlaybackStatus::Playing => Style::default().fg(Color::Green),
            _ => Style::default(),
        };
        let mut status_line = vec![
            Span::styled(status.label().to_string(), status_style),
            Span::raw(format!("  {verse}")),
        ];
        if config.settings.show_progress_indicator {
            status_line.push(Span::raw(format!("  {}", format_progress(screen.progress()))));
        }
        if let PlaybackStatus::Failed(reason) = status {
            status_line.push(Span::styled(format!("  {reason}"), status_style));
        }

        let panel = Paragraph::new(vec![Line::from(reciter.to_string()), Line::from(status_line)])
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(panel, area);
    }

    fn render_message(frame: &mut Frame, message: &str, message_type: &MessageType) {
        let color = match message_type {
            MessageType::Info => Color::Blue,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        };

        let message_paragraph = Paragraph::new(message)
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });

        let frame_area = frame.area();
        if frame_area.width < 6 || frame_area.height < 5 {
            return;
        }
        let area = Rect {
            x: frame_area.x + 2,
            y: frame_area.y + 2,
            width: frame_area.width - 4,
            height: 3,
        };

        frame.render_widget(Clear, area);
        frame.render_widget(message_paragraph, area);
    }
}
