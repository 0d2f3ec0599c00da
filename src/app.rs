use std::collections::VecDeque;
use std::sync::mpsc;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::model::config::AppConfig;
use crate::model::installer_form::{FormField, InstallerForm};
use crate::model::mode::Mode;
use crate::msg::{Msg, Notification, Request};
use crate::plugin::{ListRow, PluginDescriptor, PluginHost, SelectionMap, TomlFileStore};

const MAX_NOTIFICATIONS: usize = 8;

/// Terminal plugin manager. Renders the host's latest plugin list and turns
/// key presses into plugin requests.
pub struct App {
    pub mode: Mode,
    host: PluginHost,
    /// Snapshot from the last `StateChanged`.
    plugins: Vec<PluginDescriptor>,
    selection: SelectionMap,
    /// Flat index of the highlighted plugin.
    cursor: usize,
    scroll: usize,
    pub form: InstallerForm,
    pub should_quit: bool,
    pub event_tx: mpsc::Sender<Msg>,
    pub notifications: VecDeque<String>,
}

impl App {
    pub fn new(config: &AppConfig, event_tx: mpsc::Sender<Msg>) -> Result<Self> {
        let store = TomlFileStore::new(config.state_path()?);
        tracing::info!("plugin state file: {}", store.path().display());

        let host = PluginHost::new(config.default_plugins()?, Box::new(store))?;
        Ok(Self::with_host(host, event_tx))
    }

    pub fn with_host(host: PluginHost, event_tx: mpsc::Sender<Msg>) -> Self {
        let plugins = host.plugins().to_vec();
        let selection = SelectionMap::new(&plugins);

        Self {
            mode: Mode::PluginList,
            host,
            plugins,
            selection,
            cursor: 0,
            scroll: 0,
            form: InstallerForm::default(),
            should_quit: false,
            event_tx,
            notifications: VecDeque::new(),
        }
    }

    pub fn plugins(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => self.handle_key(key),
            Msg::Plugin(request) => {
                let adding = matches!(request, Request::AddExternalPlugin(_));
                let resetting = matches!(request, Request::ResetPlugins);
                for notification in self.host.handle(request) {
                    if adding && notification == Notification::InstallerClosed {
                        self.announce_added();
                    }
                    let changed = matches!(notification, Notification::StateChanged(_));
                    self.apply(notification);
                    if resetting && changed {
                        self.push_notification("plugins reset to defaults".to_string());
                    }
                }
            }
            Msg::Resize(_w, _h) => {}
            Msg::Quit => self.should_quit = true,
        }
        Ok(())
    }

    fn apply(&mut self, notification: Notification) {
        match notification {
            Notification::StateChanged(plugins) => {
                self.selection = SelectionMap::new(&plugins);
                self.plugins = plugins;
                self.cursor = self.cursor.min(self.selection.len().saturating_sub(1));
            }
            Notification::InstallerOpened => {
                self.form.clear();
                self.mode = Mode::Installer;
            }
            Notification::InstallerClosed => {
                self.form.clear();
                self.mode = Mode::PluginList;
            }
            Notification::PluginRejected(err) => {
                self.push_notification(format!("plugin rejected: {err}"));
                self.form.error = Some(err.to_string());
            }
        }
    }

    fn announce_added(&mut self) {
        if let Some(added) = self.plugins.last() {
            let message = format!("added {} plugin {}", added.kind, added.name);
            self.push_notification(message);
        }
    }

    fn push_notification(&mut self, message: String) {
        self.notifications.push_back(message);
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    fn send(&self, request: Request) {
        if self.event_tx.send(Msg::Plugin(request)).is_err() {
            tracing::warn!("event loop closed, dropping plugin request");
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match self.mode {
            Mode::PluginList => self.handle_key_list(key),
            Mode::Installer => self.handle_key_installer(key),
        }
    }

    fn handle_key_list(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                let _ = self.event_tx.send(Msg::Quit);
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = self.event_tx.send(Msg::Quit);
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Char('g') | KeyCode::Home => self.cursor = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.cursor = self.selection.len().saturating_sub(1);
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_cursor(),
            KeyCode::Char('r') => self.send(Request::ResetPlugins),
            KeyCode::Char('a') => self.send(Request::RequestOpenInstaller),
            _ => {}
        }
    }

    fn handle_key_installer(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.send(Request::CloseInstaller),
            KeyCode::Enter => self.send(Request::AddExternalPlugin(self.form.to_candidate())),
            KeyCode::Tab | KeyCode::Down => self.form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus_prev(),
            KeyCode::Backspace => self.form.pop_char(),
            KeyCode::Left | KeyCode::Right => self.form.cycle(),
            KeyCode::Char(' ')
                if !matches!(self.form.focus, FormField::Name | FormField::Src) =>
            {
                self.form.cycle();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.form.push_char(ch);
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.selection.is_empty() {
            self.cursor = 0;
            return;
        }

        let max = self.selection.len().saturating_sub(1) as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
    }

    /// Sends the full selection with the highlighted plugin flipped.
    fn toggle_cursor(&mut self) {
        if self.cursor >= self.selection.len() {
            return;
        }

        let mut selected = self.selection.selected(&self.plugins);
        if !selected.remove(&self.cursor) {
            selected.insert(self.cursor);
        }
        self.send(Request::SetPlugins(selected));
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // title bar
                Constraint::Min(1),    // plugin list
                Constraint::Length(1), // key hints
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());

        self.render_title(frame, chunks[0]);
        self.render_plugin_list(frame, chunks[1]);
        self.render_hints(frame, chunks[2]);
        self.render_status_bar(frame, chunks[3]);

        if self.mode == Mode::Installer {
            self.render_installer(frame);
        }
    }

    fn render_title(&self, frame: &mut Frame, area: Rect) {
        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                " plugboard ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" Plugins ", Style::default().fg(Color::Gray)),
        ]))
        .style(Style::default().bg(Color::Rgb(12, 12, 18)));
        frame.render_widget(title, area);
    }

    fn render_plugin_list(&mut self, frame: &mut Frame, area: Rect) {
        let rows = self.selection.rows(&self.plugins);
        let height = area.height as usize;

        let cursor_row = rows
            .iter()
            .position(|row| matches!(row, ListRow::Item { flat, .. } if *flat == self.cursor))
            .unwrap_or(0);
        if cursor_row < self.scroll {
            self.scroll = cursor_row;
        } else if height > 0 && cursor_row >= self.scroll + height {
            self.scroll = cursor_row + 1 - height;
        }

        let width = area.width as usize;
        let lines: Vec<Line> = rows
            .iter()
            .skip(self.scroll)
            .take(height)
            .map(|row| self.render_row(row, width))
            .collect();

        frame.render_widget(
            Paragraph::new(lines).style(Style::default().bg(Color::Rgb(12, 12, 18))),
            area,
        );
    }

    fn render_row(&self, row: &ListRow, width: usize) -> Line<'static> {
        match *row {
            ListRow::Header(label) => Line::from(Span::styled(
                format!(" {}", label.to_uppercase()),
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            )),
            ListRow::Divider { inset } => {
                let indent = if inset { 4 } else { 0 };
                Line::from(Span::styled(
                    format!("{}{}", " ".repeat(indent), "─".repeat(width.saturating_sub(indent))),
                    Style::default().fg(Color::DarkGray),
                ))
            }
            ListRow::Item { flat, registry } => {
                let Some(plugin) = self.plugins.get(registry) else {
                    return Line::default();
                };

                let check = if plugin.installed { "[x]" } else { "[ ]" };
                let origin = if plugin.official { "official" } else { "external" };
                let label = format!("  {check} {:<32} {:<18} {origin}", plugin.name, plugin.icon());

                if flat == self.cursor && self.mode == Mode::PluginList {
                    Line::from(Span::styled(
                        label,
                        Style::default().fg(Color::Black).bg(Color::Cyan),
                    ))
                } else if plugin.installed {
                    Line::from(Span::styled(label, Style::default().fg(Color::Gray)))
                } else {
                    Line::from(Span::styled(label, Style::default().fg(Color::DarkGray)))
                }
            }
        }
    }

    fn render_hints(&self, frame: &mut Frame, area: Rect) {
        let hints = match self.mode {
            Mode::PluginList => " j/k: move  space: toggle  a: add plugin  r: reset  q: quit ",
            Mode::Installer => " Tab: next field  ←/→: change  Enter: add  Esc: cancel ",
        };
        frame.render_widget(
            Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mode_style = match self.mode {
            Mode::PluginList => Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Mode::Installer => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        };

        let mode_span = Span::styled(format!(" {} ", self.mode.label()), mode_style);

        let installed = self.plugins.iter().filter(|p| p.installed).count();
        let last = self
            .notifications
            .back()
            .map(|note| format!(" | {note}"))
            .unwrap_or_default();

        let info = Span::styled(
            format!(" {installed}/{} installed{last} ", self.plugins.len()),
            Style::default().fg(Color::Gray).bg(Color::DarkGray),
        );

        let bar = Line::from(vec![mode_span, info]);
        let status = Paragraph::new(bar).style(Style::default().bg(Color::DarkGray));
        frame.render_widget(status, area);
    }

    fn render_installer(&self, frame: &mut Frame) {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);

        let mut lines = vec![Line::from(Span::styled(
            "External plugins run with full access to the host. Only add sources you trust.",
            Style::default().fg(Color::Red),
        ))];
        lines.push(Line::default());

        for field in self.form.fields() {
            let (label, value) = match field {
                FormField::Name => ("Name", self.form.name.clone()),
                FormField::Kind => ("Kind", format!("< {} >", self.form.kind())),
                FormField::Position => ("Position", format!("< {} >", self.form.position)),
                FormField::RequireDoc => (
                    "Requires document",
                    if self.form.require_doc { "[x]" } else { "[ ]" }.to_string(),
                ),
                FormField::Src => ("Source URL", self.form.src.clone()),
            };

            let text = format!(" {label:<18} {value}");
            if field == self.form.focus {
                lines.push(Line::from(Span::styled(
                    text,
                    Style::default().fg(Color::Black).bg(Color::Cyan),
                )));
            } else {
                lines.push(Line::from(Span::styled(text, Style::default().fg(Color::Gray))));
            }
        }

        if let Some(err) = &self.form.error {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!(" {err}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }

        let dialog = Paragraph::new(lines).block(
            Block::default()
                .title(" Add plugin ")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Rgb(15, 15, 24))),
        );
        frame.render_widget(dialog, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{MemoryStore, PluginKind};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn defaults() -> Vec<PluginDescriptor> {
        vec![
            PluginDescriptor {
                name: "Check".to_string(),
                src: "builtin://validators/check.js".to_string(),
                kind: PluginKind::Validator,
                installed: true,
                official: true,
                icon: None,
            },
            PluginDescriptor {
                name: "Diagram".to_string(),
                src: "builtin://editors/diagram.js".to_string(),
                kind: PluginKind::Editor,
                installed: true,
                official: true,
                icon: None,
            },
        ]
    }

    fn app() -> (App, mpsc::Receiver<Msg>) {
        let (tx, rx) = mpsc::channel();
        let host = PluginHost::new(defaults(), Box::new(MemoryStore::new())).unwrap();
        (App::with_host(host, tx), rx)
    }

    fn press(app: &mut App, rx: &mpsc::Receiver<Msg>, code: KeyCode) {
        app.update(Msg::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap();
        let pending: Vec<Msg> = rx.try_iter().collect();
        for msg in pending {
            app.update(msg).unwrap();
        }
    }

    fn type_text(app: &mut App, rx: &mpsc::Receiver<Msg>, text: &str) {
        for ch in text.chars() {
            press(app, rx, KeyCode::Char(ch));
        }
    }

    #[test]
    fn toggling_uses_flattened_order() {
        let (mut app, rx) = app();

        // Flat index 0 is the editor even though it is second in the registry.
        press(&mut app, &rx, KeyCode::Char(' '));

        assert!(app.plugins()[0].installed);
        assert!(!app.plugins()[1].installed);
    }

    #[test]
    fn reset_reinstalls_defaults() {
        let (mut app, rx) = app();
        press(&mut app, &rx, KeyCode::Char(' '));
        press(&mut app, &rx, KeyCode::Char('j'));
        press(&mut app, &rx, KeyCode::Char(' '));
        assert!(app.plugins().iter().all(|p| !p.installed));

        press(&mut app, &rx, KeyCode::Char('r'));
        assert!(app.plugins().iter().all(|p| p.installed));
        assert_eq!(
            app.notifications.back().map(String::as_str),
            Some("plugins reset to defaults")
        );
    }

    #[test]
    fn reset_is_announced_only_once_handled() {
        let (mut app, rx) = app();

        app.update(Msg::Key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE)))
            .unwrap();
        assert!(app.notifications.is_empty());

        let pending: Vec<Msg> = rx.try_iter().collect();
        assert!(matches!(pending.as_slice(), [Msg::Plugin(Request::ResetPlugins)]));
        for msg in pending {
            app.update(msg).unwrap();
        }
        assert_eq!(app.notifications.len(), 1);
    }

    #[test]
    fn installer_adds_plugin_and_closes() {
        let (mut app, rx) = app();
        press(&mut app, &rx, KeyCode::Char('a'));
        assert_eq!(app.mode, Mode::Installer);

        type_text(&mut app, &rx, "testName");
        press(&mut app, &rx, KeyCode::BackTab);
        type_text(&mut app, &rx, "http://example.com/plugin.js");
        press(&mut app, &rx, KeyCode::Enter);

        assert_eq!(app.mode, Mode::PluginList);
        assert_eq!(app.plugins().len(), 3);
        assert!(!app.plugins()[2].official);
        assert_eq!(
            app.notifications.back().map(String::as_str),
            Some("added editor plugin testName")
        );
    }

    #[test]
    fn installer_stays_open_on_invalid_source() {
        let (mut app, rx) = app();
        press(&mut app, &rx, KeyCode::Char('a'));
        type_text(&mut app, &rx, "testName");
        press(&mut app, &rx, KeyCode::BackTab);
        type_text(&mut app, &rx, "notaURL");
        press(&mut app, &rx, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Installer);
        assert!(app.form.error.is_some());
        assert_eq!(app.plugins().len(), 2);
    }

    #[test]
    fn cancelled_installer_adds_nothing() {
        let (mut app, rx) = app();
        press(&mut app, &rx, KeyCode::Char('a'));
        type_text(&mut app, &rx, "half typed");
        press(&mut app, &rx, KeyCode::Esc);

        assert_eq!(app.mode, Mode::PluginList);
        assert_eq!(app.plugins().len(), 2);
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn quit_key_goes_through_event_loop() {
        let (mut app, rx) = app();
        press(&mut app, &rx, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn view_renders_groups_and_plugins() {
        let (mut app, _rx) = app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| app.view(frame)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();

        assert!(text.contains("EDITOR"));
        assert!(text.contains("MENU"));
        assert!(text.contains("[x] Diagram"));
        assert!(text.contains("2/2 installed"));
    }
}
