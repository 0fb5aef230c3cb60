use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseEvent, MouseEventKind,
};
use kommun_core::{
    Dashboard, DashboardConfig, DashboardEvent, DataError, DataSource, GeoRegistry, Scene,
};
use kommun_proto::{KpiGroup, KpiSearchPage};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::ui::{
    canvas_point, draw_ui, map_bounds, map_canvas_area, SearchMode, SearchQuery, UiState,
};

/// Search-pane traffic, kept apart from the dashboard's own events.
enum SearchEvent {
    Results {
        query: SearchQuery,
        result: Result<KpiSearchPage, DataError>,
    },
    Groups(Result<Vec<KpiGroup>, DataError>),
}

pub struct DashboardApp {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    dashboard: Dashboard<Scene>,
    events: UnboundedReceiver<DashboardEvent>,
    ui_state: UiState,
    log_receiver: Receiver<String>,
    runtime: Handle,
    search_sender: UnboundedSender<SearchEvent>,
    search_receiver: UnboundedReceiver<SearchEvent>,
}

impl DashboardApp {
    pub fn new(
        config: &DashboardConfig,
        source: Arc<dyn DataSource>,
        registry: Arc<GeoRegistry>,
        runtime: Handle,
        log_receiver: Receiver<String>,
    ) -> Result<Self> {
        let mut stdout = std::io::stdout();
        crossterm::execute!(stdout, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        crossterm::terminal::enable_raw_mode()?;
        terminal.clear()?;
        terminal.hide_cursor()?;

        let (dashboard, events) =
            Dashboard::new(config, source, registry, Scene::default(), runtime.clone());
        let (search_sender, search_receiver) = unbounded_channel();
        let app = Self {
            terminal,
            dashboard,
            events,
            ui_state: UiState::default(),
            log_receiver,
            runtime,
            search_sender,
            search_receiver,
        };
        app.fetch_groups();
        Ok(app)
    }

    pub fn run(mut self) -> Result<()> {
        let mut last_draw = Instant::now() - Duration::from_millis(100);

        loop {
            while let Ok(event) = self.events.try_recv() {
                self.dashboard.handle_event(event);
            }

            while let Ok(event) = self.search_receiver.try_recv() {
                self.apply_search_event(event);
            }

            while let Ok(line) = self.log_receiver.try_recv() {
                self.ui_state.push_log(line);
            }

            if last_draw.elapsed() >= Duration::from_millis(100) {
                let (ui_state, dashboard) = (&self.ui_state, &self.dashboard);
                self.terminal
                    .draw(|frame| draw_ui(frame, ui_state, dashboard))?;
                last_draw = Instant::now();
            }

            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if !self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse)?,
                    _ => {}
                }
            }
        }

        crossterm::execute!(std::io::stdout(), DisableMouseCapture)?;
        self.terminal.show_cursor()?;
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.ui_state.search.mode {
            SearchMode::Typing => match key.code {
                KeyCode::Esc => self.ui_state.search.close(),
                KeyCode::Enter => {
                    let query = self.ui_state.search.submit();
                    self.run_search(query);
                }
                KeyCode::Backspace => {
                    self.ui_state.search.input.pop();
                }
                KeyCode::Char(c) => self.ui_state.search.input.push(c),
                _ => {}
            },
            SearchMode::Browsing => match key.code {
                KeyCode::Esc => self.ui_state.search.close(),
                KeyCode::Char('/') => self.ui_state.search.open(),
                KeyCode::Up => self.ui_state.search.move_selection(false),
                KeyCode::Down => self.ui_state.search.move_selection(true),
                KeyCode::PageDown => {
                    if let Some(query) = self.ui_state.search.next_page() {
                        self.run_search(query);
                    }
                }
                KeyCode::Enter => {
                    if let Some(indicator) = self.ui_state.search.chosen() {
                        info!(
                            target: "kommun::session",
                            indicator = %indicator.id,
                            "indicator.chosen"
                        );
                        self.ui_state.search.close();
                        self.dashboard.select_indicator(indicator);
                    }
                }
                _ => {}
            },
            SearchMode::Closed => match key.code {
                KeyCode::Char('q') => return false,
                KeyCode::Char('/') => self.ui_state.search.open(),
                KeyCode::Char('g') => match self.ui_state.next_group_title() {
                    Some(title) => {
                        let query = self.ui_state.search.begin(title);
                        self.run_search(query);
                    }
                    None => warn!(target: "kommun::search", "search.groups_unavailable"),
                },
                KeyCode::Char('y') => self.step_year(true),
                KeyCode::Char('Y') => self.step_year(false),
                KeyCode::Char('d') => self.dashboard.toggle_direction(),
                KeyCode::Right => self.step_hover(true),
                KeyCode::Left => self.step_hover(false),
                KeyCode::Esc => {
                    if self.dashboard.hover().hovered().is_some() {
                        self.dashboard.hover_leave();
                    }
                }
                _ => {}
            },
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        if !matches!(mouse.kind, MouseEventKind::Moved) {
            return Ok(());
        }
        let area = map_canvas_area(self.terminal.size()?);
        let (x_bounds, y_bounds) = map_bounds(self.dashboard.registry());
        let region = canvas_point(area, x_bounds, y_bounds, mouse.column, mouse.row).and_then(
            |(x, y)| {
                self.dashboard
                    .registry()
                    .region_at(x, y)
                    .map(|region| region.id.clone())
            },
        );
        match region {
            Some(id) => self.dashboard.hover_enter(&id),
            None => {
                if self.dashboard.hover().hovered().is_some() {
                    self.dashboard.hover_leave();
                }
            }
        }
        Ok(())
    }

    fn step_year(&mut self, forward: bool) {
        let session = self.dashboard.session();
        match next_year(session.years(), session.year(), forward) {
            Some(year) => self.dashboard.select_year(Some(year)),
            None => warn!(target: "kommun::session", "year.step_unavailable"),
        }
    }

    fn step_hover(&mut self, forward: bool) {
        let registry = self.dashboard.registry();
        let current = self
            .dashboard
            .hover()
            .hovered()
            .and_then(|id| registry.position(id));
        let next = step_position(current, registry.len(), forward)
            .and_then(|position| registry.by_position(position))
            .map(|region| region.id.clone());
        if let Some(id) = next {
            self.dashboard.hover_enter(&id);
        }
    }

    fn run_search(&self, query: SearchQuery) {
        let source = self.dashboard.source();
        let sender = self.search_sender.clone();
        self.runtime.spawn(async move {
            let result = source.search_kpis(&query.term, query.page).await;
            let _ = sender.send(SearchEvent::Results { query, result });
        });
    }

    fn fetch_groups(&self) {
        let source = self.dashboard.source();
        let sender = self.search_sender.clone();
        self.runtime.spawn(async move {
            let result = source.kpi_groups().await;
            let _ = sender.send(SearchEvent::Groups(result));
        });
    }

    fn apply_search_event(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::Results { query, result } => match result {
                Ok(page) => {
                    if self.ui_state.search.accept(&query, page) {
                        info!(
                            target: "kommun::search",
                            term = %query.term,
                            page = query.page,
                            results = self.ui_state.search.results().len(),
                            "search.completed"
                        );
                    }
                }
                Err(err) => {
                    self.ui_state.search.fail(&query);
                    warn!(
                        target: "kommun::search",
                        term = %query.term,
                        error = %err,
                        "search.failed"
                    );
                }
            },
            SearchEvent::Groups(Ok(groups)) => {
                info!(target: "kommun::search", groups = groups.len(), "groups.loaded");
                self.ui_state.set_groups(groups);
            }
            SearchEvent::Groups(Err(err)) => {
                warn!(target: "kommun::search", error = %err, "groups.failed");
            }
        }
    }
}

/// The year after (or before) the selected one in the offered list.
///
/// With no year selected the first offered year is used. Stepping stops at
/// either end of the list.
fn next_year(years: &[String], current: Option<&str>, forward: bool) -> Option<String> {
    let position = current.and_then(|year| years.iter().position(|y| y == year));
    let index = match position {
        None => 0,
        Some(i) if forward => (i + 1).min(years.len().checked_sub(1)?),
        Some(i) => i.saturating_sub(1),
    };
    years.get(index).cloned()
}

/// Next region position when stepping hover, wrapping at both ends.
fn step_position(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (current, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn years() -> Vec<String> {
        ["2019", "2020", "2021"].iter().map(|y| y.to_string()).collect()
    }

    #[test]
    fn year_steps_and_clamps() {
        let years = years();
        assert_eq!(next_year(&years, None, true).as_deref(), Some("2019"));
        assert_eq!(next_year(&years, Some("2019"), true).as_deref(), Some("2020"));
        assert_eq!(next_year(&years, Some("2021"), true).as_deref(), Some("2021"));
        assert_eq!(next_year(&years, Some("2020"), false).as_deref(), Some("2019"));
        assert_eq!(next_year(&years, Some("2019"), false).as_deref(), Some("2019"));
        assert_eq!(next_year(&[], None, true), None);
    }

    #[test]
    fn unknown_year_restarts_at_first() {
        assert_eq!(next_year(&years(), Some("1999"), false).as_deref(), Some("2019"));
    }

    #[test]
    fn hover_position_wraps() {
        assert_eq!(step_position(None, 3, true), Some(0));
        assert_eq!(step_position(None, 3, false), Some(2));
        assert_eq!(step_position(Some(2), 3, true), Some(0));
        assert_eq!(step_position(Some(0), 3, false), Some(2));
        assert_eq!(step_position(Some(0), 0, true), None);
    }
}
