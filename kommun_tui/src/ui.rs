use std::collections::VecDeque;

use kommun_core::styler::format_value;
use kommun_core::{Dashboard, GeoRegistry, Indicator, Rgb, Scene};
use kommun_proto::{KpiGroup, KpiSearchPage, KpiSummary};
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Closed,
    /// Editing the search term.
    Typing,
    /// Picking from the result list.
    Browsing,
}

/// A search the app should send to the data API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub generation: u64,
    pub term: String,
    pub page: u32,
}

#[derive(Debug, Default)]
pub struct SearchState {
    pub mode: SearchMode,
    pub input: String,
    term: String,
    results: Vec<KpiSummary>,
    selected: usize,
    page: u32,
    has_more: bool,
    generation: u64,
    pending: bool,
}

impl SearchState {
    pub fn open(&mut self) {
        self.mode = SearchMode::Typing;
    }

    pub fn close(&mut self) {
        self.mode = SearchMode::Closed;
    }

    pub fn results(&self) -> &[KpiSummary] {
        &self.results
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Start a fresh search for the typed term. A blank term lists every KPI.
    pub fn submit(&mut self) -> SearchQuery {
        let term = self.input.trim().to_string();
        self.begin(term)
    }

    /// Start a fresh search for a given term, e.g. a KPI group title.
    pub fn begin(&mut self, term: String) -> SearchQuery {
        self.generation += 1;
        self.input = term.clone();
        self.term = term.clone();
        self.results.clear();
        self.selected = 0;
        self.page = 1;
        self.has_more = false;
        self.pending = true;
        self.mode = SearchMode::Browsing;
        SearchQuery {
            generation: self.generation,
            term,
            page: 1,
        }
    }

    /// Ask for the following page when the API reported more results.
    pub fn next_page(&mut self) -> Option<SearchQuery> {
        if self.pending || !self.has_more {
            return None;
        }
        self.pending = true;
        Some(SearchQuery {
            generation: self.generation,
            term: self.term.clone(),
            page: self.page + 1,
        })
    }

    /// Apply a page of results. Pages from an older search are ignored.
    pub fn accept(&mut self, query: &SearchQuery, page: KpiSearchPage) -> bool {
        if query.generation != self.generation {
            return false;
        }
        self.pending = false;
        self.page = query.page;
        self.has_more = page.has_more;
        self.results.extend(page.results);
        true
    }

    /// A request of the current search failed; allow retrying.
    pub fn fail(&mut self, query: &SearchQuery) {
        if query.generation == self.generation {
            self.pending = false;
        }
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn move_selection(&mut self, forward: bool) {
        if self.results.is_empty() {
            return;
        }
        let last = self.results.len() - 1;
        self.selected = if forward {
            (self.selected + 1).min(last)
        } else {
            self.selected.saturating_sub(1)
        };
    }

    pub fn chosen(&self) -> Option<Indicator> {
        self.results.get(self.selected).cloned().map(Indicator::from)
    }
}

pub struct UiState {
    pub logs: VecDeque<String>,
    pub max_logs: usize,
    pub search: SearchState,
    groups: Vec<KpiGroup>,
    next_group: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            logs: VecDeque::new(),
            max_logs: 5,
            search: SearchState::default(),
            groups: Vec::new(),
            next_group: 0,
        }
    }
}

impl UiState {
    pub fn push_log<S: Into<String>>(&mut self, line: S) {
        let mut text: String = line.into();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        if text.is_empty() {
            return;
        }
        self.logs.push_front(text);
        while self.logs.len() > self.max_logs {
            self.logs.pop_back();
        }
    }

    pub fn set_groups(&mut self, groups: Vec<KpiGroup>) {
        self.groups = groups;
        self.next_group = 0;
    }

    /// Title of the next KPI group, cycling through the list.
    pub fn next_group_title(&mut self) -> Option<String> {
        let group = self.groups.get(self.next_group % self.groups.len().max(1))?;
        self.next_group = (self.next_group + 1) % self.groups.len();
        Some(group.title.clone())
    }
}

/// Screen areas of the dashboard.
#[derive(Debug, Clone, Copy)]
pub struct Panes {
    pub header: Rect,
    pub map: Rect,
    pub legend: Rect,
    pub info: Rect,
    pub side: Rect,
    pub logs: Rect,
}

pub fn panes(area: Rect) -> Panes {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(7),
        ])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(11),
            Constraint::Min(8),
            Constraint::Length(10),
        ])
        .split(columns[1]);
    Panes {
        header: rows[0],
        map: columns[0],
        legend: side[0],
        info: side[1],
        side: side[2],
        logs: rows[2],
    }
}

fn bordered_inner(area: Rect) -> Rect {
    area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    })
}

/// Drawing area of the map canvas inside its border.
pub fn map_canvas_area(area: Rect) -> Rect {
    bordered_inner(panes(area).map)
}

/// Longitude and latitude bounds covering every region.
pub fn map_bounds(registry: &GeoRegistry) -> ([f64; 2], [f64; 2]) {
    match registry.bounds() {
        Some(rect) => {
            let (min, max) = (rect.min(), rect.max());
            ([min.x, max.x], [min.y, max.y])
        }
        None => ([0.0, 1.0], [0.0, 1.0]),
    }
}

/// Map a terminal cell to the map coordinate at its center.
///
/// Rows grow downwards while latitude grows upwards.
pub fn canvas_point(
    area: Rect,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    column: u16,
    row: u16,
) -> Option<(f64, f64)> {
    if area.width == 0
        || area.height == 0
        || column < area.x
        || row < area.y
        || column >= area.x + area.width
        || row >= area.y + area.height
    {
        return None;
    }
    let fx = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
    let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
    let x = x_bounds[0] + fx * (x_bounds[1] - x_bounds[0]);
    let y = y_bounds[1] - fy * (y_bounds[1] - y_bounds[0]);
    Some((x, y))
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

pub fn draw_ui(frame: &mut Frame, state: &UiState, dashboard: &Dashboard<Scene>) {
    let panes = panes(frame.size());

    draw_header(frame, panes.header, dashboard);
    draw_map(frame, panes.map, dashboard);
    draw_legend(frame, panes.legend, dashboard.renderer());
    draw_info(frame, panes.info, dashboard.renderer());
    if state.search.mode == SearchMode::Closed {
        draw_commands(frame, panes.side);
    } else {
        draw_search(frame, panes.side, &state.search);
    }
    draw_logs(frame, panes.logs, state);
}

fn draw_header(frame: &mut Frame, area: Rect, dashboard: &Dashboard<Scene>) {
    let session = dashboard.session();
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Municipal KPI Dashboard");
    let indicator = session
        .indicator()
        .map(Indicator::label)
        .unwrap_or_else(|| "No indicator selected".to_string());
    let mut spans = vec![
        Span::styled(indicator, Style::default().fg(Color::Cyan)),
        Span::raw(" | year "),
        Span::styled(
            session.year().unwrap_or("-").to_string(),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" | "),
        Span::raw(session.direction().label()),
    ];
    if dashboard.renderer().is_loading() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled("Loading...", Style::default().fg(Color::Magenta)));
    }
    let text = Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true });
    frame.render_widget(block, area);
    frame.render_widget(text, bordered_inner(area));
}

fn draw_map(frame: &mut Frame, area: Rect, dashboard: &Dashboard<Scene>) {
    let registry = dashboard.registry();
    let scene = dashboard.renderer();
    let (x_bounds, y_bounds) = map_bounds(registry);
    let hovered = dashboard.hover().hovered();

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Map"))
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            for region in registry.iter() {
                if Some(region.id.as_str()) == hovered {
                    continue;
                }
                let Some(style) = scene.region_style(&region.id) else {
                    continue;
                };
                let outline = color(style.fill);
                for polygon in &region.boundary {
                    for segment in polygon.exterior().lines() {
                        ctx.draw(&CanvasLine {
                            x1: segment.start.x,
                            y1: segment.start.y,
                            x2: segment.end.x,
                            y2: segment.end.y,
                            color: outline,
                        });
                    }
                }
            }
            // Hovered region on top so its border is not overdrawn.
            if let Some(region) = hovered.and_then(|id| registry.get(id)) {
                let outline = scene
                    .region_style(&region.id)
                    .map(|style| color(style.border))
                    .unwrap_or(Color::White);
                for polygon in &region.boundary {
                    for segment in polygon.exterior().lines() {
                        ctx.draw(&CanvasLine {
                            x1: segment.start.x,
                            y1: segment.start.y,
                            x2: segment.end.x,
                            y2: segment.end.y,
                            color: outline,
                        });
                    }
                }
            }
        });
    frame.render_widget(canvas, area);
}

fn draw_legend(frame: &mut Frame, area: Rect, scene: &Scene) {
    let (title, lines) = match scene.legend() {
        Some(legend) => (
            legend.title.as_str(),
            legend
                .entries
                .iter()
                .map(|entry| {
                    Line::from(vec![
                        Span::styled("  ", Style::default().bg(color(entry.color))),
                        Span::raw(" "),
                        Span::raw(entry.label.as_str()),
                    ])
                })
                .collect::<Vec<_>>(),
        ),
        None => ("Legend", vec![Line::from("No values")]),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(lines), bordered_inner(area));
}

fn draw_info(frame: &mut Frame, area: Rect, scene: &Scene) {
    let block = Block::default().borders(Borders::ALL).title("Info");
    frame.render_widget(block, area);
    let inner = bordered_inner(area);

    let Some(series) = scene.series().filter(|series| !series.points.is_empty()) else {
        let text = Paragraph::new(scene.info().to_string()).wrap(Wrap { trim: true });
        frame.render_widget(text, inner);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(4)])
        .split(inner);
    frame.render_widget(Paragraph::new(scene.info().to_string()), chunks[0]);

    let data: Vec<(f64, f64)> = series
        .points
        .iter()
        .map(|point| (f64::from(point.year), point.value))
        .collect();
    let (first, last) = series.year_range().unwrap_or((0, 1));
    let (low, high) = series.value_range().unwrap_or((0.0, 1.0));
    let (low, high) = if high > low {
        (low, high)
    } else {
        (low - 1.0, high + 1.0)
    };
    let x_bounds = if last > first {
        [f64::from(first), f64::from(last)]
    } else {
        [f64::from(first) - 1.0, f64::from(last) + 1.0]
    };

    let dataset = Dataset::default()
        .name(series.name.as_str())
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);
    let chart = Chart::new(vec![dataset])
        .x_axis(
            Axis::default()
                .bounds(x_bounds)
                .labels(vec![
                    Span::raw(first.to_string()),
                    Span::raw(last.to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds([low, high])
                .labels(vec![
                    Span::raw(format_value(Some(low))),
                    Span::raw(format_value(Some(high))),
                ]),
        );
    frame.render_widget(chart, chunks[1]);
}

fn draw_search(frame: &mut Frame, area: Rect, search: &SearchState) {
    let title = match (search.mode, search.is_pending()) {
        (SearchMode::Typing, _) => "Search KPIs (Enter to run)",
        (_, true) => "Search KPIs (searching...)",
        _ if search.has_more() => "Search KPIs (PgDn for more)",
        _ => "Search KPIs",
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(block, area);
    let inner = bordered_inner(area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let cursor = if search.mode == SearchMode::Typing { "_" } else { "" };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}{cursor}", search.input)),
        ])),
        chunks[0],
    );

    let items: Vec<ListItem> = search
        .results()
        .iter()
        .map(|kpi| ListItem::new(format!("{} ({})", kpi.title, kpi.group_title)))
        .collect();
    let list = List::new(items).highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default();
    if search.mode == SearchMode::Browsing && !search.results().is_empty() {
        list_state.select(Some(search.selected()));
    }
    frame.render_stateful_widget(list, chunks[1], &mut list_state);
}

fn draw_commands(frame: &mut Frame, area: Rect) {
    let entries = [
        ("/", "search KPIs"),
        ("g", "search next KPI group"),
        ("y / Y", "next / previous year"),
        ("d", "toggle direction"),
        ("<- ->", "step hovered municipality"),
        ("Esc", "leave municipality"),
        ("q", "exit dashboard"),
    ];
    let lines: Vec<Line> = entries
        .iter()
        .map(|(key, help)| {
            Line::from(vec![
                Span::styled(format!("{key:<6}"), Style::default().fg(Color::Yellow)),
                Span::raw(*help),
            ])
        })
        .collect();
    let block = Block::default().borders(Borders::ALL).title("Commands");
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        bordered_inner(area),
    );
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Logs");
    let lines: Vec<Line> = state
        .logs
        .iter()
        .map(|entry| Line::from(Span::raw(entry)))
        .collect();
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(paragraph, bordered_inner(area));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kpi(id: &str) -> KpiSummary {
        KpiSummary {
            id: id.to_string(),
            title: format!("Title {id}"),
            group_title: "Group".to_string(),
            group_id: None,
        }
    }

    #[test]
    fn canvas_point_maps_corners() {
        let area = Rect::new(10, 5, 20, 10);
        let (x, y) = canvas_point(area, [0.0, 20.0], [0.0, 10.0], 10, 5).unwrap();
        assert!((x - 0.5).abs() < 1e-9);
        assert!((y - 9.5).abs() < 1e-9);
        let (x, y) = canvas_point(area, [0.0, 20.0], [0.0, 10.0], 29, 14).unwrap();
        assert!((x - 19.5).abs() < 1e-9);
        assert!((y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn canvas_point_outside_area() {
        let area = Rect::new(10, 5, 20, 10);
        assert!(canvas_point(area, [0.0, 1.0], [0.0, 1.0], 9, 6).is_none());
        assert!(canvas_point(area, [0.0, 1.0], [0.0, 1.0], 30, 6).is_none());
        assert!(canvas_point(area, [0.0, 1.0], [0.0, 1.0], 12, 15).is_none());
    }

    #[test]
    fn stale_search_pages_are_ignored() {
        let mut search = SearchState::default();
        search.input = "skola".to_string();
        let old = search.submit();
        let new = search.begin("vård".to_string());
        let page = KpiSearchPage {
            results: vec![kpi("N1")],
            has_more: true,
        };
        assert!(!search.accept(&old, page.clone()));
        assert!(search.results().is_empty());
        assert!(search.accept(&new, page));
        assert_eq!(search.chosen().map(|i| i.id), Some("N1".to_string()));
    }

    #[test]
    fn next_page_appends() {
        let mut search = SearchState::default();
        let first = search.begin("skola".to_string());
        assert!(search.next_page().is_none());
        search.accept(
            &first,
            KpiSearchPage {
                results: vec![kpi("N1")],
                has_more: true,
            },
        );
        let second = search.next_page().unwrap();
        assert_eq!(second.page, 2);
        assert_eq!(second.term, "skola");
        search.accept(
            &second,
            KpiSearchPage {
                results: vec![kpi("N2")],
                has_more: false,
            },
        );
        assert_eq!(search.results().len(), 2);
        assert!(search.next_page().is_none());
        search.move_selection(true);
        search.move_selection(true);
        assert_eq!(search.chosen().map(|i| i.id), Some("N2".to_string()));
    }

    #[test]
    fn blank_input_lists_everything() {
        let mut search = SearchState::default();
        search.input = "   ".to_string();
        let query = search.submit();
        assert_eq!(query.term, "");
        assert_eq!(query.page, 1);
        assert_eq!(search.mode, SearchMode::Browsing);
        assert!(search.is_pending());
    }

    #[test]
    fn group_titles_cycle() {
        let mut state = UiState::default();
        assert_eq!(state.next_group_title(), None);
        state.set_groups(vec![
            KpiGroup {
                id: "1".to_string(),
                title: "Skola".to_string(),
            },
            KpiGroup {
                id: "2".to_string(),
                title: "Vård".to_string(),
            },
        ]);
        assert_eq!(state.next_group_title().as_deref(), Some("Skola"));
        assert_eq!(state.next_group_title().as_deref(), Some("Vård"));
        assert_eq!(state.next_group_title().as_deref(), Some("Skola"));
    }

    #[test]
    fn log_lines_are_trimmed_and_capped() {
        let mut state = UiState::default();
        for i in 0..10 {
            state.push_log(format!("line {i}\n"));
        }
        state.push_log("\n");
        assert_eq!(state.logs.len(), state.max_logs);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 9"));
    }
}
