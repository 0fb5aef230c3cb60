//! Wires the session, hover controller and styler to a data source and a
//! renderer.
//!
//! The dashboard is owned by the UI thread. Fetches run on the tokio runtime
//! and come back as [`DashboardEvent`]s, which the UI loop feeds to
//! [`Dashboard::handle_event`].

use std::sync::Arc;

use chrono::Datelike;
use kommun_proto::{HistoryPoint, MunicipalityRecord};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;

use crate::client::DataSource;
use crate::config::DashboardConfig;
use crate::error::DataError;
use crate::hover::{HistoryRequest, HoverController, HoverTransition, InfoPanel};
use crate::regions::GeoRegistry;
use crate::renderer::Renderer;
use crate::session::{Indicator, IndicatorSession, ValuesRequest, YearsRequest};
use crate::styler::RegionStyler;

#[derive(Debug)]
pub enum DashboardEvent {
    Years {
        request: YearsRequest,
        result: Result<Vec<String>, DataError>,
    },
    Values {
        request: ValuesRequest,
        result: Result<Vec<MunicipalityRecord>, DataError>,
    },
    History {
        request: HistoryRequest,
        result: Result<Vec<HistoryPoint>, DataError>,
    },
}

pub struct Dashboard<R: Renderer> {
    source: Arc<dyn DataSource>,
    registry: Arc<GeoRegistry>,
    session: IndicatorSession,
    hover: HoverController,
    styler: RegionStyler,
    renderer: R,
    runtime: Handle,
    events: UnboundedSender<DashboardEvent>,
    history_task: Option<AbortHandle>,
}

impl<R: Renderer> Dashboard<R> {
    /// Build the dashboard and draw the initial, data-less map.
    pub fn new(
        config: &DashboardConfig,
        source: Arc<dyn DataSource>,
        registry: Arc<GeoRegistry>,
        renderer: R,
        runtime: Handle,
    ) -> (Self, UnboundedReceiver<DashboardEvent>) {
        let default_year = config.session.default_year(chrono::Local::now().year());
        let session = IndicatorSession::new(config.session.direction(), Some(default_year));
        let (events, receiver) = unbounded_channel();
        let mut dashboard = Self {
            source,
            registry,
            session,
            hover: HoverController::default(),
            styler: RegionStyler::new(config.style.clone(), config.palette.clone()),
            renderer,
            runtime,
            events,
            history_task: None,
        };
        dashboard.redraw();
        dashboard.renderer.show_info(InfoPanel::Idle);
        (dashboard, receiver)
    }

    pub fn session(&self) -> &IndicatorSession {
        &self.session
    }

    pub fn hover(&self) -> &HoverController {
        &self.hover
    }

    pub fn registry(&self) -> &GeoRegistry {
        &self.registry
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn source(&self) -> Arc<dyn DataSource> {
        Arc::clone(&self.source)
    }

    pub fn select_indicator(&mut self, indicator: Indicator) {
        let request = self.session.select_indicator(indicator);
        self.spawn_years(request);
        self.sync_loading();
        self.redraw();

        // History on screen belongs to the previous indicator.
        if let Some(region) = self.hover.hovered().map(str::to_string) {
            self.hover_leave();
            self.hover_enter(&region);
        }
    }

    pub fn select_year(&mut self, year: Option<String>) {
        match self.session.select_year(year) {
            Some(request) => self.spawn_values(request),
            None => self.redraw(),
        }
        self.sync_loading();
    }

    pub fn toggle_direction(&mut self) {
        if self.session.toggle_direction() {
            self.redraw();
        }
    }

    /// Pointer entered a region.
    pub fn hover_enter(&mut self, region_id: &str) {
        let Some(region) = self.registry.get(region_id) else {
            tracing::debug!(
                target: "kommun::hover",
                region = region_id,
                "hover.ignored=unknown_region"
            );
            return;
        };
        let (id, name) = (region.id.clone(), region.name.clone());

        if self.hover.hovered().is_some_and(|current| current != id) {
            self.hover_leave();
        }

        self.renderer.show_info(InfoPanel::Region {
            name: name.clone(),
            value: self.session.values().get(&id),
        });

        match self.hover.enter(&id, &name, self.session.indicator()) {
            HoverTransition::AlreadyHovered => {}
            HoverTransition::Entered(request) => {
                self.styler.highlight(&id, &mut self.renderer);
                if let Some(request) = request {
                    self.spawn_history(request);
                }
            }
        }
    }

    /// Pointer left the hovered region.
    pub fn hover_leave(&mut self) {
        if let Some(region) = self.hover.hovered().map(str::to_string) {
            self.styler.reset(&region, &mut self.renderer);
        }
        if self.hover.leave() {
            if let Some(task) = self.history_task.take() {
                task.abort();
            }
        }
        self.history_task = None;
        self.renderer.show_series(None);
        self.renderer.show_info(InfoPanel::Idle);
    }

    pub fn handle_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Years { request, result } => {
                if let Some(values) = self.session.complete_years(&request, result) {
                    self.spawn_values(values);
                }
                self.sync_loading();
            }
            DashboardEvent::Values { request, result } => {
                if self.session.complete_values(&request, result) {
                    self.redraw();
                }
                self.sync_loading();
            }
            DashboardEvent::History { request, result } => {
                if let Some(series) = self.hover.complete(&request, result) {
                    self.history_task = None;
                    self.renderer.show_series(Some(series));
                }
            }
        }
    }

    fn redraw(&mut self) {
        self.styler.render(
            &self.registry,
            self.session.values(),
            self.session.breakpoints(),
            self.session.direction(),
            &mut self.renderer,
        );

        if let Some(region) = self.hover.hovered().and_then(|id| self.registry.get(id)) {
            self.styler.highlight(&region.id, &mut self.renderer);
            self.renderer.show_info(InfoPanel::Region {
                name: region.name.clone(),
                value: self.session.values().get(&region.id),
            });
        }
    }

    fn sync_loading(&mut self) {
        self.renderer.set_loading(self.session.is_loading());
    }

    fn spawn_years(&self, request: YearsRequest) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let result = source.available_years(&request.indicator_id).await;
            let _ = events.send(DashboardEvent::Years { request, result });
        });
    }

    fn spawn_values(&self, request: ValuesRequest) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let result = source
                .municipality_values(&request.indicator_id, &request.year)
                .await;
            let _ = events.send(DashboardEvent::Values { request, result });
        });
    }

    fn spawn_history(&mut self, request: HistoryRequest) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        let task = self.runtime.spawn(async move {
            let result = source
                .history(&request.indicator_id, &request.region)
                .await;
            let _ = events.send(DashboardEvent::History { request, result });
        });
        self.history_task = Some(task.abort_handle());
    }
}
