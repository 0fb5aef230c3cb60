//! Core of the municipal KPI choropleth dashboard.
//!
//! Loads region boundaries, buckets indicator values into percentile colors,
//! and keeps the map, legend, info panel and history chart in step with the
//! user's selection. Drawing is delegated to a [`Renderer`]; data comes from a
//! [`DataSource`].

pub mod buckets;
pub mod client;
mod color;
pub mod config;
pub mod dashboard;
mod error;
pub mod hover;
pub mod regions;
pub mod renderer;
pub mod session;
pub mod styler;

pub use buckets::{Breakpoints, Classification, Palette, SortDirection, BUCKET_COUNT};
pub use client::{DataSource, HttpDataSource};
pub use color::{ColorParseError, Rgb};
pub use config::{
    load_dashboard_config, load_dashboard_config_from_env, DashboardConfig,
    DashboardConfigError, DashboardConfigMetadata,
};
pub use dashboard::{Dashboard, DashboardEvent};
pub use error::DataError;
pub use hover::{HistoryRequest, HistorySeries, HoverController, HoverState, InfoPanel};
pub use regions::{GeoError, GeoRegistry, Region};
pub use renderer::{Renderer, Scene};
pub use session::{Indicator, IndicatorSession, SessionPhase, ValueMap};
pub use styler::{Legend, LegendEntry, RegionStyle, RegionStyler};
