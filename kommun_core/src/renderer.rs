//! Display surface seen by the dashboard core.

use std::collections::HashMap;

use kommun_proto::RegionId;

use crate::hover::{HistorySeries, InfoPanel};
use crate::styler::{Legend, RegionStyle};

/// Capabilities the core needs from a map display.
///
/// All calls come from the single UI thread that owns the dashboard.
pub trait Renderer {
    /// Remove the current region layer before a new one is drawn.
    fn clear_region_layer(&mut self);

    fn set_region_style(&mut self, region: &str, style: RegionStyle);

    fn show_tooltip(&mut self, region: &str, text: String);

    /// Replace the legend; `None` removes it.
    fn update_legend(&mut self, legend: Option<Legend>);

    fn show_info(&mut self, info: InfoPanel);

    /// Show a history chart; `None` tears the current one down.
    fn show_series(&mut self, series: Option<HistorySeries>);

    fn set_loading(&mut self, loading: bool);
}

/// Retained copy of everything the core has asked to display.
///
/// Front ends draw from it each frame.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    styles: HashMap<RegionId, RegionStyle>,
    tooltips: HashMap<RegionId, String>,
    legend: Option<Legend>,
    info: InfoPanel,
    series: Option<HistorySeries>,
    loading: bool,
    layers_built: u64,
}

impl Scene {
    pub fn region_style(&self, region: &str) -> Option<RegionStyle> {
        self.styles.get(region).copied()
    }

    pub fn region_count(&self) -> usize {
        self.styles.len()
    }

    pub fn tooltip(&self, region: &str) -> Option<&str> {
        self.tooltips.get(region).map(String::as_str)
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    pub fn info(&self) -> &InfoPanel {
        &self.info
    }

    pub fn series(&self) -> Option<&HistorySeries> {
        self.series.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// How many region layers have been started.
    pub fn layers_built(&self) -> u64 {
        self.layers_built
    }
}

impl Renderer for Scene {
    fn clear_region_layer(&mut self) {
        self.styles.clear();
        self.tooltips.clear();
        self.layers_built += 1;
    }

    fn set_region_style(&mut self, region: &str, style: RegionStyle) {
        self.styles.insert(region.to_string(), style);
    }

    fn show_tooltip(&mut self, region: &str, text: String) {
        self.tooltips.insert(region.to_string(), text);
    }

    fn update_legend(&mut self, legend: Option<Legend>) {
        self.legend = legend;
    }

    fn show_info(&mut self, info: InfoPanel) {
        self.info = info;
    }

    fn show_series(&mut self, series: Option<HistorySeries>) {
        self.series = series;
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}
