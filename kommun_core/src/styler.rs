use std::collections::HashMap;

use kommun_proto::RegionId;

use crate::buckets::{Breakpoints, Palette, SortDirection};
use crate::color::Rgb;
use crate::config::StyleConfig;
use crate::regions::GeoRegistry;
use crate::renderer::Renderer;
use crate::session::ValueMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStyle {
    pub fill: Rgb,
    pub fill_opacity: f32,
    pub weight: f32,
    pub border: Rgb,
    pub border_opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    /// One entry per breakpoint plus the open-ended top range.
    ///
    /// Ranges are floored; the first starts at the floored minimum value.
    /// Swatches use the color the breakpoint value itself classifies to, so
    /// duplicate breakpoints show repeated colors.
    pub fn build(
        breakpoints: &Breakpoints,
        palette: &Palette,
        direction: SortDirection,
    ) -> Option<Self> {
        let (min, max) = (breakpoints.min()?, breakpoints.max()?);
        let thresholds = breakpoints.thresholds();
        let last = *thresholds.last()?;

        let mut entries: Vec<LegendEntry> = thresholds
            .iter()
            .enumerate()
            .map(|(i, &upper)| {
                let lower = if i == 0 { min } else { thresholds[i - 1] };
                LegendEntry {
                    label: format!("{}–{}", floor_label(lower), floor_label(upper)),
                    color: palette.color_of(Some(upper), breakpoints, direction),
                }
            })
            .collect();
        entries.push(LegendEntry {
            label: format!(">{}", floor_label(last)),
            color: palette.color_of(Some(max), breakpoints, direction),
        });

        Some(Self {
            title: "Values".to_string(),
            entries,
        })
    }
}

fn floor_label(value: f64) -> String {
    // + 0.0 folds -0 into 0
    format!("{}", value.floor() + 0.0)
}

/// `12.34` or `No data`.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.2}"),
        None => "No data".to_string(),
    }
}

pub fn tooltip_text(name: &str, value: Option<f64>) -> String {
    format!("{name}\nValue: {}", format_value(value))
}

/// Turns the current values into per-region styles and the legend.
///
/// Keeps the default style of every region from the last render so hover
/// emphasis can be undone.
#[derive(Debug, Clone)]
pub struct RegionStyler {
    style: StyleConfig,
    palette: Palette,
    defaults: HashMap<RegionId, RegionStyle>,
}

impl RegionStyler {
    pub fn new(style: StyleConfig, palette: Palette) -> Self {
        Self {
            style,
            palette,
            defaults: HashMap::new(),
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn region_style(
        &self,
        value: Option<f64>,
        breakpoints: &Breakpoints,
        direction: SortDirection,
    ) -> RegionStyle {
        RegionStyle {
            fill: self.palette.color_of(value, breakpoints, direction),
            fill_opacity: if value.is_some() {
                self.style.fill_opacity
            } else {
                self.style.no_data_fill_opacity
            },
            weight: self.style.border_weight,
            border: self.style.border_color,
            border_opacity: self.style.border_opacity,
        }
    }

    pub fn render<R: Renderer + ?Sized>(
        &mut self,
        registry: &GeoRegistry,
        values: &ValueMap,
        breakpoints: &Breakpoints,
        direction: SortDirection,
        renderer: &mut R,
    ) {
        renderer.clear_region_layer();
        self.defaults.clear();

        for region in registry.iter() {
            let value = values.get(&region.id);
            let style = self.region_style(value, breakpoints, direction);
            renderer.set_region_style(&region.id, style);
            renderer.show_tooltip(&region.id, tooltip_text(&region.name, value));
            self.defaults.insert(region.id.clone(), style);
        }

        renderer.update_legend(Legend::build(breakpoints, &self.palette, direction));
        tracing::debug!(
            target: "kommun::render",
            regions = registry.len(),
            with_data = values.len(),
            "region_layer.rendered"
        );
    }

    pub fn default_style(&self, region: &str) -> Option<RegionStyle> {
        self.defaults.get(region).copied()
    }

    /// Emphasis for the hovered region; the fill stays as rendered.
    pub fn highlight<R: Renderer + ?Sized>(&self, region: &str, renderer: &mut R) {
        if let Some(base) = self.default_style(region) {
            renderer.set_region_style(
                region,
                RegionStyle {
                    weight: self.style.highlight_weight,
                    border: self.style.highlight_border_color,
                    fill_opacity: self.style.highlight_fill_opacity,
                    ..base
                },
            );
        }
    }

    pub fn reset<R: Renderer + ?Sized>(&self, region: &str, renderer: &mut R) {
        if let Some(base) = self.default_style(region) {
            renderer.set_region_style(region, base);
        }
    }
}
