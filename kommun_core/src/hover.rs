//! Hover tracking with at most one history fetch per hovered region.

use std::fmt;

use kommun_proto::{HistoryPoint, RegionId};

use crate::error::DataError;
use crate::session::Indicator;
use crate::styler::format_value;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Loading(RegionId),
    Loaded(RegionId),
}

impl HoverState {
    pub fn region(&self) -> Option<&str> {
        match self {
            HoverState::Idle => None,
            HoverState::Loading(region) | HoverState::Loaded(region) => Some(region),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub ticket: u64,
    pub indicator_id: String,
    pub region: RegionId,
    pub region_name: String,
}

/// Yearly values of one region, ascending by year.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    pub region: RegionId,
    pub name: String,
    pub points: Vec<HistoryPoint>,
}

impl HistorySeries {
    /// Sorts the points; the API does not promise any order.
    pub fn new(region: RegionId, name: String, mut points: Vec<HistoryPoint>) -> Self {
        points.sort_by_key(|point| point.year);
        Self {
            region,
            name,
            points,
        }
    }

    pub fn year_range(&self) -> Option<(i32, i32)> {
        Some((self.points.first()?.year, self.points.last()?.year))
    }

    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.points.iter().map(|point| point.value).fold(None, |range, value| {
            Some(match range {
                None => (value, value),
                Some((lo, hi)) => (f64::min(lo, value), f64::max(hi, value)),
            })
        })
    }
}

/// Contents of the info panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InfoPanel {
    #[default]
    Idle,
    Region {
        name: String,
        value: Option<f64>,
    },
}

impl fmt::Display for InfoPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoPanel::Idle => f.write_str("Hover over a municipality"),
            InfoPanel::Region { name, value } => {
                write!(f, "{name}\nValue: {}", format_value(*value))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverTransition {
    /// The region is already hovered; nothing new is fetched.
    AlreadyHovered,
    /// A new region is hovered, with the history request to issue if an
    /// indicator is selected.
    Entered(Option<HistoryRequest>),
}

#[derive(Debug, Clone, Default)]
pub struct HoverController {
    state: HoverState,
    ticket: u64,
}

impl HoverController {
    pub fn state(&self) -> &HoverState {
        &self.state
    }

    pub fn hovered(&self) -> Option<&str> {
        self.state.region()
    }

    pub fn enter(
        &mut self,
        region: &str,
        region_name: &str,
        indicator: Option<&Indicator>,
    ) -> HoverTransition {
        if self.hovered() == Some(region) {
            return HoverTransition::AlreadyHovered;
        }

        let Some(indicator) = indicator else {
            self.state = HoverState::Loaded(region.to_string());
            return HoverTransition::Entered(None);
        };

        self.ticket += 1;
        self.state = HoverState::Loading(region.to_string());
        tracing::debug!(
            target: "kommun::hover",
            region,
            indicator = %indicator.id,
            ticket = self.ticket,
            "history.requested"
        );
        HoverTransition::Entered(Some(HistoryRequest {
            ticket: self.ticket,
            indicator_id: indicator.id.clone(),
            region: region.to_string(),
            region_name: region_name.to_string(),
        }))
    }

    /// Accept a history response if it is for the fetch still in progress.
    pub fn complete(
        &mut self,
        request: &HistoryRequest,
        result: Result<Vec<HistoryPoint>, DataError>,
    ) -> Option<HistorySeries> {
        let current = request.ticket == self.ticket
            && matches!(&self.state, HoverState::Loading(region) if *region == request.region);
        if !current {
            tracing::debug!(
                target: "kommun::hover",
                region = %request.region,
                ticket = request.ticket,
                "history.discarded=stale"
            );
            return None;
        }

        self.state = HoverState::Loaded(request.region.clone());
        match result {
            Ok(points) => Some(HistorySeries::new(
                request.region.clone(),
                request.region_name.clone(),
                points,
            )),
            Err(err) => {
                tracing::warn!(
                    target: "kommun::hover",
                    region = %request.region,
                    error = %err,
                    "history.fetch_failed"
                );
                None
            }
        }
    }

    /// Back to idle. Returns true when a fetch was still outstanding.
    pub fn leave(&mut self) -> bool {
        let pending = matches!(self.state, HoverState::Loading(_));
        self.state = HoverState::Idle;
        pending
    }
}
