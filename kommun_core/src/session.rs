//! Indicator selection state machine.
//!
//! The session never performs I/O itself. Selection methods hand back a
//! request stamped with a generation; the caller fetches and passes the
//! result to the matching `complete_*` method, which drops it when a newer
//! selection has been made in the meantime.

use std::collections::HashMap;

use kommun_proto::{KpiSummary, MunicipalityRecord, RegionId};

use crate::buckets::{Breakpoints, SortDirection};
use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub id: String,
    pub title: String,
    pub group_title: String,
}

impl Indicator {
    pub fn label(&self) -> String {
        format!("{} ({})", self.title, self.group_title)
    }
}

impl From<KpiSummary> for Indicator {
    fn from(summary: KpiSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            group_title: summary.group_title,
        }
    }
}

/// Region id to indicator value for one (indicator, year).
///
/// Regions without a value are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap(HashMap<RegionId, f64>);

impl ValueMap {
    /// Keeps each record's total value; records without one are skipped.
    pub fn from_records(records: &[MunicipalityRecord]) -> Self {
        records
            .iter()
            .filter_map(|record| Some((record.municipality.clone(), record.total_value()?)))
            .collect()
    }

    pub fn get(&self, region: &str) -> Option<f64> {
        self.0.get(region).copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(RegionId, f64)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (RegionId, f64)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .filter(|(_, value)| value.is_finite())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    IndicatorSelected,
    YearSelected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearsRequest {
    pub generation: u64,
    pub indicator_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesRequest {
    pub generation: u64,
    pub indicator_id: String,
    pub year: String,
}

#[derive(Debug, Clone)]
pub struct IndicatorSession {
    phase: SessionPhase,
    indicator: Option<Indicator>,
    years: Vec<String>,
    year: Option<String>,
    default_year: Option<String>,
    values: ValueMap,
    breakpoints: Breakpoints,
    direction: SortDirection,
    indicator_generation: u64,
    values_generation: u64,
    in_flight: usize,
}

impl IndicatorSession {
    pub fn new(direction: SortDirection, default_year: Option<String>) -> Self {
        Self {
            phase: SessionPhase::Idle,
            indicator: None,
            years: Vec::new(),
            year: None,
            default_year,
            values: ValueMap::default(),
            breakpoints: Breakpoints::default(),
            direction,
            indicator_generation: 0,
            values_generation: 0,
            in_flight: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn indicator(&self) -> Option<&Indicator> {
        self.indicator.as_ref()
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// True while any issued request has not completed.
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Switch indicator. Pending requests for the previous selection become
    /// stale; the chosen year is kept so it can be restored once the new
    /// year list arrives.
    pub fn select_indicator(&mut self, indicator: Indicator) -> YearsRequest {
        self.indicator_generation += 1;
        self.values_generation += 1;
        self.in_flight += 1;
        self.phase = SessionPhase::IndicatorSelected;
        self.years.clear();
        self.clear_values();

        tracing::info!(
            target: "kommun::session",
            indicator = %indicator.id,
            generation = self.indicator_generation,
            "indicator.selected"
        );
        let request = YearsRequest {
            generation: self.indicator_generation,
            indicator_id: indicator.id.clone(),
        };
        self.indicator = Some(indicator);
        request
    }

    /// Store the year list and pick a year: the previously chosen one if it
    /// is still offered, else the default year if offered.
    pub fn complete_years(
        &mut self,
        request: &YearsRequest,
        result: Result<Vec<String>, DataError>,
    ) -> Option<ValuesRequest> {
        self.settle();
        if request.generation != self.indicator_generation {
            tracing::debug!(
                target: "kommun::session",
                indicator = %request.indicator_id,
                generation = request.generation,
                "years.discarded=stale"
            );
            return None;
        }

        let years = match result {
            Ok(years) => years,
            Err(err) => {
                tracing::warn!(
                    target: "kommun::session",
                    indicator = %request.indicator_id,
                    error = %err,
                    "years.fetch_failed"
                );
                return None;
            }
        };
        self.years = years;

        let offered = |year: &Option<String>| {
            year.as_ref()
                .filter(|year| self.years.iter().any(|candidate| candidate == *year))
                .cloned()
        };
        let next = offered(&self.year).or_else(|| offered(&self.default_year));
        if next.is_none() {
            self.year = None;
            return None;
        }
        self.select_year(next)
    }

    /// Choose a year for the current indicator; `None` clears the map.
    pub fn select_year(&mut self, year: Option<String>) -> Option<ValuesRequest> {
        let indicator_id = match &self.indicator {
            Some(indicator) => indicator.id.clone(),
            None => {
                tracing::warn!(target: "kommun::session", "year.ignored=no_indicator");
                return None;
            }
        };

        self.values_generation += 1;
        let Some(year) = year else {
            self.year = None;
            self.phase = SessionPhase::IndicatorSelected;
            self.clear_values();
            return None;
        };

        self.in_flight += 1;
        self.year = Some(year.clone());
        tracing::info!(
            target: "kommun::session",
            indicator = %indicator_id,
            %year,
            generation = self.values_generation,
            "year.selected"
        );
        Some(ValuesRequest {
            generation: self.values_generation,
            indicator_id,
            year,
        })
    }

    /// Rebuild the value map from a values response. Returns true when the
    /// map was replaced and the layer needs redrawing.
    pub fn complete_values(
        &mut self,
        request: &ValuesRequest,
        result: Result<Vec<MunicipalityRecord>, DataError>,
    ) -> bool {
        self.settle();
        if request.generation != self.values_generation {
            tracing::debug!(
                target: "kommun::session",
                indicator = %request.indicator_id,
                year = %request.year,
                generation = request.generation,
                "values.discarded=stale"
            );
            return false;
        }

        match result {
            Ok(records) => {
                self.values = ValueMap::from_records(&records);
                self.breakpoints = Breakpoints::compute(self.values.values());
                self.phase = SessionPhase::YearSelected;
                tracing::info!(
                    target: "kommun::session",
                    indicator = %request.indicator_id,
                    year = %request.year,
                    records = records.len(),
                    regions = self.values.len(),
                    "values.applied"
                );
                true
            }
            Err(err) => {
                tracing::warn!(
                    target: "kommun::session",
                    indicator = %request.indicator_id,
                    year = %request.year,
                    error = %err,
                    "values.fetch_failed"
                );
                false
            }
        }
    }

    /// Flip the color direction. Returns true when there is data to redraw.
    pub fn toggle_direction(&mut self) -> bool {
        self.direction = self.direction.toggled();
        tracing::info!(
            target: "kommun::session",
            direction = self.direction.label(),
            "direction.toggled"
        );
        !self.values.is_empty()
    }

    fn clear_values(&mut self) {
        self.values = ValueMap::default();
        self.breakpoints = Breakpoints::default();
    }

    fn settle(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}
