//! Percentile bucketing for the choropleth.
//!
//! Values are split at their first eight deciles using nearest rank (see
//! [`Breakpoints::compute`]), and each value is assigned the first bucket
//! whose breakpoint it does not exceed.

use serde::Deserialize;

use crate::color::Rgb;

/// Number of thresholds and number of colored buckets.
pub const BUCKET_COUNT: usize = 8;

/// Which end of the scale is painted green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Bucket 0 is red, the top bucket green.
    #[default]
    HighIsGood,
    /// Palette reversed: bucket 0 is green.
    LowIsGood,
}

impl SortDirection {
    pub fn from_high_is_good(high_is_good: bool) -> Self {
        if high_is_good {
            SortDirection::HighIsGood
        } else {
            SortDirection::LowIsGood
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::HighIsGood => SortDirection::LowIsGood,
            SortDirection::LowIsGood => SortDirection::HighIsGood,
        }
    }

    /// Palette slot for a bucket; a pure function of the flag and the index.
    pub fn palette_index(self, bucket: usize) -> usize {
        let bucket = bucket.min(BUCKET_COUNT - 1);
        match self {
            SortDirection::HighIsGood => bucket,
            SortDirection::LowIsGood => BUCKET_COUNT - 1 - bucket,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortDirection::HighIsGood => "High is Good",
            SortDirection::LowIsGood => "Low is Good",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    NoData,
    Bucket(usize),
}

impl Classification {
    pub fn bucket(self) -> Option<usize> {
        match self {
            Classification::NoData => None,
            Classification::Bucket(index) => Some(index),
        }
    }
}

/// Decile thresholds of the current value set.
///
/// Either empty (no values) or exactly [`BUCKET_COUNT`] non-decreasing
/// thresholds. The minimum and maximum are kept for the legend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Breakpoints {
    thresholds: Vec<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl Breakpoints {
    /// Nearest-rank deciles: `sorted[floor(len * i / 10)]` for `i` in `1..=8`.
    ///
    /// Non-finite inputs are ignored. Small inputs repeat indices, so
    /// thresholds may be duplicated; the count stays fixed.
    ///
    /// The index is exact integer arithmetic. Computing `len * (i / 10)` in
    /// floating point instead lands one rank lower for some sizes (90 values,
    /// `i = 7` gives 62 rather than 63).
    pub fn compute<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_by(f64::total_cmp);

        let len = sorted.len();
        let thresholds = (1..=BUCKET_COUNT)
            .map(|i| sorted[(len * i / 10).min(len - 1)])
            .collect();

        Self {
            thresholds,
            min: sorted.first().copied(),
            max: sorted.last().copied(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// First bucket whose threshold is `>= value`; above all thresholds goes
    /// to the top bucket. Missing values, NaN and empty breakpoints are
    /// [`Classification::NoData`].
    pub fn classify(&self, value: Option<f64>) -> Classification {
        let Some(value) = value.filter(|v| !v.is_nan()) else {
            return Classification::NoData;
        };
        if self.is_empty() {
            return Classification::NoData;
        }
        let bucket = self
            .thresholds
            .iter()
            .position(|threshold| value <= *threshold)
            .unwrap_or(BUCKET_COUNT - 1);
        Classification::Bucket(bucket)
    }
}

/// Eight bucket colors ordered red to green plus the no-data color.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub buckets: [Rgb; BUCKET_COUNT],
    pub no_data: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            buckets: [
                Rgb::new(0xd7, 0x30, 0x27),
                Rgb::new(0xf4, 0x6d, 0x43),
                Rgb::new(0xfd, 0xae, 0x61),
                Rgb::new(0xfe, 0xe0, 0x8b),
                Rgb::new(0xd9, 0xef, 0x8b),
                Rgb::new(0xa6, 0xd9, 0x6a),
                Rgb::new(0x66, 0xbd, 0x63),
                Rgb::new(0x1a, 0x98, 0x50),
            ],
            no_data: Rgb::new(0xcc, 0xcc, 0xcc),
        }
    }
}

impl Palette {
    pub fn color_for(&self, classification: Classification, direction: SortDirection) -> Rgb {
        match classification {
            Classification::NoData => self.no_data,
            Classification::Bucket(bucket) => self.buckets[direction.palette_index(bucket)],
        }
    }

    /// Classify and color in one step.
    pub fn color_of(
        &self,
        value: Option<f64>,
        breakpoints: &Breakpoints,
        direction: SortDirection,
    ) -> Rgb {
        self.color_for(breakpoints.classify(value), direction)
    }
}
