use crate::domain::coordinates::TimeScale;
use crate::domain::drawing::HitTolerance;
use crate::domain::errors::DataError;
use crate::domain::market_data::TimeInterval;
use serde::{Deserialize, Serialize};

/// Runtime settings of one chart. Every field has a default, so the host
/// may pass a partial JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Data service root, without the trailing `/data`.
    pub base_url: String,
    pub timeframe: TimeInterval,
    /// Rows requested on the first load of a series.
    pub history_limit: usize,
    pub poll_interval_ms: u32,
    /// Rows requested per backfill page.
    pub backfill_page: usize,
    /// Backfill starts when the visible range reaches this many bars from
    /// the earliest loaded bar.
    pub backfill_threshold_bars: f64,
    pub hit_tolerance: HitTolerance,
    pub width_px: f64,
    pub height_px: f64,
    pub bar_spacing: f64,
    pub min_bar_spacing: f64,
    pub max_bar_spacing: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api/v1".to_string(),
            timeframe: TimeInterval::default(),
            history_limit: 1000,
            poll_interval_ms: 5000,
            backfill_page: 200,
            backfill_threshold_bars: 10.0,
            hit_tolerance: HitTolerance::default(),
            width_px: 800.0,
            height_px: 600.0,
            bar_spacing: 6.0,
            min_bar_spacing: 0.5,
            max_bar_spacing: 50.0,
        }
    }
}

impl ChartConfig {
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let config: Self = serde_json::from_str(json).map_err(|e| DataError::InvalidJson(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.poll_interval_ms == 0 {
            return Err(DataError::InvalidConfig("poll_interval_ms must be positive".to_string()));
        }
        if self.backfill_page == 0 || self.history_limit == 0 {
            return Err(DataError::InvalidConfig("page sizes must be positive".to_string()));
        }
        if !(self.min_bar_spacing > 0.0 && self.min_bar_spacing <= self.max_bar_spacing) {
            return Err(DataError::InvalidConfig(format!(
                "bar spacing bounds {}..{} are invalid",
                self.min_bar_spacing, self.max_bar_spacing
            )));
        }
        if !(self.width_px > 0.0 && self.height_px > 0.0) {
            return Err(DataError::InvalidConfig("chart size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn time_scale(&self) -> TimeScale {
        TimeScale::new(self.width_px, self.bar_spacing, self.min_bar_spacing, self.max_bar_spacing)
    }
}
