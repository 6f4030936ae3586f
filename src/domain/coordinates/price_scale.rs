use crate::domain::chart::value_objects::{ScaleMode, ScaleOptions};
use serde::{Deserialize, Serialize};

/// Vertical axis of one scale binding inside one pane.
///
/// `min`/`max` bound the visible price range; margins shrink the drawable
/// band from the top and bottom edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceScale {
    pub min: f64,
    pub max: f64,
    pub height_px: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub mode: ScaleMode,
}

impl PriceScale {
    pub fn new(min: f64, max: f64, height_px: f64, options: &ScaleOptions) -> Self {
        Self {
            min,
            max,
            height_px,
            margin_top: options.margin_top,
            margin_bottom: options.margin_bottom,
            mode: options.mode,
        }
    }

    /// Fits the range to the given `(low, high)` extents. Log mode ignores
    /// non-positive values. A flat range is widened by 1% on each side.
    pub fn autoscale<I>(extents: I, height_px: f64, options: &ScaleOptions) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let log = options.mode == ScaleMode::Logarithmic;
        let (low, high) = extents
            .into_iter()
            .filter(|(low, high)| low.is_finite() && high.is_finite())
            .filter(|(low, _)| !log || *low > 0.0)
            .fold(None, |acc: Option<(f64, f64)>, (low, high)| match acc {
                None => Some((low, high)),
                Some((lo, hi)) => Some((lo.min(low), hi.max(high))),
            })?;
        let (low, high) = if high > low {
            (low, high)
        } else {
            let pad = (low.abs() * 0.01).max(f64::EPSILON);
            let bottom = if log { low * 0.99 } else { low - pad };
            (bottom, high + pad)
        };
        Some(Self::new(low, high, height_px, options))
    }

    fn band(&self) -> (f64, f64) {
        let top = self.height_px * self.margin_top;
        let bottom = self.height_px * (1.0 - self.margin_bottom);
        (top, bottom)
    }

    fn to_internal(&self, price: f64) -> Option<f64> {
        match self.mode {
            ScaleMode::Linear => price.is_finite().then_some(price),
            ScaleMode::Logarithmic => (price.is_finite() && price > 0.0).then(|| price.ln()),
        }
    }

    fn from_internal(&self, value: f64) -> f64 {
        match self.mode {
            ScaleMode::Linear => value,
            ScaleMode::Logarithmic => value.exp(),
        }
    }

    fn internal_range(&self) -> Option<(f64, f64)> {
        let low = self.to_internal(self.min)?;
        let high = self.to_internal(self.max)?;
        (high > low).then_some((low, high))
    }

    /// `None` when the price cannot be projected (non-positive in log mode,
    /// non-finite, or a degenerate scale).
    pub fn price_to_y(&self, price: f64) -> Option<f64> {
        let (low, high) = self.internal_range()?;
        let value = self.to_internal(price)?;
        let (top, bottom) = self.band();
        let y = top + (high - value) / (high - low) * (bottom - top);
        y.is_finite().then_some(y)
    }

    pub fn y_to_price(&self, y: f64) -> Option<f64> {
        if !y.is_finite() {
            return None;
        }
        let (low, high) = self.internal_range()?;
        let (top, bottom) = self.band();
        if bottom <= top {
            return None;
        }
        let value = high - (y - top) / (bottom - top) * (high - low);
        let price = self.from_internal(value);
        price.is_finite().then_some(price)
    }

    /// Price change of one pixel at the middle of the band.
    pub fn price_per_pixel(&self) -> Option<f64> {
        let (top, bottom) = self.band();
        let mid = (top + bottom) / 2.0;
        let upper = self.y_to_price(mid - 0.5)?;
        let lower = self.y_to_price(mid + 0.5)?;
        let step = upper - lower;
        (step.is_finite() && step > 0.0).then_some(step)
    }

    /// Price reached by moving `price` by `dy` pixels. Falls back to the
    /// linear price-per-pixel reference when the price is off the scale.
    pub fn shift_price(&self, price: f64, dy: f64) -> Option<f64> {
        if let Some(moved) = self.price_to_y(price).and_then(|y| self.y_to_price(y + dy)) {
            return Some(moved);
        }
        let shifted = price - dy * self.price_per_pixel()?;
        shifted.is_finite().then_some(shifted)
    }
}
