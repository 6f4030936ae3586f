use super::price_scale::PriceScale;
use super::time_scale::TimeScale;
use crate::domain::market_data::DataPoint;
use serde::{Deserialize, Serialize};

/// A point in chart space: UTC seconds and price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainPoint {
    pub time: f64,
    pub price: f64,
}

impl DomainPoint {
    pub fn new(time: f64, price: f64) -> Self {
        Self { time, price }
    }
}

/// A point in pane-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Converts between domain and pixel space for one pane.
///
/// Time resolves to a fractional bar index against `reference`; outside the
/// loaded bars the edge step extrapolates linearly. Holds borrows only, so
/// build one per interaction.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper<'a> {
    reference: &'a [DataPoint],
    nominal_step: f64,
    time_scale: &'a TimeScale,
    price_scale: Option<&'a PriceScale>,
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(
        reference: &'a [DataPoint],
        nominal_step: f64,
        time_scale: &'a TimeScale,
        price_scale: Option<&'a PriceScale>,
    ) -> Self {
        Self { reference, nominal_step, time_scale, price_scale }
    }

    pub fn time_scale(&self) -> &TimeScale {
        self.time_scale
    }

    pub fn price_scale(&self) -> Option<&PriceScale> {
        self.price_scale
    }

    fn has_step(&self) -> bool {
        self.nominal_step.is_finite() && self.nominal_step > 0.0
    }

    fn time_at(&self, index: usize) -> f64 {
        self.reference[index].time.as_f64()
    }

    fn step_or_nominal(&self, step: f64) -> f64 {
        if step.is_finite() && step > 0.0 { step } else { self.nominal_step }
    }

    fn first_step(&self) -> f64 {
        if self.reference.len() < 2 {
            return self.nominal_step;
        }
        self.step_or_nominal(self.time_at(1) - self.time_at(0))
    }

    fn last_step(&self) -> f64 {
        let n = self.reference.len();
        if n < 2 {
            return self.nominal_step;
        }
        self.step_or_nominal(self.time_at(n - 1) - self.time_at(n - 2))
    }

    /// Fractional bar index of `time`. `None` without reference data.
    pub fn time_to_logical(&self, time: f64) -> Option<f64> {
        let n = self.reference.len();
        if n == 0 || !time.is_finite() || !self.has_step() {
            return None;
        }
        let first = self.time_at(0);
        let last = self.time_at(n - 1);
        if time <= first {
            return Some((time - first) / self.first_step());
        }
        if time >= last {
            return Some((n - 1) as f64 + (time - last) / self.last_step());
        }
        let upper = self.reference.partition_point(|point| point.time.as_f64() <= time);
        let lower = upper - 1;
        let (t0, t1) = (self.time_at(lower), self.time_at(upper));
        let fraction = if t1 > t0 { (time - t0) / (t1 - t0) } else { 0.0 };
        Some(lower as f64 + fraction)
    }

    /// Time at a fractional bar index, extrapolating past either edge.
    pub fn logical_to_time(&self, index: f64) -> Option<f64> {
        let n = self.reference.len();
        if n == 0 || !index.is_finite() || !self.has_step() {
            return None;
        }
        let last_index = (n - 1) as f64;
        if index <= 0.0 {
            return Some(self.time_at(0) + index * self.first_step());
        }
        if index >= last_index {
            return Some(self.time_at(n - 1) + (index - last_index) * self.last_step());
        }
        let lower = index.floor() as usize;
        let fraction = index - lower as f64;
        let (t0, t1) = (self.time_at(lower), self.time_at(lower + 1));
        Some(t0 + fraction * (t1 - t0))
    }

    pub fn time_to_x(&self, time: f64) -> Option<f64> {
        self.time_to_logical(time).map(|index| self.time_scale.logical_to_x(index))
    }

    pub fn x_to_time(&self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        self.logical_to_time(self.time_scale.x_to_logical(x))
    }

    pub fn price_to_y(&self, price: f64) -> Option<f64> {
        self.price_scale?.price_to_y(price)
    }

    pub fn y_to_price(&self, y: f64) -> Option<f64> {
        self.price_scale?.y_to_price(y)
    }

    /// `None` means "currently unrenderable".
    pub fn domain_to_pixel(&self, point: DomainPoint) -> Option<PixelPoint> {
        let x = self.time_to_x(point.time)?;
        let y = self.price_to_y(point.price)?;
        Some(PixelPoint::new(x, y))
    }

    pub fn pixel_to_domain(&self, pixel: PixelPoint) -> Option<DomainPoint> {
        let time = self.x_to_time(pixel.x)?;
        let price = self.y_to_price(pixel.y)?;
        Some(DomainPoint::new(time, price))
    }

    /// Moves `point` rigidly by whole bars and by `dy` pixels.
    pub fn shift(&self, point: DomainPoint, bars: f64, dy: f64) -> Option<DomainPoint> {
        let index = self.time_to_logical(point.time)?;
        let time = self.logical_to_time(index + bars)?;
        let price = self.price_scale?.shift_price(point.price, dy)?;
        Some(DomainPoint::new(time, price))
    }
}
