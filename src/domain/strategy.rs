//! Strategy backtest seam. The engine itself is external; the chart only
//! turns its output into markers and an equity series.

use crate::domain::market_data::{DataPoint, TimeKey};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[strum(serialize = ">")]
    #[serde(rename = ">")]
    Greater,
    #[strum(serialize = "<")]
    #[serde(rename = "<")]
    Less,
    #[strum(serialize = ">=")]
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[strum(serialize = "<=")]
    #[serde(rename = "<=")]
    LessOrEqual,
    #[strum(serialize = "=")]
    #[serde(rename = "=")]
    Equal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "compare_type", rename_all = "snake_case")]
pub enum CompareTarget {
    Indicator { name: String, period: Option<u32> },
    Value { value: f64 },
    Pair { pair: String },
}

/// One rule of a strategy. Passed through to the engine untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub pair: String,
    pub operator: ComparisonOperator,
    #[serde(flatten)]
    pub compare: CompareTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub buy_conditions: Vec<Condition>,
    pub sell_conditions: Vec<Condition>,
    pub initial_capital: f64,
    /// Fraction per trade, e.g. `0.001`.
    pub commission: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub time: TimeKey,
    #[serde(rename = "type")]
    pub side: SignalSide,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: TimeKey,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub signals: Vec<Signal>,
    pub equity: Vec<EquityPoint>,
}

pub trait BacktestEngine {
    fn run(&self, primary: &[DataPoint], strategy: &StrategyDefinition) -> BacktestReport;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerPosition {
    BelowBar,
    AboveBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
}

/// Marker drawn on a series at a bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMarker {
    pub time: TimeKey,
    pub position: MarkerPosition,
    pub shape: MarkerShape,
    pub color: String,
    pub text: String,
    pub price: f64,
}

impl From<&Signal> for SeriesMarker {
    fn from(signal: &Signal) -> Self {
        match signal.side {
            SignalSide::Buy => Self {
                time: signal.time,
                position: MarkerPosition::BelowBar,
                shape: MarkerShape::ArrowUp,
                color: "#26a69a".to_string(),
                text: "B".to_string(),
                price: signal.price,
            },
            SignalSide::Sell => Self {
                time: signal.time,
                position: MarkerPosition::AboveBar,
                shape: MarkerShape::ArrowDown,
                color: "#ef5350".to_string(),
                text: "S".to_string(),
                price: signal.price,
            },
        }
    }
}

impl BacktestReport {
    /// Markers in time order; signals with a non-finite price are skipped.
    pub fn markers(&self) -> Vec<SeriesMarker> {
        let mut markers: Vec<SeriesMarker> = self
            .signals
            .iter()
            .filter(|signal| signal.price.is_finite())
            .map(SeriesMarker::from)
            .collect();
        markers.sort_by(|a, b| a.time.cmp(&b.time));
        markers
    }

    /// Equity curve as line points, deduped and ordered.
    pub fn equity_points(&self) -> Vec<DataPoint> {
        let points: Vec<DataPoint> = self
            .equity
            .iter()
            .filter(|point| point.value.is_finite())
            .map(|point| DataPoint::value(point.time, point.value))
            .collect();
        crate::domain::market_data::SeriesReconciler::merge(&points, &[] as &[DataPoint]).points
    }
}
