use super::value_objects::{BusinessDay, TimeKey};
use serde::{Deserialize, Deserializer, Serialize};

/// A number as upstream rows carry it: JSON number or numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Finite value or nothing.
    pub fn finite(&self) -> Option<f64> {
        let value = match self {
            RawNumber::Number(value) => *value,
            RawNumber::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

/// Upstream time field: seconds, `{year, month, day}` or `"yyyy-mm-dd"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Seconds(f64),
    Day { year: i32, month: u32, day: u32 },
    Text(String),
}

impl RawTime {
    pub fn to_key(&self) -> Option<TimeKey> {
        match self {
            RawTime::Seconds(seconds) if seconds.is_finite() => {
                Some(TimeKey::Timestamp(seconds.trunc() as i64))
            }
            RawTime::Seconds(_) => None,
            RawTime::Day { year, month, day } => TimeKey::business_day(*year, *month, *day),
            RawTime::Text(text) => {
                let mut parts = text.trim().splitn(3, '-');
                let year = parts.next()?.parse().ok()?;
                let month = parts.next()?.parse().ok()?;
                let day = parts.next()?.parse().ok()?;
                BusinessDay::new(year, month, day).map(TimeKey::BusinessDay)
            }
        }
    }
}

impl From<i64> for RawTime {
    fn from(seconds: i64) -> Self {
        RawTime::Seconds(seconds as f64)
    }
}

/// Field that may be absent, `null` or set. Absent is `None`, `null` is
/// `Some(None)`.
pub type RawField<T> = Option<Option<T>>;

fn present<'de, D, T>(deserializer: D) -> Result<RawField<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// One row exactly as it arrived. Nothing in it is trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    pub time: Option<RawTime>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub open: RawField<RawNumber>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub high: RawField<RawNumber>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub low: RawField<RawNumber>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub close: RawField<RawNumber>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: RawField<RawNumber>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub volume: RawField<RawNumber>,
    /// Per-plot values of a multi-plot series.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub values: RawField<Vec<Option<RawNumber>>>,
}

fn finite(field: &RawField<RawNumber>) -> Option<f64> {
    field.as_ref()?.as_ref()?.finite()
}

impl RawPoint {
    pub fn ohlc(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time: Some(time.into()),
            open: Some(Some(open.into())),
            high: Some(Some(high.into())),
            low: Some(Some(low.into())),
            close: Some(Some(close.into())),
            ..Self::default()
        }
    }

    pub fn value(time: i64, value: f64) -> Self {
        Self { time: Some(time.into()), value: Some(Some(value.into())), ..Self::default() }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(Some(volume.into()));
        self
    }

    /// A field that is present, even as `null`, claims the row's shape.
    fn has_ohlc_fields(&self) -> bool {
        self.open.is_some() || self.high.is_some() || self.low.is_some() || self.close.is_some()
    }

    /// Turns the row into a point, or `None` when it is malformed.
    ///
    /// The first present field family decides the kind: OHLC, then value,
    /// then multi-plot values, then volume. A family that is present but
    /// `null` still decides the kind, so the row is rejected rather than
    /// read as a later family. A row with none of them is rejected.
    pub fn validate(&self) -> Option<DataPoint> {
        let time = self.time.as_ref()?.to_key()?;

        let value = if self.has_ohlc_fields() {
            PointValue::Ohlc(Ohlc {
                open: finite(&self.open)?,
                high: finite(&self.high)?,
                low: finite(&self.low)?,
                close: finite(&self.close)?,
                volume: finite(&self.volume),
            })
        } else if self.value.is_some() {
            PointValue::Value { value: finite(&self.value)? }
        } else if let Some(values) = &self.values {
            let plots = values
                .as_ref()?
                .iter()
                .map(|plot| plot.as_ref().and_then(RawNumber::finite))
                .collect::<Option<Vec<_>>>()?;
            if plots.is_empty() {
                return None;
            }
            PointValue::Plots { values: plots }
        } else if self.volume.is_some() {
            PointValue::Volume { volume: finite(&self.volume)? }
        } else {
            return None;
        };

        Some(DataPoint { time, value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// Payload of a validated point. Every number in here is finite.
///
/// Serialized flat next to `time`, in the row shape the renderer expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Ohlc(Ohlc),
    Value { value: f64 },
    Plots { values: Vec<f64> },
    Volume { volume: f64 },
    /// Placeholder keeping an overlay on the primary timeline.
    Whitespace {},
}

/// A validated, renderable point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub time: TimeKey,
    #[serde(flatten)]
    pub value: PointValue,
}

impl DataPoint {
    pub fn ohlc(time: impl Into<TimeKey>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time: time.into(),
            value: PointValue::Ohlc(Ohlc { open, high, low, close, volume: None }),
        }
    }

    pub fn value(time: impl Into<TimeKey>, value: f64) -> Self {
        Self { time: time.into(), value: PointValue::Value { value } }
    }

    pub fn whitespace(time: TimeKey) -> Self {
        Self { time, value: PointValue::Whitespace {} }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self.value, PointValue::Whitespace {})
    }

    /// Representative price used for markers and autoscale.
    pub fn close(&self) -> Option<f64> {
        match &self.value {
            PointValue::Ohlc(ohlc) => Some(ohlc.close),
            PointValue::Value { value } | PointValue::Volume { volume: value } => Some(*value),
            PointValue::Plots { values } => values.first().copied(),
            PointValue::Whitespace {} => None,
        }
    }

    /// Lowest and highest value the point spans.
    pub fn extent(&self) -> Option<(f64, f64)> {
        match &self.value {
            PointValue::Ohlc(ohlc) => Some((
                ohlc.low.min(ohlc.open).min(ohlc.close),
                ohlc.high.max(ohlc.open).max(ohlc.close),
            )),
            PointValue::Value { value } | PointValue::Volume { volume: value } => Some((*value, *value)),
            PointValue::Plots { values } => values.iter().fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            }),
            PointValue::Whitespace {} => None,
        }
    }
}

/// Anything the reconciler can validate into a point.
pub trait Candidate {
    fn validated(&self) -> Option<DataPoint>;
}

impl Candidate for RawPoint {
    fn validated(&self) -> Option<DataPoint> {
        self.validate()
    }
}

impl Candidate for DataPoint {
    fn validated(&self) -> Option<DataPoint> {
        Some(self.clone())
    }
}
