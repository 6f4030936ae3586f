use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{AsRefStr, EnumIter, EnumString};

/// Time key of a single bar.
///
/// Either a UTC timestamp in seconds or a calendar business day. Ordering is
/// chronological across both forms: a business day sorts as midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeKey {
    Timestamp(i64),
    BusinessDay(BusinessDay),
}

/// Calendar day that has been checked to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawBusinessDay", into = "RawBusinessDay")]
pub struct BusinessDay(NaiveDate);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawBusinessDay {
    year: i32,
    month: u32,
    day: u32,
}

impl TryFrom<RawBusinessDay> for BusinessDay {
    type Error = String;

    fn try_from(raw: RawBusinessDay) -> Result<Self, Self::Error> {
        BusinessDay::new(raw.year, raw.month, raw.day)
            .ok_or_else(|| format!("{}-{}-{} is not a calendar date", raw.year, raw.month, raw.day))
    }
}

impl From<BusinessDay> for RawBusinessDay {
    fn from(day: BusinessDay) -> Self {
        Self { year: day.0.year(), month: day.0.month(), day: day.0.day() }
    }
}

impl BusinessDay {
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `y * 10000 + m * 100 + d`, the composite key used to order calendar days.
    pub fn composite_key(&self) -> i64 {
        self.0.year() as i64 * 10_000 + self.0.month() as i64 * 100 + self.0.day() as i64
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or_default()
    }
}

impl TimeKey {
    pub fn business_day(year: i32, month: u32, day: u32) -> Option<Self> {
        BusinessDay::new(year, month, day).map(TimeKey::BusinessDay)
    }

    /// Projection onto UTC seconds used by the coordinate math.
    pub fn unix_seconds(&self) -> i64 {
        match self {
            TimeKey::Timestamp(seconds) => *seconds,
            TimeKey::BusinessDay(day) => day.unix_seconds(),
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.unix_seconds() as f64
    }

    /// Calendar time in UTC; a business day is its midnight.
    pub fn date_time(&self) -> Option<NaiveDateTime> {
        match self {
            TimeKey::Timestamp(seconds) => DateTime::from_timestamp(*seconds, 0).map(|dt| dt.naive_utc()),
            TimeKey::BusinessDay(day) => day.date().and_hms_opt(0, 0, 0),
        }
    }

    fn form_rank(&self) -> u8 {
        match self {
            TimeKey::Timestamp(_) => 0,
            TimeKey::BusinessDay(_) => 1,
        }
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TimeKey::BusinessDay(a), TimeKey::BusinessDay(b)) => {
                a.composite_key().cmp(&b.composite_key())
            }
            _ => self
                .unix_seconds()
                .cmp(&other.unix_seconds())
                .then_with(|| self.form_rank().cmp(&other.form_rank())),
        }
    }
}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for TimeKey {
    fn from(seconds: i64) -> Self {
        TimeKey::Timestamp(seconds)
    }
}

/// Trading symbol as the data service knows it, e.g. `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct Symbol(String);

impl Symbol {
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.trim().to_uppercase())
    }
}

/// What a series was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SeriesSource {
    Ticker(Symbol),
    /// Arithmetic over tickers, resolved by the data service.
    Formula(String),
    /// Output of a computation over another series, e.g. an indicator or an
    /// equity curve.
    Derived(String),
}

impl SeriesSource {
    /// Tickers with spaces or parentheses are treated as formulas.
    pub fn parse(expression: &str) -> Self {
        let expression = expression.trim();
        if expression.contains(' ') || expression.contains('(') || expression.contains(')') {
            SeriesSource::Formula(expression.to_string())
        } else {
            SeriesSource::Ticker(Symbol::from(expression))
        }
    }

    /// The string sent to the data service, if this source is fetchable.
    pub fn query_value(&self) -> Option<&str> {
        match self {
            SeriesSource::Ticker(symbol) => Some(symbol.value()),
            SeriesSource::Formula(formula) => Some(formula),
            SeriesSource::Derived(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SeriesSource::Ticker(symbol) => symbol.value(),
            SeriesSource::Formula(text) | SeriesSource::Derived(text) => text,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
pub enum TimeInterval {
    #[strum(serialize = "1m")]
    #[serde(rename = "1m")]
    OneMinute,

    #[strum(serialize = "5m")]
    #[serde(rename = "5m")]
    FiveMinutes,

    #[strum(serialize = "15m")]
    #[serde(rename = "15m")]
    FifteenMinutes,

    #[strum(serialize = "30m")]
    #[serde(rename = "30m")]
    ThirtyMinutes,

    #[strum(serialize = "1h")]
    #[serde(rename = "1h")]
    OneHour,

    #[strum(serialize = "4h")]
    #[serde(rename = "4h")]
    FourHours,

    #[default]
    #[strum(serialize = "1d")]
    #[serde(rename = "1d")]
    OneDay,

    #[strum(serialize = "1w")]
    #[serde(rename = "1w")]
    OneWeek,

    #[strum(serialize = "1M")]
    #[serde(rename = "1M")]
    OneMonth,
}

impl TimeInterval {
    pub fn duration_secs(&self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::FiveMinutes => 5 * 60,
            Self::FifteenMinutes => 15 * 60,
            Self::ThirtyMinutes => 30 * 60,
            Self::OneHour => 60 * 60,
            Self::FourHours => 4 * 60 * 60,
            Self::OneDay => 24 * 60 * 60,
            Self::OneWeek => 7 * 24 * 60 * 60,
            // nominal
            Self::OneMonth => 30 * 24 * 60 * 60,
        }
    }
}
