use crate::domain::market_data::TimeKey;
use chrono::{Datelike, Duration, Months, NaiveDate};
use strum::{AsRefStr, EnumIter, EnumString};

/// Quick ranges of the bottom time bar. Each one ends at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
pub enum RangePreset {
    #[strum(serialize = "1d")]
    OneDay,
    #[strum(serialize = "5d")]
    FiveDays,
    #[strum(serialize = "1m")]
    OneMonth,
    #[strum(serialize = "3m")]
    ThreeMonths,
    #[strum(serialize = "6m")]
    SixMonths,
    #[strum(serialize = "ytd")]
    YearToDate,
    #[strum(serialize = "1y")]
    OneYear,
    #[strum(serialize = "5y")]
    FiveYears,
    #[strum(serialize = "all")]
    All,
}

impl RangePreset {
    /// Case-insensitive, so `1M` and `1m` both mean one month.
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().to_ascii_lowercase().parse().ok()
    }

    /// First UTC second of the span ending at `latest`. `None` for `All`
    /// and for times chrono cannot represent.
    pub fn start(&self, latest: TimeKey) -> Option<i64> {
        let end = latest.date_time()?;
        let start = match self {
            RangePreset::OneDay => end.checked_sub_signed(Duration::days(1)),
            RangePreset::FiveDays => end.checked_sub_signed(Duration::days(5)),
            RangePreset::OneMonth => end.checked_sub_months(Months::new(1)),
            RangePreset::ThreeMonths => end.checked_sub_months(Months::new(3)),
            RangePreset::SixMonths => end.checked_sub_months(Months::new(6)),
            RangePreset::YearToDate => NaiveDate::from_ymd_opt(end.year(), 1, 1).and_then(|day| day.and_hms_opt(0, 0, 0)),
            RangePreset::OneYear => end.checked_sub_months(Months::new(12)),
            RangePreset::FiveYears => end.checked_sub_months(Months::new(60)),
            RangePreset::All => None,
        }?;
        Some(start.and_utc().timestamp())
    }
}
