use super::entities::RawPoint;
use super::value_objects::{SeriesSource, TimeInterval, TimeKey};
use crate::domain::errors::NetworkResult;
use std::future::Future;

/// One request to the data service.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    pub source: SeriesSource,
    pub timeframe: TimeInterval,
    /// Only rows strictly older than this.
    pub before: Option<TimeKey>,
    pub limit: Option<usize>,
}

impl DataQuery {
    pub fn latest(source: SeriesSource, timeframe: TimeInterval) -> Self {
        Self { source, timeframe, before: None, limit: None }
    }

    pub fn page_before(source: SeriesSource, timeframe: TimeInterval, before: TimeKey, limit: usize) -> Self {
        Self { source, timeframe, before: Some(before), limit: Some(limit) }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs in the order the data service documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("ticker", self.source.query_value().unwrap_or_default().to_string()),
            ("timeframe", self.timeframe.as_ref().to_string()),
        ];
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(before) = self.before {
            pairs.push(("to_timestamp", before.unix_seconds().to_string()));
        }
        pairs
    }
}

/// "Nothing there" is an answer, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Data(Vec<RawPoint>),
    NoData,
}

impl FetchOutcome {
    pub fn from_rows(rows: Vec<RawPoint>) -> Self {
        if rows.is_empty() { FetchOutcome::NoData } else { FetchOutcome::Data(rows) }
    }
}

/// Source of OHLC rows for tickers and formulas.
pub trait MarketDataRepository {
    fn fetch(&self, query: DataQuery) -> impl Future<Output = NetworkResult<FetchOutcome>>;
}
