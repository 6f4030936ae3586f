use crate::domain::{
    errors::{NetworkError, NetworkResult},
    logging::{get_logger, LogComponent},
    market_data::{DataQuery, FetchOutcome, MarketDataRepository, RawPoint},
};
use gloo::net::http::Request;
use serde::Deserialize;

const COMPONENT: LogComponent = LogComponent::Infrastructure("DataServiceClient");

/// Body of `GET /data`.
#[derive(Debug, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub data: Vec<RawPoint>,
}

/// Decodes a response body. Rows are not validated here; the reconciler
/// does that when they are merged.
pub fn parse_data_response(body: &str) -> NetworkResult<FetchOutcome> {
    let response: DataResponse =
        serde_json::from_str(body).map_err(|e| NetworkError::Decode(e.to_string()))?;
    if let Some(count) = response.count {
        if count != response.data.len() {
            get_logger().debug(
                COMPONENT,
                &format!("count {} but {} rows for {:?}", count, response.data.len(), response.ticker),
            );
        }
    }
    Ok(FetchOutcome::from_rows(response.data))
}

/// Client of the chart data service.
#[derive(Debug, Clone)]
pub struct DataServiceClient {
    base_url: String,
}

impl DataServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/data", self.base_url)
    }
}

impl MarketDataRepository for DataServiceClient {
    async fn fetch(&self, query: DataQuery) -> NetworkResult<FetchOutcome> {
        let pairs = query.query_pairs();
        get_logger().debug(COMPONENT, &format!("GET {} {:?}", self.endpoint(), pairs));

        let response = Request::get(&self.endpoint())
            .query(pairs)
            .send()
            .await
            .map_err(|e| NetworkError::RequestFailed(e.to_string()))?;

        // the service answers 404 when the ticker has no rows
        if response.status() == 404 {
            return Ok(FetchOutcome::NoData);
        }
        if !response.ok() {
            return Err(NetworkError::Status { status: response.status(), message: response.status_text() });
        }

        let body = response.text().await.map_err(|e| NetworkError::Decode(e.to_string()))?;
        let outcome = parse_data_response(&body)?;
        if let FetchOutcome::Data(rows) = &outcome {
            get_logger().debug(COMPONENT, &format!("received {} rows", rows.len()));
        }
        Ok(outcome)
    }
}
