use derive_more::Display;

/// Failures reaching the data service. "No data" is not one of them, see
/// [`crate::domain::market_data::FetchOutcome`].
#[derive(Debug, Clone, PartialEq, Display)]
pub enum NetworkError {
    #[display(fmt = "request failed: {}", _0)]
    RequestFailed(String),
    #[display(fmt = "HTTP {}: {}", status, message)]
    Status { status: u16, message: String },
    #[display(fmt = "malformed response: {}", _0)]
    Decode(String),
}

/// Problems with a specific payload handed to the core.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum DataError {
    #[display(fmt = "unknown series {}", _0)]
    UnknownSeries(u64),
    #[display(fmt = "invalid JSON: {}", _0)]
    InvalidJson(String),
    #[display(fmt = "invalid configuration: {}", _0)]
    InvalidConfig(String),
}

/// Host-facing input that cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum PresentationError {
    #[display(fmt = "unknown tool '{}'", _0)]
    UnknownTool(String),
    #[display(fmt = "unknown direction '{}'", _0)]
    UnknownDirection(String),
    #[display(fmt = "unknown scale request '{}'", _0)]
    UnknownScale(String),
    #[display(fmt = "unknown series kind '{}'", _0)]
    UnknownSeriesKind(String),
    #[display(fmt = "unknown timeframe '{}'", _0)]
    UnknownTimeframe(String),
    #[display(fmt = "unknown range '{}'", _0)]
    UnknownRange(String),
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum AppError {
    #[display(fmt = "Network Error: {}", _0)]
    Network(NetworkError),
    #[display(fmt = "Data Error: {}", _0)]
    Data(DataError),
    #[display(fmt = "Presentation Error: {}", _0)]
    Presentation(PresentationError),
}

impl std::error::Error for NetworkError {}
impl std::error::Error for DataError {}
impl std::error::Error for PresentationError {}
impl std::error::Error for AppError {}

impl From<NetworkError> for AppError {
    fn from(error: NetworkError) -> Self {
        AppError::Network(error)
    }
}

impl From<DataError> for AppError {
    fn from(error: DataError) -> Self {
        AppError::Data(error)
    }
}

impl From<PresentationError> for AppError {
    fn from(error: PresentationError) -> Self {
        AppError::Presentation(error)
    }
}

pub type NetworkResult<T> = Result<T, NetworkError>;
pub type AppResult<T> = Result<T, AppError>;
