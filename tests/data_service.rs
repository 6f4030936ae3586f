use floor_chart_wasm::application::{
    BackfillUseCase, ChartConfig, ChartWorkspace, LoadOutcome, LoadSeriesUseCase, LoadState, PollLatestUseCase,
    SharedWorkspace,
};
use floor_chart_wasm::domain::chart::{SeriesDraft, SeriesId, SeriesKind};
use floor_chart_wasm::domain::coordinates::LogicalRange;
use floor_chart_wasm::domain::errors::{AppError, DataError, NetworkError};
use floor_chart_wasm::domain::market_data::{
    DataQuery, FetchOutcome, MarketDataRepository, RawPoint, SeriesSource, TimeInterval, TimeKey,
};
use floor_chart_wasm::infrastructure::http::parse_data_response;
use futures::executor::block_on;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Answers queued responses in order and records every query.
#[derive(Default)]
struct ScriptedRepository {
    responses: RefCell<VecDeque<Result<FetchOutcome, NetworkError>>>,
    queries: RefCell<Vec<DataQuery>>,
}

impl ScriptedRepository {
    fn answering(responses: Vec<Result<FetchOutcome, NetworkError>>) -> Rc<Self> {
        Rc::new(Self { responses: RefCell::new(responses.into()), queries: RefCell::default() })
    }
}

impl MarketDataRepository for ScriptedRepository {
    async fn fetch(&self, query: DataQuery) -> Result<FetchOutcome, NetworkError> {
        self.queries.borrow_mut().push(query);
        self.responses.borrow_mut().pop_front().unwrap_or(Ok(FetchOutcome::NoData))
    }
}

/// Moves the chart to hourly bars while the request is out.
struct SwitchingRepository {
    workspace: SharedWorkspace,
}

impl MarketDataRepository for SwitchingRepository {
    async fn fetch(&self, _query: DataQuery) -> Result<FetchOutcome, NetworkError> {
        self.workspace.borrow_mut().set_timeframe(TimeInterval::OneHour);
        Ok(FetchOutcome::Data(minutes(0, 50)))
    }
}

fn minutes(from: i64, count: i64) -> Vec<RawPoint> {
    (from..from + count).map(|i| RawPoint::ohlc(i * 60, 10.0, 11.0, 9.0, 10.5)).collect()
}

fn workspace_with(symbol: &str) -> (SharedWorkspace, SeriesId) {
    let config = ChartConfig { timeframe: TimeInterval::OneMinute, ..ChartConfig::default() };
    let mut workspace = ChartWorkspace::new(config);
    let anchor = workspace.chart().anchor();
    let draft = SeriesDraft::new(SeriesSource::parse(symbol), SeriesKind::Candle);
    let series = workspace.add_series(draft, Some(anchor)).unwrap();
    (Rc::new(RefCell::new(workspace)), series)
}

#[test]
fn query_pairs_follow_the_service_contract() {
    let query = DataQuery::latest(SeriesSource::parse("btc/usdt"), TimeInterval::OneHour).with_limit(1000);
    assert_eq!(
        query.query_pairs(),
        vec![("ticker", "BTC/USDT".to_string()), ("timeframe", "1h".to_string()), ("limit", "1000".to_string())]
    );

    let page = DataQuery::page_before(SeriesSource::parse("ETH"), TimeInterval::OneDay, TimeKey::from(1_700_000_000), 200);
    let pairs = page.query_pairs();
    assert_eq!(pairs[2], ("limit", "200".to_string()));
    assert_eq!(pairs[3], ("to_timestamp", "1700000000".to_string()));
}

#[test]
fn formulas_are_sent_verbatim() {
    let source = SeriesSource::parse("BTC/USDT / ETH/USDT");
    assert!(matches!(source, SeriesSource::Formula(_)));
    let pairs = DataQuery::latest(source, TimeInterval::OneDay).query_pairs();
    assert_eq!(pairs[0].1, "BTC/USDT / ETH/USDT");
}

#[test]
fn response_body_decodes_rows() {
    let body = r#"{"ticker": "BTC/USDT", "timeframe": "1d", "count": 2,
        "data": [{"time": 1, "open": 1, "high": 2, "low": 0.5, "close": 1.5},
                 {"time": 2, "value": "3.5"}]}"#;
    match parse_data_response(body).unwrap() {
        FetchOutcome::Data(rows) => assert_eq!(rows.len(), 2),
        FetchOutcome::NoData => panic!("expected rows"),
    }
}

#[test]
fn empty_or_malformed_bodies() {
    assert_eq!(parse_data_response(r#"{"data": []}"#).unwrap(), FetchOutcome::NoData);
    assert_eq!(parse_data_response("{}").unwrap(), FetchOutcome::NoData);
    assert!(matches!(parse_data_response("<html>"), Err(NetworkError::Decode(_))));
}

#[test]
fn config_accepts_partial_json() {
    let config = ChartConfig::from_json(r#"{"timeframe": "4h", "backfill_page": 50}"#).unwrap();
    assert_eq!(config.timeframe, TimeInterval::FourHours);
    assert_eq!(config.backfill_page, 50);
    assert_eq!(config.history_limit, ChartConfig::default().history_limit);
}

#[test]
fn config_rejects_bad_values() {
    assert!(matches!(ChartConfig::from_json("not json"), Err(DataError::InvalidJson(_))));
    assert!(matches!(ChartConfig::from_json(r#"{"poll_interval_ms": 0}"#), Err(DataError::InvalidConfig(_))));
    assert!(matches!(
        ChartConfig::from_json(r#"{"min_bar_spacing": 10, "max_bar_spacing": 5}"#),
        Err(DataError::InvalidConfig(_))
    ));
}

#[test]
fn load_merges_history() {
    let (workspace, series) = workspace_with("BTCUSDT");
    let repository = ScriptedRepository::answering(vec![Ok(FetchOutcome::Data(minutes(0, 50)))]);
    let use_case = LoadSeriesUseCase::new(Rc::clone(&repository), Rc::clone(&workspace));

    let outcome = block_on(use_case.execute(series)).unwrap();
    assert!(matches!(outcome, LoadOutcome::Merged(summary) if summary.points == 50));
    assert_eq!(workspace.borrow().load_state(series), LoadState::Ready);

    let queries = repository.queries.borrow();
    assert_eq!(queries[0].limit, Some(1000));
    assert_eq!(queries[0].timeframe, TimeInterval::OneMinute);
}

#[test]
fn load_without_rows_marks_no_data() {
    let (workspace, series) = workspace_with("NOPE");
    let repository = ScriptedRepository::answering(vec![Ok(FetchOutcome::NoData)]);
    let use_case = LoadSeriesUseCase::new(repository, Rc::clone(&workspace));

    assert_eq!(block_on(use_case.execute(series)).unwrap(), LoadOutcome::NoData);
    assert_eq!(workspace.borrow().load_state(series), LoadState::NoData);
}

#[test]
fn load_failure_is_reported() {
    let (workspace, series) = workspace_with("BTCUSDT");
    let error = NetworkError::Status { status: 500, message: "boom".into() };
    let repository = ScriptedRepository::answering(vec![Err(error.clone())]);
    let use_case = LoadSeriesUseCase::new(repository, Rc::clone(&workspace));

    assert_eq!(block_on(use_case.execute(series)), Err(AppError::Network(error)));
    assert!(matches!(workspace.borrow().load_state(series), LoadState::Failed(_)));
}

#[test]
fn load_rejects_unknown_series() {
    let (workspace, _) = workspace_with("BTCUSDT");
    let repository = ScriptedRepository::answering(Vec::new());
    let use_case = LoadSeriesUseCase::new(Rc::clone(&repository), workspace);

    let result = block_on(use_case.execute(SeriesId::from(404)));
    assert_eq!(result, Err(AppError::Data(DataError::UnknownSeries(404))));
    assert!(repository.queries.borrow().is_empty());
}

#[test]
fn derived_series_are_skipped() {
    let (workspace, _) = workspace_with("BTCUSDT");
    let draft = SeriesDraft::new(SeriesSource::Derived("rsi".into()), SeriesKind::Line);
    let derived = workspace.borrow_mut().add_series(draft, None).unwrap();
    let repository = ScriptedRepository::answering(Vec::new());
    let use_case = LoadSeriesUseCase::new(repository, workspace);

    assert_eq!(block_on(use_case.execute(derived)).unwrap(), LoadOutcome::Skipped);
}

#[test]
fn backfill_use_case_releases_the_guard() {
    let (workspace, series) = workspace_with("BTCUSDT");
    workspace.borrow_mut().apply_history(series, &minutes(0, 100)).unwrap();
    let request = workspace.borrow_mut().set_visible_range(LogicalRange::new(0.0, 50.0)).unwrap();
    assert!(workspace.borrow().backfill_guard().is_in_flight());

    let repository = ScriptedRepository::answering(vec![Ok(FetchOutcome::Data(minutes(-200, 200)))]);
    let use_case = BackfillUseCase::new(Rc::clone(&repository), Rc::clone(&workspace));
    let outcome = block_on(use_case.execute(request)).unwrap();

    assert!(matches!(outcome, LoadOutcome::Merged(summary) if summary.prepended == 200));
    assert!(!workspace.borrow().backfill_guard().is_in_flight());
    assert_eq!(repository.queries.borrow()[0].before, Some(TimeKey::from(0)));
}

#[test]
fn backfill_failure_also_releases_the_guard() {
    let (workspace, series) = workspace_with("BTCUSDT");
    workspace.borrow_mut().apply_history(series, &minutes(0, 100)).unwrap();
    let request = workspace.borrow_mut().set_visible_range(LogicalRange::new(0.0, 50.0)).unwrap();

    let repository = ScriptedRepository::answering(vec![Err(NetworkError::RequestFailed("offline".into()))]);
    let use_case = BackfillUseCase::new(repository, Rc::clone(&workspace));
    assert!(block_on(use_case.execute(request)).is_err());
    assert!(!workspace.borrow().backfill_guard().is_in_flight());
    // loaded bars survive a failed page
    assert_eq!(workspace.borrow().load_state(series), LoadState::Ready);
}

#[test]
fn poll_round_updates_loaded_series() {
    let (workspace, series) = workspace_with("BTCUSDT");
    workspace.borrow_mut().apply_history(series, &minutes(0, 10)).unwrap();
    let draft = SeriesDraft::new(SeriesSource::parse("ETHUSDT"), SeriesKind::Candle);
    let idle = workspace.borrow_mut().add_series(draft, None).unwrap();

    let repository = ScriptedRepository::answering(vec![Ok(FetchOutcome::Data(minutes(9, 2)))]);
    let use_case = PollLatestUseCase::new(Rc::clone(&repository), Rc::clone(&workspace));
    assert_eq!(block_on(use_case.execute()), 1);

    assert_eq!(workspace.borrow().series_points(series).len(), 11);
    assert!(workspace.borrow().series_points(idle).is_empty());
    let queries = repository.queries.borrow();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].limit, Some(2));
}

#[test]
fn responses_for_an_old_timeframe_are_ignored() {
    let (workspace, series) = workspace_with("BTCUSDT");
    let repository = Rc::new(SwitchingRepository { workspace: Rc::clone(&workspace) });
    let use_case = LoadSeriesUseCase::new(Rc::clone(&repository), Rc::clone(&workspace));

    assert_eq!(block_on(use_case.execute(series)).unwrap(), LoadOutcome::Stale);
    assert!(workspace.borrow().series_points(series).is_empty());
    assert_eq!(workspace.borrow().load_state(series), LoadState::Loading);

    // the reload already asks for hourly bars
    assert!(matches!(block_on(use_case.execute(series)).unwrap(), LoadOutcome::Merged(_)));
}

#[test]
fn poll_round_skips_rows_of_an_old_timeframe() {
    let (workspace, series) = workspace_with("BTCUSDT");
    workspace.borrow_mut().apply_history(series, &minutes(0, 10)).unwrap();
    let repository = Rc::new(SwitchingRepository { workspace: Rc::clone(&workspace) });
    let use_case = PollLatestUseCase::new(repository, Rc::clone(&workspace));

    assert_eq!(block_on(use_case.execute()), 0);
    assert!(workspace.borrow().series_points(series).is_empty());
}
