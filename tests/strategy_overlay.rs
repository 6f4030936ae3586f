use floor_chart_wasm::application::{ChartConfig, ChartWorkspace};
use floor_chart_wasm::domain::chart::{SeriesDraft, SeriesKind};
use floor_chart_wasm::domain::market_data::{DataPoint, RawPoint, SeriesSource, TimeKey};
use floor_chart_wasm::domain::strategy::{
    BacktestEngine, BacktestReport, EquityPoint, MarkerShape, Signal, SignalSide, StrategyDefinition,
};

/// Buys on every rising close and sells on every falling one.
struct CloseDirection;

impl BacktestEngine for CloseDirection {
    fn run(&self, primary: &[DataPoint], strategy: &StrategyDefinition) -> BacktestReport {
        let mut equity = strategy.initial_capital;
        let mut report = BacktestReport::default();
        for pair in primary.windows(2) {
            let (Some(before), Some(after)) = (pair[0].close(), pair[1].close()) else {
                continue;
            };
            let side = if after > before { SignalSide::Buy } else { SignalSide::Sell };
            report.signals.push(Signal { time: pair[1].time, side, price: after });
            equity += after - before;
            report.equity.push(EquityPoint { time: pair[1].time, value: equity });
        }
        report
    }
}

fn strategy() -> StrategyDefinition {
    serde_json::from_str(
        r#"{
            "buy_conditions": [{"pair": "BTC/USDT", "operator": ">", "compare_type": "value", "value": 100}],
            "sell_conditions": [{"pair": "BTC/USDT", "operator": "<", "compare_type": "indicator", "name": "sma", "period": 20}],
            "initial_capital": 1000,
            "commission": 0.001
        }"#,
    )
    .unwrap()
}

fn loaded_workspace() -> ChartWorkspace {
    let mut workspace = ChartWorkspace::new(ChartConfig::default());
    let anchor = workspace.chart().anchor();
    let draft = SeriesDraft::new(SeriesSource::parse("BTCUSDT"), SeriesKind::Candle);
    let series = workspace.add_series(draft, Some(anchor)).unwrap();
    let closes = [100.0, 101.0, 99.0, 102.0, 102.5];
    let rows: Vec<RawPoint> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| RawPoint::ohlc(i as i64 * 86_400, c, c + 1.0, c - 1.0, c))
        .collect();
    workspace.apply_history(series, &rows).unwrap();
    workspace
}

#[test]
fn report_json_uses_the_service_field_names() {
    let report: BacktestReport = serde_json::from_str(
        r#"{"signals": [{"time": 86400, "type": "sell", "price": 3.5}, {"time": 0, "type": "buy", "price": 2}],
            "equity": [{"time": 0, "value": 1000}, {"time": 86400, "value": 990}]}"#,
    )
    .unwrap();

    let markers = report.markers();
    assert_eq!(markers[0].time, TimeKey::from(0));
    assert_eq!(markers[0].shape, MarkerShape::ArrowUp);
    assert_eq!(markers[1].shape, MarkerShape::ArrowDown);
    assert_eq!(report.equity_points().len(), 2);
}

#[test]
fn backtest_adds_markers_and_an_equity_pane() {
    let mut workspace = loaded_workspace();
    let equity = workspace.run_backtest(&CloseDirection, &strategy()).unwrap();

    let reference = workspace.reference_series().unwrap();
    assert_eq!(reference.markers.len(), 4);
    assert_eq!(workspace.chart().pane_count(), 2);

    let equity_pane = workspace.chart().pane_of(equity).unwrap();
    assert_eq!(workspace.chart().pane_ids()[1], equity_pane);
    assert_eq!(workspace.chart().series(equity).unwrap().title, "Equity");
    // equity curve starts one bar late and is padded to the price timeline
    let points = workspace.series_points(equity);
    assert_eq!(points.len(), 5);
    assert!(points[0].is_whitespace());
}

#[test]
fn rerunning_replaces_the_equity_series() {
    let mut workspace = loaded_workspace();
    let first = workspace.run_backtest(&CloseDirection, &strategy()).unwrap();
    let second = workspace.run_backtest(&CloseDirection, &strategy()).unwrap();

    assert_ne!(first, second);
    assert!(workspace.chart().series(first).is_none());
    assert_eq!(workspace.chart().pane_count(), 2);
    assert!(workspace.chart().invariant_report().is_clean());
}

#[test]
fn backtest_needs_a_reference_series() {
    let mut workspace = ChartWorkspace::new(ChartConfig::default());
    assert_eq!(workspace.apply_backtest(&BacktestReport::default()), None);
}
