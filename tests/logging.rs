use floor_chart_wasm::application::{ChartConfig, ChartWorkspace};
use floor_chart_wasm::domain::chart::{SeriesDraft, SeriesKind};
use floor_chart_wasm::domain::logging::{init_logger, LogLevel, MemoryLogger};
use floor_chart_wasm::domain::market_data::{RawNumber, RawPoint, SeriesSource};

// The logger is process-wide, so this binary holds a single test.
#[test]
fn malformed_rows_are_reported_at_warn() {
    let logger = MemoryLogger::new();
    init_logger(Box::new(logger.clone()));

    let mut workspace = ChartWorkspace::new(ChartConfig::default());
    let anchor = workspace.chart().anchor();
    let draft = SeriesDraft::new(SeriesSource::parse("BTCUSDT"), SeriesKind::Candle);
    let series = workspace.add_series(draft, Some(anchor)).unwrap();

    let mut broken = RawPoint::ohlc(60, 1.0, 1.0, 1.0, 1.0);
    broken.close = Some(Some(RawNumber::Text("??".to_string())));
    let rows = vec![RawPoint::ohlc(0, 1.0, 2.0, 0.5, 1.5), broken];
    workspace.apply_history(series, &rows).unwrap();

    assert_eq!(logger.count_at(LogLevel::Warn), 1);
    let warning = logger.entries().into_iter().find(|entry| entry.level == LogLevel::Warn).unwrap();
    assert!(warning.message.contains("dropped 1 malformed points"));
    assert_eq!(warning.component.to_string(), "APP:ChartWorkspace");
}
