#![cfg(target_arch = "wasm32")]

use floor_chart_wasm::presentation::FloorChartApi;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn layout_round_trip_through_json() {
    let api = FloorChartApi::new(None).unwrap();
    let anchor = 1;
    let main = api.add_series("BTCUSDT", "candle", Some(anchor)).unwrap();
    let rsi = api.add_series("RSI", "line", None).unwrap();

    api.move_series(rsi, "up").unwrap();
    api.change_series_scale(main, "new-left").unwrap();

    let layout: serde_json::Value = serde_json::from_str(&api.layout().unwrap()).unwrap();
    assert_eq!(layout["panes"].as_array().unwrap().len(), 1);
    assert_eq!(layout["panes"][0]["series"][0]["scale"], "left-1");

    let report: serde_json::Value = serde_json::from_str(&api.invariant_report().unwrap()).unwrap();
    assert!(report["issues"].as_array().unwrap().is_empty());
}

#[wasm_bindgen_test]
fn bad_input_is_rejected() {
    let api = FloorChartApi::new(Some(r#"{"timeframe": "1h"}"#.to_string())).unwrap();
    assert!(api.add_series("BTCUSDT", "hexagon", None).is_err());
    assert!(api.set_tool("lasso").is_err());
    assert!(api.move_series(1, "sideways").is_err());
    assert!(FloorChartApi::new(Some("{".to_string())).is_err());
}

#[wasm_bindgen_test]
fn events_are_queued_until_drained() {
    let api = FloorChartApi::new(None).unwrap();
    api.add_series("ETHUSDT", "line", None).unwrap();

    let events: serde_json::Value = serde_json::from_str(&api.drain_events().unwrap()).unwrap();
    assert_eq!(events[0]["type"], "layout_changed");
    assert_eq!(api.drain_events().unwrap(), "[]");
}

#[wasm_bindgen_test]
fn tool_switching() {
    let api = FloorChartApi::new(None).unwrap();
    assert_eq!(api.active_tool(), "cursor");
    api.set_tool("fib").unwrap();
    assert_eq!(api.active_tool(), "fib");
    assert_eq!(api.preview().unwrap(), "null");
}
