use crate::application::{
    BackfillRequest, BackfillUseCase, ChartConfig, ChartWorkspace, LoadSeriesUseCase, PollLatestUseCase,
    SharedWorkspace,
};
use crate::domain::{
    chart::{MoveDirection, PaneId, ScaleId, ScaleOptions, ScaleRequest, SeriesDraft, SeriesId, SeriesKind, StylePatch},
    coordinates::{LogicalRange, PixelPoint, RangePreset},
    errors::{AppError, DataError, PresentationError},
    events::ChartEvent,
    logging::{get_logger, LogComponent},
    market_data::{SeriesSource, TimeInterval},
    strategy::BacktestReport,
};
use crate::infrastructure::{
    http::DataServiceClient,
    polling::{start_polling, PollingHandle},
    services::BrowserPrompt,
};
use js_sys::Promise;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

const COMPONENT: LogComponent = LogComponent::Presentation("FloorChartApi");

fn js_error(error: impl Into<AppError>) -> JsValue {
    JsValue::from_str(&error.into().to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_error(DataError::InvalidJson(e.to_string())))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| js_error(DataError::InvalidJson(e.to_string())))
}

fn direction(text: &str) -> Result<MoveDirection, JsValue> {
    MoveDirection::parse(text).ok_or_else(|| js_error(PresentationError::UnknownDirection(text.to_string())))
}

/// Browser entry point of one chart. Every method is a thin translation
/// into the workspace; results cross the boundary as JSON strings.
#[wasm_bindgen]
pub struct FloorChartApi {
    workspace: SharedWorkspace,
    repository: Rc<DataServiceClient>,
    events: Rc<RefCell<Vec<ChartEvent>>>,
    polling: Option<PollingHandle>,
}

#[wasm_bindgen]
impl FloorChartApi {
    /// `config_json` may omit any field of the chart configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<FloorChartApi, JsValue> {
        let config = match config_json {
            Some(json) => ChartConfig::from_json(&json).map_err(js_error)?,
            None => ChartConfig::default(),
        };
        let repository = Rc::new(DataServiceClient::new(config.base_url.clone()));
        let mut workspace = ChartWorkspace::new(config);

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        workspace.events_mut().subscribe_to_chart_events(move |event: &ChartEvent| {
            sink.borrow_mut().push(event.clone());
        });

        get_logger().info(COMPONENT, "chart created");
        Ok(Self { workspace: Rc::new(RefCell::new(workspace)), repository, events, polling: None })
    }

    // ---- layout -------------------------------------------------------

    /// Adds a series for `source` (ticker or formula). Without `target_pane`
    /// the series gets a new pane of its own.
    #[wasm_bindgen(js_name = addSeries)]
    pub fn add_series(&self, source: &str, kind: &str, target_pane: Option<u64>) -> Result<u64, JsValue> {
        let kind = SeriesKind::from_str(kind)
            .map_err(|_| js_error(PresentationError::UnknownSeriesKind(kind.to_string())))?;
        let draft = SeriesDraft::new(SeriesSource::parse(source), kind);
        self.workspace
            .borrow_mut()
            .add_series(draft, target_pane.map(PaneId::from))
            .map(|id| id.value())
            .ok_or_else(|| JsValue::from_str("unknown pane"))
    }

    #[wasm_bindgen(js_name = moveSeries)]
    pub fn move_series(&self, series: u64, to: &str) -> Result<(), JsValue> {
        let to = direction(to)?;
        self.workspace.borrow_mut().move_series(SeriesId::from(series), to);
        Ok(())
    }

    #[wasm_bindgen(js_name = removeSeries)]
    pub fn remove_series(&self, series: u64) {
        self.workspace.borrow_mut().remove_series(SeriesId::from(series));
    }

    /// `request` is `bind-right`, `bind-left`, `new-right`, `new-left` or an
    /// existing binding id such as `left-2`.
    #[wasm_bindgen(js_name = changeSeriesScale)]
    pub fn change_series_scale(&self, series: u64, request: &str) -> Result<(), JsValue> {
        let parsed =
            ScaleRequest::parse(request).ok_or_else(|| js_error(PresentationError::UnknownScale(request.to_string())))?;
        self.workspace.borrow_mut().change_series_scale(SeriesId::from(series), parsed);
        Ok(())
    }

    #[wasm_bindgen(js_name = movePane)]
    pub fn move_pane(&self, pane: u64, to: &str) -> Result<(), JsValue> {
        let to = direction(to)?;
        self.workspace.borrow_mut().move_pane(PaneId::from(pane), to);
        Ok(())
    }

    #[wasm_bindgen(js_name = setPaneHeight)]
    pub fn set_pane_height(&self, pane: u64, weight: f64) {
        self.workspace.borrow_mut().set_pane_height(PaneId::from(pane), weight);
    }

    #[wasm_bindgen(js_name = updateSeriesStyle)]
    pub fn update_series_style(&self, series: u64, patch_json: &str) -> Result<(), JsValue> {
        let patch: StylePatch = from_json(patch_json)?;
        self.workspace.borrow_mut().update_series_style(SeriesId::from(series), &patch);
        Ok(())
    }

    #[wasm_bindgen(js_name = setScaleOptions)]
    pub fn set_scale_options(&self, scale: &str, options_json: &str) -> Result<(), JsValue> {
        let id = ScaleId::parse(scale).ok_or_else(|| js_error(PresentationError::UnknownScale(scale.to_string())))?;
        let options: ScaleOptions = from_json(options_json)?;
        self.workspace.borrow_mut().set_scale_options(id, options);
        Ok(())
    }

    /// Layout snapshot for the renderer.
    pub fn layout(&self) -> Result<String, JsValue> {
        to_json(&self.workspace.borrow().layout_view())
    }

    #[wasm_bindgen(js_name = invariantReport)]
    pub fn invariant_report(&self) -> Result<String, JsValue> {
        to_json(&self.workspace.borrow().chart().invariant_report())
    }

    #[wasm_bindgen(js_name = loadState)]
    pub fn load_state(&self, series: u64) -> Result<String, JsValue> {
        to_json(&self.workspace.borrow().load_state(SeriesId::from(series)))
    }

    // ---- drawings -----------------------------------------------------

    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&self, tool: &str) -> Result<(), JsValue> {
        let tool = crate::domain::drawing::Tool::from_str(tool)
            .map_err(|_| js_error(PresentationError::UnknownTool(tool.to_string())))?;
        self.workspace.borrow_mut().set_tool(tool);
        Ok(())
    }

    #[wasm_bindgen(js_name = activeTool)]
    pub fn active_tool(&self) -> String {
        self.workspace.borrow().drawings().tool().as_ref().to_string()
    }

    /// Pane-local pixel coordinates. Returns the interaction as JSON.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, pane: u64, x: f64, y: f64) -> Result<String, JsValue> {
        let outcome =
            self.workspace.borrow_mut().pointer_down(PaneId::from(pane), PixelPoint::new(x, y), &mut BrowserPrompt);
        to_json(&outcome)
    }

    /// Returns whether the overlay needs a repaint.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, pane: u64, x: f64, y: f64, pressed: bool) -> bool {
        self.workspace.borrow_mut().pointer_move(PaneId::from(pane), PixelPoint::new(x, y), pressed)
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self) -> Result<String, JsValue> {
        let outcome = self.workspace.borrow_mut().pointer_up();
        to_json(&outcome)
    }

    #[wasm_bindgen(js_name = cancelDrawing)]
    pub fn cancel_drawing(&self) {
        self.workspace.borrow_mut().cancel_drawing();
    }

    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&self) -> bool {
        self.workspace.borrow_mut().delete_selected()
    }

    #[wasm_bindgen(js_name = clearDrawings)]
    pub fn clear_drawings(&self, pane: u64) -> usize {
        self.workspace.borrow_mut().clear_drawings(PaneId::from(pane))
    }

    pub fn drawings(&self, pane: u64) -> Result<String, JsValue> {
        to_json(&self.workspace.borrow().pane_drawings(PaneId::from(pane)))
    }

    /// In-progress shape, or `null`.
    pub fn preview(&self) -> Result<String, JsValue> {
        to_json(&self.workspace.borrow().preview())
    }

    /// Pixel positions of the selection handles; unmappable ones are `null`.
    #[wasm_bindgen(js_name = selectedHandles)]
    pub fn selected_handles(&self) -> Result<String, JsValue> {
        let workspace = self.workspace.borrow();
        let Some((pane, _)) = workspace.drawings().selected() else {
            return to_json(&Vec::<Option<PixelPoint>>::new());
        };
        let pixels: Vec<Option<PixelPoint>> = workspace
            .drawings()
            .selected_handles()
            .into_iter()
            .map(|handle| workspace.to_pixel(pane, handle))
            .collect();
        to_json(&pixels)
    }

    // ---- viewport -----------------------------------------------------

    pub fn resize(&self, width: f64, height: f64) {
        let request = self.workspace.borrow_mut().resize(width, height);
        self.spawn_backfill(request);
    }

    pub fn pan(&self, delta_px: f64) {
        let request = self.workspace.borrow_mut().pan(delta_px);
        self.spawn_backfill(request);
    }

    /// Wheel zoom around the cursor; `cursor_ratio` is x / width.
    pub fn wheel(&self, delta_y: f64, cursor_ratio: f64) {
        let request = self.workspace.borrow_mut().zoom(-delta_y / 100.0, cursor_ratio);
        self.spawn_backfill(request);
    }

    #[wasm_bindgen(js_name = visibleRange)]
    pub fn visible_range(&self) -> Result<String, JsValue> {
        to_json(&self.workspace.borrow().visible_range())
    }

    #[wasm_bindgen(js_name = setVisibleRange)]
    pub fn set_visible_range(&self, from: f64, to: f64) {
        let request = self.workspace.borrow_mut().set_visible_range(LogicalRange::new(from, to));
        self.spawn_backfill(request);
    }

    /// Quick range such as `5d`, `ytd` or `all`.
    #[wasm_bindgen(js_name = showRange)]
    pub fn show_range(&self, preset: &str) -> Result<(), JsValue> {
        let preset =
            RangePreset::parse(preset).ok_or_else(|| js_error(PresentationError::UnknownRange(preset.to_string())))?;
        let request = self.workspace.borrow_mut().show_range(preset);
        self.spawn_backfill(request);
        Ok(())
    }

    // ---- data ---------------------------------------------------------

    /// Switches every fetchable series to another interval and reloads it.
    #[wasm_bindgen(js_name = setTimeframe)]
    pub fn set_timeframe(&self, timeframe: &str) -> Result<(), JsValue> {
        let parsed = TimeInterval::from_str(timeframe)
            .map_err(|_| js_error(PresentationError::UnknownTimeframe(timeframe.to_string())))?;
        let reloads = self.workspace.borrow_mut().set_timeframe(parsed);
        for (series, _) in reloads {
            let use_case = LoadSeriesUseCase::new(Rc::clone(&self.repository), Rc::clone(&self.workspace));
            spawn_local(async move {
                if let Err(error) = use_case.execute(series).await {
                    get_logger().warn(COMPONENT, &format!("reload of {} failed: {}", series, error));
                }
            });
        }
        Ok(())
    }

    /// Loads a series' history. Resolves with the outcome as JSON.
    #[wasm_bindgen(js_name = loadSeries)]
    pub fn load_series(&self, series: u64) -> Promise {
        let use_case = LoadSeriesUseCase::new(Rc::clone(&self.repository), Rc::clone(&self.workspace));
        future_to_promise(async move {
            let outcome = use_case.execute(SeriesId::from(series)).await.map_err(js_error)?;
            Ok(JsValue::from_str(&to_json(&outcome)?))
        })
    }

    #[wasm_bindgen(js_name = startPolling)]
    pub fn start_polling(&mut self) {
        self.stop_polling();
        let interval = self.workspace.borrow().config().poll_interval_ms;
        let repository = Rc::clone(&self.repository);
        let workspace = Rc::clone(&self.workspace);
        self.polling = Some(start_polling(interval, move || {
            let use_case = PollLatestUseCase::new(Rc::clone(&repository), Rc::clone(&workspace));
            async move {
                use_case.execute().await;
            }
        }));
    }

    #[wasm_bindgen(js_name = stopPolling)]
    pub fn stop_polling(&mut self) {
        if let Some(handle) = self.polling.take() {
            handle.stop();
        }
    }

    /// Accepts a backtest result (`{signals, equity}`) and shows it. Returns
    /// the equity series id.
    #[wasm_bindgen(js_name = applyBacktest)]
    pub fn apply_backtest(&self, report_json: &str) -> Result<Option<u64>, JsValue> {
        let report: BacktestReport = from_json(report_json)?;
        Ok(self.workspace.borrow_mut().apply_backtest(&report).map(|id| id.value()))
    }

    /// Events published since the last call, oldest first.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&self) -> Result<String, JsValue> {
        let events: Vec<ChartEvent> = self.events.borrow_mut().drain(..).collect();
        to_json(&events)
    }

    fn spawn_backfill(&self, request: Option<BackfillRequest>) {
        let Some(request) = request else {
            return;
        };
        let use_case = BackfillUseCase::new(Rc::clone(&self.repository), Rc::clone(&self.workspace));
        spawn_local(async move {
            if let Err(error) = use_case.execute(request).await {
                get_logger().warn(COMPONENT, &format!("backfill failed: {}", error));
            }
        });
    }
}
