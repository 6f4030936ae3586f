use super::config::ChartConfig;
use crate::domain::{
    chart::{
        Chart, LayoutView, MoveDirection, PaneId, ScaleId, ScaleOptions, ScaleRequest, Series, SeriesDraft,
        SeriesId, SeriesKind, StylePatch,
    },
    coordinates::{CoordinateMapper, DomainPoint, LogicalRange, PixelPoint, PriceScale, RangePreset, TimeScale},
    drawing::{Drawing, DrawingEngine, Interaction, Shape, TextPrompt, Tool},
    events::{ChartEvent, EventDispatcher, InMemoryEventDispatcher},
    logging::{get_logger, LogComponent},
    market_data::{DataPoint, DataQuery, RawPoint, SeriesReconciler, SeriesSource, TimeInterval},
    strategy::{BacktestEngine, BacktestReport, StrategyDefinition},
};
use serde::Serialize;
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::Arc;

const COMPONENT: LogComponent = LogComponent::Application("ChartWorkspace");

/// Where a visible-range change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeChangeOrigin {
    Scroll,
    Zoom,
    Resize,
    DrawingDrag,
}

/// Per-series load status shown by the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    NoData,
    Failed(String),
}

/// Single in-flight flag for backfill requests.
#[derive(Debug, Clone, Default)]
pub struct BackfillGuard {
    in_flight: Rc<Cell<bool>>,
}

impl BackfillGuard {
    pub fn try_acquire(&self) -> Option<BackfillTicket> {
        if self.in_flight.replace(true) {
            return None;
        }
        Some(BackfillTicket { flag: Rc::clone(&self.in_flight) })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }
}

/// Clears the in-flight flag when dropped, whatever the fetch outcome.
#[derive(Debug)]
pub struct BackfillTicket {
    flag: Rc<Cell<bool>>,
}

impl Drop for BackfillTicket {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// An older page to fetch for the reference series.
#[derive(Debug)]
pub struct BackfillRequest {
    pub series: SeriesId,
    pub query: DataQuery,
    pub ticket: BackfillTicket,
}

/// Result of merging a data response into a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MergeSummary {
    pub points: usize,
    pub dropped: usize,
    pub prepended: usize,
}

/// Everything one chart surface needs between host events: the layout
/// snapshot, drawings, the horizontal viewport and data bookkeeping.
pub struct ChartWorkspace {
    config: ChartConfig,
    chart: Chart,
    drawings: DrawingEngine,
    time_scale: TimeScale,
    load_states: BTreeMap<SeriesId, LoadState>,
    exhausted: BTreeSet<SeriesId>,
    equity_series: Option<SeriesId>,
    backfill: BackfillGuard,
    events: InMemoryEventDispatcher,
}

impl ChartWorkspace {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            drawings: DrawingEngine::new(config.hit_tolerance),
            time_scale: config.time_scale(),
            chart: Chart::new(),
            load_states: BTreeMap::new(),
            exhausted: BTreeSet::new(),
            equity_series: None,
            backfill: BackfillGuard::default(),
            events: InMemoryEventDispatcher::new(),
            config,
        }
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn drawings(&self) -> &DrawingEngine {
        &self.drawings
    }

    pub fn time_scale(&self) -> &TimeScale {
        &self.time_scale
    }

    pub fn events_mut(&mut self) -> &mut InMemoryEventDispatcher {
        &mut self.events
    }

    pub fn backfill_guard(&self) -> &BackfillGuard {
        &self.backfill
    }

    pub fn load_state(&self, series: SeriesId) -> LoadState {
        self.load_states.get(&series).cloned().unwrap_or(LoadState::Idle)
    }

    pub fn layout_view(&self) -> LayoutView {
        self.chart.view()
    }

    pub fn series_points(&self, series: SeriesId) -> &[DataPoint] {
        self.chart.series(series).map(|s| s.points.as_slice()).unwrap_or(&[])
    }

    /// Series whose bars define the shared time axis: the primary of the
    /// first pane that has one.
    pub fn reference_series(&self) -> Option<&Series> {
        self.chart.pane_ids().iter().find_map(|pane| self.chart.primary_of(*pane))
    }

    fn reference_points(&self) -> Arc<Vec<DataPoint>> {
        self.reference_series().map(|series| Arc::clone(&series.points)).unwrap_or_default()
    }

    fn nominal_step(&self) -> f64 {
        self.config.timeframe.duration_secs() as f64
    }

    // ---- layout -------------------------------------------------------

    fn replace_chart(&mut self, next: Chart) {
        if next == self.chart {
            return;
        }
        let removed_panes: Vec<PaneId> =
            self.chart.pane_ids().iter().copied().filter(|pane| next.pane(*pane).is_none()).collect();
        let removed_series: Vec<SeriesId> =
            self.chart.all_series().map(|s| s.id).filter(|id| next.series(*id).is_none()).collect();

        self.chart = next;
        for pane in removed_panes {
            self.drawings.remove_pane_drawings(pane);
            self.events.publish_chart_event(ChartEvent::PaneRemoved { pane });
        }
        for series in removed_series {
            self.load_states.remove(&series);
            self.exhausted.remove(&series);
            if self.equity_series == Some(series) {
                self.equity_series = None;
            }
        }
        self.events.publish_chart_event(ChartEvent::LayoutChanged {
            panes: self.chart.pane_count(),
            series: self.chart.series_count(),
        });
    }

    pub fn add_series(&mut self, draft: SeriesDraft, target: Option<PaneId>) -> Option<SeriesId> {
        let (next, id) = self.chart.add_series(draft, target);
        self.replace_chart(next);
        if let Some(id) = id {
            self.load_states.insert(id, LoadState::Idle);
        }
        id
    }

    pub fn move_series(&mut self, series: SeriesId, direction: MoveDirection) {
        let next = self.chart.move_series(series, direction);
        self.replace_chart(next);
    }

    pub fn remove_series(&mut self, series: SeriesId) {
        let next = self.chart.remove_series(series);
        self.replace_chart(next);
    }

    pub fn change_series_scale(&mut self, series: SeriesId, request: ScaleRequest) {
        let next = self.chart.change_series_scale(series, request);
        self.replace_chart(next);
    }

    pub fn set_pane_height(&mut self, pane: PaneId, weight: f64) {
        let next = self.chart.set_pane_height(pane, weight);
        self.replace_chart(next);
    }

    pub fn move_pane(&mut self, pane: PaneId, direction: MoveDirection) {
        let next = self.chart.move_pane(pane, direction);
        self.replace_chart(next);
    }

    pub fn update_series_style(&mut self, series: SeriesId, patch: &StylePatch) {
        let next = self.chart.update_series_style(series, patch);
        self.replace_chart(next);
    }

    pub fn set_scale_options(&mut self, scale: ScaleId, options: ScaleOptions) {
        let next = self.chart.set_scale_options(scale, options);
        self.replace_chart(next);
    }

    // ---- viewport -----------------------------------------------------

    /// Pixel height of a pane, splitting the chart height by weight.
    pub fn pane_height_px(&self, pane: PaneId) -> Option<f64> {
        let total: f64 = self.chart.panes().map(|p| p.height).sum();
        let own = self.chart.pane(pane)?.height;
        if total <= 0.0 {
            return None;
        }
        Some(self.config.height_px * own / total)
    }

    /// Time span currently on screen, in UTC seconds.
    pub fn visible_time_window(&self) -> Option<(f64, f64)> {
        let reference = self.reference_points();
        let mapper = CoordinateMapper::new(&reference, self.nominal_step(), &self.time_scale, None);
        let range = self.time_scale.visible_logical_range();
        Some((mapper.logical_to_time(range.from)?, mapper.logical_to_time(range.to)?))
    }

    /// Price axis of the pane's primary scale binding. Autoscaled bindings
    /// fit the visible bars, the others fit all loaded bars.
    pub fn price_scale_for(&self, pane: PaneId) -> Option<PriceScale> {
        let height = self.pane_height_px(pane)?;
        let Some(primary) = self.chart.primary_of(pane) else {
            return Some(PriceScale::new(0.0, 1.0, height, &ScaleOptions::default()));
        };
        let options = self.chart.scale_options(primary.scale);
        let window = if options.auto_scale { self.visible_time_window() } else { None };
        let in_window = |point: &DataPoint| {
            window.is_none_or(|(from, to)| (from..=to).contains(&point.time.as_f64()))
        };

        let extents: Vec<(f64, f64)> = self
            .chart
            .series_in(pane)
            .into_iter()
            .filter(|series| series.scale == primary.scale)
            .flat_map(|series| series.points.iter().filter(|p| in_window(p)).filter_map(DataPoint::extent))
            .collect();
        PriceScale::autoscale(extents, height, &options)
            .or_else(|| Some(PriceScale::new(0.0, 1.0, height, &options)))
    }

    /// Runs `f` with the coordinate mapper of `pane`.
    pub fn with_mapper<R>(&self, pane: PaneId, f: impl FnOnce(&CoordinateMapper<'_>) -> R) -> R {
        let reference = self.reference_points();
        let price_scale = self.price_scale_for(pane);
        let mapper = CoordinateMapper::new(&reference, self.nominal_step(), &self.time_scale, price_scale.as_ref());
        f(&mapper)
    }

    pub fn to_pixel(&self, pane: PaneId, point: DomainPoint) -> Option<PixelPoint> {
        self.with_mapper(pane, |mapper| mapper.domain_to_pixel(point))
    }

    pub fn to_domain(&self, pane: PaneId, pixel: PixelPoint) -> Option<DomainPoint> {
        self.with_mapper(pane, |mapper| mapper.pixel_to_domain(pixel))
    }

    pub fn visible_range(&self) -> LogicalRange {
        self.time_scale.visible_logical_range()
    }

    pub fn set_visible_range(&mut self, range: LogicalRange) -> Option<BackfillRequest> {
        self.time_scale.set_visible_logical_range(range);
        self.on_visible_range_changed(RangeChangeOrigin::Scroll)
    }

    pub fn pan(&mut self, delta_px: f64) -> Option<BackfillRequest> {
        self.time_scale.pan(delta_px);
        self.on_visible_range_changed(RangeChangeOrigin::Scroll)
    }

    pub fn zoom(&mut self, delta_spacing: f64, cursor_ratio: f64) -> Option<BackfillRequest> {
        self.time_scale.zoom_at(delta_spacing, cursor_ratio);
        self.on_visible_range_changed(RangeChangeOrigin::Zoom)
    }

    pub fn resize(&mut self, width_px: f64, height_px: f64) -> Option<BackfillRequest> {
        self.time_scale.set_width(width_px);
        if width_px.is_finite() && width_px > 0.0 {
            self.config.width_px = width_px;
        }
        if height_px.is_finite() && height_px > 0.0 {
            self.config.height_px = height_px;
        }
        self.on_visible_range_changed(RangeChangeOrigin::Resize)
    }

    /// Shows a quick range ending at the latest reference bar. Ranges that
    /// reach past the loaded history ask for older bars.
    pub fn show_range(&mut self, preset: RangePreset) -> Option<BackfillRequest> {
        let reference = self.reference_points();
        let latest = reference.iter().rev().find(|point| !point.is_whitespace())?.time;
        let count = reference.len();
        match preset.start(latest) {
            None => self.time_scale.fit(count),
            Some(start) => {
                let mapper = CoordinateMapper::new(&reference, self.nominal_step(), &self.time_scale, None);
                let from = mapper.time_to_logical(start as f64)?.ceil() - 0.5;
                let to = count as f64 - 0.5;
                self.time_scale.set_visible_logical_range(LogicalRange::new(from.min(to - 1.0), to));
            }
        }
        get_logger().debug(COMPONENT, &format!("showing range {}", preset.as_ref()));
        self.on_visible_range_changed(RangeChangeOrigin::Zoom)
    }

    /// Decides whether the new visible range should fetch older bars.
    /// Changes caused by a drawing drag never do.
    pub fn on_visible_range_changed(&mut self, origin: RangeChangeOrigin) -> Option<BackfillRequest> {
        if origin == RangeChangeOrigin::DrawingDrag || self.drawings.is_dragging() {
            return None;
        }
        if self.time_scale.visible_logical_range().from > self.config.backfill_threshold_bars {
            return None;
        }
        let reference = self.reference_series()?;
        if self.exhausted.contains(&reference.id) || reference.source.query_value().is_none() {
            return None;
        }
        let earliest = SeriesReconciler::earliest_time(&reference.points)?;
        let query = DataQuery::page_before(
            reference.source.clone(),
            self.config.timeframe,
            earliest,
            self.config.backfill_page,
        );
        let series = reference.id;
        let ticket = self.backfill.try_acquire()?;
        get_logger().debug(COMPONENT, &format!("backfill before {} for {}", earliest.unix_seconds(), series));
        Some(BackfillRequest { series, query, ticket })
    }

    // ---- data ---------------------------------------------------------

    /// Query for the first load of a series, or `None` for derived series.
    pub fn history_query(&mut self, series: SeriesId) -> Option<DataQuery> {
        let source = self.chart.series(series)?.source.clone();
        source.query_value()?;
        self.load_states.insert(series, LoadState::Loading);
        Some(DataQuery::latest(source, self.config.timeframe).with_limit(self.config.history_limit))
    }

    /// Switches the bar interval. Every fetchable series drops its bars and
    /// reloads; the equity curve goes with the old bars. Returns the history
    /// queries to run, none when the interval is unchanged.
    pub fn set_timeframe(&mut self, timeframe: TimeInterval) -> Vec<(SeriesId, DataQuery)> {
        if self.config.timeframe == timeframe {
            return Vec::new();
        }
        get_logger().info(
            COMPONENT,
            &format!("timeframe {} -> {}", self.config.timeframe.as_ref(), timeframe.as_ref()),
        );
        self.config.timeframe = timeframe;
        if let Some(equity) = self.equity_series.take() {
            self.remove_series(equity);
        }

        let fetchable: Vec<SeriesId> = self
            .chart
            .all_series()
            .filter(|series| series.source.query_value().is_some())
            .map(|series| series.id)
            .collect();
        for series in &fetchable {
            self.chart = self.chart.set_series_data(*series, Arc::default()).set_series_markers(*series, Arc::default());
            self.exhausted.remove(series);
        }
        self.events.publish_chart_event(ChartEvent::TimeframeChanged { timeframe });
        fetchable.into_iter().filter_map(|series| Some((series, self.history_query(series)?))).collect()
    }

    /// Latest-bars queries for every loaded, fetchable series.
    pub fn poll_queries(&self) -> Vec<(SeriesId, DataQuery)> {
        self.chart
            .all_series()
            .filter(|series| self.load_state(series.id) == LoadState::Ready)
            .filter(|series| series.source.query_value().is_some())
            .map(|series| (series.id, DataQuery::latest(series.source.clone(), self.config.timeframe).with_limit(2)))
            .collect()
    }

    fn is_reference(&self, series: SeriesId) -> bool {
        self.reference_series().is_some_and(|reference| reference.id == series)
    }

    fn store_points(&mut self, series: SeriesId, points: Vec<DataPoint>) {
        let points = if self.is_reference(series) {
            points
        } else {
            let reference = self.reference_points();
            SeriesReconciler::align_to_primary(&reference, &strip_padding(&points))
        };
        let next = self.chart.set_series_data(series, Arc::new(points));
        self.chart = next;
    }

    /// Re-pads every overlay against the current reference timeline.
    fn realign_overlays(&mut self) {
        let Some(reference) = self.reference_series().map(|s| s.id) else {
            return;
        };
        let overlays: Vec<SeriesId> = self
            .chart
            .all_series()
            .filter(|s| s.id != reference && !s.points.is_empty())
            .map(|s| s.id)
            .collect();
        for overlay in overlays {
            let points = self.series_points(overlay).to_vec();
            self.store_points(overlay, points);
        }
    }

    fn report_drops(&self, series: SeriesId, dropped: usize) {
        if dropped > 0 {
            crate::log_warn!(COMPONENT, "dropped {} malformed points for {}", dropped, series);
        }
    }

    /// First load. Anything already present wins over the response, so a
    /// late answer cannot roll back newer ticks. The reference series fits
    /// the viewport to all content.
    pub fn apply_history(&mut self, series: SeriesId, rows: &[RawPoint]) -> Option<MergeSummary> {
        self.chart.series(series)?;
        let existing = strip_padding(self.series_points(series));
        let merged = SeriesReconciler::merge(&existing, rows);
        self.report_drops(series, merged.dropped);

        let count = merged.points.len();
        self.store_points(series, merged.points);
        self.load_states.insert(series, LoadState::Ready);
        if self.is_reference(series) {
            self.time_scale.fit(count);
            self.realign_overlays();
        }
        self.events.publish_chart_event(ChartEvent::SeriesDataUpdated { series, points: count, dropped: merged.dropped });
        Some(MergeSummary { points: count, dropped: merged.dropped, prepended: 0 })
    }

    /// Live rows into the tail; the viewport is left where the user had it.
    /// A late row older than the first bar shifts the reference range like
    /// a backfill would.
    pub fn apply_tick(&mut self, series: SeriesId, rows: &[RawPoint]) -> Option<MergeSummary> {
        self.chart.series(series)?;
        let range = self.time_scale.visible_logical_range();
        let existing = strip_padding(self.series_points(series));
        let earliest = SeriesReconciler::earliest_time(&existing);
        let merged = SeriesReconciler::apply_tick(&existing, rows);
        self.report_drops(series, merged.dropped);

        let count = merged.points.len();
        let prepended = match earliest {
            Some(earliest) => merged.points.iter().take_while(|point| point.time < earliest).count(),
            None => 0,
        };
        let reference = self.is_reference(series);
        self.store_points(series, merged.points);
        if reference {
            self.realign_overlays();
            self.time_scale.set_visible_logical_range(range.shifted(prepended as f64));
        } else {
            self.time_scale.set_visible_logical_range(range);
        }
        self.events.publish_chart_event(ChartEvent::SeriesDataUpdated { series, points: count, dropped: merged.dropped });
        Some(MergeSummary { points: count, dropped: merged.dropped, prepended })
    }

    /// Older rows into the head. For the reference series the visible
    /// range moves by the number of prepended bars, so the same bars stay
    /// on screen.
    pub fn apply_backfill(&mut self, series: SeriesId, rows: &[RawPoint]) -> Option<MergeSummary> {
        self.chart.series(series)?;
        let range = self.time_scale.visible_logical_range();
        let existing = strip_padding(self.series_points(series));
        let backfilled = SeriesReconciler::apply_backfill(&existing, rows);
        self.report_drops(series, backfilled.dropped);

        let count = backfilled.points.len();
        let prepended = backfilled.prepended;
        let reference = self.is_reference(series);
        self.store_points(series, backfilled.points);
        if reference {
            self.realign_overlays();
            self.time_scale.set_visible_logical_range(range.shifted(prepended as f64));
        } else {
            self.time_scale.set_visible_logical_range(range);
        }
        if prepended == 0 {
            self.exhausted.insert(series);
        }
        self.events.publish_chart_event(ChartEvent::BackfillApplied { series, prepended });
        Some(MergeSummary { points: count, dropped: backfilled.dropped, prepended })
    }

    pub fn mark_no_data(&mut self, series: SeriesId) {
        if self.series_points(series).is_empty() {
            self.load_states.insert(series, LoadState::NoData);
        }
        self.exhausted.insert(series);
        self.events.publish_chart_event(ChartEvent::DataUnavailable { series });
    }

    pub fn mark_failed(&mut self, series: SeriesId, reason: &str) {
        get_logger().error(COMPONENT, &format!("fetch for {} failed: {}", series, reason));
        if self.series_points(series).is_empty() {
            self.load_states.insert(series, LoadState::Failed(reason.to_string()));
        }
        self.events.publish_chart_event(ChartEvent::FetchFailed { series, reason: reason.to_string() });
    }

    // ---- strategy -----------------------------------------------------

    /// Runs a backtest over the reference series and shows its result.
    pub fn run_backtest<E: BacktestEngine>(
        &mut self,
        engine: &E,
        strategy: &StrategyDefinition,
    ) -> Option<SeriesId> {
        let primary = self.reference_points();
        let report = engine.run(&primary, strategy);
        self.apply_backtest(&report)
    }

    /// Signals become markers on the reference series; the equity curve
    /// replaces any previous one in a pane of its own.
    pub fn apply_backtest(&mut self, report: &BacktestReport) -> Option<SeriesId> {
        let reference = self.reference_series()?.id;
        self.chart = self.chart.set_series_markers(reference, Arc::new(report.markers()));

        if let Some(previous) = self.equity_series.take() {
            self.remove_series(previous);
        }
        let draft = SeriesDraft::new(SeriesSource::Derived("equity".to_string()), SeriesKind::Line).with_title("Equity");
        let equity = self.add_series(draft, None)?;
        let points = report.equity_points();
        let count = points.len();
        self.store_points(equity, points);
        self.load_states.insert(equity, LoadState::Ready);
        self.equity_series = Some(equity);
        self.events.publish_chart_event(ChartEvent::SeriesDataUpdated { series: equity, points: count, dropped: 0 });
        Some(equity)
    }

    // ---- drawings -----------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        self.drawings.set_tool(tool);
    }

    pub fn pointer_down(&mut self, pane: PaneId, pointer: PixelPoint, prompt: &mut dyn TextPrompt) -> Interaction {
        if self.chart.pane(pane).is_none() {
            return Interaction::Ignored;
        }
        let reference = self.reference_points();
        let price_scale = self.price_scale_for(pane);
        let mapper = CoordinateMapper::new(&reference, self.nominal_step(), &self.time_scale, price_scale.as_ref());
        let outcome = self.drawings.pointer_down(pane, pointer, &mapper, prompt);
        self.publish_interaction(pane, outcome);
        outcome
    }

    pub fn pointer_move(&mut self, pane: PaneId, pointer: PixelPoint, pressed: bool) -> bool {
        let reference = self.reference_points();
        let price_scale = self.price_scale_for(pane);
        let mapper = CoordinateMapper::new(&reference, self.nominal_step(), &self.time_scale, price_scale.as_ref());
        self.drawings.pointer_move(pane, pointer, &mapper, pressed)
    }

    pub fn pointer_up(&mut self) -> Interaction {
        let pane = self.drawings.session().map(|session| session.pane());
        let outcome = self.drawings.pointer_up();
        if let Some(pane) = pane {
            self.publish_interaction(pane, outcome);
        }
        outcome
    }

    pub fn cancel_drawing(&mut self) {
        self.drawings.cancel();
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.drawings.delete_selected() {
            Some((pane, drawing)) => {
                self.events.publish_chart_event(ChartEvent::DrawingRemoved { pane, drawing });
                true
            }
            None => false,
        }
    }

    pub fn clear_drawings(&mut self, pane: PaneId) -> usize {
        let removed = self.drawings.remove_pane_drawings(pane);
        for drawing in &removed {
            self.events.publish_chart_event(ChartEvent::DrawingRemoved { pane, drawing: drawing.id });
        }
        removed.len()
    }

    pub fn pane_drawings(&self, pane: PaneId) -> &[Drawing] {
        self.drawings.drawings(pane)
    }

    pub fn preview(&self) -> Option<(PaneId, Shape)> {
        self.drawings.preview()
    }

    fn publish_interaction(&self, pane: PaneId, outcome: Interaction) {
        let event = match outcome {
            Interaction::Committed { drawing } | Interaction::Updated { drawing } => {
                ChartEvent::DrawingCommitted { pane, drawing }
            }
            Interaction::Erased { drawing } => ChartEvent::DrawingRemoved { pane, drawing },
            _ => return,
        };
        self.events.publish_chart_event(event);
    }
}

/// Drops the leading whitespace an earlier alignment added.
fn strip_padding(points: &[DataPoint]) -> Vec<DataPoint> {
    points.iter().skip_while(|point| point.is_whitespace()).cloned().collect()
}
