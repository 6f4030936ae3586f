use crate::domain::chart::{PaneId, SeriesId};
use crate::domain::drawing::DrawingId;
use crate::domain::market_data::TimeInterval;
use serde::Serialize;

/// What changed on the chart, queued for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartEvent {
    LayoutChanged { panes: usize, series: usize },
    PaneRemoved { pane: PaneId },
    SeriesDataUpdated { series: SeriesId, points: usize, dropped: usize },
    BackfillApplied { series: SeriesId, prepended: usize },
    DataUnavailable { series: SeriesId },
    FetchFailed { series: SeriesId, reason: String },
    DrawingCommitted { pane: PaneId, drawing: DrawingId },
    DrawingRemoved { pane: PaneId, drawing: DrawingId },
    TimeframeChanged { timeframe: TimeInterval },
}

pub trait EventDispatcher {
    fn publish_chart_event(&self, event: ChartEvent);
}

/// Synchronous fan-out to registered handlers.
#[derive(Default)]
pub struct InMemoryEventDispatcher {
    chart_handlers: Vec<Box<dyn Fn(&ChartEvent)>>,
}

impl InMemoryEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_to_chart_events<F>(&mut self, handler: F)
    where
        F: Fn(&ChartEvent) + 'static,
    {
        self.chart_handlers.push(Box::new(handler));
    }
}

impl EventDispatcher for InMemoryEventDispatcher {
    fn publish_chart_event(&self, event: ChartEvent) {
        for handler in &self.chart_handlers {
            handler(&event);
        }
    }
}
