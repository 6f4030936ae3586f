use super::chart_service::{BackfillRequest, ChartWorkspace, MergeSummary};
use crate::domain::{
    chart::SeriesId,
    errors::{AppResult, DataError},
    logging::{get_logger, LogComponent},
    market_data::{FetchOutcome, MarketDataRepository, TimeInterval},
};
use futures::future::join_all;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

pub type SharedWorkspace = Rc<RefCell<ChartWorkspace>>;

/// What a fetch did to the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "summary", rename_all = "snake_case")]
pub enum LoadOutcome {
    Merged(MergeSummary),
    NoData,
    /// Derived series have nothing to fetch.
    Skipped,
    /// The timeframe changed while the request was pending.
    Stale,
}

fn is_stale(workspace: &SharedWorkspace, timeframe: TimeInterval) -> bool {
    workspace.borrow().config().timeframe != timeframe
}

/// Use case: first load of a series from the data service.
///
/// The workspace is never borrowed across an await, so pointer events can
/// run while the request is pending.
pub struct LoadSeriesUseCase<R: MarketDataRepository> {
    repository: Rc<R>,
    workspace: SharedWorkspace,
}

impl<R: MarketDataRepository> LoadSeriesUseCase<R> {
    pub fn new(repository: Rc<R>, workspace: SharedWorkspace) -> Self {
        Self { repository, workspace }
    }

    pub async fn execute(&self, series: SeriesId) -> AppResult<LoadOutcome> {
        if self.workspace.borrow().chart().series(series).is_none() {
            return Err(DataError::UnknownSeries(series.value()).into());
        }
        let Some(query) = self.workspace.borrow_mut().history_query(series) else {
            return Ok(LoadOutcome::Skipped);
        };

        get_logger().info(
            LogComponent::Application("LoadSeries"),
            &format!("loading {} ({})", query.source.label(), query.timeframe.as_ref()),
        );

        let timeframe = query.timeframe;
        let response = self.repository.fetch(query).await;
        if is_stale(&self.workspace, timeframe) {
            return Ok(LoadOutcome::Stale);
        }
        match response {
            Ok(FetchOutcome::Data(rows)) => {
                // the series may have been removed while the request was pending
                let summary = self.workspace.borrow_mut().apply_history(series, &rows);
                Ok(summary.map_or(LoadOutcome::Skipped, LoadOutcome::Merged))
            }
            Ok(FetchOutcome::NoData) => {
                self.workspace.borrow_mut().mark_no_data(series);
                Ok(LoadOutcome::NoData)
            }
            Err(error) => {
                self.workspace.borrow_mut().mark_failed(series, &error.to_string());
                Err(error.into())
            }
        }
    }
}

/// Use case: fetch one older page for the reference series.
pub struct BackfillUseCase<R: MarketDataRepository> {
    repository: Rc<R>,
    workspace: SharedWorkspace,
}

impl<R: MarketDataRepository> BackfillUseCase<R> {
    pub fn new(repository: Rc<R>, workspace: SharedWorkspace) -> Self {
        Self { repository, workspace }
    }

    /// The request's ticket is held until the page is merged or the fetch
    /// fails, keeping a second backfill from starting meanwhile.
    pub async fn execute(&self, request: BackfillRequest) -> AppResult<LoadOutcome> {
        let BackfillRequest { series, query, ticket } = request;
        let timeframe = query.timeframe;
        let result = self.repository.fetch(query).await;
        let outcome = match result {
            _ if is_stale(&self.workspace, timeframe) => Ok(LoadOutcome::Stale),
            Ok(FetchOutcome::Data(rows)) => {
                let summary = self.workspace.borrow_mut().apply_backfill(series, &rows);
                Ok(summary.map_or(LoadOutcome::Skipped, LoadOutcome::Merged))
            }
            Ok(FetchOutcome::NoData) => {
                self.workspace.borrow_mut().mark_no_data(series);
                Ok(LoadOutcome::NoData)
            }
            Err(error) => {
                self.workspace.borrow_mut().mark_failed(series, &error.to_string());
                Err(error.into())
            }
        };
        drop(ticket);
        outcome
    }
}

/// Use case: one polling round over every loaded series.
pub struct PollLatestUseCase<R: MarketDataRepository> {
    repository: Rc<R>,
    workspace: SharedWorkspace,
}

impl<R: MarketDataRepository> PollLatestUseCase<R> {
    pub fn new(repository: Rc<R>, workspace: SharedWorkspace) -> Self {
        Self { repository, workspace }
    }

    /// Returns how many series received rows. Requests run concurrently;
    /// failures are reported on the workspace and do not stop the round.
    pub async fn execute(&self) -> usize {
        let queries = self.workspace.borrow().poll_queries();
        let responses = join_all(queries.into_iter().map(|(series, query)| async move {
            let timeframe = query.timeframe;
            (series, timeframe, self.repository.fetch(query).await)
        }))
        .await;

        let mut updated = 0;
        for (series, timeframe, response) in responses {
            if is_stale(&self.workspace, timeframe) {
                continue;
            }
            match response {
                Ok(FetchOutcome::Data(rows)) => {
                    if self.workspace.borrow_mut().apply_tick(series, &rows).is_some() {
                        updated += 1;
                    }
                }
                Ok(FetchOutcome::NoData) => {}
                Err(error) => self.workspace.borrow_mut().mark_failed(series, &error.to_string()),
            }
        }
        updated
    }
}
