use super::value_objects::{
    MoveDirection, PaneId, ScaleId, ScaleOptions, ScaleRequest, ScaleSide, SeriesId, SeriesKind,
    SeriesStyle, StylePatch,
};
use crate::domain::market_data::{DataPoint, SeriesSource};
use crate::domain::strategy::SeriesMarker;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_PANE_WEIGHT: f64 = 1.0;

/// Everything needed to create a series; the layout assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDraft {
    pub source: SeriesSource,
    pub kind: SeriesKind,
    pub title: String,
    pub plots: Vec<String>,
    pub style: SeriesStyle,
    pub scale: ScaleId,
}

impl SeriesDraft {
    pub fn new(source: SeriesSource, kind: SeriesKind) -> Self {
        Self {
            title: source.label().to_string(),
            source,
            kind,
            plots: Vec::new(),
            style: SeriesStyle::default(),
            scale: ScaleId::RightDefault,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_scale(mut self, scale: ScaleId) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_style(mut self, style: SeriesStyle) -> Self {
        self.style = style;
        self
    }

    /// Names of the sub-plots of a multi-plot series.
    pub fn with_plots<I, S>(mut self, plots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plots = plots.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,
    pub source: SeriesSource,
    pub kind: SeriesKind,
    pub title: String,
    pub plots: Vec<String>,
    pub style: SeriesStyle,
    pub scale: ScaleId,
    /// First series of its pane.
    pub is_primary: bool,
    #[serde(skip)]
    pub points: Arc<Vec<DataPoint>>,
    #[serde(skip)]
    pub markers: Arc<Vec<SeriesMarker>>,
}

/// Point and marker buffers are compared by pointer first. Snapshots derived
/// from one another share them, so comparing two layouts never walks the
/// bars unless the buffers were actually replaced.
impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.source == other.source
            && self.kind == other.kind
            && self.title == other.title
            && self.plots == other.plots
            && self.style == other.style
            && self.scale == other.scale
            && self.is_primary == other.is_primary
            && (Arc::ptr_eq(&self.points, &other.points) || self.points == other.points)
            && (Arc::ptr_eq(&self.markers, &other.markers) || self.markers == other.markers)
    }
}

impl Series {
    fn from_draft(id: SeriesId, draft: SeriesDraft) -> Self {
        Self {
            id,
            source: draft.source,
            kind: draft.kind,
            title: draft.title,
            plots: draft.plots,
            style: draft.style,
            scale: draft.scale,
            is_primary: false,
            points: Arc::new(Vec::new()),
            markers: Arc::new(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pane {
    pub id: PaneId,
    /// Relative height; panes share the chart height in proportion.
    pub height: f64,
    pub series: Vec<SeriesId>,
}

/// Immutable snapshot of the pane/series layout.
///
/// Panes and series live in id-keyed arenas; `order` is the vertical order
/// of panes. Every operation returns a new snapshot and leaves `self`
/// untouched. Unknown ids make an operation a no-op.
///
/// Floor rules kept by every operation: at least one pane exists, every
/// pane but the first holds a series, each series is owned by exactly one
/// pane, and the first series of a pane is its primary.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub(crate) order: Vec<PaneId>,
    pub(crate) panes: BTreeMap<PaneId, Pane>,
    pub(crate) series: BTreeMap<SeriesId, Series>,
    pub(crate) scales: BTreeMap<ScaleId, ScaleOptions>,
    pub(crate) next_pane: u64,
    pub(crate) next_series: u64,
    pub(crate) next_scale: u64,
}

impl Default for Chart {
    fn default() -> Self {
        Self::new()
    }
}

impl Chart {
    /// A chart with one empty anchor pane.
    pub fn new() -> Self {
        let mut chart = Self {
            order: Vec::new(),
            panes: BTreeMap::new(),
            series: BTreeMap::new(),
            scales: BTreeMap::from([
                (ScaleId::RightDefault, ScaleOptions::default()),
                (ScaleId::LeftDefault, ScaleOptions::default()),
            ]),
            next_pane: 1,
            next_series: 1,
            next_scale: 1,
        };
        let anchor = chart.mint_pane(Vec::new());
        chart.order.push(anchor);
        chart
    }

    // ---- queries ----

    pub fn pane_ids(&self) -> &[PaneId] {
        &self.order
    }

    pub fn panes(&self) -> impl Iterator<Item = &Pane> {
        self.order.iter().filter_map(|id| self.panes.get(id))
    }

    pub fn pane(&self, id: PaneId) -> Option<&Pane> {
        self.panes.get(&id)
    }

    pub fn pane_count(&self) -> usize {
        self.order.len()
    }

    pub fn anchor(&self) -> PaneId {
        self.order[0]
    }

    pub fn pane_index(&self, id: PaneId) -> Option<usize> {
        self.order.iter().position(|pane| *pane == id)
    }

    pub fn series(&self, id: SeriesId) -> Option<&Series> {
        self.series.get(&id)
    }

    pub fn all_series(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Series of a pane in stacking order.
    pub fn series_in(&self, pane: PaneId) -> Vec<&Series> {
        self.panes
            .get(&pane)
            .map(|pane| pane.series.iter().filter_map(|id| self.series.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn primary_of(&self, pane: PaneId) -> Option<&Series> {
        self.panes.get(&pane)?.series.first().and_then(|id| self.series.get(id))
    }

    /// Pane owning `series`.
    pub fn pane_of(&self, series: SeriesId) -> Option<PaneId> {
        self.order
            .iter()
            .copied()
            .find(|pane| self.panes.get(pane).is_some_and(|p| p.series.contains(&series)))
    }

    pub fn scale_options(&self, scale: ScaleId) -> ScaleOptions {
        self.scales.get(&scale).copied().unwrap_or_default()
    }

    pub fn knows_scale(&self, scale: ScaleId) -> bool {
        self.scales.contains_key(&scale)
    }

    /// Scale bindings referenced by the series of one pane.
    pub fn scales_in(&self, pane: PaneId) -> Vec<ScaleId> {
        let mut scales: Vec<ScaleId> = self.series_in(pane).iter().map(|s| s.scale).collect();
        scales.sort();
        scales.dedup();
        scales
    }

    // ---- operations ----

    /// Appends to `target`, or seats the series as primary of a new last pane.
    /// On a chart that is still one empty anchor the anchor is used instead.
    /// A histogram overlaid on a default-scaled pane gets its own volume
    /// scale along the bottom of the pane.
    pub fn add_series(&self, draft: SeriesDraft, target: Option<PaneId>) -> (Self, Option<SeriesId>) {
        if target.is_some_and(|pane| !self.panes.contains_key(&pane)) {
            return (self.clone(), None);
        }
        let mut next = self.clone();
        let id = SeriesId::from(next.next_series);
        next.next_series += 1;
        let mut series = Series::from_draft(id, draft);
        if !next.knows_scale(series.scale) {
            series.scale = ScaleId::RightDefault;
        }

        match target {
            Some(target) => {
                let overlay = next.panes.get(&target).is_some_and(|pane| !pane.series.is_empty());
                if overlay && series.kind == SeriesKind::Histogram && series.scale == ScaleId::RightDefault {
                    let scale = next.mint_scale(ScaleSide::Right);
                    next.scales.insert(scale, ScaleOptions::volume_overlay());
                    series.scale = scale;
                }
                if let Some(pane) = next.panes.get_mut(&target) {
                    pane.series.push(id);
                }
            }
            None => {
                series.scale = ScaleId::RightDefault;
                let anchor = next.anchor();
                let bare = next.order.len() == 1 && next.series_in(anchor).is_empty();
                match next.panes.get_mut(&anchor) {
                    // the first series of a fresh chart takes the anchor floor
                    Some(pane) if bare => pane.series.push(id),
                    _ => {
                        let pane = next.mint_pane(vec![id]);
                        next.order.push(pane);
                    }
                }
            }
        }
        next.series.insert(id, series);
        next.normalize_primaries();
        (next, Some(id))
    }

    /// Merges the series into the neighbouring pane, or splits it into a new
    /// pane at the matching edge when there is no neighbour.
    pub fn move_series(&self, id: SeriesId, direction: MoveDirection) -> Self {
        let Some(source) = self.pane_of(id) else {
            return self.clone();
        };
        let Some(index) = self.pane_index(source) else {
            return self.clone();
        };
        let neighbour = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|i| *i < self.order.len()),
        }
        .map(|i| self.order[i]);

        let mut next = self.clone();
        let alone = next.panes.get(&source).is_some_and(|pane| pane.series.len() == 1);

        match neighbour {
            Some(target) => {
                next.detach(source, id);
                if let Some(pane) = next.panes.get_mut(&target) {
                    pane.series.push(id);
                }
            }
            // Splitting a lone series off would recreate the same floor;
            // keep the pane (and its drawings) and only reset the scale.
            None if alone => {
                next.reset_scale(id);
            }
            None => {
                next.detach(source, id);
                next.reset_scale(id);
                let pane = next.mint_pane(vec![id]);
                match direction {
                    MoveDirection::Up => next.order.insert(0, pane),
                    MoveDirection::Down => next.order.push(pane),
                }
            }
        }

        let emptied = next.panes.get(&source).is_some_and(|pane| pane.series.is_empty());
        if emptied && next.order.len() > 1 {
            next.drop_pane(source);
        }
        next.normalize_primaries();
        next
    }

    /// Deletes the series; its pane goes too when emptied, unless it is the
    /// anchor.
    pub fn remove_series(&self, id: SeriesId) -> Self {
        let Some(pane) = self.pane_of(id) else {
            return self.clone();
        };
        let mut next = self.clone();
        next.detach(pane, id);
        next.series.remove(&id);
        let emptied = next.panes.get(&pane).is_some_and(|p| p.series.is_empty());
        if emptied && next.pane_index(pane) != Some(0) {
            next.drop_pane(pane);
        }
        next.normalize_primaries();
        next
    }

    pub fn change_series_scale(&self, id: SeriesId, request: ScaleRequest) -> Self {
        let Some(current) = self.series.get(&id).map(|s| s.scale) else {
            return self.clone();
        };
        let mut next = self.clone();
        let scale = match request {
            ScaleRequest::AssignExisting(scale) if self.knows_scale(scale) => scale,
            ScaleRequest::AssignExisting(_) => return next,
            ScaleRequest::BindRight => ScaleId::RightDefault,
            ScaleRequest::BindLeft => ScaleId::LeftDefault,
            ScaleRequest::NewRight => next.mint_scale(ScaleSide::Right),
            ScaleRequest::NewLeft => next.mint_scale(ScaleSide::Left),
        };
        if scale == current {
            return next;
        }
        if let Some(series) = next.series.get_mut(&id) {
            series.scale = scale;
        }
        next
    }

    /// Non-positive or non-finite weights are ignored.
    pub fn set_pane_height(&self, pane: PaneId, weight: f64) -> Self {
        let mut next = self.clone();
        if weight.is_finite() && weight > 0.0 {
            if let Some(pane) = next.panes.get_mut(&pane) {
                pane.height = weight;
            }
        }
        next
    }

    /// Swaps a pane with its neighbour. An empty anchor never leaves the top.
    pub fn move_pane(&self, pane: PaneId, direction: MoveDirection) -> Self {
        let mut next = self.clone();
        let Some(index) = self.pane_index(pane) else {
            return next;
        };
        let other = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|i| *i < self.order.len()),
        };
        let Some(other) = other else {
            return next;
        };
        let involves_empty = [index, other]
            .iter()
            .any(|i| self.panes.get(&self.order[*i]).is_some_and(|p| p.series.is_empty()));
        if involves_empty {
            return next;
        }
        next.order.swap(index, other);
        next
    }

    pub fn set_series_data(&self, id: SeriesId, points: Arc<Vec<DataPoint>>) -> Self {
        let mut next = self.clone();
        if let Some(series) = next.series.get_mut(&id) {
            series.points = points;
        }
        next
    }

    pub fn set_series_markers(&self, id: SeriesId, markers: Arc<Vec<SeriesMarker>>) -> Self {
        let mut next = self.clone();
        if let Some(series) = next.series.get_mut(&id) {
            series.markers = markers;
        }
        next
    }

    pub fn update_series_style(&self, id: SeriesId, patch: &StylePatch) -> Self {
        let mut next = self.clone();
        if let Some(series) = next.series.get_mut(&id) {
            series.style = series.style.patched(patch);
        }
        next
    }

    /// Options for a known binding; invalid margins are rejected.
    pub fn set_scale_options(&self, scale: ScaleId, options: ScaleOptions) -> Self {
        let mut next = self.clone();
        if options.is_valid() {
            if let Some(current) = next.scales.get_mut(&scale) {
                *current = options;
            }
        }
        next
    }

    // ---- internals ----

    fn mint_pane(&mut self, series: Vec<SeriesId>) -> PaneId {
        let id = PaneId::from(self.next_pane);
        self.next_pane += 1;
        self.panes.insert(id, Pane { id, height: DEFAULT_PANE_WEIGHT, series });
        id
    }

    fn mint_scale(&mut self, side: ScaleSide) -> ScaleId {
        let scale = ScaleId::Minted { side, id: self.next_scale };
        self.next_scale += 1;
        self.scales.insert(scale, ScaleOptions::default());
        scale
    }

    fn detach(&mut self, pane: PaneId, id: SeriesId) {
        if let Some(pane) = self.panes.get_mut(&pane) {
            pane.series.retain(|series| *series != id);
        }
    }

    fn drop_pane(&mut self, pane: PaneId) {
        self.order.retain(|id| *id != pane);
        self.panes.remove(&pane);
    }

    fn reset_scale(&mut self, id: SeriesId) {
        if let Some(series) = self.series.get_mut(&id) {
            series.scale = ScaleId::RightDefault;
        }
    }

    fn normalize_primaries(&mut self) {
        for pane in self.panes.values() {
            for (index, id) in pane.series.iter().enumerate() {
                if let Some(series) = self.series.get_mut(id) {
                    series.is_primary = index == 0;
                }
            }
        }
    }
}
