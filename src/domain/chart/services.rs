use super::entities::Chart;
use super::value_objects::{PaneId, ScaleId, ScaleOptions, SeriesId, SeriesKind, SeriesStyle};
use derive_more::Display;
use serde::Serialize;
use std::collections::BTreeMap;

/// One broken floor rule.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize)]
pub enum LayoutIssue {
    #[display(fmt = "chart has no panes")]
    NoPanes,
    #[display(fmt = "{} is empty and not the anchor", _0)]
    EmptyPane(PaneId),
    #[display(fmt = "{} is not owned by any pane", _0)]
    OrphanSeries(SeriesId),
    #[display(fmt = "{} is owned more than once", _0)]
    SharedSeries(SeriesId),
    #[display(fmt = "{} lists unknown {}", pane, series)]
    DanglingSeries { pane: PaneId, series: SeriesId },
    #[display(fmt = "pane order and pane arena disagree")]
    OrderMismatch,
    #[display(fmt = "{} has a wrong primary flag", _0)]
    PrimaryMismatch(SeriesId),
    #[display(fmt = "{} is bound to unknown scale {}", series, scale)]
    UnknownScale { series: SeriesId, scale: ScaleId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvariantReport {
    pub issues: Vec<LayoutIssue>,
}

impl InvariantReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl Chart {
    /// Checks every floor rule on this snapshot.
    pub fn invariant_report(&self) -> InvariantReport {
        let mut issues = Vec::new();
        if self.order.is_empty() {
            issues.push(LayoutIssue::NoPanes);
        }

        let mut ordered: Vec<PaneId> = self.order.clone();
        ordered.sort();
        let known: Vec<PaneId> = self.panes.keys().copied().collect();
        if ordered != known {
            issues.push(LayoutIssue::OrderMismatch);
        }

        let mut owners: BTreeMap<SeriesId, usize> = BTreeMap::new();
        for (index, pane_id) in self.order.iter().enumerate() {
            let Some(pane) = self.panes.get(pane_id) else {
                continue;
            };
            if pane.series.is_empty() && index > 0 {
                issues.push(LayoutIssue::EmptyPane(*pane_id));
            }
            for (position, series_id) in pane.series.iter().enumerate() {
                *owners.entry(*series_id).or_default() += 1;
                match self.series.get(series_id) {
                    None => issues.push(LayoutIssue::DanglingSeries { pane: *pane_id, series: *series_id }),
                    Some(series) if series.is_primary != (position == 0) => {
                        issues.push(LayoutIssue::PrimaryMismatch(*series_id))
                    }
                    Some(_) => {}
                }
            }
        }

        for (id, series) in &self.series {
            match owners.get(id).copied().unwrap_or(0) {
                0 => issues.push(LayoutIssue::OrphanSeries(*id)),
                1 => {}
                _ => issues.push(LayoutIssue::SharedSeries(*id)),
            }
            if !self.knows_scale(series.scale) {
                issues.push(LayoutIssue::UnknownScale { series: *id, scale: series.scale });
            }
        }

        InvariantReport { issues }
    }

    /// Serializable picture of the layout, panes top to bottom.
    pub fn view(&self) -> LayoutView {
        let panes = self
            .panes()
            .map(|pane| PaneView {
                id: pane.id,
                height: pane.height,
                scales: self.scales_in(pane.id),
                series: self
                    .series_in(pane.id)
                    .into_iter()
                    .map(|series| SeriesView {
                        id: series.id,
                        title: series.title.clone(),
                        kind: series.kind,
                        scale: series.scale,
                        primary: series.is_primary,
                        points: series.points.len(),
                        plots: series.plots.clone(),
                        style: series.style.clone(),
                    })
                    .collect(),
            })
            .collect();
        let scales = self
            .scales
            .iter()
            .map(|(scale, options)| (scale.to_string(), *options))
            .collect();
        LayoutView { panes, scales }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub id: SeriesId,
    pub title: String,
    pub kind: SeriesKind,
    pub scale: ScaleId,
    pub primary: bool,
    pub points: usize,
    pub plots: Vec<String>,
    pub style: SeriesStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaneView {
    pub id: PaneId,
    pub height: f64,
    /// Price axes the pane draws.
    pub scales: Vec<ScaleId>,
    pub series: Vec<SeriesView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutView {
    pub panes: Vec<PaneView>,
    pub scales: BTreeMap<String, ScaleOptions>,
}
