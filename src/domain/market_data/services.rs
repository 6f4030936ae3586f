use super::entities::{Candidate, DataPoint};
use super::value_objects::TimeKey;
use std::collections::BTreeMap;

/// Result of one merge: the clean series and how many rows were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub points: Vec<DataPoint>,
    pub dropped: usize,
}

/// Result of prepending a historical page.
#[derive(Debug, Clone, PartialEq)]
pub struct Backfilled {
    pub points: Vec<DataPoint>,
    /// New points older than the previous earliest point.
    pub prepended: usize,
    pub dropped: usize,
}

/// Stateless merging of timed point arrays.
pub struct SeriesReconciler;

impl SeriesReconciler {
    /// Validates, dedupes by time key and sorts ascending.
    ///
    /// `secondary` is inserted first and `primary` second, so on a key
    /// collision the primary point is the one kept.
    pub fn merge<P, S>(primary: &[P], secondary: &[S]) -> Reconciled
    where
        P: Candidate,
        S: Candidate,
    {
        let mut by_time: BTreeMap<TimeKey, DataPoint> = BTreeMap::new();
        let mut dropped = 0;

        for candidate in secondary.iter().map(Candidate::validated) {
            match candidate {
                Some(point) => {
                    by_time.insert(point.time, point);
                }
                None => dropped += 1,
            }
        }
        for candidate in primary.iter().map(Candidate::validated) {
            match candidate {
                Some(point) => {
                    by_time.insert(point.time, point);
                }
                None => dropped += 1,
            }
        }

        Reconciled { points: by_time.into_values().collect(), dropped }
    }

    /// Folds live rows into the tail. The live rows win.
    pub fn apply_tick<T: Candidate>(existing: &[DataPoint], tick: &[T]) -> Reconciled {
        Self::merge(tick, existing)
    }

    /// Folds an older page into the head. Existing points win.
    pub fn apply_backfill<T: Candidate>(existing: &[DataPoint], page: &[T]) -> Backfilled {
        let previous_earliest = existing.first().map(|point| point.time);
        let Reconciled { points, dropped } = Self::merge(existing, page);
        let prepended = match previous_earliest {
            Some(earliest) => points.iter().take_while(|point| point.time < earliest).count(),
            None => points.len(),
        };
        Backfilled { points, prepended, dropped }
    }

    /// Pads `overlay` with whitespace for every primary time before its first
    /// point, so both series share a timeline.
    pub fn align_to_primary(primary: &[DataPoint], overlay: &[DataPoint]) -> Vec<DataPoint> {
        let Some(first) = overlay.first().map(|point| point.time) else {
            return overlay.to_vec();
        };
        let padding = primary
            .iter()
            .take_while(|point| point.time < first)
            .map(|point| DataPoint::whitespace(point.time));
        padding.chain(overlay.iter().cloned()).collect()
    }

    /// Earliest non-placeholder time.
    pub fn earliest_time(points: &[DataPoint]) -> Option<TimeKey> {
        points.iter().find(|point| !point.is_whitespace()).map(|point| point.time)
    }
}
