use floor_chart_wasm::domain::chart::{
    Chart, Color, MoveDirection, PaneId, ScaleId, ScaleOptions, ScaleRequest, ScaleSide, SeriesDraft, SeriesId,
    SeriesKind, StylePatch,
};
use floor_chart_wasm::domain::market_data::{DataPoint, SeriesSource};
use std::sync::Arc;
use insta::{assert_json_snapshot, with_settings};
use quickcheck_macros::quickcheck;

fn draft(symbol: &str) -> SeriesDraft {
    SeriesDraft::new(SeriesSource::parse(symbol), SeriesKind::Candle)
}

fn add(chart: &Chart, symbol: &str, target: Option<PaneId>) -> (Chart, SeriesId) {
    let (next, id) = chart.add_series(draft(symbol), target);
    (next, id.expect("series added"))
}

/// Anchor holding `main` and `vol`, second pane holding `rsi`.
fn two_floors() -> (Chart, SeriesId, SeriesId, SeriesId) {
    let chart = Chart::new();
    let anchor = chart.anchor();
    let (chart, main) = add(&chart, "BTCUSDT", Some(anchor));
    let (chart, vol) = add(&chart, "VOL", Some(anchor));
    let (chart, rsi) = add(&chart, "RSI", None);
    (chart, main, vol, rsi)
}

fn pane_series(chart: &Chart, index: usize) -> Vec<SeriesId> {
    chart.pane(chart.pane_ids()[index]).map(|pane| pane.series.clone()).unwrap_or_default()
}

#[test]
fn new_chart_is_one_empty_anchor() {
    let chart = Chart::new();
    assert_eq!(chart.pane_count(), 1);
    assert_eq!(chart.series_count(), 0);
    assert!(chart.series_in(chart.anchor()).is_empty());
    assert!(chart.invariant_report().is_clean());
}

#[test]
fn first_series_in_pane_is_primary() {
    let (chart, main, vol, rsi) = two_floors();
    assert!(chart.series(main).unwrap().is_primary);
    assert!(!chart.series(vol).unwrap().is_primary);
    assert!(chart.series(rsi).unwrap().is_primary);
    assert_eq!(chart.pane_of(rsi), Some(chart.pane_ids()[1]));
}

#[test]
fn first_add_without_target_fills_the_empty_anchor() {
    let chart = Chart::new();
    let anchor = chart.anchor();
    let (chart, first) = chart.add_series(draft("ETHUSDT").with_scale(ScaleId::LeftDefault), None);
    let first = first.unwrap();
    assert_eq!(chart.pane_count(), 1);
    assert_eq!(chart.pane_of(first), Some(anchor));
    assert!(chart.series(first).unwrap().is_primary);
    assert_eq!(chart.series(first).unwrap().scale, ScaleId::RightDefault);
    assert!(chart.invariant_report().is_clean());
}

#[test]
fn later_adds_without_target_append_a_pane_on_default_scale() {
    let chart = Chart::new();
    let (chart, _) = add(&chart, "BTCUSDT", None);
    let (chart, second) = chart.add_series(draft("ETHUSDT").with_scale(ScaleId::LeftDefault), None);
    let second = second.unwrap();
    assert_eq!(chart.pane_count(), 2);
    assert_eq!(chart.pane_of(second), Some(chart.pane_ids()[1]));
    assert_eq!(chart.series(second).unwrap().scale, ScaleId::RightDefault);
}

#[test]
fn emptied_anchor_is_not_refilled_when_other_floors_exist() {
    let chart = Chart::new();
    let (chart, main) = add(&chart, "BTCUSDT", None);
    let (chart, _) = add(&chart, "RSI", None);
    let chart = chart.remove_series(main);
    assert!(chart.series_in(chart.anchor()).is_empty());

    let (chart, third) = add(&chart, "ETHUSDT", None);
    assert_eq!(chart.pane_count(), 3);
    assert_eq!(chart.pane_of(third), Some(chart.pane_ids()[2]));
}

#[test]
fn add_to_unknown_pane_is_rejected() {
    let chart = Chart::new();
    let (next, id) = chart.add_series(draft("BTCUSDT"), Some(PaneId::from(42)));
    assert_eq!(id, None);
    assert_eq!(next, chart);
}

#[test]
fn operations_leave_the_input_untouched() {
    let (chart, main, vol, _) = two_floors();
    let before = chart.clone();
    let _ = chart.move_series(vol, MoveDirection::Down);
    let _ = chart.remove_series(main);
    let _ = chart.change_series_scale(vol, ScaleRequest::NewLeft);
    assert_eq!(chart, before);
}

#[test]
fn move_into_neighbour_merges_and_prunes_empty_pane() {
    let (chart, main, vol, rsi) = two_floors();
    let next = chart.move_series(rsi, MoveDirection::Up);

    assert_eq!(next.pane_count(), 1);
    assert_eq!(pane_series(&next, 0), vec![main, vol, rsi]);
    assert!(!next.series(rsi).unwrap().is_primary);
    assert!(next.invariant_report().is_clean());
}

#[test]
fn move_down_without_neighbour_splits_new_last_pane() {
    let chart = Chart::new();
    let anchor = chart.anchor();
    let (chart, main) = add(&chart, "BTCUSDT", Some(anchor));
    let (chart, vol) = add(&chart, "VOL", Some(anchor));
    let chart = chart.change_series_scale(vol, ScaleRequest::NewLeft);

    let next = chart.move_series(vol, MoveDirection::Down);
    assert_eq!(next.pane_count(), 2);
    assert_eq!(pane_series(&next, 0), vec![main]);
    assert_eq!(pane_series(&next, 1), vec![vol]);
    assert!(next.series(vol).unwrap().is_primary);
    assert_eq!(next.series(vol).unwrap().scale, ScaleId::RightDefault);
}

#[test]
fn move_up_from_top_pane_splits_in_front() {
    let chart = Chart::new();
    let anchor = chart.anchor();
    let (chart, main) = add(&chart, "BTCUSDT", Some(anchor));
    let (chart, vol) = add(&chart, "VOL", Some(anchor));

    let next = chart.move_series(vol, MoveDirection::Up);
    assert_eq!(next.pane_count(), 2);
    assert_eq!(pane_series(&next, 0), vec![vol]);
    assert_eq!(pane_series(&next, 1), vec![main]);
    assert_eq!(next.pane_ids()[1], anchor);
}

#[test]
fn lone_series_at_edge_keeps_its_pane() {
    let (chart, _, _, rsi) = two_floors();
    let rsi_pane = chart.pane_of(rsi).unwrap();
    let chart = chart.change_series_scale(rsi, ScaleRequest::NewRight);

    let next = chart.move_series(rsi, MoveDirection::Down);
    assert_eq!(next.pane_count(), 2);
    assert_eq!(next.pane_of(rsi), Some(rsi_pane));
    assert_eq!(next.series(rsi).unwrap().scale, ScaleId::RightDefault);
}

#[test]
fn removing_last_series_prunes_pane_but_not_anchor() {
    let (chart, main, vol, rsi) = two_floors();
    let next = chart.remove_series(rsi);
    assert_eq!(next.pane_count(), 1);
    assert!(next.series(rsi).is_none());

    let emptied = next.remove_series(main).remove_series(vol);
    assert_eq!(emptied.pane_count(), 1);
    assert_eq!(emptied.series_count(), 0);
    assert!(emptied.invariant_report().is_clean());
}

#[test]
fn removing_primary_promotes_next_series() {
    let (chart, main, vol, _) = two_floors();
    let next = chart.remove_series(main);
    assert!(next.series(vol).unwrap().is_primary);
}

#[test]
fn new_scale_requests_mint_fresh_ids() {
    let (chart, main, vol, _) = two_floors();
    let chart = chart.change_series_scale(main, ScaleRequest::NewRight);
    let chart = chart.change_series_scale(vol, ScaleRequest::NewRight);
    let main_scale = chart.series(main).unwrap().scale;
    let vol_scale = chart.series(vol).unwrap().scale;

    assert_ne!(main_scale, vol_scale);
    assert_eq!(main_scale.side(), ScaleSide::Right);
    assert!(chart.knows_scale(main_scale));
    assert!(chart.knows_scale(vol_scale));
}

#[test]
fn binding_to_unknown_scale_is_a_noop() {
    let (chart, main, _, _) = two_floors();
    let ghost = ScaleId::Minted { side: ScaleSide::Left, id: 77 };
    let next = chart.change_series_scale(main, ScaleRequest::AssignExisting(ghost));
    assert_eq!(next, chart);

    let next = chart.change_series_scale(main, ScaleRequest::BindLeft);
    assert_eq!(next.series(main).unwrap().scale, ScaleId::LeftDefault);
}

#[test]
fn scale_requests_parse_from_strings() {
    assert_eq!(ScaleRequest::parse("new-left"), Some(ScaleRequest::NewLeft));
    assert_eq!(ScaleRequest::parse("bind-right"), Some(ScaleRequest::BindRight));
    assert_eq!(
        ScaleRequest::parse("right-3"),
        Some(ScaleRequest::AssignExisting(ScaleId::Minted { side: ScaleSide::Right, id: 3 }))
    );
    assert_eq!(ScaleRequest::parse("sideways"), None);
}

#[test]
fn unknown_ids_are_noops() {
    let (chart, _, _, _) = two_floors();
    let ghost = SeriesId::from(99);
    assert_eq!(chart.move_series(ghost, MoveDirection::Up), chart);
    assert_eq!(chart.remove_series(ghost), chart);
    assert_eq!(chart.move_pane(PaneId::from(99), MoveDirection::Down), chart);
}

#[test]
fn pane_height_rejects_bad_weights() {
    let (chart, _, _, _) = two_floors();
    let anchor = chart.anchor();
    assert_eq!(chart.set_pane_height(anchor, -1.0), chart);
    assert_eq!(chart.set_pane_height(anchor, f64::NAN), chart);
    let next = chart.set_pane_height(anchor, 3.0);
    assert_eq!(next.pane(anchor).unwrap().height, 3.0);
}

#[test]
fn move_pane_swaps_but_empty_anchor_stays_on_top() {
    let (chart, _, _, rsi) = two_floors();
    let rsi_pane = chart.pane_of(rsi).unwrap();
    let swapped = chart.move_pane(rsi_pane, MoveDirection::Up);
    assert_eq!(swapped.pane_ids()[0], rsi_pane);
    assert!(swapped.invariant_report().is_clean());

    let chart = Chart::new();
    let (chart, main) = add(&chart, "BTCUSDT", None);
    let (chart, lone) = add(&chart, "ETHUSDT", None);
    let chart = chart.remove_series(main);
    let lone_pane = chart.pane_of(lone).unwrap();
    assert_eq!(chart.pane_count(), 2);
    assert_eq!(chart.move_pane(lone_pane, MoveDirection::Up), chart);
}

#[test]
fn histogram_overlay_gets_a_volume_scale() {
    let chart = Chart::new();
    let anchor = chart.anchor();
    let (chart, main) = add(&chart, "BTCUSDT", Some(anchor));
    let volume = SeriesDraft::new(SeriesSource::parse("BTCUSDT"), SeriesKind::Histogram);
    let (chart, vol) = chart.add_series(volume, Some(anchor));
    let vol = vol.unwrap();

    let scale = chart.series(vol).unwrap().scale;
    assert!(matches!(scale, ScaleId::Minted { side: ScaleSide::Right, .. }));
    assert_eq!(chart.scale_options(scale), ScaleOptions::volume_overlay());
    assert_eq!(chart.series(main).unwrap().scale, ScaleId::RightDefault);

    let view = chart.view();
    assert_eq!(view.panes[0].scales, vec![ScaleId::RightDefault, scale]);
    assert!(chart.invariant_report().is_clean());
}

#[test]
fn histogram_alone_stays_on_the_default_scale() {
    let chart = Chart::new();
    let volume = SeriesDraft::new(SeriesSource::parse("BTCUSDT"), SeriesKind::Histogram);
    let (chart, vol) = chart.add_series(volume.clone(), Some(chart.anchor()));
    assert_eq!(chart.series(vol.unwrap()).unwrap().scale, ScaleId::RightDefault);

    // explicit bindings are kept as asked
    let (chart, left) = chart.add_series(volume.with_scale(ScaleId::LeftDefault), Some(chart.anchor()));
    assert_eq!(chart.series(left.unwrap()).unwrap().scale, ScaleId::LeftDefault);
}

#[test]
fn style_patches_only_take_hex_colours() {
    let patch: StylePatch = serde_json::from_str(r##"{"color": "#ABC", "line_width": 2}"##).unwrap();
    assert_eq!(patch.color, Color::parse("#abc"));
    assert_eq!(patch.color.map(|c| c.to_string()), Some("#abc".to_string()));

    assert!(serde_json::from_str::<StylePatch>(r#"{"color": "blue"}"#).is_err());
    assert!(serde_json::from_str::<StylePatch>(r##"{"plot_colors": ["#123456", "#12"]}"##).is_err());
}

#[test]
fn snapshots_sharing_point_buffers_compare_equal_without_reading_points() {
    let (chart, main, _, _) = two_floors();
    // NaN never equals itself, so only the shared buffer makes these equal
    let chart = chart.set_series_data(main, Arc::new(vec![DataPoint::value(0, f64::NAN)]));
    assert_eq!(chart.clone(), chart);

    let copied = chart.set_series_data(main, Arc::new(vec![DataPoint::value(0, f64::NAN)]));
    assert_ne!(copied, chart);
}

#[test]
fn layout_view_snapshot() {
    let (chart, _, vol, _) = two_floors();
    let chart = chart.change_series_scale(vol, ScaleRequest::NewLeft);
    let shape: Vec<(u64, Vec<(u64, bool, String)>)> = chart
        .view()
        .panes
        .into_iter()
        .map(|pane| {
            let series =
                pane.series.into_iter().map(|s| (s.id.value(), s.primary, s.scale.to_string())).collect();
            (pane.id.value(), series)
        })
        .collect();

    with_settings!({snapshot_path => "fixtures"}, {
        assert_json_snapshot!("layout_view", shape);
    });
}

/// One random edit, decoded from three bytes.
fn apply(chart: &Chart, (op, a, b): (u8, u8, u8)) -> Chart {
    let series: Vec<SeriesId> = chart.all_series().map(|s| s.id).collect();
    let panes = chart.pane_ids().to_vec();
    let pick_series = || series.get(a as usize % series.len().max(1)).copied();
    let pick_pane = panes[b as usize % panes.len()];
    let direction = if b % 2 == 0 { MoveDirection::Up } else { MoveDirection::Down };

    match op % 6 {
        0 => chart.add_series(draft("BTCUSDT"), if a % 2 == 0 { Some(pick_pane) } else { None }).0,
        1 => pick_series().map_or_else(|| chart.clone(), |id| chart.move_series(id, direction)),
        2 => pick_series().map_or_else(|| chart.clone(), |id| chart.remove_series(id)),
        3 => {
            let request = match b % 4 {
                0 => ScaleRequest::NewRight,
                1 => ScaleRequest::NewLeft,
                2 => ScaleRequest::BindLeft,
                _ => ScaleRequest::BindRight,
            };
            pick_series().map_or_else(|| chart.clone(), |id| chart.change_series_scale(id, request))
        }
        4 => chart.move_pane(pick_pane, direction),
        _ => chart.set_pane_height(pick_pane, a as f64 - 10.0),
    }
}

#[quickcheck]
fn floors_hold_after_any_edit_sequence(ops: Vec<(u8, u8, u8)>) -> bool {
    let mut chart = Chart::new();
    for op in ops {
        chart = apply(&chart, op);
        if !chart.invariant_report().is_clean() || chart.pane_count() == 0 {
            return false;
        }
    }
    true
}

#[quickcheck]
fn series_ids_are_never_reused(adds: u8, removals: Vec<u8>) -> bool {
    let mut chart = Chart::new();
    let mut seen = Vec::new();
    for (step, removal) in (0..adds % 20).zip(removals.iter().chain(std::iter::repeat(&0))) {
        let (next, id) = chart.add_series(draft("X"), None);
        let Some(id) = id else { return false };
        if seen.contains(&id) {
            return false;
        }
        seen.push(id);
        chart = if step % 2 == 0 { next.remove_series(seen[*removal as usize % seen.len()]) } else { next };
    }
    true
}
