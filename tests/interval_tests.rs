use chrono::{NaiveDate, NaiveDateTime};
use forecast_tool::interval::{
    Interval, clip_to_day, first_minutes, normalize, subtract, total_minutes,
};

fn dt(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn iv(day: u32, start: (u32, u32), end: (u32, u32)) -> Interval {
    Interval::new(dt(day, start.0, start.1), dt(day, end.0, end.1)).unwrap()
}

#[test]
fn new_rejects_empty_and_inverted_spans() {
    assert!(Interval::new(dt(6, 9, 0), dt(6, 9, 0)).is_none());
    assert!(Interval::new(dt(6, 10, 0), dt(6, 9, 0)).is_none());
    assert!(Interval::new(dt(6, 9, 0), dt(6, 9, 1)).is_some());
}

#[test]
fn minutes_and_overlap() {
    let a = iv(6, (9, 0), (12, 30));
    assert_eq!(a.minutes(), 210);

    let b = iv(6, (12, 0), (13, 0));
    let c = iv(6, (12, 30), (13, 0));
    assert!(a.overlaps(&b));
    // half-open: touching intervals do not overlap
    assert!(!a.overlaps(&c));
}

#[test]
fn normalize_sorts_merges_and_drops_empties() {
    let merged = normalize(vec![
        iv(6, (14, 0), (17, 0)),
        iv(6, (9, 0), (11, 0)),
        iv(6, (10, 30), (12, 0)),
        iv(6, (12, 0), (12, 30)),
    ]);
    assert_eq!(
        merged,
        vec![iv(6, (9, 0), (12, 30)), iv(6, (14, 0), (17, 0))]
    );
}

#[test]
fn subtract_splits_straddled_intervals() {
    let free = vec![iv(6, (9, 0), (17, 0))];
    let blocks = vec![iv(6, (12, 0), (13, 0))];
    assert_eq!(
        subtract(&free, &blocks),
        vec![iv(6, (9, 0), (12, 0)), iv(6, (13, 0), (17, 0))]
    );
}

#[test]
fn subtract_drops_fully_covered_intervals() {
    let free = vec![iv(6, (10, 0), (11, 0)), iv(6, (14, 0), (15, 0))];
    let blocks = vec![iv(6, (9, 30), (11, 30))];
    assert_eq!(subtract(&free, &blocks), vec![iv(6, (14, 0), (15, 0))]);
}

#[test]
fn subtract_trims_partial_overlaps_without_zero_length_leftovers() {
    let free = vec![iv(6, (9, 0), (12, 0))];
    // block ends exactly at the free end: nothing may be emitted for the tail
    let blocks = vec![iv(6, (10, 0), (12, 0))];
    assert_eq!(subtract(&free, &blocks), vec![iv(6, (9, 0), (10, 0))]);

    let blocks = vec![iv(6, (8, 0), (9, 0))];
    assert_eq!(subtract(&free, &blocks), vec![iv(6, (9, 0), (12, 0))]);
}

#[test]
fn subtract_with_no_blocks_is_identity() {
    let free = vec![iv(6, (9, 0), (12, 0)), iv(6, (14, 0), (17, 0))];
    assert_eq!(subtract(&free, &[]), free);
}

#[test]
fn clip_to_day_bounds_multi_day_spans() {
    let span = Interval::new(dt(5, 22, 0), dt(7, 2, 0)).unwrap();
    let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
    assert_eq!(
        clip_to_day(&[span], day),
        vec![Interval::new(dt(6, 0, 0), dt(7, 0, 0)).unwrap()]
    );

    let outside = iv(8, (9, 0), (10, 0));
    assert!(clip_to_day(&[outside], day).is_empty());
}

#[test]
fn first_minutes_consumes_chronological_prefixes() {
    let set = vec![iv(6, (9, 0), (11, 0)), iv(6, (14, 0), (17, 0))];
    let (consumed, unmet) = first_minutes(&set, 180);
    assert_eq!(unmet, 0);
    assert_eq!(
        consumed,
        vec![iv(6, (9, 0), (11, 0)), iv(6, (14, 0), (15, 0))]
    );
}

#[test]
fn first_minutes_reports_shortage() {
    let set = vec![iv(6, (9, 0), (10, 0))];
    let (consumed, unmet) = first_minutes(&set, 180);
    assert_eq!(consumed, vec![iv(6, (9, 0), (10, 0))]);
    assert_eq!(unmet, 120);

    let (consumed, unmet) = first_minutes(&[], 60);
    assert!(consumed.is_empty());
    assert_eq!(unmet, 60);
}

#[test]
fn total_minutes_sums_the_set() {
    let set = vec![iv(6, (9, 0), (12, 30)), iv(6, (14, 0), (17, 0))];
    assert_eq!(total_minutes(&set), 390);
}
