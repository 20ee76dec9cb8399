use chrono::{NaiveDate, NaiveDateTime};
use forecast_tool::calendar::BlockCalendar;
use forecast_tool::interval::{Interval, total_minutes};
use forecast_tool::timemap::{TimeMapConfig, TimeMapSet, TimeMapSetConfig};
use forecast_tool::{Algorithm, Task, run_allocation};

fn dt(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn iv(day: u32, start: (u32, u32), end: (u32, u32)) -> Interval {
    Interval::new(dt(day, start.0, start.1), dt(day, end.0, end.1)).unwrap()
}

fn work_maps() -> TimeMapSet {
    let mut windows = TimeMapConfig::new();
    for day in ["monday", "tuesday", "wednesday", "thursday", "friday"] {
        windows.insert(day.to_string(), vec![[9.0, 12.5], [14.0, 17.0]]);
    }
    let mut config = TimeMapSetConfig::new();
    config.insert("work".to_string(), windows);
    TimeMapSet::from_config(&config).unwrap()
}

fn task(id: i32, rank: i32, minutes: i64, map: &str) -> Task {
    let mut task = Task::new(id, format!("task {id}"), minutes);
    task.priority_rank = rank;
    task.time_map = Some(map.to_string());
    task
}

#[test]
fn single_task_is_scheduled_into_the_first_window() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![{
        let mut t = task(1, 1, 120, "work");
        t.due = Some(dt(13, 0, 0)); // next Monday
        t
    }];

    let results = run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    assert_eq!(tasks[0].scheduled, vec![iv(6, (9, 0), (11, 0))]);
    assert_eq!(tasks[0].remaining_minutes, 0);

    let result = &results[&1];
    assert_eq!(result.scheduled_start, Some(dt(6, 9, 0)));
    assert_eq!(result.completion_date, Some(dt(6, 11, 0)));
    assert!(!result.is_late);
}

#[test]
fn later_tasks_on_the_same_map_start_after_earlier_ones() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![task(1, 1, 120, "work"), task(2, 2, 180, "work")];

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    assert_eq!(tasks[0].scheduled, vec![iv(6, (9, 0), (11, 0))]);
    // 90 minutes left in the morning window, the rest after lunch
    assert_eq!(
        tasks[1].scheduled,
        vec![iv(6, (11, 0), (12, 30)), iv(6, (14, 0), (15, 30))]
    );
}

#[test]
fn priority_rank_decides_order_not_position() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![task(1, 5, 60, "work"), task(2, 1, 60, "work")];

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    assert_eq!(tasks[1].scheduled, vec![iv(6, (9, 0), (10, 0))]);
    assert_eq!(tasks[0].scheduled, vec![iv(6, (10, 0), (11, 0))]);
}

#[test]
fn tasks_on_distinct_maps_do_not_block_each_other() {
    let mut windows = TimeMapConfig::new();
    windows.insert("monday".to_string(), vec![[9.0, 17.0]]);
    let mut config = TimeMapSetConfig::new();
    config.insert("work".to_string(), windows.clone());
    config.insert("personal".to_string(), windows);
    let maps = TimeMapSet::from_config(&config).unwrap();
    let calendar = BlockCalendar::new();

    let mut tasks = vec![task(1, 1, 120, "work"), task(2, 2, 120, "personal")];
    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    // same wall-clock time on both maps: template-scoped blocking only
    assert_eq!(tasks[0].scheduled, vec![iv(6, (9, 0), (11, 0))]);
    assert_eq!(tasks[1].scheduled, vec![iv(6, (9, 0), (11, 0))]);
}

#[test]
fn calendar_blocks_are_planned_around() {
    let maps = work_maps();
    let mut calendar = BlockCalendar::new();
    calendar.add_block(dt(6, 9, 0), dt(6, 12, 30));

    let mut tasks = vec![task(1, 1, 120, "work")];
    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    assert_eq!(tasks[0].scheduled, vec![iv(6, (14, 0), (16, 0))]);
}

#[test]
fn consumption_is_monotonic_and_contained() {
    let maps = work_maps();
    let mut calendar = BlockCalendar::new();
    calendar.add_block(dt(6, 10, 0), dt(6, 11, 0));
    calendar.add_block(dt(7, 9, 0), dt(7, 17, 0));

    let initial = [300, 420, 180];
    let mut tasks = vec![
        task(1, 1, initial[0], "work"),
        task(2, 2, initial[1], "work"),
        task(3, 3, initial[2], "work"),
    ];
    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    let map = maps.get("work").unwrap();
    for (task, &estimate) in tasks.iter().zip(initial.iter()) {
        assert_eq!(
            total_minutes(&task.scheduled),
            estimate - task.remaining_minutes
        );
        assert!(task.remaining_minutes >= 0);
        for chunk in &task.scheduled {
            assert!(calendar.is_clear(chunk), "chunk overlaps a calendar block");
            let windows = map.intervals_on(chunk.start.date());
            assert!(
                windows.iter().any(|window| window.contains(chunk)),
                "chunk {chunk:?} lies outside the time map windows"
            );
        }
    }

    // pairwise non-overlap across tasks sharing the map
    let mut all: Vec<Interval> = tasks.iter().flat_map(|t| t.scheduled.clone()).collect();
    all.sort();
    for pair in all.windows(2) {
        assert!(pair[0].end <= pair[1].start, "overlap between {pair:?}");
    }
}

#[test]
fn horizon_exhaustion_leaves_completion_unset() {
    // 3h per weekday, 40h of work, 5 days ahead: cannot finish
    let mut windows = TimeMapConfig::new();
    for day in ["monday", "tuesday", "wednesday", "thursday", "friday"] {
        windows.insert(day.to_string(), vec![[9.0, 12.0]]);
    }
    let mut config = TimeMapSetConfig::new();
    config.insert("work".to_string(), windows);
    let maps = TimeMapSet::from_config(&config).unwrap();
    let calendar = BlockCalendar::new();

    let mut tasks = vec![task(1, 1, 40 * 60, "work")];
    let results = run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        5,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    let result = &results[&1];
    assert_eq!(result.scheduled_start, Some(dt(6, 9, 0)));
    assert_eq!(result.completion_date, None);
    assert!(tasks[0].remaining_minutes > 0);
    // Mon..Fri within the inclusive horizon, 180 minutes each
    assert_eq!(total_minutes(&tasks[0].scheduled), 5 * 180);
}

#[test]
fn wait_date_defers_the_start() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![{
        let mut t = task(1, 1, 120, "work");
        t.wait = Some(dt(8, 0, 0)); // Wednesday
        t
    }];

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    assert_eq!(tasks[0].scheduled, vec![iv(8, (9, 0), (11, 0))]);
}

#[test]
fn due_date_violation_is_flagged() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![{
        let mut t = task(1, 1, 600, "work");
        t.due = Some(dt(6, 17, 0));
        t
    }];

    let results = run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Sequential,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    // 10h of work does not fit into Monday's 6.5h
    let result = &results[&1];
    assert_eq!(result.completion_date, Some(dt(7, 12, 30)));
    assert!(result.is_late);
}
