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
fn chunks_never_exceed_min_block() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![task(1, 1, 600, "work")];

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Parallel,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    assert_eq!(tasks[0].remaining_minutes, 0);
    assert_eq!(total_minutes(&tasks[0].scheduled), 600);
    for chunk in &tasks[0].scheduled {
        assert!(chunk.minutes() <= 120, "chunk too large: {chunk:?}");
    }
}

#[test]
fn final_chunk_may_be_shorter() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![task(1, 1, 300, "work")];

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Parallel,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    // 5h in 2h chunks: 120 + 90 (window tail) + 30 + 60
    assert_eq!(total_minutes(&tasks[0].scheduled), 300);
    let last = tasks[0].scheduled.last().unwrap();
    assert!(last.minutes() <= 120);
}

#[test]
fn static_ranks_favor_the_highest_priority_task() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![task(1, 1, 240, "work"), task(2, 2, 120, "work")];

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Parallel,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    // task 1 finishes before task 2 receives anything
    assert_eq!(
        tasks[0].scheduled,
        vec![iv(6, (9, 0), (11, 0)), iv(6, (11, 0), (12, 30)), iv(6, (14, 0), (14, 30))]
    );
    assert_eq!(
        tasks[1].scheduled,
        vec![iv(6, (14, 30), (16, 30))]
    );
}

#[test]
fn rank_refresh_preempts_future_slots_only() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    // B: 10h at rank 1, C: 2h at rank 2, sharing the map
    let mut tasks = vec![task(1, 1, 600, "work"), task(2, 2, 120, "work")];

    // after the first round the caller raises C above B
    let mut calls = 0usize;
    let mut refresh = |task: &Task| -> i32 {
        calls += 1;
        if calls <= 2 {
            task.priority_rank
        } else if task.id == 2 {
            0
        } else {
            1
        }
    };

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Parallel,
        14,
        dt(6, 8, 0),
        Some(&mut refresh),
    )
    .unwrap();

    // round 1 gave B the first two hours; C then jumped the queue without
    // touching B's already committed slot
    assert_eq!(tasks[0].scheduled.first().unwrap(), &iv(6, (9, 0), (11, 0)));
    assert_eq!(
        tasks[1].scheduled,
        vec![iv(6, (11, 0), (12, 30)), iv(6, (14, 0), (14, 30))]
    );
    assert_eq!(tasks[1].remaining_minutes, 0);
    assert_eq!(tasks[0].remaining_minutes, 0);

    // B resumed after C's chunks
    assert_eq!(tasks[0].scheduled[1], iv(6, (14, 30), (16, 30)));
}

#[test]
fn shared_map_allocations_never_overlap() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![
        task(1, 1, 390, "work"),
        task(2, 1, 240, "work"),
        task(3, 2, 300, "work"),
    ];

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Parallel,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    let mut all: Vec<Interval> = tasks.iter().flat_map(|t| t.scheduled.clone()).collect();
    all.sort();
    for pair in all.windows(2) {
        assert!(pair[0].end <= pair[1].start, "overlap between {pair:?}");
    }
    for task in &tasks {
        assert_eq!(task.remaining_minutes, 0);
    }
}

#[test]
fn horizon_exhaustion_terminates_the_loop() {
    let mut windows = TimeMapConfig::new();
    windows.insert("monday".to_string(), vec![[9.0, 12.0]]);
    let mut config = TimeMapSetConfig::new();
    config.insert("narrow".to_string(), windows);
    let maps = TimeMapSet::from_config(&config).unwrap();
    let calendar = BlockCalendar::new();

    // only one Monday with 3h inside the horizon, 8h of work
    let mut tasks = vec![task(1, 1, 480, "narrow")];
    let results = run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Parallel,
        5,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    let result = &results[&1];
    assert_eq!(result.scheduled_start, Some(dt(6, 9, 0)));
    assert_eq!(result.completion_date, None);
    assert_eq!(total_minutes(&tasks[0].scheduled), 180);
    assert_eq!(tasks[0].remaining_minutes, 300);
}

#[test]
fn interleaving_respects_per_task_min_block() {
    let maps = work_maps();
    let calendar = BlockCalendar::new();
    let mut tasks = vec![
        {
            let mut t = task(1, 1, 180, "work");
            t.min_block_minutes = 60;
            t
        },
        task(2, 2, 120, "work"),
    ];

    run_allocation(
        &mut tasks,
        &maps,
        &calendar,
        Algorithm::Parallel,
        14,
        dt(6, 8, 0),
        None,
    )
    .unwrap();

    for chunk in &tasks[0].scheduled {
        assert!(chunk.minutes() <= 60);
    }
    assert_eq!(tasks[0].remaining_minutes, 0);
    assert_eq!(tasks[1].remaining_minutes, 0);
}
