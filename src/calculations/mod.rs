pub mod parallel_pass;
pub mod projection;
pub mod sequential_pass;

use crate::availability::Availability;
use crate::calendar::BlockCalendar;
use crate::interval::{self, Interval};
use crate::task::Task;
use crate::timemap::TimeMapSet;
use chrono::NaiveDateTime;
use projection::ScheduleResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Fill each task's full remaining effort in fixed priority order.
    Sequential,
    /// Interleave tasks one chunk at a time, re-sorting by rank every round.
    Parallel,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sequential => "sequential",
            Algorithm::Parallel => "parallel",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "sequential" => Some(Algorithm::Sequential),
            "parallel" => Some(Algorithm::Parallel),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the engine's own invariants. These indicate a logic defect,
/// never a data problem, and abort the run.
#[derive(Debug, Clone)]
pub enum EngineError {
    UnknownTimeMap {
        task_id: i32,
        name: String,
    },
    DoubleBooked {
        time_map: String,
        interval: Interval,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownTimeMap { task_id, name } => {
                write!(f, "task {task_id} references unresolved time map '{name}'")
            }
            EngineError::DoubleBooked { time_map, interval } => write!(
                f,
                "double-booked interval {} .. {} on time map '{}'",
                interval.start, interval.end, time_map
            ),
        }
    }
}

impl std::error::Error for EngineError {}

/// Time already handed out, per time map. Every allocation is checked and
/// recorded here so that no two tasks sharing a map can claim overlapping
/// time, regardless of which pass produced the allocation.
#[derive(Debug, Clone, Default)]
pub struct CommittedLedger {
    committed: HashMap<String, Vec<Interval>>,
}

impl CommittedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed intervals for a map, sorted and non-overlapping.
    pub fn for_map(&self, name: &str) -> &[Interval] {
        self.committed.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Record an allocation. Overlap with previously committed time on the
    /// same map is a fatal invariant violation.
    pub fn commit(&mut self, name: &str, interval: Interval) -> Result<(), EngineError> {
        let slots = self.committed.entry(name.to_string()).or_default();
        let idx = slots.partition_point(|existing| existing.end <= interval.start);
        if let Some(next) = slots.get(idx) {
            if next.start < interval.end {
                return Err(EngineError::DoubleBooked {
                    time_map: name.to_string(),
                    interval,
                });
            }
        }
        slots.insert(idx, interval);
        if idx + 1 < slots.len() && slots[idx].end == slots[idx + 1].start {
            slots[idx].end = slots[idx + 1].end;
            slots.remove(idx + 1);
        }
        if idx > 0 && slots[idx - 1].end == slots[idx].start {
            slots[idx - 1].end = slots[idx].end;
            slots.remove(idx);
        }
        Ok(())
    }
}

/// Give `task` up to `minutes` of its resolved availability, starting no
/// earlier than `now` (or the task's wait instant). Consumed chunks are
/// committed to the ledger and appended to the task's schedule. Returns the
/// minutes actually consumed, which may be zero when the horizon is spent.
pub(crate) fn allocate_to_task(
    task: &mut Task,
    time_maps: &TimeMapSet,
    calendar: &BlockCalendar,
    ledger: &mut CommittedLedger,
    now: NaiveDateTime,
    horizon_days: u32,
    minutes: i64,
) -> Result<i64, EngineError> {
    let map_name = task.time_map.clone().ok_or_else(|| EngineError::UnknownTimeMap {
        task_id: task.id,
        name: String::new(),
    })?;
    let map = time_maps
        .get(&map_name)
        .ok_or_else(|| EngineError::UnknownTimeMap {
            task_id: task.id,
            name: map_name.clone(),
        })?;

    let from = match task.wait {
        Some(wait) if wait > now => wait,
        _ => now,
    };

    let availability = Availability::new(map, calendar, ledger.for_map(&map_name), from, horizon_days);
    let (chunks, unmet) = interval::take_from_iter(availability.iter(), minutes);
    for chunk in &chunks {
        ledger.commit(&map_name, *chunk)?;
    }
    task.scheduled.extend(chunks);
    task.scheduled.sort();
    let consumed = minutes - unmet;
    task.remaining_minutes -= consumed;
    Ok(consumed)
}

/// Engine entry point. Tasks must already be screened: every task carries a
/// resolvable time map and positive remaining effort. The result map holds
/// one entry per task the engine visited; callers keep opt-outs out of it.
pub fn run_allocation(
    tasks: &mut [Task],
    time_maps: &TimeMapSet,
    calendar: &BlockCalendar,
    algorithm: Algorithm,
    horizon_days: u32,
    now: NaiveDateTime,
    rank_refresh: Option<&mut dyn FnMut(&Task) -> i32>,
) -> Result<HashMap<i32, ScheduleResult>, EngineError> {
    let mut ledger = CommittedLedger::new();
    match algorithm {
        Algorithm::Sequential => sequential_pass::SequentialPass::new(time_maps, calendar)
            .execute(tasks, now, horizon_days, &mut ledger)?,
        Algorithm::Parallel => parallel_pass::ParallelPass::new(time_maps, calendar).execute(
            tasks,
            now,
            horizon_days,
            &mut ledger,
            rank_refresh,
        )?,
    }

    Ok(tasks
        .iter()
        .map(|task| (task.id, projection::project(task)))
        .collect())
}
