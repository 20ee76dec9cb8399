use crate::interval::Interval;
use crate::task::Task;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Projected outcome for one task. Derived from final task state only;
/// re-projecting unchanged state yields an identical result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Start of the first allocated interval; `None` when nothing could be
    /// scheduled within the horizon.
    pub scheduled_start: Option<NaiveDateTime>,
    /// End of the last allocated interval, only when the task's effort was
    /// fully consumed. A started-but-unfinished task keeps `None` here,
    /// which distinguishes horizon exhaustion from "not yet attempted".
    pub completion_date: Option<NaiveDateTime>,
    pub is_late: bool,
}

pub fn project(task: &Task) -> ScheduleResult {
    let scheduled_start = task.scheduled.first().map(|iv| iv.start);
    let completion_date = if task.remaining_minutes == 0 {
        task.scheduled.last().map(|iv| iv.end)
    } else {
        None
    };
    let is_late = match task.due {
        Some(due) => completion_date.map_or(true, |completed| completed > due),
        None => false,
    };
    ScheduleResult {
        scheduled_start,
        completion_date,
        is_late,
    }
}

/// Per-day breakdown of allocated hours, one line per day, e.g.
/// `2025-01-06: 2.00 hours`.
pub fn scheduling_note(intervals: &[Interval]) -> Option<String> {
    if intervals.is_empty() {
        return None;
    }
    let mut per_day: BTreeMap<chrono::NaiveDate, i64> = BTreeMap::new();
    for iv in intervals {
        *per_day.entry(iv.start.date()).or_default() += iv.minutes();
    }
    let note = per_day
        .into_iter()
        .map(|(date, minutes)| format!("{}: {:.2} hours", date, minutes as f64 / 60.0))
        .collect::<Vec<_>>()
        .join("\n");
    Some(note)
}
