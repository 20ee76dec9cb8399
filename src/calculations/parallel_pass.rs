use super::{CommittedLedger, EngineError, allocate_to_task};
use crate::calendar::BlockCalendar;
use crate::task::Task;
use crate::timemap::TimeMapSet;
use chrono::NaiveDateTime;

/// Round-robin allocation with per-round re-prioritization. Each round the
/// active set is re-sorted by rank and the single highest-priority task
/// receives one chunk of `min(min_block, remaining)` minutes. Rank is an
/// input refreshed once per round through the caller's hook; the engine
/// never computes urgency itself. Time committed in earlier rounds is never
/// revisited, so a rank change only redirects future slots.
pub struct ParallelPass<'a> {
    time_maps: &'a TimeMapSet,
    calendar: &'a BlockCalendar,
}

impl<'a> ParallelPass<'a> {
    pub fn new(time_maps: &'a TimeMapSet, calendar: &'a BlockCalendar) -> Self {
        Self {
            time_maps,
            calendar,
        }
    }

    pub fn execute(
        &self,
        tasks: &mut [Task],
        now: NaiveDateTime,
        horizon_days: u32,
        ledger: &mut CommittedLedger,
        mut rank_refresh: Option<&mut dyn FnMut(&Task) -> i32>,
    ) -> Result<(), EngineError> {
        let mut active: Vec<usize> = (0..tasks.len())
            .filter(|&idx| tasks[idx].remaining_minutes > 0)
            .collect();

        while !active.is_empty() {
            if let Some(refresh) = rank_refresh.as_mut() {
                for &idx in &active {
                    let rank = refresh(&tasks[idx]);
                    tasks[idx].priority_rank = rank;
                }
            }
            active.sort_by_key(|&idx| (tasks[idx].priority_rank, tasks[idx].id));

            let idx = active[0];
            let task = &mut tasks[idx];
            let chunk = task.min_block_minutes.min(task.remaining_minutes);
            let consumed = allocate_to_task(
                task,
                self.time_maps,
                self.calendar,
                ledger,
                now,
                horizon_days,
                chunk,
            )?;

            if consumed == 0 {
                // horizon exhausted for this task; it stays incomplete
                active.remove(0);
                continue;
            }
            if tasks[idx].remaining_minutes == 0 {
                active.retain(|&i| i != idx);
            }
        }
        Ok(())
    }
}
