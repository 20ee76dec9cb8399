use super::{CommittedLedger, EngineError, allocate_to_task};
use crate::calendar::BlockCalendar;
use crate::task::Task;
use crate::timemap::TimeMapSet;
use chrono::NaiveDateTime;

/// Exhaustive first-come allocation: tasks are ordered once by priority rank
/// and each one greedily fills its full remaining effort before the next is
/// considered. Tasks on the same time map never overlap because every
/// allocation goes through the shared ledger; tasks on different maps are
/// scheduled independently even when their wall-clock time coincides.
pub struct SequentialPass<'a> {
    time_maps: &'a TimeMapSet,
    calendar: &'a BlockCalendar,
}

impl<'a> SequentialPass<'a> {
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
    ) -> Result<(), EngineError> {
        let mut order: Vec<usize> = (0..tasks.len()).collect();
        order.sort_by_key(|&idx| (tasks[idx].priority_rank, tasks[idx].id));

        for idx in order {
            let task = &mut tasks[idx];
            let wanted = task.remaining_minutes;
            if wanted <= 0 {
                continue;
            }
            allocate_to_task(
                task,
                self.time_maps,
                self.calendar,
                ledger,
                now,
                horizon_days,
                wanted,
            )?;
            // anything still remaining is a feasibility outcome, not an error
        }
        Ok(())
    }
}
