use crate::calendar::BlockCalendar;
use crate::interval::{self, Interval};
use crate::timemap::TimeMap;
use chrono::{Duration, NaiveDateTime};
use std::collections::VecDeque;

/// Resolves the free working time for one time map over a bounded horizon:
/// the map's weekly windows minus calendar blocks minus time already
/// committed to other work on the same map. Generation is day by day;
/// nothing beyond the current day is materialized.
#[derive(Debug, Clone, Copy)]
pub struct Availability<'a> {
    time_map: &'a TimeMap,
    calendar: &'a BlockCalendar,
    committed: &'a [Interval],
    from: NaiveDateTime,
    horizon_days: u32,
}

impl<'a> Availability<'a> {
    pub fn new(
        time_map: &'a TimeMap,
        calendar: &'a BlockCalendar,
        committed: &'a [Interval],
        from: NaiveDateTime,
        horizon_days: u32,
    ) -> Self {
        Self {
            time_map,
            calendar,
            committed,
            from,
            horizon_days,
        }
    }

    /// A fresh pass over the horizon. The sequence is finite and
    /// chronologically ordered; calling `iter` again restarts it.
    pub fn iter(&self) -> AvailabilityIter<'a> {
        AvailabilityIter {
            source: *self,
            day_offset: 0,
            buffer: VecDeque::new(),
        }
    }
}

pub struct AvailabilityIter<'a> {
    source: Availability<'a>,
    day_offset: u32,
    buffer: VecDeque<Interval>,
}

impl AvailabilityIter<'_> {
    fn fill_day(&mut self, offset: u32) {
        let source = &self.source;
        let date = source.from.date() + Duration::days(offset as i64);

        let mut windows = source.time_map.intervals_on(date);
        if offset == 0 {
            // partial first day: nothing before `from` is available
            windows.retain(|w| w.end > source.from);
            for w in &mut windows {
                if w.start < source.from {
                    w.start = source.from;
                }
            }
        }
        if windows.is_empty() {
            return;
        }

        let mut obstructions = source.calendar.blocks_on(date);
        obstructions.extend(interval::clip_to_day(source.committed, date));
        let free = interval::subtract(&windows, &interval::normalize(obstructions));
        self.buffer.extend(free);
    }
}

impl Iterator for AvailabilityIter<'_> {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        while self.buffer.is_empty() && self.day_offset <= self.source.horizon_days {
            let offset = self.day_offset;
            self.day_offset += 1;
            self.fill_day(offset);
        }
        self.buffer.pop_front()
    }
}
