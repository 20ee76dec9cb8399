use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A half-open span of time `[start, end)`. Durations are whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    /// Build an interval, rejecting empty or inverted spans.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Sort, drop empty spans, and merge overlapping or adjacent intervals.
pub fn normalize(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|iv| iv.start < iv.end);
    intervals.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for iv in intervals {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end => {
                if iv.end > last.end {
                    last.end = iv.end;
                }
            }
            _ => merged.push(iv),
        }
    }
    merged
}

/// Remove every blocking interval's overlap from the free set. Free intervals
/// straddling a block are split; fully covered ones are dropped. Both inputs
/// must be normalized; the result is normalized.
pub fn subtract(free: &[Interval], blocks: &[Interval]) -> Vec<Interval> {
    let mut result = Vec::with_capacity(free.len());
    for &iv in free {
        let mut cursor = iv.start;
        for block in blocks {
            if block.end <= cursor {
                continue;
            }
            if block.start >= iv.end {
                break;
            }
            if block.start > cursor {
                // the gap before this block stays free
                result.push(Interval {
                    start: cursor,
                    end: block.start.min(iv.end),
                });
            }
            cursor = cursor.max(block.end);
            if cursor >= iv.end {
                break;
            }
        }
        if cursor < iv.end {
            result.push(Interval {
                start: cursor,
                end: iv.end,
            });
        }
    }
    result
}

/// Restrict a normalized set to `[day 00:00, day+1 00:00)`.
pub fn clip_to_day(intervals: &[Interval], day: NaiveDate) -> Vec<Interval> {
    let day_start = day.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let day_end = day_start + Duration::days(1);
    intervals
        .iter()
        .filter_map(|iv| {
            let start = iv.start.max(day_start);
            let end = iv.end.min(day_end);
            Interval::new(start, end)
        })
        .collect()
}

/// Walk a chronologically ordered sequence of intervals, consuming prefixes
/// until `minutes` are exhausted or the sequence runs dry. Each consumed chunk
/// is a valid interval and never spans a gap. Returns the consumed chunks and
/// the minutes that could not be satisfied.
pub fn take_from_iter<I>(intervals: I, minutes: i64) -> (Vec<Interval>, i64)
where
    I: IntoIterator<Item = Interval>,
{
    let mut consumed = Vec::new();
    let mut wanted = minutes;
    for iv in intervals {
        if wanted <= 0 {
            break;
        }
        let take = iv.minutes().min(wanted);
        if take <= 0 {
            continue;
        }
        let end = iv.start + Duration::minutes(take);
        consumed.push(Interval {
            start: iv.start,
            end,
        });
        wanted -= take;
    }
    (consumed, wanted.max(0))
}

/// `take_from_iter` over an in-memory normalized set.
pub fn first_minutes(intervals: &[Interval], minutes: i64) -> (Vec<Interval>, i64) {
    take_from_iter(intervals.iter().copied(), minutes)
}

/// Total minutes covered by a set.
pub fn total_minutes(intervals: &[Interval]) -> i64 {
    intervals.iter().map(Interval::minutes).sum()
}
