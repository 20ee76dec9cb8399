use crate::interval::{self, Interval};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Externally imposed unavailability: meetings, holidays, anything the
/// scheduler must plan around. Kept normalized (sorted, merged) at all times
/// and read-only for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockCalendar {
    blocks: Vec<Interval>,
}

/// Serializable form of a block calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockCalendarConfig {
    pub blocks: Vec<Interval>,
}

impl BlockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BlockCalendarConfig) -> Self {
        Self {
            blocks: interval::normalize(config.blocks.clone()),
        }
    }

    pub fn to_config(&self) -> BlockCalendarConfig {
        BlockCalendarConfig {
            blocks: self.blocks.clone(),
        }
    }

    /// Add a single blocking interval. Empty or inverted spans are ignored.
    pub fn add_block(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        if let Some(block) = Interval::new(start, end) {
            let mut blocks = std::mem::take(&mut self.blocks);
            blocks.push(block);
            self.blocks = interval::normalize(blocks);
        }
    }

    pub fn add_blocks(&mut self, blocks: &[Interval]) {
        let mut merged = std::mem::take(&mut self.blocks);
        merged.extend_from_slice(blocks);
        self.blocks = interval::normalize(merged);
    }

    /// Block the entire civil day `[date 00:00, date+1 00:00)`.
    pub fn add_all_day(&mut self, date: NaiveDate) {
        let start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        self.add_block(start, start + chrono::Duration::days(1));
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn blocks(&self) -> &[Interval] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks overlapping the given day, clipped to that day.
    pub fn blocks_on(&self, date: NaiveDate) -> Vec<Interval> {
        interval::clip_to_day(&self.blocks, date)
    }

    /// True when no block overlaps the given span.
    pub fn is_clear(&self, span: &Interval) -> bool {
        !self.blocks.iter().any(|block| block.overlaps(span))
    }
}
