use crate::interval::Interval;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Smallest contiguous chunk the round-robin allocator hands out per round,
/// unless a task overrides it: two hours.
pub const DEFAULT_MIN_BLOCK_MINUTES: i64 = 120;

fn default_min_block() -> i64 {
    DEFAULT_MIN_BLOCK_MINUTES
}

/// A schedulable unit of work. `remaining_minutes` and `scheduled` are
/// mutated by the allocation engine; everything below `scheduled` is derived
/// output, recomputed in full on every forecast run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    pub description: String,
    /// Lower rank is scheduled first. Supplied externally and may be
    /// refreshed between rounds of the parallel allocator.
    #[serde(default)]
    pub priority_rank: i32,
    #[serde(default)]
    pub estimated_minutes: i64,
    #[serde(default)]
    pub remaining_minutes: i64,
    #[serde(default = "default_min_block")]
    pub min_block_minutes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDateTime>,
    /// Do not schedule any work before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<NaiveDateTime>,
    /// Name of the availability time map. A task without one opts out of
    /// scheduling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_map: Option<String>,
    #[serde(default)]
    pub scheduled: Vec<Interval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_late: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_note: Option<String>,
}

impl Task {
    pub fn new(id: i32, description: impl Into<String>, estimated_minutes: i64) -> Self {
        Self {
            id,
            description: description.into(),
            priority_rank: 0,
            estimated_minutes,
            remaining_minutes: estimated_minutes,
            min_block_minutes: DEFAULT_MIN_BLOCK_MINUTES,
            due: None,
            wait: None,
            time_map: None,
            scheduled: Vec::new(),
            scheduled_start: None,
            completion_date: None,
            is_late: None,
            scheduling_note: None,
        }
    }

    /// Drop all allocation output and restore the full effort estimate.
    pub fn reset_schedule(&mut self) {
        self.remaining_minutes = self.estimated_minutes;
        self.scheduled.clear();
        self.scheduled_start = None;
        self.completion_date = None;
        self.is_late = None;
        self.scheduling_note = None;
    }

    pub fn to_dataframe_row(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(14);

        let id_data: [i32; 1] = [self.id];
        columns.push(Series::new(PlSmallStr::from_static("id"), id_data).into_column());

        let description_data: [&str; 1] = [self.description.as_str()];
        columns.push(
            Series::new(PlSmallStr::from_static("description"), description_data).into_column(),
        );

        let rank_data: [i32; 1] = [self.priority_rank];
        columns.push(Series::new(PlSmallStr::from_static("priority_rank"), rank_data).into_column());

        let estimated: [i64; 1] = [self.estimated_minutes];
        columns.push(
            Series::new(PlSmallStr::from_static("estimated_minutes"), estimated).into_column(),
        );

        let remaining: [i64; 1] = [self.remaining_minutes];
        columns.push(
            Series::new(PlSmallStr::from_static("remaining_minutes"), remaining).into_column(),
        );

        let min_block: [i64; 1] = [self.min_block_minutes];
        columns.push(
            Series::new(PlSmallStr::from_static("min_block_minutes"), min_block).into_column(),
        );

        columns.push(Self::series_from_datetime("due", self.due)?.into_column());
        columns.push(Self::series_from_datetime("wait", self.wait)?.into_column());

        let time_map: [Option<&str>; 1] = [self.time_map.as_deref()];
        columns.push(Series::new(PlSmallStr::from_static("time_map"), time_map).into_column());

        let intervals_json = serde_json::to_string(&self.scheduled)
            .map_err(|err| PolarsError::ComputeError(err.to_string().into()))?;
        let intervals: [&str; 1] = [intervals_json.as_str()];
        columns.push(
            Series::new(PlSmallStr::from_static("scheduled_intervals"), intervals).into_column(),
        );

        columns.push(Self::series_from_datetime("scheduled_start", self.scheduled_start)?.into_column());
        columns.push(Self::series_from_datetime("completion_date", self.completion_date)?.into_column());

        let is_late: [Option<bool>; 1] = [self.is_late];
        columns.push(Series::new(PlSmallStr::from_static("is_late"), is_late).into_column());

        let note: [Option<&str>; 1] = [self.scheduling_note.as_deref()];
        columns.push(Series::new(PlSmallStr::from_static("scheduling_note"), note).into_column());

        DataFrame::new(columns)
    }

    pub fn from_dataframe_row(df: &DataFrame, row_idx: usize) -> PolarsResult<Self> {
        let id = df
            .column("id")?
            .i32()?
            .get(row_idx)
            .ok_or_else(|| PolarsError::ComputeError("task row missing id".into()))?;

        let description = df
            .column("description")?
            .str()?
            .get(row_idx)
            .unwrap_or("")
            .to_string();

        let intervals_json = df
            .column("scheduled_intervals")?
            .str()?
            .get(row_idx)
            .unwrap_or("[]");
        let scheduled: Vec<Interval> = serde_json::from_str(intervals_json)
            .map_err(|err| PolarsError::ComputeError(err.to_string().into()))?;

        Ok(Self {
            id,
            description,
            priority_rank: df.column("priority_rank")?.i32()?.get(row_idx).unwrap_or(0),
            estimated_minutes: df
                .column("estimated_minutes")?
                .i64()?
                .get(row_idx)
                .unwrap_or(0),
            remaining_minutes: df
                .column("remaining_minutes")?
                .i64()?
                .get(row_idx)
                .unwrap_or(0),
            min_block_minutes: df
                .column("min_block_minutes")?
                .i64()?
                .get(row_idx)
                .unwrap_or(DEFAULT_MIN_BLOCK_MINUTES),
            due: Self::datetime_from_series(df.column("due")?.datetime()?, row_idx),
            wait: Self::datetime_from_series(df.column("wait")?.datetime()?, row_idx),
            time_map: df
                .column("time_map")?
                .str()?
                .get(row_idx)
                .map(ToOwned::to_owned),
            scheduled,
            scheduled_start: Self::datetime_from_series(
                df.column("scheduled_start")?.datetime()?,
                row_idx,
            ),
            completion_date: Self::datetime_from_series(
                df.column("completion_date")?.datetime()?,
                row_idx,
            ),
            is_late: df.column("is_late")?.bool()?.get(row_idx),
            scheduling_note: df
                .column("scheduling_note")?
                .str()?
                .get(row_idx)
                .map(ToOwned::to_owned),
        })
    }

    fn series_from_datetime(name: &str, value: Option<NaiveDateTime>) -> PolarsResult<Series> {
        let data: [Option<i64>; 1] = [value.map(Self::datetime_to_millis)];
        Series::new(name.into(), data).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
    }

    fn datetime_from_series(chunked: &DatetimeChunked, row_idx: usize) -> Option<NaiveDateTime> {
        chunked.get(row_idx).and_then(Self::datetime_from_millis)
    }

    fn datetime_to_millis(value: NaiveDateTime) -> i64 {
        value.and_utc().timestamp_millis()
    }

    fn datetime_from_millis(millis: i64) -> Option<NaiveDateTime> {
        DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
    }
}
