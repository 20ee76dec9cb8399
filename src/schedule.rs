use crate::calculations::{self, projection};
use crate::calendar::{BlockCalendar, BlockCalendarConfig};
use crate::config::SchedulerConfig;
use crate::task::Task;
use crate::task_validation::{self, TaskValidationError, screen_tasks};
use crate::timemap::{TimeMap, TimeMapSet};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of one forecast run, aggregated across all tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub task_count: usize,
    /// Tasks whose full effort fits within the horizon.
    pub scheduled_count: usize,
    /// Tasks projected to miss their due date.
    pub late_count: usize,
    /// Tasks visited by the engine that could not be completed in time.
    pub unschedulable_count: usize,
    /// Deliberate opt-outs: no time map, or nothing left to do.
    pub skipped_count: usize,
    /// Per-record configuration errors; these tasks were left out of the run.
    pub rejected: Vec<String>,
    pub latest_completion: Option<NaiveDateTime>,
}

impl ForecastSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tasks={}", self.task_count));
        parts.push(format!("scheduled={}", self.scheduled_count));
        if self.late_count > 0 {
            parts.push(format!("late={}", self.late_count));
        }
        if self.unschedulable_count > 0 {
            parts.push(format!("unschedulable={}", self.unschedulable_count));
        }
        if self.skipped_count > 0 {
            parts.push(format!("skipped={}", self.skipped_count));
        }
        if !self.rejected.is_empty() {
            parts.push(format!("rejected={}", self.rejected.len()));
        }
        if let Some(finish) = self.latest_completion {
            parts.push(format!("finish={}", finish.format("%Y-%m-%d %H:%M")));
        }
        parts.join(", ")
    }
}

/// The task table plus everything a forecast run needs: scheduler
/// configuration, the named time maps, and the blocking calendar. Tasks are
/// stored in a DataFrame; `Task` values are materialized row views.
#[derive(Debug)]
pub struct Schedule {
    df: DataFrame,
    config: SchedulerConfig,
    time_maps: TimeMapSet,
    calendar: BlockCalendar,
}

impl Schedule {
    pub(crate) fn from_parts(
        config: SchedulerConfig,
        time_maps: TimeMapSet,
        calendar: BlockCalendar,
    ) -> Self {
        let schema = Self::default_schema();
        Self {
            df: DataFrame::empty_with_schema(&schema),
            config,
            time_maps,
            calendar,
        }
    }

    pub fn new() -> Self {
        Self::from_parts(
            SchedulerConfig::default(),
            TimeMapSet::new(),
            BlockCalendar::new(),
        )
    }

    pub fn new_with_config(config: SchedulerConfig) -> Self {
        Self::from_parts(config, TimeMapSet::new(), BlockCalendar::new())
    }

    fn default_schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("id".into(), DataType::Int32),
            Field::new("description".into(), DataType::String),
            Field::new("priority_rank".into(), DataType::Int32),
            Field::new("estimated_minutes".into(), DataType::Int64),
            Field::new("remaining_minutes".into(), DataType::Int64),
            Field::new("min_block_minutes".into(), DataType::Int64),
            Field::new(
                "due".into(),
                DataType::Datetime(TimeUnit::Milliseconds, None),
            ),
            Field::new(
                "wait".into(),
                DataType::Datetime(TimeUnit::Milliseconds, None),
            ),
            Field::new("time_map".into(), DataType::String),
            Field::new("scheduled_intervals".into(), DataType::String),
            Field::new(
                "scheduled_start".into(),
                DataType::Datetime(TimeUnit::Milliseconds, None),
            ),
            Field::new(
                "completion_date".into(),
                DataType::Datetime(TimeUnit::Milliseconds, None),
            ),
            Field::new("is_late".into(), DataType::Boolean),
            Field::new("scheduling_note".into(), DataType::String),
        ])
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SchedulerConfig) -> Result<(), PolarsError> {
        config
            .validate()
            .map_err(|err| PolarsError::ComputeError(err.to_string().into()))?;
        self.config = config;
        Ok(())
    }

    pub fn time_maps(&self) -> &TimeMapSet {
        &self.time_maps
    }

    pub fn set_time_map(&mut self, name: impl Into<String>, map: TimeMap) {
        self.time_maps.insert(name, map);
    }

    /// Replace the whole time-map registry.
    pub fn set_time_maps(&mut self, maps: TimeMapSet) {
        self.time_maps = maps;
    }

    pub fn remove_time_map(&mut self, name: &str) -> bool {
        self.time_maps.remove(name).is_some()
    }

    pub fn calendar(&self) -> &BlockCalendar {
        &self.calendar
    }

    pub fn set_calendar(&mut self, calendar: BlockCalendar) {
        self.calendar = calendar;
    }

    pub fn set_calendar_from_config(&mut self, config: &BlockCalendarConfig) {
        self.calendar = BlockCalendar::from_config(config);
    }

    pub fn add_block(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.calendar.add_block(start, end);
    }

    pub fn add_all_day_block(&mut self, date: NaiveDate) {
        self.calendar.add_all_day(date);
    }

    pub fn clear_blocks(&mut self) {
        self.calendar.clear();
    }

    pub fn tasks(&self) -> Result<Vec<Task>, PolarsError> {
        let df = self.dataframe();
        let mut tasks = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            tasks.push(Task::from_dataframe_row(df, idx)?);
        }
        Ok(tasks)
    }

    pub fn find_task(&self, task_id: i32) -> Result<Option<Task>, PolarsError> {
        if self.df.height() == 0 {
            return Ok(None);
        }
        let ids = self.df.column("id")?.i32()?;
        for (idx, id_opt) in ids.into_iter().enumerate() {
            if id_opt == Some(task_id) {
                let task = Task::from_dataframe_row(self.dataframe(), idx)?;
                return Ok(Some(task));
            }
        }
        Ok(None)
    }

    pub fn delete_task(&mut self, task_id: i32) -> Result<bool, PolarsError> {
        if self.df.height() == 0 {
            return Ok(false);
        }
        let snapshot = self.df.clone();
        let mut kept: Vec<Task> = Vec::with_capacity(snapshot.height());
        let mut found = false;
        for idx in 0..snapshot.height() {
            let task = Task::from_dataframe_row(&snapshot, idx)?;
            if task.id == task_id {
                found = true;
                continue;
            }
            kept.push(task);
        }
        if !found {
            return Ok(false);
        }
        self.write_back(kept)?;
        Ok(true)
    }

    fn validation_error(err: TaskValidationError) -> PolarsError {
        PolarsError::ComputeError(err.to_string().into())
    }

    /// Insert or update a task by id, keeping any unrelated fields of an
    /// existing record. A new estimate resets the remaining effort.
    pub fn upsert_task(
        &mut self,
        id: i32,
        description: &str,
        estimated_minutes: i64,
        time_map: Option<&str>,
    ) -> Result<(), PolarsError> {
        let mut task = match self.find_task(id)? {
            Some(existing) => existing,
            None => {
                let mut created = Task::new(id, description, estimated_minutes);
                created.min_block_minutes = self.config.default_min_block_minutes;
                created
            }
        };
        task.description = description.to_string();
        task.estimated_minutes = estimated_minutes;
        task.remaining_minutes = estimated_minutes;
        if let Some(map) = time_map {
            task.time_map = Some(map.to_string());
        }
        self.upsert_task_record(task)
    }

    pub fn upsert_task_record(&mut self, task: Task) -> Result<(), PolarsError> {
        task_validation::validate_task(&task).map_err(Self::validation_error)?;
        let id_exists = if self.df.height() == 0 {
            false
        } else {
            self.df
                .column("id")?
                .i32()?
                .into_iter()
                .any(|v| v == Some(task.id))
        };

        if id_exists {
            let snapshot = self.df.clone();
            let mut tasks: Vec<Task> = Vec::with_capacity(snapshot.height());
            for idx in 0..snapshot.height() {
                let existing = Task::from_dataframe_row(&snapshot, idx)?;
                if existing.id == task.id {
                    tasks.push(task.clone());
                } else {
                    tasks.push(existing);
                }
            }
            return self.write_back(tasks);
        }

        let new_row = task.to_dataframe_row()?;
        self.df = self.df.vstack(&new_row)?;
        Ok(())
    }

    fn modify_task<F>(&mut self, task_id: i32, mutate: F) -> Result<(), PolarsError>
    where
        F: FnOnce(&mut Task),
    {
        let mut task = self.find_task(task_id)?.ok_or_else(|| {
            PolarsError::ComputeError(format!("task {task_id} not found").into())
        })?;
        mutate(&mut task);
        self.upsert_task_record(task)
    }

    pub fn set_priority_rank(&mut self, task_id: i32, rank: i32) -> Result<(), PolarsError> {
        self.modify_task(task_id, |task| task.priority_rank = rank)
    }

    pub fn set_due(&mut self, task_id: i32, due: Option<NaiveDateTime>) -> Result<(), PolarsError> {
        self.modify_task(task_id, |task| task.due = due)
    }

    pub fn set_wait(
        &mut self,
        task_id: i32,
        wait: Option<NaiveDateTime>,
    ) -> Result<(), PolarsError> {
        self.modify_task(task_id, |task| task.wait = wait)
    }

    pub fn set_min_block(&mut self, task_id: i32, minutes: i64) -> Result<(), PolarsError> {
        self.modify_task(task_id, |task| task.min_block_minutes = minutes)
    }

    pub fn set_task_time_map(
        &mut self,
        task_id: i32,
        time_map: Option<String>,
    ) -> Result<(), PolarsError> {
        self.modify_task(task_id, |task| task.time_map = time_map)
    }

    /// Rebuild the table from materialized tasks, preserving their order.
    fn write_back(&mut self, tasks: Vec<Task>) -> Result<(), PolarsError> {
        let mut rebuilt = DataFrame::empty_with_schema(&Self::default_schema());
        for task in tasks {
            let row = task.to_dataframe_row()?;
            rebuilt = rebuilt.vstack(&row)?;
        }
        self.df = rebuilt;
        Ok(())
    }

    /// Forecast against the current wall clock.
    pub fn refresh(&mut self) -> Result<ForecastSummary, PolarsError> {
        self.refresh_at(chrono::Local::now().naive_local())
    }

    /// Forecast from a fixed instant; results are deterministic.
    pub fn refresh_at(&mut self, now: NaiveDateTime) -> Result<ForecastSummary, PolarsError> {
        self.refresh_at_with(now, None)
    }

    /// Forecast with a per-round rank refresh hook for the parallel
    /// algorithm. The hook is consulted once per allocation round for every
    /// still-active task.
    pub fn refresh_at_with(
        &mut self,
        now: NaiveDateTime,
        rank_refresh: Option<&mut dyn FnMut(&Task) -> i32>,
    ) -> Result<ForecastSummary, PolarsError> {
        self.config
            .validate()
            .map_err(|err| PolarsError::ComputeError(err.to_string().into()))?;

        // Full recompute: no allocation state survives between runs.
        let mut all = self.tasks()?;
        for task in &mut all {
            task.reset_schedule();
        }

        let mut outcome = screen_tasks(all.clone(), &self.time_maps);
        let results = calculations::run_allocation(
            &mut outcome.schedulable,
            &self.time_maps,
            &self.calendar,
            self.config.algorithm,
            self.config.days_ahead,
            now,
            rank_refresh,
        )
        .map_err(|err| PolarsError::ComputeError(err.to_string().into()))?;

        for task in &mut outcome.schedulable {
            if let Some(result) = results.get(&task.id) {
                task.scheduled_start = result.scheduled_start;
                task.completion_date = result.completion_date;
                task.is_late = Some(result.is_late);
                task.scheduling_note = projection::scheduling_note(&task.scheduled);
            }
        }

        let visited: HashMap<i32, Task> = outcome
            .schedulable
            .into_iter()
            .map(|task| (task.id, task))
            .collect();
        let merged: Vec<Task> = all
            .into_iter()
            .map(|task| visited.get(&task.id).cloned().unwrap_or(task))
            .collect();

        let mut scheduled_count = 0;
        let mut late_count = 0;
        let mut unschedulable_count = 0;
        let mut latest_completion: Option<NaiveDateTime> = None;
        for result in results.values() {
            match result.completion_date {
                Some(completed) => {
                    scheduled_count += 1;
                    latest_completion = Some(match latest_completion {
                        Some(current) if current >= completed => current,
                        _ => completed,
                    });
                }
                None => unschedulable_count += 1,
            }
            if result.is_late {
                late_count += 1;
            }
        }

        let summary = ForecastSummary {
            task_count: merged.len(),
            scheduled_count,
            late_count,
            unschedulable_count,
            skipped_count: outcome.skipped.len(),
            rejected: outcome.errors.iter().map(ToString::to_string).collect(),
            latest_completion,
        };

        self.write_back(merged)?;
        Ok(summary)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_contains_expected_columns() {
        let schema = Schedule::default_schema();
        let expected = vec![
            "id",
            "description",
            "priority_rank",
            "estimated_minutes",
            "remaining_minutes",
            "min_block_minutes",
            "due",
            "wait",
            "time_map",
            "scheduled_intervals",
            "scheduled_start",
            "completion_date",
            "is_late",
            "scheduling_note",
        ];
        for name in expected {
            assert!(schema.contains(name.into()), "missing column {name}");
        }
    }

    #[test]
    fn upsert_task_inserts_and_updates() {
        let mut schedule = Schedule::new();
        schedule.upsert_task(1, "Write report", 120, None).unwrap();
        assert_eq!(schedule.dataframe().height(), 1);

        schedule
            .upsert_task(1, "Write the report", 180, Some("work"))
            .unwrap();

        let task = schedule.find_task(1).unwrap().unwrap();
        assert_eq!(task.description, "Write the report");
        assert_eq!(task.estimated_minutes, 180);
        assert_eq!(task.remaining_minutes, 180);
        assert_eq!(task.time_map.as_deref(), Some("work"));
        assert_eq!(schedule.dataframe().height(), 1);
    }

    #[test]
    fn delete_task_removes_row() {
        let mut schedule = Schedule::new();
        schedule.upsert_task(1, "A", 60, None).unwrap();
        schedule.upsert_task(2, "B", 60, None).unwrap();
        assert!(schedule.delete_task(1).unwrap());
        assert!(!schedule.delete_task(1).unwrap());
        assert_eq!(schedule.dataframe().height(), 1);
        assert!(schedule.find_task(2).unwrap().is_some());
    }
}
