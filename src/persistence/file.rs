use super::{PersistenceError, PersistenceResult};
use crate::calendar::{BlockCalendar, BlockCalendarConfig};
use crate::config::SchedulerConfig;
use crate::interval::Interval;
use crate::timemap::{TimeMapSet, TimeMapSetConfig};
use crate::{Schedule, Task};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct ScheduleSnapshot {
    config: SchedulerConfig,
    #[serde(default)]
    time_maps: TimeMapSetConfig,
    #[serde(default)]
    calendar: BlockCalendarConfig,
    tasks: Vec<Task>,
}

impl ScheduleSnapshot {
    fn from_schedule(schedule: &Schedule) -> PersistenceResult<Self> {
        let tasks = schedule.tasks()?;
        super::validate_tasks(&tasks)?;
        Ok(Self {
            config: schedule.config().clone(),
            time_maps: schedule.time_maps().to_config(),
            calendar: schedule.calendar().to_config(),
            tasks,
        })
    }

    fn into_schedule(self) -> PersistenceResult<Schedule> {
        super::validate_tasks(&self.tasks)?;
        self.config
            .validate()
            .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
        let time_maps = TimeMapSet::from_config(&self.time_maps)
            .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
        let calendar = BlockCalendar::from_config(&self.calendar);

        let mut schedule = Schedule::from_parts(self.config, time_maps, calendar);
        for task in self.tasks {
            schedule.upsert_task_record(task)?;
        }
        Ok(schedule)
    }
}

pub fn save_schedule_to_json<P: AsRef<Path>>(
    schedule: &Schedule,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = ScheduleSnapshot::from_schedule(schedule)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_schedule_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path)?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(file)?;
    snapshot.into_schedule()
}

#[derive(Default, Serialize, Deserialize)]
struct TaskCsvRecord {
    id: i32,
    description: String,
    priority_rank: i32,
    estimated_minutes: i64,
    remaining_minutes: i64,
    min_block_minutes: i64,
    due: String,
    wait: String,
    time_map: String,
    scheduled_intervals: String,
    scheduled_start: String,
    completion_date: String,
    is_late: String,
    scheduling_note: String,
    #[serde(default)]
    config_json: String,
    #[serde(default)]
    time_maps_json: String,
    #[serde(default)]
    calendar_json: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        let mut record = TaskCsvRecord::default();
        record.id = task.id;
        record.description = task.description.clone();
        record.priority_rank = task.priority_rank;
        record.estimated_minutes = task.estimated_minutes;
        record.remaining_minutes = task.remaining_minutes;
        record.min_block_minutes = task.min_block_minutes;
        record.due = format_datetime(task.due);
        record.wait = format_datetime(task.wait);
        record.time_map = task.time_map.clone().unwrap_or_default();
        record.scheduled_intervals =
            serde_json::to_string(&task.scheduled).unwrap_or_else(|_| "[]".to_string());
        record.scheduled_start = format_datetime(task.scheduled_start);
        record.completion_date = format_datetime(task.completion_date);
        record.is_late = format_option_bool(task.is_late);
        record.scheduling_note = task.scheduling_note.clone().unwrap_or_default();
        record
    }
}

impl TaskCsvRecord {
    fn metadata_row(schedule: &Schedule) -> PersistenceResult<Self> {
        let mut record = TaskCsvRecord::default();
        record.description = "__metadata__".to_string();
        record.config_json = serde_json::to_string(schedule.config())?;
        record.time_maps_json = serde_json::to_string(&schedule.time_maps().to_config())?;
        record.calendar_json = serde_json::to_string(&schedule.calendar().to_config())?;
        Ok(record)
    }

    fn is_metadata_row(&self) -> bool {
        !self.config_json.trim().is_empty()
    }

    fn into_task(self) -> PersistenceResult<Task> {
        if self.is_metadata_row() {
            return Err(PersistenceError::InvalidData(
                "metadata row cannot be converted to task".into(),
            ));
        }
        let mut task = Task::new(self.id, self.description, self.estimated_minutes);
        task.priority_rank = self.priority_rank;
        task.remaining_minutes = self.remaining_minutes;
        task.min_block_minutes = self.min_block_minutes;
        task.due = parse_datetime(&self.due)?;
        task.wait = parse_datetime(&self.wait)?;
        task.time_map = parse_string_option(self.time_map);
        task.scheduled = if self.scheduled_intervals.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str::<Vec<Interval>>(&self.scheduled_intervals).map_err(|err| {
                PersistenceError::InvalidData(format!("invalid scheduled_intervals: {err}"))
            })?
        };
        task.scheduled_start = parse_datetime(&self.scheduled_start)?;
        task.completion_date = parse_datetime(&self.completion_date)?;
        task.is_late = parse_bool(&self.is_late)?;
        task.scheduling_note = parse_string_option(self.scheduling_note);
        Ok(task)
    }
}

pub fn save_schedule_to_csv<P: AsRef<Path>>(schedule: &Schedule, path: P) -> PersistenceResult<()> {
    super::validate_schedule(schedule)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.serialize(TaskCsvRecord::metadata_row(schedule)?)?;
    for task in schedule.tasks()? {
        writer.serialize(TaskCsvRecord::from(&task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_schedule_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut tasks = Vec::new();
    let mut config: Option<SchedulerConfig> = None;
    let mut time_maps_config: Option<TimeMapSetConfig> = None;
    let mut calendar_config: Option<BlockCalendarConfig> = None;
    for record in reader.deserialize::<TaskCsvRecord>() {
        let record = record?;
        if record.is_metadata_row() {
            if config.is_some() {
                return Err(PersistenceError::InvalidData(
                    "CSV file contained multiple metadata rows".into(),
                ));
            }
            config = Some(serde_json::from_str(&record.config_json).map_err(|err| {
                PersistenceError::InvalidData(format!("invalid config json: {err}"))
            })?);
            if !record.time_maps_json.trim().is_empty() {
                time_maps_config =
                    Some(serde_json::from_str(&record.time_maps_json).map_err(|err| {
                        PersistenceError::InvalidData(format!("invalid time_maps json: {err}"))
                    })?);
            }
            if !record.calendar_json.trim().is_empty() {
                calendar_config =
                    Some(serde_json::from_str(&record.calendar_json).map_err(|err| {
                        PersistenceError::InvalidData(format!("invalid calendar json: {err}"))
                    })?);
            }
            continue;
        }
        tasks.push(record.into_task()?);
    }

    if tasks.is_empty() {
        return Err(PersistenceError::InvalidData(
            "CSV file contained no tasks".into(),
        ));
    }

    let snapshot = ScheduleSnapshot {
        config: config.unwrap_or_default(),
        time_maps: time_maps_config.unwrap_or_default(),
        calendar: calendar_config.unwrap_or_default(),
        tasks,
    };
    snapshot.into_schedule()
}

fn format_datetime(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn parse_datetime(input: &str) -> PersistenceResult<Option<NaiveDateTime>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%dT%H:%M:%S")
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid datetime '{input}': {e}")))
}

fn format_option_bool(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_bool(input: &str) -> PersistenceResult<Option<bool>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    match input.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid boolean '{other}'"
        ))),
    }
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
