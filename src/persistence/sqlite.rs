use super::{PersistenceError, PersistenceResult, ScheduleStore};
use crate::calendar::{BlockCalendar, BlockCalendarConfig};
use crate::config::SchedulerConfig;
use crate::timemap::{TimeMapSet, TimeMapSetConfig};
use crate::{Schedule, Task};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Serialize, Deserialize)]
struct StoredSettings {
    config: SchedulerConfig,
    time_maps: TimeMapSetConfig,
    calendar: BlockCalendarConfig,
}

pub struct SqliteScheduleStore {
    connection: Mutex<Connection>,
}

impl SqliteScheduleStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS forecast_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                settings_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                task_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn save_settings(
        &self,
        tx: &rusqlite::Transaction,
        schedule: &Schedule,
    ) -> PersistenceResult<()> {
        let settings = StoredSettings {
            config: schedule.config().clone(),
            time_maps: schedule.time_maps().to_config(),
            calendar: schedule.calendar().to_config(),
        };
        let json = serde_json::to_string(&settings)?;
        tx.execute("DELETE FROM forecast_settings", [])?;
        tx.execute(
            "INSERT INTO forecast_settings (id, settings_json) VALUES (1, ?1)",
            params![json],
        )?;
        Ok(())
    }

    fn save_tasks(&self, tx: &rusqlite::Transaction, schedule: &Schedule) -> PersistenceResult<()> {
        tx.execute("DELETE FROM tasks", [])?;
        let mut stmt = tx.prepare("INSERT INTO tasks (id, task_json) VALUES (?1, ?2)")?;
        for task in schedule.tasks()? {
            let json = serde_json::to_string(&task)?;
            stmt.execute(params![task.id, json])?;
        }
        Ok(())
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn save_schedule(&self, schedule: &Schedule) -> PersistenceResult<()> {
        super::validate_schedule(schedule)?;
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction()?;
        self.save_settings(&tx, schedule)?;
        self.save_tasks(&tx, schedule)?;
        tx.commit()?;
        Ok(())
    }

    fn load_schedule(&self) -> PersistenceResult<Option<Schedule>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");

        let mut stmt = conn.prepare("SELECT settings_json FROM forecast_settings WHERE id = 1")?;
        let settings_json_opt: Option<String> = stmt.query_row([], |row| row.get(0)).optional()?;

        let Some(settings_json) = settings_json_opt else {
            return Ok(None);
        };

        let settings: StoredSettings = serde_json::from_str(&settings_json)?;
        let time_maps = TimeMapSet::from_config(&settings.time_maps)
            .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
        let calendar = BlockCalendar::from_config(&settings.calendar);

        let mut stmt = conn.prepare("SELECT task_json FROM tasks ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tasks = Vec::new();
        for json in rows {
            let json = json?;
            let task: Task = serde_json::from_str(&json)?;
            tasks.push(task);
        }

        super::validate_tasks(&tasks)?;

        let mut schedule = Schedule::from_parts(settings.config, time_maps, calendar);
        for task in tasks {
            schedule.upsert_task_record(task)?;
        }

        Ok(Some(schedule))
    }
}
