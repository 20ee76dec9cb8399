pub mod availability;
pub mod calculations;
pub mod calendar;
pub mod config;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod interval;
pub mod persistence;
pub mod schedule;
pub mod task;
pub mod task_validation;
pub mod timemap;

pub use availability::Availability;
pub use calculations::projection::ScheduleResult;
pub use calculations::{Algorithm, CommittedLedger, EngineError, run_allocation};
pub use calendar::{BlockCalendar, BlockCalendarConfig};
pub use config::{SchedulerConfig, SchedulerConfigError};
pub use interval::Interval;
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteScheduleStore;
pub use persistence::{
    PersistenceError, ScheduleStore, load_schedule_from_csv, load_schedule_from_json,
    save_schedule_to_csv, save_schedule_to_json, validate_schedule, validate_tasks,
};
pub use schedule::{ForecastSummary, Schedule};
pub use task::Task;
pub use task_validation::{TaskValidationError, screen_tasks};
pub use timemap::{TimeMap, TimeMapConfig, TimeMapError, TimeMapSet, TimeMapSetConfig};
