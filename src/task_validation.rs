use crate::task::Task;
use crate::timemap::TimeMapSet;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone)]
pub struct TaskValidationError {
    message: String,
}

impl TaskValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TaskValidationError {}

pub fn validate_task(task: &Task) -> Result<(), TaskValidationError> {
    if task.estimated_minutes < 0 {
        return Err(TaskValidationError::new(format!(
            "task {} has negative estimated effort {} minutes",
            task.id, task.estimated_minutes
        )));
    }
    if task.remaining_minutes < 0 {
        return Err(TaskValidationError::new(format!(
            "task {} has negative remaining effort {} minutes",
            task.id, task.remaining_minutes
        )));
    }
    if task.min_block_minutes <= 0 {
        return Err(TaskValidationError::new(format!(
            "task {} has non-positive min_block {} minutes",
            task.id, task.min_block_minutes
        )));
    }
    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> Result<(), TaskValidationError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(TaskValidationError::new(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        validate_task(task)?;
    }
    Ok(())
}

/// Outcome of pre-run screening: tasks the engine will see, deliberate
/// opt-outs, and per-record configuration errors. One bad record never
/// blocks scheduling of the rest.
#[derive(Debug, Default)]
pub struct ScreenOutcome {
    pub schedulable: Vec<Task>,
    pub skipped: Vec<i32>,
    pub errors: Vec<TaskValidationError>,
}

pub fn screen_tasks(tasks: Vec<Task>, time_maps: &TimeMapSet) -> ScreenOutcome {
    let mut outcome = ScreenOutcome::default();
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            outcome.errors.push(TaskValidationError::new(format!(
                "duplicate task id {}",
                task.id
            )));
            continue;
        }
        if let Err(err) = validate_task(&task) {
            outcome.errors.push(err);
            continue;
        }
        let Some(map_name) = task.time_map.as_deref() else {
            outcome.skipped.push(task.id);
            continue;
        };
        if !time_maps.contains(map_name) {
            outcome.errors.push(TaskValidationError::new(format!(
                "task {} references unknown time map '{}'",
                task.id, map_name
            )));
            continue;
        }
        if task.remaining_minutes == 0 {
            outcome.skipped.push(task.id);
            continue;
        }
        outcome.schedulable.push(task);
    }
    outcome
}
