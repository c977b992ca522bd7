use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::error::RecorderError;
use crate::schedule::schedule::Schedule;

/// Listener for schedule runner events.
///
/// `state` is the schedule state (`true` = recording window active) at `time`.
pub trait ScheduleListener: Send + Sync {
    fn schedule_run_started(&self, _schedule: &Schedule, _time: DateTime<Utc>, _state: bool) {}

    fn schedule_state_changed(&self, _schedule: &Schedule, _time: DateTime<Utc>, _state: bool) {}

    fn schedule_run_stopped(&self, _schedule: &Schedule, _time: DateTime<Utc>, _state: bool) {}

    fn schedule_run_completed(&self, _schedule: &Schedule, _time: DateTime<Utc>, _state: bool) {}
}

/// Something that runs a schedule and reports its transitions.
///
/// Implemented by `ScheduleRunner`; recorders accept any implementation
/// through `Recorder::with_scheduler`.
pub trait Scheduler: Send + Sync {
    fn add_listener(&self, listener: Arc<dyn ScheduleListener>);

    /// Begin a run. Starting a scheduler that is already running is a no-op.
    fn start(&self) -> Result<(), RecorderError>;

    /// End the current run early.
    fn stop(&self);

    /// Block until the current run, if any, has finished.
    fn wait(&self);
}
