use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};

use crate::engine::notifier::Notifier;
use crate::models::error::RecorderError;
use crate::schedule::schedule::Schedule;
use crate::traits::scheduler::{ScheduleListener, Scheduler};

#[derive(Debug, Default)]
struct RunState {
    running: bool,
    stop_requested: bool,
}

#[derive(Debug, Default)]
struct RunControl {
    state: Mutex<RunState>,
    changed: Condvar,
}

impl RunControl {
    /// Sleep until `deadline`. Returns `false` if a stop was requested first.
    fn sleep_until(&self, deadline: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.stop_requested {
                return false;
            }
            let remaining = deadline - Utc::now();
            let Ok(remaining) = remaining.to_std() else {
                return true;
            };
            if remaining == Duration::ZERO {
                return true;
            }
            self.changed.wait_for(&mut state, remaining);
        }
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        state.running = false;
        state.stop_requested = false;
        self.changed.notify_all();
    }
}

/// Runs a `Schedule` in real time on a background thread.
///
/// A run reports `schedule_run_started` with the state at the moment it
/// begins, `schedule_state_changed` at each later transition, and finally
/// either `schedule_run_completed` after the last transition or
/// `schedule_run_stopped` if `stop` is called first.
pub struct ScheduleRunner {
    schedule: Arc<Schedule>,
    notifier: Arc<Notifier<dyn ScheduleListener>>,
    control: Arc<RunControl>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduleRunner {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule: Arc::new(schedule),
            notifier: Arc::new(Notifier::new()),
            control: Arc::new(RunControl::default()),
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.control.state.lock().running
    }
}

impl Scheduler for ScheduleRunner {
    fn add_listener(&self, listener: Arc<dyn ScheduleListener>) {
        self.notifier.add_listener(listener);
    }

    fn start(&self) -> Result<(), RecorderError> {
        let mut handle = self.handle.lock();
        {
            let mut state = self.control.state.lock();
            if state.running {
                log::debug!("schedule already running");
                return Ok(());
            }
            state.running = true;
            state.stop_requested = false;
        }

        // Reap the previous, already finished, run.
        if let Some(previous) = handle.take() {
            let _ = previous.join();
        }

        let schedule = Arc::clone(&self.schedule);
        let notifier = Arc::clone(&self.notifier);
        let control = Arc::clone(&self.control);
        let spawned = thread::Builder::new()
            .name("schedule-runner".into())
            .spawn(move || {
                run(&schedule, &notifier, &control);
                control.finish();
            });

        match spawned {
            Ok(h) => {
                *handle = Some(h);
                Ok(())
            }
            Err(e) => {
                self.control.finish();
                Err(RecorderError::ConfigurationFailed(format!(
                    "failed to spawn schedule thread: {}",
                    e
                )))
            }
        }
    }

    fn stop(&self) {
        let mut state = self.control.state.lock();
        if state.running {
            state.stop_requested = true;
            self.control.changed.notify_all();
        }
    }

    fn wait(&self) {
        let mut state = self.control.state.lock();
        while state.running {
            self.control.changed.wait(&mut state);
        }
    }
}

impl Drop for ScheduleRunner {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.get_mut().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn run(schedule: &Schedule, notifier: &Notifier<dyn ScheduleListener>, control: &RunControl) {
    let start = Utc::now();
    let initial = schedule.state_at(start);
    log::info!("schedule run started, recording {}", if initial { "on" } else { "off" });
    notifier.notify("schedule_run_started", |l| l.schedule_run_started(schedule, start, initial));

    let mut time = start;
    let mut state = initial;
    while let Some(transition) = schedule.next_transition_after(time) {
        if !control.sleep_until(transition.time) {
            let now = Utc::now();
            log::info!("schedule run stopped");
            notifier.notify("schedule_run_stopped", |l| l.schedule_run_stopped(schedule, now, state));
            return;
        }
        time = transition.time;
        state = transition.state;
        log::debug!("schedule state changed to {} at {}", state, time);
        notifier.notify("schedule_state_changed", |l| l.schedule_state_changed(schedule, time, state));
    }

    let now = Utc::now();
    log::info!("schedule run completed");
    notifier.notify("schedule_run_completed", |l| l.schedule_run_completed(schedule, now, state));
}
