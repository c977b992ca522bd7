use chrono::{DateTime, Utc};

use crate::engine::command_queue::CommandSender;
use crate::models::command::Command;
use crate::schedule::schedule::Schedule;
use crate::traits::scheduler::ScheduleListener;

/// Turns schedule events into recorder commands.
///
/// Runs on the scheduler's thread and only enqueues, so schedule commands are
/// ordered with every other command through the recorder's queue.
pub struct ScheduleBridge {
    commands: CommandSender,
}

impl ScheduleBridge {
    pub fn new(commands: CommandSender) -> Self {
        Self { commands }
    }

    fn push(&self, command: Command) {
        let name = command.name();
        if self.commands.push(command).is_err() {
            log::debug!("schedule {} dropped: recorder shut down", name);
        }
    }

    fn apply(&self, state: bool) {
        if state {
            self.push(Command::Start { reply: None });
        } else {
            self.push(Command::Stop);
        }
    }
}

impl ScheduleListener for ScheduleBridge {
    fn schedule_run_started(&self, _schedule: &Schedule, _time: DateTime<Utc>, state: bool) {
        if state {
            self.push(Command::Start { reply: None });
        }
    }

    fn schedule_state_changed(&self, _schedule: &Schedule, _time: DateTime<Utc>, state: bool) {
        self.apply(state);
    }

    fn schedule_run_stopped(&self, _schedule: &Schedule, _time: DateTime<Utc>, _state: bool) {
        self.push(Command::Stop);
    }

    fn schedule_run_completed(&self, _schedule: &Schedule, _time: DateTime<Utc>, _state: bool) {
        self.push(Command::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::{Condvar, Mutex};

    use crate::engine::command_queue::CommandQueue;
    use crate::engine::recorder::Recorder;
    use crate::engine::testing::{Event, EventLog, MockDevice};
    use crate::models::config::RecorderConfiguration;
    use crate::models::error::RecorderError;
    use crate::traits::scheduler::Scheduler;

    fn names(queue: &CommandQueue) -> Vec<&'static str> {
        std::iter::from_fn(|| queue.try_pop()).map(|c| c.name()).collect()
    }

    #[test]
    fn maps_schedule_events_to_commands() {
        let queue = CommandQueue::new();
        let bridge = ScheduleBridge::new(queue.sender());
        let schedule = Schedule::default();
        let now = Utc::now();

        bridge.schedule_run_started(&schedule, now, false);
        assert!(queue.is_empty());

        bridge.schedule_run_started(&schedule, now, true);
        bridge.schedule_state_changed(&schedule, now, false);
        bridge.schedule_state_changed(&schedule, now, true);
        bridge.schedule_run_stopped(&schedule, now, true);
        bridge.schedule_run_completed(&schedule, now, false);

        assert_eq!(names(&queue), vec!["start", "stop", "start", "stop", "stop"]);
    }

    #[test]
    fn ignores_closed_queue() {
        let queue = CommandQueue::new();
        let bridge = ScheduleBridge::new(queue.sender());
        drop(queue);
        bridge.schedule_state_changed(&Schedule::default(), Utc::now(), true);
    }

    /// Scheduler driven by hand from the test.
    #[derive(Default)]
    struct ManualScheduler {
        listeners: Mutex<Vec<Arc<dyn ScheduleListener>>>,
        running: Mutex<bool>,
        finished: Condvar,
    }

    impl ManualScheduler {
        fn fire(&self, state: bool) {
            let schedule = Schedule::default();
            for l in self.listeners.lock().iter() {
                l.schedule_state_changed(&schedule, Utc::now(), state);
            }
        }
    }

    impl Scheduler for ManualScheduler {
        fn add_listener(&self, listener: Arc<dyn ScheduleListener>) {
            self.listeners.lock().push(listener);
        }

        fn start(&self) -> Result<(), RecorderError> {
            *self.running.lock() = true;
            Ok(())
        }

        fn stop(&self) {
            *self.running.lock() = false;
            self.finished.notify_all();
        }

        fn wait(&self) {
            let mut running = self.running.lock();
            while *running {
                self.finished.wait(&mut running);
            }
        }
    }

    #[test]
    fn scheduler_drives_recorder() {
        let device = MockDevice::new(1);
        let scheduler = Arc::new(ManualScheduler::default());
        let recorder =
            Recorder::with_scheduler(RecorderConfiguration::default(), device.backend(), scheduler.clone()).unwrap();
        let log = EventLog::new();
        recorder.add_listener(log.clone());
        assert!(recorder.has_schedule());

        recorder.start().unwrap();
        assert!(*scheduler.running.lock());
        // The recorder only follows schedule transitions.
        assert!(log.events().is_empty());

        scheduler.fire(true);
        log.wait_for(2);
        scheduler.fire(false);
        device.deliver(&[4, 4], false, false);

        assert_eq!(
            log.wait_for(4),
            vec![
                Event::Starting,
                Event::Started,
                Event::samples(&[4, 4], false),
                Event::Stopped { fault: None },
            ]
        );

        recorder.stop().unwrap();
        recorder.wait();
        assert!(!*scheduler.running.lock());
    }

    #[test]
    fn configured_schedule_builds_runner() {
        use crate::schedule::schedule::Interval;
        use chrono::TimeDelta;

        let now = Utc::now();
        let config = RecorderConfiguration {
            schedule: Some(Schedule::new([Interval::new(
                now - TimeDelta::seconds(1),
                now + TimeDelta::milliseconds(100),
            )])),
            ..RecorderConfiguration::default()
        };
        let device = MockDevice::new(1);
        let recorder = Recorder::create(config, device.backend()).unwrap();
        let log = EventLog::new();
        recorder.add_listener(log.clone());

        recorder.start().unwrap();
        log.wait_for(2);
        recorder.wait();
        // The schedule has ended; the stream closes after its next buffer.
        device.deliver(&[1], false, false);

        assert_eq!(
            log.wait_for(4),
            vec![
                Event::Starting,
                Event::Started,
                Event::samples(&[1], false),
                Event::Stopped { fault: None },
            ]
        );
    }
}
