//! Test doubles: a scriptable input backend and an event-recording listener.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};

use crate::engine::capture_sink::{CallbackFlow, CaptureSink};
use crate::models::config::RecorderConfiguration;
use crate::models::error::RecorderError;
use crate::traits::input_backend::{InputBackend, InputStream};
use crate::traits::recorder_listener::RecorderListener;

#[derive(Default)]
struct DeviceState {
    device_count: usize,
    sink: Option<CaptureSink>,
    opens: u32,
    closes: u32,
}

/// Shared view of a fake input device; the test plays the driver thread.
#[derive(Clone)]
pub(crate) struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub(crate) fn new(device_count: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                device_count,
                ..Default::default()
            })),
        }
    }

    pub(crate) fn backend(&self) -> MockBackend {
        MockBackend { device: self.clone() }
    }

    /// Sink of the currently open stream.
    pub(crate) fn sink(&self) -> CaptureSink {
        self.state.lock().sink.clone().expect("no open stream")
    }

    pub(crate) fn deliver(&self, samples: &[i16], overflow: bool, underflow: bool) -> CallbackFlow {
        self.sink().deliver(samples, overflow, underflow)
    }

    pub(crate) fn opens(&self) -> u32 {
        self.state.lock().opens
    }

    pub(crate) fn closes(&self) -> u32 {
        self.state.lock().closes
    }
}

pub(crate) struct MockBackend {
    device: MockDevice,
}

impl InputBackend for MockBackend {
    fn open(
        &mut self,
        config: &RecorderConfiguration,
        sink: CaptureSink,
    ) -> Result<Box<dyn InputStream>, RecorderError> {
        let mut state = self.device.state.lock();
        if config.device_index >= state.device_count {
            return Err(RecorderError::DeviceUnavailable(format!(
                "invalid device index {}",
                config.device_index
            )));
        }
        state.opens += 1;
        state.sink = Some(sink);
        Ok(Box::new(MockStream {
            device: self.device.clone(),
        }))
    }
}

struct MockStream {
    device: MockDevice,
}

impl InputStream for MockStream {
    fn close(self: Box<Self>) -> Result<(), RecorderError> {
        let mut state = self.device.state.lock();
        state.closes += 1;
        state.sink = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Starting,
    Started,
    Samples {
        samples: Vec<i16>,
        frame_count: u32,
        overflow: bool,
        underflow: bool,
    },
    Stopped {
        fault: Option<RecorderError>,
    },
}

impl Event {
    pub(crate) fn samples(samples: &[i16], overflow: bool) -> Self {
        Self::Samples {
            samples: samples.to_vec(),
            frame_count: samples.len() as u32,
            overflow,
            underflow: false,
        }
    }
}

/// Listener that records every event and lets tests wait for them.
#[derive(Default)]
pub(crate) struct EventLog {
    events: Mutex<Vec<Event>>,
    times: Mutex<Vec<DateTime<Utc>>>,
    changed: Condvar,
}

impl EventLog {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Buffer start times passed to `samples_arrived`.
    pub(crate) fn sample_times(&self) -> Vec<DateTime<Utc>> {
        self.times.lock().clone()
    }

    /// Wait until at least `count` events have arrived, or two seconds pass.
    pub(crate) fn wait_for(&self, count: usize) -> Vec<Event> {
        let mut events = self.events.lock();
        while events.len() < count {
            if self.changed.wait_for(&mut events, Duration::from_secs(2)).timed_out() {
                break;
            }
        }
        events.clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
        self.changed.notify_all();
    }
}

impl RecorderListener for EventLog {
    fn recording_starting(&self, _time: DateTime<Utc>) {
        self.push(Event::Starting);
    }

    fn recording_started(&self, _time: DateTime<Utc>) {
        self.push(Event::Started);
    }

    fn samples_arrived(&self, time: DateTime<Utc>, samples: &[i16], frame_count: u32, overflow: bool, underflow: bool) {
        self.times.lock().push(time);
        self.push(Event::Samples {
            samples: samples.to_vec(),
            frame_count,
            overflow,
            underflow,
        });
    }

    fn recording_stopped(&self, _time: DateTime<Utc>, fault: Option<&RecorderError>) {
        self.push(Event::Stopped { fault: fault.cloned() });
    }
}
