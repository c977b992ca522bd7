use chrono::{DateTime, Utc};

use crate::models::error::RecorderError;
use crate::traits::recorder_listener::RecorderListener;

/// Recorder listener that reports recording activity through `log`.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl LoggingListener {
    pub fn new() -> Self {
        Self
    }
}

impl RecorderListener for LoggingListener {
    fn recording_started(&self, time: DateTime<Utc>) {
        log::info!("started recording at {}", time.format("%Y-%m-%d %H:%M:%S%.3f UTC"));
    }

    fn samples_arrived(&self, time: DateTime<Utc>, _samples: &[i16], frame_count: u32, overflow: bool, underflow: bool) {
        if overflow {
            log::warn!("input overflow before buffer at {}; audio was lost", time);
        }
        if underflow {
            log::warn!("input underflow in buffer at {}", time);
        }
        log::trace!("{} frames arrived", frame_count);
    }

    fn recording_stopped(&self, time: DateTime<Utc>, fault: Option<&RecorderError>) {
        let time = time.format("%Y-%m-%d %H:%M:%S%.3f UTC");
        match fault {
            Some(e) => log::error!("recording stopped at {} because of an error: {}", time, e),
            None => log::info!("stopped recording at {}", time),
        }
    }
}
