use chrono::{DateTime, Utc};

use crate::models::error::RecorderError;

/// Listener for recorder lifecycle and data events.
///
/// All methods are called on the recorder's consumer thread, in listener
/// registration order. They must return quickly: a slow listener delays
/// every later buffer. The default implementations do nothing, so a
/// listener only implements the events it cares about.
pub trait RecorderListener: Send + Sync {
    /// The stream has been opened and buffers are about to flow.
    fn recording_starting(&self, _time: DateTime<Utc>) {}

    fn recording_started(&self, _time: DateTime<Utc>) {}

    /// A buffer of interleaved samples arrived.
    ///
    /// `time` approximates the capture time of the first frame.
    fn samples_arrived(
        &self,
        _time: DateTime<Utc>,
        _samples: &[i16],
        _frame_count: u32,
        _overflow: bool,
        _underflow: bool,
    ) {
    }

    /// The stream has been closed. `fault` is set when it closed because of
    /// a stream error rather than a stop request.
    fn recording_stopped(&self, _time: DateTime<Utc>, _fault: Option<&RecorderError>) {}
}
