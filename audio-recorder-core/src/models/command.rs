use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;

use super::error::RecorderError;

/// One buffer of interleaved 16-bit samples as delivered by the hardware.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBuffer {
    pub samples: Vec<i16>,
    pub frame_count: u32,
    /// Approximate UTC time of the first frame.
    pub start_time: DateTime<Utc>,
    pub overflow: bool,
    pub underflow: bool,
}

/// Identifies one opened stream. Buffers and faults from a stream that has
/// since been closed are recognized by a stale id and dropped.
pub type StreamId = u64;

/// Reply channel for a caller-initiated start.
pub type StartReply = Sender<Result<(), RecorderError>>;

/// Commands processed in FIFO order by the engine's consumer thread.
#[derive(Debug)]
pub enum Command {
    /// Open the stream if idle. Carries a reply channel when a caller is
    /// waiting for the outcome.
    Start { reply: Option<StartReply> },
    /// Request a stop at the next buffer boundary.
    Stop,
    /// A filled buffer from the capture callback.
    Input { stream: StreamId, buffer: InputBuffer },
    /// The stream failed after it was opened.
    Fault { stream: StreamId, error: RecorderError },
    /// Close any open stream and end the consumer loop.
    Shutdown,
}

impl Command {
    /// Short name used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Stop => "stop",
            Self::Input { .. } => "input",
            Self::Fault { .. } => "fault",
            Self::Shutdown => "shutdown",
        }
    }
}
