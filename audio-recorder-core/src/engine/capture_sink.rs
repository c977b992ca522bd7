//! The boundary between a hardware driver thread and the recorder engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::engine::buffer_pool::BufferPool;
use crate::engine::command_queue::CommandSender;
use crate::models::command::{Command, InputBuffer, StreamId};
use crate::models::error::RecorderError;

/// What the driver should do after a buffer has been handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFlow {
    /// Keep delivering buffers.
    Continue,
    /// The recorder is no longer recording; deliver nothing more.
    Complete,
}

/// Capture callback adapter handed to an `InputBackend` when a stream opens.
///
/// Called on the driver's thread once per filled buffer. It only reads the
/// atomic recording flag, copies the samples into a pooled buffer, and
/// enqueues an `Input` command; it never locks or waits on engine state.
///
/// The recording flag is advisory: the driver may see a stale value for at
/// most one buffer period. Correctness does not depend on it, because the
/// consumer thread decides what each `Input` command means.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    stream: StreamId,
    commands: CommandSender,
    recording: Arc<AtomicBool>,
    pool: BufferPool,
    channels: u16,
    sample_rate: u32,
}

impl CaptureSink {
    pub(crate) fn new(
        stream: StreamId,
        commands: CommandSender,
        recording: Arc<AtomicBool>,
        pool: BufferPool,
        channels: u16,
        sample_rate: u32,
    ) -> Self {
        Self {
            stream,
            commands,
            recording,
            pool,
            channels,
            sample_rate,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Hand over a buffer of interleaved 16-bit samples.
    pub fn deliver(&self, samples: &[i16], overflow: bool, underflow: bool) -> CallbackFlow {
        self.deliver_converted(samples, |sample| sample, overflow, underflow)
    }

    /// Hand over a buffer in some other sample format, converting each
    /// sample to 16 bits while copying it out of driver memory.
    pub fn deliver_converted<T: Copy>(
        &self,
        samples: &[T],
        convert: impl Fn(T) -> i16,
        overflow: bool,
        underflow: bool,
    ) -> CallbackFlow {
        if !self.is_recording() {
            return CallbackFlow::Complete;
        }

        let frame_count = (samples.len() / self.channels.max(1) as usize) as u32;
        let start_time = buffer_start_time(Utc::now(), frame_count, self.sample_rate);

        let mut buffer = self.pool.take(samples.len());
        buffer.extend(samples.iter().map(|&sample| convert(sample)));

        let command = Command::Input {
            stream: self.stream,
            buffer: InputBuffer {
                samples: buffer,
                frame_count,
                start_time,
                overflow,
                underflow,
            },
        };

        match self.commands.push(command) {
            Ok(()) => CallbackFlow::Continue,
            Err(_) => CallbackFlow::Complete,
        }
    }

    /// Report a stream error. The engine closes the stream and tells
    /// listeners the recording stopped because of it.
    pub fn fault(&self, message: impl Into<String>) {
        let command = Command::Fault {
            stream: self.stream,
            error: RecorderError::StreamFault(message.into()),
        };
        if self.commands.push(command).is_err() {
            log::debug!("stream fault reported after recorder shut down");
        }
    }
}

/// Approximate start time of a buffer that finished filling at `now`.
///
/// Driver-reported timestamps are not reliable on every platform, so the
/// buffer is assumed to have ended just now and to have started one buffer
/// duration earlier. Callback scheduling jitter shows up directly in the
/// result.
pub fn buffer_start_time(now: DateTime<Utc>, frame_count: u32, sample_rate: u32) -> DateTime<Utc> {
    if sample_rate == 0 {
        return now;
    }
    let micros = frame_count as i64 * 1_000_000 / sample_rate as i64;
    now - TimeDelta::microseconds(micros)
}
