use std::time::Duration;

use crate::schedule::schedule::Schedule;

/// Bytes per sample. Recorders always capture 16-bit signed PCM.
pub const SAMPLE_WIDTH: u16 = 2;

/// Configuration for a recorder.
///
/// Fixed for the lifetime of the recorder: the hardware stream is reopened
/// with these parameters on every start.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfiguration {
    /// Index of the input device, as reported by device enumeration.
    pub device_index: usize,

    /// Number of input channels (default: 1).
    pub channels: u16,

    /// Sample rate in Hz (default: 22050).
    pub sample_rate: u32,

    /// Frames per hardware buffer (default: 1024).
    pub buffer_size: u32,

    /// Optional recording schedule. When present, `start`/`stop` drive a
    /// schedule runner instead of the stream directly.
    pub schedule: Option<Schedule>,
}

impl RecorderConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.channels == 0 {
            return Err("channel count must be at least one".into());
        }
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.buffer_size == 0 {
            return Err("buffer size must be at least one frame".into());
        }
        Ok(())
    }

    /// Always `SAMPLE_WIDTH`; kept as a method so callers need not know the constant.
    pub fn sample_width(&self) -> u16 {
        SAMPLE_WIDTH
    }

    /// Bytes per frame.
    pub fn frame_size(&self) -> usize {
        self.channels as usize * SAMPLE_WIDTH as usize
    }

    /// Samples per full hardware buffer.
    pub fn samples_per_buffer(&self) -> usize {
        self.buffer_size as usize * self.channels as usize
    }

    /// Wall-clock duration of one full buffer.
    pub fn buffer_duration(&self) -> Duration {
        Duration::from_secs_f64(self.buffer_size as f64 / self.sample_rate as f64)
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            device_index: 0,
            channels: 1,
            sample_rate: 22050,
            buffer_size: 1024,
            schedule: None,
        }
    }
}
