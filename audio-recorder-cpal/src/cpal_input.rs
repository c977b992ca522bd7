//! Input backend built on cpal.

use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, Sample, SampleFormat, SizedSample, StreamConfig, StreamInstant};

use audio_recorder_core::engine::capture_sink::{CallbackFlow, CaptureSink};
use audio_recorder_core::models::config::RecorderConfiguration;
use audio_recorder_core::models::error::RecorderError;
use audio_recorder_core::traits::input_backend::{InputBackend, InputStream};

use crate::device_enumerator::host_devices;

/// Sample formats the backend can convert to 16-bit, most preferred first.
const FORMAT_PREFERENCE: [SampleFormat; 4] = [SampleFormat::I16, SampleFormat::F32, SampleFormat::I32, SampleFormat::U16];

/// `InputBackend` that opens devices by their `list_input_devices` index.
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl InputBackend for CpalBackend {
    fn open(&mut self, config: &RecorderConfiguration, sink: CaptureSink) -> Result<Box<dyn InputStream>, RecorderError> {
        let entry = host_devices()?
            .into_iter()
            .nth(config.device_index)
            .ok_or_else(|| RecorderError::DeviceUnavailable(format!("no input device with index {}", config.device_index)))?;
        let device = entry.device;
        let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());

        let ranges = device
            .supported_input_configs()
            .map_err(|e| unavailable(&name, e))?
            .map(|range| {
                (
                    range.channels(),
                    range.min_sample_rate().0,
                    range.max_sample_rate().0,
                    range.sample_format(),
                )
            })
            .collect::<Vec<_>>();
        let format = pick_sample_format(&ranges, config.channels, config.sample_rate).ok_or_else(|| {
            RecorderError::DeviceUnavailable(format!(
                "input device {} does not support {} channel(s) at {} Hz",
                name, config.channels, config.sample_rate
            ))
        })?;

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: BufferSize::Fixed(config.buffer_size),
        };

        let stream = match format {
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, sink),
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, sink),
            SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, sink),
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, sink),
            other => {
                return Err(RecorderError::DeviceUnavailable(format!(
                    "unsupported sample format {}",
                    other
                )))
            }
        }
        .map_err(|e| unavailable(&name, e))?;

        stream.play().map_err(|e| unavailable(&name, e))?;
        log::debug!("cpal input stream on {} ({}) uses {} samples", name, entry.host_id.name(), format);

        Ok(Box::new(CpalStream { stream }))
    }
}

/// A playing cpal input stream. Dropping it releases the device.
pub struct CpalStream {
    stream: cpal::Stream,
}

impl InputStream for CpalStream {
    fn close(self: Box<Self>) -> Result<(), RecorderError> {
        let result = self
            .stream
            .pause()
            .map_err(|e| RecorderError::StreamFault(format!("failed to pause input stream: {}", e)));
        drop(self.stream);
        result
    }
}

fn build_stream<T>(device: &Device, config: &StreamConfig, sink: CaptureSink) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + Send + 'static,
    i16: FromSample<T>,
{
    let channels = sink.channels().max(1) as usize;
    let mut gaps = GapDetector::new(sink.sample_rate());
    let mut origin: Option<StreamInstant> = None;
    let mut complete = false;
    let data_sink = sink.clone();

    device.build_input_stream(
        config,
        move |data: &[T], info: &cpal::InputCallbackInfo| {
            if complete {
                return;
            }
            let frames = (data.len() / channels) as u32;
            let capture = info.timestamp().capture;
            let start = *origin.get_or_insert(capture);
            let overflow = capture
                .duration_since(&start)
                .map(|offset| gaps.check(offset, frames))
                .unwrap_or(false);

            let flow = data_sink.deliver_converted(data, |sample| i16::from_sample(sample), overflow, false);
            if flow == CallbackFlow::Complete {
                complete = true;
            }
        },
        move |err| {
            log::error!("cpal input stream error: {}", err);
            sink.fault(err.to_string());
        },
        None,
    )
}

/// Choose the best sample format offered for `channels` at `sample_rate`.
///
/// Each range is `(channels, min_rate, max_rate, format)`.
pub(crate) fn pick_sample_format(ranges: &[(u16, u32, u32, SampleFormat)], channels: u16, sample_rate: u32) -> Option<SampleFormat> {
    FORMAT_PREFERENCE.into_iter().find(|format| {
        ranges
            .iter()
            .any(|&(c, min, max, f)| c == channels && min <= sample_rate && sample_rate <= max && f == *format)
    })
}

/// Infers lost input from gaps between buffer capture times.
///
/// cpal does not report driver overflows, so a buffer whose capture time is
/// more than half a buffer later than the previous buffer's end is taken to
/// follow dropped audio.
pub(crate) struct GapDetector {
    sample_rate: u32,
    expected: Option<Duration>,
}

impl GapDetector {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            expected: None,
        }
    }

    /// Record a buffer of `frames` captured at `offset` from stream start.
    /// Returns whether input was lost before it.
    pub(crate) fn check(&mut self, offset: Duration, frames: u32) -> bool {
        if self.sample_rate == 0 {
            return false;
        }
        let length = Duration::from_secs_f64(frames as f64 / self.sample_rate as f64);
        let overflow = match self.expected {
            Some(expected) => offset > expected + length / 2,
            None => false,
        };
        self.expected = Some(offset + length);
        overflow
    }
}

fn unavailable(name: &str, e: impl std::fmt::Display) -> RecorderError {
    RecorderError::DeviceUnavailable(format!("input device {}: {}", name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_16_bit_samples() {
        let ranges = [
            (1, 8000, 48000, SampleFormat::F32),
            (1, 8000, 48000, SampleFormat::I16),
            (2, 8000, 48000, SampleFormat::I16),
        ];
        assert_eq!(pick_sample_format(&ranges, 1, 22050), Some(SampleFormat::I16));
    }

    #[test]
    fn falls_back_to_convertible_format() {
        let ranges = [(2, 44100, 48000, SampleFormat::F32), (2, 8000, 16000, SampleFormat::I16)];
        assert_eq!(pick_sample_format(&ranges, 2, 48000), Some(SampleFormat::F32));
        assert_eq!(pick_sample_format(&ranges, 1, 48000), None);
        assert_eq!(pick_sample_format(&ranges, 2, 22050), None);
    }

    #[test]
    fn contiguous_buffers_are_not_overflows() {
        let mut gaps = GapDetector::new(1000);
        assert!(!gaps.check(Duration::ZERO, 100));
        assert!(!gaps.check(Duration::from_millis(100), 100));
        // Scheduling jitter below half a buffer is tolerated.
        assert!(!gaps.check(Duration::from_millis(240), 100));
    }

    #[test]
    fn gap_after_buffer_is_overflow() {
        let mut gaps = GapDetector::new(1000);
        gaps.check(Duration::ZERO, 100);
        assert!(gaps.check(Duration::from_millis(300), 100));
        assert!(!gaps.check(Duration::from_millis(400), 100));
    }

    #[test]
    fn converts_float_samples() {
        assert_eq!(i16::from_sample(0.0f32), 0);
        assert_eq!(i16::from_sample(1.0f32), i16::MAX);
        assert_eq!(i16::from_sample(-1.0f32), i16::MIN);
        assert_eq!(i16::from_sample(32768u16), 0);
    }
}
