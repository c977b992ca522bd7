//! # audio-recorder-core
//!
//! Platform-agnostic asynchronous audio recorder.
//!
//! A `Recorder` owns one consumer thread that serializes start, stop, and
//! captured-buffer commands and fans recording events out to listeners.
//! Input backends (cpal, or a mock in tests) implement `InputBackend` and
//! push buffers through the `CaptureSink` they are handed when a stream
//! opens. An optional `Schedule` decides when recording is on.
//!
//! ## Architecture
//!
//! ```text
//! audio-recorder-core (this crate)
//! ├── traits/      ← InputBackend, InputStream, RecorderListener, Scheduler, ScheduleListener
//! ├── models/      ← RecorderError, RecorderState, RecorderConfiguration, Command, DeviceDescriptor
//! ├── engine/      ← Recorder, CommandQueue, CaptureSink, BufferPool, Notifier
//! ├── schedule/    ← Schedule, ScheduleRunner, ScheduleBridge
//! ├── storage/     ← WAV header and writer, metadata sidecars
//! └── listeners/   ← AudioFileWriter, LoggingListener
//! ```

pub mod engine;
pub mod listeners;
pub mod models;
pub mod schedule;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use engine::capture_sink::{CallbackFlow, CaptureSink};
pub use engine::command_queue::{CommandQueue, CommandSender};
pub use engine::recorder::Recorder;
pub use listeners::audio_file_writer::{AudioFileWriter, DEFAULT_MAX_AUDIO_FILE_SIZE};
pub use listeners::logging::LoggingListener;
pub use models::command::{Command, InputBuffer};
pub use models::config::{RecorderConfiguration, SAMPLE_WIDTH};
pub use models::device::{resolve_input_device, DeviceDescriptor};
pub use models::diagnostics::RecorderDiagnostics;
pub use models::error::RecorderError;
pub use models::recording_result::RecordingMetadata;
pub use models::state::RecorderState;
pub use schedule::runner::ScheduleRunner;
pub use schedule::schedule::{Interval, Schedule, Transition};
pub use storage::wav_writer::WavFileWriter;
pub use traits::input_backend::{InputBackend, InputStream};
pub use traits::recorder_listener::RecorderListener;
pub use traits::scheduler::{ScheduleListener, Scheduler};
