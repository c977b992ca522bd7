//! # audio-recorder-cpal
//!
//! Cross-platform input backend for audio-recorder, built on cpal.
//!
//! Provides:
//! - `CpalBackend`: an `InputBackend` that opens devices by enumeration index
//! - `list_input_devices`: descriptors of every input device on every host
//!
//! ## Usage
//! ```ignore
//! use audio_recorder_core::{Recorder, RecorderConfiguration};
//! use audio_recorder_cpal::CpalBackend;
//!
//! let recorder = Recorder::create(RecorderConfiguration::default(), CpalBackend::new())?;
//! recorder.start()?;
//! ```

pub mod cpal_input;
pub mod device_enumerator;

pub use cpal_input::{CpalBackend, CpalStream};
pub use device_enumerator::list_input_devices;
