use crate::engine::capture_sink::CaptureSink;
use crate::models::config::RecorderConfiguration;
use crate::models::error::RecorderError;

/// Interface for platform-specific audio input.
///
/// A backend is moved onto the recorder's consumer thread when the recorder
/// is created; `open` and every returned stream are used only there, so
/// streams need not be `Send`.
///
/// Implemented by:
/// - `CpalBackend` (audio-recorder-cpal)
pub trait InputBackend: Send + 'static {
    /// Open and start an input stream for `config`.
    ///
    /// The backend hands each filled buffer to `sink` from its driver
    /// thread, and reports stream errors through `CaptureSink::fault`.
    /// Failures to open must be reported as `RecorderError::DeviceUnavailable`.
    fn open(
        &mut self,
        config: &RecorderConfiguration,
        sink: CaptureSink,
    ) -> Result<Box<dyn InputStream>, RecorderError>;
}

/// An open hardware input stream.
pub trait InputStream {
    /// Stop the stream and release the device.
    fn close(self: Box<Self>) -> Result<(), RecorderError>;
}
