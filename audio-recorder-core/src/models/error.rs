use thiserror::Error;

/// Errors that can occur while configuring or running a recorder.
///
/// `DeviceUnavailable` and `ConfigurationFailed` are returned synchronously
/// to callers. `StreamFault` is only ever observed by listeners, as the
/// fault indicator of a terminal `recording_stopped` notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("stream fault: {0}")]
    StreamFault(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("recorder engine has stopped")]
    EngineStopped,
}

impl RecorderError {
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, Self::DeviceUnavailable(_))
    }
}
