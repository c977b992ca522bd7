//! JSON configuration of the `audio-recorder` binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use audio_recorder_core::{RecorderConfiguration, RecorderError, Schedule, DEFAULT_MAX_AUDIO_FILE_SIZE};

/// Name of the configuration file looked for in the home directory.
pub const CONFIG_FILE_NAME: &str = "recorder.json";

pub const DEFAULT_PORT_NUM: u16 = 8001;

/// An input device given by enumeration index or by part of its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceSelector {
    Index(usize),
    Name(String),
}

impl DeviceSelector {
    /// Selector text as understood by `resolve_input_device`.
    pub fn as_selector(&self) -> String {
        match self {
            Self::Index(index) => index.to_string(),
            Self::Name(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub station_name: String,
    /// `None` records from the default input device.
    pub input_device: Option<DeviceSelector>,
    pub num_channels: u16,
    pub sample_rate: u32,
    /// Capture buffer length in seconds.
    pub buffer_size: f64,
    /// Without a schedule the recorder runs until stopped by hand.
    pub schedule: Option<Schedule>,
    /// Relative paths are taken relative to the home directory.
    pub recordings_dir_path: PathBuf,
    pub max_audio_file_size: u64,
    /// Port of the HTTP status page; `null` turns the page off.
    pub port_num: Option<u16>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            station_name: "Recorder".into(),
            input_device: None,
            num_channels: 1,
            sample_rate: 22050,
            buffer_size: 0.05,
            schedule: None,
            recordings_dir_path: PathBuf::from("Recordings"),
            max_audio_file_size: DEFAULT_MAX_AUDIO_FILE_SIZE,
            port_num: Some(DEFAULT_PORT_NUM),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, RecorderError> {
        serde_json::from_str(json).map_err(|e| RecorderError::ConfigurationFailed(format!("invalid configuration: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, RecorderError> {
        let json = fs::read_to_string(path).map_err(|e| {
            RecorderError::ConfigurationFailed(format!("failed to read configuration {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Buffer size in frames, `round(buffer_size * sample_rate)`.
    pub fn buffer_frames(&self) -> u32 {
        (self.buffer_size * self.sample_rate as f64).round().max(0.0) as u32
    }

    pub fn recordings_dir(&self, home: &Path) -> PathBuf {
        if self.recordings_dir_path.is_absolute() {
            self.recordings_dir_path.clone()
        } else {
            home.join(&self.recordings_dir_path)
        }
    }

    pub fn recorder_config(&self, device_index: usize) -> RecorderConfiguration {
        RecorderConfiguration {
            device_index,
            channels: self.num_channels,
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_frames(),
            schedule: self.schedule.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());

        let config = AppConfig {
            sample_rate: 20000,
            ..config
        };
        assert_eq!(config.buffer_frames(), 1000);
        assert_eq!(config.max_audio_file_size, 1 << 31);
        assert_eq!(config.port_num, Some(8001));
    }

    #[test]
    fn status_port_can_be_moved_or_disabled() {
        let config = AppConfig::from_json(r#"{"port_num": 9000}"#).unwrap();
        assert_eq!(config.port_num, Some(9000));

        let config = AppConfig::from_json(r#"{"port_num": null}"#).unwrap();
        assert_eq!(config.port_num, None);

        assert!(AppConfig::from_json(r#"{"port_num": 70000}"#).is_err());
    }

    #[test]
    fn parses_full_configuration() {
        let config = AppConfig::from_json(
            r#"{
                "station_name": "Ithaca",
                "input_device": "USB",
                "num_channels": 2,
                "sample_rate": 48000,
                "buffer_size": 0.1,
                "schedule": [{"start": "2024-06-01T01:00:00Z", "end": "2024-06-01T05:00:00Z"}],
                "recordings_dir_path": "/data/recordings",
                "max_audio_file_size": 1000000
            }"#,
        )
        .unwrap();

        assert_eq!(config.station_name, "Ithaca");
        assert_eq!(config.input_device, Some(DeviceSelector::Name("USB".into())));
        assert_eq!(config.buffer_frames(), 4800);
        assert_eq!(config.schedule.as_ref().map(|s| s.intervals().len()), Some(1));
        assert_eq!(config.recordings_dir(Path::new("/home")), PathBuf::from("/data/recordings"));

        let recorder = config.recorder_config(3);
        assert_eq!(recorder.device_index, 3);
        assert_eq!(recorder.channels, 2);
        assert_eq!(recorder.sample_rate, 48000);
        assert_eq!(recorder.buffer_size, 4800);
        assert!(recorder.schedule.is_some());
        assert!(recorder.validate().is_ok());
    }

    #[test]
    fn device_may_be_an_index() {
        let config = AppConfig::from_json(r#"{"input_device": 2}"#).unwrap();
        assert_eq!(config.input_device, Some(DeviceSelector::Index(2)));
        assert_eq!(config.input_device.unwrap().as_selector(), "2");
    }

    #[test]
    fn relative_recordings_dir_is_under_home() {
        let config = AppConfig::default();
        assert_eq!(
            config.recordings_dir(Path::new("/srv/recorder")),
            PathBuf::from("/srv/recorder/Recordings")
        );
    }

    #[test]
    fn tiny_buffer_fails_validation() {
        let config = AppConfig {
            buffer_size: 0.00001,
            ..AppConfig::default()
        };
        assert_eq!(config.buffer_frames(), 0);
        assert!(config.recorder_config(0).validate().is_err());
    }

    #[test]
    fn bad_json_is_configuration_error() {
        let err = AppConfig::from_json(r#"{"num_channels": "two"}"#).unwrap_err();
        assert!(matches!(err, RecorderError::ConfigurationFailed(_)));

        let err = AppConfig::load(Path::new("/nonexistent/recorder.json")).unwrap_err();
        assert!(matches!(err, RecorderError::ConfigurationFailed(_)));
    }
}
