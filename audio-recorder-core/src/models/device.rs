use serde::{Deserialize, Serialize};

use super::error::RecorderError;

/// Snapshot of one audio input device.
///
/// Produced fresh by each enumeration call; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Name of the host audio API that exposes the device (e.g. "ALSA", "WASAPI").
    pub host_api: String,
    /// Position in the enumeration; this is the index recorders are configured with.
    pub index: usize,
    pub is_default: bool,
    pub name: String,
    /// Maximum number of input channels.
    pub channels: u16,
    /// Native (default) sample rate in Hz.
    pub sample_rate: u32,
    /// Lower latency bound in seconds, when the host reports buffer limits.
    pub low_latency_secs: Option<f64>,
    /// Upper latency bound in seconds, when the host reports buffer limits.
    pub high_latency_secs: Option<f64>,
}

/// Pick an input device from an enumeration.
///
/// - `None` selects the default device.
/// - A selector that parses as an integer selects that device index.
/// - Any other selector must be contained in exactly one device name.
pub fn resolve_input_device<'a>(
    devices: &'a [DeviceDescriptor],
    selector: Option<&str>,
) -> Result<&'a DeviceDescriptor, RecorderError> {
    if devices.is_empty() {
        return Err(RecorderError::DeviceUnavailable(
            "no input devices available".into(),
        ));
    }

    let Some(selector) = selector.map(str::trim) else {
        return devices
            .iter()
            .find(|d| d.is_default)
            .ok_or_else(|| RecorderError::DeviceUnavailable("no default input device available".into()));
    };

    if let Ok(index) = selector.parse::<usize>() {
        return devices
            .iter()
            .find(|d| d.index == index)
            .ok_or_else(|| RecorderError::DeviceUnavailable(format!("no input device with index {}", index)));
    }

    let mut matches = devices.iter().filter(|d| d.name.contains(selector));
    match (matches.next(), matches.next()) {
        (Some(device), None) => Ok(device),
        (None, _) => Err(RecorderError::DeviceUnavailable(format!(
            "no input device name includes \"{}\"",
            selector
        ))),
        (Some(_), Some(_)) => Err(RecorderError::DeviceUnavailable(format!(
            "more than one input device name includes \"{}\"",
            selector
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(index: usize, name: &str, is_default: bool) -> DeviceDescriptor {
        DeviceDescriptor {
            host_api: "Test".into(),
            index,
            is_default,
            name: name.into(),
            channels: 2,
            sample_rate: 48000,
            low_latency_secs: None,
            high_latency_secs: None,
        }
    }

    fn devices() -> Vec<DeviceDescriptor> {
        vec![
            device(0, "Built-in Microphone", false),
            device(1, "USB Audio CODEC", true),
            device(2, "USB Audio Interface", false),
        ]
    }

    #[test]
    fn no_selector_picks_default() {
        let devices = devices();
        assert_eq!(resolve_input_device(&devices, None).unwrap().index, 1);
    }

    #[test]
    fn numeric_selector_picks_index() {
        let devices = devices();
        assert_eq!(resolve_input_device(&devices, Some("2")).unwrap().index, 2);
        assert!(resolve_input_device(&devices, Some("7"))
            .unwrap_err()
            .is_device_unavailable());
    }

    #[test]
    fn name_selector_must_be_unique() {
        let devices = devices();
        assert_eq!(resolve_input_device(&devices, Some("Built-in")).unwrap().index, 0);
        assert_eq!(resolve_input_device(&devices, Some("CODEC")).unwrap().index, 1);

        let err = resolve_input_device(&devices, Some("USB")).unwrap_err();
        assert!(err.to_string().contains("more than one"));

        let err = resolve_input_device(&devices, Some("Bluetooth")).unwrap_err();
        assert!(err.to_string().contains("no input device name"));
    }

    #[test]
    fn missing_default_is_an_error() {
        let devices = vec![device(0, "Line In", false)];
        assert!(resolve_input_device(&devices, None).is_err());
        assert!(resolve_input_device(&[], Some("0")).is_err());
    }
}
