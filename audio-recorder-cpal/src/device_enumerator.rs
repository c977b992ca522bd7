//! Input device enumeration across every cpal host on this platform.
//!
//! Devices are numbered in one sequence across hosts, in host order. The
//! same enumeration is used to open a device by index, so indices from
//! `list_input_devices` stay meaningful as long as the hardware does not
//! change in between.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, HostId, SupportedBufferSize};

use audio_recorder_core::models::device::DeviceDescriptor;
use audio_recorder_core::models::error::RecorderError;

/// A device together with the host that exposes it.
pub(crate) struct HostDevice {
    pub host_id: HostId,
    pub device: Device,
    pub is_default: bool,
}

/// Enumerate all input devices of all available hosts.
pub(crate) fn host_devices() -> Result<Vec<HostDevice>, RecorderError> {
    let default_host = cpal::default_host().id();
    let mut devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(host) => host,
            Err(e) => {
                log::debug!("skipping unavailable audio host {}: {}", host_id.name(), e);
                continue;
            }
        };

        let default_name = if host_id == default_host {
            host.default_input_device().and_then(|d| d.name().ok())
        } else {
            None
        };

        let inputs = host
            .input_devices()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("failed to list input devices: {}", e)))?;
        for device in inputs {
            let is_default = match (&default_name, device.name()) {
                (Some(default), Ok(name)) => *default == name,
                _ => false,
            };
            devices.push(HostDevice {
                host_id,
                device,
                is_default,
            });
        }
    }

    Ok(devices)
}

/// Describe every audio input device.
pub fn list_input_devices() -> Result<Vec<DeviceDescriptor>, RecorderError> {
    let devices = host_devices()?;
    let mut descriptors = Vec::with_capacity(devices.len());

    for (index, entry) in devices.into_iter().enumerate() {
        let name = entry.device.name().unwrap_or_else(|_| "Unknown Device".to_string());
        let config = match entry.device.default_input_config() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("skipping input device {} without a default config: {}", name, e);
                continue;
            }
        };

        let sample_rate = config.sample_rate().0;
        let (low_latency_secs, high_latency_secs) = latency_bounds(config.buffer_size(), sample_rate);
        descriptors.push(DeviceDescriptor {
            host_api: entry.host_id.name().to_string(),
            index,
            is_default: entry.is_default,
            name,
            channels: config.channels(),
            sample_rate,
            low_latency_secs,
            high_latency_secs,
        });
    }

    Ok(descriptors)
}

/// Latency range implied by the host's buffer size limits, in seconds.
pub(crate) fn latency_bounds(buffer_size: &SupportedBufferSize, sample_rate: u32) -> (Option<f64>, Option<f64>) {
    match buffer_size {
        SupportedBufferSize::Range { min, max } if sample_rate > 0 => (
            Some(*min as f64 / sample_rate as f64),
            Some(*max as f64 / sample_rate as f64),
        ),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_from_buffer_range() {
        let (low, high) = latency_bounds(&SupportedBufferSize::Range { min: 64, max: 4800 }, 48000);
        assert_eq!(low, Some(64.0 / 48000.0));
        assert_eq!(high, Some(0.1));
    }

    #[test]
    fn unknown_buffer_size_has_no_latency() {
        assert_eq!(latency_bounds(&SupportedBufferSize::Unknown, 48000), (None, None));
        assert_eq!(
            latency_bounds(&SupportedBufferSize::Range { min: 1, max: 2 }, 0),
            (None, None)
        );
    }
}
