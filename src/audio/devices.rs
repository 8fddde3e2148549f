use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, RecorderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Capture,
    Playback,
}

/// An audio endpoint reported by the host. `id` is what `microphone_id` expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
}

/// Microphones and other inputs
pub fn capture_devices() -> RecorderResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| RecorderError::device("capture", e))?;
    Ok(collect(devices, DeviceKind::Capture))
}

/// Speakers and other outputs (loopback sources)
pub fn playback_devices() -> RecorderResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| RecorderError::device("playback", e))?;
    Ok(collect(devices, DeviceKind::Playback))
}

pub fn all_devices() -> RecorderResult<Vec<AudioDevice>> {
    let mut devices = capture_devices()?;
    devices.extend(playback_devices()?);
    Ok(devices)
}

fn collect(devices: impl Iterator<Item = cpal::Device>, kind: DeviceKind) -> Vec<AudioDevice> {
    devices
        .filter_map(|d| d.name().ok())
        .map(|name| AudioDevice {
            id: name.clone(),
            name,
            kind,
        })
        .collect()
}

/// Devices of one kind, or every device when `kind` is `None`
pub fn list_devices(kind: Option<DeviceKind>) -> RecorderResult<Vec<AudioDevice>> {
    match kind {
        Some(DeviceKind::Capture) => capture_devices(),
        Some(DeviceKind::Playback) => playback_devices(),
        None => all_devices(),
    }
}
