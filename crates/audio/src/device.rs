use crate::PlaybackError;
use cpal::traits::{DeviceTrait, HostTrait};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutputDevice {
    pub name: String,
    pub is_default: bool,
}

fn unavailable(e: impl std::fmt::Display) -> PlaybackError {
    PlaybackError::DeviceUnavailable(e.to_string())
}

pub fn list_output_devices() -> crate::Result<Vec<OutputDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.output_devices().map_err(unavailable)? {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let is_default = default_name.as_ref() == Some(&name);
        devices.push(OutputDevice { name, is_default });
    }

    Ok(devices)
}

pub fn default_output_device() -> crate::Result<Option<OutputDevice>> {
    let host = cpal::default_host();
    Ok(host.default_output_device().map(|device| OutputDevice {
        name: device.name().unwrap_or_else(|_| "Unknown".to_string()),
        is_default: true,
    }))
}

pub fn find_output_device(name: &str) -> crate::Result<Option<OutputDevice>> {
    let devices = list_output_devices()?;
    Ok(devices.into_iter().find(|d| d.name == name))
}

/// Open the named output device, or the host default when `name` is `None`.
pub(crate) fn open_output_device(name: Option<&str>) -> crate::Result<cpal::Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .output_devices()
            .map_err(unavailable)?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .ok_or_else(|| unavailable(format!("no output device named '{}'", name))),
        None => host
            .default_output_device()
            .ok_or_else(|| unavailable("no default output device")),
    }
}
