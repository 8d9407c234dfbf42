//! Output device enumeration and lookup
//!
//! Devices are listed across every available cpal host, so a JACK server
//! and the raw ALSA devices both show up on Linux.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Display name for a host
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

fn host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|&id| host_name(id) == name)
        .and_then(|id| cpal::host_from_id(id).ok())
}

/// One output device as seen by the user
#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub id: DeviceId,
    pub is_default: bool,
    pub max_channels: u16,
    /// Common rates within the supported ranges
    pub sample_rates: Vec<u32>,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id.display_label())?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// All output devices on all hosts, defaults first
pub fn list_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let mut devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(host) => host,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };
        let host_label = host_name(host_id);
        let default_name = host
            .default_output_device()
            .and_then(|d: cpal::Device| d.name().ok());

        let outputs = match host.output_devices() {
            Ok(outputs) => outputs,
            Err(e) => {
                log::debug!("Could not enumerate devices for {:?}: {}", host_id, e);
                continue;
            }
        };

        for device in outputs {
            let Ok(name) = device.name() else { continue };
            let Ok(configs) = device.supported_output_configs() else {
                continue;
            };
            let configs: Vec<_> = configs.collect();
            if configs.is_empty() {
                continue;
            }

            let max_channels = configs.iter().map(|c| c.channels()).max().unwrap_or(0);
            let mut sample_rates: Vec<u32> = [44100, 48000, 88200, 96000, 192000]
                .into_iter()
                .filter(|&rate| {
                    configs
                        .iter()
                        .any(|c| rate >= c.min_sample_rate().0 && rate <= c.max_sample_rate().0)
                })
                .collect();
            sample_rates.dedup();

            devices.push(AudioDevice {
                is_default: default_name.as_ref() == Some(&name),
                id: DeviceId::with_host(&name, &host_label),
                max_channels,
                sample_rates,
            });
        }
    }

    if devices.is_empty() {
        return Err(AudioError::NoOutputDevices);
    }

    devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.id.host.cmp(&b.id.host))
            .then_with(|| a.id.name.cmp(&b.id.name))
    });

    log::info!("Enumerated {} output devices", devices.len());
    Ok(devices)
}

/// Resolve a configured device, searching every host when none is named
pub fn find_device(id: &DeviceId) -> AudioResult<cpal::Device> {
    if let Some(host) = id.host.as_deref().and_then(host_by_name) {
        return host
            .output_devices()
            .map_err(|e| AudioError::Negotiation(e.to_string()))?
            .find(|d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name))
            .ok_or_else(|| AudioError::UnknownDevice(id.display_label()));
    }

    for host_id in cpal::available_hosts() {
        let Ok(host) = cpal::host_from_id(host_id) else { continue };
        let Ok(mut outputs) = host.output_devices() else { continue };
        if let Some(device) = outputs.find(|d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name)) {
            return Ok(device);
        }
    }

    Err(AudioError::UnknownDevice(id.display_label()))
}

/// The default output device of the default host
pub fn default_device() -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    host.default_output_device()
        .ok_or_else(|| AudioError::NoDefaultOutput(host_name(host.id())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_does_not_panic() {
        // CI machines usually have no audio hardware
        match list_output_devices() {
            Ok(devices) => {
                for device in &devices {
                    println!("{} {:?}", device, device.sample_rates);
                }
            }
            Err(AudioError::NoOutputDevices) => println!("No audio devices available"),
            Err(e) => println!("Enumeration failed: {}", e),
        }
    }

    #[test]
    fn test_missing_device_reports_label() {
        let id = DeviceId::with_host("no-such-device-chordcast", "NoSuchHost");
        match find_device(&id) {
            Err(AudioError::UnknownDevice(label)) => assert!(label.contains("no-such-device")),
            Err(_) => {}
            Ok(_) => panic!("found a device that should not exist"),
        }
    }
}
