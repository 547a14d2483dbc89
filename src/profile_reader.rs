// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use std::path::{ Path, PathBuf };

use crate::device_profile::Device;
use crate::error::ProfileReadError;

/// Source of per-user device settings. Only the eye relief dial position is read from it,
/// so the rest of the pipeline never sees the underlying document format.
pub trait ProfileReader {
    fn eye_relief_dial(&self, device: Device) -> Result<u8, ProfileReadError>;
}

/// Used when no profile source is configured.
#[derive(Default)]
pub struct NoProfileReader;

impl ProfileReader for NoProfileReader {
    fn eye_relief_dial(&self, device: Device) -> Result<u8, ProfileReadError> {
        Err(ProfileReadError::NoMatchingProfile(device.to_string()))
    }
}

/// Reads the dial position from a JSON profile document:
///
/// ```json
/// { "users":        [ { "name": "...", "devices": { "RiftDK2": { "eye_relief_dial": 4 } } } ],
///   "default_user": "..." }
/// ```
///
/// A single user is used as-is; with several users, `default_user` has to pick one.
pub struct JsonProfileReader {
    path: PathBuf,
}

/// Typed shape of one per-device record inside a user profile.
#[derive(serde::Deserialize)]
struct DeviceSettings {
    eye_relief_dial: u8,
}

impl JsonProfileReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn parse(data: &str, device: Device) -> Result<u8, ProfileReadError> {
        let doc: serde_json::Value = serde_json::from_str(data).map_err(|e| ProfileReadError::Malformed(e.to_string()))?;
        let root = doc.as_object().ok_or(ProfileReadError::MissingRootObject)?;
        let users = root.get("users").and_then(|u| u.as_array()).ok_or(ProfileReadError::MissingArrayField("users"))?;

        let user = match users.len() {
            0 => return Err(ProfileReadError::NoMatchingProfile(device.to_string())),
            1 => &users[0],
            _ => {
                let name = root.get("default_user").and_then(|x| x.as_str()).ok_or(ProfileReadError::AmbiguousUser)?;
                users.iter()
                     .find(|u| u.get("name").and_then(|n| n.as_str()) == Some(name))
                     .ok_or(ProfileReadError::AmbiguousUser)?
            }
        };

        let devices = user.get("devices").and_then(|d| d.as_object()).ok_or(ProfileReadError::TypeMismatch("devices"))?;
        let entry = devices.get(&device.to_string()).ok_or_else(|| ProfileReadError::NoMatchingProfile(device.to_string()))?;
        let settings: DeviceSettings = serde_json::from_value(entry.clone())
            .map_err(|_| ProfileReadError::TypeMismatch("eye_relief_dial"))?;
        if settings.eye_relief_dial > 10 {
            return Err(ProfileReadError::TypeMismatch("eye_relief_dial"));
        }
        Ok(settings.eye_relief_dial)
    }
}

impl ProfileReader for JsonProfileReader {
    fn eye_relief_dial(&self, device: Device) -> Result<u8, ProfileReadError> {
        let data = std::fs::read_to_string(&self.path)
            .map_err(|_| ProfileReadError::FileNotFound(self.path.display().to_string()))?;
        Self::parse(&data, device)
    }
}
