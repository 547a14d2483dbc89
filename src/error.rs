// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use crate::device_profile::Device;

pub type Result<T> = std::result::Result<T, WarpError>;

#[derive(thiserror::Error, Debug)]
pub enum WarpError {
    #[error("Unsupported device {0:?}")]                             UnsupportedDevice(String),
    #[error("Unsupported SDK version {version:?} for {device}")]     UnsupportedSdkVersion { device: Device, version: String },
    #[error("Eye relief dial {0} out of range -1..=10")]             EyeReliefOutOfRange(i32),
    #[error("ppd is only meaningful in forward-warp mode")]          PpdWithoutForwardWarp,
    #[error("Conflicting size options: {0}")]                        ConflictingSizeOptions(&'static str),
    #[error("Invalid buffer geometry: {0}")]                         InvalidGeometry(String),
    #[error("Failed to allocate the mapping cache ({0} entries)")]   CacheAllocation(usize),
    #[error("Profile read error: {0}")]                              ProfileRead(#[from] ProfileReadError),
    #[error("IO error: {0:?}")]                                      IOError(#[from] std::io::Error),
}

/// Failure reasons reported by a [`crate::profile_reader::ProfileReader`].
/// The reason strings are surfaced verbatim to the user at configuration time.
#[derive(thiserror::Error, Debug)]
pub enum ProfileReadError {
    #[error("Profile file not found: {0}")]                                    FileNotFound(String),
    #[error("Malformed profile container: {0}")]                               Malformed(String),
    #[error("Profile root is not an object")]                                  MissingRootObject,
    #[error("Missing array field {0:?}")]                                      MissingArrayField(&'static str),
    #[error("Field {0:?} is missing or has an unexpected type")]               TypeMismatch(&'static str),
    #[error("More than one user profile matches and no default user is set")]  AmbiguousUser,
    #[error("No profile for device {0}")]                                      NoMatchingProfile(String),
}
