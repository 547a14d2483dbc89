// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use crate::distortion::{ DistortionCurve, NUM_SEGMENTS };
use crate::error::{ Result, WarpError };

/// Headsets with a known optical description.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Device {
    RiftDK1,
    RiftDK2,
}

impl std::str::FromStr for Device {
    type Err = WarpError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RiftDK1" => Ok(Device::RiftDK1),
            "RiftDK2" => Ok(Device::RiftDK2),
            _ => Err(WarpError::UnsupportedDevice(s.into())),
        }
    }
}
impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Device::RiftDK1 => "RiftDK1",
            Device::RiftDK2 => "RiftDK2",
        })
    }
}

/// SDK generations whose shipped distortion tables differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdkVersion {
    V0_2_5,
    V0_3_2,
    V0_4_4,
    V0_5_0,
}

impl SdkVersion {
    /// Version used when the user asks for "default": the first one shipped for each device.
    pub fn default_for(device: Device) -> Self {
        match device {
            Device::RiftDK1 => SdkVersion::V0_2_5,
            Device::RiftDK2 => SdkVersion::V0_4_4,
        }
    }
    pub fn parse(device: Device, s: &str) -> Result<Self> {
        match (device, s) {
            (_, "default")               => Ok(Self::default_for(device)),
            (Device::RiftDK1, "0.2.5")   => Ok(SdkVersion::V0_2_5),
            (Device::RiftDK1, "0.3.2")   => Ok(SdkVersion::V0_3_2),
            (Device::RiftDK2, "0.4.4")   => Ok(SdkVersion::V0_4_4),
            (Device::RiftDK2, "0.5.0")   => Ok(SdkVersion::V0_5_0),
            _ => Err(WarpError::UnsupportedSdkVersion { device, version: s.into() }),
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            SdkVersion::V0_2_5 => "0.2.5",
            SdkVersion::V0_3_2 => "0.3.2",
            SdkVersion::V0_4_4 => "0.4.4",
            SdkVersion::V0_5_0 => "0.5.0",
        }
    }
}

/// Per-plane chromatic aberration coefficients: `(offset, slope)` pairs for red, green, blue.
/// Green is the reference plane, its pair is always `(0, 0)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChromaticAberration {
    pairs: [(f64, f64); 3],
}

impl ChromaticAberration {
    /// Builds per-plane pairs from a raw `(r_off, r_slope, b_off, b_slope)` tuple.
    pub fn from_tuple(t: [f64; 4]) -> Self {
        Self { pairs: [(t[0], t[1]), (0.0, 0.0), (t[2], t[3])] }
    }

    /// Interpolates between two raw tuples on the eye relief dial position (0..=10).
    /// The endpoints reproduce `min`/`max` exactly.
    pub fn interpolate(min: [f64; 4], max: [f64; 4], dial: u8) -> Self {
        let t = f64::from(dial) / 10.0;
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = (1.0 - t) * min[i] + t * max[i];
        }
        Self::from_tuple(out)
    }

    #[inline]
    pub fn for_plane(&self, plane: usize) -> (f64, f64) {
        self.pairs[plane]
    }
}

/// Physical description of a headset's display and lenses.
#[derive(Clone, Debug, PartialEq)]
pub struct OpticalGeometry {
    /// Horizontal offset of the lens center from the eye-half center, in NDC units of one eye.
    /// Stored for the left eye; the right eye negates it.
    pub lens_center_x_offset: f64,
    /// Native panel resolution (both eyes side by side)
    pub device_res: (usize, usize),
    /// Physical screen size in meters
    pub screen_size_meters: (f64, f64),
    /// Meters per unit tangent angle at the optical center
    pub meters_per_tan_angle: f64,
}

impl OpticalGeometry {
    /// Scale from per-eye NDC to tangent-angle space.
    ///
    /// One eye covers a quarter of the screen width left to right of its lens center
    /// and half the screen height, hence the 4 and 2 divisors.
    pub fn tan_eye_angle_scale(&self) -> (f64, f64) {
        (self.screen_size_meters.0 / 4.0 / self.meters_per_tan_angle,
         self.screen_size_meters.1 / 2.0 / self.meters_per_tan_angle)
    }
}

// Raw device tables. Dial-dependent tables are (dial 0, dial 10) endpoint pairs.
const DK1_GEOMETRY: OpticalGeometry = OpticalGeometry {
    lens_center_x_offset: 0.1519875,
    device_res: (1280, 800),
    screen_size_meters: (0.14976, 0.0936),
    meters_per_tan_angle: 0.043875,
};
const DK2_GEOMETRY: OpticalGeometry = OpticalGeometry {
    lens_center_x_offset: 0.00986003876,
    device_res: (1920, 1080),
    screen_size_meters: (0.12576, 0.07074),
    meters_per_tan_angle: 0.036,
};

const DK1_POLY: [f64; 4] = [1.0, 0.22, 0.24, 0.0];
const DK1_RECIP_POLY: [f64; 4] = [1.0, -0.18, -0.04, 0.0];
const DK1_CA: [f64; 4] = [-0.006, 0.0, 0.014, 0.0];

const DK2_SPLINE_0_4_4: [f64; NUM_SEGMENTS] = [1.003, 1.02, 1.042, 1.066, 1.094, 1.126, 1.162, 1.203, 1.25, 1.31, 1.38];
const DK2_SPLINE_0_5_0: [f64; NUM_SEGMENTS] = [1.003, 1.019, 1.04, 1.062, 1.089, 1.121, 1.157, 1.198, 1.246, 1.304, 1.37];
const DK2_CA_MIN: [f64; 4] = [-0.0112, -0.015, 0.0187, 0.015];
const DK2_CA_MAX: [f64; 4] = [-0.0131, -0.0175, 0.02185, 0.0175];

/// Fully resolved optical profile of one device at one eye relief dial position.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceProfile {
    pub device: Device,
    pub sdk_version: SdkVersion,
    pub eye_relief_dial: u8,
    pub geometry: OpticalGeometry,
    pub curve: DistortionCurve,
    pub aberration: ChromaticAberration,
}

impl DeviceProfile {
    /// Looks up the device tables for `(device, sdk_version, eye_relief_dial)`.
    /// The dial has to be in 0..=10. DK1 optics don't depend on the dial.
    pub fn select(device: Device, sdk_version: &str, eye_relief_dial: u8) -> Result<Self> {
        if eye_relief_dial > 10 {
            return Err(WarpError::EyeReliefOutOfRange(i32::from(eye_relief_dial)));
        }
        let sdk_version = SdkVersion::parse(device, sdk_version)?;
        let (geometry, curve, aberration) = match (device, sdk_version) {
            (Device::RiftDK1, v) => {
                let curve = match v {
                    SdkVersion::V0_2_5 => DistortionCurve::Poly4 { k: DK1_POLY },
                    _                  => DistortionCurve::RecipPoly4 { k: DK1_RECIP_POLY },
                };
                (DK1_GEOMETRY, curve, ChromaticAberration::from_tuple(DK1_CA))
            }
            (Device::RiftDK2, v) => {
                let k = match v {
                    SdkVersion::V0_4_4 => DK2_SPLINE_0_4_4,
                    _                  => DK2_SPLINE_0_5_0,
                };
                (DK2_GEOMETRY,
                 DistortionCurve::CatmullRom10 { k, max_r: 1.0 },
                 ChromaticAberration::interpolate(DK2_CA_MIN, DK2_CA_MAX, eye_relief_dial))
            }
        };
        Ok(Self { device, sdk_version, eye_relief_dial, geometry, curve, aberration })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn dk2_tan_scale_matches_optics() {
        let (tx, ty) = DK2_GEOMETRY.tan_eye_angle_scale();
        assert!((tx - 0.8733).abs() < 1e-3, "{tx}");
        assert!((ty - 0.9825).abs() < 1e-9, "{ty}");
    }

    #[test]
    fn ca_interpolation_endpoints_are_exact() {
        let at_min = ChromaticAberration::interpolate(DK2_CA_MIN, DK2_CA_MAX, 0);
        let at_max = ChromaticAberration::interpolate(DK2_CA_MIN, DK2_CA_MAX, 10);
        assert_eq!(at_min, ChromaticAberration::from_tuple(DK2_CA_MIN));
        assert_eq!(at_max, ChromaticAberration::from_tuple(DK2_CA_MAX));
        assert_eq!(at_min.for_plane(1), (0.0, 0.0));
    }

    #[test]
    fn ca_interpolation_midpoint() {
        let mid = ChromaticAberration::interpolate(DK2_CA_MIN, DK2_CA_MAX, 5);
        let (r_off, r_slope) = mid.for_plane(0);
        assert!((r_off - (DK2_CA_MIN[0] + 0.5 * (DK2_CA_MAX[0] - DK2_CA_MIN[0]))).abs() < 1e-12);
        assert!((r_slope - (DK2_CA_MIN[1] + 0.5 * (DK2_CA_MAX[1] - DK2_CA_MIN[1]))).abs() < 1e-12);
    }

    #[test_case(Device::RiftDK2, "default", SdkVersion::V0_4_4; "dk2 default")]
    #[test_case(Device::RiftDK2, "0.5.0", SdkVersion::V0_5_0; "dk2 explicit")]
    #[test_case(Device::RiftDK1, "default", SdkVersion::V0_2_5; "dk1 default")]
    #[test_case(Device::RiftDK1, "0.3.2", SdkVersion::V0_3_2; "dk1 explicit")]
    fn version_resolution(device: Device, s: &str, expected: SdkVersion) {
        let p = DeviceProfile::select(device, s, 4).unwrap();
        assert_eq!(p.sdk_version, expected);
    }

    #[test]
    fn rejects_unknown_version_and_dial() {
        assert!(matches!(DeviceProfile::select(Device::RiftDK1, "0.5.0", 4), Err(WarpError::UnsupportedSdkVersion { .. })));
        assert!(matches!(DeviceProfile::select(Device::RiftDK2, "default", 11), Err(WarpError::EyeReliefOutOfRange(11))));
    }

    #[test]
    fn parses_device_names() {
        assert_eq!("RiftDK2".parse::<Device>().unwrap(), Device::RiftDK2);
        assert!(matches!("Vive".parse::<Device>(), Err(WarpError::UnsupportedDevice(_))));
    }
}
