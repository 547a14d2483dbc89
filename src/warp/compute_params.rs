// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use crate::WarpManager;
use crate::device_profile::DeviceProfile;
use crate::error::{ Result, WarpError };
use crate::pixel_format::PixelFormat;

pub const DEFAULT_EYE_RELIEF_DIAL: u8 = 3;
pub const DEFAULT_PPD: f64 = 10.0;

/// Flattened, immutable snapshot of everything a cache build needs.
/// Taken under the manager's locks once, then moved to the build thread.
#[derive(Clone)]
pub struct ComputeParams {
    pub profile: DeviceProfile,

    pub forward_warp: bool,
    pub mono_input: bool,
    pub swap_eyes: bool,
    pub left_eye_only: bool,

    pub scale: (f64, f64),
    pub scale_in: (f64, f64),
    /// Source pixels per degree of view, forward-warp only
    pub ppd: f64,

    /// (width, height, stride in bytes)
    pub input_size: (usize, usize, usize),
    pub output_size: (usize, usize, usize),
    pub format: PixelFormat,
}

impl ComputeParams {
    pub fn from_manager(mgr: &WarpManager) -> Result<Self> {
        let cfg = mgr.config.read().clone();
        let layout = mgr.layout.read().clone();

        if cfg.ppd > 0.0 && !cfg.forward_warp {
            return Err(WarpError::PpdWithoutForwardWarp);
        }
        if !(-1..=10).contains(&cfg.eye_relief_dial) {
            return Err(WarpError::EyeReliefOutOfRange(cfg.eye_relief_dial));
        }

        let dial = if cfg.eye_relief_dial >= 0 {
            cfg.eye_relief_dial as u8
        } else {
            match mgr.profile_reader.read().eye_relief_dial(cfg.device) {
                Ok(d) => d,
                Err(e) if cfg.strict_profile => return Err(e.into()),
                Err(e) => {
                    log::warn!("Eye relief detection failed ({e}), using dial position {DEFAULT_EYE_RELIEF_DIAL}");
                    DEFAULT_EYE_RELIEF_DIAL
                }
            }
        };

        let profile = DeviceProfile::select(cfg.device, &cfg.sdk_version, dial)?;

        let bpp = layout.format.bytes_per_pixel();
        let (in_w, in_h, in_stride) = layout.input_size;
        let (out_w, out_h, out_stride) = layout.output_size;
        if in_w == 0 || in_h == 0 || out_w == 0 || out_h == 0 {
            return Err(WarpError::InvalidGeometry(format!("empty frame: input {in_w}x{in_h}, output {out_w}x{out_h}")));
        }
        if in_stride < in_w * bpp || out_stride < out_w * bpp {
            return Err(WarpError::InvalidGeometry(format!("stride smaller than row: input {in_stride}, output {out_stride}")));
        }
        if !cfg.mono_input && in_w < 2 {
            return Err(WarpError::InvalidGeometry("side-by-side input needs at least 2 columns".into()));
        }

        Ok(Self {
            profile,
            forward_warp: cfg.forward_warp,
            mono_input: cfg.mono_input,
            swap_eyes: cfg.swap_eyes,
            left_eye_only: cfg.left_eye_only,
            scale: (f64::from(cfg.scale_width), f64::from(cfg.scale_height)),
            scale_in: (f64::from(cfg.scale_in_width), f64::from(cfg.scale_in_height)),
            ppd: if cfg.forward_warp {
                if cfg.ppd > 0.0 { f64::from(cfg.ppd) } else { DEFAULT_PPD }
            } else {
                0.0
            },
            input_size: layout.input_size,
            output_size: layout.output_size,
            format: layout.format,
        })
    }

    /// Width of one eye half in the source frame, in pixels.
    pub fn input_eye_width(&self) -> usize {
        if self.mono_input { self.input_size.0 } else { self.input_size.0 / 2 }
    }
}
