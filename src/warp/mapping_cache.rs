// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use rayon::prelude::*;

use crate::distortion::DEFAULT_INVERT_CEILING;
use crate::error::{ Result, WarpError };
use super::compute_params::ComputeParams;

/// Where one output byte comes from: a flattened byte offset into the input frame,
/// or nowhere (outside the source, filled with black).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheEntry {
    Source(u32),
    NoSource,
}

/// Precomputed per-byte source mapping for one `(config, geometry)` epoch.
/// Holds exactly `out_w * out_h * bytes_per_pixel` entries, row-major, channel-interleaved.
/// Immutable once built; rebuilt from scratch whenever the configuration changes.
pub struct MappingCache {
    entries: Vec<CacheEntry>,
    input_size: (usize, usize, usize),
    output_size: (usize, usize, usize),
    bytes_per_pixel: usize,
}

impl MappingCache {
    pub fn build(params: &ComputeParams) -> Result<Self> {
        let (out_w, out_h, _) = params.output_size;
        let bpp = params.format.bytes_per_pixel();
        let row_len = out_w * bpp;
        let len = out_h * row_len;

        let mut entries = Vec::new();
        entries.try_reserve_exact(len).map_err(|_| WarpError::CacheAllocation(len))?;
        entries.resize(len, CacheEntry::NoSource);

        entries.par_chunks_mut(row_len).enumerate().for_each(|(i, row)| {
            let eye_w = out_w / 2;
            for eye in 0..2 {
                if params.left_eye_only && eye == 1 { continue; }
                for j in 0..eye_w {
                    let base = (eye * eye_w + j) * bpp;
                    map_pixel(params, i, j, eye, &mut row[base..base + bpp]);
                }
            }
        });

        Ok(Self {
            entries,
            input_size: params.input_size,
            output_size: params.output_size,
            bytes_per_pixel: bpp,
        })
    }

    #[inline] pub fn entries(&self)         -> &[CacheEntry]          { &self.entries }
    #[inline] pub fn input_size(&self)      -> (usize, usize, usize)  { self.input_size }
    #[inline] pub fn output_size(&self)     -> (usize, usize, usize)  { self.output_size }
    #[inline] pub fn bytes_per_pixel(&self) -> usize                  { self.bytes_per_pixel }
}

/// Fills the cache entries of one output pixel, one per interleaved byte channel.
/// Pure function of `(pixel position, eye, params)`, so rows can be built in parallel.
fn map_pixel(params: &ComputeParams, i: usize, j: usize, eye: usize, out: &mut [CacheEntry]) {
    let (out_w, out_h, _) = params.output_size;
    let (_, in_h, in_stride) = params.input_size;
    let bpp = params.format.bytes_per_pixel();
    let eye_w = out_w / 2;
    let in_eye_w = params.input_eye_width();

    // Output pixel to per-eye NDC, undoing the output zoom and keeping the apparent
    // field of view independent of the output resolution
    let ndcx = (-1.0 + 2.0 * (j as f64 / eye_w as f64)) / params.scale.0 * (out_w as f64 / params.input_size.0 as f64);
    let ndcy = (-1.0 + 2.0 * (i as f64 / out_h as f64)) / params.scale.1 * (out_h as f64 / in_h as f64);

    let (tan_x, tan_y) = params.profile.geometry.tan_eye_angle_scale();
    let tx = ndcx * tan_x;
    let ty = ndcy * tan_y;
    let rsq = tx * tx + ty * ty;

    // Radial scale per color plane; the alpha byte reuses the zero-CA green plane
    let mut radial = [0.0f64; 3];
    for (plane, r) in radial.iter_mut().enumerate() {
        let ca = params.profile.aberration.for_plane(plane);
        *r = if params.forward_warp {
            params.profile.curve.scale_with_ca(rsq, ca)
        } else if rsq < 1e-12 {
            1.0 / params.profile.curve.scale_with_ca(0.0, ca)
        } else {
            let new_rsq = params.profile.curve.invert_scale(rsq, ca, DEFAULT_INVERT_CEILING);
            (new_rsq / rsq).sqrt()
        };
    }

    // Lens center offset is stored for the left eye, mirrored for the right
    let offset = if eye == 0 { -params.profile.geometry.lens_center_x_offset }
                 else        {  params.profile.geometry.lens_center_x_offset };
    let src_eye = if params.mono_input { 0 }
                  else if params.swap_eyes { 1 - eye }
                  else { eye };
    let eye_base = src_eye * in_eye_w;

    // In forward mode the source is flat footage, so tangent units convert to source
    // pixels through the pixels-per-degree density instead of the lens tan scale
    let px_per_tan = params.ppd * (180.0 / std::f64::consts::PI);

    for (ch, entry) in out.iter_mut().enumerate() {
        let plane = params.format.color_plane(ch).unwrap_or(1);
        let (dtx, dty) = (tx * radial[plane], ty * radial[plane]);

        let (mut sx_ndc, mut sy_ndc) = if params.forward_warp {
            (dtx * px_per_tan / (in_eye_w as f64 / 2.0), dty * px_per_tan / (in_h as f64 / 2.0))
        } else {
            (dtx / tan_x, dty / tan_y)
        };
        sx_ndc = (sx_ndc + offset) / params.scale_in.0;
        sy_ndc /= params.scale_in.1;

        let x = ((sx_ndc + 1.0) / 2.0 * in_eye_w as f64).floor();
        let y = ((sy_ndc + 1.0) / 2.0 * in_h as f64).floor();

        *entry = if x >= 0.0 && y >= 0.0 && (x as usize) < in_eye_w && (y as usize) < in_h {
            let off = y as usize * in_stride + (eye_base + x as usize) * bpp + ch;
            match u32::try_from(off) {
                Ok(off) => CacheEntry::Source(off),
                Err(_) => CacheEntry::NoSource,
            }
        } else {
            CacheEntry::NoSource
        };
    }
}

#[cfg(test)]
pub(crate) fn test_params(out: (usize, usize), input: (usize, usize), format: crate::pixel_format::PixelFormat) -> ComputeParams {
    use crate::device_profile::{ Device, DeviceProfile };
    let bpp = format.bytes_per_pixel();
    ComputeParams {
        profile: DeviceProfile::select(Device::RiftDK2, "default", 3).unwrap(),
        forward_warp: false,
        mono_input: false,
        swap_eyes: false,
        left_eye_only: false,
        scale: (1.0, 1.0),
        scale_in: (1.0, 1.0),
        ppd: 0.0,
        input_size: (input.0, input.1, input.0 * bpp),
        output_size: (out.0, out.1, out.0 * bpp),
        format,
    }
}
