// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2023 Adrian <adrian.eddy at gmail>

mod catmull_rom;
pub use catmull_rom::{ eval_spline, NUM_SEGMENTS };

/// Upper bound of the bisection search in squared-radius units.
/// All supported headsets keep their whole visible field below this radius.
pub const DEFAULT_INVERT_CEILING: f64 = 1.5;

const RELATIVE_TOL: f64 = 1e-4;
const ZERO_ROOT_GUARD: f64 = 1e-5;
const MAX_ITERATIONS: usize = 64;

/// Radial distortion curve of one lens, evaluated on the squared radius in tangent-angle space.
///
/// Every variant returns the scale factor to apply to a tangent-space point to go from the
/// undistorted (flat) image to the distorted (headset screen) image.
#[derive(Clone, Debug, PartialEq)]
pub enum DistortionCurve {
    /// `k0 + k1*rsq + k2*rsq² + k3*rsq³`
    Poly4 { k: [f64; 4] },
    /// Reciprocal of the same polynomial
    RecipPoly4 { k: [f64; 4] },
    /// Catmull-Rom spline through 11 control points spread evenly over squared radius,
    /// with `max_r` being the radius of the last control point
    CatmullRom10 { k: [f64; NUM_SEGMENTS], max_r: f64 },
}

impl DistortionCurve {
    pub fn scale(&self, rsq: f64) -> f64 {
        match self {
            Self::Poly4      { k } => k[0] + rsq * (k[1] + rsq * (k[2] + rsq * k[3])),
            Self::RecipPoly4 { k } => 1.0 / (k[0] + rsq * (k[1] + rsq * (k[2] + rsq * k[3]))),
            Self::CatmullRom10 { k, max_r } => eval_spline(k, (NUM_SEGMENTS - 1) as f64 * rsq / (max_r * max_r)),
        }
    }

    /// Distortion scale with the chromatic aberration correction of one color plane applied.
    /// `ca` is the (offset, slope) pair: the curve is multiplied by `1 + ca.0 + ca.1 * rsq`.
    pub fn scale_with_ca(&self, rsq: f64, ca: (f64, f64)) -> f64 {
        self.scale(rsq) * (1.0 + ca.0 + ca.1 * rsq)
    }

    /// Numerically inverts the distortion: finds `new_rsq` such that
    /// `scale_with_ca(new_rsq, ca)² * new_rsq == rsq`, by bisection over `[0, ceiling]`.
    ///
    /// Relies on the left side being monotonically increasing in `new_rsq`, which holds for
    /// all device curves. Terminates once the bracket is within a 1e-4 relative width, or
    /// when the root is indistinguishable from zero, and returns the bracket midpoint.
    pub fn invert_scale(&self, rsq: f64, ca: (f64, f64), ceiling: f64) -> f64 {
        let mut low = 0.0f64;
        let mut high = ceiling;
        for _ in 0..MAX_ITERATIONS {
            // Written multiplication-side to stay division-free while `low` is still zero
            if (high - low) <= low * RELATIVE_TOL || high <= ZERO_ROOT_GUARD {
                break;
            }
            let mid = 0.5 * (low + high);
            let s = self.scale_with_ca(mid, ca);
            if rsq < s * s * mid {
                high = mid;
            } else {
                low = mid;
            }
        }
        0.5 * (low + high)
    }
}
