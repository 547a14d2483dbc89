// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2023 Adrian <adrian.eddy at gmail>

/// Number of control points in an eye-relief distortion spline.
pub const NUM_SEGMENTS: usize = 11;

/// Evaluates a Catmull-Rom spline over `k` at `scaled_val` in segment units (0..NUM_SEGMENTS-1).
///
/// The control point 0 is pinned to 1.0 so the curve is an identity scale at the optical center.
/// Past the last control point the curve continues as a straight line with the terminal slope,
/// which keeps the evaluator monotone for well-formed (increasing) tables.
pub fn eval_spline(k: &[f64; NUM_SEGMENTS], scaled_val: f64) -> f64 {
    let floor = scaled_val.floor().clamp(0.0, (NUM_SEGMENTS - 1) as f64);
    let t = scaled_val - floor;
    let seg = floor as usize;

    let (p0, m0, p1, m1) = match seg {
        0 => (1.0, k[1] - k[0], k[1], 0.5 * (k[2] - k[0])),
        s if s == NUM_SEGMENTS - 2 => (k[s], 0.5 * (k[s + 1] - k[s]), k[s + 1], k[s + 1] - k[s]),
        s if s >= NUM_SEGMENTS - 1 => {
            let m = k[NUM_SEGMENTS - 1] - k[NUM_SEGMENTS - 2];
            (k[NUM_SEGMENTS - 1], m, k[NUM_SEGMENTS - 1] + m, m)
        }
        s => (k[s], 0.5 * (k[s + 1] - k[s - 1]), k[s + 1], 0.5 * (k[s + 2] - k[s])),
    };

    // Cubic Hermite blend between p0 and p1
    let omt = 1.0 - t;
    (p0 * (1.0 + 2.0 * t) + m0 * t) * omt * omt
        + (p1 * (1.0 + 2.0 * omt) - m1 * omt) * t * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const DK2_DIAL_4: [f64; NUM_SEGMENTS] = [1.003, 1.02, 1.042, 1.066, 1.094, 1.126, 1.162, 1.203, 1.25, 1.31, 1.38];

    #[test]
    fn identity_at_center() {
        assert_eq!(eval_spline(&DK2_DIAL_4, 0.0), 1.0);
    }

    #[test]
    fn hits_control_points() {
        for (i, &k) in DK2_DIAL_4.iter().enumerate().skip(1) {
            let v = eval_spline(&DK2_DIAL_4, i as f64);
            assert!((v - k).abs() < 1e-12, "point {i}: {v} vs {k}");
        }
    }

    #[test]
    fn monotone_over_domain() {
        let mut prev = eval_spline(&DK2_DIAL_4, 0.0);
        for i in 1..=1500 {
            let v = eval_spline(&DK2_DIAL_4, i as f64 * 0.01);
            assert!(v >= prev, "not monotone at {}: {v} < {prev}", i as f64 * 0.01);
            prev = v;
        }
    }

    #[test]
    fn last_interior_segment_tangents() {
        // Segment 9 flattens both tangents to (halved) forward differences instead of
        // central ones. Hand-evaluated Hermite blend at t = 0.5 with p0 = K[9],
        // m0 = 0.5*(K[10]-K[9]), p1 = K[10], m1 = K[10]-K[9]:
        let v = eval_spline(&DK2_DIAL_4, 9.5);
        assert!((v - 1.340625).abs() < 1e-12, "{v}");
    }

    #[test]
    fn linear_extrapolation_past_last_point() {
        let slope = DK2_DIAL_4[10] - DK2_DIAL_4[9];
        let v = eval_spline(&DK2_DIAL_4, 12.0);
        assert!((v - (DK2_DIAL_4[10] + 2.0 * slope)).abs() < 1e-12);
    }
}
