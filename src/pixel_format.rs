// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use crate::error::WarpError;

/// Interleaved 8-bit pixel layouts accepted by the warp pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Rgba,
    Bgra,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Rgba  | PixelFormat::Bgra  => 4,
        }
    }

    /// Color plane (0 = red, 1 = green, 2 = blue) carried by interleaved byte `channel`,
    /// or `None` for the alpha byte of the 4-byte formats.
    pub fn color_plane(&self, channel: usize) -> Option<usize> {
        match (self, channel) {
            (PixelFormat::Rgb24 | PixelFormat::Rgba, 0) => Some(0),
            (PixelFormat::Rgb24 | PixelFormat::Rgba, 2) => Some(2),
            (PixelFormat::Bgr24 | PixelFormat::Bgra, 0) => Some(2),
            (PixelFormat::Bgr24 | PixelFormat::Bgra, 2) => Some(0),
            (_, 1) => Some(1),
            _ => None,
        }
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = WarpError;
    fn from_str(s: &str) -> Result<Self, WarpError> {
        match s {
            "rgb24" => Ok(PixelFormat::Rgb24),
            "bgr24" => Ok(PixelFormat::Bgr24),
            "rgba"  => Ok(PixelFormat::Rgba),
            "bgra"  => Ok(PixelFormat::Bgra),
            _ => Err(WarpError::InvalidGeometry(format!("unknown pixel format {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_mapping() {
        assert_eq!(PixelFormat::Rgb24.color_plane(0), Some(0));
        assert_eq!(PixelFormat::Bgr24.color_plane(0), Some(2));
        assert_eq!(PixelFormat::Bgra.color_plane(2), Some(0));
        assert_eq!(PixelFormat::Rgba.color_plane(3), None);
        assert_eq!(PixelFormat::Bgra.color_plane(1), Some(1));
    }

    #[test]
    fn parsing() {
        assert_eq!("bgra".parse::<PixelFormat>().unwrap(), PixelFormat::Bgra);
        assert!("yuv420p".parse::<PixelFormat>().is_err());
    }
}
