// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use rayon::prelude::*;

use super::mapping_cache::{ CacheEntry, MappingCache };

/// Gathers one output frame through the cache. Pure byte copies, no interpolation;
/// bytes with no source are written as 0 (black, and transparent for alpha formats).
///
/// Returns `false` without touching `output` when either buffer doesn't match the
/// geometry the cache was built for.
pub fn resample(cache: &MappingCache, input: &[u8], output: &mut [u8]) -> bool {
    let (_, in_h, in_stride) = cache.input_size();
    let (out_w, out_h, out_stride) = cache.output_size();
    let row_len = out_w * cache.bytes_per_pixel();

    if input.len() < in_stride * in_h {
        log::error!("Input buffer too small: {} < {}", input.len(), in_stride * in_h);
        return false;
    }
    if output.len() < out_stride * out_h || out_stride < row_len {
        log::error!("Output buffer too small: {} for {}x{}", output.len(), out_stride, out_h);
        return false;
    }

    output.par_chunks_mut(out_stride).take(out_h).enumerate().for_each(|(y, row)| {
        let entries = &cache.entries()[y * row_len..(y + 1) * row_len];
        for (byte, entry) in row[..row_len].iter_mut().zip(entries) {
            *byte = match entry {
                // `get` instead of indexing so a lying stride degrades to black
                CacheEntry::Source(off) => input.get(*off as usize).copied().unwrap_or(0),
                CacheEntry::NoSource => 0,
            };
        }
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::mapping_cache::test_params;
    use crate::pixel_format::PixelFormat;

    #[test]
    fn copies_sources_and_blanks_the_rest() {
        let mut params = test_params((192, 108), (192, 108), PixelFormat::Rgb24);
        params.scale = (0.5, 0.5);
        let cache = MappingCache::build(&params).unwrap();

        let input = vec![200u8; 192 * 108 * 3];
        let mut output = vec![7u8; 192 * 108 * 3];
        assert!(resample(&cache, &input, &mut output));

        // Left edge of the midline is outside the source (see the cache tests), centers aren't
        assert_eq!(&output[54 * 192 * 3..54 * 192 * 3 + 3], &[0, 0, 0]);
        assert_eq!(output[(54 * 192 + 48) * 3], 200);
    }

    #[test]
    fn rejects_short_buffers() {
        let params = test_params((192, 108), (192, 108), PixelFormat::Rgb24);
        let cache = MappingCache::build(&params).unwrap();
        let input = vec![0u8; 192 * 108 * 3];
        let mut short = vec![0u8; 16];
        assert!(!resample(&cache, &input, &mut short));
        let mut output = vec![0u8; 192 * 108 * 3];
        assert!(!resample(&cache, &input[..100], &mut output));
    }
}
