// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

pub mod compute_params;
pub mod mapping_cache;
pub mod resample;

pub use compute_params::ComputeParams;
pub use mapping_cache::{ CacheEntry, MappingCache };
pub use resample::resample;

/// Holds the current mapping cache and runs frames through it.
/// Lives behind the manager's `RwLock`; a rebuild replaces params and cache in
/// one write so readers never see a half-published epoch.
#[derive(Default)]
pub struct Unwarper {
    cache: Option<MappingCache>,
    params: Option<ComputeParams>,
}

impl Unwarper {
    /// Publishes a freshly built cache together with the params it was built from.
    pub fn adopt(&mut self, params: ComputeParams, cache: MappingCache) {
        self.params = Some(params);
        self.cache = Some(cache);
    }

    /// Drops the cache, forcing `process_pixels` to refuse frames until the next rebuild.
    pub fn invalidate(&mut self) {
        self.params = None;
        self.cache = None;
    }

    pub fn params(&self) -> Option<&ComputeParams> {
        self.params.as_ref()
    }

    /// Warps one frame. Returns `false` and leaves `output` untouched when there is no
    /// cache or the buffers don't match the cached geometry, never a stale-cache read.
    pub fn process_pixels(&self, input: &[u8], output: &mut [u8]) -> bool {
        match &self.cache {
            Some(cache) => resample(cache, input, output),
            None => {
                log::warn!("No mapping cache, frame skipped");
                false
            }
        }
    }
}
