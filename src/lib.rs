// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

pub mod device_profile;
pub mod distortion;
pub mod error;
pub mod pixel_format;
pub mod profile_reader;
pub mod warp;

use std::sync::Arc;
use std::sync::atomic::{ AtomicU64, Ordering::SeqCst };

use parking_lot::RwLock;

use device_profile::Device;
use error::Result;
use pixel_format::PixelFormat;
use profile_reader::{ NoProfileReader, ProfileReader };
use warp::{ ComputeParams, MappingCache, Unwarper };

lazy_static::lazy_static! {
    static ref THREAD_POOL: rayon::ThreadPool = rayon::ThreadPoolBuilder::new().build().unwrap();
}

pub static CURRENT_COMPUTE_ID: AtomicU64 = AtomicU64::new(0);

/// Everything the user can set. Changing any field makes the current mapping cache
/// stale; the manager rebuilds before the next frame is processed.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub device: Device,
    /// `"default"` or an exact SDK version like `"0.4.4"`
    pub sdk_version: String,
    /// 0..=10, or -1 to ask the profile reader
    pub eye_relief_dial: i32,
    /// Fail instead of falling back when the profile reader can't answer
    pub strict_profile: bool,

    /// Warp flat footage for display on the headset instead of flattening a capture
    pub forward_warp: bool,
    /// Source pixels per degree of view, forward-warp only (0 = default density)
    pub ppd: f32,

    pub mono_input: bool,
    pub swap_eyes: bool,
    pub left_eye_only: bool,

    pub scale_width: f32,
    pub scale_height: f32,
    pub scale_in_width: f32,
    pub scale_in_height: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            device: Device::RiftDK2,
            sdk_version: "default".into(),
            eye_relief_dial: -1,
            strict_profile: false,
            forward_warp: false,
            ppd: 0.0,
            mono_input: false,
            swap_eyes: false,
            left_eye_only: false,
            scale_width: 1.0,
            scale_height: 1.0,
            scale_in_width: 1.0,
            scale_in_height: 1.0,
        }
    }
}

/// Buffer geometry of one processing session: `(width, height, stride in bytes)` per side.
#[derive(Clone, Debug)]
pub struct FrameLayout {
    pub input_size: (usize, usize, usize),
    pub output_size: (usize, usize, usize),
    pub format: PixelFormat,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self { input_size: (0, 0, 0), output_size: (0, 0, 0), format: PixelFormat::Rgb24 }
    }
}

/// Owner of the whole pipeline: configuration, buffer layout, profile reader and the
/// `Unwarper` with its cache. Cheap to clone and share across threads.
#[derive(Clone)]
pub struct WarpManager {
    pub config: Arc<RwLock<RuntimeConfig>>,
    pub layout: Arc<RwLock<FrameLayout>>,
    pub profile_reader: Arc<RwLock<Box<dyn ProfileReader + Send + Sync>>>,
    pub unwarper: Arc<RwLock<Unwarper>>,
}

impl Default for WarpManager {
    fn default() -> Self {
        Self {
            config: Arc::new(RwLock::new(RuntimeConfig::default())),
            layout: Arc::new(RwLock::new(FrameLayout::default())),
            profile_reader: Arc::new(RwLock::new(Box::new(NoProfileReader))),
            unwarper: Arc::new(RwLock::new(Unwarper::default())),
        }
    }
}

impl WarpManager {
    pub fn set_profile_reader(&self, reader: Box<dyn ProfileReader + Send + Sync>) {
        *self.profile_reader.write() = reader;
        self.unwarper.write().invalidate();
    }

    pub fn init_size(&self, input_size: (usize, usize, usize), output_size: (usize, usize, usize), format: PixelFormat) {
        *self.layout.write() = FrameLayout { input_size, output_size, format };
        self.unwarper.write().invalidate();
    }

    /// Snapshots the configuration, builds a fresh cache on the calling thread and
    /// publishes it. Any concurrent threaded recompute is superseded.
    pub fn recompute_blocking(&self) -> Result<()> {
        let params = ComputeParams::from_manager(self)?;
        CURRENT_COMPUTE_ID.store(fastrand::u64(..), SeqCst);
        let cache = MappingCache::build(&params)?;
        self.unwarper.write().adopt(params, cache);
        Ok(())
    }

    /// Builds the cache on the shared pool. The returned compute id is also passed to
    /// `cb` on completion; a build superseded by a newer request is thrown away
    /// without being published and without a callback.
    pub fn recompute_threaded<F: FnOnce(u64) + Send + 'static>(&self, cb: F) -> Result<u64> {
        let params = ComputeParams::from_manager(self)?;
        let compute_id = fastrand::u64(..);
        CURRENT_COMPUTE_ID.store(compute_id, SeqCst);

        let unwarper = self.unwarper.clone();
        THREAD_POOL.spawn(move || {
            match MappingCache::build(&params) {
                Ok(cache) => {
                    if CURRENT_COMPUTE_ID.load(SeqCst) == compute_id {
                        unwarper.write().adopt(params, cache);
                        cb(compute_id);
                    } else {
                        log::debug!("Discarding superseded mapping cache {compute_id}");
                    }
                }
                Err(e) => log::error!("Failed to build the mapping cache: {e}"),
            }
        });
        Ok(compute_id)
    }

    /// Warps one raw frame, `false` if there is no usable cache for the buffers.
    pub fn process_pixels(&self, input: &[u8], output: &mut [u8]) -> bool {
        self.unwarper.read().process_pixels(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ ProfileReadError, WarpError };

    struct FixedDial(u8);
    impl ProfileReader for FixedDial {
        fn eye_relief_dial(&self, _: Device) -> std::result::Result<u8, ProfileReadError> { Ok(self.0) }
    }

    fn manager(w: usize, h: usize) -> WarpManager {
        let mgr = WarpManager::default();
        mgr.init_size((w, h, w * 3), (w, h, w * 3), PixelFormat::Rgb24);
        mgr
    }

    #[test]
    fn blocking_recompute_and_process() {
        let mgr = manager(192, 108);
        mgr.recompute_blocking().unwrap();

        let input = vec![99u8; 192 * 108 * 3];
        let mut output = vec![0u8; 192 * 108 * 3];
        assert!(mgr.process_pixels(&input, &mut output));
        assert_eq!(output[(54 * 192 + 48) * 3], 99);
    }

    #[test]
    fn threaded_recompute_publishes_once() {
        let mgr = manager(96, 54);
        let (tx, rx) = std::sync::mpsc::channel();
        let id = mgr.recompute_threaded(move |id| { tx.send(id).unwrap(); }).unwrap();
        assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(30)).unwrap(), id);

        let input = vec![1u8; 96 * 54 * 3];
        let mut output = vec![0u8; 96 * 54 * 3];
        assert!(mgr.process_pixels(&input, &mut output));
    }

    #[test]
    fn profile_reader_supplies_the_dial() {
        let mgr = manager(96, 54);
        mgr.set_profile_reader(Box::new(FixedDial(7)));
        let params = ComputeParams::from_manager(&mgr).unwrap();
        assert_eq!(params.profile.eye_relief_dial, 7);
    }

    #[test]
    fn strict_profile_surfaces_reader_failure() {
        let mgr = manager(96, 54);
        mgr.config.write().strict_profile = true;
        assert!(matches!(ComputeParams::from_manager(&mgr), Err(WarpError::ProfileRead(_))));

        // Without strict mode the reader failure falls back to the default dial
        mgr.config.write().strict_profile = false;
        let params = ComputeParams::from_manager(&mgr).unwrap();
        assert_eq!(params.profile.eye_relief_dial, warp::compute_params::DEFAULT_EYE_RELIEF_DIAL);
    }

    #[test]
    fn ppd_requires_forward_warp() {
        let mgr = manager(96, 54);
        mgr.config.write().ppd = 12.0;
        assert!(matches!(ComputeParams::from_manager(&mgr), Err(WarpError::PpdWithoutForwardWarp)));
        mgr.config.write().forward_warp = true;
        assert!((ComputeParams::from_manager(&mgr).unwrap().ppd - 12.0).abs() < 1e-9);
    }

    #[test]
    fn config_changes_invalidate_the_cache() {
        let mgr = manager(96, 54);
        mgr.recompute_blocking().unwrap();
        mgr.init_size((96, 54, 96 * 3), (192, 108, 192 * 3), PixelFormat::Rgb24);

        let input = vec![1u8; 96 * 54 * 3];
        let mut output = vec![0u8; 192 * 108 * 3];
        assert!(!mgr.process_pixels(&input, &mut output));
        mgr.recompute_blocking().unwrap();
        assert!(mgr.process_pixels(&input, &mut output));
    }
}
