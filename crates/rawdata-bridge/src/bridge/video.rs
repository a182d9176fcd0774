use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::engine::VideoFrameObserver;
use crate::frame::{FramePosition, VideoFrame, VideoPixelFormat, VideoSourceType};
use crate::normalizer::VideoNormalizer;

/// Video observer that normalizes captured external-texture frames.
///
/// Capture callbacks run on the engine's thread and block on the GPU worker
/// until the converted texture is ready.
pub struct NormalizingVideoObserver {
    position: FramePosition,
    normalizer: Mutex<Option<VideoNormalizer>>,
    warned_unsupported: AtomicBool,
}

impl NormalizingVideoObserver {
    pub fn new(normalizer: VideoNormalizer, position: FramePosition) -> Self {
        Self {
            position: position.or_default(),
            normalizer: Mutex::new(Some(normalizer)),
            warned_unsupported: AtomicBool::new(false),
        }
    }

    /// Releases the normalizer's GPU resources and stops its worker.
    ///
    /// Call only after the engine has dropped this observer; later frames
    /// are reported as untouched.
    pub fn shutdown(&self) {
        let normalizer = self.normalizer.lock().take();
        if let Some(mut normalizer) = normalizer {
            normalizer.release();
        }
    }

    /// Whether this observer currently holds a GPU worker.
    pub fn has_gpu_context(&self) -> bool {
        self.normalizer.lock().as_ref().is_some_and(VideoNormalizer::is_active)
    }
}

impl VideoFrameObserver for NormalizingVideoObserver {
    fn on_capture_video_frame(&self, source: VideoSourceType, frame: &mut VideoFrame) -> bool {
        if frame.format != VideoPixelFormat::TextureOes {
            if !self.warned_unsupported.swap(true, Ordering::Relaxed) {
                log::debug!(
                    "capture frames in {:?} are passed through untouched",
                    frame.format
                );
            }
            return false;
        }

        let mut guard = self.normalizer.lock();
        let Some(normalizer) = guard.as_mut() else {
            return false;
        };

        match normalizer.convert(frame) {
            Ok(handled) => handled,
            Err(err) if err.is_contract_violation() => {
                log::error!("dropping capture frame from source {}: {err}", source.0);
                false
            }
            Err(err) => {
                log::error!("capture frame conversion failed: {err}");
                false
            }
        }
    }

    fn observed_frame_position(&self) -> FramePosition {
        self.position
    }
}
