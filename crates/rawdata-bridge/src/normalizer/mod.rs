//! Video frame normalization.
//!
//! Turns an external-texture frame (arbitrary rotation, non-identity sampling
//! transform) into a plain 2D texture frame with an identity transform, by
//! re-rendering it on a dedicated GPU worker that shares textures with the
//! engine.

mod error;
mod resources;

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::coords::{Affine2, Rotation, TexMatrix};
use crate::frame::{VideoFrame, VideoPixelFormat};
use crate::gpu::{GpuContext, GpuError, ResourceSlot, SharedGpuContext};

pub use error::ConvertError;

use resources::{ConversionResources, RenderJob, RenderOutput};

/// Matrix the source texture is sampled with when normalizing a frame.
///
/// Composes the frame's own sampling transform with a rotation about the
/// texture center, in 2D-affine form: `S · T(½,½) · R · T(-½,-½)`.
pub fn render_matrix(rotation: Rotation, sampling: &TexMatrix) -> TexMatrix {
    let m = sampling.to_affine() * Affine2::rotate_about_center(rotation);
    TexMatrix::from_affine(&m)
}

/// Converts external-texture frames into canonical 2D-texture frames.
///
/// The GPU worker, render target and drawer are created on the first frame
/// that needs them and live until `release`.
pub struct VideoNormalizer {
    share: Arc<dyn SharedGpuContext>,
    thread_name: String,
    clear_color: [f32; 4],
    context: ResourceSlot<GpuContext<ConversionResources>>,
}

impl VideoNormalizer {
    pub fn new(share: Arc<dyn SharedGpuContext>, config: &BridgeConfig) -> Self {
        Self {
            share,
            thread_name: config.gpu_thread_name.clone(),
            clear_color: config.clear_color,
            context: ResourceSlot::Uninitialized,
        }
    }

    /// Normalizes `frame` in place.
    ///
    /// Returns `Ok(true)` when the frame is canonical afterwards and
    /// `Ok(false)` for formats this normalizer does not handle. On error the
    /// frame is unchanged.
    pub fn convert(&mut self, frame: &mut VideoFrame) -> Result<bool, ConvertError> {
        Ok(self.normalize(frame, false)?.is_some())
    }

    /// Like `convert`, additionally reading back the converted frame as
    /// tightly packed RGBA rows (`width * height * 4` bytes).
    ///
    /// Returns `Ok(None)` when the frame was not converted by this call
    /// (already canonical or not a texture).
    pub fn convert_and_read(&mut self, frame: &mut VideoFrame) -> Result<Option<Vec<u8>>, ConvertError> {
        Ok(self.normalize(frame, true)?.and_then(|out| out.pixels))
    }

    fn normalize(
        &mut self,
        frame: &mut VideoFrame,
        read_back: bool,
    ) -> Result<Option<RenderOutput>, ConvertError> {
        match frame.format {
            VideoPixelFormat::Texture2d => {
                return Ok(Some(RenderOutput {
                    texture: frame.texture_id,
                    pixels: None,
                }));
            }
            VideoPixelFormat::TextureOes => {}
            _ => return Ok(None),
        }

        if frame.width <= 0 || frame.height <= 0 {
            return Err(ConvertError::InvalidDimensions {
                width: frame.width,
                height: frame.height,
            });
        }
        let rotation = Rotation::try_from(frame.rotation)?;

        let job = RenderJob {
            source: frame.texture_id,
            render_matrix: render_matrix(rotation, &frame.tex_matrix),
            width: frame.width as u32,
            height: frame.height as u32,
            clear_color: self.clear_color,
            read_back,
        };

        let share = &self.share;
        let name = &self.thread_name;
        let context = match self.context.ensure_created("gpu context", || {
            let ctx = GpuContext::create(name, share.clone())?;
            log::info!("VideoNormalizer: GPU context '{}' created", ctx.name());
            Ok(ctx)
        }) {
            Ok(context) => context,
            Err(GpuError::Released(_)) => return Err(ConvertError::Released),
            Err(err) => return Err(err.into()),
        };

        let rendered = context.run_sync(move |device, resources| resources.render(device, &job));
        let output = match rendered {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(err.into()),
            Err(GpuError::ContextLost) => {
                // Only this frame fails; the next one starts a fresh worker.
                self.context.discard();
                log::error!("VideoNormalizer: GPU worker lost; it will be recreated");
                return Err(GpuError::ContextLost.into());
            }
            Err(err) => return Err(err.into()),
        };

        log::trace!(
            "VideoNormalizer: texture {} -> {} ({}x{}, rot {})",
            frame.texture_id.0,
            output.texture.0,
            frame.width,
            frame.height,
            frame.rotation
        );

        frame.texture_id = output.texture;
        frame.format = VideoPixelFormat::Texture2d;
        frame.tex_matrix = TexMatrix::IDENTITY;
        Ok(Some(output))
    }

    /// Whether a GPU worker currently exists.
    pub fn is_active(&self) -> bool {
        self.context.is_active()
    }

    /// Frees the drawer and target on the worker, then stops the worker.
    ///
    /// Later conversions fail with `ConvertError::Released`.
    pub fn release(&mut self) {
        let Some(context) = self.context.release() else {
            return;
        };
        if let Err(err) = context.run_sync(|device, resources| resources.release(device)) {
            log::warn!("VideoNormalizer: releasing GPU resources failed: {err}");
        }
        context.dispose();
    }
}

impl Drop for VideoNormalizer {
    fn drop(&mut self) {
        self.release();
    }
}
