use crate::coords::{PixelRect, TexMatrix};
use crate::gpu::{GpuDevice, GpuError, OffscreenTarget, ResourceSlot, TextureDrawer, TextureId};

/// One frame's worth of GPU work, moved onto the worker.
#[derive(Debug, Clone, Copy)]
pub(super) struct RenderJob {
    pub source: TextureId,
    pub render_matrix: TexMatrix,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 4],
    pub read_back: bool,
}

#[derive(Debug)]
pub(super) struct RenderOutput {
    pub texture: TextureId,
    pub pixels: Option<Vec<u8>>,
}

/// GPU objects owned by one registration, living on its worker thread.
#[derive(Debug, Default)]
pub(super) struct ConversionResources {
    target: ResourceSlot<OffscreenTarget>,
    drawer: ResourceSlot<TextureDrawer>,
}

impl ConversionResources {
    pub fn render(&mut self, device: &mut dyn GpuDevice, job: &RenderJob) -> Result<RenderOutput, GpuError> {
        let target = self
            .target
            .ensure_created("render target", || OffscreenTarget::new(device))?;
        let drawer = self
            .drawer
            .ensure_created("texture drawer", || Ok(TextureDrawer::new()))?;

        target.set_size(device, job.width, job.height)?;
        device.bind_framebuffer(Some(target.framebuffer_id()))?;

        let drawn = draw_bound(device, drawer, job);

        // Leave the default framebuffer bound even when the draw failed.
        let unbound = device.bind_framebuffer(None);
        device.flush();

        let pixels = drawn?;
        unbound?;
        Ok(RenderOutput {
            texture: target.texture_id(),
            pixels,
        })
    }

    /// Frees the drawer, then the target. The slots stay released.
    pub fn release(&mut self, device: &mut dyn GpuDevice) {
        if let Some(drawer) = self.drawer.release() {
            drawer.release(device);
        }
        if let Some(target) = self.target.release() {
            target.release(device);
        }
    }
}

fn draw_bound(
    device: &mut dyn GpuDevice,
    drawer: &mut TextureDrawer,
    job: &RenderJob,
) -> Result<Option<Vec<u8>>, GpuError> {
    let full = PixelRect::full(job.width, job.height);
    device.set_viewport(full);
    device.clear(job.clear_color)?;
    drawer.draw_external(
        device,
        job.source,
        &job.render_matrix,
        job.width,
        job.height,
        full,
    )?;

    if job.read_back {
        device.read_pixels(full).map(Some)
    } else {
        Ok(None)
    }
}
