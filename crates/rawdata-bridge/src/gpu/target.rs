use super::{FramebufferId, GpuDevice, GpuError, TextureId};

/// Offscreen framebuffer backed by one RGBA 2D texture.
///
/// The texture keeps its name across resizes; only its storage is
/// reallocated. Every method must run on the thread that owns `device`.
#[derive(Debug)]
pub struct OffscreenTarget {
    framebuffer: FramebufferId,
    texture: TextureId,
    width: u32,
    height: u32,
}

impl OffscreenTarget {
    /// Creates the texture name and framebuffer. No storage is allocated
    /// until the first `set_size`.
    pub fn new(device: &mut dyn GpuDevice) -> Result<Self, GpuError> {
        let texture = device.create_texture()?;
        let framebuffer = match device.create_framebuffer(texture) {
            Ok(fb) => fb,
            Err(err) => {
                device.delete_texture(texture);
                return Err(err);
            }
        };
        log::debug!(
            "OffscreenTarget: created framebuffer {} with texture {}",
            framebuffer.0,
            texture.0
        );
        Ok(Self {
            framebuffer,
            texture,
            width: 0,
            height: 0,
        })
    }

    /// Sizes the backing texture, reallocating only when the size changes.
    pub fn set_size(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize { width, height });
        }
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }

        device.allocate_texture(self.texture, width, height)?;
        log::debug!(
            "OffscreenTarget: texture {} resized {}x{} -> {width}x{height}",
            self.texture.0,
            self.width,
            self.height
        );
        self.width = width;
        self.height = height;
        Ok(())
    }

    #[inline]
    pub fn framebuffer_id(&self) -> FramebufferId {
        self.framebuffer
    }

    #[inline]
    pub fn texture_id(&self) -> TextureId {
        self.texture
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Deletes the framebuffer and texture.
    pub fn release(self, device: &mut dyn GpuDevice) {
        device.delete_framebuffer(self.framebuffer);
        device.delete_texture(self.texture);
    }
}
