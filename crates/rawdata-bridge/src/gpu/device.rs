use crate::coords::{PixelRect, TexMatrix};

use super::GpuError;

/// Texture name, valid across every device created from one shared context.
///
/// `0` is never a live texture.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FramebufferId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u32);

/// One textured-quad draw into the bound framebuffer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadDraw {
    pub program: ProgramId,
    pub vertices: BufferId,
    pub texture: TextureId,
    /// Output-to-source texture coordinate transform.
    pub tex_matrix: TexMatrix,
    /// Destination rectangle inside the bound framebuffer.
    pub viewport: PixelRect,
}

/// Immediate-mode device interface, bound to the thread that created it.
///
/// The surface is deliberately GL-shaped: named textures and framebuffers,
/// one bound framebuffer, commands that take effect in order and become
/// visible to other devices of the same shared context after `flush`.
///
/// Deleting a name that is not live is a programming error; implementations
/// may panic.
pub trait GpuDevice {
    /// Creates a texture name without storage.
    fn create_texture(&mut self) -> Result<TextureId, GpuError>;

    /// (Re)allocates RGBA8 storage for `texture`. Previous contents are lost;
    /// the name and any framebuffer attachment stay valid.
    fn allocate_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<(), GpuError>;

    fn delete_texture(&mut self, texture: TextureId);

    /// Creates a framebuffer with `color` as its only color attachment.
    fn create_framebuffer(&mut self, color: TextureId) -> Result<FramebufferId, GpuError>;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Binds `framebuffer`, or the default framebuffer for `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) -> Result<(), GpuError>;

    fn set_viewport(&mut self, viewport: PixelRect);

    /// Clears the bound framebuffer's color attachment.
    fn clear(&mut self, color: [f32; 4]) -> Result<(), GpuError>;

    /// Creates the program that samples external textures through a matrix.
    fn create_external_program(&mut self) -> Result<ProgramId, GpuError>;

    fn delete_program(&mut self, program: ProgramId);

    /// Uploads static quad geometry (tightly packed `[f32; 2]` positions).
    fn create_vertex_buffer(&mut self, contents: &[u8]) -> Result<BufferId, GpuError>;

    fn delete_buffer(&mut self, buffer: BufferId);

    fn draw_quad(&mut self, draw: &QuadDraw) -> Result<(), GpuError>;

    /// Reads RGBA8 pixels of `rect` from the bound framebuffer, rows tightly
    /// packed.
    fn read_pixels(&mut self, rect: PixelRect) -> Result<Vec<u8>, GpuError>;

    /// Submits all recorded commands.
    fn flush(&mut self);
}

/// The engine's shared GPU context.
///
/// Devices created here share texture names with the engine's own renderer,
/// so a texture produced by the bridge can be sampled by the engine.
pub trait SharedGpuContext: Send + Sync {
    /// Creates a device for the calling thread. Called once per worker, on
    /// the worker thread.
    fn create_device(&self) -> Result<Box<dyn GpuDevice>, GpuError>;
}
