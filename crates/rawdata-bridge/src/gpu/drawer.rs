use crate::coords::{PixelRect, TexMatrix};

use super::{BufferId, GpuDevice, GpuError, ProgramId, QuadDraw, TextureId};

/// Unit quad as a triangle strip, positions in 0..1.
const QUAD_STRIP: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// Draws external textures as a quad into the bound framebuffer.
///
/// Program and geometry are created on first draw and kept until `release`.
#[derive(Debug, Default)]
pub struct TextureDrawer {
    program: Option<ProgramId>,
    quad: Option<BufferId>,
}

impl TextureDrawer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples `texture` through `tex_matrix` into `viewport` of the bound
    /// framebuffer.
    ///
    /// The caller binds the framebuffer beforehand. `frame_width` and
    /// `frame_height` describe the source frame; an empty frame or viewport
    /// draws nothing.
    pub fn draw_external(
        &mut self,
        device: &mut dyn GpuDevice,
        texture: TextureId,
        tex_matrix: &TexMatrix,
        frame_width: u32,
        frame_height: u32,
        viewport: PixelRect,
    ) -> Result<(), GpuError> {
        if frame_width == 0 || frame_height == 0 || viewport.is_empty() {
            log::debug!("TextureDrawer: empty frame or viewport; skipping draw");
            return Ok(());
        }

        let program = self.ensure_program(device)?;
        let quad = self.ensure_quad(device)?;

        device.draw_quad(&QuadDraw {
            program,
            vertices: quad,
            texture,
            tex_matrix: *tex_matrix,
            viewport,
        })
    }

    fn ensure_program(&mut self, device: &mut dyn GpuDevice) -> Result<ProgramId, GpuError> {
        if let Some(program) = self.program {
            return Ok(program);
        }
        let program = device.create_external_program()?;
        self.program = Some(program);
        Ok(program)
    }

    fn ensure_quad(&mut self, device: &mut dyn GpuDevice) -> Result<BufferId, GpuError> {
        if let Some(quad) = self.quad {
            return Ok(quad);
        }
        let quad = device.create_vertex_buffer(bytemuck::cast_slice(&QUAD_STRIP))?;
        self.quad = Some(quad);
        Ok(quad)
    }

    /// Deletes the program and quad geometry, if they were ever created.
    pub fn release(self, device: &mut dyn GpuDevice) {
        if let Some(program) = self.program {
            device.delete_program(program);
        }
        if let Some(quad) = self.quad {
            device.delete_buffer(quad);
        }
    }
}
