//! Recording GPU backend for tests.
//!
//! Tracks every live name so tests can assert on resource counts and on the
//! exact draw calls a conversion issued. Deleting a name that is not live
//! panics, mirroring a driver-level use-after-free.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::coords::PixelRect;

use super::{
    BufferId, FramebufferId, GpuDevice, GpuError, ProgramId, QuadDraw, SharedGpuContext, TextureId,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTexture {
    pub size: Option<(u32, u32)>,
    pub external: bool,
    pub allocations: u32,
}

#[derive(Debug, Default)]
pub(crate) struct FakeGpuState {
    next_name: u32,
    pub textures: HashMap<TextureId, FakeTexture>,
    pub framebuffers: HashMap<FramebufferId, TextureId>,
    pub programs: HashSet<ProgramId>,
    pub buffers: HashSet<BufferId>,
    pub devices_created: usize,
    pub devices_dropped: usize,
    pub draws: Vec<QuadDraw>,
    pub clears: usize,
    pub last_viewport: Option<PixelRect>,
    pub flushes: usize,
    pub readbacks: usize,
}

impl FakeGpuState {
    fn next(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    /// Textures created through a device (engine imports excluded).
    pub fn owned_textures(&self) -> usize {
        self.textures.values().filter(|t| !t.external).count()
    }

    pub fn live_objects(&self) -> usize {
        self.owned_textures() + self.framebuffers.len() + self.programs.len() + self.buffers.len()
    }
}

/// Snapshot of the counters tests usually look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FakeStats {
    pub devices_created: usize,
    pub devices_dropped: usize,
    pub owned_textures: usize,
    pub framebuffers: usize,
    pub programs: usize,
    pub buffers: usize,
    pub draws: usize,
    pub flushes: usize,
}

pub(crate) struct FakeSharedContext {
    state: Arc<Mutex<FakeGpuState>>,
    fail_devices: bool,
}

impl FakeSharedContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(FakeGpuState::default())),
            fail_devices: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(FakeGpuState::default())),
            fail_devices: true,
        })
    }

    /// Registers an engine-side external texture.
    pub fn import_external(&self, width: u32, height: u32) -> TextureId {
        let mut state = self.state.lock();
        let id = TextureId(state.next());
        state.textures.insert(
            id,
            FakeTexture {
                size: Some((width, height)),
                external: true,
                allocations: 1,
            },
        );
        id
    }

    pub fn stats(&self) -> FakeStats {
        let s = self.state.lock();
        FakeStats {
            devices_created: s.devices_created,
            devices_dropped: s.devices_dropped,
            owned_textures: s.owned_textures(),
            framebuffers: s.framebuffers.len(),
            programs: s.programs.len(),
            buffers: s.buffers.len(),
            draws: s.draws.len(),
            flushes: s.flushes,
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&FakeGpuState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn texture(&self, id: TextureId) -> Option<FakeTexture> {
        self.state.lock().textures.get(&id).cloned()
    }

    pub fn last_draw(&self) -> Option<QuadDraw> {
        self.state.lock().draws.last().cloned()
    }
}

impl SharedGpuContext for FakeSharedContext {
    fn create_device(&self) -> Result<Box<dyn GpuDevice>, GpuError> {
        if self.fail_devices {
            return Err(GpuError::DeviceCreation("fake share context refuses devices".into()));
        }
        self.state.lock().devices_created += 1;
        Ok(Box::new(FakeDevice {
            state: self.state.clone(),
            bound: None,
        }))
    }
}

pub(crate) struct FakeDevice {
    state: Arc<Mutex<FakeGpuState>>,
    bound: Option<FramebufferId>,
}

impl FakeDevice {
    fn bound_texture(&self, state: &FakeGpuState) -> Result<TextureId, GpuError> {
        let fb = self.bound.ok_or(GpuError::NoFramebufferBound)?;
        state
            .framebuffers
            .get(&fb)
            .copied()
            .ok_or(GpuError::UnknownFramebuffer(fb))
    }
}

impl GpuDevice for FakeDevice {
    fn create_texture(&mut self) -> Result<TextureId, GpuError> {
        let mut state = self.state.lock();
        let id = TextureId(state.next());
        state.textures.insert(id, FakeTexture::default());
        Ok(id)
    }

    fn allocate_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize { width, height });
        }
        let mut state = self.state.lock();
        let entry = state
            .textures
            .get_mut(&texture)
            .ok_or(GpuError::UnknownTexture(texture))?;
        entry.size = Some((width, height));
        entry.allocations += 1;
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        let removed = self.state.lock().textures.remove(&texture);
        assert!(removed.is_some(), "texture {} deleted twice", texture.0);
    }

    fn create_framebuffer(&mut self, color: TextureId) -> Result<FramebufferId, GpuError> {
        let mut state = self.state.lock();
        if !state.textures.contains_key(&color) {
            return Err(GpuError::UnknownTexture(color));
        }
        let id = FramebufferId(state.next());
        state.framebuffers.insert(id, color);
        Ok(id)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        let removed = self.state.lock().framebuffers.remove(&framebuffer);
        assert!(removed.is_some(), "framebuffer {} deleted twice", framebuffer.0);
        if self.bound == Some(framebuffer) {
            self.bound = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) -> Result<(), GpuError> {
        if let Some(fb) = framebuffer {
            if !self.state.lock().framebuffers.contains_key(&fb) {
                return Err(GpuError::UnknownFramebuffer(fb));
            }
        }
        self.bound = framebuffer;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: PixelRect) {
        self.state.lock().last_viewport = Some(viewport);
    }

    fn clear(&mut self, _color: [f32; 4]) -> Result<(), GpuError> {
        let mut state = self.state.lock();
        self.bound_texture(&state)?;
        state.clears += 1;
        Ok(())
    }

    fn create_external_program(&mut self) -> Result<ProgramId, GpuError> {
        let mut state = self.state.lock();
        let id = ProgramId(state.next());
        state.programs.insert(id);
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        assert!(
            self.state.lock().programs.remove(&program),
            "program {} deleted twice",
            program.0
        );
    }

    fn create_vertex_buffer(&mut self, contents: &[u8]) -> Result<BufferId, GpuError> {
        assert!(!contents.is_empty(), "empty vertex buffer");
        let mut state = self.state.lock();
        let id = BufferId(state.next());
        state.buffers.insert(id);
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        assert!(
            self.state.lock().buffers.remove(&buffer),
            "buffer {} deleted twice",
            buffer.0
        );
    }

    fn draw_quad(&mut self, draw: &QuadDraw) -> Result<(), GpuError> {
        let mut state = self.state.lock();
        self.bound_texture(&state)?;
        if !state.programs.contains(&draw.program) {
            return Err(GpuError::UnknownProgram(draw.program));
        }
        if !state.buffers.contains(&draw.vertices) {
            return Err(GpuError::UnknownBuffer(draw.vertices));
        }
        match state.textures.get(&draw.texture) {
            Some(t) if t.size.is_some() => {}
            Some(_) => return Err(GpuError::NoStorage(draw.texture)),
            None => return Err(GpuError::UnknownTexture(draw.texture)),
        }
        state.draws.push(draw.clone());
        Ok(())
    }

    fn read_pixels(&mut self, rect: PixelRect) -> Result<Vec<u8>, GpuError> {
        let mut state = self.state.lock();
        self.bound_texture(&state)?;
        state.readbacks += 1;
        Ok(vec![0x7f; rect.width as usize * rect.height as usize * 4])
    }

    fn flush(&mut self) {
        self.state.lock().flushes += 1;
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.state.lock().devices_dropped += 1;
    }
}
