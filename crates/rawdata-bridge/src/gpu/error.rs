use std::fmt;

use super::{BufferId, FramebufferId, ProgramId, TextureId};

/// Failures reported by the GPU layer.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
    /// The shared context could not produce a device for the worker.
    DeviceCreation(String),
    /// The worker thread could not be started.
    WorkerSpawn(String),
    /// The worker thread is gone (panicked or already disposed).
    ContextLost,
    /// A resource slot was used after its release.
    Released(&'static str),
    UnknownTexture(TextureId),
    UnknownFramebuffer(FramebufferId),
    UnknownProgram(ProgramId),
    UnknownBuffer(BufferId),
    /// A texture was used before storage was allocated for it.
    NoStorage(TextureId),
    /// A render command was issued with the default framebuffer bound.
    NoFramebufferBound,
    InvalidSize { width: u32, height: u32 },
    Readback(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::DeviceCreation(msg) => write!(f, "failed to create GPU device: {msg}"),
            GpuError::WorkerSpawn(msg) => write!(f, "failed to start GPU worker: {msg}"),
            GpuError::ContextLost => write!(f, "GPU context worker is no longer running"),
            GpuError::Released(what) => write!(f, "{what} used after release"),
            GpuError::UnknownTexture(id) => write!(f, "unknown texture {}", id.0),
            GpuError::UnknownFramebuffer(id) => write!(f, "unknown framebuffer {}", id.0),
            GpuError::UnknownProgram(id) => write!(f, "unknown program {}", id.0),
            GpuError::UnknownBuffer(id) => write!(f, "unknown buffer {}", id.0),
            GpuError::NoStorage(id) => write!(f, "texture {} has no storage", id.0),
            GpuError::NoFramebufferBound => write!(f, "no framebuffer bound"),
            GpuError::InvalidSize { width, height } => {
                write!(f, "invalid texture size {width}x{height}")
            }
            GpuError::Readback(msg) => write!(f, "pixel readback failed: {msg}"),
        }
    }
}

impl std::error::Error for GpuError {}
