//! GPU layer: thread-confined device access and the objects built on it.
//!
//! This module is responsible for:
//! - the immediate-mode device interface conversions are written against
//! - running device work on one dedicated worker thread (`GpuContext`)
//! - the offscreen render target and the external-texture drawer
//! - a wgpu-backed implementation sharing textures with the engine
//!
//! Every `GpuDevice` call happens on the worker thread that created the
//! device. Callers cross onto that thread only through `GpuContext::run_sync`.

mod context;
mod device;
mod drawer;
mod error;
mod slot;
mod target;
pub mod wgpu_backend;

#[cfg(test)]
pub(crate) mod fake;

pub use context::GpuContext;
pub use device::{
    BufferId, FramebufferId, GpuDevice, ProgramId, QuadDraw, SharedGpuContext, TextureId,
};
pub use drawer::TextureDrawer;
pub use error::GpuError;
pub use slot::ResourceSlot;
pub use target::OffscreenTarget;
pub use wgpu_backend::{WgpuDevice, WgpuInit, WgpuSharedContext};
