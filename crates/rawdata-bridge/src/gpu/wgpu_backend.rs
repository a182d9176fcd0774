//! wgpu implementation of the device interface.
//!
//! A `WgpuSharedContext` plays the part of the engine's share group: one
//! wgpu device/queue plus a texture table keyed by `TextureId`. The engine
//! imports its frame textures into the table and reads converted textures
//! back out of it; every `WgpuDevice` created from the context resolves
//! names through the same table, so ids are valid on both sides.
//!
//! Framebuffers, programs and buffers are local to one `WgpuDevice`, like
//! non-shared objects in a GL share group.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::coords::PixelRect;

use super::{
    BufferId, FramebufferId, GpuDevice, GpuError, ProgramId, QuadDraw, SharedGpuContext, TextureId,
};

/// Initialization parameters for the headless wgpu backend.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    /// Backends the instance may pick from.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Format of textures allocated by the bridge.
    ///
    /// Readback assumes four bytes per pixel in RGBA order.
    pub target_format: wgpu::TextureFormat,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            target_format: wgpu::TextureFormat::Rgba8Unorm,
            required_limits: wgpu::Limits::default(),
        }
    }
}

// ── shared texture table ──────────────────────────────────────────────────

#[derive(Default)]
struct TextureTable {
    next_name: u32,
    entries: HashMap<TextureId, Option<wgpu::Texture>>,
}

impl TextureTable {
    fn insert(&mut self, texture: Option<wgpu::Texture>) -> TextureId {
        self.next_name += 1;
        let id = TextureId(self.next_name);
        self.entries.insert(id, texture);
        id
    }

    fn storage(&self, id: TextureId) -> Result<wgpu::Texture, GpuError> {
        match self.entries.get(&id) {
            Some(Some(texture)) => Ok(texture.clone()),
            Some(None) => Err(GpuError::NoStorage(id)),
            None => Err(GpuError::UnknownTexture(id)),
        }
    }
}

/// Share group backed by a single wgpu device.
#[derive(Clone)]
pub struct WgpuSharedContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: Arc<Mutex<TextureTable>>,
    format: wgpu::TextureFormat,
}

impl WgpuSharedContext {
    /// Creates an instance, adapter and device without any surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new_headless(init: WgpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("wgpu adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("rawdata-bridge device"),
                required_features: wgpu::Features::empty(),
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self::from_parts(device, queue, init.target_format))
    }

    /// Wraps a device/queue the embedding engine already owns.
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            queue,
            textures: Arc::new(Mutex::new(TextureTable::default())),
            format,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Publishes an engine-owned texture under a new name.
    ///
    /// The texture needs `TEXTURE_BINDING` usage to be converted.
    pub fn import_texture(&self, texture: wgpu::Texture) -> TextureId {
        self.textures.lock().insert(Some(texture))
    }

    /// Current storage behind `id`, if any.
    pub fn texture(&self, id: TextureId) -> Option<wgpu::Texture> {
        self.textures.lock().storage(id).ok()
    }

    /// Drops the table entry for `id`. Returns whether it existed.
    pub fn remove_texture(&self, id: TextureId) -> bool {
        self.textures.lock().entries.remove(&id).is_some()
    }
}

impl SharedGpuContext for WgpuSharedContext {
    fn create_device(&self) -> Result<Box<dyn GpuDevice>, GpuError> {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("rawdata external sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Ok(Box::new(WgpuDevice {
            shared: self.clone(),
            sampler,
            next_name: 0,
            framebuffers: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            bound: None,
            viewport: None,
            pending: Vec::new(),
        }))
    }
}

// ── device ────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SamplingUniform {
    tex_matrix: [[f32; 4]; 4],
}

struct Program {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

/// Thread-confined device over a `WgpuSharedContext`.
///
/// Commands are recorded into command buffers and submitted on `flush`
/// (or before a readback).
pub struct WgpuDevice {
    shared: WgpuSharedContext,
    sampler: wgpu::Sampler,
    next_name: u32,
    framebuffers: HashMap<FramebufferId, TextureId>,
    programs: HashMap<ProgramId, Program>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    bound: Option<FramebufferId>,
    viewport: Option<PixelRect>,
    pending: Vec<wgpu::CommandBuffer>,
}

impl WgpuDevice {
    fn next(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn bound_texture(&self) -> Result<wgpu::Texture, GpuError> {
        let fb = self.bound.ok_or(GpuError::NoFramebufferBound)?;
        let color = self
            .framebuffers
            .get(&fb)
            .copied()
            .ok_or(GpuError::UnknownFramebuffer(fb))?;
        self.shared.textures.lock().storage(color)
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.shared
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn submit_pending(&mut self) {
        if !self.pending.is_empty() {
            self.shared.queue.submit(self.pending.drain(..));
        }
    }
}

impl GpuDevice for WgpuDevice {
    fn create_texture(&mut self) -> Result<TextureId, GpuError> {
        Ok(self.shared.textures.lock().insert(None))
    }

    fn allocate_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize { width, height });
        }
        let max = self.shared.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(GpuError::InvalidSize { width, height });
        }

        let storage = self.shared.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rawdata target texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.shared.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut table = self.shared.textures.lock();
        let Some(slot) = table.entries.get_mut(&texture) else {
            return Err(GpuError::UnknownTexture(texture));
        };
        // The old storage may still be referenced by submitted work; wgpu keeps
        // it alive until that work completes.
        *slot = Some(storage);
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.shared.textures.lock().entries.remove(&texture).is_none() {
            log::warn!("WgpuDevice: delete of unknown texture {}", texture.0);
        }
    }

    fn create_framebuffer(&mut self, color: TextureId) -> Result<FramebufferId, GpuError> {
        if !self.shared.textures.lock().entries.contains_key(&color) {
            return Err(GpuError::UnknownTexture(color));
        }
        let id = FramebufferId(self.next());
        self.framebuffers.insert(id, color);
        Ok(id)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer).is_none() {
            log::warn!("WgpuDevice: delete of unknown framebuffer {}", framebuffer.0);
        }
        if self.bound == Some(framebuffer) {
            self.bound = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) -> Result<(), GpuError> {
        if let Some(fb) = framebuffer {
            if !self.framebuffers.contains_key(&fb) {
                return Err(GpuError::UnknownFramebuffer(fb));
            }
        }
        self.bound = framebuffer;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: PixelRect) {
        self.viewport = Some(viewport);
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), GpuError> {
        let target = self.bound_texture()?;
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.encoder("rawdata clear encoder");
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rawdata clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color[0] as f64,
                            g: color[1] as f64,
                            b: color[2] as f64,
                            a: color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.pending.push(encoder.finish());
        Ok(())
    }

    fn create_external_program(&mut self) -> Result<ProgramId, GpuError> {
        let device = &self.shared.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("rawdata external shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/external.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rawdata external bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(
                            std::mem::size_of::<SamplingUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rawdata external pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("rawdata external pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &ATTRS,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.shared.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let id = ProgramId(self.next());
        self.programs.insert(
            id,
            Program {
                pipeline,
                bind_group_layout,
            },
        );
        log::debug!("WgpuDevice: created external program {}", id.0);
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            log::warn!("WgpuDevice: delete of unknown program {}", program.0);
        }
    }

    fn create_vertex_buffer(&mut self, contents: &[u8]) -> Result<BufferId, GpuError> {
        let buffer = self
            .shared
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("rawdata quad vbo"),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = BufferId(self.next());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        match self.buffers.remove(&buffer) {
            Some(b) => b.destroy(),
            None => log::warn!("WgpuDevice: delete of unknown buffer {}", buffer.0),
        }
    }

    fn draw_quad(&mut self, draw: &QuadDraw) -> Result<(), GpuError> {
        let target = self.bound_texture()?;
        let source = self.shared.textures.lock().storage(draw.texture)?;
        let program = self
            .programs
            .get(&draw.program)
            .ok_or(GpuError::UnknownProgram(draw.program))?;
        let vertices = self
            .buffers
            .get(&draw.vertices)
            .ok_or(GpuError::UnknownBuffer(draw.vertices))?;

        // Clamp the destination to the attachment; wgpu rejects viewports
        // outside the render target.
        let (tw, th) = (target.width() as f32, target.height() as f32);
        let vp = draw.viewport;
        let x0 = (vp.x as f32).clamp(0.0, tw);
        let y0 = (vp.y as f32).clamp(0.0, th);
        let x1 = (vp.x as f32 + vp.width as f32).clamp(0.0, tw);
        let y1 = (vp.y as f32 + vp.height as f32).clamp(0.0, th);
        if x1 <= x0 || y1 <= y0 {
            log::debug!("WgpuDevice: viewport outside target; skipping draw");
            return Ok(());
        }

        let uniform = SamplingUniform {
            tex_matrix: draw.tex_matrix.columns(),
        };
        let ubo = self
            .shared
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("rawdata sampling ubo"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let source_view = source.create_view(&wgpu::TextureViewDescriptor::default());
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.shared.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rawdata external bind group"),
            layout: &program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&source_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut encoder = self.encoder("rawdata draw encoder");
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rawdata external pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_viewport(x0, y0, x1 - x0, y1 - y0, 0.0, 1.0);
            rpass.set_pipeline(&program.pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, vertices.slice(..));
            rpass.draw(0..4, 0..1);
        }
        self.pending.push(encoder.finish());
        Ok(())
    }

    fn read_pixels(&mut self, rect: PixelRect) -> Result<Vec<u8>, GpuError> {
        let target = self.bound_texture()?;
        if rect.is_empty() || rect.x < 0 || rect.y < 0 {
            return Err(GpuError::Readback(format!("invalid readback rect {rect:?}")));
        }
        let (x, y) = (rect.x as u32, rect.y as u32);
        if x + rect.width > target.width() || y + rect.height > target.height() {
            return Err(GpuError::Readback(format!(
                "rect {rect:?} exceeds {}x{} target",
                target.width(),
                target.height()
            )));
        }

        let row_bytes = rect.width * 4;
        let padded_row = row_bytes.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let staging = self.shared.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rawdata readback buffer"),
            size: padded_row as u64 * rect.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.encoder("rawdata readback encoder");
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(rect.height),
                },
            },
            wgpu::Extent3d {
                width: rect.width,
                height: rect.height,
                depth_or_array_layers: 1,
            },
        );
        self.pending.push(encoder.finish());
        self.submit_pending();

        let (tx, rx) = crossbeam_channel::bounded(1);
        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.shared
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|_| GpuError::Readback("map callback dropped".into()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity((row_bytes * rect.height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded_row as usize) {
                pixels.extend_from_slice(&row[..row_bytes as usize]);
            }
        }
        staging.unmap();
        Ok(pixels)
    }

    fn flush(&mut self) {
        self.submit_pending();
    }
}

impl Drop for WgpuDevice {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("WgpuDevice: submitting {} pending command buffers on drop", self.pending.len());
            self.submit_pending();
        }
    }
}
