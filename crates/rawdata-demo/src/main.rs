use std::sync::Arc;

use anyhow::{Context, Result, bail};
use parking_lot::Mutex;
use serde_json::{Value, json};

use rawdata_bridge::bridge::{
    REGISTER_AUDIO_FRAME_OBSERVER, REGISTER_VIDEO_FRAME_OBSERVER, UNREGISTER_AUDIO_FRAME_OBSERVER,
    UNREGISTER_VIDEO_FRAME_OBSERVER,
};
use rawdata_bridge::coords::TexMatrix;
use rawdata_bridge::engine::{AudioFrameObserver, VideoFrameObserver};
use rawdata_bridge::frame::{AudioFrame, AudioSampleType, VideoFrame, VideoSourceType};
use rawdata_bridge::gpu::{TextureId, WgpuInit, WgpuSharedContext};
use rawdata_bridge::{
    BridgeConfig, EngineHandle, LoggingConfig, MediaEngine, MethodCall, MethodResult, RawDataBridge,
    SingleEngine, init_logging,
};

const ENGINE_HANDLE: EngineHandle = 0x5eed;
const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 240;

// ── simulated engine ──────────────────────────────────────────────────────

/// Stands in for the media engine: stores observers and feeds them frames.
#[derive(Default)]
struct DemoEngine {
    audio: Mutex<Option<Arc<dyn AudioFrameObserver>>>,
    video: Mutex<Option<Arc<dyn VideoFrameObserver>>>,
}

impl MediaEngine for DemoEngine {
    fn register_audio_frame_observer(&self, observer: Option<Arc<dyn AudioFrameObserver>>) {
        log::debug!("engine: audio observer {}", if observer.is_some() { "set" } else { "cleared" });
        *self.audio.lock() = observer;
    }

    fn register_video_frame_observer(&self, observer: Option<Arc<dyn VideoFrameObserver>>) {
        log::debug!("engine: video observer {}", if observer.is_some() { "set" } else { "cleared" });
        *self.video.lock() = observer;
    }
}

impl DemoEngine {
    fn push_audio(&self, samples: &mut [u8]) -> bool {
        let Some(observer) = self.audio.lock().clone() else {
            return false;
        };
        let mut frame = AudioFrame {
            sample_type: AudioSampleType::Pcm16,
            samples_per_channel: (samples.len() / 4) as u32,
            bytes_per_sample: 2,
            channels: 2,
            samples_per_sec: 48_000,
            buffer: samples,
            render_time_ms: 0,
            avsync_type: 0,
        };
        observer.on_record_audio_frame("demo", &mut frame)
    }

    fn push_capture(&self, frame: &mut VideoFrame) -> bool {
        let Some(observer) = self.video.lock().clone() else {
            return false;
        };
        observer.on_capture_video_frame(VideoSourceType::CAMERA_PRIMARY, frame)
    }
}

// ── helpers ───────────────────────────────────────────────────────────────

fn call(bridge: &mut RawDataBridge, method: &str, arguments: Value) -> Result<()> {
    match bridge.handle(&MethodCall::new(method, arguments)) {
        MethodResult::Success(_) => Ok(()),
        MethodResult::Error { code, message } => bail!("{method} failed: {code}: {message}"),
        MethodResult::NotImplemented => bail!("{method} not implemented"),
    }
}

/// Camera-style source: a quadrant test pattern, sampled with a vertical flip.
fn create_source(shared: &WgpuSharedContext) -> TextureId {
    let (w, h) = (FRAME_WIDTH, FRAME_HEIGHT);
    let texture = shared.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("demo camera texture"),
        size: wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let mut pixels = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let rgba = match (x < w / 2, y < h / 2) {
                (true, true) => [255, 0, 0, 255],
                (false, true) => [0, 255, 0, 255],
                (true, false) => [0, 0, 255, 255],
                (false, false) => [255, 255, 255, 255],
            };
            pixels.extend_from_slice(&rgba);
        }
    }

    shared.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(w * 4),
            rows_per_image: Some(h),
        },
        wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
    );

    shared.import_texture(texture)
}

fn flip_y() -> TexMatrix {
    TexMatrix([
        1.0, 0.0, 0.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 1.0, 0.0, 1.0,
    ])
}

/// Reads a converted texture back the way an engine-side consumer would.
fn read_texture(shared: &WgpuSharedContext, id: TextureId) -> Result<Vec<u8>> {
    let texture = shared.texture(id).context("converted texture missing from share group")?;
    let (w, h) = (texture.width(), texture.height());
    let row = w * 4;
    let padded = row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

    let staging = shared.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some("demo readback buffer"),
        size: padded as u64 * h as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = shared
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("demo readback encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(h),
            },
        },
        wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
    );
    shared.queue().submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |r| {
        let _ = tx.send(r);
    });
    shared
        .device()
        .poll(wgpu::PollType::wait_indefinitely())
        .context("device poll failed")?;
    rx.recv()
        .context("map callback dropped")?
        .context("failed to map readback buffer")?;

    let mut pixels = Vec::with_capacity((row * h) as usize);
    {
        let mapped = slice.get_mapped_range();
        for chunk in mapped.chunks(padded as usize) {
            pixels.extend_from_slice(&chunk[..row as usize]);
        }
    }
    staging.unmap();
    Ok(pixels)
}

/// FNV-1a over the pixel bytes.
fn checksum(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |h, &b| {
        (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

// ── main ──────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let shared = pollster::block_on(WgpuSharedContext::new_headless(WgpuInit::default()))
        .context("failed to create headless GPU context")?;

    let engine = Arc::new(DemoEngine::default());
    let mut bridge = RawDataBridge::new(
        BridgeConfig::default(),
        Arc::new(SingleEngine::new(ENGINE_HANDLE, engine.clone())),
        Arc::new(shared.clone()),
    );

    call(&mut bridge, REGISTER_AUDIO_FRAME_OBSERVER, json!(ENGINE_HANDLE))?;
    call(
        &mut bridge,
        REGISTER_VIDEO_FRAME_OBSERVER,
        json!({ "engineHandle": ENGINE_HANDLE, "position": 0 }),
    )?;

    let mut samples = vec![0u8; 480 * 4];
    println!("audio frame accepted: {}", engine.push_audio(&mut samples));

    let source = create_source(&shared);
    for rotation in [0, 90, 180, 270] {
        let mut frame = VideoFrame::external(
            source,
            FRAME_WIDTH as i32,
            FRAME_HEIGHT as i32,
            rotation,
            flip_y(),
        );
        if !engine.push_capture(&mut frame) {
            bail!("capture frame with rotation {rotation} was not handled");
        }

        let pixels = read_texture(&shared, frame.texture_id)?;
        println!(
            "rotation {rotation:>3}: texture {} -> {} ({:?}), {} bytes, checksum {:016x}",
            source.0,
            frame.texture_id.0,
            frame.format,
            pixels.len(),
            checksum(&pixels)
        );
    }

    call(&mut bridge, UNREGISTER_VIDEO_FRAME_OBSERVER, Value::Null)?;
    call(&mut bridge, UNREGISTER_AUDIO_FRAME_OBSERVER, Value::Null)?;
    bridge.detach();
    shared.remove_texture(source);

    log::info!("demo finished");
    Ok(())
}
