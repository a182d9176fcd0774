//! Control surface and observer lifecycle.
//!
//! `RawDataBridge` answers method calls from the application, installs at
//! most one audio and one video observer with the engine, and tears the
//! video observer's GPU resources down in the required order:
//! detach from the engine, release drawer/target on the worker, dispose the
//! worker.

mod audio;
mod channel;
mod video;

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::engine::{EngineHandle, EngineProvider, MediaEngine};
use crate::frame::FramePosition;
use crate::gpu::SharedGpuContext;
use crate::normalizer::VideoNormalizer;

pub use audio::PassThroughAudioObserver;
pub use channel::{
    ArgumentError, MethodCall, MethodResult, RegistrationArgs, CHANNEL_CLOSED, INVALID_ARGUMENT,
    REGISTER_AUDIO_FRAME_OBSERVER, REGISTER_VIDEO_FRAME_OBSERVER, UNREGISTER_AUDIO_FRAME_OBSERVER,
    UNREGISTER_VIDEO_FRAME_OBSERVER,
};
pub use video::NormalizingVideoObserver;

struct AudioRegistration {
    engine: Arc<dyn MediaEngine>,
    observer: Arc<PassThroughAudioObserver>,
}

struct VideoRegistration {
    engine: Arc<dyn MediaEngine>,
    observer: Arc<NormalizingVideoObserver>,
}

/// Bridges engine frame observers to the application's control channel.
pub struct RawDataBridge {
    config: BridgeConfig,
    engines: Arc<dyn EngineProvider>,
    gpu: Arc<dyn SharedGpuContext>,
    audio: Option<AudioRegistration>,
    video: Option<VideoRegistration>,
    attached: bool,
}

impl RawDataBridge {
    pub fn new(
        config: BridgeConfig,
        engines: Arc<dyn EngineProvider>,
        gpu: Arc<dyn SharedGpuContext>,
    ) -> Self {
        log::info!("RawDataBridge: attached to channel '{}'", config.channel_name);
        Self {
            config,
            engines,
            gpu,
            audio: None,
            video: None,
            attached: true,
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.config.channel_name
    }

    /// Dispatches one control call.
    pub fn handle(&mut self, call: &MethodCall) -> MethodResult {
        if !self.attached {
            return MethodResult::error(CHANNEL_CLOSED, format!("'{}' after detach", call.method));
        }

        match call.method.as_str() {
            REGISTER_AUDIO_FRAME_OBSERVER => match RegistrationArgs::parse(&call.arguments) {
                Ok(args) => {
                    self.register_audio(args.handle);
                    MethodResult::null()
                }
                Err(err) => invalid_argument(&call.method, err),
            },
            UNREGISTER_AUDIO_FRAME_OBSERVER => {
                self.unregister_audio();
                MethodResult::null()
            }
            REGISTER_VIDEO_FRAME_OBSERVER => match RegistrationArgs::parse(&call.arguments) {
                Ok(args) => {
                    self.register_video(args.handle, args.position);
                    MethodResult::null()
                }
                Err(err) => invalid_argument(&call.method, err),
            },
            UNREGISTER_VIDEO_FRAME_OBSERVER => {
                self.unregister_video();
                MethodResult::null()
            }
            other => {
                log::debug!("RawDataBridge: method '{other}' not implemented");
                MethodResult::NotImplemented
            }
        }
    }

    /// Installs the pass-through audio observer, or re-issues its
    /// registration if it is already installed.
    pub fn register_audio(&mut self, handle: EngineHandle) {
        if let Some(reg) = &self.audio {
            log::debug!("RawDataBridge: re-registering audio observer");
            reg.engine.register_audio_frame_observer(Some(reg.observer.clone()));
            return;
        }

        let Some(engine) = self.resolve(handle) else {
            return;
        };
        let observer = Arc::new(PassThroughAudioObserver::new());
        engine.register_audio_frame_observer(Some(observer.clone()));
        log::info!("RawDataBridge: audio observer registered");
        self.audio = Some(AudioRegistration { engine, observer });
    }

    pub fn unregister_audio(&mut self) {
        let Some(reg) = self.audio.take() else {
            return;
        };
        reg.engine.register_audio_frame_observer(None);
        log::info!(
            "RawDataBridge: audio observer unregistered after {} frames",
            reg.observer.frames_seen()
        );
    }

    /// Installs the normalizing video observer, or re-issues its
    /// registration if it is already installed.
    ///
    /// `position` overrides the configured observed frame position; an empty
    /// mask means post-capture.
    pub fn register_video(&mut self, handle: EngineHandle, position: Option<FramePosition>) {
        if let Some(reg) = &self.video {
            log::debug!("RawDataBridge: re-registering video observer");
            reg.engine.register_video_frame_observer(Some(reg.observer.clone()));
            return;
        }

        let Some(engine) = self.resolve(handle) else {
            return;
        };
        let position = position.unwrap_or(self.config.default_video_position);
        let normalizer = VideoNormalizer::new(self.gpu.clone(), &self.config);
        let observer = Arc::new(NormalizingVideoObserver::new(normalizer, position));
        engine.register_video_frame_observer(Some(observer.clone()));
        log::info!(
            "RawDataBridge: video observer registered (position mask {:#x})",
            position.or_default().bits()
        );
        self.video = Some(VideoRegistration { engine, observer });
    }

    pub fn unregister_video(&mut self) {
        let Some(reg) = self.video.take() else {
            return;
        };
        // No callback is in flight once the engine has dropped the observer.
        reg.engine.register_video_frame_observer(None);
        reg.observer.shutdown();
        log::info!("RawDataBridge: video observer unregistered");
    }

    /// Unregisters both observers and closes the control surface.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.unregister_audio();
        self.unregister_video();
        self.attached = false;
        log::info!("RawDataBridge: detached from channel '{}'", self.config.channel_name);
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn has_audio_observer(&self) -> bool {
        self.audio.is_some()
    }

    pub fn has_video_observer(&self) -> bool {
        self.video.is_some()
    }

    fn resolve(&self, handle: EngineHandle) -> Option<Arc<dyn MediaEngine>> {
        let engine = self.engines.resolve(handle);
        if engine.is_none() {
            log::warn!("RawDataBridge: no engine for handle {handle:#x}; observer not registered");
        }
        engine
    }
}

impl Drop for RawDataBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

fn invalid_argument(method: &str, err: ArgumentError) -> MethodResult {
    log::warn!("RawDataBridge: {method}: {err}");
    MethodResult::error(INVALID_ARGUMENT, err.0)
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use super::*;
    use crate::coords::TexMatrix;
    use crate::engine::{AudioFrameObserver, SingleEngine, VideoFrameObserver};
    use crate::frame::{VideoFrame, VideoPixelFormat, VideoSourceType};
    use crate::gpu::TextureId;
    use crate::gpu::fake::FakeSharedContext;

    const HANDLE: EngineHandle = 0x7f00_1000;

    /// Engine that keeps the installed observers so tests can drive frames.
    #[derive(Default)]
    struct RecordingEngine {
        audio: Mutex<Option<Arc<dyn AudioFrameObserver>>>,
        video: Mutex<Option<Arc<dyn VideoFrameObserver>>>,
        audio_calls: Mutex<Vec<bool>>,
        video_calls: Mutex<Vec<bool>>,
        /// When set, live GPU object counts are sampled at each video detach.
        gpu: Option<Arc<FakeSharedContext>>,
        live_at_video_detach: Mutex<Vec<usize>>,
    }

    impl MediaEngine for RecordingEngine {
        fn register_audio_frame_observer(&self, observer: Option<Arc<dyn AudioFrameObserver>>) {
            self.audio_calls.lock().push(observer.is_some());
            *self.audio.lock() = observer;
        }

        fn register_video_frame_observer(&self, observer: Option<Arc<dyn VideoFrameObserver>>) {
            self.video_calls.lock().push(observer.is_some());
            if let (None, Some(gpu)) = (&observer, &self.gpu) {
                self.live_at_video_detach.lock().push(gpu.with_state(|s| s.live_objects()));
            }
            *self.video.lock() = observer;
        }
    }

    impl RecordingEngine {
        fn video_observer(&self) -> Option<Arc<dyn VideoFrameObserver>> {
            self.video.lock().clone()
        }

        fn capture(&self, frame: &mut VideoFrame) -> bool {
            let observer = self.video_observer().expect("no video observer installed");
            observer.on_capture_video_frame(VideoSourceType::CAMERA_PRIMARY, frame)
        }
    }

    struct Fixture {
        engine: Arc<RecordingEngine>,
        gpu: Arc<FakeSharedContext>,
        bridge: RawDataBridge,
    }

    fn fixture() -> Fixture {
        let gpu = FakeSharedContext::new();
        let engine = Arc::new(RecordingEngine {
            gpu: Some(gpu.clone()),
            ..Default::default()
        });
        let bridge = RawDataBridge::new(
            BridgeConfig::default(),
            Arc::new(SingleEngine::new(HANDLE, engine.clone())),
            gpu.clone(),
        );
        Fixture { engine, gpu, bridge }
    }

    fn call(method: &str, arguments: Value) -> MethodCall {
        MethodCall::new(method, arguments)
    }

    #[test]
    fn register_video_twice_keeps_one_resource_set() {
        let mut f = fixture();
        assert!(f.bridge.handle(&call(REGISTER_VIDEO_FRAME_OBSERVER, json!(HANDLE))).is_success());
        let first = f.engine.video_observer().unwrap();

        let source = f.gpu.import_external(320, 240);
        let mut frame = VideoFrame::external(source, 320, 240, 0, TexMatrix::IDENTITY);
        assert!(f.engine.capture(&mut frame));

        assert!(f.bridge.handle(&call(REGISTER_VIDEO_FRAME_OBSERVER, json!(HANDLE))).is_success());
        let second = f.engine.video_observer().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*f.engine.video_calls.lock(), vec![true, true]);

        let mut frame = VideoFrame::external(source, 320, 240, 90, TexMatrix::IDENTITY);
        assert!(f.engine.capture(&mut frame));

        let stats = f.gpu.stats();
        assert_eq!(stats.devices_created, 1);
        assert_eq!(stats.owned_textures, 1);
        assert_eq!(stats.framebuffers, 1);
        assert_eq!(stats.programs, 1);
    }

    #[test]
    fn unregister_then_register_recreates_gpu_resources() {
        let mut f = fixture();
        let source = f.gpu.import_external(64, 64);

        f.bridge.register_video(HANDLE, None);
        let mut frame = VideoFrame::external(source, 64, 64, 0, TexMatrix::IDENTITY);
        assert!(f.engine.capture(&mut frame));
        let old_texture = frame.texture_id;

        f.bridge.unregister_video();
        assert!(f.engine.video_observer().is_none());
        f.gpu.with_state(|s| assert_eq!(s.live_objects(), 0));
        assert_eq!(f.gpu.stats().devices_dropped, 1);

        f.bridge.register_video(HANDLE, None);
        let mut frame = VideoFrame::external(source, 64, 64, 0, TexMatrix::IDENTITY);
        assert!(f.engine.capture(&mut frame));

        assert_eq!(f.gpu.stats().devices_created, 2);
        assert_ne!(frame.texture_id, old_texture);
        assert!(f.gpu.texture(old_texture).is_none());
    }

    #[test]
    fn empty_mask_registration_normalizes_rotated_capture() {
        let mut f = fixture();
        let result = f.bridge.handle(&call(
            REGISTER_VIDEO_FRAME_OBSERVER,
            json!({ "engineHandle": HANDLE, "position": 0 }),
        ));
        assert_eq!(result, MethodResult::null());

        let observer = f.engine.video_observer().unwrap();
        assert_eq!(observer.observed_frame_position(), FramePosition::POST_CAPTURER);

        // Burn names until the engine's texture is number 7.
        let source = loop {
            let id = f.gpu.import_external(640, 480);
            if id == TextureId(7) {
                break id;
            }
            assert!(id.0 < 7);
        };
        let t0 = TexMatrix([
            1.0, 0.0, 0.0, 0.0, //
            0.0, -1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, 1.0,
        ]);
        let mut frame = VideoFrame::external(source, 640, 480, 90, t0);

        assert!(f.engine.capture(&mut frame));
        assert_eq!(frame.format, VideoPixelFormat::Texture2d);
        assert!(frame.tex_matrix.is_identity());
        assert_eq!((frame.width, frame.height), (640, 480));
        assert_ne!(frame.texture_id, TextureId(7));
    }

    #[test]
    fn position_override_reaches_the_engine() {
        let mut f = fixture();
        f.bridge.handle(&call(
            REGISTER_VIDEO_FRAME_OBSERVER,
            json!({ "engineHandle": HANDLE, "position": 6 }),
        ));
        let observer = f.engine.video_observer().unwrap();
        assert_eq!(
            observer.observed_frame_position(),
            FramePosition::PRE_RENDERER | FramePosition::PRE_ENCODER
        );
    }

    #[test]
    fn unregister_audio_without_observer_is_null() {
        let mut f = fixture();
        let result = f.bridge.handle(&call(UNREGISTER_AUDIO_FRAME_OBSERVER, Value::Null));
        assert_eq!(result, MethodResult::null());
        assert!(f.engine.audio_calls.lock().is_empty());
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let mut f = fixture();
        let result = f.bridge.handle(&call("doSomething", json!(HANDLE)));
        assert_eq!(result, MethodResult::NotImplemented);
        assert!(!f.bridge.has_audio_observer());
        assert!(!f.bridge.has_video_observer());
        assert!(f.engine.audio_calls.lock().is_empty());
        assert!(f.engine.video_calls.lock().is_empty());
    }

    #[test]
    fn audio_registration_is_idempotent() {
        let mut f = fixture();
        f.bridge.handle(&call(REGISTER_AUDIO_FRAME_OBSERVER, json!(HANDLE)));
        let first = f.engine.audio.lock().clone().unwrap();
        f.bridge.handle(&call(REGISTER_AUDIO_FRAME_OBSERVER, json!(HANDLE)));
        let second = f.engine.audio.lock().clone().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        f.bridge.handle(&call(UNREGISTER_AUDIO_FRAME_OBSERVER, Value::Null));
        assert_eq!(*f.engine.audio_calls.lock(), vec![true, true, false]);
        assert!(f.engine.audio.lock().is_none());
    }

    #[test]
    fn malformed_handle_is_an_invalid_argument() {
        let mut f = fixture();
        let result = f.bridge.handle(&call(REGISTER_VIDEO_FRAME_OBSERVER, json!("engine")));
        assert!(matches!(result, MethodResult::Error { ref code, .. } if code == INVALID_ARGUMENT));
        assert!(!f.bridge.has_video_observer());
    }

    #[test]
    fn unknown_handle_registers_nothing() {
        let mut f = fixture();
        let result = f.bridge.handle(&call(REGISTER_AUDIO_FRAME_OBSERVER, json!(1)));
        assert_eq!(result, MethodResult::null());
        assert!(!f.bridge.has_audio_observer());
        assert!(f.engine.audio_calls.lock().is_empty());
    }

    #[test]
    fn detach_unregisters_everything_and_closes_channel() {
        let mut f = fixture();
        f.bridge.register_audio(HANDLE);
        f.bridge.register_video(HANDLE, None);
        let source = f.gpu.import_external(16, 16);
        let mut frame = VideoFrame::external(source, 16, 16, 0, TexMatrix::IDENTITY);
        assert!(f.engine.capture(&mut frame));

        f.bridge.detach();
        assert!(!f.bridge.is_attached());
        assert!(f.engine.audio.lock().is_none());
        assert!(f.engine.video_observer().is_none());
        f.gpu.with_state(|s| assert_eq!(s.live_objects(), 0));

        let result = f.bridge.handle(&call(REGISTER_AUDIO_FRAME_OBSERVER, json!(HANDLE)));
        assert!(matches!(result, MethodResult::Error { ref code, .. } if code == CHANNEL_CLOSED));
        assert!(f.engine.audio.lock().is_none());
    }

    #[test]
    fn dropping_the_bridge_tears_down() {
        let f = fixture();
        let Fixture { engine, gpu, mut bridge } = f;
        bridge.register_video(HANDLE, None);
        let source = gpu.import_external(8, 8);
        let mut frame = VideoFrame::external(source, 8, 8, 0, TexMatrix::IDENTITY);
        assert!(engine.capture(&mut frame));

        drop(bridge);
        assert!(engine.video_observer().is_none());
        assert_eq!(gpu.stats().devices_dropped, 1);
    }

    #[test]
    fn unregister_waits_for_in_flight_capture() {
        for _ in 0..25 {
            let mut f = fixture();
            f.bridge.register_video(HANDLE, None);
            let observer = f.engine.video_observer().unwrap();
            let source = f.gpu.import_external(32, 32);
            let (converted_tx, converted_rx) = crossbeam_channel::bounded(1);

            // Holds its own reference, like an engine callback already under way.
            let capture = std::thread::spawn(move || {
                let mut handled = 0;
                for rotation in [0, 90, 180, 270].into_iter().cycle().take(200) {
                    let mut frame = VideoFrame::external(source, 32, 32, rotation, TexMatrix::IDENTITY);
                    if observer.on_capture_video_frame(VideoSourceType::CAMERA_PRIMARY, &mut frame) {
                        assert_eq!(frame.format, VideoPixelFormat::Texture2d);
                        handled += 1;
                        let _ = converted_tx.try_send(());
                    }
                }
                handled
            });

            converted_rx.recv().unwrap();
            f.bridge.unregister_video();
            let handled = capture.join().expect("capture thread panicked");

            assert!(handled >= 1);
            f.gpu.with_state(|s| assert_eq!(s.live_objects(), 0));
            assert_eq!(f.gpu.stats().devices_dropped, 1);
            // The engine let go of the observer while the GPU objects were still alive.
            let sampled = f.engine.live_at_video_detach.lock().clone();
            assert_eq!(sampled.len(), 1);
            assert!(sampled[0] > 0);
        }
    }

    #[test]
    fn bare_position_mask_is_read_as_an_engine_handle() {
        let mut f = fixture();
        let result = f.bridge.handle(&call(REGISTER_VIDEO_FRAME_OBSERVER, json!(0)));
        assert_eq!(result, MethodResult::null());
        assert!(!f.bridge.has_video_observer());
        assert!(f.engine.video_calls.lock().is_empty());
    }

    #[test]
    fn reports_configured_channel_name() {
        let f = fixture();
        assert_eq!(f.bridge.channel_name(), "agora_rtc_rawdata");
    }
}
