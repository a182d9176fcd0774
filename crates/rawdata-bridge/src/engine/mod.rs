//! Outbound interface to the media engine.
//!
//! The engine owns capture, rendering and encoding. The bridge only hands it
//! observer objects; the engine calls back into them per frame.

mod observer;

use std::sync::Arc;

pub use observer::{AudioFrameObserver, VideoFrameObserver, VideoFrameProcessMode};

/// Opaque engine handle as passed over the control surface.
pub type EngineHandle = i64;

/// Observer registration API of a running engine.
///
/// Passing `None` unregisters. Once an unregister call returns, the engine
/// has finished every callback into the previous observer and starts no new
/// ones. Registering the observer that is already installed is a no-op.
pub trait MediaEngine: Send + Sync {
    fn register_audio_frame_observer(&self, observer: Option<Arc<dyn AudioFrameObserver>>);

    fn register_video_frame_observer(&self, observer: Option<Arc<dyn VideoFrameObserver>>);
}

/// Resolves the handles the application sends into engine instances.
pub trait EngineProvider: Send + Sync {
    fn resolve(&self, handle: EngineHandle) -> Option<Arc<dyn MediaEngine>>;
}

/// Provider for a process with exactly one engine.
pub struct SingleEngine {
    handle: EngineHandle,
    engine: Arc<dyn MediaEngine>,
}

impl SingleEngine {
    pub fn new(handle: EngineHandle, engine: Arc<dyn MediaEngine>) -> Self {
        Self { handle, engine }
    }
}

impl EngineProvider for SingleEngine {
    fn resolve(&self, handle: EngineHandle) -> Option<Arc<dyn MediaEngine>> {
        (handle == self.handle).then(|| self.engine.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEngine;

    impl MediaEngine for NullEngine {
        fn register_audio_frame_observer(&self, _observer: Option<Arc<dyn AudioFrameObserver>>) {}
        fn register_video_frame_observer(&self, _observer: Option<Arc<dyn VideoFrameObserver>>) {}
    }

    #[test]
    fn single_engine_resolves_only_its_handle() {
        let provider = SingleEngine::new(42, Arc::new(NullEngine));
        assert!(provider.resolve(42).is_some());
        assert!(provider.resolve(0).is_none());
    }
}
