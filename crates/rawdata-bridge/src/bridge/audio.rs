use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::AudioFrameObserver;
use crate::frame::AudioFrame;

/// Accepts every audio frame unchanged.
#[derive(Debug, Default)]
pub struct PassThroughAudioObserver {
    frames: AtomicU64,
}

impl PassThroughAudioObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames seen across all callback kinds.
    pub fn frames_seen(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    fn accept(&self, kind: &str, frame: &AudioFrame<'_>) -> bool {
        self.frames.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "audio {kind}: {} samples x {} ch @ {} Hz",
            frame.samples_per_channel,
            frame.channels,
            frame.samples_per_sec
        );
        true
    }
}

impl AudioFrameObserver for PassThroughAudioObserver {
    fn on_record_audio_frame(&self, _channel_id: &str, frame: &mut AudioFrame<'_>) -> bool {
        self.accept("record", frame)
    }

    fn on_playback_audio_frame(&self, _channel_id: &str, frame: &mut AudioFrame<'_>) -> bool {
        self.accept("playback", frame)
    }

    fn on_mixed_audio_frame(&self, _channel_id: &str, frame: &mut AudioFrame<'_>) -> bool {
        self.accept("mixed", frame)
    }

    fn on_playback_audio_frame_before_mixing(
        &self,
        _channel_id: &str,
        _uid: u32,
        frame: &mut AudioFrame<'_>,
    ) -> bool {
        self.accept("before-mixing", frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{AudioParams, AudioSampleType};

    #[test]
    fn accepts_all_callbacks_without_touching_samples() {
        let observer = PassThroughAudioObserver::new();
        let mut samples = vec![1u8, 2, 3, 4];
        let mut frame = AudioFrame {
            sample_type: AudioSampleType::Pcm16,
            samples_per_channel: 1,
            bytes_per_sample: 2,
            channels: 2,
            samples_per_sec: 48_000,
            buffer: &mut samples,
            render_time_ms: 0,
            avsync_type: 0,
        };
        assert_eq!(frame.expected_len(), 4);

        assert!(observer.on_record_audio_frame("c", &mut frame));
        assert!(observer.on_playback_audio_frame("c", &mut frame));
        assert!(observer.on_mixed_audio_frame("c", &mut frame));
        assert!(observer.on_playback_audio_frame_before_mixing("c", 7, &mut frame));
        assert!(!observer.on_ear_monitoring_audio_frame(&mut frame));
        assert_eq!(observer.frames_seen(), 4);
        assert_eq!(samples, [1, 2, 3, 4]);
    }

    #[test]
    fn reports_engine_defaults() {
        let observer = PassThroughAudioObserver::new();
        assert_eq!(observer.observed_audio_frame_position(), 0);
        assert_eq!(observer.record_audio_params(), AudioParams::default());
        assert_eq!(observer.ear_monitoring_audio_params(), AudioParams::default());
    }
}
