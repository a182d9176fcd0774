use crate::frame::{AudioFrame, AudioParams, FramePosition, VideoFrame, VideoPixelFormat, VideoSourceType};

// ── audio ─────────────────────────────────────────────────────────────────

/// Audio callbacks the engine invokes on its audio thread.
///
/// Each callback returns whether the frame is valid for further processing.
/// Frames may be edited in place but must not be retained.
pub trait AudioFrameObserver: Send + Sync {
    /// Locally captured audio.
    fn on_record_audio_frame(&self, channel_id: &str, frame: &mut AudioFrame<'_>) -> bool;

    /// Mixed remote audio about to be played.
    fn on_playback_audio_frame(&self, channel_id: &str, frame: &mut AudioFrame<'_>) -> bool;

    /// Captured and playback audio mixed together.
    fn on_mixed_audio_frame(&self, channel_id: &str, frame: &mut AudioFrame<'_>) -> bool;

    /// One remote user's audio before mixing.
    fn on_playback_audio_frame_before_mixing(
        &self,
        channel_id: &str,
        uid: u32,
        frame: &mut AudioFrame<'_>,
    ) -> bool;

    fn on_ear_monitoring_audio_frame(&self, frame: &mut AudioFrame<'_>) -> bool {
        let _ = frame;
        false
    }

    /// Engine audio position bitmask; `0` leaves the choice to the engine.
    fn observed_audio_frame_position(&self) -> i32 {
        0
    }

    fn playback_audio_params(&self) -> AudioParams {
        AudioParams::default()
    }

    fn record_audio_params(&self) -> AudioParams {
        AudioParams::default()
    }

    fn mixed_audio_params(&self) -> AudioParams {
        AudioParams::default()
    }

    fn ear_monitoring_audio_params(&self) -> AudioParams {
        AudioParams::default()
    }
}

// ── video ─────────────────────────────────────────────────────────────────

/// Whether an observer only inspects frames or may rewrite them.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum VideoFrameProcessMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

/// Video callbacks the engine invokes on its video threads.
///
/// Callbacks for one observer are serialized by the engine. Returning `false`
/// tells the engine the frame was left untouched.
pub trait VideoFrameObserver: Send + Sync {
    /// Locally captured frame, after the capturer.
    fn on_capture_video_frame(&self, source: VideoSourceType, frame: &mut VideoFrame) -> bool;

    fn on_pre_encode_video_frame(&self, source: VideoSourceType, frame: &mut VideoFrame) -> bool {
        let _ = (source, frame);
        true
    }

    /// Remote frame about to be rendered.
    fn on_render_video_frame(&self, channel_id: &str, remote_uid: u32, frame: &mut VideoFrame) -> bool {
        let _ = (channel_id, remote_uid, frame);
        true
    }

    fn on_media_player_video_frame(&self, frame: &mut VideoFrame, media_player_id: i32) -> bool {
        let _ = (frame, media_player_id);
        false
    }

    fn on_transcoded_video_frame(&self, frame: &mut VideoFrame) -> bool {
        let _ = frame;
        false
    }

    fn video_frame_process_mode(&self) -> VideoFrameProcessMode {
        VideoFrameProcessMode::ReadWrite
    }

    /// Pixel format the observer wants frames delivered in.
    fn video_format_preference(&self) -> VideoPixelFormat {
        VideoPixelFormat::TextureOes
    }

    /// Whether frames should arrive already rotated upright.
    fn rotation_applied(&self) -> bool {
        true
    }

    fn mirror_applied(&self) -> bool {
        false
    }

    fn observed_frame_position(&self) -> FramePosition {
        FramePosition::POST_CAPTURER
    }
}
