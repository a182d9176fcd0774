use crate::frame::FramePosition;

/// Bridge configuration.
///
/// Keep this structure small; the engine owns everything about capture and
/// rendering, the bridge only needs to know how to name and clear things.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Name of the method channel the control surface listens on.
    pub channel_name: String,

    /// Name given to the GPU worker thread of each video registration.
    pub gpu_thread_name: String,

    /// Color the render target is cleared to before each draw (RGBA, 0..1).
    pub clear_color: [f32; 4],

    /// Frame positions observed when a registration does not name any.
    pub default_video_position: FramePosition,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: "agora_rtc_rawdata".to_string(),
            gpu_thread_name: "rawdata-gpu".to_string(),
            clear_color: [0.0, 0.0, 0.0, 0.0],
            default_video_position: FramePosition::POST_CAPTURER,
        }
    }
}
