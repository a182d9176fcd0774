//! Engine-owned frame records passed to observer callbacks.
//!
//! Frames are only valid for the duration of a callback and are handed to
//! observers by exclusive reference; nothing here is retained past return.

mod audio;
mod position;
mod video;

pub use audio::{AudioFrame, AudioParams, AudioSampleType};
pub use position::FramePosition;
pub use video::{UnknownPixelFormat, VideoFrame, VideoPixelFormat, VideoSourceType};
