use std::fmt;

use crate::coords::TexMatrix;
use crate::gpu::TextureId;

/// Pixel layout of a video frame, using the engine's integer codes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VideoPixelFormat {
    I420,
    Rgba,
    /// Plain 2D texture sampled with an identity transform.
    Texture2d,
    /// External (camera/decoder) texture requiring its sampling transform.
    TextureOes,
    I422,
}

impl VideoPixelFormat {
    pub const fn code(self) -> i32 {
        match self {
            VideoPixelFormat::I420 => 1,
            VideoPixelFormat::Rgba => 4,
            VideoPixelFormat::Texture2d => 10,
            VideoPixelFormat::TextureOes => 11,
            VideoPixelFormat::I422 => 16,
        }
    }

    #[inline]
    pub const fn is_texture(self) -> bool {
        matches!(self, VideoPixelFormat::Texture2d | VideoPixelFormat::TextureOes)
    }
}

impl TryFrom<i32> for VideoPixelFormat {
    type Error = UnknownPixelFormat;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(VideoPixelFormat::I420),
            4 => Ok(VideoPixelFormat::Rgba),
            10 => Ok(VideoPixelFormat::Texture2d),
            11 => Ok(VideoPixelFormat::TextureOes),
            16 => Ok(VideoPixelFormat::I422),
            other => Err(UnknownPixelFormat(other)),
        }
    }
}

/// Engine pixel format code this crate does not model.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UnknownPixelFormat(pub i32);

impl fmt::Display for UnknownPixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported video pixel format code {}", self.0)
    }
}

impl std::error::Error for UnknownPixelFormat {}

/// Video source a captured frame came from (engine code, passed through).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct VideoSourceType(pub i32);

impl VideoSourceType {
    pub const CAMERA_PRIMARY: Self = Self(0);
    pub const CAMERA_SECONDARY: Self = Self(1);
    pub const SCREEN_PRIMARY: Self = Self(2);
}

/// A single video frame as delivered to a video observer.
///
/// Width, height and rotation are kept in the engine's raw integer form so a
/// misbehaving source can be detected instead of silently clamped.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VideoFrame {
    pub format: VideoPixelFormat,
    pub width: i32,
    pub height: i32,
    /// Clockwise degrees the content must be rotated for upright display.
    pub rotation: i32,
    /// GPU texture backing the frame; only meaningful for texture formats.
    pub texture_id: TextureId,
    /// Output-to-source texture coordinate transform.
    pub tex_matrix: TexMatrix,
    pub render_time_ms: i64,
    pub avsync_type: i32,
}

impl VideoFrame {
    /// External-texture frame with the given transform.
    pub fn external(
        texture_id: TextureId,
        width: i32,
        height: i32,
        rotation: i32,
        tex_matrix: TexMatrix,
    ) -> Self {
        Self {
            format: VideoPixelFormat::TextureOes,
            width,
            height,
            rotation,
            texture_id,
            tex_matrix,
            render_time_ms: 0,
            avsync_type: 0,
        }
    }

    /// Whether the frame is already in the canonical output form.
    #[inline]
    pub fn is_canonical(&self) -> bool {
        self.format == VideoPixelFormat::Texture2d
    }
}
