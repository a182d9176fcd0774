use std::fmt;

use crate::coords::InvalidRotation;
use crate::gpu::GpuError;

/// Reasons a frame could not be normalized.
///
/// The frame is left untouched in every case.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// Width or height was not positive.
    InvalidDimensions { width: i32, height: i32 },
    /// Rotation outside {0, 90, 180, 270}.
    InvalidRotation(i32),
    /// The normalizer was released; a new registration builds a new one.
    Released,
    Gpu(GpuError),
}

impl ConvertError {
    /// Whether the frame source broke the frame contract, as opposed to a
    /// GPU-side failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidDimensions { .. } | ConvertError::InvalidRotation(_)
        )
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::InvalidDimensions { width, height } => {
                write!(f, "invalid frame dimensions {width}x{height}")
            }
            ConvertError::InvalidRotation(deg) => {
                write!(f, "invalid frame rotation {deg} (expected 0, 90, 180 or 270)")
            }
            ConvertError::Released => write!(f, "normalizer already released"),
            ConvertError::Gpu(err) => write!(f, "GPU conversion failed: {err}"),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Gpu(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GpuError> for ConvertError {
    fn from(err: GpuError) -> Self {
        ConvertError::Gpu(err)
    }
}

impl From<InvalidRotation> for ConvertError {
    fn from(err: InvalidRotation) -> Self {
        ConvertError::InvalidRotation(err.0)
    }
}
