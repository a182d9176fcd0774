//! Geometry shared by the normalizer and the GPU layer.
//!
//! Texture space conventions:
//! - normalized texture coordinates, (0, 0) to (1, 1)
//! - sampling transforms map output coordinates to source coordinates
//! - 4x4 texture matrices are column-major, as uploaded to shaders

mod matrix;
mod rect;
mod rotation;

pub use matrix::{Affine2, TexMatrix};
pub use rect::PixelRect;
pub use rotation::{InvalidRotation, Rotation};
