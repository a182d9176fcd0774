use std::ops::Mul;

use bytemuck::{Pod, Zeroable};

use super::Rotation;

/// 3x3 row-major matrix in homogeneous 2D texture space.
///
/// Layout:
///
/// ```text
/// | sx  kx  tx |
/// | ky  sy  ty |
/// | p0  p1  p2 |
/// ```
///
/// Composition follows matrix multiplication: `a * b` applies `b` first.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2 {
    pub rows: [[f32; 3]; 3],
}

impl Affine2 {
    pub const IDENTITY: Self = Self {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    #[inline]
    pub const fn translate(dx: f32, dy: f32) -> Self {
        Self {
            rows: [[1.0, 0.0, dx], [0.0, 1.0, dy], [0.0, 0.0, 1.0]],
        }
    }

    /// Counter-clockwise rotation about the origin.
    #[inline]
    pub const fn rotate(rotation: Rotation) -> Self {
        let (s, c) = rotation.sin_cos();
        Self {
            rows: [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Rotation about the center of the unit square.
    pub fn rotate_about_center(rotation: Rotation) -> Self {
        Self::translate(0.5, 0.5) * Self::rotate(rotation) * Self::translate(-0.5, -0.5)
    }

    /// Maps a point, including the perspective divide.
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        let r = &self.rows;
        let px = r[0][0] * x + r[0][1] * y + r[0][2];
        let py = r[1][0] * x + r[1][1] * y + r[1][2];
        let w = r[2][0] * x + r[2][1] * y + r[2][2];
        if w == 0.0 || w == 1.0 {
            (px, py)
        } else {
            (px / w, py / w)
        }
    }
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Affine2 {
    type Output = Affine2;

    fn mul(self, rhs: Affine2) -> Affine2 {
        let mut rows = [[0.0f32; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Affine2 { rows }
    }
}

/// Column-major 4x4 texture-coordinate matrix, as consumed by shaders and
/// reported by capture pipelines.
///
/// Only the 2D-affine subset is meaningful: the z row/column pass through.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TexMatrix(pub [f32; 16]);

impl TexMatrix {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Drops the z row/column, keeping x, y and w.
    pub fn to_affine(&self) -> Affine2 {
        let m = &self.0;
        Affine2 {
            rows: [
                [m[0], m[4], m[12]],
                [m[1], m[5], m[13]],
                [m[3], m[7], m[15]],
            ],
        }
    }

    /// Expands a 2D-affine matrix back to 4x4 with a pass-through z.
    pub fn from_affine(a: &Affine2) -> Self {
        let r = &a.rows;
        Self([
            r[0][0], r[1][0], 0.0, r[2][0], //
            r[0][1], r[1][1], 0.0, r[2][1], //
            0.0, 0.0, 1.0, 0.0, //
            r[0][2], r[1][2], 0.0, r[2][2],
        ])
    }

    /// Maps a texture coordinate through the matrix (z = 0, w = 1).
    pub fn map_point(&self, u: f32, v: f32) -> (f32, f32) {
        self.to_affine().map_point(u, v)
    }

    /// Columns as uploaded to a `mat4x4<f32>` uniform.
    pub fn columns(&self) -> [[f32; 4]; 4] {
        let m = &self.0;
        [
            [m[0], m[1], m[2], m[3]],
            [m[4], m[5], m[6], m[7]],
            [m[8], m[9], m[10], m[11]],
            [m[12], m[13], m[14], m[15]],
        ]
    }
}

impl Default for TexMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
