//! Math utilities and types
//!
//! Vector aliases plus the handful of GLSL-style scalar helpers the shading
//! model evaluates on the CPU.

pub use nalgebra::{Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// Hermite interpolation between `edge0` and `edge1`, clamped to [0, 1]
///
/// Matches GLSL `smoothstep`. Degenerate edges (`edge0 == edge1`) step at the edge.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if (edge1 - edge0).abs() <= f32::EPSILON {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear blend of two vectors, GLSL `mix`
pub fn mix(a: &Vec3, b: &Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

/// Reflect incident direction `i` about normal `n`, GLSL `reflect`
///
/// `n` is expected to be normalized.
pub fn reflect(i: &Vec3, n: &Vec3) -> Vec3 {
    i - n * (2.0 * n.dot(i))
}

/// Normalize a vector, leaving zero-length input untouched
pub fn normalize_or_zero(v: &Vec3) -> Vec3 {
    let len = v.norm();
    if len > f32::EPSILON {
        v / len
    } else {
        *v
    }
}
