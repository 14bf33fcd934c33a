//! Transforms and colors shared by every Kiln crate

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A 3D transform with position, unit-quaternion rotation, and per-axis scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_trs(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a 4x4 transformation matrix (translate * rotate * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decompose an affine matrix. Shear is discarded.
    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, position) = m.to_scale_rotation_translation();
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }

    /// Component-wise approximate equality
    pub fn abs_diff_eq(&self, other: &Self, eps: f32) -> bool {
        self.position.abs_diff_eq(other.position, eps)
            && self.scale.abs_diff_eq(other.scale, eps)
            // q and -q are the same rotation
            && (self.rotation.abs_diff_eq(other.rotation, eps)
                || self.rotation.abs_diff_eq(-other.rotation, eps))
    }
}

/// RGBA color
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const RED: Self = Self {
        r: 0.84,
        g: 0.26,
        b: 0.26,
        a: 1.0,
    };
    pub const GREEN: Self = Self {
        r: 0.26,
        g: 0.67,
        b: 0.26,
        a: 1.0,
    };
    pub const BLUE: Self = Self {
        r: 0.26,
        g: 0.46,
        b: 0.84,
        a: 1.0,
    };
    pub const YELLOW: Self = Self {
        r: 1.0,
        g: 0.85,
        b: 0.2,
        a: 1.0,
    };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from `0xRRGGBB`
    pub fn from_hex(hex: u32) -> Self {
        let [_, r, g, b] = hex.to_be_bytes();
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Scale the RGB channels, leaving alpha untouched
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
            a: self.a,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
