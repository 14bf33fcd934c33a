//! Kiln Core - Foundational types for the Kiln scene editor
//!
//! This crate provides the types that every other Kiln crate depends on:
//! - `EntityId` - Stable, non-zero 32-bit entity identifiers
//! - `Transform`, `Color` - Spatial and color types
//! - `Aabb`, `Ray` - Bounding volumes and ray casting
//! - `math` - Quaternion and matrix helpers on top of glam
//! - Error types and Result alias

mod bounds;
mod error;
mod id;
pub mod math;
mod types;

pub use bounds::{Aabb, Ray};
pub use error::{KilnError, Result};
pub use id::{EntityId, EntityIdAllocator};
pub use types::{Color, Transform};

pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};
