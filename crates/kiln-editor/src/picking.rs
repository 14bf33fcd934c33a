//! Mouse picking via ray-AABB intersection
//!
//! Each enabled entity with a model contributes its world-space AABB: the
//! model's local center/radius box pushed through the world matrix by
//! transforming all eight corners.

use crate::projection::screen_to_world_ray;
use kiln_core::{Aabb, EntityId, Mat4, Ray, Vec2};
use kiln_scene::{Entity, SceneGraph};

/// The nearest entity hit by a pick ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub entity: EntityId,
    /// Distance along the ray to the box entry point
    pub distance: f32,
}

/// World-space bounds used for picking, if the entity is pickable
pub fn pick_bounds(entity: &Entity) -> Option<Aabb> {
    if !entity.enabled {
        return None;
    }
    entity.world_bounds()
}

/// Nearest enabled entity whose bounds the ray enters
pub fn pick_entity(scene: &SceneGraph, ray: &Ray) -> Option<PickHit> {
    let mut best: Option<PickHit> = None;
    for entity in scene.iter() {
        let Some(bounds) = pick_bounds(entity) else {
            continue;
        };
        if let Some(distance) = bounds.intersect_ray(ray) {
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(PickHit {
                    entity: entity.id(),
                    distance,
                });
            }
        }
    }
    best
}

/// Pick through a pixel of the viewport
pub fn pick_at_screen(
    scene: &SceneGraph,
    inverse_view_projection: &Mat4,
    screen_size: Vec2,
    x: f32,
    y: f32,
) -> Option<PickHit> {
    let ray = screen_to_world_ray(inverse_view_projection, screen_size, x, y);
    pick_entity(scene, &ray)
}
