//! Shared 3D projection math: world-to-screen projection, screen-to-world
//! ray unprojection and the ray intersections the gizmo drags on.

use kiln_core::{Mat4, Ray, Vec2, Vec3};

/// Convert a pixel position to normalized device coordinates.
/// Pixel y grows downward; NDC y grows upward.
pub fn screen_to_ndc(screen_size: Vec2, x: f32, y: f32) -> Vec2 {
    let w = screen_size.x.max(1.0);
    let h = screen_size.y.max(1.0);
    Vec2::new(x / w * 2.0 - 1.0, 1.0 - y / h * 2.0)
}

/// World-space ray through a pixel
pub fn screen_to_world_ray(inverse_view_projection: &Mat4, screen_size: Vec2, x: f32, y: f32) -> Ray {
    let ndc = screen_to_ndc(screen_size, x, y);
    Ray::from_ndc(ndc.x, ndc.y, inverse_view_projection)
}

/// Project a world-space point to pixels. Returns None behind the camera.
pub fn world_to_screen(view_projection: &Mat4, screen_size: Vec2, pos: Vec3) -> Option<Vec2> {
    let clip = *view_projection * pos.extend(1.0);
    if clip.w <= 1e-3 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x + 1.0) * 0.5 * screen_size.x,
        (1.0 - ndc.y) * 0.5 * screen_size.y,
    ))
}

/// Intersect a ray with the plane through `point` with normal `normal`.
/// None when parallel or when the plane is behind the ray.
pub fn ray_plane_intersect(ray: &Ray, point: Vec3, normal: Vec3) -> Option<Vec3> {
    let denom = normal.dot(ray.direction);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (point - ray.origin).dot(normal) / denom;
    (t >= 0.0).then(|| ray.at(t))
}

/// Point on the infinite line `origin + s * dir` closest to the ray.
/// None when the ray runs parallel to the line.
pub fn closest_point_on_line(ray: &Ray, origin: Vec3, dir: Vec3) -> Option<Vec3> {
    let dir = dir.normalize_or_zero();
    let w = origin - ray.origin;
    let b = dir.dot(ray.direction);
    let denom = 1.0 - b * b;
    if denom.abs() < 1e-6 {
        return None;
    }
    let d = dir.dot(w);
    let e = ray.direction.dot(w);
    let s = (b * e - d) / denom;
    Some(origin + dir * s)
}

/// Distance from a ray (forward half only) to a point
pub fn ray_point_distance(ray: &Ray, point: Vec3) -> f32 {
    let t = (point - ray.origin).dot(ray.direction).max(0.0);
    ray.at(t).distance(point)
}
