//! Rays and axis-aligned bounding boxes for picking

use crate::math::normalize_or_zero;
use glam::{Mat4, Vec3, Vec4};

/// A ray in 3D space with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing the direction. A zero direction becomes -Z.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = normalize_or_zero(direction);
        Self {
            origin,
            direction: if direction == Vec3::ZERO {
                Vec3::NEG_Z
            } else {
                direction
            },
        }
    }

    /// Point at parameter `t` along the ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Unproject normalized device coordinates through an inverse view-projection matrix.
    ///
    /// `ndc_x`, `ndc_y` are in [-1, 1]. Depth uses the [0, 1] clip range: the near
    /// point is unprojected at z = 0 and the far point at z = 1.
    pub fn from_ndc(ndc_x: f32, ndc_y: f32, inverse_view_projection: &Mat4) -> Self {
        let near = *inverse_view_projection * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far = *inverse_view_projection * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        let near = perspective_divide(near);
        let far = perspective_divide(far);

        Self::new(near, far - near)
    }
}

fn perspective_divide(v: Vec4) -> Vec3 {
    if v.w.abs() < 1e-10 {
        v.truncate()
    } else {
        v.truncate() / v.w
    }
}

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create from min and max corners
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Create from center position and half-extents
    pub fn from_center_half(center: Vec3, half: Vec3) -> Self {
        Self::from_min_max(center - half, center + half)
    }

    /// Symmetric box enclosing a bounding sphere
    pub fn from_center_radius(center: Vec3, radius: f32) -> Self {
        Self::from_center_half(center, Vec3::splat(radius.abs()))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// The eight corner points
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// World-space box enclosing all eight transformed corners
    pub fn transformed(&self, mat: &Mat4) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for corner in self.corners() {
            let p = mat.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    /// Ray-AABB intersection using the slab method (Kay/Kajiya).
    ///
    /// Returns the distance along the ray to the nearest hit in front of the
    /// origin (0 when the origin is inside), or None.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        for i in 0..3 {
            let origin = ray.origin[i];
            let dir = ray.direction[i];
            if dir.abs() < 1e-8 {
                // Parallel to this slab
                if origin < self.min[i] || origin > self.max[i] {
                    return None;
                }
            } else {
                let inv_d = 1.0 / dir;
                let mut t1 = (self.min[i] - origin) * inv_d;
                let mut t2 = (self.max[i] - origin) * inv_d;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                tmin = tmin.max(t1);
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return None;
                }
            }
        }

        if tmax < 0.0 {
            None
        } else {
            Some(tmin.max(0.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn ray_hits_box_in_front() {
        let aabb = Aabb::from_center_radius(Vec3::ZERO, 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        let t = aabb.intersect_ray(&ray).unwrap();
        assert!((t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ray_misses_box_behind() {
        let aabb = Aabb::from_center_radius(Vec3::ZERO, 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!(aabb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn parallel_ray_requires_origin_inside_slab() {
        let aabb = Aabb::from_center_radius(Vec3::ZERO, 1.0);
        let outside = Ray::new(Vec3::new(0.0, 2.0, -5.0), Vec3::Z);
        assert!(aabb.intersect_ray(&outside).is_none());
        let inside = Ray::new(Vec3::new(0.0, 0.5, -5.0), Vec3::Z);
        assert!(aabb.intersect_ray(&inside).is_some());
    }

    #[test]
    fn origin_inside_box_hits_at_zero() {
        let aabb = Aabb::from_center_radius(Vec3::ZERO, 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(aabb.intersect_ray(&ray), Some(0.0));
    }

    #[test]
    fn transformed_box_expands_rotated_corners() {
        let aabb = Aabb::from_center_radius(Vec3::ZERO, 1.0);
        let m = Mat4::from_rotation_translation(
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            Vec3::new(10.0, 0.0, 0.0),
        );
        let world = aabb.transformed(&m);
        let r = 2.0f32.sqrt();
        assert!((world.max.x - (10.0 + r)).abs() < 1e-4);
        assert!((world.min.z + r).abs() < 1e-4);
        assert!((world.max.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ndc_ray_through_identity_points_forward() {
        let ray = Ray::from_ndc(0.0, 0.0, &Mat4::IDENTITY);
        assert!(ray.origin.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(ray.direction.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn ndc_ray_from_perspective_camera() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let inv = (proj * view).inverse();
        let ray = Ray::from_ndc(0.0, 0.0, &inv);
        assert!(ray.direction.abs_diff_eq(Vec3::NEG_Z, 1e-4));
        assert!((ray.origin.z - 9.9).abs() < 1e-3);
    }
}
