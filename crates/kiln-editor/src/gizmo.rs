//! Transform gizmo: handle hit-testing and translate/rotate/scale drags.
//!
//! Handles are sized in world units (the editor rescales them with camera
//! distance every frame). Hit tests run in the gizmo's own frame, so the
//! thin axis boxes stay thin in local space.

use crate::projection::{closest_point_on_line, ray_plane_intersect};
use kiln_core::math::{any_perpendicular, quat_from_axis_angle};
use kiln_core::{Aabb, Color, Mat4, Quat, Ray, Transform, Vec3};
use kiln_render::GizmoLine;
use std::f32::consts::TAU;
use std::fmt;

/// Fraction of the handle length used for the center box half-size
const CENTER_HANDLE: f32 = 0.12;
/// Half-thickness of the axis boxes and rotate rings, relative to handle length
const AXIS_THICKNESS: f32 = 0.06;
/// Scale change per percent of handle length dragged along an axis
const SCALE_RATE: f32 = 0.01;
const MIN_SCALE: f32 = 1e-3;
const RING_SEGMENTS: usize = 48;

const X_COLOR: Color = Color::new(0.84, 0.26, 0.26, 1.0);
const Y_COLOR: Color = Color::new(0.26, 0.67, 0.26, 1.0);
const Z_COLOR: Color = Color::new(0.26, 0.46, 0.84, 1.0);
const CENTER_COLOR: Color = Color::new(0.85, 0.85, 0.85, 1.0);
const HIGHLIGHT: Color = Color::new(1.0, 0.85, 0.2, 1.0);
const DIM: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoSpace {
    #[default]
    World,
    /// Axes follow the entity's world rotation
    Local,
}

/// Which handle the gizmo is operating on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoAxis {
    X,
    Y,
    Z,
    /// The center handle: free translate or uniform scale
    Xyz,
}

impl GizmoAxis {
    pub const AXES: [GizmoAxis; 3] = [GizmoAxis::X, GizmoAxis::Y, GizmoAxis::Z];

    pub fn index(self) -> Option<usize> {
        match self {
            GizmoAxis::X => Some(0),
            GizmoAxis::Y => Some(1),
            GizmoAxis::Z => Some(2),
            GizmoAxis::Xyz => None,
        }
    }

    fn color(self) -> Color {
        match self {
            GizmoAxis::X => X_COLOR,
            GizmoAxis::Y => Y_COLOR,
            GizmoAxis::Z => Z_COLOR,
            GizmoAxis::Xyz => CENTER_COLOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapSettings {
    pub enabled: bool,
    pub translate: f32,
    /// Degrees
    pub rotate: f32,
    pub scale: f32,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            translate: 0.5,
            rotate: 15.0,
            scale: 0.1,
        }
    }
}

fn snap(value: f32, increment: f32) -> f32 {
    if increment > 0.0 {
        (value / increment).round() * increment
    } else {
        value
    }
}

/// The entity being manipulated: its local transform and its parent's
/// world matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoTarget {
    pub transform: Transform,
    pub parent_world: Mat4,
}

impl GizmoTarget {
    pub fn new(transform: Transform, parent_world: Mat4) -> Self {
        Self {
            transform,
            parent_world,
        }
    }

    pub fn root(transform: Transform) -> Self {
        Self::new(transform, Mat4::IDENTITY)
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.parent_world * self.transform.to_matrix()
    }

    pub fn origin(&self) -> Vec3 {
        self.world_matrix().w_axis.truncate()
    }

    pub fn world_rotation(&self) -> Quat {
        Transform::from_matrix(&self.parent_world).rotation * self.transform.rotation
    }
}

/// A finished drag: the target's local transform before and after
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoEdit {
    pub axis: GizmoAxis,
    pub start: Transform,
    pub end: Transform,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    axis: GizmoAxis,
    mode: GizmoMode,
    target: GizmoTarget,
    origin: Vec3,
    /// World direction of the active axis, or the camera-facing plane
    /// normal for the center handle
    direction: Vec3,
    start_point: Vec3,
    current: Transform,
}

/// Translate/rotate/scale manipulator
pub struct Gizmo {
    pub mode: GizmoMode,
    pub space: GizmoSpace,
    pub snap: SnapSettings,
    /// Handle length in world units
    pub size: f32,
    hovered: Option<GizmoAxis>,
    drag: Option<DragState>,
    on_changed: Option<Box<dyn FnMut(&Transform)>>,
}

impl Default for Gizmo {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Gizmo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gizmo")
            .field("mode", &self.mode)
            .field("space", &self.space)
            .field("size", &self.size)
            .field("hovered", &self.hovered)
            .field("active", &self.active_axis())
            .finish_non_exhaustive()
    }
}

impl Gizmo {
    pub fn new() -> Self {
        Self {
            mode: GizmoMode::Translate,
            space: GizmoSpace::World,
            snap: SnapSettings::default(),
            size: 1.0,
            hovered: None,
            drag: None,
            on_changed: None,
        }
    }

    /// Called with the new local transform on every drag update
    pub fn set_on_changed(&mut self, callback: impl FnMut(&Transform) + 'static) {
        self.on_changed = Some(Box::new(callback));
    }

    pub fn set_mode(&mut self, mode: GizmoMode) {
        if self.drag.is_none() {
            self.mode = mode;
        }
    }

    pub fn hovered_axis(&self) -> Option<GizmoAxis> {
        self.hovered
    }

    pub fn active_axis(&self) -> Option<GizmoAxis> {
        self.drag.as_ref().map(|d| d.axis)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// World-space handle directions for a target
    pub fn basis(&self, target: &GizmoTarget) -> [Vec3; 3] {
        match self.space {
            GizmoSpace::World => [Vec3::X, Vec3::Y, Vec3::Z],
            GizmoSpace::Local => {
                let r = target.world_rotation();
                [r * Vec3::X, r * Vec3::Y, r * Vec3::Z]
            }
        }
    }

    fn frame_rotation(&self, target: &GizmoTarget) -> Quat {
        match self.space {
            GizmoSpace::World => Quat::IDENTITY,
            GizmoSpace::Local => target.world_rotation(),
        }
    }

    /// Handle under the ray: the center handle first, then the closest axis
    pub fn hit_test(&self, ray: &Ray, target: &GizmoTarget) -> Option<GizmoAxis> {
        let inv = self.frame_rotation(target).inverse();
        let local = Ray::new(inv * (ray.origin - target.origin()), inv * ray.direction);
        let size = self.size.max(1e-4);
        let thickness = size * AXIS_THICKNESS;

        if self.mode == GizmoMode::Rotate {
            let mut best: Option<(GizmoAxis, f32)> = None;
            for axis in GizmoAxis::AXES {
                let normal = unit(axis);
                let Some(hit) = ray_plane_intersect(&local, Vec3::ZERO, normal) else {
                    continue;
                };
                if (hit.length() - size).abs() <= thickness * 2.0 {
                    let t = hit.distance(local.origin);
                    if best.map_or(true, |(_, d)| t < d) {
                        best = Some((axis, t));
                    }
                }
            }
            return best.map(|(a, _)| a);
        }

        let center = Aabb::from_center_half(Vec3::ZERO, Vec3::splat(size * CENTER_HANDLE));
        if center.intersect_ray(&local).is_some() {
            return Some(GizmoAxis::Xyz);
        }

        let mut best: Option<(GizmoAxis, f32)> = None;
        for axis in GizmoAxis::AXES {
            let dir = unit(axis);
            let half = Vec3::splat(thickness) + dir * (size * 0.5 - thickness);
            let bounds = Aabb::from_center_half(dir * size * 0.5, half);
            if let Some(t) = bounds.intersect_ray(&local) {
                if best.map_or(true, |(_, d)| t < d) {
                    best = Some((axis, t));
                }
            }
        }
        best.map(|(a, _)| a)
    }

    pub fn update_hover(&mut self, ray: &Ray, target: &GizmoTarget) {
        if self.drag.is_none() {
            self.hovered = self.hit_test(ray, target);
        }
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    /// Hit-test and start a drag on the handle under the ray
    pub fn begin_drag(&mut self, ray: &Ray, target: &GizmoTarget) -> bool {
        match self.hit_test(ray, target) {
            Some(axis) => self.begin_drag_on(axis, ray, target),
            None => false,
        }
    }

    /// Start a drag on a specific handle
    pub fn begin_drag_on(&mut self, axis: GizmoAxis, ray: &Ray, target: &GizmoTarget) -> bool {
        if axis == GizmoAxis::Xyz && self.mode == GizmoMode::Rotate {
            return false;
        }
        let origin = target.origin();
        let basis = self.basis(target);
        let direction = match axis.index() {
            Some(i) => basis[i],
            None => -ray.direction,
        };

        let start_point = match (self.mode, axis) {
            (GizmoMode::Rotate, _) => ray_plane_intersect(ray, origin, direction)
                .unwrap_or(origin + any_perpendicular(direction) * self.size),
            (_, GizmoAxis::Xyz) => ray_plane_intersect(ray, origin, direction).unwrap_or(origin),
            _ => closest_point_on_line(ray, origin, direction).unwrap_or(origin),
        };

        self.drag = Some(DragState {
            axis,
            mode: self.mode,
            target: *target,
            origin,
            direction,
            start_point,
            current: target.transform,
        });
        self.hovered = Some(axis);
        true
    }

    /// Update the drag with a new ray. Returns the target's new local
    /// transform.
    pub fn drag(&mut self, ray: &Ray) -> Option<Transform> {
        let state = self.drag?;
        let transform = match state.mode {
            GizmoMode::Translate => self.drag_translate(&state, ray),
            GizmoMode::Scale => self.drag_scale(&state, ray),
            GizmoMode::Rotate => self.drag_rotate(&state, ray),
        };
        if let Some(drag) = self.drag.as_mut() {
            drag.current = transform;
        }
        if let Some(callback) = self.on_changed.as_mut() {
            callback(&transform);
        }
        Some(transform)
    }

    fn current_point(&self, state: &DragState, ray: &Ray) -> Vec3 {
        let hit = match (state.mode, state.axis) {
            (GizmoMode::Rotate, _) | (_, GizmoAxis::Xyz) => {
                ray_plane_intersect(ray, state.origin, state.direction)
            }
            _ => closest_point_on_line(ray, state.origin, state.direction),
        };
        hit.unwrap_or(state.start_point)
    }

    fn drag_translate(&self, state: &DragState, ray: &Ray) -> Transform {
        let delta = self.current_point(state, ray) - state.start_point;
        let world_delta = match state.axis {
            GizmoAxis::Xyz => {
                if self.snap.enabled {
                    Vec3::new(
                        snap(delta.x, self.snap.translate),
                        snap(delta.y, self.snap.translate),
                        snap(delta.z, self.snap.translate),
                    )
                } else {
                    delta
                }
            }
            _ => {
                let mut d = delta.dot(state.direction);
                if self.snap.enabled {
                    d = snap(d, self.snap.translate);
                }
                state.direction * d
            }
        };

        let target = &state.target;
        let world_start = target.origin();
        let parent_inverse = target.parent_world.inverse();
        let mut out = target.transform;
        out.position = parent_inverse.transform_point3(world_start + world_delta);
        out
    }

    fn drag_scale(&self, state: &DragState, ray: &Ray) -> Transform {
        let current = self.current_point(state, ray);
        let start = state.target.transform.scale;
        let mut scale = match state.axis.index() {
            Some(i) => {
                let percent = (current - state.start_point).dot(state.direction)
                    / self.size.max(1e-4)
                    * 100.0;
                let mut s = start;
                s[i] = start[i] * (1.0 + percent * SCALE_RATE);
                s
            }
            None => {
                let from = state.start_point.distance(state.origin);
                let ratio = if from > 1e-6 {
                    current.distance(state.origin) / from
                } else {
                    1.0
                };
                start * ratio
            }
        };
        if self.snap.enabled {
            scale = Vec3::new(
                snap(scale.x, self.snap.scale),
                snap(scale.y, self.snap.scale),
                snap(scale.z, self.snap.scale),
            );
        }
        let mut out = state.target.transform;
        out.scale = scale.max(Vec3::splat(MIN_SCALE));
        out
    }

    fn drag_rotate(&self, state: &DragState, ray: &Ray) -> Transform {
        let current = self.current_point(state, ray);
        let v0 = state.start_point - state.origin;
        let v1 = current - state.origin;
        let cross = v0.cross(v1);
        let mut angle = cross.length().atan2(v0.dot(v1));
        if cross.dot(state.direction) < 0.0 {
            angle = -angle;
        }
        if self.snap.enabled {
            angle = snap(angle.to_degrees(), self.snap.rotate).to_radians();
        }

        let delta = quat_from_axis_angle(state.direction, angle);
        let target = &state.target;
        let parent_rotation = Transform::from_matrix(&target.parent_world).rotation;
        let world = delta * parent_rotation * target.transform.rotation;
        let mut out = target.transform;
        out.rotation = (parent_rotation.inverse() * world).normalize();
        out
    }

    /// Finish the drag. Returns the edit if a drag was in progress.
    pub fn end_drag(&mut self) -> Option<GizmoEdit> {
        let state = self.drag.take()?;
        self.hovered = None;
        Some(GizmoEdit {
            axis: state.axis,
            start: state.target.transform,
            end: state.current,
        })
    }

    /// Abort the drag, returning the transform to restore
    pub fn cancel_drag(&mut self) -> Option<Transform> {
        let state = self.drag.take()?;
        self.hovered = None;
        Some(state.target.transform)
    }

    /// Line segments drawing the gizmo for a target
    pub fn lines(&self, target: &GizmoTarget) -> Vec<GizmoLine> {
        let origin = target.origin();
        let basis = self.basis(target);
        let size = self.size;
        let active = self.active_axis();
        let mut lines = Vec::new();

        let color_for = |axis: GizmoAxis| -> Color {
            if active == Some(axis) || (active.is_none() && self.hovered == Some(axis)) {
                HIGHLIGHT
            } else if active.is_some() {
                axis.color().scaled(DIM)
            } else {
                axis.color()
            }
        };

        for axis in GizmoAxis::AXES {
            let Some(i) = axis.index() else { continue };
            let dir = basis[i];
            let color = color_for(axis);
            match self.mode {
                GizmoMode::Rotate => {
                    let u = basis[(i + 1) % 3] * size;
                    let v = basis[(i + 2) % 3] * size;
                    let point = |k: usize| {
                        let a = k as f32 / RING_SEGMENTS as f32 * TAU;
                        origin + u * a.cos() + v * a.sin()
                    };
                    for k in 0..RING_SEGMENTS {
                        lines.push(GizmoLine::new(point(k), point(k + 1), color));
                    }
                }
                GizmoMode::Translate => {
                    let tip = origin + dir * size;
                    lines.push(GizmoLine::new(origin, tip, color));
                    let side = basis[(i + 1) % 3] * size * 0.06;
                    let back = tip - dir * size * 0.15;
                    lines.push(GizmoLine::new(tip, back + side, color));
                    lines.push(GizmoLine::new(tip, back - side, color));
                }
                GizmoMode::Scale => {
                    let tip = origin + dir * size;
                    lines.push(GizmoLine::new(origin, tip, color));
                    let u = basis[(i + 1) % 3] * size * 0.05;
                    let v = basis[(i + 2) % 3] * size * 0.05;
                    let corners = [tip + u + v, tip - u + v, tip - u - v, tip + u - v];
                    for k in 0..4 {
                        lines.push(GizmoLine::new(corners[k], corners[(k + 1) % 4], color));
                    }
                }
            }
        }

        if self.mode != GizmoMode::Rotate {
            let color = color_for(GizmoAxis::Xyz);
            let h = size * CENTER_HANDLE;
            for dir in basis {
                lines.push(GizmoLine::new(origin - dir * h, origin + dir * h, color));
            }
        }
        lines
    }
}

fn unit(axis: GizmoAxis) -> Vec3 {
    match axis {
        GizmoAxis::X => Vec3::X,
        GizmoAxis::Y => Vec3::Y,
        GizmoAxis::Z => Vec3::Z,
        GizmoAxis::Xyz => Vec3::ONE.normalize(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::f32::consts::FRAC_PI_2;
    use std::rc::Rc;

    fn down_at(x: f32, y: f32) -> Ray {
        Ray::new(Vec3::new(x, 10.0, y), -Vec3::Y)
    }

    #[test]
    fn center_handle_wins() {
        let gizmo = Gizmo::new();
        let target = GizmoTarget::root(Transform::IDENTITY);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
        assert_eq!(gizmo.hit_test(&ray, &target), Some(GizmoAxis::Xyz));
    }

    #[test]
    fn axis_handles() {
        let gizmo = Gizmo::new();
        let target = GizmoTarget::root(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        // Down onto the X arm
        assert_eq!(gizmo.hit_test(&down_at(1.7, 0.0), &target), Some(GizmoAxis::X));
        // Down onto the Z arm
        assert_eq!(gizmo.hit_test(&down_at(1.0, 0.7), &target), Some(GizmoAxis::Z));
        assert_eq!(gizmo.hit_test(&down_at(3.0, 3.0), &target), None);
    }

    #[test]
    fn local_space_rotates_handles() {
        let mut gizmo = Gizmo::new();
        gizmo.space = GizmoSpace::Local;
        let target = GizmoTarget::root(Transform::IDENTITY.with_rotation(Quat::from_rotation_y(FRAC_PI_2)));
        // Local X now points along world -Z
        assert_eq!(gizmo.hit_test(&down_at(0.0, -0.7), &target), Some(GizmoAxis::X));
    }

    #[test]
    fn translate_along_axis() {
        let mut gizmo = Gizmo::new();
        let target = GizmoTarget::root(Transform::IDENTITY);
        assert!(gizmo.begin_drag(&down_at(0.6, 0.0), &target));
        assert_eq!(gizmo.active_axis(), Some(GizmoAxis::X));
        let moved = gizmo.drag(&down_at(2.1, 0.4)).unwrap();
        assert!(moved.position.abs_diff_eq(Vec3::new(1.5, 0.0, 0.0), 1e-5));

        let edit = gizmo.end_drag().unwrap();
        assert_eq!(edit.start, Transform::IDENTITY);
        assert!(edit.end.position.abs_diff_eq(Vec3::new(1.5, 0.0, 0.0), 1e-5));
        assert!(gizmo.active_axis().is_none());
        assert!(gizmo.end_drag().is_none());
    }

    #[test]
    fn translate_snaps_magnitude() {
        let mut gizmo = Gizmo::new();
        gizmo.snap.enabled = true;
        let target = GizmoTarget::root(Transform::IDENTITY);
        gizmo.begin_drag_on(GizmoAxis::X, &down_at(0.5, 0.0), &target);
        let moved = gizmo.drag(&down_at(1.2, 0.0)).unwrap();
        assert!(moved.position.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn translate_child_in_parent_space() {
        let mut gizmo = Gizmo::new();
        let parent = Mat4::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, Vec3::new(0.0, 0.0, 4.0));
        let target = GizmoTarget::new(Transform::IDENTITY, parent);
        gizmo.begin_drag_on(GizmoAxis::X, &down_at(0.5, 4.0), &target);
        let moved = gizmo.drag(&down_at(2.5, 4.0)).unwrap();
        // Two world units along X is one unit in the scaled parent
        assert!(moved.position.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn scale_per_axis() {
        let mut gizmo = Gizmo::new();
        gizmo.mode = GizmoMode::Scale;
        gizmo.size = 2.0;
        let target = GizmoTarget::root(Transform::IDENTITY.with_scale(Vec3::new(2.0, 1.0, 1.0)));
        gizmo.begin_drag_on(GizmoAxis::X, &down_at(1.0, 0.0), &target);
        // Half a handle length is 50 percent
        let scaled = gizmo.drag(&down_at(2.0, 0.0)).unwrap();
        assert!(scaled.scale.abs_diff_eq(Vec3::new(3.0, 1.0, 1.0), 1e-4));
    }

    #[test]
    fn uniform_scale_by_distance_ratio() {
        let mut gizmo = Gizmo::new();
        gizmo.mode = GizmoMode::Scale;
        let target = GizmoTarget::root(Transform::IDENTITY);
        // Camera-facing plane through the origin is y = 0 for downward rays
        gizmo.begin_drag_on(GizmoAxis::Xyz, &down_at(1.0, 0.0), &target);
        let scaled = gizmo.drag(&down_at(2.0, 0.0)).unwrap();
        assert!(scaled.scale.abs_diff_eq(Vec3::splat(2.0), 1e-4));
    }

    #[test]
    fn rotate_quarter_turn() {
        let mut gizmo = Gizmo::new();
        gizmo.mode = GizmoMode::Rotate;
        let target = GizmoTarget::root(Transform::IDENTITY);
        // Ring around Y lies in the y = 0 plane
        assert_eq!(gizmo.hit_test(&down_at(0.0, 1.0), &target), Some(GizmoAxis::Y));
        assert!(gizmo.begin_drag(&down_at(0.0, 1.0), &target));
        // +Z to +X is a positive turn about +Y
        let rotated = gizmo.drag(&down_at(1.0, 0.0)).unwrap();
        let expected = Quat::from_rotation_y(FRAC_PI_2);
        assert!(rotated.rotation.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn rotate_snaps_degrees() {
        let mut gizmo = Gizmo::new();
        gizmo.mode = GizmoMode::Rotate;
        gizmo.snap.enabled = true;
        let target = GizmoTarget::root(Transform::IDENTITY);
        gizmo.begin_drag_on(GizmoAxis::Y, &down_at(0.0, 1.0), &target);
        let a = 20f32.to_radians();
        let rotated = gizmo.drag(&down_at(a.sin(), a.cos())).unwrap();
        assert!(rotated.rotation.abs_diff_eq(Quat::from_rotation_y(15f32.to_radians()), 1e-4));
    }

    #[test]
    fn cancel_restores_start_and_callback_fires() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut gizmo = Gizmo::new();
        gizmo.set_on_changed(move |_| seen.set(seen.get() + 1));
        let start = Transform::from_position(Vec3::new(0.0, 0.0, 0.0));
        let target = GizmoTarget::root(start);
        gizmo.begin_drag_on(GizmoAxis::X, &down_at(0.5, 0.0), &target);
        gizmo.drag(&down_at(1.0, 0.0));
        gizmo.drag(&down_at(1.5, 0.0));
        assert_eq!(calls.get(), 2);
        assert_eq!(gizmo.cancel_drag(), Some(start));
        assert!(!gizmo.is_dragging());
    }

    #[test]
    fn lines_highlight_hover() {
        let mut gizmo = Gizmo::new();
        let target = GizmoTarget::root(Transform::IDENTITY);
        let lines = gizmo.lines(&target);
        assert_eq!(lines.len(), 3 * 3 + 3);
        assert!(lines.iter().all(|l| l.color != HIGHLIGHT));

        gizmo.update_hover(&down_at(0.7, 0.0), &target);
        assert_eq!(gizmo.hovered_axis(), Some(GizmoAxis::X));
        let lines = gizmo.lines(&target);
        assert_eq!(lines[0].color, HIGHLIGHT);

        gizmo.mode = GizmoMode::Rotate;
        assert_eq!(gizmo.lines(&target).len(), 3 * RING_SEGMENTS);
    }
}
