//! Orbit camera: yaw/pitch/distance around a scene-relative target

use kiln_core::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6, PI};

/// Pitch stays this far from straight up or down
pub const PITCH_MARGIN: f32 = 0.01;

/// Eye distance per unit of scene radius at distance multiplier 1
pub const RADIUS_TO_DISTANCE: f32 = 2.5;

/// Everything needed to restore a view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraState {
    /// Radians around the vertical axis
    pub yaw: f32,
    /// Radians above the horizon
    pub pitch: f32,
    /// Multiplier on the scene-radius-derived eye distance
    pub distance: f32,
    pub target_offset: Vec3,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            yaw: FRAC_PI_4,
            pitch: FRAC_PI_6,
            distance: 1.0,
            target_offset: Vec3::ZERO,
        }
    }
}

/// Fixed viewing angles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewPreset {
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
    Perspective,
}

impl ViewPreset {
    pub const ALL: [ViewPreset; 7] = [
        ViewPreset::Front,
        ViewPreset::Back,
        ViewPreset::Left,
        ViewPreset::Right,
        ViewPreset::Top,
        ViewPreset::Bottom,
        ViewPreset::Perspective,
    ];

    /// (yaw, pitch) in radians
    pub fn angles(self) -> (f32, f32) {
        let vertical = FRAC_PI_2 - PITCH_MARGIN;
        match self {
            ViewPreset::Front => (0.0, 0.0),
            ViewPreset::Back => (PI, 0.0),
            ViewPreset::Left => (-FRAC_PI_2, 0.0),
            ViewPreset::Right => (FRAC_PI_2, 0.0),
            ViewPreset::Top => (0.0, vertical),
            ViewPreset::Bottom => (0.0, -vertical),
            ViewPreset::Perspective => (FRAC_PI_4, FRAC_PI_6),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ViewPreset::Front => "Front",
            ViewPreset::Back => "Back",
            ViewPreset::Left => "Left",
            ViewPreset::Right => "Right",
            ViewPreset::Top => "Top",
            ViewPreset::Bottom => "Bottom",
            ViewPreset::Perspective => "Perspective",
        }
    }
}

/// Resolved camera handed to the renderer each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraParams {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }
}

/// Orbit camera with distance limits and named bookmarks
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub state: CameraState,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    bookmarks: BTreeMap<String, CameraState>,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(0.1, 10.0)
    }
}

impl OrbitCamera {
    pub fn new(min_distance: f32, max_distance: f32) -> Self {
        let min_distance = min_distance.max(1e-4);
        Self {
            state: CameraState::default(),
            min_distance,
            max_distance: max_distance.max(min_distance),
            fov: 45.0,
            bookmarks: BTreeMap::new(),
        }
    }

    fn pitch_limit() -> f32 {
        FRAC_PI_2 - PITCH_MARGIN
    }

    /// Apply a state, clamping pitch and distance into range
    pub fn set_state(&mut self, state: CameraState) {
        self.state = state;
        self.clamp();
    }

    fn clamp(&mut self) {
        let limit = Self::pitch_limit();
        self.state.pitch = self.state.pitch.clamp(-limit, limit);
        self.state.distance = self.state.distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.state.yaw += delta_yaw;
        self.state.pitch += delta_pitch;
        self.clamp();
    }

    /// Move the target along the view plane. Offsets are scaled by the eye
    /// distance so panning feels the same at any zoom.
    pub fn pan(&mut self, dx: f32, dy: f32, scene_radius: f32) {
        let (right, up) = self.view_axes();
        let scale = self.state.distance * scene_radius.max(1e-3);
        self.state.target_offset += (right * dx + up * dy) * scale;
    }

    pub fn zoom(&mut self, delta: f32) {
        self.state.distance -= delta;
        self.clamp();
    }

    pub fn reset(&mut self) {
        self.state = CameraState::default();
        self.clamp();
    }

    pub fn apply_preset(&mut self, preset: ViewPreset) {
        let (yaw, pitch) = preset.angles();
        self.state.yaw = yaw;
        self.state.pitch = pitch;
        self.clamp();
    }

    pub fn save_bookmark(&mut self, name: impl Into<String>) {
        self.bookmarks.insert(name.into(), self.state);
    }

    pub fn load_bookmark(&mut self, name: &str) -> bool {
        match self.bookmarks.get(name).copied() {
            Some(state) => {
                self.set_state(state);
                true
            }
            None => false,
        }
    }

    pub fn remove_bookmark(&mut self, name: &str) -> bool {
        self.bookmarks.remove(name).is_some()
    }

    pub fn bookmarks(&self) -> impl Iterator<Item = (&str, &CameraState)> {
        self.bookmarks.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Unit vector from target to eye
    pub fn direction(&self) -> Vec3 {
        let (yaw, pitch) = (self.state.yaw, self.state.pitch);
        Vec3::new(yaw.sin() * pitch.cos(), pitch.sin(), yaw.cos() * pitch.cos())
    }

    /// Camera right and up vectors
    pub fn view_axes(&self) -> (Vec3, Vec3) {
        let back = self.direction();
        let right = Vec3::Y.cross(back).normalize_or_zero();
        let right = if right == Vec3::ZERO { Vec3::X } else { right };
        let up = back.cross(right).normalize_or_zero();
        (right, up)
    }

    pub fn target(&self, scene_center: Vec3) -> Vec3 {
        scene_center + self.state.target_offset
    }

    pub fn eye(&self, scene_center: Vec3, scene_radius: f32) -> Vec3 {
        self.target(scene_center)
            + self.direction() * (scene_radius * RADIUS_TO_DISTANCE * self.state.distance)
    }

    /// Camera parameters for a scene of the given bounds
    pub fn params(&self, scene_center: Vec3, scene_radius: f32, aspect: f32) -> CameraParams {
        let radius = scene_radius.max(1e-3);
        let eye_distance = radius * RADIUS_TO_DISTANCE * self.state.distance;
        CameraParams {
            eye: self.eye(scene_center, radius),
            target: self.target(scene_center),
            up: Vec3::Y,
            fov_y: self.fov.to_radians(),
            aspect: if aspect > 0.0 { aspect } else { 1.0 },
            near: (eye_distance * 0.01).max(1e-3),
            far: eye_distance + radius * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_formula() {
        let mut camera = OrbitCamera::default();
        camera.set_state(CameraState {
            yaw: 0.0,
            pitch: 0.0,
            distance: 2.0,
            target_offset: Vec3::new(1.0, 0.0, 0.0),
        });
        let eye = camera.eye(Vec3::new(0.0, 1.0, 0.0), 2.0);
        // target (1, 1, 0), direction +Z, 2 * 2.5 * 2 = 10
        assert!(eye.abs_diff_eq(Vec3::new(1.0, 1.0, 10.0), 1e-5));
    }

    #[test]
    fn pitch_and_distance_clamped() {
        let mut camera = OrbitCamera::new(0.5, 3.0);
        camera.orbit(0.0, 10.0);
        assert!(camera.state.pitch < FRAC_PI_2);
        assert!((camera.state.pitch - (FRAC_PI_2 - PITCH_MARGIN)).abs() < 1e-6);
        camera.zoom(100.0);
        assert_eq!(camera.state.distance, 0.5);
        camera.zoom(-100.0);
        assert_eq!(camera.state.distance, 3.0);
    }

    #[test]
    fn presets() {
        let mut camera = OrbitCamera::default();
        camera.apply_preset(ViewPreset::Right);
        assert!(camera.direction().abs_diff_eq(Vec3::X, 1e-5));
        camera.apply_preset(ViewPreset::Top);
        assert!(camera.direction().y > 0.99);
        camera.apply_preset(ViewPreset::Back);
        assert!(camera.direction().abs_diff_eq(-Vec3::Z, 1e-5));
    }

    #[test]
    fn bookmarks_round_trip_state() {
        let mut camera = OrbitCamera::default();
        camera.orbit(0.3, 0.2);
        camera.pan(0.5, 0.0, 1.0);
        camera.save_bookmark("hero");
        let saved = camera.state;
        camera.reset();
        assert_ne!(camera.state, saved);
        assert!(camera.load_bookmark("hero"));
        assert_eq!(camera.state, saved);
        assert!(!camera.load_bookmark("missing"));
        assert_eq!(camera.bookmarks().count(), 1);
    }

    #[test]
    fn pan_moves_along_view_plane() {
        let mut camera = OrbitCamera::default();
        camera.apply_preset(ViewPreset::Front);
        camera.pan(1.0, 0.0, 2.0);
        assert!(camera.state.target_offset.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
        camera.pan(0.0, 1.0, 2.0);
        assert!(camera.state.target_offset.abs_diff_eq(Vec3::new(2.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn params_look_at_target() {
        let camera = OrbitCamera::default();
        let params = camera.params(Vec3::ZERO, 1.0, 16.0 / 9.0);
        let view = params.view_matrix();
        let target_view = view.transform_point3(params.target);
        assert!(target_view.x.abs() < 1e-4 && target_view.y.abs() < 1e-4);
        assert!(target_view.z < 0.0);
        assert!(params.near > 0.0 && params.far > params.near);
    }
}
