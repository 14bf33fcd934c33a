//! Viewport state and mouse-driven camera navigation

use crate::config::CameraConfig;
use crate::input::{Modifiers, MouseButton};
use kiln_core::{Vec2, Vec3};
use kiln_render::{CameraParams, OrbitCamera, ViewPreset};

/// Which camera motion an Alt-drag is performing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Orbit,
    Pan,
    Zoom,
}

impl Navigation {
    fn for_button(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Navigation::Orbit,
            MouseButton::Middle => Navigation::Pan,
            MouseButton::Right => Navigation::Zoom,
        }
    }
}

/// The 3D view: window size, orbit camera and overlay toggles
#[derive(Debug)]
pub struct Viewport {
    pub camera: OrbitCamera,
    sensitivity: CameraConfig,
    width: u32,
    height: u32,
    scene_center: Vec3,
    scene_radius: f32,
    navigation: Option<(MouseButton, Navigation)>,
    last_mouse: (f32, f32),
    pub show_grid: bool,
    pub show_help: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&CameraConfig::default(), 1280, 720)
    }
}

impl Viewport {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = OrbitCamera::new(config.min_distance, config.max_distance);
        camera.fov = config.fov;
        camera.reset();
        Self {
            camera,
            sensitivity: config.clone(),
            width: width.max(1),
            height: height.max(1),
            scene_center: Vec3::ZERO,
            scene_radius: 1.0,
            navigation: None,
            last_mouse: (0.0, 0.0),
            show_grid: true,
            show_help: false,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Frame the camera around these bounds from now on
    pub fn set_scene_bounds(&mut self, center: Vec3, radius: f32) {
        self.scene_center = center;
        self.scene_radius = radius.max(1e-3);
    }

    pub fn scene_center(&self) -> Vec3 {
        self.scene_center
    }

    pub fn scene_radius(&self) -> f32 {
        self.scene_radius
    }

    pub fn camera_params(&self) -> CameraParams {
        self.camera.params(self.scene_center, self.scene_radius, self.aspect())
    }

    pub fn navigation(&self) -> Option<Navigation> {
        self.navigation.map(|(_, nav)| nav)
    }

    pub fn is_navigating(&self) -> bool {
        self.navigation.is_some()
    }

    /// Start a camera drag when Alt is held. Returns true if the press was
    /// consumed by navigation.
    pub fn mouse_down(&mut self, button: MouseButton, x: f32, y: f32, modifiers: Modifiers) -> bool {
        self.last_mouse = (x, y);
        if !modifiers.contains(Modifiers::ALT) {
            return false;
        }
        self.navigation = Some((button, Navigation::for_button(button)));
        true
    }

    /// Apply the motion since the last event. Returns true while navigating.
    pub fn mouse_move(&mut self, x: f32, y: f32) -> bool {
        let (dx, dy) = (x - self.last_mouse.0, y - self.last_mouse.1);
        self.last_mouse = (x, y);
        let Some((_, nav)) = self.navigation else {
            return false;
        };
        let s = &self.sensitivity;
        match nav {
            Navigation::Orbit => self.camera.orbit(-dx * s.orbit_sensitivity, dy * s.orbit_sensitivity),
            Navigation::Pan => {
                self.camera
                    .pan(-dx * s.pan_sensitivity, dy * s.pan_sensitivity, self.scene_radius)
            }
            Navigation::Zoom => self.camera.zoom(-dy * s.zoom_sensitivity),
        }
        true
    }

    /// Returns true if this release ended a camera drag
    pub fn mouse_up(&mut self, button: MouseButton) -> bool {
        match self.navigation {
            Some((held, _)) if held == button => {
                self.navigation = None;
                true
            }
            _ => false,
        }
    }

    /// The wheel always zooms; positive deltas move closer
    pub fn wheel(&mut self, delta: f32) {
        self.camera.zoom(delta * self.sensitivity.wheel_sensitivity);
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset();
    }

    pub fn apply_preset(&mut self, preset: ViewPreset) {
        self.camera.apply_preset(preset);
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.show_grid = !self.show_grid;
        self.show_grid
    }

    pub fn toggle_help(&mut self) -> bool {
        self.show_help = !self.show_help;
        self.show_help
    }
}
