//! The interface the editor core drives a GPU backend through

use crate::camera::CameraParams;
use crate::model::{MeshData, MeshHandle, Model};
use kiln_core::math::invert_mat4;
use kiln_core::{Color, Mat4, Vec3};
use std::collections::{HashMap, HashSet};

/// Platform window identifier handed to the backend at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub u64);

/// A colored world-space line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoLine {
    pub start: Vec3,
    pub end: Vec3,
    pub color: Color,
}

impl GizmoLine {
    pub fn new(start: Vec3, end: Vec3, color: Color) -> Self {
        Self { start, end, color }
    }
}

/// A GPU backend. Every method is called from the editor thread.
pub trait Renderer {
    fn initialize(&mut self, window: WindowHandle, width: u32, height: u32) -> bool;
    fn shutdown(&mut self);
    fn resize(&mut self, width: u32, height: u32);

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle;

    /// Start loading a model file. Fills `out` with meshes and bounds when
    /// the geometry is available; textures may keep streaming in through
    /// [`Renderer::process_async_textures`].
    fn load_model_async(&mut self, path: &str, out: &mut Model) -> bool;
    fn process_async_textures(&mut self);

    fn begin_frame(&mut self);
    fn end_frame(&mut self);

    fn set_camera(&mut self, params: &CameraParams, scene_radius: f32);

    fn render_model(&mut self, model: &Model, world: &Mat4);
    /// `bones` holds one skinning matrix per bone, at most 128
    fn render_skinned_model(&mut self, model: &Model, world: &Mat4, bones: &[Mat4]);
    fn render_model_outline(&mut self, model: &Model, world: &Mat4, color: Color);
    fn render_gizmo_lines(&mut self, lines: &[GizmoLine]);

    fn render_grid(&mut self, _spacing: f32, _extent: f32) {}

    fn begin_shadow_pass(&mut self, radius: f32, center: Vec3);
    fn render_model_shadow(&mut self, model: &Model, world: &Mat4);
    fn end_shadow_pass(&mut self);

    fn set_post_process_enabled(&mut self, enabled: bool);
    fn set_post_process_params(&mut self, constants: &[u8]);

    /// Inverse of the current view-projection matrix, used for picking
    fn view_projection_inverse(&self) -> Mat4;

    /// Most recent shader compile error, if any
    fn last_error(&self) -> Option<&str>;
    fn set_shader_hot_reload(&mut self, enabled: bool);
}

/// One recorded [`Renderer`] call
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Initialize { width: u32, height: u32 },
    Shutdown,
    Resize { width: u32, height: u32 },
    UploadMesh { handle: MeshHandle, vertices: usize },
    LoadModel { path: String, ok: bool },
    BeginFrame,
    EndFrame,
    SetCamera { eye: Vec3, target: Vec3, scene_radius: f32 },
    Model { path: String, world: Mat4 },
    SkinnedModel { path: String, world: Mat4, bones: usize },
    Outline { path: String },
    GizmoLines { count: usize },
    Grid,
    BeginShadowPass { radius: f32, center: Vec3 },
    ModelShadow { path: String },
    EndShadowPass,
    PostProcessEnabled(bool),
    PostProcessParams { bytes: usize },
}

/// Headless renderer that records every call instead of drawing.
///
/// Model loads succeed for any non-empty path with unit bounds unless the
/// path was registered with [`RecordingRenderer::register_model`] or marked
/// failing with [`RecordingRenderer::fail_path`].
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    calls: Vec<RenderCall>,
    width: u32,
    height: u32,
    initialized: bool,
    in_frame: bool,
    frames: u64,
    next_mesh: u32,
    view_projection: Mat4,
    models: HashMap<String, Model>,
    failing: HashSet<String>,
    last_error: Option<String>,
    hot_reload: bool,
    post_process: bool,
    post_process_bytes: Vec<u8>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            view_projection: Mat4::IDENTITY,
            ..Default::default()
        }
    }

    pub fn register_model(&mut self, model: Model) {
        self.models.insert(model.path.clone(), model);
    }

    pub fn fail_path(&mut self, path: impl Into<String>) {
        self.failing.insert(path.into());
    }

    /// Simulate a shader compile failure reported by the backend
    pub fn set_error(&mut self, error: Option<String>) {
        if let Some(e) = &error {
            log::error!("Shader error: {}", e);
        }
        self.last_error = error;
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn hot_reload_enabled(&self) -> bool {
        self.hot_reload
    }

    pub fn post_process_enabled(&self) -> bool {
        self.post_process
    }

    /// Last constant block passed to `set_post_process_params`
    pub fn post_process_bytes(&self) -> &[u8] {
        &self.post_process_bytes
    }

    /// Number of model draws (static and skinned) recorded
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::Model { .. } | RenderCall::SkinnedModel { .. }))
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn initialize(&mut self, _window: WindowHandle, width: u32, height: u32) -> bool {
        self.width = width.max(1);
        self.height = height.max(1);
        self.initialized = true;
        self.calls.push(RenderCall::Initialize { width, height });
        true
    }

    fn shutdown(&mut self) {
        self.initialized = false;
        self.calls.push(RenderCall::Shutdown);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.calls.push(RenderCall::Resize { width, height });
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        self.next_mesh += 1;
        let handle = MeshHandle(self.next_mesh);
        self.calls.push(RenderCall::UploadMesh {
            handle,
            vertices: mesh.vertex_count(),
        });
        handle
    }

    fn load_model_async(&mut self, path: &str, out: &mut Model) -> bool {
        let ok = !path.is_empty() && !self.failing.contains(path);
        if ok {
            *out = match self.models.get(path) {
                Some(model) => model.clone(),
                None => {
                    self.next_mesh += 1;
                    Model::new(path).with_mesh(MeshHandle(self.next_mesh))
                }
            };
        }
        self.calls.push(RenderCall::LoadModel {
            path: path.to_string(),
            ok,
        });
        ok
    }

    fn process_async_textures(&mut self) {}

    fn begin_frame(&mut self) {
        if self.in_frame {
            log::warn!("begin_frame called twice without end_frame");
        }
        self.in_frame = true;
        self.calls.push(RenderCall::BeginFrame);
    }

    fn end_frame(&mut self) {
        if self.in_frame {
            self.frames += 1;
        }
        self.in_frame = false;
        self.calls.push(RenderCall::EndFrame);
    }

    fn set_camera(&mut self, params: &CameraParams, scene_radius: f32) {
        self.view_projection = params.view_projection();
        self.calls.push(RenderCall::SetCamera {
            eye: params.eye,
            target: params.target,
            scene_radius,
        });
    }

    fn render_model(&mut self, model: &Model, world: &Mat4) {
        self.calls.push(RenderCall::Model {
            path: model.path.clone(),
            world: *world,
        });
    }

    fn render_skinned_model(&mut self, model: &Model, world: &Mat4, bones: &[Mat4]) {
        self.calls.push(RenderCall::SkinnedModel {
            path: model.path.clone(),
            world: *world,
            bones: bones.len(),
        });
    }

    fn render_model_outline(&mut self, model: &Model, _world: &Mat4, _color: Color) {
        self.calls.push(RenderCall::Outline {
            path: model.path.clone(),
        });
    }

    fn render_gizmo_lines(&mut self, lines: &[GizmoLine]) {
        self.calls.push(RenderCall::GizmoLines { count: lines.len() });
    }

    fn render_grid(&mut self, _spacing: f32, _extent: f32) {
        self.calls.push(RenderCall::Grid);
    }

    fn begin_shadow_pass(&mut self, radius: f32, center: Vec3) {
        self.calls.push(RenderCall::BeginShadowPass { radius, center });
    }

    fn render_model_shadow(&mut self, model: &Model, _world: &Mat4) {
        self.calls.push(RenderCall::ModelShadow {
            path: model.path.clone(),
        });
    }

    fn end_shadow_pass(&mut self) {
        self.calls.push(RenderCall::EndShadowPass);
    }

    fn set_post_process_enabled(&mut self, enabled: bool) {
        self.post_process = enabled;
        self.calls.push(RenderCall::PostProcessEnabled(enabled));
    }

    fn set_post_process_params(&mut self, constants: &[u8]) {
        self.post_process_bytes = constants.to_vec();
        self.calls.push(RenderCall::PostProcessParams {
            bytes: constants.len(),
        });
    }

    fn view_projection_inverse(&self) -> Mat4 {
        invert_mat4(&self.view_projection).unwrap_or(Mat4::IDENTITY)
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn set_shader_hot_reload(&mut self, enabled: bool) {
        self.hot_reload = enabled;
    }
}
