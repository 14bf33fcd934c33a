//! Kiln Render - The data the editor core exchanges with a GPU backend
//!
//! No GPU code lives here. The crate defines the [`Renderer`] interface a
//! backend implements, the orbit camera and its parameters, the packed
//! post-process constant block, and model/material/light descriptors.
//! [`RecordingRenderer`] is a headless implementation that logs every call.

pub mod camera;
pub mod model;
pub mod postprocess;
pub mod renderer;

pub use camera::{CameraParams, CameraState, OrbitCamera, ViewPreset};
pub use model::{Light, LightKind, Material, MeshData, MeshHandle, Model, Vertex};
pub use postprocess::{
    fill_post_process_constants, EffectFlags, PostProcessConstants, PostProcessSettings,
};
pub use renderer::{GizmoLine, RecordingRenderer, RenderCall, Renderer, WindowHandle};
