//! Kiln Editor - The interactive core of the scene editor
//!
//! [`Editor`] ties the pieces together each frame: typed input events drive
//! the orbit [`Viewport`], mouse picking and the transform [`Gizmo`]; edits
//! go through the undoable [`CommandHistory`]; animation and world matrices
//! are updated; and the frame is handed to a [`Renderer`](kiln_render::Renderer).

mod assets;
pub mod command;
pub mod commands;
pub mod config;
mod editor;
pub mod gizmo;
pub mod input;
pub mod picking;
pub mod projection;
pub mod viewport;

pub use assets::{EditorModelLoader, ModelLibrary, ModelSource};
pub use command::{Command, CommandHistory, HistoryEvent};
pub use commands::{
    CreateEntityCommand, DeleteEntityCommand, DuplicateEntityCommand, RenameEntityCommand,
    SetEnabledCommand, SetParentCommand, TransformCommand,
};
pub use config::EditorConfig;
pub use editor::{Editor, FrameStats};
pub use gizmo::{Gizmo, GizmoAxis, GizmoEdit, GizmoMode, GizmoSpace, GizmoTarget, SnapSettings};
pub use input::{shortcut, EditorAction, InputEvent, InputState, Key, Modifiers, MouseButton};
pub use picking::{pick_at_screen, pick_entity, PickHit};
pub use viewport::{Navigation, Viewport};
