//! Kiln Scene - Scene graph and scene documents
//!
//! A [`SceneGraph`] owns every [`Entity`] and keeps the parent relation
//! acyclic. Scenes are saved as versioned, pretty-printed JSON documents;
//! model files are referenced by path and rehydrated through a
//! [`ModelLoader`] when a document is loaded.

mod entity;
mod format;
mod graph;
mod model_loader;
mod serializer;

pub use entity::Entity;
pub use format::{CameraDef, EntityDef, SceneDocument, TransformDef, CURRENT_VERSION};
pub use graph::{SceneGraph, SceneSummary};
pub use model_loader::{ModelAsset, ModelLoader, NoModels, PlaceholderLoader};
pub use serializer::{
    document_to_scene, load_scene, load_scene_from_path, load_scene_from_str, parse_document,
    save_scene, save_scene_to_path, save_scene_to_string, scene_to_document, LoadReport,
};
