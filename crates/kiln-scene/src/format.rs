//! Scene document format definitions

use kiln_render::{CameraState, Light, Material, PostProcessSettings};
use serde::{Deserialize, Serialize};

/// Document version written by this build. Older versions load; newer
/// ones are rejected.
pub const CURRENT_VERSION: u32 = 2;

/// Root of a scene document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_process: Option<PostProcessSettings>,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

fn default_version() -> u32 {
    1
}

impl SceneDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: CURRENT_VERSION,
            name: name.into(),
            camera: None,
            post_process: None,
            entities: Vec::new(),
        }
    }

    /// Total entity count including nested children
    pub fn entity_count(&self) -> usize {
        fn count(defs: &[EntityDef]) -> usize {
            defs.iter().map(|d| 1 + count(&d.children)).sum()
        }
        count(&self.entities)
    }
}

/// Orbit camera state with the target offset split into scalar fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraDef {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target_offset_x: f32,
    pub target_offset_y: f32,
    pub target_offset_z: f32,
}

impl Default for CameraDef {
    fn default() -> Self {
        CameraState::default().into()
    }
}

impl From<CameraState> for CameraDef {
    fn from(state: CameraState) -> Self {
        Self {
            yaw: state.yaw,
            pitch: state.pitch,
            distance: state.distance,
            target_offset_x: state.target_offset.x,
            target_offset_y: state.target_offset.y,
            target_offset_z: state.target_offset.z,
        }
    }
}

impl From<CameraDef> for CameraState {
    fn from(def: CameraDef) -> Self {
        Self {
            yaw: def.yaw,
            pitch: def.pitch,
            distance: def.distance,
            target_offset: kiln_core::Vec3::new(
                def.target_offset_x,
                def.target_offset_y,
                def.target_offset_z,
            ),
        }
    }
}

/// Local TRS. Rotation is an `[x, y, z, w]` quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDef {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for TransformDef {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

/// One entity and, recursively, its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub transform: TransformDef,
    #[serde(default)]
    pub has_model: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model_path: String,
    #[serde(default)]
    pub has_skeleton: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<Light>,
    #[serde(default)]
    pub children: Vec<EntityDef>,
}

fn default_true() -> bool {
    true
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            enabled: true,
            transform: TransformDef::default(),
            has_model: false,
            model_path: String::new(),
            has_skeleton: false,
            animations: Vec::new(),
            material: None,
            light: None,
            children: Vec::new(),
        }
    }

    pub fn with_model(mut self, path: impl Into<String>) -> Self {
        self.has_model = true;
        self.model_path = path.into();
        self
    }

    pub fn with_child(mut self, child: EntityDef) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let doc: SceneDocument =
            serde_json::from_str(r#"{"entities":[{"name":"a","transform":{"position":[1,2,3]}}]}"#)
                .unwrap();
        assert_eq!(doc.version, 1);
        let a = &doc.entities[0];
        assert!(a.enabled);
        assert_eq!(a.transform.position, [1.0, 2.0, 3.0]);
        assert_eq!(a.transform.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(a.transform.scale, [1.0, 1.0, 1.0]);
        assert!(!a.has_model);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let doc: SceneDocument = serde_json::from_str(
            r#"{"version":2,"name":"s","editorTheme":"dark","entities":[{"name":"a","tags":["x"]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.name, "s");
        assert_eq!(doc.entity_count(), 1);
    }

    #[test]
    fn camel_case_keys() {
        let mut doc = SceneDocument::new("s");
        doc.camera = Some(CameraDef::default());
        doc.entities.push(EntityDef::new("a").with_model("a.glb").with_child(EntityDef::new("b")));
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"targetOffsetX\""));
        assert!(json.contains("\"hasModel\":true"));
        assert!(json.contains("\"modelPath\":\"a.glb\""));
        assert!(json.contains("\"hasSkeleton\":false"));
        assert_eq!(doc.entity_count(), 2);
    }
}
