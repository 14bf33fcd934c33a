//! Scene saving and loading as pretty-printed JSON documents

use crate::entity::Entity;
use crate::format::{EntityDef, SceneDocument, TransformDef, CURRENT_VERSION};
use crate::graph::SceneGraph;
use crate::model_loader::{ModelAsset, ModelLoader};
use kiln_core::{EntityId, KilnError, Quat, Result, Transform, Vec3};
use kiln_render::{CameraState, Material, PostProcessSettings};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Outcome of a successful load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub version: u32,
    pub entity_count: usize,
    pub camera: Option<CameraState>,
    pub post_process: Option<PostProcessSettings>,
    /// Model paths the loader could not resolve
    pub failed_models: Vec<String>,
}

/// Convert a scene to its document form
pub fn scene_to_document(
    scene: &SceneGraph,
    camera: Option<&CameraState>,
    post_process: Option<&PostProcessSettings>,
) -> SceneDocument {
    let mut doc = SceneDocument::new(scene.name());
    doc.camera = camera.map(|c| (*c).into());
    doc.post_process = post_process.cloned();
    doc.entities = scene
        .roots()
        .iter()
        .filter_map(|id| entity_to_def(scene, *id))
        .collect();
    doc
}

fn entity_to_def(scene: &SceneGraph, id: EntityId) -> Option<EntityDef> {
    let entity = scene.get(id)?;
    Some(EntityDef {
        id: entity.id().raw(),
        name: entity.name.clone(),
        enabled: entity.enabled,
        transform: transform_to_def(&entity.transform),
        has_model: entity.has_model(),
        model_path: entity.model_path().unwrap_or_default().to_string(),
        has_skeleton: entity.has_skeleton(),
        animations: entity.clips.names(),
        material: entity.material.as_deref().cloned(),
        light: entity.light.clone(),
        children: entity
            .children()
            .iter()
            .filter_map(|c| entity_to_def(scene, *c))
            .collect(),
    })
}

fn transform_to_def(t: &Transform) -> TransformDef {
    TransformDef {
        position: t.position.to_array(),
        rotation: t.rotation.to_array(),
        scale: t.scale.to_array(),
    }
}

fn transform_from_def(def: &TransformDef) -> Transform {
    let rotation = Quat::from_array(def.rotation);
    let rotation = if rotation.length_squared() > 1e-12 {
        rotation.normalize()
    } else {
        Quat::IDENTITY
    };
    Transform::from_trs(Vec3::from_array(def.position), rotation, Vec3::from_array(def.scale))
}

/// Save a scene to a JSON string
pub fn save_scene_to_string(
    scene: &SceneGraph,
    camera: Option<&CameraState>,
    post_process: Option<&PostProcessSettings>,
) -> Result<String> {
    let doc = scene_to_document(scene, camera, post_process);
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Save a scene to a JSON file
pub fn save_scene_to_path<P: AsRef<Path>>(
    path: P,
    scene: &SceneGraph,
    camera: Option<&CameraState>,
    post_process: Option<&PostProcessSettings>,
) -> Result<()> {
    let content = save_scene_to_string(scene, camera, post_process)?;
    fs::write(path, content)?;
    Ok(())
}

/// Save a scene, logging any failure
pub fn save_scene<P: AsRef<Path>>(
    path: P,
    scene: &SceneGraph,
    camera: Option<&CameraState>,
    post_process: Option<&PostProcessSettings>,
) -> bool {
    let path = path.as_ref();
    match save_scene_to_path(path, scene, camera, post_process) {
        Ok(()) => {
            log::info!("Saved scene '{}' to {}", scene.name(), path.display());
            true
        }
        Err(e) => {
            log::error!("Failed to save scene to {}: {}", path.display(), e);
            false
        }
    }
}

/// Parse a document without touching any scene
pub fn parse_document(content: &str) -> Result<SceneDocument> {
    let doc: SceneDocument = serde_json::from_str(content)?;
    if doc.version > CURRENT_VERSION {
        return Err(KilnError::UnsupportedVersion {
            found: doc.version,
            supported: CURRENT_VERSION,
        });
    }
    Ok(doc)
}

/// Load a document into `scene`.
///
/// The scene is cleared first, so a failed parse leaves it empty. Models
/// are rehydrated through `loader`; an entity whose model fails to load is
/// still created, without the model.
pub fn load_scene_from_str(
    content: &str,
    scene: &mut SceneGraph,
    loader: &mut dyn ModelLoader,
) -> Result<LoadReport> {
    scene.clear();
    let doc = parse_document(content)?;
    Ok(document_to_scene(&doc, scene, loader))
}

/// Load a document file into `scene`
pub fn load_scene_from_path<P: AsRef<Path>>(
    path: P,
    scene: &mut SceneGraph,
    loader: &mut dyn ModelLoader,
) -> Result<LoadReport> {
    scene.clear();
    let content = fs::read_to_string(path)?;
    load_scene_from_str(&content, scene, loader)
}

/// Load a scene file, updating camera and post-process settings when the
/// document carries them. Failures are logged and leave the scene empty.
pub fn load_scene<P: AsRef<Path>>(
    path: P,
    scene: &mut SceneGraph,
    camera: &mut CameraState,
    post_process: &mut PostProcessSettings,
    loader: &mut dyn ModelLoader,
) -> bool {
    let path = path.as_ref();
    match load_scene_from_path(path, scene, loader) {
        Ok(report) => {
            if let Some(c) = report.camera {
                *camera = c;
            }
            if let Some(p) = report.post_process {
                *post_process = p;
            }
            log::info!(
                "Loaded scene '{}' from {} ({} entities)",
                scene.name(),
                path.display(),
                report.entity_count
            );
            true
        }
        Err(e) => {
            log::error!("Failed to load scene from {}: {}", path.display(), e);
            false
        }
    }
}

/// Build entities from an already-parsed document into a cleared scene
pub fn document_to_scene(
    doc: &SceneDocument,
    scene: &mut SceneGraph,
    loader: &mut dyn ModelLoader,
) -> LoadReport {
    scene.clear();
    scene.set_name(doc.name.clone());

    let mut builder = Builder {
        scene: &mut *scene,
        loader: &mut *loader,
        materials: Vec::new(),
        report: LoadReport {
            version: doc.version,
            camera: doc.camera.map(Into::into),
            post_process: doc.post_process.clone(),
            ..Default::default()
        },
    };
    for def in &doc.entities {
        builder.build(def, None);
    }
    let mut report = builder.report;
    report.entity_count = scene.entity_count();
    scene.update_all_world_matrices();
    report
}

struct Builder<'a> {
    scene: &'a mut SceneGraph,
    loader: &'a mut dyn ModelLoader,
    /// Identical materials are shared between entities
    materials: Vec<Arc<Material>>,
    report: LoadReport,
}

impl Builder<'_> {
    fn build(&mut self, def: &EntityDef, parent: Option<EntityId>) {
        let id = self
            .scene
            .create_entity_with_id(EntityId::from_raw(def.id), def.name.clone())
            .unwrap_or_else(|| self.scene.create_entity(def.name.clone()));
        if parent.is_some() {
            self.scene.set_parent(id, parent);
        }

        let material = def.material.as_ref().map(|m| self.share_material(m));
        let asset = if def.has_model && !def.model_path.is_empty() {
            let asset = self.loader.load_model(&def.model_path);
            if asset.is_none() {
                log::warn!(
                    "Entity '{}': failed to load model '{}'",
                    def.name,
                    def.model_path
                );
                self.report.failed_models.push(def.model_path.clone());
            }
            asset
        } else {
            None
        };

        if let Some(entity) = self.scene.get_mut(id) {
            entity.enabled = def.enabled;
            entity.transform = transform_from_def(&def.transform);
            entity.material = material;
            entity.light = def.light.clone();
            if let Some(asset) = asset {
                attach_asset(entity, def, asset);
            }
        }

        for child in &def.children {
            self.build(child, Some(id));
        }
    }

    fn share_material(&mut self, material: &Material) -> Arc<Material> {
        if let Some(existing) = self.materials.iter().find(|m| m.as_ref() == material) {
            return existing.clone();
        }
        let shared = Arc::new(material.clone());
        self.materials.push(shared.clone());
        shared
    }
}

fn attach_asset(entity: &mut Entity, def: &EntityDef, asset: ModelAsset) {
    let rigged = asset.skeleton.is_some();
    entity.attach_model(asset);
    if !rigged && def.has_skeleton {
        log::warn!(
            "Entity '{}': document expects a skeleton but '{}' has none",
            def.name,
            def.model_path
        );
    }
    for name in &def.animations {
        if !entity.clips.contains(name) {
            log::warn!("Entity '{}': animation '{}' not found in model", def.name, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_loader::{NoModels, PlaceholderLoader};
    use kiln_animation::{AnimationClip, Skeleton};
    use kiln_core::Color;
    use kiln_render::{Light, Model};

    fn sample_scene() -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene.set_name("Sample");
        for i in 0..3 {
            let root = scene.create_entity(format!("root{}", i));
            let e = scene.get_mut(root).unwrap();
            e.transform = Transform::from_trs(
                Vec3::new(i as f32, 1.0, -2.0),
                Quat::from_rotation_y(0.3 * i as f32),
                Vec3::new(1.0, 2.0, 1.0),
            );
            e.model = Some(Model::new(format!("models/root{}.glb", i)));
            for j in 0..2 {
                let child = scene.create_entity(format!("child{}_{}", i, j));
                scene.get_mut(child).unwrap().transform =
                    Transform::from_position(Vec3::new(0.0, j as f32, 0.5));
                scene.set_parent(child, Some(root));
            }
        }
        scene
    }

    fn assert_same(a: &SceneGraph, b: &SceneGraph) {
        assert_eq!(a.entity_count(), b.entity_count());
        assert_eq!(a.name(), b.name());
        for ea in a.iter() {
            let eb = b.get(ea.id()).unwrap();
            assert_eq!(ea.name, eb.name);
            assert!(ea.transform.abs_diff_eq(&eb.transform, 1e-6));
            assert_eq!(ea.parent(), eb.parent());
            assert_eq!(ea.children(), eb.children());
            assert_eq!(ea.model_path(), eb.model_path());
        }
    }

    #[test]
    fn round_trip_preserves_structure() {
        let scene = sample_scene();
        let json = save_scene_to_string(&scene, None, None).unwrap();

        let mut loaded = SceneGraph::new();
        let report = load_scene_from_str(&json, &mut loaded, &mut PlaceholderLoader).unwrap();
        assert_eq!(report.version, CURRENT_VERSION);
        assert_eq!(report.entity_count, 9);
        assert_same(&scene, &loaded);
        assert!(loaded.selection().is_empty());

        let again = save_scene_to_string(&loaded, None, None).unwrap();
        assert_eq!(json, again);
    }

    #[test]
    fn camera_and_post_process_round_trip() {
        let scene = sample_scene();
        let camera = CameraState {
            yaw: 1.0,
            pitch: -0.2,
            distance: 3.0,
            target_offset: Vec3::new(0.5, 0.0, -1.0),
        };
        let mut post = PostProcessSettings::default();
        post.vignette.enabled = true;
        post.bloom.intensity = 2.0;
        let json = save_scene_to_string(&scene, Some(&camera), Some(&post)).unwrap();

        let mut loaded = SceneGraph::new();
        let report = load_scene_from_str(&json, &mut loaded, &mut PlaceholderLoader).unwrap();
        assert_eq!(report.camera, Some(camera));
        assert_eq!(report.post_process, Some(post));
    }

    #[test]
    fn newer_version_is_rejected_and_scene_left_empty() {
        let scene = sample_scene();
        let json = save_scene_to_string(&scene, None, None).unwrap();
        let bumped = json.replacen(
            &format!("\"version\": {}", CURRENT_VERSION),
            &format!("\"version\": {}", CURRENT_VERSION + 1),
            1,
        );
        assert_ne!(json, bumped);

        let mut target = sample_scene();
        let err = load_scene_from_str(&bumped, &mut target, &mut PlaceholderLoader).unwrap_err();
        assert!(matches!(err, KilnError::UnsupportedVersion { found: 3, supported: 2 }));
        assert!(target.is_empty());
    }

    #[test]
    fn malformed_document_clears_scene() {
        let mut target = sample_scene();
        assert!(load_scene_from_str("{ not json", &mut target, &mut PlaceholderLoader).is_err());
        assert!(target.is_empty());
    }

    #[test]
    fn failed_models_still_create_entities() {
        let scene = sample_scene();
        let json = save_scene_to_string(&scene, None, None).unwrap();
        let mut loaded = SceneGraph::new();
        let report = load_scene_from_str(&json, &mut loaded, &mut NoModels).unwrap();
        assert_eq!(loaded.entity_count(), 9);
        assert_eq!(report.failed_models.len(), 3);
        assert!(loaded.iter().all(|e| !e.has_model()));
    }

    #[test]
    fn closure_loader_supplies_skeleton_and_clips() {
        let json = r#"{
            "version": 2,
            "name": "rig",
            "entities": [{
                "id": 4, "name": "hero", "hasModel": true, "modelPath": "hero.glb",
                "hasSkeleton": true, "animations": ["walk"]
            }]
        }"#;
        let mut loader = |path: &str| {
            let mut skeleton = Skeleton::new();
            skeleton.add_bone_at_bind("hips", None, Transform::IDENTITY)?;
            Some(
                ModelAsset::new(Model::new(path))
                    .with_skeleton(skeleton)
                    .with_clip(AnimationClip::new("walk", 1.0, true)),
            )
        };
        let mut scene = SceneGraph::new();
        load_scene_from_str(json, &mut scene, &mut loader).unwrap();
        let hero = scene.get(EntityId::from_raw(4)).unwrap();
        assert!(hero.has_skeleton());
        assert!(hero.animator.is_some());
        assert!(hero.clips.contains("walk"));
        assert!(hero.model.as_ref().unwrap().skinned);
        assert_eq!(scene.create_entity("next").raw(), 5);
    }

    #[test]
    fn materials_and_lights_survive() {
        let mut scene = SceneGraph::new();
        let shared = Material::new("red", Color::RED).shared();
        let a = scene.create_entity("a");
        let b = scene.create_entity("b");
        scene.get_mut(a).unwrap().material = Some(shared.clone());
        scene.get_mut(b).unwrap().material = Some(shared);
        scene.get_mut(b).unwrap().light = Some(Light::point(Color::WHITE, 3.0, 8.0));

        let json = save_scene_to_string(&scene, None, None).unwrap();
        let mut loaded = SceneGraph::new();
        load_scene_from_str(&json, &mut loaded, &mut PlaceholderLoader).unwrap();
        let ma = loaded.get(a).unwrap().material.clone().unwrap();
        let mb = loaded.get(b).unwrap().material.clone().unwrap();
        assert!(Arc::ptr_eq(&ma, &mb));
        assert_eq!(loaded.get(b).unwrap().light.as_ref().unwrap().intensity, 3.0);
    }

    #[test]
    fn file_wrappers_report_booleans() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let scene = sample_scene();
        let camera = CameraState::default();
        assert!(save_scene(&path, &scene, Some(&camera), None));

        let mut loaded = SceneGraph::new();
        let mut cam = CameraState {
            yaw: 9.0,
            ..Default::default()
        };
        let mut post = PostProcessSettings::default();
        assert!(load_scene(&path, &mut loaded, &mut cam, &mut post, &mut PlaceholderLoader));
        assert_eq!(cam, camera);
        assert_eq!(loaded.entity_count(), 9);

        let missing = dir.path().join("missing.json");
        assert!(!load_scene(&missing, &mut loaded, &mut cam, &mut post, &mut PlaceholderLoader));
        assert!(loaded.is_empty());
    }
}
