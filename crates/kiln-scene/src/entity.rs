//! Scene entities and their optional components

use crate::model_loader::ModelAsset;
use kiln_animation::{AnimationClip, Animator, ClipLibrary, IkManager, LayerManager, Skeleton, StateMachine};
use kiln_core::{Aabb, EntityId, Mat4, Transform, Vec3};
use kiln_render::{Light, Material, Model};
use std::sync::Arc;

/// A scene-graph node.
///
/// Hierarchy links are owned by the [`SceneGraph`](crate::SceneGraph) and
/// only readable here; every component is optional.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    pub name: String,
    pub enabled: bool,
    pub transform: Transform,
    pub(crate) world_matrix: Mat4,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub model: Option<Model>,
    pub material: Option<Arc<Material>>,
    pub light: Option<Light>,
    pub skeleton: Option<Skeleton>,
    pub animator: Option<Animator>,
    pub state_machine: Option<StateMachine>,
    pub layers: Option<LayerManager>,
    pub ik: Option<IkManager>,
    pub clips: ClipLibrary,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            transform: Transform::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            parent: None,
            children: Vec::new(),
            model: None,
            material: None,
            light: None,
            skeleton: None,
            animator: None,
            state_machine: None,
            layers: None,
            ik: None,
            clips: ClipLibrary::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// World matrix as of the last `update_all_world_matrices`
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.w_axis.truncate()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_path(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.path.as_str())
    }

    pub fn has_skeleton(&self) -> bool {
        self.skeleton.is_some()
    }

    pub fn is_animated(&self) -> bool {
        self.skeleton.is_some()
            && (self.animator.is_some()
                || self.state_machine.is_some()
                || self.layers.is_some()
                || self.ik.is_some())
    }

    /// World-space bounds of the model, if any
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.model
            .as_ref()
            .map(|m| m.local_bounds().transformed(&self.world_matrix))
    }

    /// Attach a skeleton and make sure an animator is ready to drive it.
    /// Clips already in the library are rebound to the new bones.
    pub fn attach_skeleton(&mut self, skeleton: Skeleton) {
        let rebound: Vec<AnimationClip> = self
            .clips
            .iter()
            .map(|clip| {
                let mut clip = AnimationClip::clone(clip);
                clip.resolve_bones(&skeleton);
                clip
            })
            .collect();
        for clip in rebound {
            self.clips.insert(clip);
        }
        self.skeleton = Some(skeleton);
        if self.animator.is_none() {
            self.animator = Some(Animator::new());
        }
    }

    /// Take over a loaded model with its skeleton and clips
    pub fn attach_model(&mut self, asset: ModelAsset) {
        self.model = Some(asset.model);
        if let Some(skeleton) = asset.skeleton {
            self.attach_skeleton(skeleton);
        }
        for clip in asset.clips {
            self.add_clip(clip);
        }
    }

    /// Add a clip to the library, binding its channels to this entity's bones
    pub fn add_clip(&mut self, mut clip: AnimationClip) -> Arc<AnimationClip> {
        if let Some(skeleton) = &self.skeleton {
            clip.resolve_bones(skeleton);
        }
        self.clips.insert(clip)
    }

    /// Play a clip from this entity's library on its animator
    pub fn play_clip(&mut self, name: &str, crossfade: f32) -> bool {
        let Some(clip) = self.clips.get(name) else {
            return false;
        };
        match self.animator.as_mut() {
            Some(animator) if self.skeleton.is_some() => animator.play(clip, crossfade),
            _ => false,
        }
    }

    /// Run the animation pipeline for one frame: animator, state machine,
    /// layers, IK, then skeleton matrix evaluation.
    pub fn update_animation(&mut self, dt: f32) {
        let Some(skeleton) = self.skeleton.as_mut() else {
            return;
        };

        let mut driven = false;
        if let Some(animator) = self.animator.as_mut() {
            if !animator.states().is_empty() {
                animator.update(dt, skeleton);
                driven = true;
            }
        }
        if let Some(machine) = self.state_machine.as_mut() {
            machine.tick(dt, skeleton);
            driven = true;
        }
        if let Some(layers) = self.layers.as_mut() {
            if driven {
                layers.update_on_current(dt, skeleton);
            } else {
                layers.update(dt, skeleton);
            }
        }
        if let Some(ik) = self.ik.as_ref() {
            ik.solve(skeleton);
        }
        skeleton.update();
    }

    /// Skinning matrices for the renderer, if this entity is skinned
    pub fn skinning_matrices(&mut self) -> Option<&[Mat4]> {
        self.skeleton.as_mut().map(|s| s.skinning_matrices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_animation::BoneChannel;

    fn rigged() -> Entity {
        let mut entity = Entity::new(EntityId::from_raw(1), "rig");
        let mut skeleton = Skeleton::new();
        skeleton.add_bone_at_bind("root", None, Transform::IDENTITY).unwrap();
        entity.attach_skeleton(skeleton);
        entity.add_clip(
            AnimationClip::new("slide", 1.0, false).with_channel(
                BoneChannel::new("root")
                    .position(0.0, Vec3::ZERO)
                    .position(1.0, Vec3::new(4.0, 0.0, 0.0)),
            ),
        );
        entity
    }

    #[test]
    fn bounds_follow_world_matrix() {
        let mut entity = Entity::new(EntityId::from_raw(1), "box");
        assert!(entity.world_bounds().is_none());
        entity.model = Some(Model::new("box.glb").with_bounds(Vec3::ZERO, 1.0));
        entity.world_matrix = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
        let bounds = entity.world_bounds().unwrap();
        assert!(bounds.center().abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-6));
    }

    #[test]
    fn animation_pipeline_moves_bone() {
        let mut entity = rigged();
        assert!(entity.play_clip("slide", 0.0));
        assert!(!entity.play_clip("missing", 0.0));
        entity.update_animation(0.5);
        let skeleton = entity.skeleton.as_mut().unwrap();
        let p = skeleton.model_position(0).unwrap();
        assert!((p.x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn skinning_matrices_only_for_skinned() {
        let mut plain = Entity::new(EntityId::from_raw(2), "plain");
        assert!(plain.skinning_matrices().is_none());
        let mut entity = rigged();
        assert_eq!(entity.skinning_matrices().map(|m| m.len()), Some(1));
    }
}
