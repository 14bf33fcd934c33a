//! Bone hierarchy with cached model-space and skinning matrices

use kiln_core::math::quat_from_mat4;
use kiln_core::{Mat4, Quat, Transform, Vec3};

/// Upper bound on bones per skeleton; matches the renderer's bone palette
pub const MAX_BONES: usize = 128;

/// A single bone. `parent` always indexes an earlier bone.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub inverse_bind: Mat4,
    /// Current local TRS relative to the parent
    pub local: Transform,
    /// Local TRS at authoring time
    pub bind: Transform,
}

/// Runtime skeleton.
///
/// Bones are stored in topological order (parents before children), so the
/// matrix pipeline is a single forward pass:
/// 1. `model[i] = model[parent[i]] * local(i)` (or `local(i)` for roots)
/// 2. `skinning[i] = model[i] * inverse_bind[i]`
///
/// Both arrays are cached behind a dirty flag that any local-TRS mutation or
/// bone addition sets.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    model_space: Vec<Mat4>,
    skinning: Vec<Mat4>,
    dirty: bool,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone. Rejects duplicate names, parents that are not earlier
    /// bones, and growth past [`MAX_BONES`].
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        local: Transform,
        inverse_bind: Mat4,
    ) -> Option<usize> {
        let name = name.into();
        let index = self.bones.len();
        if index >= MAX_BONES {
            log::warn!("Skeleton is full ({} bones); dropping bone '{}'", MAX_BONES, name);
            return None;
        }
        if parent.is_some_and(|p| p >= index) || self.bone_index(&name).is_some() {
            return None;
        }
        self.bones.push(Bone {
            name,
            parent,
            inverse_bind,
            local,
            bind: local,
        });
        self.model_space.push(Mat4::IDENTITY);
        self.skinning.push(Mat4::IDENTITY);
        self.dirty = true;
        Some(index)
    }

    /// Append a bone whose inverse-bind matrix is derived from the current
    /// hierarchy, so the bind pose skins to identity.
    pub fn add_bone_at_bind(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        local: Transform,
    ) -> Option<usize> {
        let parent_model = match parent {
            Some(p) => self.model_matrix(p)?,
            None => Mat4::IDENTITY,
        };
        let model = parent_model * local.to_matrix();
        self.add_bone(name, parent, local, model.inverse())
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|b| b.parent)
    }

    pub fn local_transform(&self, index: usize) -> Transform {
        self.bones
            .get(index)
            .map(|b| b.local)
            .unwrap_or(Transform::IDENTITY)
    }

    /// Set a bone's local TRS. Out-of-range indices are ignored.
    pub fn set_local_transform(&mut self, index: usize, local: Transform) -> bool {
        match self.bones.get_mut(index) {
            Some(bone) => {
                bone.local = local;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Restore every bone to its bind-time local TRS
    pub fn reset_to_bind_pose(&mut self) {
        for bone in &mut self.bones {
            bone.local = bone.bind;
        }
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute cached matrices if any local TRS changed
    pub fn update(&mut self) {
        if !self.dirty {
            return;
        }
        for i in 0..self.bones.len() {
            let bone = &self.bones[i];
            let local = bone.local.to_matrix();
            self.model_space[i] = match bone.parent {
                Some(p) => self.model_space[p] * local,
                None => local,
            };
            self.skinning[i] = self.model_space[i] * bone.inverse_bind;
        }
        self.dirty = false;
    }

    /// Model-space matrices for every bone
    pub fn model_space_matrices(&mut self) -> &[Mat4] {
        self.update();
        &self.model_space
    }

    /// Skinning matrices for every bone.
    ///
    /// This is the live cache, not a snapshot: the next pose change
    /// overwrites it. Copy it if it must outlive further updates.
    pub fn skinning_matrices(&mut self) -> &[Mat4] {
        self.update();
        &self.skinning
    }

    /// Skinning matrices padded with identity to the renderer's palette size
    pub fn skinning_palette(&mut self) -> [Mat4; MAX_BONES] {
        self.update();
        let mut palette = [Mat4::IDENTITY; MAX_BONES];
        palette[..self.skinning.len()].copy_from_slice(&self.skinning);
        palette
    }

    pub fn model_matrix(&mut self, index: usize) -> Option<Mat4> {
        self.update();
        self.model_space.get(index).copied()
    }

    pub fn model_position(&mut self, index: usize) -> Option<Vec3> {
        self.model_matrix(index).map(|m| m.w_axis.truncate())
    }

    pub fn model_rotation(&mut self, index: usize) -> Option<Quat> {
        self.model_matrix(index).map(|m| quat_from_mat4(&m))
    }

    fn parent_model_rotation(&mut self, index: usize) -> Quat {
        self.parent(index)
            .and_then(|p| self.model_rotation(p))
            .unwrap_or(Quat::IDENTITY)
    }

    /// Rotate a bone about its own origin by a model-space rotation.
    /// Children follow through the hierarchy.
    pub fn rotate_bone_model_space(&mut self, index: usize, delta: Quat) -> bool {
        let Some(model_rot) = self.model_rotation(index) else {
            return false;
        };
        let parent_rot = self.parent_model_rotation(index);
        let new_model = delta * model_rot;
        let mut local = self.bones[index].local;
        local.rotation = (parent_rot.conjugate() * new_model).normalize();
        self.set_local_transform(index, local)
    }

    /// Set a bone's model-space rotation, keeping its position
    pub fn set_bone_model_rotation(&mut self, index: usize, rotation: Quat) -> bool {
        if index >= self.bones.len() {
            return false;
        }
        let parent_rot = self.parent_model_rotation(index);
        let mut local = self.bones[index].local;
        local.rotation = (parent_rot.conjugate() * rotation).normalize();
        self.set_local_transform(index, local)
    }

    /// Move a bone by a model-space offset
    pub fn translate_bone_model_space(&mut self, index: usize, delta: Vec3) -> bool {
        if index >= self.bones.len() {
            return false;
        }
        let local_delta = match self.parent(index).and_then(|p| self.model_matrix(p)) {
            Some(parent) => parent.inverse().transform_vector3(delta),
            None => delta,
        };
        let mut local = self.bones[index].local;
        local.position += local_delta;
        self.set_local_transform(index, local)
    }
}
