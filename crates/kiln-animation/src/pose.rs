//! Per-bone TRS arrays produced by sampling and consumed by blending

use crate::skeleton::Skeleton;
use kiln_core::{Quat, Transform, Vec3};

/// Three parallel arrays of bone-local position, rotation and scale
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    pub positions: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub scales: Vec<Vec3>,
}

impl Pose {
    /// A pose with every bone at identity
    pub fn identity(bone_count: usize) -> Self {
        Self {
            positions: vec![Vec3::ZERO; bone_count],
            rotations: vec![Quat::IDENTITY; bone_count],
            scales: vec![Vec3::ONE; bone_count],
        }
    }

    /// The skeleton's bind pose
    pub fn bind(skeleton: &Skeleton) -> Self {
        let mut pose = Self::identity(skeleton.bone_count());
        for (i, bone) in skeleton.bones().iter().enumerate() {
            pose.set(i, bone.bind);
        }
        pose
    }

    /// The skeleton's current local pose
    pub fn current(skeleton: &Skeleton) -> Self {
        let mut pose = Self::identity(skeleton.bone_count());
        for (i, bone) in skeleton.bones().iter().enumerate() {
            pose.set(i, bone.local);
        }
        pose
    }

    pub fn bone_count(&self) -> usize {
        self.positions.len()
    }

    /// Reset every bone to identity, resizing if needed
    pub fn reset_identity(&mut self, bone_count: usize) {
        self.positions.clear();
        self.positions.resize(bone_count, Vec3::ZERO);
        self.rotations.clear();
        self.rotations.resize(bone_count, Quat::IDENTITY);
        self.scales.clear();
        self.scales.resize(bone_count, Vec3::ONE);
    }

    pub fn transform(&self, bone: usize) -> Option<Transform> {
        Some(Transform::from_trs(
            *self.positions.get(bone)?,
            *self.rotations.get(bone)?,
            *self.scales.get(bone)?,
        ))
    }

    pub fn set(&mut self, bone: usize, t: Transform) {
        if bone < self.bone_count() {
            self.positions[bone] = t.position;
            self.rotations[bone] = t.rotation;
            self.scales[bone] = t.scale;
        }
    }

    /// Write the pose back to the skeleton as new local TRS
    pub fn apply_to(&self, skeleton: &mut Skeleton) {
        let count = self.bone_count().min(skeleton.bone_count());
        for i in 0..count {
            skeleton.set_local_transform(
                i,
                Transform::from_trs(self.positions[i], self.rotations[i], self.scales[i]),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::Mat4;

    #[test]
    fn bind_and_apply() {
        let mut skeleton = Skeleton::new();
        skeleton
            .add_bone("root", None, Transform::from_position(Vec3::Y), Mat4::IDENTITY)
            .unwrap();

        let bind = Pose::bind(&skeleton);
        assert_eq!(bind.positions[0], Vec3::Y);

        let mut pose = Pose::identity(1);
        pose.positions[0] = Vec3::new(3.0, 0.0, 0.0);
        pose.apply_to(&mut skeleton);
        assert_eq!(skeleton.local_transform(0).position, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(Pose::bind(&skeleton).positions[0], Vec3::Y);
        assert_eq!(Pose::current(&skeleton).positions[0], Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut pose = Pose::identity(2);
        pose.set(5, Transform::from_position(Vec3::X));
        assert!(pose.transform(5).is_none());
        assert_eq!(pose.transform(1), Some(Transform::IDENTITY));
    }
}
