//! Pose blending primitives shared by the animation drivers

use crate::pose::Pose;
use kiln_core::math::{lerp_vec3, slerp};

/// Running weighted average of poses.
///
/// Folding sample `k` with weight `w_k` lerps (slerps for rotation) the
/// accumulator toward the sample by `w_k / (W + w_k)` where `W` is the weight
/// folded so far. The result is the normalized convex combination of all
/// samples, independent of fold order. The first positive-weight sample
/// fully replaces the starting pose.
#[derive(Debug, Clone, Default)]
pub struct PoseAccumulator {
    pub pose: Pose,
    total_weight: f32,
}

impl PoseAccumulator {
    /// Start from `base`, typically the bind pose, with zero accumulated weight
    pub fn new(base: Pose) -> Self {
        Self {
            pose: base,
            total_weight: 0.0,
        }
    }

    pub fn reset(&mut self, base: &Pose) {
        self.pose.clone_from(base);
        self.total_weight = 0.0;
    }

    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    /// Fold a sample in with the given weight. Non-positive weights are skipped.
    pub fn add(&mut self, sample: &Pose, weight: f32) {
        if weight <= 0.0 {
            return;
        }
        let t = weight / (self.total_weight + weight);
        let count = self.pose.bone_count().min(sample.bone_count());
        for i in 0..count {
            self.pose.positions[i] = lerp_vec3(self.pose.positions[i], sample.positions[i], t);
            self.pose.rotations[i] = slerp(self.pose.rotations[i], sample.rotations[i], t);
            self.pose.scales[i] = lerp_vec3(self.pose.scales[i], sample.scales[i], t);
        }
        self.total_weight += weight;
    }

    pub fn into_pose(self) -> Pose {
        self.pose
    }
}

/// Blend two poses: `t = 0` gives `a`, `t = 1` gives `b`
pub fn blend_poses(a: &Pose, b: &Pose, t: f32) -> Pose {
    let mut out = a.clone();
    blend_into(&mut out, b, t);
    out
}

/// Blend `target` into `pose` in place by `t`
pub fn blend_into(pose: &mut Pose, target: &Pose, t: f32) {
    let t = t.clamp(0.0, 1.0);
    let count = pose.bone_count().min(target.bone_count());
    for i in 0..count {
        pose.positions[i] = lerp_vec3(pose.positions[i], target.positions[i], t);
        pose.rotations[i] = slerp(pose.rotations[i], target.rotations[i], t);
        pose.scales[i] = lerp_vec3(pose.scales[i], target.scales[i], t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{Quat, Vec3};

    fn pose_at(x: f32) -> Pose {
        let mut p = Pose::identity(1);
        p.positions[0] = Vec3::new(x, 0.0, 0.0);
        p
    }

    #[test]
    fn first_sample_replaces_base() {
        let mut acc = PoseAccumulator::new(pose_at(100.0));
        acc.add(&pose_at(3.0), 0.25);
        assert!((acc.pose.positions[0].x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn weighted_average_is_order_independent() {
        let samples = [(pose_at(0.0), 0.2), (pose_at(10.0), 0.5), (pose_at(4.0), 0.3)];
        let expected = 0.2 * 0.0 + 0.5 * 10.0 + 0.3 * 4.0;

        let mut forward = PoseAccumulator::new(Pose::identity(1));
        for (p, w) in &samples {
            forward.add(p, *w);
        }
        let mut backward = PoseAccumulator::new(Pose::identity(1));
        for (p, w) in samples.iter().rev() {
            backward.add(p, *w);
        }
        assert!((forward.pose.positions[0].x - expected).abs() < 1e-4);
        assert!((backward.pose.positions[0].x - expected).abs() < 1e-4);
        assert!((forward.total_weight() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn zero_weight_is_ignored() {
        let mut acc = PoseAccumulator::new(pose_at(1.0));
        acc.add(&pose_at(5.0), 0.0);
        assert_eq!(acc.pose.positions[0].x, 1.0);
        assert_eq!(acc.total_weight(), 0.0);
    }

    #[test]
    fn blend_two_poses() {
        let mut b = pose_at(8.0);
        b.rotations[0] = Quat::from_rotation_x(1.0);
        let mid = blend_poses(&pose_at(0.0), &b, 0.5);
        assert!((mid.positions[0].x - 4.0).abs() < 1e-6);
        assert!(mid.rotations[0].abs_diff_eq(Quat::from_rotation_x(0.5), 1e-5));
    }
}
