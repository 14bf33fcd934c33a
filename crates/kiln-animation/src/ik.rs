//! Inverse kinematics solvers operating in skeleton model space.
//!
//! Targets and poles are model-space points. Every solver rotates bones
//! about their own origins, so bone lengths never change; a solver's weight
//! scales the applied rotation by slerping from identity.

use crate::skeleton::Skeleton;
use kiln_core::math::{any_perpendicular, normalize_or_zero, rotation_between, safe_acos, weighted_rotation};
use kiln_core::Vec3;
use std::f32::consts::PI;

/// Slack kept between the target distance and full extension or folding
pub const IK_EPSILON: f32 = 1e-3;

/// Law-of-cosines solver for a root-mid-end chain such as an arm or leg
#[derive(Debug, Clone, PartialEq)]
pub struct TwoBoneIk {
    pub root: usize,
    pub mid: usize,
    pub end: usize,
    pub target: Vec3,
    /// Point the middle joint bends toward
    pub pole: Option<Vec3>,
    pub weight: f32,
}

impl TwoBoneIk {
    pub fn new(root: usize, mid: usize, end: usize, target: Vec3) -> Self {
        Self {
            root,
            mid,
            end,
            target,
            pole: None,
            weight: 1.0,
        }
    }

    pub fn with_pole(mut self, pole: Vec3) -> Self {
        self.pole = Some(pole);
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn solve(&self, skeleton: &mut Skeleton, global_weight: f32) -> bool {
        let weight = (self.weight * global_weight).clamp(0.0, 1.0);
        if weight <= 0.0 {
            return false;
        }
        solve_two_bone(skeleton, [self.root, self.mid, self.end], self.target, self.pole, weight)
    }
}

fn solve_two_bone(
    skeleton: &mut Skeleton,
    [root, mid, end]: [usize; 3],
    target: Vec3,
    pole: Option<Vec3>,
    weight: f32,
) -> bool {
    let (Some(a), Some(b), Some(c)) = (
        skeleton.model_position(root),
        skeleton.model_position(mid),
        skeleton.model_position(end),
    ) else {
        return false;
    };

    let upper = (b - a).length();
    let lower = (c - b).length();
    if upper < IK_EPSILON || lower < IK_EPSILON {
        return false;
    }

    let to_target = target - a;
    let mut dir = normalize_or_zero(to_target);
    if dir == Vec3::ZERO {
        dir = normalize_or_zero(c - a);
        if dir == Vec3::ZERO {
            dir = normalize_or_zero(b - a);
        }
    }
    let min_reach = (upper - lower).abs() + IK_EPSILON;
    let max_reach = upper + lower - IK_EPSILON;
    let dist = to_target.length().clamp(min_reach, max_reach.max(min_reach));

    // Bend plane: toward the pole if given, else keep the current bend
    let hint = match pole {
        Some(p) => p - a,
        None => b - a,
    };
    let mut bend = hint - dir * hint.dot(dir);
    if bend.length_squared() < 1e-10 {
        bend = any_perpendicular(dir);
    } else {
        bend = bend.normalize();
    }

    let cos_root = (upper * upper + dist * dist - lower * lower) / (2.0 * upper * dist);
    let root_angle = safe_acos(cos_root);
    let mid_goal = a + (dir * root_angle.cos() + bend * root_angle.sin()) * upper;
    let end_goal = a + dir * dist;

    let root_delta = rotation_between(b - a, mid_goal - a);
    skeleton.rotate_bone_model_space(root, weighted_rotation(root_delta, weight));

    let (Some(b), Some(c)) = (skeleton.model_position(mid), skeleton.model_position(end)) else {
        return false;
    };
    let mid_delta = rotation_between(c - b, end_goal - b);
    skeleton.rotate_bone_model_space(mid, weighted_rotation(mid_delta, weight));
    true
}

/// Turns one bone toward a target within yaw and pitch limits
#[derive(Debug, Clone, PartialEq)]
pub struct LookAtIk {
    pub bone: usize,
    pub target: Vec3,
    /// Bone-local axis that should face the target
    pub forward: Vec3,
    /// Bone-local up axis used to split yaw from pitch
    pub up: Vec3,
    /// Radians
    pub max_yaw: f32,
    /// Radians
    pub max_pitch: f32,
    pub weight: f32,
}

impl LookAtIk {
    pub fn new(bone: usize, target: Vec3) -> Self {
        Self {
            bone,
            target,
            forward: Vec3::Z,
            up: Vec3::Y,
            max_yaw: PI,
            max_pitch: PI * 0.5,
            weight: 1.0,
        }
    }

    pub fn with_limits(mut self, max_yaw: f32, max_pitch: f32) -> Self {
        self.max_yaw = max_yaw.abs();
        self.max_pitch = max_pitch.abs();
        self
    }

    pub fn with_axes(mut self, forward: Vec3, up: Vec3) -> Self {
        self.forward = forward;
        self.up = up;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn solve(&self, skeleton: &mut Skeleton, global_weight: f32) -> bool {
        let weight = (self.weight * global_weight).clamp(0.0, 1.0);
        if weight <= 0.0 {
            return false;
        }
        let (Some(position), Some(rotation)) = (
            skeleton.model_position(self.bone),
            skeleton.model_rotation(self.bone),
        ) else {
            return false;
        };
        let to_target = normalize_or_zero(self.target - position);
        let forward = normalize_or_zero(self.forward);
        if to_target == Vec3::ZERO || forward == Vec3::ZERO {
            return false;
        }
        let mut up = normalize_or_zero(self.up - forward * self.up.dot(forward));
        if up == Vec3::ZERO {
            up = any_perpendicular(forward);
        }
        let right = up.cross(forward);

        // Desired direction in the bone's frame, split into yaw and pitch
        let local = rotation.conjugate() * to_target;
        let yaw = local.dot(right).atan2(local.dot(forward)).clamp(-self.max_yaw, self.max_yaw);
        let pitch = local.dot(up).clamp(-1.0, 1.0).asin().clamp(-self.max_pitch, self.max_pitch);
        let clamped = (forward * yaw.cos() + right * yaw.sin()) * pitch.cos() + up * pitch.sin();

        let local_delta = rotation_between(forward, clamped);
        let model_delta = rotation * local_delta * rotation.conjugate();
        skeleton.rotate_bone_model_space(self.bone, weighted_rotation(model_delta, weight))
    }
}

/// Forward-and-backward-reaching solver for chains of any length
#[derive(Debug, Clone, PartialEq)]
pub struct FabrikChain {
    /// Bone indices from chain root to tip, each a descendant of the previous
    pub bones: Vec<usize>,
    pub target: Vec3,
    pub max_iterations: usize,
    pub tolerance: f32,
    pub weight: f32,
}

impl FabrikChain {
    pub fn new(bones: Vec<usize>, target: Vec3) -> Self {
        Self {
            bones,
            target,
            max_iterations: 10,
            tolerance: 1e-3,
            weight: 1.0,
        }
    }

    pub fn with_iterations(mut self, max_iterations: usize, tolerance: f32) -> Self {
        self.max_iterations = max_iterations;
        self.tolerance = tolerance;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Desired joint positions for the target, without touching the skeleton
    pub fn reach(&self, positions: &[Vec3]) -> Vec<Vec3> {
        let n = positions.len();
        let mut points = positions.to_vec();
        if n < 2 {
            return points;
        }
        let lengths: Vec<f32> = positions.windows(2).map(|w| (w[1] - w[0]).length()).collect();
        let rest_dirs: Vec<Vec3> = positions.windows(2).map(|w| normalize_or_zero(w[1] - w[0])).collect();
        let total: f32 = lengths.iter().sum();
        let origin = positions[0];

        let direction = |from: Vec3, to: Vec3, fallback: Vec3| {
            let d = normalize_or_zero(to - from);
            if d == Vec3::ZERO {
                fallback
            } else {
                d
            }
        };

        if (self.target - origin).length() >= total {
            let dir = direction(origin, self.target, rest_dirs[0]);
            for i in 0..n - 1 {
                points[i + 1] = points[i] + dir * lengths[i];
            }
            return points;
        }

        for _ in 0..self.max_iterations {
            if (points[n - 1] - self.target).length() < self.tolerance {
                break;
            }
            // Forward: pin the tip to the target, walk to the root
            points[n - 1] = self.target;
            for i in (0..n - 1).rev() {
                let dir = direction(points[i + 1], points[i], -rest_dirs[i]);
                points[i] = points[i + 1] + dir * lengths[i];
            }
            // Backward: pin the root, walk to the tip
            points[0] = origin;
            for i in 0..n - 1 {
                let dir = direction(points[i], points[i + 1], rest_dirs[i]);
                points[i + 1] = points[i] + dir * lengths[i];
            }
        }
        points
    }

    pub fn solve(&self, skeleton: &mut Skeleton, global_weight: f32) -> bool {
        let weight = (self.weight * global_weight).clamp(0.0, 1.0);
        if weight <= 0.0 || self.bones.len() < 2 {
            return false;
        }
        let Some(positions) = self
            .bones
            .iter()
            .map(|&b| skeleton.model_position(b))
            .collect::<Option<Vec<Vec3>>>()
        else {
            return false;
        };

        let desired = self.reach(&positions);
        for i in 0..self.bones.len() - 1 {
            let (Some(a), Some(b)) = (
                skeleton.model_position(self.bones[i]),
                skeleton.model_position(self.bones[i + 1]),
            ) else {
                return false;
            };
            let delta = rotation_between(b - a, desired[i + 1] - desired[i]);
            skeleton.rotate_bone_model_space(self.bones[i], weighted_rotation(delta, weight));
        }
        true
    }
}

/// Plants a foot on a ground plane: lowers the pelvis when the leg cannot
/// reach, solves the leg as a two-bone chain, then tilts the foot to the
/// ground normal
#[derive(Debug, Clone, PartialEq)]
pub struct FootIk {
    pub pelvis: Option<usize>,
    pub hip: usize,
    pub knee: usize,
    pub ankle: usize,
    pub ground_point: Vec3,
    pub ground_normal: Vec3,
    /// Ankle height above the ground
    pub foot_height: f32,
    pub align_to_ground: bool,
    pub weight: f32,
}

impl FootIk {
    pub fn new(hip: usize, knee: usize, ankle: usize, ground_point: Vec3, ground_normal: Vec3) -> Self {
        Self {
            pelvis: None,
            hip,
            knee,
            ankle,
            ground_point,
            ground_normal,
            foot_height: 0.0,
            align_to_ground: true,
            weight: 1.0,
        }
    }

    pub fn with_pelvis(mut self, pelvis: usize) -> Self {
        self.pelvis = Some(pelvis);
        self
    }

    pub fn with_foot_height(mut self, height: f32) -> Self {
        self.foot_height = height;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Ankle position the solver aims for
    pub fn ankle_target(&self) -> Vec3 {
        self.ground_point + normalize_or_zero(self.ground_normal) * self.foot_height
    }

    pub fn solve(&self, skeleton: &mut Skeleton, global_weight: f32) -> bool {
        let weight = (self.weight * global_weight).clamp(0.0, 1.0);
        if weight <= 0.0 {
            return false;
        }
        let target = self.ankle_target();
        let (Some(hip), Some(knee), Some(ankle)) = (
            skeleton.model_position(self.hip),
            skeleton.model_position(self.knee),
            skeleton.model_position(self.ankle),
        ) else {
            return false;
        };

        if let Some(pelvis) = self.pelvis {
            let reach = (knee - hip).length() + (ankle - knee).length() - IK_EPSILON;
            let to_target = target - hip;
            let excess = to_target.length() - reach;
            if excess > 0.0 {
                let offset = normalize_or_zero(to_target) * excess * weight;
                skeleton.translate_bone_model_space(pelvis, offset);
            }
        }

        if !solve_two_bone(skeleton, [self.hip, self.knee, self.ankle], target, None, weight) {
            return false;
        }

        if self.align_to_ground {
            let normal = normalize_or_zero(self.ground_normal);
            if let Some(rotation) = skeleton.model_rotation(self.ankle) {
                if normal != Vec3::ZERO {
                    let delta = rotation_between(rotation * Vec3::Y, normal);
                    skeleton.rotate_bone_model_space(self.ankle, weighted_rotation(delta, weight));
                }
            }
        }
        true
    }
}

/// Any of the supported solvers
#[derive(Debug, Clone, PartialEq)]
pub enum IkSolver {
    TwoBone(TwoBoneIk),
    LookAt(LookAtIk),
    Fabrik(FabrikChain),
    Foot(FootIk),
}

impl IkSolver {
    pub fn solve(&self, skeleton: &mut Skeleton, global_weight: f32) -> bool {
        match self {
            IkSolver::TwoBone(s) => s.solve(skeleton, global_weight),
            IkSolver::LookAt(s) => s.solve(skeleton, global_weight),
            IkSolver::Fabrik(s) => s.solve(skeleton, global_weight),
            IkSolver::Foot(s) => s.solve(skeleton, global_weight),
        }
    }
}

/// Runs a list of solvers in insertion order after animation sampling
#[derive(Debug, Clone)]
pub struct IkManager {
    pub enabled: bool,
    pub global_weight: f32,
    solvers: Vec<IkSolver>,
}

impl Default for IkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IkManager {
    pub fn new() -> Self {
        Self {
            enabled: true,
            global_weight: 1.0,
            solvers: Vec::new(),
        }
    }

    /// Add a solver, returning its index
    pub fn add(&mut self, solver: IkSolver) -> usize {
        self.solvers.push(solver);
        self.solvers.len() - 1
    }

    pub fn solver(&self, index: usize) -> Option<&IkSolver> {
        self.solvers.get(index)
    }

    pub fn solver_mut(&mut self, index: usize) -> Option<&mut IkSolver> {
        self.solvers.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<IkSolver> {
        (index < self.solvers.len()).then(|| self.solvers.remove(index))
    }

    pub fn clear(&mut self) {
        self.solvers.clear();
    }

    pub fn len(&self) -> usize {
        self.solvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solvers.is_empty()
    }

    pub fn set_global_weight(&mut self, weight: f32) {
        self.global_weight = weight.clamp(0.0, 1.0);
    }

    /// Run every solver; returns how many applied a change
    pub fn solve(&self, skeleton: &mut Skeleton) -> usize {
        if !self.enabled || self.global_weight <= 0.0 {
            return 0;
        }
        self.solvers
            .iter()
            .filter(|s| s.solve(skeleton, self.global_weight))
            .count()
    }
}
