//! Parameter-driven blending of several clips along one or two axes

use crate::blend::PoseAccumulator;
use crate::clip::AnimationClip;
use crate::params::Parameters;
use crate::pose::Pose;
use kiln_core::Vec2;
use std::sync::Arc;

/// Distance under which a 2D parameter snaps to a single motion
pub const EXACT_MATCH_DISTANCE: f32 = 1e-3;

#[derive(Debug, Clone)]
pub struct Motion1D {
    pub clip: Arc<AnimationClip>,
    pub threshold: f32,
}

/// Motions placed on a line, sorted by threshold
#[derive(Debug, Clone, Default)]
pub struct BlendTree1D {
    pub parameter: String,
    motions: Vec<Motion1D>,
}

impl BlendTree1D {
    pub fn new(parameter: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            motions: Vec::new(),
        }
    }

    pub fn with_motion(mut self, clip: Arc<AnimationClip>, threshold: f32) -> Self {
        self.add_motion(clip, threshold);
        self
    }

    pub fn add_motion(&mut self, clip: Arc<AnimationClip>, threshold: f32) {
        let idx = self.motions.partition_point(|m| m.threshold <= threshold);
        self.motions.insert(idx, Motion1D { clip, threshold });
    }

    pub fn motions(&self) -> &[Motion1D] {
        &self.motions
    }

    /// Weights for parameter value `x`: the two motions bracketing `x` share
    /// complementary linear weights, everything else is zero. Outside the
    /// threshold range the nearest end motion takes full weight.
    pub fn weights(&self, x: f32) -> Vec<f32> {
        let n = self.motions.len();
        let mut weights = vec![0.0; n];
        if n == 0 {
            return weights;
        }
        if x <= self.motions[0].threshold {
            weights[0] = 1.0;
            return weights;
        }
        if x >= self.motions[n - 1].threshold {
            weights[n - 1] = 1.0;
            return weights;
        }

        let hi = self.motions.partition_point(|m| m.threshold <= x);
        let lo = hi - 1;
        let span = self.motions[hi].threshold - self.motions[lo].threshold;
        if span <= f32::EPSILON {
            weights[lo] = 1.0;
        } else {
            let t = (x - self.motions[lo].threshold) / span;
            weights[lo] = 1.0 - t;
            weights[hi] = t;
        }
        weights
    }
}

#[derive(Debug, Clone)]
pub struct Motion2D {
    pub clip: Arc<AnimationClip>,
    pub position: Vec2,
}

/// Motions scattered on a plane, weighted by inverse squared distance
#[derive(Debug, Clone, Default)]
pub struct BlendTree2D {
    pub parameter_x: String,
    pub parameter_y: String,
    motions: Vec<Motion2D>,
}

impl BlendTree2D {
    pub fn new(parameter_x: impl Into<String>, parameter_y: impl Into<String>) -> Self {
        Self {
            parameter_x: parameter_x.into(),
            parameter_y: parameter_y.into(),
            motions: Vec::new(),
        }
    }

    pub fn with_motion(mut self, clip: Arc<AnimationClip>, position: Vec2) -> Self {
        self.add_motion(clip, position);
        self
    }

    pub fn add_motion(&mut self, clip: Arc<AnimationClip>, position: Vec2) {
        self.motions.push(Motion2D { clip, position });
    }

    pub fn motions(&self) -> &[Motion2D] {
        &self.motions
    }

    pub fn weights(&self, point: Vec2) -> Vec<f32> {
        let distances: Vec<f32> = self
            .motions
            .iter()
            .map(|m| m.position.distance(point))
            .collect();

        let mut weights = vec![0.0; distances.len()];
        if let Some(exact) = distances.iter().position(|&d| d < EXACT_MATCH_DISTANCE) {
            weights[exact] = 1.0;
            return weights;
        }

        let inverse: Vec<f32> = distances.iter().map(|d| 1.0 / (d * d)).collect();
        let total: f32 = inverse.iter().sum();
        if total > 0.0 {
            for (w, inv) in weights.iter_mut().zip(&inverse) {
                *w = inv / total;
            }
        }
        weights
    }
}

#[derive(Debug, Clone)]
enum BlendSpace {
    OneD(BlendTree1D),
    TwoD(BlendTree2D),
}

/// A 1D or 2D blend space together with its playback clocks.
///
/// In sync mode a single normalized phase drives every motion, scaled to
/// each clip's duration, so cycles stay phase-locked. Otherwise each motion
/// keeps its own clock.
#[derive(Debug, Clone)]
pub struct BlendTree {
    space: BlendSpace,
    pub sync: bool,
    phase: f32,
    times: Vec<f32>,
    weights: Vec<f32>,
}

impl BlendTree {
    pub fn one_d(tree: BlendTree1D, sync: bool) -> Self {
        let count = tree.motions.len();
        Self::with_space(BlendSpace::OneD(tree), count, sync)
    }

    pub fn two_d(tree: BlendTree2D, sync: bool) -> Self {
        let count = tree.motions.len();
        Self::with_space(BlendSpace::TwoD(tree), count, sync)
    }

    fn with_space(space: BlendSpace, count: usize, sync: bool) -> Self {
        let mut tree = Self {
            space,
            sync,
            phase: 0.0,
            times: vec![0.0; count],
            weights: vec![0.0; count],
        };
        if count > 0 {
            tree.weights[0] = 1.0;
        }
        tree
    }

    pub fn motion_count(&self) -> usize {
        self.times.len()
    }

    fn clip(&self, index: usize) -> &Arc<AnimationClip> {
        match &self.space {
            BlendSpace::OneD(t) => &t.motions[index].clip,
            BlendSpace::TwoD(t) => &t.motions[index].clip,
        }
    }

    pub fn clips(&self) -> Vec<Arc<AnimationClip>> {
        (0..self.motion_count()).map(|i| self.clip(i).clone()).collect()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        match &self.space {
            BlendSpace::OneD(t) => vec![t.parameter.as_str()],
            BlendSpace::TwoD(t) => vec![t.parameter_x.as_str(), t.parameter_y.as_str()],
        }
    }

    /// Recompute motion weights from the current parameter values
    pub fn update_weights(&mut self, params: &Parameters) {
        self.weights = match &self.space {
            BlendSpace::OneD(t) => t.weights(params.get_float(&t.parameter)),
            BlendSpace::TwoD(t) => t.weights(Vec2::new(
                params.get_float(&t.parameter_x),
                params.get_float(&t.parameter_y),
            )),
        };
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Weight-averaged duration of the active motions
    pub fn duration(&self) -> f32 {
        (0..self.motion_count())
            .map(|i| self.weights[i] * self.clip(i).duration)
            .sum()
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.times.iter_mut().for_each(|t| *t = 0.0);
    }

    pub fn advance(&mut self, dt: f32, looping: bool) {
        if self.sync {
            let duration = self.duration();
            if duration > 0.0 {
                self.phase += dt / duration;
            }
            self.phase = if looping {
                self.phase.rem_euclid(1.0)
            } else {
                self.phase.clamp(0.0, 1.0)
            };
        } else {
            for i in 0..self.times.len() {
                let d = self.clip(i).duration;
                let t = self.times[i] + dt;
                self.times[i] = if looping && d > 0.0 {
                    t.rem_euclid(d)
                } else {
                    t.clamp(0.0, d)
                };
            }
        }
    }

    /// Blend every weighted motion into `out`
    pub fn sample(&self, looping: bool, out: &mut Pose) {
        let bone_count = out.bone_count();
        let mut accumulator = PoseAccumulator::new(Pose::identity(bone_count));
        let mut scratch = Pose::identity(bone_count);
        for i in 0..self.motion_count() {
            let weight = self.weights[i];
            if weight <= 0.0 {
                continue;
            }
            let clip = self.clip(i);
            let time = if self.sync {
                self.phase * clip.duration
            } else {
                self.times[i]
            };
            clip.sample_with_mode(time, looping, &mut scratch);
            accumulator.add(&scratch, weight);
        }
        *out = accumulator.into_pose();
    }
}
