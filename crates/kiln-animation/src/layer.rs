//! Masked animation layers combined with override, additive or multiply blending

use crate::clip::AnimationClip;
use crate::pose::Pose;
use crate::skeleton::{Skeleton, MAX_BONES};
use kiln_core::math::{lerp_vec3, slerp};
use kiln_core::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a layer combines with the layers below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerBlendMode {
    #[default]
    Override,
    Additive,
    Multiply,
}

/// Bitset over bone indices. An empty mask affects every bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoneMask {
    bits: [u64; MAX_BONES / 64],
}

impl BoneMask {
    /// The empty mask, which means all bones
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve bone names against a skeleton; unknown names are skipped
    pub fn from_names<S: AsRef<str>>(skeleton: &Skeleton, names: &[S]) -> Self {
        let mut mask = Self::default();
        for name in names {
            match skeleton.bone_index(name.as_ref()) {
                Some(index) => mask.insert(index),
                None => log::debug!("Bone mask: no bone named '{}'", name.as_ref()),
            }
        }
        mask
    }

    /// Mask a bone and every bone below it
    pub fn from_subtree(skeleton: &Skeleton, root: &str) -> Self {
        let mut mask = Self::default();
        let Some(root) = skeleton.bone_index(root) else {
            return mask;
        };
        mask.insert(root);
        // Topological order means a parent is always visited first
        for i in root + 1..skeleton.bone_count() {
            if skeleton.parent(i).is_some_and(|p| mask.contains(p)) {
                mask.insert(i);
            }
        }
        mask
    }

    pub fn insert(&mut self, bone: usize) {
        if bone < MAX_BONES {
            self.bits[bone / 64] |= 1 << (bone % 64);
        }
    }

    pub fn remove(&mut self, bone: usize) {
        if bone < MAX_BONES {
            self.bits[bone / 64] &= !(1 << (bone % 64));
        }
    }

    pub fn contains(&self, bone: usize) -> bool {
        bone < MAX_BONES && self.bits[bone / 64] & (1 << (bone % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|b| *b == 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// 1 for bones the layer affects, 0 otherwise
    pub fn weight(&self, bone: usize) -> f32 {
        if self.is_empty() || self.contains(bone) {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
struct LayerClip {
    clip: Arc<AnimationClip>,
    time: f32,
}

impl LayerClip {
    fn advance(&mut self, dt: f32) {
        let duration = self.clip.duration;
        self.time += dt;
        self.time = if self.clip.looping && duration > 0.0 {
            self.time.rem_euclid(duration)
        } else {
            self.time.clamp(0.0, duration)
        };
    }
}

/// One layer of a [`LayerManager`]
#[derive(Debug, Clone)]
pub struct AnimationLayer {
    pub name: String,
    pub weight: f32,
    pub blend_mode: LayerBlendMode,
    pub mask: BoneMask,
    pub speed: f32,
    current: Option<LayerClip>,
    previous: Option<LayerClip>,
    blend_elapsed: f32,
    blend_duration: f32,
}

impl AnimationLayer {
    pub fn new(name: impl Into<String>, blend_mode: LayerBlendMode) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            blend_mode,
            mask: BoneMask::all(),
            speed: 1.0,
            current: None,
            previous: None,
            blend_elapsed: 0.0,
            blend_duration: 0.0,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }

    pub fn with_mask(mut self, mask: BoneMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn current_clip(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.clip.name.as_str())
    }

    pub fn is_transitioning(&self) -> bool {
        self.previous.is_some()
    }

    /// Switch to `clip`, crossfading from the current one over `crossfade` seconds
    pub fn play(&mut self, clip: Arc<AnimationClip>, crossfade: f32) {
        if crossfade > 0.0 && self.current.is_some() {
            self.previous = self.current.take();
            self.blend_elapsed = 0.0;
            self.blend_duration = crossfade;
        } else {
            self.previous = None;
        }
        self.current = Some(LayerClip { clip, time: 0.0 });
    }

    pub fn stop(&mut self) {
        self.current = None;
        self.previous = None;
    }

    fn advance(&mut self, dt: f32) {
        let step = dt * self.speed;
        if let Some(current) = &mut self.current {
            current.advance(step);
        }
        if let Some(previous) = &mut self.previous {
            previous.advance(step);
            self.blend_elapsed += dt;
            if self.blend_elapsed >= self.blend_duration {
                self.previous = None;
            }
        }
    }

    /// Sample the layer, crossfading with the previous clip if one is fading out
    fn sample(&self, bone_count: usize) -> Option<Pose> {
        let current = self.current.as_ref()?;
        let mut pose = current.clip.sample(current.time, bone_count);
        if let Some(previous) = &self.previous {
            let t = (self.blend_elapsed / self.blend_duration).clamp(0.0, 1.0);
            let old = previous.clip.sample(previous.time, bone_count);
            pose = crate::blend::blend_poses(&old, &pose, t);
        }
        Some(pose)
    }

    fn combine(&self, acc: &mut Pose, sample: &Pose) {
        let count = acc.bone_count().min(sample.bone_count());
        for i in 0..count {
            let w = self.weight * self.mask.weight(i);
            if w <= 0.0 {
                continue;
            }
            match self.blend_mode {
                LayerBlendMode::Override => {
                    acc.positions[i] = lerp_vec3(acc.positions[i], sample.positions[i], w);
                    acc.rotations[i] = slerp(acc.rotations[i], sample.rotations[i], w);
                    acc.scales[i] = lerp_vec3(acc.scales[i], sample.scales[i], w);
                }
                LayerBlendMode::Additive => {
                    acc.positions[i] += sample.positions[i] * w;
                    acc.rotations[i] =
                        (slerp(Quat::IDENTITY, sample.rotations[i], w) * acc.rotations[i]).normalize();
                    acc.scales[i] *= lerp_vec3(Vec3::ONE, sample.scales[i], w);
                }
                LayerBlendMode::Multiply => {
                    acc.positions[i] *= lerp_vec3(Vec3::ONE, sample.positions[i], w);
                    acc.scales[i] *= lerp_vec3(Vec3::ONE, sample.scales[i], w);
                }
            }
        }
    }
}

/// Ordered stack of layers evaluated bottom to top
#[derive(Debug, Clone, Default)]
pub struct LayerManager {
    layers: Vec<AnimationLayer>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer on top. Names must be unique.
    pub fn add_layer(&mut self, layer: AnimationLayer) -> bool {
        if self.layer(&layer.name).is_some() {
            return false;
        }
        self.layers.push(layer);
        true
    }

    pub fn remove_layer(&mut self, name: &str) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.name != name);
        self.layers.len() != before
    }

    pub fn layer(&self, name: &str) -> Option<&AnimationLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut AnimationLayer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    pub fn layers(&self) -> &[AnimationLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn play(&mut self, layer: &str, clip: Arc<AnimationClip>, crossfade: f32) -> bool {
        match self.layer_mut(layer) {
            Some(l) => {
                l.play(clip, crossfade);
                true
            }
            None => false,
        }
    }

    pub fn set_weight(&mut self, layer: &str, weight: f32) -> bool {
        match self.layer_mut(layer) {
            Some(l) => {
                l.weight = weight.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Advance every layer's clocks and stack the layers onto `base`
    pub fn evaluate(&mut self, dt: f32, base: &mut Pose) {
        let bone_count = base.bone_count();
        for layer in &mut self.layers {
            layer.advance(dt);
            if let Some(sample) = layer.sample(bone_count) {
                layer.combine(base, &sample);
            }
        }
    }

    /// Evaluate from the bind pose and write the result to the skeleton
    pub fn update(&mut self, dt: f32, skeleton: &mut Skeleton) {
        let mut pose = Pose::bind(skeleton);
        self.evaluate(dt, &mut pose);
        pose.apply_to(skeleton);
    }

    /// Evaluate on top of whatever pose the skeleton currently holds
    pub fn update_on_current(&mut self, dt: f32, skeleton: &mut Skeleton) {
        let mut pose = Pose::current(skeleton);
        self.evaluate(dt, &mut pose);
        pose.apply_to(skeleton);
    }
}
