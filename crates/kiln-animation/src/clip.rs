//! Keyframe clip data and sampling into poses

use crate::pose::Pose;
use crate::sampler::sample_keys;
use crate::skeleton::Skeleton;
use kiln_core::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Interpolation mode between keyframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    #[serde(rename = "cubicspline")]
    CubicSpline,
}

/// A single keyframe with optional per-second Hermite tangents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
    pub in_tangent: Option<T>,
    pub out_tangent: Option<T>,
}

impl<T> Keyframe<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            in_tangent: None,
            out_tangent: None,
        }
    }

    pub fn with_tangents(mut self, in_tangent: T, out_tangent: T) -> Self {
        self.in_tangent = Some(in_tangent);
        self.out_tangent = Some(out_tangent);
        self
    }
}

fn insert_sorted<T>(keys: &mut Vec<Keyframe<T>>, key: Keyframe<T>) {
    let idx = keys.partition_point(|k| k.time <= key.time);
    keys.insert(idx, key);
}

/// Keyframes for one bone. The name is resolved to an index once per skeleton.
#[derive(Debug, Clone, Default)]
pub struct BoneChannel {
    pub bone_name: String,
    pub bone_index: Option<usize>,
    pub interpolation: Interpolation,
    pub positions: Vec<Keyframe<Vec3>>,
    pub rotations: Vec<Keyframe<Quat>>,
    pub scales: Vec<Keyframe<Vec3>>,
}

impl BoneChannel {
    pub fn new(bone_name: impl Into<String>) -> Self {
        Self {
            bone_name: bone_name.into(),
            ..Default::default()
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn position(mut self, time: f32, value: Vec3) -> Self {
        self.add_position(Keyframe::new(time, value));
        self
    }

    pub fn rotation(mut self, time: f32, value: Quat) -> Self {
        self.add_rotation(Keyframe::new(time, value));
        self
    }

    pub fn scale(mut self, time: f32, value: Vec3) -> Self {
        self.add_scale(Keyframe::new(time, value));
        self
    }

    pub fn add_position(&mut self, key: Keyframe<Vec3>) {
        insert_sorted(&mut self.positions, key);
    }

    pub fn add_rotation(&mut self, key: Keyframe<Quat>) {
        insert_sorted(&mut self.rotations, key);
    }

    pub fn add_scale(&mut self, key: Keyframe<Vec3>) {
        insert_sorted(&mut self.scales, key);
    }

    /// Last keyed time across all three sequences
    pub fn end_time(&self) -> f32 {
        let last = |t: Option<f32>| t.unwrap_or(0.0);
        last(self.positions.last().map(|k| k.time))
            .max(last(self.rotations.last().map(|k| k.time)))
            .max(last(self.scales.last().map(|k| k.time)))
    }
}

/// A named marker at a clip-local time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipEvent {
    pub time: f32,
    pub name: String,
}

/// Keyframed animation for a skeleton
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds
    pub duration: f32,
    pub ticks_per_second: f32,
    pub looping: bool,
    pub channels: Vec<BoneChannel>,
    pub events: Vec<ClipEvent>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32, looping: bool) -> Self {
        Self {
            name: name.into(),
            duration: duration.max(0.0),
            ticks_per_second: 30.0,
            looping,
            channels: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_channel(mut self, channel: BoneChannel) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_event(mut self, time: f32, name: impl Into<String>) -> Self {
        self.add_event(time, name);
        self
    }

    pub fn add_event(&mut self, time: f32, name: impl Into<String>) {
        let event = ClipEvent {
            time,
            name: name.into(),
        };
        let idx = self.events.partition_point(|e| e.time <= time);
        self.events.insert(idx, event);
    }

    /// Extend the duration to cover the last keyframe if it was left at zero
    pub fn fit_duration(&mut self) {
        let end = self
            .channels
            .iter()
            .map(BoneChannel::end_time)
            .fold(0.0f32, f32::max);
        if self.duration <= 0.0 {
            self.duration = end;
        }
    }

    /// Bind channel names to bone indices. Returns how many channels resolved.
    pub fn resolve_bones(&mut self, skeleton: &Skeleton) -> usize {
        let mut resolved = 0;
        for channel in &mut self.channels {
            channel.bone_index = skeleton.bone_index(&channel.bone_name);
            match channel.bone_index {
                Some(_) => resolved += 1,
                None => log::debug!(
                    "Clip '{}': no bone named '{}'",
                    self.name,
                    channel.bone_name
                ),
            }
        }
        resolved
    }

    /// Map an arbitrary time into the clip's range: wrapped when looping,
    /// clamped otherwise
    pub fn local_time(&self, time: f32, looping: bool) -> f32 {
        let d = self.duration;
        if looping && d > 0.0 {
            ((time % d) + d) % d
        } else {
            time.clamp(0.0, d.max(0.0))
        }
    }

    /// Sample every channel into a fresh pose of `bone_count` bones
    pub fn sample(&self, time: f32, bone_count: usize) -> Pose {
        let mut pose = Pose::identity(bone_count);
        self.sample_with_mode(time, self.looping, &mut pose);
        pose
    }

    /// Sample into an existing pose, resetting it to identity first
    pub fn sample_into(&self, time: f32, pose: &mut Pose) {
        self.sample_with_mode(time, self.looping, pose);
    }

    /// Sample with an explicit loop flag, overriding the clip's own
    pub fn sample_with_mode(&self, time: f32, looping: bool, pose: &mut Pose) {
        let bone_count = pose.bone_count();
        pose.reset_identity(bone_count);
        let t = self.local_time(time, looping);

        for channel in &self.channels {
            let Some(bone) = channel.bone_index.filter(|&b| b < bone_count) else {
                continue;
            };
            if let Some(p) = sample_keys(&channel.positions, channel.interpolation, t) {
                pose.positions[bone] = p;
            }
            if let Some(r) = sample_keys(&channel.rotations, channel.interpolation, t) {
                pose.rotations[bone] = r;
            }
            if let Some(s) = sample_keys(&channel.scales, channel.interpolation, t) {
                pose.scales[bone] = s;
            }
        }
    }

    /// Events crossed when clip time moves from `from` to `to`.
    /// `wrapped` means playback passed the loop point in between.
    pub fn events_between(&self, from: f32, to: f32, wrapped: bool) -> Vec<&ClipEvent> {
        self.events
            .iter()
            .filter(|e| {
                if wrapped {
                    e.time > from || e.time <= to
                } else {
                    e.time > from && e.time <= to
                }
            })
            .collect()
    }
}

/// Named clips shared between an entity and its animation drivers
#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    clips: BTreeMap<String, Arc<AnimationClip>>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clip, replacing one with the same name
    pub fn insert(&mut self, clip: AnimationClip) -> Arc<AnimationClip> {
        let clip = Arc::new(clip);
        self.clips.insert(clip.name.clone(), clip.clone());
        clip
    }

    pub fn insert_shared(&mut self, clip: Arc<AnimationClip>) {
        self.clips.insert(clip.name.clone(), clip);
    }

    pub fn get(&self, name: &str) -> Option<Arc<AnimationClip>> {
        self.clips.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<AnimationClip>> {
        self.clips.remove(name)
    }

    /// Clip names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.clips.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AnimationClip>> {
        self.clips.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{Mat4, Transform};

    fn skeleton() -> Skeleton {
        let mut s = Skeleton::new();
        s.add_bone("root", None, Transform::IDENTITY, Mat4::IDENTITY).unwrap();
        s.add_bone("spine", Some(0), Transform::IDENTITY, Mat4::IDENTITY).unwrap();
        s
    }

    fn walk(looping: bool) -> AnimationClip {
        let mut clip = AnimationClip::new("walk", 2.0, looping).with_channel(
            BoneChannel::new("spine")
                .position(0.0, Vec3::ZERO)
                .position(2.0, Vec3::new(4.0, 0.0, 0.0))
                .rotation(0.0, Quat::IDENTITY)
                .rotation(2.0, Quat::from_rotation_y(1.0)),
        );
        clip.resolve_bones(&skeleton());
        clip
    }

    #[test]
    fn untouched_bones_stay_identity() {
        let pose = walk(false).sample(1.0, 2);
        assert_eq!(pose.positions[0], Vec3::ZERO);
        assert_eq!(pose.rotations[0], Quat::IDENTITY);
        assert_eq!(pose.scales[1], Vec3::ONE);
        assert!(pose.positions[1].abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn looping_sample_is_periodic() {
        let clip = walk(true);
        for &t in &[0.25f32, 0.5, 1.5, -0.75] {
            let a = clip.sample(t, 2);
            let b = clip.sample(t + clip.duration, 2);
            assert!(a.positions[1].abs_diff_eq(b.positions[1], 1e-4), "t = {t}");
            assert!(a.rotations[1].abs_diff_eq(b.rotations[1], 1e-4));
        }
    }

    #[test]
    fn non_looping_clamps_past_end() {
        let clip = walk(false);
        let end = clip.sample(clip.duration, 2);
        for &t in &[2.0f32, 2.5, 10.0] {
            assert_eq!(clip.sample(t, 2), end);
        }
    }

    #[test]
    fn unresolved_channels_are_skipped() {
        let mut clip = AnimationClip::new("ghost", 1.0, false)
            .with_channel(BoneChannel::new("tail").position(0.0, Vec3::ONE));
        assert_eq!(clip.resolve_bones(&skeleton()), 0);
        let pose = clip.sample(0.5, 2);
        assert_eq!(pose, Pose::identity(2));
    }

    #[test]
    fn keys_are_kept_sorted() {
        let channel = BoneChannel::new("root")
            .position(1.0, Vec3::ONE)
            .position(0.0, Vec3::ZERO);
        assert_eq!(channel.positions[0].time, 0.0);
        assert_eq!(channel.end_time(), 1.0);
    }

    #[test]
    fn events_between_handles_wrap() {
        let clip = walk(true).with_event(0.5, "step_l").with_event(1.5, "step_r");
        let names = |v: Vec<&ClipEvent>| v.into_iter().map(|e| e.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(clip.events_between(0.0, 1.0, false)), vec!["step_l"]);
        assert_eq!(names(clip.events_between(1.0, 0.6, true)), vec!["step_l", "step_r"]);
        assert!(clip.events_between(0.6, 1.4, false).is_empty());
    }

    #[test]
    fn library_lookup() {
        let mut lib = ClipLibrary::new();
        lib.insert(walk(true));
        lib.insert(AnimationClip::new("idle", 1.0, true));
        assert_eq!(lib.names(), vec!["idle".to_string(), "walk".to_string()]);
        assert!(lib.get("walk").unwrap().looping);
        assert!(lib.get("run").is_none());
    }

    #[test]
    fn interpolation_serde_names() {
        let json = serde_json::to_string(&Interpolation::CubicSpline).unwrap();
        assert_eq!(json, "\"cubicspline\"");
    }
}
