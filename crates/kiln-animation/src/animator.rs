//! Crossfading clip player

use crate::blend::PoseAccumulator;
use crate::clip::AnimationClip;
use crate::pose::Pose;
use crate::skeleton::Skeleton;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BlendPhase {
    Steady,
    In { elapsed: f32, duration: f32 },
    Out { elapsed: f32, duration: f32, from_weight: f32 },
}

/// One clip being played by an [`Animator`]
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub clip: Arc<AnimationClip>,
    /// Clip-local time in seconds
    pub time: f32,
    pub speed: f32,
    /// Current blend weight in [0, 1]
    pub weight: f32,
    pub playing: bool,
    pub looping: bool,
    phase: BlendPhase,
}

impl AnimationState {
    fn new(clip: Arc<AnimationClip>, crossfade: f32, speed: f32, looping: bool) -> Self {
        let (weight, phase) = if crossfade > 0.0 {
            (
                0.0,
                BlendPhase::In {
                    elapsed: 0.0,
                    duration: crossfade,
                },
            )
        } else {
            (1.0, BlendPhase::Steady)
        };
        Self {
            clip,
            time: 0.0,
            speed,
            weight,
            playing: true,
            looping,
            phase,
        }
    }

    pub fn name(&self) -> &str {
        &self.clip.name
    }

    pub fn is_blending_in(&self) -> bool {
        matches!(self.phase, BlendPhase::In { .. })
    }

    pub fn is_blending_out(&self) -> bool {
        matches!(self.phase, BlendPhase::Out { .. })
    }

    /// Advance blend progress; returns false once a blend-out has completed
    fn advance_blend(&mut self, dt: f32) -> bool {
        match &mut self.phase {
            BlendPhase::Steady => true,
            BlendPhase::In { elapsed, duration } => {
                *elapsed += dt;
                if *elapsed >= *duration {
                    self.weight = 1.0;
                    self.phase = BlendPhase::Steady;
                } else {
                    self.weight = *elapsed / *duration;
                }
                true
            }
            BlendPhase::Out {
                elapsed,
                duration,
                from_weight,
            } => {
                *elapsed += dt;
                if *elapsed >= *duration {
                    self.weight = 0.0;
                    false
                } else {
                    self.weight = *from_weight * (1.0 - *elapsed / *duration);
                    true
                }
            }
        }
    }
}

/// Notifications produced while the animator advances
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatorEvent {
    /// A clip event marker was crossed
    Clip { clip: String, name: String },
    /// A non-looping clip reached its end
    Finished { clip: String },
}

/// Plays clips on a skeleton with weighted crossfades.
///
/// Every played clip becomes an active state. Starting a new clip fades the
/// older ones out; each update folds the states' samples with the
/// incremental weighted blend, so weights always normalize to one.
pub struct Animator {
    states: Vec<AnimationState>,
    global_speed: f32,
    paused: bool,
    accumulator: PoseAccumulator,
    scratch: Pose,
    events: Vec<AnimatorEvent>,
    on_finished: Option<Box<dyn FnMut(&str)>>,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Animator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animator")
            .field("states", &self.states)
            .field("global_speed", &self.global_speed)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

impl Animator {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            global_speed: 1.0,
            paused: false,
            accumulator: PoseAccumulator::default(),
            scratch: Pose::default(),
            events: Vec::new(),
            on_finished: None,
        }
    }

    /// Play a clip at normal speed with the clip's own loop flag
    pub fn play(&mut self, clip: Arc<AnimationClip>, crossfade: f32) -> bool {
        let looping = clip.looping;
        self.play_with(clip, crossfade, 1.0, looping)
    }

    /// Fade every current state out over `crossfade` seconds and start `clip`.
    ///
    /// Replaying the clip that is already the newest active state is a no-op
    /// and returns false.
    pub fn play_with(&mut self, clip: Arc<AnimationClip>, crossfade: f32, speed: f32, looping: bool) -> bool {
        let already_current = self
            .states
            .iter()
            .rev()
            .find(|s| !s.is_blending_out())
            .is_some_and(|s| s.clip.name == clip.name && s.playing);
        if already_current {
            return false;
        }

        let crossfade = crossfade.max(0.0);
        for state in &mut self.states {
            if !state.is_blending_out() {
                state.phase = BlendPhase::Out {
                    elapsed: 0.0,
                    duration: crossfade,
                    from_weight: state.weight,
                };
            }
        }
        log::debug!("Animator: play '{}' (crossfade {:.2}s)", clip.name, crossfade);
        self.states
            .push(AnimationState::new(clip, crossfade, speed, looping));
        true
    }

    /// Drop every state; the next update writes the bind pose
    pub fn stop(&mut self) {
        self.states.clear();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_global_speed(&mut self, speed: f32) {
        self.global_speed = speed;
    }

    pub fn global_speed(&self) -> f32 {
        self.global_speed
    }

    /// Set the speed of every non-fading state playing `name`
    pub fn set_speed(&mut self, name: &str, speed: f32) -> bool {
        let mut found = false;
        for state in self.states.iter_mut().filter(|s| s.name() == name && !s.is_blending_out()) {
            state.speed = speed;
            found = true;
        }
        found
    }

    pub fn is_playing(&self, name: &str) -> bool {
        self.states
            .iter()
            .any(|s| s.name() == name && s.playing && !s.is_blending_out())
    }

    /// Name of the newest state that is not fading out
    pub fn current_clip(&self) -> Option<&str> {
        self.states
            .iter()
            .rev()
            .find(|s| !s.is_blending_out())
            .map(|s| s.name())
    }

    pub fn states(&self) -> &[AnimationState] {
        &self.states
    }

    /// Register a callback invoked with the clip name when a non-looping clip ends
    pub fn set_on_finished<F: FnMut(&str) + 'static>(&mut self, callback: F) {
        self.on_finished = Some(Box::new(callback));
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<AnimatorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance blends and clip clocks by `dt`, then write the blended pose
    /// to the skeleton as new local TRS.
    pub fn update(&mut self, dt: f32, skeleton: &mut Skeleton) {
        if !self.paused {
            self.states.retain_mut(|s| s.advance_blend(dt));
            self.advance_clocks(dt);
        }

        let bind = Pose::bind(skeleton);
        self.accumulator.reset(&bind);
        self.scratch.reset_identity(skeleton.bone_count());
        for state in self.states.iter().filter(|s| s.weight > 0.0) {
            state
                .clip
                .sample_with_mode(state.time, state.looping, &mut self.scratch);
            self.accumulator.add(&self.scratch, state.weight);
        }
        self.accumulator.pose.apply_to(skeleton);
    }

    fn advance_clocks(&mut self, dt: f32) {
        let mut finished = Vec::new();
        for state in self.states.iter_mut().filter(|s| s.playing) {
            let clip = &state.clip;
            let duration = clip.duration;
            let previous = state.time;
            let raw = previous + dt * state.speed * self.global_speed;

            if state.looping && duration <= 0.0 {
                // A looping single-key pose holds forever
                state.time = 0.0;
                continue;
            }

            let mut crossed = Vec::new();
            if state.looping {
                let cycles = (raw / duration).floor();
                state.time = raw.rem_euclid(duration);
                if raw >= previous {
                    if cycles < 1.0 {
                        crossed.extend(clip.events_between(previous, state.time, false));
                    } else {
                        crossed.extend(clip.events.iter().filter(|e| e.time > previous));
                        for _ in 1..cycles as usize {
                            crossed.extend(clip.events.iter());
                        }
                        crossed.extend(clip.events.iter().filter(|e| e.time <= state.time));
                    }
                }
            } else {
                state.time = raw.clamp(0.0, duration.max(0.0));
                if raw >= previous {
                    crossed.extend(clip.events_between(previous, state.time, false));
                }
                if raw >= duration || raw < 0.0 {
                    state.playing = false;
                    finished.push(clip.name.clone());
                }
            }

            for event in crossed {
                self.events.push(AnimatorEvent::Clip {
                    clip: clip.name.clone(),
                    name: event.name.clone(),
                });
            }
        }

        for name in finished {
            if let Some(callback) = self.on_finished.as_mut() {
                callback(&name);
            }
            self.events.push(AnimatorEvent::Finished { clip: name });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::BoneChannel;
    use kiln_core::{Mat4, Transform, Vec3};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn one_bone() -> Skeleton {
        let mut s = Skeleton::new();
        s.add_bone("root", None, Transform::IDENTITY, Mat4::IDENTITY).unwrap();
        s
    }

    fn hold(name: &str, x: f32, looping: bool) -> Arc<AnimationClip> {
        let mut clip = AnimationClip::new(name, 1.0, looping).with_channel(
            BoneChannel::new("root")
                .position(0.0, Vec3::new(x, 0.0, 0.0))
                .position(1.0, Vec3::new(x, 0.0, 0.0)),
        );
        clip.resolve_bones(&one_bone());
        Arc::new(clip)
    }

    fn root_x(skeleton: &Skeleton) -> f32 {
        skeleton.local_transform(0).position.x
    }

    #[test]
    fn crossfade_is_monotonic() {
        let mut skeleton = one_bone();
        let mut animator = Animator::new();
        animator.play(hold("a", 0.0, false), 0.0);
        animator.play(hold("b", 10.0, false), 0.5);

        animator.update(0.0, &mut skeleton);
        assert!(root_x(&skeleton).abs() < 1e-3);
        animator.update(0.25, &mut skeleton);
        assert!((root_x(&skeleton) - 5.0).abs() < 1e-3);
        animator.update(0.25, &mut skeleton);
        assert!((root_x(&skeleton) - 10.0).abs() < 1e-3);
        assert_eq!(animator.states().len(), 1);
        assert_eq!(animator.current_clip(), Some("b"));
    }

    #[test]
    fn overlapping_fades_normalize_weights() {
        let mut skeleton = one_bone();
        let mut animator = Animator::new();
        animator.play(hold("a", 0.0, true), 0.0);
        animator.play(hold("b", 1.0, true), 1.0);
        animator.update(0.3, &mut skeleton);
        animator.play(hold("c", 2.0, true), 1.0);
        animator.update(0.2, &mut skeleton);

        // a: 0.5, b: 0.3 * 0.8, c: 0.2
        let weights: Vec<f32> = animator.states().iter().map(|s| s.weight).collect();
        assert_eq!(weights.len(), 3);
        let total: f32 = weights.iter().sum();
        let normalized: Vec<f32> = weights.iter().map(|w| w / total).collect();
        assert!((normalized.iter().sum::<f32>() - 1.0).abs() < 1e-4);

        let expected = normalized[1] * 1.0 + normalized[2] * 2.0;
        assert!((root_x(&skeleton) - expected).abs() < 1e-4);
    }

    #[test]
    fn replaying_same_clip_is_noop() {
        let mut skeleton = one_bone();
        let mut animator = Animator::new();
        let walk = hold("walk", 3.0, true);
        assert!(animator.play(walk.clone(), 0.2));
        animator.update(0.1, &mut skeleton);
        let before = skeleton.local_transform(0);
        assert!(!animator.play(walk, 0.2));
        assert_eq!(animator.states().len(), 1);
        assert_eq!(skeleton.local_transform(0), before);
    }

    #[test]
    fn non_looping_finishes_once() {
        let mut skeleton = one_bone();
        let mut animator = Animator::new();
        let finished = Rc::new(RefCell::new(Vec::new()));
        let sink = finished.clone();
        animator.set_on_finished(move |name| sink.borrow_mut().push(name.to_string()));

        animator.play(hold("jump", 1.0, false), 0.0);
        animator.update(0.6, &mut skeleton);
        animator.update(0.6, &mut skeleton);
        animator.update(0.6, &mut skeleton);

        assert_eq!(*finished.borrow(), vec!["jump".to_string()]);
        assert!(!animator.is_playing("jump"));
        assert_eq!(
            animator.drain_events(),
            vec![AnimatorEvent::Finished { clip: "jump".into() }]
        );
        assert_eq!(animator.states()[0].time, 1.0);
    }

    #[test]
    fn clip_events_fire_each_loop() {
        let mut skeleton = one_bone();
        let mut animator = Animator::new();
        let mut clip = (*hold("run", 0.0, true)).clone();
        clip.add_event(0.5, "footstep");
        animator.play(Arc::new(clip), 0.0);

        animator.update(0.6, &mut skeleton);
        animator.update(0.2, &mut skeleton);
        animator.update(0.8, &mut skeleton);
        let steps = animator
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, AnimatorEvent::Clip { name, .. } if name == "footstep"))
            .count();
        assert_eq!(steps, 2);
    }

    #[test]
    fn long_step_fires_event_for_every_loop_crossed() {
        let mut skeleton = one_bone();
        let mut animator = Animator::new();
        let mut clip = (*hold("run", 0.0, true)).clone();
        clip.add_event(0.5, "footstep");
        animator.play(Arc::new(clip), 0.0);

        animator.update(2.6, &mut skeleton);
        let steps = animator
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, AnimatorEvent::Clip { name, .. } if name == "footstep"))
            .count();
        assert_eq!(steps, 3);
        assert!((animator.states()[0].time - 0.6).abs() < 1e-5);
    }

    #[test]
    fn looping_zero_length_pose_keeps_playing() {
        let mut skeleton = one_bone();
        let mut animator = Animator::new();
        let mut pose = AnimationClip::new("pose", 0.0, true)
            .with_channel(BoneChannel::new("root").position(0.0, Vec3::new(2.0, 0.0, 0.0)));
        pose.resolve_bones(&skeleton);
        animator.play(Arc::new(pose), 0.0);

        animator.update(0.1, &mut skeleton);
        animator.update(0.1, &mut skeleton);
        assert!(animator.is_playing("pose"));
        assert_eq!(animator.states()[0].time, 0.0);
        assert!(animator.drain_events().is_empty());
        assert!((root_x(&skeleton) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn pause_and_global_speed() {
        let mut skeleton = one_bone();
        let mut animator = Animator::new();
        animator.play(hold("idle", 0.0, true), 0.0);
        animator.pause();
        animator.update(0.5, &mut skeleton);
        assert_eq!(animator.states()[0].time, 0.0);
        animator.resume();
        animator.set_global_speed(2.0);
        animator.update(0.25, &mut skeleton);
        assert!((animator.states()[0].time - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stop_returns_to_bind_pose() {
        let mut skeleton = Skeleton::new();
        skeleton
            .add_bone("root", None, Transform::from_position(Vec3::Y), Mat4::IDENTITY)
            .unwrap();
        let mut animator = Animator::new();
        animator.play(hold("a", 4.0, true), 0.0);
        animator.update(0.1, &mut skeleton);
        assert!((root_x(&skeleton) - 4.0).abs() < 1e-5);
        animator.stop();
        animator.update(0.1, &mut skeleton);
        assert_eq!(skeleton.local_transform(0).position, Vec3::Y);
        assert_eq!(animator.current_clip(), None);
    }
}
