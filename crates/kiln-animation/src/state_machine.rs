//! Parameter-driven animation state machine

use crate::blend::PoseAccumulator;
use crate::blend_tree::BlendTree;
use crate::clip::AnimationClip;
use crate::params::Parameters;
use crate::pose::Pose;
use crate::skeleton::Skeleton;
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

/// Comparison applied by a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionMode {
    If,
    IfNot,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

/// A test of one named parameter against a threshold
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub parameter: String,
    pub mode: ConditionMode,
    pub threshold: f32,
}

impl Condition {
    pub fn new(parameter: impl Into<String>, mode: ConditionMode, threshold: f32) -> Self {
        Self {
            parameter: parameter.into(),
            mode,
            threshold,
        }
    }

    /// Holds while a bool is true or a trigger is set
    pub fn is_set(parameter: impl Into<String>) -> Self {
        Self::new(parameter, ConditionMode::If, 0.0)
    }

    pub fn is_not_set(parameter: impl Into<String>) -> Self {
        Self::new(parameter, ConditionMode::IfNot, 0.0)
    }

    pub fn greater(parameter: impl Into<String>, threshold: f32) -> Self {
        Self::new(parameter, ConditionMode::Greater, threshold)
    }

    pub fn less(parameter: impl Into<String>, threshold: f32) -> Self {
        Self::new(parameter, ConditionMode::Less, threshold)
    }

    /// Unknown parameters never satisfy a condition
    pub fn evaluate(&self, params: &Parameters) -> bool {
        let Some(value) = params.get(&self.parameter) else {
            return false;
        };
        match self.mode {
            ConditionMode::If => value.as_bool(),
            ConditionMode::IfNot => !value.as_bool(),
            ConditionMode::Greater => value.as_f32() > self.threshold,
            ConditionMode::Less => value.as_f32() < self.threshold,
            ConditionMode::GreaterEqual => value.as_f32() >= self.threshold,
            ConditionMode::LessEqual => value.as_f32() <= self.threshold,
        }
    }
}

/// An edge to `target`, taken when every condition holds and the optional
/// exit-time gate (normalized source time) has been reached
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub target: String,
    pub conditions: Vec<Condition>,
    pub exit_time: Option<f32>,
    /// Crossfade duration in seconds
    pub duration: f32,
    pub priority: i32,
}

impl Transition {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            conditions: Vec::new(),
            exit_time: None,
            duration: 0.0,
            priority: 0,
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_exit_time(mut self, normalized: f32) -> Self {
        self.exit_time = Some(normalized.clamp(0.0, 1.0));
        self
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = seconds.max(0.0);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn can_fire(&self, normalized_time: f32, params: &Parameters) -> bool {
        if self.exit_time.is_some_and(|exit| normalized_time < exit) {
            return false;
        }
        self.conditions.iter().all(|c| c.evaluate(params))
    }
}

/// What a state plays
#[derive(Debug, Clone)]
pub enum Motion {
    Clip(Arc<AnimationClip>),
    BlendTree(BlendTree),
}

/// A node of the state machine
#[derive(Debug, Clone)]
pub struct State {
    pub name: String,
    pub motion: Motion,
    pub speed: f32,
    pub looping: bool,
    pub transitions: Vec<Transition>,
    /// Seconds since the state was entered, scaled by speed
    pub time: f32,
}

impl State {
    pub fn new(name: impl Into<String>, motion: Motion) -> Self {
        let looping = match &motion {
            Motion::Clip(clip) => clip.looping,
            Motion::BlendTree(_) => true,
        };
        Self {
            name: name.into(),
            motion,
            speed: 1.0,
            looping,
            transitions: Vec::new(),
            time: 0.0,
        }
    }

    pub fn clip(name: impl Into<String>, clip: Arc<AnimationClip>) -> Self {
        Self::new(name, Motion::Clip(clip))
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn duration(&self) -> f32 {
        match &self.motion {
            Motion::Clip(clip) => clip.duration,
            Motion::BlendTree(tree) => tree.duration(),
        }
    }

    /// Elapsed time over duration, not wrapped
    pub fn normalized_time(&self) -> f32 {
        let duration = self.duration();
        if duration > 0.0 {
            self.time / duration
        } else {
            1.0
        }
    }

    fn enter(&mut self) {
        self.time = 0.0;
        if let Motion::BlendTree(tree) = &mut self.motion {
            tree.reset();
        }
    }

    fn advance(&mut self, dt: f32, params: &Parameters) {
        let step = dt * self.speed;
        if let Motion::BlendTree(tree) = &mut self.motion {
            tree.update_weights(params);
            tree.advance(step, self.looping);
        }
        self.time += step;
    }

    fn sample(&self, out: &mut Pose) {
        match &self.motion {
            Motion::Clip(clip) => clip.sample_with_mode(self.time, self.looping, out),
            Motion::BlendTree(tree) => tree.sample(self.looping, out),
        }
    }
}

/// Notifications produced by [`StateMachine::update`]
#[derive(Debug, Clone, PartialEq)]
pub enum StateMachineEvent {
    Exited(String),
    Entered(String),
    TransitionFinished(String),
}

#[derive(Debug, Clone, Copy)]
struct Crossfade {
    from: usize,
    progress: f32,
    duration: f32,
}

type StateCallback = Box<dyn FnMut(&str)>;

/// Animation state machine.
///
/// Each update either advances an in-flight crossfade or advances the
/// current state and looks for a transition to fire: any-state transitions
/// first in insertion order, then the current state's transitions by
/// descending priority. Firing switches the current state immediately,
/// consumes the triggers the transition tested, and starts the crossfade.
pub struct StateMachine {
    states: Vec<State>,
    any_state: Vec<Transition>,
    parameters: Parameters,
    current: Option<usize>,
    crossfade: Option<Crossfade>,
    events: Vec<StateMachineEvent>,
    on_enter: Option<StateCallback>,
    on_exit: Option<StateCallback>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("states", &self.states.iter().map(|s| &s.name).collect::<Vec<_>>())
            .field("current", &self.current_state())
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            any_state: Vec::new(),
            parameters: Parameters::new(),
            current: None,
            crossfade: None,
            events: Vec::new(),
            on_enter: None,
            on_exit: None,
        }
    }

    fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    /// Add a state. The first state added becomes the entry state.
    pub fn add_state(&mut self, state: State) -> bool {
        if self.state_index(&state.name).is_some() {
            return false;
        }
        self.states.push(state);
        if self.current.is_none() {
            self.current = Some(self.states.len() - 1);
        }
        true
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn state_names(&self) -> Vec<&str> {
        self.states.iter().map(|s| s.name.as_str()).collect()
    }

    /// Add a transition out of `from`. Both states must exist.
    pub fn add_transition(&mut self, from: &str, transition: Transition) -> bool {
        if self.state_index(&transition.target).is_none() {
            return false;
        }
        match self.state_index(from) {
            Some(idx) => {
                self.states[idx].transitions.push(transition);
                true
            }
            None => false,
        }
    }

    /// Add a transition evaluated from whichever state is current
    pub fn add_any_state_transition(&mut self, transition: Transition) -> bool {
        if self.state_index(&transition.target).is_none() {
            return false;
        }
        self.any_state.push(transition);
        true
    }

    /// Choose the state entered before the first update
    pub fn set_entry_state(&mut self, name: &str) -> bool {
        match self.state_index(name) {
            Some(idx) => {
                self.current = Some(idx);
                self.crossfade = None;
                self.states[idx].enter();
                true
            }
            None => false,
        }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.parameters.set_float(name, value)
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        self.parameters.set_int(name, value)
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        self.parameters.set_bool(name, value)
    }

    pub fn set_trigger(&mut self, name: &str) -> bool {
        self.parameters.set_trigger(name)
    }

    pub fn get_float(&self, name: &str) -> f32 {
        self.parameters.get_float(name)
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.parameters.get_bool(name)
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current.map(|i| self.states[i].name.as_str())
    }

    pub fn is_in_transition(&self) -> bool {
        self.crossfade.is_some()
    }

    /// Crossfade progress in [0, 1], or `None` when no transition is running
    pub fn transition_progress(&self) -> Option<f32> {
        self.crossfade.map(|c| c.progress.min(1.0))
    }

    pub fn set_on_state_enter<F: FnMut(&str) + 'static>(&mut self, callback: F) {
        self.on_enter = Some(Box::new(callback));
    }

    pub fn set_on_state_exit<F: FnMut(&str) + 'static>(&mut self, callback: F) {
        self.on_exit = Some(Box::new(callback));
    }

    pub fn drain_events(&mut self) -> Vec<StateMachineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Jump straight to a state for debugging. Skips callbacks, crossfades
    /// and trigger consumption.
    pub fn force_state(&mut self, name: &str) -> bool {
        self.set_entry_state(name)
    }

    /// Advance one tick
    pub fn update(&mut self, dt: f32) {
        let Some(current) = self.current else {
            return;
        };

        if let Some(mut crossfade) = self.crossfade {
            crossfade.progress += if crossfade.duration > 0.0 {
                dt / crossfade.duration
            } else {
                1.0
            };
            self.states[crossfade.from].advance(dt, &self.parameters);
            self.states[current].advance(dt, &self.parameters);
            if crossfade.progress >= 1.0 {
                self.crossfade = None;
                self.events
                    .push(StateMachineEvent::TransitionFinished(self.states[current].name.clone()));
            } else {
                self.crossfade = Some(crossfade);
            }
            return;
        }

        self.states[current].advance(dt, &self.parameters);
        if let Some(transition) = self.select_transition(current) {
            self.fire(current, transition);
        }
    }

    fn select_transition(&self, current: usize) -> Option<Transition> {
        let state = &self.states[current];
        let normalized = state.normalized_time();

        let any = self
            .any_state
            .iter()
            .filter(|t| t.target != state.name)
            .find(|t| t.can_fire(normalized, &self.parameters));
        if let Some(t) = any {
            return Some(t.clone());
        }

        let mut ordered: Vec<&Transition> = state.transitions.iter().collect();
        ordered.sort_by_key(|t| Reverse(t.priority));
        ordered
            .into_iter()
            .find(|t| t.can_fire(normalized, &self.parameters))
            .cloned()
    }

    fn fire(&mut self, from: usize, transition: Transition) {
        let Some(target) = self.state_index(&transition.target) else {
            return;
        };
        for condition in &transition.conditions {
            self.parameters.reset_trigger(&condition.parameter);
        }

        let from_name = self.states[from].name.clone();
        let to_name = self.states[target].name.clone();
        log::debug!("State machine: {} -> {}", from_name, to_name);

        if let Some(callback) = self.on_exit.as_mut() {
            callback(&from_name);
        }
        self.events.push(StateMachineEvent::Exited(from_name));

        self.current = Some(target);
        self.states[target].enter();
        self.crossfade = (transition.duration > 0.0 && target != from).then_some(Crossfade {
            from,
            progress: 0.0,
            duration: transition.duration,
        });

        if let Some(callback) = self.on_enter.as_mut() {
            callback(&to_name);
        }
        self.events.push(StateMachineEvent::Entered(to_name));
    }

    /// The crossfade-weighted pose of the source and target states
    pub fn sample(&self, bind: &Pose) -> Pose {
        let mut accumulator = PoseAccumulator::new(bind.clone());
        let Some(current) = self.current else {
            return accumulator.into_pose();
        };
        let mut scratch = Pose::identity(bind.bone_count());
        match self.crossfade {
            Some(crossfade) => {
                let t = crossfade.progress.clamp(0.0, 1.0);
                self.states[crossfade.from].sample(&mut scratch);
                accumulator.add(&scratch, 1.0 - t);
                self.states[current].sample(&mut scratch);
                accumulator.add(&scratch, t);
            }
            None => {
                self.states[current].sample(&mut scratch);
                accumulator.add(&scratch, 1.0);
            }
        }
        accumulator.into_pose()
    }

    /// Write the current pose to the skeleton
    pub fn apply(&self, skeleton: &mut Skeleton) {
        let pose = self.sample(&Pose::bind(skeleton));
        pose.apply_to(skeleton);
    }

    /// `update` followed by `apply`
    pub fn tick(&mut self, dt: f32, skeleton: &mut Skeleton) {
        self.update(dt);
        self.apply(skeleton);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend_tree::BlendTree1D;
    use crate::clip::BoneChannel;
    use kiln_core::{Mat4, Transform, Vec3};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn one_bone() -> Skeleton {
        let mut s = Skeleton::new();
        s.add_bone("root", None, Transform::IDENTITY, Mat4::IDENTITY).unwrap();
        s
    }

    fn hold(name: &str, x: f32, duration: f32, looping: bool) -> Arc<AnimationClip> {
        let mut clip = AnimationClip::new(name, duration, looping)
            .with_channel(BoneChannel::new("root").position(0.0, Vec3::new(x, 0.0, 0.0)));
        clip.resolve_bones(&one_bone());
        Arc::new(clip)
    }

    fn idle_hit() -> StateMachine {
        let mut sm = StateMachine::new();
        sm.add_state(State::clip("Idle", hold("idle", 0.0, 1.0, true)));
        sm.add_state(State::clip("Hit", hold("hit", 1.0, 0.5, false)));
        sm.parameters_mut().add_trigger("OnHit");
        sm.add_transition("Idle", Transition::to("Hit").when(Condition::is_set("OnHit")));
        sm
    }

    #[test]
    fn trigger_fires_and_is_consumed() {
        let mut sm = idle_hit();
        assert_eq!(sm.current_state(), Some("Idle"));
        sm.set_trigger("OnHit");
        sm.update(1.0 / 60.0);
        assert_eq!(sm.current_state(), Some("Hit"));
        assert!(!sm.get_bool("OnHit"));
    }

    #[test]
    fn trigger_consumed_by_one_transition_only() {
        let mut sm = idle_hit();
        sm.add_transition("Hit", Transition::to("Idle").when(Condition::is_set("OnHit")));
        sm.set_trigger("OnHit");
        sm.update(0.01);
        sm.update(0.01);
        assert_eq!(sm.current_state(), Some("Hit"));
    }

    #[test]
    fn higher_priority_wins() {
        let mut sm = StateMachine::new();
        sm.add_state(State::clip("Start", hold("s", 0.0, 1.0, true)));
        sm.add_state(State::clip("Low", hold("l", 1.0, 1.0, true)));
        sm.add_state(State::clip("High", hold("h", 2.0, 1.0, true)));
        sm.set_bool("go", true);
        sm.add_transition("Start", Transition::to("Low").when(Condition::is_set("go")).with_priority(0));
        sm.add_transition("Start", Transition::to("High").when(Condition::is_set("go")).with_priority(10));
        sm.update(0.1);
        assert_eq!(sm.current_state(), Some("High"));
    }

    #[test]
    fn any_state_preempts() {
        let mut sm = idle_hit();
        sm.add_state(State::clip("Dead", hold("dead", 5.0, 1.0, false)));
        sm.add_any_state_transition(Transition::to("Dead").when(Condition::less("health", 0.0)));
        sm.set_float("health", -1.0);
        sm.set_trigger("OnHit");
        sm.update(0.1);
        assert_eq!(sm.current_state(), Some("Dead"));
        // The any-state transition did not test OnHit, so it stays set
        assert!(sm.get_bool("OnHit"));
        sm.update(0.1);
        assert_eq!(sm.current_state(), Some("Dead"));
    }

    #[test]
    fn exit_time_gates_transition() {
        let mut sm = StateMachine::new();
        sm.add_state(State::clip("Attack", hold("attack", 1.0, 1.0, false)));
        sm.add_state(State::clip("Recover", hold("recover", 0.0, 1.0, false)));
        sm.add_transition("Attack", Transition::to("Recover").with_exit_time(0.8));
        sm.update(0.5);
        assert_eq!(sm.current_state(), Some("Attack"));
        sm.update(0.35);
        assert_eq!(sm.current_state(), Some("Recover"));
    }

    #[test]
    fn crossfade_blends_pose() {
        let mut sm = idle_hit();
        sm.add_transition("Idle", Transition::to("Hit").when(Condition::greater("x", 0.5)).with_duration(0.2));
        let mut skeleton = one_bone();
        sm.set_float("x", 1.0);
        sm.tick(0.01, &mut skeleton);
        assert_eq!(sm.current_state(), Some("Hit"));
        assert_eq!(sm.transition_progress(), Some(0.0));
        assert!(skeleton.local_transform(0).position.x.abs() < 1e-5);

        sm.tick(0.1, &mut skeleton);
        assert!((skeleton.local_transform(0).position.x - 0.5).abs() < 1e-4);
        sm.tick(0.1, &mut skeleton);
        assert!(!sm.is_in_transition());
        assert!((skeleton.local_transform(0).position.x - 1.0).abs() < 1e-5);
        assert!(sm
            .drain_events()
            .contains(&StateMachineEvent::TransitionFinished("Hit".into())));
    }

    #[test]
    fn callbacks_fire_on_transition() {
        let mut sm = idle_hit();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (enter_log, exit_log) = (log.clone(), log.clone());
        sm.set_on_state_enter(move |s| enter_log.borrow_mut().push(format!("enter {s}")));
        sm.set_on_state_exit(move |s| exit_log.borrow_mut().push(format!("exit {s}")));
        sm.set_trigger("OnHit");
        sm.update(0.01);
        assert_eq!(*log.borrow(), vec!["exit Idle".to_string(), "enter Hit".to_string()]);
    }

    #[test]
    fn force_state_skips_bookkeeping() {
        let mut sm = idle_hit();
        sm.set_trigger("OnHit");
        assert!(sm.force_state("Hit"));
        assert_eq!(sm.current_state(), Some("Hit"));
        assert!(sm.get_bool("OnHit"));
        assert!(sm.drain_events().is_empty());
        assert!(!sm.force_state("Nowhere"));
    }

    #[test]
    fn unknown_targets_are_rejected() {
        let mut sm = idle_hit();
        assert!(!sm.add_transition("Idle", Transition::to("Missing")));
        assert!(!sm.add_transition("Missing", Transition::to("Idle")));
        assert!(!sm.add_state(State::clip("Idle", hold("dup", 0.0, 1.0, true))));
    }

    #[test]
    fn blend_tree_state_reads_parameters() {
        let tree = BlendTree1D::new("speed")
            .with_motion(hold("walk", 1.0, 1.0, true), 0.0)
            .with_motion(hold("run", 3.0, 1.0, true), 1.0);
        let mut sm = StateMachine::new();
        sm.add_state(State::new("Move", Motion::BlendTree(BlendTree::one_d(tree, true))));
        sm.set_float("speed", 0.5);
        let mut skeleton = one_bone();
        sm.tick(0.1, &mut skeleton);
        assert!((skeleton.local_transform(0).position.x - 2.0).abs() < 1e-4);
    }
}
