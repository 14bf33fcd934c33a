//! Kiln Animation - Skeletal animation pipeline
//!
//! Clips are sampled into per-bone poses, combined by one of several
//! drivers, post-processed by IK and written back to a [`Skeleton`]:
//!
//! 1. [`Animator`] crossfades between played clips
//! 2. [`StateMachine`] picks clips or [`BlendTree`]s from parameters
//! 3. [`LayerManager`] stacks masked override, additive and multiply layers
//! 4. [`IkManager`] runs two-bone, look-at, FABRIK and foot solvers
//!
//! The skeleton then evaluates model-space and skinning matrices in one
//! forward pass over its topologically ordered bones.

pub mod animator;
pub mod blend;
pub mod blend_tree;
pub mod clip;
pub mod ik;
pub mod layer;
pub mod params;
pub mod pose;
pub mod sampler;
pub mod skeleton;
pub mod state_machine;

pub use animator::{AnimationState, Animator, AnimatorEvent};
pub use blend_tree::{BlendTree, BlendTree1D, BlendTree2D};
pub use clip::{AnimationClip, BoneChannel, ClipEvent, ClipLibrary, Interpolation, Keyframe};
pub use ik::{FabrikChain, FootIk, IkManager, IkSolver, LookAtIk, TwoBoneIk};
pub use layer::{AnimationLayer, BoneMask, LayerBlendMode, LayerManager};
pub use params::{Parameter, Parameters};
pub use pose::Pose;
pub use skeleton::{Bone, Skeleton, MAX_BONES};
pub use state_machine::{
    Condition, ConditionMode, Motion, State, StateMachine, StateMachineEvent, Transition,
};
