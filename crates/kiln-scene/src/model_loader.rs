//! The hook scene loading uses to turn model paths back into models

use kiln_animation::{AnimationClip, Skeleton};
use kiln_render::Model;

/// Everything a model file yields: geometry, and for rigged files a
/// skeleton plus its clips
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub model: Model,
    pub skeleton: Option<Skeleton>,
    pub clips: Vec<AnimationClip>,
}

impl ModelAsset {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            skeleton: None,
            clips: Vec::new(),
        }
    }

    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.model.skinned = true;
        self.skeleton = Some(skeleton);
        self
    }

    pub fn with_clip(mut self, clip: AnimationClip) -> Self {
        self.clips.push(clip);
        self
    }
}

/// Resolves a model path found in a scene document. Returning `None`
/// leaves the entity without a model.
pub trait ModelLoader {
    fn load_model(&mut self, path: &str) -> Option<ModelAsset>;
}

impl<F> ModelLoader for F
where
    F: FnMut(&str) -> Option<ModelAsset>,
{
    fn load_model(&mut self, path: &str) -> Option<ModelAsset> {
        self(path)
    }
}

/// Stands a unit-radius model in for every non-empty path. Useful for
/// inspecting documents without the model files at hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderLoader;

impl ModelLoader for PlaceholderLoader {
    fn load_model(&mut self, path: &str) -> Option<ModelAsset> {
        (!path.is_empty()).then(|| ModelAsset::new(Model::new(path)))
    }
}

/// Fails every load
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModels;

impl ModelLoader for NoModels {
    fn load_model(&mut self, _path: &str) -> Option<ModelAsset> {
        None
    }
}
