//! Model loading for the editor.
//!
//! Decoded model files live in the shared [`AssetCache`] as [`ModelSource`]
//! payloads. The [`ModelLibrary`] keeps a handle per path in use, uploads
//! each file's meshes once, and falls back to the renderer's own loader
//! when no decoder is registered.

use kiln_animation::{AnimationClip, Skeleton};
use kiln_asset::{AssetCache, AssetHandle, AssetKind, LoadedAsset};
use kiln_render::{MeshData, Model, Renderer, Vertex};
use kiln_scene::{ModelAsset, ModelLoader};
use std::collections::{HashMap, HashSet};
use std::mem::size_of;

/// What a model decoder produces for one file
#[derive(Debug, Clone, Default)]
pub struct ModelSource {
    pub meshes: Vec<MeshData>,
    pub skeleton: Option<Skeleton>,
    pub clips: Vec<AnimationClip>,
}

impl ModelSource {
    pub fn new(meshes: Vec<MeshData>) -> Self {
        Self {
            meshes,
            skeleton: None,
            clips: Vec::new(),
        }
    }

    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = Some(skeleton);
        self
    }

    pub fn with_clip(mut self, clip: AnimationClip) -> Self {
        self.clips.push(clip);
        self
    }

    /// Approximate memory footprint of the geometry
    pub fn size_bytes(&self) -> usize {
        self.meshes
            .iter()
            .map(|m| m.vertices.len() * size_of::<Vertex>() + m.indices.len() * size_of::<u32>())
            .sum()
    }
}

#[derive(Debug)]
struct LibraryEntry {
    handle: AssetHandle<ModelSource>,
    model: Model,
}

/// Models currently referenced by the editor, keyed by path
#[derive(Debug, Default)]
pub struct ModelLibrary {
    entries: HashMap<String, LibraryEntry>,
    decoder_registered: bool,
}

impl ModelLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the decoder that turns model files into [`ModelSource`]s
    pub fn register_decoder<F>(&mut self, cache: &AssetCache, decode: F)
    where
        F: Fn(&str) -> Option<ModelSource> + Send + Sync + 'static,
    {
        cache.register_loader(AssetKind::Model, move |path| {
            decode(path).map(|source| {
                let size = source.size_bytes();
                LoadedAsset::new(source, size)
            })
        });
        self.decoder_registered = true;
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder_registered
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Drop the handles of models no longer in `used`, letting the cache
    /// evict them. Returns how many were released.
    pub fn retain_used(&mut self, used: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| used.contains(path));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// A [`ModelLoader`] bound to this library, a cache and a renderer
    pub fn loader<'a, R: Renderer + ?Sized>(
        &'a mut self,
        cache: &'a AssetCache,
        renderer: &'a mut R,
    ) -> EditorModelLoader<'a, R> {
        EditorModelLoader {
            library: self,
            cache,
            renderer,
        }
    }
}

/// Resolves model paths for scene loading and model import
pub struct EditorModelLoader<'a, R: Renderer + ?Sized> {
    library: &'a mut ModelLibrary,
    cache: &'a AssetCache,
    renderer: &'a mut R,
}

impl<R: Renderer + ?Sized> EditorModelLoader<'_, R> {
    fn from_cache(&mut self, path: &str) -> Option<ModelAsset> {
        let handle = self.cache.load::<ModelSource>(path, AssetKind::Model)?;
        let entry = match self.library.entries.remove(path) {
            Some(entry) => entry,
            None => {
                let mut model = Model::new(path);
                for mesh in &handle.meshes {
                    model.meshes.push(self.renderer.upload_mesh(mesh));
                }
                model.fit_bounds(&handle.meshes);
                model.skinned = handle.meshes.iter().any(MeshData::is_skinned);
                log::info!("Uploaded {} ({} meshes)", path, model.meshes.len());
                LibraryEntry { handle, model }
            }
        };

        let source = &entry.handle;
        let mut asset = ModelAsset::new(entry.model.clone());
        if let Some(skeleton) = &source.skeleton {
            asset = asset.with_skeleton(skeleton.clone());
        }
        for clip in &source.clips {
            asset = asset.with_clip(clip.clone());
        }
        self.library.entries.insert(path.to_string(), entry);
        Some(asset)
    }
}

impl<R: Renderer + ?Sized> ModelLoader for EditorModelLoader<'_, R> {
    fn load_model(&mut self, path: &str) -> Option<ModelAsset> {
        if path.trim().is_empty() {
            return None;
        }
        if self.library.decoder_registered {
            return self.from_cache(path);
        }
        let mut model = Model::new(path);
        self.renderer
            .load_model_async(path, &mut model)
            .then(|| ModelAsset::new(model))
    }
}
