//! The scene graph: entity storage, hierarchy, selection and clipboard

use crate::entity::Entity;
use kiln_core::{Aabb, EntityId, EntityIdAllocator, Mat4, Vec3};
use std::collections::HashMap;
use std::fmt;

/// Owns every entity in a scene.
///
/// Entities live in an id-keyed map; the hierarchy is stored as parent ids
/// plus ordered child lists, and the parent relation is kept acyclic.
#[derive(Debug)]
pub struct SceneGraph {
    name: String,
    entities: HashMap<EntityId, Entity>,
    /// Creation order, for stable iteration
    order: Vec<EntityId>,
    roots: Vec<EntityId>,
    selection: Vec<EntityId>,
    clipboard: Vec<EntityId>,
    ids: EntityIdAllocator,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            name: "Untitled".to_string(),
            entities: HashMap::new(),
            order: Vec::new(),
            roots: Vec::new(),
            selection: Vec::new(),
            clipboard: Vec::new(),
            ids: EntityIdAllocator::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Create a root entity with a fresh id. Returns [`EntityId::NONE`]
    /// without creating anything once the id space is exhausted.
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.ids.allocate();
        if id.is_valid() {
            self.insert(Entity::new(id, name));
        }
        id
    }

    /// Create a root entity with a caller-chosen id, as when loading a
    /// document or undoing a delete. Fails on the null id or a taken id.
    pub fn create_entity_with_id(&mut self, id: EntityId, name: impl Into<String>) -> Option<EntityId> {
        if !id.is_valid() || self.entities.contains_key(&id) {
            return None;
        }
        self.ids.ensure_above(id);
        self.insert(Entity::new(id, name));
        Some(id)
    }

    fn insert(&mut self, entity: Entity) {
        let id = entity.id();
        self.entities.insert(id, entity);
        self.order.push(id);
        self.roots.push(id);
    }

    /// Destroy an entity and its whole subtree. Returns how many entities
    /// were removed.
    pub fn destroy_entity(&mut self, id: EntityId) -> usize {
        let Some(entity) = self.entities.get(&id) else {
            return 0;
        };
        let parent = entity.parent;
        match parent.and_then(|p| self.entities.get_mut(&p)) {
            Some(parent) => parent.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }

        let doomed = self.subtree(id);
        for gone in &doomed {
            self.entities.remove(gone);
        }
        self.order.retain(|e| self.entities.contains_key(e));
        self.roots.retain(|e| self.entities.contains_key(e));
        self.selection.retain(|e| self.entities.contains_key(e));
        self.clipboard.retain(|e| self.entities.contains_key(e));
        log::debug!("Destroyed {} entities under {}", doomed.len(), id);
        doomed.len()
    }

    /// `id` followed by all its descendants, depth first
    fn subtree(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(entity) = self.entities.get(&next) {
                out.push(next);
                stack.extend(entity.children.iter().rev());
            }
        }
        out
    }

    /// Remove every entity and reset selection, clipboard and id allocation
    pub fn clear(&mut self) {
        self.entities.clear();
        self.order.clear();
        self.roots.clear();
        self.selection.clear();
        self.clipboard.clear();
        self.ids.reset();
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids in creation order
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Entities in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.entities
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(&id).and_then(|e| e.parent)
    }

    /// Position of `id` within its parent's children, or among the roots
    pub fn sibling_index(&self, id: EntityId) -> Option<usize> {
        let entity = self.entities.get(&id)?;
        let siblings = match entity.parent {
            Some(p) => self.children(p),
            None => &self.roots,
        };
        siblings.iter().position(|s| *s == id)
    }

    /// True when `ancestor` lies strictly above `id` in the hierarchy
    pub fn is_descendant_of(&self, id: EntityId, ancestor: EntityId) -> bool {
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.parent(p);
        }
        false
    }

    /// All entities below `id`, depth first
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        let mut all = self.subtree(id);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    /// Number of ancestors above `id`
    pub fn depth(&self, id: EntityId) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            depth += 1;
            cursor = self.parent(p);
        }
        depth
    }

    /// Reparent `child` under `parent`, or to the root list with `None`.
    ///
    /// Rejects unknown ids, self-parenting and any edge that would create a
    /// cycle; a rejected call leaves both entities untouched.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> bool {
        self.set_parent_at(child, parent, None)
    }

    /// Like [`SceneGraph::set_parent`] but inserts at a sibling index
    /// instead of appending
    pub fn set_parent_at(&mut self, child: EntityId, parent: Option<EntityId>, index: Option<usize>) -> bool {
        if !self.entities.contains_key(&child) {
            return false;
        }
        if let Some(p) = parent {
            if !self.entities.contains_key(&p) {
                return false;
            }
            if p == child || self.is_descendant_of(p, child) {
                log::warn!("Rejected reparenting {} under {}: would create a cycle", child, p);
                return false;
            }
        }

        let old_parent = self.parent(child);
        match old_parent.and_then(|p| self.entities.get_mut(&p)) {
            Some(old) => old.children.retain(|c| *c != child),
            None => self.roots.retain(|r| *r != child),
        }

        let siblings = match parent.and_then(|p| self.entities.get_mut(&p)) {
            Some(new_parent) => &mut new_parent.children,
            None => &mut self.roots,
        };
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, child);

        if let Some(entity) = self.entities.get_mut(&child) {
            entity.parent = parent;
        }
        true
    }

    /// Copy an entity's transform, model, material and light into a new
    /// sibling named "<name> (Copy)". Children are not copied.
    pub fn duplicate_entity(&mut self, id: EntityId) -> Option<EntityId> {
        let source = self.entities.get(&id)?;
        let name = format!("{} (Copy)", source.name);
        let enabled = source.enabled;
        let transform = source.transform;
        let model = source.model.clone();
        let material = source.material.clone();
        let light = source.light.clone();
        let parent = source.parent;

        let copy = self.create_entity(name);
        if let Some(entity) = self.entities.get_mut(&copy) {
            entity.enabled = enabled;
            entity.transform = transform;
            entity.model = model;
            entity.material = material;
            entity.light = light;
        }
        if parent.is_some() {
            self.set_parent(copy, parent);
        }
        Some(copy)
    }

    /// First entity in creation order with this name
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.iter().find(|e| e.name == name).map(|e| e.id())
    }

    pub fn world_position(&self, id: EntityId) -> Option<Vec3> {
        self.entities.get(&id).map(|e| e.world_position())
    }

    /// Recompute every world matrix from the roots down
    pub fn update_all_world_matrices(&mut self) {
        let mut stack: Vec<(EntityId, Mat4)> =
            self.roots.iter().rev().map(|r| (*r, Mat4::IDENTITY)).collect();
        while let Some((id, parent_world)) = stack.pop() {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            let world = parent_world * entity.local_matrix();
            entity.world_matrix = world;
            stack.extend(entity.children.iter().rev().map(|c| (*c, world)));
        }
    }

    /// Advance animation on every enabled entity
    pub fn update_animation(&mut self, dt: f32) {
        for entity in self.entities.values_mut().filter(|e| e.enabled) {
            entity.update_animation(dt);
        }
    }

    /// Union of all enabled model bounds as (center, radius); the unit
    /// sphere at the origin when nothing has a model
    pub fn bounds(&self) -> (Vec3, f32) {
        let bounds = self
            .iter()
            .filter(|e| e.enabled)
            .filter_map(Entity::world_bounds)
            .reduce(|a, b| Aabb::from_min_max(a.min.min(b.min), a.max.max(b.max)));
        match bounds {
            Some(b) => (b.center(), b.half_extents().length().max(1e-3)),
            None => (Vec3::ZERO, 1.0),
        }
    }

    // Selection

    /// Select an entity. Without `additive` the previous selection is replaced.
    pub fn select(&mut self, id: EntityId, additive: bool) -> bool {
        if !self.entities.contains_key(&id) {
            return false;
        }
        if !additive {
            self.selection.clear();
        }
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
        true
    }

    pub fn deselect(&mut self, id: EntityId) {
        self.selection.retain(|s| *s != id);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &[EntityId] {
        &self.selection
    }

    pub fn is_selected(&self, id: EntityId) -> bool {
        self.selection.contains(&id)
    }

    /// Most recently selected entity
    pub fn primary_selection(&self) -> Option<EntityId> {
        self.selection.last().copied()
    }

    // Clipboard

    pub fn copy_selection(&mut self) -> usize {
        self.clipboard = self.selection.clone();
        self.clipboard.len()
    }

    pub fn clipboard(&self) -> &[EntityId] {
        &self.clipboard
    }

    /// Duplicate every clipboard entity and select the copies
    pub fn paste(&mut self) -> Vec<EntityId> {
        let sources = self.clipboard.clone();
        let copies: Vec<EntityId> = sources
            .into_iter()
            .filter_map(|id| self.duplicate_entity(id))
            .collect();
        self.selection = copies.clone();
        copies
    }

    /// Entity count, depth and model paths for quick inspection
    pub fn summary(&self) -> SceneSummary {
        let mut model_paths: Vec<String> = self
            .iter()
            .filter_map(|e| e.model_path().map(String::from))
            .collect();
        model_paths.sort();
        model_paths.dedup();
        SceneSummary {
            name: self.name.clone(),
            entity_count: self.entity_count(),
            root_count: self.roots.len(),
            max_depth: self.order.iter().map(|id| self.depth(*id) + 1).max().unwrap_or(0),
            skinned_count: self.iter().filter(|e| e.has_skeleton()).count(),
            model_paths,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub name: String,
    pub entity_count: usize,
    pub root_count: usize,
    /// Levels in the hierarchy; a scene of only roots has depth 1
    pub max_depth: usize,
    pub skinned_count: usize,
    pub model_paths: Vec<String>,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scene: {}", self.name)?;
        writeln!(f, "  Entities: {} ({} roots)", self.entity_count, self.root_count)?;
        writeln!(f, "  Hierarchy depth: {}", self.max_depth)?;
        writeln!(f, "  Skinned: {}", self.skinned_count)?;
        write!(f, "  Models: {}", self.model_paths.len())?;
        for path in &self.model_paths {
            write!(f, "\n    {}", path)?;
        }
        Ok(())
    }
}
