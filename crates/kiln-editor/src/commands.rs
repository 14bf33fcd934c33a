//! Undoable scene edits

use crate::command::Command;
use kiln_animation::{Animator, ClipLibrary, IkManager, LayerManager, Skeleton, StateMachine};
use kiln_core::{EntityId, Transform};
use kiln_render::{Light, Material, Model};
use kiln_scene::SceneGraph;
use std::any::Any;
use std::sync::Arc;

/// Everything needed to put a removed entity back where it was.
///
/// Children are not captured; restoring brings back the entity alone.
#[derive(Debug)]
struct EntitySnapshot {
    id: EntityId,
    name: String,
    enabled: bool,
    transform: Transform,
    parent: Option<EntityId>,
    sibling_index: Option<usize>,
    model: Option<Model>,
    material: Option<Arc<Material>>,
    light: Option<Light>,
    skeleton: Option<Skeleton>,
    animator: Option<Animator>,
    state_machine: Option<StateMachine>,
    layers: Option<LayerManager>,
    ik: Option<IkManager>,
    clips: ClipLibrary,
}

impl EntitySnapshot {
    /// Move an entity's state out of the scene and destroy it with its subtree
    fn take(scene: &mut SceneGraph, id: EntityId) -> Option<Self> {
        let parent = scene.parent(id);
        let sibling_index = scene.sibling_index(id);
        let entity = scene.get_mut(id)?;
        let snapshot = Self {
            id,
            name: entity.name.clone(),
            enabled: entity.enabled,
            transform: entity.transform,
            parent,
            sibling_index,
            model: entity.model.take(),
            material: entity.material.take(),
            light: entity.light.take(),
            skeleton: entity.skeleton.take(),
            animator: entity.animator.take(),
            state_machine: entity.state_machine.take(),
            layers: entity.layers.take(),
            ik: entity.ik.take(),
            clips: std::mem::take(&mut entity.clips),
        };
        scene.destroy_entity(id);
        Some(snapshot)
    }

    fn restore(self, scene: &mut SceneGraph) -> bool {
        if scene.create_entity_with_id(self.id, self.name).is_none() {
            log::warn!("Cannot restore entity {}: id is taken", self.id);
            return false;
        }
        if let Some(parent) = self.parent.filter(|p| scene.contains(*p)) {
            scene.set_parent_at(self.id, Some(parent), self.sibling_index);
        } else {
            scene.set_parent_at(self.id, None, self.sibling_index);
        }
        if let Some(entity) = scene.get_mut(self.id) {
            entity.enabled = self.enabled;
            entity.transform = self.transform;
            entity.model = self.model;
            entity.material = self.material;
            entity.light = self.light;
            entity.skeleton = self.skeleton;
            entity.animator = self.animator;
            entity.state_machine = self.state_machine;
            entity.layers = self.layers;
            entity.ik = self.ik;
            entity.clips = self.clips;
        }
        true
    }
}

fn entity_name(scene: &SceneGraph, id: EntityId) -> String {
    scene
        .get(id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Change an entity's local transform.
///
/// Consecutive commands on the same entity with the same session id merge,
/// so a whole gizmo drag undoes in one step.
#[derive(Debug, Clone)]
pub struct TransformCommand {
    entity: EntityId,
    old: Transform,
    new: Transform,
    session: u64,
}

impl TransformCommand {
    pub fn new(entity: EntityId, old: Transform, new: Transform) -> Self {
        Self {
            entity,
            old,
            new,
            session: 0,
        }
    }

    pub fn with_session(mut self, session: u64) -> Self {
        self.session = session;
        self
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn old_transform(&self) -> Transform {
        self.old
    }

    pub fn new_transform(&self) -> Transform {
        self.new
    }
}

impl Command for TransformCommand {
    fn execute(&mut self, scene: &mut SceneGraph) {
        if let Some(e) = scene.get_mut(self.entity) {
            e.transform = self.new;
        }
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        if let Some(e) = scene.get_mut(self.entity) {
            e.transform = self.old;
        }
    }

    fn type_tag(&self) -> &'static str {
        "transform"
    }

    fn description(&self) -> String {
        format!("Transform {}", self.entity)
    }

    fn merge_with(&mut self, previous: &dyn Command) -> bool {
        match previous.as_any().downcast_ref::<TransformCommand>() {
            Some(prev) if prev.entity == self.entity && prev.session == self.session => {
                self.old = prev.old;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Create a named entity, optionally under a parent
#[derive(Debug)]
pub struct CreateEntityCommand {
    name: String,
    parent: Option<EntityId>,
    transform: Transform,
    created: Option<EntityId>,
    snapshot: Option<EntitySnapshot>,
}

impl CreateEntityCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            transform: Transform::IDENTITY,
            created: None,
            snapshot: None,
        }
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Id of the created entity once executed
    pub fn created(&self) -> Option<EntityId> {
        self.created
    }
}

impl Command for CreateEntityCommand {
    fn execute(&mut self, scene: &mut SceneGraph) {
        if let Some(snapshot) = self.snapshot.take() {
            snapshot.restore(scene);
            return;
        }
        let id = scene.create_entity(self.name.clone());
        if let Some(e) = scene.get_mut(id) {
            e.transform = self.transform;
        }
        if self.parent.is_some() {
            scene.set_parent(id, self.parent);
        }
        self.created = Some(id);
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        if let Some(id) = self.created {
            self.snapshot = EntitySnapshot::take(scene, id);
        }
    }

    fn type_tag(&self) -> &'static str {
        "create"
    }

    fn description(&self) -> String {
        format!("Create {}", self.name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Delete an entity and its subtree. Undo restores the entity itself, with
/// its components and place in the hierarchy, but not its children.
#[derive(Debug)]
pub struct DeleteEntityCommand {
    entity: EntityId,
    name: String,
    snapshot: Option<EntitySnapshot>,
    removed: usize,
}

impl DeleteEntityCommand {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            name: entity.to_string(),
            snapshot: None,
            removed: 0,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Entities removed by the last execute, root included
    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl Command for DeleteEntityCommand {
    fn execute(&mut self, scene: &mut SceneGraph) {
        self.name = entity_name(scene, self.entity);
        self.removed = 1 + scene.descendants(self.entity).len();
        self.snapshot = EntitySnapshot::take(scene, self.entity);
        if self.snapshot.is_none() {
            self.removed = 0;
        }
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        if let Some(snapshot) = self.snapshot.take() {
            snapshot.restore(scene);
        }
    }

    fn type_tag(&self) -> &'static str {
        "delete"
    }

    fn description(&self) -> String {
        format!("Delete {}", self.name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Duplicate an entity (without children) next to the original
#[derive(Debug)]
pub struct DuplicateEntityCommand {
    source: EntityId,
    copy: Option<EntityId>,
    snapshot: Option<EntitySnapshot>,
}

impl DuplicateEntityCommand {
    pub fn new(source: EntityId) -> Self {
        Self {
            source,
            copy: None,
            snapshot: None,
        }
    }

    pub fn copy(&self) -> Option<EntityId> {
        self.copy
    }
}

impl Command for DuplicateEntityCommand {
    fn execute(&mut self, scene: &mut SceneGraph) {
        if let Some(snapshot) = self.snapshot.take() {
            snapshot.restore(scene);
            return;
        }
        self.copy = scene.duplicate_entity(self.source);
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        if let Some(copy) = self.copy {
            self.snapshot = EntitySnapshot::take(scene, copy);
        }
    }

    fn type_tag(&self) -> &'static str {
        "duplicate"
    }

    fn description(&self) -> String {
        format!("Duplicate {}", self.source)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct RenameEntityCommand {
    entity: EntityId,
    old: Option<String>,
    new: String,
}

impl RenameEntityCommand {
    pub fn new(entity: EntityId, name: impl Into<String>) -> Self {
        Self {
            entity,
            old: None,
            new: name.into(),
        }
    }
}

impl Command for RenameEntityCommand {
    fn execute(&mut self, scene: &mut SceneGraph) {
        if let Some(e) = scene.get_mut(self.entity) {
            let previous = std::mem::replace(&mut e.name, self.new.clone());
            self.old.get_or_insert(previous);
        }
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        if let (Some(e), Some(old)) = (scene.get_mut(self.entity), &self.old) {
            e.name = old.clone();
        }
    }

    fn type_tag(&self) -> &'static str {
        "rename"
    }

    fn description(&self) -> String {
        format!("Rename to {}", self.new)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Move an entity under a new parent (or to the roots). Local transforms
/// are kept as they are.
#[derive(Debug, Clone)]
pub struct SetParentCommand {
    child: EntityId,
    parent: Option<EntityId>,
    previous: Option<(Option<EntityId>, Option<usize>)>,
}

impl SetParentCommand {
    pub fn new(child: EntityId, parent: Option<EntityId>) -> Self {
        Self {
            child,
            parent,
            previous: None,
        }
    }

    /// False when the last execute was rejected
    pub fn applied(&self) -> bool {
        self.previous.is_some()
    }
}

impl Command for SetParentCommand {
    fn execute(&mut self, scene: &mut SceneGraph) {
        let old_parent = scene.parent(self.child);
        let old_index = scene.sibling_index(self.child);
        self.previous = scene
            .set_parent(self.child, self.parent)
            .then_some((old_parent, old_index));
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        if let Some((parent, index)) = self.previous {
            scene.set_parent_at(self.child, parent, index);
        }
    }

    fn type_tag(&self) -> &'static str {
        "set_parent"
    }

    fn description(&self) -> String {
        match self.parent {
            Some(p) => format!("Parent {} to {}", self.child, p),
            None => format!("Unparent {}", self.child),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct SetEnabledCommand {
    entity: EntityId,
    enabled: bool,
    old: Option<bool>,
}

impl SetEnabledCommand {
    pub fn new(entity: EntityId, enabled: bool) -> Self {
        Self {
            entity,
            enabled,
            old: None,
        }
    }
}

impl Command for SetEnabledCommand {
    fn execute(&mut self, scene: &mut SceneGraph) {
        if let Some(e) = scene.get_mut(self.entity) {
            self.old = Some(e.enabled);
            e.enabled = self.enabled;
        }
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        if let (Some(e), Some(old)) = (scene.get_mut(self.entity), self.old) {
            e.enabled = old;
        }
    }

    fn type_tag(&self) -> &'static str {
        "set_enabled"
    }

    fn description(&self) -> String {
        let verb = if self.enabled { "Enable" } else { "Disable" };
        format!("{} {}", verb, self.entity)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
