//! The editor loop.
//!
//! One [`Editor::tick`] runs a frame in a fixed order: drain input, apply
//! queued commands and model loads, advance animation (animators, state
//! machines, layers, IK), propagate world matrices, then submit the frame
//! to the renderer. Everything here runs on the editor thread.

use crate::assets::{ModelLibrary, ModelSource};
use crate::command::{Command, CommandHistory};
use crate::commands::{CreateEntityCommand, DeleteEntityCommand, DuplicateEntityCommand, TransformCommand};
use crate::config::EditorConfig;
use crate::gizmo::{Gizmo, GizmoMode, GizmoTarget, SnapSettings};
use crate::input::{shortcut, EditorAction, InputEvent, InputState, Modifiers, MouseButton};
use crate::picking::pick_entity;
use crate::projection::screen_to_world_ray;
use crate::viewport::Viewport;
use kiln_asset::{AssetCache, LoadQueue, LoadRequester};
use kiln_core::{Color, EntityId, Mat4, Ray, Transform};
use kiln_render::{fill_post_process_constants, PostProcessSettings, Renderer, WindowHandle};
use kiln_scene::{ModelLoader, SceneGraph};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SELECTION_COLOR: Color = Color::new(1.0, 0.6, 0.1, 1.0);
/// Gizmo handle length as a fraction of the eye distance
const GIZMO_SCALE: f32 = 0.15;
const GRID_SPACING: f32 = 1.0;

enum EditOp {
    Execute(Box<dyn Command>),
    Undo,
    Redo,
}

/// Counters for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub events: usize,
    pub commands: usize,
    pub models_loaded: usize,
    pub entities: usize,
    pub draws: usize,
    pub skinned_draws: usize,
    pub shadow_casters: usize,
    pub gizmo_lines: usize,
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    entity: EntityId,
    start: Transform,
    session: u64,
    moved: bool,
}

/// Editor state plus the renderer it drives
pub struct Editor<R: Renderer> {
    renderer: R,
    config: EditorConfig,
    scene: SceneGraph,
    history: CommandHistory,
    gizmo: Gizmo,
    viewport: Viewport,
    input: InputState,
    assets: Arc<AssetCache>,
    models: ModelLibrary,
    load_queue: LoadQueue,
    post_process: PostProcessSettings,
    ops: VecDeque<EditOp>,
    drag: Option<ActiveDrag>,
    drag_sessions: u64,
    scene_path: Option<PathBuf>,
    renderer_error: Option<String>,
    initialized: bool,
    time: f32,
    frame: u64,
    last_stats: FrameStats,
}

impl<R: Renderer> Editor<R> {
    pub fn new(renderer: R, config: EditorConfig) -> Self {
        Self::with_assets(renderer, config, Arc::new(AssetCache::new()))
    }

    /// Build an editor around an existing asset cache
    pub fn with_assets(renderer: R, config: EditorConfig, assets: Arc<AssetCache>) -> Self {
        assets.set_unused_timeout(config.assets.unused_timeout());
        assets.set_max_size(Some(config.assets.max_cache_bytes));

        let mut gizmo = Gizmo::new();
        gizmo.snap = SnapSettings {
            enabled: config.gizmo.snap,
            translate: config.gizmo.translate_snap,
            rotate: config.gizmo.rotate_snap,
            scale: config.gizmo.scale_snap,
        };
        let mut viewport = Viewport::new(&config.camera, 1280, 720);
        viewport.show_grid = config.viewport.show_grid;

        Self {
            renderer,
            history: CommandHistory::new(config.history.max_undo),
            config,
            scene: SceneGraph::new(),
            gizmo,
            viewport,
            input: InputState::new(),
            assets,
            models: ModelLibrary::new(),
            load_queue: LoadQueue::new(),
            post_process: PostProcessSettings::default(),
            ops: VecDeque::new(),
            drag: None,
            drag_sessions: 0,
            scene_path: None,
            renderer_error: None,
            initialized: false,
            time: 0.0,
            frame: 0,
            last_stats: FrameStats::default(),
        }
    }

    /// Bring up the renderer for a window
    pub fn initialize(&mut self, window: WindowHandle, width: u32, height: u32) -> bool {
        self.viewport.resize(width, height);
        if !self.renderer.initialize(window, width, height) {
            log::error!("Renderer failed to initialize");
            return false;
        }
        self.renderer.set_shader_hot_reload(self.config.viewport.shader_hot_reload);
        self.renderer.set_post_process_enabled(self.config.viewport.post_process);
        self.initialized = true;
        log::info!("Editor initialized at {}x{}", width, height);
        true
    }

    pub fn shutdown(&mut self) {
        if self.initialized {
            self.renderer.shutdown();
            self.initialized = false;
        }
        self.models.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // Accessors

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Direct scene access. Changes made here bypass undo.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommandHistory {
        &mut self.history
    }

    pub fn gizmo(&self) -> &Gizmo {
        &self.gizmo
    }

    pub fn gizmo_mut(&mut self) -> &mut Gizmo {
        &mut self.gizmo
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn assets(&self) -> &Arc<AssetCache> {
        &self.assets
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn post_process(&self) -> &PostProcessSettings {
        &self.post_process
    }

    pub fn post_process_mut(&mut self) -> &mut PostProcessSettings {
        &mut self.post_process
    }

    pub fn set_post_process_enabled(&mut self, enabled: bool) {
        self.config.viewport.post_process = enabled;
        if self.initialized {
            self.renderer.set_post_process_enabled(enabled);
        }
    }

    pub fn scene_path(&self) -> Option<&Path> {
        self.scene_path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    // Input and commands

    /// Queue a platform event for the next tick
    pub fn push_event(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Sender other threads and UI callbacks use to request model loads
    pub fn load_requester(&self) -> LoadRequester {
        self.load_queue.requester()
    }

    /// Queue a model file to be imported as a new entity next tick
    pub fn request_model(&self, path: impl Into<String>) -> bool {
        self.load_queue.push(path)
    }

    /// Install the decoder used to turn model files into geometry
    pub fn register_model_decoder<F>(&mut self, decode: F)
    where
        F: Fn(&str) -> Option<ModelSource> + Send + Sync + 'static,
    {
        self.models.register_decoder(&self.assets, decode);
    }

    /// Run a command right away
    pub fn execute(&mut self, command: Box<dyn Command>) {
        self.history.execute(command, &mut self.scene);
    }

    /// Queue a command for the command step of the next tick
    pub fn submit(&mut self, command: Box<dyn Command>) {
        self.ops.push_back(EditOp::Execute(command));
    }

    /// Undo the last command. During a drag this reverts the drag instead.
    pub fn undo(&mut self) -> bool {
        let reverted = self.abort_drag();
        self.history.undo(&mut self.scene) || reverted
    }

    /// Redo the last undone command. During a drag this only cancels it.
    pub fn redo(&mut self) -> bool {
        if self.abort_drag() {
            return self.history.undo(&mut self.scene);
        }
        self.history.redo(&mut self.scene)
    }

    pub fn set_gizmo_mode(&mut self, mode: GizmoMode) {
        self.gizmo.set_mode(mode);
    }

    pub fn select(&mut self, id: EntityId, additive: bool) -> bool {
        self.scene.select(id, additive)
    }

    pub fn play_animation(&mut self, id: EntityId, clip: &str, crossfade: f32) -> bool {
        self.scene
            .get_mut(id)
            .is_some_and(|e| e.play_clip(clip, crossfade))
    }

    // Frame

    /// Advance one frame
    pub fn tick(&mut self, dt: f32) -> FrameStats {
        let mut stats = FrameStats {
            frame: self.frame + 1,
            ..Default::default()
        };

        let events = self.input.drain();
        stats.events = events.len();
        for event in events {
            self.handle_event(event);
        }

        stats.commands = self.apply_ops();
        stats.models_loaded = self.process_load_requests();

        self.scene.update_animation(dt);
        self.scene.update_all_world_matrices();
        stats.entities = self.scene.entity_count();

        if self.initialized {
            self.render(&mut stats);
        }

        self.time += dt;
        self.frame += 1;
        self.last_stats = stats;
        stats
    }

    fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyDown { key, modifiers } => {
                if let Some(action) = shortcut(key, modifiers) {
                    self.perform(action);
                }
            }
            InputEvent::KeyUp { .. } => {}
            InputEvent::MouseDown { button, x, y, modifiers } => {
                if !self.viewport.mouse_down(button, x, y, modifiers) && button == MouseButton::Left {
                    self.press(x, y, modifiers);
                }
            }
            InputEvent::MouseMove { x, y, .. } => {
                if !self.viewport.mouse_move(x, y) {
                    self.hover_or_drag(x, y);
                }
            }
            InputEvent::MouseUp { button, .. } => {
                if !self.viewport.mouse_up(button) && button == MouseButton::Left {
                    self.release();
                }
            }
            InputEvent::Wheel { delta } => self.viewport.wheel(delta),
            InputEvent::Resize { width, height } => {
                self.viewport.resize(width, height);
                if self.initialized {
                    self.renderer.resize(width, height);
                }
            }
        }
    }

    fn perform(&mut self, action: EditorAction) {
        match action {
            EditorAction::TranslateMode => self.gizmo.set_mode(GizmoMode::Translate),
            EditorAction::RotateMode => self.gizmo.set_mode(GizmoMode::Rotate),
            EditorAction::ScaleMode => self.gizmo.set_mode(GizmoMode::Scale),
            EditorAction::ResetCamera => {
                self.viewport.reset_camera();
                self.frame_scene();
            }
            EditorAction::ToggleGrid => {
                self.viewport.toggle_grid();
            }
            EditorAction::ToggleHelp => {
                self.viewport.toggle_help();
            }
            EditorAction::DeleteSelection => {
                if let Some(id) = self.scene.primary_selection() {
                    self.cancel_drag();
                    self.ops.push_back(EditOp::Execute(Box::new(DeleteEntityCommand::new(id))));
                }
            }
            EditorAction::DuplicateSelection => {
                for id in self.scene.selection().to_vec() {
                    self.ops.push_back(EditOp::Execute(Box::new(DuplicateEntityCommand::new(id))));
                }
            }
            EditorAction::Undo => {
                // Undoing a moved drag is the same as cancelling it
                self.abort_drag();
                self.ops.push_back(EditOp::Undo);
            }
            EditorAction::Redo => {
                if self.abort_drag() {
                    self.ops.push_back(EditOp::Undo);
                } else {
                    self.ops.push_back(EditOp::Redo);
                }
            }
            EditorAction::CancelDrag => self.cancel_drag(),
        }
    }

    fn pick_ray(&self, x: f32, y: f32) -> Ray {
        screen_to_world_ray(&self.renderer.view_projection_inverse(), self.viewport.size(), x, y)
    }

    fn gizmo_target(&self, id: EntityId) -> Option<GizmoTarget> {
        let entity = self.scene.get(id)?;
        let parent_world = entity
            .parent()
            .and_then(|p| self.scene.get(p))
            .map_or(Mat4::IDENTITY, |p| p.world_matrix());
        Some(GizmoTarget::new(entity.transform, parent_world))
    }

    /// Keep the gizmo a constant fraction of the view
    fn fit_gizmo(&mut self, target: &GizmoTarget) {
        let eye = self.viewport.camera_params().eye;
        self.gizmo.size = ((eye - target.origin()).length() * GIZMO_SCALE).max(1e-3);
    }

    fn selected_target(&self) -> Option<(EntityId, GizmoTarget)> {
        let id = self.scene.primary_selection()?;
        Some((id, self.gizmo_target(id)?))
    }

    fn press(&mut self, x: f32, y: f32, modifiers: Modifiers) {
        let ray = self.pick_ray(x, y);
        if let Some((id, target)) = self.selected_target() {
            self.fit_gizmo(&target);
            if self.gizmo.begin_drag(&ray, &target) {
                self.drag_sessions += 1;
                self.drag = Some(ActiveDrag {
                    entity: id,
                    start: target.transform,
                    session: self.drag_sessions,
                    moved: false,
                });
                return;
            }
        }

        let additive = modifiers.contains(Modifiers::CTRL);
        match pick_entity(&self.scene, &ray) {
            Some(hit) => {
                self.scene.select(hit.entity, additive);
            }
            None if !additive => self.scene.clear_selection(),
            None => {}
        }
    }

    fn hover_or_drag(&mut self, x: f32, y: f32) {
        let ray = self.pick_ray(x, y);
        if self.gizmo.is_dragging() {
            let Some(updated) = self.gizmo.drag(&ray) else {
                return;
            };
            if let Some(drag) = self.drag.as_mut() {
                drag.moved = true;
                let command = TransformCommand::new(drag.entity, drag.start, updated).with_session(drag.session);
                self.ops.push_back(EditOp::Execute(Box::new(command)));
            }
            return;
        }

        match self.selected_target() {
            Some((_, target)) => {
                self.fit_gizmo(&target);
                self.gizmo.update_hover(&ray, &target);
            }
            None => self.gizmo.clear_hover(),
        }
    }

    fn release(&mut self) {
        if let Some(edit) = self.gizmo.end_drag() {
            log::debug!("Gizmo drag on {:?} finished", edit.axis);
        }
        self.drag = None;
    }

    /// Stop an in-progress drag without touching history. Returns true when
    /// the drag already pushed a transform command that still needs undoing.
    fn abort_drag(&mut self) -> bool {
        let active = self.gizmo.cancel_drag().is_some();
        let moved = active && self.drag.is_some_and(|d| d.moved);
        self.drag = None;
        moved
    }

    /// Abandon an in-progress drag, queueing an undo of whatever it changed
    fn cancel_drag(&mut self) {
        if self.abort_drag() {
            self.ops.push_back(EditOp::Undo);
        }
    }

    fn apply_ops(&mut self) -> usize {
        let mut applied = 0;
        let mut copies = Vec::new();
        while let Some(op) = self.ops.pop_front() {
            match op {
                EditOp::Execute(command) => {
                    self.history.execute(command, &mut self.scene);
                    let copy = self
                        .history
                        .last()
                        .and_then(|c| c.as_any().downcast_ref::<DuplicateEntityCommand>())
                        .and_then(DuplicateEntityCommand::copy);
                    copies.extend(copy);
                }
                EditOp::Undo => {
                    self.history.undo(&mut self.scene);
                }
                EditOp::Redo => {
                    self.history.redo(&mut self.scene);
                }
            }
            applied += 1;
        }

        if !copies.is_empty() {
            self.scene.clear_selection();
            for id in copies {
                self.scene.select(id, true);
            }
        }
        applied
    }

    fn process_load_requests(&mut self) -> usize {
        self.load_queue
            .drain()
            .into_iter()
            .filter(|path| self.import_model(path).is_some())
            .count()
    }

    /// Load a model file into a new, selected entity. Undoable.
    pub fn import_model(&mut self, path: &str) -> Option<EntityId> {
        let asset = self
            .models
            .loader(&self.assets, &mut self.renderer)
            .load_model(path);
        let Some(asset) = asset else {
            log::warn!("Failed to load model: {}", path);
            return None;
        };

        let name = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(path);
        self.history
            .execute(Box::new(CreateEntityCommand::new(name)), &mut self.scene);
        let id = self
            .history
            .last()?
            .as_any()
            .downcast_ref::<CreateEntityCommand>()?
            .created()?;

        let entity = self.scene.get_mut(id)?;
        entity.attach_model(asset);
        if let Some(first) = entity.clips.names().first() {
            entity.play_clip(first, 0.0);
        }
        self.scene.select(id, false);
        self.scene.update_all_world_matrices();
        self.frame_scene();
        log::info!("Imported {} as entity {}", path, id);
        Some(id)
    }

    /// Point the camera framing at the current scene bounds
    pub fn frame_scene(&mut self) {
        let (center, radius) = self.scene.bounds();
        self.viewport.set_scene_bounds(center, radius);
    }

    fn render(&mut self, stats: &mut FrameStats) {
        let renderer = &mut self.renderer;
        renderer.process_async_textures();

        let params = self.viewport.camera_params();
        let center = self.viewport.scene_center();
        let radius = self.viewport.scene_radius();
        renderer.begin_frame();
        renderer.set_camera(&params, radius);

        if self.config.viewport.shadows {
            renderer.begin_shadow_pass(radius, center);
            for entity in self.scene.iter().filter(|e| e.enabled) {
                if let Some(model) = &entity.model {
                    renderer.render_model_shadow(model, &entity.world_matrix());
                    stats.shadow_casters += 1;
                }
            }
            renderer.end_shadow_pass();
        }

        if self.viewport.show_grid {
            renderer.render_grid(GRID_SPACING, radius * 4.0);
        }

        for id in self.scene.entity_ids().to_vec() {
            let selected = self.scene.is_selected(id);
            let Some(entity) = self.scene.get_mut(id) else {
                continue;
            };
            if !entity.enabled || entity.model.is_none() {
                continue;
            }
            let world = entity.world_matrix();
            let palette = match (&entity.model, entity.skeleton.as_mut()) {
                (Some(model), Some(skeleton)) if model.skinned => Some(skeleton.skinning_palette()),
                _ => None,
            };
            let Some(model) = &entity.model else {
                continue;
            };
            match palette {
                Some(bones) => {
                    renderer.render_skinned_model(model, &world, &bones);
                    stats.skinned_draws += 1;
                }
                None => renderer.render_model(model, &world),
            }
            stats.draws += 1;
            if selected {
                renderer.render_model_outline(model, &world, SELECTION_COLOR);
            }
        }

        if let Some((_, target)) = self.selected_target() {
            self.fit_gizmo(&target);
            let lines = self.gizmo.lines(&target);
            stats.gizmo_lines = lines.len();
            self.renderer.render_gizmo_lines(&lines);
        }

        if self.config.viewport.post_process {
            let constants = fill_post_process_constants(
                &self.post_process,
                self.viewport.width(),
                self.viewport.height(),
                self.time,
            );
            self.renderer.set_post_process_params(constants.as_bytes());
        }
        self.renderer.end_frame();
        self.track_renderer_error();
    }

    fn track_renderer_error(&mut self) {
        let current = self.renderer.last_error();
        if current != self.renderer_error.as_deref() {
            if let Some(error) = current {
                log::error!("Renderer error: {}", error);
            }
            self.renderer_error = current.map(String::from);
        }
    }

    /// Latest renderer error, shown to the user until it clears
    pub fn renderer_error(&self) -> Option<&str> {
        self.renderer_error.as_deref()
    }

    // Scene files

    /// Save the scene with the current camera and post-process settings
    pub fn save_scene(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let ok = kiln_scene::save_scene(
            path,
            &self.scene,
            Some(&self.viewport.camera.state),
            Some(&self.post_process),
        );
        if ok {
            self.history.mark_saved();
            self.scene_path = Some(path.to_path_buf());
        }
        ok
    }

    /// Replace the scene with a document from disk. On failure the scene is
    /// left empty; history is cleared either way.
    pub fn load_scene(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.abort_drag();
        self.ops.clear();

        let mut camera = self.viewport.camera.state;
        let mut post_process = self.post_process.clone();
        let ok = {
            let mut loader = self.models.loader(&self.assets, &mut self.renderer);
            kiln_scene::load_scene(path, &mut self.scene, &mut camera, &mut post_process, &mut loader)
        };
        self.history.clear();
        if ok {
            self.viewport.camera.set_state(camera);
            self.post_process = post_process;
            self.scene_path = Some(path.to_path_buf());
        } else {
            self.scene_path = None;
        }
        self.release_unused_models();
        self.scene.update_all_world_matrices();
        self.frame_scene();
        ok
    }

    /// Start over with an empty scene
    pub fn new_scene(&mut self) {
        self.abort_drag();
        self.ops.clear();
        self.scene.clear();
        self.history.clear();
        self.scene_path = None;
        self.release_unused_models();
        self.viewport.reset_camera();
        self.frame_scene();
    }

    fn release_unused_models(&mut self) -> usize {
        let used: HashSet<String> = self
            .scene
            .iter()
            .filter_map(|e| e.model_path().map(String::from))
            .collect();
        self.models.retain_used(&used)
    }

    /// Release models no entity uses and let the cache evict idle entries
    pub fn collect_assets(&mut self) -> usize {
        self.release_unused_models();
        self.assets.collect_garbage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;
    use kiln_core::Vec3;
    use kiln_render::{Model, RecordingRenderer, RenderCall};

    fn editor() -> Editor<RecordingRenderer> {
        let mut editor = Editor::new(RecordingRenderer::new(), EditorConfig::default());
        assert!(editor.initialize(WindowHandle(1), 800, 600));
        editor
    }

    fn key(editor: &mut Editor<RecordingRenderer>, key: Key, modifiers: Modifiers) {
        editor.push_event(InputEvent::KeyDown { key, modifiers });
    }

    fn add_box(editor: &mut Editor<RecordingRenderer>, name: &str, position: Vec3) -> EntityId {
        let id = editor.scene_mut().create_entity(name);
        let entity = editor.scene_mut().get_mut(id).unwrap();
        entity.transform = Transform::from_position(position);
        entity.model = Some(Model::new(format!("{}.mesh", name)));
        id
    }

    #[test]
    fn frame_submits_draws_in_order() {
        let mut editor = editor();
        add_box(&mut editor, "a", Vec3::ZERO);
        add_box(&mut editor, "b", Vec3::X * 3.0);
        editor.renderer_mut().take_calls();

        let stats = editor.tick(1.0 / 60.0);
        assert_eq!(stats.draws, 2);
        assert_eq!(stats.shadow_casters, 2);
        let calls = editor.renderer().calls();
        assert_eq!(calls.first(), Some(&RenderCall::BeginFrame));
        assert_eq!(calls.last(), Some(&RenderCall::EndFrame));
        assert!(calls.contains(&RenderCall::Grid));
        assert!(calls.iter().any(|c| matches!(c, RenderCall::PostProcessParams { .. })));
        assert_eq!(editor.renderer().frames(), 1);
    }

    #[test]
    fn shortcuts_drive_gizmo_and_view() {
        let mut editor = editor();
        key(&mut editor, Key::E, Modifiers::empty());
        key(&mut editor, Key::G, Modifiers::empty());
        key(&mut editor, Key::F1, Modifiers::empty());
        editor.tick(0.0);
        assert_eq!(editor.gizmo().mode, GizmoMode::Rotate);
        assert!(!editor.viewport().show_grid);
        assert!(editor.viewport().show_help);

        key(&mut editor, Key::R, Modifiers::empty());
        editor.tick(0.0);
        assert_eq!(editor.gizmo().mode, GizmoMode::Scale);
    }

    #[test]
    fn delete_and_undo_via_keyboard() {
        let mut editor = editor();
        let id = add_box(&mut editor, "crate", Vec3::ZERO);
        editor.select(id, false);

        key(&mut editor, Key::Delete, Modifiers::empty());
        editor.tick(0.0);
        assert!(!editor.scene().contains(id));
        assert!(editor.is_dirty());

        key(&mut editor, Key::Z, Modifiers::CTRL);
        editor.tick(0.0);
        assert!(editor.scene().contains(id));

        key(&mut editor, Key::Y, Modifiers::CTRL);
        editor.tick(0.0);
        assert!(!editor.scene().contains(id));
    }

    #[test]
    fn duplicate_selects_the_copy() {
        let mut editor = editor();
        let id = add_box(&mut editor, "crate", Vec3::ZERO);
        editor.select(id, false);
        key(&mut editor, Key::D, Modifiers::CTRL);
        editor.tick(0.0);

        let copy = editor.scene().find_by_name("crate (Copy)").unwrap();
        assert_eq!(editor.scene().selection(), &[copy]);
        assert_eq!(editor.scene().get(copy).unwrap().model_path(), Some("crate.mesh"));
    }

    #[test]
    fn click_selects_and_empty_click_clears() {
        let mut editor = editor();
        let id = add_box(&mut editor, "target", Vec3::ZERO);
        editor.frame_scene();
        editor.tick(0.0);

        editor.push_event(InputEvent::MouseDown {
            button: MouseButton::Left,
            x: 400.0,
            y: 300.0,
            modifiers: Modifiers::empty(),
        });
        editor.push_event(InputEvent::MouseUp {
            button: MouseButton::Left,
            x: 400.0,
            y: 300.0,
            modifiers: Modifiers::empty(),
        });
        editor.tick(0.0);
        assert_eq!(editor.scene().primary_selection(), Some(id));

        // Outline and gizmo follow the selection
        editor.renderer_mut().take_calls();
        editor.tick(0.0);
        let calls = editor.renderer().calls();
        assert!(calls.contains(&RenderCall::Outline { path: "target.mesh".into() }));
        assert!(calls.iter().any(|c| matches!(c, RenderCall::GizmoLines { count } if *count > 0)));

        editor.push_event(InputEvent::MouseDown {
            button: MouseButton::Left,
            x: 2.0,
            y: 2.0,
            modifiers: Modifiers::empty(),
        });
        editor.tick(0.0);
        assert!(editor.scene().selection().is_empty());
    }

    #[test]
    fn alt_drag_moves_camera_not_selection() {
        let mut editor = editor();
        add_box(&mut editor, "target", Vec3::ZERO);
        editor.tick(0.0);
        let yaw = editor.viewport().camera.state.yaw;
        editor.push_event(InputEvent::MouseDown {
            button: MouseButton::Left,
            x: 400.0,
            y: 300.0,
            modifiers: Modifiers::ALT,
        });
        editor.push_event(InputEvent::MouseMove { x: 420.0, y: 300.0, modifiers: Modifiers::ALT });
        editor.tick(0.0);
        assert!(editor.scene().selection().is_empty());
        assert!(editor.viewport().camera.state.yaw != yaw);
    }

    #[test]
    fn requested_models_become_entities() {
        let mut editor = editor();
        editor.renderer_mut().fail_path("broken.fbx");
        let requester = editor.load_requester();
        assert!(requester.request("models/robot.fbx"));
        assert!(editor.request_model("broken.fbx"));

        let stats = editor.tick(0.0);
        assert_eq!(stats.models_loaded, 1);
        let robot = editor.scene().find_by_name("robot").unwrap();
        assert_eq!(editor.scene().primary_selection(), Some(robot));
        assert!(editor.history().can_undo());
        editor.undo();
        assert!(editor.scene().is_empty());
    }

    #[test]
    fn renderer_errors_are_surfaced() {
        let mut editor = editor();
        editor.renderer_mut().set_error(Some("shader.wgsl:3: bad token".into()));
        editor.tick(0.0);
        assert_eq!(editor.renderer_error(), Some("shader.wgsl:3: bad token"));
        editor.renderer_mut().set_error(None);
        editor.tick(0.0);
        assert_eq!(editor.renderer_error(), None);
    }

    #[test]
    fn uninitialized_editor_still_updates_scene() {
        let mut editor = Editor::new(RecordingRenderer::new(), EditorConfig::default());
        let parent = editor.scene_mut().create_entity("parent");
        let child = editor.scene_mut().create_entity("child");
        editor.scene_mut().set_parent(child, Some(parent));
        editor.scene_mut().get_mut(parent).unwrap().transform = Transform::from_position(Vec3::X);
        editor.tick(0.0);
        assert_eq!(editor.scene().world_position(child), Some(Vec3::X));
        assert!(editor.renderer().calls().is_empty());
    }
}
