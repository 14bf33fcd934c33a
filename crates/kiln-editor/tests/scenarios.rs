//! End-to-end editing scenarios driven through the public editor API

use kiln_animation::{
    AnimationClip, BoneChannel, Condition, IkManager, IkSolver, Skeleton, State, StateMachine, Transition,
    TwoBoneIk,
};
use kiln_core::{EntityId, Mat4, Quat, Ray, Transform, Vec3};
use kiln_editor::projection::world_to_screen;
use kiln_editor::{
    pick_entity, CreateEntityCommand, DeleteEntityCommand, DuplicateEntityCommand, Editor, EditorConfig,
    InputEvent, Key, Modifiers, MouseButton, RenameEntityCommand, SetEnabledCommand, SetParentCommand,
    TransformCommand,
};
use kiln_render::{Model, RecordingRenderer, WindowHandle};
use kiln_scene::{save_scene_to_string, SceneGraph};
use std::sync::Arc;

fn editor() -> Editor<RecordingRenderer> {
    let mut editor = Editor::new(RecordingRenderer::new(), EditorConfig::default());
    assert!(editor.initialize(WindowHandle(7), 800, 600));
    editor
}

fn spawn(scene: &mut SceneGraph, name: &str, position: Vec3) -> EntityId {
    let id = scene.create_entity(name);
    let entity = scene.get_mut(id).unwrap();
    entity.transform = Transform::from_position(position);
    entity.model = Some(Model::new(format!("models/{}.mesh", name)));
    id
}

fn snapshot(scene: &SceneGraph) -> String {
    save_scene_to_string(scene, None, None).unwrap()
}

#[test]
fn ray_picks_closest_of_two() {
    let mut scene = SceneGraph::new();
    let near = spawn(&mut scene, "near", Vec3::ZERO);
    spawn(&mut scene, "far", Vec3::new(0.0, 0.0, 5.0));
    scene.update_all_world_matrices();

    let hit = pick_entity(&scene, &Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z)).unwrap();
    assert_eq!(hit.entity, near);
    assert!((hit.distance - 1.0).abs() < 1e-4);
}

#[test]
fn undo_everything_restores_identical_document() {
    let mut editor = editor();
    let a = spawn(editor.scene_mut(), "a", Vec3::ZERO);
    let b = spawn(editor.scene_mut(), "b", Vec3::X);
    let c = spawn(editor.scene_mut(), "c", Vec3::Y);
    editor.scene_mut().set_parent(c, Some(a));
    let before = snapshot(editor.scene());

    let moved = Transform::from_trs(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.3), Vec3::splat(2.0));
    editor.execute(Box::new(TransformCommand::new(a, Transform::IDENTITY, moved)));
    editor.execute(Box::new(RenameEntityCommand::new(b, "renamed")));
    editor.execute(Box::new(SetParentCommand::new(b, Some(c))));
    editor.execute(Box::new(SetEnabledCommand::new(c, false)));
    editor.execute(Box::new(CreateEntityCommand::new("extra").with_parent(a)));
    editor.execute(Box::new(DuplicateEntityCommand::new(c)));
    editor.execute(Box::new(DeleteEntityCommand::new(b)));
    assert_eq!(editor.history().undo_len(), 7);
    assert_ne!(snapshot(editor.scene()), before);

    while editor.undo() {}
    assert_eq!(snapshot(editor.scene()), before);
}

#[test]
fn gizmo_drag_is_one_undo_step() {
    let mut editor = editor();
    let id = spawn(editor.scene_mut(), "box", Vec3::ZERO);
    editor.select(id, false);
    editor.frame_scene();
    editor.tick(0.0);

    let size = editor.gizmo().size;
    let view_projection = editor.viewport().camera_params().view_projection();
    let screen = editor.viewport().size();
    let at = |x: f32| world_to_screen(&view_projection, screen, Vec3::new(x, 0.0, 0.0)).unwrap();

    let start = at(size * 0.7);
    editor.push_event(InputEvent::MouseDown {
        button: MouseButton::Left,
        x: start.x,
        y: start.y,
        modifiers: Modifiers::empty(),
    });
    for step in [1.2, 1.7] {
        let p = at(size * step);
        editor.push_event(InputEvent::MouseMove { x: p.x, y: p.y, modifiers: Modifiers::empty() });
    }
    let end = at(size * 1.7);
    editor.push_event(InputEvent::MouseUp {
        button: MouseButton::Left,
        x: end.x,
        y: end.y,
        modifiers: Modifiers::empty(),
    });
    editor.tick(0.0);

    let x = editor.scene().get(id).unwrap().transform.position.x;
    assert!((x - size).abs() < 1e-3, "moved to {x}, expected {size}");
    assert_eq!(editor.history().undo_len(), 1);

    editor.push_event(InputEvent::KeyDown { key: Key::Z, modifiers: Modifiers::CTRL });
    editor.tick(0.0);
    assert_eq!(editor.scene().get(id).unwrap().transform, Transform::from_position(Vec3::ZERO));
}

/// Select `id`, grab its X arm and pull it out to twice the gizmo size
fn start_x_drag(editor: &mut Editor<RecordingRenderer>, id: EntityId) -> f32 {
    editor.select(id, false);
    editor.frame_scene();
    editor.tick(0.0);

    let size = editor.gizmo().size;
    let view_projection = editor.viewport().camera_params().view_projection();
    let screen = editor.viewport().size();
    let at = |x: f32| world_to_screen(&view_projection, screen, Vec3::new(x, 0.0, 0.0)).unwrap();

    let start = at(size * 0.7);
    let moved = at(size * 2.0);
    editor.push_event(InputEvent::MouseDown {
        button: MouseButton::Left,
        x: start.x,
        y: start.y,
        modifiers: Modifiers::empty(),
    });
    editor.push_event(InputEvent::MouseMove { x: moved.x, y: moved.y, modifiers: Modifiers::empty() });
    editor.tick(0.0);
    size
}

#[test]
fn escape_cancels_a_drag() {
    let mut editor = editor();
    let id = spawn(editor.scene_mut(), "box", Vec3::ZERO);
    let size = start_x_drag(&mut editor, id);
    assert!(editor.gizmo().is_dragging());
    assert!(editor.scene().get(id).unwrap().transform.position.x > 0.5 * size);

    editor.push_event(InputEvent::KeyDown { key: Key::Escape, modifiers: Modifiers::empty() });
    editor.tick(0.0);
    assert!(!editor.gizmo().is_dragging());
    assert_eq!(editor.scene().get(id).unwrap().transform.position, Vec3::ZERO);
    assert!(editor.history().can_redo());
}

#[test]
fn undo_mid_drag_reverts_only_the_drag() {
    let mut editor = editor();
    let id = spawn(editor.scene_mut(), "box", Vec3::ZERO);
    editor.execute(Box::new(RenameEntityCommand::new(id, "crate")));
    start_x_drag(&mut editor, id);
    assert_eq!(editor.history().undo_len(), 2);

    editor.push_event(InputEvent::KeyDown { key: Key::Z, modifiers: Modifiers::CTRL });
    editor.tick(0.0);
    let entity = editor.scene().get(id).unwrap();
    assert_eq!(entity.transform.position, Vec3::ZERO);
    assert_eq!(entity.name, "crate");
    assert!(!editor.gizmo().is_dragging());

    start_x_drag(&mut editor, id);
    assert!(editor.undo());
    let entity = editor.scene().get(id).unwrap();
    assert_eq!(entity.transform.position, Vec3::ZERO);
    assert_eq!(entity.name, "crate");
}

#[test]
fn scene_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("level.kiln.json");

    let mut editor = editor();
    let mut expected = Vec::new();
    for r in 0..3 {
        let root = spawn(editor.scene_mut(), &format!("root{r}"), Vec3::new(r as f32 * 3.0, 0.0, 0.0));
        editor.scene_mut().get_mut(root).unwrap().transform.rotation = Quat::from_rotation_z(0.2 * r as f32);
        for c in 0..2 {
            let child = spawn(editor.scene_mut(), &format!("child{r}{c}"), Vec3::new(0.0, 1.0 + c as f32, 0.0));
            editor.scene_mut().get_mut(child).unwrap().transform.scale = Vec3::splat(0.5 + c as f32);
            editor.scene_mut().set_parent(child, Some(root));
        }
    }
    for e in editor.scene().iter() {
        let parent = e.parent().map(|p| editor.scene().get(p).unwrap().name.clone());
        expected.push((e.name.clone(), e.transform, parent, e.model_path().map(String::from)));
    }
    editor.select(EntityId::from_raw(1), false);

    assert!(editor.save_scene(&path));
    assert!(!editor.is_dirty());
    editor.new_scene();
    assert!(editor.scene().is_empty());

    assert!(editor.load_scene(&path));
    let scene = editor.scene();
    assert_eq!(scene.entity_count(), 9);
    assert_eq!(scene.roots().len(), 3);
    assert!(scene.selection().is_empty());
    for (name, transform, parent, model) in &expected {
        let id = scene.find_by_name(name).unwrap();
        let entity = scene.get(id).unwrap();
        assert!(entity.transform.position.abs_diff_eq(transform.position, 1e-6));
        assert!(entity.transform.rotation.abs_diff_eq(transform.rotation, 1e-6));
        assert!(entity.transform.scale.abs_diff_eq(transform.scale, 1e-6));
        let loaded_parent = entity.parent().map(|p| scene.get(p).unwrap().name.clone());
        assert_eq!(&loaded_parent, parent);
        assert_eq!(entity.model_path().map(String::from), *model);
    }

    // A document from a newer version is refused and leaves nothing behind
    let content = std::fs::read_to_string(&path).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&content).unwrap();
    doc["version"] = serde_json::json!(kiln_scene::CURRENT_VERSION + 1);
    std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    assert!(!editor.load_scene(&path));
    assert!(editor.scene().is_empty());
}

fn one_bone() -> Skeleton {
    let mut skeleton = Skeleton::new();
    skeleton.add_bone("root", None, Transform::IDENTITY, Mat4::IDENTITY).unwrap();
    skeleton
}

fn hold(name: &str, x: f32, duration: f32, looping: bool) -> AnimationClip {
    AnimationClip::new(name, duration, looping).with_channel(
        BoneChannel::new("root")
            .position(0.0, Vec3::new(x, 0.0, 0.0))
            .position(duration, Vec3::new(x, 0.0, 0.0)),
    )
}

fn root_x(editor: &Editor<RecordingRenderer>, id: EntityId) -> f32 {
    let skeleton = editor.scene().get(id).unwrap().skeleton.as_ref().unwrap();
    skeleton.local_transform(0).position.x
}

#[test]
fn crossfade_through_the_frame_loop() {
    let mut editor = editor();
    let id = editor.scene_mut().create_entity("rig");
    {
        let entity = editor.scene_mut().get_mut(id).unwrap();
        entity.attach_skeleton(one_bone());
        entity.add_clip(hold("a", 0.0, 1.0, false));
        entity.add_clip(hold("b", 10.0, 1.0, false));
    }
    assert!(editor.play_animation(id, "a", 0.0));
    assert!(editor.play_animation(id, "b", 0.5));

    editor.tick(0.0);
    assert!(root_x(&editor, id).abs() < 1e-3);
    editor.tick(0.25);
    assert!((root_x(&editor, id) - 5.0).abs() < 1e-3);
    editor.tick(0.25);
    assert!((root_x(&editor, id) - 10.0).abs() < 1e-3);
}

#[test]
fn two_bone_ik_runs_each_frame() {
    let mut editor = editor();
    let id = editor.scene_mut().create_entity("arm");
    let target = Vec3::new(1.5, 0.5, 0.0);
    {
        let mut arm = Skeleton::new();
        arm.add_bone_at_bind("shoulder", None, Transform::IDENTITY).unwrap();
        arm.add_bone_at_bind("elbow", Some(0), Transform::from_position(Vec3::X)).unwrap();
        arm.add_bone_at_bind("hand", Some(1), Transform::from_position(Vec3::X)).unwrap();
        let mut ik = IkManager::new();
        ik.add(IkSolver::TwoBone(TwoBoneIk::new(0, 1, 2, target)));
        let entity = editor.scene_mut().get_mut(id).unwrap();
        entity.attach_skeleton(arm);
        entity.ik = Some(ik);
    }

    editor.tick(1.0 / 60.0);
    let skeleton = editor.scene_mut().get_mut(id).unwrap().skeleton.as_mut().unwrap();
    let shoulder = skeleton.model_position(0).unwrap();
    let elbow = skeleton.model_position(1).unwrap();
    let hand = skeleton.model_position(2).unwrap();
    assert!((hand - target).length() < 1e-2, "hand at {hand:?}");
    assert!(((elbow - shoulder).length() - 1.0).abs() < 1e-3);
    assert!(((hand - elbow).length() - 1.0).abs() < 1e-3);
}

#[test]
fn trigger_is_consumed_by_the_state_machine() {
    let mut editor = editor();
    let id = editor.scene_mut().create_entity("fighter");
    {
        let entity = editor.scene_mut().get_mut(id).unwrap();
        entity.attach_skeleton(one_bone());
        let idle = entity.add_clip(hold("idle", 0.0, 1.0, true));
        let hit = entity.add_clip(hold("hit", 1.0, 0.5, false));

        let mut machine = StateMachine::new();
        machine.add_state(State::clip("Idle", idle));
        machine.add_state(State::clip("Hit", hit));
        machine.parameters_mut().add_trigger("OnHit");
        machine.add_transition("Idle", Transition::to("Hit").when(Condition::is_set("OnHit")));
        entity.state_machine = Some(machine);
    }

    editor.tick(1.0 / 60.0);
    {
        let sm = editor.scene_mut().get_mut(id).unwrap().state_machine.as_mut().unwrap();
        assert_eq!(sm.current_state(), Some("Idle"));
        sm.set_trigger("OnHit");
    }
    editor.tick(1.0 / 60.0);
    let sm = editor.scene().get(id).unwrap().state_machine.as_ref().unwrap();
    assert_eq!(sm.current_state(), Some("Hit"));
    assert!(!sm.get_bool("OnHit"));
}

#[test]
fn skinned_entities_draw_with_bone_palette() {
    let mut editor = editor();
    let id = editor.scene_mut().create_entity("rig");
    {
        let entity = editor.scene_mut().get_mut(id).unwrap();
        entity.model = Some(Model::new("rig.mesh").with_skinning(true));
        entity.attach_skeleton(one_bone());
    }
    editor.renderer_mut().take_calls();
    let stats = editor.tick(0.0);
    assert_eq!(stats.skinned_draws, 1);
    assert!(editor.renderer().calls().iter().any(|c| matches!(
        c,
        kiln_render::RenderCall::SkinnedModel { bones, .. } if *bones == kiln_animation::MAX_BONES
    )));
}

#[test]
fn shared_cache_is_injected() {
    let cache = Arc::new(kiln_asset::AssetCache::new());
    let mut editor = Editor::with_assets(RecordingRenderer::new(), EditorConfig::default(), cache.clone());
    editor.register_model_decoder(|_| {
        Some(kiln_editor::ModelSource::new(vec![kiln_render::MeshData::cuboid(
            Vec3::ONE,
            kiln_core::Color::WHITE,
        )]))
    });
    let first = editor.import_model("props/barrel.obj").unwrap();
    let second = editor.import_model("props/barrel.obj").unwrap();
    assert_ne!(first, second);
    assert_eq!(cache.stats().cache_hits, 1);
    assert_eq!(cache.stats().entry_count, 1);

    editor.new_scene();
    cache.set_unused_timeout(std::time::Duration::ZERO);
    assert_eq!(editor.collect_assets(), 1);
    assert_eq!(cache.stats().entry_count, 0);
}
