//! Scene file commands

use anyhow::{Context, Result};
use clap::Subcommand;
use kiln_core::{Color, Quat, Transform, Vec3};
use kiln_render::{CameraState, Light, Material, Model, PostProcessSettings};
use kiln_scene::{
    load_scene_from_str, parse_document, save_scene_to_path, PlaceholderLoader, SceneGraph,
    CURRENT_VERSION,
};
use std::fs;
use std::path::Path;

#[derive(Subcommand)]
pub enum SceneCommands {
    /// Show entity count, hierarchy depth and model paths
    Info {
        /// Path to scene file
        path: String,
    },

    /// Write a small demo scene
    Demo {
        /// Output path
        path: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check that a scene file loads, reporting its version
    Validate {
        /// Path to scene file
        path: String,
    },
}

pub fn run(cmd: SceneCommands) -> Result<()> {
    match cmd {
        SceneCommands::Info { path } => info(&path),
        SceneCommands::Demo { path, force } => demo(&path, force),
        SceneCommands::Validate { path } => validate(&path),
    }
}

fn read_scene(path: &str) -> Result<SceneGraph> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read scene file {}", path))?;
    let mut scene = SceneGraph::new();
    load_scene_from_str(&content, &mut scene, &mut PlaceholderLoader)
        .with_context(|| format!("Failed to load scene file {}", path))?;
    scene.update_all_world_matrices();
    Ok(scene)
}

fn info(path: &str) -> Result<()> {
    let scene = read_scene(path)?;
    println!("{}", scene.summary());

    let (center, radius) = scene.bounds();
    println!(
        "  Bounds: center ({:.2}, {:.2}, {:.2}), radius {:.2}",
        center.x, center.y, center.z, radius
    );
    Ok(())
}

fn validate(path: &str) -> Result<()> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read scene file {}", path))?;
    let doc = parse_document(&content).with_context(|| format!("Invalid scene file {}", path))?;

    let mut scene = SceneGraph::new();
    let report = kiln_scene::document_to_scene(&doc, &mut scene, &mut PlaceholderLoader);

    println!("Scene: {}", doc.name);
    println!("  Version: {} (current {})", report.version, CURRENT_VERSION);
    println!("  Entities: {}", report.entity_count);
    println!("  Camera: {}", if report.camera.is_some() { "yes" } else { "no" });
    println!(
        "  Post-process: {}",
        if report.post_process.is_some() { "yes" } else { "no" }
    );
    if report.failed_models.is_empty() {
        println!("OK");
    } else {
        for model in &report.failed_models {
            println!("  Unresolved model: {}", model);
        }
        anyhow::bail!("{} model(s) could not be resolved", report.failed_models.len());
    }
    Ok(())
}

/// A lit courtyard: ground, a row of crates under one parent, and a
/// walking figure flagged as skinned.
pub fn demo_scene() -> SceneGraph {
    let mut scene = SceneGraph::new();
    scene.set_name("Demo Courtyard");

    let stone = Material::new("Stone", Color::from_hex(0x8a8580)).shared();
    let wood = Material::new("Wood", Color::from_hex(0x9c6b3d)).shared();

    let sun = scene.create_entity("Sun");
    if let Some(e) = scene.get_mut(sun) {
        e.transform = Transform::from_position(Vec3::new(0.0, 10.0, 0.0))
            .with_rotation(Quat::from_rotation_x(-0.9));
        e.light = Some(Light::directional(Color::WHITE, 3.0));
    }

    let ground = scene.create_entity("Ground");
    if let Some(e) = scene.get_mut(ground) {
        e.transform = Transform::IDENTITY.with_scale(Vec3::new(10.0, 0.1, 10.0));
        e.model = Some(Model::new("models/ground.mesh"));
        e.material = Some(stone);
    }

    let crates = scene.create_entity("Crates");
    if let Some(e) = scene.get_mut(crates) {
        e.transform = Transform::from_position(Vec3::new(-2.0, 0.5, 0.0));
    }
    for i in 0..3 {
        let id = scene.create_entity(format!("Crate {}", i + 1));
        if let Some(e) = scene.get_mut(id) {
            e.transform = Transform::from_position(Vec3::new(i as f32 * 1.2, 0.0, 0.0))
                .with_rotation(Quat::from_rotation_y(0.25 * i as f32));
            e.model = Some(Model::new("models/crate.mesh"));
            e.material = Some(wood.clone());
        }
        scene.set_parent(id, Some(crates));
    }

    let lantern = scene.create_entity("Lantern");
    if let Some(e) = scene.get_mut(lantern) {
        e.transform = Transform::from_position(Vec3::new(0.0, 1.0, 0.0));
        e.light = Some(Light::point(Color::from_hex(0xffc070), 2.0, 6.0));
    }
    scene.set_parent(lantern, Some(crates));

    let walker = scene.create_entity("Walker");
    if let Some(e) = scene.get_mut(walker) {
        e.transform = Transform::from_position(Vec3::new(3.0, 0.0, 1.5));
        e.model = Some(Model::new("models/walker.mesh").with_skinning(true));
    }

    scene.update_all_world_matrices();
    scene
}

fn demo(path: &str, force: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        anyhow::bail!("Scene file already exists: {} (use --force to overwrite)", path);
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let scene = demo_scene();
    save_scene_to_path(
        path,
        &scene,
        Some(&CameraState::default()),
        Some(&PostProcessSettings::default()),
    )?;
    println!("Created scene: {} ({} entities)", path, scene.entity_count());
    Ok(())
}
