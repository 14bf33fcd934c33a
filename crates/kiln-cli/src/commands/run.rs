//! Headless editor loop

use anyhow::{Context, Result};
use kiln_editor::{Editor, EditorConfig, FrameStats};
use kiln_render::{RecordingRenderer, WindowHandle};
use std::path::PathBuf;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

pub struct RunArgs {
    pub scene: PathBuf,
    pub frames: u64,
    pub fps: f32,
    pub config: Option<PathBuf>,
}

/// Totals over a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunTotals {
    pub frames: u64,
    pub draws: usize,
    pub skinned_draws: usize,
    pub shadow_casters: usize,
    pub gizmo_lines: usize,
}

impl RunTotals {
    fn add(&mut self, stats: &FrameStats) {
        self.frames += 1;
        self.draws += stats.draws;
        self.skinned_draws += stats.skinned_draws;
        self.shadow_casters += stats.shadow_casters;
        self.gizmo_lines += stats.gizmo_lines;
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    if args.fps <= 0.0 {
        anyhow::bail!("--fps must be positive, got {}", args.fps);
    }
    let config = EditorConfig::load(args.config.as_deref()).context("Failed to load config")?;

    let mut editor = Editor::new(RecordingRenderer::new(), config);
    if !editor.initialize(WindowHandle(0), WIDTH, HEIGHT) {
        anyhow::bail!("Renderer failed to initialize");
    }
    if !editor.load_scene(&args.scene) {
        anyhow::bail!("Failed to load scene: {}", args.scene.display());
    }

    let totals = simulate(&mut editor, args.frames, 1.0 / args.fps);
    let last = editor.last_stats();

    println!("Scene: {} ({} entities)", editor.scene().name(), last.entities);
    println!("Frames: {}", totals.frames);
    println!(
        "Draws: {} total, {} skinned, {} shadow casters",
        totals.draws, totals.skinned_draws, totals.shadow_casters
    );
    println!(
        "Last frame: {} draws, {} skinned, {} gizmo lines",
        last.draws, last.skinned_draws, last.gizmo_lines
    );
    if let Some(error) = editor.renderer_error() {
        println!("Renderer error: {}", error);
    }

    editor.shutdown();
    Ok(())
}

fn simulate(editor: &mut Editor<RecordingRenderer>, frames: u64, dt: f32) -> RunTotals {
    let mut totals = RunTotals::default();
    for _ in 0..frames {
        let stats = editor.tick(dt);
        log::debug!(
            "Frame {}: {} draws ({} skinned), {} commands",
            stats.frame,
            stats.draws,
            stats.skinned_draws,
            stats.commands
        );
        totals.add(&stats);
    }
    totals
}
