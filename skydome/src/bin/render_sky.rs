//! Render a sky snapshot to SVG (and optionally PNG).
//!
//! The dome starts at `--start` and animates to the snapshot's rotation (or
//! `--target`) the way the interactive map does on a location change: reduced
//! transition frames followed by one full redraw. The full frame is written to
//! `--output`; every N-th transition frame can be dumped to `--frames-dir`.

use std::path::PathBuf;

use clap::Parser;
use skydome::animator::{AnimationEvent, FixedStepScheduler, RealTimeScheduler, Scheduler};
use skydome::args::{parse_rotation, DurationArg};
use skydome::labels::LabelSlots;
use skydome::render::{DrawMode, Frame, SkyRenderer};
use skydome::{svg, Rotation, SkyConfig, SkySnapshot};

#[derive(Parser, Debug)]
#[command(
    name = "render_sky",
    about = "Projects a sky snapshot onto the planetarium dome and writes it as SVG/PNG",
    long_about = None
)]
struct Args {
    /// Snapshot JSON from the position service
    snapshot: PathBuf,

    /// Optional SkyConfig JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rotation to start the animation from, as "lambda,phi"
    #[arg(long, value_parser = parse_rotation, default_value = "0,0")]
    start: Rotation,

    /// Rotation to animate to; defaults to the snapshot's rotation
    #[arg(long, value_parser = parse_rotation)]
    target: Option<Rotation>,

    /// Output SVG path for the final frame
    #[arg(short, long, default_value = "sky.svg")]
    output: PathBuf,

    /// Also rasterise the final frame to this PNG path
    #[arg(long)]
    png: Option<PathBuf>,

    /// Time between animation frames (e.g. "16ms", "0.05s")
    #[arg(long, default_value_t = DurationArg::default())]
    frame_step: DurationArg,

    /// Pace frames against the wall clock instead of stepping instantly
    #[arg(long)]
    realtime: bool,

    /// Directory for intermediate transition frames
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Write every N-th transition frame to --frames-dir
    #[arg(long, default_value_t = 10)]
    every: usize,

    /// Show the hover label for these objects (by name) in the final frame
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Draw stars and planets in night-mode red
    #[arg(long)]
    night: bool,

    /// Write the final frame's statistics as JSON
    #[arg(long)]
    stats_json: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SkyConfig::load_from_file(path)?,
        None => SkyConfig::default(),
    };
    if args.night {
        config.night_mode = true;
    }
    config.validate()?;

    let snapshot = SkySnapshot::load_from_file(&args.snapshot)?;
    let target = args.target.or(snapshot.rotation).unwrap_or(args.start);

    println!("Sky Dome Renderer");
    println!("=================");
    println!("Snapshot: {}", args.snapshot.display());
    println!(
        "Objects: {} stars, {} planets, {} constellations",
        snapshot.stars.len(),
        snapshot.planets.len(),
        snapshot.constellations.len()
    );
    println!("Rotation: ({:.2}, {:.2}) -> ({:.2}, {:.2})", args.start.lambda, args.start.phi, target.lambda, target.phi);
    println!("Radius: {}", config.radius);

    if let Some(dir) = &args.frames_dir {
        std::fs::create_dir_all(dir)?;
    }

    let renderer = SkyRenderer::new(config.clone());
    let mut animator = config.animator(args.start);
    let duration = animator.rotate(target);
    println!("Transition: {} ms", duration.as_millis());

    let mut scheduler: Box<dyn Scheduler> = if args.realtime {
        Box::new(RealTimeScheduler::new(args.frame_step.0))
    } else {
        Box::new(FixedStepScheduler::new(args.frame_step.0))
    };

    let no_labels = LabelSlots::new();
    let every = args.every.max(1);
    let mut transition_frames = 0usize;
    let mut final_rotation = args.start;
    let mut write_error = None;

    animator.run(scheduler.as_mut(), |event| match event {
        AnimationEvent::Frame { rotation, .. } => {
            transition_frames += 1;
            let Some(dir) = &args.frames_dir else {
                return;
            };
            if transition_frames % every != 0 || write_error.is_some() {
                return;
            }
            let frame = renderer.render(&config.view(*rotation), &snapshot, DrawMode::Transition, &no_labels);
            let path = dir.join(format!("frame_{transition_frames:05}.svg"));
            if let Err(e) = svg::write_svg(&frame, &path) {
                write_error = Some(e);
            }
        }
        AnimationEvent::Completed { rotation } => final_rotation = *rotation,
    });
    if let Some(e) = write_error {
        return Err(e.into());
    }

    let view = config.view(final_rotation);
    let mut slots = LabelSlots::new();
    for name in &args.labels {
        let target = snapshot
            .find_object(name)
            .and_then(|id| renderer.hover_target(&view, &snapshot, id));
        match target {
            Some(target) => slots.hover(target),
            None => log::warn!("no visible object named {name}"),
        }
    }

    let frame: Frame = renderer.render(&view, &snapshot, DrawMode::Full, &slots);
    svg::write_svg(&frame, &args.output)?;
    println!("\nTransition frames: {transition_frames}");
    println!(
        "Visible: {} stars, {} planets, {} constellations ({} ambiguous skipped)",
        frame.stats.stars, frame.stats.planets, frame.stats.constellations, frame.stats.ambiguous_constellations
    );
    println!("Wrote {}", args.output.display());

    if let Some(png) = &args.png {
        svg::write_png(&frame, png)?;
        println!("Wrote {}", png.display());
    }
    if let Some(path) = &args.stats_json {
        std::fs::write(path, serde_json::to_string_pretty(&frame.stats)?)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
