//! tether CLI - conformance harness for physics engine plugins
//!
//! Loads world descriptions, drives them through the Rapier plugin and checks
//! engine behavior such as slip compliance.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use nalgebra::Vector3;
use serde::Serialize;
use tether_core::{
    AddLinkExternalForceTorque, ConstructFromDescription, Feature, ForwardStep, GetEntities,
    Identity, Implements, LinkFrameSemantics, SetShapeFrictionPyramidSlipCompliance, StepInput,
    StepOutput, StepState,
};
use tether_ir::Root;
use tether_rapier::{EngineConfig, RapierEngine};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Physics engine plugin conformance harness", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the features the engine implements
    Features,
    /// Display information about a world description
    Info {
        /// World description (.json or .toml)
        file: PathBuf,
    },
    /// Construct a world, step it and print link states
    Run {
        /// World description (.json or .toml)
        file: PathBuf,
        /// World to run (default: the first)
        #[arg(short, long)]
        world: Option<String>,
        /// Number of steps
        #[arg(short, long, default_value_t = 1000)]
        steps: usize,
        /// Print link states as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push a shape with a constant force and check v = slip * force
    Slip {
        /// World description (.json or .toml)
        file: PathBuf,
        /// World to run (default: the first)
        #[arg(short, long)]
        world: Option<String>,
        /// Model containing the pushed link
        #[arg(long)]
        model: String,
        /// Pushed link
        #[arg(long)]
        link: String,
        /// Shape whose slip compliance is set
        #[arg(long)]
        shape: String,
        /// Primary slip compliance
        #[arg(long)]
        primary: f64,
        /// Force along the world X axis
        #[arg(long, default_value_t = 1.0)]
        force: f64,
        /// Number of steps
        #[arg(long, default_value_t = 10_000)]
        steps: usize,
        /// Allowed velocity error
        #[arg(long, default_value_t = 1e-4)]
        tolerance: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Features => list_features(),
        Commands::Info { file } => show_info(&file)?,
        Commands::Run {
            file,
            world,
            steps,
            json,
        } => run_world(config, &file, world.as_deref(), steps, json)?,
        Commands::Slip {
            file,
            world,
            model,
            link,
            shape,
            primary,
            force,
            steps,
            tolerance,
        } => {
            let target = SlipTarget {
                model,
                link,
                shape,
            };
            check_slip(config, &file, world.as_deref(), &target, primary, force, steps, tolerance)?
        }
    }

    Ok(())
}

fn load_root(file: &Path) -> Result<Root> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
    let root = match ext.to_lowercase().as_str() {
        "toml" => Root::from_toml(&text)?,
        _ => Root::from_json(&text)?,
    };
    Ok(root)
}

fn construct(
    config: EngineConfig,
    file: &Path,
    world: Option<&str>,
) -> Result<(RapierEngine, Identity)> {
    let root = load_root(file)?;
    let desc = match world {
        Some(name) => root.world_by_name(name),
        None => root.world_by_index(0),
    }
    .ok_or_else(|| anyhow!("world {} not found", world.unwrap_or("#0")))?;

    let mut engine = RapierEngine::with_config(config);
    let engine_id = engine.engine();
    let id = engine.construct_world(engine_id, desc)?;
    info!(world = %desc.name, models = desc.models.len(), "constructed");
    Ok((engine, id))
}

fn list_features() {
    println!("engine: {}", RapierEngine::NAME);
    for feature in Feature::ALL {
        let mark = if RapierEngine::implements(*feature) { "x" } else { " " };
        println!("  [{}] {}", mark, feature.name());
    }
}

fn show_info(file: &Path) -> Result<()> {
    let root = load_root(file)?;

    println!("tether description: {}", file.display());
    println!("  Worlds: {}", root.worlds.len());
    for world in &root.worlds {
        println!("\nWorld '{}':", world.name);
        println!(
            "  Gravity: ({}, {}, {})",
            world.gravity.x, world.gravity.y, world.gravity.z
        );
        if let Some(dt) = world.time_step {
            println!("  Time step: {}", dt);
        }
        for model in &world.models {
            let shapes: usize = model.links.iter().map(|l| l.collisions.len()).sum();
            println!(
                "  {}{}: {} links, {} joints, {} shapes",
                model.name,
                if model.is_static { " (static)" } else { "" },
                model.links.len(),
                model.joints.len(),
                shapes
            );
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct LinkReport {
    model: String,
    link: String,
    position: [f64; 3],
    linear_velocity: [f64; 3],
    angular_velocity: [f64; 3],
}

fn link_reports(engine: &RapierEngine, world: Identity) -> Vec<LinkReport> {
    let mut reports = Vec::new();
    for m in 0..engine.model_count(world).unwrap_or(0) {
        let Some(model) = engine.model_by_index(world, m) else {
            continue;
        };
        let model_name = engine.entity_name(model).unwrap_or_default();
        for l in 0..engine.link_count(model).unwrap_or(0) {
            let Some(link) = engine.link_by_index(model, l) else {
                continue;
            };
            let Some(frame) = engine.frame_data_relative_to_world(link) else {
                continue;
            };
            let p = frame.pose.translation.vector;
            reports.push(LinkReport {
                model: model_name.clone(),
                link: engine.entity_name(link).unwrap_or_default(),
                position: [p.x, p.y, p.z],
                linear_velocity: frame.linear_velocity.into(),
                angular_velocity: frame.angular_velocity.into(),
            });
        }
    }
    reports
}

fn run_world(
    config: EngineConfig,
    file: &Path,
    world: Option<&str>,
    steps: usize,
    json: bool,
) -> Result<()> {
    let (mut engine, world) = construct(config, file, world)?;

    let (mut output, mut state) = (StepOutput::default(), StepState::default());
    for _ in 0..steps {
        if !engine.world_forward_step(world, &mut output, &mut state, &StepInput::default()) {
            bail!("step {} failed", state.iterations + 1);
        }
    }
    info!(steps = state.iterations, sim_time = state.sim_time, "finished");

    let reports = link_reports(&engine, world);
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("Simulated {:.3} s in {} steps", state.sim_time, state.iterations);
    println!("  Contacts in last step: {}", output.contacts.len());
    for r in &reports {
        println!(
            "  {}/{}: pos ({:.4}, {:.4}, {:.4}) vel ({:.4}, {:.4}, {:.4})",
            r.model,
            r.link,
            r.position[0],
            r.position[1],
            r.position[2],
            r.linear_velocity[0],
            r.linear_velocity[1],
            r.linear_velocity[2]
        );
    }
    Ok(())
}

struct SlipTarget {
    model: String,
    link: String,
    shape: String,
}

/// Apply `force` to `link` before each of `steps` steps.
fn push_link(
    engine: &mut RapierEngine,
    world: Identity,
    link: Identity,
    force: Vector3<f64>,
    steps: usize,
) -> Result<StepState> {
    let (mut output, mut state) = (StepOutput::default(), StepState::default());
    for _ in 0..steps {
        if !engine.add_external_force(link, force, Vector3::zeros()) {
            bail!("cannot push link {}", link);
        }
        if !engine.world_forward_step(world, &mut output, &mut state, &StepInput::default()) {
            bail!("step {} failed", state.iterations + 1);
        }
    }
    Ok(state)
}

#[allow(clippy::too_many_arguments)]
fn check_slip(
    config: EngineConfig,
    file: &Path,
    world: Option<&str>,
    target: &SlipTarget,
    primary: f64,
    force: f64,
    steps: usize,
    tolerance: f64,
) -> Result<()> {
    let (mut engine, world) = construct(config, file, world)?;

    let model = engine
        .model_by_name(world, &target.model)
        .ok_or_else(|| anyhow!("model '{}' not found", target.model))?;
    let link = engine
        .link_by_name(model, &target.link)
        .ok_or_else(|| anyhow!("link '{}' not found in '{}'", target.link, target.model))?;
    let shape = engine
        .shape_by_name(link, &target.shape)
        .ok_or_else(|| anyhow!("shape '{}' not found on '{}'", target.shape, target.link))?;

    if !engine.set_primary_slip_compliance(shape, primary) {
        bail!("cannot set slip compliance on '{}'", target.shape);
    }

    let state = push_link(&mut engine, world, link, Vector3::new(force, 0.0, 0.0), steps)?;

    let frame = engine
        .frame_data_relative_to_world(link)
        .ok_or_else(|| anyhow!("link '{}' vanished", target.link))?;
    let expected = primary * force;
    let actual = frame.linear_velocity.x;
    let error = (actual - expected).abs();

    println!("Slip compliance check after {} steps", state.iterations);
    println!("  Expected velocity: {:.6}", expected);
    println!("  Actual velocity:   {:.6}", actual);
    println!("  Error:             {:.2e} (tolerance {:.2e})", error, tolerance);

    if error > tolerance {
        bail!("sliding velocity off by {:.2e}", error);
    }
    println!("PASS");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::ConstructEmptyWorld;

    #[test]
    fn push_link_reports_dead_link() {
        let mut engine = RapierEngine::new();
        let world = engine.construct_empty_world(engine.engine(), "empty");
        let err = push_link(&mut engine, world, Identity::invalid(), Vector3::x(), 10).unwrap_err();
        assert!(err.to_string().contains("cannot push link"));
    }

    #[test]
    fn push_link_reports_failed_step() {
        let mut engine = RapierEngine::new();
        let world = engine.construct_empty_world(engine.engine(), "empty");
        let mut model = tether_ir::Model::new("m");
        model.links.push(tether_ir::Link::new("l"));
        let model = engine.construct_model(world, &model).unwrap();
        let link = engine.link_by_name(model, "l").unwrap();

        let state = push_link(&mut engine, world, link, Vector3::x(), 3).unwrap();
        assert_eq!(state.iterations, 3);

        let err = push_link(&mut engine, Identity::invalid(), link, Vector3::x(), 3).unwrap_err();
        assert!(err.to_string().contains("step 1 failed"));
    }
}
