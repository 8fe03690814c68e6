use anyhow::Context;
use arbor_author::{Editor, GrowthConfig, Topology};
use arbor_common::Id;
use arbor_kernel::{NodeKind, World};
use arbor_tools::WorldInspector;
use clap::{Parser, Subcommand};
use glam::Vec2;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arbor-cli", about = "CLI tool for arbor plant worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and default growth config
    Info,
    /// Build a two-stem plant, then cut one stem and graft it onto the other
    Demo {
        /// World seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Growth config file (YAML, or JSON by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Load a world from JSON and check its invariants
    Check {
        /// Path to a world JSON document
        path: PathBuf,
    },
    /// Print the demo world as JSON
    Dump {
        /// World seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
    tracing::debug!("arbor-cli starting");

    match cli.command {
        Commands::Info => {
            println!("arbor-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("{:#?}", GrowthConfig::default());
        }
        Commands::Demo { seed, config } => {
            let topology = match config {
                Some(path) => {
                    let cfg = GrowthConfig::load(&path)
                        .with_context(|| format!("loading config {}", path.display()))?;
                    Topology::new(cfg)?
                }
                None => Topology::default(),
            };
            run_demo(seed, topology)?;
        }
        Commands::Check { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let world: World = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            world.validate()?;
            println!("{}", WorldInspector::summary(&world));
            println!("OK");
        }
        Commands::Dump { seed } => {
            let demo = demo_world(seed)?;
            println!("{}", serde_json::to_string_pretty(&demo.world)?);
        }
    }

    Ok(())
}

/// The demo plant: root -> stem1 -> bud1; root -> stem2 -> {bud2, bud3}.
struct DemoPlant {
    world: World,
    plant: Id,
    stem1: Id,
    stem2: Id,
}

fn demo_world(seed: u64) -> anyhow::Result<DemoPlant> {
    let mut world = World::with_seed(seed);
    let island = world.spawn_island(
        Id::from("cluster-0"),
        Vec2::new(120.0, 80.0),
        vec![
            Vec2::new(-40.0, 0.0),
            Vec2::new(40.0, 0.0),
            Vec2::new(20.0, -15.0),
            Vec2::new(-20.0, -15.0),
        ],
        40.0,
        0.0,
    );
    let up = std::f32::consts::FRAC_PI_2;
    let plant = world.spawn_plant(&island, Vec2::ZERO, up)?;
    let root = world
        .plant(&plant)
        .map(|p| p.root_id().clone())
        .context("plant vanished")?;
    let stem1 = world.grow_child(&root, NodeKind::Stem, Vec2::new(-6.0, 16.0), up + 0.3, None)?;
    world.grow_child(&stem1, NodeKind::Bud, Vec2::new(-10.0, 32.0), up + 0.3, Some(1.0))?;
    let stem2 = world.grow_child(&root, NodeKind::Stem, Vec2::new(6.0, 16.0), up - 0.3, None)?;
    world.grow_child(&stem2, NodeKind::Bud, Vec2::new(4.0, 32.0), up, Some(0.5))?;
    world.grow_child(&stem2, NodeKind::Bud, Vec2::new(14.0, 30.0), up - 0.6, Some(0.25))?;
    Ok(DemoPlant {
        world,
        plant,
        stem1,
        stem2,
    })
}

/// Cut stem2 and graft it onto stem1, then check the result.
fn replay_cut_and_graft(demo: DemoPlant, topology: Topology) -> anyhow::Result<Editor> {
    let DemoPlant {
        world,
        plant,
        stem1,
        stem2,
    } = demo;
    let before = world.entities().len();
    let mut editor = Editor::with_topology(world, topology);

    editor.cut(&stem2)?;
    let carried = editor.carried().context("cut left nothing in hand")?;
    println!("Carrying {} nodes from {}", carried.len(), carried.root_id());
    anyhow::ensure!(carried.len() == 3, "expected 3 carried nodes, got {}", carried.len());
    let root = editor
        .world()
        .plant(&plant)
        .map(|p| p.root_id().clone())
        .context("plant vanished")?;
    anyhow::ensure!(
        editor.world().children(&root) == [stem1.clone()],
        "root should keep only {stem1} after the cut"
    );

    let pre_graft = editor.world().entities().clone();
    editor.graft(&stem1)?;
    let world = editor.world();
    let fresh = world
        .entities()
        .keys()
        .filter(|id| !pre_graft.contains_key(*id))
        .count();
    anyhow::ensure!(world.children(&stem1).len() == 2, "graft did not land on {stem1}");
    anyhow::ensure!(
        world.entities().len() == before,
        "entity count changed across cut and graft"
    );
    anyhow::ensure!(
        fresh == 3 && world.get(&stem2).is_none(),
        "grafted nodes reused a pre-graft id"
    );
    world.validate()?;
    Ok(editor)
}

fn run_demo(seed: u64, topology: Topology) -> anyhow::Result<()> {
    let demo = demo_world(seed)?;
    let plant = demo.plant.clone();
    tracing::info!(seed, %plant, "running demo");
    println!("{}", WorldInspector::summary(&demo.world));

    let mut editor = replay_cut_and_graft(demo, topology)?;
    for event in editor.drain_events() {
        tracing::debug!(?event, "world event");
    }

    let world = editor.world();
    if let Some(summary) = WorldInspector::plant_summary(world, &plant) {
        println!("{summary}");
    }
    if let Some(outline) = WorldInspector::outline(world, &plant) {
        print!("{outline}");
    }
    println!("{}", WorldInspector::summary(world));
    println!("state hash: {:#x}", world.state_hash());
    Ok(())
}
