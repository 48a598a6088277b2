use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use meander_sim::scenario::seed_springs;
use meander_sim::{
    build_headless_app, run_tick, CycleMetrics, ElevationField, HeightfieldTerrain,
    LatestSnapshot, RiverConfig, RiverConfigMetadata, TerrainHandle, WaterCycle,
};

/// Runs a seeded river network without any presentation attached.
#[derive(Debug, Parser)]
#[command(name = "meander_headless")]
struct Args {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 200)]
    ticks: u64,
    /// Springs scattered before the first tick.
    #[arg(long, default_value_t = 4)]
    springs: usize,
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,
    /// Side length of the square the springs are scattered over.
    #[arg(long, default_value_t = 32.0)]
    extent: f32,
    /// River config JSON; overrides RIVER_CONFIG_PATH.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Flow over generated terrain instead of a flat plane.
    #[arg(long)]
    heightfield: bool,
    /// Print the final network snapshot as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut app = build_headless_app();

    if let Some(path) = &args.config {
        match RiverConfig::from_file(path) {
            Ok(config) => {
                app.insert_resource(config);
                app.insert_resource(RiverConfigMetadata::new(Some(path.clone())));
            }
            Err(err) => {
                error!(target: "meander::server", error = %err, "river_config.rejected");
                return ExitCode::from(2);
            }
        }
    }

    if args.heightfield {
        let cells = (args.extent.ceil() as u32).max(2) + 1;
        let field = ElevationField::generate(cells, cells, args.seed);
        app.insert_resource(TerrainHandle::new(HeightfieldTerrain::new(field, 1.0, 4.0)));
    }

    {
        let world = &mut app.world;
        let config = world.resource::<RiverConfig>().clone();
        let terrain = world.resource::<TerrainHandle>().clone();
        let mut cycle = world.resource_mut::<WaterCycle>();
        seed_springs(
            &mut cycle,
            &config,
            terrain.sampler(),
            args.springs,
            args.extent,
            args.seed,
        );
    }

    info!(
        target: "meander::server",
        ticks = args.ticks,
        springs = args.springs,
        seed = args.seed,
        "meander headless run starting"
    );

    for _ in 0..args.ticks {
        run_tick(&mut app);
        let metrics = app.world.resource::<CycleMetrics>();
        info!(
            target: "meander::server",
            tick = metrics.tick,
            rivers = metrics.rivers,
            oxbows = metrics.oxbows,
            points = metrics.points,
            inserted = metrics.points_inserted,
            removed = metrics.points_removed,
            collisions = metrics.collisions_resolved,
            "tick.completed"
        );
    }

    if args.json {
        if let Some(snapshot) = &app.world.resource::<LatestSnapshot>().0 {
            match serde_json::to_string_pretty(snapshot) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    error!(target: "meander::server", error = %err, "snapshot.encode_failed");
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
