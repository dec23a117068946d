//! Command-line front end: generate a block of chunks, probe single columns,
//! or print the effective world configuration.

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use strata_config::{CliArgs, WorldConfig};
use strata_terrain::{ChunkCoord, SampleContext, TerrainCache, TerrainClass, TerrainGenerator};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Procedural terrain generator")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a square of chunks and print per-chunk statistics.
    Generate {
        /// Chunks generated in each direction around the centre.
        #[arg(long, default_value_t = 2)]
        radius: i32,
        /// Centre chunk X.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        chunk_x: i32,
        /// Centre chunk Z.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        chunk_z: i32,
    },
    /// Print the full sample at one block column.
    Probe {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        z: i32,
    },
    /// Write the effective configuration to `world.ron` and print it.
    Config,
}

fn config_dir(args: &CliArgs) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(dir) = &args.config {
        return Ok(dir.clone());
    }
    let base = dirs::config_dir().ok_or("could not resolve a config directory")?;
    Ok(base.join("strata"))
}

fn class_name(generator: &TerrainGenerator, class: TerrainClass) -> String {
    match class {
        TerrainClass::DeepOcean => "deep ocean".to_string(),
        TerrainClass::Ocean => "ocean".to_string(),
        TerrainClass::Land(id) => generator
            .blender()
            .archetype(id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| format!("archetype {}", id.0)),
    }
}

fn generate(config: WorldConfig, radius: i32, centre: ChunkCoord) -> Result<(), Box<dyn Error>> {
    let cache = TerrainCache::from_config(config)?;
    let started = Instant::now();

    let coords: Vec<ChunkCoord> = (-radius..=radius)
        .flat_map(|dz| (-radius..=radius).map(move |dx| centre.offset(dx, dz)))
        .collect();
    for &coord in &coords {
        cache.hint(coord);
    }
    for &coord in &coords {
        let data = cache.get_now(coord)?;
        println!(
            "chunk ({:>4}, {:>4})  min {:>7.2}  max {:>7.2}  river columns {:>3}",
            coord.x,
            coord.z,
            data.min_height(),
            data.max_height(),
            data.river_columns()
        );
        drop(data);
        cache.release(coord);
    }

    let stats = cache.stats();
    info!(
        chunks = stats.chunks_computed,
        raw = stats.raw_computed,
        workers = stats.workers,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generation finished"
    );
    println!(
        "{} chunks ({} raw) on {} workers in {:.2?}",
        stats.chunks_computed,
        stats.raw_computed,
        stats.workers,
        started.elapsed()
    );
    Ok(())
}

fn probe(config: WorldConfig, x: i32, z: i32) -> Result<(), Box<dyn Error>> {
    let generator = TerrainGenerator::new(config)?;
    let mut ctx = SampleContext::new();
    let sample = *generator.sample(&mut ctx, x as f64, z as f64);
    println!("column ({x}, {z})");
    println!("  continent   {:.4}", sample.continent);
    println!("  class       {}", class_name(&generator, sample.class));
    println!("  raw height  {:.3}", sample.raw_height);
    println!("  height      {:.3}", sample.height);
    println!("  river mask  {:.3}", sample.river_mask);
    if let TerrainClass::Land(id) = sample.class
        && let Some(archetype) = generator.blender().archetype(id)
    {
        println!(
            "  archetype   weight {:.2}, {:.1}% of cells",
            archetype.weight,
            generator.blender().share(id) * 100.0
        );
    }
    for carve in ctx.carve_sites() {
        println!(
            "  river       {:?} {:.1} blocks away, water level {:.2}",
            carve.site.kind, carve.site.distance, carve.water_level
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_dir = config_dir(&cli.args)?;
    let mut config = WorldConfig::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        WorldConfig::default()
    });
    config.apply_cli_overrides(&cli.args);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    config.validate()?;

    match cli.command {
        Command::Generate {
            radius,
            chunk_x,
            chunk_z,
        } => generate(config, radius.max(0), ChunkCoord::new(chunk_x, chunk_z)),
        Command::Probe { x, z } => probe(config, x, z),
        Command::Config => {
            config.save(&config_dir)?;
            println!("{config:#?}");
            info!(dir = %config_dir.display(), "saved world config");
            Ok(())
        }
    }
}
