pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod model;
pub mod parser;
pub mod player;
pub mod script;
pub mod session;
pub mod world;
pub mod writer;

use std::collections::BTreeSet;

use anyhow::Context;
use clap::Parser;

use cli::Command;
use config::EngineConfig;
use content::DirectorySource;
use model::MapSize;
use world::map::Map;
use world::tile::TilesetCache;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // 1. ── Configure ──────────────────────────────────────────────────
    let mut config = EngineConfig::load_or_default(args.config.as_deref())
        .with_context(|| "Loading engine configuration")?;
    if let Some(root) = args.content {
        config.content_root = root;
    }
    logging::init_tracing(&config.logging);
    let mut content = DirectorySource::new(&config.content_root);
    let mut tilesets = TilesetCache::new();

    // 2. ── Dispatch ───────────────────────────────────────────────────
    match args.command {
        Command::Check { map } => {
            let map = Map::load(&map, &content, &mut tilesets, config.world_options())
                .with_context(|| format!("Loading map {map}"))?;
            let scripts: BTreeSet<&str> = map.npcs().iter().filter_map(|n| n.script()).collect();
            let mut library = script::ScriptLibrary::new();
            for name in &scripts {
                library
                    .load(name, &content)
                    .with_context(|| format!("Compiling script {name}"))?;
            }
            println!(
                "{}: {}x{}, {} npcs, {} scripts ok",
                map.name(),
                map.size().x,
                map.size().y,
                map.npcs().len(),
                scripts.len()
            );
        }
        Command::Batches { map } => {
            let map = Map::load(&map, &content, &mut tilesets, config.world_options())
                .with_context(|| format!("Loading map {map}"))?;
            let batches = map.batches();
            for (priority, quads) in batches.priorities() {
                println!("priority {priority:>3}: {} quads", quads.len());
            }
            for layer in 0..model::LAYER_COUNT {
                println!("layer    {layer:>3}: {} quads", batches.layer(layer).len());
            }
            println!(
                "total: {} quads, {} vertices",
                batches.quad_count(),
                batches.vertex_count()
            );
        }
        Command::New {
            name,
            width,
            height,
            tile,
            tileset,
        } => {
            let set = tilesets
                .get_or_load(&tileset, &content)
                .with_context(|| format!("Loading tileset {tileset}"))?;
            let size = MapSize {
                x: width,
                y: height,
            };
            let map = Map::empty(&name, size, tile, set, config.world_options())
                .with_context(|| format!("Building map {name}"))?;

            // 3. ── Write outputs ──────────────────────────────────────
            writer::map::emit(&map, &mut content).with_context(|| format!("Writing map {name}"))?;
        }
        Command::Script { name } => {
            let program = script::ScriptLibrary::new()
                .load(&name, &content)
                .with_context(|| format!("Compiling script {name}"))?;
            for (pc, op) in program.ops.iter().enumerate() {
                println!("{pc:04} {op}");
            }
        }
    }

    Ok(())
}
