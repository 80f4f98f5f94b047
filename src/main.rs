use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use sprite_atlas::atlas::{DEFAULT_MAX_SIZE, SpriteAtlas, SpriteVariant};
use sprite_atlas::cli::{CliArgs, Command, CommonArgs, CompressionLevel, VariantArg};
use sprite_atlas::config::{CompressConfig, LoadedConfig};
use sprite_atlas::error::AtlasError;
use sprite_atlas::loader::{FileTransport, LoadState, SpriteObserver};
use sprite_atlas::output::{save_atlas_image, write_json};
use sprite_atlas::packing::Size;

#[allow(clippy::print_stderr)]
fn main() {
    if let Err(e) = run() {
        // Use eprintln instead of error! because logger may not be initialized
        // (e.g., config loading fails before logger init)
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let args = match &cli.command {
        Command::Pack(args) | Command::Inspect(args) => args.clone(),
    };

    // Load config if specified and merge with CLI args
    let merged = merge_config_with_args(&args)?;

    env_logger::Builder::new()
        .filter_level(if merged.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    info!("Sprite atlas v{}", env!("CARGO_PKG_VERSION"));

    let mut atlas = SpriteAtlas::new(Size::new(merged.width, merged.height), merged.pixel_ratio)
        .max_size(Size::new(merged.max_width, merged.max_height));
    atlas.set_observer(Box::new(LogObserver));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(atlas.load(&merged.sprite, &FileTransport::new()));

    if atlas.load_state() != LoadState::Loaded {
        anyhow::bail!("failed to load sprite sheet '{}'", merged.sprite);
    }

    let names: Vec<String> = if merged.only.is_empty() {
        atlas.sprite_names()
    } else {
        merged.only.clone()
    };

    let mut packed = 0;
    for name in &names {
        for variant in merged.variant.variants() {
            let placement = match variant {
                SpriteVariant::Icon => atlas.get_icon(name),
                SpriteVariant::Pattern => atlas.get_pattern(name),
            };
            if placement.is_some() {
                packed += 1;
            }
        }
    }
    info!(
        "Packed {} entries into {}x{} ({:.1}% used)",
        packed,
        atlas.size().width,
        atlas.size().height,
        atlas.occupancy() * 100.0
    );

    match &cli.command {
        Command::Pack(_) => write_outputs(&mut atlas, &merged)?,
        Command::Inspect(_) => inspect(&atlas),
    }

    info!("Done!");

    Ok(())
}

fn write_outputs(atlas: &mut SpriteAtlas, merged: &MergedConfig) -> Result<()> {
    if !merged.output.exists() {
        fs::create_dir_all(&merged.output)?;
    }

    let path = merged.output.join(format!("{}.png", merged.name));
    save_atlas_image(atlas.atlas_image(), &path, merged.compress)?;
    info!("Saved {}", path.display());

    write_json(
        &atlas.packed(),
        atlas.size(),
        atlas.pixel_ratio(),
        &merged.output,
        &merged.name,
    )?;
    info!("Generated {}.json", merged.name);

    Ok(())
}

fn inspect(atlas: &SpriteAtlas) {
    for name in atlas.sprite_names() {
        let Some(sprite) = atlas.get_sprite(&name) else {
            continue;
        };
        let (width, height) = sprite.dimensions();
        info!(
            "{}: {}x{} px @{}x{}",
            name,
            width,
            height,
            sprite.pixel_ratio,
            if sprite.sdf { " (sdf)" } else { "" }
        );
    }

    for entry in atlas.packed() {
        let pos = entry.placement.pos;
        info!(
            "{} {:?} at {}x{}+{}+{}",
            entry.name, entry.variant, pos.width, pos.height, pos.x, pos.y
        );
    }
}

/// Reports load outcomes through the logger
struct LogObserver;

impl SpriteObserver for LogObserver {
    fn on_sprites_loaded(&mut self) {
        info!("Sprite sheet loaded");
    }

    fn on_sprites_error(&mut self, error: &AtlasError) {
        error!("{}", error);
    }
}

/// Merged configuration from CLI args and optional config file.
struct MergedConfig {
    sprite: String,
    output: PathBuf,
    name: String,
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
    pixel_ratio: f32,
    variant: VariantArg,
    only: Vec<String>,
    verbose: bool,
    compress: Option<CompressionLevel>,
}

/// Merge config file values with CLI arguments.
/// CLI arguments always take precedence over config values.
fn merge_config_with_args(args: &CommonArgs) -> Result<MergedConfig> {
    let loaded_config = if let Some(config_path) = &args.config {
        Some(
            LoadedConfig::load(config_path)
                .with_context(|| format!("failed to load config: {}", config_path.display()))?,
        )
    } else {
        None
    };

    // Sprite sheet: CLI > config
    let sprite = args
        .sprite
        .clone()
        .or_else(|| loaded_config.as_ref().and_then(LoadedConfig::resolve_sprite))
        .context("no sprite sheet given on the command line or in the config file")?;

    // Output directory: CLI > config > default
    let output = args.output.clone().unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.resolve_output_dir())
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let name = args.name.clone().unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.name.clone())
            .unwrap_or_else(|| "atlas".to_string())
    });

    // For numeric fields: CLI > config > default
    let width = args.width.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.width)
            .unwrap_or(64)
    });

    let height = args.height.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.height)
            .unwrap_or(64)
    });

    let max_width = args.max_width.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.max_width)
            .unwrap_or(DEFAULT_MAX_SIZE)
    });

    let max_height = args.max_height.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.max_height)
            .unwrap_or(DEFAULT_MAX_SIZE)
    });

    let pixel_ratio = args.pixel_ratio.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.pixel_ratio)
            .unwrap_or(1.0)
    });

    if width == 0 || height == 0 {
        anyhow::bail!("atlas size must be at least 1x1, got {}x{}", width, height);
    }
    if !(pixel_ratio > 0.0 && pixel_ratio.is_finite()) {
        anyhow::bail!("pixel ratio must be positive, got {}", pixel_ratio);
    }

    // Variant: CLI > config > default
    let variant = if let Some(v) = args.variant {
        v
    } else if let Some(ref lc) = loaded_config {
        VariantArg::parse(&lc.config.variant).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown variant '{}' in config file. Valid values: icon, pattern, both",
                lc.config.variant
            )
        })?
    } else {
        VariantArg::Icon
    };

    let only = if !args.only.is_empty() {
        args.only.clone()
    } else if let Some(ref lc) = loaded_config {
        lc.config.only.clone()
    } else {
        Vec::new()
    };

    // Verbose is CLI-only
    let verbose = args.verbose;

    // Compress: CLI option overrides config
    let compress = if args.compress.is_some() {
        args.compress
    } else if let Some(ref lc) = loaded_config {
        match &lc.config.compress {
            Some(CompressConfig::Level(n)) if *n <= 6 => Some(CompressionLevel::Level(*n)),
            Some(CompressConfig::Max(s)) if s.eq_ignore_ascii_case("max") => {
                Some(CompressionLevel::Max)
            }
            Some(other) => {
                anyhow::bail!(
                    "invalid compress setting {:?} in config file. Valid values: 0-6, max",
                    other
                );
            }
            None => None,
        }
    } else {
        None
    };

    Ok(MergedConfig {
        sprite,
        output,
        name,
        width,
        height,
        max_width,
        max_height,
        pixel_ratio,
        variant,
        only,
        verbose,
        compress,
    })
}
