use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::atlas::SpriteVariant;

#[derive(Parser, Debug)]
#[command(name = "sprite-atlas")]
#[command(version, about = "Dynamic sprite atlas packer", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pack a sprite sheet into an atlas and write PNG + JSON
    Pack(CommonArgs),
    /// Load a sprite sheet and report its sprites and packing
    Inspect(CommonArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Sprite sheet base path; reads <SPRITE>.json and <SPRITE>.png (@2x when the ratio is above 1)
    #[arg(required_unless_present = "config")]
    pub sprite: Option<String>,

    /// Load settings from a JSON config file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory for atlas files [default: .]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Base name for output files (atlas.png, atlas.json) [default: atlas]
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Initial atlas width in atlas units [default: 64]
    #[arg(long)]
    pub width: Option<u32>,

    /// Initial atlas height in atlas units [default: 64]
    #[arg(long)]
    pub height: Option<u32>,

    /// Width the atlas may grow to [default: 4096]
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Height the atlas may grow to [default: 4096]
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Device pixels per atlas unit [default: 1]
    #[arg(long, value_name = "RATIO")]
    pub pixel_ratio: Option<f32>,

    /// Which variants to pack [default: icon]
    #[arg(long, value_enum)]
    pub variant: Option<VariantArg>,

    /// Pack only these sprites
    #[arg(long, value_name = "NAME", num_args = 1..)]
    pub only: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Compress PNG output (0-6 or 'max'). Default level is 2 if flag is present without value.
    #[arg(long, value_name = "LEVEL", default_missing_value = "2", num_args = 0..=1)]
    pub compress: Option<CompressionLevel>,
}

/// Variant selection for packing
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum VariantArg {
    /// Clamped edges
    #[default]
    Icon,
    /// Wrapped edges
    Pattern,
    /// Both copies of every sprite
    Both,
}

impl VariantArg {
    pub fn variants(self) -> &'static [SpriteVariant] {
        match self {
            VariantArg::Icon => &[SpriteVariant::Icon],
            VariantArg::Pattern => &[SpriteVariant::Pattern],
            VariantArg::Both => &[SpriteVariant::Icon, SpriteVariant::Pattern],
        }
    }

    /// Parse the config file spelling
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "icon" => Some(VariantArg::Icon),
            "pattern" => Some(VariantArg::Pattern),
            "both" => Some(VariantArg::Both),
            _ => None,
        }
    }
}

/// PNG compression level (0-6 or max)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Optimization level 0-6
    Level(u8),
    /// Maximum compression
    Max,
}

impl std::str::FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("max") {
            Ok(CompressionLevel::Max)
        } else {
            s.parse::<u8>()
                .map_err(|_e| format!("invalid compression level: {}", s))
                .and_then(|n| {
                    if n <= 6 {
                        Ok(CompressionLevel::Level(n))
                    } else {
                        Err(format!("compression level must be 0-6 or 'max', got {}", n))
                    }
                })
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::Level(2)
    }
}
