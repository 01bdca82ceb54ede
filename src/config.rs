use std::path::PathBuf;

use clap::Parser;

/// Encoding of the persisted and embedded atlas image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TextureFormat {
    #[value(name = "png")]
    Png,
    #[value(name = "webp")]
    WebP,
}

impl std::fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureFormat::Png => write!(f, "png"),
            TextureFormat::WebP => write!(f, "webp"),
        }
    }
}

/// What a tile does with an object whose texture cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DecodePolicy {
    /// Fail the whole tile.
    #[value(name = "abort")]
    Abort,
    /// Keep the object's geometry but drop its texture and UVs.
    #[value(name = "drop")]
    DropTexture,
}

impl std::fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodePolicy::Abort => write!(f, "abort"),
            DecodePolicy::DropTexture => write!(f, "drop"),
        }
    }
}

/// Tiling parameters.
#[derive(Debug, Clone)]
pub struct TilingConfig {
    pub max_objects_per_tile: usize,
    pub geometric_error: f64,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            max_objects_per_tile: 100_000,
            geometric_error: 500.0,
        }
    }
}

/// Atlas packing and encoding parameters.
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    /// Largest canvas side the packer may grow to.
    pub max_size: u32,
    /// Empty pixels left between neighbouring textures.
    pub gutter: u32,
    pub format: TextureFormat,
    pub decode_policy: DecodePolicy,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            max_size: 16384,
            gutter: 0,
            format: TextureFormat::Png,
            decode_policy: DecodePolicy::Abort,
        }
    }
}

/// Fully resolved pipeline configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tiling: TilingConfig,
    pub atlas: AtlasConfig,
    pub dry_run: bool,
    pub verbose: bool,
    pub log_json: bool,
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            tiling: TilingConfig::default(),
            atlas: AtlasConfig::default(),
            dry_run: false,
            verbose: false,
            log_json: false,
            threads: None,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "city-atlas",
    about = "Textured city objects to OGC 3D Tiles with one packed texture atlas per tile",
    version
)]
pub struct CliArgs {
    /// Input directory of OBJ files (one city object per file)
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Output directory
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Max city objects per tile
    #[arg(long, default_value_t = 100_000)]
    pub max_objects: usize,

    /// Geometric error assigned to every tile
    #[arg(long, default_value_t = 500.0)]
    pub geometric_error: f64,

    /// Max atlas side in pixels
    #[arg(long, default_value_t = 16384)]
    pub atlas_max_size: u32,

    /// Empty pixels between packed textures
    #[arg(long, default_value_t = 0)]
    pub atlas_gutter: u32,

    /// Atlas image format: png or webp
    #[arg(long, value_enum, default_value = "png")]
    pub atlas_format: TextureFormat,

    /// Undecodable textures: abort the tile or drop the texture
    #[arg(long, value_enum, default_value = "abort")]
    pub on_decode_error: DecodePolicy,

    /// Partition input and report tiles only
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl From<CliArgs> for PipelineConfig {
    fn from(args: CliArgs) -> Self {
        PipelineConfig {
            input: args.input,
            output: args.output,
            tiling: TilingConfig {
                max_objects_per_tile: args.max_objects,
                geometric_error: args.geometric_error,
            },
            atlas: AtlasConfig {
                max_size: args.atlas_max_size,
                gutter: args.atlas_gutter,
                format: args.atlas_format,
                decode_policy: args.on_decode_error,
            },
            dry_run: args.dry_run,
            verbose: args.verbose,
            log_json: args.log_json,
            threads: args.threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiling_config() {
        let tc = TilingConfig::default();
        assert_eq!(tc.max_objects_per_tile, 100_000);
        assert!((tc.geometric_error - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_atlas_config() {
        let ac = AtlasConfig::default();
        assert_eq!(ac.max_size, 16384);
        assert_eq!(ac.gutter, 0);
        assert_eq!(ac.format, TextureFormat::Png);
        assert_eq!(ac.decode_policy, DecodePolicy::Abort);
    }

    #[test]
    fn enum_display() {
        assert_eq!(TextureFormat::Png.to_string(), "png");
        assert_eq!(TextureFormat::WebP.to_string(), "webp");
        assert_eq!(DecodePolicy::Abort.to_string(), "abort");
        assert_eq!(DecodePolicy::DropTexture.to_string(), "drop");
    }

    #[test]
    fn cli_args_to_pipeline_config() {
        let args = CliArgs::parse_from([
            "city-atlas",
            "-i",
            "buildings",
            "-o",
            "./out",
            "--max-objects",
            "50",
            "--geometric-error",
            "120",
            "--atlas-max-size",
            "4096",
            "--atlas-gutter",
            "1",
            "--atlas-format",
            "webp",
            "--on-decode-error",
            "drop",
            "--dry-run",
            "--log-json",
            "-v",
            "-j",
            "8",
        ]);

        let config: PipelineConfig = args.into();

        assert_eq!(config.input, PathBuf::from("buildings"));
        assert_eq!(config.output, PathBuf::from("./out"));
        assert_eq!(config.tiling.max_objects_per_tile, 50);
        assert!((config.tiling.geometric_error - 120.0).abs() < f64::EPSILON);
        assert_eq!(config.atlas.max_size, 4096);
        assert_eq!(config.atlas.gutter, 1);
        assert_eq!(config.atlas.format, TextureFormat::WebP);
        assert_eq!(config.atlas.decode_policy, DecodePolicy::DropTexture);
        assert!(config.dry_run);
        assert!(config.log_json);
        assert!(config.verbose);
        assert_eq!(config.threads, Some(8));
    }

    #[test]
    fn cli_args_minimal() {
        let args = CliArgs::parse_from(["city-atlas", "-i", "in", "-o", "output"]);
        let config: PipelineConfig = args.into();

        assert_eq!(config.input, PathBuf::from("in"));
        assert_eq!(config.output, PathBuf::from("output"));
        assert_eq!(config.tiling.max_objects_per_tile, 100_000);
        assert_eq!(config.atlas.max_size, 16384);
        assert_eq!(config.atlas.format, TextureFormat::Png);
        assert_eq!(config.atlas.decode_policy, DecodePolicy::Abort);
        assert!(!config.dry_run);
        assert!(!config.verbose);
        assert!(!config.log_json);
        assert_eq!(config.threads, None);
    }
}
