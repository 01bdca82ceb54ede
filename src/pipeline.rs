use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{CityAtlasError, Result};
use crate::ingestion::{GeometryStore, ObjDirectoryStore};
use crate::tiling::{self, tileset_writer};
use crate::types::{TileBucket, TileSummary};

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct ProcessingResult {
    /// Tiles written, or planned under `--dry-run`.
    pub tile_count: usize,
    /// Tiles skipped because their assembly or encoding failed.
    pub failed_tiles: usize,
    pub object_count: usize,
    pub duration: Duration,
}

/// Pipeline orchestrator -- partition, assemble, encode, describe.
pub struct Pipeline;

impl Pipeline {
    /// Run the full conversion on the OBJ directory named by `config.input`.
    pub fn run(config: &PipelineConfig) -> Result<ProcessingResult> {
        info!(input = %config.input.display(), "Starting pipeline");
        let store = ObjDirectoryStore::open(&config.input)?;
        info!(objects = store.len(), "Loaded OBJ directory");
        Self::run_with_store(config, &store)
    }

    /// Run the conversion against any geometry store.
    ///
    /// A tile whose assembly or encoding fails is logged and left out of
    /// `tileset.json`; the run fails only when no tile could be written.
    pub fn run_with_store<S>(config: &PipelineConfig, store: &S) -> Result<ProcessingResult>
    where
        S: GeometryStore + ?Sized,
    {
        let start = Instant::now();

        info!("Stage 1/3: Partitioning");
        let objects = store.objects()?;
        if objects.is_empty() {
            return Err(CityAtlasError::Input("No city objects found".into()));
        }
        let object_count = objects.len();
        let buckets = tiling::partition(objects, config.tiling.max_objects_per_tile)?;

        if config.dry_run {
            info!("--dry-run: partitioning only");
            print_dry_run_summary(object_count, &buckets);
            return Ok(ProcessingResult {
                tile_count: buckets.len(),
                failed_tiles: 0,
                object_count,
                duration: start.elapsed(),
            });
        }

        info!(tiles = buckets.len(), "Stage 2/3: Tiles");
        fs::create_dir_all(config.output.join("tiles"))?;
        let outcomes: Vec<Result<TileSummary>> = buckets
            .par_iter()
            .map(|bucket| Self::process_tile(config, store, bucket))
            .collect();

        let mut summaries = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        let mut failed_tiles = 0;
        for (bucket, outcome) in buckets.iter().zip(outcomes) {
            match outcome {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!(tile = bucket.index, objects = bucket.objects.len(), "Tile failed: {e}");
                    failed_tiles += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        // Nothing to describe: surface the first failure instead.
        if let Some(e) = first_error.filter(|_| summaries.is_empty()) {
            return Err(e);
        }
        if failed_tiles > 0 {
            warn!(failed = failed_tiles, written = summaries.len(), "Some tiles were skipped");
        }

        info!("Stage 3/3: Tileset");
        tileset_writer::write_tileset(&summaries, &config.tiling, &config.output)?;

        let duration = start.elapsed();
        info!(tiles = summaries.len(), elapsed = ?duration, "Pipeline complete");

        Ok(ProcessingResult {
            tile_count: summaries.len(),
            failed_tiles,
            object_count,
            duration,
        })
    }

    fn process_tile<S>(config: &PipelineConfig, store: &S, bucket: &TileBucket) -> Result<TileSummary>
    where
        S: GeometryStore + ?Sized,
    {
        let tile = tiling::assemble_tile(store, bucket, &config.atlas)?;

        let atlas = tile
            .atlas
            .as_ref()
            .map(|img| tiling::encode_atlas(img, config.atlas.format))
            .transpose()?;

        let atlas_uri = match &atlas {
            Some(tex) => {
                let uri = tileset_writer::tile_atlas_uri(tile.index, tex.extension());
                write_file(&config.output, &uri, &tex.data)?;
                Some(uri)
            }
            None => None,
        };

        let content_uri = tileset_writer::tile_content_uri(tile.index);
        let glb = tiling::write_tile_glb(&tile, atlas.as_ref())?;
        write_file(&config.output, &content_uri, &glb)?;

        info!(
            tile = tile.index,
            objects = tile.objects.len(),
            textured = tile.textured_count(),
            atlas_side = tile.atlas_side,
            retries = tile.atlas_retries,
            "Wrote tile"
        );

        Ok(TileSummary {
            index: tile.index,
            centroid: tile.centroid,
            local_bounds: tile.local_bounds().unwrap_or_default(),
            content_uri,
            atlas_uri,
            atlas_side: tile.atlas_side,
            object_count: tile.objects.len(),
        })
    }
}

fn write_file(out_dir: &Path, uri: &str, data: &[u8]) -> Result<()> {
    let path = out_dir.join(uri);
    fs::write(&path, data)
        .map_err(|e| CityAtlasError::Output(format!("Failed to write {}: {e}", path.display())))
}

/// Print the planned tiles without touching the output directory.
fn print_dry_run_summary(object_count: usize, buckets: &[TileBucket]) {
    let largest = buckets.iter().map(|b| b.objects.len()).max().unwrap_or(0);
    let smallest = buckets.iter().map(|b| b.objects.len()).min().unwrap_or(0);

    println!("=== Dry Run Summary ===");
    println!("  Objects:   {object_count}");
    println!("  Tiles:     {}", buckets.len());
    println!("  Per tile:  {smallest}..{largest} objects");
    for bucket in buckets {
        let c = bucket.centroid();
        let size = bucket
            .bounds()
            .map(|b| b.half_extents().map(|h| h * 2.0))
            .unwrap_or_default();
        println!(
            "  tile_{:<5} {:>6} objects  centroid ({:.3}, {:.3}, {:.3})  size {:.1} x {:.1} x {:.1}",
            bucket.index,
            bucket.objects.len(),
            c[0],
            c[1],
            c[2],
            size[0],
            size[1],
            size[2]
        );
    }
}
