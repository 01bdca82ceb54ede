use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use city_atlas::config::{CliArgs, PipelineConfig};
use city_atlas::pipeline::Pipeline;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("city_atlas=debug")
    } else {
        EnvFilter::new("city_atlas=info")
    };
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config: PipelineConfig = args.into();

    // Configure rayon thread pool
    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure rayon thread pool")?;
    }

    match Pipeline::run(&config) {
        Ok(result) => {
            let verb = if config.dry_run { "planned" } else { "generated" };
            println!(
                "Done: {} tiles {verb} from {} objects in {:.2}s",
                result.tile_count,
                result.object_count,
                result.duration.as_secs_f64()
            );
            if result.failed_tiles > 0 {
                println!("Skipped {} failed tiles, see log", result.failed_tiles);
            }
            Ok(())
        }
        Err(e) => {
            error!(%e, "Pipeline failed");
            Err(anyhow::anyhow!(e)).context("city-atlas pipeline failed")
        }
    }
}
