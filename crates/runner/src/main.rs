use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::LevelFilter;

use config::Config;
use regions::Region;
use stops::RegionCrs;

mod config;
mod regions;

/// Reconstructs normalized public-transport stops from OSM data, region by
/// region, and exports them as GeoJSON layers and vector tiles.
#[derive(Debug, Parser)]
#[command(name = "runner")]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if config.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    if !config.logs_path.is_empty() {
        match File::create(format!("{}run.log", config.logs_path)) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("cannot open log file under {}: {}", config.logs_path, e),
        }
    }
    builder.init();
    if config.debug {
        log::info!("started logging in debug mode");
    } else {
        log::info!("started logging with debug mode turned off");
    }
}

async fn process_region(
    client: &overpass::Client,
    config: &Config,
    region: &Region,
) -> Result<(), Box<dyn Error>> {
    let crs = RegionCrs::new(&config.lon_lat_crs, &region.meters_crs, &config.web_crs)?;
    let frames =
        stops::process_region(client, &config.engine_params(), &crs, region.area_id()).await?;
    export::export_region(&frames, &crs, &config.export_paths(), &region.code)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = Config::load(&args.config).expect("could not read configuration");
    init_logging(&config);

    let regions_path = Path::new(&config.regions_path);
    let mut regions = regions::load_regions(regions_path).expect("could not read region manifest");
    log::info!("found {} regions", regions.len());

    let client = overpass::Client::new(
        &config.overpass_url,
        &config.overpass_key,
        config.overpass_timeout,
    )
    .expect("could not build overpass client");

    for region in regions.iter_mut() {
        if region.ignore {
            log::info!("ignoring region {} ({})", region.name, region.code);
            continue;
        }
        if !config.wants_region(&region.code) {
            log::info!("skipping region {} ({})", region.name, region.code);
            continue;
        }
        log::info!("processing region {} ({})", region.name, region.code);
        match process_region(&client, &config, region).await {
            Ok(()) => {
                region.timestamp = chrono::Utc::now().timestamp() as u64;
                log::info!("finished region {} ({})", region.name, region.code);
            }
            Err(e) => {
                log::error!("region {} failed: {}", region.code, e);
            }
        }
    }

    if let Err(e) = regions::save_regions(regions_path, &regions) {
        log::error!("could not update region manifest: {}", e);
    }
}
