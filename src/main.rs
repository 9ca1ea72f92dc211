//
// Modules
//

mod config;
mod convert;
mod errors;
mod pipeline;
mod progress;
mod raster;
mod storage;

//
// Uses
//

use clap::Parser;

extern crate tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{log_directive, Args, SplitterConfig};

//
// Implementation
//

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(args.verbose)));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
    tracing::debug!("{:?}", &args);

    let config = SplitterConfig::from(args);
    match pipeline::run(&config).await {
        Ok(reports) => {
            for report in &reports {
                tracing::info!(
                    "{}: {} tiles",
                    report.source.display(),
                    report.plan.tile_count()
                );
            }
            tracing::info!("Done");
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}
