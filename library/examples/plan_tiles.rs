use std::path::PathBuf;

use clap::Parser;
use raster_grid::{plan_split, sanitize_name, GeoTransform, RasterDescriptor, SplitPlan};

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Print the tile grid a raster of the given size and geotransform would be split into"
)]
struct Args {
    /// Raster width in pixels
    #[arg(long, value_name = "INT")]
    width: usize,

    /// Raster height in pixels
    #[arg(long, value_name = "INT")]
    height: usize,

    /// Geotransform as six comma-separated numbers, GDAL order
    #[arg(long, value_name = "F64,..", value_delimiter = ',', allow_negative_numbers = true)]
    geo_transform: Vec<f64>,

    /// Tile edge in pixels
    #[arg(long, value_name = "INT", default_value_t = 1024)]
    tile_size: usize,

    /// Directory the tiles would be written to
    #[arg(long, value_name = "STR", default_value = "splitted-image")]
    output: String,

    /// Tile name prefix
    #[arg(long, value_name = "STR", default_value = "updated")]
    prefix: String,

    /// Dump the whole plan as JSON instead of one line per tile
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let gt: [f64; 6] = match args.geo_transform.as_slice().try_into() {
        Ok(gt) => gt,
        Err(_) => {
            eprintln!("Expected exactly six geotransform coefficients");
            return;
        }
    };
    let raster = RasterDescriptor {
        path: PathBuf::from("raster.tif"),
        width: args.width,
        height: args.height,
        transform: GeoTransform::from(gt),
        projection: String::new(),
    };

    let plan = match plan_split(
        &raster,
        args.tile_size,
        std::path::Path::new(&args.output),
        &sanitize_name(&args.prefix),
    ) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error planning tiles: {}", e);
            return;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&plan) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Error serializing plan: {}", e),
        }
        return;
    }

    match plan {
        SplitPlan::AlreadyTiled { destination, .. } => {
            println!("Raster is already one tile, would move to {}", destination.display())
        }
        SplitPlan::Grid(grid) => {
            println!(
                "{} x {} tiles of {} px ({} x {} units)",
                grid.count_across, grid.count_down, grid.tile_size, grid.tile_width, grid.tile_height
            );
            for (t_idx, request) in grid.requests.iter().enumerate() {
                println!(
                    "Tile-{} C{} R{} {}",
                    t_idx,
                    request.column,
                    request.row,
                    request.output.display()
                );
            }
        }
    }
}
