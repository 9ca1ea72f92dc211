use std::path::PathBuf;

use clap::{ArgAction, Parser};
use raster_grid::sanitize_name;

pub const DEFAULT_BUCKET: &str = "python-pictures-bucket";
pub const DEFAULT_CONVERTER_IMAGE: &str = "ginetto/gdal:2.4.4_ECW";
pub const DOWNLOAD_EXTENSION: &str = "ecw";
pub const RASTER_EXTENSION: &str = "tif";

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about,
    long_about = "Download a raster from object storage, convert it to GeoTIFF and split it into georeferenced tiles"
)]
pub struct Args {
    /// Object key of the raster to download
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Working directory for the download, the converted raster and the tiles
    #[arg(value_name = "PATH")]
    pub destination: PathBuf,

    /// Bucket holding the raster
    #[arg(long, value_name = "STR", env = "SPLITTER_BUCKET", default_value = DEFAULT_BUCKET)]
    pub bucket: String,

    /// Edge length of every tile, in pixels
    #[arg(long, value_name = "INT", env = "SPLITTER_TILE_SIZE", default_value_t = 1024)]
    pub tile_size: usize,

    /// Tile file name prefix; anything but ASCII letters is dropped
    #[arg(long, value_name = "STR", default_value = "updated")]
    pub prefix: String,

    /// Base name of the downloaded and converted raster
    #[arg(long, value_name = "STR", default_value = "splitter")]
    pub result_name: String,

    /// Name of the tile folder inside the destination (wiped on every run)
    #[arg(long, value_name = "STR", default_value = "splitted-image")]
    pub tiles_dir: String,

    /// Container image providing `gdal_translate` with ECW support
    #[arg(long, value_name = "STR", env = "SPLITTER_CONVERTER_IMAGE", default_value = DEFAULT_CONVERTER_IMAGE)]
    pub converter_image: String,

    /// Name given to the converter container
    #[arg(long, value_name = "STR", default_value = "gdalecw")]
    pub container_name: String,

    /// Container runtime executable
    #[arg(long, value_name = "PATH", default_value = "docker")]
    pub docker: String,

    /// Additional GeoTIFFs to split alongside the converted raster
    #[arg(long = "source", value_name = "PATH")]
    pub extra_sources: Vec<PathBuf>,

    /// Reuse an already downloaded raster
    #[arg(long)]
    pub skip_download: bool,

    /// Reuse an already converted raster
    #[arg(long)]
    pub skip_convert: bool,

    /// Plan the tiles without writing any
    #[arg(long)]
    pub dry_run: bool,

    /// Write the tile plans as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// More logging; repeat for trace output
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Everything a run needs, with every working path resolved.
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub bucket: String,
    pub key: String,
    pub destination: PathBuf,
    pub download_path: PathBuf,
    pub converted_path: PathBuf,
    pub tiles_dir: PathBuf,
    pub sources: Vec<PathBuf>,
    pub tile_size: usize,
    pub tile_name: String,
    pub converter: ConverterSettings,
    pub skip_download: bool,
    pub skip_convert: bool,
    pub dry_run: bool,
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConverterSettings {
    pub program: String,
    pub image: String,
    pub container_name: String,
    pub mount_point: String,
}

impl From<Args> for SplitterConfig {
    fn from(args: Args) -> Self {
        let destination = args.destination;
        let download_path =
            destination.join(format!("{}.{}", args.result_name, DOWNLOAD_EXTENSION));
        let converted_path =
            destination.join(format!("{}.{}", args.result_name, RASTER_EXTENSION));
        let tiles_dir = destination.join(&args.tiles_dir);

        let mut sources = vec![converted_path.clone()];
        sources.extend(args.extra_sources);

        SplitterConfig {
            bucket: args.bucket,
            key: args.key,
            download_path,
            converted_path,
            tiles_dir,
            sources,
            tile_size: args.tile_size,
            tile_name: sanitize_name(&args.prefix),
            converter: ConverterSettings {
                program: args.docker,
                image: args.converter_image,
                container_name: args.container_name,
                mount_point: "/home/datafolder".to_string(),
            },
            skip_download: args.skip_download,
            skip_convert: args.skip_convert,
            dry_run: args.dry_run,
            manifest: args.manifest,
            destination,
        }
    }
}

/// `RUST_LOG`-style directive for the `-v` count.
pub fn log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn parse(extra: &[&str]) -> SplitterConfig {
        let mut argv = vec!["raster_splitter", "ortho/area-51.ecw", "/data/run"];
        argv.extend_from_slice(extra);
        SplitterConfig::from(Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_resolve_working_paths() {
        let c = parse(&[]);
        assert_eq!(c.bucket, DEFAULT_BUCKET);
        assert_eq!(c.key, "ortho/area-51.ecw");
        assert_eq!(c.download_path, PathBuf::from("/data/run/splitter.ecw"));
        assert_eq!(c.converted_path, PathBuf::from("/data/run/splitter.tif"));
        assert_eq!(c.tiles_dir, PathBuf::from("/data/run/splitted-image"));
        assert_eq!(c.sources, vec![PathBuf::from("/data/run/splitter.tif")]);
        assert_eq!(c.tile_size, 1024);
        assert_eq!(c.tile_name, "updated");
        assert_eq!(c.converter.image, DEFAULT_CONVERTER_IMAGE);
        assert_eq!(c.converter.container_name, "gdalecw");
        assert!(!c.dry_run);
        assert_eq!(c.manifest, None);
    }

    #[test]
    fn overrides_and_extra_sources() {
        let c = parse(&[
            "--bucket",
            "imagery",
            "--tile-size",
            "512",
            "--prefix",
            "batch-7",
            "--result-name",
            "scene",
            "--tiles-dir",
            "tiles",
            "--source",
            "/data/other.tif",
            "--dry-run",
            "--manifest",
            "/data/plan.json",
        ]);
        assert_eq!(c.bucket, "imagery");
        assert_eq!(c.tile_size, 512);
        assert_eq!(c.tile_name, "batch");
        assert_eq!(c.download_path, PathBuf::from("/data/run/scene.ecw"));
        assert_eq!(c.tiles_dir, PathBuf::from("/data/run/tiles"));
        assert_eq!(
            c.sources,
            vec![
                PathBuf::from("/data/run/scene.tif"),
                PathBuf::from("/data/other.tif")
            ]
        );
        assert!(c.dry_run);
        assert_eq!(c.manifest, Some(PathBuf::from("/data/plan.json")));
    }

    #[test]
    fn key_and_destination_are_required() {
        assert!(Args::try_parse_from(["raster_splitter", "only-a-key"]).is_err());
    }

    #[test_case(0, "info")]
    #[test_case(1, "debug")]
    #[test_case(4, "trace")]
    fn verbosity_maps_to_level(v: u8, expected: &str) {
        assert_eq!(log_directive(v), expected);
    }
}
