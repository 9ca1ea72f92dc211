use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use raster_grid::{plan_split, SplitPlan};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SplitterConfig;
use crate::convert::FormatConverter;
use crate::errors::Result;
use crate::progress::{bytes_bar, tiles_bar};
use crate::raster::{inspect, RasterClipper};
use crate::storage::ObjectFetcher;

/// What happened to one source raster.
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub source: PathBuf,
    pub plan: SplitPlan,
}

/// Download, convert, split. Each step runs to completion before the next starts and the
/// first failure ends the run.
pub async fn run(config: &SplitterConfig) -> Result<Vec<SplitReport>> {
    tokio::fs::create_dir_all(&config.destination).await?;

    if config.skip_download {
        info!("Skipping download, using {}", config.download_path.display());
    } else {
        let fetcher = ObjectFetcher::from_env(&config.bucket)?;
        download_raster(&fetcher, config).await?;
    }

    if config.skip_convert {
        info!("Skipping conversion, using {}", config.converted_path.display());
    } else {
        FormatConverter::new(config.converter.clone())
            .convert(&config.download_path, &config.converted_path)
            .await?;
    }

    split_all(config)
}

pub async fn download_raster(fetcher: &ObjectFetcher, config: &SplitterConfig) -> Result<u64> {
    let size = fetcher.stat(&config.key).await?;
    info!(
        "Downloading s3://{}/{} ({} bytes)",
        fetcher.bucket(),
        config.key,
        size
    );
    let pb = bytes_bar(size, &config.key);
    let written = fetcher
        .download(&config.key, &config.download_path, |n| pb.inc(n))
        .await?;
    pb.finish();
    Ok(written)
}

/// Splits every configured source into the tile folder. Sources that do not exist are
/// skipped.
pub fn split_all(config: &SplitterConfig) -> Result<Vec<SplitReport>> {
    if !config.dry_run {
        prepare_tiles_dir(&config.tiles_dir)?;
    }

    let mut reports = Vec::new();
    for source in &config.sources {
        if !source.exists() {
            warn!("{} does not exist, skipping", source.display());
            continue;
        }
        info!(
            "Process {} into {}",
            source.display(),
            config.tiles_dir.display()
        );
        let plan = split_raster(source, config)?;
        reports.push(SplitReport {
            source: source.clone(),
            plan,
        });
    }

    if let Some(manifest) = &config.manifest {
        write_manifest(manifest, &reports)?;
    }

    let tiles: usize = reports.iter().map(|r| r.plan.tile_count()).sum();
    info!("{} tiles from {} rasters", tiles, reports.len());
    Ok(reports)
}

pub fn split_raster(source: &Path, config: &SplitterConfig) -> Result<SplitPlan> {
    if config.dry_run {
        let descriptor = inspect(source)?;
        return Ok(plan_split(
            &descriptor,
            config.tile_size,
            &config.tiles_dir,
            &config.tile_name,
        )?);
    }

    let clipper = RasterClipper::open(source)?;
    let plan = plan_split(
        clipper.descriptor(),
        config.tile_size,
        &config.tiles_dir,
        &config.tile_name,
    )?;

    match &plan {
        SplitPlan::AlreadyTiled {
            source,
            destination,
        } => {
            drop(clipper);
            info!(
                "{} already is a single tile, moving it to {}",
                source.display(),
                destination.display()
            );
            move_file(source, destination)?;
        }
        SplitPlan::Grid(grid) => {
            info!(
                "Start clipping: {} x {} tiles",
                grid.count_across, grid.count_down
            );
            let pb = tiles_bar(grid.requests.len(), "clipping");
            for request in &grid.requests {
                debug!("clip {}", request.output.display());
                clipper.clip(request)?;
                pb.inc(1);
            }
            pb.finish();
        }
    }
    Ok(plan)
}

/// Empties the tile folder: removes it with everything inside, then creates it again.
pub fn prepare_tiles_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => debug!("removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir(path)?;
    Ok(())
}

/// `rename`, falling back to copy and delete when the rename itself is refused (e.g. across
/// filesystems). A missing source or destination folder fails with the rename's own error.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Err(e) = fs::rename(from, to) {
        if e.kind() == ErrorKind::NotFound {
            return Err(e.into());
        }
        debug!(
            "rename {} -> {} failed ({}), copying instead",
            from.display(),
            to.display(),
            e
        );
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

fn write_manifest(path: &Path, reports: &[SplitReport]) -> Result<()> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, reports)?;
    info!("Wrote tile manifest to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::errors::SplitterError;
    use crate::raster::tests::{synthetic_raster, ungeoreferenced_raster};
    use clap::Parser;
    use std::sync::Arc;

    fn config(destination: &Path, extra: &[&str]) -> SplitterConfig {
        let destination = destination.to_string_lossy().into_owned();
        let mut argv = vec![
            "raster_splitter",
            "scene.ecw",
            destination.as_str(),
            "--tile-size",
            "100",
        ];
        argv.extend_from_slice(extra);
        SplitterConfig::from(Args::try_parse_from(argv).unwrap())
    }

    fn tile_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn prepare_tiles_dir_wipes_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = dir.path().join("run").join("tiles");
        fs::create_dir_all(&tiles).unwrap();
        fs::write(tiles.join("stale.tiff"), b"old").unwrap();

        prepare_tiles_dir(&tiles).unwrap();
        assert!(tiles.is_dir());
        assert!(tile_files(&tiles).is_empty());

        // also works when nothing is there yet
        let fresh = dir.path().join("fresh");
        prepare_tiles_dir(&fresh).unwrap();
        assert!(fresh.is_dir());
    }

    #[test]
    fn move_file_relocates() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.tif");
        let to = dir.path().join("b.tif");
        fs::write(&from, b"pixels").unwrap();
        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"pixels");
    }

    #[test]
    fn move_into_missing_folder_keeps_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.tif");
        fs::write(&from, b"pixels").unwrap();

        let err = move_file(&from, &dir.path().join("nowhere").join("a.tif")).unwrap_err();
        assert!(matches!(err, SplitterError::Io(ref e) if e.kind() == ErrorKind::NotFound));
        assert_eq!(fs::read(&from).unwrap(), b"pixels");
    }

    #[test]
    fn splits_converted_raster_into_grid() {
        let dir = tempfile::tempdir().unwrap();
        let c = config(dir.path(), &[]);
        synthetic_raster(&c.converted_path, 300, 200);

        let reports = split_all(&c).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].plan.tile_count(), 6);

        let names = tile_files(&c.tiles_dir);
        assert_eq!(names.len(), 6);
        assert!(names.iter().all(|n| n.starts_with("updated_") && n.ends_with("_.tiff")));
        assert!(names.contains(&"updated_1000.0_4800.0_1200.0_5000.0_.tiff".to_string()));
    }

    #[test]
    fn missing_sources_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.tif");
        synthetic_raster(&other, 200, 200);
        let other_arg = other.to_string_lossy().into_owned();
        let c = config(dir.path(), &["--source", other_arg.as_str()]);

        // the converted raster was never produced
        let reports = split_all(&c).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].source, other);
        assert_eq!(tile_files(&c.tiles_dir).len(), 4);
    }

    #[test]
    fn single_tile_raster_is_moved() {
        let dir = tempfile::tempdir().unwrap();
        let c = config(dir.path(), &[]);
        synthetic_raster(&c.converted_path, 100, 100);

        let reports = split_all(&c).unwrap();
        assert!(matches!(reports[0].plan, SplitPlan::AlreadyTiled { .. }));
        assert!(!c.converted_path.exists());
        assert_eq!(tile_files(&c.tiles_dir), vec!["splitter.tif".to_string()]);
    }

    #[test]
    fn ungeoreferenced_single_tile_is_moved() {
        let dir = tempfile::tempdir().unwrap();
        let c = config(dir.path(), &[]);
        ungeoreferenced_raster(&c.converted_path, 100, 100);

        let reports = split_all(&c).unwrap();
        assert!(matches!(reports[0].plan, SplitPlan::AlreadyTiled { .. }));
        assert_eq!(tile_files(&c.tiles_dir), vec!["splitter.tif".to_string()]);
    }

    #[test]
    fn ungeoreferenced_grid_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let c = config(dir.path(), &[]);
        ungeoreferenced_raster(&c.converted_path, 300, 200);

        let err = split_all(&c).unwrap_err();
        assert!(matches!(
            err,
            SplitterError::Grid(raster_grid::GridError::UnsupportedTransform(_))
        ));
    }

    #[test]
    fn dry_run_only_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("plan.json");
        let manifest_arg = manifest.to_string_lossy().into_owned();
        let c = config(dir.path(), &["--dry-run", "--manifest", manifest_arg.as_str()]);
        synthetic_raster(&c.converted_path, 300, 200);

        let reports = split_all(&c).unwrap();
        assert_eq!(reports[0].plan.tile_count(), 6);
        assert!(!c.tiles_dir.exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&manifest).unwrap()).unwrap();
        assert_eq!(json[0]["plan"]["kind"], "grid");
        assert_eq!(json[0]["plan"]["requests"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn download_raster_lands_at_download_path() {
        use object_store::{memory::InMemory, path::Path as ObjectPath, ObjectStore, PutPayload};

        let store = InMemory::new();
        store
            .put(&ObjectPath::from("scene.ecw"), PutPayload::from(vec![9u8; 1000]))
            .await
            .unwrap();
        let fetcher = ObjectFetcher::new(Arc::new(store), "bucket");

        let dir = tempfile::tempdir().unwrap();
        let c = config(dir.path(), &[]);
        assert_eq!(download_raster(&fetcher, &c).await.unwrap(), 1000);
        assert_eq!(fs::read(&c.download_path).unwrap().len(), 1000);
    }

    #[tokio::test]
    async fn run_with_local_inputs_splits_and_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let manifest = dir.path().join("plan.json");
        let manifest_arg = manifest.to_string_lossy().into_owned();
        let c = config(
            &work,
            &[
                "--skip-download",
                "--skip-convert",
                "--manifest",
                manifest_arg.as_str(),
            ],
        );
        fs::create_dir_all(&work).unwrap();
        synthetic_raster(&c.converted_path, 300, 200);

        let reports = run(&c).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(tile_files(&c.tiles_dir).len(), 6);
        assert!(manifest.exists());
    }

    #[tokio::test]
    async fn run_creates_missing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("not").join("yet");
        let c = config(&work, &["--skip-download", "--skip-convert"]);

        let reports = run(&c).await.unwrap();
        assert!(reports.is_empty());
        assert!(work.is_dir());
        assert!(c.tiles_dir.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_conversion_stops_before_tiles_dir_is_touched() {
        let dir = tempfile::tempdir().unwrap();
        let c = config(dir.path(), &["--skip-download", "--docker", "false"]);
        fs::write(&c.download_path, b"ecw").unwrap();
        fs::create_dir_all(&c.tiles_dir).unwrap();
        fs::write(c.tiles_dir.join("stale.tiff"), b"old").unwrap();

        let err = run(&c).await.unwrap_err();
        assert!(matches!(err, SplitterError::ConversionFailed { .. }));
        assert_eq!(tile_files(&c.tiles_dir), vec!["stale.tiff".to_string()]);
    }
}
