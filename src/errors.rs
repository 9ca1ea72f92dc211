use std::path::PathBuf;
use std::process::ExitStatus;

use raster_grid::GridError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitterError {
    #[error("no such file or bucket: s3://{bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("object storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("format conversion of {input:?} failed ({status})")]
    ConversionFailed { input: PathBuf, status: ExitStatus },

    #[error("format conversion finished but {0:?} was not written")]
    ConversionOutputMissing(PathBuf),

    #[error("cannot clip {raster:?}: unsupported band type {band_type}")]
    UnsupportedBandType { raster: PathBuf, band_type: String },

    #[error("{output:?} must be written next to its input in {data_dir:?}")]
    ConversionOutsideDataDir { data_dir: PathBuf, output: PathBuf },

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("cannot plan tiles: {0}")]
    Grid(#[from] GridError),

    #[error("cannot write manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SplitterError>;
