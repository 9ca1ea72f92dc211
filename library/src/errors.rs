use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("tile size must be at least one pixel")]
    ZeroTileSize,

    #[error("raster has no pixels ({width}x{height})")]
    EmptyRaster { width: usize, height: usize },

    /// Only north-up rasters (no rotation, negative pixel height) can be gridded.
    #[error("unsupported geotransform {0:?}: expected a north-up raster without rotation")]
    UnsupportedTransform([f64; 6]),

    #[error("raster path {0:?} has no file name")]
    NoFileName(PathBuf),
}
