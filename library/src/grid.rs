use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::errors::GridError;
use crate::geotransform::{Bounds, GeoTransform};

/// What the planner needs to know about a raster. Filled in from GDAL by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterDescriptor {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    /// Projection WKT, passed through to every tile untouched
    pub projection: String,
}

/// One tile to cut out of a source raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub bounds: Bounds,
    pub x_resolution: f64,
    pub y_resolution: f64,
    pub projection: String,
    pub column: usize,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    pub source: PathBuf,
    pub original_width: usize,
    pub original_height: usize,
    /// Tile edge in pixels
    pub tile_size: usize,
    /// Tile width in georeferenced units
    pub tile_width: f64,
    /// Tile height in georeferenced units
    pub tile_height: f64,
    pub count_across: usize,
    pub count_down: usize,
    pub requests: Vec<ClipRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitPlan {
    /// The raster already is exactly one tile; it only needs to move into the output folder.
    AlreadyTiled {
        source: PathBuf,
        destination: PathBuf,
    },
    Grid(TileGrid),
}

impl SplitPlan {
    /// Number of tile files the plan ends up producing.
    pub fn tile_count(&self) -> usize {
        match self {
            SplitPlan::AlreadyTiled { .. } => 1,
            SplitPlan::Grid(grid) => grid.requests.len(),
        }
    }
}

/// Strips everything but ASCII letters, so a prefix like `updated-2024_v2` becomes a safe
/// file-name stem (`updatedv`).
pub fn sanitize_name(prefix: &str) -> String {
    prefix.chars().filter(char::is_ascii_alphabetic).collect()
}

pub fn tile_file_name(name: &str, bounds: &Bounds) -> String {
    format!("{}_{}_.tiff", name, bounds.label())
}

/// Lays a grid of `tile_size` x `tile_size` pixel cells over a raster, anchored at the
/// raster's top-left corner.
///
/// The number of cells along each axis is the raster extent divided by the tile extent,
/// rounded to the nearest integer (ties to even). A raster 2.4 tiles wide gets two columns and
/// loses the remainder; one 2.6 tiles wide gets three and the last column overhangs the image.
///
/// ```text
///     origin
///       ┌──────────┬──────────┬──────────┐
///       │ (0,0)    │ (1,0)    │ (2,0)    │
///       │ req #0   │ req #2   │ req #4   │
///       ├──────────┼──────────┼──────────┤
///       │ (0,1)    │ (1,1)    │ (2,1)    │
///       │ req #1   │ req #3   │ req #5   │
///       └──────────┴──────────┴──────────┘
/// ```
///
/// Requests are emitted column by column, each column top to bottom.
///
/// A raster whose size is exactly one tile is not clipped at all: the plan is
/// [`SplitPlan::AlreadyTiled`] and the file should just be moved into `output_dir`. Its
/// geotransform is never looked at, so rotated or ungeoreferenced single tiles still move.
pub fn plan_split(
    raster: &RasterDescriptor,
    tile_size: usize,
    output_dir: &Path,
    name: &str,
) -> Result<SplitPlan, GridError> {
    if tile_size == 0 {
        return Err(GridError::ZeroTileSize);
    }
    if raster.width == 0 || raster.height == 0 {
        return Err(GridError::EmptyRaster {
            width: raster.width,
            height: raster.height,
        });
    }
    if raster.width == tile_size && raster.height == tile_size {
        let file_name = raster
            .path
            .file_name()
            .ok_or_else(|| GridError::NoFileName(raster.path.clone()))?;
        return Ok(SplitPlan::AlreadyTiled {
            source: raster.path.clone(),
            destination: output_dir.join(file_name),
        });
    }

    if !raster.transform.is_north_up() {
        return Err(GridError::UnsupportedTransform(raster.transform.to_array()));
    }

    let gt = &raster.transform;
    let extent = gt.extent(raster.width, raster.height);
    let tile_width = gt.pixel_width * tile_size as f64;
    let tile_height = gt.pixel_height.abs() * tile_size as f64;

    let count_across = (extent.width() / tile_width).round_ties_even() as usize;
    let count_down = (extent.height() / tile_height).round_ties_even() as usize;

    let requests = (0..count_across)
        .cartesian_product(0..count_down)
        .map(|(column, row)| {
            let min_x = extent.min_x + column as f64 * tile_width;
            let max_y = extent.max_y - row as f64 * tile_height;
            let bounds = Bounds {
                min_x,
                min_y: max_y - tile_height,
                max_x: min_x + tile_width,
                max_y,
            };
            ClipRequest {
                source: raster.path.clone(),
                output: output_dir.join(tile_file_name(name, &bounds)),
                bounds,
                x_resolution: gt.pixel_width,
                y_resolution: gt.pixel_height.abs(),
                projection: raster.projection.clone(),
                column,
                row,
            }
        })
        .collect();

    Ok(SplitPlan::Grid(TileGrid {
        source: raster.path.clone(),
        original_width: raster.width,
        original_height: raster.height,
        tile_size,
        tile_width,
        tile_height,
        count_across,
        count_down,
        requests,
    }))
}
