//! Tile-grid planning for georeferenced rasters.
//!
//! Nothing in here touches the filesystem or GDAL: callers describe a raster with a
//! [`grid::RasterDescriptor`], get back a [`grid::SplitPlan`] of clip requests, and use
//! [`window::map_window`] to turn each request into pixel windows.

pub mod errors;
pub mod geotransform;
pub mod grid;
pub mod window;

pub use errors::GridError;
pub use geotransform::{Bounds, GeoTransform};
pub use grid::{plan_split, sanitize_name, ClipRequest, RasterDescriptor, SplitPlan, TileGrid};
pub use window::{map_window, PixelWindow, TileLayout, WindowMapping};
