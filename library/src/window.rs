//! Pixel arithmetic for cutting a tile out of a source raster.
//!
//! A tile is described in georeferenced units ([`Bounds`] plus a resolution). To copy it, the
//! clipper needs two pixel rectangles: which part of the source to read, and where in the
//! output tile those pixels land. Anything of the tile outside the source extent stays nodata.

use serde::{Deserialize, Serialize};

use crate::geotransform::{Bounds, GeoTransform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn offset(&self) -> (isize, isize) {
        (self.x as isize, self.y as isize)
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMapping {
    pub source: PixelWindow,
    pub target: PixelWindow,
}

/// Pixel geometry of an output tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileLayout {
    pub bounds: Bounds,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

impl TileLayout {
    pub fn for_request(bounds: Bounds, x_resolution: f64, y_resolution: f64) -> Self {
        TileLayout {
            bounds,
            transform: GeoTransform {
                origin_x: bounds.min_x,
                pixel_width: x_resolution,
                row_rotation: 0.0,
                origin_y: bounds.max_y,
                column_rotation: 0.0,
                pixel_height: -y_resolution,
            },
            width: (bounds.width() / x_resolution).round() as usize,
            height: (bounds.height() / y_resolution).round() as usize,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

fn to_pixel(v: f64, limit: usize) -> usize {
    v.round().clamp(0.0, limit as f64) as usize
}

/// Maps the part of `layout` covered by a north-up source raster onto source and target pixel
/// windows. Returns `None` when the tile does not overlap the source at all.
pub fn map_window(
    source: &GeoTransform,
    source_size: (usize, usize),
    layout: &TileLayout,
) -> Option<WindowMapping> {
    let (source_width, source_height) = source_size;
    let overlap = layout
        .bounds
        .intersection(&source.extent(source_width, source_height))?;

    let tx = &layout.transform;
    let t_x0 = to_pixel((overlap.min_x - tx.origin_x) / tx.pixel_width, layout.width);
    let t_x1 = to_pixel((overlap.max_x - tx.origin_x) / tx.pixel_width, layout.width);
    let t_y0 = to_pixel((tx.origin_y - overlap.max_y) / -tx.pixel_height, layout.height);
    let t_y1 = to_pixel((tx.origin_y - overlap.min_y) / -tx.pixel_height, layout.height);

    let s_x0 = to_pixel((overlap.min_x - source.origin_x) / source.pixel_width, source_width);
    let s_x1 = to_pixel((overlap.max_x - source.origin_x) / source.pixel_width, source_width);
    let s_y0 = to_pixel((source.origin_y - overlap.max_y) / -source.pixel_height, source_height);
    let s_y1 = to_pixel((source.origin_y - overlap.min_y) / -source.pixel_height, source_height);

    if t_x1 <= t_x0 || t_y1 <= t_y0 || s_x1 <= s_x0 || s_y1 <= s_y0 {
        return None;
    }

    Some(WindowMapping {
        source: PixelWindow {
            x: s_x0,
            y: s_y0,
            width: s_x1 - s_x0,
            height: s_y1 - s_y0,
        },
        target: PixelWindow {
            x: t_x0,
            y: t_y0,
            width: t_x1 - t_x0,
            height: t_y1 - t_y0,
        },
    })
}
