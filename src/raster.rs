use std::path::Path;

use gdal::raster::{Buffer, GdalDataType, GdalType};
use gdal::{Dataset, DriverManager};
use num::{NumCast, Zero};
use raster_grid::{map_window, ClipRequest, GeoTransform, RasterDescriptor, TileLayout};
use tracing::{debug, warn};

use crate::errors::{Result, SplitterError};

/// What GDAL reports for a raster with no georeferencing. It is not north-up, so the planner
/// refuses to grid such a raster but still moves one that is exactly one tile.
const UNGEOREFERENCED: [f64; 6] = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Reads what the tile planner needs to know about a raster.
pub fn inspect(path: &Path) -> Result<RasterDescriptor> {
    let dataset = Dataset::open(path)?;
    describe(path, &dataset)
}

fn describe(path: &Path, dataset: &Dataset) -> Result<RasterDescriptor> {
    let (width, height) = dataset.raster_size();
    let transform = match dataset.geo_transform() {
        Ok(gt) => GeoTransform::from(gt),
        Err(e) => {
            warn!("{} has no geotransform ({})", path.display(), e);
            GeoTransform::from(UNGEOREFERENCED)
        }
    };
    debug!(
        "{}: {}x{} px, origin=({}, {}), pixel=({}, {})",
        path.display(),
        width,
        height,
        transform.origin_x,
        transform.origin_y,
        transform.pixel_width,
        transform.pixel_height
    );
    if !transform.is_north_up() {
        warn!(
            "{} is not north-up (geotransform {:?})",
            path.display(),
            transform.to_array()
        );
    }
    Ok(RasterDescriptor {
        path: path.to_path_buf(),
        width,
        height,
        transform,
        projection: dataset.projection(),
    })
}

/// Cuts tiles out of one open source raster.
pub struct RasterClipper {
    dataset: Dataset,
    descriptor: RasterDescriptor,
}

impl RasterClipper {
    pub fn open(path: &Path) -> Result<Self> {
        let dataset = Dataset::open(path)?;
        let descriptor = describe(path, &dataset)?;
        Ok(RasterClipper {
            dataset,
            descriptor,
        })
    }

    pub fn descriptor(&self) -> &RasterDescriptor {
        &self.descriptor
    }

    /// Writes the tile described by `request` as a GeoTIFF with the source's band type.
    ///
    /// The tile always has the full size implied by its bounds and resolution. Parts of it
    /// that fall outside the source are filled with the band's nodata value, or zero when the
    /// band has none. GDAL resamples (nearest neighbour) when the requested resolution differs
    /// from the source's.
    ///
    /// Band types without a Rust pixel type are refused rather than written as another type.
    pub fn clip(&self, request: &ClipRequest) -> Result<()> {
        match self.dataset.rasterband(1)?.band_type() {
            GdalDataType::UInt8 => self.clip_as::<u8>(request),
            GdalDataType::Int8 => self.clip_as::<i8>(request),
            GdalDataType::UInt16 => self.clip_as::<u16>(request),
            GdalDataType::Int16 => self.clip_as::<i16>(request),
            GdalDataType::UInt32 => self.clip_as::<u32>(request),
            GdalDataType::Int32 => self.clip_as::<i32>(request),
            GdalDataType::UInt64 => self.clip_as::<u64>(request),
            GdalDataType::Int64 => self.clip_as::<i64>(request),
            GdalDataType::Float32 => self.clip_as::<f32>(request),
            GdalDataType::Float64 => self.clip_as::<f64>(request),
            other => Err(SplitterError::UnsupportedBandType {
                raster: self.descriptor.path.clone(),
                band_type: format!("{:?}", other),
            }),
        }
    }

    fn clip_as<T>(&self, request: &ClipRequest) -> Result<()>
    where
        T: GdalType + Copy + NumCast + Zero,
    {
        let layout =
            TileLayout::for_request(request.bounds, request.x_resolution, request.y_resolution);
        let mapping = map_window(
            &self.descriptor.transform,
            (self.descriptor.width, self.descriptor.height),
            &layout,
        );
        if mapping.is_none() {
            debug!("{} lies outside the source", request.output.display());
        }

        let band_count = self.dataset.raster_count();
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut out = driver.create_with_band_type::<T, _>(
            &request.output,
            layout.width,
            layout.height,
            band_count,
        )?;
        out.set_geo_transform(&layout.transform.to_array())?;
        out.set_projection(&request.projection)?;

        for b in 1..=band_count {
            let src_band = self.dataset.rasterband(b)?;
            let nodata = src_band.no_data_value();
            let fill = nodata
                .and_then(|v| <T as NumCast>::from(v))
                .unwrap_or_else(T::zero);
            let mut pixels = vec![fill; layout.pixel_count()];

            if let Some(m) = &mapping {
                let read = src_band.read_as::<T>(
                    m.source.offset(),
                    m.source.size(),
                    m.target.size(),
                    None,
                )?;
                for (row, line) in read.data().chunks(m.target.width).enumerate() {
                    let start = (m.target.y + row) * layout.width + m.target.x;
                    pixels[start..start + m.target.width].copy_from_slice(line);
                }
            }

            let mut dst_band = out.rasterband(b)?;
            if nodata.is_some() {
                dst_band.set_no_data_value(nodata)?;
            }
            let mut buffer = Buffer::new((layout.width, layout.height), pixels);
            dst_band.write((0, 0), (layout.width, layout.height), &mut buffer)?;
        }
        Ok(())
    }
}
