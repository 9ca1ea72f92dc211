use serde::{Deserialize, Serialize};

/// The affine transform GDAL attaches to a raster, mapping pixel/line to georeferenced
/// coordinates:
///
/// ```text
///     x = origin_x + col * pixel_width  + row * row_rotation
///     y = origin_y + col * column_rotation + row * pixel_height
/// ```
///
/// For a north-up image the rotation terms are zero and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub column_rotation: f64,
    pub pixel_height: f64,
}

impl From<[f64; 6]> for GeoTransform {
    fn from(gt: [f64; 6]) -> Self {
        GeoTransform {
            origin_x: gt[0],
            pixel_width: gt[1],
            row_rotation: gt[2],
            origin_y: gt[3],
            column_rotation: gt[4],
            pixel_height: gt[5],
        }
    }
}

impl GeoTransform {
    /// Coefficients in GDAL order, ready for `set_geo_transform`.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.column_rotation,
            self.pixel_height,
        ]
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0
            && self.column_rotation == 0.0
            && self.pixel_width > 0.0
            && self.pixel_height < 0.0
    }

    /// Bounding box of a `width` x `height` pixel raster. Only meaningful for north-up
    /// transforms.
    pub fn extent(&self, width: usize, height: usize) -> Bounds {
        Bounds {
            min_x: self.origin_x,
            min_y: self.origin_y + self.pixel_height * height as f64,
            max_x: self.origin_x + self.pixel_width * width as f64,
            max_y: self.origin_y,
        }
    }
}

/// Axis-aligned box in the raster's native coordinate units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Overlap of two boxes, `None` when they only touch or are disjoint.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let b = Bounds {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        if b.min_x < b.max_x && b.min_y < b.max_y {
            Some(b)
        } else {
            None
        }
    }

    /// `min_x_min_y_max_x_max_y`, used to name tile files so a tile's footprint can be read
    /// off its file name.
    pub fn label(&self) -> String {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .map(|v| format_coordinate(*v))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Shortest round-trip decimal in the same notation Python's `str(float)` uses, so tile
/// names stay stable for consumers that parse them: plain digits with a trailing `.0` on
/// integral values (`500000.0`) while the decimal exponent is in `-4..16`, and
/// `<mantissa>e<sign><two+ digit exponent>` outside it (`1e-05`, `1.5e+16`).
pub fn format_coordinate(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let scientific = format!("{:e}", v);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    if (-4..16).contains(&exponent) {
        let plain = format!("{}", v);
        if plain.contains('.') {
            plain
        } else {
            plain + ".0"
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const UTM: [f64; 6] = [500000.0, 0.5, 0.0, 4200000.0, 0.0, -0.5];

    #[test]
    fn array_conversion_keeps_gdal_order() {
        let gt = GeoTransform::from(UTM);
        assert_eq!(gt.origin_x, 500000.0);
        assert_eq!(gt.pixel_height, -0.5);
        assert_eq!(gt.to_array(), UTM);
    }

    #[test]
    fn extent_of_north_up_raster() {
        let gt = GeoTransform::from(UTM);
        let b = gt.extent(2000, 1000);
        assert_eq!(
            b,
            Bounds {
                min_x: 500000.0,
                min_y: 4199500.0,
                max_x: 501000.0,
                max_y: 4200000.0,
            }
        );
        assert_eq!(b.width(), 1000.0);
        assert_eq!(b.height(), 500.0);
    }

    #[test_case([0.0, 1.0, 0.0, 0.0, 0.0, -1.0], true ; "north up")]
    #[test_case([0.0, 1.0, 0.1, 0.0, 0.0, -1.0], false ; "row rotation")]
    #[test_case([0.0, 1.0, 0.0, 0.0, 0.2, -1.0], false ; "column rotation")]
    #[test_case([0.0, 1.0, 0.0, 0.0, 0.0, 1.0], false ; "south up")]
    #[test_case([0.0, 0.0, 0.0, 0.0, 0.0, -1.0], false ; "degenerate width")]
    fn north_up_detection(gt: [f64; 6], expected: bool) {
        assert_eq!(GeoTransform::from(gt).is_north_up(), expected);
    }

    #[test_case(500000.0, "500000.0")]
    #[test_case(-0.25, "-0.25")]
    #[test_case(4199487.75, "4199487.75")]
    #[test_case(0.1 + 0.2, "0.30000000000000004")]
    #[test_case(0.0001, "0.0001" ; "smallest plain fraction")]
    #[test_case(0.00001, "1e-05" ; "small fraction switches to exponent")]
    #[test_case(-0.000025, "-2.5e-05" ; "negative small fraction")]
    #[test_case(1e15, "1000000000000000.0" ; "largest plain integer")]
    #[test_case(1e16, "1e+16" ; "large integer switches to exponent")]
    #[test_case(1.5e16, "1.5e+16")]
    #[test_case(1e100, "1e+100" ; "three digit exponent")]
    #[test_case(0.0, "0.0")]
    fn coordinates_format_like_shortest_decimals(v: f64, expected: &str) {
        assert_eq!(format_coordinate(v), expected);
    }

    #[test]
    fn label_joins_all_four_edges() {
        let b = Bounds {
            min_x: 10.0,
            min_y: 20.5,
            max_x: 30.0,
            max_y: 40.25,
        };
        assert_eq!(b.label(), "10.0_20.5_30.0_40.25");
    }

    #[test]
    fn intersection_clips_and_rejects_touching_boxes() {
        let a = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 10.0,
            max_y: 10.0,
        };
        let b = Bounds {
            min_x: 5.0,
            min_y: -5.0,
            max_x: 15.0,
            max_y: 5.0,
        };
        assert_eq!(
            a.intersection(&b),
            Some(Bounds {
                min_x: 5.0,
                min_y: 0.0,
                max_x: 10.0,
                max_y: 5.0,
            })
        );

        let touching = Bounds {
            min_x: 10.0,
            min_y: 0.0,
            max_x: 20.0,
            max_y: 10.0,
        };
        assert_eq!(a.intersection(&touching), None);
    }
}
