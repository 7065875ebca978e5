//! Geographic extent of the current selection.

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// Rectangle described by its south-west and north-east corners.
///
/// Coordinates are WGS84 degrees. Values derived through
/// [`BoundingBox::from_rect`] always hold the minimum latitude/longitude in the
/// south-west corner, because [`Rect`] normalises its corners on construction.
///
/// # Examples
/// ```
/// use geo::{Coord, Rect};
/// use regionscout_core::BoundingBox;
///
/// let rect = Rect::new(Coord { x: -79.9, y: 40.5 }, Coord { x: -80.0, y: 40.4 });
/// let bbox = BoundingBox::from_rect(&rect);
/// assert_eq!(bbox.lat_sw, 40.4);
/// assert_eq!(bbox.lng_ne, -79.9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Latitude of the south-west corner.
    pub lat_sw: f64,
    /// Longitude of the south-west corner.
    pub lng_sw: f64,
    /// Latitude of the north-east corner.
    pub lat_ne: f64,
    /// Longitude of the north-east corner.
    pub lng_ne: f64,
}

impl BoundingBox {
    /// Derive a bounding box from an overlay's rectangle (`x = lng`, `y = lat`).
    #[must_use]
    pub fn from_rect(rect: &Rect<f64>) -> Self {
        let min = rect.min();
        let max = rect.max();
        Self {
            lat_sw: min.y,
            lng_sw: min.x,
            lat_ne: max.y,
            lng_ne: max.x,
        }
    }

    /// Rectangle covering the same extent.
    #[must_use]
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.lng_sw,
                y: self.lat_sw,
            },
            Coord {
                x: self.lng_ne,
                y: self.lat_ne,
            },
        )
    }

    /// Closed ring of `[lng, lat]` pairs tracing the corners.
    ///
    /// The ring starts and ends at the south-west corner and runs
    /// north-west, north-east, south-east in between, which is the polygon
    /// layout the archive service expects.
    ///
    /// # Examples
    /// ```
    /// use regionscout_core::BoundingBox;
    ///
    /// let bbox = BoundingBox { lat_sw: 1.0, lng_sw: 2.0, lat_ne: 3.0, lng_ne: 4.0 };
    /// let ring = bbox.polygon_ring();
    /// assert_eq!(ring[0], [2.0, 1.0]);
    /// assert_eq!(ring[2], [4.0, 3.0]);
    /// assert_eq!(ring[0], ring[4]);
    /// ```
    #[must_use]
    pub const fn polygon_ring(&self) -> [[f64; 2]; 5] {
        [
            [self.lng_sw, self.lat_sw],
            [self.lng_sw, self.lat_ne],
            [self.lng_ne, self.lat_ne],
            [self.lng_ne, self.lat_sw],
            [self.lng_sw, self.lat_sw],
        ]
    }

    /// Whether the box encloses no area.
    ///
    /// Degenerate boxes are still accepted everywhere; callers use this only
    /// for diagnostics.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.lat_sw == self.lat_ne || self.lng_sw == self.lng_ne
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::from_rect(&rect)
    }
}
