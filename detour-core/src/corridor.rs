//! Search corridors: the buffer around the straight path between two
//! endpoints.
//!
//! Distances to the centre line use an equirectangular projection anchored
//! at the corridor start. Over the few tens of kilometres a trip spans the
//! error against a true geodesic buffer is well below the radius
//! resolution callers work with.

use geo::{Coord, Distance, Haversine, Line, LineLocatePoint, Point, Rect};

use crate::error::ValidationError;

/// Mean Earth radius used by the planar projection.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Relative padding added to the bounding box so that projection
/// differences never push a buffered point outside the pre-filter.
const BOUNDING_MARGIN: f64 = 1.01;

/// Smallest cosine used when widening the bounding box in longitude, which
/// keeps near-polar corridors finite.
const MIN_LONGITUDE_SCALE: f64 = 0.01;

/// Great-circle distance in kilometres between two WGS84 coordinates.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "metre to kilometre conversion"
)]
pub fn haversine_km(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Haversine.distance(Point::from(a), Point::from(b)) / 1000.0
}

/// Buffer of `radius_km` around the segment from `start` to `end`.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use detour_core::Corridor;
///
/// let corridor = Corridor::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.1, y: 0.0 }, 2.0)?;
/// assert!(corridor.contains(Coord { x: 0.05, y: 0.01 }));
/// assert!(!corridor.contains(Coord { x: 0.05, y: 0.5 }));
/// # Ok::<(), detour_core::ValidationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corridor {
    start: Coord<f64>,
    end: Coord<f64>,
    radius_km: f64,
}

impl Corridor {
    /// Build a corridor, rejecting non-positive or non-finite radii and
    /// buffers that cross the antimeridian.
    pub fn new(
        start: Coord<f64>,
        end: Coord<f64>,
        radius_km: f64,
    ) -> Result<Self, ValidationError> {
        let corridor = Self {
            start,
            end,
            radius_km: check_radius(radius_km)?,
        };
        if corridor.crosses_antimeridian() {
            return Err(ValidationError::CrossesAntimeridian {
                start_lon: start.x,
                end_lon: end.x,
                radius_km,
            });
        }
        Ok(corridor)
    }

    /// Corridor start.
    #[must_use]
    pub const fn start(&self) -> Coord<f64> {
        self.start
    }

    /// Corridor end.
    #[must_use]
    pub const fn end(&self) -> Coord<f64> {
        self.end
    }

    /// Buffer radius in kilometres.
    #[must_use]
    pub const fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Whether `point` lies within the buffer. Points exactly on the
    /// boundary are inside.
    #[must_use]
    pub fn contains(&self, point: Coord<f64>) -> bool {
        self.distance_km(point) <= self.radius_km
    }

    /// Planar distance in kilometres from `point` to the centre segment.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "point-to-segment distance in projected kilometres"
    )]
    pub fn distance_km(&self, point: Coord<f64>) -> f64 {
        let (segment, projected) = self.project(point);
        let t = locate(&segment, projected);
        let closest = segment.start + (segment.end - segment.start) * t;
        (projected.x - closest.x).hypot(projected.y - closest.y)
    }

    /// Fraction in `[0, 1]` of the way along the centre segment at which
    /// `point` projects. Degenerate corridors report `0`.
    #[must_use]
    pub fn position_along(&self, point: Coord<f64>) -> f64 {
        let (segment, projected) = self.project(point);
        locate(&segment, projected)
    }

    /// Axis-aligned box enclosing the whole buffer, suitable for a spatial
    /// index pre-filter.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "degree padding derived from the radius"
    )]
    pub fn bounding_rect(&self) -> Rect<f64> {
        let km_per_degree = EARTH_RADIUS_KM.to_radians();
        let lat_pad = self.radius_km * BOUNDING_MARGIN / km_per_degree;
        let min_y = self.start.y.min(self.end.y) - lat_pad;
        let max_y = self.start.y.max(self.end.y) + lat_pad;
        let widest = min_y.abs().max(max_y.abs()).min(90.0);
        let scale = widest.to_radians().cos().max(MIN_LONGITUDE_SCALE);
        let lon_pad = self.radius_km * BOUNDING_MARGIN / (km_per_degree * scale);
        Rect::new(
            Coord {
                x: self.start.x.min(self.end.x) - lon_pad,
                y: min_y,
            },
            Coord {
                x: self.start.x.max(self.end.x) + lon_pad,
                y: max_y,
            },
        )
    }

    /// A segment spanning more than half the globe in longitude is shorter
    /// the other way round; a padded box past ±180° wraps.
    #[expect(clippy::float_arithmetic, reason = "longitude span")]
    fn crosses_antimeridian(&self) -> bool {
        let rect = self.bounding_rect();
        (self.start.x - self.end.x).abs() > 180.0 || rect.min().x < -180.0 || rect.max().x > 180.0
    }

    fn project(&self, point: Coord<f64>) -> (Line<f64>, Coord<f64>) {
        let segment = Line::new(
            to_local_km(self.start, self.start),
            to_local_km(self.start, self.end),
        );
        (segment, to_local_km(self.start, point))
    }
}

/// Reject zero, negative and non-finite radii.
pub(crate) fn check_radius(radius_km: f64) -> Result<f64, ValidationError> {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(ValidationError::NonPositiveRadius { radius_km });
    }
    Ok(radius_km)
}

fn locate(segment: &Line<f64>, point: Coord<f64>) -> f64 {
    segment
        .line_locate_point(&Point::from(point))
        .filter(|t| t.is_finite())
        .map_or(0.0, |t| t.clamp(0.0, 1.0))
}

/// Equirectangular projection of `point` into kilometres relative to
/// `origin`, scaling longitude by the cosine of the mean latitude.
#[expect(
    clippy::float_arithmetic,
    reason = "equirectangular projection"
)]
fn to_local_km(origin: Coord<f64>, point: Coord<f64>) -> Coord<f64> {
    let lat0 = origin.y.to_radians();
    let lat = point.y.to_radians();
    let mean_lat = (lat + lat0) / 2.0;
    Coord {
        x: (point.x - origin.x).to_radians() * mean_lat.cos() * EARTH_RADIUS_KM,
        y: (lat - lat0) * EARTH_RADIUS_KM,
    }
}
