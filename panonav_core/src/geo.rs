// Geodesy kernel.
//
// Pure functions over `Coordinate`s: great-circle distance (haversine),
// initial bearing, wraparound-safe angle arithmetic, metre/degree offsets,
// and a clipped spherical Mercator projection used to size a map request
// that fits a `SceneBounds`.
//
// Headings everywhere in the engine are compass degrees, clockwise from true
// north, normalized into [0, 360). Longitudes are signed (east positive); see
// `Coordinate::new` for the normalization that keeps that convention uniform.
//
// See also: `types.rs` for `Coordinate`, `heading.rs` for the four-direction
// frame built on `relative_heading`/`angular_diff`, `builder.rs` and
// `pathfinding.rs` which weight everything by `haversine_m`.

use crate::types::Coordinate;
use std::f64::consts::{FRAC_PI_4, PI};

/// Mean Earth radius in metres (haversine sphere).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meridional circumference in metres, for north/south offsets.
pub const POLE_CIRCUMFERENCE_M: f64 = 40_007_863.0;

/// Equatorial circumference in metres, for east/west offsets.
pub const EQUATOR_CIRCUMFERENCE_M: f64 = 40_075_017.0;

/// Latitude limit of the square Web-Mercator world.
pub const MERCATOR_MAX_LAT: f64 = 85.0511;

// ---------------------------------------------------------------------------
// Distance and bearing
// ---------------------------------------------------------------------------

/// Great-circle distance in metres.
///
/// Symmetric bit-for-bit: swapping the arguments only flips the sign of the
/// deltas, which are squared.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();

    let h = (dphi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing (forward azimuth) from `from` towards `to`, in [0, 360).
pub fn initial_bearing(from: Coordinate, to: Coordinate) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let dlambda = (to.lng - from.lng).to_radians();

    let x = dlambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    normalize_heading(x.atan2(y).to_degrees())
}

// ---------------------------------------------------------------------------
// Angle arithmetic
// ---------------------------------------------------------------------------

/// Fold any angle into [0, 360).
pub fn normalize_heading(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid of a tiny negative value rounds up to exactly 360.0.
    if r >= 360.0 { 0.0 } else { r }
}

/// Minimal unsigned difference between two angles, in [0, 180].
pub fn angular_diff(a: f64, b: f64) -> f64 {
    signed_angle_diff(a, b).abs()
}

/// Signed difference `a - b` wrapped into [-180, 180).
pub fn signed_angle_diff(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}

/// Heading `absolute` expressed relative to an agent facing `ego`.
pub fn relative_heading(absolute: f64, ego: f64) -> f64 {
    normalize_heading(absolute - ego)
}

// ---------------------------------------------------------------------------
// Offsets and projection
// ---------------------------------------------------------------------------

/// Move `origin` by `north_m` metres north and `east_m` metres east.
///
/// Flat-earth approximation around the origin latitude; accurate to well
/// under a metre at street scale.
pub fn offset_meters(origin: Coordinate, north_m: f64, east_m: f64) -> Coordinate {
    let lat_offset = north_m / POLE_CIRCUMFERENCE_M * 360.0;
    let lng_offset =
        east_m / (EQUATOR_CIRCUMFERENCE_M * origin.lat.to_radians().cos()) * 360.0;
    Coordinate::new(origin.lat + lat_offset, origin.lng + lng_offset)
}

/// Spherical Mercator projection to `(x, y)` in radians.
///
/// With `clip`, both axes are clamped to [-pi, pi] (the square world that
/// ends at roughly 85.0511 degrees of latitude).
pub fn mercator_project(coord: Coordinate, clip: bool) -> (f64, f64) {
    let x = coord.lng.to_radians();
    let y = (FRAC_PI_4 + coord.lat.to_radians() / 2.0).tan().ln();
    if clip {
        (x.clamp(-PI, PI), y.clamp(-PI, PI))
    } else {
        (x, y)
    }
}

/// Inverse of `mercator_project`.
pub fn inverse_mercator_project(x: f64, y: f64, clip: bool) -> Coordinate {
    let mut lng = x.to_degrees();
    let mut lat = (2.0 * y.exp().atan() - PI / 2.0).to_degrees();
    if clip {
        lng = lng.clamp(-180.0, 180.0);
        lat = lat.clamp(-90.0, 90.0);
    }
    Coordinate { lat, lng }
}

// ---------------------------------------------------------------------------
// Scene bounds
// ---------------------------------------------------------------------------

/// Axis-aligned lat/lng box: south, west, north, east edges in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneBounds {
    pub s: f64,
    pub w: f64,
    pub n: f64,
    pub e: f64,
}

/// Zoom level and pixel size that make a map request cover a `SceneBounds`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapFit {
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
}

impl SceneBounds {
    /// Square box extending `radius_m` from `center` in each direction.
    pub fn around(center: Coordinate, radius_m: f64) -> Self {
        let ne = offset_meters(center, radius_m, radius_m);
        let sw = offset_meters(center, -radius_m, -radius_m);
        Self {
            s: sw.lat,
            w: sw.lng,
            n: ne.lat,
            e: ne.lng,
        }
    }

    /// Tight bounding box of a set of coordinates; `None` when empty.
    pub fn enclosing<I: IntoIterator<Item = Coordinate>>(coords: I) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            s: first.lat,
            w: first.lng,
            n: first.lat,
            e: first.lng,
        };
        for c in iter {
            bounds.s = bounds.s.min(c.lat);
            bounds.n = bounds.n.max(c.lat);
            bounds.w = bounds.w.min(c.lng);
            bounds.e = bounds.e.max(c.lng);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            lat: (self.n + self.s) / 2.0,
            lng: (self.w + self.e) / 2.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        -90.0 <= self.s
            && self.s < self.n
            && self.n <= 90.0
            && (-180.0..=180.0).contains(&self.w)
            && (-180.0..=180.0).contains(&self.e)
    }

    /// True when the box neither crosses the antimeridian nor leaves the
    /// latitude range the Mercator projection can represent.
    pub fn is_trivial(&self) -> bool {
        self.w < self.e
            && -MERCATOR_MAX_LAT <= self.s
            && self.s < self.n
            && self.n <= MERCATOR_MAX_LAT
    }

    /// Largest zoom (capped at `max_zoom`) at which the box still fits in one
    /// tile, and the pixel size of the box at that zoom given a
    /// `base_size` of `(width, height)` pixels per full tile.
    ///
    /// A degenerate box (zero extent) fits at any zoom and returns `max_zoom`.
    pub fn fit_zoom(&self, max_zoom: u8, base_size: (u32, u32)) -> MapFit {
        let (ne_x, ne_y) = mercator_project(Coordinate { lat: self.n, lng: self.e }, true);
        let (sw_x, sw_y) = mercator_project(Coordinate { lat: self.s, lng: self.w }, true);
        let mut lat_scale = (ne_y - sw_y) / PI;
        let mut lng_scale = (ne_x - sw_x) / PI / 2.0;
        let scale = lat_scale.max(lng_scale);

        let zoom = if scale > 0.0 {
            let z = (1.0 / scale).log2().floor();
            z.clamp(0.0, f64::from(max_zoom)) as u8
        } else {
            max_zoom
        };

        let factor = f64::from(1u32 << zoom);
        lat_scale *= factor;
        lng_scale *= factor;
        MapFit {
            zoom,
            width: (lng_scale * f64::from(base_size.0)).round() as u32,
            height: (lat_scale * f64::from(base_size.1)).round() as u32,
        }
    }
}
