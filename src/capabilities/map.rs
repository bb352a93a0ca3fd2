use serde::{Deserialize, Serialize};

use crate::model::LatLon;

pub const MAX_LATITUDE_SPAN: f64 = 180.0;
pub const MAX_LONGITUDE_SPAN: f64 = 360.0;
const KM_PER_DEGREE_LATITUDE: f64 = 111.32;
const MIN_COS_LATITUDE: f64 = 1e-6;

/// Visible map area: a centre plus latitude/longitude spans in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    pub center: LatLon,
    pub latitude_degrees: f64,
    pub longitude_degrees: f64,
}

impl MapRegion {
    #[must_use]
    pub fn new(center: LatLon, latitude_degrees: f64, longitude_degrees: f64) -> Self {
        Self {
            center,
            latitude_degrees: clamp_span(latitude_degrees, MAX_LATITUDE_SPAN),
            longitude_degrees: clamp_span(longitude_degrees, MAX_LONGITUDE_SPAN),
        }
    }

    /// Region whose half-height is `radius_km`.
    #[must_use]
    pub fn from_center_and_radius(center: LatLon, radius_km: f64) -> Self {
        let latitude_degrees = 2.0 * radius_km / KM_PER_DEGREE_LATITUDE;
        let cos_lat = center.lat().to_radians().cos().abs().max(MIN_COS_LATITUDE);
        Self::new(center, latitude_degrees, latitude_degrees / cos_lat)
    }

    #[must_use]
    pub fn zoom_in(self) -> Self {
        Self::new(
            self.center,
            self.latitude_degrees / 2.0,
            self.longitude_degrees / 2.0,
        )
    }

    #[must_use]
    pub fn zoom_out(self) -> Self {
        Self::new(
            self.center,
            self.latitude_degrees * 2.0,
            self.longitude_degrees * 2.0,
        )
    }
}

fn clamp_span(span: f64, max: f64) -> f64 {
    if span.is_finite() {
        span.clamp(0.0, max)
    } else {
        max
    }
}
