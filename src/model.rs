use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{CoordinateError, ValidationError};

/// Prefix of system-generated incident identifiers.
pub const GENERATED_ID_PREFIX: &str = "SOS-";
/// Random suffix length of a generated identifier.
pub const GENERATED_ID_SUFFIX_LEN: usize = 4;
/// Minimum length of a user-supplied identifier.
pub const MIN_USER_ID_LEN: usize = 3;

/// User-facing incident identifier, unique within the store.
///
/// Immutable after construction; always uppercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(String);

impl IncidentId {
    /// Normalizes a user-supplied identifier: trimmed, at least
    /// [`MIN_USER_ID_LEN`] ASCII alphanumerics, stored uppercase.
    pub fn user_supplied(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.len() < MIN_USER_ID_LEN || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidIdentifier);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Accepts an identifier in the generated `SOS-XXXX` shape.
    pub fn generated(raw: &str) -> Result<Self, ValidationError> {
        let upper = raw.trim().to_ascii_uppercase();
        let suffix = upper
            .strip_prefix(GENERATED_ID_PREFIX)
            .ok_or(ValidationError::InvalidIdentifier)?;
        if suffix.len() != GENERATED_ID_SUFFIX_LEN
            || !suffix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InvalidIdentifier);
        }
        Ok(Self(upper))
    }

    /// Wraps an identifier read back from storage without re-validating it.
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisasterType {
    Flood,
    Fire,
    Landslide,
    Medical,
    Earthquake,
    RoadAccident,
}

impl DisasterType {
    /// Picker order.
    pub const ALL: [DisasterType; 6] = [
        Self::Flood,
        Self::Fire,
        Self::Landslide,
        Self::Medical,
        Self::Earthquake,
        Self::RoadAccident,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flood => "Flood",
            Self::Fire => "Fire",
            Self::Landslide => "Landslide",
            Self::Medical => "Medical",
            Self::Earthquake => "Earthquake",
            Self::RoadAccident => "Road Accident",
        }
    }
}

impl fmt::Display for DisasterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisasterType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Flood" => Ok(Self::Flood),
            "Fire" => Ok(Self::Fire),
            "Landslide" => Ok(Self::Landslide),
            "Medical" => Ok(Self::Medical),
            "Earthquake" => Ok(Self::Earthquake),
            "Road Accident" | "RoadAccident" => Ok(Self::RoadAccident),
            _ => Err(ValidationError::MissingType),
        }
    }
}

/// Connectivity snapshot captured when a record is created.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkStatus {
    Online,
    #[default]
    Offline,
}

impl NetworkStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
        }
    }

    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ONLINE" => Ok(Self::Online),
            "OFFLINE" => Ok(Self::Offline),
            _ => Err(()),
        }
    }
}

/// Validated lat/lon. Deserializing goes through [`LatLon::new`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLatLon")]
pub struct LatLon {
    lat: f64,
    lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    #[must_use]
    pub const fn as_tuple(self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

#[derive(Deserialize)]
struct RawLatLon {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawLatLon> for LatLon {
    type Error = CoordinateError;

    fn try_from(raw: RawLatLon) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lon)
    }
}

impl TryFrom<(f64, f64)> for LatLon {
    type Error = CoordinateError;

    fn try_from((lat, lon): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(lat, lon)
    }
}

/// Explicit timestamp unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    pub fn now() -> Self {
        Self(crate::get_current_time_ms())
    }
}

/// One durable incident. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub id: IncidentId,
    pub disaster_type: DisasterType,
    pub location: LatLon,
    pub network_status: NetworkStatus,
    pub timestamp: UnixTimeMs,
}

/// Map marker derived from a live record. Never created directly by callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapPin {
    pub key: IncidentId,
    pub label: String,
    pub position: LatLon,
}

impl From<&IncidentRecord> for MapPin {
    fn from(record: &IncidentRecord) -> Self {
        Self {
            key: record.id.clone(),
            label: record.disaster_type.as_str().to_string(),
            position: record.location,
        }
    }
}
