//! Text form of a coordinate pair: `"lat,lon"`, five decimals, `.` separator.
//!
//! Rust's float parsing and formatting never consult the host locale, so both
//! directions are locale independent.

use crate::error::ParseError;
use crate::model::LatLon;

/// Digits after the decimal point in the persisted form.
pub const COORDINATE_PRECISION: usize = 5;

/// Parses `"lat,lon"`. Whitespace around each side is ignored. Exactly one
/// comma is allowed. No range checks.
pub fn parse(text: &str) -> Result<(f64, f64), ParseError> {
    let (lat, lon) = text.split_once(',').ok_or(ParseError::Malformed)?;
    if lon.contains(',') {
        return Err(ParseError::Malformed);
    }
    Ok((parse_component(lat)?, parse_component(lon)?))
}

fn parse_component(raw: &str) -> Result<f64, ParseError> {
    let value: f64 = raw.trim().parse().map_err(|_| ParseError::Malformed)?;
    if !value.is_finite() {
        return Err(ParseError::Malformed);
    }
    Ok(value)
}

#[must_use]
pub fn format(lat: f64, lon: f64) -> String {
    format!(
        "{lat:.prec$},{lon:.prec$}",
        prec = COORDINATE_PRECISION
    )
}

#[must_use]
pub fn format_component(value: f64) -> String {
    format!("{value:.prec$}", prec = COORDINATE_PRECISION)
}

#[must_use]
pub fn format_lat_lon(location: LatLon) -> String {
    format(location.lat(), location.lon())
}

/// Parses and range-checks in one step; bad text and out-of-range values both
/// come back as `Malformed`.
pub fn parse_lat_lon(text: &str) -> Result<LatLon, ParseError> {
    let (lat, lon) = parse(text)?;
    LatLon::new(lat, lon).map_err(|_| ParseError::Malformed)
}

/// Snaps a location to the precision it will have after a store round trip.
#[must_use]
pub fn quantize(location: LatLon) -> LatLon {
    parse_lat_lon(&format_lat_lon(location)).unwrap_or(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_with_five_decimals() {
        assert_eq!(format(12.97, 77.59), "12.97000,77.59000");
        assert_eq!(format(-33.868_82, 151.209_29), "-33.86882,151.20929");
        assert_eq!(format(0.0, 0.0), "0.00000,0.00000");
    }

    #[test]
    fn parses_with_surrounding_whitespace() {
        assert_eq!(parse(" 12.97000 , 77.59000 ").unwrap(), (12.97, 77.59));
        assert_eq!(parse("-1.5,2").unwrap(), (-1.5, 2.0));
    }

    #[test]
    fn parse_does_not_range_check() {
        assert_eq!(parse("95.0,200.0").unwrap(), (95.0, 200.0));
        assert_eq!(parse_lat_lon("95.0,200.0"), Err(ParseError::Malformed));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["", "12.5", "12.5,", ",77.5", "abc,1.0", "1.0,abc", "12,5;7,5", "NaN,1", "1,inf", "1.0,2.0,", "1.0,2.0,3.0"] {
            assert_eq!(parse(bad), Err(ParseError::Malformed), "input {bad:?}");
        }
    }

    #[test]
    fn parse_rejects_locale_decimal_comma() {
        // "12,97;77,59" splits into "12" and "97;77" -> second side fails
        assert_eq!(parse("12,97;77,59"), Err(ParseError::Malformed));
    }

    #[test]
    fn quantize_matches_stored_precision() {
        let raw = LatLon::new(12.970_004_9, 77.589_996).unwrap();
        let q = quantize(raw);
        assert_eq!(format_lat_lon(q), "12.97000,77.59000");
        assert_eq!(q.as_tuple(), (12.97, 77.59));
    }

    proptest! {
        #[test]
        fn round_trip_within_tolerance(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let (plat, plon) = parse(&format(lat, lon)).unwrap();
            prop_assert!((plat - lat).abs() <= 1e-5);
            prop_assert!((plon - lon).abs() <= 1e-5);
        }
    }
}
