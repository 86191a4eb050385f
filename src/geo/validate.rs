use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::geo::GeoPoint;

/// A single coordinate as it arrives from a caller: a JSON number or a
/// numeric string such as `"52.5200"`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CoordinateValue {
    Number(f64),
    Text(String),
}

impl From<f64> for CoordinateValue {
    fn from(value: f64) -> Self {
        CoordinateValue::Number(value)
    }
}

impl From<&str> for CoordinateValue {
    fn from(value: &str) -> Self {
        CoordinateValue::Text(value.to_string())
    }
}

/// `[latitude, longitude]`
pub type CoordinatePair = [CoordinateValue; 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Origin,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn bound(&self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvalidKind {
    Parse(String),
    OutOfRange(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {endpoint} {axis}: {kind}")]
pub struct ValidationError {
    pub endpoint: Endpoint,
    pub axis: Axis,
    pub kind: InvalidKind,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Origin => f.write_str("origin"),
            Endpoint::Destination => f.write_str("destination"),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => f.write_str("latitude"),
            Axis::Longitude => f.write_str("longitude"),
        }
    }
}

impl fmt::Display for InvalidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidKind::Parse(raw) => write!(f, "{raw:?} is not a finite decimal number"),
            InvalidKind::OutOfRange(value) => write!(f, "{value} is out of range"),
        }
    }
}

/// Both ends of a trip after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

/// Checks origin first, then destination, latitude before longitude, and
/// stops at the first bad field.
pub fn validate_route(
    origin: &CoordinatePair,
    destination: &CoordinatePair,
) -> Result<Route, ValidationError> {
    Ok(Route {
        origin: validate_point(Endpoint::Origin, origin)?,
        destination: validate_point(Endpoint::Destination, destination)?,
    })
}

fn validate_point(endpoint: Endpoint, pair: &CoordinatePair) -> Result<GeoPoint, ValidationError> {
    let [lat, lng] = pair;
    Ok(GeoPoint {
        lat: validate_value(endpoint, Axis::Latitude, lat)?,
        lng: validate_value(endpoint, Axis::Longitude, lng)?,
    })
}

fn validate_value(endpoint: Endpoint, axis: Axis, value: &CoordinateValue) -> Result<f64, ValidationError> {
    let fail = |kind| ValidationError {
        endpoint,
        axis,
        kind,
    };

    let parsed = match value {
        CoordinateValue::Number(n) => *n,
        CoordinateValue::Text(raw) => raw
            .parse::<f64>()
            .map_err(|_| fail(InvalidKind::Parse(raw.clone())))?,
    };

    if !parsed.is_finite() {
        return Err(fail(InvalidKind::Parse(parsed.to_string())));
    }

    if parsed.abs() > axis.bound() {
        return Err(fail(InvalidKind::OutOfRange(parsed)));
    }

    Ok(parsed)
}
