//! GeoJSON area geometry: parsing, validation and conversion to `geo` types.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// GeoJSON position: `[lon, lat]` or `[lon, lat, alt]`.
pub type Position = Vec<f64>;

/// A linear ring as submitted: closed list of positions.
pub type Ring = Vec<Position>;

/// Service area geometry in EPSG:4326.
///
/// Kept in its submitted GeoJSON shape so reads return what was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AreaGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Invalid format: string or unicode input unrecognized as GeoJSON.")]
    Unrecognized,

    #[error("Unsupported geometry type '{0}', expected Polygon or MultiPolygon.")]
    UnsupportedType(String),

    #[error("Invalid geometry: {0}")]
    Invalid(String),
}

impl AreaGeometry {
    /// Parse an `area` value from a request body.
    ///
    /// Accepts a GeoJSON geometry object, a GeoJSON Feature wrapping one, or
    /// a string holding either.
    pub fn from_json(value: &Value) -> Result<Self, GeometryError> {
        match value {
            Value::String(text) => {
                let parsed: Value =
                    serde_json::from_str(text).map_err(|_| GeometryError::Unrecognized)?;
                if !parsed.is_object() {
                    return Err(GeometryError::Unrecognized);
                }
                Self::from_json(&parsed)
            }
            Value::Object(object) => {
                let geo_type = object
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or(GeometryError::Unrecognized)?;

                match geo_type {
                    "Feature" => {
                        let geometry = object.get("geometry").ok_or_else(|| {
                            GeometryError::Invalid("Feature has no geometry".to_string())
                        })?;
                        Self::from_json(geometry)
                    }
                    "Polygon" | "MultiPolygon" => {
                        let geometry: AreaGeometry = serde_json::from_value(value.clone())
                            .map_err(|e| GeometryError::Invalid(e.to_string()))?;
                        geometry.validate()?;
                        Ok(geometry)
                    }
                    other => Err(GeometryError::UnsupportedType(other.to_string())),
                }
            }
            _ => Err(GeometryError::Unrecognized),
        }
    }

    /// Check ring closure, ring length and coordinate sanity.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            AreaGeometry::Polygon { coordinates } => validate_polygon(coordinates),
            AreaGeometry::MultiPolygon { coordinates } => {
                if coordinates.is_empty() {
                    return Err(GeometryError::Invalid(
                        "MultiPolygon has no polygons".to_string(),
                    ));
                }
                coordinates.iter().try_for_each(|p| validate_polygon(p))
            }
        }
    }

    /// Convert to a `geo` multipolygon for containment tests.
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        match self {
            AreaGeometry::Polygon { coordinates } => {
                MultiPolygon::new(vec![rings_to_polygon(coordinates)])
            }
            AreaGeometry::MultiPolygon { coordinates } => MultiPolygon::new(
                coordinates
                    .iter()
                    .map(|rings| rings_to_polygon(rings))
                    .collect(),
            ),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AreaGeometry::Polygon { .. } => "Polygon",
            AreaGeometry::MultiPolygon { .. } => "MultiPolygon",
        }
    }
}

fn validate_polygon(rings: &[Ring]) -> Result<(), GeometryError> {
    if rings.is_empty() {
        return Err(GeometryError::Invalid("Polygon has no rings".to_string()));
    }

    for ring in rings {
        if ring.len() < 4 {
            return Err(GeometryError::Invalid(format!(
                "LinearRing must have at least 4 positions, got {}",
                ring.len()
            )));
        }

        for position in ring {
            if position.len() < 2 || position.len() > 3 {
                return Err(GeometryError::Invalid(format!(
                    "position must have 2 or 3 values, got {}",
                    position.len()
                )));
            }
            if position.iter().any(|v| !v.is_finite()) {
                return Err(GeometryError::Invalid(
                    "coordinates must be finite numbers".to_string(),
                ));
            }
        }

        let first = &ring[0][..2];
        let last = &ring[ring.len() - 1][..2];
        if first != last {
            return Err(GeometryError::Invalid(
                "LinearRing is not closed".to_string(),
            ));
        }
    }

    Ok(())
}

fn ring_to_line_string(ring: &[Position]) -> LineString<f64> {
    LineString::new(
        ring.iter()
            .map(|p| Coord { x: p[0], y: p[1] })
            .collect(),
    )
}

fn rings_to_polygon(rings: &[Ring]) -> Polygon<f64> {
    let exterior = rings
        .first()
        .map(|r| ring_to_line_string(r))
        .unwrap_or_else(|| LineString::new(vec![]));
    let interiors = rings.iter().skip(1).map(|r| ring_to_line_string(r)).collect();
    Polygon::new(exterior, interiors)
}
