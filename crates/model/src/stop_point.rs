use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::location::{Coordinates, Polygon};

/// An approved place for a vehicle to halt.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopPoint {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Polygon::is_empty")]
    pub polygon: Polygon,
}

impl HasId for StopPoint {
    type IdType = String;
}

impl StopPoint {
    /// Whether `point` lies within this stop point's bounds. Stop points
    /// without a polygon contain nothing.
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.polygon.contains(point)
    }
}

/// Reference data for map overlays: an area where halting is considered
/// risky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HighRiskZone {
    pub name: String,
    pub polygon: Polygon,
}

impl HasId for HighRiskZone {
    type IdType = String;
}

impl HighRiskZone {
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.polygon.contains(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(name: &str) -> HighRiskZone {
        HighRiskZone {
            name: name.to_owned(),
            polygon: Polygon(vec![
                Coordinates::new(-26.0, 28.0),
                Coordinates::new(-26.0, 28.1),
                Coordinates::new(-26.1, 28.1),
                Coordinates::new(-26.1, 28.0),
            ]),
        }
    }

    #[test]
    fn zone_contains_points_inside_its_polygon() {
        let zone = square("N1 off-ramp");
        assert!(zone.contains(&Coordinates::new(-26.05, 28.05)));
        assert!(!zone.contains(&Coordinates::new(-25.9, 28.05)));
    }

    #[test]
    fn stop_point_without_polygon_contains_nothing() {
        let stop = StopPoint {
            name: "Harrismith weighbridge".to_owned(),
            coordinates: Some(Coordinates::new(-28.27, 29.12)),
            polygon: Polygon::default(),
        };
        assert!(!stop.contains(&Coordinates::new(-28.27, 29.12)));
    }

    #[test]
    fn polygon_is_omitted_when_empty() {
        let stop = StopPoint {
            name: "Depot".to_owned(),
            coordinates: None,
            polygon: Polygon::default(),
        };
        let json = serde_json::to_value(&stop).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "Depot" }));
    }
}
