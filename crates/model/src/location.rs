use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        geo::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// A closed ring of coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Polygon(pub Vec<Coordinates>);

impl Polygon {
    pub fn contains(&self, point: &Coordinates) -> bool {
        let ring = self
            .0
            .iter()
            .map(|c| (c.latitude, c.longitude))
            .collect::<Vec<_>>();
        geo::polygon_contains(&ring, point.latitude, point.longitude)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
