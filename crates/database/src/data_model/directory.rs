use model::{
    driver::Driver,
    location::{Coordinates, Polygon},
    stop_point::{HighRiskZone, StopPoint},
    vehicle::Vehicle,
};
use sqlx::{prelude::FromRow, types::Json};
use utility::id::Id;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct DriverRow {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub license_number: Option<String>,
}

impl DatabaseRow for DriverRow {
    type Model = Driver;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id.clone())
    }

    fn to_model(self) -> Self::Model {
        Driver {
            name: self.name,
            phone: self.phone,
            license_number: self.license_number,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VehicleRow {
    pub id: String,
    pub plate_number: String,
    pub model: Option<String>,
    pub capacity_tonnes: Option<f64>,
}

impl DatabaseRow for VehicleRow {
    type Model = Vehicle;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id.clone())
    }

    fn to_model(self) -> Self::Model {
        Vehicle {
            plate_number: self.plate_number,
            model: self.model,
            capacity_tonnes: self.capacity_tonnes,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopPointRow {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub polygon: Json<Polygon>,
}

impl DatabaseRow for StopPointRow {
    type Model = StopPoint;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id.clone())
    }

    fn to_model(self) -> Self::Model {
        StopPoint {
            name: self.name,
            coordinates: self
                .latitude
                .zip(self.longitude)
                .map(|(latitude, longitude)| Coordinates::new(latitude, longitude)),
            polygon: self.polygon.0,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct HighRiskZoneRow {
    pub id: String,
    pub name: String,
    pub polygon: Json<Polygon>,
}

impl DatabaseRow for HighRiskZoneRow {
    type Model = HighRiskZone;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id.clone())
    }

    fn to_model(self) -> Self::Model {
        HighRiskZone {
            name: self.name,
            polygon: self.polygon.0,
        }
    }
}
