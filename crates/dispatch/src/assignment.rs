//! Who is driving what.
//!
//! A handover is encoded as a second entry in the first assignment's driver
//! list. Callers go through this module instead of reading `drivers[1]`.

use std::collections::HashSet;

use model::{
    driver::Driver,
    trip::{Assignment, Trip},
    trip_status::Stage,
    vehicle::Vehicle,
    WithId,
};
use schemars::JsonSchema;
use serde::Serialize;
use utility::{id::Id, let_also::LetAlso};

use crate::{RequestError, RequestResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crew<'a> {
    Unassigned,
    Assigned {
        driver: &'a Id<Driver>,
        /// Lined up to take over but not yet driving.
        successor: Option<&'a Id<Driver>>,
    },
    HandingOver {
        from: &'a Id<Driver>,
        to: &'a Id<Driver>,
    },
}

impl<'a> Crew<'a> {
    /// Everyone still bound to the trip. Both drivers count during a
    /// handover; a lined-up successor does not.
    pub fn on_duty(self) -> Vec<&'a Id<Driver>> {
        match self {
            Crew::Unassigned => vec![],
            Crew::Assigned { driver, .. } => vec![driver],
            Crew::HandingOver { from, to } => vec![from, to],
        }
    }
}

pub fn crew(trip: &Trip) -> Crew<'_> {
    let drivers = trip
        .assignment()
        .map(|assignment| assignment.drivers.as_slice())
        .unwrap_or_default();
    match drivers {
        [] => Crew::Unassigned,
        [driver] => Crew::Assigned {
            driver,
            successor: None,
        },
        [from, to, ..] if trip.status.is(Stage::Handover) => Crew::HandingOver { from, to },
        [driver, successor, ..] => Crew::Assigned {
            driver,
            successor: Some(successor),
        },
    }
}

/// The driver currently responsible for the trip: the successor while the
/// trip is in handover and one is assigned, otherwise the primary driver.
pub fn effective_driver(trip: &Trip) -> Option<&Id<Driver>> {
    match crew(trip) {
        Crew::Unassigned => None,
        Crew::Assigned { driver, .. } => Some(driver),
        Crew::HandingOver { to, .. } => Some(to),
    }
}

pub fn effective_vehicle(trip: &Trip) -> Option<&Id<Vehicle>> {
    trip.assignment()?.vehicle.as_ref()
}

pub fn handover_successor(trip: &Trip) -> Option<&Id<Driver>> {
    match crew(trip) {
        Crew::Assigned { successor, .. } => successor,
        Crew::HandingOver { to, .. } => Some(to),
        Crew::Unassigned => None,
    }
}

/// The assignment list after putting `driver` in sole charge. The vehicle of
/// the first assignment is kept. Any successor is dropped.
pub fn reassigned(assignments: &[Assignment], driver: Id<Driver>) -> Vec<Assignment> {
    assignments
        .to_vec()
        .also(|assignments| match assignments.first_mut() {
            Some(first) => first.drivers = vec![driver],
            None => assignments.push(Assignment::new(None, vec![driver])),
        })
}

/// Drivers not on duty on any of `trips`.
pub fn idle_drivers<'a>(
    trips: impl IntoIterator<Item = &'a Trip>,
    drivers: Vec<WithId<Driver>>,
) -> Vec<WithId<Driver>> {
    let busy = trips
        .into_iter()
        .filter(|trip| crate::status::is_active(&trip.status))
        .flat_map(|trip| crew(trip).on_duty())
        .collect::<HashSet<_>>();
    drivers
        .into_iter()
        .filter(|driver| !busy.contains(&driver.id))
        .collect()
}

/// A driver change waiting for the dispatcher to confirm it.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverChangeProposal {
    pub trip_id: Id<Trip>,
    pub current: Option<Id<Driver>>,
    pub replacement: Id<Driver>,
    /// A lined-up successor the change would discard.
    pub discarded_successor: Option<Id<Driver>>,
}

impl DriverChangeProposal {
    pub fn new(trip_id: Id<Trip>, trip: &Trip, replacement: Id<Driver>) -> Self {
        Self {
            trip_id,
            current: effective_driver(trip).cloned(),
            discarded_successor: handover_successor(trip)
                .filter(|successor| **successor != replacement)
                .cloned(),
            replacement,
        }
    }

    pub fn confirm(self) -> ConfirmedDriverChange {
        ConfirmedDriverChange(self)
    }

    pub fn confirm_if(self, confirmed: bool) -> RequestResult<ConfirmedDriverChange> {
        if confirmed {
            Ok(self.confirm())
        } else {
            Err(RequestError::Unconfirmed)
        }
    }
}

/// Only obtainable through [`DriverChangeProposal::confirm`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedDriverChange(DriverChangeProposal);

impl ConfirmedDriverChange {
    pub fn proposal(&self) -> &DriverChangeProposal {
        &self.0
    }

    pub fn trip_id(&self) -> &Id<Trip> {
        &self.0.trip_id
    }

    pub fn replacement(&self) -> &Id<Driver> {
        &self.0.replacement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use model::trip_status::TripStatus;
    use rstest::rstest;

    fn trip_with(status: &str, drivers: &[&str]) -> Trip {
        Trip {
            status: TripStatus::parse(status),
            assignments: vec![Assignment::new(
                Some("truck-1".into()),
                drivers.iter().map(|d| Id::from(*d)).collect(),
            )],
            ..Trip::new("Durban", "Johannesburg", Local::now())
        }
    }

    #[rstest]
    #[case("handover", &["a", "b"], Some("b"))]
    #[case("on-trip", &["a", "b"], Some("a"))]
    #[case("handover", &["a"], Some("a"))]
    #[case("delivered", &["a", "b"], Some("a"))]
    #[case("handover", &[], None)]
    fn effective_driver_cases(
        #[case] status: &str,
        #[case] drivers: &[&str],
        #[case] expected: Option<&str>,
    ) {
        let trip = trip_with(status, drivers);
        assert_eq!(effective_driver(&trip).map(Id::as_str), expected);
    }

    #[test]
    fn handover_and_back() {
        let mut trip = trip_with("on-trip", &["a", "b"]);
        trip.status = Stage::Handover.into();
        assert_eq!(effective_driver(&trip), Some(&Id::from("b")));
        trip.status = Stage::OnTrip.into();
        assert_eq!(effective_driver(&trip), Some(&Id::from("a")));
    }

    #[test]
    fn trips_without_assignments_are_unassigned() {
        let trip = Trip::new("Durban", "Johannesburg", Local::now());
        assert_eq!(crew(&trip), Crew::Unassigned);
        assert_eq!(effective_vehicle(&trip), None);
    }

    #[rstest]
    #[case(&[])]
    #[case(&["a"])]
    #[case(&["a", "b"])]
    fn reassignment_leaves_exactly_one_driver(#[case] drivers: &[&str]) {
        let trip = trip_with("handover", drivers);
        let assignments = reassigned(&trip.assignments, Id::from("c"));
        assert_eq!(assignments[0].drivers, vec![Id::from("c")]);
        assert_eq!(assignments[0].vehicle, Some(Id::from("truck-1")));
    }

    #[test]
    fn reassigning_an_unassigned_trip_creates_the_assignment() {
        let assignments = reassigned(&[], Id::from("c"));
        assert_eq!(assignments, vec![Assignment::new(None, vec![Id::from("c")])]);
    }

    #[test]
    fn proposal_reports_the_discarded_successor() {
        let trip = trip_with("on-trip", &["a", "b"]);
        let proposal = DriverChangeProposal::new(Id::from("trip-1"), &trip, Id::from("c"));
        assert_eq!(proposal.current, Some(Id::from("a")));
        assert_eq!(proposal.discarded_successor, Some(Id::from("b")));
        assert!(matches!(
            proposal.clone().confirm_if(false),
            Err(RequestError::Unconfirmed)
        ));
        assert_eq!(proposal.clone().confirm().proposal(), &proposal);
    }

    #[test]
    fn idle_drivers_excludes_drivers_on_duty() {
        let driver = |id: &str| {
            WithId::new(
                Id::from(id),
                Driver {
                    name: id.to_uppercase(),
                    phone: None,
                    license_number: None,
                },
            )
        };
        let trips = [
            trip_with("handover", &["a", "b"]),
            trip_with("on-trip", &["c", "d"]),
            trip_with("delivered", &["e"]),
        ];
        let all = ["a", "b", "c", "d", "e"].map(driver).to_vec();
        let idle = idle_drivers(&trips, all);
        let ids = idle.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
        // "a" is still handing over; "d" is only lined up.
        assert_eq!(ids, vec!["d", "e"]);
    }
}
