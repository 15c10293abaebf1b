//! Linear progress over the trip lifecycle.

use std::cmp::Ordering;

use model::trip_status::{Stage, TripStatus};

/// Share of the lifecycle completed, in `[0, 100]`. Only
/// [`Stage::Delivered`] reaches 100. Terminations and unspecified statuses
/// contribute nothing.
///
/// Compare stages by [`Stage::index`], not by this value.
pub fn progress_percent(status: &TripStatus) -> f64 {
    match status.stage() {
        Some(stage) => (stage.index() + 1) as f64 / Stage::COUNT as f64 * 100.0,
        None => 0.0,
    }
}

/// [`progress_percent`] rounded for display.
pub fn progress_display(status: &TripStatus) -> u8 {
    progress_percent(status).round() as u8
}

/// Whether a trip belongs on the active board.
pub fn is_active(status: &TripStatus) -> bool {
    match status {
        TripStatus::Stage(stage) => *stage != Stage::Delivered,
        TripStatus::Terminated(_) => false,
        TripStatus::Unspecified(_) => true,
    }
}

/// Sort key: stages in lifecycle order, then terminations, then everything
/// unspecified.
pub fn rank(status: &TripStatus) -> usize {
    match status {
        TripStatus::Stage(stage) => stage.index(),
        TripStatus::Terminated(termination) => Stage::COUNT + *termination as usize,
        TripStatus::Unspecified(_) => usize::MAX,
    }
}

pub fn compare(a: &TripStatus, b: &TripStatus) -> Ordering {
    rank(a).cmp(&rank(b))
}

pub fn sort_by_status<T, F>(items: &mut [T], status: F)
where
    F: Fn(&T) -> &TripStatus,
{
    items.sort_by(|a, b| compare(status(a), status(b)));
}
