use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::geo::Point;
use crate::models::availability::DriverAvailability;

/// A delivery order and the availability record it exclusively owns.
/// Created atomically with its record at assignment time; deleting the
/// order cascades to the record.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub pickup_latitude: i32,
    pub pickup_longitude: i32,
    pub driver_available: DriverAvailability,
}

/// A fully validated order submission, ready for driver assignment.
/// Coordinates are known to be in range and the schedule is on the hour
/// and in the future.
#[derive(Debug, Clone)]
pub struct OrderSubmission {
    pub schedule: DateTime<Utc>,
    pub delivery_latitude: i32,
    pub delivery_longitude: i32,
    pub pickup_latitude: i32,
    pub pickup_longitude: i32,
}

impl OrderSubmission {
    pub fn pickup_point(&self) -> Point {
        Point::new(
            f64::from(self.pickup_latitude),
            f64::from(self.pickup_longitude),
        )
    }
}
