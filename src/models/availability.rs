use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::geo::Point;

/// Format accepted for schedules on the way in.
pub const SCHEDULE_INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";
/// Format used for schedules on the way out.
pub const SCHEDULE_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const COORDINATE_MIN: i32 = 0;
pub const COORDINATE_MAX: i32 = 100;

/// A driver's committed delivery slot: who, when and where the delivery
/// ends up. The schedule is always exactly on the hour. Records are
/// immutable once written and removed only when the owning order is
/// deleted. The record id is internal and never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct DriverAvailability {
    #[serde(skip_serializing)]
    pub id: Uuid,
    #[serde(serialize_with = "serialize_schedule")]
    pub schedule: DateTime<Utc>,
    pub delivery_latitude: i32,
    pub delivery_longitude: i32,
    pub driver: String,
}

impl DriverAvailability {
    pub fn delivery_point(&self) -> Point {
        Point::new(
            f64::from(self.delivery_latitude),
            f64::from(self.delivery_longitude),
        )
    }
}

fn serialize_schedule<S>(schedule: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&schedule.format(SCHEDULE_OUTPUT_FORMAT).to_string())
}
