use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::geo::Point;
use crate::models::availability::DriverAvailability;

#[derive(Debug, Clone, Copy)]
struct EffectivePosition {
    schedule: DateTime<Utc>,
    position: Point,
}

/// Outcome of scanning a day's bookings against a requested slot: drivers
/// excluded outright because they hold the exact slot, plus per-driver
/// effective positions derived from their latest earlier delivery.
#[derive(Debug, Default)]
pub struct ScheduleConflicts {
    excluded: HashSet<String>,
    overrides: HashMap<String, EffectivePosition>,
}

impl ScheduleConflicts {
    pub fn is_excluded(&self, driver: &str) -> bool {
        self.excluded.contains(driver)
    }

    /// The driver's overriding position, if an earlier same-day delivery
    /// left them somewhere other than their nominal roster position.
    pub fn effective_position(&self, driver: &str) -> Option<Point> {
        self.overrides
            .get(driver)
            .map(|effective| effective.position)
    }
}

/// Partition same-day availability records against the requested slot.
/// `records` must all lie on `target`'s calendar day at or before `target`
/// (the store query guarantees this). A record at exactly `target`
/// excludes its driver from assignment; an earlier record overrides the
/// driver's position to that delivery's destination, with the latest
/// earlier record winning per driver.
pub fn resolve_conflicts(
    records: &[DriverAvailability],
    target: DateTime<Utc>,
) -> ScheduleConflicts {
    let mut conflicts = ScheduleConflicts::default();

    for record in records {
        if record.schedule == target {
            conflicts.excluded.insert(record.driver.clone());
        } else if record.schedule < target {
            let candidate = EffectivePosition {
                schedule: record.schedule,
                position: record.delivery_point(),
            };
            conflicts
                .overrides
                .entry(record.driver.clone())
                .and_modify(|current| {
                    if current.schedule < candidate.schedule {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;

    fn record(driver: &str, hour: u32, delivery: (i32, i32)) -> DriverAvailability {
        DriverAvailability {
            id: Uuid::new_v4(),
            schedule: Utc.with_ymd_and_hms(2026, 10, 2, hour, 0, 0).unwrap(),
            delivery_latitude: delivery.0,
            delivery_longitude: delivery.1,
            driver: driver.to_string(),
        }
    }

    fn target(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn driver_booked_at_exact_slot_is_excluded() {
        let conflicts = resolve_conflicts(&[record("7", 15, (30, 30))], target(15));

        assert!(conflicts.is_excluded("7"));
        assert!(conflicts.effective_position("7").is_none());
    }

    #[test]
    fn earlier_booking_overrides_position() {
        let conflicts = resolve_conflicts(&[record("7", 13, (80, 80))], target(15));

        assert!(!conflicts.is_excluded("7"));
        assert_eq!(
            conflicts.effective_position("7"),
            Some(Point::new(80.0, 80.0))
        );
    }

    #[test]
    fn latest_earlier_booking_wins_per_driver() {
        let conflicts = resolve_conflicts(
            &[
                record("7", 9, (10, 10)),
                record("7", 13, (80, 80)),
                record("7", 11, (50, 50)),
            ],
            target(15),
        );

        assert_eq!(
            conflicts.effective_position("7"),
            Some(Point::new(80.0, 80.0))
        );
    }

    #[test]
    fn overrides_are_independent_per_driver() {
        let conflicts = resolve_conflicts(
            &[record("7", 13, (80, 80)), record("9", 12, (20, 20))],
            target(15),
        );

        assert_eq!(
            conflicts.effective_position("7"),
            Some(Point::new(80.0, 80.0))
        );
        assert_eq!(
            conflicts.effective_position("9"),
            Some(Point::new(20.0, 20.0))
        );
    }

    #[test]
    fn exact_slot_booking_keeps_driver_excluded_despite_earlier_ones() {
        let conflicts = resolve_conflicts(
            &[record("7", 13, (80, 80)), record("7", 15, (30, 30))],
            target(15),
        );

        assert!(conflicts.is_excluded("7"));
        assert_eq!(
            conflicts.effective_position("7"),
            Some(Point::new(80.0, 80.0))
        );
    }

    #[test]
    fn unknown_driver_has_no_conflicts() {
        let conflicts = resolve_conflicts(&[], target(15));

        assert!(!conflicts.is_excluded("7"));
        assert!(conflicts.effective_position("7").is_none());
    }
}
