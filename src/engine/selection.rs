use crate::engine::conflicts::ScheduleConflicts;
use crate::geo::{self, Point};
use crate::roster::RosterEntry;

/// Pick the roster driver closest to the pickup point, honoring the
/// exclusion set and effective-position overrides. Distance ties keep the
/// first candidate in roster order. Returns `None` when the roster is
/// empty or every driver is excluded.
pub fn nearest_driver<'a>(
    roster: &'a [RosterEntry],
    conflicts: &ScheduleConflicts,
    pickup: Point,
) -> Option<&'a str> {
    let mut nearest: Option<(&str, f64)> = None;

    for entry in roster {
        if conflicts.is_excluded(&entry.id) {
            continue;
        }

        let position = conflicts
            .effective_position(&entry.id)
            .unwrap_or_else(|| entry.position());
        let distance = geo::euclidean(position, pickup);

        match nearest {
            Some((_, best)) if best <= distance => {}
            _ => nearest = Some((&entry.id, distance)),
        }
    }

    nearest.map(|(driver, _)| driver)
}
