use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use uuid::Uuid;

use crate::geo::Point;
use crate::models::availability::DriverAvailability;
use crate::models::order::{Order, OrderSubmission};

/// Typed filter for order listings, built from validated query parameters
/// before it ever reaches the store.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub driver: Option<String>,
    pub schedule: Option<DateTime<Utc>>,
    pub on_date: Option<NaiveDate>,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        let availability = &order.driver_available;

        if let Some(driver) = &self.driver {
            if &availability.driver != driver {
                return false;
            }
        }
        if let Some(schedule) = self.schedule {
            if availability.schedule != schedule {
                return false;
            }
        }
        if let Some(date) = self.on_date {
            if availability.schedule.date_naive() != date {
                return false;
            }
        }
        true
    }
}

/// Sort order for listings. Schedule ascending is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSort {
    ScheduleAsc,
    ScheduleDesc,
    DriverAsc,
    DriverDesc,
}

/// A validated nearest-driver query: a grid point plus an hour-granular
/// query time.
#[derive(Debug, Clone)]
pub struct NearestQuery {
    pub schedule: DateTime<Utc>,
    pub latitude: i32,
    pub longitude: i32,
}

impl NearestQuery {
    pub fn point(&self) -> Point {
        Point::new(f64::from(self.latitude), f64::from(self.longitude))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("driver {driver} is already booked for {schedule}")]
    SlotTaken {
        driver: String,
        schedule: DateTime<Utc>,
    },
}

/// In-process order store. Orders own their availability records; the slot
/// index enforces the (driver, schedule) uniqueness invariant and is the
/// only synchronization point between concurrent submissions.
pub struct OrderStore {
    orders: DashMap<Uuid, Order>,
    slots: DashMap<(String, DateTime<Utc>), Uuid>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            slots: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Claim the (driver, schedule) slot and persist the order together
    /// with its availability record as one unit. The slot entry is held
    /// while the order is written, so the loser of a concurrent claim for
    /// the same slot observes the completed insert and fails cleanly.
    pub fn insert(&self, submission: &OrderSubmission, driver: &str) -> Result<Order, StoreError> {
        match self.slots.entry((driver.to_string(), submission.schedule)) {
            Entry::Occupied(_) => Err(StoreError::SlotTaken {
                driver: driver.to_string(),
                schedule: submission.schedule,
            }),
            Entry::Vacant(vacant) => {
                let order = Order {
                    id: Uuid::new_v4(),
                    pickup_latitude: submission.pickup_latitude,
                    pickup_longitude: submission.pickup_longitude,
                    driver_available: DriverAvailability {
                        id: Uuid::new_v4(),
                        schedule: submission.schedule,
                        delivery_latitude: submission.delivery_latitude,
                        delivery_longitude: submission.delivery_longitude,
                        driver: driver.to_string(),
                    },
                };
                self.orders.insert(order.id, order.clone());
                vacant.insert(order.id);
                Ok(order)
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    /// Remove an order and, with it, the availability record it owns,
    /// freeing the (driver, schedule) slot.
    pub fn remove(&self, id: Uuid) -> Option<Order> {
        let (_, order) = self.orders.remove(&id)?;
        let slot = (
            order.driver_available.driver.clone(),
            order.driver_available.schedule,
        );
        self.slots.remove_if(&slot, |_, owner| *owner == order.id);
        Some(order)
    }

    /// All availability records on `target`'s calendar day scheduled at or
    /// before `target`. Input to conflict resolution.
    pub fn same_day_until(&self, target: DateTime<Utc>) -> Vec<DriverAvailability> {
        let day = target.date_naive();
        self.orders
            .iter()
            .map(|entry| entry.value().driver_available.clone())
            .filter(|availability| {
                availability.schedule.date_naive() == day && availability.schedule <= target
            })
            .collect()
    }

    pub fn list(&self, filter: &OrderFilter, sort: OrderSort) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        match sort {
            OrderSort::ScheduleAsc => orders.sort_by_key(|order| order.driver_available.schedule),
            OrderSort::ScheduleDesc => {
                orders.sort_by_key(|order| order.driver_available.schedule);
                orders.reverse();
            }
            OrderSort::DriverAsc => orders.sort_by(compare_by_driver),
            OrderSort::DriverDesc => {
                orders.sort_by(compare_by_driver);
                orders.reverse();
            }
        }
        orders
    }

    /// The record closest above the query point: same calendar day,
    /// schedule at or after the query time, both coordinates at or above
    /// the query point, smallest (latitude, longitude) first.
    pub fn upper_bracket(&self, query: &NearestQuery) -> Option<Order> {
        let day = query.schedule.date_naive();
        self.orders
            .iter()
            .filter(|entry| {
                let availability = &entry.value().driver_available;
                availability.schedule.date_naive() == day
                    && availability.schedule >= query.schedule
                    && availability.delivery_latitude >= query.latitude
                    && availability.delivery_longitude >= query.longitude
            })
            .min_by_key(|entry| {
                let availability = &entry.value().driver_available;
                (
                    availability.delivery_latitude,
                    availability.delivery_longitude,
                )
            })
            .map(|entry| entry.value().clone())
    }

    /// The record closest below the query point: same calendar day,
    /// schedule at or before the query time, both coordinates at or below
    /// the query point, largest (latitude, longitude) first.
    pub fn lower_bracket(&self, query: &NearestQuery) -> Option<Order> {
        let day = query.schedule.date_naive();
        self.orders
            .iter()
            .filter(|entry| {
                let availability = &entry.value().driver_available;
                availability.schedule.date_naive() == day
                    && availability.schedule <= query.schedule
                    && availability.delivery_latitude <= query.latitude
                    && availability.delivery_longitude <= query.longitude
            })
            .max_by_key(|entry| {
                let availability = &entry.value().driver_available;
                (
                    availability.delivery_latitude,
                    availability.delivery_longitude,
                )
            })
            .map(|entry| entry.value().clone())
    }
}

fn compare_by_driver(a: &Order, b: &Order) -> std::cmp::Ordering {
    (&a.driver_available.driver, a.driver_available.schedule)
        .cmp(&(&b.driver_available.driver, b.driver_available.schedule))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn submission(
        schedule: DateTime<Utc>,
        delivery: (i32, i32),
        pickup: (i32, i32),
    ) -> OrderSubmission {
        OrderSubmission {
            schedule,
            delivery_latitude: delivery.0,
            delivery_longitude: delivery.1,
            pickup_latitude: pickup.0,
            pickup_longitude: pickup.1,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn insert_rejects_taken_slot() {
        let store = OrderStore::new();
        let first = submission(at(2, 15), (30, 30), (10, 10));

        store.insert(&first, "7").unwrap();
        let err = store.insert(&first, "7").unwrap_err();

        assert!(matches!(err, StoreError::SlotTaken { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_driver_can_hold_different_slots() {
        let store = OrderStore::new();
        store
            .insert(&submission(at(2, 13), (30, 30), (10, 10)), "7")
            .unwrap();
        store
            .insert(&submission(at(2, 15), (40, 40), (10, 10)), "7")
            .unwrap();

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_cascades_and_frees_the_slot() {
        let store = OrderStore::new();
        let request = submission(at(2, 15), (30, 30), (10, 10));
        let order = store.insert(&request, "7").unwrap();

        assert!(store.remove(order.id).is_some());
        assert!(store.get(order.id).is_none());
        assert!(store.is_empty());

        store.insert(&request, "7").unwrap();
    }

    #[test]
    fn remove_missing_order_returns_none() {
        let store = OrderStore::new();
        assert!(store.remove(Uuid::new_v4()).is_none());
    }

    #[test]
    fn same_day_until_keeps_only_earlier_same_day_records() {
        let store = OrderStore::new();
        store
            .insert(&submission(at(2, 13), (10, 10), (0, 0)), "a")
            .unwrap();
        store
            .insert(&submission(at(2, 15), (20, 20), (0, 0)), "b")
            .unwrap();
        store
            .insert(&submission(at(2, 16), (30, 30), (0, 0)), "c")
            .unwrap();
        store
            .insert(&submission(at(3, 13), (40, 40), (0, 0)), "d")
            .unwrap();

        let mut drivers: Vec<String> = store
            .same_day_until(at(2, 15))
            .into_iter()
            .map(|availability| availability.driver)
            .collect();
        drivers.sort();

        assert_eq!(drivers, vec!["a", "b"]);
    }

    #[test]
    fn list_filters_by_driver_schedule_and_date() {
        let store = OrderStore::new();
        store
            .insert(&submission(at(2, 13), (10, 10), (0, 0)), "a")
            .unwrap();
        store
            .insert(&submission(at(2, 15), (20, 20), (0, 0)), "b")
            .unwrap();
        store
            .insert(&submission(at(3, 15), (30, 30), (0, 0)), "b")
            .unwrap();

        let by_driver = OrderFilter {
            driver: Some("b".to_string()),
            ..OrderFilter::default()
        };
        assert_eq!(store.list(&by_driver, OrderSort::ScheduleAsc).len(), 2);

        let by_schedule = OrderFilter {
            schedule: Some(at(2, 15)),
            ..OrderFilter::default()
        };
        let matched = store.list(&by_schedule, OrderSort::ScheduleAsc);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].driver_available.driver, "b");

        let by_date = OrderFilter {
            on_date: Some(at(2, 0).date_naive()),
            ..OrderFilter::default()
        };
        assert_eq!(store.list(&by_date, OrderSort::ScheduleAsc).len(), 2);
    }

    #[test]
    fn list_orders_by_schedule_ascending_by_default() {
        let store = OrderStore::new();
        store
            .insert(&submission(at(2, 16), (10, 10), (0, 0)), "a")
            .unwrap();
        store
            .insert(&submission(at(2, 13), (20, 20), (0, 0)), "b")
            .unwrap();
        store
            .insert(&submission(at(2, 15), (30, 30), (0, 0)), "c")
            .unwrap();

        let hours: Vec<String> = store
            .list(&OrderFilter::default(), OrderSort::ScheduleAsc)
            .into_iter()
            .map(|order| order.driver_available.driver)
            .collect();

        assert_eq!(hours, vec!["b", "c", "a"]);
    }

    #[test]
    fn list_supports_driver_and_descending_orderings() {
        let store = OrderStore::new();
        store
            .insert(&submission(at(2, 13), (10, 10), (0, 0)), "b")
            .unwrap();
        store
            .insert(&submission(at(2, 15), (20, 20), (0, 0)), "a")
            .unwrap();

        let drivers: Vec<String> = store
            .list(&OrderFilter::default(), OrderSort::DriverAsc)
            .into_iter()
            .map(|order| order.driver_available.driver)
            .collect();
        assert_eq!(drivers, vec!["a", "b"]);

        let schedules: Vec<DateTime<Utc>> = store
            .list(&OrderFilter::default(), OrderSort::ScheduleDesc)
            .into_iter()
            .map(|order| order.driver_available.schedule)
            .collect();
        assert_eq!(schedules, vec![at(2, 15), at(2, 13)]);
    }

    #[test]
    fn upper_bracket_picks_smallest_qualifying_coordinates() {
        let store = OrderStore::new();
        store
            .insert(&submission(at(2, 15), (60, 60), (0, 0)), "a")
            .unwrap();
        store
            .insert(&submission(at(2, 16), (55, 70), (0, 0)), "b")
            .unwrap();
        store
            .insert(&submission(at(2, 15), (40, 40), (0, 0)), "c")
            .unwrap();

        let query = NearestQuery {
            schedule: at(2, 14),
            latitude: 50,
            longitude: 50,
        };
        let upper = store.upper_bracket(&query).unwrap();

        assert_eq!(upper.driver_available.driver, "b");
    }

    #[test]
    fn lower_bracket_picks_largest_qualifying_coordinates() {
        let store = OrderStore::new();
        store
            .insert(&submission(at(2, 13), (40, 40), (0, 0)), "a")
            .unwrap();
        store
            .insert(&submission(at(2, 12), (45, 30), (0, 0)), "b")
            .unwrap();
        store
            .insert(&submission(at(2, 13), (60, 60), (0, 0)), "c")
            .unwrap();

        let query = NearestQuery {
            schedule: at(2, 14),
            latitude: 50,
            longitude: 50,
        };
        let lower = store.lower_bracket(&query).unwrap();

        assert_eq!(lower.driver_available.driver, "b");
    }

    #[test]
    fn brackets_require_matching_day_and_time_direction() {
        let store = OrderStore::new();
        store
            .insert(&submission(at(2, 13), (60, 60), (0, 0)), "a")
            .unwrap();
        store
            .insert(&submission(at(1, 13), (40, 40), (0, 0)), "b")
            .unwrap();

        let query = NearestQuery {
            schedule: at(2, 14),
            latitude: 50,
            longitude: 50,
        };

        // "a" is on the right day but scheduled before the query time with
        // coordinates above the point; "b" brackets the point from below
        // but on the previous day.
        assert!(store.upper_bracket(&query).is_none());
        assert!(store.lower_bracket(&query).is_none());
    }
}
