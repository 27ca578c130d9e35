use crate::geo;
use crate::models::order::Order;
use crate::store::{NearestQuery, OrderStore};

/// Find the persisted order whose delivery point is closest to the query
/// point, by bracketing: the nearest record at-or-above and the nearest
/// at-or-below the point on the query's calendar day, whichever is
/// geometrically closer. Equal distances resolve to the upper bracket.
/// A distance of exactly 0.0 is a hit, not a miss.
pub fn find_nearest_order(store: &OrderStore, query: &NearestQuery) -> Option<Order> {
    let upper = store.upper_bracket(query);
    let lower = store.lower_bracket(query);

    match (upper, lower) {
        (Some(upper), Some(lower)) => {
            let upper_distance =
                geo::euclidean(query.point(), upper.driver_available.delivery_point());
            let lower_distance =
                geo::euclidean(query.point(), lower.driver_available.delivery_point());

            if upper_distance <= lower_distance {
                Some(upper)
            } else {
                Some(lower)
            }
        }
        (Some(order), None) | (None, Some(order)) => Some(order),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::models::order::OrderSubmission;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 2, hour, 0, 0).unwrap()
    }

    fn seed(store: &OrderStore, driver: &str, hour: u32, delivery: (i32, i32)) {
        let submission = OrderSubmission {
            schedule: at(hour),
            delivery_latitude: delivery.0,
            delivery_longitude: delivery.1,
            pickup_latitude: 0,
            pickup_longitude: 0,
        };
        store.insert(&submission, driver).unwrap();
    }

    fn query(hour: u32, latitude: i32, longitude: i32) -> NearestQuery {
        NearestQuery {
            schedule: at(hour),
            latitude,
            longitude,
        }
    }

    #[test]
    fn equal_distances_resolve_to_upper_bracket() {
        let store = OrderStore::new();
        seed(&store, "up", 15, (60, 60));
        seed(&store, "down", 13, (40, 40));

        let nearest = find_nearest_order(&store, &query(14, 50, 50)).unwrap();

        assert_eq!(nearest.driver_available.driver, "up");
    }

    #[test]
    fn closer_lower_bracket_wins() {
        let store = OrderStore::new();
        seed(&store, "up", 15, (70, 70));
        seed(&store, "down", 13, (45, 45));

        let nearest = find_nearest_order(&store, &query(14, 50, 50)).unwrap();

        assert_eq!(nearest.driver_available.driver, "down");
    }

    #[test]
    fn single_bracket_is_returned_as_is() {
        let store = OrderStore::new();
        seed(&store, "up", 15, (60, 60));

        let nearest = find_nearest_order(&store, &query(14, 50, 50)).unwrap();
        assert_eq!(nearest.driver_available.driver, "up");

        let store = OrderStore::new();
        seed(&store, "down", 13, (40, 40));

        let nearest = find_nearest_order(&store, &query(14, 50, 50)).unwrap();
        assert_eq!(nearest.driver_available.driver, "down");
    }

    #[test]
    fn exact_coordinate_match_counts_as_present() {
        let store = OrderStore::new();
        seed(&store, "exact", 15, (50, 50));
        seed(&store, "down", 13, (49, 49));

        let nearest = find_nearest_order(&store, &query(14, 50, 50)).unwrap();

        assert_eq!(nearest.driver_available.driver, "exact");
    }

    #[test]
    fn empty_store_finds_nothing() {
        let store = OrderStore::new();
        assert!(find_nearest_order(&store, &query(14, 50, 50)).is_none());
    }
}
