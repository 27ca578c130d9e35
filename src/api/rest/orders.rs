use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

use crate::api::rest::JsonBody;
use crate::engine::assignment::assign_order;
use crate::engine::nearest::find_nearest_order;
use crate::error::{AppError, FieldError};
use crate::models::availability::{COORDINATE_MAX, COORDINATE_MIN, SCHEDULE_INPUT_FORMAT};
use crate::models::order::{Order, OrderSubmission};
use crate::state::AppState;
use crate::store::{NearestQuery, OrderFilter, OrderSort};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/find_nearest_driver", get(find_nearest_driver))
        .route("/orders/:id", get(get_order).delete(delete_order))
}

/// A body field captured before type checking. A wrong-typed value is
/// recorded as `Invalid` instead of failing the whole body, so `validate`
/// reports it per field alongside every other failure.
#[derive(Debug)]
pub enum FieldValue<T> {
    Missing,
    Invalid,
    Present(T),
}

impl<T> Default for FieldValue<T> {
    fn default() -> Self {
        Self::Missing
    }
}

fn value_or_invalid<'de, D, T>(deserializer: D) -> Result<FieldValue<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => FieldValue::Missing,
        value => match T::deserialize(value) {
            Ok(parsed) => FieldValue::Present(parsed),
            Err(_) => FieldValue::Invalid,
        },
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default, deserialize_with = "value_or_invalid")]
    pub driver_available: FieldValue<DriverAvailableRequest>,
    #[serde(default, deserialize_with = "value_or_invalid")]
    pub pickup_latitude: FieldValue<i64>,
    #[serde(default, deserialize_with = "value_or_invalid")]
    pub pickup_longitude: FieldValue<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DriverAvailableRequest {
    #[serde(default, deserialize_with = "value_or_invalid")]
    pub schedule: FieldValue<String>,
    #[serde(default, deserialize_with = "value_or_invalid")]
    pub delivery_latitude: FieldValue<i64>,
    #[serde(default, deserialize_with = "value_or_invalid")]
    pub delivery_longitude: FieldValue<i64>,
}

impl CreateOrderRequest {
    /// Validate every field, collecting all failures so the caller sees
    /// the complete list in one response.
    fn validate(self, now: DateTime<Utc>) -> Result<OrderSubmission, AppError> {
        let mut errors = Vec::new();

        let (schedule, delivery_latitude, delivery_longitude) = match self.driver_available {
            FieldValue::Present(availability) => (
                validate_schedule(
                    "driver_available.schedule",
                    availability.schedule,
                    now,
                    &mut errors,
                ),
                validate_coordinate(
                    "driver_available.delivery_latitude",
                    availability.delivery_latitude,
                    &mut errors,
                ),
                validate_coordinate(
                    "driver_available.delivery_longitude",
                    availability.delivery_longitude,
                    &mut errors,
                ),
            ),
            FieldValue::Invalid => {
                errors.push(invalid("driver_available", "expected an object"));
                (None, None, None)
            }
            FieldValue::Missing => {
                errors.push(required("driver_available"));
                (None, None, None)
            }
        };

        let pickup_latitude =
            validate_coordinate("pickup_latitude", self.pickup_latitude, &mut errors);
        let pickup_longitude =
            validate_coordinate("pickup_longitude", self.pickup_longitude, &mut errors);

        match (
            schedule,
            delivery_latitude,
            delivery_longitude,
            pickup_latitude,
            pickup_longitude,
        ) {
            (
                Some(schedule),
                Some(delivery_latitude),
                Some(delivery_longitude),
                Some(pickup_latitude),
                Some(pickup_longitude),
            ) => Ok(OrderSubmission {
                schedule,
                delivery_latitude,
                delivery_longitude,
                pickup_latitude,
                pickup_longitude,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let submission = payload.validate(Utc::now())?;

    let start = Instant::now();
    let result = assign_order(&state, submission).await;
    let outcome = outcome_label(&result);
    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();

    let order = result?;
    state.metrics.orders_in_store.set(state.store.len() as i64);

    Ok((StatusCode::CREATED, Json(order)))
}

fn outcome_label(result: &Result<Order, AppError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AppError::NoDriverAvailable) => "no_driver",
        Err(AppError::Conflict(_)) => "conflict",
        Err(_) => "error",
    }
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    #[serde(rename = "driver_available__driver")]
    pub driver: Option<String>,
    #[serde(rename = "driver_available__schedule")]
    pub schedule: Option<String>,
    #[serde(rename = "driver_available__schedule__date")]
    pub schedule_date: Option<String>,
    pub ordering: Option<String>,
}

impl ListOrdersParams {
    fn validate(self) -> Result<(OrderFilter, OrderSort), AppError> {
        let mut errors = Vec::new();

        let schedule = match self.schedule.as_deref() {
            Some(raw) => parse_schedule("driver_available__schedule", raw, &mut errors),
            None => None,
        };

        let on_date = match self.schedule_date.as_deref() {
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.push(FieldError::new(
                        "driver_available__schedule__date",
                        "format",
                        "date has wrong format, use YYYY-MM-DD",
                    ));
                    None
                }
            },
            None => None,
        };

        let sort = match self.ordering.as_deref() {
            None | Some("driver_available__schedule") => OrderSort::ScheduleAsc,
            Some("-driver_available__schedule") => OrderSort::ScheduleDesc,
            Some("driver_available__driver") => OrderSort::DriverAsc,
            Some("-driver_available__driver") => OrderSort::DriverDesc,
            Some(other) => {
                errors.push(FieldError::new(
                    "ordering",
                    "choice",
                    format!("unknown ordering: {other}"),
                ));
                OrderSort::ScheduleAsc
            }
        };

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok((
            OrderFilter {
                driver: self.driver,
                schedule,
                on_date,
            },
            sort,
        ))
    }
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<Order>>, AppError> {
    let (filter, sort) = params.validate()?;
    Ok(Json(state.store.list(&filter, sort)))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .store
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .remove(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    state.metrics.orders_in_store.set(state.store.len() as i64);

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct NearestDriverParams {
    #[serde(rename = "driver_available__schedule")]
    pub schedule: Option<String>,
    #[serde(rename = "driver_available__delivery_latitude")]
    pub delivery_latitude: Option<String>,
    #[serde(rename = "driver_available__delivery_longitude")]
    pub delivery_longitude: Option<String>,
}

impl NearestDriverParams {
    fn validate(self) -> Result<NearestQuery, AppError> {
        let mut errors = Vec::new();

        let schedule = match self.schedule.as_deref() {
            // Brackets compare at slot granularity, so the query time
            // drops its minutes.
            Some(raw) => {
                parse_schedule("driver_available__schedule", raw, &mut errors).map(truncate_to_hour)
            }
            None => {
                errors.push(required("driver_available__schedule"));
                None
            }
        };

        let latitude = parse_coordinate(
            "driver_available__delivery_latitude",
            self.delivery_latitude.as_deref(),
            &mut errors,
        );
        let longitude = parse_coordinate(
            "driver_available__delivery_longitude",
            self.delivery_longitude.as_deref(),
            &mut errors,
        );

        match (schedule, latitude, longitude) {
            (Some(schedule), Some(latitude), Some(longitude)) => Ok(NearestQuery {
                schedule,
                latitude,
                longitude,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

async fn find_nearest_driver(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearestDriverParams>,
) -> Result<Json<Order>, AppError> {
    let query = params.validate()?;
    let order = find_nearest_order(&state.store, &query).ok_or(AppError::NoOrderNearby)?;

    Ok(Json(order))
}

fn required(field: &'static str) -> FieldError {
    FieldError::new(field, "required", "this field is required")
}

fn invalid(field: &'static str, message: &str) -> FieldError {
    FieldError::new(field, "invalid", message)
}

fn validate_schedule(
    field: &'static str,
    value: FieldValue<String>,
    now: DateTime<Utc>,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    let raw = match value {
        FieldValue::Missing => {
            errors.push(required(field));
            return None;
        }
        FieldValue::Invalid => {
            errors.push(invalid(field, "a valid datetime string is required"));
            return None;
        }
        FieldValue::Present(raw) => raw,
    };
    let schedule = parse_schedule(field, &raw, errors)?;

    let mut valid = true;
    if schedule.minute() != 0 {
        errors.push(FieldError::new(
            field,
            "minute",
            "delivery must be scheduled on the hour",
        ));
        valid = false;
    }
    if schedule <= now {
        errors.push(FieldError::new(
            field,
            "past",
            "delivery must be scheduled after the current time",
        ));
        valid = false;
    }

    valid.then_some(schedule)
}

fn parse_schedule(
    field: &'static str,
    raw: &str,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    match NaiveDateTime::parse_from_str(raw, SCHEDULE_INPUT_FORMAT) {
        Ok(naive) => Some(naive.and_utc()),
        Err(_) => {
            errors.push(FieldError::new(
                field,
                "format",
                "datetime has wrong format, use YYYY-MM-DD HH:MM",
            ));
            None
        }
    }
}

fn truncate_to_hour(schedule: DateTime<Utc>) -> DateTime<Utc> {
    // Minute zero is always representable, so the fallback never fires.
    schedule.with_minute(0).unwrap_or(schedule)
}

fn validate_coordinate(
    field: &'static str,
    value: FieldValue<i64>,
    errors: &mut Vec<FieldError>,
) -> Option<i32> {
    match value {
        FieldValue::Missing => {
            errors.push(required(field));
            None
        }
        FieldValue::Invalid => {
            errors.push(invalid(field, "a valid integer is required"));
            None
        }
        FieldValue::Present(value) => coordinate_in_range(field, value, errors),
    }
}

fn parse_coordinate(
    field: &'static str,
    raw: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<i32> {
    let Some(raw) = raw else {
        errors.push(required(field));
        return None;
    };
    let Ok(value) = raw.parse::<i64>() else {
        errors.push(invalid(field, "a valid integer is required"));
        return None;
    };
    coordinate_in_range(field, value, errors)
}

fn coordinate_in_range(
    field: &'static str,
    value: i64,
    errors: &mut Vec<FieldError>,
) -> Option<i32> {
    if value < i64::from(COORDINATE_MIN) {
        errors.push(FieldError::new(
            field,
            "min_value",
            format!("ensure this value is greater than or equal to {COORDINATE_MIN}"),
        ));
        return None;
    }
    if value > i64::from(COORDINATE_MAX) {
        errors.push(FieldError::new(
            field,
            "max_value",
            format!("ensure this value is less than or equal to {COORDINATE_MAX}"),
        ));
        return None;
    }
    Some(value as i32)
}
