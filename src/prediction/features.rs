//! Feature engineering shared by training and inference.
//!
//! Both paths call [`build_row`], so the field order and the derivation of
//! every field are identical no matter where a row comes from.

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::{collections::HashMap, sync::Arc};

use crate::repository::StopAmenities;

/// Zone assigned to stops that have none.
pub const UNKNOWN_ZONE: &str = "unknown";

/// Names of the model inputs, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "hour",
    "day_of_week",
    "month",
    "is_weekend",
    "is_holiday",
    "stop_sequence",
    "has_shelter",
    "has_washroom",
    "has_bike_rack",
    "has_bench",
    "zone_id",
    "route_type",
];

pub const FEATURE_COUNT: usize = 12;

pub const HOUR: usize = 0;
pub const DAY_OF_WEEK: usize = 1;
pub const MONTH: usize = 2;
pub const STOP_SEQUENCE: usize = 5;
pub const ZONE_ID: usize = 10;
pub const ROUTE_TYPE: usize = 11;

/// Fields standardized by the scaler, in scaler column order.
pub const NUMERIC_FEATURES: [usize; 5] = [HOUR, DAY_OF_WEEK, MONTH, STOP_SEQUENCE, ROUTE_TYPE];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopAttributes {
    pub id: Arc<str>,
    pub zone_id: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripAttributes {
    pub id: Arc<str>,
    pub route_id: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAttributes {
    pub id: Arc<str>,
    pub route_type: i32,
}

/// Lookups the feature builder joins against.
/// Every lookup is a left join: `None` turns into the field's default.
pub trait FeatureSource {
    fn stop(&self, stop_id: &str) -> Option<StopAttributes>;
    fn trip(&self, trip_id: &str) -> Option<TripAttributes>;
    fn route(&self, route_id: &str) -> Option<RouteAttributes>;
    /// Position of the stop within the trip, from the stop times table.
    fn stop_sequence(&self, trip_id: &str, stop_id: &str) -> Option<u32>;
    fn amenities(&self, stop_id: &str) -> Option<StopAmenities>;
}

/// Hash map backed [`FeatureSource`], handy when the attributes are already in memory.
#[derive(Debug, Clone, Default)]
pub struct FeatureContext {
    stops: HashMap<Arc<str>, StopAttributes>,
    trips: HashMap<Arc<str>, TripAttributes>,
    routes: HashMap<Arc<str>, RouteAttributes>,
    stop_sequences: HashMap<Arc<str>, HashMap<Arc<str>, u32>>,
    amenities: HashMap<Arc<str>, StopAmenities>,
}

impl FeatureContext {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_stop(mut self, id: &str, zone_id: Option<&str>) -> Self {
        let id: Arc<str> = id.into();
        let value = StopAttributes {
            id: id.clone(),
            zone_id: zone_id.map(Into::into),
        };
        self.stops.insert(id, value);
        self
    }

    pub fn with_trip(mut self, id: &str, route_id: &str) -> Self {
        let id: Arc<str> = id.into();
        let value = TripAttributes {
            id: id.clone(),
            route_id: route_id.into(),
        };
        self.trips.insert(id, value);
        self
    }

    pub fn with_route(mut self, id: &str, route_type: i32) -> Self {
        let id: Arc<str> = id.into();
        let value = RouteAttributes {
            id: id.clone(),
            route_type,
        };
        self.routes.insert(id, value);
        self
    }

    pub fn with_stop_sequence(mut self, trip_id: &str, stop_id: &str, sequence: u32) -> Self {
        self.stop_sequences
            .entry(trip_id.into())
            .or_default()
            .insert(stop_id.into(), sequence);
        self
    }

    pub fn with_amenities(mut self, stop_id: &str, amenities: StopAmenities) -> Self {
        self.amenities.insert(stop_id.into(), amenities);
        self
    }
}

impl FeatureSource for FeatureContext {
    fn stop(&self, stop_id: &str) -> Option<StopAttributes> {
        self.stops.get(stop_id).cloned()
    }

    fn trip(&self, trip_id: &str) -> Option<TripAttributes> {
        self.trips.get(trip_id).cloned()
    }

    fn route(&self, route_id: &str) -> Option<RouteAttributes> {
        self.routes.get(route_id).cloned()
    }

    fn stop_sequence(&self, trip_id: &str, stop_id: &str) -> Option<u32> {
        self.stop_sequences.get(trip_id)?.get(stop_id).copied()
    }

    fn amenities(&self, stop_id: &str) -> Option<StopAmenities> {
        self.amenities.get(stop_id).copied()
    }
}

/// Raw, unencoded feature row. The zone stays a string until the fitted
/// encoder turns it into a number.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub hour: u32,
    /// Zero-based from Monday, so Saturday is 5 and Sunday is 6.
    pub day_of_week: u32,
    pub month: u32,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub stop_sequence: u32,
    pub amenities: StopAmenities,
    pub zone_id: Arc<str>,
    pub route_type: i32,
}

impl FeatureRow {
    /// Values in [`FEATURE_NAMES`] order with the zone replaced by `zone_code`.
    pub fn values(&self, zone_code: f64) -> [f64; FEATURE_COUNT] {
        let flag = |value: bool| if value { 1.0 } else { 0.0 };
        [
            self.hour as f64,
            self.day_of_week as f64,
            self.month as f64,
            flag(self.is_weekend),
            flag(self.is_holiday),
            self.stop_sequence as f64,
            flag(self.amenities.shelter),
            flag(self.amenities.washroom),
            flag(self.amenities.bike_rack),
            flag(self.amenities.bench),
            zone_code,
            self.route_type as f64,
        ]
    }

    /// The subset standardized by the scaler, in [`NUMERIC_FEATURES`] order.
    pub fn numeric_values(&self) -> [f64; NUMERIC_FEATURES.len()] {
        let values = self.values(0.0);
        NUMERIC_FEATURES.map(|index| values[index])
    }
}

/// Derives the feature row for one trip/stop/time.
pub fn build_row<S>(source: &S, trip_id: &str, stop_id: &str, at: NaiveDateTime) -> FeatureRow
where
    S: FeatureSource + ?Sized,
{
    let day_of_week = at.weekday().num_days_from_monday();
    let zone_id = source
        .stop(stop_id)
        .and_then(|stop| stop.zone_id)
        .unwrap_or_else(|| UNKNOWN_ZONE.into());
    let route_type = source
        .trip(trip_id)
        .and_then(|trip| source.route(&trip.route_id))
        .map(|route| route.route_type)
        .unwrap_or(0);

    FeatureRow {
        hour: at.hour(),
        day_of_week,
        month: at.month(),
        is_weekend: matches!(day_of_week, 5 | 6),
        // TODO: derive from a holiday calendar for the feed's service area.
        is_holiday: false,
        stop_sequence: source.stop_sequence(trip_id, stop_id).unwrap_or(0),
        amenities: source.amenities(stop_id).unwrap_or_default(),
        zone_id,
        route_type,
    }
}
