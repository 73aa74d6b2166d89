use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

use crate::shared::time::Time;

#[derive(Debug, Default, Clone)]
pub struct Agency {
    pub index: u32,
    /// Optional in single agency feeds.
    pub id: Option<Arc<str>>,
    pub name: Arc<str>,
    pub url: Arc<str>,
    pub timezone: Arc<str>,
}

/// A physical point where passengers can board or alight from a vehicle.
#[derive(Debug, Default, Clone)]
pub struct Stop {
    /// The global internal index used for O(1) array lookups in the repository.
    pub index: u32,
    /// Unique external identifier for the stop.
    pub id: Arc<str>,
    pub code: Option<Arc<str>>,
    /// Human-readable name (e.g., "Main St & 4th Ave").
    pub name: Arc<str>,
    pub description: Option<Arc<str>>,
    pub latitude: f64,
    pub longitude: f64,
    /// Fare zone. Stops without one are treated as zone `"unknown"` by the feature builder.
    pub zone_id: Option<Arc<str>>,
    pub location_type: u8,
    pub wheelchair_boarding: u8,
}

/// A grouping of trips that are displayed to riders under a single name (e.g., "Blue Line").
#[derive(Debug, Default, Clone)]
pub struct Route {
    pub index: u32,
    pub id: Arc<str>,
    pub agency_id: Option<Arc<str>>,
    pub short_name: Option<Arc<str>>,
    pub long_name: Option<Arc<str>>,
    pub description: Option<Arc<str>>,
    /// Classification of the vehicle (0: Tram, 1: Subway, 3: Bus, etc.).
    pub route_type: i32,
    pub color: Option<Arc<str>>,
    pub text_color: Option<Arc<str>>,
}

/// A specific journey taken by a vehicle through a sequence of stops.
#[derive(Debug, Default, Clone)]
pub struct Trip {
    pub index: u32,
    pub id: Arc<str>,
    pub route_id: Arc<str>,
    /// Pointer to the parent [`Route`].
    pub route_idx: u32,
    pub service_id: Arc<str>,
    pub headsign: Option<Arc<str>>,
    pub short_name: Option<Arc<str>>,
    pub direction_id: Option<u8>,
}

/// Individual event within a trip where a vehicle calls at a stop.
#[derive(Debug, Default, Clone)]
pub struct StopTime {
    pub index: u32,
    pub trip_id: Arc<str>,
    pub trip_idx: u32,
    pub stop_id: Arc<str>,
    pub stop_idx: u32,
    /// The order of this stop within the trip.
    pub sequence: u32,
    pub arrival_time: Time,
    pub departure_time: Time,
    pub headsign: Option<Arc<str>>,
    pub pickup_type: u8,
    pub drop_off_type: u8,
}

/// Facilities present at a stop. A stop without a record has none of them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopAmenities {
    pub shelter: bool,
    pub washroom: bool,
    pub bike_rack: bool,
    pub bench: bool,
}

impl StopAmenities {
    /// Turns on the amenity named by a `stop_amenities.txt` row.
    /// Returns false for unknown amenity types.
    pub fn set(&mut self, amenity_type: &str, available: bool) -> bool {
        let flag = match amenity_type.trim().to_ascii_lowercase().as_str() {
            "shelter" => &mut self.shelter,
            "washroom" => &mut self.washroom,
            "bike_rack" => &mut self.bike_rack,
            "bench" => &mut self.bench,
            _ => return false,
        };
        *flag = available;
        true
    }
}

/// How crowded a vehicle was, or is predicted to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrowdLevel {
    Light,
    Moderate,
    Packed,
}

impl CrowdLevel {
    pub const ALL: [CrowdLevel; 3] = [CrowdLevel::Light, CrowdLevel::Moderate, CrowdLevel::Packed];

    pub const fn as_str(&self) -> &'static str {
        match self {
            CrowdLevel::Light => "light",
            CrowdLevel::Moderate => "moderate",
            CrowdLevel::Packed => "packed",
        }
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrowdLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(CrowdLevel::Light),
            "moderate" => Ok(CrowdLevel::Moderate),
            "packed" => Ok(CrowdLevel::Packed),
            other => Err(format!("unknown crowd level '{other}'")),
        }
    }
}

/// A crowd observation as submitted, before storage assigns it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObservation {
    pub trip_id: String,
    pub stop_id: String,
    pub observation_time: NaiveDateTime,
    #[serde(default)]
    pub boarding_count: u32,
    #[serde(default)]
    pub alighting_count: u32,
    #[serde(default)]
    pub crowd_level: Option<CrowdLevel>,
    #[serde(default)]
    pub weather_condition: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One field-collected data point. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: u64,
    pub trip_id: String,
    pub stop_id: String,
    pub observation_time: NaiveDateTime,
    pub boarding_count: u32,
    pub alighting_count: u32,
    pub crowd_level: Option<CrowdLevel>,
    pub weather_condition: Option<String>,
    pub temperature: Option<f64>,
    pub notes: Option<String>,
}

impl Observation {
    pub fn from_new(id: u64, value: NewObservation) -> Self {
        Self {
            id,
            trip_id: value.trip_id,
            stop_id: value.stop_id,
            observation_time: value.observation_time,
            boarding_count: value.boarding_count,
            alighting_count: value.alighting_count,
            crowd_level: value.crowd_level,
            weather_condition: value.weather_condition,
            temperature: value.temperature,
            notes: value.notes,
        }
    }
}

/// Optional trip/stop restriction for observation queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObservationFilter {
    pub trip_id: Option<String>,
    pub stop_id: Option<String>,
}

impl ObservationFilter {
    pub fn trip_stop(trip_id: &str, stop_id: &str) -> Self {
        Self {
            trip_id: Some(trip_id.to_string()),
            stop_id: Some(stop_id.to_string()),
        }
    }

    pub fn matches(&self, observation: &Observation) -> bool {
        self.trip_id
            .as_deref()
            .is_none_or(|trip_id| trip_id == observation.trip_id)
            && self
                .stop_id
                .as_deref()
                .is_none_or(|stop_id| stop_id == observation.stop_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crowd_level_parse_and_display() {
        for level in CrowdLevel::ALL {
            assert_eq!(level.to_string().parse::<CrowdLevel>(), Ok(level));
        }
        assert_eq!(" Packed ".parse::<CrowdLevel>(), Ok(CrowdLevel::Packed));
        assert!("empty".parse::<CrowdLevel>().is_err());
    }

    #[test]
    fn crowd_level_serializes_lowercase() {
        let json = serde_json::to_string(&CrowdLevel::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }

    #[test]
    fn amenity_flags_by_name() {
        let mut amenities = StopAmenities::default();
        assert!(amenities.set("Bike_Rack", true));
        assert!(amenities.set("bench", true));
        assert!(!amenities.set("escalator", true));
        assert_eq!(
            amenities,
            StopAmenities {
                shelter: false,
                washroom: false,
                bike_rack: true,
                bench: true,
            }
        );
    }

    #[test]
    fn filter_matches_trip_and_stop() {
        let observation = Observation {
            id: 1,
            trip_id: "t1".into(),
            stop_id: "s1".into(),
            observation_time: NaiveDateTime::default(),
            boarding_count: 0,
            alighting_count: 0,
            crowd_level: None,
            weather_condition: None,
            temperature: None,
            notes: None,
        };
        assert!(ObservationFilter::default().matches(&observation));
        assert!(ObservationFilter::trip_stop("t1", "s1").matches(&observation));
        assert!(!ObservationFilter::trip_stop("t1", "s2").matches(&observation));
        let by_trip = ObservationFilter {
            trip_id: Some("t2".into()),
            stop_id: None,
        };
        assert!(!by_trip.matches(&observation));
    }
}
