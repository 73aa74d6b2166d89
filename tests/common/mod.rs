#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use transitflow::{prelude::*, repository::StopTime};

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, day)
        .unwrap()
        .and_hms_opt(hour, 10, 0)
        .unwrap()
}

fn stop(id: &str, zone_id: Option<&str>) -> Stop {
    Stop {
        id: id.into(),
        name: format!("Stop {id}").into(),
        zone_id: zone_id.map(Into::into),
        ..Default::default()
    }
}

fn stop_time(trip_id: &str, stop_id: &str, sequence: u32) -> StopTime {
    StopTime {
        trip_id: trip_id.into(),
        stop_id: stop_id.into(),
        sequence,
        arrival_time: Time::from_seconds(6 * 3600 + sequence * 180),
        departure_time: Time::from_seconds(6 * 3600 + sequence * 180),
        ..Default::default()
    }
}

/// Two routes, four stops, three trips. Stop `s4` has no zone.
pub fn repository() -> Repository {
    Repository::new()
        .with_stop(stop("s1", Some("z1")))
        .with_stop(stop("s2", Some("z1")))
        .with_stop(stop("s3", Some("z2")))
        .with_stop(stop("s4", None))
        .with_route(Route {
            id: "bus".into(),
            route_type: 3,
            ..Default::default()
        })
        .with_route(Route {
            id: "tram".into(),
            route_type: 0,
            ..Default::default()
        })
        .with_trip(Trip {
            id: "t1".into(),
            route_id: "bus".into(),
            ..Default::default()
        })
        .with_trip(Trip {
            id: "t2".into(),
            route_id: "bus".into(),
            ..Default::default()
        })
        .with_trip(Trip {
            id: "t3".into(),
            route_id: "tram".into(),
            ..Default::default()
        })
        .with_stop_time(stop_time("t1", "s1", 1))
        .with_stop_time(stop_time("t1", "s2", 2))
        .with_stop_time(stop_time("t1", "s3", 3))
        .with_stop_time(stop_time("t2", "s1", 1))
        .with_stop_time(stop_time("t2", "s4", 2))
        .with_stop_time(stop_time("t3", "s3", 1))
        .with_stop_time(stop_time("t3", "s4", 2))
        .with_amenities(
            "s1",
            StopAmenities {
                shelter: true,
                bench: true,
                ..Default::default()
            },
        )
        .with_amenities(
            "s3",
            StopAmenities {
                washroom: true,
                ..Default::default()
            },
        )
}

pub fn observation(
    trip_id: &str,
    stop_id: &str,
    at: NaiveDateTime,
    boarding_count: u32,
    crowd_level: Option<CrowdLevel>,
) -> NewObservation {
    NewObservation {
        trip_id: trip_id.into(),
        stop_id: stop_id.into(),
        observation_time: at,
        boarding_count,
        alighting_count: boarding_count / 2,
        crowd_level,
        weather_condition: None,
        temperature: None,
        notes: None,
    }
}

/// Early rides are light, midday moderate, evening packed.
pub fn observations() -> Vec<NewObservation> {
    let pairs = [("t1", "s1"), ("t1", "s2"), ("t2", "s4"), ("t3", "s3")];
    let slots = [
        (7, 4, CrowdLevel::Light),
        (12, 20, CrowdLevel::Moderate),
        (18, 45, CrowdLevel::Packed),
    ];
    (0..60u32)
        .map(|i| {
            let (trip_id, stop_id) = pairs[i as usize % pairs.len()];
            let (hour, boarding, level) = slots[i as usize % slots.len()];
            observation(trip_id, stop_id, at(1 + i % 28, hour), boarding, Some(level))
        })
        .collect()
}

pub fn forest() -> ForestConfig {
    ForestConfig {
        n_estimators: 10,
        ..Default::default()
    }
}

pub fn service() -> PredictionService<Repository, MemoryStore> {
    PredictionService::new(
        repository().with_observations(observations()),
        CrowdPredictor::new(forest()),
        PredictionCache::new(MemoryStore::new(), CacheConfig::default()),
    )
}

pub fn request(trip_id: &str, stop_id: &str, departure_time: &str) -> PredictionRequest {
    PredictionRequest {
        trip_id: trip_id.into(),
        stop_id: stop_id.into(),
        departure_time: departure_time.into(),
        date: "2024-04-10".into(),
    }
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("transitflow-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
