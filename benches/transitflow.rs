use chrono::{Duration as ChronoDuration, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{hint::black_box, time::Duration};
use transitflow::{prelude::*, repository::StopTime};

const STOPS: usize = 60;
const TRIPS: usize = 120;
const STOPS_PER_TRIP: usize = 12;
const OBSERVATIONS: usize = 3000;

fn synthetic_repository() -> Repository {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut repository = Repository::new();
    for i in 0..STOPS {
        repository = repository.with_stop(Stop {
            id: format!("s{i}").into(),
            name: format!("Stop {i}").into(),
            zone_id: Some(format!("z{}", i % 5).into()),
            ..Default::default()
        });
        if i % 3 == 0 {
            repository = repository.with_amenities(
                &format!("s{i}"),
                StopAmenities {
                    shelter: true,
                    bench: i % 2 == 0,
                    ..Default::default()
                },
            );
        }
    }
    for route_type in [0, 1, 3] {
        repository = repository.with_route(Route {
            id: format!("r{route_type}").into(),
            route_type,
            ..Default::default()
        });
    }
    for t in 0..TRIPS {
        let route_id = ["r0", "r1", "r3"][t % 3];
        repository = repository.with_trip(Trip {
            id: format!("t{t}").into(),
            route_id: route_id.into(),
            ..Default::default()
        });
        let first = rng.gen_range(0..STOPS);
        for seq in 0..STOPS_PER_TRIP {
            let departure = Time::from_seconds(5 * 3600 + (t * 300 + seq * 90) as u32);
            repository = repository.with_stop_time(StopTime {
                trip_id: format!("t{t}").into(),
                stop_id: format!("s{}", (first + seq) % STOPS).into(),
                sequence: seq as u32 + 1,
                arrival_time: departure,
                departure_time: departure,
                ..Default::default()
            });
        }
    }

    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(5, 0, 0)
        .unwrap();
    let observations: Vec<NewObservation> = (0..OBSERVATIONS)
        .map(|_| {
            let trip = rng.gen_range(0..TRIPS);
            let stop_times = repository.stop_times_by_trip_id(&format!("t{trip}")).unwrap();
            let stop_time = stop_times[rng.gen_range(0..stop_times.len())];
            let at = start
                + ChronoDuration::days(rng.gen_range(0..180))
                + ChronoDuration::minutes(rng.gen_range(0..18 * 60));
            let boarding_count = rng.gen_range(0..60);
            let crowd_level = match boarding_count {
                0..20 => CrowdLevel::Light,
                20..40 => CrowdLevel::Moderate,
                _ => CrowdLevel::Packed,
            };
            NewObservation {
                trip_id: stop_time.trip_id.to_string(),
                stop_id: stop_time.stop_id.to_string(),
                observation_time: at,
                boarding_count,
                alighting_count: boarding_count / 3,
                crowd_level: Some(crowd_level),
                weather_condition: None,
                temperature: None,
                notes: None,
            }
        })
        .collect();
    repository.with_observations(observations)
}

fn criterion_benchmark(c: &mut Criterion) {
    let service = PredictionService::new(
        synthetic_repository(),
        CrowdPredictor::default(),
        PredictionCache::new(MemoryStore::new(), CacheConfig::default()),
    );

    let mut group = c.benchmark_group("Prediction");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    group.bench_function("Train", |b| b.iter(|| black_box(service.train())));

    let request = PredictionRequest {
        trip_id: "t5".into(),
        stop_id: service
            .store()
            .stop_times_by_trip_id("t5")
            .and_then(|stop_times| stop_times.first().map(|st| st.stop_id.to_string()))
            .unwrap_or_default(),
        departure_time: "08:15:00".into(),
        date: "2024-05-14".into(),
    };
    group.bench_function("Predict cached", |b| {
        b.iter(|| black_box(service.predict(&request)))
    });

    let bundle = service.predictor().bundle();
    let row = transitflow::prediction::build_row(
        service.store(),
        &request.trip_id,
        &request.stop_id,
        NaiveDate::from_ymd_opt(2024, 5, 14)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap(),
    );
    group.bench_function("Classify", |b| b.iter(|| black_box(bundle.classify(&row))));

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
