mod common;

use transitflow::{ErrorKind, prelude::*};

#[test]
fn identical_requests_are_served_from_cache() {
    let service = common::service();
    service.train().unwrap();
    let request = common::request("t1", "s1", "18:10:00");

    let first = serde_json::to_vec(&service.predict(&request).unwrap()).unwrap();
    let second = serde_json::to_vec(&service.predict(&request).unwrap()).unwrap();
    assert_eq!(first, second);

    let stats = service.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
}

#[test]
fn evening_rides_are_packed() {
    let service = common::service();
    service.train().unwrap();
    let response = service
        .predict(&PredictionRequest {
            date: "2024-04-09".into(),
            ..common::request("t1", "s1", "18:10:00")
        })
        .unwrap();
    assert_eq!(response.predicted_crowd_level, CrowdLevel::Packed);
    assert!(response.confidence > 0.0 && response.confidence <= 1.0);
    assert_eq!(response.features_used.len(), 12);
    assert_eq!(response.features_used[0], "hour");
}

#[test]
fn recording_an_observation_invalidates_its_trip_and_stop() {
    let service = common::service();
    service.train().unwrap();
    service.predict(&common::request("t1", "s1", "08:00:00")).unwrap();
    service.predict(&common::request("t1", "s1", "18:00:00")).unwrap();
    service.predict(&common::request("t1", "s2", "08:00:00")).unwrap();
    assert_eq!(service.cache_stats().entries, 3);

    let stored = service
        .record_observation(common::observation(
            "t1",
            "s1",
            common::at(12, 8),
            9,
            Some(CrowdLevel::Light),
        ))
        .unwrap();
    assert_eq!(stored.id, 61);
    assert_eq!(service.cache_stats().entries, 1);
}

#[test]
fn prediction_after_a_write_sees_the_new_average() {
    let service = common::service();
    service.train().unwrap();
    let request = common::request("t1", "s1", "08:00:00");
    let before = service.predict(&request).unwrap();

    service
        .record_observation(common::observation("t1", "s1", common::at(12, 8), 900, None))
        .unwrap();
    let after = service.predict(&request).unwrap();
    let expected =
        transitflow::prediction::historical_average(service.store(), "t1", "s1").unwrap();
    assert_eq!(after.historical_average, expected);
    assert_ne!(after.historical_average, before.historical_average);
    assert_eq!(service.cache_stats().entries, 1);
}

#[test]
fn recording_for_unknown_stop_is_not_found() {
    let service = common::service();
    let err = service
        .record_observation(common::observation("t1", "s9", common::at(1, 8), 1, None))
        .unwrap_err();
    assert!(matches!(err, Error::StopNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn predict_before_train_fails_precondition() {
    let service = common::service();
    let err = service
        .predict(&common::request("t1", "s1", "08:00:00"))
        .unwrap_err();
    assert!(matches!(err, Error::ModelNotReady));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
}

#[test]
fn train_without_observations_fails_precondition() {
    let service = PredictionService::new(
        common::repository(),
        CrowdPredictor::new(common::forest()),
        PredictionCache::new(MemoryStore::new(), CacheConfig::default()),
    );
    let err = service.train().unwrap_err();
    assert!(matches!(err, Error::NoObservations));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert!(!service.is_trained());
}

#[test]
fn train_with_one_class_is_insufficient() {
    let observations = (1..=10).map(|day| {
        common::observation("t1", "s1", common::at(day, 8), 3, Some(CrowdLevel::Light))
    });
    let service = PredictionService::new(
        common::repository().with_observations(observations),
        CrowdPredictor::new(common::forest()),
        PredictionCache::new(MemoryStore::new(), CacheConfig::default()),
    );
    let err = service.train().unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!service.is_trained());
}

#[test]
fn unlabeled_observations_are_not_counted() {
    let mut observations = common::observations();
    observations.push(common::observation("t1", "s1", common::at(3, 9), 7, None));
    let service = PredictionService::new(
        common::repository().with_observations(observations),
        CrowdPredictor::new(common::forest()),
        PredictionCache::new(MemoryStore::new(), CacheConfig::default()),
    );
    let summary = service.train().unwrap();
    assert_eq!(summary.observations_used, 60);
    assert!((0.0..=1.0).contains(&summary.accuracy));
    assert!(!summary.model_saved);
}

#[test]
fn unknown_trip_and_bad_time() {
    let service = common::service();
    service.train().unwrap();

    let err = service
        .predict(&common::request("t9", "s1", "08:00:00"))
        .unwrap_err();
    assert!(matches!(err, Error::TripNotFound(_)));

    let err = service
        .predict(&common::request("t1", "s1", "8am"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDateTime(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn stop_without_zone_or_history() {
    let service = common::service();
    service.train().unwrap();
    // t3 never observed at s4, and s4 has no zone.
    let response = service
        .predict(&common::request("t3", "s4", "12:10:00"))
        .unwrap();
    assert_eq!(response.historical_average, None);
}

#[test]
fn historical_average_is_truncated_mean() {
    let observations = [10, 20, 30]
        .into_iter()
        .map(|count| common::observation("t2", "s1", common::at(5, 8), count, None))
        .chain(common::observations());
    let service = PredictionService::new(
        common::repository().with_observations(observations),
        CrowdPredictor::new(common::forest()),
        PredictionCache::new(MemoryStore::new(), CacheConfig::default()),
    );
    service.train().unwrap();
    let response = service
        .predict(&common::request("t2", "s1", "08:00:00"))
        .unwrap();
    assert_eq!(response.historical_average, Some(20));
    assert_eq!(
        transitflow::prediction::historical_average(service.store(), "t1", "s3").unwrap(),
        None
    );
}

#[test]
fn retraining_drops_cached_predictions() {
    let service = common::service();
    service.train().unwrap();
    service.predict(&common::request("t1", "s1", "08:00:00")).unwrap();
    assert_eq!(service.cache_stats().entries, 1);
    service.train().unwrap();
    assert_eq!(service.cache_stats().entries, 0);
}

#[test]
fn observation_pages() {
    let service = common::service();
    let page = service
        .observations(&ObservationFilter::default(), 50, 20)
        .unwrap();
    assert_eq!(page.total, 60);
    assert_eq!(page.observations.len(), 10);
    assert_eq!(page.observations[0].id, 51);

    let filter = ObservationFilter::trip_stop("t3", "s3");
    let page = service.observations(&filter, 0, 100).unwrap();
    assert_eq!(page.total, 15);
    assert!(
        page.observations
            .iter()
            .all(|observation| observation.trip_id == "t3")
    );
}
