use std::{
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::warn;

mod entities;
mod source;
mod store;
pub use entities::*;
pub use store::*;

use crate::{
    error::Error,
    prediction::{FeatureSource, RouteAttributes, StopAttributes, TripAttributes},
};

type IdToIndex = HashMap<Arc<str>, u32>;

/// In-memory feed tables plus the observation table.
///
/// Feed tables are filled once, either through the `with_*` builders or
/// [`Repository::load_gtfs`], and only read afterwards. Observations can be
/// appended at any time through [`Store::insert_observation`].
#[derive(Debug, Default)]
pub struct Repository {
    agencies: Vec<Agency>,
    stops: Vec<Stop>,
    routes: Vec<Route>,
    trips: Vec<Trip>,
    stop_times: Vec<StopTime>,

    stop_lookup: IdToIndex,
    route_lookup: IdToIndex,
    trip_lookup: IdToIndex,
    /// Stop time indexes per trip, ordered by sequence.
    trip_to_stop_times: Vec<Vec<u32>>,
    /// Amenities per stop index.
    stop_amenities: Vec<Option<StopAmenities>>,

    observations: RwLock<Vec<Observation>>,
    next_observation_id: AtomicU64,
}

impl Repository {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_agency(mut self, agency: Agency) -> Self {
        self.push_agency(agency);
        self
    }

    pub fn with_stop(mut self, stop: Stop) -> Self {
        self.push_stop(stop);
        self
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.push_route(route);
        self
    }

    /// Trips referencing an unknown route are dropped.
    pub fn with_trip(mut self, trip: Trip) -> Self {
        self.push_trip(trip);
        self
    }

    /// Stop times referencing an unknown trip or stop are dropped.
    pub fn with_stop_time(mut self, stop_time: StopTime) -> Self {
        self.push_stop_time(stop_time);
        self
    }

    pub fn with_amenities(mut self, stop_id: &str, amenities: StopAmenities) -> Self {
        if let Some(idx) = self.stop_lookup.get(stop_id) {
            self.stop_amenities[*idx as usize] = Some(amenities);
        }
        self
    }

    pub fn with_observations<I>(mut self, observations: I) -> Self
    where
        I: IntoIterator<Item = NewObservation>,
    {
        let table = self
            .observations
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for observation in observations {
            let id = self.next_observation_id.get_mut();
            *id += 1;
            table.push(Observation::from_new(*id, observation));
        }
        self
    }

    pub(crate) fn push_agency(&mut self, mut agency: Agency) {
        agency.index = self.agencies.len() as u32;
        self.agencies.push(agency);
    }

    pub(crate) fn push_stop(&mut self, mut stop: Stop) {
        let idx = self.stops.len() as u32;
        stop.index = idx;
        if self.stop_lookup.insert(stop.id.clone(), idx).is_some() {
            warn!("Duplicate stop id {}, keeping the last one", stop.id);
        }
        self.stops.push(stop);
        self.stop_amenities.push(None);
    }

    pub(crate) fn push_route(&mut self, mut route: Route) {
        let idx = self.routes.len() as u32;
        route.index = idx;
        if self.route_lookup.insert(route.id.clone(), idx).is_some() {
            warn!("Duplicate route id {}, keeping the last one", route.id);
        }
        self.routes.push(route);
    }

    pub(crate) fn push_trip(&mut self, mut trip: Trip) -> bool {
        let Some(route_idx) = self.route_lookup.get(&trip.route_id) else {
            warn!("Trip {} references unknown route {}", trip.id, trip.route_id);
            return false;
        };
        let idx = self.trips.len() as u32;
        trip.index = idx;
        trip.route_idx = *route_idx;
        trip.route_id = self.routes[*route_idx as usize].id.clone();
        if self.trip_lookup.insert(trip.id.clone(), idx).is_some() {
            warn!("Duplicate trip id {}, keeping the last one", trip.id);
        }
        self.trips.push(trip);
        self.trip_to_stop_times.push(Vec::new());
        true
    }

    pub(crate) fn push_stop_time(&mut self, mut stop_time: StopTime) -> bool {
        let (Some(trip_idx), Some(stop_idx)) = (
            self.trip_lookup.get(&stop_time.trip_id).copied(),
            self.stop_lookup.get(&stop_time.stop_id).copied(),
        ) else {
            warn!(
                "Stop time references unknown trip {} or stop {}",
                stop_time.trip_id, stop_time.stop_id
            );
            return false;
        };
        let idx = self.stop_times.len() as u32;
        stop_time.index = idx;
        stop_time.trip_idx = trip_idx;
        stop_time.stop_idx = stop_idx;
        stop_time.trip_id = self.trips[trip_idx as usize].id.clone();
        stop_time.stop_id = self.stops[stop_idx as usize].id.clone();

        let sequence = stop_time.sequence;
        let stop_times = &self.stop_times;
        let slot = &mut self.trip_to_stop_times[trip_idx as usize];
        let at = slot.partition_point(|i| stop_times[*i as usize].sequence <= sequence);
        slot.insert(at, idx);
        self.stop_times.push(stop_time);
        true
    }

    pub(crate) fn set_amenity(&mut self, stop_id: &str, amenity_type: &str, available: bool) -> bool {
        let Some(idx) = self.stop_lookup.get(stop_id) else {
            return false;
        };
        self.stop_amenities[*idx as usize]
            .get_or_insert_with(Default::default)
            .set(amenity_type, available)
    }

    pub fn agencies(&self) -> &[Agency] {
        &self.agencies
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    /// Get a stop with the given id.
    /// If no stop is found with the given id None is returned.
    pub fn stop_by_id(&self, id: &str) -> Option<&Stop> {
        let stop_index = self.stop_lookup.get(id)?;
        Some(&self.stops[*stop_index as usize])
    }

    pub fn route_by_id(&self, id: &str) -> Option<&Route> {
        let index = self.route_lookup.get(id)?;
        Some(&self.routes[*index as usize])
    }

    /// Gets a trip with the given id.
    /// If no trip with the given id was found None is returned.
    pub fn trip_by_id(&self, id: &str) -> Option<&Trip> {
        let trip_index = self.trip_lookup.get(id)?;
        Some(&self.trips[*trip_index as usize])
    }

    pub fn route_by_trip_id(&self, trip_id: &str) -> Option<&Route> {
        let trip = self.trip_by_id(trip_id)?;
        Some(&self.routes[trip.route_idx as usize])
    }

    /// The agency operating a route. Single agency feeds may leave
    /// `agency_id` out, in which case the only agency is returned.
    pub fn agency_by_route(&self, route: &Route) -> Option<&Agency> {
        match &route.agency_id {
            Some(id) => self
                .agencies
                .iter()
                .find(|agency| agency.id.as_ref() == Some(id)),
            None if self.agencies.len() == 1 => self.agencies.first(),
            None => None,
        }
    }

    /// Returns all the stop times for a given trip ordered by stop sequence.
    /// If no trip was found with the given id None is returned.
    pub fn stop_times_by_trip_id(&self, trip_id: &str) -> Option<Vec<&StopTime>> {
        let trip_index = self.trip_lookup.get(trip_id)?;
        Some(
            self.trip_to_stop_times[*trip_index as usize]
                .iter()
                .map(|i| &self.stop_times[*i as usize])
                .collect(),
        )
    }

    pub fn amenities_by_stop_id(&self, stop_id: &str) -> Option<StopAmenities> {
        let stop_index = self.stop_lookup.get(stop_id)?;
        self.stop_amenities[*stop_index as usize]
    }
}

impl FeatureSource for Repository {
    fn stop(&self, stop_id: &str) -> Option<StopAttributes> {
        self.stop_by_id(stop_id).map(|stop| StopAttributes {
            id: stop.id.clone(),
            zone_id: stop.zone_id.clone(),
        })
    }

    fn trip(&self, trip_id: &str) -> Option<TripAttributes> {
        self.trip_by_id(trip_id).map(|trip| TripAttributes {
            id: trip.id.clone(),
            route_id: trip.route_id.clone(),
        })
    }

    fn route(&self, route_id: &str) -> Option<RouteAttributes> {
        self.route_by_id(route_id).map(|route| RouteAttributes {
            id: route.id.clone(),
            route_type: route.route_type,
        })
    }

    fn stop_sequence(&self, trip_id: &str, stop_id: &str) -> Option<u32> {
        self.stop_times_by_trip_id(trip_id)?
            .into_iter()
            .find(|stop_time| stop_time.stop_id.as_ref() == stop_id)
            .map(|stop_time| stop_time.sequence)
    }

    fn amenities(&self, stop_id: &str) -> Option<StopAmenities> {
        self.amenities_by_stop_id(stop_id)
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("observation table lock poisoned".into())
}

impl Store for Repository {
    fn observations(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, Error> {
        let observations = self.observations.read().map_err(poisoned)?;
        Ok(observations
            .iter()
            .filter(|observation| filter.matches(observation))
            .cloned()
            .collect())
    }

    fn count_observations(&self, filter: &ObservationFilter) -> Result<usize, Error> {
        let observations = self.observations.read().map_err(poisoned)?;
        Ok(observations
            .iter()
            .filter(|observation| filter.matches(observation))
            .count())
    }

    fn insert_observation(&self, observation: NewObservation) -> Result<Observation, Error> {
        let mut observations = self.observations.write().map_err(poisoned)?;
        let id = self.next_observation_id.fetch_add(1, Ordering::Relaxed) + 1;
        let value = Observation::from_new(id, observation);
        observations.push(value.clone());
        Ok(value)
    }
}
