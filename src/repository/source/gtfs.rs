use crate::{
    gtfs::{self, GtfsAgency, GtfsReader, GtfsRoute, GtfsStop, GtfsTrip},
    repository::{Agency, Repository, Route, Stop, StopTime, Trip},
    shared::time::Time,
};
use std::time::Instant;
use tracing::{debug, warn};

impl From<GtfsAgency> for Agency {
    fn from(value: GtfsAgency) -> Self {
        Self {
            index: u32::MAX,
            id: value.agency_id.map(|val| val.into()),
            name: value.agency_name.into(),
            url: value.agency_url.into(),
            timezone: value.agency_timezone.into(),
        }
    }
}

impl From<GtfsStop> for Stop {
    fn from(value: GtfsStop) -> Self {
        Self {
            index: u32::MAX,
            id: value.stop_id.into(),
            code: value.stop_code.map(|val| val.into()),
            name: value.stop_name.into(),
            description: value.stop_desc.map(|val| val.into()),
            latitude: value.stop_lat,
            longitude: value.stop_lon,
            zone_id: value
                .zone_id
                .filter(|zone| !zone.is_empty())
                .map(|val| val.into()),
            location_type: value.location_type.unwrap_or_default(),
            wheelchair_boarding: value.wheelchair_boarding.unwrap_or_default(),
        }
    }
}

impl From<GtfsRoute> for Route {
    fn from(value: GtfsRoute) -> Self {
        Self {
            index: u32::MAX,
            id: value.route_id.into(),
            agency_id: value.agency_id.map(|val| val.into()),
            short_name: value.route_short_name.map(|val| val.into()),
            long_name: value.route_long_name.map(|val| val.into()),
            description: value.route_desc.map(|val| val.into()),
            route_type: value.route_type,
            color: value.route_color.map(|val| val.into()),
            text_color: value.route_text_color.map(|val| val.into()),
        }
    }
}

impl From<GtfsTrip> for Trip {
    fn from(value: GtfsTrip) -> Self {
        Self {
            index: u32::MAX,
            id: value.trip_id.into(),
            route_id: value.route_id.into(),
            route_idx: u32::MAX,
            service_id: value.service_id.into(),
            headsign: value.trip_headsign.map(|val| val.into()),
            short_name: value.trip_short_name.map(|val| val.into()),
            direction_id: value.direction_id,
        }
    }
}

impl Repository {
    /// Streams the feed into a fresh set of tables.
    /// Rows pointing at unknown trips, stops or routes are skipped.
    pub fn load_gtfs(mut self, gtfs: GtfsReader) -> Result<Self, gtfs::Error> {
        self.load_agencies(&gtfs)?;
        self.load_stops(&gtfs)?;
        self.load_routes(&gtfs)?;
        self.load_trips(&gtfs)?;
        self.load_stop_times(&gtfs)?;
        self.load_stop_amenities(&gtfs)?;
        Ok(self)
    }

    fn load_agencies(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading agencies...");
        let now = Instant::now();
        gtfs.stream_agencies(|(_, agency)| self.push_agency(agency.into()))?;
        debug!("Loading agencies took {:?}", now.elapsed());
        Ok(())
    }

    fn load_stops(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading stops...");
        let now = Instant::now();
        gtfs.stream_stops(|(_, stop)| self.push_stop(stop.into()))?;
        debug!("Loading stops took {:?}", now.elapsed());
        Ok(())
    }

    fn load_routes(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading routes...");
        let now = Instant::now();
        gtfs.stream_routes(|(_, route)| self.push_route(route.into()))?;
        debug!("Loading routes took {:?}", now.elapsed());
        Ok(())
    }

    fn load_trips(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading trips...");
        let now = Instant::now();
        let mut skipped = 0usize;
        gtfs.stream_trips(|(_, trip)| {
            if !self.push_trip(trip.into()) {
                skipped += 1;
            }
        })?;
        if skipped > 0 {
            warn!("Skipped {skipped} trips with unknown routes");
        }
        debug!("Loading trips took {:?}", now.elapsed());
        Ok(())
    }

    fn load_stop_times(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading stop times...");
        let now = Instant::now();
        let mut skipped = 0usize;
        gtfs.stream_stop_times(|(_, stop_time)| {
            let (Some(arrival_time), Some(departure_time)) = (
                Time::from_hms(&stop_time.arrival_time),
                Time::from_hms(&stop_time.departure_time),
            ) else {
                debug!(
                    "Stop time for trip {} at stop {} has no usable times",
                    stop_time.trip_id, stop_time.stop_id
                );
                skipped += 1;
                return;
            };
            let value = StopTime {
                index: u32::MAX,
                trip_id: stop_time.trip_id.into(),
                trip_idx: u32::MAX,
                stop_id: stop_time.stop_id.into(),
                stop_idx: u32::MAX,
                sequence: stop_time.stop_sequence,
                arrival_time,
                departure_time,
                headsign: stop_time.stop_headsign.map(|val| val.into()),
                pickup_type: stop_time.pickup_type.unwrap_or_default(),
                drop_off_type: stop_time.drop_off_type.unwrap_or_default(),
            };
            if !self.push_stop_time(value) {
                skipped += 1;
            }
        })?;
        if skipped > 0 {
            warn!("Skipped {skipped} stop times");
        }
        debug!("Loading stop times took {:?}", now.elapsed());
        Ok(())
    }

    fn load_stop_amenities(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading stop amenities...");
        let now = Instant::now();
        let mut skipped = 0usize;
        gtfs.stream_stop_amenities(|(_, amenity)| {
            if !self.set_amenity(&amenity.stop_id, &amenity.amenity_type, amenity.is_available()) {
                debug!(
                    "Ignoring amenity {} for stop {}",
                    amenity.amenity_type, amenity.stop_id
                );
                skipped += 1;
            }
        })?;
        if skipped > 0 {
            warn!("Skipped {skipped} stop amenity rows");
        }
        debug!("Loading stop amenities took {:?}", now.elapsed());
        Ok(())
    }
}
