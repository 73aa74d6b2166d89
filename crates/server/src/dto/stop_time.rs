use serde::Serialize;
use transitflow::repository::{Repository, StopTime};

#[derive(Debug, Clone, Serialize)]
pub struct StopTimeDto {
    pub id: u32,
    pub trip_id: String,
    pub stop_id: String,
    pub stop_name: Option<String>,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_sequence: u32,
    pub stop_headsign: Option<String>,
    pub pickup_type: u8,
    pub drop_off_type: u8,
}

impl StopTimeDto {
    pub fn from(stop_time: &StopTime, repository: &Repository) -> Self {
        Self {
            id: stop_time.index,
            trip_id: stop_time.trip_id.to_string(),
            stop_id: stop_time.stop_id.to_string(),
            stop_name: repository
                .stop_by_id(&stop_time.stop_id)
                .map(|stop| stop.name.to_string()),
            arrival_time: stop_time.arrival_time.to_hms_string(),
            departure_time: stop_time.departure_time.to_hms_string(),
            stop_sequence: stop_time.sequence,
            stop_headsign: stop_time.headsign.as_deref().map(String::from),
            pickup_type: stop_time.pickup_type,
            drop_off_type: stop_time.drop_off_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TripStopsDto {
    pub trip_id: String,
    pub route_id: String,
    pub stops: Vec<StopTimeDto>,
}
