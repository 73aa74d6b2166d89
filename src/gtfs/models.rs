use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GtfsAgency {
    pub agency_id: Option<String>,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub agency_lang: Option<String>,
    pub agency_phone: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GtfsStop {
    pub stop_id: String,
    pub stop_code: Option<String>,
    pub stop_name: String,
    pub stop_desc: Option<String>,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub zone_id: Option<String>,
    pub location_type: Option<u8>,
    pub parent_station: Option<String>,
    pub wheelchair_boarding: Option<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GtfsRoute {
    pub route_id: String,
    pub agency_id: Option<String>,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_desc: Option<String>,
    pub route_type: i32,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GtfsTrip {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    pub trip_headsign: Option<String>,
    pub trip_short_name: Option<String>,
    pub direction_id: Option<u8>,
    pub shape_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GtfsStopTime {
    pub trip_id: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub stop_headsign: Option<String>,
    pub pickup_type: Option<u8>,
    pub drop_off_type: Option<u8>,
    pub shape_dist_traveled: Option<f64>,
    pub timepoint: Option<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GtfsStopAmenity {
    pub stop_id: String,
    /// One of `shelter`, `washroom`, `bike_rack` or `bench`.
    pub amenity_type: String,
    pub available: Option<String>,
    pub description: Option<String>,
}

impl GtfsStopAmenity {
    /// A missing `available` column means the amenity is present.
    pub fn is_available(&self) -> bool {
        match self.available.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(value) => !matches!(
                value.to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "n" | "f"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amenity(available: Option<&str>) -> GtfsStopAmenity {
        GtfsStopAmenity {
            stop_id: "s1".into(),
            amenity_type: "shelter".into(),
            available: available.map(String::from),
            description: None,
        }
    }

    #[test]
    fn amenity_availability() {
        assert!(amenity(None).is_available());
        assert!(amenity(Some("")).is_available());
        assert!(amenity(Some("True")).is_available());
        assert!(amenity(Some("1")).is_available());
        assert!(!amenity(Some("0")).is_available());
        assert!(!amenity(Some("false")).is_available());
    }
}
