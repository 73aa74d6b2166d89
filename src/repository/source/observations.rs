use chrono::NaiveDateTime;
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    error::Error,
    prediction::FeatureSource,
    repository::{CrowdLevel, NewObservation, Repository},
};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// One row of `observations.csv`, before validation.
#[derive(Debug, Deserialize)]
struct ObservationRow {
    trip_id: String,
    stop_id: String,
    observation_time: String,
    boarding_count: Option<u32>,
    alighting_count: Option<u32>,
    crowd_level: Option<String>,
    weather_condition: Option<String>,
    temperature: Option<f64>,
    notes: Option<String>,
}

impl TryFrom<ObservationRow> for NewObservation {
    type Error = Error;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        let observation_time = parse_timestamp(&row.observation_time).ok_or_else(|| {
            Error::InvalidObservation(format!("bad observation_time '{}'", row.observation_time))
        })?;
        let crowd_level = row
            .crowd_level
            .filter(|level| !level.is_empty())
            .map(|level| level.parse::<CrowdLevel>())
            .transpose()
            .map_err(Error::InvalidObservation)?;
        Ok(NewObservation {
            trip_id: row.trip_id,
            stop_id: row.stop_id,
            observation_time,
            boarding_count: row.boarding_count.unwrap_or_default(),
            alighting_count: row.alighting_count.unwrap_or_default(),
            crowd_level,
            weather_condition: row.weather_condition.filter(|value| !value.is_empty()),
            temperature: row.temperature,
            notes: row.notes.filter(|value| !value.is_empty()),
        })
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
}

impl Repository {
    /// Seeds the observation table from a csv file.
    pub fn load_observations<P: AsRef<Path>>(self, path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let repository = self.read_observations(file)?;
        info!("Loaded observations from {}", path.display());
        Ok(repository)
    }

    /// Rows that fail to parse abort the load. Rows for unknown trips or
    /// stops are skipped.
    pub fn read_observations<R: Read>(self, reader: R) -> Result<Self, Error> {
        debug!("Loading observations...");
        let now = Instant::now();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut observations = Vec::new();
        let mut skipped = 0usize;
        for row in reader.deserialize::<ObservationRow>() {
            let observation = NewObservation::try_from(row?)?;
            if self.trip(&observation.trip_id).is_none() || self.stop(&observation.stop_id).is_none()
            {
                debug!(
                    "Observation references unknown trip {} or stop {}",
                    observation.trip_id, observation.stop_id
                );
                skipped += 1;
                continue;
            }
            observations.push(observation);
        }
        if skipped > 0 {
            warn!("Skipped {skipped} observations for unknown trips or stops");
        }
        let count = observations.len();
        let repository = self.with_observations(observations);
        debug!("Loading {count} observations took {:?}", now.elapsed());
        Ok(repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_with_space_or_t() {
        assert!(parse_timestamp("2024-01-15 08:30:00").is_some());
        assert!(parse_timestamp("2024-01-15T08:30:00").is_some());
        assert!(parse_timestamp("15/01/2024 08:30").is_none());
    }

    #[test]
    fn row_conversion() {
        let row = ObservationRow {
            trip_id: "t1".into(),
            stop_id: "s1".into(),
            observation_time: "2024-01-15 08:30:00".into(),
            boarding_count: Some(12),
            alighting_count: None,
            crowd_level: Some("Moderate".into()),
            weather_condition: Some(String::new()),
            temperature: Some(-3.5),
            notes: None,
        };
        let observation = NewObservation::try_from(row).unwrap();
        assert_eq!(observation.crowd_level, Some(CrowdLevel::Moderate));
        assert_eq!(observation.boarding_count, 12);
        assert_eq!(observation.alighting_count, 0);
        assert_eq!(observation.weather_condition, None);
    }

    #[test]
    fn bad_crowd_level_is_rejected() {
        let row = ObservationRow {
            trip_id: "t1".into(),
            stop_id: "s1".into(),
            observation_time: "2024-01-15 08:30:00".into(),
            boarding_count: None,
            alighting_count: None,
            crowd_level: Some("jammed".into()),
            weather_condition: None,
            temperature: None,
            notes: None,
        };
        assert!(matches!(
            NewObservation::try_from(row),
            Err(Error::InvalidObservation(_))
        ));
    }
}
