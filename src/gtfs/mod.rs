use serde::de::DeserializeOwned;
use std::{
    fs::File,
    io::{self, Read},
    path::PathBuf,
};
use thiserror::Error;
use tracing::{debug, warn};
use zip::{ZipArchive, read::ZipFile};

mod config;
pub mod models;
pub use config::*;
pub use models::*;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Could not find file with name: {0}")]
    FileNotFound(String),
}

#[derive(Default)]
pub enum StorageType {
    #[default]
    None,
    Zip(PathBuf),
    Directory(PathBuf),
}

/// Streams feed tables row by row out of a zip archive or an unpacked directory.
#[derive(Default)]
pub struct GtfsReader {
    config: Config,
    storage: StorageType,
}

impl GtfsReader {
    pub fn new(config: self::Config) -> Self {
        Self {
            config,
            storage: Default::default(),
        }
    }

    pub fn from_zip<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.storage = StorageType::Zip(path.into());
        self
    }

    pub fn from_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.storage = StorageType::Directory(path.into());
        self
    }

    /// Optional, a feed without the file streams nothing.
    pub fn stream_agencies<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, GtfsAgency)),
    {
        self.stream_optional(&self.config.agency_file_name, f)
    }

    pub fn stream_stops<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, GtfsStop)),
    {
        self.stream(&self.config.stops_file_name, f)
    }

    pub fn stream_routes<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, GtfsRoute)),
    {
        self.stream(&self.config.routes_file_name, f)
    }

    pub fn stream_trips<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, GtfsTrip)),
    {
        self.stream(&self.config.trips_file_name, f)
    }

    pub fn stream_stop_times<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, GtfsStopTime)),
    {
        self.stream(&self.config.stop_times_file_name, f)
    }

    /// Optional, stops without records have no amenities.
    pub fn stream_stop_amenities<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, GtfsStopAmenity)),
    {
        self.stream_optional(&self.config.stop_amenities_file_name, f)
    }

    fn stream_optional<T, F>(&self, file_name: &str, f: F) -> Result<(), self::Error>
    where
        T: DeserializeOwned,
        F: FnMut((usize, T)),
    {
        match self.stream(file_name, f) {
            Err(self::Error::FileNotFound(name)) => {
                warn!("Optional file not found, skipping: {name}");
                Ok(())
            }
            result => result,
        }
    }

    fn stream<T, F>(&self, file_name: &str, f: F) -> Result<(), self::Error>
    where
        T: DeserializeOwned,
        F: FnMut((usize, T)),
    {
        match &self.storage {
            StorageType::None => Ok(()),
            StorageType::Zip(path) => {
                let zip_file = File::open(path)?;
                let mut archive = ZipArchive::new(zip_file)?;
                let file = get_file(&mut archive, file_name)?;
                stream_csv(file, file_name, f);
                Ok(())
            }
            StorageType::Directory(path) => {
                let file = File::open(path.join(file_name)).map_err(|err| match err.kind() {
                    io::ErrorKind::NotFound => self::Error::FileNotFound(file_name.to_string()),
                    _ => err.into(),
                })?;
                stream_csv(file, file_name, f);
                Ok(())
            }
        }
    }
}

fn stream_csv<R, T, F>(reader: R, file_name: &str, f: F)
where
    R: Read,
    T: DeserializeOwned,
    F: FnMut((usize, T)),
{
    let mut skipped = 0usize;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    reader
        .deserialize()
        .filter_map(|row| match row {
            Ok(value) => Some(value),
            Err(err) => {
                skipped += 1;
                debug!("Skipping malformed row in {file_name}: {err}");
                None
            }
        })
        .enumerate()
        .for_each(f);
    if skipped > 0 {
        warn!("Skipped {skipped} malformed rows in {file_name}");
    }
}

fn get_file<'a>(
    archive: &'a mut ZipArchive<File>,
    name: &'a str,
) -> Result<ZipFile<'a, File>, self::Error> {
    let index = archive
        .index_for_name(name)
        .ok_or(self::Error::FileNotFound(name.to_string()))?;
    let file = archive.by_index(index)?;
    Ok(file)
}
