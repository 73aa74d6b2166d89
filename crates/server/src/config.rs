use clap::Parser;
use std::{path::PathBuf, time::Duration};
use transitflow::prelude::*;

/// Crowd prediction API over a GTFS feed.
#[derive(Parser, Debug, Clone)]
#[command(name = "transitflow-server", version, about, long_about = None)]
pub struct Config {
    /// GTFS feed, either a zip archive or an unpacked directory
    #[arg(value_name = "GTFS_PATH", env = "GTFS_PATH")]
    pub gtfs_path: PathBuf,

    /// CSV file used to seed the observation table
    #[arg(long, env = "OBSERVATIONS_PATH")]
    pub observations: Option<PathBuf>,

    /// Where the trained model is loaded from and saved to
    #[arg(long, env = "MODEL_PATH", default_value = "data/crowd_predictor.json")]
    pub model_path: PathBuf,

    /// Lifetime of cached predictions in seconds
    #[arg(long, env = "CACHE_TTL", default_value_t = 3600)]
    pub cache_ttl: u64,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Trees in the random forest
    #[arg(long, env = "N_ESTIMATORS", default_value_t = 100)]
    pub n_estimators: usize,
}

impl Config {
    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl),
            ..Default::default()
        }
    }

    pub fn forest(&self) -> ForestConfig {
        ForestConfig {
            n_estimators: self.n_estimators,
            ..Default::default()
        }
    }
}
