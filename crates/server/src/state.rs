use anyhow::Context;
use std::{path::Path, time::Instant};
use tracing::{error, info, warn};
use transitflow::prelude::*;

use crate::config::Config;

pub type Service = PredictionService<Repository, MemoryStore>;

pub struct AppState {
    pub service: Service,
}

impl AppState {
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    /// Loads the feed, the seed observations and the saved model.
    /// A model file that cannot be read leaves the service untrained.
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        info!("Loading data...");
        let now = Instant::now();
        let reader = gtfs_reader(&config.gtfs_path);
        let mut repository = Repository::new()
            .load_gtfs(reader)
            .with_context(|| format!("loading feed from {}", config.gtfs_path.display()))?;
        if let Some(path) = &config.observations {
            repository = repository
                .load_observations(path)
                .with_context(|| format!("loading observations from {}", path.display()))?;
        }
        info!("Loading data took {:?}", now.elapsed());

        let service = PredictionService::new(
            repository,
            CrowdPredictor::new(config.forest()),
            PredictionCache::new(MemoryStore::new(), config.cache()),
        )
        .with_model_path(&config.model_path);

        if config.model_path.exists() {
            if let Err(err) = service.load_model(&config.model_path) {
                error!(
                    "Failed to load model from {}, starting untrained: {err}",
                    config.model_path.display()
                );
            }
        } else {
            warn!(
                "No model at {}, train one with POST /api/v1/train",
                config.model_path.display()
            );
        }
        Ok(Self::new(service))
    }
}

fn gtfs_reader(path: &Path) -> GtfsReader {
    let reader = GtfsReader::new(Default::default());
    if path.is_dir() {
        reader.from_dir(path)
    } else {
        reader.from_zip(path)
    }
}
