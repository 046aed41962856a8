//! Fetches the GeoNames dump files and assembles a ready-to-query
//! [`geocoder_core::Engine`] behind a lazily-initialized facade.

pub mod dump_cache;
pub mod loader;

pub use dump_cache::DumpCache;
pub use loader::{Loader, LoaderConfig};

use anyhow::Result;
use geocoder_core::{Engine, Point, ResultRecord};
use tokio::sync::OnceCell;

/// Re-entrant entry point: the first caller (whether that is an explicit
/// [`Geocoder::init`] or the first [`Geocoder::look_up`]) pays for loading
/// the dump files; every other caller awaits the same result.
pub struct Geocoder {
    config: LoaderConfig,
    engine: OnceCell<Engine>,
}

impl Geocoder {
    pub fn new(config: LoaderConfig) -> Self {
        Geocoder { config, engine: OnceCell::new() }
    }

    pub async fn init(&self) -> Result<&Engine> {
        self.engine
            .get_or_try_init(|| async { Loader::new(self.config.clone())?.init().await })
            .await
    }

    pub async fn look_up(&self, points: &[Point], max_results: usize) -> Result<Vec<Vec<ResultRecord>>> {
        let engine = self.init().await?;
        Ok(engine.lookup(points, max_results))
    }

    pub fn is_ready(&self) -> bool {
        self.engine.initialized()
    }
}
