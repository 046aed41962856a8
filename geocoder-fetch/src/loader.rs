//! Loader: orchestrates the dump cache and the core ingestion pipeline
//! behind a single completion barrier.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use geocoder_core::index::SourceContent;
use geocoder_core::{Engine, IndexData};

use crate::dump_cache::DumpCache;

const VALID_CITIES_OVERRIDES: [&str; 4] = ["cities500", "cities1000", "cities5000", "cities15000"];

/// All fields are optional with the defaults shown below.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub dump_directory: PathBuf,
    pub cities_file_override: String,
    pub countries: Vec<String>,
    pub load_admin1: bool,
    pub load_admin2: bool,
    pub load_admin3_and_4: bool,
    pub load_alternate_names: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            dump_directory: std::env::current_dir()
                .unwrap_or_default()
                .join("geonames_dump"),
            cities_file_override: "cities1000".to_owned(),
            countries: Vec::new(),
            load_admin1: true,
            load_admin2: true,
            load_admin3_and_4: true,
            load_alternate_names: true,
        }
    }
}

pub struct Loader {
    cache: DumpCache,
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Result<Self> {
        if !VALID_CITIES_OVERRIDES.contains(&config.cities_file_override.as_str()) {
            return Err(anyhow!(
                "unknown citiesFileOverride {:?}, expected one of {:?}",
                config.cities_file_override,
                VALID_CITIES_OVERRIDES
            ));
        }
        Ok(Loader { cache: DumpCache::new(reqwest::Client::new()), config })
    }

    /// Run the five pipelines concurrently and build the engine once every
    /// enabled pipeline completes. Any fatal pipeline error is surfaced to
    /// the caller; subsequent errors from other pipelines are ignored once
    /// the first one wins.
    pub async fn init(&self) -> Result<Engine> {
        #[cfg(feature = "tracing")]
        tracing::info!("loader init starting");

        let cities_source = self.fetch_cities_source().await?;

        let (admin1_codes, all_countries) = futures::future::join(
            futures::future::join(self.fetch_admin1(), self.fetch_admin2()),
            futures::future::join(
                self.fetch_all_countries(&cities_source),
                self.fetch_alternate_names(),
            ),
        )
        .await;
        let (admin1_codes, admin2_codes) = admin1_codes;
        let (all_countries, alternate_names) = all_countries;

        let content = SourceContent {
            cities: cities_source.content,
            admin1_codes: admin1_codes?,
            admin2_codes: admin2_codes?,
            all_countries: all_countries?,
            alternate_names: alternate_names?,
        };

        let engine = Engine::build(IndexData::build(content));
        #[cfg(feature = "tracing")]
        tracing::info!("loader init complete: {} cities", engine.city_count());
        Ok(engine)
    }

    async fn fetch_cities_source(&self) -> Result<CitiesSource> {
        if self.config.countries.is_empty() {
            let base = &self.config.cities_file_override;
            let folder = self.config.dump_directory.join("cities");
            let path = self
                .cache
                .get(base, &format!("{base}.zip"), Some(&format!("{base}.txt")), &folder)
                .await
                .context("fetching cities dump")?;
            let content = tokio::fs::read_to_string(&path).await?;
            return Ok(CitiesSource { content, doubles_as_all_countries: false });
        }

        // Per-country pipelines, each carrying its own country code
        // explicitly rather than through shared mutable state.
        let fetches = self.config.countries.iter().map(|code| self.fetch_country(code));
        let parts = futures::future::join_all(fetches).await;
        let mut content = String::new();
        for part in parts {
            content.push_str(&part?);
            content.push('\n');
        }
        Ok(CitiesSource { content, doubles_as_all_countries: true })
    }

    async fn fetch_country(&self, country_code: &str) -> Result<String> {
        let folder = self.config.dump_directory.join(country_code);
        let path = self
            .cache
            .get(
                country_code,
                &format!("{country_code}.zip"),
                Some(&format!("{country_code}.txt")),
                &folder,
            )
            .await
            .with_context(|| format!("fetching per-country dump for {country_code}"))?;
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn fetch_admin1(&self) -> Result<Option<String>> {
        if !self.config.load_admin1 {
            return Ok(None);
        }
        let folder = self.config.dump_directory.join("admin1_codes");
        let path = self
            .cache
            .get("admin1CodesASCII", "admin1CodesASCII.txt", None, &folder)
            .await
            .context("fetching admin1 codes")?;
        Ok(Some(tokio::fs::read_to_string(path).await?))
    }

    async fn fetch_admin2(&self) -> Result<Option<String>> {
        if !self.config.load_admin2 {
            return Ok(None);
        }
        let folder = self.config.dump_directory.join("admin2_codes");
        let path = self
            .cache
            .get("admin2Codes", "admin2Codes.txt", None, &folder)
            .await
            .context("fetching admin2 codes")?;
        Ok(Some(tokio::fs::read_to_string(path).await?))
    }

    /// Feeds the admin3/admin4 extraction. When per-country dumps are
    /// configured they already carry the same 19-column schema, so they are
    /// reused instead of an extra `allCountries` fetch.
    async fn fetch_all_countries(&self, cities_source: &CitiesSource) -> Result<Option<String>> {
        if !self.config.load_admin3_and_4 {
            return Ok(None);
        }
        if cities_source.doubles_as_all_countries {
            return Ok(Some(cities_source.content.clone()));
        }
        let folder = self.config.dump_directory.join("all_countries");
        let path = self
            .cache
            .get("allCountries", "allCountries.zip", Some("allCountries.txt"), &folder)
            .await
            .context("fetching allCountries dump")?;
        Ok(Some(tokio::fs::read_to_string(path).await?))
    }

    async fn fetch_alternate_names(&self) -> Result<Option<String>> {
        if !self.config.load_alternate_names {
            return Ok(None);
        }
        let folder = self.config.dump_directory.join("alternate_names");
        let path = self
            .cache
            .get("alternateNames", "alternateNames.zip", Some("alternateNames.txt"), &folder)
            .await
            .context("fetching alternate names")?;
        Ok(Some(tokio::fs::read_to_string(path).await?))
    }
}

struct CitiesSource {
    content: String,
    doubles_as_all_countries: bool,
}
