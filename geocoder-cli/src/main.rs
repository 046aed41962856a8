use std::path::PathBuf;

#[cfg(feature = "tracing")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anyhow::Result;
use clap::Parser;

use geocoder_core::Point;
use geocoder_fetch::{Loader, LoaderConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
enum Args {
    /// Fetch and cache the GeoNames dump files, building the engine once.
    Fetch(FetchArgs),
    /// Honor the `GEOCODER_POSTINSTALL_*` env-var convenience contract.
    Postinstall,
    /// One-shot reverse-geocode lookup for local testing.
    Lookup(LookupArgs),
}

#[derive(clap::Args, Debug)]
struct FetchArgs {
    #[arg(long)]
    dump_directory: Option<PathBuf>,

    #[arg(long)]
    cities_file_override: Option<String>,

    /// Comma-separated ISO country codes.
    #[arg(long)]
    countries: Option<String>,

    #[arg(long)]
    no_admin1: bool,
    #[arg(long)]
    no_admin2: bool,
    #[arg(long)]
    no_admin3_and_4: bool,
    #[arg(long)]
    no_alternate_names: bool,
}

impl FetchArgs {
    fn into_loader_config(self) -> LoaderConfig {
        let mut config = LoaderConfig::default();
        if let Some(dir) = self.dump_directory {
            config.dump_directory = dir;
        }
        if let Some(cities) = self.cities_file_override {
            config.cities_file_override = cities;
        }
        if let Some(countries) = self.countries {
            config.countries = countries.split(',').filter(|c| !c.is_empty()).map(str::to_owned).collect();
        }
        config.load_admin1 = !self.no_admin1;
        config.load_admin2 = !self.no_admin2;
        config.load_admin3_and_4 = !self.no_admin3_and_4;
        config.load_alternate_names = !self.no_alternate_names;
        config
    }
}

#[derive(clap::Args, Debug)]
struct LookupArgs {
    #[arg(long)]
    lat: f64,
    #[arg(long)]
    lng: f64,
    #[arg(long, default_value_t = 1)]
    max_results: usize,
    #[arg(long)]
    dump_directory: Option<PathBuf>,
}

fn init_tracing() {
    #[cfg(feature = "tracing")]
    {
        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            ))
            .with(tracing_subscriber::fmt::layer());
        subscriber.init();
    }
}

/// `GEOCODER_POSTINSTALL_*` env vars, read for post-install convenience.
struct PostinstallEnv {
    any_set: bool,
    config: LoaderConfig,
    fail_silently: bool,
}

fn read_postinstall_env() -> PostinstallEnv {
    let mut config = LoaderConfig::default();
    let mut any_set = false;

    if let Ok(dir) = std::env::var("GEOCODER_POSTINSTALL_DUMP_DIRECTORY") {
        config.dump_directory = PathBuf::from(dir);
        any_set = true;
    }
    if let Ok(cities) = std::env::var("GEOCODER_POSTINSTALL_CITIES_FILE_OVERRIDE") {
        config.cities_file_override = cities;
        any_set = true;
    }
    if let Ok(countries) = std::env::var("GEOCODER_POSTINSTALL_COUNTRIES") {
        config.countries = countries.split(',').filter(|c| !c.is_empty()).map(str::to_owned).collect();
        any_set = true;
    }
    for (var, flag) in [
        ("GEOCODER_POSTINSTALL_LOAD_ADMIN1", &mut config.load_admin1),
        ("GEOCODER_POSTINSTALL_LOAD_ADMIN2", &mut config.load_admin2),
        ("GEOCODER_POSTINSTALL_LOAD_ADMIN3_AND_4", &mut config.load_admin3_and_4),
        ("GEOCODER_POSTINSTALL_LOAD_ALTERNATE_NAMES", &mut config.load_alternate_names),
    ] {
        if let Ok(value) = std::env::var(var) {
            *flag = value != "false" && value != "0";
            any_set = true;
        }
    }

    let fail_silently = std::env::var("GEOCODER_POSTINSTALL_FAIL_SILENTLY")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    if std::env::var("GEOCODER_POSTINSTALL_FAIL_SILENTLY").is_ok() {
        any_set = true;
    }

    PostinstallEnv { any_set, config, fail_silently }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match Args::parse() {
        Args::Fetch(args) => {
            let config = args.into_loader_config();
            let engine = Loader::new(config)?.init().await?;
            println!("{{\"cities\": {}}}", engine.city_count());
            Ok(())
        }

        Args::Postinstall => {
            let env = read_postinstall_env();
            if !env.any_set {
                #[cfg(feature = "tracing")]
                tracing::info!("no GEOCODER_POSTINSTALL_* vars set, skipping eager init");
                return Ok(());
            }

            match Loader::new(env.config) {
                Ok(loader) => match loader.init().await {
                    Ok(_) => Ok(()),
                    Err(e) if env.fail_silently => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("postinstall init failed (failing silently): {e:#}");
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                Err(e) if env.fail_silently => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("postinstall config invalid (failing silently): {e:#}");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }

        Args::Lookup(args) => {
            let mut config = LoaderConfig::default();
            if let Some(dir) = args.dump_directory {
                config.dump_directory = dir;
            }
            let engine = Loader::new(config)?.init().await?;
            let point = Point::new(args.lat, args.lng)?;
            let results = engine.lookup(&[point], args.max_results);
            println!("{}", serde_json::to_string_pretty(&results[0])?);
            Ok(())
        }
    }
}
