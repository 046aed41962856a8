use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_PREFIX: &str = "GEOCODER";
const CONFIG_FILE_PATH: &str = "./defaults.toml";
const CONFIG_FILE_ENV_PATH_KEY: &str = "GEOCODER_CONFIG_FILE";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub host: String,
    pub port: usize,
    pub dump_directory: String,
    pub cities_file_override: String,
    pub countries: Option<String>,
    pub load_admin1: bool,
    pub load_admin2: bool,
    pub load_admin3_and_4: bool,
    pub load_alternate_names: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut s = Config::new();

        if let Err(e) = s.merge(File::with_name(CONFIG_FILE_PATH).required(false)) {
            #[cfg(feature = "tracing")]
            tracing::info!("{}", e);
            #[cfg(not(feature = "tracing"))]
            let _ = e;
        };

        if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV_PATH_KEY) {
            #[cfg(feature = "tracing")]
            tracing::info!("try read config from: {}", config_path);
            s.merge(File::with_name(&config_path))?;
        };

        s.merge(Environment::with_prefix(CONFIG_PREFIX).separator("__"))?;

        s.try_into()
    }

    pub fn countries_list(&self) -> Vec<String> {
        self.countries
            .as_deref()
            .map(|c| c.split(',').filter(|s| !s.is_empty()).map(str::to_owned).collect())
            .unwrap_or_default()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "localhost".to_owned(),
            port: 8080,
            dump_directory: std::env::temp_dir()
                .join("geonames_dump")
                .into_os_string()
                .into_string()
                .unwrap(),
            cities_file_override: "cities1000".to_owned(),
            countries: None,
            load_admin1: true,
            load_admin2: true,
            load_admin3_and_4: true,
            load_alternate_names: true,
        }
    }
}
