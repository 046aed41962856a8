use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ntex::web::{self, middleware, App, HttpResponse};
use ntex_cors::Cors;

use geocoder_fetch::{Geocoder, LoaderConfig};

mod settings;

async fn healthcheck() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn deep_healthcheck(geocoder: web::types::State<Arc<Geocoder>>) -> HttpResponse {
    if geocoder.is_ready() {
        HttpResponse::Ok().finish()
    } else {
        HttpResponse::ServiceUnavailable().finish()
    }
}

/// `?latitude=..&latitude=..&longitude=..&longitude=..&maxResults=..`, a
/// repeatable pair of query keys rather than a single indexed point.
fn parse_points(query_string: &str) -> Result<Vec<geocoder_core::Point>, &'static str> {
    let mut latitudes = Vec::new();
    let mut longitudes = Vec::new();
    for (key, value) in url_encoded_pairs(query_string) {
        match key.as_str() {
            "latitude" => latitudes.push(value),
            "longitude" => longitudes.push(value),
            _ => {}
        }
    }

    if latitudes.is_empty() || latitudes.len() != longitudes.len() {
        return Err("latitude/longitude count mismatch");
    }

    latitudes
        .iter()
        .zip(longitudes.iter())
        .map(|(lat, lon)| geocoder_core::Point::parse(lat, lon).ok_or("invalid latitude/longitude value"))
        .collect()
}

fn url_encoded_pairs(query_string: &str) -> Vec<(String, String)> {
    query_string
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((
                percent_decode(key),
                percent_decode(value),
            ))
        })
        .collect()
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(b) = u8::from_str_radix(&value[i + 1..i + 3], 16) {
                    out.push(b);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn max_results_from(query_string: &str) -> usize {
    url_encoded_pairs(query_string)
        .into_iter()
        .find(|(key, _)| key == "maxResults")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1)
}

async fn geocode(
    geocoder: web::types::State<Arc<Geocoder>>,
    req: web::HttpRequest,
) -> HttpResponse {
    let query_string = req.query_string();
    let points = match parse_points(query_string) {
        Ok(points) => points,
        Err(message) => return HttpResponse::BadRequest().body(message),
    };
    let max_results = max_results_from(query_string).max(1);

    match geocoder.look_up(&points, max_results).await {
        Ok(results) => HttpResponse::Ok().json(&results),
        Err(_) => HttpResponse::ServiceUnavailable().finish(),
    }
}

#[ntex::main]
async fn main() -> std::io::Result<()> {
    #[cfg(feature = "tracing")]
    {
        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            ))
            .with(tracing_subscriber::fmt::layer());
        subscriber.init();
    }

    let settings = settings::Settings::new().expect("on read settings");
    #[cfg(feature = "tracing")]
    tracing::info!("settings are:\n{:#?}", settings);

    let loader_config = LoaderConfig {
        dump_directory: settings.dump_directory.clone().into(),
        cities_file_override: settings.cities_file_override.clone(),
        countries: settings.countries_list(),
        load_admin1: settings.load_admin1,
        load_admin2: settings.load_admin2,
        load_admin3_and_4: settings.load_admin3_and_4,
        load_alternate_names: settings.load_alternate_names,
    };

    let geocoder = Arc::new(Geocoder::new(loader_config));

    // Eager init in the background so `/deep-healthcheck` flips once it
    // resolves instead of waiting for the first `/geocode` request.
    let warmup = geocoder.clone();
    ntex::rt::spawn(async move {
        if let Err(e) = warmup.init().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("background init failed: {e:#}");
            #[cfg(not(feature = "tracing"))]
            let _ = e;
        }
    });

    let listen_on = format!("{}:{}", settings.host, settings.port);
    #[cfg(feature = "tracing")]
    tracing::info!("listen on {}", listen_on);

    web::server(move || {
        let geocoder = geocoder.clone();

        App::new()
            .state(geocoder)
            .wrap(middleware::Logger::default())
            .wrap(Cors::default())
            .service(web::resource("/healthcheck").to(healthcheck))
            .service(web::resource("/deep-healthcheck").to(deep_healthcheck))
            .service(web::resource("/geocode").to(geocode))
    })
    .bind(listen_on)?
    .run()
    .await
}

#[cfg(test)]
mod tests;
