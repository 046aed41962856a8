//! Tab-separated-line decoders for the five GeoNames schemas.
//!
//! GeoNames dumps contain unescaped quotes, so every reader here disables
//! quote processing. All parsers are line-tolerant: a malformed row is
//! skipped, never aborts the enclosing pass.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::model::{AdminCodeRecord, AlternateName, CityRecord};

#[cfg(feature = "tracing")]
use std::time::Instant;

/// Split `content` into `n` roughly-equal line groups for parallel parsing.
fn split_content_to_n_parts(content: &str, n: usize) -> Vec<String> {
    if n <= 1 {
        return vec![content.to_owned()];
    }
    let lines: Vec<&str> = content.lines().collect();
    let chunk_size = lines.len().div_ceil(n).max(1);
    lines.chunks(chunk_size).map(|chunk| chunk.join("\n")).collect()
}

fn csv_reader<'a>(content: &'a str) -> csv::Reader<&'a [u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .quoting(false)
        .from_reader(content.as_bytes())
}

fn field(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

/// Parse the cities dump (19 columns). Rows with non-finite lat/lon are
/// dropped rather than aborting the pass. Chunked across `rayon`'s thread
/// pool, since this is the largest of the five dumps in practice.
pub fn parse_cities(content: &str) -> Vec<CityRecord> {
    #[cfg(feature = "tracing")]
    let now = Instant::now();

    let records = split_content_to_n_parts(content, rayon::current_num_threads())
        .par_iter()
        .map(|chunk| parse_cities_chunk(chunk))
        .reduce(Vec::new, |mut acc, mut chunk| {
            acc.append(&mut chunk);
            acc
        });

    #[cfg(feature = "tracing")]
    tracing::info!("parsed {} cities in {}ms", records.len(), now.elapsed().as_millis());

    records
}

fn parse_cities_chunk(content: &str) -> Vec<CityRecord> {
    let mut reader = csv_reader(content);
    let mut out = Vec::new();
    let mut raw = csv::StringRecord::new();

    while reader.read_record(&mut raw).unwrap_or(false) {
        if raw.is_empty() {
            continue;
        }
        let Some(record) = parse_city_row(&raw) else {
            continue;
        };
        out.push(record);
    }
    out
}

fn parse_city_row(row: &csv::StringRecord) -> Option<CityRecord> {
    let geo_name_id: u32 = field(row, 0).parse().ok()?;
    let latitude: f64 = field(row, 4).parse().ok()?;
    let longitude: f64 = field(row, 5).parse().ok()?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }

    Some(CityRecord {
        geo_name_id,
        name: field(row, 1).to_owned(),
        ascii_name: field(row, 2).to_owned(),
        alternate_names: non_empty(field(row, 3)),
        latitude,
        longitude,
        feature_class: field(row, 6).chars().next().unwrap_or('\0'),
        feature_code: field(row, 7).to_owned(),
        country_code: field(row, 8).to_owned(),
        cc2: non_empty(field(row, 9)),
        admin1_code: field(row, 10).to_owned(),
        admin2_code: field(row, 11).to_owned(),
        admin3_code: field(row, 12).to_owned(),
        admin4_code: field(row, 13).to_owned(),
        population: field(row, 14).parse().unwrap_or(0),
        elevation: field(row, 15).parse().ok(),
        dem: field(row, 16).to_owned(),
        timezone: field(row, 17).to_owned(),
        modification_date: field(row, 18).to_owned(),
    })
}

/// Parse admin1/admin2 (shared 4-column schema): `code, name, asciiName,
/// geoNameId`, keyed on column 0.
pub fn parse_admin_codes(content: &str) -> HashMap<String, AdminCodeRecord> {
    let mut reader = csv_reader(content);
    let mut out = HashMap::new();
    let mut raw = csv::StringRecord::new();

    while reader.read_record(&mut raw).unwrap_or(false) {
        if raw.is_empty() {
            continue;
        }
        let code = field(&raw, 0);
        if code.is_empty() {
            continue;
        }
        let Ok(geo_name_id) = field(&raw, 3).parse() else {
            continue;
        };
        out.insert(
            code.to_owned(),
            AdminCodeRecord {
                name: field(&raw, 1).to_owned(),
                ascii_name: field(&raw, 2).to_owned(),
                geo_name_id,
            },
        );
    }
    out
}

/// Result of scanning the all-countries dump for ADM3/ADM4 rows.
pub struct Admin34Tables {
    pub admin3: HashMap<String, AdminCodeRecord>,
    pub admin4: HashMap<String, AdminCodeRecord>,
}

/// Scan all-countries rows, retaining only `featureCode ∈ {ADM3, ADM4}` and
/// keying by the dotted concatenated code. Logs progress every 100k rows
/// when the `tracing` feature is enabled.
pub fn parse_admin34(content: &str) -> Admin34Tables {
    let mut admin3 = HashMap::new();
    let mut admin4 = HashMap::new();

    let mut reader = csv_reader(content);
    let mut raw = csv::StringRecord::new();
    let mut seen: u64 = 0;

    while reader.read_record(&mut raw).unwrap_or(false) {
        if raw.is_empty() {
            continue;
        }
        seen += 1;
        #[cfg(feature = "tracing")]
        if seen % 100_000 == 0 {
            tracing::info!("all-countries scan: {seen} rows");
        }
        #[cfg(not(feature = "tracing"))]
        let _ = seen;

        let Some(city) = parse_city_row(&raw) else {
            continue;
        };

        match city.feature_code.as_str() {
            "ADM3" => {
                let key = format!(
                    "{}.{}.{}.{}",
                    city.country_code, city.admin1_code, city.admin2_code, city.admin3_code
                );
                admin3.insert(
                    key,
                    AdminCodeRecord {
                        name: city.name,
                        ascii_name: city.ascii_name,
                        geo_name_id: city.geo_name_id,
                    },
                );
            }
            "ADM4" => {
                let key = format!(
                    "{}.{}.{}.{}.{}",
                    city.country_code,
                    city.admin1_code,
                    city.admin2_code,
                    city.admin3_code,
                    city.admin4_code
                );
                admin4.insert(
                    key,
                    AdminCodeRecord {
                        name: city.name,
                        ascii_name: city.ascii_name,
                        geo_name_id: city.geo_name_id,
                    },
                );
            }
            _ => {}
        }
    }

    Admin34Tables { admin3, admin4 }
}

fn truthy(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

/// Parse the alternate-names dump (8 columns). Rows with an empty
/// `isoLanguage` are dropped. Boolean fields are read as
/// `column != "" && column != "0"`.
pub fn parse_alternate_names(content: &str) -> HashMap<u32, HashMap<String, AlternateName>> {
    let mut out: HashMap<u32, HashMap<String, AlternateName>> = HashMap::new();

    let mut reader = csv_reader(content);
    let mut raw = csv::StringRecord::new();

    while reader.read_record(&mut raw).unwrap_or(false) {
        if raw.is_empty() {
            continue;
        }
        let Ok(geo_name_id) = field(&raw, 1).parse::<u32>() else {
            continue;
        };
        let iso_language = field(&raw, 2);
        if iso_language.is_empty() {
            continue;
        }

        let entry = AlternateName {
            alt_name: field(&raw, 3).to_owned(),
            is_preferred_name: truthy(field(&raw, 4)),
            is_short_name: truthy(field(&raw, 5)),
            is_colloquial: truthy(field(&raw, 6)),
            is_historic: truthy(field(&raw, 7)),
        };

        out.entry(geo_name_id)
            .or_default()
            .insert(iso_language.to_owned(), entry);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_city_row() {
        let line = "2988507\tParis\tParis\tParis city\t48.85341\t2.3488\tP\tPPLC\tFR\t\t11\t75\t751\t\t2161000\t42\t\tEurope/Paris\t2020-01-01\n";
        let cities = parse_cities(line);
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].name, "Paris");
        assert_eq!(cities[0].population, 2_161_000);
        assert_eq!(cities[0].elevation, Some(42));
    }

    #[test]
    fn drops_unparseable_coordinates() {
        let line = "1\tBad\tBad\t\tnot-a-number\t2.0\tP\tPPL\tFR\t\t\t\t\t\t0\t\t\t\t\n";
        assert!(parse_cities(line).is_empty());
    }

    #[test]
    fn admin34_filters_feature_code() {
        let line = "1\tFoo District\tFoo District\t\t10.0\t20.0\tA\tADM3\tDE\t\t01\t081\t08436\t\t0\t\t\tEurope/Berlin\t2020-01-01\n\
                     2\tNon Admin\tNon Admin\t\t10.0\t20.0\tP\tPPL\tDE\t\t01\t081\t08436\t\t0\t\t\tEurope/Berlin\t2020-01-01\n";
        let tables = parse_admin34(line);
        assert_eq!(tables.admin3.len(), 1);
        assert!(tables.admin3.contains_key("DE.01.081.08436"));
        assert!(tables.admin4.is_empty());
    }

    #[test]
    fn alternate_names_skip_empty_language_and_parse_booleans() {
        let content = "1\t123\t\tSomeName\t1\t0\t0\t0\t\t\n\
                        2\t123\tru\tИмя\t1\t0\t0\t0\t\t\n";
        let names = parse_alternate_names(content);
        let by_lang = names.get(&123).expect("geoname present");
        assert_eq!(by_lang.len(), 1);
        let ru = by_lang.get("ru").unwrap();
        assert_eq!(ru.alt_name, "Имя");
        assert!(ru.is_preferred_name);
        assert!(!ru.is_short_name);
    }
}
