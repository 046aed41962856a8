//! Ties the record parsers into the side tables and cities corpus that the
//! spatial index and query engine are built from.

use crate::model::{CityRecord, SideTables};
use crate::parse;

/// Raw file contents for the five GeoNames schemas. `geocoder-fetch` is
/// responsible for producing these strings (fetch + cache); this crate only
/// ever sees already-read content, split the same way `new_from_files` and
/// `new_from_files_content` are split at the call site.
#[derive(Default)]
pub struct SourceContent {
    pub cities: String,
    pub admin1_codes: Option<String>,
    pub admin2_codes: Option<String>,
    pub all_countries: Option<String>,
    pub alternate_names: Option<String>,
}

pub struct IndexData {
    pub cities: Vec<CityRecord>,
    pub side_tables: SideTables,
}

impl IndexData {
    /// Build the cities corpus and side tables from raw dump content. Any
    /// absent optional content resolves to an absent side table — the
    /// caller (the Loader) is responsible for deciding which pipelines to
    /// run based on configuration.
    pub fn build(content: SourceContent) -> Self {
        let cities = parse::parse_cities(&content.cities);

        let admin1 = content.admin1_codes.as_deref().map(parse::parse_admin_codes);
        let admin2 = content.admin2_codes.as_deref().map(parse::parse_admin_codes);

        let (admin3, admin4) = match content.all_countries.as_deref() {
            Some(all_countries) => {
                let tables = parse::parse_admin34(all_countries);
                (Some(tables.admin3), Some(tables.admin4))
            }
            None => (None, None),
        };

        let alternate_names = content
            .alternate_names
            .as_deref()
            .map(parse::parse_alternate_names);

        IndexData {
            cities,
            side_tables: SideTables { admin1, admin2, admin3, admin4, alternate_names },
        }
    }
}
