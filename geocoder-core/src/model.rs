use std::collections::HashMap;

use crate::error::{GeocoderError, Result};

/// A WGS-84 point in decimal degrees, normalized to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GeocoderError::BadPoint { lat: latitude, lon: longitude });
        }
        Ok(Point { latitude, longitude })
    }

    /// Coerce a decimal-string or numeric pair as accepted at the boundary.
    /// Returns `None` instead of erroring so a batch can drop the slot for
    /// that point without aborting sibling points.
    pub fn parse(lat: &str, lon: &str) -> Option<Self> {
        let lat: f64 = lat.trim().parse().ok()?;
        let lon: f64 = lon.trim().parse().ok()?;
        Point::new(lat, lon).ok()
    }
}

/// One administrative level's resolved info (admin1..admin4), keyed by the
/// dotted concatenated code at the side-table level.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AdminCodeInfo {
    pub name: String,
    pub ascii_name: String,
    pub geo_name_id: u32,
}

/// An admin code that starts out as a raw string and becomes a named node
/// once the matching side table resolves it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum AdminCode {
    Raw(String),
    Resolved(AdminCodeInfo),
}

/// One alternate-name row for a geoname.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AlternateName {
    pub alt_name: String,
    pub is_preferred_name: bool,
    pub is_short_name: bool,
    pub is_colloquial: bool,
    pub is_historic: bool,
}

/// The 19-column GeoNames city/all-countries row.
#[derive(Debug, Clone)]
pub struct CityRecord {
    pub geo_name_id: u32,
    pub name: String,
    pub ascii_name: String,
    pub alternate_names: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub feature_class: char,
    pub feature_code: String,
    pub country_code: String,
    pub cc2: Option<String>,
    pub admin1_code: String,
    pub admin2_code: String,
    pub admin3_code: String,
    pub admin4_code: String,
    pub population: u64,
    pub elevation: Option<i32>,
    pub dem: String,
    pub timezone: String,
    pub modification_date: String,
}

/// `{name, asciiName, geoNameId}` stored at `"CC"`/`"CC.A1"`/.../ keys.
#[derive(Debug, Clone)]
pub struct AdminCodeRecord {
    pub name: String,
    pub ascii_name: String,
    pub geo_name_id: u32,
}

/// The four administrative-hierarchy hash maps plus the alternate-names map.
/// Any admin map is `None` when configuration disabled it; absent maps
/// silently skip decoration.
#[derive(Debug, Default)]
pub struct SideTables {
    pub admin1: Option<HashMap<String, AdminCodeRecord>>,
    pub admin2: Option<HashMap<String, AdminCodeRecord>>,
    pub admin3: Option<HashMap<String, AdminCodeRecord>>,
    pub admin4: Option<HashMap<String, AdminCodeRecord>>,
    pub alternate_names: Option<HashMap<u32, HashMap<String, AlternateName>>>,
}

/// A fully decorated result record, produced per query hit.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResultRecord {
    pub geo_name_id: u32,
    pub name: String,
    pub ascii_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub feature_class: char,
    pub feature_code: String,
    pub country_code: String,
    pub cc2: Option<String>,
    pub admin1_code: AdminCode,
    pub admin2_code: AdminCode,
    pub admin3_code: AdminCode,
    pub admin4_code: AdminCode,
    pub population: u64,
    pub elevation: Option<i32>,
    pub dem: String,
    pub timezone: String,
    pub modification_date: String,
    pub alternate_name: Option<HashMap<String, AlternateName>>,
    /// Haversine distance in kilometers, computed at query time (never cached).
    pub distance: f64,
}
