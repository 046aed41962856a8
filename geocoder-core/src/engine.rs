//! Batch query engine: nearest-neighbor search against the spatial index,
//! decorated with the administrative hierarchy and alternate names.

use crate::index::IndexData;
use crate::model::{AdminCode, AdminCodeInfo, CityRecord, Point, ResultRecord, SideTables};
use crate::spatial::SpatialIndex;

/// The built, queryable engine: cities corpus, side tables, spatial index.
/// Immutable once constructed — write-once, read-many from any number of
/// threads without locking.
pub struct Engine {
    cities: Vec<CityRecord>,
    side_tables: SideTables,
    spatial_index: SpatialIndex,
}

impl Engine {
    /// Build the engine. The spatial index contains exactly one node per
    /// retained city.
    pub fn build(data: IndexData) -> Self {
        let spatial_index =
            SpatialIndex::build(data.cities.iter().map(|c| (c.latitude, c.longitude)));
        Engine { cities: data.cities, side_tables: data.side_tables, spatial_index }
    }

    pub fn is_empty(&self) -> bool {
        self.spatial_index.is_empty()
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    /// Look up the nearest cities for each point. Returns one result
    /// sequence per input point, 1-to-1 aligned with `points`; callers that
    /// need to reject malformed coordinates should use `Point::parse`
    /// beforehand, since this entry point takes already-valid points.
    pub fn lookup(&self, points: &[Point], max_results: usize) -> Vec<Vec<ResultRecord>> {
        points.iter().map(|point| self.lookup_one(*point, max_results)).collect()
    }

    /// Convenience overload equivalent to `lookup(points, 1)`.
    pub fn lookup_default(&self, points: &[Point]) -> Vec<Vec<ResultRecord>> {
        self.lookup(points, 1)
    }

    fn lookup_one(&self, point: Point, max_results: usize) -> Vec<ResultRecord> {
        self.spatial_index
            .nearest(point, max_results)
            .into_iter()
            .map(|(city_index, distance)| self.decorate(&self.cities[city_index], distance))
            .collect()
    }

    /// Splice in the admin hierarchy and alternate names. Each level's
    /// dotted key is built from the raw code strings captured up front,
    /// since once a level resolves to a named object it can no longer be
    /// used to build the next level's key.
    fn decorate(&self, city: &CityRecord, distance: f64) -> ResultRecord {
        let cc = city.country_code.as_str();
        let a1 = city.admin1_code.as_str();
        let a2 = city.admin2_code.as_str();
        let a3 = city.admin3_code.as_str();

        let admin1_code = resolve(self.side_tables.admin1.as_ref(), &format!("{cc}.{a1}"), a1);

        let admin2_code =
            resolve(self.side_tables.admin2.as_ref(), &format!("{cc}.{a1}.{a2}"), a2);

        let admin3_code =
            resolve(self.side_tables.admin3.as_ref(), &format!("{cc}.{a1}.{a2}.{a3}"), a3);

        let admin4_code = resolve(
            self.side_tables.admin4.as_ref(),
            &format!("{cc}.{a1}.{a2}.{a3}.{}", city.admin4_code),
            city.admin4_code.as_str(),
        );

        let alternate_name = self
            .side_tables
            .alternate_names
            .as_ref()
            .and_then(|table| table.get(&city.geo_name_id))
            .cloned();

        ResultRecord {
            geo_name_id: city.geo_name_id,
            name: city.name.clone(),
            ascii_name: city.ascii_name.clone(),
            latitude: city.latitude,
            longitude: city.longitude,
            feature_class: city.feature_class,
            feature_code: city.feature_code.clone(),
            country_code: city.country_code.clone(),
            cc2: city.cc2.clone(),
            admin1_code,
            admin2_code,
            admin3_code,
            admin4_code,
            population: city.population,
            elevation: city.elevation,
            dem: city.dem.clone(),
            timezone: city.timezone.clone(),
            modification_date: city.modification_date.clone(),
            alternate_name,
            distance,
        }
    }
}

fn resolve(
    table: Option<&std::collections::HashMap<String, crate::model::AdminCodeRecord>>,
    key: &str,
    raw: &str,
) -> AdminCode {
    match table.and_then(|t| t.get(key)) {
        Some(record) => AdminCode::Resolved(AdminCodeInfo {
            name: record.name.clone(),
            ascii_name: record.ascii_name.clone(),
            geo_name_id: record.geo_name_id,
        }),
        None => AdminCode::Raw(raw.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SourceContent;

    fn sample_content() -> SourceContent {
        SourceContent {
            cities: "\
2919179\tGomaringen\tGomaringen\t\t48.46839\t9.1325\tP\tPPL\tDE\t\t01\t081\t08436\t\t15827\t\t\tEurope/Berlin\t2020-01-01\n\
2950159\tBerlin\tBerlin\t\t52.52437\t13.41053\tP\tPPLC\tDE\t\t16\t\t\t\t3426354\t\t\tEurope/Berlin\t2020-01-01\n"
                .to_owned(),
            admin1_codes: Some("DE.01\tBaden-Württemberg\tBaden-Wuerttemberg\t2825297\n".to_owned()),
            admin2_codes: Some("DE.01.081\tTübingen\tTuebingen\t2824171\n".to_owned()),
            all_countries: None,
            alternate_names: Some("1\t2919179\ten\tGomaringen\t1\t0\t0\t0\t\t\n".to_owned()),
        }
    }

    fn build_engine() -> Engine {
        Engine::build(IndexData::build(sample_content()))
    }

    #[test]
    fn own_coordinates_resolve_with_near_zero_distance() {
        let engine = build_engine();
        let point = Point::new(48.46839, 9.1325).unwrap();
        let results = engine.lookup(&[point], 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].len(), 1);
        assert_eq!(results[0][0].name, "Gomaringen");
        assert!(results[0][0].distance < 0.001);
    }

    #[test]
    fn admin_hierarchy_resolves_to_named_objects() {
        let engine = build_engine();
        let point = Point::new(48.46839, 9.1325).unwrap();
        let results = engine.lookup(&[point], 1);
        match &results[0][0].admin1_code {
            AdminCode::Resolved(info) => assert_eq!(info.name, "Baden-Württemberg"),
            AdminCode::Raw(_) => panic!("expected resolved admin1"),
        }
        match &results[0][0].admin2_code {
            AdminCode::Resolved(info) => assert_eq!(info.name, "Tübingen"),
            AdminCode::Raw(_) => panic!("expected resolved admin2"),
        }
    }

    #[test]
    fn disabled_admin2_table_keeps_raw_code_string() {
        let mut content = sample_content();
        content.admin2_codes = None;
        let engine = Engine::build(IndexData::build(content));
        let point = Point::new(48.46839, 9.1325).unwrap();
        let results = engine.lookup(&[point], 1);
        match &results[0][0].admin2_code {
            AdminCode::Raw(code) => assert_eq!(code, "081"),
            AdminCode::Resolved(_) => panic!("admin2 should remain raw when disabled"),
        }
    }

    #[test]
    fn alternate_names_attach_when_present() {
        let engine = build_engine();
        let point = Point::new(48.46839, 9.1325).unwrap();
        let results = engine.lookup(&[point], 1);
        let names = results[0][0].alternate_name.as_ref().expect("names present");
        assert_eq!(names.get("en").unwrap().alt_name, "Gomaringen");
    }

    #[test]
    fn batch_alignment_preserved() {
        let engine = build_engine();
        let points = vec![
            Point::new(48.46839, 9.1325).unwrap(),
            Point::new(52.52437, 13.41053).unwrap(),
        ];
        let results = engine.lookup(&points, 1);
        assert_eq!(results.len(), points.len());
        assert_eq!(results[0][0].name, "Gomaringen");
        assert_eq!(results[1][0].name, "Berlin");
    }

    #[test]
    fn lookup_default_is_max_results_one() {
        let engine = build_engine();
        let point = Point::new(48.46839, 9.1325).unwrap();
        assert_eq!(engine.lookup_default(&[point]), engine.lookup(&[point], 1));
    }

    #[test]
    fn empty_corpus_returns_empty_sequence() {
        let engine = Engine::build(IndexData::build(SourceContent::default()));
        let point = Point::new(0.0, 0.0).unwrap();
        let results = engine.lookup(&[point], 5);
        assert_eq!(results, vec![Vec::new()]);
    }
}
