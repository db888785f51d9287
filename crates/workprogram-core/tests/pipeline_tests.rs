extern crate workprogram_core;

use std::cell::Cell;

use geojson::{Feature, Geometry, Value};
use serde_json::json;
use workprogram_core::config::{FetchConfig, PipelineConfig};
use workprogram_core::gpkg::read_geopackage;
use workprogram_core::pipeline::run_with;
use workprogram_core::{parse_page, FeaturePage, PageQuery, PageSource, Result, WorkProgramError};

/// Serves `total` generated records in pages, like the FeatureServer.
struct FakeService {
    total: usize,
    calls: Cell<usize>,
}

impl FakeService {
    fn new(total: usize) -> Self {
        Self {
            total,
            calls: Cell::new(0),
        }
    }
}

impl PageSource for FakeService {
    fn fetch_page(&self, query: &PageQuery) -> Result<FeaturePage> {
        self.calls.set(self.calls.get() + 1);
        let end = (query.offset + query.page_size).min(self.total);
        let features = (query.offset..end).map(work_item).collect();
        Ok(FeaturePage::new(features))
    }
}

/// Every 10th record has a location error, every 7th has an empty geometry.
fn work_item(i: usize) -> Feature {
    let value = if i % 7 == 3 {
        Value::LineString(vec![])
    } else {
        let x = -80.4 + i as f64 * 0.001;
        Value::LineString(vec![vec![x, 25.6], vec![x + 0.0005, 25.61]])
    };
    let loc_error = if i % 10 == 9 { "LOCATION ERROR" } else { "NO ERROR" };
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(geojson::feature::Id::Number(i.into())),
        properties: json!({
            "OBJECTID": i,
            "CONTYNAM": "MIAMI-DADE",
            "ITEMSEG": format!("44{i:05}"),
            "LOC_ERROR": loc_error,
        })
        .as_object()
        .cloned(),
        foreign_members: None,
    }
}

fn config_in(dir: &std::path::Path, page_size: usize) -> PipelineConfig {
    PipelineConfig {
        fetch: FetchConfig::for_county("MIAMI-DADE").with_page_size(page_size),
        ..PipelineConfig::default()
    }
    .with_output_path(dir.join("data/processed/fdot_work_program_construction.gpkg"))
}

#[test]
fn end_to_end_run_writes_clean_layer() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 40);
    let service = FakeService::new(100);

    let mut reported = None;
    let summary = run_with(&service, &config, |r| reported = Some(r.clone())).unwrap();

    // 40 + 40 + 20
    assert_eq!(service.calls.get(), 3);
    assert_eq!(summary.fetched, 100);

    let bad_geometry = (0..100).filter(|i| i % 7 == 3).count();
    let bad_location = (0..100).filter(|i| i % 7 != 3 && i % 10 == 9).count();
    assert_eq!(summary.stats.dropped_geometry, bad_geometry);
    assert_eq!(summary.stats.dropped_location, bad_location);
    assert_eq!(summary.stats.kept, 100 - bad_geometry - bad_location);

    let report = reported.expect("report callback runs");
    assert_eq!(report.rows, summary.stats.kept);
    assert_eq!(report.empty_geometries, 0);
    assert_eq!(report.breakdown, vec![("NO ERROR".to_string(), summary.stats.kept)]);

    let back = read_geopackage(&summary.output_path, Some(&summary.layer)).unwrap();
    assert_eq!(summary.layer, "fdot_work_program_construction");
    assert_eq!(back.shape(), (summary.stats.kept, 5));
    assert!(back
        .iter()
        .all(|row| row.attribute_str("LOC_ERROR") == Some("NO ERROR")));
}

#[test]
fn rerun_overwrites_deterministically() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 25);

    let first = run_with(&FakeService::new(60), &config, |_| {}).unwrap();
    let shape_first = read_geopackage(&first.output_path, None).unwrap().shape();

    let second = run_with(&FakeService::new(60), &config, |_| {}).unwrap();
    let shape_second = read_geopackage(&second.output_path, None).unwrap().shape();

    assert_eq!(shape_first, shape_second);
    assert_eq!(shape_first.0, first.stats.kept);
}

#[test]
fn fetch_failure_writes_nothing() {
    struct Down;
    impl PageSource for Down {
        fn fetch_page(&self, _query: &PageQuery) -> Result<FeaturePage> {
            Err(WorkProgramError::Timeout { secs: 60 })
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 2000);
    let err = run_with(&Down, &config, |_| panic!("no report on failure")).unwrap_err();

    assert!(matches!(err, WorkProgramError::Timeout { secs: 60 }));
    assert!(!config.output_path.exists());
}

#[test]
fn arcgis_body_flows_through_the_parser() {
    struct Canned(Vec<&'static str>, Cell<usize>);
    impl PageSource for Canned {
        fn fetch_page(&self, _query: &PageQuery) -> Result<FeaturePage> {
            let i = self.1.get();
            self.1.set(i + 1);
            parse_page(self.0[i])
        }
    }

    let source = Canned(
        vec![
            r#"{"type": "FeatureCollection", "exceededTransferLimit": true, "features": [
                {"type": "Feature", "id": 1,
                 "geometry": {"type": "Point", "coordinates": [-80.2, 25.8]},
                 "properties": {"LOC_ERROR": "NO ERROR", "CONTYNAM": "MIAMI-DADE"}}
            ]}"#,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "id": 2, "geometry": null,
                 "properties": {"LOC_ERROR": "NO ERROR", "CONTYNAM": "MIAMI-DADE"}}
            ]}"#,
        ],
        Cell::new(0),
    );

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), 2000);
    let summary = run_with(&source, &config, |_| {}).unwrap();

    assert_eq!(source.1.get(), 2);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.stats.kept, 1);
    assert_eq!(summary.stats.dropped_geometry, 1);
}
