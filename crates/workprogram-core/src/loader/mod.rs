// crates/workprogram-core/src/loader/mod.rs

//! # Feature Loader
//!
//! Walks the FeatureServer result set page by page and materializes the
//! accumulated features into a [`FeatureTable`]. Transport lives behind
//! [`PageSource`]; this module only owns the pagination rule.

use crate::common::Crs;
use crate::error::{Result, WorkProgramError};
use crate::model::FeatureTable;
use crate::traits::PageSource;
use tracing::{debug, info};

mod http;
mod page;

pub use http::HttpPageSource;
pub use page::{parse_page, FeaturePage, PageQuery};

/// Fetches every record matching `where_clause`.
///
/// Requests `page_size` records at a growing offset until the service
/// returns an empty page or signals the end (see [`FeaturePage::has_more`]).
/// The first failing request aborts the whole fetch; nothing fetched so far
/// is returned.
pub fn fetch_all<S>(source: &S, page_size: usize, where_clause: &str) -> Result<FeatureTable>
where
    S: PageSource + ?Sized,
{
    if page_size == 0 {
        return Err(WorkProgramError::InvalidData(
            "page size must be positive".into(),
        ));
    }

    let mut features = Vec::new();
    let mut offset = 0;
    let mut requests = 0usize;

    loop {
        let query = PageQuery::new(where_clause, page_size, offset);
        let page = source.fetch_page(&query)?;
        requests += 1;

        let received = page.len();
        debug!(offset, received, requests, "page received");

        let more = page.has_more(page_size);
        if received == 0 {
            break;
        }

        features.extend(page.features);
        offset += received;

        if !more {
            break;
        }
    }

    info!(records = features.len(), requests, "fetch complete");
    Ok(FeatureTable::from_features(features, Crs::Wgs84))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Feature, Geometry, Value};
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned pages and records the queries it was asked.
    struct ScriptedSource {
        pages: RefCell<VecDeque<Result<FeaturePage>>>,
        queries: RefCell<Vec<PageQuery>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<FeaturePage>>) -> Self {
            Self {
                pages: RefCell::new(pages.into()),
                queries: RefCell::new(Vec::new()),
            }
        }

        fn with_sizes(sizes: &[usize]) -> Self {
            let mut next_id = 0;
            let pages = sizes
                .iter()
                .map(|&n| {
                    let page = FeaturePage::new((next_id..next_id + n).map(record).collect());
                    next_id += n;
                    Ok(page)
                })
                .collect();
            Self::new(pages)
        }

        fn requests(&self) -> usize {
            self.queries.borrow().len()
        }
    }

    impl PageSource for ScriptedSource {
        fn fetch_page(&self, query: &PageQuery) -> Result<FeaturePage> {
            self.queries.borrow_mut().push(query.clone());
            self.pages
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request at offset {}", query.offset))
        }
    }

    fn record(id: usize) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![-80.2, 25.8]))),
            id: None,
            properties: json!({"OBJECTID": id, "LOC_ERROR": "NO ERROR"})
                .as_object()
                .cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn stops_after_short_last_page() {
        let source = ScriptedSource::with_sizes(&[2000, 2000, 437]);
        let table = fetch_all(&source, 2000, "1=1").unwrap();

        assert_eq!(table.len(), 4437);
        assert_eq!(source.requests(), 3);
        let offsets: Vec<usize> = source.queries.borrow().iter().map(|q| q.offset).collect();
        assert_eq!(offsets, vec![0, 2000, 4000]);
    }

    #[test]
    fn exact_multiple_needs_one_empty_page() {
        let source = ScriptedSource::with_sizes(&[2000, 0]);
        let table = fetch_all(&source, 2000, "1=1").unwrap();

        assert_eq!(table.len(), 2000);
        assert_eq!(source.requests(), 2);
    }

    #[test]
    fn non_multiple_totals_are_returned_exactly() {
        let source = ScriptedSource::with_sizes(&[5, 5, 3]);
        let table = fetch_all(&source, 5, "1=1").unwrap();
        assert_eq!(table.len(), 13);
        assert_eq!(source.requests(), 3);
    }

    #[test]
    fn first_empty_page_yields_empty_table() {
        let source = ScriptedSource::with_sizes(&[0]);
        let table = fetch_all(&source, 2000, "1=1").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.crs(), Crs::Wgs84);
    }

    #[test]
    fn transfer_limit_overrides_short_page() {
        let source = ScriptedSource::new(vec![
            Ok(FeaturePage::new((0..3).map(record).collect()).with_transfer_limit(true)),
            Ok(FeaturePage::new((3..5).map(record).collect()).with_transfer_limit(false)),
        ]);
        let table = fetch_all(&source, 10, "1=1").unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(source.requests(), 2);
        assert_eq!(source.queries.borrow()[1].offset, 3);
    }

    #[test]
    fn transfer_limit_false_stops_on_full_page() {
        let source = ScriptedSource::new(vec![Ok(
            FeaturePage::new((0..4).map(record).collect()).with_transfer_limit(false)
        )]);
        let table = fetch_all(&source, 4, "1=1").unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(source.requests(), 1);
    }

    #[test]
    fn failing_page_aborts_without_partial_result() {
        let source = ScriptedSource::new(vec![
            Ok(FeaturePage::new((0..2).map(record).collect())),
            Err(WorkProgramError::Status {
                status: 503,
                url: "https://example.invalid/query".into(),
            }),
        ]);
        let err = fetch_all(&source, 2, "1=1").unwrap_err();
        assert!(matches!(err, WorkProgramError::Status { status: 503, .. }));
        assert_eq!(source.requests(), 2);
    }

    #[test]
    fn where_clause_is_forwarded() {
        let source = ScriptedSource::with_sizes(&[1]);
        fetch_all(&source, 2000, "CONTYNAM = 'MIAMI-DADE'").unwrap();
        let queries = source.queries.borrow();
        assert_eq!(queries[0].where_clause, "CONTYNAM = 'MIAMI-DADE'");
        assert_eq!(queries[0].page_size, 2000);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let source = ScriptedSource::new(Vec::new());
        assert!(matches!(
            fetch_all(&source, 0, "1=1"),
            Err(WorkProgramError::InvalidData(_))
        ));
        assert_eq!(source.requests(), 0);
    }
}
