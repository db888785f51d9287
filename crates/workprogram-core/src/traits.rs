// crates/workprogram-core/src/traits.rs

use crate::error::Result;
use crate::loader::{FeaturePage, PageQuery};

/// Anything that can answer one paginated feature query.
///
/// The production implementation is [`crate::loader::HttpPageSource`];
/// tests plug in scripted sources so the pagination loop can be exercised
/// without a network.
pub trait PageSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<FeaturePage>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    fn fetch_page(&self, query: &PageQuery) -> Result<FeaturePage> {
        (**self).fetch_page(query)
    }
}
