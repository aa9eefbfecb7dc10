//! Query-string driven listing: keyword search, field filters, sorting and
//! pagination.

mod features;
mod pagination;

pub use features::ApiFeatures;
pub use pagination::Pagination;
