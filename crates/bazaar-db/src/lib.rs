//! Embedded JSON document store for Bazaar.
//!
//! Collections of serde types addressed by a string `_id`, queried with
//! MongoDB-style filters, sort/skip/limit options and a single grouping
//! stage. Data lives in memory and is optionally persisted as one JSON file
//! per collection.
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_db::{Db, Document, Filter, FindOptions};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Product {
//!     #[serde(rename = "_id")]
//!     id: String,
//!     name: String,
//!     price: f64,
//! }
//!
//! impl Document for Product {
//!     const COLLECTION: &'static str = "products";
//!     fn id(&self) -> &str { &self.id }
//! }
//!
//! let db = Db::open("./data").await?;
//! db.insert(&Product { id: bazaar_db::new_object_id(), name: "Rust Book".into(), price: 49.99 }).await?;
//!
//! let cheap: Vec<Product> = db
//!     .find(&Filter::new().lt("price", 100), &FindOptions::new().sort_by("-price"))
//!     .await?;
//! ```

mod aggregate;
mod db;
mod document;
mod error;
mod filter;
mod oid;
mod options;

pub use aggregate::{Accumulator, Group};
pub use db::Db;
pub use document::{lookup, Document};
pub use error::DbError;
pub use filter::{compare, loose_eq, Condition, Filter};
pub use oid::{is_object_id, new_object_id};
pub use options::{FindOptions, SortOrder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Db, DbError, Document, Filter, FindOptions, Group, SortOrder};
}
