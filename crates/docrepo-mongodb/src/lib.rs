//! Generic typed repository over the official MongoDB driver
//!
//! Each repository operation resolves a collection (optionally in a
//! partition), builds a filter, projection or index document, and issues a
//! single driver call.
//!
//! # Features
//! - Typed CRUD for any `serde` document type with a key
//! - Partitioned collections named `"{partition}-{collection}"`
//! - Min/max, sum, projection and grouping helpers
//! - Index creation (text, ascending, descending, hashed, combined text)
//! - Per-call cancellation through `CancellationToken`
//!
//! # Example
//! ```no_run
//! use docrepo_mongodb::{ContextConfig, Document, MongoRepository, Scope};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Order {
//!     #[serde(rename = "_id")]
//!     id: bson::oid::ObjectId,
//!     total: i64,
//! }
//!
//! impl Document for Order {
//!     type Key = bson::oid::ObjectId;
//!     fn id(&self) -> &Self::Key { &self.id }
//!     fn set_id(&mut self, id: Self::Key) { self.id = id; }
//!     fn collection_name() -> String { "orders".to_string() }
//! }
//!
//! # async fn run() -> docrepo_mongodb::Result<()> {
//! let repository = MongoRepository::connect(&ContextConfig::from_env()?).await?;
//! let mut order = Order { id: bson::oid::ObjectId::new(), total: 42 };
//! repository.add_one(&mut order, &Scope::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod connection;
pub mod context;
pub mod creator;
pub mod document;
pub mod eraser;
pub mod index;
pub mod query;
pub mod reader;
pub mod repository;
pub mod scope;
pub mod updater;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use collection::CollectionHandle;
pub use connection::{ContextConfig, PoolConfig};
pub use context::{DbContext, MongoDbContext};
pub use creator::MongoDbCreator;
pub use docrepo_common::{RepositoryError, Result};
pub use document::{default_collection_name, pluralize, Document, DocumentKey};
pub use eraser::MongoDbEraser;
pub use index::{IndexCreationOptions, MongoDbIndexHandler};
pub use query::SortDirection;
pub use reader::MongoDbReader;
pub use repository::{KeyTypedRepository, MongoRepository};
pub use scope::Scope;
pub use tokio_util::sync::CancellationToken;
pub use updater::MongoDbUpdater;
pub use validation::{validate_field, validate_index_field, CollectionName};
