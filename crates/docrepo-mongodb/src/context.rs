//! Database context: maps a document type and partition key to a collection

use docrepo_common::Result;
use mongodb::{Collection, Database};
use tracing::debug;

use crate::collection::CollectionHandle;
use crate::connection::{self, ContextConfig};
use crate::document::Document;
use crate::validation::CollectionName;

/// Source of collection handles for the repository helpers
pub trait DbContext: Send + Sync + 'static {
    /// Handle type returned for a document type
    type Collection<D: Document>: CollectionHandle<D>;

    /// Collection for `D`, in the given partition when one is supplied
    fn collection<D: Document>(&self, partition_key: Option<&str>) -> Result<Self::Collection<D>>;
}

/// Resolve and validate the collection name for `D` in an optional partition
///
/// Partitioned collections are named `"{partition}-{collection}"`.
pub fn collection_name<D: Document>(partition_key: Option<&str>) -> Result<CollectionName> {
    CollectionName::partitioned(&D::collection_name(), partition_key)
}

/// Context backed by a live `mongodb::Database`
#[derive(Debug, Clone)]
pub struct MongoDbContext {
    database: Database,
}

impl MongoDbContext {
    /// Wrap an existing database handle
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connect using the given configuration
    pub async fn connect(config: &ContextConfig) -> Result<Self> {
        Ok(Self::new(connection::connect(config).await?))
    }

    /// The wrapped database
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Drop the collection holding `D` in the given partition
    pub async fn drop_collection<D: Document>(&self, partition_key: Option<&str>) -> Result<()> {
        let collection = self.collection::<D>(partition_key)?;
        debug!(collection = collection.name(), "Dropping collection");
        CollectionHandle::drop(&collection).await
    }

    /// Check that the server answers a ping
    pub async fn ping(&self) -> Result<()> {
        connection::ping(&self.database).await
    }
}

impl DbContext for MongoDbContext {
    type Collection<D: Document> = Collection<D>;

    fn collection<D: Document>(&self, partition_key: Option<&str>) -> Result<Collection<D>> {
        let name = collection_name::<D>(partition_key)?;
        Ok(self.database.collection(name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDocument;

    #[test]
    fn test_collection_name_without_partition() {
        let name = collection_name::<TestDocument>(None).unwrap();
        assert_eq!(name.as_str(), "testDocuments");
    }

    #[test]
    fn test_collection_name_with_partition() {
        let name = collection_name::<TestDocument>(Some("tenant")).unwrap();
        assert_eq!(name.as_str(), "tenant-testDocuments");
    }

    #[test]
    fn test_collection_name_rejects_bad_partition() {
        assert!(collection_name::<TestDocument>(Some("$x")).is_err());
    }

    #[tokio::test]
    async fn test_mongo_context_resolves_partitioned_collection() {
        let client = mongodb::Client::with_options(
            mongodb::options::ClientOptions::builder().build(),
        )
        .unwrap();
        let context = MongoDbContext::new(client.database("docrepo_test"));

        let plain = context.collection::<TestDocument>(None).unwrap();
        let partitioned = context.collection::<TestDocument>(Some("p1")).unwrap();

        assert_eq!(plain.name(), "testDocuments");
        assert_eq!(partitioned.name(), "p1-testDocuments");
        assert_eq!(context.database().name(), "docrepo_test");
    }
}
