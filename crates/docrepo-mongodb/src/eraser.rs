//! Delete helpers

use bson::Document as BsonDocument;
use docrepo_common::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::collection::CollectionHandle;
use crate::context::DbContext;
use crate::creator::group_by_partition;
use crate::document::Document;
use crate::query::{id_filter, ids_filter};
use crate::scope::Scope;

/// Deletes documents by identity or by filter
#[derive(Debug)]
pub struct MongoDbEraser<C> {
    context: Arc<C>,
}

impl<C> Clone for MongoDbEraser<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<C: DbContext> MongoDbEraser<C> {
    pub fn new(context: Arc<C>) -> Self {
        Self { context }
    }

    /// Delete the stored copy of `document`; returns the deleted count
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn delete_one<D: Document>(&self, document: &D, scope: &Scope) -> Result<u64> {
        let collection = self
            .context
            .collection::<D>(scope.partition_for(document.partition_key()))?;

        scope
            .run(collection.delete_one(id_filter(document.id())))
            .await
    }

    /// Delete the first document matching the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn delete_one_where<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        scope.run(collection.delete_one(filter)).await
    }

    /// Delete every document matching the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn delete_many_where<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let count = scope.run(collection.delete_many(filter)).await?;
        debug!(collection = collection.name(), deleted = count, "Deleted documents");
        Ok(count)
    }

    /// Delete the stored copies of `documents` by `_id`, one call per partition
    ///
    /// Returns the total deleted count; an empty slice deletes nothing.
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), count = documents.len()))]
    pub async fn delete_many<D: Document>(&self, documents: &[D], scope: &Scope) -> Result<u64> {
        let mut deleted = 0;

        for (partition, batch) in group_by_partition(documents, scope) {
            let collection = self.context.collection::<D>(partition)?;
            let filter = ids_filter(batch.iter().map(|document| document.id()));
            deleted += scope.run(collection.delete_many(filter)).await?;
        }

        Ok(deleted)
    }
}
