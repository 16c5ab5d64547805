//! Update helpers: replace by id, update by id or by filter

use bson::{Bson, Document as BsonDocument};
use docrepo_common::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::collection::CollectionHandle;
use crate::context::DbContext;
use crate::document::Document;
use crate::query::{id_filter, set_field};
use crate::scope::Scope;

/// Applies replacements and update documents
#[derive(Debug)]
pub struct MongoDbUpdater<C> {
    context: Arc<C>,
}

impl<C> Clone for MongoDbUpdater<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<C: DbContext> MongoDbUpdater<C> {
    pub fn new(context: Arc<C>) -> Self {
        Self { context }
    }

    /// Replace the stored document with the same `_id`; true if it was modified
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn update_one<D: Document>(&self, modified: &D, scope: &Scope) -> Result<bool> {
        let collection = self
            .context
            .collection::<D>(scope.partition_for(modified.partition_key()))?;

        let count = scope
            .run(collection.replace_one(id_filter(modified.id()), modified))
            .await?;
        debug!(collection = collection.name(), modified = count, "Replaced document");
        Ok(count == 1)
    }

    /// Apply an update document to the stored copy of `document`
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn update_one_with<D: Document>(
        &self,
        document: &D,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<bool> {
        let collection = self
            .context
            .collection::<D>(scope.partition_for(document.partition_key()))?;

        let count = scope
            .run(collection.update_one(id_filter(document.id()), update))
            .await?;
        Ok(count == 1)
    }

    /// Set one field on the stored copy of `document`
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    pub async fn update_field<D, V>(
        &self,
        document: &D,
        field: &str,
        value: V,
        scope: &Scope,
    ) -> Result<bool>
    where
        D: Document,
        V: Into<Bson>,
    {
        let update = set_field(field, value)?;
        self.update_one_with(document, update, scope).await
    }

    /// Set one field on the first document matching the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    pub async fn update_one_where<D, V>(
        &self,
        filter: BsonDocument,
        field: &str,
        value: V,
        scope: &Scope,
    ) -> Result<bool>
    where
        D: Document,
        V: Into<Bson>,
    {
        let update = set_field(field, value)?;
        self.update_one_where_with::<D>(filter, update, scope).await
    }

    /// Apply an update document to the first document matching the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn update_one_where_with<D: Document>(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<bool> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let count = scope.run(collection.update_one(filter, update)).await?;
        Ok(count == 1)
    }

    /// Set one field on every document matching the filter; returns the modified count
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    pub async fn update_many_where<D, V>(
        &self,
        filter: BsonDocument,
        field: &str,
        value: V,
        scope: &Scope,
    ) -> Result<u64>
    where
        D: Document,
        V: Into<Bson>,
    {
        let update = set_field(field, value)?;
        self.update_many::<D>(filter, update, scope).await
    }

    /// Apply an update document to every document matching the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn update_many<D: Document>(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<u64> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let count = scope.run(collection.update_many(filter, update)).await?;
        debug!(collection = collection.name(), modified = count, "Updated documents");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Operation, PartitionedDocument, RecordingContext, TestDocument};
    use bson::doc;
    use docrepo_common::RepositoryError;
    use tokio_util::sync::CancellationToken;

    fn updater() -> (RecordingContext, MongoDbUpdater<RecordingContext>) {
        let context = RecordingContext::new();
        let updater = MongoDbUpdater::new(Arc::new(context.clone()));
        (context, updater)
    }

    #[tokio::test]
    async fn test_update_one_replaces_by_id() {
        let (context, updater) = updater();
        context.respond(|r| r.modified = 1);
        let document = TestDocument::new("changed", 5);

        let updated = updater.update_one(&document, &Scope::default()).await.unwrap();

        assert!(updated);
        let call = context.single_call();
        assert_eq!(call.operation, Operation::ReplaceOne);
        assert_eq!(call.filter, Some(doc! { "_id": document.id }));
        assert_eq!(call.documents, vec![document.to_bson().unwrap()]);
    }

    #[tokio::test]
    async fn test_update_one_false_when_nothing_modified() {
        let (_context, updater) = updater();
        let document = TestDocument::new("same", 5);

        let updated = updater.update_one(&document, &Scope::default()).await.unwrap();

        assert!(!updated);
    }

    #[tokio::test]
    async fn test_update_one_targets_document_partition() {
        let (context, updater) = updater();
        let mut document = PartitionedDocument::new("tenant", "x");
        document.id = "abc".to_string();

        updater.update_one(&document, &Scope::default()).await.unwrap();

        let call = context.single_call();
        assert_eq!(call.collection, "tenant-partitionedDocuments");
        assert_eq!(call.filter, Some(doc! { "_id": "abc" }));
    }

    #[tokio::test]
    async fn test_update_one_with_update_document() {
        let (context, updater) = updater();
        context.respond(|r| r.modified = 1);
        let document = TestDocument::new("a", 1);
        let update = doc! { "$inc": { "some_value": 1 } };

        let updated = updater
            .update_one_with(&document, update.clone(), &Scope::default())
            .await
            .unwrap();

        assert!(updated);
        let call = context.single_call();
        assert_eq!(call.operation, Operation::UpdateOne);
        assert_eq!(call.filter, Some(doc! { "_id": document.id }));
        assert_eq!(call.update, Some(update));
    }

    #[tokio::test]
    async fn test_update_field_sets_value() {
        let (context, updater) = updater();
        context.respond(|r| r.modified = 1);
        let document = TestDocument::new("a", 1);

        let updated = updater
            .update_field(&document, "some_content", "b", &Scope::default())
            .await
            .unwrap();

        assert!(updated);
        assert_eq!(
            context.single_call().update,
            Some(doc! { "$set": { "some_content": "b" } })
        );
    }

    #[tokio::test]
    async fn test_update_field_rejects_operator_field() {
        let (context, updater) = updater();
        let document = TestDocument::new("a", 1);

        let result = updater
            .update_field(&document, "$rename", "b", &Scope::default())
            .await;

        assert!(matches!(result, Err(RepositoryError::Validation(_))));
        assert!(context.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_one_where_with_partition() {
        let (context, updater) = updater();
        context.respond(|r| r.modified = 1);
        let filter = doc! { "some_content": "a" };

        let updated = updater
            .update_one_where::<TestDocument, _>(filter.clone(), "some_value", 9, &Scope::partition("p"))
            .await
            .unwrap();

        assert!(updated);
        let call = context.single_call();
        assert_eq!(call.collection, "p-testDocuments");
        assert_eq!(call.operation, Operation::UpdateOne);
        assert_eq!(call.filter, Some(filter));
        assert_eq!(call.update, Some(doc! { "$set": { "some_value": 9 } }));
    }

    #[tokio::test]
    async fn test_update_many_where_returns_modified_count() {
        let (context, updater) = updater();
        context.respond(|r| r.modified = 4);

        let count = updater
            .update_many_where::<TestDocument, _>(doc! {}, "some_content2", "bulk", &Scope::default())
            .await
            .unwrap();

        assert_eq!(count, 4);
        let call = context.single_call();
        assert_eq!(call.operation, Operation::UpdateMany);
        assert_eq!(call.update, Some(doc! { "$set": { "some_content2": "bulk" } }));
    }

    #[tokio::test]
    async fn test_update_many_with_cancelled_token() {
        let (context, updater) = updater();
        let token = CancellationToken::new();
        token.cancel();

        let result = updater
            .update_many::<TestDocument>(
                doc! {},
                doc! { "$set": { "some_value": 0 } },
                &Scope::cancellable(token),
            )
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert!(context.calls().is_empty());
    }
}
