//! Insert helpers

use docrepo_common::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::collection::CollectionHandle;
use crate::context::DbContext;
use crate::document::Document;
use crate::scope::Scope;

/// Inserts documents, assigning generated ids where the key is unset
#[derive(Debug)]
pub struct MongoDbCreator<C> {
    context: Arc<C>,
}

impl<C> Clone for MongoDbCreator<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<C: DbContext> MongoDbCreator<C> {
    pub fn new(context: Arc<C>) -> Self {
        Self { context }
    }

    /// Insert one document into its partition
    ///
    /// The document's own partition key takes precedence over the scope's.
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn add_one<D: Document>(&self, document: &mut D, scope: &Scope) -> Result<()> {
        document.ensure_id();

        let document: &D = document;
        let partition = scope.partition_for(document.partition_key());
        let collection = self.context.collection::<D>(partition)?;

        scope.run(collection.insert_one(document)).await?;
        debug!(collection = collection.name(), "Inserted document");
        Ok(())
    }

    /// Insert a batch, one `insert_many` per partition
    ///
    /// Partitions are written in the order they first appear in the batch.
    /// An empty batch does nothing.
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), count = documents.len()))]
    pub async fn add_many<D: Document>(&self, documents: &mut [D], scope: &Scope) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        for document in documents.iter_mut() {
            document.ensure_id();
        }

        let documents: &[D] = documents;
        for (partition, batch) in group_by_partition(documents, scope) {
            let collection = self.context.collection::<D>(partition)?;
            scope.run(collection.insert_many(&batch)).await?;
            debug!(collection = collection.name(), count = batch.len(), "Inserted documents");
        }
        Ok(())
    }
}

/// Split documents by effective partition, keeping first-seen order
pub(crate) fn group_by_partition<'a, D: Document>(
    documents: &'a [D],
    scope: &'a Scope,
) -> Vec<(Option<&'a str>, Vec<&'a D>)> {
    let mut groups: Vec<(Option<&'a str>, Vec<&'a D>)> = Vec::new();

    for document in documents {
        let partition = scope.partition_for(document.partition_key());
        match groups.iter_mut().find(|(key, _)| *key == partition) {
            Some((_, batch)) => batch.push(document),
            None => groups.push((partition, vec![document])),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKey;
    use crate::testing::{
        Operation, PartitionedDocument, RecordingContext, TestDocument, TestDocumentWithKey,
    };
    use docrepo_common::RepositoryError;
    use tokio_util::sync::CancellationToken;

    fn creator() -> (RecordingContext, MongoDbCreator<RecordingContext>) {
        let context = RecordingContext::new();
        let creator = MongoDbCreator::new(Arc::new(context.clone()));
        (context, creator)
    }

    #[tokio::test]
    async fn test_add_one_generates_missing_id() {
        let (context, creator) = creator();
        let mut document = TestDocument::unsaved("new");

        creator.add_one(&mut document, &Scope::default()).await.unwrap();

        assert!(!document.id.is_unset());
        let call = context.single_call();
        assert_eq!(call.collection, "testDocuments");
        assert_eq!(call.operation, Operation::InsertOne);
        assert_eq!(call.documents, vec![document.to_bson().unwrap()]);
    }

    #[tokio::test]
    async fn test_add_one_keeps_caller_assigned_key() {
        let (context, creator) = creator();
        let mut document = TestDocumentWithKey {
            id: 7,
            some_content: "seven".to_string(),
        };

        creator.add_one(&mut document, &Scope::default()).await.unwrap();

        assert_eq!(document.id, 7);
        assert_eq!(context.single_call().documents[0].get_i32("_id").unwrap(), 7);
    }

    #[tokio::test]
    async fn test_add_one_uses_document_partition() {
        let (context, creator) = creator();
        let mut document = PartitionedDocument::new("tenant", "content");

        creator
            .add_one(&mut document, &Scope::partition("ignored"))
            .await
            .unwrap();

        assert!(!document.id.is_empty());
        assert_eq!(context.single_call().collection, "tenant-partitionedDocuments");
    }

    #[tokio::test]
    async fn test_add_one_uses_scope_partition_for_plain_documents() {
        let (context, creator) = creator();
        let mut document = TestDocument::new("a", 1);

        creator
            .add_one(&mut document, &Scope::partition("archive"))
            .await
            .unwrap();

        assert_eq!(context.single_call().collection, "archive-testDocuments");
    }

    #[tokio::test]
    async fn test_add_one_with_cancelled_token() {
        let (context, creator) = creator();
        let token = CancellationToken::new();
        token.cancel();
        let mut document = TestDocument::new("a", 1);

        let result = creator.add_one(&mut document, &Scope::cancellable(token)).await;

        assert!(matches!(result, Err(RepositoryError::Cancelled)));
        assert!(context.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_many_single_partition() {
        let (context, creator) = creator();
        let mut documents = vec![TestDocument::unsaved("a"), TestDocument::unsaved("b")];

        creator.add_many(&mut documents, &Scope::default()).await.unwrap();

        assert!(documents.iter().all(|d| !d.id.is_unset()));
        let call = context.single_call();
        assert_eq!(call.operation, Operation::InsertMany);
        assert_eq!(call.documents.len(), 2);
    }

    #[tokio::test]
    async fn test_add_many_groups_by_partition() {
        let (context, creator) = creator();
        let mut documents = vec![
            PartitionedDocument::new("a", "1"),
            PartitionedDocument::new("b", "2"),
            PartitionedDocument::new("a", "3"),
        ];

        creator.add_many(&mut documents, &Scope::default()).await.unwrap();

        let calls = context.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].collection, "a-partitionedDocuments");
        assert_eq!(calls[0].documents.len(), 2);
        assert_eq!(calls[1].collection, "b-partitionedDocuments");
        assert_eq!(calls[1].documents.len(), 1);
    }

    #[tokio::test]
    async fn test_add_many_empty_batch_is_noop() {
        let (context, creator) = creator();
        let mut documents: Vec<TestDocument> = Vec::new();

        creator.add_many(&mut documents, &Scope::default()).await.unwrap();

        assert!(context.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_many_stops_at_first_driver_error() {
        let (context, creator) = creator();
        context.respond(|r| r.failure = Some("E11000 duplicate key".to_string()));
        let mut documents = vec![
            PartitionedDocument::new("a", "1"),
            PartitionedDocument::new("b", "2"),
        ];

        let result = creator.add_many(&mut documents, &Scope::default()).await;

        assert!(matches!(result, Err(RepositoryError::Driver(_))));
        assert_eq!(context.calls().len(), 1);
    }
}
