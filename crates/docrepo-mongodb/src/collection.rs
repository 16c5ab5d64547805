//! Collection handle: the seam between the repository helpers and the driver
//!
//! [`CollectionHandle`] lists the driver calls the helpers make. The
//! production implementation is `mongodb::Collection<D>`; each method is one
//! driver call, with cursors drained into a `Vec`.

use async_trait::async_trait;
use bson::Document as BsonDocument;
use docrepo_common::Result;
use futures::TryStreamExt;
use mongodb::{
    options::{CountOptions, FindOneOptions, FindOptions},
    Collection, IndexModel,
};

use crate::document::Document;

/// Driver operations against a single typed collection
#[async_trait]
pub trait CollectionHandle<D: Document>: Send + Sync {
    /// Name of the underlying collection
    fn name(&self) -> &str;

    /// Find documents, draining the cursor
    async fn find(&self, filter: BsonDocument, options: FindOptions) -> Result<Vec<D>>;

    /// Find the first matching document
    async fn find_one(&self, filter: BsonDocument, options: FindOneOptions) -> Result<Option<D>>;

    /// Find documents as raw BSON, used when a projection changes the shape
    async fn find_raw(&self, filter: BsonDocument, options: FindOptions) -> Result<Vec<BsonDocument>>;

    /// Count matching documents
    async fn count_documents(&self, filter: BsonDocument, options: CountOptions) -> Result<u64>;

    /// Run an aggregation pipeline, draining the cursor
    async fn aggregate(&self, pipeline: Vec<BsonDocument>) -> Result<Vec<BsonDocument>>;

    /// Insert one document
    async fn insert_one(&self, document: &D) -> Result<()>;

    /// Insert a batch of documents
    async fn insert_many(&self, documents: &[&D]) -> Result<()>;

    /// Replace the first matching document; returns the modified count
    async fn replace_one(&self, filter: BsonDocument, replacement: &D) -> Result<u64>;

    /// Apply an update to the first matching document; returns the modified count
    async fn update_one(&self, filter: BsonDocument, update: BsonDocument) -> Result<u64>;

    /// Apply an update to every matching document; returns the modified count
    async fn update_many(&self, filter: BsonDocument, update: BsonDocument) -> Result<u64>;

    /// Delete the first matching document; returns the deleted count
    async fn delete_one(&self, filter: BsonDocument) -> Result<u64>;

    /// Delete every matching document; returns the deleted count
    async fn delete_many(&self, filter: BsonDocument) -> Result<u64>;

    /// Create an index; returns its name
    async fn create_index(&self, index: IndexModel) -> Result<String>;

    /// Names of all indexes on the collection
    async fn list_index_names(&self) -> Result<Vec<String>>;

    /// Drop an index by name
    async fn drop_index(&self, name: &str) -> Result<()>;

    /// Drop the collection
    async fn drop(&self) -> Result<()>;
}

#[async_trait]
impl<D: Document> CollectionHandle<D> for Collection<D> {
    fn name(&self) -> &str {
        Collection::name(self)
    }

    async fn find(&self, filter: BsonDocument, options: FindOptions) -> Result<Vec<D>> {
        let cursor = Collection::find(self, filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(&self, filter: BsonDocument, options: FindOneOptions) -> Result<Option<D>> {
        Ok(Collection::find_one(self, filter).with_options(options).await?)
    }

    async fn find_raw(&self, filter: BsonDocument, options: FindOptions) -> Result<Vec<BsonDocument>> {
        let raw: Collection<BsonDocument> = self.clone_with_type();
        let cursor = raw.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_documents(&self, filter: BsonDocument, options: CountOptions) -> Result<u64> {
        Ok(Collection::count_documents(self, filter).with_options(options).await?)
    }

    async fn aggregate(&self, pipeline: Vec<BsonDocument>) -> Result<Vec<BsonDocument>> {
        let cursor = Collection::aggregate(self, pipeline).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_one(&self, document: &D) -> Result<()> {
        Collection::insert_one(self, document).await?;
        Ok(())
    }

    async fn insert_many(&self, documents: &[&D]) -> Result<()> {
        Collection::insert_many(self, documents.iter().copied()).await?;
        Ok(())
    }

    async fn replace_one(&self, filter: BsonDocument, replacement: &D) -> Result<u64> {
        let result = Collection::replace_one(self, filter, replacement).await?;
        Ok(result.modified_count)
    }

    async fn update_one(&self, filter: BsonDocument, update: BsonDocument) -> Result<u64> {
        let result = Collection::update_one(self, filter, update).await?;
        Ok(result.modified_count)
    }

    async fn update_many(&self, filter: BsonDocument, update: BsonDocument) -> Result<u64> {
        let result = Collection::update_many(self, filter, update).await?;
        Ok(result.modified_count)
    }

    async fn delete_one(&self, filter: BsonDocument) -> Result<u64> {
        let result = Collection::delete_one(self, filter).await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: BsonDocument) -> Result<u64> {
        let result = Collection::delete_many(self, filter).await?;
        Ok(result.deleted_count)
    }

    async fn create_index(&self, index: IndexModel) -> Result<String> {
        let result = Collection::create_index(self, index).await?;
        Ok(result.index_name)
    }

    async fn list_index_names(&self) -> Result<Vec<String>> {
        Ok(Collection::list_index_names(self).await?)
    }

    async fn drop_index(&self, name: &str) -> Result<()> {
        Collection::drop_index(self, name).await?;
        Ok(())
    }

    async fn drop(&self) -> Result<()> {
        Collection::drop(self).await?;
        Ok(())
    }
}
