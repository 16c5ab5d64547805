//! Repository facade
//!
//! [`MongoRepository`] bundles the reader, creator, updater, eraser and index
//! handler over one shared context and exposes each of their operations as a
//! flat method. [`KeyTypedRepository`] offers the same surface for documents
//! whose `_id` has one fixed key type.

use bson::{Bson, Document as BsonDocument};
use docrepo_common::Result;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::collection::CollectionHandle;
use crate::connection::ContextConfig;
use crate::context::{DbContext, MongoDbContext};
use crate::creator::MongoDbCreator;
use crate::document::{Document, DocumentKey};
use crate::eraser::MongoDbEraser;
use crate::index::{IndexCreationOptions, MongoDbIndexHandler};
use crate::reader::MongoDbReader;
use crate::scope::Scope;
use crate::updater::MongoDbUpdater;

/// Typed CRUD, projection and index operations over a [`DbContext`]
#[derive(Debug)]
pub struct MongoRepository<C = MongoDbContext> {
    context: Arc<C>,
    reader: MongoDbReader<C>,
    creator: MongoDbCreator<C>,
    updater: MongoDbUpdater<C>,
    eraser: MongoDbEraser<C>,
    index_handler: MongoDbIndexHandler<C>,
}

impl<C> Clone for MongoRepository<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            reader: self.reader.clone(),
            creator: self.creator.clone(),
            updater: self.updater.clone(),
            eraser: self.eraser.clone(),
            index_handler: self.index_handler.clone(),
        }
    }
}

impl MongoRepository<MongoDbContext> {
    /// Connect to MongoDB and build a repository over the configured database
    pub async fn connect(config: &ContextConfig) -> Result<Self> {
        Ok(Self::new(MongoDbContext::connect(config).await?))
    }
}

impl<C: DbContext> MongoRepository<C> {
    pub fn new(context: C) -> Self {
        Self::from_arc(Arc::new(context))
    }

    /// Build over a context already shared elsewhere
    pub fn from_arc(context: Arc<C>) -> Self {
        Self {
            reader: MongoDbReader::new(Arc::clone(&context)),
            creator: MongoDbCreator::new(Arc::clone(&context)),
            updater: MongoDbUpdater::new(Arc::clone(&context)),
            eraser: MongoDbEraser::new(Arc::clone(&context)),
            index_handler: MongoDbIndexHandler::new(Arc::clone(&context)),
            context,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn reader(&self) -> &MongoDbReader<C> {
        &self.reader
    }

    pub fn creator(&self) -> &MongoDbCreator<C> {
        &self.creator
    }

    pub fn updater(&self) -> &MongoDbUpdater<C> {
        &self.updater
    }

    pub fn eraser(&self) -> &MongoDbEraser<C> {
        &self.eraser
    }

    pub fn index_handler(&self) -> &MongoDbIndexHandler<C> {
        &self.index_handler
    }

    /// Drop the whole collection holding `D` in the scope's partition
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn drop_collection<D: Document>(&self, scope: &Scope) -> Result<()> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        scope.run(collection.drop()).await?;
        debug!(collection = collection.name(), "Dropped collection");
        Ok(())
    }

    // Create

    pub async fn add_one<D: Document>(&self, document: &mut D, scope: &Scope) -> Result<()> {
        self.creator.add_one(document, scope).await
    }

    pub async fn add_many<D: Document>(&self, documents: &mut [D], scope: &Scope) -> Result<()> {
        self.creator.add_many(documents, scope).await
    }

    // Read

    pub async fn get_by_id<D: Document>(&self, id: &D::Key, scope: &Scope) -> Result<Option<D>> {
        self.reader.get_by_id::<D>(id, scope).await
    }

    pub async fn get_one<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<Option<D>> {
        self.reader.get_one(filter, scope).await
    }

    pub async fn any<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<bool> {
        self.reader.any::<D>(filter, scope).await
    }

    pub async fn get_all<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<Vec<D>> {
        self.reader.get_all(filter, scope).await
    }

    pub async fn count<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        self.reader.count::<D>(filter, scope).await
    }

    pub async fn get_by_max<D: Document>(
        &self,
        filter: BsonDocument,
        field: &str,
        scope: &Scope,
    ) -> Result<Option<D>> {
        self.reader.get_by_max(filter, field, scope).await
    }

    pub async fn get_by_min<D: Document>(
        &self,
        filter: BsonDocument,
        field: &str,
        scope: &Scope,
    ) -> Result<Option<D>> {
        self.reader.get_by_min(filter, field, scope).await
    }

    pub async fn get_max_value<D, V>(&self, filter: BsonDocument, field: &str, scope: &Scope) -> Result<Option<V>>
    where
        D: Document,
        V: DeserializeOwned,
    {
        self.reader.get_max_value::<D, V>(filter, field, scope).await
    }

    pub async fn get_min_value<D, V>(&self, filter: BsonDocument, field: &str, scope: &Scope) -> Result<Option<V>>
    where
        D: Document,
        V: DeserializeOwned,
    {
        self.reader.get_min_value::<D, V>(filter, field, scope).await
    }

    pub async fn sum_by<D, V>(&self, filter: BsonDocument, field: &str, scope: &Scope) -> Result<V>
    where
        D: Document,
        V: DeserializeOwned + Default,
    {
        self.reader.sum_by::<D, V>(filter, field, scope).await
    }

    pub async fn project_one<D, P>(
        &self,
        filter: BsonDocument,
        projection: BsonDocument,
        scope: &Scope,
    ) -> Result<Option<P>>
    where
        D: Document,
        P: DeserializeOwned,
    {
        self.reader.project_one::<D, P>(filter, projection, scope).await
    }

    pub async fn project_many<D, P>(
        &self,
        filter: BsonDocument,
        projection: BsonDocument,
        scope: &Scope,
    ) -> Result<Vec<P>>
    where
        D: Document,
        P: DeserializeOwned,
    {
        self.reader.project_many::<D, P>(filter, projection, scope).await
    }

    pub async fn group_by<D, R>(
        &self,
        filter: BsonDocument,
        key_field: &str,
        accumulators: BsonDocument,
        scope: &Scope,
    ) -> Result<Vec<R>>
    where
        D: Document,
        R: DeserializeOwned,
    {
        self.reader
            .group_by::<D, R>(filter, key_field, accumulators, scope)
            .await
    }

    pub async fn get_sorted_paginated<D: Document>(
        &self,
        filter: BsonDocument,
        sort: BsonDocument,
        skip: u64,
        take: i64,
        scope: &Scope,
    ) -> Result<Vec<D>> {
        self.reader
            .get_sorted_paginated(filter, sort, skip, take, scope)
            .await
    }

    // Update

    pub async fn update_one<D: Document>(&self, modified: &D, scope: &Scope) -> Result<bool> {
        self.updater.update_one(modified, scope).await
    }

    pub async fn update_one_with<D: Document>(
        &self,
        document: &D,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<bool> {
        self.updater.update_one_with(document, update, scope).await
    }

    pub async fn update_field<D, V>(&self, document: &D, field: &str, value: V, scope: &Scope) -> Result<bool>
    where
        D: Document,
        V: Into<Bson>,
    {
        self.updater.update_field(document, field, value, scope).await
    }

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
        self.updater
            .update_one_where::<D, V>(filter, field, value, scope)
            .await
    }

    pub async fn update_one_where_with<D: Document>(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<bool> {
        self.updater
            .update_one_where_with::<D>(filter, update, scope)
            .await
    }

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
        self.updater
            .update_many_where::<D, V>(filter, field, value, scope)
            .await
    }

    pub async fn update_many<D: Document>(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<u64> {
        self.updater.update_many::<D>(filter, update, scope).await
    }

    // Delete

    pub async fn delete_one<D: Document>(&self, document: &D, scope: &Scope) -> Result<u64> {
        self.eraser.delete_one(document, scope).await
    }

    pub async fn delete_one_where<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        self.eraser.delete_one_where::<D>(filter, scope).await
    }

    pub async fn delete_many_where<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        self.eraser.delete_many_where::<D>(filter, scope).await
    }

    pub async fn delete_many<D: Document>(&self, documents: &[D], scope: &Scope) -> Result<u64> {
        self.eraser.delete_many(documents, scope).await
    }

    // Index

    pub async fn index_names<D: Document>(&self, scope: &Scope) -> Result<Vec<String>> {
        self.index_handler.index_names::<D>(scope).await
    }

    pub async fn create_text_index<D: Document>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.index_handler
            .create_text_index::<D>(field, options, scope)
            .await
    }

    pub async fn create_ascending_index<D: Document>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.index_handler
            .create_ascending_index::<D>(field, options, scope)
            .await
    }

    pub async fn create_descending_index<D: Document>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.index_handler
            .create_descending_index::<D>(field, options, scope)
            .await
    }

    pub async fn create_hashed_index<D: Document>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.index_handler
            .create_hashed_index::<D>(field, options, scope)
            .await
    }

    pub async fn create_combined_text_index<D: Document>(
        &self,
        fields: &[&str],
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.index_handler
            .create_combined_text_index::<D>(fields, options, scope)
            .await
    }

    pub async fn drop_index<D: Document>(&self, name: &str, scope: &Scope) -> Result<()> {
        self.index_handler.drop_index::<D>(name, scope).await
    }
}

/// Repository for documents sharing the key type `K`
///
/// Every operation is the [`MongoRepository`] one with `D::Key` fixed to `K`,
/// so a repository for integer-keyed documents rejects UUID-keyed ones at
/// compile time.
#[derive(Debug)]
pub struct KeyTypedRepository<K, C = MongoDbContext> {
    inner: MongoRepository<C>,
    _key: PhantomData<fn() -> K>,
}

impl<K, C> Clone for KeyTypedRepository<K, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _key: PhantomData,
        }
    }
}

impl<K: DocumentKey> KeyTypedRepository<K, MongoDbContext> {
    pub async fn connect(config: &ContextConfig) -> Result<Self> {
        Ok(Self::new(MongoDbContext::connect(config).await?))
    }
}

impl<K: DocumentKey, C: DbContext> KeyTypedRepository<K, C> {
    pub fn new(context: C) -> Self {
        Self::from_arc(Arc::new(context))
    }

    pub fn from_arc(context: Arc<C>) -> Self {
        Self {
            inner: MongoRepository::from_arc(context),
            _key: PhantomData,
        }
    }

    /// The untyped repository underneath
    pub fn untyped(&self) -> &MongoRepository<C> {
        &self.inner
    }

    pub async fn drop_collection<D: Document<Key = K>>(&self, scope: &Scope) -> Result<()> {
        self.inner.drop_collection::<D>(scope).await
    }

    pub async fn add_one<D: Document<Key = K>>(&self, document: &mut D, scope: &Scope) -> Result<()> {
        self.inner.add_one(document, scope).await
    }

    pub async fn add_many<D: Document<Key = K>>(&self, documents: &mut [D], scope: &Scope) -> Result<()> {
        self.inner.add_many(documents, scope).await
    }

    pub async fn get_by_id<D: Document<Key = K>>(&self, id: &K, scope: &Scope) -> Result<Option<D>> {
        self.inner.get_by_id::<D>(id, scope).await
    }

    pub async fn get_one<D: Document<Key = K>>(&self, filter: BsonDocument, scope: &Scope) -> Result<Option<D>> {
        self.inner.get_one(filter, scope).await
    }

    pub async fn any<D: Document<Key = K>>(&self, filter: BsonDocument, scope: &Scope) -> Result<bool> {
        self.inner.any::<D>(filter, scope).await
    }

    pub async fn get_all<D: Document<Key = K>>(&self, filter: BsonDocument, scope: &Scope) -> Result<Vec<D>> {
        self.inner.get_all(filter, scope).await
    }

    pub async fn count<D: Document<Key = K>>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        self.inner.count::<D>(filter, scope).await
    }

    pub async fn get_by_max<D: Document<Key = K>>(
        &self,
        filter: BsonDocument,
        field: &str,
        scope: &Scope,
    ) -> Result<Option<D>> {
        self.inner.get_by_max(filter, field, scope).await
    }

    pub async fn get_by_min<D: Document<Key = K>>(
        &self,
        filter: BsonDocument,
        field: &str,
        scope: &Scope,
    ) -> Result<Option<D>> {
        self.inner.get_by_min(filter, field, scope).await
    }

    pub async fn get_max_value<D, V>(&self, filter: BsonDocument, field: &str, scope: &Scope) -> Result<Option<V>>
    where
        D: Document<Key = K>,
        V: DeserializeOwned,
    {
        self.inner.get_max_value::<D, V>(filter, field, scope).await
    }

    pub async fn get_min_value<D, V>(&self, filter: BsonDocument, field: &str, scope: &Scope) -> Result<Option<V>>
    where
        D: Document<Key = K>,
        V: DeserializeOwned,
    {
        self.inner.get_min_value::<D, V>(filter, field, scope).await
    }

    pub async fn sum_by<D, V>(&self, filter: BsonDocument, field: &str, scope: &Scope) -> Result<V>
    where
        D: Document<Key = K>,
        V: DeserializeOwned + Default,
    {
        self.inner.sum_by::<D, V>(filter, field, scope).await
    }

    pub async fn project_one<D, P>(
        &self,
        filter: BsonDocument,
        projection: BsonDocument,
        scope: &Scope,
    ) -> Result<Option<P>>
    where
        D: Document<Key = K>,
        P: DeserializeOwned,
    {
        self.inner.project_one::<D, P>(filter, projection, scope).await
    }

    pub async fn project_many<D, P>(
        &self,
        filter: BsonDocument,
        projection: BsonDocument,
        scope: &Scope,
    ) -> Result<Vec<P>>
    where
        D: Document<Key = K>,
        P: DeserializeOwned,
    {
        self.inner.project_many::<D, P>(filter, projection, scope).await
    }

    pub async fn group_by<D, R>(
        &self,
        filter: BsonDocument,
        key_field: &str,
        accumulators: BsonDocument,
        scope: &Scope,
    ) -> Result<Vec<R>>
    where
        D: Document<Key = K>,
        R: DeserializeOwned,
    {
        self.inner
            .group_by::<D, R>(filter, key_field, accumulators, scope)
            .await
    }

    pub async fn get_sorted_paginated<D: Document<Key = K>>(
        &self,
        filter: BsonDocument,
        sort: BsonDocument,
        skip: u64,
        take: i64,
        scope: &Scope,
    ) -> Result<Vec<D>> {
        self.inner
            .get_sorted_paginated(filter, sort, skip, take, scope)
            .await
    }

    pub async fn update_one<D: Document<Key = K>>(&self, modified: &D, scope: &Scope) -> Result<bool> {
        self.inner.update_one(modified, scope).await
    }

    pub async fn update_one_with<D: Document<Key = K>>(
        &self,
        document: &D,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<bool> {
        self.inner.update_one_with(document, update, scope).await
    }

    pub async fn update_field<D, V>(&self, document: &D, field: &str, value: V, scope: &Scope) -> Result<bool>
    where
        D: Document<Key = K>,
        V: Into<Bson>,
    {
        self.inner.update_field(document, field, value, scope).await
    }

    pub async fn update_one_where<D, V>(
        &self,
        filter: BsonDocument,
        field: &str,
        value: V,
        scope: &Scope,
    ) -> Result<bool>
    where
        D: Document<Key = K>,
        V: Into<Bson>,
    {
        self.inner
            .update_one_where::<D, V>(filter, field, value, scope)
            .await
    }

    pub async fn update_one_where_with<D: Document<Key = K>>(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<bool> {
        self.inner
            .update_one_where_with::<D>(filter, update, scope)
            .await
    }

    pub async fn update_many_where<D, V>(
        &self,
        filter: BsonDocument,
        field: &str,
        value: V,
        scope: &Scope,
    ) -> Result<u64>
    where
        D: Document<Key = K>,
        V: Into<Bson>,
    {
        self.inner
            .update_many_where::<D, V>(filter, field, value, scope)
            .await
    }

    pub async fn update_many<D: Document<Key = K>>(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
        scope: &Scope,
    ) -> Result<u64> {
        self.inner.update_many::<D>(filter, update, scope).await
    }

    pub async fn delete_one<D: Document<Key = K>>(&self, document: &D, scope: &Scope) -> Result<u64> {
        self.inner.delete_one(document, scope).await
    }

    pub async fn delete_one_where<D: Document<Key = K>>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        self.inner.delete_one_where::<D>(filter, scope).await
    }

    pub async fn delete_many_where<D: Document<Key = K>>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        self.inner.delete_many_where::<D>(filter, scope).await
    }

    pub async fn delete_many<D: Document<Key = K>>(&self, documents: &[D], scope: &Scope) -> Result<u64> {
        self.inner.delete_many(documents, scope).await
    }

    pub async fn index_names<D: Document<Key = K>>(&self, scope: &Scope) -> Result<Vec<String>> {
        self.inner.index_names::<D>(scope).await
    }

    pub async fn create_text_index<D: Document<Key = K>>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.inner.create_text_index::<D>(field, options, scope).await
    }

    pub async fn create_ascending_index<D: Document<Key = K>>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.inner
            .create_ascending_index::<D>(field, options, scope)
            .await
    }

    pub async fn create_descending_index<D: Document<Key = K>>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.inner
            .create_descending_index::<D>(field, options, scope)
            .await
    }

    pub async fn create_hashed_index<D: Document<Key = K>>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.inner.create_hashed_index::<D>(field, options, scope).await
    }

    pub async fn create_combined_text_index<D: Document<Key = K>>(
        &self,
        fields: &[&str],
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        self.inner
            .create_combined_text_index::<D>(fields, options, scope)
            .await
    }

    pub async fn drop_index<D: Document<Key = K>>(&self, name: &str, scope: &Scope) -> Result<()> {
        self.inner.drop_index::<D>(name, scope).await
    }
}
