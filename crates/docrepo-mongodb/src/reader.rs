//! Read helpers: lookups, counts, min/max, sums, projections and grouping

use bson::{doc, Document as BsonDocument};
use docrepo_common::Result;
use mongodb::options::{CountOptions, FindOneOptions, FindOptions};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::collection::CollectionHandle;
use crate::context::DbContext;
use crate::document::Document;
use crate::query::{field_projection, id_filter, sort_by, value_at_path, SortDirection};
use crate::scope::Scope;
use crate::validation::validate_field;

/// Reads documents through the context's collections
#[derive(Debug)]
pub struct MongoDbReader<C> {
    context: Arc<C>,
}

impl<C> Clone for MongoDbReader<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<C: DbContext> MongoDbReader<C> {
    pub fn new(context: Arc<C>) -> Self {
        Self { context }
    }

    /// The document with the given `_id`
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn get_by_id<D: Document>(&self, id: &D::Key, scope: &Scope) -> Result<Option<D>> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        scope
            .run(collection.find_one(id_filter(id), FindOneOptions::default()))
            .await
    }

    /// The first document matching the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn get_one<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<Option<D>> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        scope
            .run(collection.find_one(filter, FindOneOptions::default()))
            .await
    }

    /// Whether any document matches the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn any<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<bool> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let mut options = CountOptions::default();
        options.limit = Some(1);

        let count = scope.run(collection.count_documents(filter, options)).await?;
        Ok(count > 0)
    }

    /// Every document matching the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn get_all<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<Vec<D>> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let documents = scope
            .run(collection.find(filter, FindOptions::default()))
            .await?;
        debug!(collection = collection.name(), count = documents.len(), "Fetched documents");
        Ok(documents)
    }

    /// Number of documents matching the filter
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn count<D: Document>(&self, filter: BsonDocument, scope: &Scope) -> Result<u64> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        scope
            .run(collection.count_documents(filter, CountOptions::default()))
            .await
    }

    /// The matching document with the largest value in `field`
    pub async fn get_by_max<D: Document>(
        &self,
        filter: BsonDocument,
        field: &str,
        scope: &Scope,
    ) -> Result<Option<D>> {
        self.first_sorted(filter, field, SortDirection::Descending, scope)
            .await
    }

    /// The matching document with the smallest value in `field`
    pub async fn get_by_min<D: Document>(
        &self,
        filter: BsonDocument,
        field: &str,
        scope: &Scope,
    ) -> Result<Option<D>> {
        self.first_sorted(filter, field, SortDirection::Ascending, scope)
            .await
    }

    /// The largest value of `field` among matching documents
    pub async fn get_max_value<D, V>(
        &self,
        filter: BsonDocument,
        field: &str,
        scope: &Scope,
    ) -> Result<Option<V>>
    where
        D: Document,
        V: DeserializeOwned,
    {
        self.first_value::<D, V>(filter, field, SortDirection::Descending, scope)
            .await
    }

    /// The smallest value of `field` among matching documents
    pub async fn get_min_value<D, V>(
        &self,
        filter: BsonDocument,
        field: &str,
        scope: &Scope,
    ) -> Result<Option<V>>
    where
        D: Document,
        V: DeserializeOwned,
    {
        self.first_value::<D, V>(filter, field, SortDirection::Ascending, scope)
            .await
    }

    /// Sum of `field` over matching documents; `V::default()` when nothing matches
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    pub async fn sum_by<D, V>(&self, filter: BsonDocument, field: &str, scope: &Scope) -> Result<V>
    where
        D: Document,
        V: DeserializeOwned + Default,
    {
        let field = validate_field(field)?;
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$group": { "_id": null, "total": { "$sum": format!("${}", field) } } },
        ];

        let results = scope.run(collection.aggregate(pipeline)).await?;
        match results.first().and_then(|result| result.get("total")) {
            Some(total) => Ok(bson::from_bson(total.clone())?),
            None => Ok(V::default()),
        }
    }

    /// The first matching document, projected into `P`
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
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
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let mut options = FindOptions::default();
        options.projection = Some(projection);
        options.limit = Some(1);

        let raw = scope.run(collection.find_raw(filter, options)).await?;
        match raw.into_iter().next() {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Every matching document, projected into `P`
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
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
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let mut options = FindOptions::default();
        options.projection = Some(projection);

        let raw = scope.run(collection.find_raw(filter, options)).await?;
        let projected = raw
            .into_iter()
            .map(bson::from_document)
            .collect::<std::result::Result<Vec<P>, _>>()?;
        Ok(projected)
    }

    /// Group matching documents by `key_field`, one `R` per group
    ///
    /// `accumulators` are the `$group` fields besides `_id`, for example
    /// `doc! { "total": { "$sum": "$amount" } }`.
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), key_field = key_field))]
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
        let key_field = validate_field(key_field)?;
        let collection = self.context.collection::<D>(scope.partition_key())?;

        let mut group = doc! { "_id": format!("${}", key_field) };
        group.extend(accumulators);
        let pipeline = vec![doc! { "$match": filter }, doc! { "$group": group }];

        let raw = scope.run(collection.aggregate(pipeline)).await?;
        let groups = raw
            .into_iter()
            .map(bson::from_document)
            .collect::<std::result::Result<Vec<R>, _>>()?;
        Ok(groups)
    }

    /// One page of matching documents in `sort` order
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), skip = skip, take = take))]
    pub async fn get_sorted_paginated<D: Document>(
        &self,
        filter: BsonDocument,
        sort: BsonDocument,
        skip: u64,
        take: i64,
        scope: &Scope,
    ) -> Result<Vec<D>> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let mut options = FindOptions::default();
        options.sort = Some(sort);
        options.skip = Some(skip);
        options.limit = Some(take);

        scope.run(collection.find(filter, options)).await
    }

    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    async fn first_sorted<D: Document>(
        &self,
        filter: BsonDocument,
        field: &str,
        direction: SortDirection,
        scope: &Scope,
    ) -> Result<Option<D>> {
        let sort = sort_by(field, direction)?;
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let mut options = FindOneOptions::default();
        options.sort = Some(sort);

        scope.run(collection.find_one(filter, options)).await
    }

    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    async fn first_value<D, V>(
        &self,
        filter: BsonDocument,
        field: &str,
        direction: SortDirection,
        scope: &Scope,
    ) -> Result<Option<V>>
    where
        D: Document,
        V: DeserializeOwned,
    {
        let sort = sort_by(field, direction)?;
        let projection = field_projection(field)?;
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let mut options = FindOptions::default();
        options.sort = Some(sort);
        options.projection = Some(projection);
        options.limit = Some(1);

        let raw = scope.run(collection.find_raw(filter, options)).await?;
        let value = raw
            .first()
            .and_then(|document| value_at_path(document, field))
            .cloned();

        match value {
            Some(value) => Ok(Some(bson::from_bson(value)?)),
            None => Ok(None),
        }
    }
}
