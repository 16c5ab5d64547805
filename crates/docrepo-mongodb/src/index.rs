//! Index management
//!
//! Each `create_*` helper builds the key document for one index kind, turns
//! the optional [`IndexCreationOptions`] into driver `IndexOptions`, and issues
//! a single `createIndexes` call. The driver's index name is returned as-is.

use bson::{doc, Bson, Document as BsonDocument};
use docrepo_common::{RepositoryError, Result};
use mongodb::{
    options::{IndexOptions, IndexVersion, Sphere2DIndexVersion, TextIndexVersion},
    IndexModel,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::collection::CollectionHandle;
use crate::context::DbContext;
use crate::document::Document;
use crate::scope::Scope;
use crate::validation::validate_index_field;

/// Options accepted by the index helpers
///
/// Every field left as `None` is omitted from the `createIndexes` command.
#[derive(Debug, Clone, Default)]
pub struct IndexCreationOptions {
    pub name: Option<String>,
    pub unique: Option<bool>,
    pub sparse: Option<bool>,
    pub text_index_version: Option<TextIndexVersion>,
    pub sphere_2d_index_version: Option<Sphere2DIndexVersion>,
    pub bits: Option<u32>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub expire_after: Option<Duration>,
    pub version: Option<IndexVersion>,
    pub language_override: Option<String>,
    pub default_language: Option<String>,
}

impl IndexCreationOptions {
    /// Options carrying only an index name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Mark the index unique
    pub fn unique(mut self) -> Self {
        self.unique = Some(true);
        self
    }
}

impl From<IndexCreationOptions> for IndexOptions {
    fn from(options: IndexCreationOptions) -> Self {
        let mut converted = IndexOptions::default();
        converted.name = options.name;
        converted.unique = options.unique;
        converted.sparse = options.sparse;
        converted.text_index_version = options.text_index_version;
        converted.sphere_2d_index_version = options.sphere_2d_index_version;
        converted.bits = options.bits;
        converted.min = options.min;
        converted.max = options.max;
        converted.expire_after = options.expire_after;
        converted.version = options.version;
        converted.language_override = options.language_override;
        converted.default_language = options.default_language;
        converted
    }
}

/// Lists, creates and drops indexes
#[derive(Debug)]
pub struct MongoDbIndexHandler<C> {
    context: Arc<C>,
}

impl<C> Clone for MongoDbIndexHandler<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<C: DbContext> MongoDbIndexHandler<C> {
    pub fn new(context: Arc<C>) -> Self {
        Self { context }
    }

    /// Names of every index on the collection
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key()))]
    pub async fn index_names<D: Document>(&self, scope: &Scope) -> Result<Vec<String>> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        scope.run(collection.list_index_names()).await
    }

    /// Create a text index on one field
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    pub async fn create_text_index<D: Document>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        let keys = index_keys(&[field], "text")?;
        self.create_index::<D>(keys, options, scope).await
    }

    /// Create an ascending index on one field
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    pub async fn create_ascending_index<D: Document>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        let keys = index_keys(&[field], 1)?;
        self.create_index::<D>(keys, options, scope).await
    }

    /// Create a descending index on one field
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    pub async fn create_descending_index<D: Document>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        let keys = index_keys(&[field], -1)?;
        self.create_index::<D>(keys, options, scope).await
    }

    /// Create a hashed index on one field
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), field = field))]
    pub async fn create_hashed_index<D: Document>(
        &self,
        field: &str,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        let keys = index_keys(&[field], "hashed")?;
        self.create_index::<D>(keys, options, scope).await
    }

    /// Create one text index spanning several fields
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), fields = fields.len()))]
    pub async fn create_combined_text_index<D: Document>(
        &self,
        fields: &[&str],
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        let keys = index_keys(fields, "text")?;
        self.create_index::<D>(keys, options, scope).await
    }

    /// Drop an index by name
    #[instrument(level = "debug", skip_all, fields(partition = scope.partition_key(), index = name))]
    pub async fn drop_index<D: Document>(&self, name: &str, scope: &Scope) -> Result<()> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        scope.run(collection.drop_index(name)).await?;
        debug!(collection = collection.name(), index = name, "Dropped index");
        Ok(())
    }

    async fn create_index<D: Document>(
        &self,
        keys: BsonDocument,
        options: Option<IndexCreationOptions>,
        scope: &Scope,
    ) -> Result<String> {
        let collection = self.context.collection::<D>(scope.partition_key())?;
        let model = IndexModel::builder()
            .keys(keys)
            .options(options.map(IndexOptions::from))
            .build();

        let name = scope.run(collection.create_index(model)).await?;
        debug!(collection = collection.name(), index = %name, "Created index");
        Ok(name)
    }
}

/// Key document giving every field the same index kind
fn index_keys(fields: &[&str], kind: impl Into<Bson> + Clone) -> Result<BsonDocument> {
    if fields.is_empty() {
        return Err(RepositoryError::Validation(
            "Index requires at least one field".to_string(),
        ));
    }

    let mut keys = doc! {};
    for field in fields {
        keys.insert(validate_index_field(field)?, kind.clone());
    }
    Ok(keys)
}
