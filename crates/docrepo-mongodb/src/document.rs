//! Document trait and key types
//!
//! Every type stored through a repository implements [`Document`]. The trait
//! ties a record type to its `_id` key type, its collection name and, for
//! partitioned documents, the partition key that selects the collection.

use bson::{oid::ObjectId, Bson, Document as BsonDocument, Uuid};
use docrepo_common::{RepositoryError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Type usable as a document `_id`
///
/// A key knows whether it still holds its "unset" value and, for key types
/// the driver can mint client-side, how to generate a fresh one.
pub trait DocumentKey:
    Clone + Debug + PartialEq + Into<Bson> + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Returns true if the key still holds its default, unassigned value
    fn is_unset(&self) -> bool;

    /// Generate a fresh key, or `None` if keys of this type are caller-assigned
    fn generate() -> Option<Self> {
        None
    }
}

impl DocumentKey for ObjectId {
    fn is_unset(&self) -> bool {
        self.bytes() == [0u8; 12]
    }

    fn generate() -> Option<Self> {
        Some(ObjectId::new())
    }
}

impl DocumentKey for Uuid {
    fn is_unset(&self) -> bool {
        self.bytes() == [0u8; 16]
    }

    fn generate() -> Option<Self> {
        Some(Uuid::new())
    }
}

impl DocumentKey for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }

    fn generate() -> Option<Self> {
        Some(ObjectId::new().to_hex())
    }
}

impl DocumentKey for i32 {
    fn is_unset(&self) -> bool {
        *self == 0
    }
}

impl DocumentKey for i64 {
    fn is_unset(&self) -> bool {
        *self == 0
    }
}

/// Core trait for repository documents
///
/// # Example
///
/// ```ignore
/// use bson::oid::ObjectId;
/// use serde::{Deserialize, Serialize};
/// use docrepo_mongodb::document::{default_collection_name, Document};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct User {
///     #[serde(rename = "_id")]
///     id: ObjectId,
///     email: String,
/// }
///
/// impl Document for User {
///     type Key = ObjectId;
///
///     fn id(&self) -> &ObjectId {
///         &self.id
///     }
///
///     fn set_id(&mut self, id: ObjectId) {
///         self.id = id;
///     }
///
///     fn collection_name() -> String {
///         default_collection_name("User")
///     }
/// }
///
/// assert_eq!(User::collection_name(), "users");
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Unpin + Sized + 'static {
    /// Type of the `_id` field
    type Key: DocumentKey;

    /// The document's `_id`
    fn id(&self) -> &Self::Key;

    /// Replace the document's `_id`
    fn set_id(&mut self, id: Self::Key);

    /// Collection name for this document type, before partitioning
    ///
    /// This name locates persisted data, so it is spelled out by each
    /// implementor; [`default_collection_name`] gives the conventional form.
    fn collection_name() -> String;

    /// Partition this document lives in, if any
    fn partition_key(&self) -> Option<&str> {
        None
    }

    /// Assign a generated `_id` when the current one is unset
    fn ensure_id(&mut self) {
        if self.id().is_unset() {
            if let Some(id) = Self::Key::generate() {
                self.set_id(id);
            }
        }
    }

    /// Convert document to BSON
    fn to_bson(&self) -> Result<BsonDocument> {
        bson::to_document(self).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }

    /// Create document from BSON
    fn from_bson(doc: BsonDocument) -> Result<Self> {
        bson::from_document(doc).map_err(|e| RepositoryError::Deserialization(e.to_string()))
    }
}

/// Conventional collection name for a type name: camel-cased and pluralized
///
/// `TestDocument` becomes `testDocuments`, `Category` becomes `categories`.
pub fn default_collection_name(type_name: &str) -> String {
    let mut chars = type_name.chars();
    let camel: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => return String::new(),
    };

    pluralize(&camel)
}

/// English plural of `word`, keeping its casing
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    if lower.ends_with('y') {
        let before_y = lower.chars().rev().nth(1);
        if !matches!(before_y, Some('a' | 'e' | 'i' | 'o' | 'u') | None) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{}es", word);
    }

    format!("{}s", word)
}
