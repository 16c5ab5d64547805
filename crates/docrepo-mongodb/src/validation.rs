//! Name validation for collections and field selectors
//!
//! Collection names are assembled from a document type and an optional
//! partition key supplied at call time, and field selectors end up as keys in
//! sort, projection and index documents. Both are checked here before they
//! reach the driver.

use docrepo_common::{RepositoryError, Result};
use tracing::warn;

/// Maximum allowed length for field names
const MAX_FIELD_NAME_LENGTH: usize = 1024;

/// Wildcard index key covering every field
const WILDCARD_KEY: &str = "$**";

/// Validated collection name
///
/// # Guarantees
/// - Not empty
/// - No null bytes
/// - No "system." prefix (system collections)
/// - No $ characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionName {
    name: String,
}

impl CollectionName {
    /// Validates a collection name
    ///
    /// Length is left to the server, whose limit covers the whole
    /// `database.collection` namespace.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(RepositoryError::Validation(
                "Collection name cannot be empty".to_string(),
            ));
        }

        if name.contains('\0') {
            return Err(RepositoryError::Validation(
                "Collection name cannot contain null bytes".to_string(),
            ));
        }

        if name.starts_with("system.") {
            return Err(RepositoryError::Validation(format!(
                "Collection name cannot start with 'system.' (reserved): '{}'",
                name
            )));
        }

        if name.contains('$') {
            return Err(RepositoryError::Validation(format!(
                "Collection name cannot contain '$' character: '{}'",
                name
            )));
        }

        if name.contains("..") || name.contains("//") {
            warn!(collection = name, "Collection name contains suspicious pattern");
        }

        Ok(CollectionName {
            name: name.to_string(),
        })
    }

    /// Builds the name of a document collection, prefixed by the partition key when present
    ///
    /// An empty partition key counts as no partition.
    pub fn partitioned(base: &str, partition_key: Option<&str>) -> Result<Self> {
        match partition_key.filter(|key| !key.is_empty()) {
            Some(key) => Self::new(&format!("{}-{}", key, base)),
            None => Self::new(base),
        }
    }

    /// Returns the validated collection name as a string slice
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Consumes the CollectionName and returns the inner String
    pub fn into_string(self) -> String {
        self.name
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Checks a field selector used as a sort, projection, group or index key
///
/// Dotted paths are accepted; operator names (`$` prefix) are not.
pub fn validate_field(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(RepositoryError::Validation(
            "Field name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_FIELD_NAME_LENGTH {
        return Err(RepositoryError::Validation(format!(
            "Field name exceeds maximum length of {} characters",
            MAX_FIELD_NAME_LENGTH
        )));
    }

    if name.contains('\0') {
        return Err(RepositoryError::Validation(
            "Field name cannot contain null bytes".to_string(),
        ));
    }

    if name.starts_with('$') {
        return Err(RepositoryError::Validation(format!(
            "Field name cannot start with '$' (reserved for operators): '{}'",
            name
        )));
    }

    Ok(name)
}

/// Checks a field selector used as an index key
///
/// Same rules as [`validate_field`], plus the wildcard keys `$**` and
/// `path.$**`.
pub fn validate_index_field(name: &str) -> Result<&str> {
    if name == WILDCARD_KEY {
        return Ok(name);
    }

    if let Some(path) = name.strip_suffix(".$**") {
        validate_field(path)?;
        return Ok(name);
    }

    validate_field(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_collection_names() {
        assert!(CollectionName::new("users").is_ok());
        assert!(CollectionName::new("testDocuments").is_ok());
        assert!(CollectionName::new("tenant-a-orders").is_ok());
        assert!(CollectionName::new("a".repeat(240).as_str()).is_ok());
    }

    #[test]
    fn test_long_partitioned_name_left_to_server() {
        let partition = "p".repeat(110);
        let name = CollectionName::partitioned("testDocuments", Some(&partition)).unwrap();
        assert_eq!(name.as_str().len(), 124);
    }

    #[test]
    fn test_empty_collection_name() {
        let result = CollectionName::new("");
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }

    #[test]
    fn test_collection_name_with_null_byte() {
        assert!(CollectionName::new("users\0").is_err());
    }

    #[test]
    fn test_system_collection_blocked() {
        assert!(CollectionName::new("system.users").is_err());
        assert!(CollectionName::new("system.indexes").is_err());
    }

    #[test]
    fn test_collection_name_with_dollar_sign() {
        assert!(CollectionName::new("users$test").is_err());
    }

    #[test]
    fn test_partitioned_name() {
        let name = CollectionName::partitioned("orders", Some("tenant")).unwrap();
        assert_eq!(name.as_str(), "tenant-orders");
    }

    #[test]
    fn test_partitioned_name_without_partition() {
        assert_eq!(
            CollectionName::partitioned("orders", None).unwrap().as_str(),
            "orders"
        );
        assert_eq!(
            CollectionName::partitioned("orders", Some("")).unwrap().as_str(),
            "orders"
        );
    }

    #[test]
    fn test_partition_key_cannot_smuggle_operators() {
        assert!(CollectionName::partitioned("orders", Some("$bad")).is_err());
        assert!(CollectionName::partitioned("orders", Some("system.x")).is_err());
    }

    #[test]
    fn test_collection_name_display() {
        let name = CollectionName::new("users").unwrap();
        assert_eq!(name.to_string(), "users");
        assert_eq!(name.into_string(), "users");
    }

    #[test]
    fn test_valid_field_names() {
        assert_eq!(validate_field("name").unwrap(), "name");
        assert!(validate_field("nested.someDate").is_ok());
        assert!(validate_field("_id").is_ok());
    }

    #[test]
    fn test_invalid_field_names() {
        assert!(validate_field("").is_err());
        assert!(validate_field("$where").is_err());
        assert!(validate_field("bad\0field").is_err());
        assert!(validate_field(&"a".repeat(1025)).is_err());
        assert!(validate_field("$**").is_err());
    }

    #[test]
    fn test_wildcard_index_fields() {
        assert_eq!(validate_index_field("$**").unwrap(), "$**");
        assert_eq!(validate_index_field("attributes.$**").unwrap(), "attributes.$**");
        assert!(validate_index_field("nested.some_amount").is_ok());
    }

    #[test]
    fn test_invalid_index_fields() {
        assert!(validate_index_field("$where").is_err());
        assert!(validate_index_field(".$**").is_err());
        assert!(validate_index_field("$bad.$**").is_err());
        assert!(validate_index_field("").is_err());
    }
}
