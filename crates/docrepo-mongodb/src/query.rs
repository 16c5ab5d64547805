//! Filter, sort, projection and update document builders
//!
//! The repository never interprets filters itself; these helpers only
//! assemble the small documents the helpers pass to the driver.

use bson::{doc, Bson, Document as BsonDocument};
use docrepo_common::Result;

use crate::document::DocumentKey;
use crate::validation::validate_field;

/// Sort order for a field selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// `1` or `-1`, as MongoDB expects in sort and index documents
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// `{ "_id": id }`
pub fn id_filter<K: DocumentKey>(id: &K) -> BsonDocument {
    let id: Bson = id.clone().into();
    doc! { "_id": id }
}

/// `{ "_id": { "$in": [ids...] } }`
pub fn ids_filter<'a, K, I>(ids: I) -> BsonDocument
where
    K: DocumentKey,
    I: IntoIterator<Item = &'a K>,
{
    let ids: Vec<Bson> = ids.into_iter().map(|id| id.clone().into()).collect();
    doc! { "_id": { "$in": ids } }
}

/// `{ field: 1 | -1 }`
pub fn sort_by(field: &str, direction: SortDirection) -> Result<BsonDocument> {
    let field = validate_field(field)?;
    Ok(doc! { field: direction.as_i32() })
}

/// Projection keeping only `field`, without `_id`
pub fn field_projection(field: &str) -> Result<BsonDocument> {
    let field = validate_field(field)?;
    if field == "_id" {
        return Ok(doc! { "_id": 1 });
    }
    Ok(doc! { field: 1, "_id": 0 })
}

/// `{ "$set": { field: value } }`
pub fn set_field(field: &str, value: impl Into<Bson>) -> Result<BsonDocument> {
    let field = validate_field(field)?;
    let value: Bson = value.into();
    Ok(doc! { "$set": { field: value } })
}

/// Walk a dotted path through nested documents
pub fn value_at_path<'a>(document: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn test_id_filter() {
        let id = ObjectId::new();
        assert_eq!(id_filter(&id), doc! { "_id": id });
        assert_eq!(id_filter(&42i32), doc! { "_id": 42 });
    }

    #[test]
    fn test_ids_filter() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(ids_filter(&ids), doc! { "_id": { "$in": ["a", "b"] } });
    }

    #[test]
    fn test_sort_by() {
        assert_eq!(
            sort_by("created", SortDirection::Descending).unwrap(),
            doc! { "created": -1 }
        );
        assert_eq!(
            sort_by("name", SortDirection::Ascending).unwrap(),
            doc! { "name": 1 }
        );
        assert!(sort_by("$natural", SortDirection::Ascending).is_err());
    }

    #[test]
    fn test_field_projection() {
        assert_eq!(
            field_projection("someValue").unwrap(),
            doc! { "someValue": 1, "_id": 0 }
        );
        assert_eq!(field_projection("_id").unwrap(), doc! { "_id": 1 });
    }

    #[test]
    fn test_set_field() {
        assert_eq!(
            set_field("status", "done").unwrap(),
            doc! { "$set": { "status": "done" } }
        );
        assert!(set_field("", 1).is_err());
    }

    #[test]
    fn test_value_at_path() {
        let document = doc! { "a": 1, "nested": { "inner": { "value": 7 } } };
        assert_eq!(value_at_path(&document, "a"), Some(&Bson::Int32(1)));
        assert_eq!(
            value_at_path(&document, "nested.inner.value"),
            Some(&Bson::Int32(7))
        );
        assert_eq!(value_at_path(&document, "nested.missing"), None);
        assert_eq!(value_at_path(&document, "a.b"), None);
    }
}
