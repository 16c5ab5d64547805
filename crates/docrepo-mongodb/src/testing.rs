//! Recording test double for the driver seam
//!
//! [`RecordingContext`] implements [`DbContext`] without a server. Every
//! collection handle it returns records the driver call it received
//! (collection name, filter, update, options, documents) and answers with the
//! canned responses configured on the context. Tests then assert that a
//! repository operation issued exactly the expected driver call and returned
//! the driver's answer unchanged.
//!
//! Enabled for this crate's own tests and, for downstream crates, through the
//! `testing` feature.

use async_trait::async_trait;
use bson::Document as BsonDocument;
use docrepo_common::{RepositoryError, Result};
use mongodb::{
    options::{CountOptions, FindOneOptions, FindOptions},
    IndexModel,
};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::collection::CollectionHandle;
use crate::context::{collection_name, DbContext};
use crate::document::Document;

/// Driver call kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Find,
    FindOne,
    FindRaw,
    CountDocuments,
    Aggregate,
    InsertOne,
    InsertMany,
    ReplaceOne,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
    CreateIndex,
    ListIndexNames,
    DropIndex,
    Drop,
}

/// One driver call as the collection received it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub collection: String,
    pub operation: Operation,
    pub filter: Option<BsonDocument>,
    pub update: Option<BsonDocument>,
    pub documents: Vec<BsonDocument>,
    pub pipeline: Vec<BsonDocument>,
    pub find_options: Option<FindOptions>,
    pub find_one_options: Option<FindOneOptions>,
    pub count_options: Option<CountOptions>,
    pub index: Option<IndexModel>,
    pub index_name: Option<String>,
}

impl RecordedCall {
    fn new(collection: &str, operation: Operation) -> Self {
        Self {
            collection: collection.to_string(),
            operation,
            filter: None,
            update: None,
            documents: Vec::new(),
            pipeline: Vec::new(),
            find_options: None,
            find_one_options: None,
            count_options: None,
            index: None,
            index_name: None,
        }
    }
}

/// Canned driver answers
#[derive(Debug, Clone)]
pub struct Responses {
    /// Returned by find, find_one (first element), find_raw and aggregate
    pub documents: Vec<BsonDocument>,
    /// Returned by count_documents
    pub count: u64,
    /// Modified count returned by replace / update calls
    pub modified: u64,
    /// Deleted count returned by delete calls
    pub deleted: u64,
    /// Returned by list_index_names
    pub index_names: Vec<String>,
    /// Name returned by create_index
    pub created_index: String,
    /// When set, every call fails with a driver error carrying this message
    pub failure: Option<String>,
}

impl Default for Responses {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            count: 0,
            modified: 0,
            deleted: 0,
            index_names: Vec::new(),
            created_index: "index_1".to_string(),
            failure: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<RecordedCall>,
    responses: Responses,
}

/// Context whose collections record calls instead of reaching a server
#[derive(Debug, Clone, Default)]
pub struct RecordingContext {
    state: Arc<Mutex<State>>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit the canned responses
    pub fn respond(&self, edit: impl FnOnce(&mut Responses)) {
        edit(&mut self.state.lock().responses);
    }

    /// Answer reads with these documents
    pub fn set_documents<D: Document>(&self, documents: &[D]) -> Result<()> {
        let raw = documents
            .iter()
            .map(D::to_bson)
            .collect::<Result<Vec<_>>>()?;
        self.respond(|r| r.documents = raw);
        Ok(())
    }

    /// Answer reads with these raw documents
    pub fn set_raw_documents(&self, documents: Vec<BsonDocument>) {
        self.respond(|r| r.documents = documents);
    }

    /// Every call recorded so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// The only recorded call
    ///
    /// # Panics
    /// Panics unless exactly one call was recorded.
    pub fn single_call(&self) -> RecordedCall {
        let mut calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one driver call, got {:?}", calls);
        calls.remove(0)
    }

    /// Forget recorded calls, keeping the responses
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl DbContext for RecordingContext {
    type Collection<D: Document> = RecordingCollection<D>;

    fn collection<D: Document>(&self, partition_key: Option<&str>) -> Result<RecordingCollection<D>> {
        Ok(RecordingCollection {
            name: collection_name::<D>(partition_key)?.into_string(),
            state: Arc::clone(&self.state),
            _document: PhantomData,
        })
    }
}

/// Collection handle handed out by [`RecordingContext`]
#[derive(Debug)]
pub struct RecordingCollection<D> {
    name: String,
    state: Arc<Mutex<State>>,
    _document: PhantomData<fn() -> D>,
}

impl<D: Document> RecordingCollection<D> {
    /// Record the call and return the current responses, or the configured failure
    fn record(&self, call: RecordedCall) -> Result<Responses> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match &state.responses.failure {
            Some(message) => {
                let io = std::io::Error::new(std::io::ErrorKind::Other, message.clone());
                Err(RepositoryError::Driver(io.into()))
            }
            None => Ok(state.responses.clone()),
        }
    }

    fn call(&self, operation: Operation) -> RecordedCall {
        RecordedCall::new(&self.name, operation)
    }

    fn decode(documents: Vec<BsonDocument>) -> Result<Vec<D>> {
        documents.into_iter().map(D::from_bson).collect()
    }
}

#[async_trait]
impl<D: Document> CollectionHandle<D> for RecordingCollection<D> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: BsonDocument, options: FindOptions) -> Result<Vec<D>> {
        let mut call = self.call(Operation::Find);
        call.filter = Some(filter);
        call.find_options = Some(options);
        Self::decode(self.record(call)?.documents)
    }

    async fn find_one(&self, filter: BsonDocument, options: FindOneOptions) -> Result<Option<D>> {
        let mut call = self.call(Operation::FindOne);
        call.filter = Some(filter);
        call.find_one_options = Some(options);
        let first = self.record(call)?.documents.into_iter().next();
        first.map(D::from_bson).transpose()
    }

    async fn find_raw(&self, filter: BsonDocument, options: FindOptions) -> Result<Vec<BsonDocument>> {
        let mut call = self.call(Operation::FindRaw);
        call.filter = Some(filter);
        call.find_options = Some(options);
        Ok(self.record(call)?.documents)
    }

    async fn count_documents(&self, filter: BsonDocument, options: CountOptions) -> Result<u64> {
        let mut call = self.call(Operation::CountDocuments);
        call.filter = Some(filter);
        call.count_options = Some(options);
        Ok(self.record(call)?.count)
    }

    async fn aggregate(&self, pipeline: Vec<BsonDocument>) -> Result<Vec<BsonDocument>> {
        let mut call = self.call(Operation::Aggregate);
        call.pipeline = pipeline;
        Ok(self.record(call)?.documents)
    }

    async fn insert_one(&self, document: &D) -> Result<()> {
        let mut call = self.call(Operation::InsertOne);
        call.documents = vec![document.to_bson()?];
        self.record(call)?;
        Ok(())
    }

    async fn insert_many(&self, documents: &[&D]) -> Result<()> {
        let mut call = self.call(Operation::InsertMany);
        call.documents = documents
            .iter()
            .map(|document| document.to_bson())
            .collect::<Result<Vec<_>>>()?;
        self.record(call)?;
        Ok(())
    }

    async fn replace_one(&self, filter: BsonDocument, replacement: &D) -> Result<u64> {
        let mut call = self.call(Operation::ReplaceOne);
        call.filter = Some(filter);
        call.documents = vec![replacement.to_bson()?];
        Ok(self.record(call)?.modified)
    }

    async fn update_one(&self, filter: BsonDocument, update: BsonDocument) -> Result<u64> {
        let mut call = self.call(Operation::UpdateOne);
        call.filter = Some(filter);
        call.update = Some(update);
        Ok(self.record(call)?.modified)
    }

    async fn update_many(&self, filter: BsonDocument, update: BsonDocument) -> Result<u64> {
        let mut call = self.call(Operation::UpdateMany);
        call.filter = Some(filter);
        call.update = Some(update);
        Ok(self.record(call)?.modified)
    }

    async fn delete_one(&self, filter: BsonDocument) -> Result<u64> {
        let mut call = self.call(Operation::DeleteOne);
        call.filter = Some(filter);
        Ok(self.record(call)?.deleted)
    }

    async fn delete_many(&self, filter: BsonDocument) -> Result<u64> {
        let mut call = self.call(Operation::DeleteMany);
        call.filter = Some(filter);
        Ok(self.record(call)?.deleted)
    }

    async fn create_index(&self, index: IndexModel) -> Result<String> {
        let mut call = self.call(Operation::CreateIndex);
        call.index = Some(index);
        Ok(self.record(call)?.created_index)
    }

    async fn list_index_names(&self) -> Result<Vec<String>> {
        let call = self.call(Operation::ListIndexNames);
        Ok(self.record(call)?.index_names)
    }

    async fn drop_index(&self, name: &str) -> Result<()> {
        let mut call = self.call(Operation::DropIndex);
        call.index_name = Some(name.to_string());
        self.record(call)?;
        Ok(())
    }

    async fn drop(&self) -> Result<()> {
        self.record(self.call(Operation::Drop))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use fixtures::*;

#[cfg(test)]
mod fixtures {
    use crate::document::{default_collection_name, Document};
    use bson::Uuid;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Nested {
        pub some_amount: i64,
    }

    /// Document keyed by a UUID, like most application documents
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TestDocument {
        #[serde(rename = "_id")]
        pub id: Uuid,
        pub some_content: String,
        pub some_content2: String,
        pub some_value: i32,
        pub nested: Nested,
    }

    impl TestDocument {
        pub fn new(content: &str, value: i32) -> Self {
            Self {
                id: Uuid::new(),
                some_content: content.to_string(),
                some_content2: format!("{}-2", content),
                some_value: value,
                nested: Nested { some_amount: i64::from(value) * 10 },
            }
        }

        pub fn unsaved(content: &str) -> Self {
            Self {
                id: Uuid::from_bytes([0; 16]),
                ..Self::new(content, 0)
            }
        }
    }

    impl Document for TestDocument {
        type Key = Uuid;

        fn id(&self) -> &Uuid {
            &self.id
        }

        fn set_id(&mut self, id: Uuid) {
            self.id = id;
        }

        fn collection_name() -> String {
            default_collection_name("TestDocument")
        }
    }

    /// Document stored in a per-partition collection
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PartitionedDocument {
        #[serde(rename = "_id")]
        pub id: String,
        pub partition: String,
        pub some_content: String,
    }

    impl PartitionedDocument {
        pub fn new(partition: &str, content: &str) -> Self {
            Self {
                id: String::new(),
                partition: partition.to_string(),
                some_content: content.to_string(),
            }
        }
    }

    impl Document for PartitionedDocument {
        type Key = String;

        fn id(&self) -> &String {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn collection_name() -> String {
            default_collection_name("PartitionedDocument")
        }

        fn partition_key(&self) -> Option<&str> {
            Some(&self.partition)
        }
    }

    /// Document with a caller-assigned integer key
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TestDocumentWithKey {
        #[serde(rename = "_id")]
        pub id: i32,
        pub some_content: String,
    }

    impl Document for TestDocumentWithKey {
        type Key = i32;

        fn id(&self) -> &i32 {
            &self.id
        }

        fn set_id(&mut self, id: i32) {
            self.id = id;
        }

        fn collection_name() -> String {
            default_collection_name("TestDocumentWithKey")
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TestProjection {
        pub some_content: String,
        pub some_value: i32,
    }
}
