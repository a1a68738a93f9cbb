//! MongoDB client and collection wrapper
//!
//! Typed collections apply schema-declared indexes at startup, so the
//! uniqueness invariants (one active challenge per user, one check-in per
//! challenge-day, unique habit order) hold even when two requests race.
//! Store errors are classified once here: duplicate-key violations become
//! `Conflict`, lost connections become `DatabaseUnavailable`, everything
//! else is a generic `Database` error whose detail stays in the logs.

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use mongodb::{
    error::ErrorKind,
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::StrideError;

/// Collection holding the id sequences for all other collections
pub const COUNTER_COLLECTION: &str = "counters";

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Map a MongoDB driver error onto the Stride taxonomy
pub(crate) fn classify_mongo_error(e: mongodb::error::Error) -> StrideError {
    if matches!(
        e.kind.as_ref(),
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_)
    ) {
        return StrideError::DatabaseUnavailable;
    }

    let text = e.to_string();
    if text.contains("E11000") || text.contains("duplicate key") {
        return StrideError::Conflict("duplicate key".into());
    }

    StrideError::Database(text)
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, StrideError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(classify_mongo_error)?;

        // Verify connection before serving traffic
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(classify_mongo_error)?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, StrideError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Allocate the next value of a named id sequence.
    ///
    /// Route parameters carry integer ids, so documents get an i64 `id`
    /// allocated here in addition to the store's own `_id`.
    pub async fn next_id(&self, sequence: &str) -> Result<i64, StrideError> {
        let counters: Collection<Document> = self
            .client
            .database(&self.db_name)
            .collection(COUNTER_COLLECTION);

        let updated = counters
            .find_one_and_update(doc! { "_id": sequence }, doc! { "$inc": { "seq": 1i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(classify_mongo_error)?;

        let counter = updated.ok_or_else(|| {
            StrideError::Database(format!("counter '{}' missing after upsert", sequence))
        })?;

        match counter.get("seq") {
            Some(Bson::Int64(v)) => Ok(*v),
            Some(Bson::Int32(v)) => Ok(i64::from(*v)),
            other => Err(StrideError::Database(format!(
                "counter '{}' holds non-integer value: {:?}",
                sequence, other
            ))),
        }
    }

    /// Liveness check against the store
    pub async fn ping(&self) -> Result<(), StrideError> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(classify_mongo_error)
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, StrideError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), StrideError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(classify_mongo_error)?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, StrideError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(classify_mongo_error)?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StrideError::Database("Failed to get inserted ID".into()))
    }

    /// Insert several documents atomically (ordered), setting metadata timestamps
    pub async fn insert_many(&self, items: Vec<T>) -> Result<usize, StrideError> {
        let stamped: Vec<T> = items
            .into_iter()
            .map(|mut item| {
                let metadata = item.mut_metadata();
                metadata.is_deleted = false;
                metadata.created_at = Some(DateTime::now());
                metadata.updated_at = Some(DateTime::now());
                item
            })
            .collect();

        let result = self
            .inner
            .insert_many(stamped)
            .await
            .map_err(classify_mongo_error)?;

        Ok(result.inserted_ids.len())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, StrideError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(classify_mongo_error)
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, StrideError> {
        self.find_many_sorted(filter, None).await
    }

    /// Find many documents by filter with an optional sort order
    pub async fn find_many_sorted(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<T>, StrideError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let mut find = self.inner.find(full_filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }

        let mut cursor = find.await.map_err(classify_mongo_error)?;

        let mut results = Vec::new();
        while cursor.advance().await.map_err(classify_mongo_error)? {
            match cursor.deserialize_current() {
                Ok(item) => results.push(item),
                Err(e) => {
                    error!("Error reading document: {}", e);
                }
            }
        }

        Ok(results)
    }

    /// Update one document, refreshing its updated_at stamp
    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, StrideError> {
        let mut update = update;
        if let Ok(set) = update.get_document_mut("$set") {
            set.insert("metadata.updated_at", DateTime::now());
        } else {
            update.insert("$set", doc! { "metadata.updated_at": DateTime::now() });
        }

        self.inner
            .update_one(filter, UpdateModifications::Document(update))
            .await
            .map_err(classify_mongo_error)
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    // Collection behavior needs a running MongoDB instance and is covered
    // by deployment smoke tests; the error classification is testable here
    // only through its string fallback, exercised in routes tests via
    // StrideError variants directly.
}
