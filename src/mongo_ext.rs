use std::ops::{Deref, DerefMut};

use bson::oid::ObjectId;
use mongodb::error::{ErrorKind, WriteFailure};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;

/// Thin wrapper around `mongodb::Collection` carrying the query helpers the
/// route handlers share.
pub struct Collection<T>(pub mongodb::Collection<T>);

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Collection<T> {
    type Target = mongodb::Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Collection<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> From<mongodb::Collection<T>> for Collection<T> {
    fn from(value: mongodb::Collection<T>) -> Self {
        Self(value)
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Unpin,
{
    pub async fn find_all(&self, filter: impl Into<Option<bson::Document>>) -> Result<Vec<T>, Error> {
        let mut cursor = self.find(filter, None).await?;

        let mut documents = vec![];

        while cursor.advance().await? {
            documents.push(cursor.deserialize_current()?);
        }

        Ok(documents)
    }

    pub async fn find_one_by_id(&self, id: ObjectId) -> Result<Option<T>, Error> {
        self.find_one(bson::doc! { "_id": id }, None)
            .await
            .map_err(Into::into)
    }

    /// Insert relying on a unique index, mapping the duplicate-key write
    /// failure to a 409 for `what`.
    pub async fn insert_unique(&self, document: &T, what: &'static str) -> Result<(), Error> {
        match self.insert_one(document, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::AlreadyExists(what)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_one_by_id(&self, id: ObjectId) -> Result<u64, Error> {
        self.delete_one(bson::doc! { "_id": id }, None)
            .await
            .map(|it| it.deleted_count)
            .map_err(Into::into)
    }
}

pub fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == 11000,
        ErrorKind::Command(command) => command.code == 11000,
        _ => false,
    }
}
