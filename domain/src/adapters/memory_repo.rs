use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{CollectionName, CollectionRepository, CoreError, Record, RecordId};

/// Simple in-memory repository. A single mutex guards every collection, so
/// each call is atomic on its own but sequences of calls are not.
pub struct InMemoryRepo {
    inner: Mutex<BTreeMap<CollectionName, Vec<Record>>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create or overwrite a collection with the given records.
    pub fn seed(&self, collection: CollectionName, records: Vec<Record>) -> Result<(), CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        map.insert(collection, records);
        Ok(())
    }

    /// Copy of every collection, used by adapters that persist the whole set.
    pub fn snapshot(&self) -> Result<Vec<(CollectionName, Vec<Record>)>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn with_collection<T>(
        &self,
        collection: &CollectionName,
        f: impl FnOnce(&mut Vec<Record>) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let records = map.get_mut(collection).ok_or(CoreError::NotFound)?;
        f(records)
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn position_of(records: &[Record], id: &RecordId) -> Option<usize> {
    records
        .iter()
        .position(|r| RecordId::of(r).as_ref() == Some(id))
}

impl CollectionRepository for InMemoryRepo {
    fn collections(&self) -> Result<Vec<CollectionName>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.keys().cloned().collect())
    }

    fn list(&self, collection: &CollectionName) -> Result<Vec<Record>, CoreError> {
        self.with_collection(collection, |records| Ok(records.clone()))
    }

    fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Record>, CoreError> {
        self.with_collection(collection, |records| {
            Ok(position_of(records, id).map(|i| records[i].clone()))
        })
    }

    fn insert(&self, collection: &CollectionName, record: Record) -> Result<(), CoreError> {
        let id = RecordId::of(&record).ok_or(CoreError::InvalidId)?;
        self.with_collection(collection, |records| {
            if position_of(records, &id).is_some() {
                return Err(CoreError::AlreadyExists);
            }
            records.push(record);
            Ok(())
        })
    }

    fn replace(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        record: Record,
    ) -> Result<(), CoreError> {
        self.with_collection(collection, |records| match position_of(records, id) {
            Some(i) => {
                records[i] = record;
                Ok(())
            }
            None => Err(CoreError::NotFound),
        })
    }

    fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<(), CoreError> {
        self.with_collection(collection, |records| match position_of(records, id) {
            Some(i) => {
                records.remove(i);
                Ok(())
            }
            None => Err(CoreError::NotFound),
        })
    }
}
