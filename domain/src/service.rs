use serde_json::Value;

use crate::validate::{field_at, validate_record, value_text};
use crate::{CollectionName, CollectionRepository, CoreError, IdGenerator, Record, RecordId, ID_FIELD};

/// Filters applied when listing a collection.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    /// `(field path, expected text)` pairs; all must match.
    pub filters: Vec<(String, String)>,
    pub limit: Option<usize>,
}

impl ListQuery {
    fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|(path, expected)| {
            field_at(record, path).is_some_and(|v| value_text(v) == *expected)
        })
    }
}

/// Application service behind the mock collection endpoint.
///
/// Generic over repository and id generator. Assigns ids to new records and
/// keeps the id of a replaced record stable; everything else is passed
/// through to storage.
pub struct CollectionService<R: CollectionRepository, G: IdGenerator> {
    repo: R,
    ids: G,
}

impl<R: CollectionRepository, G: IdGenerator> CollectionService<R, G> {
    pub fn new(repo: R, ids: G) -> Self {
        Self { repo, ids }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// List a collection, filtered and truncated per `query`.
    pub fn list(&self, collection: &CollectionName, query: &ListQuery) -> Result<Vec<Record>, CoreError> {
        let items = self.repo.list(collection)?;
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(items
            .into_iter()
            .filter(|r| query.matches(r))
            .take(limit)
            .collect())
    }

    pub fn get(&self, collection: &CollectionName, id: &RecordId) -> Result<Record, CoreError> {
        self.repo.get(collection, id)?.ok_or(CoreError::NotFound)
    }

    /// Store a new record, assigning an id unless the body carries one.
    pub fn create(&self, collection: &CollectionName, body: Value) -> Result<Record, CoreError> {
        let record = validate_record(body)?;
        if RecordId::of(&record).is_some() {
            self.repo.insert(collection, record.clone())?;
            return Ok(record);
        }

        // Another writer may take the proposed id between list and insert; retry on collision
        for _ in 0..100 {
            let existing: Vec<RecordId> = self
                .repo
                .list(collection)?
                .iter()
                .filter_map(RecordId::of)
                .collect();
            let id = self.ids.next_id(&existing);
            if existing.contains(&id) {
                continue;
            }
            let mut candidate = record.clone();
            candidate.insert(ID_FIELD.to_string(), id.to_value());
            match self.repo.insert(collection, candidate.clone()) {
                Ok(()) => return Ok(candidate),
                Err(CoreError::AlreadyExists) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CoreError::Repository("failed to generate unique id".into()))
    }

    /// Replace a record wholesale. The stored id is kept regardless of the body.
    pub fn replace(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        body: Value,
    ) -> Result<Record, CoreError> {
        let mut record = validate_record(body)?;
        let stored = self.get(collection, id)?;
        let stored_id = stored.get(ID_FIELD).cloned().unwrap_or_else(|| id.to_value());
        record.insert(ID_FIELD.to_string(), stored_id);
        self.repo.replace(collection, id, record.clone())?;
        Ok(record)
    }

    pub fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<(), CoreError> {
        self.repo.delete(collection, id)
    }
}
