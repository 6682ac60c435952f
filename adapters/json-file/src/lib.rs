//! json-file: file-backed implementation of the CollectionRepository port.
//!
//! Purpose
//! - Serve the mock collection endpoint from a plain JSON file
//!   (`data/cities.json`) and mutate it in place on every write.
//! - Implements the `CollectionRepository` trait from the `domain` crate.
//!
//! Notes
//! - The file is either a bare array (one collection named after the file
//!   stem) or an object whose array-valued keys are collections. Whatever
//!   layout was read is the layout written back; non-array keys of an object
//!   file are carried through untouched.
//! - Writes go to a sibling temp file and are renamed over the original.
//!   A write that fails leaves both the file and the in-memory copy as they
//!   were before the call.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use domain::adapters::memory_repo::InMemoryRepo;
use domain::{CollectionName, CollectionRepository, CoreError, Record, RecordId};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Shape of the backing file.
#[derive(Clone, Debug, PartialEq)]
enum Layout {
    Array(CollectionName),
    /// Top-level keys in file order.
    Object(Vec<Entry>),
}

#[derive(Clone, Debug, PartialEq)]
enum Entry {
    Collection(CollectionName),
    /// Non-collection key, written back verbatim.
    Extra(String, Value),
}

/// JSON-file-backed repository for the mock endpoint.
pub struct JsonFileRepo {
    path: PathBuf,
    layout: Layout,
    mem: InMemoryRepo,
    // Held across mutate + persist so file writes land in mutation order
    write_lock: Mutex<()>,
}

impl JsonFileRepo {
    /// Open the data file at `path`. A missing file starts as an empty array
    /// collection named after the file stem and is created immediately.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();
        let mem = InMemoryRepo::new();
        let layout = match fs::read_to_string(&path) {
            Ok(text) => {
                let doc: Value = serde_json::from_str(&text).map_err(map_json_err)?;
                load_document(doc, &path, &mem)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let name = stem_name(&path)?;
                mem.seed(name.clone(), Vec::new())?;
                Layout::Array(name)
            }
            Err(e) => return Err(map_io_err(e)),
        };

        let repo = Self {
            path,
            layout,
            mem,
            write_lock: Mutex::new(()),
        };
        if !repo.path.exists() {
            repo.persist()?;
        }
        let collections = repo.mem.collections()?;
        info!(path = %repo.path.display(), ?collections, "json data file loaded");
        Ok(repo)
    }

    /// Apply `f` to the in-memory copy and write the result to disk. If the
    /// write fails the in-memory copy is restored.
    fn mutate<T>(&self, f: impl FnOnce(&InMemoryRepo) -> Result<T, CoreError>) -> Result<T, CoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let before = self.mem.snapshot()?;
        let out = f(&self.mem)?;
        if let Err(e) = self.persist() {
            for (name, records) in before {
                self.mem.seed(name, records)?;
            }
            warn!(path = %self.path.display(), err = %e, "json data file write failed; change rolled back");
            return Err(e);
        }
        Ok(out)
    }

    fn persist(&self) -> Result<(), CoreError> {
        let doc = self.document()?;
        let text = serde_json::to_string_pretty(&doc).map_err(map_json_err)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(map_io_err)?;
        fs::rename(&tmp, &self.path).map_err(map_io_err)?;
        debug!(path = %self.path.display(), "json data file written");
        Ok(())
    }

    fn document(&self) -> Result<Value, CoreError> {
        let mut snapshot = self.mem.snapshot()?;
        match &self.layout {
            Layout::Array(name) => {
                let records = snapshot
                    .into_iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, r)| r)
                    .unwrap_or_default();
                Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
            }
            Layout::Object(entries) => {
                let mut out = Map::new();
                for entry in entries {
                    match entry {
                        Entry::Collection(name) => {
                            if let Some(pos) = snapshot.iter().position(|(n, _)| n == name) {
                                let (_, records) = snapshot.swap_remove(pos);
                                out.insert(
                                    name.as_str().to_string(),
                                    Value::Array(records.into_iter().map(Value::Object).collect()),
                                );
                            }
                        }
                        Entry::Extra(key, value) => {
                            out.insert(key.clone(), value.clone());
                        }
                    }
                }
                Ok(Value::Object(out))
            }
        }
    }
}

fn load_document(doc: Value, path: &Path, mem: &InMemoryRepo) -> Result<Layout, CoreError> {
    match doc {
        Value::Array(items) => {
            let name = stem_name(path)?;
            mem.seed(name.clone(), into_records(items)?)?;
            Ok(Layout::Array(name))
        }
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                match (CollectionName::new(key.clone()), value) {
                    (Ok(name), Value::Array(items)) => {
                        mem.seed(name.clone(), into_records(items)?)?;
                        entries.push(Entry::Collection(name));
                    }
                    (_, value) => entries.push(Entry::Extra(key, value)),
                }
            }
            Ok(Layout::Object(entries))
        }
        _ => Err(CoreError::Repository(
            "data file must hold a JSON array or object".into(),
        )),
    }
}

fn into_records(items: Vec<Value>) -> Result<Vec<Record>, CoreError> {
    items
        .into_iter()
        .map(|v| match v {
            Value::Object(r) => Ok(r),
            _ => Err(CoreError::InvalidRecord("collection entries must be objects".into())),
        })
        .collect()
}

fn stem_name(path: &Path) -> Result<CollectionName, CoreError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CoreError::Repository("data file has no usable name".into()))?;
    CollectionName::new(stem)
}

fn map_io_err(e: std::io::Error) -> CoreError {
    CoreError::Repository(format!("io: {}", e))
}

fn map_json_err(e: serde_json::Error) -> CoreError {
    CoreError::Repository(format!("json: {}", e))
}

impl CollectionRepository for JsonFileRepo {
    fn collections(&self) -> Result<Vec<CollectionName>, CoreError> {
        self.mem.collections()
    }

    fn list(&self, collection: &CollectionName) -> Result<Vec<Record>, CoreError> {
        self.mem.list(collection)
    }

    fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Record>, CoreError> {
        self.mem.get(collection, id)
    }

    fn insert(&self, collection: &CollectionName, record: Record) -> Result<(), CoreError> {
        self.mutate(|mem| mem.insert(collection, record))
    }

    fn replace(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        record: Record,
    ) -> Result<(), CoreError> {
        self.mutate(|mem| mem.replace(collection, id, record))
    }

    fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<(), CoreError> {
        self.mutate(|mem| mem.delete(collection, id))
    }
}
