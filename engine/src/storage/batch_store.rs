use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use messages::data::{Batch, BatchInfo};
use parking_lot::RwLock;

use super::{read_payload, write_payload};
use crate::error::{EngineErr, Result};

/// Extension of the batch files written by `save_batch`.
const BATCH_EXTENSION: &str = "batch";

/// Checks the structure of a batch, malformed items are not rejected here since
/// they are skipped one by one during processing.
pub fn validate_batch(batch: &Batch) -> Result<()> {
    if batch.id.is_empty() {
        return Err(EngineErr::invalid("a batch needs a non empty id"));
    }

    if !batch.class_ids.is_empty() && batch.class_ids.len() != batch.tokens.len() {
        return Err(EngineErr::invalid(format!(
            "batch {} has {} tokens but {} class ids",
            batch.id,
            batch.tokens.len(),
            batch.class_ids.len()
        )));
    }

    Ok(())
}

/// Writes `batch` into `folder` as `<id>.batch`.
///
/// # Returns
/// The path of the written file.
pub fn save_batch(folder: &Path, batch: &Batch) -> Result<PathBuf> {
    validate_batch(batch)?;
    let path = folder.join(&batch.id).with_extension(BATCH_EXTENSION);
    write_payload(&path, batch)?;
    Ok(path)
}

/// Reads a batch file written by `save_batch`.
pub fn load_batch(path: &Path) -> Result<Batch> {
    let batch = read_payload(path)?;
    validate_batch(&batch)?;
    Ok(batch)
}

/// The immutable batches imported into a master component.
#[derive(Debug, Default)]
pub struct BatchStore {
    batches: RwLock<HashMap<String, Arc<Batch>>>,
}

impl BatchStore {
    pub fn from_snapshot(batches: HashMap<String, Arc<Batch>>) -> Self {
        Self {
            batches: RwLock::new(batches),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, Arc<Batch>> {
        self.batches.read().clone()
    }

    /// Registers every batch under its id, either all of them or none.
    ///
    /// # Returns
    /// An `InvalidConfig` error for malformed batches or an `AlreadyExists` error
    /// if an id is repeated or already registered.
    pub fn import(&self, batches: Vec<Batch>) -> Result<()> {
        let mut ids = HashSet::with_capacity(batches.len());

        for batch in &batches {
            validate_batch(batch)?;

            if !ids.insert(batch.id.as_str()) {
                return Err(EngineErr::already_exists("batch", batch.id.as_str()));
            }
        }

        let mut store = self.batches.write();
        if let Some(batch) = batches.iter().find(|b| store.contains_key(&b.id)) {
            return Err(EngineErr::already_exists("batch", batch.id.as_str()));
        }

        for batch in batches {
            store.insert(batch.id.clone(), Arc::new(batch));
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Batch>> {
        self.batches.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Result<Arc<Batch>> {
        self.batches
            .write()
            .remove(name)
            .ok_or_else(|| EngineErr::not_found("batch", name))
    }

    /// Every registered batch ordered by id.
    pub fn all(&self) -> Vec<Arc<Batch>> {
        let mut batches: Vec<_> = self.batches.read().values().cloned().collect();
        batches.sort_by(|a, b| a.id.cmp(&b.id));
        batches
    }

    /// Resolves batch names into snapshots.
    ///
    /// Each name is looked up among the registered batches first and treated as
    /// the path of a batch file otherwise.
    ///
    /// # Arguments
    /// * `names` - The batches to resolve, empty means every registered batch.
    /// * `folder` - Every batch file of this folder is appended when given.
    ///
    /// # Returns
    /// The batches in the requested order or a `NotFound` error.
    pub fn resolve(&self, names: &[String], folder: Option<&Path>) -> Result<Vec<Arc<Batch>>> {
        let mut batches = if names.is_empty() && folder.is_none() {
            self.all()
        } else {
            names
                .iter()
                .map(|name| match self.get(name) {
                    Some(batch) => Ok(batch),
                    None if Path::new(name).is_file() => load_batch(Path::new(name)).map(Arc::new),
                    None => Err(EngineErr::not_found("batch", name.as_str())),
                })
                .collect::<Result<Vec<_>>>()?
        };

        if let Some(folder) = folder {
            batches.extend(Self::load_folder(folder)?);
        }

        Ok(batches)
    }

    /// Checks that every name is an imported batch or a batch file, without
    /// loading anything.
    pub fn check(&self, names: &[String]) -> Result<()> {
        let batches = self.batches.read();
        match names
            .iter()
            .find(|name| !batches.contains_key(*name) && !Path::new(name).is_file())
        {
            Some(name) => Err(EngineErr::not_found("batch", name.as_str())),
            None => Ok(()),
        }
    }

    /// Loads every batch file of `folder` ordered by file name.
    pub fn load_folder(folder: &Path) -> Result<Vec<Arc<Batch>>> {
        let entries = fs::read_dir(folder).map_err(|e| EngineErr::disk(folder, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| EngineErr::disk(folder, e))?.path();
            if path.extension().is_some_and(|ext| ext == BATCH_EXTENSION) {
                paths.push(path);
            }
        }

        paths.sort();
        paths
            .iter()
            .map(|path| load_batch(path).map(Arc::new))
            .collect()
    }

    pub fn infos(&self) -> Vec<BatchInfo> {
        self.all()
            .iter()
            .map(|b| BatchInfo {
                name: b.id.clone(),
                num_items: b.items.len(),
            })
            .collect()
    }
}
