use std::{collections::HashMap, path::Path, sync::Arc};

use messages::data::{DictionaryData, DictionaryInfo};
use parking_lot::RwLock;

use super::Dictionary;
use crate::{
    error::{EngineErr, Result},
    storage::{read_payload, write_payload},
};

/// The named dictionaries owned by a master component.
///
/// Dictionaries are shared as immutable snapshots, disposing one only removes
/// its name.
#[derive(Debug, Default)]
pub struct DictionaryStore {
    dictionaries: RwLock<HashMap<String, Arc<Dictionary>>>,
}

impl DictionaryStore {
    pub fn from_snapshot(dictionaries: HashMap<String, Arc<Dictionary>>) -> Self {
        Self {
            dictionaries: RwLock::new(dictionaries),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, Arc<Dictionary>> {
        self.dictionaries.read().clone()
    }

    /// Registers `dictionary` under its name.
    ///
    /// # Returns
    /// An `AlreadyExists` error if the name is taken.
    pub fn insert(&self, dictionary: Dictionary) -> Result<Arc<Dictionary>> {
        let mut dictionaries = self.dictionaries.write();

        if dictionaries.contains_key(dictionary.name()) {
            return Err(EngineErr::already_exists("dictionary", dictionary.name()));
        }

        let dictionary = Arc::new(dictionary);
        dictionaries.insert(dictionary.name().to_string(), Arc::clone(&dictionary));
        Ok(dictionary)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Dictionary>> {
        self.dictionaries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineErr::not_found("dictionary", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dictionaries.read().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Result<Arc<Dictionary>> {
        self.dictionaries
            .write()
            .remove(name)
            .ok_or_else(|| EngineErr::not_found("dictionary", name))
    }

    /// Writes the dictionary `name` to `path`.
    pub fn export(&self, name: &str, path: &Path) -> Result<()> {
        let dictionary = self.get(name)?;
        write_payload(path, &dictionary.to_data())
    }

    /// Reads a dictionary exported with `export` and registers it as `name`.
    pub fn import(&self, name: &str, path: &Path) -> Result<Arc<Dictionary>> {
        if self.contains(name) {
            return Err(EngineErr::already_exists("dictionary", name));
        }

        let mut data: DictionaryData = read_payload(path)?;
        data.name = name.to_string();
        self.insert(Dictionary::from_data(data)?)
    }

    pub fn infos(&self) -> Vec<DictionaryInfo> {
        let mut infos: Vec<_> = self
            .dictionaries
            .read()
            .values()
            .map(|d| DictionaryInfo {
                name: d.name().to_string(),
                num_entries: d.len(),
            })
            .collect();

        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

#[cfg(test)]
mod tests {
    use messages::data::{DictionaryEntry, Token};

    use super::*;

    fn dictionary(name: &str) -> Dictionary {
        Dictionary::from_data(DictionaryData {
            name: name.into(),
            entries: vec![DictionaryEntry {
                token: Token::keyword("a"),
                value: 1.,
                tf: 4.,
                df: 2.,
            }],
            num_items: 2,
        })
        .unwrap()
    }

    #[test]
    fn names_are_unique() {
        let store = DictionaryStore::default();
        store.insert(dictionary("d")).unwrap();

        let err = store.insert(dictionary("d")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::AlreadyExists);
    }

    #[test]
    fn export_import_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.dict");
        let store = DictionaryStore::default();
        store.insert(dictionary("d")).unwrap();

        store.export("d", &path).unwrap();
        let imported = store.import("copy", &path).unwrap();

        assert_eq!(imported.entries(), store.get("d").unwrap().entries());
        assert_eq!(imported.num_items(), 2);
    }

    #[test]
    fn holders_keep_disposed_dictionaries() {
        let store = DictionaryStore::default();
        store.insert(dictionary("d")).unwrap();

        let held = store.get("d").unwrap();
        store.remove("d").unwrap();

        assert_eq!(held.len(), 1);
        assert_eq!(store.get("d").unwrap_err().kind(), crate::ErrorKind::NotFound);
    }
}
