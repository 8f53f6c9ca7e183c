use std::{collections::HashMap, sync::Arc};

use messages::data::ModelInfo;
use parking_lot::RwLock;

use super::TopicModel;
use crate::error::{EngineErr, Result};

/// The named topic models owned by a master component.
///
/// Every model is an immutable snapshot, publishing replaces the snapshot behind
/// a name with a single pointer swap while readers holding the previous one keep
/// using it until they drop it.
#[derive(Debug, Default)]
pub struct ModelStore {
    models: RwLock<HashMap<String, Arc<TopicModel>>>,
}

impl ModelStore {
    /// Creates a new `ModelStore` out of already published snapshots.
    pub fn from_snapshot(models: HashMap<String, Arc<TopicModel>>) -> Self {
        Self {
            models: RwLock::new(models),
        }
    }

    /// Every published model.
    pub fn snapshot(&self) -> HashMap<String, Arc<TopicModel>> {
        self.models.read().clone()
    }

    /// The last published version of the model `name`.
    ///
    /// # Returns
    /// The snapshot or a `NotFound` error.
    pub fn get(&self, name: &str) -> Result<Arc<TopicModel>> {
        self.try_get(name)
            .ok_or_else(|| EngineErr::not_found("model", name))
    }

    pub fn try_get(&self, name: &str) -> Option<Arc<TopicModel>> {
        self.models.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.read().contains_key(name)
    }

    /// Publishes `model` under its name as the version following the current one.
    ///
    /// # Returns
    /// The published snapshot.
    pub fn publish(&self, model: TopicModel) -> Arc<TopicModel> {
        let mut published = self.publish_all(vec![model]);
        published.swap_remove(0)
    }

    /// Publishes every model at once, readers either see all of them or none.
    ///
    /// # Arguments
    /// * `models` - The models to publish, each one under its own name.
    ///
    /// # Returns
    /// The published snapshots in the same order.
    pub fn publish_all(&self, models: Vec<TopicModel>) -> Vec<Arc<TopicModel>> {
        let mut store = self.models.write();

        models
            .into_iter()
            .map(|mut model| {
                let version = store.get(model.name()).map_or(1, |prev| prev.version() + 1);
                model.set_version(version);

                let model = Arc::new(model);
                store.insert(model.name().to_string(), Arc::clone(&model));
                model
            })
            .collect()
    }

    /// Removes the model `name`, readers holding a snapshot are unaffected.
    pub fn remove(&self, name: &str) -> Result<Arc<TopicModel>> {
        self.models
            .write()
            .remove(name)
            .ok_or_else(|| EngineErr::not_found("model", name))
    }

    pub fn infos(&self) -> Vec<ModelInfo> {
        let mut infos: Vec<_> = self
            .models
            .read()
            .values()
            .map(|m| ModelInfo {
                name: m.name().to_string(),
                version: m.version(),
                num_topics: m.num_topics(),
                num_tokens: m.num_tokens(),
            })
            .collect();

        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

#[cfg(test)]
mod tests {
    use messages::data::Token;

    use super::*;

    fn model(name: &str) -> TopicModel {
        TopicModel::zeros(name, vec!["t".into()], vec![Token::keyword("w")]).unwrap()
    }

    #[test]
    fn publish_increments_versions() {
        let store = ModelStore::default();

        assert_eq!(store.publish(model("pwt")).version(), 1);
        assert_eq!(store.publish(model("pwt")).version(), 2);
        assert_eq!(store.publish(model("nwt")).version(), 1);
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let store = ModelStore::default();
        store.publish(model("pwt"));

        let snapshot = store.get("pwt").unwrap();
        store.publish(model("pwt"));
        store.remove("pwt").unwrap();

        assert_eq!(snapshot.version(), 1);
        assert_eq!(
            store.get("pwt").unwrap_err().kind(),
            crate::ErrorKind::NotFound
        );
    }
}
