use std::sync::Arc;

use log::info;
use messages::{
    args::{ExportModelArgs, GetTopicModelArgs, ImportModelArgs, InitializeModelArgs},
    data::TopicModelData,
};

use super::MasterComponent;
use crate::{
    error::{EngineErr, Result},
    initialization::initial_model,
    storage::{TopicModel, read_payload, write_payload},
};

impl MasterComponent {
    fn model_name(&self, name: Option<&str>) -> String {
        name.map_or_else(|| self.settings().config.pwt_name.clone(), str::to_string)
    }

    /// Publishes a model given in its transferable form.
    ///
    /// # Arguments
    /// * `data` - The model weights.
    /// * `name` - Overrides the name carried by `data`.
    ///
    /// # Returns
    /// The published version or an `InvalidConfig` error for malformed weights.
    pub fn overwrite_model(&self, mut data: TopicModelData, name: Option<&str>) -> Result<u64> {
        let _guard = self.lock();
        if let Some(name) = name {
            data.name = name.to_string();
        }

        let model = TopicModel::from_data(data)?;
        Ok(self.models.publish(model).version())
    }

    /// Publishes a normalized model over the vocabulary of a dictionary.
    pub fn initialize_model(&self, args: &InitializeModelArgs) -> Result<u64> {
        let _guard = self.lock();
        let settings = self.settings();
        let dictionary = self.dictionaries.get(&args.dictionary_name)?;

        let name = self.model_name(args.model_name.as_deref());
        let topic_names = if args.topic_names.is_empty() {
            settings.config.topic_names.clone()
        } else {
            args.topic_names.clone()
        };

        let model = initial_model(
            &name,
            topic_names,
            dictionary.tokens().cloned().collect(),
            args.method,
            args.seed.unwrap_or(settings.config.seed),
        )?;

        let model = self.models.publish(model);
        info!(
            master_id = self.id(), version = model.version();
            "initialized {name} from dictionary {}", dictionary.name()
        );
        Ok(model.version())
    }

    pub fn export_model(&self, args: &ExportModelArgs) -> Result<()> {
        let name = self.model_name(args.model_name.as_deref());
        let model = self.models.get(&name)?;

        write_payload(&args.file_name, &model.to_data(&GetTopicModelArgs::default())?)
    }

    /// Publishes a model read from disk, under its stored name unless one is given.
    pub fn import_model(&self, args: &ImportModelArgs) -> Result<u64> {
        let mut data: TopicModelData = read_payload(&args.file_name)?;
        if let Some(name) = &args.model_name {
            data.name = name.clone();
        }

        self.overwrite_model(data, None)
    }

    /// Removes a model together with every cached result derived from it.
    pub fn dispose_model(&self, name: &str) -> Result<()> {
        let _guard = self.lock();
        self.models.remove(name)?;
        self.caches.clear_model(name);
        Ok(())
    }

    pub fn topic_model(&self, args: &GetTopicModelArgs) -> Result<TopicModelData> {
        let name = self.model_name(args.model_name.as_deref());
        self.models.get(&name)?.to_data(args)
    }

    pub(super) fn require_model(&self, name: Option<&str>) -> Result<Arc<TopicModel>> {
        let name = self.model_name(name);
        self.models
            .try_get(&name)
            .ok_or_else(|| EngineErr::not_found("model", name))
    }
}
