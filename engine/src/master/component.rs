use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use log::info;
use messages::{
    args::{
        ExportDictionaryArgs, FilterDictionaryArgs, GatherDictionaryArgs, GetDictionaryArgs,
        ImportBatchesArgs, ImportDictionaryArgs,
    },
    data::DictionaryData,
    specs::{MasterModelConfig, RegularizerConfig},
};
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::{
    cache::ResultCaches,
    config::Settings,
    dictionary::{Dictionary, DictionaryStore},
    error::{EngineErr, Result},
    processing::WorkerPool,
    storage::{BatchStore, ModelStore},
    training::Trainer,
};

/// One topic model instance.
pub struct MasterComponent {
    id: AtomicU64,
    pub(super) settings: RwLock<Arc<Settings>>,
    pub(super) models: Arc<ModelStore>,
    pub(super) dictionaries: Arc<DictionaryStore>,
    pub(super) batches: Arc<BatchStore>,
    pub(super) caches: Arc<ResultCaches>,
    pub(super) pool: Arc<WorkerPool>,
    pub(super) mutation: Arc<Mutex<()>>,
    pub(super) attachment: Arc<Mutex<()>>,
}

impl std::fmt::Debug for MasterComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterComponent")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl MasterComponent {
    /// Creates a new `MasterComponent`.
    ///
    /// # Arguments
    /// * `config` - The configuration of the component.
    /// * `pool` - The process wide worker pool.
    ///
    /// # Returns
    /// The component or an `InvalidConfig` error, nothing is created on failure.
    pub fn new(config: MasterModelConfig, pool: Arc<WorkerPool>) -> Result<Self> {
        let settings = Settings::new(config)?;
        let caches = ResultCaches::new(&settings.config);

        Ok(Self {
            id: AtomicU64::new(0),
            settings: RwLock::new(Arc::new(settings)),
            models: Arc::default(),
            dictionaries: Arc::default(),
            batches: Arc::default(),
            caches: Arc::new(caches),
            pool,
            mutation: Arc::default(),
            attachment: Arc::default(),
        })
    }

    /// Creates a copy of the component sharing nothing mutable with it.
    ///
    /// Models, dictionaries and batches are immutable snapshots so the copy
    /// references the same ones, the result caches start empty.
    pub fn duplicate(&self) -> Self {
        let _guard = self.mutation.lock();
        let settings = self.settings();

        Self {
            id: AtomicU64::new(0),
            caches: Arc::new(ResultCaches::new(&settings.config)),
            settings: RwLock::new(settings),
            models: Arc::new(ModelStore::from_snapshot(self.models.snapshot())),
            dictionaries: Arc::new(DictionaryStore::from_snapshot(self.dictionaries.snapshot())),
            batches: Arc::new(BatchStore::from_snapshot(self.batches.snapshot())),
            pool: Arc::clone(&self.pool),
            mutation: Arc::default(),
            attachment: Arc::default(),
        }
    }

    pub(crate) fn bind(&self, id: u64) {
        self.id.store(id, Ordering::Relaxed);
    }

    pub fn id(&self) -> u64 {
        self.id.load(Ordering::Relaxed)
    }

    /// The current configuration derived state.
    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.read())
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutation.lock()
    }

    /// A trainer over the current snapshots of the component.
    pub fn trainer(&self) -> Trainer {
        Trainer::new(
            self.id(),
            self.settings(),
            Arc::clone(&self.models),
            self.dictionaries.snapshot(),
            Arc::clone(&self.caches),
            Arc::clone(&self.pool),
        )
    }

    fn swap_settings(&self, config: MasterModelConfig) -> Result<()> {
        let settings = Settings::new(config)?;
        self.caches.configure(&settings.config);
        *self.settings.write() = Arc::new(settings);
        Ok(())
    }

    /// Replaces the configuration of the component, trained models are kept.
    pub fn reconfigure(&self, config: MasterModelConfig) -> Result<()> {
        let _guard = self.lock();
        self.swap_settings(config)?;

        info!(master_id = self.id(); "reconfigured");
        Ok(())
    }

    /// Registers a new regularizer after the existing ones.
    ///
    /// # Returns
    /// An `AlreadyExists` error if the name is taken or an `InvalidConfig` error.
    pub fn create_regularizer(&self, regularizer: RegularizerConfig) -> Result<()> {
        let _guard = self.lock();
        let mut config = self.settings().config.clone();

        if config.regularizers.iter().any(|r| r.name == regularizer.name) {
            return Err(EngineErr::already_exists("regularizer", regularizer.name));
        }

        config.regularizers.push(regularizer);
        self.swap_settings(config)
    }

    /// Replaces a regularizer keeping its position, the change only affects
    /// future training steps.
    pub fn reconfigure_regularizer(&self, regularizer: RegularizerConfig) -> Result<()> {
        let _guard = self.lock();
        let mut config = self.settings().config.clone();

        let slot = config
            .regularizers
            .iter_mut()
            .find(|r| r.name == regularizer.name)
            .ok_or_else(|| EngineErr::not_found("regularizer", regularizer.name.as_str()))?;
        *slot = regularizer;

        self.swap_settings(config)
    }

    pub fn dispose_regularizer(&self, name: &str) -> Result<()> {
        let _guard = self.lock();
        let mut config = self.settings().config.clone();

        let before = config.regularizers.len();
        config.regularizers.retain(|r| r.name != name);
        if config.regularizers.len() == before {
            return Err(EngineErr::not_found("regularizer", name));
        }

        self.swap_settings(config)
    }

    /// Gathers a dictionary over the given batches.
    pub fn gather_dictionary(&self, args: &GatherDictionaryArgs) -> Result<()> {
        let _guard = self.lock();
        if self.dictionaries.contains(&args.dictionary_target_name) {
            return Err(EngineErr::already_exists(
                "dictionary",
                args.dictionary_target_name.as_str(),
            ));
        }

        let batches = self
            .batches
            .resolve(&args.batch_names, args.batch_folder.as_deref())?;
        let dictionary =
            Dictionary::gather(args.dictionary_target_name.as_str(), &batches, &self.pool)?;

        info!(
            master_id = self.id();
            "gathered dictionary {} with {} tokens over {} batches",
            dictionary.name(),
            dictionary.len(),
            batches.len()
        );
        self.dictionaries.insert(dictionary)?;
        Ok(())
    }

    /// Stores a filtered copy of a dictionary under a new name.
    pub fn filter_dictionary(&self, args: &FilterDictionaryArgs) -> Result<()> {
        let _guard = self.lock();
        let source = self.dictionaries.get(&args.dictionary_name)?;

        if self.dictionaries.contains(&args.dictionary_target_name) {
            return Err(EngineErr::already_exists(
                "dictionary",
                args.dictionary_target_name.as_str(),
            ));
        }

        let filtered = source.filter(args.dictionary_target_name.as_str(), args)?;
        self.dictionaries.insert(filtered)?;
        Ok(())
    }

    /// Stores a dictionary built out of its transferable form.
    ///
    /// # Arguments
    /// * `data` - The dictionary.
    /// * `name` - Overrides the name carried by `data`.
    pub fn create_dictionary(&self, mut data: DictionaryData, name: Option<&str>) -> Result<()> {
        let _guard = self.lock();
        if let Some(name) = name {
            data.name = name.to_string();
        }

        self.dictionaries.insert(Dictionary::from_data(data)?)?;
        Ok(())
    }

    pub fn dictionary(&self, args: &GetDictionaryArgs) -> Result<DictionaryData> {
        Ok(self.dictionaries.get(&args.dictionary_name)?.to_data())
    }

    pub fn import_dictionary(&self, args: &ImportDictionaryArgs) -> Result<()> {
        let _guard = self.lock();
        self.dictionaries
            .import(&args.dictionary_name, &args.file_name)?;
        Ok(())
    }

    pub fn export_dictionary(&self, args: &ExportDictionaryArgs) -> Result<()> {
        self.dictionaries
            .export(&args.dictionary_name, &args.file_name)
    }

    /// Removes a dictionary, training steps already holding it keep their copy.
    pub fn dispose_dictionary(&self, name: &str) -> Result<()> {
        let _guard = self.lock();
        self.dictionaries.remove(name)?;
        Ok(())
    }

    pub fn import_batches(&self, args: ImportBatchesArgs) -> Result<()> {
        let _guard = self.lock();
        let count = args.batches.len();
        self.batches.import(args.batches)?;

        info!(master_id = self.id(); "imported {count} batches");
        Ok(())
    }

    pub fn dispose_batch(&self, name: &str) -> Result<()> {
        let _guard = self.lock();
        self.batches.remove(name)?;
        Ok(())
    }
}

impl Drop for MasterComponent {
    fn drop(&mut self) {
        info!(master_id = self.id(); "master component released");
    }
}
