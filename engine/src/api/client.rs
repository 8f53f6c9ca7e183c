use std::{path::Path, sync::Arc, time::Duration};

use messages::{
    Format,
    args::{
        AttachModelArgs, AwaitOperationArgs, ClearScoreArrayCacheArgs, ClearScoreCacheArgs,
        ClearThetaCacheArgs, CollectionParserConfig, ConfigureLoggingArgs, ExportDictionaryArgs,
        ExportModelArgs, FilterDictionaryArgs, FitOfflineMasterModelArgs, FitOnlineMasterModelArgs,
        GatherDictionaryArgs, GetDictionaryArgs, GetMasterComponentInfoArgs, GetScoreArrayArgs,
        GetScoreValueArgs, GetThetaMatrixArgs, GetTopicModelArgs, ImportBatchesArgs,
        ImportDictionaryArgs, ImportModelArgs, InitializeModelArgs, MergeModelArgs,
        NormalizeModelArgs, ProcessBatchesArgs, RegularizeModelArgs, TransformMasterModelArgs,
    },
    data::{Batch, DictionaryData, TopicModelData},
    specs::{MasterModelConfig, RegularizerConfig},
};
use serde::{Serialize, de::DeserializeOwned};

use super::{
    Engine, PendingResult,
    external::{self, DenseMatrix},
};
use crate::{
    error::{EngineErr, Result},
    logging,
    master::{AttachedModel, MasterComponent},
    operations::OperationId,
    parser,
    registry::MasterHandle,
    storage,
};

/// A call context over an `Engine`.
///
/// Arguments and results are payloads encoded in the engine's current format.
/// `request_*` operations leave their result in a single pending slot and
/// return its length, `copy_requested_message` then moves it into a caller
/// buffer. The `*_external` requests encode only the metadata of a matrix and
/// leave its weights as raw `f32` values in a second slot, drained by
/// `copy_requested_object`. Every failure is also kept as the last error
/// message until the next successful call.
pub struct Client {
    engine: Arc<Engine>,
    pending: PendingResult,
    requested_object: PendingResult,
    last_error: String,
}

impl Client {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            pending: PendingResult::default(),
            requested_object: PendingResult::default(),
            last_error: String::new(),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.last_error.clear(),
            Err(e) => self.last_error = e.to_string(),
        }

        result
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(self.engine.format().decode(bytes)?)
    }

    /// Encodes a computed result into the pending slot.
    fn respond<T: Serialize>(&mut self, result: Result<T>) -> Result<usize> {
        let encoded = result.and_then(|value| {
            self.engine
                .format()
                .encode(&value)
                .map_err(|e| EngineErr::Internal(format!("failed to encode a result: {e}")))
        });

        let len = encoded.map(|bytes| self.pending.store(bytes));
        self.record(len)
    }

    /// Encodes the metadata of a matrix into the pending slot and its weights
    /// into the requested object slot.
    fn respond_external<T>(&mut self, result: Result<T>) -> Result<usize>
    where
        T: DenseMatrix + Serialize,
    {
        let mut value = match result {
            Ok(value) => value,
            Err(e) => return self.respond::<T>(Err(e)),
        };

        let values = value.take_values();
        let len = self.respond(Ok(value))?;
        self.requested_object.store(external::to_bytes(&values));
        Ok(len)
    }

    fn with_master<A, T, F>(&self, handle: MasterHandle, args: &[u8], f: F) -> Result<T>
    where
        A: DeserializeOwned,
        F: FnOnce(&MasterComponent, A) -> Result<T>,
    {
        let master = self.engine.master(handle)?;
        let args = self.decode(args)?;
        f(&master, args)
    }

    /// The message of the last failed call, empty if the last call succeeded.
    pub fn last_error_message(&self) -> &str {
        &self.last_error
    }

    /// Moves the pending result into `buf`, which must be exactly as long as
    /// the length returned by the request.
    pub fn copy_requested_message(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = self.pending.copy_into(buf);
        self.record(result)
    }

    /// Moves the weights left by the last `*_external` request into `buf`,
    /// which must hold exactly their `f32` values.
    pub fn copy_requested_object(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = self.requested_object.copy_into(buf);
        self.record(result)
    }

    pub fn version(&self) -> &'static str {
        Engine::version()
    }

    pub fn configure_logging(&mut self, args: &[u8]) -> Result<()> {
        let result = self
            .decode::<ConfigureLoggingArgs>(args)
            .and_then(|args| logging::configure_logging(args.level.as_deref()));
        self.record(result)
    }

    pub fn set_message_format_json(&self) {
        self.engine.set_format(Format::Json);
    }

    pub fn set_message_format_binary(&self) {
        self.engine.set_format(Format::Binary);
    }

    pub fn message_format_is_json(&self) -> bool {
        self.engine.format().is_json()
    }

    pub fn create_master_model(&mut self, config: &[u8]) -> Result<MasterHandle> {
        let result = self
            .decode::<MasterModelConfig>(config)
            .and_then(|config| self.engine.create_master(config));
        self.record(result)
    }

    pub fn reconfigure_master_model(&mut self, handle: MasterHandle, config: &[u8]) -> Result<()> {
        let result = self
            .decode::<MasterModelConfig>(config)
            .and_then(|config| self.engine.reconfigure_master(handle, config));
        self.record(result)
    }

    pub fn dispose_master_component(&mut self, handle: MasterHandle) -> Result<()> {
        let result = self.engine.dispose_master(handle);
        self.record(result)
    }

    pub fn duplicate_master_component(&mut self, handle: MasterHandle) -> Result<MasterHandle> {
        let result = self.engine.duplicate_master(handle);
        self.record(result)
    }

    pub fn create_regularizer(&mut self, handle: MasterHandle, config: &[u8]) -> Result<()> {
        let result = self.with_master(handle, config, |m, config: RegularizerConfig| {
            m.create_regularizer(config)
        });
        self.record(result)
    }

    pub fn reconfigure_regularizer(&mut self, handle: MasterHandle, config: &[u8]) -> Result<()> {
        let result = self.with_master(handle, config, |m, config: RegularizerConfig| {
            m.reconfigure_regularizer(config)
        });
        self.record(result)
    }

    pub fn dispose_regularizer(&mut self, handle: MasterHandle, name: &str) -> Result<()> {
        let result = self
            .engine
            .master(handle)
            .and_then(|m| m.dispose_regularizer(name));
        self.record(result)
    }

    pub fn gather_dictionary(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: GatherDictionaryArgs| {
            m.gather_dictionary(&args)
        });
        self.record(result)
    }

    pub fn filter_dictionary(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: FilterDictionaryArgs| {
            m.filter_dictionary(&args)
        });
        self.record(result)
    }

    pub fn create_dictionary(&mut self, handle: MasterHandle, data: &[u8]) -> Result<()> {
        let result = self.with_master(handle, data, |m, data: DictionaryData| {
            m.create_dictionary(data, None)
        });
        self.record(result)
    }

    /// Stores a dictionary under `name` regardless of the name in its payload.
    pub fn create_dictionary_named(
        &mut self,
        handle: MasterHandle,
        name: &str,
        data: &[u8],
    ) -> Result<()> {
        let result = self.with_master(handle, data, |m, data: DictionaryData| {
            m.create_dictionary(data, Some(name))
        });
        self.record(result)
    }

    pub fn request_dictionary(&mut self, handle: MasterHandle, args: &[u8]) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: GetDictionaryArgs| {
            m.dictionary(&args)
        });
        self.respond(result)
    }

    pub fn import_dictionary(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: ImportDictionaryArgs| {
            m.import_dictionary(&args)
        });
        self.record(result)
    }

    pub fn export_dictionary(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: ExportDictionaryArgs| {
            m.export_dictionary(&args)
        });
        self.record(result)
    }

    pub fn dispose_dictionary(&mut self, handle: MasterHandle, name: &str) -> Result<()> {
        let result = self
            .engine
            .master(handle)
            .and_then(|m| m.dispose_dictionary(name));
        self.record(result)
    }

    pub fn import_batches(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: ImportBatchesArgs| {
            m.import_batches(args)
        });
        self.record(result)
    }

    pub fn dispose_batch(&mut self, handle: MasterHandle, name: &str) -> Result<()> {
        let result = self.engine.master(handle).and_then(|m| m.dispose_batch(name));
        self.record(result)
    }

    /// Writes a batch file into `folder`, named after the batch id.
    pub fn save_batch(&mut self, folder: &Path, batch: &[u8]) -> Result<()> {
        let result = self
            .decode::<Batch>(batch)
            .and_then(|batch| storage::save_batch(folder, &batch))
            .map(|_| ());
        self.record(result)
    }

    pub fn request_load_batch(&mut self, path: &Path) -> Result<usize> {
        let result = storage::load_batch(path);
        self.respond(result)
    }

    /// Converts a text collection into batch files.
    ///
    /// # Returns
    /// The amount of written batches.
    pub fn parse_collection(&mut self, config: &[u8]) -> Result<usize> {
        let result = self
            .decode::<CollectionParserConfig>(config)
            .and_then(|config| parser::parse_collection(&config));
        self.record(result)
    }

    /// Publishes a model, returning its new version.
    pub fn overwrite_topic_model(&mut self, handle: MasterHandle, data: &[u8]) -> Result<u64> {
        let result = self.with_master(handle, data, |m, data: TopicModelData| {
            m.overwrite_model(data, None)
        });
        self.record(result)
    }

    pub fn overwrite_topic_model_named(
        &mut self,
        handle: MasterHandle,
        name: &str,
        data: &[u8],
    ) -> Result<u64> {
        let result = self.with_master(handle, data, |m, data: TopicModelData| {
            m.overwrite_model(data, Some(name))
        });
        self.record(result)
    }

    pub fn initialize_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<u64> {
        let result = self.with_master(handle, args, |m, args: InitializeModelArgs| {
            m.initialize_model(&args)
        });
        self.record(result)
    }

    pub fn export_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: ExportModelArgs| {
            m.export_model(&args)
        });
        self.record(result)
    }

    pub fn import_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<u64> {
        let result = self.with_master(handle, args, |m, args: ImportModelArgs| {
            m.import_model(&args)
        });
        self.record(result)
    }

    pub fn dispose_model(&mut self, handle: MasterHandle, name: &str) -> Result<()> {
        let result = self.engine.master(handle).and_then(|m| m.dispose_model(name));
        self.record(result)
    }

    pub fn attach_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<AttachedModel> {
        let result = self.with_master(handle, args, |m, args: AttachModelArgs| {
            m.attach_model(args.model_name.as_deref())
        });
        self.record(result)
    }

    pub fn request_topic_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: GetTopicModelArgs| {
            m.topic_model(&args)
        });
        self.respond(result)
    }

    /// Processes batches synchronously, the pending result is a theta matrix.
    pub fn request_process_batches(&mut self, handle: MasterHandle, args: &[u8]) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: ProcessBatchesArgs| {
            m.process_batches(&args)
        });
        self.respond(result)
    }

    /// Validates the arguments and processes the batches in the background.
    pub fn async_process_batches(
        &mut self,
        handle: MasterHandle,
        args: &[u8],
    ) -> Result<OperationId> {
        let result = self.engine.master(handle).and_then(|master| {
            let args: ProcessBatchesArgs = self.decode(args)?;
            master.validate_process(&args)?;

            Ok(self.engine.submit("process batches", move || {
                master.process_batches(&args).map(|_| ())
            }))
        });
        self.record(result)
    }

    pub fn merge_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<u64> {
        let result = self.with_master(handle, args, |m, args: MergeModelArgs| m.merge_model(&args));
        self.record(result)
    }

    pub fn regularize_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<u64> {
        let result = self.with_master(handle, args, |m, args: RegularizeModelArgs| {
            m.regularize_model(&args)
        });
        self.record(result)
    }

    pub fn normalize_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<u64> {
        let result = self.with_master(handle, args, |m, args: NormalizeModelArgs| {
            m.normalize_model(&args)
        });
        self.record(result)
    }

    /// Trains the model over full passes of the collection.
    ///
    /// # Returns
    /// The last published version of the model.
    pub fn fit_offline_master_model(&mut self, handle: MasterHandle, args: &[u8]) -> Result<u64> {
        let result = self.with_master(handle, args, |m, args: FitOfflineMasterModelArgs| {
            m.fit_offline(&args)
        });
        self.record(result)
    }

    /// Trains the model incrementally.
    ///
    /// # Returns
    /// The id of the background operation when the fit is asynchronous.
    pub fn fit_online_master_model(
        &mut self,
        handle: MasterHandle,
        args: &[u8],
    ) -> Result<Option<OperationId>> {
        let result = self.engine.master(handle).and_then(|master| {
            let args: FitOnlineMasterModelArgs = self.decode(args)?;
            if !args.asynchronous {
                return master.fit_online(&args).map(|_| None);
            }

            master.validate_fit_online(&args)?;
            Ok(Some(self.engine.submit("online fit", move || {
                master.fit_online(&args).map(|_| ())
            })))
        });
        self.record(result)
    }

    pub fn request_transform_master_model(
        &mut self,
        handle: MasterHandle,
        args: &[u8],
    ) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: TransformMasterModelArgs| {
            m.transform(&args)
        });
        self.respond(result)
    }

    pub fn request_theta_matrix(&mut self, handle: MasterHandle, args: &[u8]) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: GetThetaMatrixArgs| {
            m.theta_matrix(&args)
        });
        self.respond(result)
    }

    pub fn request_score(&mut self, handle: MasterHandle, args: &[u8]) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: GetScoreValueArgs| {
            m.score_value(&args)
        });
        self.respond(result)
    }

    pub fn request_score_array(&mut self, handle: MasterHandle, args: &[u8]) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: GetScoreArrayArgs| {
            m.score_array(&args)
        });
        self.respond(result)
    }

    pub fn request_master_component_info(
        &mut self,
        handle: MasterHandle,
        args: &[u8],
    ) -> Result<usize> {
        let result = self.with_master(handle, args, |m, _: GetMasterComponentInfoArgs| {
            Ok(m.info())
        });
        self.respond(result)
    }

    pub fn request_master_model_config(&mut self, handle: MasterHandle) -> Result<usize> {
        let result = self.engine.master(handle).map(|m| m.config());
        self.respond(result)
    }

    pub fn clear_theta_cache(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: ClearThetaCacheArgs| {
            m.clear_theta_cache(&args);
            Ok(())
        });
        self.record(result)
    }

    pub fn clear_score_cache(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: ClearScoreCacheArgs| {
            m.clear_score_cache(&args);
            Ok(())
        });
        self.record(result)
    }

    pub fn clear_score_array_cache(&mut self, handle: MasterHandle, args: &[u8]) -> Result<()> {
        let result = self.with_master(handle, args, |m, args: ClearScoreArrayCacheArgs| {
            m.clear_score_array_cache(&args);
            Ok(())
        });
        self.record(result)
    }

    /// Waits for a background operation, see `Engine::await_operation`.
    pub fn await_operation(&mut self, id: OperationId, args: &[u8]) -> Result<()> {
        let result = self.decode::<AwaitOperationArgs>(args).and_then(|args| {
            self.engine
                .await_operation(id, args.timeout_ms.map(Duration::from_millis))
        });
        self.record(result)
    }

    pub fn request_theta_matrix_external(
        &mut self,
        handle: MasterHandle,
        args: &[u8],
    ) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: GetThetaMatrixArgs| {
            m.theta_matrix(&args)
        });
        self.respond_external(result)
    }

    pub fn request_topic_model_external(
        &mut self,
        handle: MasterHandle,
        args: &[u8],
    ) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: GetTopicModelArgs| {
            m.topic_model(&args)
        });
        self.respond_external(result)
    }

    pub fn request_process_batches_external(
        &mut self,
        handle: MasterHandle,
        args: &[u8],
    ) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: ProcessBatchesArgs| {
            m.process_batches(&args)
        });
        self.respond_external(result)
    }

    pub fn request_transform_master_model_external(
        &mut self,
        handle: MasterHandle,
        args: &[u8],
    ) -> Result<usize> {
        let result = self.with_master(handle, args, |m, args: TransformMasterModelArgs| {
            m.transform(&args)
        });
        self.respond_external(result)
    }
}
