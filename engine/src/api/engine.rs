use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use log::info;
use messages::{Format, specs::MasterModelConfig};
use parking_lot::RwLock;

use super::Client;
use crate::{
    config::EngineConfig,
    error::{EngineErr, Result},
    master::MasterComponent,
    operations::{OperationId, OperationState, OperationTracker},
    processing::WorkerPool,
    registry::{Arena, MasterHandle},
};

static SHARED: OnceLock<Arc<Engine>> = OnceLock::new();

/// The registry of every master component together with the resources they
/// share: the batch worker pool and the asynchronous operation tracker.
pub struct Engine {
    config: EngineConfig,
    masters: RwLock<Arena<Arc<MasterComponent>>>,
    pool: Arc<WorkerPool>,
    operations: OperationTracker,
    json: AtomicBool,
}

impl Engine {
    /// Creates a new `Engine`.
    ///
    /// # Arguments
    /// * `config` - The sizes of the worker pool and the async runtime.
    ///
    /// # Returns
    /// The engine or an `InternalError` if its threads can't be started.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.num_processors)?;
        let operations = OperationTracker::new(config.async_threads)?;

        info!(
            "engine started with {} batch workers and {} async threads",
            pool.num_threads(),
            config.async_threads
        );

        Ok(Self {
            config,
            masters: RwLock::default(),
            pool: Arc::new(pool),
            operations,
            json: AtomicBool::new(false),
        })
    }

    /// The process wide engine, started with the default configuration on first use.
    pub fn shared() -> Result<Arc<Self>> {
        if let Some(engine) = SHARED.get() {
            return Ok(Arc::clone(engine));
        }

        let engine = Arc::new(Self::new(EngineConfig::default())?);
        Ok(Arc::clone(SHARED.get_or_init(|| engine)))
    }

    /// A new call context over this engine.
    pub fn client(self: &Arc<Self>) -> Client {
        Client::new(Arc::clone(self))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The encoding of the payloads crossing the engine's boundary.
    pub fn format(&self) -> Format {
        if self.json.load(Ordering::Relaxed) {
            Format::Json
        } else {
            Format::Binary
        }
    }

    pub fn set_format(&self, format: Format) {
        self.json.store(format.is_json(), Ordering::Relaxed);
    }

    fn register(&self, master: MasterComponent) -> MasterHandle {
        let master = Arc::new(master);
        let handle = self.masters.write().insert(Arc::clone(&master));
        master.bind(handle.raw());

        info!(master_id = handle.raw(); "master component created");
        handle
    }

    pub fn create_master(&self, config: MasterModelConfig) -> Result<MasterHandle> {
        let master = MasterComponent::new(config, Arc::clone(&self.pool))?;
        Ok(self.register(master))
    }

    /// The master component behind `handle`.
    ///
    /// # Returns
    /// The component or a `NotFound` error for unknown or disposed handles.
    pub fn master(&self, handle: MasterHandle) -> Result<Arc<MasterComponent>> {
        self.masters
            .read()
            .get(handle)
            .cloned()
            .ok_or_else(|| EngineErr::not_found("master component", handle.to_string()))
    }

    pub fn reconfigure_master(
        &self,
        handle: MasterHandle,
        config: MasterModelConfig,
    ) -> Result<()> {
        self.master(handle)?.reconfigure(config)
    }

    /// Unregisters a master component, operations already running on it finish
    /// against the component they hold.
    pub fn dispose_master(&self, handle: MasterHandle) -> Result<()> {
        self.masters
            .write()
            .remove(handle)
            .ok_or_else(|| EngineErr::not_found("master component", handle.to_string()))?;

        info!(master_id = handle.raw(); "master component disposed");
        Ok(())
    }

    /// Registers an independent copy of a master component.
    pub fn duplicate_master(&self, handle: MasterHandle) -> Result<MasterHandle> {
        let copy = self.master(handle)?.duplicate();
        Ok(self.register(copy))
    }

    /// The amount of registered master components.
    pub fn num_masters(&self) -> usize {
        self.masters.read().len()
    }

    pub(crate) fn submit<F>(&self, name: &'static str, job: F) -> OperationId
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.operations.submit(name, job)
    }

    /// Blocks until an operation finishes or `timeout` elapses.
    ///
    /// # Returns
    /// `Ok` once the operation completed, the error it failed with, a `Timeout`
    /// error if it's still running or a `NotFound` error for unknown ids.
    pub fn await_operation(&self, id: OperationId, timeout: Option<Duration>) -> Result<()> {
        match self.operations.await_operation(id, timeout)? {
            OperationState::Completed => Ok(()),
            OperationState::Failed(e) => Err(e),
            OperationState::Running => Err(EngineErr::Timeout { operation: id }),
        }
    }

    /// The version of the engine.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn engine() -> Engine {
        Engine::new(EngineConfig {
            num_processors: 2,
            async_threads: 1,
        })
        .unwrap()
    }

    #[test]
    fn shared_engine_is_created_once() {
        let first = Engine::shared().unwrap();
        let second = Engine::shared().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.config().async_threads, EngineConfig::default().async_threads);
    }

    #[test]
    fn disposed_handles_are_not_found() {
        let engine = engine();
        let handle = engine
            .create_master(MasterModelConfig::with_topics(["t0"]))
            .unwrap();

        assert_eq!(engine.master(handle).unwrap().id(), handle.raw());
        engine.dispose_master(handle).unwrap();

        assert_eq!(engine.master(handle).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(engine.dispose_master(handle).unwrap_err().kind(), ErrorKind::NotFound);

        let reused = engine
            .create_master(MasterModelConfig::with_topics(["t0"]))
            .unwrap();
        assert_ne!(reused, handle);
        assert_eq!(engine.num_masters(), 1);
    }

    #[test]
    fn invalid_configs_create_nothing() {
        let engine = engine();
        let err = engine
            .create_master(MasterModelConfig::with_topics(Vec::<String>::new()))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(engine.num_masters(), 0);
    }

    #[test]
    fn format_toggle() {
        let engine = engine();
        assert_eq!(engine.format(), Format::Binary);

        engine.set_format(Format::Json);
        assert!(engine.format().is_json());
    }
}
