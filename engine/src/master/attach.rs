use std::sync::Arc;

use log::warn;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use super::MasterComponent;
use crate::{
    error::{EngineErr, Result},
    storage::{ModelStore, TopicModel},
};

/// A private, writable copy of a published model.
///
/// Only one model of a master can be attached at a time. Edits become visible
/// once the copy is committed as a new version, dropping it discards them.
/// Commits are serialized with every other mutation of the master.
pub struct AttachedModel {
    _guard: ArcMutexGuard<RawMutex, ()>,
    mutation: Arc<Mutex<()>>,
    models: Arc<ModelStore>,
    base_version: u64,
    model: TopicModel,
}

impl AttachedModel {
    pub fn model(&self) -> &TopicModel {
        &self.model
    }

    /// The version the copy was taken from.
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        self.model.values_mut()
    }

    /// The weights as raw native endian bytes, token major.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(self.model.values_mut())
    }

    /// Publishes the edited copy as the model's next version.
    ///
    /// # Returns
    /// The new version or an `InvalidConfig` error if a weight isn't finite, in
    /// which case nothing is published.
    pub fn commit(self) -> Result<u64> {
        if self.model.values().iter().any(|v| !v.is_finite()) {
            return Err(EngineErr::invalid(format!(
                "attached model {} has non finite weights",
                self.model.name()
            )));
        }

        let _mutation = self.mutation.lock();
        let current = self.models.try_get(self.model.name()).map(|m| m.version());
        if current != Some(self.base_version) {
            warn!(
                "model {} moved from version {} while attached, overwriting it",
                self.model.name(),
                self.base_version
            );
        }

        let version = self.models.publish(self.model).version();
        Ok(version)
    }
}

impl MasterComponent {
    /// Attaches a copy of a model for direct edition.
    ///
    /// # Returns
    /// The attached copy, a `NotFound` error for unknown models or an
    /// `AlreadyExists` error if another model of the master is attached.
    pub fn attach_model(&self, name: Option<&str>) -> Result<AttachedModel> {
        let guard = Mutex::try_lock_arc(&self.attachment).ok_or_else(|| {
            EngineErr::already_exists("attached model", format!("master {}", self.id()))
        })?;

        let model = self.require_model(name)?;
        Ok(AttachedModel {
            _guard: guard,
            mutation: Arc::clone(&self.mutation),
            models: Arc::clone(&self.models),
            base_version: model.version(),
            model: TopicModel::clone(&model),
        })
    }
}
