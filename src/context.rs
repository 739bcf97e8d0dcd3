//! Per-run registry of live values with pin-counted access.
//!
//! Every slot carries its own atomic pin counter, so acquire/release on
//! distinct names only contend on the shared read lock. Publishing takes the
//! write lock.

use crate::config::ExecConfig;
use crate::error::ContextError;
use crate::matrix::MatrixValue;
use crate::types::{DataType, ScalarValue, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Slot {
    value: Value,
    pins: AtomicUsize,
}

impl Slot {
    fn new(value: Value) -> Self {
        Self {
            value,
            pins: AtomicUsize::new(0),
        }
    }

    fn unpin(&self, name: &str) -> Result<(), ContextError> {
        self.pins
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pins| pins.checked_sub(1))
            .map(|_| ())
            .map_err(|_| ContextError::Imbalance {
                name: name.to_string(),
            })
    }
}

#[derive(Debug, Default)]
pub struct ExecutionContext {
    slots: RwLock<HashMap<String, Arc<Slot>>>,
    config: ExecConfig,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExecConfig) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Binds `value` under `name`, replacing any prior binding.
    pub fn publish(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let prev = self
            .slots
            .write()
            .insert(name.clone(), Arc::new(Slot::new(value.into())));
        if let Some(prev) = prev {
            let pins = prev.pins.load(Ordering::Acquire);
            if pins > 0 {
                log::warn!("publish replaced `{name}` while it was pinned {pins} time(s)");
            }
        }
    }

    pub fn publish_matrix(&self, name: impl Into<String>, mb: MatrixValue) {
        self.publish(name, Value::from(mb));
    }

    pub fn publish_scalar(&self, scalar: ScalarValue) {
        self.publish(scalar.name.clone(), Value::Scalar(scalar));
    }

    /// Resolves `name` and pins it.
    pub fn acquire(&self, name: &str) -> Result<Value, ContextError> {
        let slot = self.slot(name)?;
        slot.pins.fetch_add(1, Ordering::AcqRel);
        Ok(slot.value.clone())
    }

    /// Resolves and pins a matrix. A non-matrix binding is rejected without
    /// touching its pin count.
    pub fn acquire_matrix(&self, name: &str) -> Result<Arc<MatrixValue>, ContextError> {
        self.pin_matrix_slot(name).map(|(_, mb)| mb)
    }

    /// Unpins `name`. Fails when the pin count is already zero.
    pub fn release(&self, name: &str) -> Result<(), ContextError> {
        let slot = self.slot(name).map_err(|_| ContextError::Imbalance {
            name: name.to_string(),
        })?;
        slot.unpin(name)
    }

    /// Pins a matrix behind a guard that unpins on every exit path. The guard
    /// unpins the binding it pinned, even if `name` has been republished since.
    pub fn pin_matrix(&self, name: &str) -> Result<PinnedMatrix, ContextError> {
        let (slot, value) = self.pin_matrix_slot(name)?;
        Ok(PinnedMatrix {
            name: name.to_string(),
            slot,
            value,
            released: false,
        })
    }

    /// Reads a scalar by value; scalars are not pinned.
    pub fn get_scalar(&self, name: &str) -> Result<ScalarValue, ContextError> {
        let slot = self.slot(name)?;
        match &slot.value {
            Value::Scalar(s) => Ok(s.clone()),
            other => Err(ContextError::TypeMismatch {
                name: name.to_string(),
                expected: DataType::Scalar,
                actual: other.data_type(),
            }),
        }
    }

    /// Current binding without pinning it.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.slots.read().get(name).map(|slot| slot.value.clone())
    }

    pub fn pin_count(&self, name: &str) -> Option<usize> {
        self.slots
            .read()
            .get(name)
            .map(|slot| slot.pins.load(Ordering::Acquire))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let slot = self.slots.write().remove(name)?;
        let pins = slot.pins.load(Ordering::Acquire);
        if pins > 0 {
            log::warn!("removed `{name}` while it was pinned {pins} time(s)");
        }
        Some(slot.value.clone())
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    fn pin_matrix_slot(&self, name: &str) -> Result<(Arc<Slot>, Arc<MatrixValue>), ContextError> {
        let slot = self.slot(name)?;
        let mb = match &slot.value {
            Value::Matrix(mb) => Arc::clone(mb),
            other => {
                return Err(ContextError::TypeMismatch {
                    name: name.to_string(),
                    expected: DataType::Matrix,
                    actual: other.data_type(),
                })
            }
        };
        slot.pins.fetch_add(1, Ordering::AcqRel);
        Ok((slot, mb))
    }

    fn slot(&self, name: &str) -> Result<Arc<Slot>, ContextError> {
        self.slots
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContextError::NotFound {
                name: name.to_string(),
            })
    }
}

/// Read-only pinned matrix. Dropping the guard releases the pin; use
/// [`PinnedMatrix::release`] to observe release failures.
#[derive(Debug)]
pub struct PinnedMatrix {
    name: String,
    slot: Arc<Slot>,
    value: Arc<MatrixValue>,
    released: bool,
}

impl PinnedMatrix {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn release(mut self) -> Result<(), ContextError> {
        self.released = true;
        self.slot.unpin(&self.name)
    }
}

impl Deref for PinnedMatrix {
    type Target = MatrixValue;

    fn deref(&self) -> &MatrixValue {
        &self.value
    }
}

impl Drop for PinnedMatrix {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.slot.unpin(&self.name) {
            log::warn!("failed to release `{}` while unwinding: {err}", self.name);
        }
    }
}
