//! Write batches
//!
//! Operations are validated and queued on the engine's batch type; nothing
//! reaches the engine until [`Batch::commit`]. Mutation takes `&mut self`,
//! so a batch has exactly one writer.

use crate::engine::{Durability, Engine, EngineBatch};
use crate::error::{KvError, Result};
use crate::validate;

/// Pending writes against one database
pub struct Batch<'db, E: Engine> {
    engine: &'db E,
    ops: E::Batch,
}

impl<'db, E: Engine> Batch<'db, E> {
    pub(crate) fn new(engine: &'db E) -> Self {
        Self {
            engine,
            ops: engine.new_batch(),
        }
    }

    /// Queue a put
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<&mut Self> {
        validate::entry(key, value)?;
        self.ops.put(key, value);
        Ok(self)
    }

    /// Queue a delete
    pub fn delete(&mut self, key: &[u8]) -> Result<&mut Self> {
        validate::key(key)?;
        self.ops.delete(key);
        Ok(self)
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every queued operation atomically, in the order queued
    ///
    /// If the engine rejects the batch (including a closed engine) nothing
    /// is applied and the error is returned as `Storage`.
    pub fn commit(self, durability: Durability) -> Result<()> {
        let count = self.ops.len();
        self.engine
            .write(self.ops, durability)
            .map_err(KvError::storage)?;
        tracing::debug!(ops = count, ?durability, "batch committed");
        Ok(())
    }

    /// Commit, buffered
    pub fn write(self) -> Result<()> {
        self.commit(Durability::Buffered)
    }

    /// Commit and wait until durable
    pub fn write_sync(self) -> Result<()> {
        self.commit(Durability::Synced)
    }

    /// Drop the batch without applying anything
    pub fn discard(self) {
        tracing::debug!(ops = self.ops.len(), "batch discarded");
    }
}
