//! Diagnostics
//!
//! Property sampling, hex dumps, and the background stats reporter.
//!
//! ## Reporter lifecycle
//! - Spawned by `Db::open` on its own thread
//! - Each tick logs the engine summary and property map; at `TRACE` it also
//!   logs every entry. That dump reads the whole keyspace through a cursor;
//!   the memory engine copies the table under its read lock to build one, so
//!   writers wait for O(n) on every tick while `TRACE` is enabled
//! - Stops when signalled (`Db::close` or drop) or when a tick cannot read
//!   the summary, e.g. because the engine was closed underneath it

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Sender};
use tracing::Level;

use crate::engine::{Engine, KeyRange};
use crate::error::{KvError, Result};
use crate::iterator::{Direction, RangeIter};

/// Read every property in `E::PROPERTIES`, skipping the ones that fail
pub fn collect<E: Engine>(engine: &E) -> BTreeMap<String, String> {
    E::PROPERTIES
        .iter()
        .filter_map(|name| {
            engine
                .property(name)
                .ok()
                .map(|value| (name.to_string(), value))
        })
        .collect()
}

/// Write the engine summary and then every entry as `[KEY]:\t[VALUE]`
pub fn dump<E: Engine, W: Write>(engine: &E, out: &mut W) -> Result<()> {
    let summary = engine
        .property(E::SUMMARY_PROPERTY)
        .map_err(KvError::storage)?;
    writeln!(out, "{summary}")?;

    let range = KeyRange::default();
    let cursor = engine.cursor(&range).map_err(KvError::storage)?;
    let mut iter = RangeIter::<E>::new(cursor, range, Direction::Forward);
    while let Some((key, value)) = iter.entry() {
        writeln!(
            out,
            "[{}]:\t[{}]",
            hex::encode_upper(key),
            hex::encode_upper(value)
        )?;
        iter.advance();
    }
    match iter.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Background thread logging engine stats on a fixed interval
pub struct StatsReporter {
    /// Dropping the sender wakes the thread and stops it
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatsReporter {
    pub fn spawn<E: Engine>(name: String, engine: Arc<E>, interval: Duration) -> Result<Self> {
        let (shutdown, stopped) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name(format!("{name}-stats"))
            .spawn(move || {
                tracing::debug!(db = %name, ?interval, "stats reporter started");
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            if !report(&name, &*engine) {
                                break;
                            }
                        }
                        recv(stopped) -> _ => break,
                    }
                }
                tracing::debug!(db = %name, "stats reporter stopped");
            })?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Whether the reporter thread is still running
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("stats reporter panicked");
            }
        }
    }
}

impl Drop for StatsReporter {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// One tick. Returns false when the reporter should stop.
fn report<E: Engine>(name: &str, engine: &E) -> bool {
    let summary = match engine.property(E::SUMMARY_PROPERTY) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!(db = %name, error = %err, "cannot read stats, stopping reporter");
            return false;
        }
    };
    tracing::info!(db = %name, "stats\n{summary}");

    for (property, value) in collect(engine) {
        tracing::debug!(db = %name, %property, %value);
    }

    if tracing::enabled!(Level::TRACE) {
        let mut buf = Vec::new();
        match dump(engine, &mut buf) {
            Ok(()) => tracing::trace!(db = %name, "entries\n{}", String::from_utf8_lossy(&buf)),
            Err(err) => tracing::trace!(db = %name, error = %err, "entry dump failed"),
        }
    }
    true
}
