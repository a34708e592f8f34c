//! # bedrock-kv
//!
//! A uniform key-value storage facade over embedded ordered engines:
//! - Point get/set/delete with buffered or synced durability
//! - Forward and reverse iteration over half-open `[start, end)` ranges
//! - Atomic write batches
//! - Engine stats, hex dumps, and a background stats reporter
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application code                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Db<E>                               │
//! │        (validation, error normalization, lifecycle)         │
//! └──────┬──────────────────┬──────────────────┬────────────────┘
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//!  ┌───────────┐     ┌─────────────┐    ┌───────────────┐
//!  │   Batch   │     │  RangeIter  │    │ StatsReporter │
//!  │ (atomic)  │     │ (fwd / rev) │    │   (thread)    │
//!  └─────┬─────┘     └──────┬──────┘    └───────┬───────┘
//!        └──────────────────┼───────────────────┘
//!                           ▼
//!                  ┌─────────────────┐
//!                  │  Engine trait   │
//!                  │ redb | memory   │
//!                  └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bedrock_kv::{Config, Db, RedbEngine};
//!
//! let db: Db<RedbEngine> = Db::open(Config::builder().data_dir("/tmp/kv").build())?;
//! db.set(b"a", b"1")?;
//! assert_eq!(db.get(b"a")?, Some(b"1".to_vec()));
//! db.close()?;
//! # Ok::<(), bedrock_kv::KvError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod validate;

pub mod engine;
pub mod iterator;
pub mod batch;
pub mod stats;
pub mod db;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use batch::Batch;
pub use config::Config;
pub use db::Db;
pub use engine::{Durability, Engine, MemoryEngine, RedbEngine};
pub use error::{KvError, Result};
pub use iterator::{Direction, RangeIter};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bedrock-kv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
