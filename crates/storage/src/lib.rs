//! Single-table DynamoDB storage core for the algoprep platform.
//!
//! Every entity family (users, problems, test cases, jobs, progress history,
//! search history, usage logs, subscription plans) lives in one table keyed by
//! `(PK, SK)` with three global secondary indexes. The layers, bottom up:
//!
//! - [`keys`]: deterministic key construction, the single source of truth for
//!   key formats.
//! - [`conversions`]: domain records to/from the storage envelope (`tp`,
//!   `dat` with short wire names, `crt`/`upd`/`exp`, GSI projections).
//! - [`blob`]: offload of oversized test-case payloads to compressed blob
//!   storage, transparent on read.
//! - [`store`]: generic table primitives with a DynamoDB backend and an
//!   in-memory backend that emulates single-table semantics for tests.
//! - [`repository`]: the entity repositories implementing the
//!   `algoprep_core::storage` traits.
//! - [`migrations`]: idempotent, restartable backfill procedures.

pub mod blob;
pub mod config;
pub mod conversions;
pub mod envelope;
pub mod keys;
pub mod migrations;
pub mod repository;
pub mod store;

pub use config::StorageConfig;
pub use repository::SingleTableRepository;
