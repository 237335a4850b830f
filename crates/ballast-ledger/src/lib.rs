//! Usage ledger for Ballast.
//!
//! The ledger is the accounting collaborator of the space engine: one
//! [`WriterUsage`] record per writer key, one [`UserUsage`] aggregate per
//! owner. The [`UsageStore`] trait defines the atomic per-key contract the
//! engine relies on; [`InMemoryUsageStore`] is the reference implementation.
//!
//! Owner aggregates move only through single atomic deltas
//! ([`UsageStore::confirm_usage`]), never read-modify-write across calls, so
//! many writers billed to one owner can update concurrently.

pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{LedgerError, Result};
pub use memory::InMemoryUsageStore;
pub use records::{UserUsage, WriterUsage};
pub use traits::UsageStore;
