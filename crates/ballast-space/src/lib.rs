//! Space accounting engine for Ballast.
//!
//! Ballast tracks how much storage each user of a content-addressed network
//! is responsible for. Every user's file tree hangs off a forest of signed,
//! compare-and-swap mutable pointers, one per writer key; writers delegate
//! to other writers, and every key in a user's ownership tree is billed to
//! that user. This crate consumes pointer-change and identity events,
//! maintains the per-writer and per-owner ledger incrementally, and gates
//! incoming writes against per-user quotas.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ballast_ledger::InMemoryUsageStore;
//! use ballast_refs::InMemoryPointerStore;
//! use ballast_space::{
//!     InMemoryDirectory, InMemoryQuotas, InMemoryRequestStore, SpaceConfig, SpaceManager,
//! };
//! use ballast_store::InMemoryBlockStore;
//!
//! # async fn run() -> Result<(), ballast_space::SpaceError> {
//! let blocks = Arc::new(InMemoryBlockStore::new());
//! let pointers = Arc::new(InMemoryPointerStore::new(blocks.clone()));
//! let manager = SpaceManager::new(
//!     blocks,
//!     pointers,
//!     Arc::new(InMemoryUsageStore::new()),
//!     Arc::new(InMemoryDirectory::new()),
//!     Arc::new(InMemoryQuotas::new(1 << 30)),
//!     Arc::new(InMemoryRequestStore::new()),
//!     SpaceConfig::default(),
//! );
//! manager.calculate_usage().await?;
//! # Ok(())
//! # }
//! ```

mod admission;
pub mod config;
pub mod directory;
pub mod error;
pub mod manager;
mod processor;
pub mod requests;
mod sweep;
pub mod walker;

pub use config::SpaceConfig;
pub use directory::{IdentityDirectory, InMemoryDirectory, InMemoryQuotas, QuotaSource};
pub use error::{Result, SpaceError};
pub use manager::SpaceManager;
pub use requests::{InMemoryRequestStore, RequestStore};
pub use walker::direct_owned_keys;
