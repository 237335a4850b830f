//! Mutable pointer layer for Ballast.
//!
//! Every writer key controls exactly one mutable pointer: the root of its
//! current subtree in the content-addressed store. A pointer moves only by
//! presenting a signed [`CasPair`](ballast_types::CasPair) whose `original`
//! half matches the pointer's current value — compare-and-swap, authenticated
//! by the writer's registered signing key.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{RefError, Result};
pub use memory::InMemoryPointerStore;
pub use traits::PointerStore;
