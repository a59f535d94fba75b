//! plotnav Registry - Capability Interface and Summary Builder
//!
//! The registry is the external source of truth recording which dataset
//! artifacts exist in which named collections. plotnav never implements the
//! registry itself; this crate defines the capability interface the rest of
//! the system programs against, a per-repository connection pool with an
//! explicit lifecycle, the summary builder that turns registry answers into
//! cacheable documents, and a programmable in-memory registry for tests.

pub mod client;
pub mod mock;
pub mod pool;
pub mod summary;

pub use client::{Registry, RegistryFactory, RegistryResult};
pub use mock::{MockRegistry, MockRegistryFactory};
pub use pool::RegistryPool;
pub use summary::build_summary;
