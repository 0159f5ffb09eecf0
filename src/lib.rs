//! Product Registry - append-only provenance ledger
//!
//! Records the life-cycle of uniquely identified products as an ordered,
//! timestamped history of opaque snapshots. Histories only ever grow; the
//! current state of an item is always the last snapshot in its history.

pub mod api;
pub mod bus;
pub mod client;
pub mod clock;
pub mod config;
pub mod registry;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use registry::{ItemState, Registry, RegistryError, Snapshot};
