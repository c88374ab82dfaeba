//! The ledger store: blocks, the pending pool, chain validation and the
//! block/transaction/address indices. Everything lives under `core` and is
//! re-exported here so callers write `blockchain::Blockchain`.

pub mod core;
pub use core::*;
