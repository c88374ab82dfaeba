//! MeshLedger - a minimal replicated proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Ledger Engine
//! - [`blockchain`] - Blocks, the ledger store, chain validation and queries
//! - [`transaction`] - Transaction types and well-formedness checks
//! - [`mempool`] - Pending transaction pool
//! - [`crypto`] - Deterministic block hashing (SHA-256)
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work nonce search
//! - [`consensus`] - Longest-valid-chain resolution
//!
//! ## State Management
//! - [`persistence`] - Ledger snapshots (SQLite or in-memory)
//!
//! ## Networking & Integration
//! - [`network`] - Peer set and HTTP fan-out
//! - `api` - HTTP routes (feature `api`)
//! - [`node`] - Startup wiring
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Ledger Engine
// ============================================================================
pub mod blockchain;
pub mod crypto;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod consensus;
pub mod miner;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;

// ============================================================================
// Networking & Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;
pub mod network;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
