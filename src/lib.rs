//! # OrbitKV Client
//!
//! Synchronous client for the OrbitKV distributed key-value store with:
//! - Blocking get/put/delete/atomic-update/search, keyed by space and key
//! - Typed attribute marshaling (strings, 64-bit integers, keyed maps)
//! - Single-flight bridging onto the store's asynchronous engine
//! - Multi-row reconstruction of streaming search results
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                                │
//! │              (typed attribute maps in/out)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Request Builders                            │
//! │          (one generic pipeline per verb family)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Attribute  │          │  Operation  │
//!   │    Codec    │          │   Bridge    │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                    ┌──────────────┼──────────────┐
//!                    ▼              ▼              ▼
//!             ┌───────────┐  ┌───────────┐  ┌───────────┐
//!             │  Status   │  │  Result   │  │   Engine  │
//!             │Classifier │  │ Assembler │  │(event loop)│
//!             └───────────┘  └───────────┘  └───────────┘
//! ```
//!
//! Every public call submits exactly one asynchronous request, drives the
//! engine's event loop until that request completes, and unmarshals the
//! result. One client owns one engine; no two operations are ever in
//! flight on the same connection.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod status;
pub mod attribute;
pub mod engine;
pub mod bridge;
pub mod assembler;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{OrbitError, Result};
pub use config::Config;
pub use status::Status;
pub use assembler::Row;
pub use client::Client;
pub use engine::MemoryEngine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the OrbitKV client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
