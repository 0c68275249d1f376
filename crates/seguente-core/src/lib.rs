//! seguente-core: peer descriptor registry over a key-value store
//!
//! This crate holds the registry logic for `seguente`: clients register a
//! peer descriptor (identity, network address, resource metrics, raw
//! payload) against a peer id and later list, fetch, or delete it.
//!
//! # Architecture
//!
//! ```text
//! Request (path/query/body) → Resolver → Registry CRUD → Store (KV)
//!                                            ↓
//!                              Decode → Migrate → Normalize → Validate
//! ```
//!
//! # Modules
//!
//! - `metric`: bounds policy for metric triples (strict validation,
//!   lenient clamping)
//! - `migrate`: legacy `{soft, hard}` limits into the named metric map
//! - `descriptor`: descriptor model and the decode/repair pipeline
//! - `resolve`: peer-id resolution from request parts, with scan fallback
//! - `cleanup`: removal of legacy records superseded by a canonical write
//! - `registry`: CRUD orchestration (list/register/fetch/remove)
//! - `store`: key-value collaborators (in-memory and SQLite)
//! - `config`: registry configuration (key prefix, reserved route segment)
//! - `error`: error taxonomy shared by all of the above
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod cleanup;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod metric;
pub mod migrate;
pub mod registry;
pub mod resolve;
pub mod store;

pub use error::{RegistryError, Result};
