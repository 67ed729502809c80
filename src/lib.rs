//! Workspace placeholder crate.
//!
//! This crate exists so host applications can depend on `cds-cache` and reach
//! the individual workspace crates (`core-store`, `core-prefetch`) through a
//! single dependency instead of wiring each crate individually.

pub use core_prefetch as prefetch;
pub use core_store as store;
