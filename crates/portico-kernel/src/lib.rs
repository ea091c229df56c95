//! `portico-kernel` — contract types and traits for the Portico edge gateway.
//!
//! This crate defines the *interfaces and data types* shared by every part of
//! the gateway: the tenant/application topology, the per-request context, the
//! filter and predicate contracts, the plugin descriptor model, and the error
//! taxonomy.  No concrete implementations and no I/O live here — those belong
//! in `portico-gateway`.

pub mod gateway;
