//! SignCraft Core - Shared types, pricing and canvas model.
//!
//! This crate is used by every SignCraft component:
//! - `editor` - Client-side project store, live pricing and previews
//! - `storefront` - HTTP API (auth, cart, templates, documents)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and lets the
//! editor and the server compute identical prices.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, money and status enums
//! - [`pricing`] - Unit price, discount tiers, VAT and cart quotes
//! - [`canvas`] - Canvas snapshots, measurement, sanitization, QR paths
//! - [`api`] - JSON request/response bodies shared by editor and server

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod canvas;
pub mod pricing;
pub mod types;

pub use types::*;
