//! SignCraft storefront library.
//!
//! The HTTP API behind the sign editor: accounts, templates, icons, pricing,
//! cart/orders and order documents. Exposed as a library so the CLI and the
//! integration tests can reuse the repositories, services and router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
