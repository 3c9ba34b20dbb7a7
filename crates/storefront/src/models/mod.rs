//! Domain models for the API server.
//!
//! These are validated domain objects, separate from database row types
//! and from the JSON bodies in `signcraft_core::api`.

pub mod order;
pub mod session;
pub mod user;

pub use order::{CartCanvas, CartProject, NewOrder, Order};
pub use session::CurrentUser;
pub use user::{NewUser, User};
