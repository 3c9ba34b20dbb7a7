//! Business logic services for the storefront API.
//!
//! # Services
//!
//! - `auth` - Accounts, password hashing and JWT bearer tokens
//! - `pricing` - Cached rate table and server-side cart repricing
//! - `documents` - Invoice and delivery note HTML
//! - `pdf` - HTML to PDF through a headless browser
//! - `email` - Order confirmation emails over SMTP
//! - `icons` - Icon asset directory

pub mod auth;
pub mod documents;
pub mod email;
pub mod icons;
pub mod pdf;
pub mod pricing;
