//! SignCraft Editor - runtime behind the sign designer.
//!
//! Everything the designer needs besides drawing:
//!
//! - [`store`] - Local projects and draft signs over a pluggable key-value backend
//! - [`session`] - Which project/canvas is open, toolbar and accessory choices
//! - [`reconciler`] - Live price of the open canvas, debounced after edits
//! - [`export`] - SVG previews with their fonts embedded
//! - [`client`] - HTTP client for the SignCraft API
//! - [`config`] - Environment-based configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod export;
pub mod reconciler;
pub mod session;
pub mod store;

pub use client::{ApiClient, ClientError, cart_request};
pub use config::{ConfigError, EditorConfig};
pub use export::{EmbeddedSvg, ExportError, FontSource, HttpFontSource, StaticFontSource, embed_fonts};
pub use reconciler::{CanvasEvent, PriceReconciler, PriceState, PricingInputs};
pub use session::{EditorSession, ToolbarState};
pub use store::{
    FileBackend, KvBackend, MemoryBackend, Project, ProjectCanvas, ProjectStore, StoreError,
    UnsavedSign,
};
