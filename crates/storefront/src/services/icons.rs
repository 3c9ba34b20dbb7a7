//! Icon assets served to the editor.
//!
//! Icons are plain `.svg`/`.png` files in one directory. The listing is
//! cached for five minutes; file names are validated so requests cannot
//! leave the directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;

use signcraft_core::api::IconView;

/// URL prefix icons are served under.
pub const ICONS_PATH: &str = "/icons";

const LISTING_KEY: &str = "listing";

#[derive(Debug, Error)]
pub enum IconError {
    #[error("icon not found")]
    NotFound,

    #[error("invalid icon name")]
    InvalidName,

    #[error("icon directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// An icon file's contents.
#[derive(Debug, Clone)]
pub struct IconFile {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Directory of icon assets with a cached listing.
#[derive(Clone)]
pub struct IconLibrary {
    dir: PathBuf,
    listing: Cache<&'static str, Arc<Vec<IconView>>>,
}

impl std::fmt::Debug for IconLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconLibrary")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl IconLibrary {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let listing = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self {
            dir: dir.into(),
            listing,
        }
    }

    /// All icons, sorted by name.
    ///
    /// A missing directory is an empty library.
    ///
    /// # Errors
    ///
    /// Returns `IconError::Io` if the directory exists but cannot be read.
    pub async fn list(&self) -> Result<Arc<Vec<IconView>>, IconError> {
        if let Some(icons) = self.listing.get(LISTING_KEY).await {
            return Ok(icons);
        }

        let icons = Arc::new(scan(&self.dir).await?);
        self.listing.insert(LISTING_KEY, Arc::clone(&icons)).await;
        tracing::debug!(count = icons.len(), dir = %self.dir.display(), "Icon listing refreshed");
        Ok(icons)
    }

    /// Read one icon.
    ///
    /// # Errors
    ///
    /// Returns `IconError::InvalidName` for names with path separators,
    /// parent references or unsupported extensions, and
    /// `IconError::NotFound` if no such file exists.
    pub async fn get(&self, name: &str) -> Result<IconFile, IconError> {
        let content_type = content_type(name).ok_or(IconError::InvalidName)?;
        if !is_safe_name(name) {
            return Err(IconError::InvalidName);
        }

        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(IconFile {
                content_type,
                bytes,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(IconError::NotFound),
            Err(e) => Err(IconError::Io(e)),
        }
    }

    /// Drop the cached listing.
    pub async fn invalidate(&self) {
        self.listing.invalidate(LISTING_KEY).await;
    }
}

async fn scan(dir: &Path) -> Result<Vec<IconView>, IconError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "Icon directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut icons = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if content_type(&name).is_none() || !is_safe_name(&name) {
            continue;
        }
        icons.push(IconView {
            url: format!("{ICONS_PATH}/{name}"),
            name,
        });
    }

    icons.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(icons)
}

fn content_type(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "svg" => Some("image/svg+xml"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// A bare file name: no separators, no parent references, not hidden.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}
