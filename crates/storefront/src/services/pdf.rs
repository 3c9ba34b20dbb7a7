//! HTML to PDF conversion through a headless Chromium.
//!
//! The HTML is written to a temporary directory and the browser prints it
//! with `--print-to-pdf`. One browser process per document.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Time allowed for one conversion.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from producing a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// No PDF renderer is configured.
    #[error("PDF rendering is not configured")]
    Unavailable,

    /// The browser ran but did not produce a PDF.
    #[error("PDF rendering failed: {0}")]
    Render(String),

    /// The browser did not finish in time.
    #[error("PDF rendering timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Turns a complete HTML document into PDF bytes.
pub trait PdfRenderer: Send + Sync {
    fn render(&self, html: &str) -> impl Future<Output = Result<Vec<u8>, DocumentError>> + Send;
}

/// [`PdfRenderer`] that shells out to Chrome/Chromium.
#[derive(Debug, Clone)]
pub struct ChromiumPdfRenderer {
    bin: PathBuf,
    timeout: Duration,
}

impl ChromiumPdfRenderer {
    #[must_use]
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            timeout: RENDER_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn bin(&self) -> &Path {
        &self.bin
    }
}

impl PdfRenderer for ChromiumPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, DocumentError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("document.html");
        let output = dir.path().join("document.pdf");
        tokio::fs::write(&input, html).await?;

        let mut command = Command::new(&self.bin);
        command
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(format!("file://{}", input.display()))
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| DocumentError::Timeout(self.timeout))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::warn!(status = %result.status, stderr = %stderr.trim(), "Browser exited with an error");
            return Err(DocumentError::Render(format!("browser exited with {}", result.status)));
        }

        let pdf = match tokio::fs::read(&output).await {
            Ok(pdf) => pdf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocumentError::Render("browser produced no output".to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        if !pdf.starts_with(b"%PDF") {
            return Err(DocumentError::Render("output is not a PDF".to_owned()));
        }

        tracing::debug!(bytes = pdf.len(), "PDF rendered");
        Ok(pdf)
    }
}
