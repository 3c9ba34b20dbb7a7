//! SVG preview export.
//!
//! Previews are rendered by the drawing library and reference fonts by name.
//! Outside the editor (emails, PDFs, the admin order view) those fonts are not
//! installed, so [`embed_fonts`] inlines each one as a base64 `@font-face`
//! rule. Embedding is best effort: a font that cannot be fetched is logged
//! and left out, and the preview falls back to the viewer's default font.

use std::collections::HashMap;
use std::future::Future;
use std::sync::LazyLock;

use base64::{Engine, engine::general_purpose::STANDARD};
use regex::Regex;
use thiserror::Error;
use url::Url;

/// Generic CSS families that never need embedding.
const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "inherit",
    "initial",
];

/// Matches `font-family="..."`, `font-family='...'` and `font-family: ...;`.
static FONT_FAMILY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"font-family\s*=\s*"([^"]*)"|font-family\s*=\s*'([^']*)'|font-family\s*:\s*([^;"}]+)"#,
    )
    .expect("Invalid regex")
});

static SVG_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").expect("Invalid regex"));

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("document has no <svg> element")]
    NotSvg,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid font URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Font file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFile {
    /// e.g. `font/woff2`
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FontFile {
    fn css_format(&self) -> &'static str {
        match self.mime.as_str() {
            "font/woff2" => "woff2",
            "font/woff" => "woff",
            "font/otf" => "opentype",
            _ => "truetype",
        }
    }
}

/// Where font files come from.
pub trait FontSource: Send + Sync {
    /// Fetch a font by family name. `Ok(None)` means the source has no such
    /// font.
    fn fetch(
        &self,
        family: &str,
    ) -> impl Future<Output = Result<Option<FontFile>, ExportError>> + Send;
}

/// Fonts held in memory, keyed case-insensitively by family.
#[derive(Debug, Clone, Default)]
pub struct StaticFontSource {
    fonts: HashMap<String, FontFile>,
}

impl StaticFontSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_font(mut self, family: &str, mime: &str, bytes: Vec<u8>) -> Self {
        self.fonts.insert(
            family.to_lowercase(),
            FontFile {
                mime: mime.to_owned(),
                bytes,
            },
        );
        self
    }
}

impl FontSource for StaticFontSource {
    async fn fetch(&self, family: &str) -> Result<Option<FontFile>, ExportError> {
        Ok(self.fonts.get(&family.to_lowercase()).cloned())
    }
}

/// Fonts served over HTTP as `<base>/<Family Name>.<ext>`.
///
/// Extensions are tried in order until one answers 200.
#[derive(Debug, Clone)]
pub struct HttpFontSource {
    client: reqwest::Client,
    base_url: Url,
    extensions: Vec<&'static str>,
}

impl HttpFontSource {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            extensions: vec!["woff2", "ttf"],
        }
    }

    fn font_url(&self, family: &str, extension: &str) -> Result<Url, ExportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ExportError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(&format!("{family}.{extension}"));
        Ok(url)
    }
}

impl FontSource for HttpFontSource {
    async fn fetch(&self, family: &str) -> Result<Option<FontFile>, ExportError> {
        for extension in &self.extensions {
            let url = self.font_url(family, extension)?;
            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                continue;
            }
            let mime = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .filter(|ct| ct.starts_with("font/"))
                .map_or_else(|| format!("font/{extension}"), str::to_owned);
            let bytes = response.bytes().await?.to_vec();
            return Ok(Some(FontFile { mime, bytes }));
        }
        Ok(None)
    }
}

/// An SVG with its fonts inlined.
#[derive(Debug, Clone)]
pub struct EmbeddedSvg {
    pub svg: String,
    /// Families that were embedded.
    pub embedded: Vec<String>,
    /// Families that could not be fetched.
    pub missing: Vec<String>,
}

/// Font families referenced by an SVG, in order of first use.
#[must_use]
pub fn referenced_fonts(svg: &str) -> Vec<String> {
    let mut families: Vec<String> = Vec::new();
    for caps in FONT_FAMILY_RE.captures_iter(svg) {
        let Some(value) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        let value = value.as_str().replace("&quot;", "\"").replace("&#39;", "'");
        for family in value.split(',') {
            let family = family.trim().trim_matches(['"', '\'']).trim();
            if family.is_empty()
                || GENERIC_FAMILIES.contains(&family.to_ascii_lowercase().as_str())
                || families.iter().any(|f| f.eq_ignore_ascii_case(family))
            {
                continue;
            }
            families.push(family.to_owned());
        }
    }
    families
}

/// Inline every referenced font into the SVG.
///
/// # Errors
///
/// Returns `ExportError::NotSvg` if there is no opening `<svg>` tag. Font
/// fetch failures are not errors; they are reported in
/// [`EmbeddedSvg::missing`].
pub async fn embed_fonts<F: FontSource>(svg: &str, fonts: &F) -> Result<EmbeddedSvg, ExportError> {
    let insert_at = SVG_OPEN_RE.find(svg).ok_or(ExportError::NotSvg)?.end();

    let mut rules = String::new();
    let mut embedded = Vec::new();
    let mut missing = Vec::new();

    for family in referenced_fonts(svg) {
        match fonts.fetch(&family).await {
            Ok(Some(font)) => {
                rules.push_str(&format!(
                    "@font-face{{font-family:'{family}';src:url(data:{mime};base64,{data}) format('{format}');}}",
                    mime = font.mime,
                    data = STANDARD.encode(&font.bytes),
                    format = font.css_format(),
                ));
                embedded.push(family);
            }
            Ok(None) => {
                tracing::warn!(family = %family, "Font not available, preview will use a fallback");
                missing.push(family);
            }
            Err(e) => {
                tracing::warn!(family = %family, error = %e, "Failed to fetch font for preview");
                missing.push(family);
            }
        }
    }

    if rules.is_empty() {
        return Ok(EmbeddedSvg {
            svg: svg.to_owned(),
            embedded,
            missing,
        });
    }

    let (head, tail) = svg.split_at(insert_at);
    let svg = format!("{head}<style type=\"text/css\">{rules}</style>{tail}");

    Ok(EmbeddedSvg {
        svg,
        embedded,
        missing,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PREVIEW: &str = concat!(
        r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" width="400" height="300">"#,
        r#"<text font-family="Roboto" x="10">Hi</text>"#,
        r#"<text style="font-family: 'Open Sans', sans-serif; font-size: 12px">Yo</text>"#,
        r#"<text font-family="roboto">Again</text>"#,
        r#"<text font-family="Lobster">Fancy</text>"#,
        "</svg>"
    );

    #[test]
    fn test_referenced_fonts() {
        assert_eq!(
            referenced_fonts(PREVIEW),
            vec!["Roboto", "Open Sans", "Lobster"]
        );
        assert!(referenced_fonts("<svg></svg>").is_empty());
    }

    #[tokio::test]
    async fn test_embed_fonts_inlines_known_fonts() {
        let fonts = StaticFontSource::new()
            .with_font("Roboto", "font/woff2", vec![1, 2, 3])
            .with_font("Open Sans", "font/ttf", vec![4, 5]);

        let result = embed_fonts(PREVIEW, &fonts).await.unwrap();

        assert_eq!(result.embedded, vec!["Roboto", "Open Sans"]);
        assert_eq!(result.missing, vec!["Lobster"]);

        let style_at = result.svg.find("<style").unwrap();
        let svg_tag_end = result.svg.find("height=\"300\">").unwrap() + "height=\"300\">".len();
        assert_eq!(style_at, svg_tag_end);
        assert!(result.svg.contains(
            "@font-face{font-family:'Roboto';src:url(data:font/woff2;base64,AQID) format('woff2');}"
        ));
        assert!(result.svg.contains("format('truetype')"));
        assert!(result.svg.ends_with("</svg>"));
    }

    #[tokio::test]
    async fn test_embed_fonts_without_matches_is_identity() {
        let svg = r#"<svg><text font-family="Lobster">x</text></svg>"#;
        let result = embed_fonts(svg, &StaticFontSource::new()).await.unwrap();
        assert_eq!(result.svg, svg);
        assert_eq!(result.missing, vec!["Lobster"]);
    }

    #[tokio::test]
    async fn test_embed_fonts_requires_svg() {
        assert!(matches!(
            embed_fonts("<html></html>", &StaticFontSource::new()).await,
            Err(ExportError::NotSvg)
        ));
    }

    #[test]
    fn test_http_font_url_encodes_family() {
        let source = HttpFontSource::new(
            reqwest::Client::new(),
            Url::parse("https://layout.example.com/fonts/").unwrap(),
        );
        let url = source.font_url("Open Sans", "woff2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://layout.example.com/fonts/Open%20Sans.woff2"
        );
    }
}
