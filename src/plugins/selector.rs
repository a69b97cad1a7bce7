use super::default::{DEFAULT_MAX_BLOCKS, DEFAULT_MAX_LINKS};
use super::html::{collect_blocks, collect_links, first_text, parse_selector};
use super::{ExtractionRecord, Extractor};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// On-disk form of a host plugin (`<plugin-dir>/<host>.toml`)
///
/// ```toml
/// title = "h1.headline"
/// text = "article p"
/// links = "article a[href]"
/// max-blocks = 40
/// max-links = 50
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SelectorPluginFile {
    pub title: String,
    pub text: String,
    pub links: String,
    pub max_blocks: usize,
    pub max_links: usize,
}

impl Default for SelectorPluginFile {
    fn default() -> Self {
        Self {
            title: "title".to_string(),
            text: "p, h1, h2, h3, h4, h5, h6".to_string(),
            links: "a[href]".to_string(),
            max_blocks: DEFAULT_MAX_BLOCKS,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

/// Host-specific extraction routine driven by CSS selectors
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    name: String,
    title: Selector,
    text: Selector,
    links: Selector,
    max_blocks: usize,
    max_links: usize,
}

impl SelectorExtractor {
    /// Builds an extractor for `host` from a parsed plugin file
    pub fn from_definition(host: &str, definition: &SelectorPluginFile) -> Result<Self, String> {
        Ok(Self {
            name: format!("plugin:{}", host),
            title: parse_selector(&definition.title)?,
            text: parse_selector(&definition.text)?,
            links: parse_selector(&definition.links)?,
            max_blocks: definition.max_blocks,
            max_links: definition.max_links,
        })
    }

    /// Loads a plugin file; the host is the file stem
    pub fn from_file(path: &Path) -> Result<(String, Self), String> {
        let host = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| format!("cannot derive host from {}", path.display()))?;

        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let definition: SelectorPluginFile = toml::from_str(&content)
            .map_err(|e| format!("failed to parse {}: {}", path.display(), e))?;

        let extractor = Self::from_definition(&host, &definition)?;
        Ok((host, extractor))
    }
}

impl Extractor for SelectorExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, url: &Url, html: &str) -> ExtractionRecord {
        let document = Html::parse_document(html);
        ExtractionRecord {
            title: first_text(&document, &self.title),
            text: collect_blocks(&document, &self.text, self.max_blocks).join("\n"),
            links: collect_links(&document, &self.links, url, self.max_links),
        }
    }
}
