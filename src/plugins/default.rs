use super::html::{collect_blocks, collect_links, first_text, parse_selector};
use super::{ExtractionRecord, Extractor};
use scraper::Html;
use url::Url;

/// Maximum number of paragraph/heading blocks joined into the page text
pub const DEFAULT_MAX_BLOCKS: usize = 60;

/// Maximum number of links collected from one page
pub const DEFAULT_MAX_LINKS: usize = 80;

const TEXT_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6";

/// Generic extraction routine used when no host plugin applies
///
/// - title from `<title>`
/// - text from the first paragraph and heading blocks, one per line
/// - links from `a[href]`, resolved against the page URL
#[derive(Debug, Clone, Default)]
pub struct DefaultExtractor;

impl DefaultExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for DefaultExtractor {
    fn name(&self) -> &str {
        "default"
    }

    fn extract(&self, url: &Url, html: &str) -> ExtractionRecord {
        let document = Html::parse_document(html);
        let mut record = ExtractionRecord::default();

        if let Ok(selector) = parse_selector("title") {
            record.title = first_text(&document, &selector);
        }
        if let Ok(selector) = parse_selector(TEXT_SELECTOR) {
            record.text = collect_blocks(&document, &selector, DEFAULT_MAX_BLOCKS).join("\n");
        }
        if let Ok(selector) = parse_selector("a[href]") {
            record.links = collect_links(&document, &selector, url, DEFAULT_MAX_LINKS);
        }

        record
    }
}
