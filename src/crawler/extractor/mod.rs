
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Extracted page text and the links it points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Text content with markup stripped
    pub text: String,
    /// Absolute http(s) links, fragments removed, deduplicated
    pub links: Vec<Url>,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to create CSS selector: {0}")]
    Selector(String),
    #[error("Document has no element content")]
    NotHtml,
}

/// Turns a fetched page into text and outbound links
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedPage, ExtractionError>;
}

/// Configuration for content extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Whether to fence `pre`/`code` blocks in the output text
    pub preserve_code_blocks: bool,
    /// Whether to include `nav` elements
    pub include_navigation: bool,
    /// Whether to include `footer` elements
    pub include_footer: bool,
    /// Restrict text to the first main content container when one exists
    pub main_content_only: bool,
}

impl Default for ExtractionConfig {
    #[inline]
    fn default() -> Self {
        Self {
            preserve_code_blocks: true,
            include_navigation: true,
            include_footer: true,
            main_content_only: false,
        }
    }
}

/// HTML extractor built on `scraper`
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor {
    config: ExtractionConfig,
}

impl HtmlExtractor {
    #[inline]
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }
}

impl ContentExtractor for HtmlExtractor {
    #[inline]
    fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedPage, ExtractionError> {
        if html.trim().is_empty() {
            return Err(ExtractionError::NotHtml);
        }

        let document = Html::parse_document(html);
        let text = extract_text(&document, &self.config);
        let links = extract_links(&document, page_url)?;

        debug!(
            "Extracted {} chars of text and {} links from {}",
            text.len(),
            links.len(),
            page_url
        );

        Ok(ExtractedPage { text, links })
    }
}

/// Resolve every anchor against `page_url`.
///
/// Same-page anchors and non-http schemes are skipped; fragments are removed
/// so `page#section` and `page` are the same link.
#[inline]
pub fn extract_links(document: &Html, page_url: &Url) -> Result<Vec<Url>, ExtractionError> {
    let link_selector =
        Selector::parse("a[href]").map_err(|e| ExtractionError::Selector(format!("{:?}", e)))?;

    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("javascript:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            continue;
        }

        match page_url.join(href) {
            Ok(mut absolute_url) => {
                if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
                    continue;
                }
                absolute_url.set_fragment(None);
                links.push(absolute_url);
            }
            Err(e) => {
                debug!(
                    "Failed to resolve URL '{}' relative to '{}': {}",
                    href, page_url, e
                );
            }
        }
    }

    links.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    links.dedup();

    Ok(links)
}

/// Text content of the document, one block per line
fn extract_text(document: &Html, config: &ExtractionConfig) -> String {
    let root = if config.main_content_only {
        find_main_content(document)
    } else {
        document.root_element()
    };

    let mut content = String::new();
    extract_text_recursive(root, &mut content, config);
    clean_text(&content)
}

/// Find the main content area of the document
fn find_main_content(document: &Html) -> ElementRef<'_> {
    let main_selectors = [
        "main",
        "[role=\"main\"]",
        "article",
        ".content",
        ".main-content",
        "#content",
        "#main",
        ".documentation",
        ".docs",
    ];

    for selector_str in &main_selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                debug!("Found main content using selector: {}", selector_str);
                return element;
            }
        }
    }

    document.root_element()
}

/// Recursively extract text content from an element
fn extract_text_recursive(element: ElementRef, content: &mut String, config: &ExtractionConfig) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let tag_name = child_element.value().name();

            match tag_name {
                "script" | "style" | "noscript" | "template" => {}
                "nav" if !config.include_navigation => {}
                "footer" if !config.include_footer => {}

                "pre" if config.preserve_code_blocks => {
                    content.push_str("\n```\n");
                    content.push_str(child_element.text().collect::<String>().trim());
                    content.push_str("\n```\n");
                }

                "br" => content.push('\n'),

                "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "nav"
                | "aside" | "blockquote" | "table" | "tr" | "ul" | "ol" | "li" | "dl" | "dt"
                | "dd" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "title" | "body" => {
                    content.push('\n');
                    extract_text_recursive(child_element, content, config);
                    content.push('\n');
                }

                "td" | "th" => {
                    extract_text_recursive(child_element, content, config);
                    content.push(' ');
                }

                _ => extract_text_recursive(child_element, content, config),
            }
        } else if let Some(text_node) = child.value().as_text() {
            content.push_str(text_node);
        }
    }
}

/// Collapse whitespace within lines and drop blank lines
fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
