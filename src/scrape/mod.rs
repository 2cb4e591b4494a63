use async_trait::async_trait;
use log::{ debug, warn };
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client as HttpClient;
use scraper::{ Html, Selector };
use std::time::Duration;
use url::Url;

use crate::llm::BoxError;
use crate::models::campaign::ProductRecord;

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x200?text=No+Image";
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static META_PROPERTY: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[property]").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\d[\d,]*(?:\.\d{1,2})?").unwrap());

/// Turns a product link into display metadata. Never fails: problems are
/// recorded in the returned record's `error` field.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> ProductRecord;
}

pub struct HttpMetadataExtractor {
    http: HttpClient,
}

impl HttpMetadataExtractor {
    pub fn new(timeout: Duration) -> Result<Self, BoxError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| Box::new(e) as BoxError)?;
        Ok(Self { http })
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        self.http.get(url).send().await?.error_for_status()?.text().await
    }
}

#[async_trait]
impl MetadataExtractor for HttpMetadataExtractor {
    async fn extract(&self, url: &str) -> ProductRecord {
        let url = normalize_url(url);
        match self.fetch(&url).await {
            Ok(html) => {
                let record = parse_product_page(&url, &html);
                debug!("Extracted '{}' (price {:?}) from {}", record.title, record.price, url);
                record
            }
            Err(e) => {
                warn!("Failed to fetch product page {}: {}", url, e);
                fallback_record(&url, e.to_string())
            }
        }
    }
}

/// Prefixes `https://` when the link carries no scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Host (with port, when explicit) of a URL, or empty when it has none.
fn host_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            match (parsed.host_str(), parsed.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                _ => String::new(),
            }
        }
        Err(_) => String::new(),
    }
}

pub fn fallback_record(url: &str, error: String) -> ProductRecord {
    ProductRecord {
        url: url.to_string(),
        title: format!("Product from {}", host_of(url)),
        image: PLACEHOLDER_IMAGE.to_string(),
        price: None,
        error: Some(error),
    }
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    document
        .select(&META_PROPERTY)
        .filter(|meta| {
            meta.value()
                .attr("property")
                .is_some_and(|p| p.eq_ignore_ascii_case(property))
        })
        .find_map(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn document_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Concatenated text nodes of the whole document. Comments are skipped,
/// script and style text is kept.
fn document_text(document: &Html) -> String {
    document.root_element().text().collect()
}

pub fn find_price(text: &str) -> Option<String> {
    PRICE.find(text).map(|m| m.as_str().to_string())
}

/// Builds a record from an already fetched page. Open Graph title and image
/// win over the document title and the placeholder image.
pub fn parse_product_page(url: &str, html: &str) -> ProductRecord {
    let document = Html::parse_document(html);
    let title = meta_content(&document, "og:title")
        .or_else(|| document_title(&document))
        .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());
    let image = meta_content(&document, "og:image")
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
    let price = find_price(&document_text(&document));

    ProductRecord {
        url: url.to_string(),
        title,
        image,
        price,
        error: None,
    }
}
