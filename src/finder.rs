use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use reqwest::Client;
use scraper::{CaseSensitivity, ElementRef, Html, Selector};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::models::{DownloadTask, ScrapeCounters};

pub const WIKI_BASE: &str = "https://hotwheels.fandom.com/wiki";

const MARKER_ATTR: &str = "data-relevant";
const MARKER_VALUES: [&str; 2] = ["0", "1"];
const NAME_ATTR: &str = "data-image-name";
const LINK_CLASSES: [&str; 2] = ["image", "image-thumbnail"];
const KNOWN_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "tiff"];

/// Wiki list pages for an inclusive year range.
pub fn year_pages(start_year: u16, end_year: u16) -> Vec<String> {
    (start_year..=end_year)
        .map(|year| format!("{WIKI_BASE}/List_of_{year}_Hot_Wheels"))
        .collect()
}

/// What one page scan did.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageScan {
    pub matched: usize,
    pub enqueued: usize,
}

/// Walks list pages and queues tagged images for the worker pool.
pub struct PageFinder {
    client: Client,
    output_dir: PathBuf,
    counters: Arc<ScrapeCounters>,
    queue: UnboundedSender<DownloadTask>,
    img_selector: Selector,
}

impl PageFinder {
    pub fn new(
        client: Client,
        output_dir: PathBuf,
        counters: Arc<ScrapeCounters>,
        queue: UnboundedSender<DownloadTask>,
    ) -> Self {
        Self {
            client,
            output_dir,
            counters,
            queue,
            img_selector: Selector::parse(&format!("img[{MARKER_ATTR}]")).unwrap(),
        }
    }

    pub async fn scan_page(&self, page_url: &str) -> Result<PageScan> {
        let base = Url::parse(page_url).with_context(|| format!("Invalid page URL: {page_url}"))?;
        let response = self
            .client
            .get(base.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {page_url}"))?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP {} for {page_url}", response.status()));
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read {page_url}"))?;
        Ok(self.scan_html(&base, &body))
    }

    /// Extraction over already-fetched HTML, split out so the rules can be
    /// exercised without a network.
    pub fn scan_html(&self, base: &Url, html: &str) -> PageScan {
        let document = Html::parse_document(html);
        let mut scan = PageScan::default();

        for img in document.select(&self.img_selector) {
            let Some(href) = accepted_href(&img) else {
                continue;
            };
            scan.matched += 1;
            self.counters.processed.fetch_add(1, Ordering::Relaxed);

            if href.starts_with("data:") {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            let resolved = match base.join(href) {
                Ok(url) => url,
                Err(e) => {
                    eprintln!("Bad image link {href}: {e}");
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };
            if resolved.scheme() != "http" && resolved.scheme() != "https" {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let name = derive_filename(img.value().attr(NAME_ATTR), &resolved, scan.matched);
            let dest = self.output_dir.join(&name);
            if dest.exists() {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let task = DownloadTask {
                source_url: resolved,
                dest_path: dest,
                display_name: name,
            };
            if self.queue.send(task).is_err() {
                // every worker is gone; the task can never complete
                eprintln!("Download queue closed, dropping {href}");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            scan.enqueued += 1;
        }

        scan
    }
}

/// Acceptance rules for one tagged <img>: marker value in the allowed set,
/// nearest ancestor <a> carrying both gallery classes and an href. Partial
/// matches are rejected outright.
fn accepted_href<'a>(img: &ElementRef<'a>) -> Option<&'a str> {
    let marker = img.value().attr(MARKER_ATTR)?;
    if !MARKER_VALUES.contains(&marker) {
        return None;
    }
    let link = img
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")?;
    let qualified = LINK_CLASSES
        .iter()
        .all(|class| link.value().has_class(class, CaseSensitivity::CaseSensitive));
    if !qualified {
        return None;
    }
    link.value().attr("href")
}

/// Destination filename for a resolved image URL. Preference order: the
/// element's explicit name attribute, then the percent-decoded last path
/// segment, then a numbered fallback with an extension guessed from the path.
pub fn derive_filename(name_attr: Option<&str>, url: &Url, ordinal: usize) -> String {
    let raw = match name_attr {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            let path = url.path();
            let decoded = urlencoding::decode(path)
                .map(|p| p.into_owned())
                .unwrap_or_else(|_| path.to_string());
            let basename = decoded.rsplit('/').next().unwrap_or("");
            if basename.is_empty() {
                let mut name = format!("image_{ordinal}");
                if let Some(ext) = guess_extension(&decoded) {
                    name.push('.');
                    name.push_str(&ext);
                }
                name
            } else {
                basename.to_string()
            }
        }
    };
    sanitize_filename(&raw)
}

/// Collapses a name to the safe character set `[\w.-]`. Never returns an
/// empty string: names with nothing left after scrubbing become a short
/// digest of the raw input. Idempotent.
pub fn sanitize_filename(name: &str) -> String {
    let unsafe_chars = Regex::new(r"[^\w.\-]").unwrap();
    let underscore_runs = Regex::new(r"_+").unwrap();

    let cleaned = unsafe_chars.replace_all(name, "_");
    let cleaned = underscore_runs.replace_all(&cleaned, "_");
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.');

    if cleaned.is_empty() {
        format!("image_{}", &sha256::digest(name)[..12])
    } else {
        cleaned.to_string()
    }
}

fn guess_extension(path: &str) -> Option<String> {
    let (_, ext) = path.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    KNOWN_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}
